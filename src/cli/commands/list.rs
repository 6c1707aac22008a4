use anyhow::Result;

use super::{Command, Session};
use picking_control::{PickingRecord, RecordFilter, Status, UserId};

pub struct ListCommand {
    pub statuses: Vec<Status>,
    pub operators: Vec<String>,
    pub search: Option<String>,
}

impl ListCommand {
    fn filter(&self) -> Result<RecordFilter> {
        let mut filter = RecordFilter::new();
        for status in &self.statuses {
            filter = filter.with_status(*status);
        }
        for operator in &self.operators {
            filter = filter.with_operator(UserId::new(operator)?);
        }
        if let Some(search) = &self.search {
            filter = filter.with_folio_search(search.as_str());
        }
        Ok(filter)
    }
}

impl Command for ListCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let records = session
            .service
            .dashboard(&session.actor, &self.filter()?)
            .await?;

        if session.print_json(&records)? {
            return Ok(());
        }

        if records.is_empty() {
            println!("No pickings to show.");
            return Ok(());
        }

        println!("{:<16} {:<14} {:<16}", "FOLIO", "STATUS", "OPERATOR");
        for record in &records {
            println!("{}", format_row(record));
        }
        println!();
        println!("{} pickings", records.len());
        Ok(())
    }
}

fn format_row(record: &PickingRecord) -> String {
    let operator = record
        .assigned_operator
        .as_ref()
        .map(|o| o.as_str())
        .unwrap_or("-");
    format!("{:<16} {:<14} {:<16}", record.folio.as_str(), record.status.as_str(), operator)
}
