use anyhow::{Context, Result};
use std::path::PathBuf;

use super::{Command, Session};
use picking_control::{rows_from_json, RowOutcome};

pub struct ImportCommand {
    pub file: PathBuf,
}

impl Command for ImportCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let raw = tokio::fs::read_to_string(&self.file)
            .await
            .with_context(|| format!("reading {}", self.file.display()))?;
        let rows = rows_from_json(&raw)?;

        let report = session.service.import_rows(&session.actor, rows).await?;

        if !session.print_json(&report)? {
            for row in &report.rows {
                let folio = row.folio.as_ref().map(|f| f.as_str()).unwrap_or("<blank>");
                match &row.outcome {
                    RowOutcome::Inserted => {}
                    RowOutcome::Malformed { reason }
                    | RowOutcome::NotPersisted { reason }
                    | RowOutcome::Unconfirmed { reason } => {
                        println!("row {}: {} ({}: {})", row.index + 1, folio, row.outcome.label(), reason)
                    }
                    other => println!("row {}: {} ({})", row.index + 1, folio, other.label()),
                }
            }
            println!("{}", report.summary());
        }

        match report.batch_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
