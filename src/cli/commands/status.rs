use anyhow::Result;

use super::{Command, Session};
use picking_control::{Folio, Status, UserId};

pub struct SetStatusCommand {
    pub folio: String,
    pub status: Status,
}

impl Command for SetStatusCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let folio = Folio::new(&self.folio)?;
        let outcome = session
            .service
            .transition(&session.actor, &folio, self.status)
            .await?;

        if session.print_json(&outcome.record)? {
            return Ok(());
        }
        match outcome.event {
            Some(event) => println!("{}: {}", folio, event.description),
            None => println!("{} is already {}", folio, outcome.record.status),
        }
        Ok(())
    }
}

pub struct ReassignCommand {
    pub folio: String,
    pub operator: String,
}

impl Command for ReassignCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let folio = Folio::new(&self.folio)?;
        let operator = UserId::new(&self.operator)?;
        let outcome = session
            .service
            .reassign(&session.actor, &folio, operator)
            .await?;

        if session.print_json(&outcome.record)? {
            return Ok(());
        }
        println!("{}: {}", folio, outcome.event.description);
        Ok(())
    }
}
