use anyhow::Result;

use super::{Command, Session};
use crate::cli::ScanCommands;
use picking_control::{Folio, ScanRecord};

pub struct ScanCommand<'a> {
    pub command: &'a ScanCommands,
}

impl Command for ScanCommand<'_> {
    async fn execute(&self, session: &Session) -> Result<()> {
        let service = &session.service;
        let actor = &session.actor;

        match self.command {
            ScanCommands::Add { qr } => {
                let scan = service.register_scan(actor, qr).await?;
                if !session.print_json(&scan)? {
                    println!("Scan registered for {}", scan.parent_folio);
                }
            }
            ScanCommands::Status { qr, status } => {
                let scan = service.update_scan_status(actor, qr, *status).await?;
                if !session.print_json(&scan)? {
                    println!("Scan for {} is now {}", scan.parent_folio, scan.status);
                }
            }
            ScanCommands::Remove { qr } => {
                service.delete_scan(actor, qr).await?;
                if !session.print_json(&serde_json::json!({ "deleted": qr }))? {
                    println!("Scan removed");
                }
            }
            ScanCommands::List { folio } => {
                let scans = service.folio_scans(actor, &Folio::new(folio)?).await?;
                if !session.print_json(&scans)? {
                    if scans.is_empty() {
                        println!("No scans for {folio}");
                    }
                    for scan in &scans {
                        println!("{}", format_scan(scan));
                    }
                }
            }
        }
        Ok(())
    }
}

fn format_scan(scan: &ScanRecord) -> String {
    format!(
        "{}  {:<14} {:<12} {}",
        scan.scanned_at.format("%Y-%m-%d %H:%M:%S"),
        scan.status.as_str(),
        scan.operator.as_str(),
        scan.details
    )
}
