use clap::{Parser, Subcommand};
use picking_control::{Role, Status};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "picking-control")]
#[command(about = "Warehouse picking control: statuses, assignments and bulk imports")]
#[command(long_about = "Picking control tracks warehouse picking orders (folios) through their status \
                       workflow. Responsables import folios, assign them and release them; capturistas \
                       work the folios assigned to them.")]
pub struct Cli {
    /// Identity of the person issuing the command
    #[arg(long, global = true, help = "User identity performing the command")]
    pub user: Option<String>,
    /// Role of that person
    #[arg(long, global = true, help = "Role: responsable or capturista")]
    pub role: Option<Role>,
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
    /// Configuration file
    #[arg(long, global = true, default_value = "picking-control.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the pickings visible to you
    List {
        /// Only show these statuses
        #[arg(long = "status", help = "Filter by status (repeatable)")]
        statuses: Vec<Status>,
        /// Only show pickings assigned to these operators
        #[arg(long = "operator", help = "Filter by assigned operator (repeatable)")]
        operators: Vec<String>,
        /// Case-insensitive folio search
        #[arg(long, help = "Show folios containing this text")]
        search: Option<String>,
    },
    /// Import new folios from a JSON array of rows
    Import {
        /// JSON file: an array of objects, one per row, with a FOLIO column
        file: PathBuf,
    },
    /// Change the status of a picking
    SetStatus { folio: String, status: Status },
    /// Assign a picking to an operator
    Reassign { folio: String, operator: String },
    /// Manage document scans attached to a folio
    Scan {
        #[command(subcommand)]
        command: ScanCommands,
    },
}

#[derive(Subcommand)]
pub enum ScanCommands {
    /// Register a scanned QR
    Add { qr: String },
    /// Change the status of a registered scan
    Status { qr: String, status: Status },
    /// Remove a registered scan
    Remove { qr: String },
    /// List the scans attached to a folio
    List { folio: String },
}
