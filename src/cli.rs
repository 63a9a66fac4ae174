use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "paydash", about = "Payment-transaction stats sync service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the REST API server with the sync scheduler.
    Serve {
        #[arg(long, env = "PAYDASH_PORT", default_value_t = 8080)]
        port: u16,
    },

    /// Run an ad-hoc sync pass and exit.
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },

    /// Manage the tenant database registry.
    Tenant {
        #[command(subcommand)]
        command: TenantCommands,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Sync hourly stats + daily summary for one date (YYYY-MM-DD).
    Day { date: String },
    /// Sync the rolling 30-day window.
    Full,
    /// Sync today only.
    Current,
}

#[derive(Subcommand)]
pub enum TenantCommands {
    /// List registered tenant databases.
    List,
    /// Register a tenant database.
    Add { name: String },
    /// Remove a tenant database.
    Remove { name: String },
}
