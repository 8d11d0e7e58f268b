use clap::Subcommand;

use crate::app::AppState;
use crate::cli::output::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Apply pending schema migrations")]
    Migrate,

    #[command(about = "Check that the database answers")]
    Ping,
}

pub async fn handle(cmd: DbCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DbCommands::Migrate => {
            state.database.migrate().await?;
            output_success::<()>(output_format, "Migrations applied", None)
        }
        DbCommands::Ping => {
            state.database.health_check().await?;
            output_success::<()>(output_format, "Database reachable", None)
        }
    }
}
