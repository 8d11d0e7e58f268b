use clap::Subcommand;

use crate::app::AppState;
use crate::cli::output::{output_fields, output_success};
use crate::cli::OutputFormat;
use crate::services::Actor;

#[derive(Subcommand)]
pub enum PermissionCommands {
    #[command(about = "List every permission that can be delegated")]
    List,
}

pub async fn handle(cmd: PermissionCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PermissionCommands::List => {
            let catalog = state.delegation.list_permissions(Actor::system()).await?;
            if output_format == OutputFormat::Json {
                return output_success(output_format, "Permission catalog", Some(&catalog));
            }

            let rows: Vec<(&str, String)> = catalog
                .iter()
                .map(|p| (p.name.as_str(), p.description.clone().unwrap_or_default()))
                .collect();
            output_fields(&rows);
            Ok(())
        }
    }
}
