use clap::Subcommand;
use serde_json::json;

use crate::app::AppState;
use crate::cli::output::{output_fields, output_success};
use crate::cli::OutputFormat;
use crate::services::delegation_service::MAX_TOKEN_HOURS;
use crate::services::{Actor, GenerateAccessRequest, RevokeAccessRequest, TokenDuration};

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a delegated access token for a user")]
    Issue {
        #[arg(long, help = "Target user id")]
        user: i64,
        #[arg(long = "permission", required = true, help = "Permission to embed (repeatable)")]
        permissions: Vec<String>,
        #[arg(
            long,
            value_parser = clap::value_parser!(i64).range(1..=MAX_TOKEN_HOURS),
            help = "Lifetime in whole hours (server default when omitted)"
        )]
        hours: Option<i64>,
    },

    #[command(about = "Clear a user's delegated access token")]
    Revoke {
        #[arg(long, help = "Target user id")]
        user: i64,
    },

    #[command(about = "Check a delegated token against the signing key and the stored copy")]
    Verify {
        #[arg(help = "Token to check")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { user, permissions, hours } => {
            let request = GenerateAccessRequest {
                user_id: Some(user),
                permissions: Some(json!(permissions)),
                duration: hours.map(TokenDuration::Hours),
            };
            let issued = state.delegation.issue(Actor::system(), request).await?;

            if output_format == OutputFormat::Json {
                return output_success(output_format, "Access token issued", Some(&issued));
            }
            output_success::<()>(output_format, &format!("Access token issued for user {}", user), None)?;
            output_fields(&[
                ("token", issued.token),
                ("expires", issued.expires_at.to_rfc3339()),
                ("permissions", issued.permissions.join(", ")),
            ]);
            Ok(())
        }
        TokenCommands::Revoke { user } => {
            state
                .delegation
                .revoke(Actor::system(), RevokeAccessRequest { user_id: Some(user) })
                .await?;
            output_success::<()>(output_format, &format!("Access token revoked for user {}", user), None)
        }
        TokenCommands::Verify { token } => {
            let verified = state.delegation.verify(&token).await?;

            if output_format == OutputFormat::Json {
                return output_success(output_format, "Access token valid", Some(&verified));
            }
            output_success::<()>(output_format, "Access token valid", None)?;
            output_fields(&[
                ("user", format!("{} ({})", verified.user.username, verified.user.id)),
                ("role", verified.user.role.to_string()),
                ("permissions", verified.permissions.join(", ")),
                (
                    "expires",
                    verified.expires_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string()),
                ),
            ]);
            Ok(())
        }
    }
}
