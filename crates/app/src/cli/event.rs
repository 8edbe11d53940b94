use std::path::PathBuf;

use clap::{Args, Subcommand};

use attest_app::{context::AppContext, domain::events::models::EventUuid};

#[derive(Debug, Args)]
pub(crate) struct EventCommand {
    #[command(subcommand)]
    command: EventSubcommand,
}

#[derive(Debug, Subcommand)]
enum EventSubcommand {
    /// Issue a fresh check-in token, replacing the current one
    Token(TokenArgs),

    /// Show whether an event is upcoming, ongoing or completed
    Status(StatusArgs),
}

#[derive(Debug, Args)]
struct TokenArgs {
    #[arg(long)]
    event: EventUuid,

    /// Write the QR code SVG to this path
    #[arg(long)]
    qr_out: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct StatusArgs {
    #[arg(long)]
    event: EventUuid,
}

pub(crate) async fn run(context: &AppContext, command: EventCommand) -> Result<(), String> {
    match command.command {
        EventSubcommand::Token(args) => {
            let pass = context
                .events
                .issue_check_in_token(args.event)
                .await
                .map_err(|error| format!("failed to issue check-in token: {error}"))?;

            println!("token: {}", pass.token);
            println!("check_in_url: {}", pass.check_in_url);
            println!("expires_at: {}", pass.expires_at);

            if let Some(path) = args.qr_out {
                std::fs::write(&path, pass.qr_svg)
                    .map_err(|error| format!("failed to write {}: {error}", path.display()))?;

                println!("qr_svg: {}", path.display());
            }

            Ok(())
        }
        EventSubcommand::Status(args) => {
            let status = context
                .events
                .event_status(args.event)
                .await
                .map_err(|error| format!("failed to read event status: {error}"))?;

            println!("{status:?}");

            Ok(())
        }
    }
}
