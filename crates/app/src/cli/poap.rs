use clap::{Args, Subcommand};

use attest_app::{context::AppContext, domain::poaps::models::PoapUuid};

#[derive(Debug, Args)]
pub(crate) struct PoapCommand {
    #[command(subcommand)]
    command: PoapSubcommand,
}

#[derive(Debug, Subcommand)]
enum PoapSubcommand {
    /// Revoke an attendance record; it stops counting toward attended-only issuance
    Revoke(RevokeArgs),
}

#[derive(Debug, Args)]
struct RevokeArgs {
    #[arg(long)]
    poap: PoapUuid,

    #[arg(long)]
    reason: String,
}

pub(crate) async fn run(context: &AppContext, command: PoapCommand) -> Result<(), String> {
    match command.command {
        PoapSubcommand::Revoke(args) => {
            if args.reason.trim().is_empty() {
                return Err("reason cannot be empty".to_string());
            }

            let poap = context
                .poaps
                .revoke_poap(args.poap, args.reason)
                .await
                .map_err(|error| format!("failed to revoke poap: {error}"))?;

            println!("revoked poap {} held by {}", poap.uuid, poap.email);

            Ok(())
        }
    }
}
