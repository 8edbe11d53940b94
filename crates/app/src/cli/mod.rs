use clap::{Parser, Subcommand};

use attest_app::{config::AppConfig, context::AppContext};

mod certificates;
mod db;
mod event;
mod poap;

#[derive(Debug, Parser)]
#[command(name = "attest-app", about = "Attest credentialing CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) config: AppConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Event(event::EventCommand),
    Certificates(certificates::CertificatesCommand),
    Poap(poap::PoapCommand),
    Db(db::DbCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        let context = AppContext::from_config(&self.config)
            .await
            .map_err(|error| format!("failed to initialise: {error}"))?;

        let result = match self.command {
            Commands::Event(command) => event::run(&context, command).await,
            Commands::Certificates(command) => certificates::run(&context, command).await,
            Commands::Poap(command) => poap::run(&context, command).await,
            Commands::Db(command) => db::run(&self.config, command).await,
        };

        context.shutdown().await;

        result
    }
}
