//! One-shot run triggers for operators and an external scheduler.

pub mod triggers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
	version = scout_cli::VERSION,
	rename_all = "kebab",
	styles = scout_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
	/// Resolve pending entries into candidates.
	Ingest,
	/// Run the scout dispatch for one robot.
	Dispatch {
		#[arg(long, value_name = "UUID")]
		robot_id: Uuid,
	},
	/// Run the scout dispatch for every scout-active robot in turn.
	DispatchAll,
	/// Seal a portal password read from stdin for storage in scout_services.
	SealPassword,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = scout_config::load(&args.config)?;

	init_tracing(&config);

	match args.command {
		Command::SealPassword => {
			let mut line = String::new();

			std::io::stdin().read_line(&mut line)?;
			println!("{}", triggers::seal_password(&config, &line)?);

			Ok(())
		},
		command => {
			let engine = triggers::connect(config).await?;
			let output = triggers::execute(&engine, command).await?;

			println!("{output}");

			Ok(())
		},
	}
}

fn init_tracing(config: &scout_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(filter).init();
}
