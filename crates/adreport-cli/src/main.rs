use adreport_cli::{commands, init_logging, LoggingConfig, RunArgs, TrackArgs};
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "adreport")]
#[command(about = "Daily ad impressions, clicks and payments with trailing-window totals", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the report and write the configured exports
    Run(RunArgs),
    /// Show every row of one user and value prop
    Track(TrackArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(
        &LoggingConfig::default()
            .with_filter(cli.log_level)
            .with_json(cli.log_json),
    );

    match cli.command {
        Commands::Run(args) => {
            commands::run(&args)?;
        }
        Commands::Track(args) => {
            print!("{}", commands::track(&args)?);
        }
    }

    Ok(())
}
