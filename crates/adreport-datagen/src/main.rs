//! CLI for deterministic ad event generation.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "adreport-datagen")]
#[command(about = "Deterministic impression, click and payment data for adreport")]
struct Args {
    /// Output directory for the event files and adreport.yml
    #[arg(short, long, default_value = "data")]
    output: PathBuf,

    /// Random seed for deterministic generation
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of users in the pool
    #[arg(short = 'u', long, default_value = "10000")]
    num_users: usize,

    /// Number of days to generate
    #[arg(short, long, default_value = "30")]
    days: u32,

    /// Start date (YYYY-MM-DD)
    #[arg(long, default_value = "2020-11-01")]
    start_date: String,

    /// Quiet mode (no summary output)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let start_date = NaiveDate::parse_from_str(&args.start_date, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Invalid date format: {}", e))?;

    if !args.quiet {
        println!(
            "Generating {} days of events for {} users",
            args.days, args.num_users
        );
        println!("Output: {:?}", args.output);
        println!("Seed: {}", args.seed);
        println!();
    }

    let start_time = Instant::now();

    let summary = adreport_datagen::write_dataset(
        &args.output,
        args.seed,
        args.num_users,
        args.days,
        start_date,
    )?;

    let elapsed = start_time.elapsed();

    if !args.quiet {
        println!(
            "Generated {} prints, {} taps, {} pays in {:.2}s",
            summary.prints,
            summary.taps,
            summary.pays,
            elapsed.as_secs_f64()
        );
    }

    Ok(())
}
