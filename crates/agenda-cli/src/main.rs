//! `agenda` CLI: build, cancel, and conflict-check appointment calendars.
//!
//! ## Usage
//!
//! ```sh
//! # Write the calendar document for an appointment (stdin → stdout)
//! agenda ical < appointment.json
//!
//! # Same, but print the appointment JSON with its iCalData filled in
//! agenda ical -i appointment.json --json
//!
//! # Cancel an existing calendar document
//! agenda cancel -i appointment.ics -o cancelled.ics
//!
//! # List stored appointments that conflict with a candidate
//! agenda conflicts --candidate candidate.json -i existing.json
//!
//! # Expand a recurring appointment into concrete windows
//! agenda occurrences -i appointment.json --limit 10
//! ```

use agenda_engine::{
    find_conflicts, Appointment, CalendarEncoder, ConflictQuery, EngineConfig,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Read};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "agenda",
    version,
    about = "Appointment calendar and conflict tool"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate (or cancel) the calendar document of an appointment
    Ical {
        /// Appointment JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Print the updated appointment as JSON instead of the bare document
        #[arg(long)]
        json: bool,
    },
    /// Mark every event of a calendar document cancelled
    Cancel {
        /// Calendar document (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List existing appointments that conflict with a candidate
    Conflicts {
        /// Candidate appointment JSON file
        #[arg(long)]
        candidate: String,
        /// JSON array of existing appointments (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Expand an appointment into its occurrence windows
    Occurrences {
        /// Appointment JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Maximum number of occurrences to print
        #[arg(long, default_value_t = 50)]
        limit: u16,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let encoder = CalendarEncoder::new(&config);

    match cli.command {
        Commands::Ical {
            input,
            output,
            json,
        } => {
            let mut appointment = read_appointment(input.as_deref())?;
            encoder
                .update_calendar(&mut appointment)
                .context("Failed to update calendar document")?;

            if json {
                let pretty = serde_json::to_string_pretty(&appointment)?;
                write_output(output.as_deref(), &pretty)?;
            } else {
                let document = appointment.ical_data.unwrap_or_default();
                write_output(output.as_deref(), &document)?;
            }
        }
        Commands::Cancel { input, output } => {
            let document = read_input(input.as_deref())?;
            let cancelled = encoder
                .cancel(&document)
                .context("Failed to cancel calendar document")?;
            write_output(output.as_deref(), &cancelled)?;
        }
        Commands::Conflicts {
            candidate,
            input,
            output,
        } => {
            let candidate = read_appointment(Some(candidate.as_str()))?;
            let existing: Vec<Appointment> = serde_json::from_str(&read_input(input.as_deref())?)
                .context("Failed to parse existing appointments")?;

            let conflicts = find_conflicts(&ConflictQuery::for_appointment(&candidate), &existing);
            debug!(conflicts = conflicts.len(), "conflict scan done");

            let pretty = serde_json::to_string_pretty(&conflicts)?;
            write_output(output.as_deref(), &pretty)?;
        }
        Commands::Occurrences { input, limit } => {
            let appointment = read_appointment(input.as_deref())?;
            let windows = appointment
                .occurrences(limit)
                .context("Failed to expand occurrences")?;
            println!("{}", serde_json::to_string_pretty(&windows)?);
        }
    }

    Ok(())
}

/// Send logs to stderr so stdout stays parseable. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path))?;
            EngineConfig::from_toml_str(&text)
                .with_context(|| format!("Invalid config: {}", path))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn read_appointment(path: Option<&str>) -> Result<Appointment> {
    let json = read_input(path)?;
    serde_json::from_str(&json).context("Failed to parse appointment JSON")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
