/// Command-line front end for the daily habit tracker
///
/// This file sets up logging, parses command line arguments, opens the
/// configured storage backend and forwards each subcommand to the habit
/// service.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use daily_habit_tracker::{
    diagnostics, parse_date, BackendKind, HabitId, HabitService, HabitWithStatus, SystemClock,
    TimeOfDay, TrackerConfig,
};

/// Command line arguments for the habit tracker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the habit data
    /// If not provided, uses a default location in the user's home directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Storage backend to use (sqlite or kv); detected when omitted
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Print listings as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show today's habits, most urgent first
    Today,
    /// Show the habits of a past day (YYYY-MM-DD)
    History { date: String },
    /// Create a habit
    Add {
        name: String,
        /// Planned time of day (HH:MM)
        #[arg(long = "at")]
        scheduled_time: Option<TimeOfDay>,
        #[arg(long)]
        critical: bool,
    },
    /// Change or clear a habit's planned time
    Schedule {
        id: i64,
        #[arg(long = "at")]
        scheduled_time: Option<TimeOfDay>,
    },
    /// Mark a habit done for today
    Done {
        id: i64,
        #[arg(long)]
        minutes: Option<u32>,
        /// Completion time (HH:MM)
        #[arg(long = "at")]
        completion_time: Option<TimeOfDay>,
    },
    /// Reset today's record of a habit to pending
    Undo { id: i64 },
    /// Delete a habit from today onwards
    Delete { id: i64 },
    /// Dump everything the backend holds
    Debug,
}

fn print_habits(habits: &[HabitWithStatus], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(habits)?);
        return Ok(());
    }

    if habits.is_empty() {
        println!("No habits for this day.");
    }
    for habit in habits {
        let mark = if habit.is_done() { "x" } else { " " };
        let critical = if habit.is_critical() { "!" } else { " " };
        let time = habit.scheduled_time().map(|t| t.as_str()).unwrap_or("--:--");
        let mut line = format!("[{}]{} {:>4}  {}  {}", mark, critical, habit.id().0, time, habit.name());
        if let Some(minutes) = habit.duration_minutes {
            line.push_str(&format!("  ({} min)", minutes));
        }
        if let Some(at) = &habit.completion_time {
            line.push_str(&format!("  done at {}", at));
        }
        println!("{}", line);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Set up logging based on command line flags
    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("daily_habit_tracker={},habit_tracker={}", log_level, log_level))
        .with_writer(std::io::stderr) // Keep stdout for command output
        .init();

    // Flags win; the environment and defaults only fill the gaps
    let config = TrackerConfig::resolve(args.data_dir, args.backend)?;

    info!("Using {} backend at: {}", config.backend, config.data_dir.display());

    let service = HabitService::open(&config, Arc::new(SystemClock)).await?;

    match args.command {
        Command::Today => {
            let habits = service.get_today_habits().await?;
            print_habits(&habits, args.json)?;
        }
        Command::History { date } => {
            let habits = service.get_habits_for_date(parse_date(&date)?).await?;
            print_habits(&habits, args.json)?;
        }
        Command::Add { name, scheduled_time, critical } => {
            let id = service.create_habit(&name, scheduled_time, critical).await?;
            println!("Created habit {}", id);
        }
        Command::Schedule { id, scheduled_time } => {
            service.update_habit_scheduled_time(HabitId(id), scheduled_time).await?;
        }
        Command::Done { id, minutes, completion_time } => {
            service.mark_habit_done(HabitId(id), minutes, completion_time).await?;
        }
        Command::Undo { id } => {
            service.mark_habit_pending(HabitId(id)).await?;
        }
        Command::Delete { id } => {
            service.delete_habit(HabitId(id)).await?;
        }
        Command::Debug => {
            let report = diagnostics::snapshot(&service).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
