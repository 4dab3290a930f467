//! helpq CLI — operator interface to the help-queue engine.

use chrono::Duration;
use clap::{Parser, Subcommand};
use helpq::config::Config;
use helpq::engine::QueueEngine;
use helpq::model::{EntryId, RemovalType};
use helpq::stats::Metrics;
use helpq::telemetry::init_tracing;
use secrecy::ExposeSecret;

#[derive(Parser)]
#[command(name = "helpq", about = "Office-hours help-queue backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Join a student to a queue
    Join {
        queue_code: String,
        student_id: String,
    },
    /// Start helping a waiting entry
    StartHelp { entry_id: i64, staff_id: String },
    /// Remove an entry from its queue
    Remove {
        entry_id: i64,
        /// Who is removing (staff id, or the student's own id)
        actor: String,
        /// Why: helped, self_removed, staff_removed, no_show
        removal_type: String,
    },
    /// Show the live queue
    Queue {
        queue_code: String,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Set or clear a queue announcement
    Announce {
        queue_code: String,
        /// Announcement text; omit to clear
        message: Option<String>,
    },
    /// Show a student's history across all queues
    History {
        student_id: String,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show aggregate statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    init_tracing(&config.log_level)?;

    let engine = QueueEngine::connect(config.database_url.expose_secret()).await?;

    match cli.command {
        Command::Join {
            queue_code,
            student_id,
        } => {
            let entry = engine.join(&queue_code, &student_id).await?;
            let position = engine.position(&queue_code, entry.id).await?;
            println!(
                "Joined: entry {} (queue {}, position {})",
                entry.id,
                entry.queue_code,
                position.map_or("-".to_string(), |p| p.to_string())
            );
        }
        Command::StartHelp { entry_id, staff_id } => {
            let entry = engine.start_help(EntryId(entry_id), &staff_id).await?;
            println!(
                "Helping: entry {} ({} helping {})",
                entry.id, staff_id, entry.student_id
            );
        }
        Command::Remove {
            entry_id,
            actor,
            removal_type,
        } => {
            let removal_type: RemovalType = removal_type.parse()?;
            let entry = engine.remove(EntryId(entry_id), &actor, removal_type).await?;
            println!("Removed: entry {} ({})", entry.id, removal_type);
        }
        Command::Queue { queue_code, json } => cmd_queue(&engine, &queue_code, json).await?,
        Command::Announce {
            queue_code,
            message,
        } => {
            engine.announce(&queue_code, message.as_deref()).await?;
            match message {
                Some(text) => println!("Announcement for {queue_code}: {text}"),
                None => println!("Announcement for {queue_code} cleared"),
            }
        }
        Command::History { student_id, json } => cmd_history(&engine, &student_id, json).await?,
        Command::Stats => cmd_stats(&engine).await?,
    }

    Ok(())
}

async fn cmd_queue(engine: &QueueEngine, queue_code: &str, json: bool) -> anyhow::Result<()> {
    let queue = engine.current_queue(queue_code).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&queue)?);
        return Ok(());
    }

    if let Some(message) = engine.announcement(queue_code).await? {
        println!("Announcement: {message}\n");
    }

    if queue.is_empty() {
        println!("Queue {queue_code} is empty.");
        return Ok(());
    }

    println!(
        "{:<4}  {:<16}  {:<12}  {:<19}  HELPER",
        "POS", "STUDENT", "STATE", "JOINED"
    );
    println!("{}", "-".repeat(70));

    for (i, entry) in queue.iter().enumerate() {
        println!(
            "{:<4}  {:<16}  {:<12}  {:<19}  {}",
            i + 1,
            entry.student_id,
            entry.state.to_string(),
            entry.time_in.format("%Y-%m-%d %H:%M:%S"),
            entry.help_started_by.as_deref().unwrap_or("-")
        );
    }

    println!("\n{} waiting or being helped", queue.len());
    Ok(())
}

async fn cmd_history(engine: &QueueEngine, student_id: &str, json: bool) -> anyhow::Result<()> {
    let history = engine.student_history(student_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history.entries)?);
        return Ok(());
    }

    println!(
        "{:<4}  {:<10}  {:<12}  {:<19}  {:<19}  {:<12}  REMOVED_BY",
        "#", "QUEUE", "STATE", "JOINED", "LEFT", "OUTCOME"
    );
    println!("{}", "-".repeat(100));

    for (i, entry) in history.entries.iter().enumerate() {
        println!(
            "{:<4}  {:<10}  {:<12}  {:<19}  {:<19}  {:<12}  {}",
            i + 1,
            entry.queue_code,
            entry.state.to_string(),
            entry.time_in.format("%Y-%m-%d %H:%M:%S"),
            entry
                .time_out
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
            entry
                .removal_type
                .map(|rt| rt.to_string())
                .unwrap_or_else(|| "-".to_string()),
            entry.removed_by.as_deref().unwrap_or("-")
        );
    }

    println!("\n{} times helped.", history.times_helped);
    Ok(())
}

async fn cmd_stats(engine: &QueueEngine) -> anyhow::Result<()> {
    let report = engine.stats().await?;

    println!("Overall");
    print_metrics(&report.overall);

    println!("\nToday");
    print_metrics(&report.today);

    if !report.week_day.is_empty() {
        println!("\nBy weekday (all weeks)");
        for (weekday, metrics) in &report.week_day {
            println!("  {weekday}");
            print_metrics(metrics);
        }
    }

    if !report.week_day_this_week.is_empty() {
        println!("\nBy weekday (this week)");
        for (weekday, metrics) in &report.week_day_this_week {
            println!("  {weekday}");
            print_metrics(metrics);
        }
    }

    if !report.week_number.is_empty() {
        println!("\nBy week");
        for (week, metrics) in &report.week_number {
            println!("  {}-W{:02}", week.year(), week.week());
            print_metrics(metrics);
        }
    }

    if !report.per_queue.is_empty() {
        println!("\nBy queue");
        for (queue_code, metrics) in &report.per_queue {
            println!("  {queue_code}");
            print_metrics(metrics);
        }
    }

    Ok(())
}

fn print_metrics(metrics: &Metrics) {
    println!(
        "    entries {:<6} helped {:<6} self-removed {:<6} staff-removed {:<6} no-shows {}",
        metrics.entries,
        metrics.helped,
        metrics.self_removed,
        metrics.staff_removed,
        metrics.no_shows
    );
    println!(
        "    avg wait {:<10} avg help {}",
        fmt_avg(metrics.avg_wait),
        fmt_avg(metrics.avg_help)
    );
}

fn fmt_avg(avg: Option<Duration>) -> String {
    match avg {
        Some(d) => format!("{}m{:02}s", d.num_minutes(), d.num_seconds() % 60),
        None => "-".to_string(),
    }
}
