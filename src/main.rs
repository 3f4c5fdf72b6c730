use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

use shepherd::domain::{HaltStatus, LoopState, Phase};
use shepherd::storage::StateDir;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shepherd")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("shepherd.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let state_dir = StateDir::new(&config.storage.state_dir);

    match &cli.command {
        Commands::List { active, mode } => handle_list_command(&state_dir, *active, mode.as_deref()),
        Commands::Status { id, detailed } => handle_status_command(&state_dir, id, *detailed),
        Commands::Progress { id } => handle_progress_command(&state_dir, id),
    }
}

fn find_loop(state_dir: &StateDir, id: &str) -> Result<LoopState> {
    // Accept a loop id first, then fall back to treating `id` as a session
    if let Some(state) = state_dir.load(id)? {
        return Ok(state);
    }
    if let Some(state) = state_dir.find_by_session(id)? {
        return Ok(state);
    }
    Err(eyre!("no loop found for '{}'", id))
}

fn handle_list_command(state_dir: &StateDir, active_only: bool, mode: Option<&str>) -> Result<()> {
    let states = state_dir.scan()?;

    let mut shown = 0;
    for state in states {
        if active_only && !state.is_active() {
            continue;
        }
        let mode_name = match &state {
            LoopState::Ralph(_) => "ralph",
            LoopState::Lisa(_) => "lisa",
        };
        if let Some(wanted) = mode
            && wanted != mode_name
        {
            continue;
        }

        println!(
            "{}  {}  {}  {}",
            state.loop_id().bold(),
            format!("{:5}", mode_name).cyan(),
            format_status(&state),
            state.session_id().dimmed(),
        );
        shown += 1;
    }

    if shown == 0 {
        println!("{}", "No loops found".dimmed());
    }
    Ok(())
}

fn handle_status_command(state_dir: &StateDir, id: &str, detailed: bool) -> Result<()> {
    let state = find_loop(state_dir, id)?;

    match &state {
        LoopState::Ralph(ralph) => {
            println!("{} {}", "Ralph loop".bold(), ralph.id);
            println!("  session:    {}", ralph.session_id);
            println!("  status:     {}", format_status(&state));
            println!("  iteration:  {} / {}", ralph.current_iteration, ralph.max_iterations);
            println!("  evidence:   {}", if ralph.require_evidence { "required" } else { "not required" });
            println!("  started:    {}", format_ms(ralph.started_at));
            if let Some(at) = ralph.halted_at {
                println!("  halted:     {}", format_ms(at));
            }
            if detailed {
                println!("  task:       {}", ralph.original_prompt);
                println!("  state file: {}", ralph.state_file.display());
                println!("  progress:   {}", ralph.progress_file.display());
            }
        }
        LoopState::Lisa(lisa) => {
            println!("{} {}", "Lisa workflow".bold(), lisa.id);
            println!("  session:    {}", lisa.session_id);
            println!("  status:     {}", format_status(&state));
            println!("  phase:      {}", lisa.current_phase.to_string().bold());
            println!("  started:    {}", format_ms(lisa.started_at));

            print!("  visits:     ");
            let counts = Phase::ALL
                .iter()
                .map(|p| format!("{} {}", p.as_str(), lisa.visit_count(*p)))
                .collect::<Vec<_>>()
                .join(", ");
            println!("{}", counts);

            if detailed {
                println!("  task:       {}", lisa.original_prompt);
                println!("  history:");
                for visit in &lisa.phase_history {
                    println!(
                        "    {}  {} (visit {})",
                        format_ms(visit.timestamp).dimmed(),
                        visit.phase,
                        visit.visit_index
                    );
                }
            }
        }
    }
    Ok(())
}

fn handle_progress_command(state_dir: &StateDir, id: &str) -> Result<()> {
    let state = find_loop(state_dir, id)?;
    let path = state.progress_file();

    let content = fs::read_to_string(path)
        .context(format!("Failed to read progress log {}", path.display()))?;
    print!("{}", content);
    Ok(())
}

fn format_status(state: &LoopState) -> ColoredString {
    match (state.is_active(), state.halted()) {
        (true, _) => "active".green(),
        (false, Some(HaltStatus::Complete)) => "complete".green(),
        (false, Some(HaltStatus::Incomplete)) => "incomplete".yellow(),
        (false, Some(HaltStatus::Aborted)) => "aborted".yellow(),
        (false, Some(HaltStatus::Error)) => "error".red(),
        (false, None) => "halted".dimmed(),
    }
}

fn format_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn main() -> Result<()> {
    setup_logging()?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref())?;

    run_application(&cli, &config)
}
