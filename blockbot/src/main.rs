//! Block-programming robot puzzles on the command line.
//!
//! Levels come from a JSON pack (a built-in pack ships with the binary);
//! programs are JSON files holding a command tree and a function library.

use std::io::stdout;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use blockbot::exit_codes;
use blockbot::io::config::{DEFAULT_CONFIG_FILE, load_config};
use blockbot::io::level_store::load_level_pack_or_default;
use blockbot::io::pacing::PacedObserver;
use blockbot::io::program_store::load_program;
use blockbot::io::progress::load_progress;
use blockbot::level::Level;
use blockbot::logging;
use blockbot::play::{PlayOutcome, play_level};
use blockbot::validate::validate_inputs;

#[derive(Parser)]
#[command(
    name = "blockbot",
    version,
    about = "Run block programs against grid-robot levels"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the levels of a pack.
    Levels {
        /// Level pack JSON (defaults to the built-in pack).
        #[arg(long)]
        pack: Option<PathBuf>,
        /// Mark levels already solved according to this progress file.
        #[arg(long)]
        progress: Option<PathBuf>,
        /// Also print each level's description, tutorial and hints.
        #[arg(short, long)]
        verbose: bool,
    },
    /// Check a level pack and, optionally, a program file.
    Validate {
        #[arg(long)]
        pack: Option<PathBuf>,
        #[arg(long)]
        program: Option<PathBuf>,
        /// Also check the program only uses commands this level allows.
        #[arg(long)]
        level: Option<String>,
    },
    /// Run a program on one level.
    Run {
        #[arg(long)]
        level: String,
        #[arg(long)]
        program: PathBuf,
        #[arg(long)]
        pack: Option<PathBuf>,
        /// Config TOML (defaults to `blockbot.toml` in the working directory).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Progress file to update on a win (overrides the config value).
        #[arg(long)]
        progress: Option<PathBuf>,
        /// Skip the delay between executed blocks.
        #[arg(long)]
        no_pacing: bool,
        /// Print the outcome as JSON instead of trace lines.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    logging::init();
    let code = match dispatch(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Levels {
            pack,
            progress,
            verbose,
        } => cmd_levels(pack.as_deref(), progress.as_deref(), verbose),
        Command::Validate {
            pack,
            program,
            level,
        } => cmd_validate(pack.as_deref(), program.as_deref(), level.as_deref()),
        Command::Run {
            level,
            program,
            pack,
            config,
            progress,
            no_pacing,
            json,
        } => cmd_run(RunArgs {
            level,
            program,
            pack,
            config,
            progress,
            no_pacing,
            json,
        }),
    }
}

fn cmd_levels(pack: Option<&Path>, progress: Option<&Path>, verbose: bool) -> Result<i32> {
    let pack = load_level_pack_or_default(pack)?;
    let progress = match progress {
        Some(path) => Some(load_progress(path)?),
        None => None,
    };
    for level in &pack.levels {
        let solved = progress
            .as_ref()
            .is_some_and(|progress| progress.is_completed(&level.id));
        let mark = if solved { "x" } else { " " };
        let allowed: Vec<&str> = level.allowed_commands.iter().map(|kind| kind.label()).collect();
        println!(
            "[{mark}] {}\t{}\t{}x{}\t{}",
            level.id,
            level.name,
            level.width,
            level.height,
            allowed.join(",")
        );
        if verbose {
            print_level_details(level);
        }
    }
    Ok(exit_codes::OK)
}

fn print_level_details(level: &Level) {
    if !level.description.is_empty() {
        println!("    {}", level.description);
    }
    if let Some(tutorial) = &level.tutorial {
        println!("    Tutorial: {tutorial}");
    }
    for hint in &level.hints {
        println!("    Hint: {hint}");
    }
}

fn cmd_validate(pack: Option<&Path>, program: Option<&Path>, level: Option<&str>) -> Result<i32> {
    let outcome = validate_inputs(pack, program, level)?;
    println!("levels: {}", outcome.levels);
    if let Some(program) = outcome.program {
        println!(
            "program: {} commands, {} functions",
            program.commands, program.functions
        );
    }
    Ok(exit_codes::OK)
}

struct RunArgs {
    level: String,
    program: PathBuf,
    pack: Option<PathBuf>,
    config: Option<PathBuf>,
    progress: Option<PathBuf>,
    no_pacing: bool,
    json: bool,
}

fn cmd_run(args: RunArgs) -> Result<i32> {
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = load_config(&config_path)?;
    let pack = load_level_pack_or_default(args.pack.as_deref())?;
    let program = load_program(&args.program)?;
    let progress_path = args.progress.or_else(|| config.progress_path.clone());

    let delay = if args.no_pacing {
        Duration::ZERO
    } else {
        config.pacing()
    };
    let mut observer = PacedObserver::new(delay, (!args.json).then(stdout));

    let outcome = play_level(
        &pack,
        &args.level,
        program,
        &config,
        progress_path.as_deref(),
        &mut observer,
    )?;

    if args.json {
        let payload = serde_json::to_string_pretty(&outcome).context("serialize outcome")?;
        println!("{payload}");
    } else {
        print_outcome(&outcome);
    }

    if outcome.won() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::NOT_WON)
    }
}

fn print_outcome(outcome: &PlayOutcome) {
    println!("{}", outcome.result.message);
    if let Some(id) = &outcome.result.failed_command_id {
        println!("Failed at block '{id}'");
    }
    if outcome.new_best {
        println!("New best for '{}'!", outcome.level_id);
    }
    if let Some(next) = &outcome.next_level {
        println!("Next level: {next}");
    } else if outcome.won() {
        println!("All levels complete!");
    }
}
