//! Cycling Predictor CLI - pick a race, get win probabilities

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cycling_predictor::controller::{AdminCapability, SelectionController, SelectionState, TOP_N};
use cycling_predictor::{build_controller, Backend, ClientConfig, PredictorError, RankedResult};

type Controller = SelectionController<Backend>;

#[derive(Parser)]
#[command(name = "cycling-predictor")]
#[command(author, version, about = "Cycling race win-probability client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run in interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Base URL of the prediction service
    #[arg(long, env = "PREDICTOR_API_URL")]
    api_url: Option<String>,

    /// Deployment type: devops, mlops or offline
    #[arg(short, long, env = "PREDICTOR_DEPLOYMENT_TYPE")]
    deployment: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "PREDICTOR_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Seed for the offline synthetic backend
    #[arg(long)]
    seed: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available races
    Races,

    /// Predict a race (or one of its stages)
    Predict {
        /// Race name, e.g. "Tour de France"
        #[arg(short, long)]
        race: String,

        /// Stage number for multi-stage races
        #[arg(short, long)]
        stage: Option<u32>,

        /// Show all cyclists instead of the top 10
        #[arg(long)]
        all: bool,

        /// Print the session state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask the service to redeploy its model (mlops only)
    Redeploy {
        /// Catalog index to redeploy
        #[arg(long)]
        index: i64,
    },
}

/// JSON output of `predict --json`
#[derive(Serialize)]
struct Snapshot<'a> {
    fetched_at: DateTime<Utc>,
    deployment: &'a str,
    state: &'a SelectionState,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so tables and JSON stay clean
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::INFO } else { Level::WARN })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = resolve_config(&cli)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let mut controller =
        build_controller(&config, cli.seed).context("Failed to set up prediction session")?;

    let json_output = matches!(cli.command, Some(Commands::Predict { json: true, .. }));
    if !json_output {
        println!(
            "{}",
            format!("Cycling Race Predictor v{}", env!("CARGO_PKG_VERSION"))
                .cyan()
                .bold()
        );
        println!("Deployment: {} ({})", config.deployment.as_str(), config.base_url);
        println!();
    }

    if cli.interactive {
        run_interactive(&rt, &mut controller)?;
    } else if let Some(command) = cli.command {
        match command {
            Commands::Races => list_races(&rt, &mut controller)?,
            Commands::Predict {
                race,
                stage,
                all,
                json,
            } => {
                predict_race(&rt, &mut controller, &race, stage, all, json, &config)?;
            }
            Commands::Redeploy { index } => run_redeploy(&rt, &mut controller, index)?,
        }
    } else {
        println!("Use --help for usage information or --interactive for interactive mode.");
    }

    Ok(())
}

/// Environment first, flags on top
fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("Invalid environment configuration")?;

    if let Some(url) = &cli.api_url {
        config.base_url = url.clone();
    }
    if let Some(kind) = &cli.deployment {
        config.deployment = kind.parse()?;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }

    config.validate()?;
    Ok(config)
}

/// Run a controller action behind a spinner
fn with_spinner<T>(rt: &Runtime, message: &str, fut: impl Future<Output = T>) -> T {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = rt.block_on(fut);

    pb.finish_and_clear();
    result
}

/// Only the user-facing message leaves the process; details are in the logs
fn report(err: PredictorError) -> anyhow::Error {
    anyhow::anyhow!(err.user_message())
}

fn load_catalog(rt: &Runtime, controller: &mut Controller) -> Result<()> {
    with_spinner(rt, "Loading races...", controller.load_catalog()).map_err(report)
}

fn list_races(rt: &Runtime, controller: &mut Controller) -> Result<()> {
    load_catalog(rt, controller)?;
    let catalog = controller.catalog();

    if catalog.is_empty() {
        println!("{}", "No races available.".yellow());
        return Ok(());
    }

    println!("{}", "Races:".yellow().bold());
    println!("{:>4} {:<32} {:>8} {:>8}", "#", "Race", "Index", "Stages");
    println!("{}", "-".repeat(56));

    for (i, name) in catalog.race_names().iter().enumerate() {
        let index = catalog
            .first_entry(name)
            .map(|e| e.index.to_string())
            .unwrap_or_else(|| "-".to_string());
        let stages = match catalog.stage_count(name) {
            0 => "one day".to_string(),
            n => n.to_string(),
        };
        println!(
            "{:>4} {:<32} {:>8} {:>8}",
            i + 1,
            truncate_name(name, 32),
            index,
            stages
        );
    }

    println!();
    println!(
        "Total: {} races, {} catalog entries",
        catalog.race_names().len(),
        catalog.len()
    );
    Ok(())
}

fn predict_race(
    rt: &Runtime,
    controller: &mut Controller,
    race: &str,
    stage: Option<u32>,
    all: bool,
    json: bool,
    config: &ClientConfig,
) -> Result<()> {
    load_catalog(rt, controller)?;

    match stage {
        Some(n) => {
            with_spinner(
                rt,
                "Loading predictions...",
                controller.select_race_stage(race, n),
            )
            .map_err(report)?;
            if controller.state().stages.is_empty() {
                eprintln!(
                    "{}",
                    format!("{} is a one-day race; ignoring --stage", race).yellow()
                );
            }
        }
        None => {
            with_spinner(
                rt,
                "Loading predictions...",
                controller.select_race_by_name(race),
            )
            .map_err(report)?;
        }
    }

    if all {
        controller.toggle_show_all();
    }

    if json {
        let snapshot = Snapshot {
            fetched_at: Utc::now(),
            deployment: config.deployment.as_str(),
            state: controller.state(),
        };
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_selection(controller);
    }

    Ok(())
}

fn run_redeploy(rt: &Runtime, controller: &mut Controller, index: i64) -> Result<()> {
    if controller.admin() == AdminCapability::Disabled {
        return Err(report(PredictorError::AdminUnavailable));
    }
    load_catalog(rt, controller)?;

    let response = with_spinner(rt, "Redeploying model...", controller.redeploy(index))
        .map_err(report)?;

    println!(
        "{}: {}",
        "Redeployed".green(),
        response.message.as_deref().unwrap_or("ok")
    );
    println!("Catalog reloaded: {} entries", controller.catalog().len());
    Ok(())
}

fn print_selection(controller: &Controller) {
    let state = controller.state();

    if let Some(race) = &state.selected_race {
        if state.stages.is_empty() {
            println!("{}: {}", "Race".green(), race.name);
        } else {
            println!(
                "{}: {} / {} (of {})",
                "Race".green(),
                race.name,
                state.selected_stage,
                state.stages.len()
            );
        }
        println!();
    }

    if let Some(message) = &state.error_message {
        println!("{}", message.red());
        println!();
    }

    if state.selected_race.is_some() && !state.results.is_empty() && !state.is_loading {
        print_results(controller.visible_results(), state.results.len());
    }
}

fn print_results(rows: &[RankedResult], total: usize) {
    println!("{}", "Cyclists:".yellow().bold());
    println!("{:>4}  {:<28} {:>14}", "Rank", "Cyclist", "Win Likelihood");
    println!("{}", "-".repeat(50));

    for row in rows {
        let score = format!("{}%", row.score);
        let score = if row.rank == 1 {
            score.green().bold()
        } else {
            score.normal()
        };
        println!(
            "{:>4}  {:<28} {:>14}",
            row.rank,
            truncate_name(&row.name, 28),
            score
        );
    }

    if rows.len() < total {
        println!(
            "{}",
            format!("Showing top {} of {} (use --all to show everyone)", TOP_N, total).dimmed()
        );
    }
    println!();
}

fn run_interactive(rt: &Runtime, controller: &mut Controller) -> Result<()> {
    println!("{}", "Interactive mode".green().bold());
    println!();

    let theme = ColorfulTheme::default();

    // A catalog failure leaves the session usable
    if load_catalog(rt, controller).is_err() {
        print_selection(controller);
    }

    loop {
        let mut actions: Vec<(&str, Action)> = vec![("Select a race", Action::Race)];
        if !controller.state().stages.is_empty() {
            actions.push(("Select a stage", Action::Stage));
        }
        if !controller.state().results.is_empty() {
            let label = if controller.state().show_all {
                "Show top 10"
            } else {
                "Show all"
            };
            actions.push((label, Action::ToggleAll));
        }
        if controller.admin() == AdminCapability::Enabled {
            actions.push(("Redeploy model", Action::Redeploy));
        }
        if controller.catalog().is_empty() {
            actions.push(("Reload races", Action::Reload));
        }
        actions.push(("Quit", Action::Quit));

        let labels: Vec<&str> = actions.iter().map(|(label, _)| *label).collect();
        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        match actions[selection].1 {
            Action::Race => {
                let names: Vec<String> = controller
                    .catalog()
                    .race_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                if names.is_empty() {
                    println!("{}", "No races available.".yellow());
                    continue;
                }
                let pick = Select::with_theme(&theme)
                    .with_prompt("Select a race")
                    .items(&names)
                    .default(0)
                    .interact()?;

                let _ = with_spinner(
                    rt,
                    "Loading predictions...",
                    controller.select_race_by_name(&names[pick]),
                );
            }
            Action::Stage => {
                let stages = controller.state().stages.clone();
                let current = stages
                    .iter()
                    .position(|s| *s == controller.state().selected_stage)
                    .unwrap_or(0);
                let pick = Select::with_theme(&theme)
                    .with_prompt("Select stage")
                    .items(&stages)
                    .default(current)
                    .interact()?;

                let _ = with_spinner(
                    rt,
                    "Loading predictions...",
                    controller.select_stage(&stages[pick]),
                );
            }
            Action::ToggleAll => controller.toggle_show_all(),
            Action::Redeploy => {
                let default_index = controller
                    .state()
                    .selected_race
                    .as_ref()
                    .map(|r| r.index)
                    .unwrap_or(0);
                let index: i64 = Input::with_theme(&theme)
                    .with_prompt("Catalog index to redeploy")
                    .default(default_index)
                    .interact_text()?;

                match with_spinner(rt, "Redeploying model...", controller.redeploy(index)) {
                    Ok(response) => println!(
                        "{}: {}",
                        "Redeployed".green(),
                        response.message.as_deref().unwrap_or("ok")
                    ),
                    Err(PredictorError::CatalogLoad(_)) => {}
                    Err(e) => println!("{}", e.user_message().red()),
                }
            }
            Action::Reload => {
                let _ = load_catalog(rt, controller);
            }
            Action::Quit => {
                println!("Goodbye!");
                break;
            }
        }

        println!();
        print_selection(controller);
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum Action {
    Race,
    Stage,
    ToggleAll,
    Redeploy,
    Reload,
    Quit,
}

/// Truncate name to fit display width
fn truncate_name(name: &str, max_len: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_len {
        name.to_string()
    } else {
        chars[..max_len - 1].iter().collect::<String>() + "…"
    }
}
