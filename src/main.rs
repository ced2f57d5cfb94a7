use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod gemini;
mod handler;
mod prompt;
mod render;
mod tui;
mod ui;

use app::App;
use config::Config;
use gemini::GeminiClient;
use prompt::Category;
use render::Segment;
use tui::AppEvent;

#[derive(Parser)]
#[command(name = "mathtutor")]
#[command(about = "Terminal math tutor with Gemini-powered step-by-step solutions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem once and print the formatted solution
    Solve {
        /// The math problem to solve
        problem: String,
        /// Problem category (see `mathtutor categories`)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List the available problem categories
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();

    match cli.command {
        Some(Commands::Solve { problem, category }) => {
            init_cli_logging();
            solve_once(&config, &problem, category.as_deref()).await?;
        }
        Some(Commands::Categories) => {
            println!("\n{}", "Problem categories".bold().blue());
            for category in Category::all() {
                println!("  • {}", category.as_str().green());
            }
        }
        None => run_tui(config).await?,
    }

    Ok(())
}

fn init_cli_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// TUI mode logs to a file so nothing bleeds into the alternate screen.
fn init_tui_logging() -> Result<()> {
    let dir = Config::data_dir()?;
    std::fs::create_dir_all(&dir)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("mathtutor.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_client(config: &Config) -> Option<GeminiClient> {
    config
        .resolve_api_key()
        .map(|key| GeminiClient::new(&key, &config.model()))
}

async fn solve_once(config: &Config, problem: &str, category: Option<&str>) -> Result<()> {
    let problem = problem.trim();
    if problem.is_empty() {
        println!("{}", "Nothing to solve: the problem text is empty".yellow());
        return Ok(());
    }

    let category = match category {
        Some(s) => Some(Category::from_str(s).ok_or_else(|| {
            anyhow!(
                "unknown category '{}' (try one of: {})",
                s,
                Category::all()
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?),
        None => None,
    };

    let client = build_client(config)
        .ok_or_else(|| anyhow!("no API key: set GEMINI_API_KEY or add api_key to the config file"))?;

    let prompt = prompt::build_solver_prompt(problem, category);

    println!(
        "🤖 Asking {} to solve your problem...\n",
        client.model().bold().magenta()
    );

    match client.query(&prompt).await {
        Ok(response) => print_solution(&render::render(&response)),
        Err(e) => {
            tracing::error!(error = %e, "solver request failed");
            println!("{}", app::SOLVER_FALLBACK.red());
        }
    }

    Ok(())
}

fn print_solution(segments: &[Segment]) {
    let mut step_no = 0u32;
    for segment in segments {
        match segment {
            Segment::Step(text) => {
                step_no += 1;
                println!("{} {}", format!("Step {}:", step_no).bold().cyan(), text);
            }
            Segment::Answer(text) => {
                println!("\n{} {}", "Final Answer:".bold().on_yellow().black(), text.bold());
            }
            Segment::Paragraph(text) => println!("{}", text),
        }
    }
}

async fn run_tui(config: Config) -> Result<()> {
    init_tui_logging()?;
    tui::install_panic_hook();

    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(build_client(&config));

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        let is_tick = matches!(event, AppEvent::Tick);
        handler::handle_event(&mut app, event)?;
        if is_tick {
            handler::poll_tasks(&mut app).await;
        }
    }

    tui::restore()?;
    Ok(())
}
