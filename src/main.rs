//! Subline CLI - Email subject line scoring
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use std::io::IsTerminal;
use std::path::PathBuf;
use subline::config::Target;
use subline::session::{parse_row, Panel};
use subline::{agent, logging, prompt, store, ui, Config, PanelId, ResponseFormat, Session};

#[derive(Parser)]
#[command(name = "subline")]
#[command(author, version, about = "TUI for scoring and classifying email subject lines", long_about = None)]
struct Cli {
    /// Path to subline.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score and classify a subject line, then optionally save one result
    Analyze {
        /// Email subject line
        subject: String,
        /// Reply format requested from the model
        #[arg(long, value_enum)]
        format: Option<ResponseFormat>,
        /// Where a saved result goes
        #[arg(long, value_enum)]
        target: Option<Target>,
        /// Spreadsheet row to write (sheet target)
        #[arg(long)]
        row: Option<u32>,
        /// Print the results without offering to save
        #[arg(long)]
        no_save: bool,
    },
    /// Print the prompt sent to the model
    Prompt {
        /// Email subject line
        subject: String,
        #[arg(long, value_enum)]
        format: Option<ResponseFormat>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Some(Commands::Analyze {
            subject,
            format,
            target,
            row,
            no_save,
        }) => {
            logging::init_stderr();
            let format = format.unwrap_or(config.agent.format);
            let target = target.unwrap_or(config.store.target);

            let generator = agent::build_generator(&config)?;
            println!("Analyzing with {}...\n", generator.describe());

            let mut session = Session::new();
            session.analyze(generator.as_ref(), &subject, format).await?;

            for id in PanelId::BOTH {
                if let Some(panel) = session.panel(id) {
                    print_panel(id, panel);
                }
            }

            if no_save || !std::io::stdin().is_terminal() {
                return Ok(());
            }
            save_interactively(&config, &session, target, row).await?;
        }
        Some(Commands::Prompt { subject, format }) => {
            let format = format.unwrap_or(config.agent.format);
            println!("{}", prompt::build_prompt(&subject, format));
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "subline", &mut std::io::stdout());
        }
        None => {
            // Default: Launch the TUI
            let _guard = logging::init_file(&config.logging.dir)?;
            ui::run(config).await?;
        }
    }

    Ok(())
}

fn print_panel(id: PanelId, panel: &Panel) {
    println!("{}", format!("=== {id} ===").bold());
    println!("{}", panel.raw.dimmed());
    match &panel.parsed {
        Ok(analysis) => {
            println!("  {} {}", "Score:".bold(), analysis.score);
            println!("  {} {}", "Template:".bold(), analysis.template);
            println!("  {} {}", "Category:".bold(), analysis.category);
        }
        Err(e) => println!("  {}", format!("Cannot use this result: {e}").red()),
    }
    println!();
}

async fn save_interactively(
    config: &Config,
    session: &Session,
    target: Target,
    row: Option<u32>,
) -> anyhow::Result<()> {
    let theme = ColorfulTheme::default();
    let destination = match target {
        Target::Sheet => "Google Sheets",
        Target::Database => "the database",
    };
    let items = vec![
        format!("Add Result 1 to {destination}"),
        format!("Add Result 2 to {destination}"),
        "Discard".to_string(),
    ];

    let choice = Select::with_theme(&theme)
        .with_prompt("Save a result?")
        .items(&items)
        .default(0)
        .interact()?;
    let id = match choice {
        0 => PanelId::First,
        1 => PanelId::Second,
        _ => return Ok(()),
    };

    let row = match (target, row) {
        (Target::Database, _) => 0,
        (Target::Sheet, Some(row)) => row,
        (Target::Sheet, None) => {
            let text = Input::<String>::with_theme(&theme)
                .with_prompt("Row to edit")
                .interact_text()?;
            parse_row(&text)?
        }
    };

    let sink = store::build_sink(config, target, row)?;
    match session.save(id, sink.as_ref()).await {
        Ok(message) => println!("{}", message.green()),
        Err(e) => println!("{}", e.to_string().red()),
    }
    Ok(())
}
