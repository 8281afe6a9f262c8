//! speechrag CLI
//!
//! - `init`: build (or reuse) the index for the configured document
//! - `status`: print the service status as JSON
//! - `ask <question>`: answer one question
//! - `chat`: interactive question loop

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use speechrag_core::config::Config;
use speechrag_service::{AskResponse, ServiceLifecycle, ServiceStatus};

#[derive(Parser)]
#[command(name = "speechrag")]
#[command(about = "Ask questions about a speech using retrieval-augmented generation")]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the document and build or load the index
    Init,
    /// Show whether the service, document and index are available
    Status,
    /// Answer a single question
    Ask {
        question: String,
        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
        /// Print the retrieved passages after the answer
        #[arg(long)]
        show_sources: bool,
    },
    /// Interactive loop; `exit`, `quit` or `q` leaves
    Chat {
        #[arg(long)]
        show_sources: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    let config = Config::load_from(&cli.config_dir).map_err(|e| {
        error!(error = %e, "failed to load configuration");
        e
    })?;
    let mut settings = config.settings()?;

    match cli.command {
        Commands::Init => {
            settings.index.show_progress = true;
            let service = ServiceLifecycle::from_settings(settings)?;
            let outcome = service.initialize().await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        // A fresh process has initialized nothing, so report from disk only.
        Commands::Status => {
            println!("{}", serde_json::to_string_pretty(&ServiceStatus::from_settings(&settings))?);
        }
        Commands::Ask { question, json, show_sources } => {
            let service = ServiceLifecycle::from_settings(settings)?;
            let resp = service.ask(&question).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                print_answer(&resp, show_sources);
            }
        }
        Commands::Chat { show_sources } => {
            let service = ServiceLifecycle::from_settings(settings)?;
            chat(&service, show_sources).await?
        }
    }
    Ok(())
}

fn print_answer(resp: &AskResponse, show_sources: bool) {
    println!("\n{}\n", resp.answer.trim());
    if show_sources {
        println!("Sources ({}):", resp.sources_count);
        for (i, source) in resp.sources.iter().enumerate() {
            println!("  [{}] {}", i + 1, source.content);
        }
        println!();
    }
}

async fn chat(service: &ServiceLifecycle, show_sources: bool) -> anyhow::Result<()> {
    service.initialize().await?;
    println!("Ask a question about the speech. Type 'exit', 'quit' or 'q' to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"\nQuestion: ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else { break };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit" | "q") {
            break;
        }
        match service.ask(question).await {
            Ok(resp) => print_answer(&resp, show_sources),
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    println!("Goodbye!");
    Ok(())
}
