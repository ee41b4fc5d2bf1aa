use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use tokio::net::TcpListener;

mod config;
mod error;
mod event_bus;
mod language;
mod llm_manager;
mod logger;
mod models;
mod pipeline;
mod prompt;
mod providers;
mod ui;
mod web;

use config::Config;
use event_bus::EventBus;
use language::LanguagePolicy;
use llm_manager::LLMManager;
use pipeline::Pipeline;
use providers::ProviderKind;
use ui::TerminalUI;

const DEFAULT_TASK: &str = "sort a list of numbers";
const DEFAULT_LANGUAGE: &str = "python";

#[derive(Parser, Debug)]
#[command(name = "pairgen", about = "Generate code and tests using a hosted LLM")]
struct Args {
    /// Task description
    #[arg(long, default_value = DEFAULT_TASK)]
    task: String,
    /// Programming language
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    language: String,
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
    /// Backend to use (gemini, openai, anthropic, openrouter)
    #[arg(long)]
    provider: Option<ProviderKind>,
    /// Model name for the selected backend
    #[arg(long)]
    model: Option<String>,
    /// Print the generated code even when test generation fails
    #[arg(long)]
    show_partial: bool,
    /// Run without spinner or colors
    #[arg(long)]
    headless: bool,
    /// Verbose logging (repeat for debug output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the browser form
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    logger::init(args.verbose);
    if dotenv::dotenv().is_ok() {
        info!("Loaded environment from .env");
    }

    let mut config = Config::load(&args.config)?;
    config.merge_with_args(args.headless, args.provider, args.model.clone());
    let policy = LanguagePolicy::from_config(&config.generation);

    match &args.command {
        Some(Commands::Serve { bind, port }) => {
            let llm = LLMManager::from_config(&config)?
                .with_event_bus(Arc::new(EventBus::new(256)));
            info!("Using {} model {}", llm.provider().name(), llm.provider().model_name());
            let bind = bind.clone().unwrap_or_else(|| config.server.bind.clone());
            let port = port.unwrap_or(config.server.port);
            let addr = SocketAddr::new(
                bind.parse().with_context(|| format!("Invalid bind address: {bind}"))?,
                port,
            );

            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            eprintln!("pairgen listening on http://{addr}");

            let state = Arc::new(web::InnerAppState { llm, policy });
            web::serve(listener, state).await?;
            Ok(ExitCode::SUCCESS)
        }
        None => match LLMManager::from_config(&config) {
            Ok(llm) => Ok(generate_once(&args, &config, &policy, llm).await),
            Err(e) => {
                TerminalUI::new(&config.ui).print_error(&e.to_string());
                Ok(ExitCode::FAILURE)
            }
        },
    }
}

/// One CLI run: prints code and test, or `Error: ...` and a failing status.
async fn generate_once(
    args: &Args,
    config: &Config,
    policy: &LanguagePolicy,
    llm: LLMManager,
) -> ExitCode {
    let ui = TerminalUI::new(&config.ui);

    let request = match policy.validate(&args.language, &args.task) {
        Ok(request) => request,
        Err(e) => {
            ui.print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let bus = Arc::new(EventBus::new(64));
    let llm = llm.with_event_bus(bus.clone());

    info!("Using {} model {}", llm.provider().name(), llm.provider().model_name());
    ui.start(&bus);
    let staged = Pipeline::new(&llm).run_staged(&request).await;
    ui.finish();
    if let Some(stage) = staged.failed_stage() {
        info!("Stopped during {}", stage);
    }

    let (partial_code, result) = staged.into_partial();
    let metrics = bus.get_metrics().await;
    info!(
        "{} API calls, {} tokens, ${:.4}",
        metrics.total_api_calls, metrics.total_tokens, metrics.total_cost
    );

    match result {
        Ok(result) => {
            ui.print_result(&result);
            ExitCode::SUCCESS
        }
        Err(e) => {
            if args.show_partial {
                if let Some(code) = partial_code {
                    ui.print_partial_code(&code);
                }
            }
            ui.print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
