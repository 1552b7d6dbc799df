//! Delve CLI - command-line interface for recursive deep research
//!
//! Asks clarifying questions, runs the research tree and writes a Markdown
//! report.

use clap::{Parser, Subcommand};
use delve_core::{
    config_error, init_logging, log_operation_start, log_operation_success, CancellationToken, Capabilities, DelveConfig, DelveError, DelveResult, ErrorContext,
};
use delve_providers::{FirecrawlSearch, SiumaiLanguageModel, TextChunker, TokenCounter};
use delve_research::{prompts, ResearchBudget, ResearchEngine};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const REDACTED: &str = "********";

#[derive(Parser)]
#[command(name = "delve")]
#[command(about = "Recursive deep research from the command line")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a topic and write a report
    Research {
        /// Research topic (asked interactively when omitted)
        topic: Option<String>,

        /// Queries planned at the first level
        #[arg(short, long)]
        breadth: Option<usize>,

        /// Rounds of follow-up research
        #[arg(short, long)]
        depth: Option<usize>,

        /// Report output file
        #[arg(short, long, default_value = "output.md")]
        output: PathBuf,

        /// Skip the clarifying questions
        #[arg(long)]
        no_feedback: bool,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> DelveResult<()> {
    let cli = Cli::parse();

    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let mut config = load_config(cli.config.as_deref())?;
    config.apply_env_overrides();

    let mut logging_config = config.logging.clone();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }
    init_logging(&logging_config).map_err(|e| DelveError::Config {
        message: format!("Failed to initialize logging: {}", e),
        source: Some(e),
        context: ErrorContext::new("cli")
            .with_operation("init_logging")
            .with_suggestion("Check logging configuration"),
    })?;

    info!("Starting Delve CLI v{}", env!("CARGO_PKG_VERSION"));

    let outcome = match cli.command {
        Commands::Research {
            topic,
            breadth,
            depth,
            output,
            no_feedback,
        } => handle_research(topic, breadth, depth, output, no_feedback, config).await,
        Commands::Config {
            show,
            init,
            validate,
        } => handle_config(show, init, validate, &config),
    };

    if let Err(e) = &outcome {
        e.log();
        for hint in misuse_hints(e) {
            eprintln!("💡 {}", hint);
        }
    }
    outcome
}

/// Recovery suggestions worth showing the user; collaborator failures have none
fn misuse_hints(error: &DelveError) -> &[String] {
    match error.context() {
        Some(context) if error.is_misuse() => context.recovery_suggestions.as_slice(),
        _ => &[],
    }
}

fn load_config(config_path: Option<&Path>) -> DelveResult<DelveConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        return DelveConfig::from_file(path);
    }

    let default_paths = [default_config_path(), Some(PathBuf::from("delve.toml"))];
    for path in default_paths.iter().flatten() {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return DelveConfig::from_file(path);
        }
    }

    info!("No configuration file found, using defaults");
    Ok(DelveConfig::default())
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
        .map(|d| d.join("delve").join("config.toml"))
}

async fn build_capabilities(config: &DelveConfig) -> DelveResult<Capabilities> {
    let llm = SiumaiLanguageModel::new(config.llm.clone()).await?;
    let search = FirecrawlSearch::new(&config.search)?;
    let tokenizer = TokenCounter::for_model_or_default(&config.tokenizer.model)?;

    Ok(Capabilities::new(
        Arc::new(llm),
        Arc::new(search),
        Arc::new(tokenizer),
        Arc::new(TextChunker::new()),
    ))
}

async fn handle_research(
    topic: Option<String>,
    breadth: Option<usize>,
    depth: Option<usize>,
    output: PathBuf,
    no_feedback: bool,
    config: DelveConfig,
) -> DelveResult<()> {
    log_operation_start!("research");

    let topic = match topic {
        Some(topic) => topic,
        None => ask("What would you like to research?")?,
    };
    if topic.trim().is_empty() {
        return Err(config_error!("A research topic is required", "cli"));
    }

    let defaults = &config.research;
    let budget = ResearchBudget {
        breadth: match breadth {
            Some(breadth) => breadth,
            None => ask_number(
                &format!(
                    "Enter research breadth (recommended 2-{}, default {}):",
                    defaults.max_breadth, defaults.default_breadth
                ),
                defaults.default_breadth,
            )?,
        },
        depth: match depth {
            Some(depth) => depth,
            None => ask_number(
                &format!(
                    "Enter research depth (recommended 1-{}, default {}):",
                    defaults.max_depth, defaults.default_depth
                ),
                defaults.default_depth,
            )?,
        },
    };

    println!("🤖 Initializing research engine...");
    let capabilities = build_capabilities(&config).await?;
    let engine = ResearchEngine::new(capabilities, config)?;

    let query = if no_feedback {
        topic
    } else {
        let questions = match engine.clarifying_questions(&topic).await {
            Ok(questions) => questions,
            Err(e) => {
                warn!(error = %e, "Could not generate clarifying questions");
                Vec::new()
            }
        };

        if !questions.is_empty() {
            println!("\nTo better understand your research needs, please answer these follow-up questions:");
        }
        let mut answers = Vec::with_capacity(questions.len());
        for question in questions {
            let answer = ask(&format!("\n{}", question))?;
            answers.push((question, answer));
        }
        prompts::combined_query(&topic, &answers)
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling research");
            on_interrupt.cancel();
        }
    });

    println!(
        "\n🔍 Researching (breadth {}, depth {})...",
        budget.breadth, budget.depth
    );
    let result = engine.research(&query, budget, &cancel).await?;

    println!("\n📚 Learnings:\n");
    for learning in &result.learnings {
        println!("{}", learning);
    }
    println!(
        "\n🔗 Visited URLs ({}):\n\n{}",
        result.visited_urls.len(),
        result.visited_urls.join("\n")
    );

    if cancel.is_cancelled() {
        println!("\n⚠️  Research was cancelled, no report written");
        return Ok(());
    }

    println!("\n📝 Writing final report...");
    let report = engine.write_report(&query, &result, &cancel).await?;

    tokio::fs::write(&output, report).await?;
    println!("\n✅ Report has been saved to {}", output.display());

    log_operation_success!(
        "research",
        learnings = result.learnings.len(),
        visited_urls = result.visited_urls.len()
    );
    Ok(())
}

fn handle_config(show: bool, init: bool, validate: bool, config: &DelveConfig) -> DelveResult<()> {
    if init {
        let config_path = default_config_path()
            .ok_or_else(|| config_error!("Could not determine a configuration directory", "cli"))?;

        DelveConfig::default().save_to_file(&config_path)?;
        println!("✅ Configuration initialized at: {:?}", config_path);
        println!("📝 Please edit the file to add your API keys and customize settings.");
    }

    if show {
        let rendered = toml::to_string_pretty(&redacted(config)).map_err(|e| DelveError::Config {
            message: format!("Failed to render configuration: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("cli").with_operation("show_config"),
        })?;
        println!("📋 Current configuration:");
        println!("{}", rendered);
    }

    if validate {
        match config.validate() {
            Ok(()) => println!("✅ Configuration is valid"),
            Err(e) => {
                println!("❌ Configuration validation failed: {}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Copy of `config` with API keys masked for display
fn redacted(config: &DelveConfig) -> DelveConfig {
    let mut shown = config.clone();
    for key in [&mut shown.llm.api_key, &mut shown.search.api_key] {
        if key.is_some() {
            *key = Some(REDACTED.to_string());
        }
    }
    shown
}

fn ask(prompt: &str) -> DelveResult<String> {
    print!("{} ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn ask_number(prompt: &str, default: usize) -> DelveResult<usize> {
    let answer = ask(prompt)?;
    Ok(answer.parse().unwrap_or(default))
}
