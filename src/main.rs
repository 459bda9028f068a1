use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gap_hunter::config::LogFormat;
use gap_hunter::llm::ProviderState;
use gap_hunter::{
    Config, ConfigOverrides, GapHunter, HuntOutcome, HuntReport, LlmDispatcher, ProviderRegistry,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Find recent literature on a research topic and drive text generation
/// across several LLM providers
#[derive(Parser, Debug)]
#[command(name = "gap-hunter")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Records requested from each primary source
    #[arg(long, global = true)]
    limit: Option<u32>,

    /// Never escalate to the web-search fallback
    #[arg(long, global = true)]
    no_web_fallback: bool,

    /// LLM provider registry file
    #[arg(long, global = true)]
    providers_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieve and curate recent papers on a topic
    Hunt {
        query: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Strip stop words, query sources concurrently and drop duplicate titles
        #[arg(long)]
        optimized: bool,
    },
    /// Generate text, failing over between configured providers
    Generate {
        prompt: String,

        #[arg(long, default_value = "")]
        system: String,

        /// Provider tried first
        #[arg(long)]
        provider: Option<String>,
    },
    /// List declared LLM providers and whether they have credentials
    Providers {
        /// Make this provider (and its model) the saved default
        #[arg(long, value_names = ["PROVIDER", "MODEL"], num_args = 2)]
        set_default: Option<Vec<String>>,
    },
    /// Validate the configuration and report missing credentials
    CheckConfig,
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.compact().init(),
    }
}

fn print_report(report: &HuntReport) {
    match report.outcome {
        HuntOutcome::AllSourcesUnavailable => {
            println!("No sources could be reached for '{}'.", report.query);
            return;
        }
        HuntOutcome::NoRelevantResults => {
            println!("No relevant recent papers found for '{}'.", report.query);
            return;
        }
        HuntOutcome::Papers => {}
    }

    println!("Papers for '{}':", report.query);
    for (index, paper) in report.papers.iter().enumerate() {
        let record = &paper.record;
        let marker = if paper.q1 { " [Q1]" } else { "" };
        println!(
            "{:>2}. {} ({}) - {}{}",
            index + 1,
            record.title,
            record.year,
            record.first_author,
            marker
        );
        if !record.journal_name.is_empty() {
            println!("    {}", record.journal_name);
        }
        if let Some(doi) = &record.doi {
            println!("    https://doi.org/{doi}");
        }
    }

    let sources = report
        .per_source
        .iter()
        .map(|s| format!("{}={}", s.source, s.count))
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "\n{} of {} records kept in {} ms ({}; {} source failures)",
        report.papers.len(),
        report.retrieved,
        report.elapsed_ms,
        sources,
        report.api_failures
    );
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Command::Hunt {
            query,
            json,
            optimized,
        } => {
            let hunter = GapHunter::from_config(&config)?;
            let report = if optimized {
                hunter.hunt_optimized(&query).await?
            } else {
                hunter.hunt(&query).await?
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::Generate {
            prompt,
            system,
            provider,
        } => {
            let registry = Arc::new(ProviderRegistry::from_config(&config)?);
            let dispatcher = LlmDispatcher::new(registry);
            let generation = dispatcher
                .generate(&prompt, &system, provider.as_deref())
                .await?;
            info!("Answered by {} ({})", generation.provider, generation.model);
            println!("{}", generation.text);
        }
        Command::Providers { set_default } => {
            let registry = ProviderRegistry::from_config(&config)?;
            if let Some([provider, model]) = set_default.as_deref() {
                registry.save_preferences(provider, model)?;
            }

            let (default_provider, default_model) = registry.load_preferences();
            for id in registry.provider_ids() {
                let available = registry.check_provider_availability(&id);
                let state = registry.provider_state(&id);
                let info = registry.provider_info(&id);
                let name = info.as_ref().map_or(id.as_str(), |e| e.config.name.as_str());
                let marker = if id == default_provider { "*" } else { " " };
                println!(
                    "{} {:<10} {:<20} {:<9} {}",
                    marker,
                    id,
                    name,
                    if available { "ready" } else { "no key" },
                    registry.provider_models(&id).join(", ")
                );
                debug!("{} state: {:?}", id, state);
            }
            if registry.provider_state(&default_provider) == ProviderState::Unavailable {
                println!("\nDefault provider '{default_provider}' has no credential.");
            }
            println!("\nDefault: {default_provider} ({default_model})");
        }
        Command::CheckConfig => {
            config.validate()?;
            println!("Configuration OK");
            let missing = config.credentials.missing();
            if missing.is_empty() {
                println!("All search credentials present");
            } else {
                println!("Missing search credentials: {}", missing.join(", "));
            }
            if !config.sources.enable_web_fallback {
                println!("Web-search fallback disabled");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    config.apply_overrides(&ConfigOverrides {
        log_level: cli.log_level.clone(),
        limit: cli.limit,
        providers_file: cli.providers_file.clone(),
        disable_web_fallback: cli.no_web_fallback,
    })?;

    init_tracing(&config);
    debug!("Loaded configuration: {:?}", config);

    run(cli, config).await
}
