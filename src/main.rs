use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trading_agents::api::{run_server, AppState};
use trading_agents::constants;
use trading_agents::data::{MarketData, MockMarketData};
use trading_agents::services::batch::BatchAnalyzer;
use trading_agents::types::{AnalystKind, WorkflowMode};
use trading_agents::workflow::{create_orchestrator, normalize_symbol, RunOptions};
use trading_agents::AppConfig;

#[derive(Parser)]
#[command(name = "trading_agents")]
#[command(about = "Multi-agent LLM trading firm simulation", long_about = None)]
struct Cli {
    /// JSON or YAML config file
    #[arg(long, global = true, env = "TRADING_AGENTS_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct PipelineArgs {
    /// quick | full (defaults to the config)
    #[arg(long)]
    mode: Option<WorkflowMode>,

    /// Comma separated analyst list
    #[arg(long, value_delimiter = ',')]
    analysts: Option<Vec<AnalystKind>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single symbol
    Analyze {
        symbol: String,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Market data JSON file (mocked data otherwise)
        #[arg(long)]
        market_data: Option<PathBuf>,

        /// Current position as a fraction of the portfolio
        #[arg(long, default_value_t = 0.0)]
        position: f64,

        /// Write the full result as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Analyze several symbols concurrently
    Batch {
        /// Symbols (defaults to trading.symbols)
        symbols: Vec<String>,

        #[command(flatten)]
        pipeline: PipelineArgs,

        #[arg(long, default_value_t = constants::batch::DEFAULT_MAX_WORKERS)]
        workers: usize,

        /// SYMBOL=FRACTION pairs, comma separated
        #[arg(long, value_delimiter = ',')]
        positions: Vec<String>,

        /// .json or .csv export
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = constants::server::DEFAULT_ADDR)]
        addr: String,
    },
    /// Print the effective configuration (keys masked)
    Config,
}

fn run_options(config: &AppConfig, pipeline: PipelineArgs) -> RunOptions {
    let mut options = RunOptions::from_config(config);
    if let Some(mode) = pipeline.mode {
        options = options.with_mode(mode);
    }
    if let Some(analysts) = pipeline.analysts {
        options = options.with_analysts(analysts);
    }
    options
}

fn parse_positions(
    pairs: &[String],
) -> Result<HashMap<String, f64>, Box<dyn std::error::Error + Send + Sync>> {
    let mut positions = HashMap::new();
    for pair in pairs {
        let Some((symbol, size)) = pair.split_once('=') else {
            return Err(format!("invalid position {:?} (expected SYMBOL=FRACTION)", pair).into());
        };
        positions.insert(symbol.trim().to_uppercase(), size.trim().parse::<f64>()?);
    }
    Ok(positions)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup Logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Load Configuration
    let config = AppConfig::load(cli.config.as_deref())?;
    let settings = config.llm_settings();
    info!(
        "Loaded configuration: provider={}, model={}, mode={}",
        settings.provider, settings.model, config.workflow.mode
    );

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config.masked())?);
        }
        Commands::Analyze {
            symbol,
            pipeline,
            market_data,
            position,
            output,
        } => {
            let options = run_options(&config, pipeline).with_position(position);
            let symbol = normalize_symbol(&symbol)?;
            let market = match market_data {
                Some(path) => MarketData::from_file(&path)?,
                None => MockMarketData::generate(
                    &symbol,
                    constants::batch::MOCK_HISTORY_DAYS,
                    MockMarketData::seed_for(&symbol),
                ),
            };

            let orchestrator = create_orchestrator(config)?;
            let result = orchestrator.run_with(&symbol, &market, options).await?;

            let decision = &result.final_decision;
            println!(
                "{} ({}): {} | confidence {:.0}% | position {:.1}%",
                result.symbol,
                result.mode,
                decision.recommendation,
                decision.confidence * 100.0,
                decision.position_size * 100.0
            );
            println!("{}", decision.rationale);

            if let Some(path) = output {
                std::fs::write(&path, result.to_json_pretty()?)?;
                info!("💾 Result written to {}", path.display());
            }
        }
        Commands::Batch {
            symbols,
            pipeline,
            workers,
            positions,
            output,
        } => {
            let symbols = if symbols.is_empty() {
                config.trading.symbols.clone()
            } else {
                symbols
            };
            let options = run_options(&config, pipeline);
            let positions = parse_positions(&positions)?;

            let orchestrator = Arc::new(create_orchestrator(config)?);
            let report = BatchAnalyzer::new(orchestrator)
                .with_workers(workers)
                .with_options(options)
                .with_positions(positions)
                .run(&symbols)
                .await;

            println!("{}", report.render_table());
            if let Some(path) = output {
                report.export(&path)?;
            }
        }
        Commands::Serve { addr } => {
            let orchestrator = Arc::new(create_orchestrator(config)?);
            run_server(&addr, AppState::new(orchestrator)).await?;
        }
    }

    Ok(())
}
