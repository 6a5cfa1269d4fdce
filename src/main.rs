//! Dual Listing Arbitrage - Main Entry Point
//!
//! Paper-trades the control loop against the simulated venue.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dual_listing_arb::config::Config;
use dual_listing_arb::exchange::{MockVenue, QuoteDriver};
use dual_listing_arb::report::TracingSink;
use dual_listing_arb::{ControlLoop, Termination};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Dual Listing Arbitrage CLI
#[derive(Parser)]
#[command(name = "dual-listing-arb")]
#[command(version, about = "Cross-listing arbitrage with combined hedge control")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control loop against the simulated venue (default)
    Run {
        /// Stop after this many iterations
        #[arg(short, long)]
        max_iterations: Option<u64>,
    },

    /// Load and validate configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    let config = Config::load()?;
    config.validate()?;

    let max_iterations = match cli.command {
        Some(Commands::CheckConfig) => {
            log_config(&config);
            info!("Configuration OK");
            return Ok(());
        }
        Some(Commands::Run { max_iterations }) => max_iterations,
        None => None,
    };

    info!(
        "Dual Listing Arbitrage v{} - paper trading",
        env!("CARGO_PKG_VERSION")
    );
    log_config(&config);

    let venue = MockVenue::with_driver(QuoteDriver {
        instrument_a: config.instruments.a.clone(),
        instrument_b: config.instruments.b.clone(),
        base_mid: config.paper.base_mid,
        amplitude: config.paper.amplitude,
        half_spread: config.paper.half_spread,
        period: config.paper.period,
        depth: config.paper.depth,
    });

    // Shutdown signal
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        shutdown_clone.store(true, Ordering::SeqCst);
    });

    let mut engine = ControlLoop::new(&config, venue.clone(), TracingSink).with_shutdown(shutdown);
    if let Some(n) = max_iterations {
        engine = engine.with_max_iterations(n);
    }

    let summary = engine.run().await;

    info!(
        iterations = summary.metrics.iterations,
        opportunities = summary.metrics.opportunities,
        orders_submitted = summary.metrics.orders_submitted,
        orders_cancelled = summary.metrics.orders_cancelled,
        legs_suppressed = summary.metrics.legs_suppressed,
        hedge_corrections = summary.metrics.hedge_corrections,
        data_faults = summary.metrics.data_faults,
        last_pnl = ?summary.metrics.last_pnl,
        positions = %venue.positions().await,
        "Run summary"
    );

    if let Termination::Fault(e) = &summary.termination {
        error!(error = %e, "Stopped on fault; open orders were left at the venue");
    }

    Ok(())
}

/// Initialize logging to stdout and an hourly rolling file.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "dual-listing-arb.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer alive for the whole process
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("dual_listing_arb=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    info!("Configuration:");
    info!(
        "   Instruments: {} / {}",
        config.instruments.a, config.instruments.b
    );
    info!("   Max Position: {}", config.limits.max_position);
    info!(
        "   Hedge Tolerance: {} | Action Limit: {}",
        config.limits.hedge_tolerance, config.limits.hedge_action_limit
    );
    info!("   Min Spread: {}", config.strategy.min_spread);
    info!("   Trade Size: {}", config.strategy.trade_size);
    info!("   Sleep: {}ms", config.runtime.sleep_ms);
}
