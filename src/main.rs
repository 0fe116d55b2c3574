use clap::Parser;
use quantpulse::cli::{Cli, Commands};
use quantpulse::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            // Configuration problems are the one fatal error class
            let config = Config::load(&cli.config)?;
            let _telemetry = quantpulse::telemetry::init_telemetry(&config.telemetry)?;
            tracing::info!(mode = ?config.engine.mode, "Starting trading engine");
            args.execute(config).await?;
        }
        Commands::Status => {
            println!("quantpulse status");
            println!("  Status: not running");
            println!("  Use the /status endpoint of a running instance");
        }
        Commands::Config => {
            let config = Config::load(&cli.config)?;
            println!("Current configuration:");
            println!("  Mode: {:?}", config.engine.mode);
            println!("  Symbols: {}", config.engine.symbols.join(", "));
            println!("  Capital: {}", config.engine.initial_capital);
            println!(
                "  Risk: max_position={}, max_open={}, max_daily_loss={}",
                config.risk.max_position_size,
                config.risk.max_open_positions,
                config.risk.max_daily_loss
            );
            println!("  Analysis interval: {}s", config.engine.analysis_interval_secs);
            println!("  AI: {}", if config.ai.enabled { "enabled" } else { "disabled" });
        }
    }

    Ok(())
}
