use clap::Parser;
use flow_terminal::cli::{Cli, Commands};
use flow_terminal::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            Config::embedded()?
        }
    };

    // Initialize telemetry
    flow_terminal::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Serve(args) => {
            tracing::info!(bind = %config.server.bind, "Starting terminal backend");
            args.execute(config).await?;
        }
        Commands::Scan(args) => {
            tracing::info!("Starting scanner-only mode");
            args.execute(config).await?;
        }
        Commands::Signals(args) => {
            args.execute(&config).await?;
        }
        Commands::Symbols(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("# Effective configuration ({})", cli.config);
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
