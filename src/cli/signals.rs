//! Signals command implementation

use super::open_store;
use crate::config::Config;
use clap::Args;

#[derive(Args, Debug)]
pub struct SignalsArgs {
    /// Number of signals to show
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl SignalsArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = open_store(&config.store)?;
        let limit = self.limit.unwrap_or(config.store.recent_limit);
        let signals = store.recent(limit).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&signals)?);
            return Ok(());
        }

        if signals.is_empty() {
            println!("No signals recorded ({})", store.backend_type());
            return Ok(());
        }

        println!(
            "{:<26} {:<14} {:>12} {:>7} {:>14} {:>7}",
            "TIME", "SYMBOL", "PRICE", "RSI", "CVD DELTA", "RATIO"
        );
        for s in &signals {
            println!(
                "{:<26} {:<14} {:>12} {:>7.2} {:>14.2} {:>7.2}",
                s.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                s.symbol,
                s.price,
                s.rsi,
                s.cvd_delta,
                s.top_trader_ratio
            );
        }

        Ok(())
    }
}
