//! Symbols command implementation

use super::build_market;
use crate::config::Config;
use crate::feed::MarketData;
use clap::Args;

#[derive(Args, Debug)]
pub struct SymbolsArgs {
    /// Quote asset filter (defaults to the configured one)
    #[arg(short, long)]
    pub quote: Option<String>,

    /// Number of instruments to show
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,
}

impl SymbolsArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let market = build_market(config)?;
        let quote = self
            .quote
            .clone()
            .unwrap_or_else(|| config.feed.quote_asset.clone())
            .to_uppercase();

        let symbols = market.symbols(&quote).await?;

        println!("{:<16} {:>14} {:>9} {:>18}", "SYMBOL", "PRICE", "24H %", "QUOTE VOLUME");
        for s in symbols.iter().take(self.limit) {
            println!(
                "{:<16} {:>14} {:>+9.2} {:>18.0}",
                s.symbol, s.price, s.change, s.volume
            );
        }
        println!("{} of {} {} instruments", symbols.len().min(self.limit), symbols.len(), quote);

        Ok(())
    }
}
