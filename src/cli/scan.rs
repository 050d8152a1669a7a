//! Scan command implementation

use super::{build_market, build_streams, open_store, shutdown_on_ctrl_c};
use crate::config::Config;
use crate::scanner::Scanner;
use clap::Args;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Override the minimum 24h move (%) before a symbol is analysed
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Override the per-symbol cooldown in seconds
    #[arg(long)]
    pub cooldown: Option<u64>,
}

impl ScanArgs {
    pub async fn execute(&self, mut config: Config) -> anyhow::Result<()> {
        if let Some(threshold) = self.threshold {
            config.scanner.move_threshold_pct = threshold;
        }
        if let Some(cooldown) = self.cooldown {
            config.scanner.cooldown_secs = cooldown;
        }
        let cancel = shutdown_on_ctrl_c();

        let scanner = Scanner::new(
            config.scanner.clone(),
            &config.enrichment,
            config.feed.quote_asset.clone(),
            build_streams(&config),
            build_market(&config)?,
            open_store(&config.store)?,
        );

        let mut status = scanner.status().subscribe();
        let token = cancel.clone();
        let status_log = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = status.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let line = status.borrow_and_update().clone();
                        tracing::info!(status = %line, "Scanner status");
                    }
                }
            }
        });

        scanner.run(cancel.clone()).await;
        cancel.cancel();
        let _ = status_log.await;

        for signal in scanner.feed().snapshot() {
            println!(
                "{}  {:<14} price={:<12} rsi={:>6.2} cvd={:>14.2} ratio={:.2}",
                signal.timestamp.to_rfc3339(),
                signal.symbol,
                signal.price,
                signal.rsi,
                signal.cvd_delta,
                signal.top_trader_ratio
            );
        }

        Ok(())
    }
}
