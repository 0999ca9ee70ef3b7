//! Live price feed port for post-execution tracking.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Source of last-traded prices for an instrument.
///
/// The channel closing while a position is open is treated as a feed loss.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn subscribe(&self, instrument: &str) -> Result<mpsc::Receiver<f64>, String>;
}
