use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default dataset file name.
pub const DEFAULT_OUTPUT_FILE: &str = "block_analysis.json";
/// Default mempool TTL in seconds.
pub const DEFAULT_MEMPOOL_TTL_SECS: u64 = 180;
/// Default capture-rate threshold percentage for persisting a block.
pub const DEFAULT_CAPTURE_THRESHOLD: f64 = 70.0;
/// Default pause between capture ticks, milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
/// Default delay between sequential endpoint retries, milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;

/// Runtime configuration of the capture pipeline.
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Ordered node endpoints; the first is the primary for one-shot
    /// queries.
    pub endpoints: Vec<Url>,
    /// Dataset file path.
    pub output: PathBuf,
    /// How long an unseen mempool entry survives before eviction.
    pub mempool_ttl: Duration,
    /// Minimum capture rate (percent) for persisting a block's economics.
    pub capture_threshold: f64,
    /// Pause between capture ticks.
    pub tick_interval: Duration,
    /// Delay between sequential endpoint retries of a one-shot query.
    pub retry_delay: Duration,
}

impl ObserverConfig {
    /// Configuration with defaults for everything but the endpoint list.
    pub fn new(endpoints: Vec<Url>) -> Self {
        Self {
            endpoints,
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            mempool_ttl: Duration::from_secs(DEFAULT_MEMPOOL_TTL_SECS),
            capture_threshold: DEFAULT_CAPTURE_THRESHOLD,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }

    /// Validate the configuration surface.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        if !(0.0..=100.0).contains(&self.capture_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.capture_threshold));
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No node endpoints were configured.
    #[error("at least one rpc endpoint is required")]
    NoEndpoints,
    /// Capture threshold must be a percentage.
    #[error("capture threshold {0} outside 0..=100")]
    ThresholdOutOfRange(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("http://localhost:8545").unwrap()
    }

    #[test]
    fn defaults_pass_validation() {
        let config = ObserverConfig::new(vec![endpoint()]);
        assert!(config.validate().is_ok());
        assert_eq!(config.mempool_ttl, Duration::from_secs(180));
        assert_eq!(config.capture_threshold, 70.0);
    }

    #[test]
    fn empty_endpoint_list_is_rejected() {
        let config = ObserverConfig::new(Vec::new());
        assert!(matches!(config.validate(), Err(ConfigError::NoEndpoints)));
    }

    #[test]
    fn threshold_must_be_a_percentage() {
        let mut config = ObserverConfig::new(vec![endpoint()]);
        config.capture_threshold = 170.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange(_))
        ));
    }
}
