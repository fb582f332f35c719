use serde::Deserialize;

use crate::services::diversity::BROWSE_TARGET_COUNT;
use crate::services::mmr::{FINAL_MMR_LAMBDA, FINAL_MMR_TOP_N, FINAL_RECOMMENDATION_COUNT};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Redis connection URL; profiles stay in memory when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Size of a browse batch
    #[serde(default = "default_browse_total")]
    pub browse_total: usize,

    /// Number of final recommendations
    #[serde(default = "default_final_count")]
    pub final_count: usize,

    /// Relevance weight of the final MMR pass
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f64,

    /// MMR candidates kept before the final cut
    #[serde(default = "default_mmr_top_n")]
    pub mmr_top_n: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_browse_total() -> usize {
    BROWSE_TARGET_COUNT
}

fn default_final_count() -> usize {
    FINAL_RECOMMENDATION_COUNT
}

fn default_mmr_lambda() -> f64 {
    FINAL_MMR_LAMBDA
}

fn default_mmr_top_n() -> usize {
    FINAL_MMR_TOP_N
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.mmr_lambda) {
            anyhow::bail!("MMR_LAMBDA must be within [0, 1], got {}", self.mmr_lambda);
        }
        if self.final_count == 0 || self.mmr_top_n < self.final_count {
            anyhow::bail!(
                "MMR_TOP_N ({}) must be at least FINAL_COUNT ({}) and FINAL_COUNT positive",
                self.mmr_top_n,
                self.final_count
            );
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            browse_total: self.browse_total,
            final_count: self.final_count,
            mmr_lambda: self.mmr_lambda,
            mmr_top_n: self.mmr_top_n,
        }
    }
}

/// Tunables the request handlers pass into the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub browse_total: usize,
    pub final_count: usize,
    pub mmr_lambda: f64,
    pub mmr_top_n: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            browse_total: BROWSE_TARGET_COUNT,
            final_count: FINAL_RECOMMENDATION_COUNT,
            mmr_lambda: FINAL_MMR_LAMBDA,
            mmr_top_n: FINAL_MMR_TOP_N,
        }
    }
}
