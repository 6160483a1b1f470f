/*
 * Configuration for route discovery, split search and tick fetching
 */

use crate::models::{Result, RouterError};
use serde::{Deserialize, Serialize};

pub const MAX_HOPS_CEILING: usize = 5;
pub const MAX_ROUTES_CEILING: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Longest path route discovery explores.
    pub max_hops: usize,
    /// Discovery stops extending paths once more routes than this are found.
    pub max_routes: usize,
    /// Number of top-weighted routes the split search distributes over.
    pub max_split_routes: usize,
    /// Granularity of the split search: each route gets i/N of the remainder.
    pub max_split_iterations: usize,
    pub tick_ramp_multiplier: i64,
    pub max_tick_retries: u32,
    /// Intermediate asset whose incentivized two-hop routes get a fee discount.
    pub numeraire_denom: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_hops: 5,
            max_routes: 10,
            max_split_routes: 2,
            max_split_iterations: 10,
            tick_ramp_multiplier: 2,
            max_tick_retries: 6,
            numeraire_denom: "uosmo".to_string(),
        }
    }
}

impl RouterConfig {
    /// Defaults overridden by `CL_ROUTER_*` environment variables
    /// (`CL_ROUTER_MAX_HOPS=3`). A `.env` file is honoured if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("CL_ROUTER").try_parsing(true))
            .build()
            .map_err(|e| RouterError::Config(format!("Failed to read environment: {e}")))?;

        let router_config: RouterConfig = settings
            .try_deserialize()
            .map_err(|e| RouterError::Config(format!("Invalid router config: {e}")))?;

        router_config.validate()?;
        Ok(router_config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_hops == 0 || self.max_hops > MAX_HOPS_CEILING {
            return Err(RouterError::Config(format!(
                "max_hops must be between 1 and {MAX_HOPS_CEILING}, got {}",
                self.max_hops
            )));
        }
        if self.max_routes == 0 || self.max_routes > MAX_ROUTES_CEILING {
            return Err(RouterError::Config(format!(
                "max_routes must be between 1 and {MAX_ROUTES_CEILING}, got {}",
                self.max_routes
            )));
        }
        if self.max_split_routes == 0 {
            return Err(RouterError::Config("max_split_routes must be positive".to_string()));
        }
        if self.max_split_iterations == 0 {
            return Err(RouterError::Config(
                "max_split_iterations must be positive".to_string(),
            ));
        }
        if self.tick_ramp_multiplier < 2 {
            return Err(RouterError::Config(format!(
                "tick_ramp_multiplier must be at least 2, got {}",
                self.tick_ramp_multiplier
            )));
        }
        if self.max_tick_retries == 0 {
            return Err(RouterError::Config("max_tick_retries must be positive".to_string()));
        }
        if self.numeraire_denom.trim().is_empty() {
            return Err(RouterError::Config("numeraire_denom must not be empty".to_string()));
        }
        Ok(())
    }
}
