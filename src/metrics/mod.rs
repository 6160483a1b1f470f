/*
 * Prometheus counters for cache effectiveness and tick fetching
 */

use prometheus::{IntCounter, Opts, Registry};

use crate::models::{Result, RouterError};

#[derive(Debug, Clone)]
pub struct RouterMetrics {
    pub route_cache_hits: IntCounter,
    pub route_cache_misses: IntCounter,
    pub output_cache_hits: IntCounter,
    pub output_cache_misses: IntCounter,
    pub tick_fetches: IntCounter,
}

impl RouterMetrics {
    /// Creates the counters and registers them on `registry`.
    pub fn new(registry: &Registry) -> Result<Self> {
        let metrics = Self {
            route_cache_hits: counter("route_cache_hits_total", "Route lookups served from cache")?,
            route_cache_misses: counter("route_cache_misses_total", "Route lookups that ran discovery")?,
            output_cache_hits: counter(
                "split_output_cache_hits_total",
                "Split evaluations served from the output cache",
            )?,
            output_cache_misses: counter(
                "split_output_cache_misses_total",
                "Split evaluations that quoted the route",
            )?,
            tick_fetches: counter("tick_fetches_total", "Tick depth requests sent to the source")?,
        };

        for collector in [
            &metrics.route_cache_hits,
            &metrics.route_cache_misses,
            &metrics.output_cache_hits,
            &metrics.output_cache_misses,
            &metrics.tick_fetches,
        ] {
            registry
                .register(Box::new(collector.clone()))
                .map_err(|e| RouterError::Config(format!("Failed to register metric: {e}")))?;
        }

        Ok(metrics)
    }
}

fn counter(name: &str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help).namespace("cl_router"))
        .map_err(|e| RouterError::Config(format!("Invalid metric {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_exported() {
        let registry = Registry::new();
        let metrics = RouterMetrics::new(&registry).unwrap();
        metrics.route_cache_hits.inc();
        metrics.tick_fetches.inc_by(3);

        let families = registry.gather();
        let names: Vec<_> = families.iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"cl_router_route_cache_hits_total".to_string()));
        assert_eq!(metrics.tick_fetches.get(), 3);
    }

    #[test]
    fn registering_twice_fails() {
        let registry = Registry::new();
        RouterMetrics::new(&registry).unwrap();
        assert!(matches!(RouterMetrics::new(&registry), Err(RouterError::Config(_))));
    }
}
