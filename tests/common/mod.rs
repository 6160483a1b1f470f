/*
 * Shared fixtures for integration tests
 */

#![allow(dead_code)]

use std::sync::{Arc, Once};

use cl_router::models::TickDepth;
use cl_router::{
    Dec, InMemoryTickSource, IncrementalTickDataProvider, Pool, RawPool, TickDataProvider,
};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cl_router=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn dec(value: &str) -> Dec {
    value.parse().expect("valid decimal")
}

pub const ETH_USDC_LIQUIDITY: &str = "1517882343.751510418088349649";

/// ETH/USDC at 5000 with one full position between 4545 and 5500.
pub const ETH_USDC_POOL: &str = r#"{
    "type": "concentrated",
    "id": "1066",
    "token0": "eth",
    "token1": "usdc",
    "current_tick": "310000",
    "current_sqrt_price": "70.710678118654752440",
    "current_tick_liquidity": "1517882343.751510418088349649",
    "tick_spacing": "1000",
    "exponent_at_price_one": "-4",
    "spread_factor": "0",
    "token0_amount": "1000000",
    "token1_amount": "5000000000"
}"#;

pub fn eth_usdc_ticks() -> Vec<TickDepth> {
    vec![
        TickDepth::new(305_450, dec(ETH_USDC_LIQUIDITY)),
        TickDepth::new(315_000, -dec(ETH_USDC_LIQUIDITY)),
    ]
}

pub fn eth_usdc_provider() -> Arc<dyn TickDataProvider> {
    Arc::new(IncrementalTickDataProvider::new(InMemoryTickSource::with_pool(
        "1066",
        eth_usdc_ticks(),
    )))
}

pub fn parse_pool(json: &str, provider: Arc<dyn TickDataProvider>) -> Pool {
    let raw: RawPool = serde_json::from_str(json).expect("valid pool json");
    Pool::from_raw(raw, provider).expect("valid pool")
}

pub fn constant_product(id: &str, a: (&str, u64), b: (&str, u64), fee: &str) -> Pool {
    let json = format!(
        r#"{{
            "type": "constant_product",
            "id": "{id}",
            "pool_assets": [
                {{"denom": "{}", "amount": "{}"}},
                {{"denom": "{}", "amount": "{}"}}
            ],
            "swap_fee": "{fee}"
        }}"#,
        a.0, a.1, b.0, b.1
    );
    parse_pool(&json, eth_usdc_provider())
}
