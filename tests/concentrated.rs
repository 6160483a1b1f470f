/*
 * Concentrated-liquidity quoting through parsed pools and the tick provider
 */

mod common;

use std::sync::Arc;

use anyhow::Result;
use cl_router::models::{Coin, RouterError};
use cl_router::{
    InMemoryTickSource, IncrementalTickDataProvider, OptimizedRoutes, RoutablePool, RouterConfig,
    RouterMetrics,
};
use num_bigint::BigInt;
use prometheus::Registry;

use common::{dec, eth_usdc_provider, eth_usdc_ticks, init_tracing, parse_pool, ETH_USDC_POOL};

#[tokio::test]
async fn parsed_pool_reproduces_reference_quotes() -> Result<()> {
    init_tracing();
    let pool = parse_pool(ETH_USDC_POOL, eth_usdc_provider());

    let usdc_in = pool
        .get_token_out_by_token_in(&Coin::new("usdc", 42_000_000), "eth", None)
        .await?;
    assert_eq!(usdc_in.amount, BigInt::from(8_396));

    let eth_in = pool
        .get_token_out_by_token_in(&Coin::new("eth", 13_370), "usdc", None)
        .await?;
    assert_eq!(eth_in.amount, BigInt::from(66_808_388));

    let usdc_out = pool
        .get_token_in_by_token_out(&Coin::new("usdc", 66_808_388), "eth", None)
        .await?;
    assert_eq!(usdc_out.amount, BigInt::from(13_370));
    Ok(())
}

#[test]
fn quotes_from_blocking_code() {
    let pool = parse_pool(ETH_USDC_POOL, eth_usdc_provider());
    let result = tokio_test::block_on(pool.get_token_out_by_token_in(
        &Coin::new("usdc", 42_000_000),
        "eth",
        None,
    ))
    .unwrap();
    assert_eq!(result.amount, BigInt::from(8_396));
}

#[tokio::test]
async fn fee_reduces_output() -> Result<()> {
    let pool = parse_pool(ETH_USDC_POOL, eth_usdc_provider());
    let free = pool
        .get_token_out_by_token_in(&Coin::new("usdc", 42_000_000), "eth", None)
        .await?;
    let charged = pool
        .get_token_out_by_token_in(&Coin::new("usdc", 42_000_000), "eth", Some(&dec("0.01")))
        .await?;

    assert!(charged.amount < free.amount);
    assert!(charged.before_spot_price_in_over_out > free.before_spot_price_in_over_out);
    Ok(())
}

#[tokio::test]
async fn draining_the_position_is_not_enough_liquidity() {
    let pool = parse_pool(ETH_USDC_POOL, eth_usdc_provider());
    let err = pool
        .get_token_out_by_token_in(&Coin::new("usdc", 5_300_000_000u64), "eth", None)
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::NotEnoughLiquidity));
}

#[tokio::test]
async fn router_surfaces_exhausted_liquidity() -> Result<()> {
    init_tracing();
    let router = OptimizedRoutes::new(
        vec![parse_pool(ETH_USDC_POOL, eth_usdc_provider())],
        RouterConfig::default(),
    )?;

    let token_in = Coin::new("usdc", 5_300_000_000u64);
    let split = router.get_optimized_routes_by_token_in(&token_in, "eth").await?;
    assert_eq!(split.len(), 1);

    let err = router.calculate_token_out_by_token_in(&split).await.unwrap_err();
    assert!(matches!(err, RouterError::NotEnoughLiquidity));
    Ok(())
}

#[tokio::test]
async fn tick_fetches_are_counted() -> Result<()> {
    let registry = Registry::new();
    let metrics = RouterMetrics::new(&registry)?;
    let provider = Arc::new(
        IncrementalTickDataProvider::new(InMemoryTickSource::with_pool("1066", eth_usdc_ticks()))
            .with_metrics(metrics.clone()),
    );
    let pool = parse_pool(ETH_USDC_POOL, provider);

    pool.get_token_out_by_token_in(&Coin::new("usdc", 42_000_000), "eth", None)
        .await?;
    // 311000, 312000, 314000 hold no ticks; 318000 reaches the upper edge
    assert_eq!(metrics.tick_fetches.get(), 4);

    pool.get_token_out_by_token_in(&Coin::new("usdc", 21_000_000), "eth", None)
        .await?;
    assert_eq!(metrics.tick_fetches.get(), 4);
    Ok(())
}
