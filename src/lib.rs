/*
 * cl-router - Concentrated-liquidity pricing and split-routing engine
 * Core library exports and module declarations
 */

pub mod config;
pub mod math;
pub mod metrics;
pub mod models;
pub mod pools;
pub mod router;
pub mod ticks;
pub mod utils;

pub use config::RouterConfig;
pub use math::{BigDec, Dec};
pub use metrics::RouterMetrics;
pub use models::*;
pub use pools::{ConcentratedPool, ConstantProductPool, Pool, RawPool, RoutablePool};
pub use router::{OptimizedRoutes, Route, RouteWithInAmount, SplitTokenInQuote};
pub use ticks::{IncrementalTickDataProvider, InMemoryTickSource, TickDataProvider, TickDepths};
