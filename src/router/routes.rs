/*
 * Multi-hop route discovery over the pool graph
 */

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use num_bigint::BigInt;
use tracing::debug;

use crate::models::{Result, RouterError};
use crate::pools::{Pool, RoutablePool};

/// An ordered path of pools. `token_out_denoms[i]` is what hop `i` produces.
#[derive(Debug, Clone)]
pub struct Route {
    pools: Vec<Arc<Pool>>,
    token_out_denoms: Vec<String>,
    token_in_denom: String,
}

impl Route {
    /// Builds a route, requiring one output denom per pool and every hop
    /// to trade its input for its output.
    pub fn new(
        pools: Vec<Arc<Pool>>,
        token_out_denoms: Vec<String>,
        token_in_denom: impl Into<String>,
    ) -> Result<Self> {
        let token_in_denom = token_in_denom.into();
        if pools.is_empty() {
            return Err(RouterError::InvalidRoute("route has no pools".to_string()));
        }
        if pools.len() != token_out_denoms.len() {
            return Err(RouterError::InvalidRoute(format!(
                "{} pools but {} output denoms",
                pools.len(),
                token_out_denoms.len()
            )));
        }
        let mut denom_in = token_in_denom.as_str();
        for (pool, denom_out) in pools.iter().zip(&token_out_denoms) {
            if !pool.has_pool_asset(denom_in) || !pool.has_pool_asset(denom_out) {
                return Err(RouterError::InvalidRoute(format!(
                    "pool {} does not trade {denom_in} for {denom_out}",
                    pool.id()
                )));
            }
            denom_in = denom_out;
        }
        Ok(Self {
            pools,
            token_out_denoms,
            token_in_denom,
        })
    }

    #[must_use]
    pub fn pools(&self) -> &[Arc<Pool>] {
        &self.pools
    }

    #[must_use]
    pub fn token_out_denoms(&self) -> &[String] {
        &self.token_out_denoms
    }

    #[must_use]
    pub fn token_in_denom(&self) -> &str {
        &self.token_in_denom
    }

    /// Ordered pool ids plus hop denoms; two routes are the same path iff equal.
    #[must_use]
    pub fn identity(&self) -> String {
        let pool_ids: Vec<&str> = self.pools.iter().map(|p| p.id()).collect();
        format!(
            "{}:{}>{}",
            pool_ids.join("/"),
            self.token_in_denom,
            self.token_out_denoms.join(">")
        )
    }

    #[must_use]
    pub fn hop_count(&self) -> usize {
        self.pools.len()
    }

    #[must_use]
    pub fn token_out_denom(&self) -> &str {
        self.token_out_denoms
            .last()
            .map_or(self.token_in_denom.as_str(), String::as_str)
    }

    /// Input and output denoms of hop `index`.
    pub fn hop_denoms(&self, index: usize) -> Result<(&str, &str)> {
        let token_in = match index {
            0 => Some(self.token_in_denom.as_str()),
            _ => self.token_out_denoms.get(index - 1).map(String::as_str),
        };
        match (token_in, self.token_out_denoms.get(index)) {
            (Some(token_in), Some(token_out)) => Ok((token_in, token_out)),
            _ => Err(RouterError::InvalidRoute(format!(
                "hop {index} is outside route {self}"
            ))),
        }
    }

    /// The same path walked from the output back to the input.
    #[must_use]
    pub fn reversed(&self) -> Route {
        let mut token_out_denoms: Vec<String> =
            self.token_out_denoms.iter().rev().skip(1).cloned().collect();
        token_out_denoms.push(self.token_in_denom.clone());
        Route {
            pools: self.pools.iter().rev().cloned().collect(),
            token_out_denoms,
            token_in_denom: self.token_out_denom().to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}

/// A route together with the amount of token in allocated to it.
#[derive(Debug, Clone)]
pub struct RouteWithInAmount {
    pub route: Route,
    pub initial_amount: BigInt,
}

struct Search<'a> {
    pools: &'a [Arc<Pool>],
    token_in: &'a str,
    token_out: &'a str,
    max_hops: usize,
    max_routes: usize,
    found: Vec<Route>,
}

impl Search<'_> {
    fn done(&self) -> bool {
        self.found.len() > self.max_routes
    }

    fn walk(&mut self, denom: &str, path: &mut Vec<usize>, denoms: &mut Vec<String>) {
        let pools = self.pools;
        for (index, pool) in pools.iter().enumerate() {
            if self.done() {
                return;
            }
            if path.contains(&index) || !pool.has_pool_asset(denom) {
                continue;
            }

            if pool.has_pool_asset(self.token_out) {
                let mut token_out_denoms = denoms.clone();
                token_out_denoms.push(self.token_out.to_string());
                self.found.push(Route {
                    pools: path
                        .iter()
                        .chain(std::iter::once(&index))
                        .map(|&i| pools[i].clone())
                        .collect(),
                    token_out_denoms,
                    token_in_denom: self.token_in.to_string(),
                });
                continue;
            }

            if path.len() + 1 >= self.max_hops {
                continue;
            }
            for next_denom in pool.pool_asset_denoms() {
                if next_denom == denom || next_denom == self.token_in || next_denom == self.token_out {
                    continue;
                }
                path.push(index);
                denoms.push(next_denom.clone());
                self.walk(&next_denom, path, denoms);
                denoms.pop();
                path.pop();
            }
        }
    }
}

fn search(
    pools: &[Arc<Pool>],
    token_in: &str,
    token_out: &str,
    max_hops: usize,
    max_routes: usize,
) -> Vec<Route> {
    let mut search = Search {
        pools,
        token_in,
        token_out,
        max_hops,
        max_routes,
        found: Vec::new(),
    };
    search.walk(token_in, &mut Vec::new(), &mut Vec::new());
    search.found
}

/// Depth-first search for paths from `token_in` to `token_out`, plus the
/// inverted paths of the reverse search. Shorter routes come first.
pub fn find_candidate_routes(
    pools: &[Arc<Pool>],
    token_in: &str,
    token_out: &str,
    max_hops: usize,
    max_routes: usize,
) -> Vec<Route> {
    if token_in == token_out {
        return Vec::new();
    }

    let mut routes = search(pools, token_in, token_out, max_hops, max_routes);
    let mut seen: HashSet<String> = routes.iter().map(Route::identity).collect();
    for route in search(pools, token_out, token_in, max_hops, max_routes) {
        let inverted = route.reversed();
        if seen.insert(inverted.identity()) {
            routes.push(inverted);
        }
    }
    routes.sort_by_key(Route::hop_count);

    debug!(
        token_in,
        token_out,
        routes = routes.len(),
        "Discovered candidate routes"
    );
    routes
}
