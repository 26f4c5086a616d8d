//! Per-host circuit breaker registry: breaker state lives per host, behind
//! a mutex, shared across every tenant/endpoint calling it. One breaker is
//! lazily created per upstream host.

use mcpfusion_resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct HostCircuitRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl HostCircuitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn breaker_for(&self, host: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().get(host) {
            return existing.clone();
        }
        let mut breakers = self.breakers.write();
        breakers
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())))
            .clone()
    }
}

/// Extracts the host component used as the circuit breaker key, e.g.
/// `https://api.github.com/repos/x` -> `api.github.com`.
pub fn host_of(url: &str) -> String {
    url.split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or(url)
        .to_string()
}
