//! Resilience patterns backing the Request Pipeline and the
//! background sweepers/cleanup tasks: retry with
//! exponential backoff and full jitter, a per-(tenant, endpoint) circuit
//! breaker, and coordinated graceful shutdown for long-running tasks and
//! child processes.

pub mod backoff;
pub mod circuit_breaker;
pub mod retry;
pub mod shutdown;

// Re-export commonly used types
pub use backoff::{BackoffCalculator, BackoffStrategy, DecorrelatedJitterCalculator};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerBuilder, CircuitBreakerConfig, CircuitState,
};
pub use retry::{RetryError, RetryExecutor, RetryPolicy, Retryable};
pub use shutdown::{
    GracefulTask, ProcessShutdownManager, ShutdownAwareTask, ShutdownCoordinator, ShutdownError,
    ShutdownSignal,
};
