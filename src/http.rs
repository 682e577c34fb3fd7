//! Shared HTTP client for the `apiRequest` block.

use std::time::Duration;

/// Bounded request timeout. `apiRequest` calls are expected to be quick,
/// synchronous-feeling JSON round trips, not long-running completions, so
/// this is far shorter than an LLM-oriented client would use.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn create_shared_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(10)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
