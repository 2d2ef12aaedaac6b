//! Client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for [`AdlClient`](crate::AdlClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Upper bound for a single read or commit round trip (ms).
    pub request_timeout_ms: u64,
    /// Largest number of operations a single commit may carry.
    /// Checked before the request leaves the client.
    pub max_operations_per_commit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            max_operations_per_commit: 1_000,
        }
    }
}
