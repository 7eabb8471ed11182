use serde::{Deserialize, Serialize};

use crate::archive::DEFAULT_ARCHIVE_CAPACITY;
use crate::error::HubError;

/// Default delivery buffer per subscriber feed.
pub const DEFAULT_FEED_CAPACITY: usize = 10;

/// Default depth of the hub's request queue.
pub const DEFAULT_REQUEST_CAPACITY: usize = 10;

/// Sizing knobs for a hub
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Number of recent events kept for newcomers
    #[serde(default = "default_archive_capacity")]
    pub archive_capacity: usize,
    /// Events buffered per subscriber before fan-out waits on it
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
    /// Requests queued before callers of subscribe/publish wait
    #[serde(default = "default_request_capacity")]
    pub request_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            archive_capacity: default_archive_capacity(),
            feed_capacity: default_feed_capacity(),
            request_capacity: default_request_capacity(),
        }
    }
}

impl HubConfig {
    /// Channel capacities must be non-zero; an empty archive is allowed.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.feed_capacity == 0 {
            return Err(HubError::InvalidConfig(
                "feed_capacity must be at least 1".into(),
            ));
        }
        if self.request_capacity == 0 {
            return Err(HubError::InvalidConfig(
                "request_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_archive_capacity() -> usize {
    DEFAULT_ARCHIVE_CAPACITY
}
fn default_feed_capacity() -> usize {
    DEFAULT_FEED_CAPACITY
}
fn default_request_capacity() -> usize {
    DEFAULT_REQUEST_CAPACITY
}
