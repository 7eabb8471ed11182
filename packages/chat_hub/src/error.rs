/// Errors that can occur when talking to the broadcast hub
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// The hub task has stopped and no longer accepts requests
    #[error("broadcast hub is not running")]
    Closed,
    /// Configuration rejected before the hub was spawned
    #[error("invalid hub configuration: {0}")]
    InvalidConfig(String),
}
