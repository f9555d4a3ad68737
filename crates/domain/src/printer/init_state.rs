use serde::{Deserialize, Serialize};

/// Lifecycle of the single printer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializationState {
    /// No handle, no initialization running
    #[default]
    Uninitialized,
    /// Discovery and construction in progress; callers wait on it
    Initializing,
    /// A handle exists and can be handed out without I/O
    Ready,
}

impl InitializationState {
    /// Check if a handle is available
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
        }
    }
}
