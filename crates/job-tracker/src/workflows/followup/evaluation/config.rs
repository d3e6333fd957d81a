use serde::{Deserialize, Serialize};

/// Days to wait after applying before the first follow-up.
pub const DEFAULT_WAIT_DAYS: u32 = 7;

/// Tunables for the follow-up evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub default_wait_days: u32,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            default_wait_days: DEFAULT_WAIT_DAYS,
        }
    }
}
