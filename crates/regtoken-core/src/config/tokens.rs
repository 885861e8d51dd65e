//! Defaults applied when a token is generated without explicit limits.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDefaults {
    /// Maximum number of uses. `0` means unlimited.
    #[serde(default)]
    pub default_maximum: u32,

    /// Expiration expression: "never", "day", "week", "month" or YYYY-MM-DD.
    #[serde(default = "default_expiration")]
    pub default_expiration: String,
}

impl Default for TokenDefaults {
    fn default() -> Self {
        Self {
            default_maximum: 0,
            default_expiration: default_expiration(),
        }
    }
}

fn default_expiration() -> String {
    "never".to_string()
}
