//! Interactive chat configuration from TOML (`[chat]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChatConfig {
    /// Questions answered before the session ends
    pub max_iterations: usize,
}

impl Default for FileChatConfig {
    fn default() -> Self {
        Self { max_iterations: 5 }
    }
}
