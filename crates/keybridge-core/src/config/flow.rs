use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlowConfig {
    /// Seconds a pending authorization transaction stays redeemable.
    #[serde(default = "default_transaction_ttl")]
    pub transaction_ttl: u64,

    /// Seconds a minted proxy authorization code stays redeemable.
    #[serde(default = "default_code_ttl")]
    pub code_ttl: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            transaction_ttl: default_transaction_ttl(),
            code_ttl: default_code_ttl(),
        }
    }
}

fn default_transaction_ttl() -> u64 {
    300
}

fn default_code_ttl() -> u64 {
    60
}
