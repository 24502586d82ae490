use serde::{Deserialize, Serialize};
use std::fmt;

/// The two chains the relayer bridges between.
///
/// `Ethereum` is the L1 settlement chain; `Via` is the L2 rollup. Several stages
/// (`L1BatchNumber`, `VaultControllerUpdate`, `WithdrawalStateUpdated`, `L1BatchFinalized`)
/// only ever run for `Via` as the message origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Via,
}

impl Chain {
    /// The chain a message broadcast on `self` as origin is destined for.
    pub fn counterparty(self) -> Chain {
        match self {
            Chain::Ethereum => Chain::Via,
            Chain::Via => Chain::Ethereum,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Via => "via",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" | "eth" | "l1" => Ok(Chain::Ethereum),
            "via" | "l2" => Ok(Chain::Via),
            other => Err(format!("unknown chain identifier: {other}")),
        }
    }
}
