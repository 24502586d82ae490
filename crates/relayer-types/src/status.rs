use serde::{Deserialize, Serialize};
use std::fmt;

/// `BridgeMessage.status`. Transitions are restricted to the graph documented on
/// each stage handler; see `relayer-stages` for where each edge is taken.
///
/// ```text
/// New -> Pending -> Finalized -> (Via only) -> VaultUpdated -> L1BatchFinalized
///              \                       ^
///               \--> Failed/Refunded --/ (via StalePendingReconciler)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    New,
    Pending,
    Finalized,
    VaultUpdated,
    /// Kept for forward compatibility: not every deployment drives the
    /// `L1BatchFinalized` stage, but the status exists wherever it does.
    L1BatchFinalized,
    Failed,
    Refunded,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::New => "new",
            MessageStatus::Pending => "pending",
            MessageStatus::Finalized => "finalized",
            MessageStatus::VaultUpdated => "vault_updated",
            MessageStatus::L1BatchFinalized => "l1_batch_finalized",
            MessageStatus::Failed => "failed",
            MessageStatus::Refunded => "refunded",
        }
    }

    /// Whether `to` is a legal successor of `self` per the state graph in §4.4.
    pub fn can_transition_to(self, to: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, to),
            (New, Pending)
                | (Pending, Finalized)
                | (Pending, Failed)
                | (Pending, Refunded)
                | (Finalized, VaultUpdated)
                | (Finalized, L1BatchFinalized)
                | (VaultUpdated, L1BatchFinalized)
        )
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `VaultControllerBatch.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Confirmed,
    Failed,
    ReadyToClaim,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Confirmed => "confirmed",
            BatchStatus::Failed => "failed",
            BatchStatus::ReadyToClaim => "ready_to_claim",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_progression_matches_graph() {
        assert!(MessageStatus::New.can_transition_to(MessageStatus::Pending));
        assert!(MessageStatus::Pending.can_transition_to(MessageStatus::Finalized));
        assert!(MessageStatus::Pending.can_transition_to(MessageStatus::Failed));
        assert!(MessageStatus::Finalized.can_transition_to(MessageStatus::VaultUpdated));
        assert!(!MessageStatus::New.can_transition_to(MessageStatus::Finalized));
        assert!(!MessageStatus::Failed.can_transition_to(MessageStatus::Pending));
        assert!(!MessageStatus::VaultUpdated.can_transition_to(MessageStatus::Pending));
    }
}
