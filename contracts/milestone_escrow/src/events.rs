//! # Events
//!
//! Every observable transition publishes one [`LedgerEvent`] to the host's
//! [`EventSink`]. Events fire after the state change they describe has been
//! committed and are never rewritten.
//!
//! | Kind                   | Emitted by                                      |
//! |------------------------|-------------------------------------------------|
//! | `campaign_created`     | `create_campaign`                               |
//! | `campaign_funded`      | `fund_campaign`                                 |
//! | `goal_reached`         | `fund_campaign`, on the Active → Successful step |
//! | `milestone_started`    | `start_milestone`                               |
//! | `milestone_completed`  | `complete_milestone`                            |
//! | `funds_released`       | `complete_milestone`, after a successful payout |
//! | `milestone_failed`     | `fail_milestone`                                |
//! | `refunds_enabled`      | `fail_milestone`, `cancel_campaign`             |
//! | `refund_claimed`       | `claim_refund`, after a successful payout       |
//! | `campaign_cancelled`   | `cancel_campaign`                               |
//! | `protocol_paused`      | `pause`                                         |
//! | `protocol_unpaused`    | `unpause`                                       |
//! | `authority_transferred`| `transfer_authority`                            |

use serde::{Deserialize, Serialize};

use crate::types::{Amount, CampaignId, Identity, MilestoneIndex, Timestamp};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    CampaignCreated {
        campaign_id: CampaignId,
        creator: Identity,
        title: String,
        funding_goal: Amount,
        deadline: Timestamp,
    },
    CampaignFunded {
        campaign_id: CampaignId,
        contributor: Identity,
        amount: Amount,
    },
    GoalReached {
        campaign_id: CampaignId,
        total_raised: Amount,
    },
    MilestoneStarted {
        campaign_id: CampaignId,
        milestone_index: MilestoneIndex,
    },
    MilestoneCompleted {
        campaign_id: CampaignId,
        milestone_index: MilestoneIndex,
    },
    MilestoneFailed {
        campaign_id: CampaignId,
        milestone_index: MilestoneIndex,
    },
    FundsReleased {
        campaign_id: CampaignId,
        milestone_index: MilestoneIndex,
        creator: Identity,
        amount: Amount,
    },
    RefundsEnabled {
        campaign_id: CampaignId,
    },
    RefundClaimed {
        campaign_id: CampaignId,
        backer: Identity,
        amount: Amount,
    },
    CampaignCancelled {
        campaign_id: CampaignId,
        cancelled_by: Identity,
    },
    ProtocolPaused {
        by: Identity,
    },
    ProtocolUnpaused {
        by: Identity,
    },
    AuthorityTransferred {
        from: Identity,
        to: Identity,
    },
}

impl LedgerEvent {
    /// Stable short identifier, identical to the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CampaignCreated { .. } => "campaign_created",
            Self::CampaignFunded { .. } => "campaign_funded",
            Self::GoalReached { .. } => "goal_reached",
            Self::MilestoneStarted { .. } => "milestone_started",
            Self::MilestoneCompleted { .. } => "milestone_completed",
            Self::MilestoneFailed { .. } => "milestone_failed",
            Self::FundsReleased { .. } => "funds_released",
            Self::RefundsEnabled { .. } => "refunds_enabled",
            Self::RefundClaimed { .. } => "refund_claimed",
            Self::CampaignCancelled { .. } => "campaign_cancelled",
            Self::ProtocolPaused { .. } => "protocol_paused",
            Self::ProtocolUnpaused { .. } => "protocol_unpaused",
            Self::AuthorityTransferred { .. } => "authority_transferred",
        }
    }

    pub fn campaign_id(&self) -> Option<CampaignId> {
        match self {
            Self::CampaignCreated { campaign_id, .. }
            | Self::CampaignFunded { campaign_id, .. }
            | Self::GoalReached { campaign_id, .. }
            | Self::MilestoneStarted { campaign_id, .. }
            | Self::MilestoneCompleted { campaign_id, .. }
            | Self::MilestoneFailed { campaign_id, .. }
            | Self::FundsReleased { campaign_id, .. }
            | Self::RefundsEnabled { campaign_id }
            | Self::RefundClaimed { campaign_id, .. }
            | Self::CampaignCancelled { campaign_id, .. } => Some(*campaign_id),
            Self::ProtocolPaused { .. }
            | Self::ProtocolUnpaused { .. }
            | Self::AuthorityTransferred { .. } => None,
        }
    }

    /// The principal the event is about, where there is one.
    pub fn actor(&self) -> Option<&Identity> {
        match self {
            Self::CampaignCreated { creator, .. } | Self::FundsReleased { creator, .. } => {
                Some(creator)
            }
            Self::CampaignFunded { contributor, .. } => Some(contributor),
            Self::RefundClaimed { backer, .. } => Some(backer),
            Self::CampaignCancelled { cancelled_by, .. } => Some(cancelled_by),
            Self::ProtocolPaused { by } | Self::ProtocolUnpaused { by } => Some(by),
            Self::AuthorityTransferred { to, .. } => Some(to),
            Self::GoalReached { .. }
            | Self::MilestoneStarted { .. }
            | Self::MilestoneCompleted { .. }
            | Self::MilestoneFailed { .. }
            | Self::RefundsEnabled { .. } => None,
        }
    }

    pub fn amount(&self) -> Option<Amount> {
        match self {
            Self::CampaignFunded { amount, .. }
            | Self::FundsReleased { amount, .. }
            | Self::RefundClaimed { amount, .. } => Some(*amount),
            Self::GoalReached { total_raised, .. } => Some(*total_raised),
            Self::CampaignCreated { funding_goal, .. } => Some(*funding_goal),
            _ => None,
        }
    }
}

/// Append-only notification log supplied by the host.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: LedgerEvent);
}
