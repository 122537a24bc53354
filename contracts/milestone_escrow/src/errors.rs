//! # Errors
//!
//! Every entry point returns [`LedgerError`], which groups failures into the
//! three classes callers need to tell apart:
//!
//! | Class        | Meaning                                           | State change |
//! |--------------|---------------------------------------------------|--------------|
//! | `Validation` | Malformed input; resubmit with corrected values.  | none         |
//! | `State`      | Wrong status or wrong caller; re-read and retry.  | none         |
//! | `Transfer`   | The payout collaborator reported failure.         | flags kept   |
//!
//! Each variant carries a stable numeric [`code`](LedgerError::code) so that
//! hosts (HTTP, RPC) can surface the same number regardless of the message text.

use thiserror::Error;

use crate::rbac::Operation;
use crate::types::{Amount, CampaignId, CampaignStatus, Identity, MilestoneIndex, MilestoneStatus};

/// Malformed input, rejected before the ledger is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("funding goal must be greater than zero")]
    InvalidGoal,

    #[error("campaign duration must be at least one day")]
    InvalidDuration,

    #[error("a campaign needs at least one milestone")]
    NoMilestones,

    #[error(
        "milestone parameter lists differ in length \
         (titles {titles}, descriptions {descriptions}, percentages {percentages}, durations {durations})"
    )]
    LengthMismatch {
        titles: usize,
        descriptions: usize,
        percentages: usize,
        durations: usize,
    },

    #[error("milestone {index} has a zero funding percentage")]
    ZeroPercentage { index: MilestoneIndex },

    #[error("milestone {index} funding percentage {percentage} exceeds 100")]
    PercentageTooLarge {
        index: MilestoneIndex,
        percentage: u32,
    },

    #[error("milestone percentages sum to {sum}, expected exactly 100")]
    PercentageSum { sum: u64 },

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("deadline computation overflowed")]
    DeadlineOverflow,

    #[error("contribution would overflow the campaign total")]
    AmountOverflow,
}

impl ValidationError {
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidGoal => 1,
            Self::InvalidDuration => 2,
            Self::NoMilestones => 3,
            Self::LengthMismatch { .. } => 4,
            Self::ZeroPercentage { .. } => 5,
            Self::PercentageTooLarge { .. } => 6,
            Self::PercentageSum { .. } => 7,
            Self::ZeroAmount => 8,
            Self::DeadlineOverflow => 9,
            Self::AmountOverflow => 10,
        }
    }
}

/// The operation does not fit the current state or the caller's role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("campaign {0} not found")]
    CampaignNotFound(CampaignId),

    #[error("campaign {campaign_id} has no milestone {index}")]
    MilestoneNotFound {
        campaign_id: CampaignId,
        index: MilestoneIndex,
    },

    #[error("campaign {campaign_id} is {status:?}, expected Active")]
    CampaignNotActive {
        campaign_id: CampaignId,
        status: CampaignStatus,
    },

    #[error("campaign {campaign_id} is {status:?}, expected Successful")]
    CampaignNotSuccessful {
        campaign_id: CampaignId,
        status: CampaignStatus,
    },

    #[error("campaign {campaign_id} is {status:?}, refunds require Failed or Cancelled")]
    CampaignNotRefundable {
        campaign_id: CampaignId,
        status: CampaignStatus,
    },

    #[error("campaign {campaign_id} stopped accepting funds at {deadline}")]
    DeadlinePassed {
        campaign_id: CampaignId,
        deadline: u64,
    },

    #[error("milestone {index} of campaign {campaign_id} is {status:?}, expected Pending")]
    MilestoneNotPending {
        campaign_id: CampaignId,
        index: MilestoneIndex,
        status: MilestoneStatus,
    },

    #[error("milestone {index} of campaign {campaign_id} is {status:?}, expected InProgress")]
    MilestoneNotInProgress {
        campaign_id: CampaignId,
        index: MilestoneIndex,
        status: MilestoneStatus,
    },

    #[error("milestone {index} of campaign {campaign_id} is {status:?}, expected Completed")]
    MilestoneNotCompleted {
        campaign_id: CampaignId,
        index: MilestoneIndex,
        status: MilestoneStatus,
    },

    #[error("milestone {index} of campaign {campaign_id} cannot start before its predecessor completes")]
    PredecessorIncomplete {
        campaign_id: CampaignId,
        index: MilestoneIndex,
    },

    #[error("funds for milestone {index} of campaign {campaign_id} were already released")]
    MilestoneAlreadyReleased {
        campaign_id: CampaignId,
        index: MilestoneIndex,
    },

    #[error("refunds for campaign {0} were already enabled")]
    RefundsAlreadyEnabled(CampaignId),

    #[error("{backer} has nothing to refund from campaign {campaign_id}")]
    NothingToRefund {
        campaign_id: CampaignId,
        backer: Identity,
    },

    #[error("protocol is paused")]
    Paused,

    #[error("{caller} is not permitted to {operation}")]
    Unauthorized {
        caller: Identity,
        operation: Operation,
    },
}

impl StateError {
    pub fn code(&self) -> u32 {
        match self {
            Self::CampaignNotFound(_) => 20,
            Self::MilestoneNotFound { .. } => 21,
            Self::CampaignNotActive { .. } => 22,
            Self::CampaignNotSuccessful { .. } => 23,
            Self::CampaignNotRefundable { .. } => 24,
            Self::DeadlinePassed { .. } => 25,
            Self::MilestoneNotPending { .. } => 26,
            Self::MilestoneNotInProgress { .. } => 27,
            Self::PredecessorIncomplete { .. } => 28,
            Self::MilestoneAlreadyReleased { .. } => 29,
            Self::RefundsAlreadyEnabled(_) => 30,
            Self::NothingToRefund { .. } => 31,
            Self::Paused => 32,
            Self::Unauthorized { .. } => 33,
            Self::MilestoneNotCompleted { .. } => 34,
        }
    }

    /// True for the "no such campaign / milestone" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CampaignNotFound(_) | Self::MilestoneNotFound { .. }
        )
    }
}

/// Failure reported by the [`Transfer`](crate::env::Transfer) collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transfer of {amount} to {to} failed: {reason}")]
pub struct TransferError {
    pub to: Identity,
    pub amount: Amount,
    pub reason: String,
}

impl TransferError {
    pub fn new(to: &Identity, amount: Amount, reason: impl Into<String>) -> Self {
        Self {
            to: to.clone(),
            amount,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    /// The ledger already committed its release/refund flags; the funds for
    /// this payout are not retried.
    #[error("campaign {campaign_id}: {source}")]
    Transfer {
        campaign_id: CampaignId,
        #[source]
        source: TransferError,
    },
}

impl LedgerError {
    pub fn code(&self) -> u32 {
        match self {
            Self::Validation(e) => e.code(),
            Self::State(e) => e.code(),
            Self::Transfer { .. } => 40,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::State(_) => "state",
            Self::Transfer { .. } => "transfer",
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
