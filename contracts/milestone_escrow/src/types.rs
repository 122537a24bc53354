//! # Types
//!
//! Shared data structures used across all modules of the escrow ledger.
//!
//! ## Design decisions
//!
//! ### Config / State split
//!
//! A campaign is held internally as two parts:
//!
//! - [`CampaignConfig`] — written once at creation; never mutated.
//! - [`CampaignState`] — mutated by funding, milestone transitions and settlement.
//!
//! Only the state sits behind the per-campaign lock, so role checks against the
//! creator never contend with funding. The public API returns the reconstructed
//! [`Campaign`] snapshot.
//!
//! ### Status as a Finite-State Machine
//!
//! [`CampaignStatus`] only moves forward:
//!
//! ```text
//! Active ──► Successful ──► Failed
//!    └──► Cancelled
//! ```
//!
//! [`MilestoneStatus`] likewise:
//!
//! ```text
//! Pending ──► InProgress ──► Completed
//!                  └──► Failed
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Sequential campaign identifier, starting at 1.
pub type CampaignId = u64;
/// Zero-based position of a milestone inside its campaign.
pub type MilestoneIndex = u32;
/// Value in the smallest currency unit.
pub type Amount = u64;
/// Unix timestamp in seconds.
pub type Timestamp = u64;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Opaque, already-authenticated identity of a principal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle status of a campaign.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CampaignStatus {
    /// Accepting contributions.
    Active,
    /// Goal reached; milestones release funds one by one.
    Successful,
    /// A milestone failed; backers may claim refunds.
    Failed,
    /// Stopped by the creator or authority before reaching the goal.
    Cancelled,
}

impl CampaignStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }
}

/// Lifecycle status of a single milestone.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// One milestone as supplied at campaign creation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MilestoneSpec {
    pub title: String,
    pub description: String,
    /// Share of the raised funds released on completion, 1..=100.
    pub funding_percentage: u32,
    /// Length of this milestone in days, added to the running deadline.
    pub duration_days: u64,
}

impl MilestoneSpec {
    /// Assemble milestone specs from four parallel sequences, as submitted by
    /// clients that send column-wise parameters.
    pub fn zip(
        titles: Vec<String>,
        descriptions: Vec<String>,
        percentages: Vec<u32>,
        durations: Vec<u64>,
    ) -> Result<Vec<Self>, ValidationError> {
        let n = titles.len();
        if descriptions.len() != n || percentages.len() != n || durations.len() != n {
            return Err(ValidationError::LengthMismatch {
                titles: n,
                descriptions: descriptions.len(),
                percentages: percentages.len(),
                durations: durations.len(),
            });
        }

        Ok(titles
            .into_iter()
            .zip(descriptions)
            .zip(percentages)
            .zip(durations)
            .map(
                |(((title, description), funding_percentage), duration_days)| Self {
                    title,
                    description,
                    funding_percentage,
                    duration_days,
                },
            )
            .collect())
    }
}

/// Everything a creator submits to open a campaign.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CampaignDraft {
    pub title: String,
    pub description: String,
    pub funding_goal: Amount,
    pub duration_days: u64,
    pub milestones: Vec<MilestoneSpec>,
}

/// Immutable campaign configuration, written once at creation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CampaignConfig {
    pub id: CampaignId,
    pub creator: Identity,
    pub title: String,
    pub description: String,
    pub funding_goal: Amount,
    pub created_at: Timestamp,
    pub deadline: Timestamp,
    pub milestone_count: u32,
}

/// Mutable campaign state, guarded by the per-campaign lock.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CampaignState {
    pub total_raised: Amount,
    pub status: CampaignStatus,
    /// One-way latch set when refunds open.
    pub funds_withdrawn: bool,
    pub total_released: Amount,
    pub total_refunded: Amount,
}

impl CampaignState {
    pub fn opened() -> Self {
        Self {
            total_raised: 0,
            status: CampaignStatus::Active,
            funds_withdrawn: false,
            total_released: 0,
            total_refunded: 0,
        }
    }
}

/// Full campaign snapshot returned by the public API.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// Unique identifier (auto-incremented, starts at 1).
    pub id: CampaignId,
    /// Identity that created the campaign and receives released funds.
    pub creator: Identity,
    pub title: String,
    pub description: String,
    /// Target funding amount.
    pub funding_goal: Amount,
    /// Sum of all contributions; never decremented.
    pub total_raised: Amount,
    /// Timestamp after which contributions are rejected.
    pub deadline: Timestamp,
    pub milestone_count: u32,
    pub status: CampaignStatus,
    /// Set once refunds have been opened.
    pub funds_withdrawn: bool,
    /// Committed to the creator by milestone release flags, failed transfers included.
    pub total_released: Amount,
    /// Committed to backers by refund claims, failed transfers included.
    pub total_refunded: Amount,
}

impl Campaign {
    pub(crate) fn from_parts(config: &CampaignConfig, state: &CampaignState) -> Self {
        Self {
            id: config.id,
            creator: config.creator.clone(),
            title: config.title.clone(),
            description: config.description.clone(),
            funding_goal: config.funding_goal,
            total_raised: state.total_raised,
            deadline: config.deadline,
            milestone_count: config.milestone_count,
            status: state.status,
            funds_withdrawn: state.funds_withdrawn,
            total_released: state.total_released,
            total_refunded: state.total_refunded,
        }
    }

    /// Funds still held by the ledger for this campaign, rounding residue included.
    pub fn held(&self) -> Amount {
        self.total_raised - self.total_released - self.total_refunded
    }
}

/// A milestone of a campaign.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub campaign_id: CampaignId,
    pub index: MilestoneIndex,
    pub title: String,
    pub description: String,
    pub funding_percentage: u32,
    /// Creation time plus the durations of this and every earlier milestone.
    pub deadline: Timestamp,
    pub status: MilestoneStatus,
    /// One-way latch set right before the release transfer is attempted.
    pub funds_released: bool,
}
