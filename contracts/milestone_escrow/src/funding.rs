//! Funding ledger: contributions and goal detection.

use crate::errors::{LedgerError, StateError, ValidationError};
use crate::storage::CampaignBook;
use crate::types::{Amount, CampaignConfig, CampaignStatus, Identity, Timestamp};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Contribution {
    pub total_raised: Amount,
    pub backer_total: Amount,
    /// True only for the contribution that moved the campaign to Successful.
    pub goal_reached: bool,
}

/// Record `amount` from `contributor`.
///
/// Runs entirely under the campaign lock, so the increment and the goal check
/// see the same snapshot and exactly one contribution flips the status.
pub(crate) fn contribute(
    config: &CampaignConfig,
    book: &mut CampaignBook,
    contributor: &Identity,
    amount: Amount,
    now: Timestamp,
) -> Result<Contribution, LedgerError> {
    if book.state.status != CampaignStatus::Active {
        return Err(StateError::CampaignNotActive {
            campaign_id: config.id,
            status: book.state.status,
        }
        .into());
    }
    if now >= config.deadline {
        return Err(StateError::DeadlinePassed {
            campaign_id: config.id,
            deadline: config.deadline,
        }
        .into());
    }

    let total_raised = book
        .state
        .total_raised
        .checked_add(amount)
        .ok_or(ValidationError::AmountOverflow)?;
    let backer_total = book
        .contribution_of(contributor)
        .checked_add(amount)
        .ok_or(ValidationError::AmountOverflow)?;

    book.state.total_raised = total_raised;
    book.contributions.insert(contributor.clone(), backer_total);

    let goal_reached = total_raised >= config.funding_goal;
    if goal_reached {
        book.state.status = CampaignStatus::Successful;
    }

    Ok(Contribution {
        total_raised,
        backer_total,
        goal_reached,
    })
}
