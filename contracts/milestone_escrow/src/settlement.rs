//! Settlement engine: milestone releases to the creator and pro-rata refunds
//! to backers.
//!
//! Both payouts follow mark-then-attempt: the guarding flag (milestone release
//! flag, zeroed contribution record) is committed under the campaign lock and
//! the returned [`Payout`] is executed by the caller afterwards. A failed
//! transfer never un-marks, so a payout can never run twice.
//!
//! All shares use floor division. The truncated remainder stays in the ledger
//! and is not reassigned to anyone.

use crate::errors::StateError;
use crate::storage::CampaignBook;
use crate::types::{
    Amount, CampaignId, CampaignStatus, Identity, MilestoneIndex, MilestoneStatus,
};

/// A transfer the ledger has committed to and the host must now execute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payout {
    pub to: Identity,
    pub amount: Amount,
}

/// `floor(amount * percentage / 100)`, computed without overflow.
pub fn share_of(amount: Amount, percentage: u32) -> Amount {
    let share = u128::from(amount) * u128::from(percentage) / 100;
    // percentage never exceeds 100 so the share never exceeds `amount`
    share as Amount
}

/// Sum of the percentages of milestones whose funds were never released.
pub(crate) fn unreleased_percentage(book: &CampaignBook) -> u32 {
    book.milestones
        .iter()
        .filter(|m| !m.funds_released)
        .map(|m| m.funding_percentage)
        .sum()
}

/// Mark milestone `index` released and return the creator's share.
pub(crate) fn mark_release(
    campaign_id: CampaignId,
    book: &mut CampaignBook,
    index: MilestoneIndex,
    creator: &Identity,
) -> Result<Payout, StateError> {
    let total_raised = book.state.total_raised;
    let milestone = book.milestone_mut(campaign_id, index)?;
    if milestone.status != MilestoneStatus::Completed {
        return Err(StateError::MilestoneNotCompleted {
            campaign_id,
            index,
            status: milestone.status,
        });
    }
    if milestone.funds_released {
        return Err(StateError::MilestoneAlreadyReleased { campaign_id, index });
    }

    let amount = share_of(total_raised, milestone.funding_percentage);
    milestone.funds_released = true;
    book.state.total_released += amount;

    Ok(Payout {
        to: creator.clone(),
        amount,
    })
}

/// One-time latch that opens refund claims on a Failed or Cancelled campaign.
pub(crate) fn enable_refunds(
    campaign_id: CampaignId,
    book: &mut CampaignBook,
) -> Result<(), StateError> {
    if !book.state.status.is_terminal() {
        return Err(StateError::CampaignNotRefundable {
            campaign_id,
            status: book.state.status,
        });
    }
    if book.state.funds_withdrawn {
        return Err(StateError::RefundsAlreadyEnabled(campaign_id));
    }
    book.state.funds_withdrawn = true;
    Ok(())
}

/// Zero `backer`'s contribution and return the refund owed for it.
///
/// The refund is the backer's pro-rata share of every milestone that never
/// released funds. A zero entitlement is rejected before anything is written.
pub(crate) fn mark_refund(
    campaign_id: CampaignId,
    book: &mut CampaignBook,
    backer: &Identity,
) -> Result<Payout, StateError> {
    match book.state.status {
        CampaignStatus::Failed | CampaignStatus::Cancelled => {}
        status => {
            return Err(StateError::CampaignNotRefundable {
                campaign_id,
                status,
            })
        }
    }

    let contributed = book.contribution_of(backer);
    let amount = share_of(contributed, unreleased_percentage(book));
    if amount == 0 {
        return Err(StateError::NothingToRefund {
            campaign_id,
            backer: backer.clone(),
        });
    }

    book.contributions.insert(backer.clone(), 0);
    book.state.total_refunded += amount;

    Ok(Payout {
        to: backer.clone(),
        amount,
    })
}
