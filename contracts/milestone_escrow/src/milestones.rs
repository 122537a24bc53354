//! Milestone state machine.
//!
//! Milestones advance strictly in order: milestone `i` can only leave
//! `Pending` once milestone `i - 1` is `Completed`. Any failure ends the
//! whole campaign.

use crate::errors::StateError;
use crate::storage::CampaignBook;
use crate::types::{CampaignId, CampaignStatus, MilestoneIndex, MilestoneStatus};

fn require_successful(campaign_id: CampaignId, book: &CampaignBook) -> Result<(), StateError> {
    match book.state.status {
        CampaignStatus::Successful => Ok(()),
        status => Err(StateError::CampaignNotSuccessful {
            campaign_id,
            status,
        }),
    }
}

fn require_in_progress(
    campaign_id: CampaignId,
    index: MilestoneIndex,
    status: MilestoneStatus,
) -> Result<(), StateError> {
    if status == MilestoneStatus::InProgress {
        Ok(())
    } else {
        Err(StateError::MilestoneNotInProgress {
            campaign_id,
            index,
            status,
        })
    }
}

/// Pending → InProgress.
pub(crate) fn start(
    campaign_id: CampaignId,
    book: &mut CampaignBook,
    index: MilestoneIndex,
) -> Result<(), StateError> {
    require_successful(campaign_id, book)?;
    book.milestone(campaign_id, index)?;

    if index > 0 {
        let previous = book.milestone(campaign_id, index - 1)?;
        if previous.status != MilestoneStatus::Completed {
            return Err(StateError::PredecessorIncomplete { campaign_id, index });
        }
    }

    let milestone = book.milestone_mut(campaign_id, index)?;
    if milestone.status != MilestoneStatus::Pending {
        return Err(StateError::MilestoneNotPending {
            campaign_id,
            index,
            status: milestone.status,
        });
    }
    milestone.status = MilestoneStatus::InProgress;
    Ok(())
}

/// InProgress → Completed. The caller must release the milestone's share
/// before leaving the campaign lock.
pub(crate) fn complete(
    campaign_id: CampaignId,
    book: &mut CampaignBook,
    index: MilestoneIndex,
) -> Result<(), StateError> {
    require_successful(campaign_id, book)?;
    let milestone = book.milestone_mut(campaign_id, index)?;
    require_in_progress(campaign_id, index, milestone.status)?;
    milestone.status = MilestoneStatus::Completed;
    Ok(())
}

/// InProgress → Failed, and the campaign Successful → Failed.
pub(crate) fn fail(
    campaign_id: CampaignId,
    book: &mut CampaignBook,
    index: MilestoneIndex,
) -> Result<(), StateError> {
    require_successful(campaign_id, book)?;
    let milestone = book.milestone_mut(campaign_id, index)?;
    require_in_progress(campaign_id, index, milestone.status)?;
    milestone.status = MilestoneStatus::Failed;
    book.state.status = CampaignStatus::Failed;
    Ok(())
}
