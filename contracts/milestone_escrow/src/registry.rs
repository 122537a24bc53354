//! Campaign registry: creation-time validation and construction of a new
//! campaign together with its fixed milestone sequence.

use std::collections::HashMap;

use crate::errors::ValidationError;
use crate::storage::{CampaignBook, CampaignEntry};
use crate::types::{
    CampaignConfig, CampaignDraft, CampaignId, CampaignState, Identity, Milestone,
    MilestoneIndex, MilestoneStatus, Timestamp, SECONDS_PER_DAY,
};

/// Check every creation constraint. Nothing is allocated until this passes.
pub(crate) fn validate(draft: &CampaignDraft) -> Result<(), ValidationError> {
    if draft.funding_goal == 0 {
        return Err(ValidationError::InvalidGoal);
    }
    if draft.duration_days == 0 {
        return Err(ValidationError::InvalidDuration);
    }
    if draft.milestones.is_empty() {
        return Err(ValidationError::NoMilestones);
    }

    let mut sum: u64 = 0;
    for (index, spec) in draft.milestones.iter().enumerate() {
        let index = index as MilestoneIndex;
        if spec.funding_percentage == 0 {
            return Err(ValidationError::ZeroPercentage { index });
        }
        if spec.funding_percentage > 100 {
            return Err(ValidationError::PercentageTooLarge {
                index,
                percentage: spec.funding_percentage,
            });
        }
        sum += u64::from(spec.funding_percentage);
    }
    if sum != 100 {
        return Err(ValidationError::PercentageSum { sum });
    }

    Ok(())
}

fn days_after(start: Timestamp, days: u64) -> Result<Timestamp, ValidationError> {
    days.checked_mul(SECONDS_PER_DAY)
        .and_then(|secs| start.checked_add(secs))
        .ok_or(ValidationError::DeadlineOverflow)
}

/// Build the storage entry for campaign `id`.
///
/// Milestone `i` ends at `now` plus the durations of milestones `0..=i`;
/// milestone 0 starts `InProgress`, the rest `Pending`.
pub(crate) fn open_campaign(
    id: CampaignId,
    creator: &Identity,
    draft: &CampaignDraft,
    now: Timestamp,
) -> Result<CampaignEntry, ValidationError> {
    validate(draft)?;
    let deadline = days_after(now, draft.duration_days)?;

    let mut running = now;
    let mut milestones = Vec::with_capacity(draft.milestones.len());
    for (i, spec) in draft.milestones.iter().enumerate() {
        running = days_after(running, spec.duration_days)?;
        milestones.push(Milestone {
            campaign_id: id,
            index: i as MilestoneIndex,
            title: spec.title.clone(),
            description: spec.description.clone(),
            funding_percentage: spec.funding_percentage,
            deadline: running,
            status: if i == 0 {
                MilestoneStatus::InProgress
            } else {
                MilestoneStatus::Pending
            },
            funds_released: false,
        });
    }

    let config = CampaignConfig {
        id,
        creator: creator.clone(),
        title: draft.title.clone(),
        description: draft.description.clone(),
        funding_goal: draft.funding_goal,
        created_at: now,
        deadline,
        milestone_count: milestones.len() as u32,
    };
    let book = CampaignBook {
        state: CampaignState::opened(),
        milestones,
        contributions: HashMap::new(),
    };
    Ok(CampaignEntry::new(config, book))
}
