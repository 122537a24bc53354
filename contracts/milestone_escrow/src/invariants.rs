#![allow(dead_code)]

use crate::types::{Campaign, CampaignStatus, Milestone, MilestoneStatus};

/// INV-1: funding goal must always be positive.
pub fn assert_goal_positive(campaign: &Campaign) {
    assert!(
        campaign.funding_goal > 0,
        "INV-1 violated: campaign {} has zero goal",
        campaign.id
    );
}

/// INV-2: released plus refunded never exceeds what was raised.
pub fn assert_funds_conserved(campaign: &Campaign) {
    assert!(
        campaign.total_released + campaign.total_refunded <= campaign.total_raised,
        "INV-2 violated: campaign {} paid out {} + {} of {} raised",
        campaign.id,
        campaign.total_released,
        campaign.total_refunded,
        campaign.total_raised
    );
}

/// INV-3: a campaign that left Active through success raised at least its goal.
pub fn assert_success_met_goal(campaign: &Campaign, milestones: &[Milestone]) {
    let went_successful = campaign.status == CampaignStatus::Successful
        || (campaign.status == CampaignStatus::Failed
            && milestones.iter().any(|m| m.status == MilestoneStatus::Failed));
    if went_successful {
        assert!(
            campaign.total_raised >= campaign.funding_goal,
            "INV-3 violated: campaign {} left Active with {} of {}",
            campaign.id,
            campaign.total_raised,
            campaign.funding_goal
        );
    }
}

/// INV-4: milestone percentages sum to exactly 100.
pub fn assert_percentages_sum(milestones: &[Milestone]) {
    let sum: u32 = milestones.iter().map(|m| m.funding_percentage).sum();
    assert_eq!(sum, 100, "INV-4 violated: percentages sum to {sum}");
}

/// INV-5: sequential gating. No milestone past the first may be anything but
/// Pending unless its predecessor completed.
pub fn assert_sequential_gating(milestones: &[Milestone]) {
    for pair in milestones.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.status != MilestoneStatus::Pending {
            assert_eq!(
                prev.status,
                MilestoneStatus::Completed,
                "INV-5 violated: milestone {} is {:?} while {} is {:?}",
                next.index,
                next.status,
                prev.index,
                prev.status
            );
        }
    }
}

/// INV-6: release flags are set exactly on Completed milestones.
pub fn assert_release_flags(milestones: &[Milestone]) {
    for m in milestones {
        assert_eq!(
            m.funds_released,
            m.status == MilestoneStatus::Completed,
            "INV-6 violated: milestone {} is {:?} with release flag {}",
            m.index,
            m.status,
            m.funds_released
        );
    }
}

/// INV-7: only forward status transitions.
pub fn assert_valid_status_transition(from: CampaignStatus, to: CampaignStatus) {
    let valid = from == to
        || matches!(
            (from, to),
            (CampaignStatus::Active, CampaignStatus::Successful)
                | (CampaignStatus::Active, CampaignStatus::Cancelled)
                | (CampaignStatus::Successful, CampaignStatus::Failed)
        );
    assert!(
        valid,
        "INV-7 violated: invalid status transition from {from:?} to {to:?}"
    );
}

/// INV-8: creation-time fields never change.
pub fn assert_immutable_fields(original: &Campaign, current: &Campaign) {
    assert_eq!(original.id, current.id, "INV-8 violated: id changed");
    assert_eq!(original.creator, current.creator, "INV-8 violated: creator changed");
    assert_eq!(
        original.funding_goal, current.funding_goal,
        "INV-8 violated: goal changed"
    );
    assert_eq!(original.deadline, current.deadline, "INV-8 violated: deadline changed");
    assert_eq!(
        original.milestone_count, current.milestone_count,
        "INV-8 violated: milestone count changed"
    );
}

/// Run all stateless invariants.
pub fn assert_all_campaign_invariants(campaign: &Campaign, milestones: &[Milestone]) {
    assert_goal_positive(campaign);
    assert_funds_conserved(campaign);
    assert_success_met_goal(campaign, milestones);
    assert_percentages_sum(milestones);
    assert_sequential_gating(milestones);
    assert_release_flags(milestones);
    assert_eq!(milestones.len() as u32, campaign.milestone_count);
}
