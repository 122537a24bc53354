//! # Milestone Escrow Ledger
//!
//! A creator proposes a funding goal split into ordered milestones, backers
//! commit funds, and every milestone's share is released only after the
//! platform authority approves it. A failed milestone ends the campaign and
//! opens pro-rata refunds for everything not yet released.
//!
//! | Phase        | Entry Point(s)                                             |
//! |--------------|------------------------------------------------------------|
//! | Bootstrap    | [`EscrowLedger::new`]                                      |
//! | Protocol     | `pause`, `unpause`, `transfer_authority`                   |
//! | Registration | [`EscrowLedger::create_campaign`]                          |
//! | Funding      | [`EscrowLedger::fund_campaign`]                            |
//! | Milestones   | `start_milestone`, `complete_milestone`, `fail_milestone`  |
//! | Settlement   | [`EscrowLedger::claim_refund`], `cancel_campaign`          |
//! | Queries      | `get_campaign`, `get_milestone`, `active_campaigns`, ...   |
//!
//! ## Architecture
//!
//! Authorization is delegated to [`rbac`], storage to [`storage`], and each
//! responsibility (registry, funding, milestones, settlement) to its own module.
//! This file holds the public entry points, event emission and payouts.
//!
//! Every mutation of a campaign runs under that campaign's lock. Payouts are
//! executed only after the lock is released and the guarding flag has been
//! committed, so a slow or failing [`Transfer`] can neither block other callers
//! nor be replayed.

use std::sync::Arc;

use tracing::{debug, error, info};

pub mod env;
pub mod errors;
pub mod events;
pub mod rbac;
pub mod settlement;
pub mod types;

mod funding;
mod milestones;
mod registry;
mod storage;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_events;
#[cfg(test)]
mod test_funding;

pub use env::{Clock, SystemClock, Transfer};
pub use errors::{LedgerError, Result, StateError, TransferError, ValidationError};
pub use events::{EventSink, LedgerEvent};
pub use rbac::{Operation, Role};
pub use settlement::Payout;
pub use types::{
    Amount, Campaign, CampaignDraft, CampaignId, CampaignStatus, Identity, Milestone,
    MilestoneIndex, MilestoneSpec, MilestoneStatus, Timestamp,
};

use storage::{CampaignEntry, CampaignStore, ProtocolStore};

pub struct EscrowLedger {
    protocol: ProtocolStore,
    campaigns: CampaignStore,
    transfer: Arc<dyn Transfer>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl EscrowLedger {
    /// Create an empty ledger whose platform authority is `authority`.
    pub fn new(
        authority: Identity,
        transfer: Arc<dyn Transfer>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            protocol: ProtocolStore::new(authority),
            campaigns: CampaignStore::default(),
            transfer,
            clock,
            events,
        }
    }

    // ─────────────────────────────────────────────────────────
    // Protocol administration
    // ─────────────────────────────────────────────────────────

    pub fn authority(&self) -> Identity {
        self.protocol.authority()
    }

    /// Hand the authority role to `new_authority`.
    ///
    /// - `caller` must be the current authority.
    pub fn transfer_authority(&self, caller: &Identity, new_authority: Identity) -> Result<()> {
        self.authorize(Operation::TransferAuthority, caller, None)?;
        let previous = self.protocol.replace_authority(new_authority.clone());
        info!(from = %previous, to = %new_authority, "authority transferred");
        self.events.publish(LedgerEvent::AuthorityTransferred {
            from: previous,
            to: new_authority,
        });
        Ok(())
    }

    /// Suspend campaign creation and funding.
    pub fn pause(&self, caller: &Identity) -> Result<()> {
        self.authorize(Operation::Pause, caller, None)?;
        self.protocol.set_paused(true);
        info!(by = %caller, "protocol paused");
        self.events
            .publish(LedgerEvent::ProtocolPaused { by: caller.clone() });
        Ok(())
    }

    pub fn unpause(&self, caller: &Identity) -> Result<()> {
        self.authorize(Operation::Unpause, caller, None)?;
        self.protocol.set_paused(false);
        info!(by = %caller, "protocol unpaused");
        self.events
            .publish(LedgerEvent::ProtocolUnpaused { by: caller.clone() });
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.protocol.is_paused()
    }

    // ─────────────────────────────────────────────────────────
    // Campaign lifecycle
    // ─────────────────────────────────────────────────────────

    /// Register a new campaign owned by `caller`.
    ///
    /// All-or-nothing: a rejected draft consumes no identifier.
    pub fn create_campaign(&self, caller: &Identity, draft: CampaignDraft) -> Result<Campaign> {
        self.require_not_paused()?;
        self.authorize(Operation::CreateCampaign, caller, None)?;

        let now = self.clock.now();
        let entry = self.campaigns.insert_with(|id| {
            let entry = registry::open_campaign(id, caller, &draft, now)?;
            // Published before the entry becomes visible so it precedes any
            // event about the new campaign.
            self.events.publish(LedgerEvent::CampaignCreated {
                campaign_id: id,
                creator: caller.clone(),
                title: entry.config.title.clone(),
                funding_goal: entry.config.funding_goal,
                deadline: entry.config.deadline,
            });
            Ok::<_, ValidationError>(entry)
        })?;

        info!(
            campaign_id = entry.config.id,
            creator = %caller,
            goal = entry.config.funding_goal,
            milestones = entry.config.milestone_count,
            "campaign created"
        );
        Ok(snapshot(&entry))
    }

    /// Contribute `amount` to an Active campaign before its deadline.
    pub fn fund_campaign(
        &self,
        campaign_id: CampaignId,
        amount: Amount,
        contributor: &Identity,
    ) -> Result<Campaign> {
        self.require_not_paused()?;
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        let entry = self.campaigns.load(campaign_id)?;
        self.authorize(Operation::FundCampaign, contributor, Some(&entry.config.creator))?;

        let mut book = entry.lock();
        let outcome = funding::contribute(
            &entry.config,
            &mut book,
            contributor,
            amount,
            self.clock.now(),
        )?;

        self.events.publish(LedgerEvent::CampaignFunded {
            campaign_id,
            contributor: contributor.clone(),
            amount,
        });
        debug!(
            campaign_id,
            contributor = %contributor,
            amount,
            backer_total = outcome.backer_total,
            "contribution recorded"
        );
        if outcome.goal_reached {
            self.events.publish(LedgerEvent::GoalReached {
                campaign_id,
                total_raised: outcome.total_raised,
            });
            info!(campaign_id, total_raised = outcome.total_raised, "funding goal reached");
        }

        Ok(types::Campaign::from_parts(&entry.config, &book.state))
    }

    /// Move milestone `index` from Pending to InProgress.
    ///
    /// - `caller` must be the campaign creator.
    /// - The campaign must be Successful and milestone `index - 1` Completed.
    pub fn start_milestone(
        &self,
        campaign_id: CampaignId,
        index: MilestoneIndex,
        caller: &Identity,
    ) -> Result<Milestone> {
        let entry = self.campaigns.load(campaign_id)?;
        self.authorize(Operation::StartMilestone, caller, Some(&entry.config.creator))?;

        let mut book = entry.lock();
        milestones::start(campaign_id, &mut book, index)?;
        self.events.publish(LedgerEvent::MilestoneStarted {
            campaign_id,
            milestone_index: index,
        });
        info!(campaign_id, milestone = index, "milestone started");

        Ok(book.milestone(campaign_id, index)?.clone())
    }

    /// Approve milestone `index` and release its share to the creator.
    ///
    /// - `caller` must be the authority and not the campaign creator.
    ///
    /// Completion and the release flag are committed together; the transfer
    /// runs afterwards. If it fails the milestone stays Completed and released,
    /// and its share is not paid again. Returns the amount paid.
    ///
    /// `funds_released` is published once the transfer settles, so events for
    /// later transitions of the same campaign may be journaled between it and
    /// `milestone_completed`.
    pub async fn complete_milestone(
        &self,
        campaign_id: CampaignId,
        index: MilestoneIndex,
        caller: &Identity,
    ) -> Result<Amount> {
        let entry = self.campaigns.load(campaign_id)?;
        self.authorize(
            Operation::CompleteMilestone,
            caller,
            Some(&entry.config.creator),
        )?;

        let payout = {
            let mut book = entry.lock();
            milestones::complete(campaign_id, &mut book, index)?;
            let payout =
                settlement::mark_release(campaign_id, &mut book, index, &entry.config.creator)?;
            self.events.publish(LedgerEvent::MilestoneCompleted {
                campaign_id,
                milestone_index: index,
            });
            payout
        };
        info!(
            campaign_id,
            milestone = index,
            amount = payout.amount,
            "milestone completed, releasing funds"
        );

        self.pay(campaign_id, &payout).await?;
        self.events.publish(LedgerEvent::FundsReleased {
            campaign_id,
            milestone_index: index,
            creator: payout.to,
            amount: payout.amount,
        });
        Ok(payout.amount)
    }

    /// Reject milestone `index`, failing the campaign and opening refunds.
    ///
    /// - `caller` must be the authority and not the campaign creator.
    pub fn fail_milestone(
        &self,
        campaign_id: CampaignId,
        index: MilestoneIndex,
        caller: &Identity,
    ) -> Result<()> {
        let entry = self.campaigns.load(campaign_id)?;
        self.authorize(Operation::FailMilestone, caller, Some(&entry.config.creator))?;

        let mut book = entry.lock();
        milestones::fail(campaign_id, &mut book, index)?;
        settlement::enable_refunds(campaign_id, &mut book)?;

        self.events.publish(LedgerEvent::MilestoneFailed {
            campaign_id,
            milestone_index: index,
        });
        self.events
            .publish(LedgerEvent::RefundsEnabled { campaign_id });
        info!(
            campaign_id,
            milestone = index,
            unreleased_pct = settlement::unreleased_percentage(&book),
            "milestone failed, refunds enabled"
        );
        Ok(())
    }

    /// Cancel an Active campaign and open full refunds for its backers.
    ///
    /// - `caller` must be the creator or the authority.
    pub fn cancel_campaign(&self, campaign_id: CampaignId, caller: &Identity) -> Result<()> {
        let entry = self.campaigns.load(campaign_id)?;
        self.authorize(Operation::CancelCampaign, caller, Some(&entry.config.creator))?;

        let mut book = entry.lock();
        if book.state.status != CampaignStatus::Active {
            return Err(StateError::CampaignNotActive {
                campaign_id,
                status: book.state.status,
            }
            .into());
        }
        book.state.status = CampaignStatus::Cancelled;
        settlement::enable_refunds(campaign_id, &mut book)?;

        self.events.publish(LedgerEvent::CampaignCancelled {
            campaign_id,
            cancelled_by: caller.clone(),
        });
        self.events
            .publish(LedgerEvent::RefundsEnabled { campaign_id });
        info!(campaign_id, by = %caller, "campaign cancelled");
        Ok(())
    }

    /// Refund `caller`'s pro-rata share of the unreleased funds.
    ///
    /// The contribution record is zeroed before the transfer, so a second
    /// claim is rejected even if this transfer fails. Returns the amount paid.
    pub async fn claim_refund(&self, campaign_id: CampaignId, caller: &Identity) -> Result<Amount> {
        let entry = self.campaigns.load(campaign_id)?;
        self.authorize(Operation::ClaimRefund, caller, Some(&entry.config.creator))?;

        let payout = {
            let mut book = entry.lock();
            settlement::mark_refund(campaign_id, &mut book, caller)?
        };

        self.pay(campaign_id, &payout).await?;
        self.events.publish(LedgerEvent::RefundClaimed {
            campaign_id,
            backer: payout.to,
            amount: payout.amount,
        });
        info!(campaign_id, backer = %caller, amount = payout.amount, "refund paid");
        Ok(payout.amount)
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub fn get_campaign(&self, campaign_id: CampaignId) -> Result<Campaign> {
        let entry = self.campaigns.load(campaign_id)?;
        Ok(snapshot(&entry))
    }

    pub fn get_milestone(&self, campaign_id: CampaignId, index: MilestoneIndex) -> Result<Milestone> {
        let entry = self.campaigns.load(campaign_id)?;
        let book = entry.lock();
        Ok(book.milestone(campaign_id, index)?.clone())
    }

    pub fn get_milestones(&self, campaign_id: CampaignId) -> Result<Vec<Milestone>> {
        let entry = self.campaigns.load(campaign_id)?;
        let book = entry.lock();
        Ok(book.milestones.clone())
    }

    /// Number of campaigns ever created; also the highest assigned id.
    pub fn campaign_count(&self) -> u64 {
        self.campaigns.count()
    }

    /// Active campaigns in ascending id order, skipping the first `start`
    /// matches and returning at most `limit`.
    pub fn active_campaigns(&self, start: usize, limit: usize) -> Vec<Campaign> {
        self.campaigns
            .all()
            .iter()
            .map(|entry| snapshot(entry))
            .filter(|campaign| campaign.status == CampaignStatus::Active)
            .skip(start)
            .take(limit)
            .collect()
    }

    /// Current contribution record of `backer`; zero if absent or refunded.
    pub fn contribution_of(&self, campaign_id: CampaignId, backer: &Identity) -> Result<Amount> {
        let entry = self.campaigns.load(campaign_id)?;
        let book = entry.lock();
        Ok(book.contribution_of(backer))
    }

    /// Percentage of the raised funds whose milestones never released.
    pub fn unreleased_percentage(&self, campaign_id: CampaignId) -> Result<u32> {
        let entry = self.campaigns.load(campaign_id)?;
        let book = entry.lock();
        Ok(settlement::unreleased_percentage(&book))
    }

    // ─────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────

    fn require_not_paused(&self) -> Result<()> {
        if self.protocol.is_paused() {
            return Err(StateError::Paused.into());
        }
        Ok(())
    }

    fn authorize(
        &self,
        operation: Operation,
        caller: &Identity,
        creator: Option<&Identity>,
    ) -> Result<()> {
        let authority = self.protocol.authority();
        rbac::authorize(operation, caller, &authority, creator).map_err(|e| {
            debug!(caller = %caller, %operation, "authorization rejected");
            e.into()
        })
    }

    /// Execute a committed payout. Zero-value payouts are skipped.
    async fn pay(&self, campaign_id: CampaignId, payout: &Payout) -> Result<()> {
        if payout.amount == 0 {
            return Ok(());
        }
        self.transfer
            .transfer(&payout.to, payout.amount)
            .await
            .map_err(|source| {
                error!(
                    campaign_id,
                    payee = %payout.to,
                    amount = payout.amount,
                    reason = %source.reason,
                    "transfer failed; funds remain marked as paid and will not be retried"
                );
                LedgerError::Transfer {
                    campaign_id,
                    source,
                }
            })
    }
}

fn snapshot(entry: &CampaignEntry) -> Campaign {
    let book = entry.lock();
    Campaign::from_parts(&entry.config, &book.state)
}
