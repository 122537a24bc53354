use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::env::Transfer;
use crate::errors::TransferError;
use crate::events::LedgerEvent;
use crate::testutils::{draft, Harness, ManualClock, MemoryEventLog};
use crate::types::{Amount, Identity, SECONDS_PER_DAY};
use crate::EscrowLedger;

fn maker() -> Identity {
    Identity::from("maker")
}

#[test]
fn test_campaign_created_event() {
    let h = Harness::new();
    let campaign = h.ledger.create_campaign(&maker(), draft(5_000, &[100])).unwrap();

    assert_eq!(
        h.events.last(),
        Some(LedgerEvent::CampaignCreated {
            campaign_id: campaign.id,
            creator: maker(),
            title: "Community solar".to_string(),
            funding_goal: 5_000,
            deadline: Harness::START + 30 * SECONDS_PER_DAY,
        })
    );
}

#[test]
fn test_campaign_funded_event() {
    let h = Harness::new();
    let id = h.ledger.create_campaign(&maker(), draft(5_000, &[100])).unwrap().id;
    let donor = Identity::from("donor");

    h.ledger.fund_campaign(id, 1_234, &donor).unwrap();

    assert_eq!(
        h.events.last(),
        Some(LedgerEvent::CampaignFunded {
            campaign_id: id,
            contributor: donor,
            amount: 1_234,
        })
    );
    assert_eq!(h.events.count("goal_reached"), 0);
}

#[test]
fn test_goal_reached_follows_funding() {
    let h = Harness::new();
    let id = h.ledger.create_campaign(&maker(), draft(100, &[100])).unwrap().id;

    h.ledger.fund_campaign(id, 150, &Identity::from("donor")).unwrap();

    assert_eq!(
        h.events.kinds(),
        vec!["campaign_created", "campaign_funded", "goal_reached"]
    );
    assert_eq!(
        h.events.last(),
        Some(LedgerEvent::GoalReached {
            campaign_id: id,
            total_raised: 150,
        })
    );
}

/// Holds every payout until released, signalling when one is in flight.
#[derive(Default)]
struct HeldTransfer {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Transfer for HeldTransfer {
    async fn transfer(&self, _to: &Identity, _amount: Amount) -> Result<(), TransferError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_funds_released_may_trail_later_transitions() {
    let transfer = Arc::new(HeldTransfer::default());
    let events = Arc::new(MemoryEventLog::default());
    let authority = Identity::from("authority");
    let ledger = Arc::new(EscrowLedger::new(
        authority.clone(),
        transfer.clone(),
        Arc::new(ManualClock::at(Harness::START)),
        events.clone(),
    ));
    let id = ledger.create_campaign(&maker(), draft(1_000, &[40, 60])).unwrap().id;
    ledger.fund_campaign(id, 1_000, &Identity::from("donor")).unwrap();

    let release = tokio::spawn({
        let ledger = ledger.clone();
        let authority = authority.clone();
        async move { ledger.complete_milestone(id, 0, &authority).await }
    });
    transfer.entered.notified().await;

    // milestone 0 is already Completed while its payout is in flight
    ledger.start_milestone(id, 1, &maker()).unwrap();
    ledger.fail_milestone(id, 1, &authority).unwrap();

    transfer.release.notify_one();
    assert_eq!(release.await.unwrap().unwrap(), 400);

    assert_eq!(
        events.kinds(),
        vec![
            "campaign_created",
            "campaign_funded",
            "goal_reached",
            "milestone_completed",
            "milestone_started",
            "milestone_failed",
            "refunds_enabled",
            "funds_released",
        ]
    );
}

#[tokio::test]
async fn test_release_and_refund_event_sequence() {
    let h = Harness::new();
    let id = h.ledger.create_campaign(&maker(), draft(1_000, &[40, 60])).unwrap().id;
    let donor = Identity::from("donor");
    h.ledger.fund_campaign(id, 1_000, &donor).unwrap();

    h.ledger.complete_milestone(id, 0, &h.authority).await.unwrap();
    h.ledger.start_milestone(id, 1, &maker()).unwrap();
    h.ledger.fail_milestone(id, 1, &h.authority).unwrap();
    h.ledger.claim_refund(id, &donor).await.unwrap();

    assert_eq!(
        h.events.kinds(),
        vec![
            "campaign_created",
            "campaign_funded",
            "goal_reached",
            "milestone_completed",
            "funds_released",
            "milestone_started",
            "milestone_failed",
            "refunds_enabled",
            "refund_claimed",
        ]
    );

    let events = h.events.events();
    assert_eq!(
        events[4],
        LedgerEvent::FundsReleased {
            campaign_id: id,
            milestone_index: 0,
            creator: maker(),
            amount: 400,
        }
    );
    assert_eq!(
        events[8],
        LedgerEvent::RefundClaimed {
            campaign_id: id,
            backer: donor,
            amount: 600,
        }
    );
}

#[test]
fn test_cancel_event() {
    let h = Harness::new();
    let id = h.ledger.create_campaign(&maker(), draft(1_000, &[100])).unwrap().id;

    h.ledger.cancel_campaign(id, &h.authority).unwrap();

    let events = h.events.events();
    assert_eq!(
        events[events.len() - 2],
        LedgerEvent::CampaignCancelled {
            campaign_id: id,
            cancelled_by: h.authority.clone(),
        }
    );
    assert_eq!(
        events[events.len() - 1],
        LedgerEvent::RefundsEnabled { campaign_id: id }
    );
}

#[test]
fn test_protocol_events() {
    let h = Harness::new();
    let next = Identity::from("next");

    h.ledger.pause(&h.authority).unwrap();
    h.ledger.unpause(&h.authority).unwrap();
    h.ledger.transfer_authority(&h.authority, next.clone()).unwrap();

    assert_eq!(
        h.events.events(),
        vec![
            LedgerEvent::ProtocolPaused {
                by: h.authority.clone()
            },
            LedgerEvent::ProtocolUnpaused {
                by: h.authority.clone()
            },
            LedgerEvent::AuthorityTransferred {
                from: h.authority.clone(),
                to: next,
            },
        ]
    );
}

#[test]
fn test_rejected_operations_emit_nothing() {
    let h = Harness::new();
    let id = h.ledger.create_campaign(&maker(), draft(1_000, &[100])).unwrap().id;
    let before = h.events.events().len();

    let _ = h.ledger.fund_campaign(id, 0, &Identity::from("donor"));
    let _ = h.ledger.start_milestone(id, 0, &maker());
    let _ = h.ledger.cancel_campaign(id, &Identity::from("mallory"));
    let _ = h.ledger.pause(&maker());

    assert_eq!(h.events.events().len(), before);
}
