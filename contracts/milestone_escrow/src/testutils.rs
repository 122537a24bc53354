//! Deterministic host doubles for tests: a settable clock, an in-memory event
//! log, and a transfer recorder that can be told to fail.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::env::{Clock, Transfer};
use crate::errors::TransferError;
use crate::events::{EventSink, LedgerEvent};
use crate::types::{Amount, CampaignDraft, Identity, MilestoneSpec, Timestamp};
use crate::EscrowLedger;

#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn at(now: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<LedgerEvent>>,
}

impl MemoryEventLog {
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    pub fn last(&self) -> Option<LedgerEvent> {
        self.events.lock().unwrap().last().cloned()
    }
}

impl EventSink for MemoryEventLog {
    fn publish(&self, event: LedgerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Records successful payouts; fails for listed payees or for every call.
#[derive(Debug, Default)]
pub struct RecordingTransfer {
    paid: Mutex<Vec<(Identity, Amount)>>,
    attempts: AtomicU64,
    fail_all: AtomicBool,
    failing: Mutex<HashSet<Identity>>,
}

impl RecordingTransfer {
    pub fn paid(&self) -> Vec<(Identity, Amount)> {
        self.paid.lock().unwrap().clone()
    }

    pub fn total_paid_to(&self, who: &Identity) -> Amount {
        self.paid
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == who)
            .map(|(_, amount)| amount)
            .sum()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn fail_for(&self, who: &Identity) {
        self.failing.lock().unwrap().insert(who.clone());
    }
}

#[async_trait]
impl Transfer for RecordingTransfer {
    async fn transfer(&self, to: &Identity, amount: Amount) -> Result<(), TransferError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(to) {
            return Err(TransferError::new(to, amount, "payee rejected"));
        }
        self.paid.lock().unwrap().push((to.clone(), amount));
        Ok(())
    }
}

/// A ledger wired to fresh doubles, with handles to inspect them.
pub struct Harness {
    pub ledger: Arc<EscrowLedger>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<MemoryEventLog>,
    pub transfers: Arc<RecordingTransfer>,
    pub authority: Identity,
}

impl Harness {
    pub const START: Timestamp = 1_700_000_000;

    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::at(Self::START));
        let events = Arc::new(MemoryEventLog::default());
        let transfers = Arc::new(RecordingTransfer::default());
        let authority = Identity::from("authority");
        let ledger = Arc::new(EscrowLedger::new(
            authority.clone(),
            transfers.clone(),
            clock.clone(),
            events.clone(),
        ));
        Self {
            ledger,
            clock,
            events,
            transfers,
            authority,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// A 30-day campaign with one 10-day milestone per percentage.
pub fn draft(funding_goal: Amount, percentages: &[u32]) -> CampaignDraft {
    CampaignDraft {
        title: "Community solar".to_string(),
        description: "Panels for the village school".to_string(),
        funding_goal,
        duration_days: 30,
        milestones: percentages
            .iter()
            .enumerate()
            .map(|(i, pct)| MilestoneSpec {
                title: format!("phase {i}"),
                description: format!("deliverable {i}"),
                funding_percentage: *pct,
                duration_days: 10,
            })
            .collect(),
    }
}
