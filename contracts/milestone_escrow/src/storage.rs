//! # Storage
//!
//! Typed in-memory storage behind the ledger, split in two tiers.
//!
//! ## Protocol tier (one per ledger)
//!
//! | Item        | Type        | Description                               |
//! |-------------|-------------|-------------------------------------------|
//! | `authority` | `Identity`  | Platform authority, reassignable          |
//! | `paused`    | `bool`      | Global switch for create / fund           |
//!
//! ## Campaign tier (one entry per campaign)
//!
//! Entries live in an id-ordered index next to `count`, the last assigned id.
//!
//! | Item            | Type                      | Guard                |
//! |-----------------|---------------------------|----------------------|
//! | `config`        | `CampaignConfig`          | none (immutable)     |
//! | `state`         | `CampaignState`           | campaign mutex       |
//! | `milestones`    | `Vec<Milestone>`          | campaign mutex       |
//! | `contributions` | `HashMap<Identity, u64>`  | campaign mutex       |
//!
//! The campaign mutex is the serialization domain: every mutation of one
//! campaign runs read-validate-write under it, while different campaigns
//! proceed in parallel. The index lock is only held to look an entry up or
//! to insert a new one, and the counter is bumped under that same write lock so
//! ids and entries never diverge.
//!
//! Validation always precedes the first write, so a poisoned lock never guards
//! a half-applied mutation. Poisoning is ignored.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::errors::StateError;
use crate::types::{
    Amount, CampaignConfig, CampaignId, CampaignState, Identity, Milestone, MilestoneIndex,
};

// ── Protocol tier ────────────────────────────────────────────────────

pub(crate) struct ProtocolStore {
    authority: RwLock<Identity>,
    paused: AtomicBool,
}

impl ProtocolStore {
    pub fn new(authority: Identity) -> Self {
        Self {
            authority: RwLock::new(authority),
            paused: AtomicBool::new(false),
        }
    }

    pub fn authority(&self) -> Identity {
        self.authority
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the authority, returning the previous holder.
    pub fn replace_authority(&self, next: Identity) -> Identity {
        let mut guard = self.authority.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }
}

// ── Campaign tier ────────────────────────────────────────────────────

/// Mutable part of a campaign; only reachable through [`CampaignEntry::lock`].
#[derive(Debug)]
pub(crate) struct CampaignBook {
    pub state: CampaignState,
    pub milestones: Vec<Milestone>,
    /// Absent key means the identity never contributed.
    pub contributions: HashMap<Identity, Amount>,
}

impl CampaignBook {
    pub fn milestone(
        &self,
        campaign_id: CampaignId,
        index: MilestoneIndex,
    ) -> Result<&Milestone, StateError> {
        self.milestones
            .get(index as usize)
            .ok_or(StateError::MilestoneNotFound { campaign_id, index })
    }

    pub fn milestone_mut(
        &mut self,
        campaign_id: CampaignId,
        index: MilestoneIndex,
    ) -> Result<&mut Milestone, StateError> {
        self.milestones
            .get_mut(index as usize)
            .ok_or(StateError::MilestoneNotFound { campaign_id, index })
    }

    pub fn contribution_of(&self, backer: &Identity) -> Amount {
        self.contributions.get(backer).copied().unwrap_or(0)
    }
}

#[derive(Debug)]
pub(crate) struct CampaignEntry {
    pub config: CampaignConfig,
    book: Mutex<CampaignBook>,
}

impl CampaignEntry {
    pub fn new(config: CampaignConfig, book: CampaignBook) -> Self {
        Self {
            config,
            book: Mutex::new(book),
        }
    }

    /// Enter this campaign's serialization domain.
    pub fn lock(&self) -> MutexGuard<'_, CampaignBook> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
struct CampaignIndex {
    count: u64,
    campaigns: BTreeMap<CampaignId, Arc<CampaignEntry>>,
}

#[derive(Default)]
pub(crate) struct CampaignStore {
    index: RwLock<CampaignIndex>,
}

impl CampaignStore {
    /// Allocate the next id and insert the entry built for it.
    ///
    /// If `build` fails the counter is left untouched.
    pub fn insert_with<E>(
        &self,
        build: impl FnOnce(CampaignId) -> Result<CampaignEntry, E>,
    ) -> Result<Arc<CampaignEntry>, E> {
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        let id = index.count + 1;
        let entry = Arc::new(build(id)?);
        index.count = id;
        index.campaigns.insert(id, Arc::clone(&entry));
        Ok(entry)
    }

    pub fn load(&self, id: CampaignId) -> Result<Arc<CampaignEntry>, StateError> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .campaigns
            .get(&id)
            .cloned()
            .ok_or(StateError::CampaignNotFound(id))
    }

    pub fn count(&self) -> u64 {
        self.index.read().unwrap_or_else(PoisonError::into_inner).count
    }

    /// Snapshot of every entry in ascending id order.
    pub fn all(&self) -> Vec<Arc<CampaignEntry>> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .campaigns
            .values()
            .cloned()
            .collect()
    }
}
