//! Journal row shapes for [`LedgerEvent`]s.
//!
//! The full event is kept as JSON in `payload`; `campaign_id`, `actor` and
//! `amount` are lifted into columns so they can be filtered without parsing.

use chrono::Utc;
use milestone_escrow::LedgerEvent;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// A ledger event flattened for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub event_type: String,
    pub campaign_id: Option<i64>,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub payload: String,
    pub recorded_at: i64,
}

impl NewEvent {
    pub fn from_ledger(event: &LedgerEvent) -> Result<Self> {
        Ok(Self {
            event_type: event.kind().to_string(),
            campaign_id: event.campaign_id().and_then(|id| i64::try_from(id).ok()),
            actor: event.actor().map(|who| who.as_str().to_string()),
            // Amounts are u64 and may not fit SQLite's signed integer.
            amount: event.amount().map(|a| a.to_string()),
            payload: serde_json::to_string(event)?,
            recorded_at: Utc::now().timestamp(),
        })
    }
}

/// A journal row as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event_type: String,
    pub campaign_id: Option<i64>,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub payload: String,
    pub recorded_at: i64,
}
