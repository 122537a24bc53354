//! # Host environment
//!
//! The ledger owns no clock and moves no money itself. Both are supplied by the
//! host through the traits below, the way a contract receives its ledger
//! timestamp and token client from the environment.

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::TransferError;
use crate::types::{Amount, Identity, Timestamp};

/// Value-movement primitive.
///
/// By the time `transfer` is called the ledger has already committed the flag
/// that guards this payout, so a failure here never corrupts ledger state.
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn transfer(&self, to: &Identity, amount: Amount) -> Result<(), TransferError>;
}

/// Source of the current time, in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-epoch clocks clamp to zero.
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}
