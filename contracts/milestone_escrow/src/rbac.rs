//! # Role-Based Access Control
//!
//! Roles are not stored per identity. They are derived on every call from two
//! facts: the platform authority configured on the ledger, and the creator
//! recorded in the campaign's immutable config.
//!
//! | Operation                          | Permitted                               |
//! |------------------------------------|-----------------------------------------|
//! | create, fund, claim refund         | anyone                                  |
//! | start milestone                    | campaign creator                        |
//! | complete / fail milestone          | authority, unless it is the creator     |
//! | cancel campaign                    | creator or authority                    |
//! | pause, unpause, transfer authority | authority                               |
//!
//! The creator never completes or fails its own milestones, even while also
//! holding the authority role.

use std::fmt;

use crate::errors::StateError;
use crate::types::Identity;

/// Role a caller holds relative to one campaign.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Role {
    /// Platform-wide verifier and operator.
    Authority,
    /// Identity that opened the campaign.
    Creator,
    /// Anyone else.
    Backer,
}

/// Every state-changing entry point of the ledger.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operation {
    CreateCampaign,
    FundCampaign,
    StartMilestone,
    CompleteMilestone,
    FailMilestone,
    CancelCampaign,
    ClaimRefund,
    Pause,
    Unpause,
    TransferAuthority,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateCampaign => "create a campaign",
            Self::FundCampaign => "fund a campaign",
            Self::StartMilestone => "start a milestone",
            Self::CompleteMilestone => "complete a milestone",
            Self::FailMilestone => "fail a milestone",
            Self::CancelCampaign => "cancel a campaign",
            Self::ClaimRefund => "claim a refund",
            Self::Pause => "pause the protocol",
            Self::Unpause => "unpause the protocol",
            Self::TransferAuthority => "transfer the authority role",
        };
        f.write_str(name)
    }
}

/// Roles `caller` holds. `creator` is `None` for protocol-level operations.
pub fn roles_of(caller: &Identity, authority: &Identity, creator: Option<&Identity>) -> Vec<Role> {
    let mut roles = Vec::with_capacity(2);
    if caller == authority {
        roles.push(Role::Authority);
    }
    if creator == Some(caller) {
        roles.push(Role::Creator);
    }
    if roles.is_empty() {
        roles.push(Role::Backer);
    }
    roles
}

/// Check whether `caller` may perform `operation`.
pub fn authorize(
    operation: Operation,
    caller: &Identity,
    authority: &Identity,
    creator: Option<&Identity>,
) -> Result<(), StateError> {
    let roles = roles_of(caller, authority, creator);
    let holds = |role: Role| roles.contains(&role);

    let permitted = match operation {
        Operation::CreateCampaign | Operation::FundCampaign | Operation::ClaimRefund => true,
        Operation::StartMilestone => holds(Role::Creator),
        Operation::CompleteMilestone | Operation::FailMilestone => {
            holds(Role::Authority) && !holds(Role::Creator)
        }
        Operation::CancelCampaign => holds(Role::Creator) || holds(Role::Authority),
        Operation::Pause | Operation::Unpause | Operation::TransferAuthority => {
            holds(Role::Authority)
        }
    };

    if permitted {
        Ok(())
    } else {
        Err(StateError::Unauthorized {
            caller: caller.clone(),
            operation,
        })
    }
}
