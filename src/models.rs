//! Core data models for the escrow engine
//!
//! This module contains the engagement record, its state machine, and the
//! audit event type. An engagement is one escrow instance covering a single
//! freelance job between one client and one freelancer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Engagement state machine enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowState {
    /// Engagement registered, no funds held
    Created,
    /// Client has deposited the amount; funds held in custody
    Funded,
    /// Freelancer has acknowledged and begun work
    InProgress,
    /// Freelancer has marked work complete, requesting release
    Delivered,
    /// A dispute freezes all unilateral transitions until the arbiter acts
    Disputed,
    /// Full amount transferred to the freelancer
    Released,
    /// Full amount returned to the client
    Refunded,
    /// Amount divided between the parties per arbiter decision
    Split,
}

impl EscrowState {
    /// Check if this is a terminal state (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Refunded | Self::Split)
    }

    /// Check if this state allows funding
    pub fn can_fund(&self) -> bool {
        matches!(self, Self::Created)
    }

    /// Check if this state allows the freelancer to begin work
    pub fn can_begin_work(&self) -> bool {
        matches!(self, Self::Funded)
    }

    /// Check if this state allows marking work delivered
    pub fn can_deliver(&self) -> bool {
        matches!(self, Self::Funded | Self::InProgress)
    }

    /// Check if this state allows release to the freelancer
    pub fn can_release(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Check if this state allows raising a dispute
    pub fn can_dispute(&self) -> bool {
        matches!(self, Self::Funded | Self::InProgress | Self::Delivered)
    }

    /// Check if this state allows arbiter resolution
    pub fn can_resolve(&self) -> bool {
        matches!(self, Self::Disputed)
    }

    /// Check whether `to` is a directed edge of the transition graph
    pub fn can_transition_to(&self, to: EscrowState) -> bool {
        matches!(
            (self, to),
            (Self::Created, Self::Funded)
                | (Self::Funded, Self::InProgress)
                | (Self::Funded, Self::Delivered)
                | (Self::Funded, Self::Disputed)
                | (Self::InProgress, Self::Delivered)
                | (Self::InProgress, Self::Disputed)
                | (Self::Delivered, Self::Released)
                | (Self::Delivered, Self::Disputed)
                | (Self::Disputed, Self::Released)
                | (Self::Disputed, Self::Refunded)
                | (Self::Disputed, Self::Split)
        )
    }
}

/// Record of a raised dispute, kept on the engagement for audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeRecord {
    pub raised_by: String,
    pub reason: String,
    pub raised_at: DateTime<Utc>,
}

/// Final disbursement amounts, written once at the terminal transition
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Resolution {
    pub freelancer_sats: u64,
    pub client_sats: u64,
}

/// One escrow instance between a client and a freelancer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engagement {
    pub id: Uuid,

    // Parties, set once at creation
    pub client_pubkey: String,
    pub freelancer_pubkey: String,
    pub arbiter_pubkey: String,

    /// Value in custody. Zero until funding, set once at funding,
    /// zeroed again when fully disbursed.
    pub amount_sats: u64,
    pub state: EscrowState,

    pub dispute: Option<DisputeRecord>,
    pub resolution: Option<Resolution>,

    // Write-once timestamps; only `delivered_at` ever influences
    // transition logic (the auto-release grace window)
    pub created_at: DateTime<Utc>,
    pub funded_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Engagement {
    /// Create a new engagement in the `Created` state
    pub fn new(client_pubkey: String, freelancer_pubkey: String, arbiter_pubkey: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_pubkey,
            freelancer_pubkey,
            arbiter_pubkey,
            amount_sats: 0,
            state: EscrowState::Created,
            dispute: None,
            resolution: None,
            created_at: Utc::now(),
            funded_at: None,
            delivered_at: None,
            resolved_at: None,
        }
    }

    /// Ledger account holding this engagement's custody
    pub fn escrow_account(&self) -> String {
        format!("escrow:{}", self.id)
    }

    /// Check if `pubkey` is the client or the freelancer
    pub fn is_party(&self, pubkey: &str) -> bool {
        self.client_pubkey == pubkey || self.freelancer_pubkey == pubkey
    }
}

/// Append-only audit record of an engine operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowEvent {
    pub event_type: String,
    pub engagement_id: Uuid,
    pub actor_pubkey: Option<String>,
    pub amount_sats: Option<u64>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
