//! Escrow engine - custody lifecycle for freelance engagements
//!
//! This module coordinates the complete lifecycle of an engagement from
//! creation through funding, delivery, and terminal disbursement, including
//! dispute arbitration. Every mutating operation takes the authenticated
//! caller identity, validates authorization before state before arguments,
//! and commits a state change only after the value transfer is confirmed:
//! state and custody must not diverge.

use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::{
    EscrowResult,
    error::EscrowError,
    ledger::{Payout, ValueTransfer},
    models::{DisputeRecord, Engagement, EscrowEvent, EscrowState, Resolution},
};

/// Scale of the arbiter's split fraction: 10_000 basis points = 100%
pub const SPLIT_SCALE_BPS: u16 = 10_000;

/// Configuration for the escrow engine
#[derive(Debug, Clone)]
pub struct EscrowEngineConfig {
    /// Client grace window after delivery, in seconds, before anyone may
    /// trigger auto release
    pub grace_period_secs: u64,
    /// Maximum escrow amount in sats
    pub max_escrow_amount_sats: u64,
}

impl Default for EscrowEngineConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 259_200,         // 72 hours
            max_escrow_amount_sats: 10_000_000, // 0.1 BTC
        }
    }
}

/// Engagement creation request
#[derive(Debug, Clone)]
pub struct CreateEngagementRequest {
    pub client_pubkey: String,
    pub freelancer_pubkey: String,
    pub arbiter_pubkey: String,
}

/// Main escrow engine managing many independent engagements
///
/// Operations on distinct engagements run fully in parallel; within one
/// engagement every mutating operation holds the engagement lock across
/// validate, transfer, and commit, so no two operations ever act on the
/// same observed state.
pub struct EscrowEngine {
    config: EscrowEngineConfig,
    /// Value-transfer substrate performing the actual debits and credits
    ledger: Arc<dyn ValueTransfer>,
    /// Engagement storage, one lock per engagement
    engagements: RwLock<HashMap<Uuid, Arc<Mutex<Engagement>>>>,
    /// Append-only audit trail
    events: RwLock<Vec<EscrowEvent>>,
}

impl EscrowEngine {
    /// Create a new engine on top of a value-transfer substrate
    pub fn new(config: EscrowEngineConfig, ledger: Arc<dyn ValueTransfer>) -> Self {
        Self {
            config,
            ledger,
            engagements: RwLock::new(HashMap::new()),
            events: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &EscrowEngineConfig {
        &self.config
    }

    /// Register a new engagement between a client and a freelancer
    pub async fn create_engagement(
        &self,
        request: CreateEngagementRequest,
    ) -> EscrowResult<Engagement> {
        for (role, pubkey) in [
            ("client", &request.client_pubkey),
            ("freelancer", &request.freelancer_pubkey),
            ("arbiter", &request.arbiter_pubkey),
        ] {
            if pubkey.trim().is_empty() {
                return Err(EscrowError::invalid_argument(format!(
                    "{role} pubkey cannot be empty"
                )));
            }
        }

        if request.client_pubkey == request.freelancer_pubkey
            || request.client_pubkey == request.arbiter_pubkey
            || request.freelancer_pubkey == request.arbiter_pubkey
        {
            return Err(EscrowError::invalid_argument(
                "client, freelancer and arbiter must be distinct parties",
            ));
        }

        let engagement = Engagement::new(
            request.client_pubkey,
            request.freelancer_pubkey,
            request.arbiter_pubkey,
        );

        self.engagements
            .write()
            .await
            .insert(engagement.id, Arc::new(Mutex::new(engagement.clone())));

        self.record_event(
            "engagement.created",
            engagement.id,
            Some(&engagement.client_pubkey),
            None,
            Some(serde_json::json!({
                "freelancer": engagement.freelancer_pubkey,
                "arbiter": engagement.arbiter_pubkey,
            })),
        )
        .await;

        info!("Created engagement: {}", engagement.id);

        Ok(engagement)
    }

    /// Fund an engagement: the client deposits the escrow amount
    pub async fn fund(
        &self,
        caller: &str,
        engagement_id: Uuid,
        amount_sats: u64,
    ) -> EscrowResult<Engagement> {
        let entry = self.entry(engagement_id).await?;
        let mut engagement = entry.lock().await;

        if caller != engagement.client_pubkey {
            return Err(EscrowError::unauthorized(
                "only the client may fund the escrow",
            ));
        }
        if !engagement.state.can_fund() {
            return Err(EscrowError::invalid_state(
                "fund",
                engagement.state,
                "the escrow has already been funded",
            ));
        }
        if amount_sats == 0 {
            return Err(EscrowError::invalid_argument(
                "escrow amount must be greater than zero",
            ));
        }
        if amount_sats > self.config.max_escrow_amount_sats {
            return Err(EscrowError::invalid_argument(format!(
                "amount {} sats exceeds maximum {}",
                amount_sats, self.config.max_escrow_amount_sats
            )));
        }

        self.ledger
            .collect(
                &engagement.client_pubkey,
                &engagement.escrow_account(),
                amount_sats,
            )
            .await?;

        engagement.amount_sats = amount_sats;
        engagement.state = EscrowState::Funded;
        engagement.funded_at = Some(Utc::now());

        self.record_event(
            "engagement.funded",
            engagement_id,
            Some(caller),
            Some(amount_sats),
            None,
        )
        .await;

        info!("Funded engagement {} with {} sats", engagement_id, amount_sats);

        Ok(engagement.clone())
    }

    /// The freelancer acknowledges the engagement and begins work
    pub async fn begin_work(&self, caller: &str, engagement_id: Uuid) -> EscrowResult<Engagement> {
        let entry = self.entry(engagement_id).await?;
        let mut engagement = entry.lock().await;

        if caller != engagement.freelancer_pubkey {
            return Err(EscrowError::unauthorized(
                "only the freelancer may begin work",
            ));
        }
        if !engagement.state.can_begin_work() {
            return Err(EscrowError::invalid_state(
                "begin_work",
                engagement.state,
                "work can only begin on a funded escrow",
            ));
        }

        engagement.state = EscrowState::InProgress;

        self.record_event("work.started", engagement_id, Some(caller), None, None)
            .await;

        info!("Work started on engagement: {}", engagement_id);

        Ok(engagement.clone())
    }

    /// The freelancer marks work complete, opening the client's
    /// release-or-dispute window
    pub async fn mark_delivered(
        &self,
        caller: &str,
        engagement_id: Uuid,
    ) -> EscrowResult<Engagement> {
        let entry = self.entry(engagement_id).await?;
        let mut engagement = entry.lock().await;

        if caller != engagement.freelancer_pubkey {
            return Err(EscrowError::unauthorized(
                "only the freelancer may mark work delivered",
            ));
        }
        if !engagement.state.can_deliver() {
            return Err(EscrowError::invalid_state(
                "mark_delivered",
                engagement.state,
                "delivery requires a funded or in-progress escrow",
            ));
        }

        engagement.state = EscrowState::Delivered;
        engagement.delivered_at = Some(Utc::now());

        self.record_event("work.delivered", engagement_id, Some(caller), None, None)
            .await;

        info!("Work delivered on engagement: {}", engagement_id);

        Ok(engagement.clone())
    }

    /// The client approves delivery, releasing the full amount to the
    /// freelancer
    pub async fn approve_release(
        &self,
        caller: &str,
        engagement_id: Uuid,
    ) -> EscrowResult<Engagement> {
        let entry = self.entry(engagement_id).await?;
        let mut engagement = entry.lock().await;

        if caller != engagement.client_pubkey {
            return Err(EscrowError::unauthorized(
                "only the client may approve release",
            ));
        }
        if !engagement.state.can_release() {
            return Err(EscrowError::invalid_state(
                "approve_release",
                engagement.state,
                "release can only be approved once work is delivered",
            ));
        }

        let amount = engagement.amount_sats;
        self.disburse_and_finish(
            &mut engagement,
            amount,
            0,
            EscrowState::Released,
            "escrow.released",
            caller,
            None,
        )
        .await?;

        info!("Released engagement {} to freelancer", engagement_id);

        Ok(engagement.clone())
    }

    /// Either party freezes the engagement until the arbiter acts
    pub async fn raise_dispute(
        &self,
        caller: &str,
        engagement_id: Uuid,
        reason: &str,
    ) -> EscrowResult<Engagement> {
        let entry = self.entry(engagement_id).await?;
        let mut engagement = entry.lock().await;

        if !engagement.is_party(caller) {
            return Err(EscrowError::unauthorized(
                "only the client or the freelancer may raise a dispute",
            ));
        }
        if !engagement.state.can_dispute() {
            return Err(EscrowError::invalid_state(
                "raise_dispute",
                engagement.state,
                "disputes can only be raised while funds are in custody",
            ));
        }

        engagement.dispute = Some(DisputeRecord {
            raised_by: caller.to_string(),
            reason: reason.to_string(),
            raised_at: Utc::now(),
        });
        engagement.state = EscrowState::Disputed;

        self.record_event(
            "dispute.raised",
            engagement_id,
            Some(caller),
            None,
            Some(serde_json::json!({ "reason": reason })),
        )
        .await;

        info!("Dispute raised on engagement: {}", engagement_id);

        Ok(engagement.clone())
    }

    /// The arbiter resolves a dispute, directing the split between the
    /// parties as basis points owed to the freelancer
    ///
    /// `SPLIT_SCALE_BPS` releases everything to the freelancer, 0 refunds
    /// the client, anything between splits. The freelancer share rounds
    /// down; the client receives the remainder.
    pub async fn resolve(
        &self,
        caller: &str,
        engagement_id: Uuid,
        split_to_freelancer_bps: u16,
    ) -> EscrowResult<Engagement> {
        let entry = self.entry(engagement_id).await?;
        let mut engagement = entry.lock().await;

        if caller != engagement.arbiter_pubkey {
            return Err(EscrowError::unauthorized(
                "only the arbiter may resolve a dispute",
            ));
        }
        if !engagement.state.can_resolve() {
            return Err(EscrowError::invalid_state(
                "resolve",
                engagement.state,
                "only disputed engagements can be resolved",
            ));
        }
        if split_to_freelancer_bps > SPLIT_SCALE_BPS {
            return Err(EscrowError::invalid_argument(format!(
                "split {} exceeds {} basis points",
                split_to_freelancer_bps, SPLIT_SCALE_BPS
            )));
        }

        let amount = engagement.amount_sats;
        let freelancer_sats =
            (amount as u128 * split_to_freelancer_bps as u128 / SPLIT_SCALE_BPS as u128) as u64;
        let client_sats = amount - freelancer_sats;

        let (to_state, event_type) = match split_to_freelancer_bps {
            SPLIT_SCALE_BPS => (EscrowState::Released, "escrow.released"),
            0 => (EscrowState::Refunded, "escrow.refunded"),
            _ => (EscrowState::Split, "escrow.split"),
        };

        self.disburse_and_finish(
            &mut engagement,
            freelancer_sats,
            client_sats,
            to_state,
            event_type,
            caller,
            Some(serde_json::json!({
                "split_bps": split_to_freelancer_bps,
                "freelancer_sats": freelancer_sats,
                "client_sats": client_sats,
            })),
        )
        .await?;

        info!(
            "Resolved engagement {} at {} bps ({:?})",
            engagement_id, split_to_freelancer_bps, to_state
        );

        Ok(engagement.clone())
    }

    /// Release to the freelancer after the client grace window has elapsed
    /// with no dispute; callable by anyone
    pub async fn auto_release(
        &self,
        caller: &str,
        engagement_id: Uuid,
    ) -> EscrowResult<Engagement> {
        let entry = self.entry(engagement_id).await?;
        let mut engagement = entry.lock().await;

        if !engagement.state.can_release() {
            return Err(EscrowError::invalid_state(
                "auto_release",
                engagement.state,
                "auto release only applies to delivered work",
            ));
        }
        let delivered_at = engagement.delivered_at.ok_or_else(|| {
            EscrowError::invalid_state(
                "auto_release",
                engagement.state,
                "delivery timestamp is missing",
            )
        })?;
        let due_at = delivered_at + Duration::seconds(self.config.grace_period_secs as i64);
        if Utc::now() < due_at {
            return Err(EscrowError::invalid_state(
                "auto_release",
                engagement.state,
                "the client grace window has not elapsed",
            ));
        }

        let amount = engagement.amount_sats;
        self.disburse_and_finish(
            &mut engagement,
            amount,
            0,
            EscrowState::Released,
            "escrow.auto_released",
            caller,
            None,
        )
        .await?;

        info!("Auto-released engagement: {}", engagement_id);

        Ok(engagement.clone())
    }

    /// Get an engagement by ID
    pub async fn engagement(&self, engagement_id: Uuid) -> EscrowResult<Engagement> {
        let entry = self.entry(engagement_id).await?;
        let engagement = entry.lock().await;
        Ok(engagement.clone())
    }

    /// Get all engagements where `pubkey` is the client or the freelancer
    pub async fn engagements_for(&self, pubkey: &str) -> Vec<Engagement> {
        let map = self.engagements.read().await;
        let mut found = Vec::new();
        for entry in map.values() {
            let engagement = entry.lock().await;
            if engagement.is_party(pubkey) {
                found.push(engagement.clone());
            }
        }
        found
    }

    /// Get the audit events recorded for an engagement
    pub async fn events_for(&self, engagement_id: Uuid) -> Vec<EscrowEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| event.engagement_id == engagement_id)
            .cloned()
            .collect()
    }

    /// Delivered engagements whose grace window has elapsed, evaluated
    /// against the current time
    pub async fn due_for_auto_release(&self) -> Vec<Uuid> {
        let grace = Duration::seconds(self.config.grace_period_secs as i64);
        let now = Utc::now();

        let map = self.engagements.read().await;
        let mut due = Vec::new();
        for (id, entry) in map.iter() {
            let engagement = entry.lock().await;
            if engagement.state == EscrowState::Delivered
                && engagement
                    .delivered_at
                    .is_some_and(|delivered_at| now >= delivered_at + grace)
            {
                due.push(*id);
            }
        }
        due
    }

    async fn entry(&self, engagement_id: Uuid) -> EscrowResult<Arc<Mutex<Engagement>>> {
        self.engagements
            .read()
            .await
            .get(&engagement_id)
            .cloned()
            .ok_or(EscrowError::NotFound(engagement_id))
    }

    /// Perform the terminal disbursement, then commit the state change.
    /// A substrate failure propagates with the engagement untouched.
    #[allow(clippy::too_many_arguments)]
    async fn disburse_and_finish(
        &self,
        engagement: &mut Engagement,
        freelancer_sats: u64,
        client_sats: u64,
        to_state: EscrowState,
        event_type: &str,
        actor: &str,
        metadata: Option<serde_json::Value>,
    ) -> EscrowResult<()> {
        let mut payouts = Vec::new();
        if freelancer_sats > 0 {
            payouts.push(Payout {
                to: engagement.freelancer_pubkey.clone(),
                amount_sats: freelancer_sats,
            });
        }
        if client_sats > 0 {
            payouts.push(Payout {
                to: engagement.client_pubkey.clone(),
                amount_sats: client_sats,
            });
        }

        self.ledger
            .disburse(&engagement.escrow_account(), &payouts)
            .await?;

        debug_assert!(engagement.state.can_transition_to(to_state));
        engagement.resolution = Some(Resolution {
            freelancer_sats,
            client_sats,
        });
        engagement.amount_sats = 0;
        engagement.state = to_state;
        engagement.resolved_at = Some(Utc::now());

        self.record_event(
            event_type,
            engagement.id,
            Some(actor),
            Some(freelancer_sats + client_sats),
            metadata,
        )
        .await;

        Ok(())
    }

    async fn record_event(
        &self,
        event_type: &str,
        engagement_id: Uuid,
        actor_pubkey: Option<&str>,
        amount_sats: Option<u64>,
        metadata: Option<serde_json::Value>,
    ) {
        self.events.write().await.push(EscrowEvent {
            event_type: event_type.to_string(),
            engagement_id,
            actor_pubkey: actor_pubkey.map(str::to_string),
            amount_sats,
            metadata,
            created_at: Utc::now(),
        });
    }
}
