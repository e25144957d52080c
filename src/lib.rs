//! Escrow engine for freelance engagements
//!
//! This crate implements the custody lifecycle of a fixed-amount escrow
//! between a client and a freelancer, with a neutral arbiter for disputes:
//! - a typed state machine with monotonic, audited transitions
//! - per-engagement serialization of all mutating operations
//! - dispute arbitration with exact basis-point splits
//! - a polling watcher that releases delivered work after the grace window
//!
//! Value movement and caller authentication are external substrates: the
//! engine drives a [`ledger::ValueTransfer`] implementation and compares
//! caller identities supplied by the host.

pub mod engine;
pub mod error;
pub mod ledger;
pub mod models;
pub mod settings;
pub mod telemetry;
pub mod watcher;

use error::EscrowError;

/// Result type alias for escrow operations
pub type EscrowResult<T> = Result<T, EscrowError>;
