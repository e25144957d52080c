//! Tracing initialization for hosts embedding the engine

use tracing_subscriber::EnvFilter;

use crate::{EscrowResult, error::EscrowError};

/// Initialize the global tracing subscriber with an env-filter directive,
/// e.g. `"freelance_escrow=debug,info"`
pub fn init_tracing(directive: &str) -> EscrowResult<()> {
    let filter = EnvFilter::try_new(directive)
        .map_err(|err| EscrowError::config(format!("invalid tracing directive: {err}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| EscrowError::config(format!("tracing initialization failed: {err}")))?;

    Ok(())
}
