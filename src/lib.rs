//! Prompt Gateway Library
//!
//! Local HTTP gateway that exposes a curated subset of stored prompts to
//! external tool-calling clients.
//!
//! # Features
//!
//! - **Opaque addressing**: prompts are reachable only through secure hashes,
//!   never their internal ids
//! - **Live control plane**: configuration and the exposed set can be changed
//!   while serving
//! - **Bearer auth**: optional shared API key, compared in constant time
//! - **Rate limiting**: fixed 60 second window per client IP
//! - **Observability**: request/error counters and a bounded log buffer for
//!   the embedding application's status view
//!
//! # Routes
//!
//! `GET /health`, `GET /prompts`, `GET /prompts/{hash}`,
//! `POST /prompts/{hash}/execute`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod store;

pub use error::{Error, Result};
pub use prompt_gateway_core::{
    ExposureEntry, InMemoryPromptStore, PromptRecord, PromptStore, StoreError, mint_secure_hash,
};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Internal(format!("Failed to install subscriber: {e}")))?,
        _ => subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| Error::Internal(format!("Failed to install subscriber: {e}")))?,
    }

    Ok(())
}
