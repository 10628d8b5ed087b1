//! Prompt Gateway core primitives
//!
//! Types shared between the gateway and the application that embeds it:
//!
//! - [`PromptRecord`]: a prompt row as returned by the storage layer
//! - [`PromptStore`]: the read-only lookup contract the gateway consumes
//! - [`ExposureEntry`]: a prompt's opaque identifier and exposure flag
//! - [`substitute_variables`]: literal `{{name}}` replacement used by the execute route

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod exposure;
mod prompt;
mod store;
mod variables;

pub use exposure::{ExposureEntry, mint_secure_hash};
pub use prompt::PromptRecord;
pub use store::{InMemoryPromptStore, PromptStore, StoreError};
pub use variables::{js_string, substitute_variables};
