//! Shared vocabulary for Lumen: identifiers, the query/result data model,
//! per-tab session state, and the collaborator traits the engine drives.

pub mod errors;
pub mod events;
pub mod ids;
pub mod provider;
pub mod query;
pub mod results;
pub mod security;
pub mod session;
