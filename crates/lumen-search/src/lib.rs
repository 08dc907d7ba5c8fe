//! Search providers backing the web and image branches.

pub mod brave;
pub mod mock;

pub use brave::BraveSearchProvider;
pub use mock::{image_hit, web_hit, MockSearchProvider, ScriptedResult};
