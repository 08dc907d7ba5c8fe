pub mod openai;

pub mod mock;

pub use mock::{MockReasoner, MockResponse};
pub use openai::{OpenAiCompatClient, OpenAiConfig};
