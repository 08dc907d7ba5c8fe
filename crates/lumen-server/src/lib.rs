pub mod handlers;
pub mod rpc;
pub mod server;

pub use handlers::HandlerState;
pub use server::{build_router, start, ServerConfig, ServerHandle};
