pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::GatewayError;
pub use server::{router, run_server};
pub use state::{AppState, CompletionSettings};
