mod error;
mod handlers;
mod models;
mod problems;
mod state;

pub use handlers::{router, run_server};
pub use state::ServerState;
