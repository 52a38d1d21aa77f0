pub mod error;
pub mod handlers;
pub mod observability;
pub mod procedure;
pub mod procedures;
pub mod router;
pub mod state;
pub mod utils;

pub use error::AppError;
pub use state::{AppState, ServerMetadata, build_state};

#[cfg(test)]
pub mod test_support;
