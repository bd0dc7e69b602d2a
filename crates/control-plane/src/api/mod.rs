// HTTP API routes
//
// Each submodule handles one resource with its own AppState.

pub mod common;
pub mod events;
pub mod external;
pub mod health;
pub mod user_events;
pub mod users;

#[cfg(test)]
pub mod testing;

// Re-export common types
pub use common::{ApiError, ErrorResponse, StatusMessage};
