// Storage layer for Swag
// Decision: Support both PostgreSQL (production) and in-memory (dev mode)
//
// Collections:
// - users: member profiles keyed by membership id
// - external_tokens: third-party access token per member
// - external_events / external_root / external_news: cache of the events API
// - user_events: member-authored events with attendees, hosts and reports

pub mod backend;
pub mod memory;
pub mod models;
pub mod repositories;

pub use backend::StorageBackend;
pub use memory::InMemoryDatabase;
pub use models::*;
pub use repositories::Database;
