// Swag core
//
// Storage-agnostic domain model for the events backend.
//
// Key design decisions:
// - Official (external) and user-authored events share one flat `Event` shape,
//   told apart by the `official` flag and a 3-character id prefix
// - Mapping between the source records and `Event` is pure; the caller
//   passes "now", the booked-id set and the event-site timezone
// - Third-party APIs are reached through the `EventSiteApi`/`MembershipApi` traits
// - Error handling distinguishes client errors, upstream failures and internal errors

pub mod datetime;
pub mod error;
pub mod event;
pub mod external_event;
pub mod mapping;
pub mod telemetry;
pub mod traits;
pub mod user;
pub mod user_event;

// Re-exports for convenience
pub use error::{EventError, Result};
pub use event::{
    Event, EventAttendee, EventFilter, EventHost, EventId, EventSource, EventTag, ShowAttendees,
};
pub use external_event::{BookedEvent, Category, ExternalEventDetails, ExternalNews, ExternalRoot};
pub use mapping::{map_event_to_user_event, map_external_event, map_user_event, MappingContext};
pub use traits::{EventSiteApi, MemberLogin, MembershipApi};
pub use user::{
    ContactInfo, SharedLocation, ShowLocation, UpdateUser, User, UserLocation, UserSettings,
};
pub use user_event::{Attendee, ExtendedUserEvent, Host, Location, Report, UserEvent};
