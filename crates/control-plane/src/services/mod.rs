// Services layer for business logic
// Services own business logic and validation, calling storage and the third-party clients directly

pub mod event;
pub mod external_event;
pub mod user;
pub mod user_event;

#[cfg(test)]
pub mod testing;

pub use event::EventService;
pub use external_event::ExternalEventService;
pub use user::UserService;
pub use user_event::UserEventService;
