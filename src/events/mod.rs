//! Team lifecycle events.
//!
//! The gateway publishes a [`TeamEvent`] on its [`EventBus`] after every
//! committed mutation. Nothing is published for failed or rolled-back calls.
//!
//! ```rust,ignore
//! use teamward::{AccessGateway, MemoryTeamStore};
//! use teamward::events::EventBus;
//! use teamward::events::listeners::LoggingListener;
//!
//! let gateway = AccessGateway::new(MemoryTeamStore::new())
//!     .with_events(EventBus::new().listen(LoggingListener::new()));
//! ```

mod bus;
mod event;
mod listener;

pub mod listeners;

pub use bus::EventBus;
pub use event::TeamEvent;
pub use listener::Listener;
