//! Built-in event listeners. Attach them with
//! [`EventBus::listen`](crate::events::EventBus::listen).

mod logging;
#[cfg(feature = "tracing")]
mod tracing;

pub use logging::LoggingListener;
#[cfg(feature = "tracing")]
pub use self::tracing::TracingListener;
