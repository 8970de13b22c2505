use std::sync::Arc;

use super::{Listener, TeamEvent};

/// The listeners attached to one [`AccessGateway`](crate::AccessGateway).
///
/// Cloning is cheap and shares the listeners. Two gateways built with
/// separate buses never see each other's events.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Vec<Arc<dyn Listener>>,
}

impl EventBus {
    /// A bus with no listeners. Publishing to it does nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener. Listeners run in the order they were added.
    #[must_use]
    pub fn listen(mut self, listener: impl Listener) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Hands a committed event to every listener whose
    /// [`Listener::accepts`] returns true.
    pub async fn publish(&self, event: TeamEvent) {
        for listener in &self.listeners {
            if listener.accepts(&event) {
                listener.handle(&event).await;
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
