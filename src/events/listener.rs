use async_trait::async_trait;

use super::TeamEvent;

/// Handles team events asynchronously.
///
/// Implement this to forward events elsewhere, e.g. an audit log or a
/// notification queue. Attach it to a gateway through an
/// [`EventBus`](super::EventBus).
///
/// # Example
///
/// ```rust,ignore
/// use teamward::events::{Listener, TeamEvent};
/// use async_trait::async_trait;
///
/// struct OwnershipAudit;
///
/// #[async_trait]
/// impl Listener for OwnershipAudit {
///     fn accepts(&self, event: &TeamEvent) -> bool {
///         matches!(event, TeamEvent::PrimaryOwnerTransferred { .. })
///     }
///
///     async fn handle(&self, event: &TeamEvent) {
///         // record the hand-over
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Whether [`handle`](Listener::handle) should run for this event.
    fn accepts(&self, _event: &TeamEvent) -> bool {
        true
    }

    async fn handle(&self, event: &TeamEvent);
}
