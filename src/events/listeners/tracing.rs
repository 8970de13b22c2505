use async_trait::async_trait;

use crate::events::{Listener, TeamEvent};

/// Emits team events as `tracing` events under the `teamward::events`
/// target. Control changes are emitted at WARN, everything else at INFO.
/// Requires the `tracing` feature.
pub struct TracingListener;

#[async_trait]
impl Listener for TracingListener {
    async fn handle(&self, event: &TeamEvent) {
        let subject = event.subject().map(|id| id.to_string());
        if event.affects_control() {
            tracing::warn!(
                target: "teamward::events",
                event_name = event.name(),
                team_id = %event.team_id(),
                actor = %event.actor(),
                subject = subject.as_deref(),
                "team control changed"
            );
        } else {
            tracing::info!(
                target: "teamward::events",
                event_name = event.name(),
                team_id = %event.team_id(),
                actor = %event.actor(),
                subject = subject.as_deref(),
                "team event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_tracing_listener_handles_both_levels() {
        let listener = TracingListener;
        let team_id = Uuid::new_v4();

        listener
            .handle(&TeamEvent::TeamCreated {
                team_id,
                slug: None,
                created_by: Uuid::new_v4(),
                at: Utc::now(),
            })
            .await;
        listener
            .handle(&TeamEvent::PrimaryOwnerTransferred {
                team_id,
                from: Uuid::new_v4(),
                to: Uuid::new_v4(),
                at: Utc::now(),
            })
            .await;
    }
}
