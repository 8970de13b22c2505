use async_trait::async_trait;

use crate::events::{Listener, TeamEvent};

/// Writes one `key=value` line per team event through the `log` crate.
///
/// Events that change who controls a team (see
/// [`TeamEvent::affects_control`]) are logged at a separate, higher level
/// so they stand out in an audit trail.
pub struct LoggingListener {
    level: log::Level,
    control_level: log::Level,
}

impl LoggingListener {
    /// Routine events at INFO, control changes at WARN.
    pub fn new() -> Self {
        Self {
            level: log::Level::Info,
            control_level: log::Level::Warn,
        }
    }

    /// Logs every event, control changes included, at `level`.
    pub fn with_level(level: log::Level) -> Self {
        Self {
            level,
            control_level: level,
        }
    }

    #[must_use]
    pub fn control_level(mut self, level: log::Level) -> Self {
        self.control_level = level;
        self
    }

    fn level_for(&self, event: &TeamEvent) -> log::Level {
        if event.affects_control() {
            self.control_level
        } else {
            self.level
        }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

/// The per-variant fields after the common `event`, `team_id` and `actor`.
fn details(event: &TeamEvent) -> String {
    match event {
        TeamEvent::TeamCreated { slug, .. } => format!("slug={slug:?}"),
        TeamEvent::TeamUpdated { .. } => String::new(),
        TeamEvent::MemberRoleChanged {
            user_identity, role, ..
        } => format!("user={user_identity}, role={role}"),
        TeamEvent::PrimaryOwnerTransferred { from, to, .. } => format!("from={from}, to={to}"),
        TeamEvent::MemberRemoved { user_identity, .. } => format!("user={user_identity}"),
        TeamEvent::InvitationCreated {
            invitation_id,
            role,
            kind,
            ..
        } => format!("invitation_id={invitation_id}, role={role}, kind={kind}"),
        TeamEvent::InvitationAccepted {
            invitation_id,
            role,
            ..
        } => format!("invitation_id={invitation_id}, role={role}"),
        TeamEvent::InvitationRevoked { invitation_id, .. } => {
            format!("invitation_id={invitation_id}")
        }
    }
}

fn line(event: &TeamEvent) -> String {
    let mut line = format!(
        "event={}, team_id={}, actor={}, at={}",
        event.name(),
        event.team_id(),
        event.actor(),
        event.timestamp().to_rfc3339()
    );
    let details = details(event);
    if !details.is_empty() {
        line.push_str(", ");
        line.push_str(&details);
    }
    line
}

#[async_trait]
impl Listener for LoggingListener {
    async fn handle(&self, event: &TeamEvent) {
        log::log!(target: "teamward::events", self.level_for(event), "{}", line(event));
    }
}
