//! The caller identity passed explicitly to every operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is making a call, as resolved by the external identity layer.
///
/// A service caller passes every membership check. It still cannot break
/// team invariants (removing or demoting a primary owner) and cannot make
/// anyone primary owner, since it is never the current primary owner itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    pub identity: Uuid,
    pub is_service: bool,
}

impl Caller {
    /// A regular end-user caller.
    pub fn user(identity: Uuid) -> Self {
        Self {
            identity,
            is_service: false,
        }
    }

    /// A privileged service caller.
    pub fn service(identity: Uuid) -> Self {
        Self {
            identity,
            is_service: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let id = Uuid::new_v4();
        assert!(!Caller::user(id).is_service);
        assert!(Caller::service(id).is_service);
        assert_eq!(Caller::user(id).identity, id);
    }
}
