//! Configuration for the access gateway.
//!
//! # Example
//!
//! ```rust
//! use teamward::config::{AccessConfig, InvitationConfig};
//! use chrono::Duration;
//!
//! let config = AccessConfig {
//!     invitations: InvitationConfig {
//!         lifetime: Duration::hours(12),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert_eq!(config.default_page_size, 25);
//! ```

use chrono::Duration;

use crate::crypto::{DEFAULT_TOKEN_LENGTH, MIN_TOKEN_LENGTH};

/// Top-level settings for [`AccessGateway`](crate::AccessGateway).
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Invitation token settings.
    pub invitations: InvitationConfig,

    /// Page size used when an invitation listing does not ask for one.
    ///
    /// Default: 25
    pub default_page_size: u32,

    /// Upper bound applied to any requested page size.
    ///
    /// Default: 100
    pub max_page_size: u32,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            invitations: InvitationConfig::default(),
            default_page_size: 25,
            max_page_size: 100,
        }
    }
}

impl AccessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorter-lived, longer invitation tokens and smaller pages.
    pub fn strict() -> Self {
        Self {
            invitations: InvitationConfig {
                lifetime: Duration::hours(1),
                token_length: 48,
            },
            default_page_size: 25,
            max_page_size: 50,
        }
    }

    /// Clamps a requested page size into `1..=max_page_size`.
    pub(crate) fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

/// Invitation token settings.
#[derive(Debug, Clone)]
pub struct InvitationConfig {
    /// How long after creation an invitation can be looked up or accepted.
    ///
    /// Default: 24 hours
    pub lifetime: Duration,

    /// Length of generated tokens. Values below 30 are raised to 30.
    ///
    /// Default: 32
    pub token_length: usize,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::hours(24),
            token_length: DEFAULT_TOKEN_LENGTH,
        }
    }
}

impl InvitationConfig {
    /// Token length actually used when issuing invitations.
    pub fn effective_token_length(&self) -> usize {
        self.token_length.max(MIN_TOKEN_LENGTH)
    }
}
