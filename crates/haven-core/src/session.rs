//! Verified user context.
//!
//! The identity collaborator hands over a verified
//! `(user_id, email, display_name)` triple after sign-in. The engine
//! threads this session explicitly into every client call instead of
//! keeping process-global "current user" state.

use serde::{Deserialize, Serialize};

use crate::property::UserId;

/// A verified user context for one signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque stable user key.
    pub user_id: UserId,
    /// Verified email; treated as an opaque stable key.
    pub email: String,
    /// Display name for presentation only.
    pub display_name: String,
}

impl Session {
    /// Build a session from a verified identity triple.
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self { user_id, email: email.into(), display_name: display_name.into() }
    }
}
