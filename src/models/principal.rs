//! Represents an authenticated identity resolved from a bearer token.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Role attached to a principal. Registration defaults new accounts to
/// `User`; `Admin` exists for the role gate on restricted operations.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// An account row. Created by the external registration flow; this service
/// only ever reads it.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,

    pub display_name: String,

    /// Password hash owned by the registration collaborator. Never leaves
    /// the process in a response body.
    #[serde(skip_serializing)]
    pub credential_hash: String,

    pub role: Role,

    /// Weak reference to a stored file used as the avatar. The store does
    /// not enforce its existence; readers must tolerate it dangling.
    pub avatar_file_id: Option<Uuid>,
}
