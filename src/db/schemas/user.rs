//! User document schema
//!
//! Stores the identity-provider mapping, profile fields, and the token
//! balance. The balance is mutated only through the ledger store.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Marketplace role assigned to a user
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Creator,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Creator => write!(f, "creator"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "creator" => Ok(Role::Creator),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Stable user identifier (UUID)
    pub id: String,

    /// Identity-provider subject this user was provisioned from
    pub subject: String,

    /// Verified email address
    pub email: String,

    /// Display name (set during onboarding)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// College (set during onboarding)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,

    /// Course (set during onboarding)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,

    /// Marketplace role
    #[serde(default)]
    pub role: Role,

    /// Current token balance; never negative after a committed transaction
    #[serde(default)]
    pub token_balance: i64,
}

impl UserDoc {
    /// Create a new user document
    pub fn new(subject: String, email: String, role: Role, token_balance: i64) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id: uuid::Uuid::new_v4().to_string(),
            subject,
            email,
            name: None,
            college: None,
            course: None,
            role,
            token_balance,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the stable user id
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
            // Unique index on the identity-provider subject
            (
                doc! { "subject": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("subject_unique".to_string())
                        .build(),
                ),
            ),
            // Index on email for admin auto-assignment lookups
            (
                doc! { "email": 1 },
                Some(IndexOptions::builder().name("email_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Student, Role::Creator, Role::Admin] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("professor".parse::<Role>().is_err());
    }

    #[test]
    fn test_new_user_defaults() {
        let user = UserDoc::new("sub_1".into(), "a@example.edu".into(), Role::Student, 100);
        assert_eq!(user.token_balance, 100);
        assert_eq!(user.role, Role::Student);
        assert!(!user.id.is_empty());
        assert!(user.name.is_none());
    }
}
