//! Authentication and authorization for Bursar
//!
//! Provides:
//! - Identity-provider JWT verification
//! - Role gates for creator-only operations

mod identity;

pub use identity::{extract_token_from_header, Claims, IdentityVerifier, VerifiedIdentity};

use crate::db::schemas::{Role, UserDoc};
use crate::types::{BursarError, Result};

/// Require an exact role on a resolved user
pub fn require_role(user: &UserDoc, role: Role) -> Result<()> {
    if user.role == role {
        Ok(())
    } else {
        Err(BursarError::Forbidden(format!("{} access required", capitalize(role))))
    }
}

fn capitalize(role: Role) -> String {
    let s = role.to_string();
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_role() {
        let creator = UserDoc::new("sub".into(), "c@example.edu".into(), Role::Creator, 100);
        assert!(require_role(&creator, Role::Creator).is_ok());

        let student = UserDoc::new("sub2".into(), "s@example.edu".into(), Role::Student, 100);
        let err = require_role(&student, Role::Creator).unwrap_err();
        assert!(matches!(err, BursarError::Forbidden(_)));
        assert!(err.to_string().contains("Creator access required"));

        // Admins are not implicitly creators
        let admin = UserDoc::new("sub3".into(), "a@example.edu".into(), Role::Admin, 100);
        assert!(require_role(&admin, Role::Creator).is_err());
    }
}
