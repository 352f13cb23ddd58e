//! Identity verification
//!
//! Bursar delegates authentication to an external identity provider; what
//! arrives here is a bearer JWT signed with a shared secret. Verification
//! yields the (subject, email, role-hint) triple the ledger trusts as given.
//! Provider internals (sessions, refresh, key rotation) are out of scope.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Args;
use crate::db::schemas::Role;
use crate::types::{BursarError, Result};

/// Claims carried by an identity-provider token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Provider subject (stable per user)
    pub sub: String,
    /// Verified email address
    pub email: String,
    /// Display name, if the provider has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Role hint chosen at sign-up (student/creator)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// A verified identity, as trusted by the ledger
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub role_hint: Option<Role>,
}

/// Verifies identity-provider JWTs
#[derive(Clone)]
pub struct IdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl IdentityVerifier {
    /// Create a verifier for the given shared secret
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Build from configuration (dev mode falls back to an insecure secret)
    pub fn from_args(args: &Args) -> Self {
        Self::new(&args.jwt_secret())
    }

    /// Verify a token and extract the identity
    pub fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| BursarError::Unauthorized(format!("Invalid or expired token: {}", e)))?;

        let claims = data.claims;
        let role_hint = claims.role.as_deref().and_then(|r| r.parse().ok());

        Ok(VerifiedIdentity {
            subject: claims.sub,
            email: claims.email,
            name: claims.name,
            role_hint,
        })
    }
}

/// Extract the bearer token from an Authorization header value
pub fn extract_token_from_header(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(exp_offset_secs: i64) -> Claims {
        let now = chrono::Utc::now().timestamp();
        Claims {
            sub: "user_abc".into(),
            email: "a@example.edu".into(),
            name: Some("Ada".into()),
            role: Some("creator".into()),
            exp: (now + exp_offset_secs).max(0) as u64,
        }
    }

    #[test]
    fn test_verify_round_trip() {
        let verifier = IdentityVerifier::new("secret");
        let token = token_for(&claims(3600), "secret");

        let identity = verifier.verify(&token).unwrap();
        assert_eq!(identity.subject, "user_abc");
        assert_eq!(identity.email, "a@example.edu");
        assert_eq!(identity.name.as_deref(), Some("Ada"));
        assert_eq!(identity.role_hint, Some(Role::Creator));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let verifier = IdentityVerifier::new("secret");
        let token = token_for(&claims(3600), "other-secret");
        assert!(matches!(
            verifier.verify(&token).unwrap_err(),
            BursarError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = IdentityVerifier::new("secret");
        let token = token_for(&claims(-3600), "secret");
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_unknown_role_hint_ignored() {
        let verifier = IdentityVerifier::new("secret");
        let mut c = claims(3600);
        c.role = Some("professor".into());
        let identity = verifier.verify(&token_for(&c, "secret")).unwrap();
        assert_eq!(identity.role_hint, None);
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token_from_header("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_token_from_header("Bearer "), None);
        assert_eq!(extract_token_from_header("Basic abc123"), None);
        assert_eq!(extract_token_from_header("abc123"), None);
    }
}
