//! User profile routes
//!
//! - GET  /api/user/profile - current user's profile and balance
//! - POST /api/user/onboard - role selection or full onboarding details

use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{Role, UserDoc};
use crate::routes::helpers::{
    authenticate, cors_preflight, error_response, method_not_allowed, not_found, ok_data,
    ok_message_data, parse_json_body, BoxBody, DEFAULT_BODY_LIMIT,
};
use crate::server::AppState;
use crate::types::{BursarError, Result};

#[derive(Debug, Deserialize)]
pub struct OnboardRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    pub role: String,
    pub token_balance: i64,
    pub created_at: String,
}

impl From<&UserDoc> for ProfileResponse {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            college: user.college.clone(),
            course: user.course.clone(),
            role: user.role.to_string(),
            token_balance: user.token_balance,
            created_at: user.metadata.created_at_rfc3339(),
        }
    }
}

/// Route dispatcher for /api/user/*
pub async fn handle_user_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let path = req.uri().path().split('?').next().unwrap_or("").to_string();
    let method = req.method().clone();

    if method == Method::OPTIONS {
        return cors_preflight();
    }

    match (method, path.as_str()) {
        (Method::GET, "/api/user/profile") => match handle_profile(req, state).await {
            Ok(resp) => resp,
            Err(e) => error_response(e),
        },
        (Method::POST, "/api/user/onboard") => match handle_onboard(req, state).await {
            Ok(resp) => resp,
            Err(e) => error_response(e),
        },
        (_, "/api/user/profile") | (_, "/api/user/onboard") => method_not_allowed(),
        _ => not_found(&path),
    }
}

async fn handle_profile(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = authenticate(&req, &state).await?;
    Ok(ok_data(&ProfileResponse::from(&user)))
}

async fn handle_onboard(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = authenticate(&req, &state).await?;
    let body: OnboardRequest = parse_json_body(req, DEFAULT_BODY_LIMIT).await?;

    let role = body.role.as_deref().map(parse_onboard_role).transpose()?;

    // Role-only update covers the initial role selection screen
    let role_only =
        role.is_some() && body.name.is_none() && body.college.is_none() && body.course.is_none();

    if !role_only && (body.name.is_none() || body.college.is_none() || body.course.is_none()) {
        return Err(BursarError::Validation(
            "Name, college, and course are required for full onboarding".into(),
        ));
    }

    let updated = state
        .ledger
        .update_profile(&user.id, body.name, body.college, body.course, role)
        .await?;

    info!(user = %updated.id, role = %updated.role, "User onboarded");

    let message = if role_only {
        "Role updated successfully"
    } else {
        "Profile updated successfully"
    };
    Ok(ok_message_data(message, &ProfileResponse::from(&updated)))
}

/// Onboarding may pick student or creator; admin is assigned by
/// configuration only
fn parse_onboard_role(value: &str) -> Result<Role> {
    match value.parse::<Role>() {
        Ok(Role::Admin) | Err(_) => Err(BursarError::Validation(format!(
            "Invalid role: {}",
            value
        ))),
        Ok(role) => Ok(role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_onboard_role() {
        assert_eq!(parse_onboard_role("student").unwrap(), Role::Student);
        assert_eq!(parse_onboard_role("creator").unwrap(), Role::Creator);
        assert!(parse_onboard_role("admin").is_err());
        assert!(parse_onboard_role("wizard").is_err());
    }

    #[test]
    fn test_profile_response_shape() {
        let mut user = UserDoc::new("sub".into(), "a@example.edu".into(), Role::Student, 100);
        user.name = Some("Ada".into());

        let profile = ProfileResponse::from(&user);
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["tokenBalance"], 100);
        assert_eq!(json["role"], "student");
        assert_eq!(json["name"], "Ada");
    }
}
