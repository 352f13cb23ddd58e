//! Content routes
//!
//! - POST /api/content/upload          - upload new content (creator only)
//! - GET  /api/content/recommendations - catalog listing with filters
//! - GET  /api/content/{id}            - content detail with entitlement
//! - POST /api/content/unlock          - purchase content with tokens

use base64::{engine::general_purpose, Engine as _};
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::require_role;
use crate::db::schemas::{ContentDoc, ContentKind, Role};
use crate::ledger::{CatalogFilter, RevenueSplit};
use crate::routes::helpers::{
    authenticate, cors_preflight, created_message_data, error_response, method_not_allowed,
    not_found, ok_data, ok_message_data, parse_json_body, query_param, BoxBody,
    DEFAULT_BODY_LIMIT,
};
use crate::server::AppState;
use crate::storage::bucket_for;
use crate::types::{BursarError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub price_tokens: i64,
    #[serde(default)]
    pub file_name: String,
    /// File payload, base64 encoded
    #[serde(default)]
    pub data_base64: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequest {
    #[serde(default)]
    pub content_id: String,
}

/// Catalog view of a content row; the storage path stays private
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentView {
    pub id: String,
    pub creator_id: String,
    pub title: String,
    pub subject: String,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content_type: String,
    pub price_tokens: i64,
    pub rating: f64,
    pub created_at: String,
}

impl From<&ContentDoc> for ContentView {
    fn from(content: &ContentDoc) -> Self {
        Self {
            id: content.id.clone(),
            creator_id: content.creator_id.clone(),
            title: content.title.clone(),
            subject: content.subject.clone(),
            topic: content.topic.clone(),
            description: content.description.clone(),
            content_type: content.content_type.to_string(),
            price_tokens: content.price_tokens,
            rating: content.rating,
            created_at: content.metadata.created_at_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetailResponse {
    #[serde(flatten)]
    pub content: ContentView,
    pub has_unlocked: bool,
    pub access_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockResponse {
    pub content: ContentView,
    pub access_url: Option<String>,
    pub new_balance: i64,
    pub distribution: RevenueSplit,
}

/// Route dispatcher for /api/content/*
pub async fn handle_content_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let path = req.uri().path().split('?').next().unwrap_or("").to_string();
    let method = req.method().clone();

    if method == Method::OPTIONS {
        return cors_preflight();
    }

    match (method, path.as_str()) {
        (Method::POST, "/api/content/upload") => match handle_upload(req, state).await {
            Ok(resp) => resp,
            Err(e) => error_response(e),
        },
        (Method::GET, "/api/content/recommendations") => {
            match handle_recommendations(req, state).await {
                Ok(resp) => resp,
                Err(e) => error_response(e),
            }
        }
        (Method::POST, "/api/content/unlock") => match handle_unlock(req, state).await {
            Ok(resp) => resp,
            Err(e) => error_response(e),
        },
        (Method::GET, p) if p.starts_with("/api/content/") => {
            let id = p.strip_prefix("/api/content/").unwrap_or("").to_string();
            match handle_detail(req, state, &id).await {
                Ok(resp) => resp,
                Err(e) => error_response(e),
            }
        }
        (_, "/api/content/upload")
        | (_, "/api/content/recommendations")
        | (_, "/api/content/unlock") => method_not_allowed(),
        _ => not_found(&path),
    }
}

async fn handle_upload(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let user = authenticate(&req, &state).await?;
    require_role(&user, Role::Creator)?;

    // Payload is base64, so the wire body can be ~4/3 the configured cap
    let body_limit = state.args.content_max_upload_bytes * 4 / 3 + DEFAULT_BODY_LIMIT;
    let body: UploadRequest = parse_json_body(req, body_limit).await?;

    if body.title.is_empty()
        || body.subject.is_empty()
        || body.topic.is_empty()
        || body.content_type.is_empty()
        || body.file_name.is_empty()
    {
        return Err(BursarError::Validation("Missing required fields".into()));
    }
    if body.price_tokens <= 0 {
        return Err(BursarError::Validation(
            "Price must be a positive number of tokens".into(),
        ));
    }
    let kind: ContentKind = body
        .content_type
        .parse()
        .map_err(BursarError::Validation)?;

    if body.data_base64.is_empty() {
        return Err(BursarError::Validation("No file uploaded".into()));
    }
    let bytes = general_purpose::STANDARD
        .decode(body.data_base64.as_bytes())
        .map_err(|e| BursarError::Validation(format!("Invalid file payload: {}", e)))?;
    if bytes.len() > state.args.content_max_upload_bytes {
        return Err(BursarError::Validation("File too large".into()));
    }

    let storage_path = format!(
        "{}/{}{}",
        user.id,
        uuid::Uuid::new_v4(),
        file_extension(&body.file_name)
    );
    let mime = mime_for(kind);
    state
        .storage
        .upload(bucket_for(kind), &storage_path, bytes, mime)
        .await?;

    let content = state
        .ledger
        .insert_content(ContentDoc::new(
            user.id.clone(),
            body.title,
            body.subject,
            body.topic,
            body.description,
            kind,
            storage_path,
            body.price_tokens,
        ))
        .await?;

    info!(
        creator = %user.id,
        content = %content.id,
        kind = %content.content_type,
        price = content.price_tokens,
        "Content uploaded"
    );

    Ok(created_message_data(
        "Content uploaded successfully",
        &ContentView::from(&content),
    ))
}

async fn handle_recommendations(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    authenticate(&req, &state).await?;

    let query = req.uri().query();
    let filter = CatalogFilter {
        subject: query_param(query, "subject"),
        topic: query_param(query, "topic"),
        content_type: query_param(query, "contentType")
            .map(|v| v.parse().map_err(BursarError::Validation))
            .transpose()?,
    };

    let contents = state.ledger.list_content(&filter).await?;
    let views: Vec<ContentView> = contents.iter().map(ContentView::from).collect();
    Ok(ok_data(&views))
}

async fn handle_detail(
    req: Request<Incoming>,
    state: Arc<AppState>,
    content_id: &str,
) -> Result<Response<BoxBody>> {
    let user = authenticate(&req, &state).await?;

    let content = state
        .ledger
        .find_content(content_id)
        .await?
        .ok_or_else(|| BursarError::NotFound("Content not found".into()))?;

    let has_unlocked = state.ledger.has_unlocked(&user.id, content_id).await?;
    let access_url = if has_unlocked {
        // Entitled readers re-derive their access URL here at any time
        Some(state.coordinator.access_url_for(&content).await?)
    } else {
        None
    };

    Ok(ok_data(&ContentDetailResponse {
        content: ContentView::from(&content),
        has_unlocked,
        access_url,
    }))
}

async fn handle_unlock(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let user = authenticate(&req, &state).await?;
    let body: UnlockRequest = parse_json_body(req, DEFAULT_BODY_LIMIT).await?;

    if body.content_id.is_empty() {
        return Err(BursarError::Validation("Content ID is required".into()));
    }

    let outcome = state.coordinator.unlock(&user.id, &body.content_id).await?;

    Ok(ok_message_data(
        "Content unlocked successfully",
        &UnlockResponse {
            content: ContentView::from(&outcome.content),
            access_url: outcome.access_url,
            new_balance: outcome.new_balance,
            distribution: outcome.distribution,
        },
    ))
}

fn file_extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => format!(".{}", ext),
        _ => String::new(),
    }
}

fn mime_for(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Video => "video/mp4",
        ContentKind::Pdf => "application/pdf",
        ContentKind::Notes => "text/markdown",
    }
}
