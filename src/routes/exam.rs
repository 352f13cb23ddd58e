//! Exam mode routes
//!
//! - POST /api/exam/upload              - upload syllabus and past papers
//! - POST /api/exam/predict-topics     - AI topic prediction from an upload
//! - GET  /api/exam/recommended-content - catalog matches for predicted topics
//!
//! Predictions are advisory; none of these endpoints touch the ledger.

use base64::{engine::general_purpose, Engine as _};
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::ai::{extract_text, TopicPrediction};
use crate::db::schemas::ExamInputDoc;
use crate::ledger::CatalogFilter;
use crate::routes::content::ContentView;
use crate::routes::helpers::{
    authenticate, cors_preflight, created_message_data, error_response, method_not_allowed,
    not_found, ok_data, parse_json_body, query_param, BoxBody, DEFAULT_BODY_LIMIT,
};
use crate::server::AppState;
use crate::storage::EXAM_FILES_BUCKET;
use crate::types::{BursarError, Result};

/// Signed URL lifetime for predictor inputs
const EXAM_FILE_URL_TTL_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamFile {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub data_base64: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamUploadRequest {
    #[serde(default)]
    pub syllabus: Option<ExamFile>,
    #[serde(default)]
    pub past_papers: Option<ExamFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    #[serde(default)]
    pub exam_input_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamUploadResponse {
    pub id: String,
    pub syllabus_path: String,
    pub past_papers_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    pub predictions: Vec<TopicPrediction>,
    pub syllabus_url: String,
    pub papers_url: String,
}

/// Route dispatcher for /api/exam/*
pub async fn handle_exam_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let path = req.uri().path().split('?').next().unwrap_or("").to_string();
    let method = req.method().clone();

    if method == Method::OPTIONS {
        return cors_preflight();
    }

    match (method, path.as_str()) {
        (Method::POST, "/api/exam/upload") => match handle_upload(req, state).await {
            Ok(resp) => resp,
            Err(e) => error_response(e),
        },
        (Method::POST, "/api/exam/predict-topics") => match handle_predict(req, state).await {
            Ok(resp) => resp,
            Err(e) => error_response(e),
        },
        (Method::GET, "/api/exam/recommended-content") => {
            match handle_recommended_content(req, state).await {
                Ok(resp) => resp,
                Err(e) => error_response(e),
            }
        }
        (_, "/api/exam/upload")
        | (_, "/api/exam/predict-topics")
        | (_, "/api/exam/recommended-content") => method_not_allowed(),
        _ => not_found(&path),
    }
}

async fn handle_upload(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let user = authenticate(&req, &state).await?;

    let body_limit = state.args.exam_max_upload_bytes * 4 / 3 * 2 + DEFAULT_BODY_LIMIT;
    let body: ExamUploadRequest = parse_json_body(req, body_limit).await?;

    let (syllabus, past_papers) = match (body.syllabus, body.past_papers) {
        (Some(s), Some(p)) if !s.data_base64.is_empty() && !p.data_base64.is_empty() => (s, p),
        _ => {
            return Err(BursarError::Validation(
                "Both syllabus and past papers are required".into(),
            ))
        }
    };

    let syllabus_path = store_exam_file(&state, &user.id, "syllabus", &syllabus).await?;
    let past_papers_path = store_exam_file(&state, &user.id, "papers", &past_papers).await?;

    let input = state
        .ledger
        .insert_exam_input(ExamInputDoc::new(
            user.id.clone(),
            syllabus_path.clone(),
            past_papers_path.clone(),
        ))
        .await?;

    info!(user = %user.id, exam_input = %input.id, "Exam files uploaded");

    Ok(created_message_data(
        "Exam files uploaded successfully",
        &ExamUploadResponse {
            id: input.id,
            syllabus_path,
            past_papers_path,
        },
    ))
}

async fn store_exam_file(
    state: &AppState,
    user_id: &str,
    prefix: &str,
    file: &ExamFile,
) -> Result<String> {
    let bytes = general_purpose::STANDARD
        .decode(file.data_base64.as_bytes())
        .map_err(|e| BursarError::Validation(format!("Invalid file payload: {}", e)))?;
    if bytes.len() > state.args.exam_max_upload_bytes {
        return Err(BursarError::Validation("File too large".into()));
    }

    let ext = match file.file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => format!(".{}", ext),
        _ => String::new(),
    };
    let path = format!("{}/{}_{}{}", user_id, prefix, uuid::Uuid::new_v4(), ext);

    state
        .storage
        .upload(EXAM_FILES_BUCKET, &path, bytes, "application/octet-stream")
        .await?;

    Ok(path)
}

async fn handle_predict(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let user = authenticate(&req, &state).await?;
    let body: PredictRequest = parse_json_body(req, DEFAULT_BODY_LIMIT).await?;

    if body.exam_input_id.is_empty() {
        return Err(BursarError::Validation("Exam input ID is required".into()));
    }

    // Only the caller's own uploads are eligible
    let input = state
        .ledger
        .exam_inputs_of(&user.id)
        .await?
        .into_iter()
        .find(|i| i.id == body.exam_input_id)
        .ok_or_else(|| BursarError::NotFound("Exam input not found".into()))?;

    let syllabus_bytes = state
        .storage
        .download(EXAM_FILES_BUCKET, &input.syllabus_path)
        .await?;
    let papers_bytes = state
        .storage
        .download(EXAM_FILES_BUCKET, &input.past_papers_path)
        .await?;

    let predictions = state
        .predictor
        .predict(
            &extract_text(&syllabus_bytes),
            &extract_text(&papers_bytes),
        )
        .await?;

    info!(
        user = %user.id,
        exam_input = %input.id,
        predictor = %state.predictor.id(),
        topics = predictions.len(),
        "Exam topics predicted"
    );

    let syllabus_url = state
        .storage
        .signed_url(EXAM_FILES_BUCKET, &input.syllabus_path, EXAM_FILE_URL_TTL_SECS)
        .await?;
    let papers_url = state
        .storage
        .signed_url(
            EXAM_FILES_BUCKET,
            &input.past_papers_path,
            EXAM_FILE_URL_TTL_SECS,
        )
        .await?;

    Ok(ok_data(&PredictResponse {
        predictions,
        syllabus_url,
        papers_url,
    }))
}

async fn handle_recommended_content(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    authenticate(&req, &state).await?;

    let topics = query_param(req.uri().query(), "topics")
        .ok_or_else(|| BursarError::Validation("Topics are required".into()))?;

    let mut seen = std::collections::HashSet::new();
    let mut results: Vec<ContentView> = Vec::new();
    for topic in topics.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let matches = state
            .ledger
            .list_content(&CatalogFilter {
                topic: Some(topic.to_string()),
                ..Default::default()
            })
            .await?;
        for content in &matches {
            if seen.insert(content.id.clone()) {
                results.push(ContentView::from(content));
            }
        }
    }

    Ok(ok_data(&results))
}
