//! Wallet routes
//!
//! - GET  /api/wallet/balance      - current token balance
//! - POST /api/wallet/spend        - generic token expenditure
//! - GET  /api/wallet/transactions - purchase/earnings history by role

use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::schemas::Role;
use crate::routes::helpers::{
    authenticate, cors_preflight, error_response, method_not_allowed, not_found, ok_data,
    ok_message_data, parse_json_body, BoxBody, DEFAULT_BODY_LIMIT,
};
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Deserialize)]
pub struct SpendRequest {
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub balance: i64,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendResponse {
    pub previous_balance: i64,
    pub new_balance: i64,
    pub amount_spent: i64,
    pub reason: String,
}

/// One row of transaction history; purchases are negative, earnings positive
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_title: Option<String>,
    pub content_id: String,
    pub date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionEntry>,
    pub total_transactions: usize,
}

/// Route dispatcher for /api/wallet/*
pub async fn handle_wallet_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let path = req.uri().path().split('?').next().unwrap_or("").to_string();
    let method = req.method().clone();

    if method == Method::OPTIONS {
        return cors_preflight();
    }

    match (method, path.as_str()) {
        (Method::GET, "/api/wallet/balance") => match handle_balance(req, state).await {
            Ok(resp) => resp,
            Err(e) => error_response(e),
        },
        (Method::POST, "/api/wallet/spend") => match handle_spend(req, state).await {
            Ok(resp) => resp,
            Err(e) => error_response(e),
        },
        (Method::GET, "/api/wallet/transactions") => match handle_transactions(req, state).await {
            Ok(resp) => resp,
            Err(e) => error_response(e),
        },
        (_, "/api/wallet/balance") | (_, "/api/wallet/spend") | (_, "/api/wallet/transactions") => {
            method_not_allowed()
        }
        _ => not_found(&path),
    }
}

async fn handle_balance(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = authenticate(&req, &state).await?;
    let balance = state.ledger.balance_of(&user.id).await?;

    Ok(ok_data(&BalanceResponse {
        balance,
        user_id: user.id,
    }))
}

async fn handle_spend(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let user = authenticate(&req, &state).await?;
    let body: SpendRequest = parse_json_body(req, DEFAULT_BODY_LIMIT).await?;

    let reason = body.reason.unwrap_or_else(|| "General purchase".to_string());
    let outcome = state.coordinator.spend(&user.id, body.amount, &reason).await?;

    Ok(ok_message_data(
        &format!("{} tokens spent successfully", body.amount),
        &SpendResponse {
            previous_balance: outcome.previous_balance,
            new_balance: outcome.new_balance,
            amount_spent: body.amount,
            reason,
        },
    ))
}

async fn handle_transactions(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let user = authenticate(&req, &state).await?;

    let mut transactions = Vec::new();
    match user.role {
        Role::Student => {
            for purchase in state.ledger.purchases_of(&user.id).await? {
                let title = state
                    .ledger
                    .find_content(&purchase.content_id)
                    .await?
                    .map(|c| c.title);
                transactions.push(TransactionEntry {
                    id: purchase.id,
                    kind: "purchase",
                    amount: -purchase.tokens_spent,
                    content_title: title,
                    content_id: purchase.content_id,
                    date: purchase.metadata.created_at_rfc3339(),
                });
            }
        }
        Role::Creator => {
            for earning in state.ledger.earnings_of(&user.id).await? {
                let title = state
                    .ledger
                    .find_content(&earning.content_id)
                    .await?
                    .map(|c| c.title);
                transactions.push(TransactionEntry {
                    id: earning.id,
                    kind: "earning",
                    amount: earning.tokens_earned,
                    content_title: title,
                    content_id: earning.content_id,
                    date: earning.metadata.created_at_rfc3339(),
                });
            }
        }
        Role::Admin => {}
    }

    let total_transactions = transactions.len();
    Ok(ok_data(&TransactionsResponse {
        transactions,
        total_transactions,
    }))
}
