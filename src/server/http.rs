//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one routing match over (method, path).

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::ai::TopicPredictor;
use crate::auth::IdentityVerifier;
use crate::config::Args;
use crate::db::MongoClient;
use crate::ledger::{LedgerStore, RevenueRates, UnlockCoordinator};
use crate::routes;
use crate::routes::helpers::{cors_preflight, json_response, not_found, BoxBody};
use crate::storage::ObjectStore;
use crate::types::Result;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: Option<MongoClient>,
    /// The single owner of all ledger state
    pub ledger: Arc<LedgerStore>,
    /// Unlock/spend transaction coordinator
    pub coordinator: Arc<UnlockCoordinator>,
    /// External object storage
    pub storage: Arc<dyn ObjectStore>,
    /// Exam topic predictor
    pub predictor: Arc<dyn TopicPredictor>,
    /// Identity-provider token verifier
    pub identity: IdentityVerifier,
    started_at: Instant,
}

impl AppState {
    /// Assemble application state from its parts
    pub fn new(
        args: Args,
        mongo: Option<MongoClient>,
        ledger: Arc<LedgerStore>,
        storage: Arc<dyn ObjectStore>,
        predictor: Arc<dyn TopicPredictor>,
    ) -> Result<Self> {
        let rates = RevenueRates::from_shares(args.creator_share, args.platform_share)?;
        let coordinator = Arc::new(UnlockCoordinator::new(
            Arc::clone(&ledger),
            rates,
            Arc::clone(&storage),
            args.access_url_ttl_seconds,
        ));
        let identity = IdentityVerifier::from_args(&args);

        Ok(Self {
            args,
            mongo,
            ledger,
            coordinator,
            storage,
            predictor,
            identity,
            started_at: Instant::now(),
        })
    }

    /// Seconds since this instance started
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Bursar listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - insecure JWT secret accepted");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe - returns 200 if bursar is running
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Readiness probe - requires a persistent ledger (or dev mode)
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // Service banner with the endpoint map
        (Method::GET, "/") => root_banner(),

        // CORS preflight
        (Method::OPTIONS, _) => cors_preflight(),

        // API route groups
        (_, p) if p.starts_with("/api/user") => {
            routes::handle_user_request(req, Arc::clone(&state)).await
        }
        (_, p) if p.starts_with("/api/content") => {
            routes::handle_content_request(req, Arc::clone(&state)).await
        }
        (_, p) if p.starts_with("/api/wallet") => {
            routes::handle_wallet_request(req, Arc::clone(&state)).await
        }
        (_, p) if p.starts_with("/api/exam") => {
            routes::handle_exam_request(req, Arc::clone(&state)).await
        }

        // Not found
        _ => not_found(&path),
    };

    Ok(response)
}

fn root_banner() -> Response<BoxBody> {
    let body = serde_json::json!({
        "success": true,
        "message": "Bursar API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "user": "/api/user",
            "content": "/api/content",
            "wallet": "/api/wallet",
            "exam": "/api/exam",
        },
    });

    json_response(StatusCode::OK, &body)
}
