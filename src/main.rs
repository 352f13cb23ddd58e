//! Bursar - token ledger and content unlock service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bursar::{
    ai::{MockPredictor, OpenAiPredictor, TopicPredictor},
    config::Args,
    db::MongoClient,
    ledger::LedgerStore,
    server,
    storage::{HttpObjectStore, MemoryObjectStore, ObjectStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("bursar={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Bursar - Satchel token ledger");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {}", args.mongodb_uri);
    info!(
        "Revenue split: creator {:.0}% / platform {:.0}% / AI pool {:.0}%",
        args.creator_share * 100.0,
        args.platform_share * 100.0,
        (1.0 - args.creator_share - args.platform_share) * 100.0
    );
    info!(
        "Object storage: {}",
        args.storage_url.as_deref().unwrap_or("(memory)")
    );
    info!(
        "Topic predictor: {}",
        if args.openai_api_key.is_some() {
            args.openai_model.as_str()
        } else {
            "(mock)"
        }
    );
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using memory ledger): {}", e);
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Build the ledger store; balances, catalog, purchases, and earnings all
    // live behind this one owner
    let ledger = match &mongo {
        Some(client) => match LedgerStore::mongo(client.clone()).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Ledger store initialization failed: {}", e);
                std::process::exit(1);
            }
        },
        None => Arc::new(LedgerStore::memory()),
    };

    // Object storage: HTTP service when configured, memory store otherwise
    let storage: Arc<dyn ObjectStore> = match (&args.storage_url, &args.storage_service_key) {
        (Some(url), Some(key)) => match HttpObjectStore::new(url.clone(), key) {
            Ok(store) => {
                info!("Object storage client created ({})", url);
                Arc::new(store)
            }
            Err(e) => {
                error!("Object storage client failed: {}", e);
                std::process::exit(1);
            }
        },
        _ => {
            if !args.dev_mode {
                warn!("STORAGE_URL not set; uploads will not survive a restart");
            }
            Arc::new(MemoryObjectStore::new())
        }
    };

    // Topic predictor: OpenAI-compatible backend when a key is configured
    let predictor: Arc<dyn TopicPredictor> = match &args.openai_api_key {
        Some(key) => Arc::new(OpenAiPredictor::new(
            args.openai_base_url.clone(),
            args.openai_model.clone(),
            key.clone(),
        )),
        None => {
            warn!("OPENAI_API_KEY not set; exam predictions will use the mock predictor");
            Arc::new(MockPredictor::new())
        }
    };

    // Create application state
    let state = match server::AppState::new(args, mongo, ledger, storage, predictor) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to create application state: {}", e);
            std::process::exit(1);
        }
    };

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
