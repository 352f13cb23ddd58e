//! Configuration for Bursar
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Bursar - token ledger and content unlock service
#[derive(Parser, Debug, Clone)]
#[command(name = "bursar")]
#[command(about = "Token ledger and content unlock service for the Satchel study marketplace")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (memory ledger fallback, insecure JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false", action = clap::ArgAction::Set)]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "bursar")]
    pub mongodb_db: String,

    /// Shared secret for verifying identity-provider JWTs (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Email auto-assigned the admin role on first sign-in
    #[arg(long, env = "ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    /// Creator's fraction of each content price
    #[arg(long, env = "CREATOR_SHARE", default_value = "0.60")]
    pub creator_share: f64,

    /// Platform's fraction of each content price
    #[arg(long, env = "PLATFORM_SHARE", default_value = "0.15")]
    pub platform_share: f64,

    /// Base URL of the object storage service (e.g. "https://xyz.supabase.co")
    #[arg(long, env = "STORAGE_URL")]
    pub storage_url: Option<String>,

    /// Service key for the object storage API
    #[arg(long, env = "STORAGE_SERVICE_KEY")]
    pub storage_service_key: Option<String>,

    /// Signed access URL lifetime in seconds
    #[arg(long, env = "ACCESS_URL_TTL_SECONDS", default_value = "7200")]
    pub access_url_ttl_seconds: u64,

    /// OpenAI-compatible API base URL for topic prediction
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// API key for the topic predictor (prediction disabled without it)
    #[arg(long, env = "OPENAI_API_KEY")]
    pub openai_api_key: Option<String>,

    /// Model used for topic prediction
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4-turbo-preview")]
    pub openai_model: String,

    /// Maximum content upload size in bytes (base64-decoded)
    #[arg(long, env = "CONTENT_MAX_UPLOAD_BYTES", default_value = "524288000")]
    pub content_max_upload_bytes: usize,

    /// Maximum exam file upload size in bytes (base64-decoded)
    #[arg(long, env = "EXAM_MAX_UPLOAD_BYTES", default_value = "52428800")]
    pub exam_max_upload_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> String {
        if self.dev_mode {
            self.jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
        } else {
            self.jwt_secret
                .clone()
                .expect("JWT_SECRET is required in production mode")
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if !(0.0..=1.0).contains(&self.creator_share) || !(0.0..=1.0).contains(&self.platform_share)
        {
            return Err("CREATOR_SHARE and PLATFORM_SHARE must be within [0, 1]".to_string());
        }

        if self.creator_share + self.platform_share > 1.0 {
            return Err("CREATOR_SHARE + PLATFORM_SHARE must not exceed 1.0".to_string());
        }

        if self.storage_url.is_some() && self.storage_service_key.is_none() {
            return Err("STORAGE_SERVICE_KEY is required when STORAGE_URL is set".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["bursar", "--dev-mode", "true"])
    }

    #[test]
    fn test_defaults() {
        let args = base_args();
        assert_eq!(args.creator_share, 0.60);
        assert_eq!(args.platform_share, 0.15);
        assert_eq!(args.access_url_ttl_seconds, 7200);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_share_validation() {
        let mut args = base_args();
        args.creator_share = 0.9;
        args.platform_share = 0.2;
        assert!(args.validate().is_err());

        args.creator_share = -0.1;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_jwt_required_in_production() {
        let mut args = base_args();
        args.dev_mode = false;
        args.jwt_secret = None;
        assert!(args.validate().is_err());

        args.jwt_secret = Some("secret".into());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_storage_key_required_with_url() {
        let mut args = base_args();
        args.storage_url = Some("https://storage.example".into());
        args.storage_service_key = None;
        assert!(args.validate().is_err());
    }
}
