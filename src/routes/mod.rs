//! HTTP routes for Bursar

pub mod content;
pub mod exam;
pub mod health;
pub mod helpers;
pub mod user;
pub mod wallet;

pub use content::handle_content_request;
pub use exam::handle_exam_request;
pub use health::{health_check, readiness_check, version_info};
pub use user::handle_user_request;
pub use wallet::handle_wallet_request;
