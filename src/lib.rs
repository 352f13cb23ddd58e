//! Bursar - token ledger and content unlock service
//!
//! Bursar is the financial core of the Satchel study marketplace: students
//! spend a token balance to unlock creator-uploaded content, creators earn a
//! revenue share, and an exam-mode endpoint asks an LLM to predict likely
//! exam topics from uploaded syllabus and past-paper files.
//!
//! ## Services
//!
//! - **Ledger**: balances, catalog, purchase and earning records in MongoDB
//! - **Unlock**: the atomic debit/credit/record transaction behind a purchase
//! - **Storage**: bucket-routed uploads and signed access URLs
//! - **Exam**: AI-assisted topic prediction (advisory, never touches the
//!   ledger)

pub mod ai;
pub mod auth;
pub mod config;
pub mod db;
pub mod ledger;
pub mod routes;
pub mod server;
pub mod storage;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{BursarError, Result};
