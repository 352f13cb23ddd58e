//! HTTP server for Bursar

pub mod http;

pub use http::{run, AppState};
