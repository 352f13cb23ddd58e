//! Database schemas for Bursar
//!
//! Defines MongoDB document structures for users, content, purchases,
//! earnings, and exam inputs.

mod content;
mod earning;
mod exam_input;
mod metadata;
mod purchase;
mod user;

pub use content::{ContentDoc, ContentKind, CONTENT_COLLECTION};
pub use earning::{EarningDoc, EARNING_COLLECTION};
pub use exam_input::{ExamInputDoc, EXAM_INPUT_COLLECTION};
pub use metadata::Metadata;
pub use purchase::{PurchaseDoc, PURCHASE_COLLECTION};
pub use user::{Role, UserDoc, USER_COLLECTION};
