//! The ledger: balances, catalog, purchases, earnings, and the transactions
//! that move value between them
//!
//! Structure:
//! - `pricing` - the pure revenue-split policy
//! - `store` - the single owner of all ledger state (MongoDB or memory)
//! - `unlock` - the coordinator that turns "buy this" into one atomic
//!   debit/credit/record transaction

pub mod pricing;
pub mod store;
pub mod unlock;

pub use pricing::{split, RevenueRates, RevenueSplit};
pub use store::{CatalogFilter, LedgerStore};
pub use unlock::{SpendOutcome, UnlockCoordinator, UnlockOutcome};
