//! Unlock transaction coordinator
//!
//! Orchestrates a single content unlock: validates preconditions in order
//! (content exists, not already entitled, balance covers the price), computes
//! the revenue split, commits the four ledger writes as one atomic unit, and
//! asks the object store for a time-limited access URL.
//!
//! The operation is deliberately not idempotent: retrying a successful unlock
//! fails with a conflict instead of charging twice. The precondition checks
//! are advisory only; the store re-validates both the balance and the
//! (user, content) uniqueness inside the commit, which is what actually
//! closes the race windows.

use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::ContentDoc;
use crate::ledger::pricing::{split, RevenueRates, RevenueSplit};
use crate::ledger::store::LedgerStore;
use crate::storage::{bucket_for, ObjectStore};
use crate::types::{BursarError, Result};

/// Result of a successful unlock
#[derive(Debug, Clone)]
pub struct UnlockOutcome {
    pub content: ContentDoc,
    /// None when the grant issuer failed after the ledger committed; the URL
    /// can be re-derived from the content detail endpoint
    pub access_url: Option<String>,
    pub new_balance: i64,
    pub distribution: RevenueSplit,
}

/// Result of a generic spend
#[derive(Debug, Clone, Copy)]
pub struct SpendOutcome {
    pub previous_balance: i64,
    pub new_balance: i64,
}

/// Coordinates unlock and spend transactions against the ledger store
pub struct UnlockCoordinator {
    ledger: Arc<LedgerStore>,
    rates: RevenueRates,
    storage: Arc<dyn ObjectStore>,
    access_url_ttl_secs: u64,
}

impl UnlockCoordinator {
    pub fn new(
        ledger: Arc<LedgerStore>,
        rates: RevenueRates,
        storage: Arc<dyn ObjectStore>,
        access_url_ttl_secs: u64,
    ) -> Self {
        Self {
            ledger,
            rates,
            storage,
            access_url_ttl_secs,
        }
    }

    /// Unlock content for a user
    pub async fn unlock(&self, user_id: &str, content_id: &str) -> Result<UnlockOutcome> {
        let content = self
            .ledger
            .find_content(content_id)
            .await?
            .ok_or_else(|| BursarError::NotFound("Content not found".into()))?;

        if self.ledger.has_unlocked(user_id, content_id).await? {
            return Err(BursarError::Conflict("Content already purchased".into()));
        }

        let balance = self.ledger.balance_of(user_id).await?;
        if balance < content.price_tokens {
            return Err(BursarError::InsufficientTokens {
                required: content.price_tokens,
                available: balance,
            });
        }

        let distribution = split(content.price_tokens, &self.rates)?;
        let new_balance = self
            .ledger
            .commit_unlock(user_id, &content, &distribution)
            .await?;

        info!(
            user = %user_id,
            content = %content.id,
            price = content.price_tokens,
            creator_share = distribution.creator,
            new_balance,
            "Content unlocked"
        );

        // The ledger is committed; a failed grant is not rolled back
        let access_url = match self
            .storage
            .signed_url(
                bucket_for(content.content_type),
                &content.storage_path,
                self.access_url_ttl_secs,
            )
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(
                    content = %content.id,
                    error = %e,
                    "Access grant failed after commit; purchase stands"
                );
                None
            }
        };

        Ok(UnlockOutcome {
            content,
            access_url,
            new_balance,
            distribution,
        })
    }

    /// Spend tokens outside a content purchase
    pub async fn spend(&self, user_id: &str, amount: i64, reason: &str) -> Result<SpendOutcome> {
        if amount <= 0 {
            return Err(BursarError::Validation("Invalid amount".into()));
        }

        let (previous_balance, new_balance) = self.ledger.debit(user_id, amount).await?;

        info!(
            user = %user_id,
            amount,
            reason = %reason,
            new_balance,
            "Tokens spent"
        );

        Ok(SpendOutcome {
            previous_balance,
            new_balance,
        })
    }

    /// Issue a fresh access URL for content the user is already entitled to
    pub async fn access_url_for(&self, content: &ContentDoc) -> Result<String> {
        self.storage
            .signed_url(
                bucket_for(content.content_type),
                &content.storage_path,
                self.access_url_ttl_secs,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::VerifiedIdentity;
    use crate::db::schemas::{ContentKind, Role, UserDoc};
    use crate::storage::MemoryObjectStore;
    use async_trait::async_trait;

    /// Grant issuer that always fails, for the non-fatal step-6 path
    struct BrokenStore;

    #[async_trait]
    impl ObjectStore for BrokenStore {
        async fn upload(&self, _: &str, _: &str, _: Vec<u8>, _: &str) -> Result<()> {
            Err(BursarError::Storage("offline".into()))
        }

        async fn signed_url(&self, _: &str, _: &str, _: u64) -> Result<String> {
            Err(BursarError::Storage("offline".into()))
        }

        async fn download(&self, _: &str, _: &str) -> Result<Vec<u8>> {
            Err(BursarError::Storage("offline".into()))
        }
    }

    async fn provision(ledger: &LedgerStore, subject: &str, role: Role) -> UserDoc {
        ledger
            .resolve_identity(
                &VerifiedIdentity {
                    subject: subject.to_string(),
                    email: format!("{}@example.edu", subject),
                    name: None,
                    role_hint: Some(role),
                },
                None,
            )
            .await
            .unwrap()
    }

    async fn seed_content(
        ledger: &LedgerStore,
        storage: &dyn ObjectStore,
        creator_id: &str,
        price: i64,
    ) -> ContentDoc {
        let path = format!("{}/lecture.mp4", creator_id);
        storage
            .upload("videos", &path, b"video bytes".to_vec(), "video/mp4")
            .await
            .unwrap();
        ledger
            .insert_content(ContentDoc::new(
                creator_id.to_string(),
                "Linear Algebra Crash Course".into(),
                "Mathematics".into(),
                "Linear Algebra".into(),
                Some("Eigenvalues without tears".into()),
                ContentKind::Video,
                path,
                price,
            ))
            .await
            .unwrap()
    }

    fn coordinator(ledger: Arc<LedgerStore>, storage: Arc<dyn ObjectStore>) -> UnlockCoordinator {
        UnlockCoordinator::new(ledger, RevenueRates::default(), storage, 7200)
    }

    #[tokio::test]
    async fn test_unlock_happy_path() {
        let ledger = Arc::new(LedgerStore::memory());
        let storage: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let student = provision(&ledger, "student", Role::Student).await;
        let creator = provision(&ledger, "creator", Role::Creator).await;
        let content = seed_content(&ledger, storage.as_ref(), &creator.id, 15).await;
        let coordinator = coordinator(Arc::clone(&ledger), storage);

        let outcome = coordinator.unlock(&student.id, &content.id).await.unwrap();
        assert_eq!(outcome.new_balance, 85);
        assert_eq!(outcome.distribution.creator, 9);
        assert_eq!(outcome.distribution.platform, 2);
        assert_eq!(outcome.distribution.ai_pool, 4);
        assert!(outcome.access_url.is_some());

        // Creator credited exactly their share
        assert_eq!(ledger.balance_of(&creator.id).await.unwrap(), 109);

        // Purchase and earning rows exist
        assert_eq!(ledger.purchases_of(&student.id).await.unwrap().len(), 1);
        assert_eq!(ledger.earnings_of(&creator.id).await.unwrap().len(), 1);

        // Retrying is a conflict and the balance is untouched
        let err = coordinator.unlock(&student.id, &content.id).await.unwrap_err();
        assert!(matches!(err, BursarError::Conflict(_)));
        assert_eq!(ledger.balance_of(&student.id).await.unwrap(), 85);
    }

    #[tokio::test]
    async fn test_unlock_insufficient_tokens() {
        let ledger = Arc::new(LedgerStore::memory());
        let storage: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let student = provision(&ledger, "student", Role::Student).await;
        let creator = provision(&ledger, "creator", Role::Creator).await;
        let content = seed_content(&ledger, storage.as_ref(), &creator.id, 150).await;
        let coordinator = coordinator(Arc::clone(&ledger), storage);

        let err = coordinator.unlock(&student.id, &content.id).await.unwrap_err();
        assert!(matches!(
            err,
            BursarError::InsufficientTokens {
                required: 150,
                available: 100
            }
        ));

        // No partial debit, no records
        assert_eq!(ledger.balance_of(&student.id).await.unwrap(), 100);
        assert!(ledger.purchases_of(&student.id).await.unwrap().is_empty());
        assert!(ledger.earnings_of(&creator.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unlock_unknown_content() {
        let ledger = Arc::new(LedgerStore::memory());
        let storage: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let student = provision(&ledger, "student", Role::Student).await;
        let coordinator = coordinator(Arc::clone(&ledger), storage);

        let err = coordinator.unlock(&student.id, "no-such-id").await.unwrap_err();
        assert!(matches!(err, BursarError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_creator_cannot_buy_own_content() {
        let ledger = Arc::new(LedgerStore::memory());
        let storage: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let creator = provision(&ledger, "creator", Role::Creator).await;
        let content = seed_content(&ledger, storage.as_ref(), &creator.id, 15).await;
        let coordinator = coordinator(Arc::clone(&ledger), storage);

        // Already entitled as the creator; no self-purchase happens
        let err = coordinator.unlock(&creator.id, &content.id).await.unwrap_err();
        assert!(matches!(err, BursarError::Conflict(_)));
        assert_eq!(ledger.balance_of(&creator.id).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_grant_failure_is_non_fatal() {
        let ledger = Arc::new(LedgerStore::memory());
        let student = provision(&ledger, "student", Role::Student).await;
        let creator = provision(&ledger, "creator", Role::Creator).await;
        let content = ledger
            .insert_content(ContentDoc::new(
                creator.id.clone(),
                "Notes".into(),
                "Physics".into(),
                "Optics".into(),
                None,
                ContentKind::Notes,
                format!("{}/optics.md", creator.id),
                10,
            ))
            .await
            .unwrap();
        let coordinator = coordinator(Arc::clone(&ledger), Arc::new(BrokenStore));

        let outcome = coordinator.unlock(&student.id, &content.id).await.unwrap();
        assert!(outcome.access_url.is_none());
        assert_eq!(outcome.new_balance, 90);

        // The purchase stands despite the failed grant
        assert!(ledger.has_unlocked(&student.id, &content.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_spend() {
        let ledger = Arc::new(LedgerStore::memory());
        let storage: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let student = provision(&ledger, "student", Role::Student).await;
        let coordinator = coordinator(Arc::clone(&ledger), storage);

        let outcome = coordinator.spend(&student.id, 25, "exam mode").await.unwrap();
        assert_eq!(outcome.previous_balance, 100);
        assert_eq!(outcome.new_balance, 75);

        assert!(matches!(
            coordinator.spend(&student.id, 0, "free?").await.unwrap_err(),
            BursarError::Validation(_)
        ));
        assert!(matches!(
            coordinator.spend(&student.id, -3, "negative").await.unwrap_err(),
            BursarError::Validation(_)
        ));
        assert!(matches!(
            coordinator.spend(&student.id, 500, "too much").await.unwrap_err(),
            BursarError::InsufficientTokens { .. }
        ));

        // Failed spends never move the balance
        assert_eq!(ledger.balance_of(&student.id).await.unwrap(), 75);
    }

    #[tokio::test]
    async fn test_concurrent_unlocks_single_success() {
        // Balance covers exactly one of the contents; N racing unlocks must
        // produce exactly one success
        let ledger = Arc::new(LedgerStore::memory());
        let storage: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let student = provision(&ledger, "student", Role::Student).await;
        let creator = provision(&ledger, "creator", Role::Creator).await;

        let mut contents = Vec::new();
        for i in 0..4 {
            let path = format!("{}/set-{}.pdf", creator.id, i);
            storage
                .upload("notes", &path, b"pdf".to_vec(), "application/pdf")
                .await
                .unwrap();
            let content = ledger
                .insert_content(ContentDoc::new(
                    creator.id.clone(),
                    format!("Problem Set {}", i),
                    "Mathematics".into(),
                    "Problem Sets".into(),
                    None,
                    ContentKind::Pdf,
                    path,
                    100,
                ))
                .await
                .unwrap();
            contents.push(content);
        }

        let coordinator = Arc::new(coordinator(Arc::clone(&ledger), storage));
        let mut handles = Vec::new();
        for content in &contents {
            let coordinator = Arc::clone(&coordinator);
            let user_id = student.id.clone();
            let content_id = content.id.clone();
            handles.push(tokio::spawn(async move {
                coordinator.unlock(&user_id, &content_id).await
            }));
        }

        let mut successes = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(BursarError::InsufficientTokens { .. }) => insufficient += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(insufficient, 3);
        assert_eq!(ledger.balance_of(&student.id).await.unwrap(), 0);
        assert_eq!(ledger.purchases_of(&student.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_same_content_single_purchase() {
        let ledger = Arc::new(LedgerStore::memory());
        let storage: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let student = provision(&ledger, "student", Role::Student).await;
        let creator = provision(&ledger, "creator", Role::Creator).await;
        let content = seed_content(&ledger, storage.as_ref(), &creator.id, 10).await;
        let coordinator = Arc::new(coordinator(Arc::clone(&ledger), storage));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coordinator = Arc::clone(&coordinator);
            let user_id = student.id.clone();
            let content_id = content.id.clone();
            handles.push(tokio::spawn(async move {
                coordinator.unlock(&user_id, &content_id).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        // One purchase, one debit, one earning - no matter the interleaving
        assert_eq!(successes, 1);
        assert_eq!(ledger.balance_of(&student.id).await.unwrap(), 90);
        assert_eq!(ledger.purchases_of(&student.id).await.unwrap().len(), 1);
        assert_eq!(ledger.earnings_of(&creator.id).await.unwrap().len(), 1);
    }
}
