//! Ledger store
//!
//! The single owner of users, content, purchases, and earnings. All balance
//! mutations go through here; nothing else writes these collections.
//!
//! Two backends:
//! - **MongoDB**: conditional `$gte`-filtered debits inside multi-document
//!   transactions, with the unique `(user_id, content_id)` purchase index
//!   closing the duplicate-unlock race at the storage layer.
//! - **Memory**: one mutex over the whole ledger, for dev mode and tests.

use bson::{doc, DateTime, Document};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

use crate::auth::VerifiedIdentity;
use crate::db::schemas::{
    ContentDoc, ContentKind, EarningDoc, ExamInputDoc, PurchaseDoc, Role, UserDoc,
    CONTENT_COLLECTION, EARNING_COLLECTION, EXAM_INPUT_COLLECTION, PURCHASE_COLLECTION,
    USER_COLLECTION,
};
use crate::db::{is_duplicate_key_error, MongoClient, MongoCollection};
use crate::ledger::pricing::RevenueSplit;
use crate::types::{BursarError, Result, ADMIN_TOKEN_BALANCE, DEFAULT_TOKEN_BALANCE};

/// Catalog listing filters
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub content_type: Option<ContentKind>,
}

/// Ledger store with MongoDB or memory backing
pub struct LedgerStore {
    backend: Backend,
}

enum Backend {
    Mongo(MongoLedger),
    Memory(Mutex<MemoryLedger>),
}

struct MongoLedger {
    client: MongoClient,
    users: MongoCollection<UserDoc>,
    contents: MongoCollection<ContentDoc>,
    purchases: MongoCollection<PurchaseDoc>,
    earnings: MongoCollection<EarningDoc>,
    exam_inputs: MongoCollection<ExamInputDoc>,
}

#[derive(Default)]
struct MemoryLedger {
    users: HashMap<String, UserDoc>,
    contents: HashMap<String, ContentDoc>,
    purchases: Vec<PurchaseDoc>,
    earnings: Vec<EarningDoc>,
    exam_inputs: Vec<ExamInputDoc>,
}

impl LedgerStore {
    /// Create a MongoDB-backed store; applies all schema indexes up front
    pub async fn mongo(client: MongoClient) -> Result<Self> {
        let users = client.collection::<UserDoc>(USER_COLLECTION).await?;
        let contents = client.collection::<ContentDoc>(CONTENT_COLLECTION).await?;
        let purchases = client.collection::<PurchaseDoc>(PURCHASE_COLLECTION).await?;
        let earnings = client.collection::<EarningDoc>(EARNING_COLLECTION).await?;
        let exam_inputs = client
            .collection::<ExamInputDoc>(EXAM_INPUT_COLLECTION)
            .await?;

        info!("Ledger store initialized (MongoDB backend)");

        Ok(Self {
            backend: Backend::Mongo(MongoLedger {
                client,
                users,
                contents,
                purchases,
                earnings,
                exam_inputs,
            }),
        })
    }

    /// Create a memory-only store (dev mode, tests)
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(MemoryLedger::default())),
        }
    }

    /// Whether the store survives a restart
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, Backend::Mongo(_))
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Resolve a verified identity to a user row, provisioning on first sight.
    ///
    /// A configured admin email is auto-assigned the admin role (and upgraded
    /// on later sign-ins if the row predates the configuration).
    pub async fn resolve_identity(
        &self,
        identity: &VerifiedIdentity,
        admin_email: Option<&str>,
    ) -> Result<UserDoc> {
        let is_admin_email = admin_email.is_some_and(|a| a == identity.email);

        match &self.backend {
            Backend::Mongo(m) => {
                if let Some(user) = m.users.find_one(doc! { "subject": &identity.subject }).await? {
                    if is_admin_email && user.role != Role::Admin {
                        let upgraded = m
                            .users
                            .find_one_and_update(
                                doc! { "id": &user.id },
                                doc! { "$set": {
                                    "role": Role::Admin.to_string(),
                                    "metadata.updated_at": DateTime::now(),
                                } },
                            )
                            .await?;
                        return upgraded
                            .ok_or_else(|| BursarError::Database("User vanished during role upgrade".into()));
                    }
                    return Ok(user);
                }

                let user = new_user_for(identity, is_admin_email);
                match m.users.inner().insert_one(&user).await {
                    Ok(_) => {
                        info!(user = %user.id, role = %user.role, "Provisioned user");
                        Ok(user)
                    }
                    // Concurrent first sign-in: someone else inserted the row
                    Err(e) if is_duplicate_key_error(&e) => m
                        .users
                        .find_one(doc! { "subject": &identity.subject })
                        .await?
                        .ok_or_else(|| BursarError::Database("User insert raced and lookup failed".into())),
                    Err(e) => Err(e.into()),
                }
            }
            Backend::Memory(mem) => {
                let mut ledger = mem.lock().unwrap();
                if let Some(user) = ledger
                    .users
                    .values_mut()
                    .find(|u| u.subject == identity.subject)
                {
                    if is_admin_email && user.role != Role::Admin {
                        user.role = Role::Admin;
                        user.metadata.updated_at = Some(DateTime::now());
                    }
                    return Ok(user.clone());
                }

                let user = new_user_for(identity, is_admin_email);
                ledger.users.insert(user.id.clone(), user.clone());
                Ok(user)
            }
        }
    }

    /// Find a user by id
    pub async fn find_user(&self, user_id: &str) -> Result<Option<UserDoc>> {
        match &self.backend {
            Backend::Mongo(m) => m.users.find_one(doc! { "id": user_id }).await,
            Backend::Memory(mem) => Ok(mem.lock().unwrap().users.get(user_id).cloned()),
        }
    }

    /// Update onboarding profile fields; unset options are left untouched
    pub async fn update_profile(
        &self,
        user_id: &str,
        name: Option<String>,
        college: Option<String>,
        course: Option<String>,
        role: Option<Role>,
    ) -> Result<UserDoc> {
        match &self.backend {
            Backend::Mongo(m) => {
                let mut set = doc! { "metadata.updated_at": DateTime::now() };
                if let Some(ref name) = name {
                    set.insert("name", name);
                }
                if let Some(ref college) = college {
                    set.insert("college", college);
                }
                if let Some(ref course) = course {
                    set.insert("course", course);
                }
                if let Some(role) = role {
                    set.insert("role", role.to_string());
                }

                m.users
                    .find_one_and_update(doc! { "id": user_id }, doc! { "$set": set })
                    .await?
                    .ok_or_else(|| BursarError::NotFound("User not found".into()))
            }
            Backend::Memory(mem) => {
                let mut ledger = mem.lock().unwrap();
                let user = ledger
                    .users
                    .get_mut(user_id)
                    .ok_or_else(|| BursarError::NotFound("User not found".into()))?;

                if name.is_some() {
                    user.name = name;
                }
                if college.is_some() {
                    user.college = college;
                }
                if course.is_some() {
                    user.course = course;
                }
                if let Some(role) = role {
                    user.role = role;
                }
                user.metadata.updated_at = Some(DateTime::now());
                Ok(user.clone())
            }
        }
    }

    /// Current token balance (entitlement read path)
    pub async fn balance_of(&self, user_id: &str) -> Result<i64> {
        self.find_user(user_id)
            .await?
            .map(|u| u.token_balance)
            .ok_or_else(|| BursarError::NotFound("User not found".into()))
    }

    // =========================================================================
    // Content catalog
    // =========================================================================

    /// Record a new content row
    pub async fn insert_content(&self, content: ContentDoc) -> Result<ContentDoc> {
        match &self.backend {
            Backend::Mongo(m) => {
                m.contents.insert_one(content.clone()).await?;
                Ok(content)
            }
            Backend::Memory(mem) => {
                let mut ledger = mem.lock().unwrap();
                ledger.contents.insert(content.id.clone(), content.clone());
                Ok(content)
            }
        }
    }

    /// Find content by id
    pub async fn find_content(&self, content_id: &str) -> Result<Option<ContentDoc>> {
        match &self.backend {
            Backend::Mongo(m) => m.contents.find_one(doc! { "id": content_id }).await,
            Backend::Memory(mem) => Ok(mem.lock().unwrap().contents.get(content_id).cloned()),
        }
    }

    /// List catalog entries matching the filter, newest first
    pub async fn list_content(&self, filter: &CatalogFilter) -> Result<Vec<ContentDoc>> {
        match &self.backend {
            Backend::Mongo(m) => {
                let mut query = Document::new();
                if let Some(ref subject) = filter.subject {
                    query.insert("subject", subject);
                }
                if let Some(ref topic) = filter.topic {
                    query.insert("topic", topic);
                }
                if let Some(kind) = filter.content_type {
                    query.insert("content_type", kind.to_string());
                }

                m.contents
                    .find_many_sorted(query, doc! { "metadata.created_at": -1 })
                    .await
            }
            Backend::Memory(mem) => {
                let ledger = mem.lock().unwrap();
                let mut results: Vec<ContentDoc> = ledger
                    .contents
                    .values()
                    .filter(|c| {
                        filter.subject.as_ref().is_none_or(|s| &c.subject == s)
                            && filter.topic.as_ref().is_none_or(|t| &c.topic == t)
                            && filter.content_type.is_none_or(|k| c.content_type == k)
                    })
                    .cloned()
                    .collect();
                results.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
                Ok(results)
            }
        }
    }

    // =========================================================================
    // Entitlement reads
    // =========================================================================

    /// Whether a user is entitled to content: a purchase row exists, or the
    /// user is the content's creator (creators always see their own uploads).
    pub async fn has_unlocked(&self, user_id: &str, content_id: &str) -> Result<bool> {
        match &self.backend {
            Backend::Mongo(m) => {
                let purchased = m
                    .purchases
                    .find_one(doc! { "user_id": user_id, "content_id": content_id })
                    .await?
                    .is_some();
                if purchased {
                    return Ok(true);
                }

                Ok(m.contents
                    .find_one(doc! { "id": content_id, "creator_id": user_id })
                    .await?
                    .is_some())
            }
            Backend::Memory(mem) => {
                let ledger = mem.lock().unwrap();
                let purchased = ledger
                    .purchases
                    .iter()
                    .any(|p| p.user_id == user_id && p.content_id == content_id);
                Ok(purchased
                    || ledger
                        .contents
                        .get(content_id)
                        .is_some_and(|c| c.creator_id == user_id))
            }
        }
    }

    /// Purchase history, newest first
    pub async fn purchases_of(&self, user_id: &str) -> Result<Vec<PurchaseDoc>> {
        match &self.backend {
            Backend::Mongo(m) => {
                m.purchases
                    .find_many_sorted(
                        doc! { "user_id": user_id },
                        doc! { "metadata.created_at": -1 },
                    )
                    .await
            }
            Backend::Memory(mem) => {
                let ledger = mem.lock().unwrap();
                let mut results: Vec<PurchaseDoc> = ledger
                    .purchases
                    .iter()
                    .filter(|p| p.user_id == user_id)
                    .cloned()
                    .collect();
                results.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
                Ok(results)
            }
        }
    }

    /// Earnings history, newest first
    pub async fn earnings_of(&self, creator_id: &str) -> Result<Vec<EarningDoc>> {
        match &self.backend {
            Backend::Mongo(m) => {
                m.earnings
                    .find_many_sorted(
                        doc! { "creator_id": creator_id },
                        doc! { "metadata.created_at": -1 },
                    )
                    .await
            }
            Backend::Memory(mem) => {
                let ledger = mem.lock().unwrap();
                let mut results: Vec<EarningDoc> = ledger
                    .earnings
                    .iter()
                    .filter(|e| e.creator_id == creator_id)
                    .cloned()
                    .collect();
                results.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
                Ok(results)
            }
        }
    }

    // =========================================================================
    // Ledger mutations
    // =========================================================================

    /// Commit an unlock as one atomic unit: debit the buyer, credit the
    /// creator, record the purchase and the earning. Returns the buyer's new
    /// balance. The balance check is re-run inside the same write, so a
    /// concurrent unlock that drained the balance fails here even though the
    /// coordinator's precondition passed.
    pub async fn commit_unlock(
        &self,
        user_id: &str,
        content: &ContentDoc,
        split: &RevenueSplit,
    ) -> Result<i64> {
        match &self.backend {
            Backend::Mongo(m) => {
                let mut session = m.client.start_session().await?;
                session
                    .start_transaction()
                    .await
                    .map_err(|e| BursarError::Database(format!("Transaction start failed: {}", e)))?;

                match m.unlock_in_session(&mut session, user_id, content, split).await {
                    Ok(balance) => {
                        session.commit_transaction().await.map_err(|e| {
                            BursarError::Database(format!("Transaction commit failed: {}", e))
                        })?;
                        Ok(balance)
                    }
                    Err(err) => {
                        let _ = session.abort_transaction().await;
                        Err(err)
                    }
                }
            }
            Backend::Memory(mem) => {
                let mut ledger = mem.lock().unwrap();

                if ledger
                    .purchases
                    .iter()
                    .any(|p| p.user_id == user_id && p.content_id == content.id)
                {
                    return Err(BursarError::Conflict("Content already purchased".into()));
                }

                let balance = ledger
                    .users
                    .get(user_id)
                    .ok_or_else(|| BursarError::NotFound("User not found".into()))?
                    .token_balance;
                if balance < content.price_tokens {
                    return Err(BursarError::InsufficientTokens {
                        required: content.price_tokens,
                        available: balance,
                    });
                }
                if !ledger.users.contains_key(&content.creator_id) {
                    return Err(BursarError::Database("Creator account missing".into()));
                }

                // All checks passed; apply every mutation under the one lock
                let buyer = ledger.users.get_mut(user_id).unwrap();
                buyer.token_balance -= content.price_tokens;
                buyer.metadata.updated_at = Some(DateTime::now());
                let new_balance = buyer.token_balance;

                let creator = ledger.users.get_mut(&content.creator_id).unwrap();
                creator.token_balance += split.creator;
                creator.metadata.updated_at = Some(DateTime::now());

                ledger.purchases.push(PurchaseDoc::new(
                    user_id.to_string(),
                    content.id.clone(),
                    content.price_tokens,
                ));
                ledger.earnings.push(EarningDoc::new(
                    content.creator_id.clone(),
                    content.id.clone(),
                    split.creator,
                ));

                Ok(new_balance)
            }
        }
    }

    /// Atomically debit a balance (generic spend). Returns (previous, new).
    pub async fn debit(&self, user_id: &str, amount: i64) -> Result<(i64, i64)> {
        match &self.backend {
            Backend::Mongo(m) => {
                let updated = m
                    .users
                    .find_one_and_update(
                        doc! { "id": user_id, "token_balance": { "$gte": amount } },
                        doc! {
                            "$inc": { "token_balance": -amount },
                            "$set": { "metadata.updated_at": DateTime::now() },
                        },
                    )
                    .await?;

                match updated {
                    Some(user) => Ok((user.token_balance + amount, user.token_balance)),
                    None => {
                        // No write happened; report why
                        let existing = m.users.find_one(doc! { "id": user_id }).await?;
                        Err(match existing {
                            Some(user) => BursarError::InsufficientTokens {
                                required: amount,
                                available: user.token_balance,
                            },
                            None => BursarError::NotFound("User not found".into()),
                        })
                    }
                }
            }
            Backend::Memory(mem) => {
                let mut ledger = mem.lock().unwrap();
                let user = ledger
                    .users
                    .get_mut(user_id)
                    .ok_or_else(|| BursarError::NotFound("User not found".into()))?;

                if user.token_balance < amount {
                    return Err(BursarError::InsufficientTokens {
                        required: amount,
                        available: user.token_balance,
                    });
                }

                let previous = user.token_balance;
                user.token_balance -= amount;
                user.metadata.updated_at = Some(DateTime::now());
                Ok((previous, user.token_balance))
            }
        }
    }

    // =========================================================================
    // Exam inputs
    // =========================================================================

    /// Record an uploaded syllabus / past-papers pair
    pub async fn insert_exam_input(&self, input: ExamInputDoc) -> Result<ExamInputDoc> {
        match &self.backend {
            Backend::Mongo(m) => {
                m.exam_inputs.insert_one(input.clone()).await?;
                Ok(input)
            }
            Backend::Memory(mem) => {
                mem.lock().unwrap().exam_inputs.push(input.clone());
                Ok(input)
            }
        }
    }

    /// Exam inputs uploaded by a user, newest first
    pub async fn exam_inputs_of(&self, user_id: &str) -> Result<Vec<ExamInputDoc>> {
        match &self.backend {
            Backend::Mongo(m) => {
                m.exam_inputs
                    .find_many_sorted(
                        doc! { "user_id": user_id },
                        doc! { "metadata.created_at": -1 },
                    )
                    .await
            }
            Backend::Memory(mem) => {
                let ledger = mem.lock().unwrap();
                let mut results: Vec<ExamInputDoc> = ledger
                    .exam_inputs
                    .iter()
                    .filter(|i| i.user_id == user_id)
                    .cloned()
                    .collect();
                results.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
                Ok(results)
            }
        }
    }
}

impl MongoLedger {
    /// The four unlock writes, bound to one transaction session
    async fn unlock_in_session(
        &self,
        session: &mut mongodb::ClientSession,
        user_id: &str,
        content: &ContentDoc,
        split: &RevenueSplit,
    ) -> Result<i64> {
        use mongodb::options::ReturnDocument;

        // Debit with the balance check in the filter: the read and the write
        // are one operation, so a racing unlock cannot double-debit
        let buyer = self
            .users
            .inner()
            .find_one_and_update(
                doc! { "id": user_id, "token_balance": { "$gte": content.price_tokens } },
                doc! {
                    "$inc": { "token_balance": -content.price_tokens },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .return_document(ReturnDocument::After)
            .session(&mut *session)
            .await
            .map_err(|e| BursarError::Database(format!("Debit failed: {}", e)))?;

        let buyer = match buyer {
            Some(b) => b,
            None => {
                let existing = self.users.find_one(doc! { "id": user_id }).await?;
                return Err(match existing {
                    Some(user) => BursarError::InsufficientTokens {
                        required: content.price_tokens,
                        available: user.token_balance,
                    },
                    None => BursarError::NotFound("User not found".into()),
                });
            }
        };

        let credited = self
            .users
            .inner()
            .update_one(
                doc! { "id": &content.creator_id },
                doc! {
                    "$inc": { "token_balance": split.creator },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .session(&mut *session)
            .await
            .map_err(|e| BursarError::Database(format!("Creator credit failed: {}", e)))?;
        if credited.matched_count == 0 {
            return Err(BursarError::Database("Creator account missing".into()));
        }

        let purchase = PurchaseDoc::new(
            user_id.to_string(),
            content.id.clone(),
            content.price_tokens,
        );
        if let Err(e) = self
            .purchases
            .inner()
            .insert_one(&purchase)
            .session(&mut *session)
            .await
        {
            // Unique (user_id, content_id) index: a concurrent unlock won
            if is_duplicate_key_error(&e) {
                return Err(BursarError::Conflict("Content already purchased".into()));
            }
            return Err(e.into());
        }

        let earning = EarningDoc::new(content.creator_id.clone(), content.id.clone(), split.creator);
        self.earnings
            .inner()
            .insert_one(&earning)
            .session(&mut *session)
            .await
            .map_err(|e| BursarError::Database(format!("Earning record failed: {}", e)))?;

        Ok(buyer.token_balance)
    }
}

fn new_user_for(identity: &VerifiedIdentity, is_admin_email: bool) -> UserDoc {
    let role = if is_admin_email {
        Role::Admin
    } else {
        identity.role_hint.unwrap_or(Role::Student)
    };
    let balance = if role == Role::Admin {
        ADMIN_TOKEN_BALANCE
    } else {
        DEFAULT_TOKEN_BALANCE
    };

    let mut user = UserDoc::new(identity.subject.clone(), identity.email.clone(), role, balance);
    user.name = identity.name.clone();
    user
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::pricing::{split, RevenueRates};

    fn identity(subject: &str, email: &str, role: Option<Role>) -> VerifiedIdentity {
        VerifiedIdentity {
            subject: subject.to_string(),
            email: email.to_string(),
            name: None,
            role_hint: role,
        }
    }

    async fn seed_unlock_fixture(store: &LedgerStore) -> (UserDoc, UserDoc, ContentDoc) {
        let creator = store
            .resolve_identity(&identity("sub_creator", "c@example.edu", Some(Role::Creator)), None)
            .await
            .unwrap();
        let student = store
            .resolve_identity(&identity("sub_student", "s@example.edu", None), None)
            .await
            .unwrap();
        let content = store
            .insert_content(ContentDoc::new(
                creator.id.clone(),
                "Linear Algebra Crash Course".into(),
                "Mathematics".into(),
                "Linear Algebra".into(),
                None,
                ContentKind::Video,
                format!("{}/lecture.mp4", creator.id),
                15,
            ))
            .await
            .unwrap();
        (student, creator, content)
    }

    #[tokio::test]
    async fn test_provisioning_defaults() {
        let store = LedgerStore::memory();
        let user = store
            .resolve_identity(&identity("sub_1", "a@example.edu", None), None)
            .await
            .unwrap();
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.token_balance, DEFAULT_TOKEN_BALANCE);

        // Resolving again returns the same row, not a new one
        let again = store
            .resolve_identity(&identity("sub_1", "a@example.edu", None), None)
            .await
            .unwrap();
        assert_eq!(again.id, user.id);
    }

    #[tokio::test]
    async fn test_admin_email_provisioning_and_upgrade() {
        let store = LedgerStore::memory();
        let admin = store
            .resolve_identity(
                &identity("sub_adm", "dean@example.edu", None),
                Some("dean@example.edu"),
            )
            .await
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.token_balance, ADMIN_TOKEN_BALANCE);

        // Existing non-admin row gets upgraded once the email is configured
        let user = store
            .resolve_identity(&identity("sub_2", "later@example.edu", None), None)
            .await
            .unwrap();
        assert_eq!(user.role, Role::Student);
        let upgraded = store
            .resolve_identity(
                &identity("sub_2", "later@example.edu", None),
                Some("later@example.edu"),
            )
            .await
            .unwrap();
        assert_eq!(upgraded.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_commit_unlock_mutates_everything() {
        let store = LedgerStore::memory();
        let (student, creator, content) = seed_unlock_fixture(&store).await;
        let s = split(content.price_tokens, &RevenueRates::default()).unwrap();

        let new_balance = store.commit_unlock(&student.id, &content, &s).await.unwrap();
        assert_eq!(new_balance, 85);
        assert_eq!(store.balance_of(&creator.id).await.unwrap(), 109);

        let purchases = store.purchases_of(&student.id).await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].tokens_spent, 15);

        let earnings = store.earnings_of(&creator.id).await.unwrap();
        assert_eq!(earnings.len(), 1);
        assert_eq!(earnings[0].tokens_earned, 9);
    }

    #[tokio::test]
    async fn test_commit_unlock_rejects_duplicate() {
        let store = LedgerStore::memory();
        let (student, creator, content) = seed_unlock_fixture(&store).await;
        let s = split(content.price_tokens, &RevenueRates::default()).unwrap();

        store.commit_unlock(&student.id, &content, &s).await.unwrap();
        let err = store
            .commit_unlock(&student.id, &content, &s)
            .await
            .unwrap_err();
        assert!(matches!(err, BursarError::Conflict(_)));

        // Nothing changed on the failed attempt
        assert_eq!(store.balance_of(&student.id).await.unwrap(), 85);
        assert_eq!(store.balance_of(&creator.id).await.unwrap(), 109);
        assert_eq!(store.purchases_of(&student.id).await.unwrap().len(), 1);
        assert_eq!(store.earnings_of(&creator.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_unlock_insufficient_leaves_no_trace() {
        let store = LedgerStore::memory();
        let (student, creator, _) = seed_unlock_fixture(&store).await;

        let pricey = store
            .insert_content(ContentDoc::new(
                creator.id.clone(),
                "Full Course".into(),
                "Mathematics".into(),
                "Everything".into(),
                None,
                ContentKind::Pdf,
                format!("{}/course.pdf", creator.id),
                500,
            ))
            .await
            .unwrap();
        let s = split(pricey.price_tokens, &RevenueRates::default()).unwrap();

        let err = store.commit_unlock(&student.id, &pricey, &s).await.unwrap_err();
        assert!(matches!(
            err,
            BursarError::InsufficientTokens {
                required: 500,
                available: 100
            }
        ));
        assert_eq!(store.balance_of(&student.id).await.unwrap(), 100);
        assert!(store.purchases_of(&student.id).await.unwrap().is_empty());
        assert!(store.earnings_of(&creator.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_has_unlocked_semantics() {
        let store = LedgerStore::memory();
        let (student, creator, content) = seed_unlock_fixture(&store).await;

        // Creator is entitled to their own upload with no purchase row
        assert!(store.has_unlocked(&creator.id, &content.id).await.unwrap());
        assert!(!store.has_unlocked(&student.id, &content.id).await.unwrap());

        let s = split(content.price_tokens, &RevenueRates::default()).unwrap();
        store.commit_unlock(&student.id, &content, &s).await.unwrap();

        // Entitlement holds after the purchase, indefinitely
        assert!(store.has_unlocked(&student.id, &content.id).await.unwrap());
        assert!(store.has_unlocked(&student.id, &content.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_debit() {
        let store = LedgerStore::memory();
        let user = store
            .resolve_identity(&identity("sub_1", "a@example.edu", None), None)
            .await
            .unwrap();

        let (previous, new) = store.debit(&user.id, 30).await.unwrap();
        assert_eq!((previous, new), (100, 70));

        let err = store.debit(&user.id, 71).await.unwrap_err();
        assert!(matches!(
            err,
            BursarError::InsufficientTokens {
                required: 71,
                available: 70
            }
        ));

        assert!(matches!(
            store.debit("nobody", 1).await.unwrap_err(),
            BursarError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_balance_of_unknown_user() {
        let store = LedgerStore::memory();
        assert!(matches!(
            store.balance_of("missing").await.unwrap_err(),
            BursarError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_catalog_filters() {
        let store = LedgerStore::memory();
        let (_, creator, _) = seed_unlock_fixture(&store).await;

        store
            .insert_content(ContentDoc::new(
                creator.id.clone(),
                "Calculus Notes".into(),
                "Mathematics".into(),
                "Calculus".into(),
                None,
                ContentKind::Notes,
                format!("{}/calc.md", creator.id),
                5,
            ))
            .await
            .unwrap();

        let all = store.list_content(&CatalogFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let calculus = store
            .list_content(&CatalogFilter {
                topic: Some("Calculus".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(calculus.len(), 1);
        assert_eq!(calculus[0].title, "Calculus Notes");

        let videos = store
            .list_content(&CatalogFilter {
                content_type: Some(ContentKind::Video),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(videos.len(), 1);
    }
}
