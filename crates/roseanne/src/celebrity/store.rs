//! Celebrity store trait.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::models::{
    Celebrity, CelebritySummary, CelebrityUpdate, ImageRecord, NewCelebrity, VoteTotals, VoteType,
};

/// Persistence for celebrity entries and their votes.
///
/// Implementations report a duplicate id on insert with an error whose
/// message contains "already exists".
#[async_trait]
pub trait CelebrityStore: Send + Sync {
    /// Short name of the backend, for health output.
    fn backend(&self) -> &'static str;

    /// Create tables if needed and upsert the seed entries.
    async fn initialize(&self) -> Result<()>;

    /// Approved entries ordered by name.
    async fn list_approved(&self) -> Result<Vec<CelebritySummary>>;

    /// One approved entry picked at random.
    async fn random_approved(&self) -> Result<Option<CelebritySummary>>;

    /// An approved entry by id.
    async fn get_approved(&self, id: &str) -> Result<Option<CelebritySummary>>;

    /// Entries awaiting approval, newest first.
    async fn list_pending(&self) -> Result<Vec<Celebrity>>;

    /// Whether an entry with this id exists, approved or not.
    async fn exists(&self, id: &str) -> Result<bool>;

    async fn insert(&self, celebrity: NewCelebrity) -> Result<()>;

    /// Apply an admin update. Returns false if the id is unknown.
    async fn update(&self, id: &str, update: CelebrityUpdate) -> Result<bool>;

    /// Delete an entry. Returns false if nothing was deleted.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Delete every listed id, returning what was removed.
    async fn delete_many(&self, ids: &[String]) -> Result<Vec<ImageRecord>>;

    /// Number of entries, approved or not.
    async fn count(&self) -> Result<i64>;

    /// Every entry's image, ordered by name.
    async fn list_images(&self) -> Result<Vec<ImageRecord>>;

    /// Replace an entry's image URL. Returns the entry name if it exists.
    async fn set_image_url(&self, id: &str, url: &str) -> Result<Option<String>>;

    /// Record a vote for an approved entry and return the new totals.
    /// Returns `None` when no approved entry has this id.
    async fn record_vote(
        &self,
        celebrity_id: &str,
        vote: VoteType,
        user_ip: &str,
    ) -> Result<Option<VoteTotals>>;
}

/// Store handle shared across handlers.
pub type SharedStore = Arc<dyn CelebrityStore>;
