//! In-memory celebrity store for development runs and tests.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use rand::seq::IndexedRandom;
use tokio::sync::RwLock;

use super::models::{
    Celebrity, CelebritySummary, CelebrityUpdate, ImageRecord, NewCelebrity, SEED_CELEBRITIES,
    VoteTotals, VoteType,
};
use super::store::CelebrityStore;

#[derive(Debug, Clone)]
struct VoteRecord {
    celebrity_id: String,
    vote: VoteType,
    user_ip: String,
}

#[derive(Debug, Default)]
struct State {
    celebrities: BTreeMap<String, Celebrity>,
    votes: Vec<VoteRecord>,
}

impl State {
    fn totals(&self) -> HashMap<&str, VoteTotals> {
        let mut totals: HashMap<&str, VoteTotals> = HashMap::new();
        for record in &self.votes {
            totals
                .entry(record.celebrity_id.as_str())
                .or_default()
                .add(record.vote);
        }
        totals
    }

    fn summary(&self, celebrity: &Celebrity, totals: &HashMap<&str, VoteTotals>) -> CelebritySummary {
        let counts = totals
            .get(celebrity.id.as_str())
            .copied()
            .unwrap_or_default();
        CelebritySummary {
            id: celebrity.id.clone(),
            name: celebrity.name.clone(),
            subtitle: celebrity.subtitle.clone(),
            image_url: celebrity.image_url.clone(),
            roseanne_votes: counts.roseanne_votes,
            not_roseanne_votes: counts.not_roseanne_votes,
        }
    }

    fn approved(&self) -> impl Iterator<Item = &Celebrity> {
        self.celebrities.values().filter(|c| c.approved)
    }
}

/// Celebrity store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCelebrityStore {
    state: RwLock<State>,
}

impl MemoryCelebrityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding the seed entries.
    pub async fn seeded() -> Result<Self> {
        let store = Self::new();
        store.initialize().await?;
        Ok(store)
    }

    /// Number of recorded votes.
    pub async fn vote_count(&self) -> usize {
        self.state.read().await.votes.len()
    }

    /// IP addresses recorded for an entry's votes.
    pub async fn voter_ips(&self, celebrity_id: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .votes
            .iter()
            .filter(|v| v.celebrity_id == celebrity_id)
            .map(|v| v.user_ip.clone())
            .collect()
    }
}

#[async_trait]
impl CelebrityStore for MemoryCelebrityStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn initialize(&self) -> Result<()> {
        let mut state = self.state.write().await;
        for (id, name, subtitle, url) in SEED_CELEBRITIES {
            let entry = state
                .celebrities
                .entry(id.to_string())
                .or_insert_with(|| Celebrity {
                    id: id.to_string(),
                    name: String::new(),
                    subtitle: None,
                    image_url: String::new(),
                    submitted_by: Some("admin".to_string()),
                    approved: true,
                    created_at: Some(Utc::now().naive_utc()),
                });
            entry.name = name.to_string();
            entry.subtitle = Some(subtitle.to_string());
            entry.image_url = url.to_string();
        }
        Ok(())
    }

    async fn list_approved(&self) -> Result<Vec<CelebritySummary>> {
        let state = self.state.read().await;
        let totals = state.totals();
        let mut list: Vec<_> = state
            .approved()
            .map(|c| state.summary(c, &totals))
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn random_approved(&self) -> Result<Option<CelebritySummary>> {
        let state = self.state.read().await;
        let approved: Vec<&Celebrity> = state.approved().collect();
        let picked = {
            let mut rng = rand::rng();
            approved.choose(&mut rng).copied()
        };
        Ok(picked.map(|c| state.summary(c, &state.totals())))
    }

    async fn get_approved(&self, id: &str) -> Result<Option<CelebritySummary>> {
        let state = self.state.read().await;
        Ok(state
            .celebrities
            .get(id)
            .filter(|c| c.approved)
            .map(|c| state.summary(c, &state.totals())))
    }

    async fn list_pending(&self) -> Result<Vec<Celebrity>> {
        let state = self.state.read().await;
        let mut pending: Vec<Celebrity> = state
            .celebrities
            .values()
            .filter(|c| !c.approved)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.state.read().await.celebrities.contains_key(id))
    }

    async fn insert(&self, celebrity: NewCelebrity) -> Result<()> {
        let mut state = self.state.write().await;
        if state.celebrities.contains_key(&celebrity.id) {
            bail!("Celebrity already exists with ID {}", celebrity.id);
        }
        state.celebrities.insert(
            celebrity.id.clone(),
            Celebrity {
                id: celebrity.id,
                name: celebrity.name,
                subtitle: Some(celebrity.subtitle),
                image_url: celebrity.image_url,
                submitted_by: Some(celebrity.submitted_by),
                approved: celebrity.approved,
                created_at: Some(Utc::now().naive_utc()),
            },
        );
        Ok(())
    }

    async fn update(&self, id: &str, update: CelebrityUpdate) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(entry) = state.celebrities.get_mut(id) else {
            return Ok(false);
        };
        if let Some(name) = update.name {
            entry.name = name;
        }
        if let Some(subtitle) = update.subtitle {
            entry.subtitle = Some(subtitle);
        }
        if let Some(image_url) = update.image_url {
            entry.image_url = image_url;
        }
        entry.approved = update.approved;
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.state.write().await.celebrities.remove(id).is_some())
    }

    async fn delete_many(&self, ids: &[String]) -> Result<Vec<ImageRecord>> {
        let mut state = self.state.write().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.celebrities.remove(id))
            .map(|c| ImageRecord {
                id: c.id,
                name: c.name,
                image_url: c.image_url,
            })
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.state.read().await.celebrities.len() as i64)
    }

    async fn list_images(&self) -> Result<Vec<ImageRecord>> {
        let state = self.state.read().await;
        let mut images: Vec<ImageRecord> = state
            .celebrities
            .values()
            .map(|c| ImageRecord {
                id: c.id.clone(),
                name: c.name.clone(),
                image_url: c.image_url.clone(),
            })
            .collect();
        images.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(images)
    }

    async fn set_image_url(&self, id: &str, url: &str) -> Result<Option<String>> {
        let mut state = self.state.write().await;
        Ok(state.celebrities.get_mut(id).map(|c| {
            c.image_url = url.to_string();
            c.name.clone()
        }))
    }

    async fn record_vote(
        &self,
        celebrity_id: &str,
        vote: VoteType,
        user_ip: &str,
    ) -> Result<Option<VoteTotals>> {
        let mut state = self.state.write().await;
        if !state
            .celebrities
            .get(celebrity_id)
            .is_some_and(|c| c.approved)
        {
            return Ok(None);
        }

        state.votes.push(VoteRecord {
            celebrity_id: celebrity_id.to_string(),
            vote,
            user_ip: user_ip.to_string(),
        });

        let totals = state
            .totals()
            .get(celebrity_id)
            .copied()
            .unwrap_or_default();
        Ok(Some(totals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(name: &str) -> NewCelebrity {
        NewCelebrity::from_name(name, "", "https://img.example/x.jpg", "anonymous", false)
    }

    #[tokio::test]
    async fn test_seeded_store_lists_approved_by_name() {
        let store = MemoryCelebrityStore::seeded().await.unwrap();
        let names: Vec<String> = store
            .list_approved()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "Amy Schumer",
                "Melissa McCarthy",
                "Rebel Wilson",
                "Rosie O'Donnell",
                "Tina Fey"
            ]
        );
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = MemoryCelebrityStore::seeded().await.unwrap();
        store.set_image_url("tina-fey", "https://broken.example").await.unwrap();
        store.initialize().await.unwrap();
        assert_eq!(store.count().await.unwrap(), SEED_CELEBRITIES.len() as i64);
        let tina = store.get_approved("tina-fey").await.unwrap().unwrap();
        assert!(tina.image_url.contains("Tina%20Fey"));
    }

    #[tokio::test]
    async fn test_pending_entries_are_hidden_until_approved() {
        let store = MemoryCelebrityStore::new();
        store.insert(submission("Jonah Hill")).await.unwrap();

        assert!(store.get_approved("jonah-hill").await.unwrap().is_none());
        assert!(store.random_approved().await.unwrap().is_none());
        assert_eq!(store.list_pending().await.unwrap().len(), 1);

        let updated = store
            .update(
                "jonah-hill",
                CelebrityUpdate {
                    subtitle: Some("Actor".to_string()),
                    approved: true,
                    ..CelebrityUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(updated);

        let entry = store.get_approved("jonah-hill").await.unwrap().unwrap();
        assert_eq!(entry.subtitle.as_deref(), Some("Actor"));
        assert!(store.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let store = MemoryCelebrityStore::new();
        store.insert(submission("Seth Rogen")).await.unwrap();
        let err = store.insert(submission("Seth Rogen")).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_votes_only_count_for_approved_entries() {
        let store = MemoryCelebrityStore::seeded().await.unwrap();
        store.insert(submission("Margaret Cho")).await.unwrap();

        assert!(
            store
                .record_vote("margaret-cho", VoteType::Roseanne, "1.2.3.4")
                .await
                .unwrap()
                .is_none()
        );

        store
            .record_vote("tina-fey", VoteType::Roseanne, "1.2.3.4")
            .await
            .unwrap();
        let totals = store
            .record_vote("tina-fey", VoteType::NotRoseanne, "5.6.7.8")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            totals,
            VoteTotals {
                roseanne_votes: 1,
                not_roseanne_votes: 1
            }
        );

        let tina = store.get_approved("tina-fey").await.unwrap().unwrap();
        assert_eq!(tina.roseanne_votes, 1);
        assert_eq!(store.vote_count().await, 2);
    }

    #[tokio::test]
    async fn test_delete_many_reports_removed_entries() {
        let store = MemoryCelebrityStore::seeded().await.unwrap();
        let removed = store
            .delete_many(&["tina-fey".to_string(), "nobody".to_string()])
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, "tina-fey");
        assert!(!store.delete("tina-fey").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 4);
    }
}
