//! PostgreSQL-backed celebrity store.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};

use super::models::{
    Celebrity, CelebritySummary, CelebrityUpdate, ImageRecord, NewCelebrity, SEED_CELEBRITIES,
    VoteTotals, VoteType,
};
use super::store::CelebrityStore;
use crate::db::Database;

const SUMMARY_COLUMNS: &str = r#"
    c.id, c.name, c.subtitle, c.image_url,
    (SELECT COUNT(*) FROM votes WHERE celebrity_id = c.id AND vote_type = 'roseanne') AS roseanne_votes,
    (SELECT COUNT(*) FROM votes WHERE celebrity_id = c.id AND vote_type = 'not-roseanne') AS not_roseanne_votes
"#;

/// Celebrity store over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgCelebrityStore {
    db: Database,
}

impl PgCelebrityStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn pool(&self) -> &PgPool {
        self.db.pool()
    }

    async fn totals(&self, celebrity_id: &str) -> Result<VoteTotals> {
        sqlx::query_as::<_, VoteTotals>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM votes WHERE celebrity_id = $1 AND vote_type = 'roseanne') AS roseanne_votes,
                (SELECT COUNT(*) FROM votes WHERE celebrity_id = $1 AND vote_type = 'not-roseanne') AS not_roseanne_votes
            "#,
        )
        .bind(celebrity_id)
        .fetch_one(self.pool())
        .await
        .context("Failed to count votes")
    }
}

#[async_trait]
impl CelebrityStore for PgCelebrityStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self))]
    async fn initialize(&self) -> Result<()> {
        self.db.run_migrations().await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO celebrities (id, name, subtitle, image_url, approved) ");
        builder.push_values(SEED_CELEBRITIES, |mut row, (id, name, subtitle, url)| {
            row.push_bind(*id)
                .push_bind(*name)
                .push_bind(*subtitle)
                .push_bind(*url)
                .push_bind(true);
        });
        builder.push(
            r#"
            ON CONFLICT (id) DO UPDATE SET
                image_url = EXCLUDED.image_url,
                name = EXCLUDED.name,
                subtitle = EXCLUDED.subtitle
            "#,
        );
        builder
            .build()
            .execute(self.pool())
            .await
            .context("Failed to seed celebrities")?;

        debug!("Seeded {} celebrities", SEED_CELEBRITIES.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_approved(&self) -> Result<Vec<CelebritySummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM celebrities c WHERE approved = true ORDER BY name"
        );
        sqlx::query_as::<_, CelebritySummary>(&sql)
            .fetch_all(self.pool())
            .await
            .context("Failed to list celebrities")
    }

    #[instrument(skip(self))]
    async fn random_approved(&self) -> Result<Option<CelebritySummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM celebrities c WHERE approved = true ORDER BY RANDOM() LIMIT 1"
        );
        sqlx::query_as::<_, CelebritySummary>(&sql)
            .fetch_optional(self.pool())
            .await
            .context("Failed to fetch random celebrity")
    }

    #[instrument(skip(self))]
    async fn get_approved(&self, id: &str) -> Result<Option<CelebritySummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM celebrities c WHERE id = $1 AND approved = true"
        );
        sqlx::query_as::<_, CelebritySummary>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .context("Failed to fetch celebrity")
    }

    #[instrument(skip(self))]
    async fn list_pending(&self) -> Result<Vec<Celebrity>> {
        sqlx::query_as::<_, Celebrity>(
            r#"
            SELECT id, name, subtitle, image_url, submitted_by,
                   COALESCE(approved, false) AS approved, created_at
            FROM celebrities
            WHERE approved IS NOT TRUE
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .context("Failed to list pending celebrities")
    }

    #[instrument(skip(self))]
    async fn exists(&self, id: &str) -> Result<bool> {
        let found: Option<(String,)> = sqlx::query_as("SELECT id FROM celebrities WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .context("Failed to look up celebrity")?;
        Ok(found.is_some())
    }

    #[instrument(skip(self, celebrity), fields(id = %celebrity.id))]
    async fn insert(&self, celebrity: NewCelebrity) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO celebrities (id, name, subtitle, image_url, submitted_by, approved, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            "#,
        )
        .bind(&celebrity.id)
        .bind(&celebrity.name)
        .bind(&celebrity.subtitle)
        .bind(&celebrity.image_url)
        .bind(&celebrity.submitted_by)
        .bind(celebrity.approved)
        .execute(self.pool())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(anyhow!(
                "Celebrity already exists with ID {}",
                celebrity.id
            )),
            Err(e) => Err(e).context("Failed to insert celebrity"),
        }
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: &str, update: CelebrityUpdate) -> Result<bool> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE celebrities SET ");
        let mut fields = builder.separated(", ");
        if let Some(name) = update.name {
            fields.push("name = ").push_bind_unseparated(name);
        }
        if let Some(subtitle) = update.subtitle {
            fields.push("subtitle = ").push_bind_unseparated(subtitle);
        }
        if let Some(image_url) = update.image_url {
            fields.push("image_url = ").push_bind_unseparated(image_url);
        }
        fields.push("approved = ").push_bind_unseparated(update.approved);
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder
            .build()
            .execute(self.pool())
            .await
            .context("Failed to update celebrity")?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM celebrities WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .context("Failed to delete celebrity")?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_many(&self, ids: &[String]) -> Result<Vec<ImageRecord>> {
        sqlx::query_as::<_, ImageRecord>(
            "DELETE FROM celebrities WHERE id = ANY($1) RETURNING id, name, image_url",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .context("Failed to delete celebrities")
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM celebrities")
            .fetch_one(self.pool())
            .await
            .context("Failed to count celebrities")?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn list_images(&self) -> Result<Vec<ImageRecord>> {
        sqlx::query_as::<_, ImageRecord>(
            "SELECT id, name, image_url FROM celebrities ORDER BY name",
        )
        .fetch_all(self.pool())
        .await
        .context("Failed to list images")
    }

    #[instrument(skip(self))]
    async fn set_image_url(&self, id: &str, url: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("UPDATE celebrities SET image_url = $1 WHERE id = $2 RETURNING name")
                .bind(url)
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .context("Failed to update image URL")?;
        Ok(row.map(|(name,)| name))
    }

    #[instrument(skip(self, user_ip))]
    async fn record_vote(
        &self,
        celebrity_id: &str,
        vote: VoteType,
        user_ip: &str,
    ) -> Result<Option<VoteTotals>> {
        let approved: Option<(String,)> =
            sqlx::query_as("SELECT id FROM celebrities WHERE id = $1 AND approved = true")
                .bind(celebrity_id)
                .fetch_optional(self.pool())
                .await
                .context("Failed to look up celebrity")?;
        if approved.is_none() {
            return Ok(None);
        }

        sqlx::query(
            "INSERT INTO votes (celebrity_id, vote_type, user_ip, created_at) VALUES ($1, $2, $3, NOW())",
        )
        .bind(celebrity_id)
        .bind(vote.as_str())
        .bind(user_ip)
        .execute(self.pool())
        .await
        .context("Failed to insert vote")?;

        self.totals(celebrity_id).await.map(Some)
    }
}
