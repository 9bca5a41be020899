//! Admin maintenance operations over the celebrity store.
//!
//! - image URL health checks and fixes
//! - bulk upload
//! - pruning entries by id

mod bulk;
mod images;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::celebrity::{CelebrityStore, ImageRecord};

pub use bulk::{
    BULK_SUBMITTER, BulkEntry, BulkUploadResults, MAX_BULK_UPLOAD, bulk_upload, validate_batch,
};
pub use images::{
    FixResult, FixStatus, ImageCheck, ImageFix, ImageReport, ImageStatus, ImageSummary,
    apply_image_fixes, check_images,
};

/// Result of deleting entries by id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneReport {
    pub message: String,
    pub deleted: Vec<ImageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_celebrities: Option<i64>,
}

/// Delete every listed entry and report what is left.
pub async fn delete_celebrities(store: &dyn CelebrityStore, ids: &[String]) -> Result<PruneReport> {
    let deleted = if ids.is_empty() {
        Vec::new()
    } else {
        store.delete_many(ids).await?
    };

    if deleted.is_empty() {
        return Ok(PruneReport {
            message: "No matching celebrities found to delete".to_string(),
            deleted,
            remaining_celebrities: None,
        });
    }

    let remaining = store.count().await?;
    info!(deleted = deleted.len(), remaining, "Deleted celebrities");
    Ok(PruneReport {
        message: format!("Deleted {} celebrities", deleted.len()),
        deleted,
        remaining_celebrities: Some(remaining),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celebrity::MemoryCelebrityStore;

    #[tokio::test]
    async fn test_delete_celebrities() {
        let store = MemoryCelebrityStore::seeded().await.unwrap();
        let report = delete_celebrities(
            &store,
            &["amy-schumer".to_string(), "rebel-wilson".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(report.deleted.len(), 2);
        assert_eq!(report.remaining_celebrities, Some(3));
        assert_eq!(report.message, "Deleted 2 celebrities");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["remainingCelebrities"], 3);
    }

    #[tokio::test]
    async fn test_delete_celebrities_no_match() {
        let store = MemoryCelebrityStore::seeded().await.unwrap();
        let report = delete_celebrities(&store, &["nobody".to_string()])
            .await
            .unwrap();
        assert!(report.deleted.is_empty());
        assert_eq!(report.message, "No matching celebrities found to delete");

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("remainingCelebrities").is_none());
    }
}
