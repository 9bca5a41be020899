//! Bulk celebrity upload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::celebrity::{CelebrityStore, NewCelebrity, approval_flag, slugify};

/// Upper bound on entries per upload.
pub const MAX_BULK_UPLOAD: usize = 100;

/// `submitted_by` recorded for bulk entries.
pub const BULK_SUBMITTER: &str = "bulk-upload";

/// One entry of an upload batch. Every field is optional so a bad entry is
/// reported per line instead of failing the whole request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub approved: Option<Value>,
}

impl BulkEntry {
    /// Approved unless given as `false` or `"false"`.
    pub fn is_approved(&self) -> bool {
        approval_flag(self.approved.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkUploadResults {
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl BulkUploadResults {
    pub fn message(&self) -> String {
        format!(
            "Bulk upload completed: {} successful, {} failed",
            self.successful, self.failed
        )
    }

    fn fail(&mut self, line: String) {
        self.failed += 1;
        self.errors.push(line);
    }
}

/// Check the batch size before touching the store.
pub fn validate_batch(len: usize) -> Result<(), &'static str> {
    if len == 0 {
        Err("No celebrities to upload")
    } else if len > MAX_BULK_UPLOAD {
        Err("Maximum 100 celebrities per upload")
    } else {
        Ok(())
    }
}

/// Insert each entry in order, recording an error line for every skip.
pub async fn bulk_upload(store: &dyn CelebrityStore, entries: Vec<BulkEntry>) -> BulkUploadResults {
    let mut results = BulkUploadResults::default();

    for entry in entries {
        let approved = entry.is_approved();
        let name = entry.name.filter(|n| !n.is_empty());
        let image_url = entry.image_url.filter(|u| !u.is_empty());

        let (Some(name), Some(image_url)) = (name.clone(), image_url) else {
            let label = name.as_deref().unwrap_or("Unknown");
            results.fail(format!("{label}: Name and image URL are required"));
            continue;
        };

        let id = slugify(&name);
        match store.exists(&id).await {
            Ok(true) => {
                results.fail(format!("{name}: Celebrity already exists with ID {id}"));
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(%id, error = %e, "Bulk upload lookup failed");
                results.fail(format!("{name}: {e:#}"));
                continue;
            }
        }

        let celebrity = NewCelebrity::from_name(
            name.as_str(),
            entry.subtitle.unwrap_or_default(),
            image_url,
            BULK_SUBMITTER,
            approved,
        );
        match store.insert(celebrity).await {
            Ok(()) => results.successful += 1,
            Err(e) => results.fail(format!("{name}: {e:#}")),
        }
    }

    info!(
        successful = results.successful,
        failed = results.failed,
        "Bulk upload finished"
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celebrity::MemoryCelebrityStore;
    use serde_json::json;

    fn entries(value: Value) -> Vec<BulkEntry> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_validate_batch() {
        assert_eq!(validate_batch(0), Err("No celebrities to upload"));
        assert!(validate_batch(1).is_ok());
        assert!(validate_batch(MAX_BULK_UPLOAD).is_ok());
        assert_eq!(
            validate_batch(MAX_BULK_UPLOAD + 1),
            Err("Maximum 100 celebrities per upload")
        );
    }

    #[test]
    fn test_approved_flag() {
        let parsed = entries(json!([
            {"approved": false},
            {"approved": "false"},
            {"approved": true},
            {"approved": "no"},
            {}
        ]));
        let flags: Vec<bool> = parsed.iter().map(BulkEntry::is_approved).collect();
        assert_eq!(flags, vec![false, false, true, true, true]);
    }

    #[tokio::test]
    async fn test_bulk_upload_mixed_batch() {
        let store = MemoryCelebrityStore::seeded().await.unwrap();
        let batch = entries(json!([
            {"name": "Jonah Hill", "image_url": "https://img.example/jonah.jpg"},
            {"name": "Margaret Cho", "subtitle": "Comedian", "image_url": "https://img.example/cho.jpg", "approved": "false"},
            {"name": "Tina Fey", "image_url": "https://img.example/tina.jpg"},
            {"subtitle": "No name", "image_url": "https://img.example/none.jpg"},
            {"name": "No Image"}
        ]));

        let results = bulk_upload(&store, batch).await;
        assert_eq!(results.successful, 2);
        assert_eq!(results.failed, 3);
        assert_eq!(
            results.errors,
            vec![
                "Tina Fey: Celebrity already exists with ID tina-fey".to_string(),
                "Unknown: Name and image URL are required".to_string(),
                "No Image: Name and image URL are required".to_string(),
            ]
        );
        assert_eq!(
            results.message(),
            "Bulk upload completed: 2 successful, 3 failed"
        );

        assert!(store.get_approved("jonah-hill").await.unwrap().is_some());
        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "margaret-cho");
        assert_eq!(pending[0].submitted_by.as_deref(), Some(BULK_SUBMITTER));
    }
}
