//! Image URL health checks and fixes.

use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::celebrity::{CelebrityStore, ImageRecord};

/// Outcome of one HEAD request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImageStatus {
    Ok,
    Failed,
    Error,
}

/// Result of checking one entry's image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCheck {
    pub id: String,
    pub name: String,
    pub url: String,
    pub status: ImageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImageSummary {
    pub total: usize,
    pub working: usize,
    pub broken: usize,
}

/// Report over every entry's image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReport {
    pub summary: ImageSummary,
    pub results: Vec<ImageCheck>,
    pub broken_images: Vec<ImageCheck>,
}

/// HEAD every stored image URL concurrently.
#[instrument(skip(store, client))]
pub async fn check_images(
    store: &dyn CelebrityStore,
    client: &reqwest::Client,
    timeout: Duration,
) -> Result<ImageReport> {
    let records = store.list_images().await?;
    let results = join_all(
        records
            .into_iter()
            .map(|record| check_image(client, record, timeout)),
    )
    .await;

    let broken_images: Vec<ImageCheck> = results
        .iter()
        .filter(|r| r.status != ImageStatus::Ok)
        .cloned()
        .collect();
    let summary = ImageSummary {
        total: results.len(),
        working: results.len() - broken_images.len(),
        broken: broken_images.len(),
    };
    info!(
        total = summary.total,
        broken = summary.broken,
        "Checked celebrity images"
    );

    Ok(ImageReport {
        summary,
        results,
        broken_images,
    })
}

async fn check_image(client: &reqwest::Client, record: ImageRecord, timeout: Duration) -> ImageCheck {
    let ImageRecord {
        id,
        name,
        image_url: url,
    } = record;

    match client.head(&url).timeout(timeout).send().await {
        Ok(response) => {
            let code = response.status();
            debug!(%url, status = code.as_u16(), "Image HEAD");
            ImageCheck {
                id,
                name,
                url,
                status: if code.is_success() {
                    ImageStatus::Ok
                } else {
                    ImageStatus::Failed
                },
                status_code: Some(code.as_u16()),
                error: None,
            }
        }
        Err(e) => {
            warn!(%url, error = %e, "Image HEAD failed");
            ImageCheck {
                id,
                name,
                url,
                status: ImageStatus::Error,
                status_code: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// A replacement image URL for one entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageFix {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Updated,
    NotFound,
    Error,
}

/// Outcome of one fix.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixResult {
    pub id: String,
    pub status: FixStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Apply each fix in order; one failure does not stop the rest.
#[instrument(skip_all, fields(count = fixes.len()))]
pub async fn apply_image_fixes(store: &dyn CelebrityStore, fixes: &[ImageFix]) -> Vec<FixResult> {
    let mut results = Vec::with_capacity(fixes.len());
    for fix in fixes {
        let result = match store.set_image_url(&fix.id, &fix.url).await {
            Ok(Some(name)) => FixResult {
                id: fix.id.clone(),
                status: FixStatus::Updated,
                name: Some(name),
                new_url: Some(fix.url.clone()),
                error: None,
            },
            Ok(None) => FixResult {
                id: fix.id.clone(),
                status: FixStatus::NotFound,
                name: None,
                new_url: None,
                error: None,
            },
            Err(e) => FixResult {
                id: fix.id.clone(),
                status: FixStatus::Error,
                name: None,
                new_url: None,
                error: Some(format!("{e:#}")),
            },
        };
        results.push(result);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::celebrity::{MemoryCelebrityStore, NewCelebrity};
    use axum::{Router, http::StatusCode, routing::get};
    use tokio::net::TcpListener;

    async fn image_server() -> String {
        let app = Router::new()
            .route("/ok.jpg", get(|| async { "image" }))
            .route("/gone.jpg", get(|| async { StatusCode::NOT_FOUND }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn unused_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/nothing.jpg")
    }

    #[tokio::test]
    async fn test_check_images_classifies_results() {
        let base = image_server().await;
        let store = MemoryCelebrityStore::new();
        for (name, url) in [
            ("Alpha", format!("{base}/ok.jpg")),
            ("Beta", format!("{base}/gone.jpg")),
            ("Gamma", unused_port_url().await),
        ] {
            store
                .insert(NewCelebrity::from_name(name, "", url, "admin", true))
                .await
                .unwrap();
        }

        let report = check_images(&store, &reqwest::Client::new(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.working, 1);
        assert_eq!(report.summary.broken, 2);

        let by_name = |name: &str| report.results.iter().find(|r| r.name == name).unwrap();
        assert_eq!(by_name("Alpha").status, ImageStatus::Ok);
        assert_eq!(by_name("Beta").status, ImageStatus::Failed);
        assert_eq!(by_name("Beta").status_code, Some(404));
        assert_eq!(by_name("Gamma").status, ImageStatus::Error);
        assert!(by_name("Gamma").error.is_some());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["brokenImages"].as_array().unwrap().len(), 2);
        assert_eq!(json["results"][1]["statusCode"], 404);
    }

    #[tokio::test]
    async fn test_apply_image_fixes() {
        let store = MemoryCelebrityStore::seeded().await.unwrap();
        let fixes = vec![
            ImageFix {
                id: "tina-fey".to_string(),
                url: "https://img.example/tina.jpg".to_string(),
            },
            ImageFix {
                id: "seth-rogen".to_string(),
                url: "https://img.example/seth.jpg".to_string(),
            },
        ];

        let results = apply_image_fixes(&store, &fixes).await;
        assert_eq!(results[0].status, FixStatus::Updated);
        assert_eq!(results[0].name.as_deref(), Some("Tina Fey"));
        assert_eq!(results[1].status, FixStatus::NotFound);

        let tina = store.get_approved("tina-fey").await.unwrap().unwrap();
        assert_eq!(tina.image_url, "https://img.example/tina.jpg");

        let json = serde_json::to_value(&results[0]).unwrap();
        assert_eq!(json["status"], "updated");
        assert_eq!(json["newUrl"], "https://img.example/tina.jpg");
    }
}
