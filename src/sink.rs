//! JSON-file persistence sink for healed workflows.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;
use webreplay_core_types::HealedRecord;
use webreplay_engine::{PersistenceSink, SinkError};

/// Writes each healed workflow to `<dir>/<workflow_id>.json`. Saves are
/// idempotent: writing the same id again overwrites the document.
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl PersistenceSink for JsonFileSink {
    async fn save(&self, workflow_id: &str, record: &HealedRecord) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| SinkError(format!("creating {}: {err}", self.dir.display())))?;

        let mut document = serde_json::to_value(record)
            .map_err(|err| SinkError(format!("serializing healed record: {err}")))?;
        document["id"] = json!(workflow_id);

        let path = self.dir.join(format!("{workflow_id}.json"));
        let body = serde_json::to_vec_pretty(&document)
            .map_err(|err| SinkError(format!("serializing healed record: {err}")))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|err| SinkError(format!("writing {}: {err}", path.display())))?;

        info!(path = %path.display(), "healed workflow written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use webreplay_core_types::Step;

    use super::*;

    fn record() -> HealedRecord {
        HealedRecord {
            steps: vec![serde_json::from_str::<Step>(
                r#"{"type":"navigation","url":"https://example.test"}"#,
            )
            .unwrap()],
            name: None,
            description: Some("fixed".to_string()),
            workflow_analysis: None,
            requires_password: None,
            heal_version: "v1".to_string(),
            healed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn writes_a_readable_document() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());

        sink.save("wf-9", &record()).await.unwrap();

        let raw = tokio::fs::read_to_string(dir.path().join("wf-9.json"))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["id"], "wf-9");
        assert_eq!(value["description"], "fixed");
        assert_eq!(value["heal_version"], "v1");
        // Unrevised metadata is omitted, not null.
        assert!(value.get("name").is_none());
    }

    #[tokio::test]
    async fn resaving_the_same_id_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());

        sink.save("wf-9", &record()).await.unwrap();
        let mut second = record();
        second.description = Some("fixed again".to_string());
        sink.save("wf-9", &second).await.unwrap();

        let raw = tokio::fs::read_to_string(dir.path().join("wf-9.json"))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["description"], "fixed again");
    }
}
