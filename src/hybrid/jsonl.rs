//! JSON-lines file sink
//!
//! Appends one JSON object per published message:
//!
//! ```text
//! {"topic":"orders","message":{"id":"…","content":"order #1",…}}
//! ```

use crate::broker::api::Message;
use crate::hybrid::error::SinkError;
use crate::hybrid::sink::SecondarySink;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Serialize)]
struct SinkRecord<'a> {
    topic: &'a str,
    message: &'a Message,
}

pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it and its parent directories
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SinkError::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| SinkError::io(&path, e))?;

        log::info!("Secondary sink writing to {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SecondarySink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn publish(&self, topic: &str, message: &Message) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(&SinkRecord { topic, message })?;
        line.push('\n');

        // One writer at a time keeps lines whole
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SinkError::io(&self.path, e))?;
        file.flush().await.map_err(|e| SinkError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_appends_one_line_per_message() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("messages.jsonl");
        let sink = JsonLinesSink::open(&path).await.unwrap();

        let first = Message::new("p1", "orders", "a");
        let second = Message::new("p1", "orders", "b");
        sink.publish("orders", &first).await.unwrap();
        sink.publish("orders", &second).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["topic"], "orders");
        let decoded: Message = serde_json::from_value(record["message"].clone()).unwrap();
        assert_eq!(decoded, first);
    }

    #[tokio::test]
    async fn test_reopen_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.jsonl");

        let sink = JsonLinesSink::open(&path).await.unwrap();
        sink.publish("orders", &Message::new("p1", "orders", "a"))
            .await
            .unwrap();
        drop(sink);

        let sink = JsonLinesSink::open(&path).await.unwrap();
        sink.publish("orders", &Message::new("p1", "orders", "b"))
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_open_fails_on_directory() {
        let dir = TempDir::new().unwrap();
        let result = JsonLinesSink::open(dir.path()).await;
        assert!(matches!(result, Err(SinkError::Io { .. })));
    }
}
