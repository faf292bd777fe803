//! Asynchronous analytics logger that batches segment events and appends
//! them to a JSON-lines file. Uses a channel-based architecture so emitting
//! never blocks and never fails the caller.

use smile_core::config::AnalyticsConfig;
use smile_core::event_bus::{EventSink, SegmentEvent};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Analytics sink with a background batch writer.
pub struct AnalyticsLogger {
    sender: mpsc::Sender<SegmentEvent>,
    writer: JoinHandle<()>,
}

impl AnalyticsLogger {
    /// Create a new analytics logger and spawn the background writer.
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &AnalyticsConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(config.batch_size > 0, "analytics batch_size must be positive");
        anyhow::ensure!(
            config.channel_capacity > 0,
            "analytics channel_capacity must be positive"
        );

        let (sender, receiver) = mpsc::channel::<SegmentEvent>(config.channel_capacity);
        let writer = BatchWriter {
            path: PathBuf::from(&config.output_path),
        };
        let batch_size = config.batch_size;
        let flush_interval = Duration::from_millis(config.flush_interval_ms.max(1));

        let writer = tokio::spawn(async move {
            writer.run(receiver, batch_size, flush_interval).await;
        });

        info!(path = %config.output_path, "Analytics logger initialized");

        Ok(Self { sender, writer })
    }

    /// Close the channel and wait until every queued event is written.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.writer.await {
            error!(error = %e, "Analytics writer task failed");
        }
    }
}

impl EventSink for AnalyticsLogger {
    fn emit(&self, event: SegmentEvent) {
        if let Err(e) = self.sender.try_send(event) {
            metrics::counter!("analytics.dropped").increment(1);
            warn!("Analytics event dropped: {}", e);
        } else {
            metrics::counter!("analytics.queued").increment(1);
        }
    }
}

/// Background writer that batches events and appends them to the output file.
struct BatchWriter {
    path: PathBuf,
}

impl BatchWriter {
    async fn run(
        self,
        mut receiver: mpsc::Receiver<SegmentEvent>,
        batch_size: usize,
        flush_interval: Duration,
    ) {
        let mut buffer: Vec<SegmentEvent> = Vec::with_capacity(batch_size);
        let mut interval = tokio::time::interval(flush_interval);

        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Some(event) => {
                        buffer.push(event);
                        if buffer.len() >= batch_size {
                            self.flush(&mut buffer).await;
                        }
                    }
                    None => {
                        if !buffer.is_empty() {
                            self.flush(&mut buffer).await;
                        }
                        debug!("Analytics channel closed, writer exiting");
                        return;
                    }
                },
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        self.flush(&mut buffer).await;
                    }
                }
            }
        }
    }

    async fn flush(&self, buffer: &mut Vec<SegmentEvent>) {
        let count = buffer.len();
        debug!(count = count, "Flushing analytics batch");

        let mut lines = String::new();
        for e in buffer.iter() {
            if let Ok(json) = serde_json::to_string(e) {
                lines.push_str(&json);
                lines.push('\n');
            }
        }
        buffer.clear();

        if lines.is_empty() {
            return;
        }

        match self.append(lines.as_bytes()).await {
            Ok(()) => {
                metrics::counter!("analytics.flushed").increment(count as u64);
                debug!(count = count, "Analytics batch flushed successfully");
            }
            Err(e) => {
                metrics::counter!("analytics.flush_errors").increment(1);
                error!(error = %e, count = count, "Failed to flush analytics batch");
            }
        }
    }

    async fn append(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn config(path: &std::path::Path, batch_size: usize) -> AnalyticsConfig {
        AnalyticsConfig {
            output_path: path.to_string_lossy().into_owned(),
            batch_size,
            flush_interval_ms: 50,
            channel_capacity: 16,
        }
    }

    #[tokio::test]
    async fn test_events_written_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let logger = AnalyticsLogger::new(&config(&path, 100)).unwrap();

        let now = Utc::now();
        logger.emit(SegmentEvent::new("s-1", "new_visitor", 0.9, false, now));
        logger.emit(SegmentEvent::new("s-2", "price_conscious", 0.9, false, now));
        logger.shutdown().await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let events: Vec<SegmentEvent> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].session_id, "s-1");
        assert_eq!(events[1].segment, "price_conscious");
    }

    #[tokio::test]
    async fn test_unwritable_path_does_not_affect_emitters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("events.jsonl");
        let logger = AnalyticsLogger::new(&config(&path, 1)).unwrap();

        logger.emit(SegmentEvent::new("s-1", "new_visitor", 0.9, false, Utc::now()));
        logger.shutdown().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AnalyticsLogger::new(&config(&dir.path().join("e.jsonl"), 0)).is_err());
    }
}
