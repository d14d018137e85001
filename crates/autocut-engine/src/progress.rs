//! Per-job progress fan-out.
//!
//! A `tokio::sync::broadcast` channel per job: the orchestrator publishes,
//! any number of subscribers listen. Slow subscribers lag and are allowed
//! to coalesce — they observe the most recent events plus the terminal one.
//! Publishing is synchronous so analysis code can report without awaiting.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::debug;

use autocut_models::{JobId, ProgressMessage};

/// Buffered events per subscriber before coalescing kicks in.
const CHANNEL_CAPACITY: usize = 64;

/// Fan-out hub for progress events.
pub struct ProgressHub {
    channels: RwLock<HashMap<JobId, broadcast::Sender<ProgressMessage>>>,
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressHub {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Publish an event for a job. Terminal events drop the channel, so
    /// late subscribers rely on the store snapshot instead.
    pub fn publish(&self, job_id: &JobId, message: ProgressMessage) {
        let terminal = message.is_terminal();
        {
            let channels = self.channels.read().expect("progress hub lock");
            if let Some(sender) = channels.get(job_id) {
                // Send fails only when no subscriber is listening; events
                // are not queued for absent subscribers.
                let _ = sender.send(message);
            }
        }
        if terminal {
            self.channels
                .write()
                .expect("progress hub lock")
                .remove(job_id);
            debug!(job_id = %job_id, "Progress channel closed");
        }
    }

    /// Subscribe to a job's future events.
    ///
    /// The caller should first read the job record for the checkpoint
    /// snapshot, then consume this receiver for deltas.
    pub fn subscribe(&self, job_id: &JobId) -> broadcast::Receiver<ProgressMessage> {
        let mut channels = self.channels.write().expect("progress hub lock");
        channels
            .entry(job_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let hub = ProgressHub::new();
        let job_id = JobId::new();

        let mut rx = hub.subscribe(&job_id);
        hub.publish(&job_id, ProgressMessage::progress(0.5, "halfway"));

        match rx.recv().await.unwrap() {
            ProgressMessage::Progress { progress, .. } => {
                assert!((progress - 0.5).abs() < 1e-9)
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_terminal_event_closes_channel() {
        let hub = ProgressHub::new();
        let job_id = JobId::new();

        let mut rx = hub.subscribe(&job_id);
        hub.publish(&job_id, ProgressMessage::error("cancelled"));

        // The buffered terminal event is still delivered...
        assert!(matches!(
            rx.recv().await.unwrap(),
            ProgressMessage::Error { .. }
        ));
        // ...then the stream ends.
        assert!(rx.recv().await.is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let hub = ProgressHub::new();
        let job_id = JobId::new();

        let mut a = hub.subscribe(&job_id);
        let mut b = hub.subscribe(&job_id);
        hub.publish(&job_id, ProgressMessage::progress(0.2, "x"));

        assert!(matches!(
            a.recv().await.unwrap(),
            ProgressMessage::Progress { .. }
        ));
        assert!(matches!(
            b.recv().await.unwrap(),
            ProgressMessage::Progress { .. }
        ));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_coalesces() {
        let hub = ProgressHub::new();
        let job_id = JobId::new();

        let mut rx = hub.subscribe(&job_id);
        for i in 0..(CHANNEL_CAPACITY + 10) {
            hub.publish(
                &job_id,
                ProgressMessage::progress(i as f64 / 100.0, "tick"),
            );
        }
        hub.publish(&job_id, ProgressMessage::error("done"));

        // The receiver lagged; after the Lagged error it still reaches the
        // terminal event.
        let mut saw_terminal = false;
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if msg.is_terminal() {
                        saw_terminal = true;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        assert!(saw_terminal);
    }
}
