//! Heartbeat/keepalive mechanism.
//!
//! The platform acknowledges every heartbeat probe with an ack frame.
//! The task sends a probe only when the previous one was acknowledged;
//! an unacknowledged probe increments the missed counter instead, and
//! once the counter reaches the threshold the task tells the session to
//! close the connection. Probes are never retried.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use corvid_proto::GatewayPayload;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Configuration for heartbeat behavior.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between probes. Normally overridden by the hello frame.
    pub interval: Duration,
    /// Unacknowledged probes tolerated before the connection is
    /// considered dead.
    pub max_missed_acks: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(45),
            max_missed_acks: 3,
        }
    }
}

/// Message from the heartbeat task to the session loop.
#[derive(Debug)]
pub enum HeartbeatCommand {
    /// Send this probe frame on the socket.
    Beat(GatewayPayload),
    /// Too many probes went unacknowledged; close the connection.
    ConnectionDead {
        /// Probes that went unacknowledged.
        missed: u32,
    },
}

/// Handle for controlling the heartbeat task.
#[derive(Debug)]
pub struct HeartbeatHandle {
    running: Arc<AtomicBool>,
    missed_acks: Arc<AtomicU32>,
    acked: Arc<AtomicBool>,
    sent_at: Arc<Mutex<Option<Instant>>>,
    task: Option<JoinHandle<()>>,
}

impl HeartbeatHandle {
    /// Create a new heartbeat handle.
    pub(crate) fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            missed_acks: Arc::new(AtomicU32::new(0)),
            // True so the first tick after connect sends immediately.
            acked: Arc::new(AtomicBool::new(true)),
            sent_at: Arc::new(Mutex::new(None)),
            task: None,
        }
    }

    /// Check if the heartbeat task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the number of consecutive missed acks.
    #[must_use]
    pub fn missed_acks(&self) -> u32 {
        self.missed_acks.load(Ordering::SeqCst)
    }

    /// Record an acknowledgement for the outstanding probe.
    pub fn ack_received(&self) {
        self.acked.store(true, Ordering::SeqCst);
        self.missed_acks.store(0, Ordering::SeqCst);

        if let Ok(mut sent) = self.sent_at.lock() {
            if let Some(at) = sent.take() {
                debug!(
                    latency_ms = at.elapsed().as_millis() as u64,
                    "heartbeat acknowledged"
                );
            }
        }
    }

    /// Stop the heartbeat task.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stop the task, abort it, and wait for it to finish. Every session
    /// teardown runs this, so a heartbeat task never outlives its
    /// connection.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

/// Start a periodic heartbeat task.
///
/// `seq` holds the last observed dispatch sequence number; each probe
/// carries its current value. Returns a handle to control the task and
/// monitor its state.
pub fn start_heartbeat_task(
    seq: Arc<AtomicU64>,
    tx: mpsc::Sender<HeartbeatCommand>,
    config: HeartbeatConfig,
) -> HeartbeatHandle {
    let mut handle = HeartbeatHandle::new();
    handle.running.store(true, Ordering::SeqCst);

    let running = Arc::clone(&handle.running);
    let missed_acks = Arc::clone(&handle.missed_acks);
    let acked = Arc::clone(&handle.acked);
    let sent_at = Arc::clone(&handle.sent_at);
    let max_missed = config.max_missed_acks;

    let task = tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(config.interval);

        while running.load(Ordering::SeqCst) {
            interval_timer.tick().await;

            if !running.load(Ordering::SeqCst) {
                break;
            }

            if !acked.load(Ordering::SeqCst) {
                let missed = missed_acks.fetch_add(1, Ordering::SeqCst) + 1;
                warn!(missed, max_missed, "heartbeat not acknowledged");

                if missed >= max_missed {
                    running.store(false, Ordering::SeqCst);
                    let _ = tx.send(HeartbeatCommand::ConnectionDead { missed }).await;
                    break;
                }
                continue;
            }

            acked.store(false, Ordering::SeqCst);
            if let Ok(mut sent) = sent_at.lock() {
                *sent = Some(Instant::now());
            }

            let frame = GatewayPayload::heartbeat(Some(seq.load(Ordering::SeqCst)));
            if tx.send(HeartbeatCommand::Beat(frame)).await.is_err() {
                // Session loop is gone, stop the task
                running.store(false, Ordering::SeqCst);
                break;
            }
        }
    });
    handle.task = Some(task);

    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_config_default() {
        let config = HeartbeatConfig::default();
        assert_eq!(config.interval, Duration::from_secs(45));
        assert_eq!(config.max_missed_acks, 3);
    }

    #[test]
    fn test_heartbeat_handle_initial_state() {
        let handle = HeartbeatHandle::new();
        assert!(!handle.is_running());
        assert_eq!(handle.missed_acks(), 0);
    }

    #[test]
    fn test_heartbeat_handle_ack_received() {
        let handle = HeartbeatHandle::new();
        handle.missed_acks.store(2, Ordering::SeqCst);
        handle.acked.store(false, Ordering::SeqCst);

        handle.ack_received();

        assert_eq!(handle.missed_acks(), 0);
        assert!(handle.acked.load(Ordering::SeqCst));
    }

    #[test]
    fn test_heartbeat_handle_stop() {
        let handle = HeartbeatHandle::new();
        handle.running.store(true, Ordering::SeqCst);

        assert!(handle.is_running());

        handle.stop();

        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn test_first_beat_is_prompt_and_carries_zero() {
        let seq = Arc::new(AtomicU64::new(0));
        let (tx, mut rx) = mpsc::channel(32);

        let config = HeartbeatConfig {
            interval: Duration::from_secs(30),
            max_missed_acks: 3,
        };

        let handle = start_heartbeat_task(seq, tx, config);

        // First tick fires immediately, well before the 30s interval.
        let cmd = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("timeout waiting for first beat")
            .expect("channel closed");

        match cmd {
            HeartbeatCommand::Beat(frame) => {
                assert_eq!(frame.op, 1);
                assert_eq!(frame.d, serde_json::json!(0));
            }
            other => panic!("expected Beat, got {:?}", other),
        }

        handle.stop();
    }

    #[tokio::test]
    async fn test_acked_beats_keep_flowing_with_latest_seq() {
        let seq = Arc::new(AtomicU64::new(0));
        let (tx, mut rx) = mpsc::channel(32);

        let config = HeartbeatConfig {
            interval: Duration::from_millis(10),
            max_missed_acks: 3,
        };

        let handle = start_heartbeat_task(Arc::clone(&seq), tx, config);

        let first = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert!(matches!(first, HeartbeatCommand::Beat(_)));

        // Acknowledge and bump the sequence before the next tick.
        seq.store(42, Ordering::SeqCst);
        handle.ack_received();

        let second = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");

        match second {
            HeartbeatCommand::Beat(frame) => {
                assert_eq!(frame.d, serde_json::json!(42));
            }
            other => panic!("expected Beat, got {:?}", other),
        }

        handle.stop();
    }

    #[tokio::test]
    async fn test_unacked_beat_is_not_resent() {
        let seq = Arc::new(AtomicU64::new(0));
        let (tx, mut rx) = mpsc::channel(32);

        let config = HeartbeatConfig {
            interval: Duration::from_millis(10),
            max_missed_acks: 100,
        };

        let handle = start_heartbeat_task(seq, tx, config);

        let first = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert!(matches!(first, HeartbeatCommand::Beat(_)));

        // Never acknowledged: ticks accumulate misses instead of probes.
        let next = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(next.is_err(), "expected no second beat, got {:?}", next);
        assert!(handle.missed_acks() >= 1);

        handle.stop();
    }

    #[tokio::test]
    async fn test_connection_dead_after_max_missed_acks() {
        let seq = Arc::new(AtomicU64::new(0));
        let (tx, mut rx) = mpsc::channel(32);

        let config = HeartbeatConfig {
            interval: Duration::from_millis(5),
            max_missed_acks: 2,
        };

        let handle = start_heartbeat_task(seq, tx, config);

        let first = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert!(matches!(first, HeartbeatCommand::Beat(_)));

        let second = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");

        match second {
            HeartbeatCommand::ConnectionDead { missed } => assert_eq!(missed, 2),
            other => panic!("expected ConnectionDead, got {:?}", other),
        }

        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn test_heartbeat_task_stops_on_channel_close() {
        let seq = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel(1);

        let config = HeartbeatConfig {
            interval: Duration::from_millis(5),
            max_missed_acks: 2,
        };

        let handle = start_heartbeat_task(seq, tx, config);

        // Drop receiver to close channel
        drop(rx);

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn test_shutdown_terminates_the_task() {
        let seq = Arc::new(AtomicU64::new(0));
        let (tx, mut rx) = mpsc::channel(32);

        let config = HeartbeatConfig {
            interval: Duration::from_millis(5),
            max_missed_acks: 100,
        };

        let handle = start_heartbeat_task(seq, tx, config);

        let first = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        assert!(matches!(first, HeartbeatCommand::Beat(_)));

        handle.shutdown().await;

        // The task held the only sender, so the channel reports closed.
        assert!(rx.recv().await.is_none());
    }
}
