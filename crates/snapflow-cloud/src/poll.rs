//! Bounded polling for asynchronous snapshot creation

use crate::client::{RemoteClient, RemoteSnapshot, SnapshotState};
use crate::error::{CloudError, Result};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Lower bound for any delay between two lookups
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Backoff and terminal-state settings for the poll loop
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay before the second poll
    pub initial_interval: Duration,

    /// Upper bound for a single delay
    pub max_interval: Duration,

    /// Backoff multiplier
    pub multiplier: f64,

    /// States that end the wait with an error instead of being retried
    pub failure_states: Vec<SnapshotState>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            failure_states: vec![SnapshotState::Failed],
        }
    }
}

impl PollConfig {
    /// Delay to apply after the given (zero-based) attempt.
    ///
    /// Never below [`MIN_POLL_INTERVAL`], even when both configured
    /// intervals are smaller.
    pub fn interval_for_attempt(&self, attempt: u32) -> Duration {
        let floor = MIN_POLL_INTERVAL.as_millis() as f64;
        let ceiling = (self.max_interval.as_millis() as f64).max(floor);
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let millis = (self.initial_interval.as_millis() as f64).max(floor) * factor;
        Duration::from_millis(millis.min(ceiling) as u64)
    }
}

/// Waits for a one-shot snapshot to reach `complete`
#[derive(Debug, Clone, Default)]
pub struct PollPolicy {
    config: PollConfig,
}

impl PollPolicy {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn is_terminal_failure(&self, state: &SnapshotState) -> bool {
        self.config.failure_states.contains(state)
    }

    /// Poll `client.find(id)` until the snapshot is complete.
    ///
    /// Returns the completed snapshot. Fails fast on a configured failure
    /// state or a non-transient lookup error, and with
    /// [`CloudError::Timeout`] once `deadline` has elapsed. Sleeps are clamped
    /// to the remaining budget so the loop never overshoots the deadline by
    /// more than one lookup.
    pub async fn wait_until_complete(
        &self,
        client: &dyn RemoteClient,
        id: &str,
        deadline: Duration,
    ) -> Result<RemoteSnapshot> {
        let started = Instant::now();
        let mut attempt: u32 = 0;
        let mut last_state = String::from("unknown");

        loop {
            match client.find(id).await {
                Ok(snapshot) if snapshot.state.is_complete() => {
                    tracing::debug!(
                        "Snapshot {} complete after {} poll(s)",
                        id,
                        attempt + 1
                    );
                    return Ok(snapshot);
                }
                Ok(snapshot) if self.is_terminal_failure(&snapshot.state) => {
                    return Err(CloudError::TerminalState {
                        id: id.to_string(),
                        state: snapshot.state.to_string(),
                    });
                }
                Ok(snapshot) => {
                    tracing::debug!(
                        "Expected snapshot {} to be complete but was in state {}",
                        id,
                        snapshot.state
                    );
                    last_state = snapshot.state.to_string();
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!("Transient error polling snapshot {}: {}", id, e);
                }
                Err(source) => {
                    return Err(CloudError::RemoteReadFailed {
                        id: id.to_string(),
                        source,
                    });
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= deadline {
                return Err(CloudError::Timeout {
                    id: id.to_string(),
                    waited: elapsed,
                    last_state,
                });
            }

            let delay = self
                .config
                .interval_for_attempt(attempt)
                .min(deadline - elapsed);
            sleep(delay).await;
            attempt = attempt.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::testing::{ScriptedClient, snapshot};

    fn fast_policy() -> PollPolicy {
        PollPolicy::new(PollConfig {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(4),
            multiplier: 2.0,
            failure_states: vec![SnapshotState::Failed],
        })
    }

    #[test]
    fn test_interval_calculation() {
        let config = PollConfig {
            initial_interval: Duration::from_millis(1000),
            max_interval: Duration::from_millis(10000),
            multiplier: 2.0,
            failure_states: Vec::new(),
        };

        assert_eq!(config.interval_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(config.interval_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(config.interval_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(config.interval_for_attempt(3), Duration::from_millis(8000));
        assert_eq!(config.interval_for_attempt(4), Duration::from_millis(10000)); // capped at max
        assert_eq!(
            config.interval_for_attempt(u32::MAX),
            Duration::from_millis(10000)
        );
    }

    #[test]
    fn test_zero_interval_is_floored() {
        let config = PollConfig {
            initial_interval: Duration::ZERO,
            max_interval: Duration::from_nanos(500),
            ..PollConfig::default()
        };

        for attempt in 0..5 {
            assert_eq!(config.interval_for_attempt(attempt), MIN_POLL_INTERVAL);
        }
    }

    #[test]
    fn test_max_below_initial_caps_every_step() {
        let config = PollConfig {
            initial_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(2),
            ..PollConfig::default()
        };

        assert_eq!(config.interval_for_attempt(0), Duration::from_secs(2));
        assert_eq!(config.interval_for_attempt(3), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_still_backs_off() {
        let policy = PollPolicy::new(PollConfig {
            initial_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            ..PollConfig::default()
        });
        let client = ScriptedClient::new().on_find(Ok(snapshot("snap-1", SnapshotState::Pending)));

        let err = policy
            .wait_until_complete(&client, "snap-1", Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::Timeout { .. }));
        // finds at 0ms, 100ms and 200ms
        assert_eq!(client.finds(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_deadline_reads_once() {
        let client = ScriptedClient::new().on_find(Ok(snapshot("snap-1", SnapshotState::Pending)));

        let err = fast_policy()
            .wait_until_complete(&client, "snap-1", Duration::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::Timeout { .. }));
        assert_eq!(client.finds(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_after_pending_states() {
        let client = ScriptedClient::new()
            .on_find(Ok(snapshot("snap-1", SnapshotState::Pending)))
            .on_find(Ok(snapshot("snap-1", SnapshotState::InProgress)))
            .on_find(Ok(snapshot("snap-1", SnapshotState::Complete)));

        let result = fast_policy()
            .wait_until_complete(&client, "snap-1", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(result.state.is_complete());
        assert_eq!(client.finds(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_within_one_interval_of_deadline() {
        let client = ScriptedClient::new().on_find(Ok(snapshot("snap-1", SnapshotState::Pending)));
        let deadline = Duration::from_secs(10);
        let started = Instant::now();

        let err = fast_policy()
            .wait_until_complete(&client, "snap-1", deadline)
            .await
            .unwrap_err();

        let elapsed = started.elapsed();
        assert!(matches!(err, CloudError::Timeout { ref last_state, .. } if last_state == "pending"));
        assert!(elapsed >= deadline);
        assert!(elapsed <= deadline + fast_policy().config().max_interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_state_fails_fast() {
        let client = ScriptedClient::new()
            .on_find(Ok(snapshot("snap-1", SnapshotState::Pending)))
            .on_find(Ok(snapshot("snap-1", SnapshotState::Failed)));

        let err = fast_policy()
            .wait_until_complete(&client, "snap-1", Duration::from_secs(600))
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::TerminalState { ref state, .. } if state == "failed"));
        assert_eq!(client.finds(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_retried() {
        let client =
            ScriptedClient::new().on_find(Err(ClientError::NotFound("snap-1".to_string())));

        let err = fast_policy()
            .wait_until_complete(&client, "snap-1", Duration::from_secs(600))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(client.finds(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let client = ScriptedClient::new()
            .on_find(Err(ClientError::Transient("503 Service Unavailable".into())))
            .on_find(Err(ClientError::Transient("connection reset".into())))
            .on_find(Ok(snapshot("snap-1", SnapshotState::Complete)));

        let result = fast_policy()
            .wait_until_complete(&client, "snap-1", Duration::from_secs(60))
            .await;

        assert!(result.is_ok());
        assert_eq!(client.finds(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlisted_failure_state_is_retried_until_timeout() {
        let policy = PollPolicy::new(PollConfig {
            failure_states: Vec::new(),
            ..fast_policy().config().clone()
        });
        let client = ScriptedClient::new().on_find(Ok(snapshot("snap-1", SnapshotState::Failed)));

        let err = policy
            .wait_until_complete(&client, "snap-1", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::Timeout { .. }));
        assert!(client.finds() > 1);
    }
}
