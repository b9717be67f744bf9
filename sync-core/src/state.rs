//! Connection state machine for the sync client.
//!
//! This module provides a pure, side-effect-free state machine for managing
//! the client's connection lifecycle. The state machine takes events as input
//! and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (probing the server, polling, flushing) is performed by
//! sync-client, not by this module. This enables instant unit testing without
//! network mocks.

use std::time::Duration;
use sync_types::{ChangeEvent, Collection};

/// Retry limits for reconnection.
///
/// After `max_attempts` consecutive failed probes the client stops retrying
/// and parks in [`ConnectionState::Suspended`] until the next
/// connectivity-change signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum consecutive connection attempts before suspending.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

/// Connection state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Client not started, or stopped by the application.
    Stopped,
    /// Probe in progress.
    Connecting {
        /// Which consecutive attempt this is (1-based).
        attempt: u32,
    },
    /// Server reachable; polling timer running.
    Online,
    /// Probe failed; waiting for the retry timer.
    Backoff {
        /// The attempt that just failed.
        attempt: u32,
    },
    /// Retry attempts exhausted or connectivity lost; waiting for a
    /// connectivity-change signal before trying again.
    Suspended,
}

impl ConnectionState {
    /// Create a new state machine in the Stopped state.
    pub fn new() -> Self {
        Self::Stopped
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (sync-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event, policy: &RetryPolicy) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Stopped
            (Self::Stopped, Event::StartRequested) => {
                (Self::Connecting { attempt: 1 }, vec![Action::Probe])
            }

            // From Connecting
            (Self::Connecting { .. }, Event::ConnectSucceeded) => (
                Self::Online,
                vec![
                    Action::StartPolling,
                    Action::FlushQueue,
                    Action::EmitEvent(ClientEvent::Online),
                ],
            ),
            (Self::Connecting { attempt }, Event::ConnectFailed { error }) => {
                let failure = if attempt == 1 {
                    ClientEvent::ConnectionFailed {
                        error: error.clone(),
                    }
                } else {
                    ClientEvent::RetryFailed {
                        attempt,
                        error: error.clone(),
                    }
                };

                if attempt >= policy.max_attempts {
                    (
                        Self::Suspended,
                        vec![Action::EmitEvent(failure), Action::EmitEvent(ClientEvent::Suspended)],
                    )
                } else {
                    (
                        Self::Backoff { attempt },
                        vec![
                            Action::EmitEvent(failure),
                            Action::StartRetryTimer {
                                delay: backoff_delay(attempt),
                            },
                        ],
                    )
                }
            }
            (Self::Connecting { .. }, Event::ConnectivityChanged { online: false }) => (
                Self::Suspended,
                vec![Action::EmitEvent(ClientEvent::Offline {
                    reason: "connectivity lost".into(),
                })],
            ),

            // From Online
            (Self::Online, Event::ConnectionLost { reason }) => (
                Self::Backoff { attempt: 1 },
                vec![
                    Action::StopPolling,
                    Action::EmitEvent(ClientEvent::Offline { reason }),
                    Action::StartRetryTimer {
                        delay: backoff_delay(1),
                    },
                ],
            ),
            (Self::Online, Event::ConnectivityChanged { online: false }) => (
                Self::Suspended,
                vec![
                    Action::StopPolling,
                    Action::EmitEvent(ClientEvent::Offline {
                        reason: "connectivity lost".into(),
                    }),
                ],
            ),
            // Already online - connectivity regained is a cue to deliver
            // anything that queued up meanwhile.
            (Self::Online, Event::ConnectivityChanged { online: true }) => {
                (Self::Online, vec![Action::FlushQueue])
            }

            // From Backoff
            (Self::Backoff { attempt }, Event::RetryTimer) => (
                Self::Connecting {
                    attempt: attempt.saturating_add(1),
                },
                vec![Action::Probe],
            ),
            (Self::Backoff { .. }, Event::ConnectivityChanged { online: false }) => (
                Self::Suspended,
                vec![
                    Action::CancelRetry,
                    Action::EmitEvent(ClientEvent::Offline {
                        reason: "connectivity lost".into(),
                    }),
                ],
            ),
            (Self::Backoff { .. }, Event::ConnectivityChanged { online: true }) => {
                (Self::Connecting { attempt: 1 }, vec![Action::CancelRetry, Action::Probe])
            }

            // From Suspended
            (Self::Suspended, Event::ConnectivityChanged { online: true }) => {
                (Self::Connecting { attempt: 1 }, vec![Action::Probe])
            }

            // Stop is honored from every state
            (state, Event::StopRequested) => {
                if matches!(state, Self::Stopped) {
                    (Self::Stopped, vec![])
                } else {
                    (
                        Self::Stopped,
                        vec![
                            Action::StopPolling,
                            Action::CancelRetry,
                            Action::EmitEvent(ClientEvent::Offline {
                                reason: "stopped".into(),
                            }),
                        ],
                    )
                }
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if currently online.
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    /// Check if currently trying to connect.
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting { .. } | Self::Backoff { .. })
    }

    /// Check if suspended (waiting for a connectivity change).
    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended)
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Application requested the client to start.
    StartRequested,
    /// Server probe succeeded.
    ConnectSucceeded,
    /// Server probe failed.
    ConnectFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// An established connection stopped working.
    ConnectionLost {
        /// Reason for the loss.
        reason: String,
    },
    /// Retry timer fired.
    RetryTimer,
    /// Platform connectivity changed (e.g. network interface up/down).
    ConnectivityChanged {
        /// Whether the platform reports connectivity.
        online: bool,
    },
    /// Application requested the client to stop.
    StopRequested,
}

/// Actions to be executed by the sync-client.
///
/// These are instructions, not side effects. The sync-client interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Probe the server for reachability.
    Probe,
    /// Start the periodic polling timer.
    StartPolling,
    /// Stop the periodic polling timer.
    StopPolling,
    /// Attempt to deliver the pending queue.
    FlushQueue,
    /// Start a timer before the next probe.
    StartRetryTimer {
        /// Delay before the next probe.
        delay: Duration,
    },
    /// Cancel any pending retry timer.
    CancelRetry,
    /// Emit an event to the application.
    EmitEvent(ClientEvent),
}

/// Events emitted to the application layer.
///
/// The connection-lifecycle variants are produced by the state machine; the
/// sync/queue variants are emitted directly by the client as work completes.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Server reachable; polling started.
    Online,
    /// Polling halted.
    Offline {
        /// Reason for going offline.
        reason: String,
    },
    /// Initial connection attempt failed.
    ConnectionFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// A reconnection attempt failed.
    RetryFailed {
        /// Which consecutive attempt this was.
        attempt: u32,
        /// Error message describing the failure.
        error: String,
    },
    /// Retry attempts exhausted; waiting for a connectivity change.
    Suspended,
    /// A sync pass finished.
    SyncCompleted {
        /// Collections fetched successfully.
        fetched: usize,
        /// Collections that failed and were left stale.
        failed: usize,
    },
    /// A collection was overwritten with server data.
    CollectionUpdated {
        /// The collection that changed.
        collection: Collection,
        /// Number of records it now holds.
        count: usize,
    },
    /// A flush pass finished.
    QueueFlushed {
        /// Operations acknowledged and removed.
        delivered: usize,
        /// Operations still queued.
        remaining: usize,
    },
    /// A change event arrived on the push channel.
    PushReceived {
        /// The server-side change.
        event: ChangeEvent,
    },
}

/// Calculate reconnection backoff with jitter.
///
/// Uses exponential backoff with random jitter to prevent thundering herd
/// when many clients reconnect simultaneously after a server restart.
///
/// Formula: min(30s, 2^attempt seconds) + random(0..5000ms)
pub fn backoff_delay(attempt: u32) -> Duration {
    // Base: 2^attempt seconds, capped at 30 seconds
    let base_secs = 2u64.pow(attempt.min(5)).min(30);
    let base = Duration::from_secs(base_secs);

    // Jitter: 0-5000ms random
    let jitter = Duration::from_millis(random_jitter_ms());

    base + jitter
}

/// Generate random jitter between 0 and 5000 milliseconds.
fn random_jitter_ms() -> u64 {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes).expect("getrandom failed");
    let random = u64::from_le_bytes(bytes);
    random % 5001 // 0..5000 inclusive
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    #[test]
    fn starts_stopped() {
        assert!(matches!(ConnectionState::new(), ConnectionState::Stopped));
    }

    #[test]
    fn start_request_probes() {
        let (state, actions) =
            ConnectionState::Stopped.on_event(Event::StartRequested, &policy());

        assert_eq!(state, ConnectionState::Connecting { attempt: 1 });
        assert!(actions.iter().any(|a| matches!(a, Action::Probe)));
    }

    #[test]
    fn probe_success_goes_online_and_flushes() {
        let state = ConnectionState::Connecting { attempt: 1 };
        let (state, actions) = state.on_event(Event::ConnectSucceeded, &policy());

        assert!(state.is_online());
        assert!(actions.iter().any(|a| matches!(a, Action::StartPolling)));
        assert!(actions.iter().any(|a| matches!(a, Action::FlushQueue)));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::EmitEvent(ClientEvent::Online))));
    }

    #[test]
    fn first_probe_failure_backs_off() {
        let state = ConnectionState::Connecting { attempt: 1 };
        let (state, actions) = state.on_event(
            Event::ConnectFailed {
                error: "timeout".into(),
            },
            &policy(),
        );

        assert_eq!(state, ConnectionState::Backoff { attempt: 1 });
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::EmitEvent(ClientEvent::ConnectionFailed { .. }))));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::StartRetryTimer { .. })));
    }

    #[test]
    fn retry_timer_probes_with_next_attempt() {
        let state = ConnectionState::Backoff { attempt: 2 };
        let (state, actions) = state.on_event(Event::RetryTimer, &policy());

        assert_eq!(state, ConnectionState::Connecting { attempt: 3 });
        assert!(actions.iter().any(|a| matches!(a, Action::Probe)));
    }

    #[test]
    fn later_failures_emit_retry_failed() {
        let state = ConnectionState::Connecting { attempt: 3 };
        let (_, actions) = state.on_event(
            Event::ConnectFailed {
                error: "refused".into(),
            },
            &policy(),
        );

        assert!(actions.iter().any(|a| matches!(
            a,
            Action::EmitEvent(ClientEvent::RetryFailed { attempt: 3, .. })
        )));
    }

    #[test]
    fn attempts_exhaust_into_suspended() {
        let state = ConnectionState::Connecting { attempt: 5 };
        let (state, actions) = state.on_event(
            Event::ConnectFailed {
                error: "refused".into(),
            },
            &policy(),
        );

        assert!(state.is_suspended());
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::EmitEvent(ClientEvent::Suspended))));
        // No further retry timer once suspended
        assert!(!actions
            .iter()
            .any(|a| matches!(a, Action::StartRetryTimer { .. })));
    }

    #[test]
    fn suspended_waits_for_connectivity() {
        let (state, actions) =
            ConnectionState::Suspended.on_event(Event::RetryTimer, &policy());
        assert!(state.is_suspended());
        assert!(actions.is_empty());

        let (state, actions) = ConnectionState::Suspended
            .on_event(Event::ConnectivityChanged { online: true }, &policy());
        assert_eq!(state, ConnectionState::Connecting { attempt: 1 });
        assert!(actions.iter().any(|a| matches!(a, Action::Probe)));
    }

    #[test]
    fn connection_lost_reconnects() {
        let (state, actions) = ConnectionState::Online.on_event(
            Event::ConnectionLost {
                reason: "request failed".into(),
            },
            &policy(),
        );

        assert_eq!(state, ConnectionState::Backoff { attempt: 1 });
        assert!(actions.iter().any(|a| matches!(a, Action::StopPolling)));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::EmitEvent(ClientEvent::Offline { .. }))));
    }

    #[test]
    fn losing_connectivity_halts_polling_keeps_nothing_running() {
        let (state, actions) = ConnectionState::Online
            .on_event(Event::ConnectivityChanged { online: false }, &policy());

        assert!(state.is_suspended());
        assert!(actions.iter().any(|a| matches!(a, Action::StopPolling)));
    }

    #[test]
    fn regaining_connectivity_while_online_flushes() {
        let (state, actions) = ConnectionState::Online
            .on_event(Event::ConnectivityChanged { online: true }, &policy());

        assert!(state.is_online());
        assert_eq!(actions, vec![Action::FlushQueue]);
    }

    #[test]
    fn connectivity_regained_during_backoff_probes_immediately() {
        let state = ConnectionState::Backoff { attempt: 3 };
        let (state, actions) =
            state.on_event(Event::ConnectivityChanged { online: true }, &policy());

        assert_eq!(state, ConnectionState::Connecting { attempt: 1 });
        assert!(actions.iter().any(|a| matches!(a, Action::CancelRetry)));
        assert!(actions.iter().any(|a| matches!(a, Action::Probe)));
    }

    #[test]
    fn stop_from_online_tears_down() {
        let (state, actions) =
            ConnectionState::Online.on_event(Event::StopRequested, &policy());

        assert!(matches!(state, ConnectionState::Stopped));
        assert!(actions.iter().any(|a| matches!(a, Action::StopPolling)));
        assert!(actions.iter().any(|a| matches!(a, Action::CancelRetry)));
    }

    #[test]
    fn stop_when_stopped_is_silent() {
        let (state, actions) =
            ConnectionState::Stopped.on_event(Event::StopRequested, &policy());
        assert!(matches!(state, ConnectionState::Stopped));
        assert!(actions.is_empty());
    }

    #[test]
    fn full_reconnect_cycle() {
        let policy = policy();

        // Start → probe fails → backoff → timer → probe succeeds → online
        let (state, _) = ConnectionState::Stopped.on_event(Event::StartRequested, &policy);
        let (state, _) = state.on_event(
            Event::ConnectFailed {
                error: "down".into(),
            },
            &policy,
        );
        assert_eq!(state, ConnectionState::Backoff { attempt: 1 });

        let (state, _) = state.on_event(Event::RetryTimer, &policy);
        assert_eq!(state, ConnectionState::Connecting { attempt: 2 });

        let (state, _) = state.on_event(Event::ConnectSucceeded, &policy);
        assert!(state.is_online());
    }

    #[test]
    fn is_connecting_helper() {
        assert!(ConnectionState::Connecting { attempt: 1 }.is_connecting());
        assert!(ConnectionState::Backoff { attempt: 1 }.is_connecting());
        assert!(!ConnectionState::Online.is_connecting());
        assert!(!ConnectionState::Stopped.is_connecting());
        assert!(!ConnectionState::Suspended.is_connecting());
    }

    #[test]
    fn backoff_increases_with_attempt() {
        let delay1 = backoff_delay(1);
        let delay3 = backoff_delay(3);

        assert!(delay1 >= Duration::from_secs(2));
        assert!(delay3 >= Duration::from_secs(8));
    }

    #[test]
    fn backoff_capped_at_30_seconds_plus_jitter() {
        let delay = backoff_delay(10);
        assert!(
            delay <= Duration::from_secs(35),
            "delay must be capped at ~35s (30s base + 5s jitter), got {:?}",
            delay
        );
    }

    #[test]
    fn backoff_jitter_creates_variance() {
        let delays: Vec<Duration> = (0..20).map(|_| backoff_delay(3)).collect();

        let min = delays.iter().min().unwrap();
        let max = delays.iter().max().unwrap();

        // With 0-5000ms jitter and 20 samples, collision of all values
        // is vanishingly unlikely
        assert!(
            max.as_millis() - min.as_millis() >= 100,
            "Expected jitter variance, got min={:?} max={:?}",
            min,
            max
        );
    }
}
