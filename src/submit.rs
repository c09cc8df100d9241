//! Score submission pipeline: pending score → transaction gate → raise-only
//! leaderboard write.
//!
//! The controller runs as a task on the runtime and talks to the synchronous
//! UI loop over channels, so a gate call of any duration never blocks a new
//! game from being played.

use crate::gate::{GateRequest, GateStatus, TransactionGate};
use crate::leaderboard::{LeaderboardStore, Snapshot};
use crate::social::{SocialClient, share_text};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::{mpsc, watch};

/// Outcome of one finished run. Owned by the app, never by the engine; exists
/// only between a run's game over and its resolution (submitted, discarded,
/// or found not to be an improvement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingScore {
    pub value: u32,
    pub created_at: Instant,
}

impl PendingScore {
    pub fn new(value: u32) -> Self {
        Self {
            value,
            created_at: Instant::now(),
        }
    }
}

/// Submission lifecycle attached to the pending score once submission begins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    None,
    AwaitingConfirmation,
    Confirmed { reference: Option<String> },
    Failed { reason: String },
}

/// Identity context. Submission requires both the wallet address and the
/// social username; gameplay requires neither.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub wallet_address: Option<String>,
    pub username: Option<String>,
}

impl Identity {
    /// Stored display name: the social handle, else the shortened address.
    pub fn display_name(&self) -> Option<String> {
        match (&self.username, &self.wallet_address) {
            (Some(u), _) => Some(u.clone()),
            (None, Some(a)) => Some(short_address(a)),
            (None, None) => None,
        }
    }
}

/// `0x1234…abcd` form of an address-like string.
pub fn short_address(addr: &str) -> String {
    let chars: Vec<char> = addr.chars().collect();
    if chars.len() <= 10 {
        return addr.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitCmd {
    /// Attempt to submit the pending score's value.
    Submit { value: u32 },
}

/// Why a submission attempt was refused before reaching the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefuseReason {
    MissingWallet,
    MissingSocial,
    ZeroScore,
    /// One submission is already awaiting confirmation for this identity.
    AlreadyAwaiting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitEvent {
    /// Gate invoked; confirmation pending for an unbounded duration.
    Awaiting,
    /// Score does not beat the stored best: pending score should be dropped,
    /// and no transaction was spent.
    NotAnImprovement { stored: u32 },
    /// Preconditions failed; pending score retained.
    Refused(RefuseReason),
    /// Gate confirmed and the raise-only write was issued.
    Confirmed { reference: Option<String> },
    /// Gate rejected, errored or timed out; pending score retained for a
    /// user-initiated retry.
    Failed { reason: String },
}

/// App-side handle: fire commands, poll events without blocking.
pub struct SubmitHandle {
    commands: mpsc::UnboundedSender<SubmitCmd>,
    events: mpsc::UnboundedReceiver<SubmitEvent>,
}

impl SubmitHandle {
    pub fn submit(&self, value: u32) {
        let _ = self.commands.send(SubmitCmd::Submit { value });
    }

    pub fn try_event(&mut self) -> Option<SubmitEvent> {
        self.events.try_recv().ok()
    }
}

/// Orchestrates PendingScore → TransactionGate → LeaderboardStore.write.
pub struct ScoreSubmissionController {
    gate: Arc<dyn TransactionGate>,
    store: Arc<dyn LeaderboardStore>,
    social: Arc<dyn SocialClient>,
    identity: Identity,
    snapshot: watch::Receiver<Snapshot>,
    events: mpsc::UnboundedSender<SubmitEvent>,
    in_flight: Arc<AtomicBool>,
}

impl ScoreSubmissionController {
    pub fn new(
        gate: Arc<dyn TransactionGate>,
        store: Arc<dyn LeaderboardStore>,
        social: Arc<dyn SocialClient>,
        identity: Identity,
        events: mpsc::UnboundedSender<SubmitEvent>,
    ) -> Self {
        let snapshot = store.subscribe();
        Self {
            gate,
            store,
            social,
            identity,
            snapshot,
            events,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Drive commands until the channel closes. Each accepted submission runs
    /// on its own task, so the command loop is never blocked behind a gate.
    pub async fn run(self, mut commands: mpsc::UnboundedReceiver<SubmitCmd>) {
        while let Some(cmd) = commands.recv().await {
            match cmd {
                SubmitCmd::Submit { value } => self.handle_submit(value),
            }
        }
    }

    fn send(&self, event: SubmitEvent) {
        let _ = self.events.send(event);
    }

    fn handle_submit(&self, value: u32) {
        let Some(address) = self.identity.wallet_address.clone() else {
            self.send(SubmitEvent::Refused(RefuseReason::MissingWallet));
            return;
        };
        let Some(username) = self.identity.username.clone() else {
            self.send(SubmitEvent::Refused(RefuseReason::MissingSocial));
            return;
        };
        if value == 0 {
            self.send(SubmitEvent::Refused(RefuseReason::ZeroScore));
            return;
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.send(SubmitEvent::Refused(RefuseReason::AlreadyAwaiting));
            return;
        }

        // Optimistic local check so no transaction is spent on a score that
        // cannot win. The store's raise-only write stays the authority; the
        // snapshot may lag a concurrent session.
        let stored = self
            .snapshot
            .borrow()
            .iter()
            .find(|e| e.identity == address)
            .map(|e| e.score);
        if let Some(stored) = stored {
            if value <= stored {
                self.in_flight.store(false, Ordering::SeqCst);
                self.send(SubmitEvent::NotAnImprovement { stored });
                return;
            }
        }

        let display_name = self
            .identity
            .display_name()
            .unwrap_or_else(|| short_address(&address));
        self.send(SubmitEvent::Awaiting);
        tracing::info!(value, identity = %address, "submitting score through the gate");

        let gate = Arc::clone(&self.gate);
        let store = Arc::clone(&self.store);
        let social = Arc::clone(&self.social);
        let events = self.events.clone();
        let in_flight = Arc::clone(&self.in_flight);
        tokio::spawn(async move {
            let request = GateRequest {
                value,
                identity: address.clone(),
            };
            let event = match gate.confirm(request).await {
                Ok(outcome) if outcome.status == GateStatus::Confirmed => {
                    match store.write(&address, &display_name, value).await {
                        // A lost write race is not an error: the store kept a
                        // higher score and the subscription will show it.
                        Ok(written) => {
                            tracing::info!(
                                value,
                                ?written,
                                reference = outcome.reference.as_deref().unwrap_or("-"),
                                "submission confirmed"
                            );
                            tokio::spawn(async move {
                                if let Err(e) =
                                    social.compose_cast(&username, &share_text(value)).await
                                {
                                    tracing::warn!(error = %e, "share failed; leaderboard unaffected");
                                }
                            });
                            SubmitEvent::Confirmed {
                                reference: outcome.reference,
                            }
                        }
                        Err(e) => SubmitEvent::Failed {
                            reason: e.to_string(),
                        },
                    }
                }
                Ok(_) => SubmitEvent::Failed {
                    reason: "transaction rejected".to_string(),
                },
                Err(e) => SubmitEvent::Failed {
                    reason: e.to_string(),
                },
            };
            in_flight.store(false, Ordering::SeqCst);
            let _ = events.send(event);
        });
    }
}

/// Spawn a controller on `runtime` and hand the synchronous side its handle.
pub fn spawn_controller(
    runtime: &tokio::runtime::Handle,
    gate: Arc<dyn TransactionGate>,
    store: Arc<dyn LeaderboardStore>,
    social: Arc<dyn SocialClient>,
    identity: Identity,
) -> SubmitHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let controller = ScoreSubmissionController::new(gate, store, social, identity, event_tx);
    runtime.spawn(controller.run(cmd_rx));
    SubmitHandle {
        commands: cmd_tx,
        events: event_rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{GateError, GateOutcome};
    use crate::leaderboard::FileStore;
    use crate::social::{CastLogger, ShareError};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct FakeGate {
        calls: AtomicU32,
        status: GateStatus,
    }

    impl FakeGate {
        fn confirming() -> Self {
            Self {
                calls: AtomicU32::new(0),
                status: GateStatus::Confirmed,
            }
        }

        fn rejecting() -> Self {
            Self {
                calls: AtomicU32::new(0),
                status: GateStatus::Failed,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TransactionGate for FakeGate {
        async fn confirm(&self, _request: GateRequest) -> Result<GateOutcome, GateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GateOutcome {
                status: self.status,
                reference: matches!(self.status, GateStatus::Confirmed)
                    .then(|| "0xfeed".to_string()),
            })
        }
    }

    /// Gate that suspends until released, for in-flight tests.
    struct BlockingGate {
        release: Notify,
    }

    #[async_trait]
    impl TransactionGate for BlockingGate {
        async fn confirm(&self, _request: GateRequest) -> Result<GateOutcome, GateError> {
            self.release.notified().await;
            Ok(GateOutcome {
                status: GateStatus::Confirmed,
                reference: None,
            })
        }
    }

    /// Social client that always errors, to show shares never block anything.
    struct FailingSocial;

    #[async_trait]
    impl SocialClient for FailingSocial {
        async fn compose_cast(&self, _username: &str, _text: &str) -> Result<(), ShareError> {
            Err(ShareError::Transport(
                reqwest::Client::new()
                    .get("http://[invalid")
                    .send()
                    .await
                    .unwrap_err(),
            ))
        }
    }

    fn identity() -> Identity {
        Identity {
            wallet_address: Some("0xabc".to_string()),
            username: Some("alice".to_string()),
        }
    }

    struct Rig {
        handle: SubmitHandle,
        store: Arc<FileStore>,
    }

    fn rig(gate: Arc<dyn TransactionGate>, identity: Identity) -> Rig {
        rig_with_social(gate, identity, Arc::new(CastLogger))
    }

    fn rig_with_social(
        gate: Arc<dyn TransactionGate>,
        identity: Identity,
        social: Arc<dyn SocialClient>,
    ) -> Rig {
        let store = Arc::new(FileStore::in_memory());
        let handle = spawn_controller(
            &tokio::runtime::Handle::current(),
            gate,
            Arc::clone(&store) as Arc<dyn LeaderboardStore>,
            social,
            identity,
        );
        Rig { handle, store }
    }

    async fn next_event(rig: &mut Rig) -> SubmitEvent {
        tokio::time::timeout(Duration::from_secs(5), rig.handle.events.recv())
            .await
            .expect("event before timeout")
            .expect("controller alive")
    }

    #[tokio::test]
    async fn non_improving_score_never_reaches_the_gate() {
        let gate = Arc::new(FakeGate::confirming());
        let mut rig = rig(Arc::clone(&gate) as Arc<dyn TransactionGate>, identity());
        rig.store.write("0xabc", "alice", 50).await.unwrap();

        rig.handle.submit(30);
        assert_eq!(
            next_event(&mut rig).await,
            SubmitEvent::NotAnImprovement { stored: 50 }
        );
        assert_eq!(gate.calls(), 0);
        assert_eq!(rig.store.subscribe().borrow()[0].score, 50);
    }

    #[tokio::test]
    async fn confirmed_submission_raises_and_survives_late_lower_write() {
        let gate = Arc::new(FakeGate::confirming());
        let mut rig = rig(Arc::clone(&gate) as Arc<dyn TransactionGate>, identity());
        rig.store.write("0xabc", "alice", 50).await.unwrap();

        rig.handle.submit(80);
        assert_eq!(next_event(&mut rig).await, SubmitEvent::Awaiting);
        assert_eq!(
            next_event(&mut rig).await,
            SubmitEvent::Confirmed {
                reference: Some("0xfeed".to_string())
            }
        );
        assert_eq!(rig.store.subscribe().borrow()[0].score, 80);

        // Concurrent session's stale lower write lands after: raise-only no-op.
        rig.store.write("0xabc", "alice", 60).await.unwrap();
        assert_eq!(rig.store.subscribe().borrow()[0].score, 80);
        assert_eq!(gate.calls(), 1);
    }

    #[tokio::test]
    async fn gate_rejection_leaves_leaderboard_untouched() {
        let gate = Arc::new(FakeGate::rejecting());
        let mut rig = rig(gate as Arc<dyn TransactionGate>, identity());
        rig.store.write("0xabc", "alice", 50).await.unwrap();

        rig.handle.submit(80);
        assert_eq!(next_event(&mut rig).await, SubmitEvent::Awaiting);
        assert!(matches!(next_event(&mut rig).await, SubmitEvent::Failed { .. }));
        assert_eq!(rig.store.subscribe().borrow()[0].score, 50);

        // Retry is user-initiated and re-enters at the improvement check.
        rig.handle.submit(80);
        assert_eq!(next_event(&mut rig).await, SubmitEvent::Awaiting);
    }

    #[tokio::test]
    async fn only_one_submission_awaits_at_a_time() {
        let gate = Arc::new(BlockingGate {
            release: Notify::new(),
        });
        let mut rig = rig(Arc::clone(&gate) as Arc<dyn TransactionGate>, identity());

        rig.handle.submit(80);
        assert_eq!(next_event(&mut rig).await, SubmitEvent::Awaiting);

        rig.handle.submit(90);
        assert_eq!(
            next_event(&mut rig).await,
            SubmitEvent::Refused(RefuseReason::AlreadyAwaiting)
        );

        gate.release.notify_one();
        assert!(matches!(next_event(&mut rig).await, SubmitEvent::Confirmed { .. }));

        // Slot free again once resolved.
        rig.handle.submit(90);
        assert_eq!(next_event(&mut rig).await, SubmitEvent::Awaiting);
    }

    #[tokio::test]
    async fn missing_identity_refuses_without_gate_call() {
        let gate = Arc::new(FakeGate::confirming());

        let mut no_wallet = rig(
            Arc::clone(&gate) as Arc<dyn TransactionGate>,
            Identity {
                wallet_address: None,
                username: Some("alice".to_string()),
            },
        );
        no_wallet.handle.submit(80);
        assert_eq!(
            next_event(&mut no_wallet).await,
            SubmitEvent::Refused(RefuseReason::MissingWallet)
        );

        let mut no_social = rig(
            Arc::clone(&gate) as Arc<dyn TransactionGate>,
            Identity {
                wallet_address: Some("0xabc".to_string()),
                username: None,
            },
        );
        no_social.handle.submit(80);
        assert_eq!(
            next_event(&mut no_social).await,
            SubmitEvent::Refused(RefuseReason::MissingSocial)
        );

        let mut zero = rig(Arc::clone(&gate) as Arc<dyn TransactionGate>, identity());
        zero.handle.submit(0);
        assert_eq!(
            next_event(&mut zero).await,
            SubmitEvent::Refused(RefuseReason::ZeroScore)
        );

        assert_eq!(gate.calls(), 0);
    }

    #[tokio::test]
    async fn share_failure_never_blocks_the_write() {
        let gate = Arc::new(FakeGate::confirming());
        let mut rig = rig_with_social(
            gate as Arc<dyn TransactionGate>,
            identity(),
            Arc::new(FailingSocial),
        );
        rig.handle.submit(80);
        assert_eq!(next_event(&mut rig).await, SubmitEvent::Awaiting);
        assert!(matches!(next_event(&mut rig).await, SubmitEvent::Confirmed { .. }));
        assert_eq!(rig.store.subscribe().borrow()[0].score, 80);
    }

    #[test]
    fn short_address_truncates() {
        assert_eq!(
            short_address("0x12345678deadbeef"),
            "0x1234…beef".to_string()
        );
        assert_eq!(short_address("0xshort"), "0xshort");
    }
}
