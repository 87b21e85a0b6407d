//! Task Manager (C5, spec.md §4.5). Owns per-speaker conversation history
//! and the active-tasks map; dispatches a background worker that runs
//! C6 (Brain Client) -> C7 (Synthesis Pipeline) -> C8 (Playback Queue) for
//! each admitted transcript, and cancels them on demand.

use crate::brain::BrainClient;
use crate::brain::BrainOutcome;
use crate::gate::ConversationGate;
use crate::handoff::HandoffRouter;
use crate::metrics::Metrics;
use crate::tts::SynthesisPipeline;
use crate::types::{HistoryEntry, Role, SpeakerId, TaskId};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Prerecorded acknowledgment spoken when a task is dispatched while another
/// is already in flight (§4.5 "Ack policy").
const ACK_TEXT: &str = "On it.";

struct Conversation {
    history: VecDeque<HistoryEntry>,
    last_activity: Instant,
}

impl Conversation {
    fn new() -> Self {
        Self { history: VecDeque::new(), last_activity: Instant::now() }
    }

    fn push_evicting(&mut self, entry: HistoryEntry, cap: usize) {
        self.history.push_back(entry);
        while self.history.len() > cap {
            self.history.pop_front();
        }
        self.last_activity = Instant::now();
    }
}

pub struct TaskManagerDeps {
    pub brain: Arc<BrainClient>,
    pub synthesis: Arc<SynthesisPipeline>,
    pub gate: Arc<ConversationGate>,
    pub handoff: Arc<HandoffRouter>,
    pub metrics: Arc<Metrics>,
    pub history_cap: usize,
    pub idle_ttl: Duration,
}

pub struct TaskManager {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<TaskId, CancellationToken>>,
    conversations: Mutex<HashMap<SpeakerId, Conversation>>,
    deps: TaskManagerDeps,
}

impl TaskManager {
    pub fn new(deps: TaskManagerDeps) -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            tasks: Mutex::new(HashMap::new()),
            conversations: Mutex::new(HashMap::new()),
            deps,
        })
    }

    pub fn active_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn history_len(&self, speaker: &SpeakerId) -> usize {
        self.conversations.lock().unwrap().get(speaker).map(|c| c.history.len()).unwrap_or(0)
    }

    /// Drop conversations that have been silent past `idle_ttl` (§3
    /// "pruned after an inactivity threshold").
    pub fn prune_stale(&self) {
        let mut convs = self.conversations.lock().unwrap();
        let ttl = self.deps.idle_ttl;
        convs.retain(|speaker, conv| {
            let stale = conv.last_activity.elapsed() > ttl;
            if stale {
                info!(%speaker, "pruning idle conversation");
            }
            !stale
        });
    }

    /// `dispatch(speakerId, transcript) -> taskId` (§4.5). Appends the user
    /// turn, snapshots history, spawns the C6->C7->C8 worker, and returns
    /// immediately.
    pub fn dispatch(self: &Arc<Self>, speaker: SpeakerId, transcript: String) -> TaskId {
        let ack_needed = self.active_count() > 0;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let snapshot = {
            let mut convs = self.conversations.lock().unwrap();
            let conv = convs.entry(speaker.clone()).or_insert_with(Conversation::new);
            conv.push_evicting(
                HistoryEntry { role: Role::User, content: transcript.clone() },
                self.deps.history_cap,
            );
            conv.history.iter().cloned().collect::<Vec<_>>()
        };

        self.deps.handoff.note_utterance(&speaker, &transcript);

        let cancel = CancellationToken::new();
        self.tasks.lock().unwrap().insert(id, cancel.clone());
        Metrics::incr(&self.deps.metrics.tasks_dispatched);
        info!(task_id = id, %speaker, active = self.active_count(), "task dispatched");

        if ack_needed {
            let synthesis = self.deps.synthesis.clone();
            tokio::spawn(async move {
                synthesis.synthesize_and_enqueue(ACK_TEXT, None).await;
            });
        }

        let this = self.clone();
        tokio::spawn(async move {
            this.run_task(id, speaker, transcript, snapshot, cancel).await;
        });

        id
    }

    async fn run_task(
        self: Arc<Self>,
        id: TaskId,
        speaker: SpeakerId,
        transcript: String,
        history: Vec<HistoryEntry>,
        cancel: CancellationToken,
    ) {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let synthesis = self.deps.synthesis.clone();
        let handoff = self.deps.handoff.clone();
        let metrics = self.deps.metrics.clone();
        let consumer_cancel = cancel.clone();

        let consumer = tokio::spawn(async move {
            while let Some(sentence) = rx.recv().await {
                if consumer_cancel.is_cancelled() {
                    debug!(task_id = id, "task cancelled, discarding unsent sentence");
                    continue;
                }
                if handoff.is_absent() {
                    handoff.divert(id, &sentence).await;
                } else {
                    Metrics::incr(&metrics.sentences_synthesized);
                    synthesis.synthesize_and_enqueue(&sentence, Some(id)).await;
                }
            }
        });

        let outcome = self
            .deps
            .brain
            .stream_reply(&transcript, &history, cancel.clone(), move |sentence| {
                let _ = tx.send(sentence);
            })
            .await;

        let _ = consumer.await;
        self.tasks.lock().unwrap().remove(&id);

        match outcome {
            BrainOutcome::Completed(full_text) => {
                let mut convs = self.conversations.lock().unwrap();
                if let Some(conv) = convs.get_mut(&speaker) {
                    conv.push_evicting(
                        HistoryEntry { role: Role::Assistant, content: full_text },
                        self.deps.history_cap,
                    );
                }
                drop(convs);
                self.deps.gate.mark_assistant_responded(&speaker);
                Metrics::incr(&self.deps.metrics.tasks_completed);
                info!(task_id = id, "task completed");
            }
            BrainOutcome::Aborted => {
                Metrics::incr(&self.deps.metrics.tasks_cancelled);
                info!(task_id = id, "task aborted");
            }
            BrainOutcome::Error(fallback) => {
                self.deps.synthesis.synthesize_and_enqueue(&fallback, Some(id)).await;
                self.deps.gate.mark_assistant_responded(&speaker);
                Metrics::incr(&self.deps.metrics.tasks_errored);
                warn!(task_id = id, "task errored, fallback spoken");
            }
        }
    }

    /// `cancelAll() -> int` (§4.5). Cancels every live task and clears the
    /// playback queue via the caller (the session owns the queue reference).
    pub fn cancel_all(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap();
        let count = tasks.len();
        for (id, token) in tasks.drain() {
            token.cancel();
            info!(task_id = id, "task cancelled");
        }
        count
    }
}
