//! Wires C1-C10 into a single running session (SPEC_FULL §C). Owns the
//! voice-platform connection, the event-dispatch loop, and graceful
//! shutdown.

use crate::alerts::server::{serve as serve_alerts, AlertServerState};
use crate::alerts::AlertInbox;
use crate::audio::{AudioSegmenter, SegmenterConfig};
use crate::brain::BrainClient;
use crate::config::AppConfig;
use crate::gate::ConversationGate;
use crate::handoff::HandoffRouter;
use crate::metrics::Metrics;
use crate::platform::{connect_with_reconnect, PlatformEvent, VoicePlatform};
use crate::playback::PlaybackQueue;
use crate::router::{route, RouteDecision};
use crate::stt::fake::FakeSttProvider;
use crate::stt::http::HttpSttProvider;
use crate::stt::{SttProvider, Transcriber};
use crate::tasks::{TaskManager, TaskManagerDeps};
use crate::tts::fake::FakeTtsProvider;
use crate::tts::http::HttpTtsProvider;
use crate::tts::{SynthesisPipeline, TtsProvider};
use crate::types::SpeakerId;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct Session {
    config: AppConfig,
    platform: Arc<dyn VoicePlatform>,
    playback: Arc<PlaybackQueue>,
    transcriber: Arc<Transcriber>,
    gate: Arc<ConversationGate>,
    task_manager: Arc<TaskManager>,
    handoff: Arc<HandoffRouter>,
    alert_inbox: Arc<AlertInbox>,
    metrics: Arc<Metrics>,
    presence: Arc<AtomicBool>,
    confirmation_tts: Arc<SynthesisPipeline>,
    segmenter_config: SegmenterConfig,
}

fn build_stt_providers(cfg: &AppConfig) -> Vec<Box<dyn SttProvider>> {
    if cfg.stt_provider == "http" && !cfg.stt_api_url.is_empty() {
        vec![Box::new(HttpSttProvider::new(cfg.stt_api_url.clone(), cfg.stt_api_key.clone()))]
    } else {
        warn!("no STT_API_URL configured, running with a non-functional demo STT provider");
        vec![Box::new(FakeSttProvider::failing("unconfigured"))]
    }
}

fn build_tts_providers(cfg: &AppConfig) -> Vec<Box<dyn TtsProvider>> {
    if cfg.tts_provider == "http" && !cfg.tts_api_url.is_empty() {
        vec![Box::new(HttpTtsProvider::new(cfg.tts_api_url.clone(), cfg.tts_api_key.clone()))]
    } else {
        warn!("no TTS_API_URL configured, running with a non-functional demo TTS provider");
        vec![Box::new(FakeTtsProvider::failing("unconfigured"))]
    }
}

impl Session {
    pub fn new(config: AppConfig, platform: Arc<dyn VoicePlatform>) -> Arc<Self> {
        let playback = PlaybackQueue::new(platform.clone());
        let metrics = Arc::new(Metrics::default());
        let handoff = HandoffRouter::new(platform.clone());
        let gate = Arc::new(ConversationGate::new(
            config.wake_word_enabled,
            config.wake_word_phrases.clone(),
            Duration::from_millis(config.conversation_window_ms),
        ));

        let stt_providers = build_stt_providers(&config);
        let transcriber = Arc::new(Transcriber::new(stt_providers, config.vocab_correction_table()));

        let synthesis = Arc::new(SynthesisPipeline::new(build_tts_providers(&config), playback.clone()));
        let confirmation_tts = synthesis.clone();

        let brain = Arc::new(BrainClient::new(
            config.brain_url.clone(),
            config.brain_token.clone(),
            config.brain_model.clone(),
            config.session_user.clone(),
        ));

        let task_manager = TaskManager::new(TaskManagerDeps {
            brain,
            synthesis,
            gate: gate.clone(),
            handoff: handoff.clone(),
            metrics: metrics.clone(),
            history_cap: config.history_cap,
            idle_ttl: Duration::from_millis(config.conversation_idle_ttl_ms),
        });

        let allowed_users: HashSet<SpeakerId> = config.allowed_users.iter().cloned().collect();
        let segmenter_config = SegmenterConfig { allowed_users, ..SegmenterConfig::default() };

        Arc::new(Self {
            config,
            platform,
            playback,
            transcriber,
            gate,
            task_manager,
            handoff,
            alert_inbox: Arc::new(AlertInbox::new()),
            metrics,
            presence: Arc::new(AtomicBool::new(true)),
            confirmation_tts,
            segmenter_config,
        })
    }

    /// Run until the platform event stream ends or a shutdown signal fires.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let alert_state = AlertServerState {
            inbox: self.alert_inbox.clone(),
            metrics: self.metrics.clone(),
            token: self.config.alert_webhook_token.clone(),
            presence: self.presence.clone(),
        };
        let bind_address = self.config.bind_address.clone();
        let port = self.config.alert_webhook_port;
        let alert_server = tokio::spawn(async move {
            if let Err(e) = serve_alerts(&bind_address, port, alert_state).await {
                warn!(error = %e, "alert webhook server exited");
            }
        });

        let mut platform_events = connect_with_reconnect(self.platform.clone()).await;
        let (utterances_tx, mut utterances_rx) = mpsc::channel(64);
        let (segmenter_events_tx, segmenter_events_rx) = mpsc::channel::<PlatformEvent>(256);

        let segmenter = AudioSegmenter::new(self.segmenter_config.clone(), self.playback.clone());
        let segmenter_handle = tokio::spawn(segmenter.run(segmenter_events_rx, utterances_tx));

        let prune_task_manager = self.task_manager.clone();
        let prune_interval = Duration::from_millis(self.config.conversation_idle_ttl_ms).max(Duration::from_secs(60));
        let prune_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(prune_interval);
            loop {
                ticker.tick().await;
                prune_task_manager.prune_stale();
            }
        });

        let this = self.clone();
        let transcribe_handle = tokio::spawn(async move {
            while let Some(utterance) = utterances_rx.recv().await {
                Metrics::incr(&this.metrics.utterances_captured);
                let this2 = this.clone();
                tokio::spawn(async move { this2.handle_utterance(utterance).await });
            }
        });

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown signal received");
                    break;
                }
                event = platform_events.recv() => {
                    match event {
                        Some(event) => self.handle_event(event, &segmenter_events_tx).await,
                        None => {
                            info!("platform event stream closed");
                            break;
                        }
                    }
                }
            }
        }

        self.shutdown().await;
        segmenter_handle.abort();
        transcribe_handle.abort();
        prune_handle.abort();
        alert_server.abort();
        Ok(())
    }

    async fn handle_event(&self, event: PlatformEvent, segmenter_tx: &mpsc::Sender<PlatformEvent>) {
        match &event {
            PlatformEvent::PlaybackIdle => {
                self.playback.on_platform_idle();
                self.maybe_brief_alerts().await;
            }
            PlatformEvent::Presence { user, present } => {
                if self.config.allowed_users.contains(user) {
                    self.presence.store(*present, std::sync::atomic::Ordering::SeqCst);
                    self.handoff.on_presence(*present, self.task_manager.active_count()).await;
                    if *present {
                        self.maybe_brief_alerts().await;
                    }
                }
            }
            _ => {}
        }
        let _ = segmenter_tx.send(event).await;
    }

    async fn maybe_brief_alerts(&self) {
        if self.task_manager.active_count() != 0 || self.alert_inbox.is_empty() {
            return;
        }
        if !self.presence.load(std::sync::atomic::Ordering::SeqCst) {
            return;
        }
        let alerts = self.alert_inbox.drain_for_briefing();
        if alerts.is_empty() {
            return;
        }
        let summary = AlertInbox::summarize(&alerts);
        self.confirmation_tts.synthesize_and_enqueue(&summary, None).await;
        for _ in &alerts {
            Metrics::incr(&self.metrics.alerts_delivered);
        }
        info!(count = alerts.len(), "alert briefing delivered");
    }

    async fn handle_utterance(self: Arc<Self>, utterance: crate::types::Utterance) {
        let Some(transcript) = self.transcriber.transcribe(&utterance).await else {
            return;
        };

        let decision = self.gate.evaluate(&transcript.speaker, &transcript.text, Instant::now());
        if !decision.admit {
            return;
        }

        match route(&decision.cleaned) {
            RouteDecision::Stop => {
                let cancelled = self.task_manager.cancel_all();
                self.playback.clear();
                info!(cancelled, "stop command handled");
                self.confirmation_tts.synthesize_and_enqueue("Stopped.", None).await;
            }
            RouteDecision::WakeOnly => {
                self.gate.mark_assistant_responded(&transcript.speaker);
                self.confirmation_tts.synthesize_and_enqueue("Mm-hm?", None).await;
            }
            RouteDecision::Dispatch => {
                self.task_manager.dispatch(transcript.speaker, decision.cleaned);
            }
        }
    }

    /// Graceful shutdown (SPEC_FULL §B): cancel all tasks, clear playback.
    pub async fn shutdown(&self) {
        let cancelled = self.task_manager.cancel_all();
        self.playback.clear();
        info!(cancelled, "session shutdown complete");
    }
}
