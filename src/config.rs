//! Configuration (spec.md §6.6, SPEC_FULL §A.3).
//!
//! Every recognized setting is an environment variable. We lean on clap's
//! `env` derive feature so the same struct parses `--help`, validates
//! required fields at startup, and documents the surface in one place —
//! the same shape the teacher repo uses for its config (`clap = { features
//! = ["derive", "env"] }`), just env-only instead of flag-first.

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "voice-bridge", about = "Voice-channel to brain-endpoint voice assistant bridge")]
pub struct AppConfig {
    /// Credentials for the voice platform client.
    #[arg(long, env = "VOICE_PLATFORM_TOKEN")]
    pub voice_platform_token: String,

    #[arg(long, env = "SERVER_ID")]
    pub server_id: String,

    #[arg(long, env = "VOICE_CHANNEL_ID")]
    pub voice_channel_id: String,

    #[arg(long, env = "TEXT_CHANNEL_ID")]
    pub text_channel_id: String,

    /// Comma-separated user ids; only these speakers drive utterance capture.
    #[arg(long, env = "ALLOWED_USERS", value_delimiter = ',')]
    pub allowed_users: Vec<String>,

    #[arg(long, env = "BRAIN_URL")]
    pub brain_url: String,

    #[arg(long, env = "BRAIN_TOKEN")]
    pub brain_token: String,

    #[arg(long, env = "BRAIN_MODEL")]
    pub brain_model: String,

    #[arg(long, env = "SESSION_USER")]
    pub session_user: String,

    /// "http" selects [`crate::stt::http::HttpSttProvider`]; any other value
    /// (e.g. "fake") runs the in-process demo provider for local testing.
    #[arg(long, env = "STT_PROVIDER", default_value = "fake")]
    pub stt_provider: String,

    #[arg(long, env = "STT_API_URL", default_value = "")]
    pub stt_api_url: String,

    #[arg(long, env = "STT_API_KEY", default_value = "")]
    pub stt_api_key: String,

    /// "http" selects [`crate::tts::http::HttpTtsProvider`]; any other value
    /// (e.g. "fake") runs the in-process demo provider for local testing.
    #[arg(long, env = "TTS_PROVIDER", default_value = "fake")]
    pub tts_provider: String,

    #[arg(long, env = "TTS_API_URL", default_value = "")]
    pub tts_api_url: String,

    #[arg(long, env = "TTS_API_KEY", default_value = "")]
    pub tts_api_key: String,

    #[arg(long, env = "WAKE_WORD_ENABLED", default_value_t = false)]
    pub wake_word_enabled: bool,

    #[arg(long, env = "WAKE_WORD_PHRASES", value_delimiter = ',', default_value = "")]
    pub wake_word_phrases: Vec<String>,

    #[arg(long, env = "CONVERSATION_WINDOW_MS", default_value_t = 60_000)]
    pub conversation_window_ms: u64,

    #[arg(long, env = "STREAMING_TTS_ENABLED", default_value_t = true)]
    pub streaming_tts_enabled: bool,

    #[arg(long, env = "ALERT_WEBHOOK_PORT", default_value_t = 8787)]
    pub alert_webhook_port: u16,

    #[arg(long, env = "ALERT_WEBHOOK_TOKEN")]
    pub alert_webhook_token: String,

    #[arg(long, env = "BIND_ADDRESS", default_value = "127.0.0.1")]
    pub bind_address: String,

    #[arg(long, env = "HISTORY_CAP", default_value_t = 40)]
    pub history_cap: usize,

    #[arg(long, env = "CONVERSATION_IDLE_TTL_MS", default_value_t = 1_800_000)]
    pub conversation_idle_ttl_ms: u64,

    /// `from=to,from=to` case-insensitive whole-token STT corrections (SPEC_FULL §B).
    #[arg(long, env = "VOCAB_CORRECTIONS", default_value = "")]
    pub vocab_corrections: String,
}

impl AppConfig {
    /// Parse from real CLI args plus `std::env`, matching the teacher's
    /// `Cli::parse()` pattern in `cli.rs`. Supports `--help`/`--version`
    /// like any other clap binary: the returned `clap::Error` already
    /// knows how to print the right thing and exit with the right code,
    /// whether that's help text (exit 0) or a missing-required-value
    /// message (non-zero, per the fatal-startup-failure contract of §6.7).
    pub fn load() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    pub fn vocab_correction_table(&self) -> std::collections::HashMap<String, String> {
        let mut map = std::collections::HashMap::new();
        for pair in self.vocab_corrections.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            if let Some((from, to)) = pair.split_once('=') {
                map.insert(from.trim().to_lowercase(), to.trim().to_string());
            }
        }
        map
    }
}
