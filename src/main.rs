use anyhow::{Context, Result};
use clap::Parser;
use nova_voice::speech::{
    CapabilityProvider, ScriptedProvider, ScriptedRecognizer, ScriptedSynthesizer,
    ScriptedUtterance,
};
use nova_voice::{
    Config, KeywordResponder, RecognitionSession, SessionCoordinator, SynthesisSession,
    TracingNotifier, VoiceInfo,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Scripted demo of the voice assistant core
#[derive(Debug, Parser)]
#[command(name = "nova-voice")]
struct Args {
    /// Configuration file (config-crate name, extension optional)
    #[arg(long, default_value = "config/nova-voice")]
    config: String,

    /// JSON file with the scripted conversation
    #[arg(long)]
    script: Option<PathBuf>,

    /// Pretend the host offers no speech capabilities
    #[arg(long)]
    unsupported: bool,
}

/// Scripted conversation for the demo run
#[derive(Debug, Deserialize)]
struct DemoScript {
    utterances: Vec<ScriptedUtterance>,
    #[serde(default = "default_voices")]
    voices: Vec<VoiceInfo>,
}

fn default_voices() -> Vec<VoiceInfo> {
    vec![
        VoiceInfo {
            name: "Demo Standard".to_string(),
            language: "en-US".to_string(),
            default: true,
        },
        VoiceInfo {
            name: "Demo Natural".to_string(),
            language: "en-US".to_string(),
            default: false,
        },
    ]
}

impl Default for DemoScript {
    fn default() -> Self {
        Self {
            utterances: vec![
                ScriptedUtterance::text("hello there"),
                ScriptedUtterance::text("what time is it"),
                ScriptedUtterance::text("tell me a joke"),
                ScriptedUtterance::error("no-speech"),
                ScriptedUtterance::text("goodbye"),
            ],
            voices: default_voices(),
        }
    }
}

impl DemoScript {
    fn load(path: &PathBuf) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        serde_json::from_str(&raw).context("failed to parse script")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let cfg = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("no config at {} ({e:#}), using defaults", args.config);
            Config::default()
        }
    };

    info!("Nova Voice v0.1.0");
    info!("Assistant name: {}", cfg.assistant.name);
    info!("Recognition language: {}", cfg.recognition.language);

    let script = match &args.script {
        Some(path) => DemoScript::load(path)?,
        None => DemoScript::default(),
    };
    let turns = script.utterances.len();

    let provider = if args.unsupported {
        ScriptedProvider::unsupported()
    } else {
        let recognizer = ScriptedRecognizer::scripted(script.utterances);
        let (synthesizer, _log) = ScriptedSynthesizer::auto(script.voices);
        ScriptedProvider::new(Some(Box::new(recognizer)), Some(Box::new(synthesizer)))
    };

    let recognition = RecognitionSession::new(provider.recognizer(), cfg.recognizer_settings());
    let synthesis = SynthesisSession::new(provider.synthesizer(), cfg.synthesis_settings());

    if !recognition.is_supported() {
        // The interactive surface is replaced by a fallback notice
        warn!("This host does not support speech recognition.");
        warn!("Voice interaction is unavailable; nothing to run.");
        return Ok(());
    }

    let coordinator = SessionCoordinator::new(
        recognition,
        synthesis,
        Box::new(KeywordResponder::new(&cfg.assistant.name)),
        Box::new(TracingNotifier),
        cfg.coordinator_settings(),
    );

    let reply_delay = cfg.coordinator_settings().reply_delay;

    for turn in 0..turns {
        info!(turn, "starting voice turn");
        coordinator.toggle().await;
        wait_for_turn(&coordinator, reply_delay).await;
    }

    info!("conversation finished");
    for message in coordinator.messages().await {
        info!(
            "[{}] {}: {}",
            message.timestamp.format("%H:%M:%S"),
            message.role.as_str(),
            message.content
        );
    }

    coordinator.shutdown().await;

    Ok(())
}

/// Wait until the current turn has appended its messages (or give up, for
/// error turns that append nothing)
async fn wait_for_turn(coordinator: &SessionCoordinator, reply_delay: Duration) {
    let before = coordinator.messages().await.len();
    let deadline = tokio::time::Instant::now() + reply_delay + Duration::from_millis(1500);

    loop {
        tokio::time::sleep(Duration::from_millis(25)).await;

        if coordinator.messages().await.len() >= before + 2 {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            return;
        }
    }
}
