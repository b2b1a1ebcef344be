//! Application entry point: terminal voice assistant.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Read the API key from `OPENAI_API_KEY` or prompt for it without echo.
//! 4. Build the transcription, chat and speech gateways from config.
//! 5. Spawn the [`Session`] task and a task printing its reports.
//! 6. Open the default microphone.
//! 7. Read commands from stdin until `q` or EOF.
//!
//! # Commands
//!
//! | input   | action                                  |
//! |---------|-----------------------------------------|
//! | Enter   | start recording / stop and send the clip |
//! | `r`     | reset the conversation                  |
//! | `q`     | quit                                    |

use std::sync::Arc;

use anyhow::Context;
use dialoguer::Password;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use voice_assistant::{
    audio::{AudioClip, CaptureEvent, Recorder, Recording, SpeakerSink},
    config::{AppConfig, TtsProvider},
    conversation::ConversationState,
    credential::Credential,
    llm::{ChatGateway, OpenAiChat},
    pipeline::{Session, SessionEvent, SessionReport, SharedState, TurnPipeline, TurnReport},
    stt::{TranscriptionGateway, WhisperApiTranscriber},
    tts::{GoogleTranslateTts, OpenAiTts, SpeechGateway, SpeechSynthesizer, SynthesisGateway},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Config
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}), using defaults");
        AppConfig::default()
    });
    log::info!(
        "Chat model {} ({}), TTS via {:?}",
        config.chat.model,
        config.chat.model.service_model_id(),
        config.tts.provider
    );

    // 3. Credential
    let credential = read_credential().await?;

    // 4. Gateways
    let scratch_dir = config.audio.scratch_dir.clone();

    let transcriber: Arc<dyn TranscriptionGateway> = Arc::new(WhisperApiTranscriber::from_config(
        &config.stt,
        credential.clone(),
        scratch_dir.clone(),
    ));
    let chat: Arc<dyn ChatGateway> =
        Arc::new(OpenAiChat::from_config(&config.chat, credential.clone()));

    let synthesizer: Arc<dyn SpeechSynthesizer> = match config.tts.provider {
        TtsProvider::GoogleTranslate => Arc::new(GoogleTranslateTts::from_config(&config.tts)),
        TtsProvider::OpenAi => Arc::new(OpenAiTts::from_config(&config.tts, credential)),
    };
    let speech: Arc<dyn SynthesisGateway> = Arc::new(SpeechGateway::new(
        synthesizer,
        Arc::new(SpeakerSink::new()),
        scratch_dir,
    ));

    // 5. Session + report printer
    let pipeline = TurnPipeline::new(
        transcriber,
        chat,
        speech,
        config.chat.model.service_model_id(),
    );
    let session = Session::new(
        ConversationState::new(config.chat.system_prompt.clone()),
        pipeline,
    );
    let view = session.view();

    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(16);
    let (report_tx, mut report_rx) = mpsc::channel::<SessionReport>(16);

    let session_task = tokio::spawn(session.run(event_rx, report_tx));
    let printer_task = tokio::spawn(async move {
        while let Some(report) = report_rx.recv().await {
            print_report(&report, &view);
        }
    });

    // 6. Microphone
    let recorder = Recorder::new(config.audio.max_recording_secs)
        .context("microphone unavailable")?;
    log::info!(
        "Microphone ready ({} Hz, {} ch)",
        recorder.sample_rate(),
        recorder.channels()
    );

    // 7. Command loop
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_help();
    let mut recording: Option<Recording> = None;
    let mut next_id: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "q" | "quit" => break,

            "r" | "reset" => {
                if let Some(active) = recording.take() {
                    println!("(discarded {:.1}s of audio)", active.elapsed_secs());
                }
                event_tx.send(SessionEvent::Reset).await?;
                // The first capture after a reset is discarded; spend that on
                // an empty one so the next real recording counts.
                next_id += 1;
                let empty = AudioClip::empty(recorder.sample_rate());
                event_tx
                    .send(SessionEvent::Capture(CaptureEvent::new(next_id, empty)))
                    .await?;
            }

            "" => match recording.take() {
                None => {
                    recording = Some(recorder.start().context("could not start recording")?);
                    println!("● recording... press Enter to send");
                }
                Some(active) => {
                    let clip = active.finish();
                    println!("■ sent {:.1}s of audio", clip.duration_seconds());
                    next_id += 1;
                    event_tx
                        .send(SessionEvent::Capture(CaptureEvent::new(next_id, clip)))
                        .await?;
                }
            },

            other => {
                println!("unknown command {other:?}");
                print_help();
            }
        }
    }

    // Close the channel so the session drains and stops.
    drop(recording);
    drop(event_tx);
    session_task.await.context("session task failed")?;
    printer_task.await.context("printer task failed")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `OPENAI_API_KEY` if set, otherwise prompt until a valid key is entered.
/// Typed keys are not echoed to the terminal.
async fn read_credential() -> anyhow::Result<Credential> {
    if let Ok(raw) = std::env::var("OPENAI_API_KEY") {
        return Credential::parse(&raw).context("OPENAI_API_KEY is not a usable key");
    }

    loop {
        let raw = tokio::task::spawn_blocking(|| {
            Password::new().with_prompt("OpenAI API key").interact()
        })
        .await
        .context("key prompt task failed")?
        .context("could not read the API key; set OPENAI_API_KEY when not on a terminal")?;

        match Credential::parse(&raw) {
            Ok(credential) => return Ok(credential),
            Err(e) => println!("{e}"),
        }
    }
}

fn print_help() {
    println!("Enter: start/stop recording   r: reset   q: quit");
}

fn print_report(report: &SessionReport, view: &SharedState) {
    match report {
        SessionReport::Reset { accepted: true } => println!("--- new conversation ---"),
        SessionReport::Reset { accepted: false } => println!("(busy, reset ignored)"),
        SessionReport::Turn(TurnReport::Skipped(reason)) => {
            log::debug!("capture skipped: {reason:?}");
        }
        SessionReport::Turn(turn) => {
            let view = view.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            println!();
            for entry in &view.display_log {
                println!("{entry}");
            }
            if let TurnReport::Failed(failure) = turn {
                println!("! {} step failed: {failure}", failure.stage().label());
            }
            println!();
        }
    }
}
