//! A terminal diary: talk to the assistant, save notes, replay its voice.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use diary::core::{
    AgentClient, Reply, ReplyKind, SessionBuilder, SessionController,
    UserInput,
};
use diary::{GoogleTts, Settings, Storage};
use diary_drive_store::DriveStore;
use diary_gemini_model::GeminiProvider;
use diary_model::AudioPayload;
use diary_store::{LocalDirStore, ObjectStore};
use indicatif::{ProgressBar, ProgressStyle};
use mime::Mime;
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

enum SessionEvent {
    Idle,
    Reply(Reply),
    Error(String),
    Audio(Bytes),
}

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    debug!("settings: {settings:?}");

    let store: Arc<dyn ObjectStore> = match settings.storage() {
        Storage::Drive { .. } => {
            let Some(config) = settings.drive_config() else {
                return;
            };
            Arc::new(DriveStore::new(config))
        }
        Storage::LocalDir(dir) => {
            if let Err(err) = tokio::fs::create_dir_all(dir).await {
                eprintln!("cannot create {}: {err}", dir.display());
                return;
            }
            Arc::new(LocalDirStore::new(dir))
        }
    };
    let agent = AgentClient::new(GeminiProvider::new(settings.gemini_config()));
    let config = settings.session_config(include_str!("./system_prompt.md"));

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(progress_style.clone());
    progress_bar.set_message("📂 Checking the archive...");
    progress_bar.enable_steady_tick(Duration::from_millis(100));
    let controller = SessionController::start(agent, store, config).await;
    progress_bar.finish_and_clear();
    let controller = match controller {
        Ok(controller) => controller,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let turns = controller.context().conversation().len();
    println!(
        "{}📝 Connected to the archive, {turns} earlier turn(s) loaded.",
        BAR_CHAR.bright_green()
    );

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let mut session_builder = SessionBuilder::with_controller(controller)
        .on_idle({
            let event_tx = event_tx.clone();
            move || {
                event_tx.send(SessionEvent::Idle).ok();
            }
        })
        .on_reply({
            let event_tx = event_tx.clone();
            move |reply: &Reply| {
                event_tx.send(SessionEvent::Reply(reply.clone())).ok();
            }
        })
        .on_error({
            let event_tx = event_tx.clone();
            move |err: &diary::core::Error| {
                event_tx.send(SessionEvent::Error(err.to_string())).ok();
            }
        });
    let tts_dir = settings.tts_dir().cloned();
    if tts_dir.is_some() {
        session_builder = session_builder
            .with_speech(GoogleTts::new(), settings.tts_language())
            .on_audio({
                let event_tx = event_tx.clone();
                move |audio: Bytes| {
                    event_tx.send(SessionEvent::Audio(audio)).ok();
                }
            });
    }
    let session = session_builder.build();
    drop(event_tx);

    let mut clip_count = 0;

    'outer: loop {
        print!("> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        let input = match line.strip_prefix("/audio ") {
            Some(path) => match read_audio(Path::new(path.trim())).await {
                Ok(audio) => UserInput::Audio(audio),
                Err(err) => {
                    eprintln!("{err}");
                    continue;
                }
            },
            None => UserInput::Text(line.to_owned()),
        };
        if session.send_input(input).is_err() {
            break;
        }

        let mut progress_bar = None;

        loop {
            // Create a new progress bar if it has been finished.
            progress_bar
                .get_or_insert_with(|| {
                    let progress_bar = ProgressBar::new_spinner();
                    progress_bar.set_style(progress_style.clone());
                    progress_bar.set_message("🤔 Thinking...");
                    progress_bar
                })
                .inc(1);

            let sleep = sleep(Duration::from_millis(100));
            let event = select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        break 'outer;
                    };
                    event
                },
                _ = sleep => {
                    continue;
                }
            };

            // Finish the progress bar before printing anything else.
            if let Some(progress_bar) = &progress_bar {
                progress_bar.finish_and_clear();
            }
            progress_bar = None;

            match event {
                SessionEvent::Reply(reply) => print_reply(&reply),
                SessionEvent::Error(err) => {
                    println!("{}❌ {}", BAR_CHAR.bright_red(), err.red());
                }
                SessionEvent::Audio(audio) => {
                    let Some(dir) = &tts_dir else {
                        continue;
                    };
                    clip_count += 1;
                    match save_clip(dir, clip_count, audio).await {
                        Ok(path) => println!(
                            "{}🔊 {}",
                            BAR_CHAR.bright_blue(),
                            path.display().dimmed()
                        ),
                        Err(err) => {
                            warn!("cannot save the voiced reply: {err}");
                        }
                    }
                }
                SessionEvent::Idle => {
                    break;
                }
            }
        }
    }

    if session.close().await.is_err() {
        error!("the session ended unexpectedly");
    }
}

fn print_reply(reply: &Reply) {
    match reply.kind {
        ReplyKind::Assistant => {
            println!(
                "{}🤖 {}",
                BAR_CHAR.bright_cyan(),
                reply.text.bright_white()
            );
        }
        ReplyKind::NoteSaved => {
            println!("{}📝 {}", BAR_CHAR.bright_green(), reply.text.green());
        }
        ReplyKind::EmptyArchive => {
            println!("{}📭 {}", BAR_CHAR.bright_yellow(), reply.text.yellow());
        }
    }
    if let Some(err) = &reply.save_error {
        println!(
            "{}⚠️  The conversation was not saved: {}",
            BAR_CHAR.bright_yellow(),
            err.yellow()
        );
    }
}

async fn read_audio(path: &Path) -> Result<AudioPayload, String> {
    let mime_type: Mime = match path.extension().and_then(|ext| ext.to_str()) {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mp3",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => return Err(format!("unsupported clip: {}", path.display())),
    }
    .parse()
    .map_err(|err| format!("invalid mime type: {err}"))?;
    let data = tokio::fs::read(path)
        .await
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    Ok(AudioPayload::new(mime_type, data))
}

async fn save_clip(
    dir: &Path,
    idx: usize,
    audio: Bytes,
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("reply-{idx:03}.mp3"));
    tokio::fs::write(&path, audio).await?;
    Ok(path)
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
