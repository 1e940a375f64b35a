//! Cadence Player (cadence-player) - Demo entry point
//!
//! Runs the playback controller against a simulated render engine, prints
//! every playback notification as a JSON line on stdout and reads text
//! commands (`play 2`, `pause`, `next`, `seek 30000`, `mode`, `quit`) from
//! stdin.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cadence_common::config::TomlConfig;
use cadence_common::events::NotificationRecord;
use cadence_common::{ConnectionSnapshot, PlayMode, PlaybackNotification, Track};
use cadence_player::{
    Command, ConnectionObserver, ControllerService, NoopArbiter, PlaybackController,
    PlaybackObserver, SimulatedEngine,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Simulated prepare time for every track
const PREPARE_DELAY: Duration = Duration::from_millis(200);

/// Command-line arguments for cadence-player
#[derive(Parser, Debug)]
#[command(name = "cadence-player")]
#[command(about = "Playback controller demo with a simulated render engine")]
#[command(version)]
struct Args {
    /// Configuration file (overrides CADENCE_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial play mode (repeat-single, repeat-all, sequential, shuffle)
    #[arg(short, long)]
    mode: Option<PlayMode>,

    /// Simulated length of every track in milliseconds
    #[arg(long, default_value = "5000")]
    track_ms: u64,

    /// Fail tracks whose locator is not an existing file
    #[arg(long)]
    check_files: bool,

    /// Track locators, in playlist order
    #[arg(required = true)]
    tracks: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::resolve(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing (RUST_LOG wins over the configured level)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "cadence_player={level},cadence_common={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut settings = config.player.clone();
    if let Some(mode) = args.mode {
        settings.default_mode = mode;
    }
    info!(
        "Starting Cadence player: {} tracks, mode {}, {} ms per track",
        args.tracks.len(),
        settings.default_mode,
        args.track_ms
    );

    let engine = SimulatedEngine::new(PREPARE_DELAY, args.track_ms).with_file_check(args.check_files);
    let controller = PlaybackController::new(Box::new(engine), Box::new(NoopArbiter), settings);
    let service = ControllerService::spawn(controller);
    let handle = service.handle();

    handle
        .register_state_observer(Arc::new(JsonLineObserver))
        .await
        .context("Failed to register notification printer")?;
    handle
        .register_connection_observer(Arc::new(LogConnectionObserver))
        .await
        .context("Failed to connect display")?;

    let playlist = args.tracks.iter().map(|locator| track_for(locator)).collect();
    handle
        .set_playlist(playlist)
        .await
        .context("Failed to set playlist")?;
    handle.play(None).await.context("Failed to start playback")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("End of input");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("quit") {
                    break;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if let Err(e) = handle.send(command).await {
                            warn!("{}", e);
                        }
                    }
                    Err(e) => warn!("{}", e),
                }
            }
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    service.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Track titled after the locator's file stem
fn track_for(locator: &str) -> Track {
    let title = Path::new(locator)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| locator.to_string());
    Track::new(title, locator)
}

/// Prints each notification as one JSON object per line
struct JsonLineObserver;

impl JsonLineObserver {
    fn print(&self, notification: PlaybackNotification) {
        match serde_json::to_string(&NotificationRecord::now(notification)) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("Failed to serialize notification: {}", e),
        }
    }
}

impl PlaybackObserver for JsonLineObserver {
    fn on_played(&self) {
        self.print(PlaybackNotification::Played);
    }

    fn on_paused(&self) {
        self.print(PlaybackNotification::Paused);
    }

    fn on_stopped(&self) {
        self.print(PlaybackNotification::Stopped);
    }

    fn on_new_song(&self, track: &Track) {
        self.print(PlaybackNotification::NewSong { track: track.clone() });
    }

    fn on_mode_changed(&self, mode: PlayMode) {
        self.print(PlaybackNotification::ModeChanged { mode });
    }

    fn on_progress(&self, position_ms: u64) {
        self.print(PlaybackNotification::Progress { position_ms });
    }

    fn on_error(&self, message: &str) {
        self.print(PlaybackNotification::Error {
            message: message.to_string(),
        });
    }
}

struct LogConnectionObserver;

impl ConnectionObserver for LogConnectionObserver {
    fn on_connected(&self, snapshot: &ConnectionSnapshot) {
        info!(
            "Display connected: {} (mode {}, {} ms)",
            snapshot.state, snapshot.mode, snapshot.position_ms
        );
    }

    fn on_disconnected(&self) {
        info!("Display disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_title_from_file_stem() {
        let track = track_for("/music/Artist - Song.flac");
        assert_eq!(track.title, "Artist - Song");
        assert_eq!(track.locator, "/music/Artist - Song.flac");
    }

    #[test]
    fn test_args_parse_mode_and_tracks() {
        let args = Args::parse_from(["cadence-player", "--mode", "shuffle", "--track-ms", "900", "a.mp3", "b.mp3"]);
        assert_eq!(args.mode, Some(PlayMode::Shuffle));
        assert_eq!(args.track_ms, 900);
        assert_eq!(args.tracks, vec!["a.mp3".to_string(), "b.mp3".to_string()]);
    }
}
