//! Speech playback through a local audio player.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Players probed in order when none is configured.
const PLAYER_CANDIDATES: &[&str] = &["mpg123", "mpv", "ffplay", "afplay"];

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("audio payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("no audio player found (tried {0})")]
    NoPlayer(String),

    #[error("audio player failed: {0}")]
    Player(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Something that can voice a base64-encoded audio payload.
///
/// `play` resolves exactly once, when playback has finished or failed.
/// A sink plays at most one payload at a time; callers serialize.
#[async_trait]
pub trait SpeechSink: Send {
    async fn play(&mut self, audio_b64: &str) -> Result<(), PlaybackError>;
}

/// Plays audio by handing it to an installed command-line player.
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    player: PathBuf,
}

impl LocalPlayer {
    /// Find an installed player from the candidate list.
    pub fn detect() -> Result<Self, PlaybackError> {
        for candidate in PLAYER_CANDIDATES {
            if let Ok(player) = which::which(candidate) {
                debug!(player = %player.display(), "audio player detected");
                return Ok(Self { player });
            }
        }
        Err(PlaybackError::NoPlayer(PLAYER_CANDIDATES.join(", ")))
    }

    /// Use a specific player binary.
    pub fn with_player(player: impl Into<PathBuf>) -> Self {
        Self {
            player: player.into(),
        }
    }

    fn player_args(&self, path: &Path) -> Vec<std::ffi::OsString> {
        let binary = self
            .player
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();

        let mut args: Vec<std::ffi::OsString> = match binary {
            "mpg123" => vec!["-q".into()],
            "mpv" => vec!["--really-quiet".into(), "--no-video".into()],
            "ffplay" => vec![
                "-autoexit".into(),
                "-nodisp".into(),
                "-loglevel".into(),
                "quiet".into(),
            ],
            _ => Vec::new(),
        };
        args.push(path.as_os_str().to_os_string());
        args
    }
}

#[async_trait]
impl SpeechSink for LocalPlayer {
    async fn play(&mut self, audio_b64: &str) -> Result<(), PlaybackError> {
        let bytes = BASE64.decode(audio_b64.trim())?;

        // The temp file is scoped to this call; Drop removes it on every
        // exit path, including errors.
        let file = tempfile::Builder::new().suffix(".mp3").tempfile()?;
        tokio::fs::write(file.path(), &bytes).await?;

        debug!(
            bytes = bytes.len(),
            player = %self.player.display(),
            "starting playback"
        );

        let status = Command::new(&self.player)
            .args(self.player_args(file.path()))
            .status()
            .await?;

        if !status.success() {
            return Err(PlaybackError::Player(format!(
                "{} exited with {status}",
                self.player.display()
            )));
        }

        debug!(bytes = bytes.len(), "playback complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_args_per_binary() {
        let player = LocalPlayer::with_player("/usr/bin/ffplay");
        let args = player.player_args(Path::new("/tmp/clip.mp3"));
        assert_eq!(args.first().unwrap(), "-autoexit");
        assert_eq!(args.last().unwrap(), "/tmp/clip.mp3");

        let player = LocalPlayer::with_player("/usr/bin/mpg123");
        let args = player.player_args(Path::new("/tmp/clip.mp3"));
        assert_eq!(args, vec!["-q", "/tmp/clip.mp3"]);

        // unknown players get only the file path
        let player = LocalPlayer::with_player("/opt/custom-player");
        let args = player.player_args(Path::new("/tmp/clip.mp3"));
        assert_eq!(args, vec!["/tmp/clip.mp3"]);
    }

    #[tokio::test]
    async fn test_play_rejects_invalid_base64() {
        let mut player = LocalPlayer::with_player("/usr/bin/true");
        let result = player.play("not base64 at all!!!").await;
        assert!(matches!(result, Err(PlaybackError::Decode(_))));
    }
}
