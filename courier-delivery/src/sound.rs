use async_trait::async_trait;
use courier_core::config::SoundConfig;
use courier_core::types::SoundCategory;
use courier_core::{CourierError, CourierResult};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tracing;

#[async_trait]
pub trait SoundPlayer: Send + Sync {
    async fn play(&self, category: SoundCategory) -> CourierResult<()>;
}

/// Plays nothing. Used when no player command is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct MutedPlayer;

#[async_trait]
impl SoundPlayer for MutedPlayer {
    async fn play(&self, category: SoundCategory) -> CourierResult<()> {
        tracing::debug!("Sound muted, skipping {:?}", category);
        Ok(())
    }
}

/// Runs an external player (`aplay`, `afplay`, `ffplay -nodisp -autoexit`)
/// on the category's asset file.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    asset_dir: PathBuf,
}

impl CommandPlayer {
    pub fn new(command: &str, asset_dir: impl Into<PathBuf>) -> CourierResult<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| CourierError::Config("sound player command is empty".to_string()))?;

        Ok(Self {
            program,
            args: parts.collect(),
            asset_dir: asset_dir.into(),
        })
    }

    pub fn asset_path(&self, category: SoundCategory) -> PathBuf {
        self.asset_dir.join(category.asset_name())
    }
}

#[async_trait]
impl SoundPlayer for CommandPlayer {
    async fn play(&self, category: SoundCategory) -> CourierResult<()> {
        let path = self.asset_path(category);
        if !path.exists() {
            return Err(CourierError::Audio(format!("missing sound asset {}", path.display())));
        }

        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| CourierError::Audio(format!("failed to run {}: {}", self.program, e)))?;

        if !status.success() {
            return Err(CourierError::Audio(format!(
                "{} exited with {} playing {}",
                self.program,
                status,
                path.display()
            )));
        }

        Ok(())
    }
}

pub fn player_from_config(config: &SoundConfig) -> Arc<dyn SoundPlayer> {
    match config.player.as_deref() {
        Some(command) => match CommandPlayer::new(command, &config.asset_dir) {
            Ok(player) => {
                tracing::info!("Sound playback via {} from {}", command, config.asset_dir.display());
                Arc::new(player)
            }
            Err(e) => {
                tracing::warn!("Sound playback disabled: {}", e);
                Arc::new(MutedPlayer)
            }
        },
        None => {
            tracing::info!("Sound playback disabled (SOUND_PLAYER not set)");
            Arc::new(MutedPlayer)
        }
    }
}

/// Play once; a blocked or failed playback is logged and otherwise ignored.
pub async fn play_best_effort(player: &dyn SoundPlayer, category: SoundCategory) {
    if let Err(e) = player.play(category).await {
        tracing::warn!("Could not play {:?} sound: {}", category, e);
    }
}

/// Fire-and-forget variant of [`play_best_effort`] for event loops that must
/// not wait on playback.
pub fn spawn_play(player: Arc<dyn SoundPlayer>, category: SoundCategory) {
    tokio::spawn(async move {
        play_best_effort(player.as_ref(), category).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_split_into_program_and_args() {
        let player = CommandPlayer::new("ffplay -nodisp -autoexit", "/srv/sounds").unwrap();
        assert_eq!(player.program, "ffplay");
        assert_eq!(player.args, vec!["-nodisp", "-autoexit"]);
        assert_eq!(
            player.asset_path(SoundCategory::Message),
            PathBuf::from("/srv/sounds/message.mp3")
        );
    }

    #[test]
    fn blank_command_is_rejected() {
        assert!(matches!(CommandPlayer::new("   ", "."), Err(CourierError::Config(_))));
    }

    #[tokio::test]
    async fn missing_asset_is_an_audio_error() {
        let player = CommandPlayer::new("true", "/nonexistent/courier-sounds").unwrap();
        let err = player.play(SoundCategory::Notification).await.unwrap_err();
        assert!(matches!(err, CourierError::Audio(_)));
        // best-effort wrapper swallows it
        play_best_effort(&player, SoundCategory::Notification).await;
    }

    #[tokio::test]
    async fn unset_player_is_muted() {
        let config = SoundConfig {
            asset_dir: PathBuf::from("/nonexistent/courier-sounds"),
            player: None,
        };
        let player = player_from_config(&config);
        assert!(player.play(SoundCategory::Appointment).await.is_ok());
    }

    #[tokio::test]
    async fn blank_configured_player_falls_back_to_muted() {
        let config = SoundConfig {
            asset_dir: PathBuf::from("/nonexistent/courier-sounds"),
            player: Some("  ".to_string()),
        };
        let player = player_from_config(&config);
        assert!(player.play(SoundCategory::Message).await.is_ok());
    }
}
