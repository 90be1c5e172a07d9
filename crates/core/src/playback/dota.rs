//! Real game-client launcher.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use super::{PlaybackConfig, PlaybackError, PlaybackHandle, PlaybackLauncher, PlaybackStatus};

/// Launches the game client in replay-playback mode.
pub struct DotaClientLauncher {
    config: PlaybackConfig,
}

impl DotaClientLauncher {
    pub fn new(config: PlaybackConfig) -> Self {
        Self { config }
    }

    /// Build the fixed argument template for one playback run.
    fn build_args(&self, artifact: &Path, perspective: u32) -> Vec<String> {
        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let demo_path = format!("{}/{}", self.config.replay_mount.trim_end_matches('/'), file_name);

        let mut args = vec![
            "-console".to_string(),
            "-novid".to_string(),
            "+playdemo".to_string(),
            demo_path,
            "+demo_quitafterplayback".to_string(),
            "1".to_string(),
            "+dota_spectator_mode".to_string(),
            self.config.spectator_mode.to_string(),
            "+dota_spectator_hero_index".to_string(),
            perspective.saturating_sub(1).to_string(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args
    }
}

impl PlaybackLauncher for DotaClientLauncher {
    fn launch(
        &self,
        artifact: &Path,
        perspective: u32,
    ) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        if !self.config.client_path.exists() {
            return Err(PlaybackError::ClientNotFound {
                path: self.config.client_path.clone(),
            });
        }

        let args = self.build_args(artifact, perspective);
        debug!(client = %self.config.client_path.display(), ?args, "Spawning playback client");

        let child = Command::new(&self.config.client_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlaybackError::SpawnFailed(e.to_string()))?;

        info!(
            artifact = %artifact.display(),
            perspective,
            pid = child.id(),
            "Playback started"
        );

        Ok(Box::new(ProcessHandle { child }))
    }
}

/// Handle over a spawned client process.
struct ProcessHandle {
    child: Child,
}

#[async_trait]
impl PlaybackHandle for ProcessHandle {
    fn poll(&mut self) -> PlaybackStatus {
        match self.child.try_wait() {
            Ok(Some(status)) => PlaybackStatus::Exited(status.code()),
            Ok(None) => PlaybackStatus::Running,
            // A reaping error means we can no longer observe the process;
            // report it exited so the pipeline is not wedged forever.
            Err(_) => PlaybackStatus::Exited(None),
        }
    }

    async fn wait(&mut self) -> PlaybackStatus {
        match self.child.wait().await {
            Ok(status) => PlaybackStatus::Exited(status.code()),
            Err(_) => PlaybackStatus::Exited(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn launcher() -> DotaClientLauncher {
        DotaClientLauncher::new(PlaybackConfig {
            client_path: PathBuf::from("/opt/dota2/dota2"),
            replay_mount: "replays".to_string(),
            spectator_mode: 3,
            extra_args: vec!["-fullscreen".to_string()],
        })
    }

    #[test]
    fn test_build_args_template() {
        let args = launcher().build_args(Path::new("/data/replays/8123.dem"), 4);
        assert_eq!(
            args,
            vec![
                "-console",
                "-novid",
                "+playdemo",
                "replays/8123.dem",
                "+demo_quitafterplayback",
                "1",
                "+dota_spectator_mode",
                "3",
                "+dota_spectator_hero_index",
                "3",
                "-fullscreen",
            ]
        );
    }

    #[test]
    fn test_launch_missing_client_fails() {
        let result = launcher().launch(Path::new("/data/replays/8123.dem"), 1);
        assert!(matches!(
            result,
            Err(PlaybackError::ClientNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_launch_real_process_and_wait() {
        // Use a real short-lived binary to exercise the handle.
        let launcher = DotaClientLauncher::new(PlaybackConfig {
            client_path: PathBuf::from("/bin/true"),
            replay_mount: "replays".to_string(),
            spectator_mode: 3,
            extra_args: vec![],
        });
        let mut handle = launcher.launch(Path::new("x.dem"), 1).unwrap();
        let status = handle.wait().await;
        assert_eq!(status, PlaybackStatus::Exited(Some(0)));
        assert!(!handle.poll().is_running());
    }
}
