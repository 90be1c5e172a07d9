//! Fake playback client.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::playback::{PlaybackError, PlaybackHandle, PlaybackLauncher, PlaybackStatus};

/// One recorded launch.
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub path: PathBuf,
    pub perspective: u32,
    /// Whether the watched path (see [`FakeLauncher::watch`]) existed at
    /// launch time. `None` when no path was being watched.
    pub watched_existed: Option<bool>,
}

/// Launcher that records launches instead of spawning processes. Each
/// launched "process" stays running until [`FakeLauncher::finish`] is called
/// for it.
pub struct FakeLauncher {
    launches: Mutex<Vec<LaunchRecord>>,
    exits: Mutex<Vec<Arc<Mutex<Option<Option<i32>>>>>>,
    watched: Mutex<Option<PathBuf>>,
    fail_next: Mutex<Option<PlaybackError>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            launches: Mutex::new(Vec::new()),
            exits: Mutex::new(Vec::new()),
            watched: Mutex::new(None),
            fail_next: Mutex::new(None),
        }
    }

    /// Every launch so far, in order.
    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.launches.lock().unwrap().clone()
    }

    /// Mark the `index`-th launched process as exited with `code`.
    pub fn finish(&self, index: usize, code: Option<i32>) {
        let exits = self.exits.lock().unwrap();
        *exits[index].lock().unwrap() = Some(code);
    }

    /// Record, on each subsequent launch, whether this path still exists.
    pub fn watch(&self, path: &Path) {
        *self.watched.lock().unwrap() = Some(path.to_path_buf());
    }

    /// Fail the next launch with this error, once.
    pub fn fail_next(&self, error: PlaybackError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackLauncher for FakeLauncher {
    fn launch(
        &self,
        artifact: &Path,
        perspective: u32,
    ) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        if let Some(error) = self.fail_next.lock().unwrap().take() {
            return Err(error);
        }

        let watched_existed = self.watched.lock().unwrap().as_ref().map(|p| p.exists());
        self.launches.lock().unwrap().push(LaunchRecord {
            path: artifact.to_path_buf(),
            perspective,
            watched_existed,
        });

        let exit = Arc::new(Mutex::new(None));
        self.exits.lock().unwrap().push(Arc::clone(&exit));
        Ok(Box::new(FakeHandle { exit }))
    }
}

struct FakeHandle {
    exit: Arc<Mutex<Option<Option<i32>>>>,
}

#[async_trait]
impl PlaybackHandle for FakeHandle {
    fn poll(&mut self) -> PlaybackStatus {
        match *self.exit.lock().unwrap() {
            Some(code) => PlaybackStatus::Exited(code),
            None => PlaybackStatus::Running,
        }
    }

    async fn wait(&mut self) -> PlaybackStatus {
        loop {
            if let Some(code) = *self.exit.lock().unwrap() {
                return PlaybackStatus::Exited(code);
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}
