//! Broadcast scene collaborator.
//!
//! Loading-screen rendering and compositor scene switching live outside the
//! core; the pipeline only tells the collaborator what is about to play.
//! Nothing the core depends on comes back.

use async_trait::async_trait;
use tracing::info;

use crate::match_history::MatchDetail;

/// Narrow interface to the loading-screen renderer / compositor control.
#[async_trait]
pub trait ScenePresenter: Send + Sync {
    /// Called before the vote window opens for the next item: the match and
    /// its hero picks, plus a caption for the overlay.
    async fn show_loading(&self, detail: &MatchDetail, caption: &str);

    /// Called once playback has been dispatched.
    async fn show_playback(&self);
}

/// Default presenter: logs the scene changes and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

#[async_trait]
impl ScenePresenter for LogPresenter {
    async fn show_loading(&self, detail: &MatchDetail, caption: &str) {
        info!(
            match_id = detail.match_id,
            heroes = ?detail.hero_ids(),
            caption,
            "Loading scene"
        );
    }

    async fn show_playback(&self) {
        info!("Playback scene");
    }
}
