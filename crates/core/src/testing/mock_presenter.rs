//! Mock scene presenter and fixed perspective selector.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::match_history::MatchDetail;
use crate::presenter::ScenePresenter;
use crate::vote::PerspectiveSelector;

/// Presenter that records scene changes instead of performing them.
pub struct MockPresenter {
    loading: Mutex<Vec<(u64, String)>>,
    playback_count: AtomicUsize,
}

impl MockPresenter {
    pub fn new() -> Self {
        Self {
            loading: Mutex::new(Vec::new()),
            playback_count: AtomicUsize::new(0),
        }
    }

    /// Every loading scene shown, as (match id, caption).
    pub fn loading_captions(&self) -> Vec<(u64, String)> {
        self.loading.lock().unwrap().clone()
    }

    /// How many times the playback scene was shown.
    pub fn playback_count(&self) -> usize {
        self.playback_count.load(Ordering::SeqCst)
    }
}

impl Default for MockPresenter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScenePresenter for MockPresenter {
    async fn show_loading(&self, detail: &MatchDetail, caption: &str) {
        self.loading
            .lock()
            .unwrap()
            .push((detail.match_id, caption.to_string()));
    }

    async fn show_playback(&self) {
        self.playback_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Selector that always picks the same perspective.
pub struct FixedPerspective {
    perspective: u32,
}

impl FixedPerspective {
    pub fn new(perspective: u32) -> Self {
        Self { perspective }
    }
}

#[async_trait]
impl PerspectiveSelector for FixedPerspective {
    async fn select(&self, _detail: &MatchDetail) -> u32 {
        self.perspective
    }
}
