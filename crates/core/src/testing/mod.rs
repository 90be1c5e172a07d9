//! Testing utilities and mock implementations.
//!
//! Mock implementations of the external seams (match-history service,
//! replay blob store, chat service, playback client, wall clock), allowing
//! full pipeline tests without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use heraldtv_core::testing::{MockClock, MockMatchHistory, MockReplayStore};
//!
//! let api = MockMatchHistory::new();
//! api.push_page(vec![/* candidates */]).await;
//! api.set_next_error(MatchHistoryError::RateLimited).await;
//! ```

mod fake_playback;
mod mock_chat;
mod mock_clock;
mod mock_match_history;
mod mock_presenter;
mod mock_replay_store;

pub use fake_playback::{FakeLauncher, LaunchRecord};
pub use mock_chat::{ChatScript, MockChatConnector};
pub use mock_clock::MockClock;
pub use mock_match_history::MockMatchHistory;
pub use mock_presenter::{FixedPerspective, MockPresenter};
pub use mock_replay_store::MockReplayStore;
