pub mod clock;
pub mod config;
pub mod discovery;
pub mod fetcher;
pub mod ledger;
pub mod match_history;
pub mod orchestrator;
pub mod playback;
pub mod presenter;
pub mod queue;
pub mod testing;
pub mod vote;

pub use clock::{Clock, SystemClock};
pub use config::{
    load_config, load_config_from_str, validate_config, ConfigError, HeraldConfig, LedgerConfig,
};
pub use discovery::{DiscoveredMatch, DiscoveryConfig, MatchDiscoverer};
pub use fetcher::{
    FetchError, FetchedReplay, FetcherConfig, HttpReplayStore, ReplayArtifact, ReplayFetcher,
    ReplayStore,
};
pub use ledger::{LedgerError, ProcessedLedger};
pub use match_history::{
    MatchDetail, MatchHistory, MatchHistoryConfig, MatchHistoryError, MatchPlayer, OpenDotaClient,
    PublicMatch,
};
pub use orchestrator::{
    HeraldOrchestrator, OrchestratorConfig, OrchestratorError, OrchestratorStatus,
};
pub use playback::{
    DotaClientLauncher, PlaybackConfig, PlaybackError, PlaybackHandle, PlaybackLauncher,
    PlaybackStatus,
};
pub use presenter::{LogPresenter, ScenePresenter};
pub use queue::{DeferredQueue, QueueError, TickReport};
pub use vote::{
    ChatConnector, ChatTransport, ChatVotePerspective, IrcConnector, PerspectiveSelector,
    RandomPerspective, VoteCollector, VoteConfig, VoteError,
};
