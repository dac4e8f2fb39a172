//! Application-level configuration loading: category catalog and game policies.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

use crate::state::room::AdvancePolicy;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LETTER_RUSH_CONFIG_PATH";
/// Environment variable selecting the room store backend.
const STORE_BACKEND_ENV: &str = "ROOM_STORE";

const DEFAULT_MAX_POINTS: u8 = 5;
const DEFAULT_BROADCAST_CAPACITY: usize = 64;
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// How the points of a round are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// A single submission finalizes the round.
    #[default]
    SingleJudge,
    /// Every player submits a ballot; the round finalizes on the average.
    PeerAverage,
}

/// Who may broadcast the game start signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Any player of the room.
    #[default]
    AnyPlayer,
    /// Only the room owner.
    OwnerOnly,
}

/// Rules applied to every room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamePolicy {
    /// When players leave a round.
    pub advance: AdvancePolicy,
    /// How round points are collected.
    pub scoring: ScoringPolicy,
    /// Who may start the game.
    pub start: StartPolicy,
    /// Upper bound applied to every awarded score.
    pub max_points: u8,
}

impl Default for GamePolicy {
    fn default() -> Self {
        Self {
            advance: AdvancePolicy::default(),
            scoring: ScoringPolicy::default(),
            start: StartPolicy::default(),
            max_points: DEFAULT_MAX_POINTS,
        }
    }
}

/// Room persistence backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Process-local store; rooms are lost on restart.
    #[default]
    Memory,
    /// MongoDB (`MONGO_URI`, `MONGO_DB`).
    Mongo,
    /// CouchDB (`COUCH_BASE_URL`, `COUCH_DB`, ...).
    Couch,
}

impl StoreBackend {
    /// Read the backend from `ROOM_STORE`, defaulting to memory.
    pub fn from_env() -> Self {
        match env::var(STORE_BACKEND_ENV) {
            Ok(value) => Self::parse(&value).unwrap_or_else(|| {
                warn!(value = %value, "unknown ROOM_STORE value; using in-memory store");
                Self::Memory
            }),
            Err(_) => Self::Memory,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "memory" => Some(Self::Memory),
            "mongo" | "mongodb" => Some(Self::Mongo),
            "couch" | "couchdb" => Some(Self::Couch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    categories: Vec<String>,
    policy: GamePolicy,
    broadcast_capacity: usize,
    store_timeout: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        categories = app_config.categories.len(),
                        policy = ?app_config.policy,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Default configuration with an explicit game policy.
    pub fn with_policy(policy: GamePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Category catalog offered when creating a room.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Game rules.
    pub fn policy(&self) -> GamePolicy {
        self.policy
    }

    /// Per-room broadcast channel capacity.
    pub fn broadcast_capacity(&self) -> usize {
        self.broadcast_capacity
    }

    /// Upper bound for a single store call.
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            policy: GamePolicy::default(),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    categories: Option<Vec<String>>,
    advance_policy: Option<AdvancePolicy>,
    scoring_policy: Option<ScoringPolicy>,
    start_policy: Option<StartPolicy>,
    max_points: Option<u8>,
    broadcast_capacity: Option<usize>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(rename = "store_timeout_ms")]
    store_timeout: Option<Duration>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let categories = value
            .categories
            .filter(|categories| !categories.is_empty())
            .unwrap_or(defaults.categories);
        let policy = GamePolicy {
            advance: value.advance_policy.unwrap_or(defaults.policy.advance),
            scoring: value.scoring_policy.unwrap_or(defaults.policy.scoring),
            start: value.start_policy.unwrap_or(defaults.policy.start),
            max_points: value.max_points.unwrap_or(defaults.policy.max_points),
        };
        Self {
            categories,
            policy,
            broadcast_capacity: value
                .broadcast_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.broadcast_capacity),
            store_timeout: value
                .store_timeout
                .filter(|timeout| !timeout.is_zero())
                .unwrap_or(defaults.store_timeout),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in category catalog shipped with the binary.
fn default_categories() -> Vec<String> {
    [
        "The name of the person",
        "City",
        "Animal",
        "Movie",
        "Celebrity",
        "Actor",
        "Song",
        "Book",
        "Verb",
        "Adjective",
        "Clothing Item",
        "Historical Figure",
        "Literary Work",
        "Body Part",
        "Job Title",
        "Emotion",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
