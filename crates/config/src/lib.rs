//! Configuration loading, validation, and management for Embody.
//!
//! Loads configuration from `~/.embody/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.

use embody_core::world::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.embody/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyConfig {
    /// Environment connection settings
    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Head link endpoints and queue sizes
    #[serde(default)]
    pub transport: TransportConfig,

    /// Percept sampling
    #[serde(default)]
    pub perception: PerceptionConfig,

    /// Behavior tuning
    #[serde(default)]
    pub behaviors: BehaviorConfig,

    /// Seed world for the built-in simulated environment
    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "default_env_host")]
    pub host: String,

    #[serde(default = "default_env_port")]
    pub port: u16,

    /// The agent's player name
    #[serde(default = "default_username")]
    pub username: String,

    /// Authentication mode ("offline", "microsoft"...)
    #[serde(default = "default_auth")]
    pub auth: String,

    /// Optional password/token for authenticated servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Said in chat once the agent spawns. Empty = stay silent.
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_env_host() -> String {
    "localhost".into()
}
fn default_env_port() -> u16 {
    25565
}
fn default_username() -> String {
    "Prometheus".into()
}
fn default_auth() -> String {
    "offline".into()
}
fn default_greeting() -> String {
    "I am awake.".into()
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            host: default_env_host(),
            port: default_env_port(),
            username: default_username(),
            auth: default_auth(),
            password: None,
            greeting: default_greeting(),
        }
    }
}

impl std::fmt::Debug for EnvironmentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("auth", &self.auth)
            .field(
                "password",
                &match self.password {
                    Some(_) => "[REDACTED]",
                    None => "None",
                },
            )
            .field("greeting", &self.greeting)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Where percepts are broadcast (host:port)
    #[serde(default = "default_publish_endpoint")]
    pub publish_endpoint: String,

    /// Where commands are pulled from (host:port)
    #[serde(default = "default_command_endpoint")]
    pub command_endpoint: String,

    /// Frames buffered per subscriber before the oldest are dropped
    #[serde(default = "default_publish_capacity")]
    pub publish_capacity: usize,

    /// Commands buffered between the socket readers and the receiver loop
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,

    /// Longest accepted command line; longer lines are discarded
    #[serde(default = "default_max_command_bytes")]
    pub max_command_bytes: usize,
}

fn default_publish_endpoint() -> String {
    "127.0.0.1:5555".into()
}
fn default_command_endpoint() -> String {
    "127.0.0.1:5556".into()
}
fn default_publish_capacity() -> usize {
    64
}
fn default_command_capacity() -> usize {
    256
}
fn default_max_command_bytes() -> usize {
    64 * 1024
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            publish_endpoint: default_publish_endpoint(),
            command_endpoint: default_command_endpoint(),
            publish_capacity: default_publish_capacity(),
            command_capacity: default_command_capacity(),
            max_command_bytes: default_max_command_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceptionConfig {
    /// Sampling period
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Entities farther than this are left out of percepts
    #[serde(default = "default_radius")]
    pub radius: f64,

    /// Cap on `nearby_entities`
    #[serde(default = "default_max_entities")]
    pub max_entities: usize,
}

fn default_tick_ms() -> u64 {
    100
}
fn default_radius() -> f64 {
    32.0
}
fn default_max_entities() -> usize {
    10
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            radius: default_radius(),
            max_entities: default_max_entities(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// How far past the agent the flee target is projected
    #[serde(default = "default_flee_distance")]
    pub flee_distance: f64,

    #[serde(default = "default_flee_duration_ms")]
    pub flee_duration_ms: u64,

    #[serde(default = "default_explore_min")]
    pub explore_min_distance: f64,

    #[serde(default = "default_explore_max")]
    pub explore_max_distance: f64,

    #[serde(default = "default_explore_duration_ms")]
    pub explore_duration_ms: u64,

    /// Added to the target's y so the agent looks ahead, not at its feet
    #[serde(default = "default_eye_height")]
    pub eye_height: f64,

    /// An item is food if its name contains any of these
    #[serde(default = "default_food_keywords")]
    pub food_keywords: Vec<String>,
}

fn default_flee_distance() -> f64 {
    10.0
}
fn default_flee_duration_ms() -> u64 {
    2000
}
fn default_explore_min() -> f64 {
    10.0
}
fn default_explore_max() -> f64 {
    30.0
}
fn default_explore_duration_ms() -> u64 {
    3000
}
fn default_eye_height() -> f64 {
    1.6
}
fn default_food_keywords() -> Vec<String> {
    ["bread", "cooked", "apple", "steak", "carrot", "potato"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            flee_distance: default_flee_distance(),
            flee_duration_ms: default_flee_duration_ms(),
            explore_min_distance: default_explore_min(),
            explore_max_distance: default_explore_max(),
            explore_duration_ms: default_explore_duration_ms(),
            eye_height: default_eye_height(),
            food_keywords: default_food_keywords(),
        }
    }
}

/// Seed world for the simulated environment used by `embody run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_true")]
    pub spawn: bool,

    #[serde(default = "default_spawn_position")]
    pub spawn_position: Vec3,

    #[serde(default = "default_health")]
    pub health: f32,

    #[serde(default = "default_food")]
    pub food: f32,

    /// Physics step applied between percepts
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,

    #[serde(default)]
    pub entities: Vec<SimEntityConfig>,

    #[serde(default)]
    pub inventory: Vec<SimItemConfig>,
}

fn default_spawn_position() -> Vec3 {
    Vec3::new(0.0, 64.0, 0.0)
}
fn default_health() -> f32 {
    20.0
}
fn default_food() -> f32 {
    20.0
}
fn default_step_ms() -> u64 {
    50
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            spawn: true,
            spawn_position: default_spawn_position(),
            health: default_health(),
            food: default_food(),
            step_ms: default_step_ms(),
            entities: vec![],
            inventory: vec![],
        }
    }
}

/// An entity placed in the simulated world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEntityConfig {
    /// Mob type name, e.g. "zombie"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Player name, for other players
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    pub position: Vec3,
}

/// An inventory stack in the simulated world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimItemConfig {
    pub name: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

impl BodyConfig {
    /// Load configuration from `EMBODY_CONFIG` or the default path
    /// (`~/.embody/config.toml`), then apply environment overrides:
    /// - `EMBODY_PUBLISH_ENDPOINT`
    /// - `EMBODY_COMMAND_ENDPOINT`
    /// - `EMBODY_TICK_MS`
    /// - `EMBODY_USERNAME`
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("EMBODY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        Self::load_with_env(&path)
    }

    /// Load from a specific path, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(endpoint) = lookup("EMBODY_PUBLISH_ENDPOINT") {
            self.transport.publish_endpoint = endpoint;
        }
        if let Some(endpoint) = lookup("EMBODY_COMMAND_ENDPOINT") {
            self.transport.command_endpoint = endpoint;
        }
        if let Some(tick) = lookup("EMBODY_TICK_MS") {
            self.perception.tick_ms = tick.parse().map_err(|_| {
                ConfigError::ValidationError(format!("EMBODY_TICK_MS is not a number: {tick}"))
            })?;
        }
        if let Some(username) = lookup("EMBODY_USERNAME") {
            self.environment.username = username;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".embody")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.perception.tick_ms == 0 {
            return Err(ConfigError::ValidationError(
                "perception.tick_ms must be > 0".into(),
            ));
        }

        if self.perception.radius <= 0.0 {
            return Err(ConfigError::ValidationError(
                "perception.radius must be > 0".into(),
            ));
        }

        if self.perception.max_entities == 0 {
            return Err(ConfigError::ValidationError(
                "perception.max_entities must be > 0".into(),
            ));
        }

        if self.behaviors.explore_min_distance >= self.behaviors.explore_max_distance {
            return Err(ConfigError::ValidationError(
                "behaviors.explore_min_distance must be < explore_max_distance".into(),
            ));
        }

        if self.behaviors.food_keywords.is_empty() {
            return Err(ConfigError::ValidationError(
                "behaviors.food_keywords must not be empty".into(),
            ));
        }

        if self.transport.publish_endpoint == self.transport.command_endpoint {
            return Err(ConfigError::ValidationError(
                "transport.publish_endpoint and command_endpoint must differ".into(),
            ));
        }

        if self.transport.publish_capacity == 0 || self.transport.command_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "transport queue capacities must be > 0".into(),
            ));
        }

        if self.transport.max_command_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "transport.max_command_bytes must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Render the effective config as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        Self::default().to_toml()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
