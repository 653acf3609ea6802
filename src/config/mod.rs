//! Configuration module
//!
//! Handles loading and saving swarmcast configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analyzer::{Mode, PortMap};
use crate::network::{parse_ip, TransportConfig, MAX_DATAGRAM_SIZE};
use crate::protocol::{GRAPH_PORT, MAX_EDGES, MAX_GRAPH_PACKET_SIZE, POSITION_PORT};
use crate::simulation::Pacing;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Swarm simulation settings
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Network settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Analyzer settings
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Human-readable name for this instance
    pub name: String,
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            verbose: false,
        }
    }
}

/// Swarm simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of simulated nodes (ids 1..=node_count)
    #[serde(default = "default_node_count")]
    pub node_count: u16,
    /// Seed for reproducible runs (random if not set)
    pub seed: Option<u64>,
    /// Chance that a node moves on a given tick
    #[serde(default = "default_move_probability")]
    pub move_probability: f64,
    /// Largest per-axis step a moving node takes
    #[serde(default = "default_max_step")]
    pub max_step: f32,
    /// Fewest edges in a generated graph
    #[serde(default = "default_min_edges")]
    pub min_edges: usize,
    /// Most edges in a generated graph
    #[serde(default = "default_max_edges")]
    pub max_edges: usize,
    #[serde(default = "default_min_strength")]
    pub min_strength: u16,
    #[serde(default = "default_max_strength")]
    pub max_strength: u16,
}

fn default_node_count() -> u16 {
    20
}

fn default_move_probability() -> f64 {
    0.5
}

fn default_max_step() -> f32 {
    5.0
}

fn default_min_edges() -> usize {
    6
}

fn default_max_edges() -> usize {
    35
}

fn default_min_strength() -> u16 {
    1
}

fn default_max_strength() -> u16 {
    1000
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            node_count: default_node_count(),
            seed: None,
            move_probability: default_move_probability(),
            max_step: default_max_step(),
            min_edges: default_min_edges(),
            max_edges: default_max_edges(),
            min_strength: default_min_strength(),
            max_strength: default_max_strength(),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address packets are broadcast to
    #[serde(default = "default_destination")]
    pub destination: String,
    /// Interface the analyzer binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_position_port")]
    pub position_port: u16,
    #[serde(default = "default_graph_port")]
    pub graph_port: u16,
    /// Enable SO_BROADCAST on sending sockets
    #[serde(default = "default_true")]
    pub broadcast: bool,
    /// Delay between position packets (ms)
    #[serde(default = "default_position_pacing")]
    pub position_pacing_ms: u64,
    /// Delay between position ticks (ms)
    #[serde(default = "default_position_tick")]
    pub position_tick_ms: u64,
    /// Delay between graph packets (ms)
    #[serde(default = "default_graph_pacing")]
    pub graph_pacing_ms: u64,
    /// Delay between graph ticks (ms)
    #[serde(default = "default_graph_tick")]
    pub graph_tick_ms: u64,
    /// Receive buffer per datagram; anything that fills it is reported as clipped
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,
}

fn default_destination() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_position_port() -> u16 {
    POSITION_PORT
}

fn default_graph_port() -> u16 {
    GRAPH_PORT
}

fn default_true() -> bool {
    true
}

fn default_position_pacing() -> u64 {
    10
}

fn default_position_tick() -> u64 {
    100
}

fn default_graph_pacing() -> u64 {
    200
}

fn default_graph_tick() -> u64 {
    2000
}

fn default_recv_buffer_size() -> usize {
    MAX_DATAGRAM_SIZE
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            bind_address: default_bind_address(),
            position_port: default_position_port(),
            graph_port: default_graph_port(),
            broadcast: default_true(),
            position_pacing_ms: default_position_pacing(),
            position_tick_ms: default_position_tick(),
            graph_pacing_ms: default_graph_pacing(),
            graph_tick_ms: default_graph_tick(),
            recv_buffer_size: default_recv_buffer_size(),
        }
    }
}

impl NetworkConfig {
    pub fn ports(&self) -> PortMap {
        PortMap {
            position_port: self.position_port,
            graph_port: self.graph_port,
        }
    }

    pub fn position_pacing(&self) -> Pacing {
        Pacing::from_millis(self.position_pacing_ms, self.position_tick_ms)
    }

    pub fn graph_pacing(&self) -> Pacing {
        Pacing::from_millis(self.graph_pacing_ms, self.graph_tick_ms)
    }

    /// Resolve the address strings into a transport configuration
    pub fn transport(&self) -> ConfigResult<TransportConfig> {
        let destination = parse_ip(&self.destination)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let bind_address = parse_ip(&self.bind_address)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(TransportConfig {
            destination,
            bind_address,
            broadcast: self.broadcast,
            recv_buffer_size: self.recv_buffer_size,
        })
    }
}

/// Analyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Best-effort or strict handling of defective packets
    #[serde(default)]
    pub mode: Mode,
    /// How often the summary table is printed (ms)
    #[serde(default = "default_summary_interval")]
    pub summary_interval_ms: u64,
}

fn default_summary_interval() -> u64 {
    1000
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            summary_interval_ms: default_summary_interval(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("swarmcast/config.toml")),
            Some(PathBuf::from("./swarmcast.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> ConfigResult<()> {
        let sim = &self.simulation;
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if sim.node_count < 2 {
            return invalid(format!("node_count must be at least 2, got {}", sim.node_count));
        }
        if sim.min_edges > sim.max_edges {
            return invalid(format!(
                "min_edges ({}) exceeds max_edges ({})",
                sim.min_edges, sim.max_edges
            ));
        }
        if sim.max_edges > MAX_EDGES {
            return invalid(format!(
                "max_edges ({}) exceeds the protocol ceiling of {}",
                sim.max_edges, MAX_EDGES
            ));
        }
        if sim.min_strength > sim.max_strength {
            return invalid(format!(
                "min_strength ({}) exceeds max_strength ({})",
                sim.min_strength, sim.max_strength
            ));
        }
        if !(0.0..=1.0).contains(&sim.move_probability) {
            return invalid(format!(
                "move_probability must be within [0, 1], got {}",
                sim.move_probability
            ));
        }
        if !sim.max_step.is_finite() || sim.max_step < 0.0 {
            return invalid(format!("max_step must be a non-negative number, got {}", sim.max_step));
        }
        if self.network.position_port == self.network.graph_port {
            return invalid(format!(
                "position_port and graph_port must differ (both {})",
                self.network.position_port
            ));
        }
        if self.network.recv_buffer_size < MAX_GRAPH_PACKET_SIZE {
            return invalid(format!(
                "recv_buffer_size ({}) is smaller than the largest graph packet ({})",
                self.network.recv_buffer_size, MAX_GRAPH_PACKET_SIZE
            ));
        }
        self.network.transport()?;
        Ok(())
    }
}

/// Sample configuration with a fixed name and seed
pub fn sample_config() -> Config {
    Config {
        general: GeneralConfig {
            name: "swarm-lab".to_string(),
            verbose: false,
        },
        simulation: SimulationConfig {
            seed: Some(42),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    Ok(toml::to_string_pretty(&sample_config())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.position_port, POSITION_PORT);
        assert_eq!(config.network.graph_port, GRAPH_PORT);
        assert_eq!(config.simulation.node_count, 20);
        assert_eq!(config.analyzer.mode, Mode::BestEffort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.simulation.seed = Some(7);
        config.analyzer.mode = Mode::Strict;
        let file = NamedTempFile::new().unwrap();

        config.save(file.path()).unwrap();

        let loaded = Config::load(file.path()).unwrap();
        assert_eq!(loaded.network.position_port, config.network.position_port);
        assert_eq!(loaded.simulation.seed, Some(7));
        assert_eq!(loaded.analyzer.mode, Mode::Strict);
    }

    #[test]
    fn test_sample_config() {
        let sample = generate_sample_config().unwrap();
        let parsed: Config = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.general.name, "swarm-lab");
        assert_eq!(parsed.simulation.seed, Some(42));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [simulation]
            node_count = 5

            [analyzer]
            mode = "strict"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.simulation.node_count, 5);
        assert_eq!(parsed.simulation.max_edges, 35);
        assert_eq!(parsed.network.graph_tick_ms, 2000);
        assert_eq!(parsed.analyzer.mode, Mode::Strict);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.simulation.max_edges = 51;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.simulation.node_count = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.simulation.min_edges = 10;
        config.simulation.max_edges = 5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.simulation.move_probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.simulation.max_step = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.network.graph_port = config.network.position_port;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.network.destination = "nowhere".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_recv_buffer_size() {
        let mut config = Config::default();
        assert_eq!(config.network.recv_buffer_size, MAX_DATAGRAM_SIZE);

        config.network.recv_buffer_size = 8;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.network.recv_buffer_size = MAX_GRAPH_PACKET_SIZE - 1;
        assert!(config.validate().is_err());

        config.network.recv_buffer_size = MAX_GRAPH_PACKET_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_config_saves_to_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/swarmcast.toml");

        sample_config().save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.general.name, "swarm-lab");
        assert!(loaded.validate().is_ok());
    }
}
