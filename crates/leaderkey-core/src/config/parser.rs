// Leaderkey Config Parser - TOML with Serde
// Parses leader sequence declarations and builds the registry

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;

use crate::registry::{Registry, RegistryError};
use crate::sequence::{BehaviorBinding, LayerScope, SequenceDefinition};
use crate::KeyPosition;

/// Timeout used when neither the sequence nor `[leader]` sets one
pub const DEFAULT_TIMEOUT_MS: u32 = 200;

/// Layer value that marks a sequence as global when listed first
const GLOBAL_LAYER: i32 = -1;

fn config_debug_enabled() -> bool {
    static DEBUG_CONFIG: OnceLock<bool> = OnceLock::new();
    *DEBUG_CONFIG.get_or_init(|| {
        std::env::var("LEADERKEY_DEBUG_CONFIG")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "on"))
            .unwrap_or(false)
    })
}

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid binding in sequence {index}: {reason}")]
    InvalidBinding { index: usize, reason: String },

    #[error("Invalid layer {layer} in sequence {index}")]
    InvalidLayer { index: usize, layer: i32 },

    #[error("Too many sequences: virtual positions overflow after {0}")]
    VirtualPositionOverflow(usize),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Main configuration structure (root TOML table)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    /// Leader key settings
    leader: LeaderToml,

    /// Sequence declarations, in priority tie-break order
    #[serde(default)]
    sequence: Vec<SequenceToml>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct LeaderToml {
    /// Number of physical key positions
    keymap_len: u32,

    /// Key position that starts a gesture
    position: Option<u32>,

    /// Default sequence timeout (milliseconds)
    timeout_ms: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SequenceToml {
    keys: Vec<KeyPosition>,

    binding: BindingToml,

    /// Omitted, empty, or starting with -1 means every layer
    #[serde(default)]
    layers: Vec<i32>,

    timeout_ms: Option<u32>,

    #[serde(default)]
    slow_release: bool,
}

/// Binding as a table or as `"&behavior param1 param2"`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BindingToml {
    Table(BehaviorBinding),
    Text(String),
}

/// Leader settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderConfig {
    pub keymap_len: u32,
    pub position: Option<KeyPosition>,
    pub timeout_ms: u32,
}

/// Parsed configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub leader: LeaderConfig,
    /// Sequences with virtual positions assigned
    pub sequences: Vec<SequenceDefinition>,
}

impl Config {
    /// Parse a TOML configuration file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let toml_config: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;

        toml_config.to_config()
    }

    /// Default config location (`~/.config/leaderkey/sequences.toml` on Linux)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("leaderkey").join("sequences.toml"))
    }

    /// Register every sequence; the first failure aborts start-up
    pub fn build_registry(&self) -> Result<Registry, ConfigError> {
        log::debug!(
            "Building leader registry with {} sequences",
            self.sequences.len()
        );
        Ok(Registry::from_definitions(
            self.leader.keymap_len,
            self.sequences.iter().cloned(),
        )?)
    }
}

impl ConfigToml {
    /// Convert parsed TOML to internal Config structure
    fn to_config(&self) -> Result<Config, ConfigError> {
        let leader = LeaderConfig {
            keymap_len: self.leader.keymap_len,
            position: self.leader.position.map(KeyPosition),
            timeout_ms: self.leader.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        };

        let sequences = self
            .sequence
            .iter()
            .enumerate()
            .map(|(index, entry)| entry.to_definition(index, &leader))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config { leader, sequences })
    }
}

impl SequenceToml {
    fn to_definition(
        &self,
        index: usize,
        leader: &LeaderConfig,
    ) -> Result<SequenceDefinition, ConfigError> {
        // Virtual positions follow the keymap in declaration order
        let virtual_position = u32::try_from(index)
            .ok()
            .and_then(|i| leader.keymap_len.checked_add(i))
            .ok_or(ConfigError::VirtualPositionOverflow(index))?;

        let binding = match &self.binding {
            BindingToml::Table(binding) => binding.clone(),
            BindingToml::Text(text) => parse_binding(text)
                .map_err(|reason| ConfigError::InvalidBinding { index, reason })?,
        };

        let def = SequenceDefinition::new(self.keys.iter().copied(), virtual_position, binding)
            .with_layer_scope(parse_layers(&self.layers, index)?)
            .with_timeout_ms(self.timeout_ms.unwrap_or(leader.timeout_ms))
            .with_slow_release(self.slow_release);

        if config_debug_enabled() {
            log::info!("Leader sequence {}: {}", index, def);
        }
        Ok(def)
    }
}

fn parse_layers(layers: &[i32], index: usize) -> Result<LayerScope, ConfigError> {
    match layers.first() {
        None => Ok(LayerScope::Global),
        Some(&GLOBAL_LAYER) => Ok(LayerScope::Global),
        Some(_) => layers
            .iter()
            .map(|&layer| {
                u8::try_from(layer).map_err(|_| ConfigError::InvalidLayer { index, layer })
            })
            .collect::<Result<_, _>>()
            .map(LayerScope::Layers),
    }
}

/// Parse `"&kp 4 0"`, `"kp 4"` or `"&none"`
fn parse_binding(text: &str) -> Result<BehaviorBinding, String> {
    let mut parts = text.split_whitespace();
    let behavior = parts
        .next()
        .map(|name| name.trim_start_matches('&'))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| format!("empty binding '{}'", text))?;

    let mut params = [0u32; 2];
    for slot in params.iter_mut() {
        match parts.next() {
            Some(param) => {
                *slot = param
                    .parse()
                    .map_err(|_| format!("invalid parameter '{}' in '{}'", param, text))?;
            }
            None => break,
        }
    }
    if parts.next().is_some() {
        return Err(format!("too many parameters in '{}'", text));
    }

    Ok(BehaviorBinding::new(behavior, params[0], params[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binding() {
        assert_eq!(
            parse_binding("&kp 4 1").unwrap(),
            BehaviorBinding::new("kp", 4, 1)
        );
        assert_eq!(parse_binding("kp 4").unwrap(), BehaviorBinding::new("kp", 4, 0));
        assert_eq!(parse_binding("&none").unwrap(), BehaviorBinding::new("none", 0, 0));
        assert!(parse_binding("").is_err());
        assert!(parse_binding("&").is_err());
        assert!(parse_binding("&kp x").is_err());
        assert!(parse_binding("&kp 1 2 3").is_err());
    }

    #[test]
    fn test_parse_layers() {
        assert_eq!(parse_layers(&[], 0).unwrap(), LayerScope::Global);
        assert_eq!(parse_layers(&[-1], 0).unwrap(), LayerScope::Global);
        assert_eq!(parse_layers(&[1, 3], 0).unwrap(), LayerScope::layers([1, 3]));
        assert!(matches!(
            parse_layers(&[1, 300], 2),
            Err(ConfigError::InvalidLayer { index: 2, layer: 300 })
        ));
    }

    #[test]
    fn test_config_from_simple_toml() {
        let toml = r#"
            [leader]
            keymap_len = 42
            position = 40

            [[sequence]]
            keys = [5, 6]
            binding = { behavior = "kp", param1 = 4 }

            [[sequence]]
            keys = [5]
            binding = "&bt 0 1"
            layers = [2]
            timeout_ms = 500
            slow_release = true
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.leader.keymap_len, 42);
        assert_eq!(config.leader.position, Some(KeyPosition(40)));
        assert_eq!(config.leader.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.sequences.len(), 2);

        let first = &config.sequences[0];
        assert_eq!(first.keys.as_slice(), &[KeyPosition(5), KeyPosition(6)]);
        assert_eq!(first.virtual_position, KeyPosition(42));
        assert_eq!(first.binding, BehaviorBinding::new("kp", 4, 0));
        assert!(first.layer_scope.is_global());
        assert_eq!(first.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(!first.slow_release);

        let second = &config.sequences[1];
        assert_eq!(second.virtual_position, KeyPosition(43));
        assert_eq!(second.binding, BehaviorBinding::new("bt", 0, 1));
        assert_eq!(second.layer_scope, LayerScope::layers([2]));
        assert_eq!(second.timeout_ms, 500);
        assert!(second.slow_release);
    }

    #[test]
    fn test_leader_timeout_is_sequence_default() {
        let toml = r#"
            [leader]
            keymap_len = 10
            timeout_ms = 750

            [[sequence]]
            keys = [1]
            binding = "&kp 4"
        "#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.leader.position, None);
        assert_eq!(config.sequences[0].timeout_ms, 750);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let toml = r#"
            [leader]
            keymap_len = 10
            colour = "red"
        "#;
        assert!(matches!(
            Config::from_toml(toml),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_invalid_binding_reports_index() {
        let toml = r#"
            [leader]
            keymap_len = 10

            [[sequence]]
            keys = [1]
            binding = "&kp 4"

            [[sequence]]
            keys = [2]
            binding = "&kp four"
        "#;
        assert!(matches!(
            Config::from_toml(toml),
            Err(ConfigError::InvalidBinding { index: 1, .. })
        ));
    }

    #[test]
    fn test_build_registry_fails_on_bad_position() {
        let toml = r#"
            [leader]
            keymap_len = 10

            [[sequence]]
            keys = [1, 12]
            binding = "&kp 4"
        "#;
        let config = Config::from_toml(toml).unwrap();
        assert!(matches!(
            config.build_registry(),
            Err(ConfigError::Registry(RegistryError::InvalidPosition { .. }))
        ));
    }

    #[test]
    fn test_oversized_keymap_rejected() {
        let toml = r#"
            [leader]
            keymap_len = 4294967295
        "#;
        let config = Config::from_toml(toml).unwrap();
        assert!(matches!(
            config.build_registry(),
            Err(ConfigError::Registry(RegistryError::KeymapTooLarge { .. }))
        ));
    }

    #[test]
    fn test_build_registry() {
        let toml = r#"
            [leader]
            keymap_len = 10

            [[sequence]]
            keys = [1, 2]
            binding = "&kp 4"

            [[sequence]]
            keys = [1]
            binding = "&kp 5"
        "#;
        let registry = Config::from_toml(toml).unwrap().build_registry().unwrap();
        let order: Vec<u32> = registry
            .lookup(KeyPosition(1))
            .map(|(_, def)| def.virtual_position.index())
            .collect();
        assert_eq!(order, vec![11, 10]);
    }
}
