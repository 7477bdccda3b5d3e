use thiserror::Error;

/// Rejected configuration value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("World size must be positive and finite, got {0}")]
    InvalidWorld(f64),

    #[error("At least one defender is required")]
    NoDefenders,

    #[error("Probability `{field}` must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },

    #[error("`{field}` must be non-negative and finite, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("Relax threshold {relax} exceeds attack threshold {attack}")]
    InvertedThresholds { relax: f64, attack: f64 },

    #[error("Spawn box `{field}` [{min}, {max}] does not fit inside world {world}")]
    SpawnOutOfBounds { field: &'static str, min: f64, max: f64, world: f64 },

    #[error("Step budget must be at least 1")]
    ZeroStepBudget,
}

#[derive(Error, Debug)]
pub enum SwarmError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported config format: {path}")]
    UnsupportedFormat { path: String },
}

impl SwarmError {
    /// Whether the file was read but its contents are at fault, so editing
    /// it and retrying can succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SwarmError::Config(_) => true,
            SwarmError::Yaml(_) | SwarmError::Json(_) => true,
            SwarmError::Io(_) => false,
            SwarmError::UnsupportedFormat { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SwarmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: SwarmError = ConfigError::NoDefenders.into();
        assert!(matches!(err, SwarmError::Config(ConfigError::NoDefenders)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_parse_errors_are_recoverable() {
        let yaml: SwarmError = serde_yaml::from_str::<u32>("[1, 2").unwrap_err().into();
        let json: SwarmError = serde_json::from_str::<u32>("{").unwrap_err().into();
        assert!(yaml.is_recoverable());
        assert!(json.is_recoverable());

        let io: SwarmError = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert!(!io.is_recoverable());
    }

    #[test]
    fn test_error_messages_name_the_field() {
        let err = ConfigError::ProbabilityOutOfRange { field: "attacker_kill_prob", value: 1.5 };
        let msg = err.to_string();
        assert!(msg.contains("attacker_kill_prob"), "{}", msg);
        assert!(msg.contains("1.5"), "{}", msg);
    }
}
