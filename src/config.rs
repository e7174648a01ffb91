use std::collections::HashMap;
use thiserror::Error;

use crate::domain::MemberId;
use crate::engine::PlacementAlgorithm;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Placement fallback and system-fund recipient.
    pub root_member_id: MemberId,
    pub placement_algorithm: PlacementAlgorithm,
    pub max_search_depth: usize,
    pub stats_cache_ttl_ms: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let root_member_id = env_map
            .get("ROOT_MEMBER_ID")
            .ok_or_else(|| ConfigError::MissingEnv("ROOT_MEMBER_ID".to_string()))?
            .parse::<i64>()
            .map(MemberId::new)
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "ROOT_MEMBER_ID".to_string(),
                    "must be a valid i64".to_string(),
                )
            })?;

        let algorithm_raw = env_map
            .get("PLACEMENT_ALGORITHM")
            .map(|s| s.as_str())
            .unwrap_or("balanced");
        let placement_algorithm = PlacementAlgorithm::parse(algorithm_raw).ok_or_else(|| {
            ConfigError::InvalidValue(
                "PLACEMENT_ALGORITHM".to_string(),
                format!(
                    "must be size_based, volume_based, depth_first, or balanced, got {}",
                    algorithm_raw
                ),
            )
        })?;

        let max_search_depth = env_map
            .get("MAX_SEARCH_DEPTH")
            .map(|s| s.as_str())
            .unwrap_or("10")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "MAX_SEARCH_DEPTH".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let stats_cache_ttl_ms = env_map
            .get("STATS_CACHE_TTL_MS")
            .map(|s| s.as_str())
            .unwrap_or("300000")
            .parse::<i64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "STATS_CACHE_TTL_MS".to_string(),
                    "must be a valid i64".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            root_member_id,
            placement_algorithm,
            max_search_depth,
            stats_cache_ttl_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map.insert("ROOT_MEMBER_ID".to_string(), "1".to_string());
        map
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.placement_algorithm, PlacementAlgorithm::Balanced);
        assert_eq!(config.max_search_depth, 10);
        assert_eq!(config.stats_cache_ttl_ms, 300_000);
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_root_member_id() {
        let mut env_map = setup_required_env();
        env_map.remove("ROOT_MEMBER_ID");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "ROOT_MEMBER_ID"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_placement_algorithm() {
        let mut env_map = setup_required_env();
        env_map.insert("PLACEMENT_ALGORITHM".to_string(), "clever".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PLACEMENT_ALGORITHM"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_explicit_algorithm_parsed() {
        let mut env_map = setup_required_env();
        env_map.insert("PLACEMENT_ALGORITHM".to_string(), "size_based".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.placement_algorithm, PlacementAlgorithm::SizeBased);
    }
}
