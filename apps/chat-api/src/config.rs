/// Chat API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP + gateway server binds to.
    pub port: u16,
    /// Per-connection outbound queue size. A client that falls this far
    /// behind starts losing messages.
    pub outbound_queue_capacity: usize,
    /// Heartbeat interval advertised to gateway clients (ms).
    pub heartbeat_interval_ms: u64,
    /// Seed one server with `general` and `random` channels on startup.
    pub seed_demo_data: bool,
}

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;
const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 41250;
/// Longest heartbeat interval accepted from the environment (one hour).
pub const MAX_HEARTBEAT_INTERVAL_MS: u64 = 3_600_000;

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            seed_demo_data: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables. Missing or unparsable
    /// values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            outbound_queue_capacity: parsed(&lookup, "OUTBOUND_QUEUE_CAPACITY")
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.outbound_queue_capacity),
            heartbeat_interval_ms: parsed(&lookup, "HEARTBEAT_INTERVAL_MS")
                .filter(|&n: &u64| n > 0 && n <= MAX_HEARTBEAT_INTERVAL_MS)
                .unwrap_or(defaults.heartbeat_interval_ms),
            seed_demo_data: lookup("SEED_DEMO_DATA")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(defaults.seed_demo_data),
        }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 3001);
        assert_eq!(config.outbound_queue_capacity, 256);
        assert_eq!(config.heartbeat_interval_ms, 41250);
        assert!(config.seed_demo_data);
    }

    #[test]
    fn values_are_parsed() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("OUTBOUND_QUEUE_CAPACITY", " 16 "),
            ("HEARTBEAT_INTERVAL_MS", "500"),
            ("SEED_DEMO_DATA", "false"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.outbound_queue_capacity, 16);
        assert_eq!(config.heartbeat_interval_ms, 500);
        assert!(!config.seed_demo_data);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("OUTBOUND_QUEUE_CAPACITY", "0"),
            ("HEARTBEAT_INTERVAL_MS", "-5"),
        ]);
        assert_eq!(config.port, 3001);
        assert_eq!(config.outbound_queue_capacity, 256);
        assert_eq!(config.heartbeat_interval_ms, 41250);
    }

    #[test]
    fn oversized_heartbeat_interval_falls_back() {
        let huge = (u64::MAX / 2).to_string();
        let config = config_from(&[("HEARTBEAT_INTERVAL_MS", huge.as_str())]);
        assert_eq!(config.heartbeat_interval_ms, 41250);

        let config = config_from(&[("HEARTBEAT_INTERVAL_MS", "3600001")]);
        assert_eq!(config.heartbeat_interval_ms, 41250);

        let config = config_from(&[("HEARTBEAT_INTERVAL_MS", "3600000")]);
        assert_eq!(config.heartbeat_interval_ms, 3_600_000);
    }
}
