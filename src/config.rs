use crate::engine::EngineError;
use crate::time::Offset;

pub const DEFAULT_OFFSET_VAR: &str = "SLOTGUARD_DEFAULT_OFFSET";
pub const METRICS_PORT_VAR: &str = "SLOTGUARD_METRICS_PORT";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Applied to datetimes that carry no zone designator.
    pub default_offset: Offset,
    pub metrics_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. An unparseable offset is an
    /// error; an unparseable metrics port disables metrics.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let default_offset = match lookup(DEFAULT_OFFSET_VAR) {
            Some(raw) => raw.trim().parse::<Offset>()?,
            None => Offset::default(),
        };
        let metrics_port = lookup(METRICS_PORT_VAR).and_then(|s| s.parse().ok());
        Ok(Self {
            default_offset,
            metrics_port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.default_offset.as_str(), "+09:00");
        assert_eq!(config.metrics_port, None);
    }

    #[test]
    fn reads_offset_and_port() {
        let config = Config::from_lookup(lookup(&[
            (DEFAULT_OFFSET_VAR, " -05:00 "),
            (METRICS_PORT_VAR, "9464"),
        ]))
        .unwrap();
        assert_eq!(config.default_offset.as_str(), "-05:00");
        assert_eq!(config.metrics_port, Some(9464));
    }

    #[test]
    fn bad_offset_is_an_error() {
        let err = Config::from_lookup(lookup(&[(DEFAULT_OFFSET_VAR, "KST")])).unwrap_err();
        assert_eq!(err, EngineError::InvalidOffset("KST".into()));
    }

    #[test]
    fn bad_port_disables_metrics() {
        let config = Config::from_lookup(lookup(&[(METRICS_PORT_VAR, "not-a-port")])).unwrap();
        assert_eq!(config.metrics_port, None);
    }
}
