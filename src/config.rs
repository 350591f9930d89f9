//! Engine settings, loadable from TOML.

use std::time::Duration;

use serde::Deserialize;

use crate::cost::CostOptions;

/// Settings of an [`Engine`](crate::Engine).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Cost analysis and admission control.
    pub cost: CostOptions,
    /// Resolution of admitted operations.
    pub execution: ExecutionOptions,
}

impl EngineConfig {
    /// Parses settings from a TOML document. Missing keys take their default
    /// values.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

/// Settings of the execution of admitted operations.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionOptions {
    /// Resolves every field one at a time, whatever the operation type.
    pub serial: bool,
    /// Time after which a request is cancelled. Running resolvers finish,
    /// fields not started yet resolve to errors.
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}
