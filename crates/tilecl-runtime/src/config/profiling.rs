use super::logger::{LogLevel, LoggerConfig};

/// Configuration of kernel profiling output.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ProfilingConfig {
    /// Logger for per-launch timings and the summary table.
    #[serde(default)]
    pub logger: LoggerConfig<ProfilingLogLevel>,
}

/// Amount of profiling information logged.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProfilingLogLevel {
    /// Nothing is logged.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// Only the summary table.
    #[serde(rename = "basic")]
    Basic,

    /// The summary table and every launch.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for ProfilingLogLevel {}
