use super::logger::{BinaryLogLevel, LoggerConfig};

/// Configuration of the device program build.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CompilationConfig {
    /// Extra flags handed to the device compiler.
    #[serde(default)]
    pub options: String,

    /// Logger for the sources handed to the compiler.
    #[serde(default)]
    pub logger: LoggerConfig<CompilationLogLevel>,
}

/// Whether the sources are dumped before each build.
pub type CompilationLogLevel = BinaryLogLevel;
