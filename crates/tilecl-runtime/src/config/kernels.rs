use std::path::PathBuf;

/// Where kernel sources are read from.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct KernelsConfig {
    /// Directory holding the kernel sources. The sources bundled with the backend are used when
    /// unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}
