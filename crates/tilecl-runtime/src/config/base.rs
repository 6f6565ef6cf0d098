use super::{
    compilation::{CompilationConfig, CompilationLogLevel},
    device::DeviceConfig,
    kernels::KernelsConfig,
    profiling::{ProfilingConfig, ProfilingLogLevel},
};
use crate::{error::ConfigError, geometry::TileConfig, selector::SelectionPolicy};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

/// Static mutex holding the global configuration, initialized as `None`.
static TILECL_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// File names searched for, in order, in the current directory and its parents.
const CONFIG_FILE_NAMES: [&str; 2] = ["tilecl.toml", "TileCL.toml"];

/// Represents the global configuration of tilecl.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Device selection settings.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Tiling constants shared by the kernels and the launch geometry.
    #[serde(default)]
    pub tiling: TileConfig,

    /// Kernel source settings.
    #[serde(default)]
    pub kernels: KernelsConfig,

    /// Program build settings.
    #[serde(default)]
    pub compilation: CompilationConfig,

    /// Profiling settings.
    #[serde(default)]
    pub profiling: ProfilingConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `tilecl.toml` or `TileCL.toml` in the
    /// current directory or its parents, then applies the environment overrides. If no file is
    /// found, a default configuration is used.
    pub fn get() -> Arc<Self> {
        let mut state = TILECL_GLOBAL_CONFIG.lock();

        if let Some(config) = state.as_ref() {
            return config.clone();
        }

        let config = Arc::new(Self::from_current_dir().override_from_env());
        *state = Some(config.clone());
        config
    }

    /// Sets the global configuration to the provided value.
    ///
    /// Fails if the configuration has already been set or read, as it cannot be overridden.
    /// Call it at the start of the program, before any calls to `get`.
    pub fn set(config: Self) -> Result<(), ConfigError> {
        let mut state = TILECL_GLOBAL_CONFIG.lock();
        if state.is_some() {
            return Err(ConfigError::AlreadySet);
        }
        *state = Some(Arc::new(config));
        Ok(())
    }

    /// Parse a configuration from the content of a toml file.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Overrides configuration fields based on environment variables.
    pub fn override_from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("TILECL_DEBUG_LOG") {
            self.compilation.logger.level = CompilationLogLevel::Full;
            self.profiling.logger.level = ProfilingLogLevel::Full;

            match val.as_str() {
                "stdout" => {
                    self.compilation.logger.stdout = true;
                    self.profiling.logger.stdout = true;
                }
                "stderr" => {
                    self.compilation.logger.stderr = true;
                    self.profiling.logger.stderr = true;
                }
                "1" | "true" => {
                    let file_path = "/tmp/tilecl.log";
                    self.compilation.logger.file = Some(file_path.into());
                    self.profiling.logger.file = Some(file_path.into());
                }
                "0" | "false" => {
                    self.compilation.logger.level = CompilationLogLevel::Disabled;
                    self.profiling.logger.level = ProfilingLogLevel::Disabled;
                }
                file_path => {
                    self.compilation.logger.file = Some(file_path.into());
                    self.profiling.logger.file = Some(file_path.into());
                }
            }
        }

        if let Ok(val) = std::env::var("TILECL_DEVICE_POLICY") {
            match SelectionPolicy::from_str(&val) {
                Ok(policy) => self.device.policy = policy,
                Err(err) => log::warn!("Ignoring TILECL_DEVICE_POLICY: {err}"),
            }
        }

        if let Ok(val) = std::env::var("TILECL_KERNEL_DIR") {
            self.kernels.dir = Some(val.into());
        }

        if let Some(tile_size) = parse_env_usize("TILECL_TILE_SIZE") {
            self.tiling.tile_size = tile_size;
        }

        if let Some(elems_per_thread) = parse_env_usize("TILECL_ELEMS_PER_THREAD") {
            self.tiling.elems_per_thread = elems_per_thread;
        }

        self
    }

    // Loads configuration from `tilecl.toml` or `TileCL.toml` in the current directory or its parents.
    fn from_current_dir() -> Self {
        match std::env::current_dir() {
            Ok(dir) => Self::from_dir(dir),
            Err(err) => {
                log::warn!("Unable to resolve the current directory, using defaults: {err}");
                Self::default()
            }
        }
    }

    // Traverses up the directory tree until a configuration file is found or the root is reached.
    // A file that exists but can't be loaded stops the search and gives the defaults.
    fn from_dir(mut dir: PathBuf) -> Self {
        loop {
            for name in CONFIG_FILE_NAMES {
                match Self::from_file_path(dir.join(name)) {
                    Ok(config) => return config,
                    Err(ConfigError::Io { source, .. })
                        if source.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => {
                        log::warn!("{err}, using defaults");
                        return Self::default();
                    }
                }
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }

    /// Loads configuration from a specified file path.
    pub fn from_file_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_env_usize(name: &str) -> Option<usize> {
    let val = std::env::var(name).ok()?;

    match val.parse() {
        Ok(val) => Some(val),
        Err(err) => {
            log::warn!("Ignoring {name}={val}: {err}");
            None
        }
    }
}
