use core::fmt::Display;
use hashbrown::HashMap;
use std::path::PathBuf;

use crate::error::SourceError;

/// Loads kernel sources by name.
pub trait SourceProvider {
    /// Read the named source as raw bytes.
    fn load(&self, name: &str) -> Result<Vec<u8>, SourceError>;
}

impl<P: SourceProvider + ?Sized> SourceProvider for &P {
    fn load(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        (**self).load(name)
    }
}

/// Sources held in memory, usually embedded in the binary.
#[derive(Debug, Default, Clone)]
pub struct StaticSourceProvider {
    sources: HashMap<String, &'static str>,
}

impl StaticSourceProvider {
    /// Register a source under `name`, replacing any previous one.
    pub fn with(mut self, name: impl Into<String>, source: &'static str) -> Self {
        self.sources.insert(name.into(), source);
        self
    }
}

impl SourceProvider for StaticSourceProvider {
    fn load(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        self.sources
            .get(name)
            .map(|source| source.as_bytes().to_vec())
            .ok_or_else(|| SourceError::NotFound {
                name: name.to_string(),
            })
    }
}

/// Sources read from files in a directory.
#[derive(new, Debug, Clone)]
pub struct FileSourceProvider {
    root: PathBuf,
}

impl SourceProvider for FileSourceProvider {
    fn load(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.root.join(name);
        log::trace!("Reading kernel source {}", path.display());

        std::fs::read(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound {
                name: name.to_string(),
            },
            _ => SourceError::Io {
                name: name.to_string(),
                reason: err.to_string(),
            },
        })
    }
}

/// One translation unit of a device program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFragment {
    /// Loaded from the source provider.
    Named(String),
    /// Produced by the host, e.g. the tiling header.
    Generated {
        /// Name used in logs.
        name: String,
        /// The source text.
        text: String,
    },
}

impl SourceFragment {
    /// Name of the fragment.
    pub fn name(&self) -> &str {
        match self {
            SourceFragment::Named(name) => name,
            SourceFragment::Generated { name, .. } => name,
        }
    }

    /// Resolve the fragment to its source text.
    pub fn read(&self, provider: &dyn SourceProvider) -> Result<String, SourceError> {
        match self {
            SourceFragment::Named(name) => {
                let bytes = provider.load(name)?;
                String::from_utf8(bytes).map_err(|_| SourceError::InvalidUtf8 {
                    name: name.clone(),
                })
            }
            SourceFragment::Generated { text, .. } => Ok(text.clone()),
        }
    }
}

impl Display for SourceFragment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
