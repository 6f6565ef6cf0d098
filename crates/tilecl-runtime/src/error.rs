use core::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

use crate::backend::BackendError;

/// Top level error of the compute pipeline.
///
/// Each variant corresponds to the stage that failed. Resources acquired by earlier stages are
/// already released when this error reaches the caller.
#[derive(Error, Debug)]
pub enum ComputeError {
    /// No usable device could be found.
    #[error("Device discovery failed\nCaused by:\n  {0}")]
    Discovery(#[from] DiscoveryError),

    /// A kernel source could not be loaded.
    #[error("Loading a kernel source failed\nCaused by:\n  {0}")]
    Source(#[from] SourceError),

    /// The device program failed to compile.
    #[error("{0}")]
    Build(#[from] BuildError),

    /// A device resource could not be created or bound.
    #[error("Device resource acquisition failed\nCaused by:\n  {0}")]
    Resource(#[from] ResourceError),

    /// The launch geometry doesn't fit the problem or the device.
    #[error("Invalid launch geometry\nCaused by:\n  {0}")]
    Geometry(#[from] GeometryError),

    /// A transfer or kernel launch could not be submitted.
    #[error("Device submission failed\nCaused by:\n  {0}")]
    Submission(#[from] SubmissionError),

    /// The device result diverges from the CPU reference.
    #[error("Validation failed\nCaused by:\n  {0}")]
    Validation(#[from] ValidationError),
}

/// A configuration file couldn't be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file couldn't be read.
    #[error("Unable to read {}: {source}", path.display())]
    Io {
        /// The configuration file.
        path: PathBuf,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// The file isn't valid configuration.
    #[error("The file {} doesn't have the right format => {source}", path.display())]
    Parse {
        /// The configuration file.
        path: PathBuf,
        /// The toml failure.
        source: toml::de::Error,
    },

    /// The global configuration was already set or read.
    #[error("Cannot set the global configuration multiple times")]
    AlreadySet,
}

/// Device discovery errors.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Platform enumeration failed.
    #[error("Unable to enumerate platforms: {0}")]
    Platforms(BackendError),

    /// Devices were enumerated but none answered the selection queries.
    #[error("No usable device found ({enumerated} enumerated, {skipped} skipped)")]
    NoDevice {
        /// Number of devices enumerated over all platforms.
        enumerated: usize,
        /// Number of devices skipped because a query failed.
        skipped: usize,
    },

    /// The accelerator-only policy found nothing to run on.
    #[error("No accelerator device present")]
    NoAccelerator,
}

/// Errors raised by a [source provider](crate::source::SourceProvider).
#[derive(Error, Debug)]
pub enum SourceError {
    /// No source registered under that name.
    #[error("Source '{name}' not found")]
    NotFound {
        /// The requested source name.
        name: String,
    },

    /// The source exists but couldn't be read.
    #[error("Unable to read source '{name}': {reason}")]
    Io {
        /// The requested source name.
        name: String,
        /// The underlying I/O failure.
        reason: String,
    },

    /// The source isn't valid UTF-8 text.
    #[error("Source '{name}' is not valid UTF-8")]
    InvalidUtf8 {
        /// The requested source name.
        name: String,
    },
}

/// The device compiler rejected the program.
///
/// The diagnostic log is kept exactly as the compiler produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[Compilation Error] build failed with code {code}\n{log}")]
pub struct BuildError {
    /// The error code returned by the build call.
    pub code: i32,
    /// The build diagnostic log.
    pub log: String,
}

/// Stage of resource acquisition that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStage {
    /// Execution context creation.
    Context,
    /// Command queue creation.
    Queue,
    /// Program object creation.
    Program,
    /// Kernel handle creation for the named entry point.
    Kernel(String),
    /// Device buffer creation, by position in the argument list.
    Buffer(usize),
    /// Binding a buffer argument.
    BufferArg(u32),
    /// Binding a scalar argument.
    ScalarArg(u32),
}

impl Display for ResourceStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ResourceStage::Context => f.write_str("context creation"),
            ResourceStage::Queue => f.write_str("command queue creation"),
            ResourceStage::Program => f.write_str("program creation"),
            ResourceStage::Kernel(name) => write!(f, "kernel '{name}' creation"),
            ResourceStage::Buffer(index) => write!(f, "buffer #{index} creation"),
            ResourceStage::BufferArg(index) => write!(f, "buffer argument #{index} binding"),
            ResourceStage::ScalarArg(index) => write!(f, "scalar argument #{index} binding"),
        }
    }
}

/// A device resource couldn't be acquired.
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct ResourceError {
    /// Where the acquisition failed.
    pub stage: ResourceStage,
    /// The backend failure.
    pub source: BackendError,
}

impl ResourceError {
    pub(crate) fn at(stage: ResourceStage) -> impl FnOnce(BackendError) -> Self {
        move |source| Self { stage, source }
    }
}

/// Stage of submission that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    /// Host to device transfer of an input buffer.
    Write(usize),
    /// Kernel launch.
    Launch,
    /// Blocking device to host read-back.
    Read,
    /// Reading the profiling timestamps of the launch event.
    Profile,
}

impl Display for SubmissionStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SubmissionStage::Write(index) => write!(f, "write of input #{index}"),
            SubmissionStage::Launch => f.write_str("kernel launch"),
            SubmissionStage::Read => f.write_str("result read-back"),
            SubmissionStage::Profile => f.write_str("profiling query"),
        }
    }
}

/// A command couldn't be submitted to the queue.
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct SubmissionError {
    /// Where the submission failed.
    pub stage: SubmissionStage,
    /// The backend failure.
    pub source: BackendError,
}

impl SubmissionError {
    pub(crate) fn at(stage: SubmissionStage) -> impl FnOnce(BackendError) -> Self {
        move |source| Self { stage, source }
    }
}

/// The launch geometry is invalid for the problem or the device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// A tiled dimension isn't a multiple of the required factor.
    #[error("Dimension {dim}={value} must be a non-zero multiple of {multiple}")]
    NotMultiple {
        /// The dimension name.
        dim: &'static str,
        /// The provided value.
        value: usize,
        /// The required factor.
        multiple: usize,
    },

    /// A dimension exceeds what the kernel can handle in one work-group.
    #[error("Dimension {dim}={value} must be in 1..={max}")]
    OutOfRange {
        /// The dimension name.
        dim: &'static str,
        /// The provided value.
        value: usize,
        /// The largest supported value.
        max: usize,
    },

    /// The tiling constants are inconsistent.
    #[error("Invalid tiling: tile_size={tile_size}, elems_per_thread={elems_per_thread}")]
    InvalidTiling {
        /// Edge length of an output tile.
        tile_size: usize,
        /// Output elements computed per work-item.
        elems_per_thread: usize,
    },

    /// The work-group is larger than what the device supports.
    #[error("Work-group of {requested} work-items exceeds the device maximum of {max}")]
    WorkGroupTooLarge {
        /// Requested work-items per group.
        requested: usize,
        /// Device maximum work-items per group.
        max: usize,
    },

    /// The host buffers don't match the workload layout.
    #[error("Buffer #{index} holds {actual} elements, expected {expected}")]
    BufferLength {
        /// Buffer position in the argument list.
        index: usize,
        /// Expected element count.
        expected: usize,
        /// Provided element count.
        actual: usize,
    },
}

/// Position of a mismatching element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Index in a vector.
    Linear(usize),
    /// Row and column in a row-major matrix.
    Matrix {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
    },
}

impl Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Position::Linear(index) => write!(f, "[{index}]"),
            Position::Matrix { row, col } => write!(f, "[{row}, {col}]"),
        }
    }
}

/// The device output diverges from the CPU reference.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The output doesn't have the expected number of elements.
    #[error("Output holds {actual} elements, expected {expected}")]
    Length {
        /// Expected element count.
        expected: usize,
        /// Provided element count.
        actual: usize,
    },

    /// An element differs by more than the tolerance.
    #[error(
        "Values differ more than epsilon at {position}: actual={actual}, expected={expected}, difference={}, epsilon={epsilon}",
        difference(.actual, .expected)
    )]
    Mismatch {
        /// Where the first mismatch was found.
        position: Position,
        /// Reference value.
        expected: f32,
        /// Device value.
        actual: f32,
        /// Absolute tolerance.
        epsilon: f32,
    },
}

fn difference(actual: &f32, expected: &f32) -> f32 {
    (actual - expected).abs()
}
