#![warn(missing_docs)]

//! tilecl runtime crate: the compute-context lifecycle and tiled dispatch pipeline.
//!
//! The pipeline runs in fixed stages, each handing an owned resource set to the next:
//! device selection, context creation, program build, kernel and buffer binding, dispatch
//! and validation. Concrete heterogeneous-compute APIs plug in through [ComputeBackend].

#[macro_use]
extern crate derive_new;

/// Backend abstraction module.
pub mod backend;
/// Runtime configuration module.
pub mod config;
/// Compute context module.
pub mod context;
/// Dispatch engine module.
pub mod dispatch;
/// Error types.
pub mod error;
/// Launch geometry module.
pub mod geometry;
/// Host data module.
pub mod input;
/// Kernel and buffer manager module.
pub mod kernel;
/// Logging module.
pub mod logging;
/// Device profiling module.
pub mod profile;
/// Program builder module.
pub mod program;
/// CPU reference and result validation module.
pub mod reference;
/// Device selection module.
pub mod selector;
/// Compute session module.
pub mod session;
/// Kernel source provider module.
pub mod source;
/// Launch limit validation.
pub mod validation;
/// Workload descriptions.
pub mod workload;

pub use backend::*;
pub use error::*;
pub use geometry::{LaunchGeometry, TileConfig, WorkSize};
pub use profile::{ProfileDuration, Throughput};
pub use selector::{DeviceInfo, SelectionPolicy};
pub use session::{ComputeSession, RunReport, SessionOptions};
pub use source::{FileSourceProvider, SourceProvider, StaticSourceProvider};
pub use workload::{BufferSpec, GemmProblem, ScanProblem, Workload};
