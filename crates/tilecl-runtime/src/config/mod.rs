/// Compilation config module.
pub mod compilation;
/// Device selection config module.
pub mod device;
/// Kernel sources config module.
pub mod kernels;
/// Profiling config module.
pub mod profiling;

mod base;
mod logger;

pub use base::*;
pub use logger::*;
