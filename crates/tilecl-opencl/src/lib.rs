#![warn(missing_docs)]

//! OpenCL backend of the tilecl dispatch pipeline.
//!
//! [OpenClBackend] implements the runtime's backend trait on top of [opencl3], and the tiled
//! `gemm4` and `par_scan` kernels are bundled with the crate.

mod backend;
mod sources;

pub use backend::*;
pub use sources::*;
