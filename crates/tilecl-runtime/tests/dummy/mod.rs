#![allow(dead_code)]

mod backend;
mod kernels;

pub use backend::*;

use tilecl_runtime::StaticSourceProvider;

pub const GEMM_SOURCE: &str = "kernel void gemm4(global const float *a, global const float *b, \
                               global float *c, uint n, uint m, uint k) {}";
pub const SCAN_SOURCE: &str =
    "kernel void par_scan(global const float *in, global float *out, uint n) {}";

/// The kernel sources understood by the dummy compiler.
pub fn test_sources() -> StaticSourceProvider {
    StaticSourceProvider::default()
        .with("gemm4.cl", GEMM_SOURCE)
        .with("par_scan.cl", SCAN_SOURCE)
}
