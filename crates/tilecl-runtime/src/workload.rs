use core::fmt::Debug;

use crate::{
    backend::BufferAccess,
    error::GeometryError,
    geometry::{LaunchGeometry, TileConfig},
    profile::{gemm_operations, scan_operations},
    reference::{gemm_reference, scan_reference, ElementLayout, GEMM_TOLERANCE, SCAN_TOLERANCE},
};

/// Layout of one kernel buffer argument.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSpec {
    /// Access mode seen from the kernel.
    pub access: BufferAccess,
    /// Number of `f32` elements.
    pub len: usize,
}

/// A kernel family with its argument layout, launch geometry and CPU reference.
///
/// Buffer arguments come first, inputs before the single output, followed by the scalar
/// arguments.
pub trait Workload: Debug {
    /// Label used in logs and profiling summaries.
    fn label(&self) -> String;

    /// Name of the kernel entry point.
    fn entry_point(&self) -> &'static str;

    /// Name of the source holding the kernel body.
    fn source_name(&self) -> &'static str;

    /// Buffer arguments, inputs first, output last.
    fn buffers(&self) -> Vec<BufferSpec>;

    /// Scalar arguments bound after the buffers.
    fn scalars(&self) -> Result<Vec<u32>, GeometryError>;

    /// Launch geometry under the given tiling.
    fn geometry(&self, tiling: &TileConfig) -> Result<LaunchGeometry, GeometryError>;

    /// Floating point operations performed by one launch.
    fn operations(&self) -> f64;

    /// CPU reference of the output for the given inputs.
    fn reference(&self, inputs: &[&[f32]]) -> Vec<f32>;

    /// Absolute tolerance of the device output.
    fn tolerance(&self) -> f32;

    /// Shape of the output, for reporting mismatches.
    fn output_layout(&self) -> ElementLayout;

    /// Number of input buffers.
    fn num_inputs(&self) -> usize {
        self.buffers().len().saturating_sub(1)
    }

    /// Number of elements of the output buffer.
    fn output_len(&self) -> usize {
        self.buffers().last().map(|spec| spec.len).unwrap_or(0)
    }
}

fn scalar(dim: &'static str, value: usize) -> Result<u32, GeometryError> {
    u32::try_from(value).map_err(|_| GeometryError::OutOfRange {
        dim,
        value,
        max: u32::MAX as usize,
    })
}

/// `C (n×k) = A (n×m) × B (m×k)`, row-major, computed by the `gemm4` kernel.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemmProblem {
    /// Rows of `A` and `C`.
    pub n: usize,
    /// Columns of `A`, rows of `B`.
    pub m: usize,
    /// Columns of `B` and `C`.
    pub k: usize,
}

impl Workload for GemmProblem {
    fn label(&self) -> String {
        format!("gemm4 {}x{}x{}", self.n, self.m, self.k)
    }

    fn entry_point(&self) -> &'static str {
        "gemm4"
    }

    fn source_name(&self) -> &'static str {
        "gemm4.cl"
    }

    fn buffers(&self) -> Vec<BufferSpec> {
        vec![
            BufferSpec::new(BufferAccess::ReadOnly, self.n * self.m),
            BufferSpec::new(BufferAccess::ReadOnly, self.m * self.k),
            BufferSpec::new(BufferAccess::ReadWrite, self.n * self.k),
        ]
    }

    fn scalars(&self) -> Result<Vec<u32>, GeometryError> {
        Ok(vec![
            scalar("N", self.n)?,
            scalar("M", self.m)?,
            scalar("K", self.k)?,
        ])
    }

    fn geometry(&self, tiling: &TileConfig) -> Result<LaunchGeometry, GeometryError> {
        LaunchGeometry::gemm(self.n, self.m, self.k, tiling)
    }

    fn operations(&self) -> f64 {
        gemm_operations(self.n, self.m, self.k)
    }

    fn reference(&self, inputs: &[&[f32]]) -> Vec<f32> {
        gemm_reference(inputs[0], inputs[1], self.n, self.m, self.k)
    }

    fn tolerance(&self) -> f32 {
        GEMM_TOLERANCE
    }

    fn output_layout(&self) -> ElementLayout {
        ElementLayout::Matrix { cols: self.k }
    }
}

/// Inclusive prefix sum of `n` floats, computed by the single work-group `par_scan` kernel.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProblem {
    /// Number of elements.
    pub n: usize,
}

impl Workload for ScanProblem {
    fn label(&self) -> String {
        format!("par_scan {}", self.n)
    }

    fn entry_point(&self) -> &'static str {
        "par_scan"
    }

    fn source_name(&self) -> &'static str {
        "par_scan.cl"
    }

    fn buffers(&self) -> Vec<BufferSpec> {
        vec![
            BufferSpec::new(BufferAccess::ReadOnly, self.n),
            BufferSpec::new(BufferAccess::ReadWrite, self.n),
        ]
    }

    fn scalars(&self) -> Result<Vec<u32>, GeometryError> {
        Ok(vec![scalar("N", self.n)?])
    }

    fn geometry(&self, tiling: &TileConfig) -> Result<LaunchGeometry, GeometryError> {
        LaunchGeometry::scan(self.n, tiling)
    }

    fn operations(&self) -> f64 {
        scan_operations(self.n)
    }

    fn reference(&self, inputs: &[&[f32]]) -> Vec<f32> {
        scan_reference(inputs[0])
    }

    fn tolerance(&self) -> f32 {
        SCAN_TOLERANCE
    }

    fn output_layout(&self) -> ElementLayout {
        ElementLayout::Vector
    }
}
