use tilecl_runtime::{BackendError, LaunchGeometry};

use super::backend::{Memory, CL_INVALID_KERNEL_ARGS};

/// Tiling constants read from the program's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tiling {
    pub tile_size: usize,
    pub elems_per_thread: usize,
}

#[derive(Debug, Clone)]
pub enum KernelArg {
    Buffer { memory: Memory, writable: bool },
    Scalar(u32),
}

fn invalid_args() -> BackendError {
    BackendError::new(CL_INVALID_KERNEL_ARGS, "CL_INVALID_KERNEL_ARGS")
}

fn read(arg: &KernelArg) -> Result<Vec<f32>, BackendError> {
    match arg {
        // Device memory is a byte vector, not guaranteed to be aligned for f32.
        KernelArg::Buffer { memory, .. } => Ok(memory
            .borrow()
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()),
        KernelArg::Scalar(_) => Err(invalid_args()),
    }
}

fn write(arg: &KernelArg, values: &[f32]) -> Result<(), BackendError> {
    match arg {
        KernelArg::Buffer {
            memory,
            writable: true,
        } => {
            memory
                .borrow_mut()
                .copy_from_slice(bytemuck::cast_slice::<f32, u8>(values));
            Ok(())
        }
        _ => Err(invalid_args()),
    }
}

fn scalar(arg: &KernelArg) -> Result<usize, BackendError> {
    match arg {
        KernelArg::Scalar(value) => Ok(*value as usize),
        KernelArg::Buffer { .. } => Err(invalid_args()),
    }
}

/// Run the named kernel on the CPU, one work-item at a time.
pub fn emulate(
    name: &str,
    args: &[KernelArg],
    geometry: &LaunchGeometry,
    tiling: Tiling,
) -> Result<(), BackendError> {
    match (name, args) {
        ("gemm4", [a, b, c, n, m, k]) => gemm4(
            (a, b, c),
            (scalar(n)?, scalar(m)?, scalar(k)?),
            geometry,
            tiling,
        ),
        ("par_scan", [input, output, n]) => par_scan(input, output, scalar(n)?, geometry),
        _ => Err(invalid_args()),
    }
}

/// Each work-item computes `elems_per_thread` rows of one output column, rows strided by
/// `tile_size / elems_per_thread` inside the work-group's tile.
fn gemm4(
    (a, b, c): (&KernelArg, &KernelArg, &KernelArg),
    (n, m, k): (usize, usize, usize),
    geometry: &LaunchGeometry,
    tiling: Tiling,
) -> Result<(), BackendError> {
    let lhs = read(a)?;
    let rhs = read(b)?;
    let mut out = read(c)?;

    let rows_per_pass = tiling.tile_size / tiling.elems_per_thread;

    for global_y in 0..geometry.global.y {
        for global_x in 0..geometry.global.x {
            let (group_x, local_x) = (global_x / geometry.local.x, global_x % geometry.local.x);
            let (group_y, local_y) = (global_y / geometry.local.y, global_y % geometry.local.y);

            let col = group_x * tiling.tile_size + local_x;

            for w in 0..tiling.elems_per_thread {
                let row = group_y * tiling.tile_size + local_y + w * rows_per_pass;

                if row >= n || col >= k {
                    continue;
                }

                out[row * k + col] = (0..m).map(|j| lhs[row * m + j] * rhs[j * k + col]).sum();
            }
        }
    }

    write(c, &out)
}

/// Inclusive scan within each work-group.
fn par_scan(
    input: &KernelArg,
    output: &KernelArg,
    n: usize,
    geometry: &LaunchGeometry,
) -> Result<(), BackendError> {
    let values = read(input)?;
    let mut out = read(output)?;

    for group in values[..n].chunks(geometry.local.x).enumerate() {
        let (index, chunk) = group;
        let mut acc = 0.0;

        for (i, value) in chunk.iter().enumerate() {
            acc += value;
            out[index * geometry.local.x + i] = acc;
        }
    }

    write(output, &out)
}
