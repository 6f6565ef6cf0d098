use crate::{
    backend::ComputeBackend,
    context::ComputeContext,
    error::{ResourceError, ResourceStage},
    workload::BufferSpec,
};

/// A kernel handle with its device buffers, every argument bound.
///
/// Buffers are released last-created first, then the kernel handle. The same order applies when
/// creation fails halfway.
#[derive(Debug)]
pub struct BoundKernel<B: ComputeBackend> {
    buffers: Vec<B::Buffer>,
    kernel: B::Kernel,
    layout: Vec<BufferSpec>,
}

impl<B: ComputeBackend> BoundKernel<B> {
    /// Create the kernel, then one buffer per spec in order, then bind the buffers followed by
    /// the scalars.
    pub fn create(
        context: &ComputeContext<B>,
        program: &B::Program,
        entry_point: &str,
        layout: &[BufferSpec],
        scalars: &[u32],
    ) -> Result<Self, ResourceError> {
        let backend = context.backend();

        let kernel = backend
            .create_kernel(program, entry_point)
            .map_err(ResourceError::at(ResourceStage::Kernel(entry_point.to_string())))?;
        log::trace!("Created kernel {entry_point}");

        let mut bound = Self {
            buffers: Vec::with_capacity(layout.len()),
            kernel,
            layout: layout.to_vec(),
        };

        for (index, spec) in layout.iter().enumerate() {
            let buffer = context.create_buffer(spec.access, spec.len, index)?;
            log::trace!("Created buffer #{index} of {} elements", spec.len);
            bound.buffers.push(buffer);
        }

        let mut arg = 0;

        for buffer in bound.buffers.iter() {
            backend
                .set_buffer_arg(&mut bound.kernel, arg, buffer)
                .map_err(ResourceError::at(ResourceStage::BufferArg(arg)))?;
            arg += 1;
        }

        for value in scalars {
            backend
                .set_scalar_arg(&mut bound.kernel, arg, *value)
                .map_err(ResourceError::at(ResourceStage::ScalarArg(arg)))?;
            arg += 1;
        }

        Ok(bound)
    }

    /// The kernel handle.
    pub fn kernel(&self) -> &B::Kernel {
        &self.kernel
    }

    /// Layout of the buffer arguments.
    pub fn layout(&self) -> &[BufferSpec] {
        &self.layout
    }

    /// The buffer arguments, in argument order.
    pub fn buffers(&self) -> &[B::Buffer] {
        &self.buffers
    }

    /// The buffer arguments, mutably.
    pub fn buffers_mut(&mut self) -> &mut [B::Buffer] {
        &mut self.buffers
    }
}

impl<B: ComputeBackend> Drop for BoundKernel<B> {
    fn drop(&mut self) {
        while let Some(buffer) = self.buffers.pop() {
            drop(buffer);
        }
    }
}
