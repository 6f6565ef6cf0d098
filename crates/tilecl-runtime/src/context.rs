use crate::{
    backend::{Blocking, BufferAccess, ComputeBackend},
    error::{ResourceError, ResourceStage, SubmissionError, SubmissionStage},
    selector::{DeviceInfo, SelectedDevice},
};

/// The selected device with its execution context and command queue.
///
/// Fields are declared in reverse acquisition order, so dropping the context releases the queue,
/// then the execution context, then the device.
#[derive(Debug)]
pub struct ComputeContext<B: ComputeBackend> {
    queue: B::Queue,
    context: B::Context,
    device: B::Device,
    info: DeviceInfo,
    backend: B,
}

impl<B: ComputeBackend> ComputeContext<B> {
    /// Create the execution context and a profiling-enabled queue on the selected device.
    ///
    /// On failure everything acquired so far, the device included, is released.
    pub fn new(backend: B, selected: SelectedDevice<B>) -> Result<Self, ResourceError> {
        let SelectedDevice { device, info } = selected;

        let context = backend
            .create_context(&device)
            .map_err(ResourceError::at(ResourceStage::Context))?;
        log::trace!("Created context on {}", info.name);

        let queue = backend
            .create_queue(&context, &device)
            .map_err(ResourceError::at(ResourceStage::Queue))?;
        log::trace!("Created command queue on {}", info.name);

        Ok(Self {
            queue,
            context,
            device,
            info,
            backend,
        })
    }

    /// The backend driving this context.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The device handle.
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Attributes of the device.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// The execution context handle.
    pub fn context(&self) -> &B::Context {
        &self.context
    }

    /// The command queue handle.
    pub fn queue(&self) -> &B::Queue {
        &self.queue
    }

    /// Allocate a device buffer holding `len` floats.
    pub fn create_buffer(
        &self,
        access: BufferAccess,
        len: usize,
        index: usize,
    ) -> Result<B::Buffer, ResourceError> {
        self.backend
            .create_buffer(&self.context, access, len * core::mem::size_of::<f32>())
            .map_err(ResourceError::at(ResourceStage::Buffer(index)))
    }

    /// Copy `data` to the device buffer at position `index`, blocking until the transfer completes.
    pub fn write(
        &self,
        buffer: &mut B::Buffer,
        data: &[f32],
        index: usize,
    ) -> Result<(), SubmissionError> {
        // SAFETY: the transfer is blocking, `data` isn't read once this call returns.
        unsafe {
            self.backend.enqueue_write(
                &self.queue,
                buffer,
                bytemuck::cast_slice(data),
                Blocking::Yes,
            )
        }
        .map_err(SubmissionError::at(SubmissionStage::Write(index)))
    }

    /// Copy the device buffer into `data`, blocking until every queued command completes.
    pub fn read(&self, buffer: &B::Buffer, data: &mut [f32]) -> Result<(), SubmissionError> {
        self.backend
            .enqueue_read(&self.queue, buffer, bytemuck::cast_slice_mut(data))
            .map_err(SubmissionError::at(SubmissionStage::Read))
    }

    /// Block until every queued command is complete, logging a failure instead of returning it.
    pub(crate) fn drain(&self) {
        if let Err(err) = self.backend.finish(&self.queue) {
            log::warn!("Unable to wait for pending commands on {}: {err}", self.info.name);
        }
    }
}
