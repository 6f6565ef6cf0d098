use core::fmt::{Debug, Display};
use thiserror::Error;

use crate::geometry::LaunchGeometry;

/// The local memory implementation reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalMemoryKind {
    /// Dedicated on-chip local memory.
    Local,
    /// Local memory emulated on top of global memory.
    Global,
    /// No local memory or an unknown implementation.
    Other,
}

impl Display for LocalMemoryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LocalMemoryKind::Local => f.write_str("local"),
            LocalMemoryKind::Global => f.write_str("global"),
            LocalMemoryKind::Other => f.write_str("other"),
        }
    }
}

/// Which devices to list on a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFilter {
    /// Every device, whatever its type.
    All,
    /// Only accelerators (GPUs and dedicated accelerators), never the host CPU.
    Accelerator,
}

/// Access mode of a device buffer, seen from the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferAccess {
    /// The kernel only reads the buffer.
    ReadOnly,
    /// The kernel reads and writes the buffer.
    ReadWrite,
}

/// Whether a host to device transfer blocks the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocking {
    /// Return once the transfer is complete.
    Yes,
    /// Return as soon as the transfer is queued.
    No,
}

/// A failure reported by the underlying compute API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (code {code})")]
pub struct BackendError {
    /// Raw status code of the API call.
    pub code: i32,
    /// Human readable description of the status.
    pub message: String,
}

impl BackendError {
    /// Create a new backend error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A heterogeneous-compute API able to run the tiled pipeline.
///
/// Every handle type owns exactly one reference to the underlying API object and releases it
/// when dropped. The pipeline never releases handles explicitly, so structs holding several
/// handles declare them in reverse acquisition order.
pub trait ComputeBackend: Sized + Debug {
    /// A platform (driver) exposing devices.
    type Platform: Debug;
    /// A device reference.
    type Device: Debug;
    /// An execution context bound to one device.
    type Context: Debug;
    /// An in-order command queue with profiling enabled.
    type Queue: Debug;
    /// A program object, built or not.
    type Program: Debug;
    /// A kernel entry point extracted from a built program.
    type Kernel: Debug;
    /// A device memory region.
    type Buffer: Debug;
    /// A submitted command that can be profiled.
    type Event: Debug;

    /// The name of the backend, used in logs.
    fn name(&self) -> &'static str;

    /// List the available platforms.
    fn platforms(&self) -> Result<Vec<Self::Platform>, BackendError>;

    /// List the devices of a platform matching the filter.
    fn devices(
        &self,
        platform: &Self::Platform,
        filter: DeviceFilter,
    ) -> Result<Vec<Self::Device>, BackendError>;

    /// Query the local memory kind of a device.
    fn local_memory_kind(&self, device: &Self::Device) -> Result<LocalMemoryKind, BackendError>;

    /// Query the maximum number of work-items in a work-group.
    fn max_work_group_size(&self, device: &Self::Device) -> Result<usize, BackendError>;

    /// Query the human-readable name of a device.
    fn device_name(&self, device: &Self::Device) -> Result<String, BackendError>;

    /// Create an execution context for exactly one device.
    fn create_context(&self, device: &Self::Device) -> Result<Self::Context, BackendError>;

    /// Create a profiling-enabled command queue on the device.
    fn create_queue(
        &self,
        context: &Self::Context,
        device: &Self::Device,
    ) -> Result<Self::Queue, BackendError>;

    /// Create a program from multiple translation units, in order.
    fn create_program(
        &self,
        context: &Self::Context,
        sources: &[&str],
    ) -> Result<Self::Program, BackendError>;

    /// Build the program for exactly one device.
    fn build_program(
        &self,
        program: &mut Self::Program,
        device: &Self::Device,
        options: &str,
    ) -> Result<(), BackendError>;

    /// Fetch the build diagnostic log of the program for the device.
    fn build_log(
        &self,
        program: &Self::Program,
        device: &Self::Device,
    ) -> Result<String, BackendError>;

    /// Extract the named entry point from a built program.
    fn create_kernel(
        &self,
        program: &Self::Program,
        name: &str,
    ) -> Result<Self::Kernel, BackendError>;

    /// Allocate a device buffer of `size` bytes.
    fn create_buffer(
        &self,
        context: &Self::Context,
        access: BufferAccess,
        size: usize,
    ) -> Result<Self::Buffer, BackendError>;

    /// Bind a buffer to the kernel argument at `index`.
    fn set_buffer_arg(
        &self,
        kernel: &mut Self::Kernel,
        index: u32,
        buffer: &Self::Buffer,
    ) -> Result<(), BackendError>;

    /// Bind a 32-bit unsigned scalar to the kernel argument at `index`.
    fn set_scalar_arg(
        &self,
        kernel: &mut Self::Kernel,
        index: u32,
        value: u32,
    ) -> Result<(), BackendError>;

    /// Queue a host to device transfer of `data` into `buffer`.
    ///
    /// # Safety
    ///
    /// With [Blocking::No], `data` must stay alive and unmodified until the queue has completed
    /// the transfer, i.e. until a later blocking command or [finish](Self::finish) returns.
    unsafe fn enqueue_write(
        &self,
        queue: &Self::Queue,
        buffer: &mut Self::Buffer,
        data: &[u8],
        blocking: Blocking,
    ) -> Result<(), BackendError>;

    /// Read `buffer` into `data`, blocking until every previously queued command is complete.
    fn enqueue_read(
        &self,
        queue: &Self::Queue,
        buffer: &Self::Buffer,
        data: &mut [u8],
    ) -> Result<(), BackendError>;

    /// Queue a kernel launch with the given geometry.
    ///
    /// # Safety
    ///
    /// Every argument of the kernel must be bound and every buffer must be large enough for the
    /// accesses the kernel performs under `geometry`.
    unsafe fn enqueue_kernel(
        &self,
        queue: &Self::Queue,
        kernel: &Self::Kernel,
        geometry: &LaunchGeometry,
    ) -> Result<Self::Event, BackendError>;

    /// Block until every queued command is complete.
    fn finish(&self, queue: &Self::Queue) -> Result<(), BackendError>;

    /// Device timestamps, in nanoseconds, of the start and end of the command.
    fn event_timestamps(&self, event: &Self::Event) -> Result<(u64, u64), BackendError>;
}
