use core::fmt::Debug;
use std::ptr;

use opencl3::{
    command_queue::{CommandQueue, CL_QUEUE_PROFILING_ENABLE},
    context::Context,
    device::{
        Device, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_GPU, CL_GLOBAL,
        CL_LOCAL,
    },
    error_codes::ClError,
    event::Event,
    kernel::Kernel,
    memory::{Buffer, ClMem, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE},
    platform::{get_platforms, Platform},
    program::Program,
    types::{cl_uint, CL_BLOCKING, CL_NON_BLOCKING},
};
use tilecl_runtime::{
    BackendError, Blocking, BufferAccess, ComputeBackend, DeviceFilter, LaunchGeometry,
    LocalMemoryKind,
};

fn cl_error(err: ClError) -> BackendError {
    BackendError::new(err.0, err.to_string())
}

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        pub struct $name($inner);

        impl Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_struct(stringify!($name)).finish_non_exhaustive()
            }
        }
    };
}

opaque_handle!(
    /// An OpenCL context bound to a single device.
    ClContext(Context)
);
opaque_handle!(
    /// An in-order command queue with profiling enabled.
    ClQueue(CommandQueue)
);
opaque_handle!(
    /// An OpenCL program object.
    ClProgram(Program)
);
opaque_handle!(
    /// A kernel extracted from a built program.
    ClKernel(Kernel)
);
opaque_handle!(
    /// A device buffer, addressed in bytes.
    ClBuffer(Buffer<u8>)
);
opaque_handle!(
    /// The event of a kernel launch.
    ClEvent(Event)
);

/// The OpenCL implementation of [ComputeBackend], on top of [opencl3].
///
/// Root device handles aren't reference counted by OpenCL; every other handle is released by
/// [opencl3] when dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenClBackend;

impl OpenClBackend {
    /// Create the backend. No OpenCL call is made until platforms are listed.
    pub fn new() -> Self {
        Self
    }
}

impl ComputeBackend for OpenClBackend {
    type Platform = Platform;
    type Device = Device;
    type Context = ClContext;
    type Queue = ClQueue;
    type Program = ClProgram;
    type Kernel = ClKernel;
    type Buffer = ClBuffer;
    type Event = ClEvent;

    fn name(&self) -> &'static str {
        "opencl"
    }

    fn platforms(&self) -> Result<Vec<Self::Platform>, BackendError> {
        get_platforms().map_err(cl_error)
    }

    fn devices(
        &self,
        platform: &Self::Platform,
        filter: DeviceFilter,
    ) -> Result<Vec<Self::Device>, BackendError> {
        let device_type = match filter {
            DeviceFilter::All => CL_DEVICE_TYPE_ALL,
            DeviceFilter::Accelerator => CL_DEVICE_TYPE_GPU | CL_DEVICE_TYPE_ACCELERATOR,
        };

        let ids = platform.get_devices(device_type).map_err(cl_error)?;
        log::trace!(
            "Platform {} lists {} device(s)",
            platform.name().unwrap_or_default(),
            ids.len()
        );

        Ok(ids.into_iter().map(Device::new).collect())
    }

    fn local_memory_kind(&self, device: &Self::Device) -> Result<LocalMemoryKind, BackendError> {
        let kind = device.local_mem_type().map_err(cl_error)?;

        Ok(match kind {
            CL_LOCAL => LocalMemoryKind::Local,
            CL_GLOBAL => LocalMemoryKind::Global,
            _ => LocalMemoryKind::Other,
        })
    }

    fn max_work_group_size(&self, device: &Self::Device) -> Result<usize, BackendError> {
        device.max_work_group_size().map_err(cl_error)
    }

    fn device_name(&self, device: &Self::Device) -> Result<String, BackendError> {
        let name = device.name().map_err(cl_error)?;
        Ok(name.trim_end_matches('\0').trim().to_string())
    }

    fn create_context(&self, device: &Self::Device) -> Result<Self::Context, BackendError> {
        Context::from_device(device).map(ClContext).map_err(cl_error)
    }

    fn create_queue(
        &self,
        context: &Self::Context,
        _device: &Self::Device,
    ) -> Result<Self::Queue, BackendError> {
        // The context holds a single device, which is also its default device.
        CommandQueue::create_default_with_properties(&context.0, CL_QUEUE_PROFILING_ENABLE, 0)
            .map(ClQueue)
            .map_err(cl_error)
    }

    fn create_program(
        &self,
        context: &Self::Context,
        sources: &[&str],
    ) -> Result<Self::Program, BackendError> {
        Program::create_from_sources(&context.0, sources)
            .map(ClProgram)
            .map_err(cl_error)
    }

    fn build_program(
        &self,
        program: &mut Self::Program,
        device: &Self::Device,
        options: &str,
    ) -> Result<(), BackendError> {
        program.0.build(&[device.id()], options).map_err(cl_error)
    }

    fn build_log(
        &self,
        program: &Self::Program,
        device: &Self::Device,
    ) -> Result<String, BackendError> {
        program.0.get_build_log(device.id()).map_err(cl_error)
    }

    fn create_kernel(
        &self,
        program: &Self::Program,
        name: &str,
    ) -> Result<Self::Kernel, BackendError> {
        Kernel::create(&program.0, name)
            .map(ClKernel)
            .map_err(cl_error)
    }

    fn create_buffer(
        &self,
        context: &Self::Context,
        access: BufferAccess,
        size: usize,
    ) -> Result<Self::Buffer, BackendError> {
        let flags = match access {
            BufferAccess::ReadOnly => CL_MEM_READ_ONLY,
            BufferAccess::ReadWrite => CL_MEM_READ_WRITE,
        };

        // SAFETY: no host pointer is handed over, the runtime owns the allocation.
        unsafe { Buffer::<u8>::create(&context.0, flags, size, ptr::null_mut()) }
            .map(ClBuffer)
            .map_err(cl_error)
    }

    fn set_buffer_arg(
        &self,
        kernel: &mut Self::Kernel,
        index: u32,
        buffer: &Self::Buffer,
    ) -> Result<(), BackendError> {
        // SAFETY: the argument is a memory object handle, as declared by the kernels.
        unsafe { kernel.0.set_arg(index, &buffer.0.get()) }.map_err(cl_error)
    }

    fn set_scalar_arg(
        &self,
        kernel: &mut Self::Kernel,
        index: u32,
        value: u32,
    ) -> Result<(), BackendError> {
        let value: cl_uint = value;
        // SAFETY: the argument is a `uint`, as declared by the kernels.
        unsafe { kernel.0.set_arg(index, &value) }.map_err(cl_error)
    }

    unsafe fn enqueue_write(
        &self,
        queue: &Self::Queue,
        buffer: &mut Self::Buffer,
        data: &[u8],
        blocking: Blocking,
    ) -> Result<(), BackendError> {
        let blocking = match blocking {
            Blocking::Yes => CL_BLOCKING,
            Blocking::No => CL_NON_BLOCKING,
        };

        queue
            .0
            .enqueue_write_buffer(&mut buffer.0, blocking, 0, data, &[])
            .map(drop)
            .map_err(cl_error)
    }

    fn enqueue_read(
        &self,
        queue: &Self::Queue,
        buffer: &Self::Buffer,
        data: &mut [u8],
    ) -> Result<(), BackendError> {
        // SAFETY: the read is blocking, `data` outlives the transfer.
        unsafe {
            queue
                .0
                .enqueue_read_buffer(&buffer.0, CL_BLOCKING, 0, data, &[])
        }
        .map(drop)
        .map_err(cl_error)
    }

    unsafe fn enqueue_kernel(
        &self,
        queue: &Self::Queue,
        kernel: &Self::Kernel,
        geometry: &LaunchGeometry,
    ) -> Result<Self::Event, BackendError> {
        let global = geometry.global.as_slice(geometry.dims);
        let local = geometry.local.as_slice(geometry.dims);

        queue
            .0
            .enqueue_nd_range_kernel(
                kernel.0.get(),
                geometry.dims,
                ptr::null(),
                global.as_ptr(),
                local.as_ptr(),
                &[],
            )
            .map(ClEvent)
            .map_err(cl_error)
    }

    fn finish(&self, queue: &Self::Queue) -> Result<(), BackendError> {
        queue.0.finish().map_err(cl_error)
    }

    fn event_timestamps(&self, event: &Self::Event) -> Result<(u64, u64), BackendError> {
        let start = event.0.profiling_command_start().map_err(cl_error)?;
        let end = event.0.profiling_command_end().map_err(cl_error)?;

        Ok((start, end))
    }
}
