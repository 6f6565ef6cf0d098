use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    rc::Rc,
};

use tilecl_runtime::{
    BackendError, Blocking, BufferAccess, ComputeBackend, DeviceFilter, LaunchGeometry,
    LocalMemoryKind,
};

use super::kernels::{emulate, KernelArg, Tiling};

pub const CL_DEVICE_NOT_FOUND: i32 = -1;
pub const CL_OUT_OF_RESOURCES: i32 = -5;
pub const CL_BUILD_PROGRAM_FAILURE: i32 = -11;
pub const CL_INVALID_VALUE: i32 = -30;
pub const CL_INVALID_PROGRAM_EXECUTABLE: i32 = -45;
pub const CL_INVALID_KERNEL_NAME: i32 = -46;
pub const CL_INVALID_KERNEL_ARGS: i32 = -52;

/// Marker making the dummy compiler reject a source.
pub const SYNTAX_ERROR: &str = "SYNTAX_ERROR";

/// The diagnostic log produced for a source containing [SYNTAX_ERROR].
pub fn syntax_error_log(unit: usize) -> String {
    format!(
        "<program source>:{unit}:5: error: use of undeclared identifier '{SYNTAX_ERROR}'\n    \
         {SYNTAX_ERROR};\n    ^\n1 error generated.\n"
    )
}

/// An API object whose lifetime is journaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Device(usize),
    Context(usize),
    Queue(usize),
    Program(usize),
    Kernel(usize),
    Buffer(usize),
}

/// A command submitted to a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Write { buffer: usize, blocking: bool },
    Launch { kernel: String, global: Vec<usize>, local: Vec<usize> },
    Read { buffer: usize },
    Finish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Acquire(Resource),
    Release(Resource),
    Command(Command),
}

/// Every acquisition, release and command, in order.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<Entry>>>);

impl Journal {
    fn push(&self, entry: Entry) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.0.borrow().clone()
    }

    pub fn acquired(&self) -> Vec<Resource> {
        self.filter(|entry| match entry {
            Entry::Acquire(resource) => Some(*resource),
            _ => None,
        })
    }

    pub fn released(&self) -> Vec<Resource> {
        self.filter(|entry| match entry {
            Entry::Release(resource) => Some(*resource),
            _ => None,
        })
    }

    pub fn commands(&self) -> Vec<Command> {
        self.filter(|entry| match entry {
            Entry::Command(command) => Some(command.clone()),
            _ => None,
        })
    }

    /// Resources acquired and not released yet.
    pub fn alive(&self) -> Vec<Resource> {
        let released = self.released();
        self.acquired()
            .into_iter()
            .filter(|resource| !released.contains(resource))
            .collect()
    }

    /// Panics unless every acquired resource was released exactly once.
    pub fn assert_all_released_once(&self) {
        let acquired = self.acquired();
        let released = self.released();

        for resource in acquired.iter() {
            let count = released.iter().filter(|r| *r == resource).count();
            assert_eq!(count, 1, "{resource:?} released {count} times");
        }
        assert_eq!(acquired.len(), released.len(), "unknown resource released");
    }

    /// Resources released since the first release of a non-device resource.
    pub fn teardown(&self) -> Vec<Resource> {
        self.released()
            .into_iter()
            .skip_while(|resource| matches!(resource, Resource::Device(_)))
            .collect()
    }

    fn filter<T>(&self, f: impl FnMut(&Entry) -> Option<T>) -> Vec<T> {
        self.0.borrow().iter().filter_map(f).collect()
    }
}

/// A stage at which the dummy API can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fail {
    Platforms,
    Devices(usize),
    Context,
    Queue,
    Program,
    Build,
    BuildLog,
    Kernel,
    /// Creation of the n-th buffer.
    Buffer(usize),
    BufferArg(u32),
    ScalarArg(u32),
    /// The n-th write.
    Write(usize),
    Launch,
    Read,
    Finish,
    Timestamps,
    /// The launch succeeds but its first output element is off by one.
    WrongResult,
}

/// What a dummy device reports. `None` makes the matching query fail.
#[derive(Debug, Clone)]
pub struct DeviceSpec {
    pub name: Option<&'static str>,
    pub local_memory: Option<LocalMemoryKind>,
    pub max_work_group_size: Option<usize>,
    pub accelerator: bool,
}

impl DeviceSpec {
    pub fn gpu(name: &'static str, local_memory: LocalMemoryKind, max: usize) -> Self {
        Self {
            name: Some(name),
            local_memory: Some(local_memory),
            max_work_group_size: Some(max),
            accelerator: true,
        }
    }

    pub fn cpu(name: &'static str, max: usize) -> Self {
        Self {
            name: Some(name),
            local_memory: Some(LocalMemoryKind::Global),
            max_work_group_size: Some(max),
            accelerator: false,
        }
    }
}

#[derive(Debug)]
struct Tracked {
    resource: Resource,
    journal: Journal,
}

impl Tracked {
    fn acquire(resource: Resource, journal: &Journal) -> Self {
        journal.push(Entry::Acquire(resource));
        Self {
            resource,
            journal: journal.clone(),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.journal.push(Entry::Release(self.resource));
    }
}

#[derive(Debug)]
pub struct DummyPlatform {
    index: usize,
}

#[derive(Debug)]
pub struct DummyDevice {
    index: usize,
    spec: DeviceSpec,
    _tracked: Tracked,
}

impl DummyDevice {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug)]
pub struct DummyContext {
    device: usize,
    _tracked: Tracked,
}

#[derive(Debug)]
pub struct DummyQueue {
    _tracked: Tracked,
}

#[derive(Debug)]
pub struct DummyProgram {
    sources: Vec<String>,
    tiling: Option<Tiling>,
    build_log: Option<String>,
    _tracked: Tracked,
}

#[derive(Debug)]
pub struct DummyKernel {
    name: String,
    tiling: Option<Tiling>,
    args: Vec<Option<KernelArg>>,
    _tracked: Tracked,
}

pub type Memory = Rc<RefCell<Vec<u8>>>;

#[derive(Debug)]
pub struct DummyBuffer {
    id: usize,
    access: BufferAccess,
    memory: Memory,
    _tracked: Tracked,
}

#[derive(Debug)]
pub struct DummyEvent {
    start: u64,
    end: u64,
}

/// A CPU implementation of the compute API, used to test the pipeline.
#[derive(Debug)]
pub struct DummyBackend {
    platforms: Vec<Vec<DeviceSpec>>,
    failures: HashSet<Fail>,
    journal: Journal,
    launch_ns: u64,
    clock: Cell<u64>,
    contexts: Cell<usize>,
    queues: Cell<usize>,
    programs: Cell<usize>,
    kernels: Cell<usize>,
    buffers: Cell<usize>,
    writes: Cell<usize>,
}

impl DummyBackend {
    pub fn new(platforms: Vec<Vec<DeviceSpec>>) -> Self {
        Self {
            platforms,
            failures: HashSet::new(),
            journal: Journal::default(),
            launch_ns: 1_500,
            clock: Cell::new(1_000),
            contexts: Cell::new(0),
            queues: Cell::new(0),
            programs: Cell::new(0),
            kernels: Cell::new(0),
            buffers: Cell::new(0),
            writes: Cell::new(0),
        }
    }

    /// One platform with one GPU with local memory.
    pub fn single_gpu() -> Self {
        Self::new(vec![vec![DeviceSpec::gpu(
            "Dummy GPU",
            LocalMemoryKind::Local,
            1024,
        )]])
    }

    pub fn fail(mut self, fail: Fail) -> Self {
        self.failures.insert(fail);
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    fn check(&self, fail: Fail, code: i32, message: &str) -> Result<(), BackendError> {
        if self.failures.contains(&fail) {
            return Err(BackendError::new(code, message));
        }
        Ok(())
    }

    fn next(counter: &Cell<usize>) -> usize {
        let id = counter.get();
        counter.set(id + 1);
        id
    }

    fn flat_index(&self, platform: usize, device: usize) -> usize {
        self.platforms[..platform].iter().map(Vec::len).sum::<usize>() + device
    }
}

fn parse_define(source: &str, name: &str) -> Option<usize> {
    source.lines().find_map(|line| {
        line.trim()
            .strip_prefix("#define ")?
            .strip_prefix(name)?
            .trim()
            .parse()
            .ok()
    })
}

impl ComputeBackend for DummyBackend {
    type Platform = DummyPlatform;
    type Device = DummyDevice;
    type Context = DummyContext;
    type Queue = DummyQueue;
    type Program = DummyProgram;
    type Kernel = DummyKernel;
    type Buffer = DummyBuffer;
    type Event = DummyEvent;

    fn name(&self) -> &'static str {
        "dummy"
    }

    fn platforms(&self) -> Result<Vec<Self::Platform>, BackendError> {
        self.check(Fail::Platforms, -1001, "CL_PLATFORM_NOT_FOUND_KHR")?;

        Ok((0..self.platforms.len())
            .map(|index| DummyPlatform { index })
            .collect())
    }

    fn devices(
        &self,
        platform: &Self::Platform,
        filter: DeviceFilter,
    ) -> Result<Vec<Self::Device>, BackendError> {
        self.check(
            Fail::Devices(platform.index),
            CL_OUT_OF_RESOURCES,
            "CL_OUT_OF_RESOURCES",
        )?;

        let devices = self.platforms[platform.index]
            .iter()
            .enumerate()
            .filter(|(_, spec)| filter == DeviceFilter::All || spec.accelerator)
            .map(|(index, spec)| {
                let index = self.flat_index(platform.index, index);
                DummyDevice {
                    index,
                    spec: spec.clone(),
                    _tracked: Tracked::acquire(Resource::Device(index), &self.journal),
                }
            })
            .collect::<Vec<_>>();

        if devices.is_empty() {
            return Err(BackendError::new(CL_DEVICE_NOT_FOUND, "CL_DEVICE_NOT_FOUND"));
        }

        Ok(devices)
    }

    fn local_memory_kind(&self, device: &Self::Device) -> Result<LocalMemoryKind, BackendError> {
        device
            .spec
            .local_memory
            .ok_or_else(|| BackendError::new(CL_INVALID_VALUE, "CL_INVALID_VALUE"))
    }

    fn max_work_group_size(&self, device: &Self::Device) -> Result<usize, BackendError> {
        device
            .spec
            .max_work_group_size
            .ok_or_else(|| BackendError::new(CL_INVALID_VALUE, "CL_INVALID_VALUE"))
    }

    fn device_name(&self, device: &Self::Device) -> Result<String, BackendError> {
        device
            .spec
            .name
            .map(str::to_string)
            .ok_or_else(|| BackendError::new(CL_INVALID_VALUE, "CL_INVALID_VALUE"))
    }

    fn create_context(&self, device: &Self::Device) -> Result<Self::Context, BackendError> {
        self.check(Fail::Context, CL_OUT_OF_RESOURCES, "CL_OUT_OF_RESOURCES")?;
        let id = Self::next(&self.contexts);

        Ok(DummyContext {
            device: device.index,
            _tracked: Tracked::acquire(Resource::Context(id), &self.journal),
        })
    }

    fn create_queue(
        &self,
        context: &Self::Context,
        device: &Self::Device,
    ) -> Result<Self::Queue, BackendError> {
        assert_eq!(context.device, device.index, "queue on a foreign device");
        self.check(Fail::Queue, CL_OUT_OF_RESOURCES, "CL_OUT_OF_RESOURCES")?;
        let id = Self::next(&self.queues);

        Ok(DummyQueue {
            _tracked: Tracked::acquire(Resource::Queue(id), &self.journal),
        })
    }

    fn create_program(
        &self,
        _context: &Self::Context,
        sources: &[&str],
    ) -> Result<Self::Program, BackendError> {
        self.check(Fail::Program, CL_INVALID_VALUE, "CL_INVALID_VALUE")?;
        let id = Self::next(&self.programs);

        Ok(DummyProgram {
            sources: sources.iter().map(|source| source.to_string()).collect(),
            tiling: None,
            build_log: None,
            _tracked: Tracked::acquire(Resource::Program(id), &self.journal),
        })
    }

    fn build_program(
        &self,
        program: &mut Self::Program,
        _device: &Self::Device,
        _options: &str,
    ) -> Result<(), BackendError> {
        let failed = |program: &mut DummyProgram, log: String| {
            program.build_log = Some(log);
            Err(BackendError::new(
                CL_BUILD_PROGRAM_FAILURE,
                "CL_BUILD_PROGRAM_FAILURE",
            ))
        };

        if self.failures.contains(&Fail::Build) {
            return failed(program, "forced build failure\n".to_string());
        }

        if let Some(unit) = program
            .sources
            .iter()
            .position(|source| source.contains(SYNTAX_ERROR))
        {
            return failed(program, syntax_error_log(unit + 1));
        }

        let joined = program.sources.join("\n");
        let tile_size = parse_define(&joined, "TILE_SIZE");
        let elems_per_thread = parse_define(&joined, "ELEMS_PER_THREAD");

        let tiling = match (tile_size, elems_per_thread) {
            (Some(tile_size), Some(elems_per_thread)) => Tiling {
                tile_size,
                elems_per_thread,
            },
            _ => return failed(program, "error: TILE_SIZE must be defined\n".to_string()),
        };
        program.tiling = Some(tiling);
        program.build_log = Some(String::new());

        Ok(())
    }

    fn build_log(
        &self,
        program: &Self::Program,
        _device: &Self::Device,
    ) -> Result<String, BackendError> {
        self.check(Fail::BuildLog, CL_INVALID_VALUE, "CL_INVALID_VALUE")?;
        Ok(program.build_log.clone().unwrap_or_default())
    }

    fn create_kernel(
        &self,
        program: &Self::Program,
        name: &str,
    ) -> Result<Self::Kernel, BackendError> {
        self.check(Fail::Kernel, CL_OUT_OF_RESOURCES, "CL_OUT_OF_RESOURCES")?;

        let Some(tiling) = program.tiling else {
            return Err(BackendError::new(
                CL_INVALID_PROGRAM_EXECUTABLE,
                "CL_INVALID_PROGRAM_EXECUTABLE",
            ));
        };

        if !program.sources.iter().any(|source| source.contains(name)) {
            return Err(BackendError::new(
                CL_INVALID_KERNEL_NAME,
                "CL_INVALID_KERNEL_NAME",
            ));
        }

        let id = Self::next(&self.kernels);

        Ok(DummyKernel {
            name: name.to_string(),
            tiling: Some(tiling),
            args: Vec::new(),
            _tracked: Tracked::acquire(Resource::Kernel(id), &self.journal),
        })
    }

    fn create_buffer(
        &self,
        _context: &Self::Context,
        access: BufferAccess,
        size: usize,
    ) -> Result<Self::Buffer, BackendError> {
        let id = Self::next(&self.buffers);
        self.check(Fail::Buffer(id), CL_OUT_OF_RESOURCES, "CL_OUT_OF_RESOURCES")?;

        Ok(DummyBuffer {
            id,
            access,
            memory: Rc::new(RefCell::new(vec![0; size])),
            _tracked: Tracked::acquire(Resource::Buffer(id), &self.journal),
        })
    }

    fn set_buffer_arg(
        &self,
        kernel: &mut Self::Kernel,
        index: u32,
        buffer: &Self::Buffer,
    ) -> Result<(), BackendError> {
        self.check(Fail::BufferArg(index), CL_INVALID_VALUE, "CL_INVALID_ARG_VALUE")?;
        set_arg(
            kernel,
            index,
            KernelArg::Buffer {
                memory: buffer.memory.clone(),
                writable: buffer.access == BufferAccess::ReadWrite,
            },
        );
        Ok(())
    }

    fn set_scalar_arg(
        &self,
        kernel: &mut Self::Kernel,
        index: u32,
        value: u32,
    ) -> Result<(), BackendError> {
        self.check(Fail::ScalarArg(index), CL_INVALID_VALUE, "CL_INVALID_ARG_SIZE")?;
        set_arg(kernel, index, KernelArg::Scalar(value));
        Ok(())
    }

    unsafe fn enqueue_write(
        &self,
        _queue: &Self::Queue,
        buffer: &mut Self::Buffer,
        data: &[u8],
        blocking: Blocking,
    ) -> Result<(), BackendError> {
        let nth = Self::next(&self.writes);
        self.check(Fail::Write(nth), CL_OUT_OF_RESOURCES, "CL_OUT_OF_RESOURCES")?;

        let mut memory = buffer.memory.borrow_mut();
        if memory.len() < data.len() {
            return Err(BackendError::new(CL_INVALID_VALUE, "CL_INVALID_VALUE"));
        }
        memory[..data.len()].copy_from_slice(data);

        self.journal.push(Entry::Command(Command::Write {
            buffer: buffer.id,
            blocking: blocking == Blocking::Yes,
        }));
        Ok(())
    }

    fn enqueue_read(
        &self,
        _queue: &Self::Queue,
        buffer: &Self::Buffer,
        data: &mut [u8],
    ) -> Result<(), BackendError> {
        self.check(Fail::Read, CL_OUT_OF_RESOURCES, "CL_OUT_OF_RESOURCES")?;

        let memory = buffer.memory.borrow();
        if memory.len() < data.len() {
            return Err(BackendError::new(CL_INVALID_VALUE, "CL_INVALID_VALUE"));
        }
        data.copy_from_slice(&memory[..data.len()]);

        self.journal
            .push(Entry::Command(Command::Read { buffer: buffer.id }));
        Ok(())
    }

    unsafe fn enqueue_kernel(
        &self,
        _queue: &Self::Queue,
        kernel: &Self::Kernel,
        geometry: &LaunchGeometry,
    ) -> Result<Self::Event, BackendError> {
        self.check(Fail::Launch, CL_OUT_OF_RESOURCES, "CL_OUT_OF_RESOURCES")?;

        let args = kernel
            .args
            .iter()
            .cloned()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| BackendError::new(CL_INVALID_KERNEL_ARGS, "CL_INVALID_KERNEL_ARGS"))?;
        let tiling = kernel
            .tiling
            .ok_or_else(|| BackendError::new(CL_INVALID_VALUE, "CL_INVALID_VALUE"))?;

        emulate(&kernel.name, &args, geometry, tiling)?;

        if self.failures.contains(&Fail::WrongResult) {
            if let Some(KernelArg::Buffer { memory, .. }) = args
                .iter()
                .rev()
                .find(|arg| matches!(arg, KernelArg::Buffer { writable: true, .. }))
            {
                let mut memory = memory.borrow_mut();
                let first = f32::from_ne_bytes([memory[0], memory[1], memory[2], memory[3]]);
                memory[..4].copy_from_slice(&(first + 1.0).to_ne_bytes());
            }
        }

        self.journal.push(Entry::Command(Command::Launch {
            kernel: kernel.name.clone(),
            global: geometry.global.as_slice(geometry.dims),
            local: geometry.local.as_slice(geometry.dims),
        }));

        let start = self.clock.get();
        let end = start + self.launch_ns;
        self.clock.set(end);

        Ok(DummyEvent { start, end })
    }

    fn finish(&self, _queue: &Self::Queue) -> Result<(), BackendError> {
        self.journal.push(Entry::Command(Command::Finish));
        self.check(Fail::Finish, CL_OUT_OF_RESOURCES, "CL_OUT_OF_RESOURCES")
    }

    fn event_timestamps(&self, event: &Self::Event) -> Result<(u64, u64), BackendError> {
        self.check(
            Fail::Timestamps,
            -7,
            "CL_PROFILING_INFO_NOT_AVAILABLE",
        )?;
        Ok((event.start, event.end))
    }
}

fn set_arg(kernel: &mut DummyKernel, index: u32, arg: KernelArg) {
    let index = index as usize;
    if kernel.args.len() <= index {
        kernel.args.resize(index + 1, None);
    }
    kernel.args[index] = Some(arg);
}
