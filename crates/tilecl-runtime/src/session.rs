use core::fmt::Display;
use std::sync::Arc;

use crate::{
    backend::ComputeBackend,
    config::GlobalConfig,
    context::ComputeContext,
    dispatch::dispatch,
    error::ComputeError,
    geometry::{LaunchGeometry, TileConfig},
    kernel::BoundKernel,
    logging::PipelineLogger,
    profile::{ProfileDuration, Throughput},
    program::{build_program, program_fragments},
    reference::assert_equals_approx,
    selector::{select_device, DeviceInfo, SelectionPolicy},
    source::SourceProvider,
    workload::Workload,
};

/// Settings of a compute session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How the device is picked.
    pub policy: SelectionPolicy,
    /// Tiling shared by the kernels and the launch geometry.
    pub tiling: TileConfig,
    /// Extra flags handed to the device compiler.
    pub build_options: String,
    /// Configuration of the compilation and profiling loggers.
    pub config: Arc<GlobalConfig>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(Arc::new(GlobalConfig::default()))
    }
}

impl SessionOptions {
    /// Options taken from a configuration.
    pub fn from_config(config: Arc<GlobalConfig>) -> Self {
        Self {
            policy: config.device.policy,
            tiling: config.tiling,
            build_options: config.compilation.options.clone(),
            config,
        }
    }

    /// Use another selection policy.
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use another tiling.
    pub fn with_tiling(mut self, tiling: TileConfig) -> Self {
        self.tiling = tiling;
        self
    }
}

/// Outcome of a validated launch.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Name of the device the kernel ran on.
    pub device: String,
    /// Label of the workload.
    pub kernel: String,
    /// Device timestamps of the launch.
    pub duration: ProfileDuration,
    /// Achieved throughput.
    pub throughput: Throughput,
}

impl Display for RunReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} on {}: {}", self.kernel, self.device, self.throughput)
    }
}

/// Every resource needed to launch one workload on one device.
///
/// Dropping the session releases the buffers, the kernel, the program, the queue, the execution
/// context and the device, in that order.
#[derive(Debug)]
pub struct ComputeSession<B: ComputeBackend, W: Workload> {
    kernel: BoundKernel<B>,
    _program: B::Program,
    context: ComputeContext<B>,
    geometry: LaunchGeometry,
    workload: W,
    logger: PipelineLogger,
}

impl<B: ComputeBackend, W: Workload> ComputeSession<B, W> {
    /// Select a device, create its context, build the program and bind the kernel.
    ///
    /// Each stage either hands its resources to the next or fails, releasing everything
    /// acquired before it.
    pub fn setup(
        backend: B,
        workload: W,
        provider: &dyn SourceProvider,
        options: SessionOptions,
    ) -> Result<Self, ComputeError> {
        let geometry = workload.geometry(&options.tiling)?;
        let scalars = workload.scalars()?;
        let mut logger = PipelineLogger::new(options.config.clone());

        let selected = select_device(&backend, options.policy)?;
        crate::validation::validate_units(&selected.info, &geometry)?;

        let context = ComputeContext::new(backend, selected)?;

        let fragments = program_fragments(&options.tiling, workload.source_name());
        let program = build_program(
            &context,
            provider,
            &fragments,
            &options.build_options,
            &mut logger,
        )?;

        let kernel = BoundKernel::create(
            &context,
            &program,
            workload.entry_point(),
            &workload.buffers(),
            &scalars,
        )?;

        log::info!(
            "Ready to launch {} on {} with {geometry}",
            workload.label(),
            context.info().name
        );

        Ok(Self {
            kernel,
            _program: program,
            context,
            geometry,
            workload,
            logger,
        })
    }

    /// Launch the kernel once and read the result back into `output`.
    pub fn execute(
        &mut self,
        inputs: &[&[f32]],
        output: &mut [f32],
    ) -> Result<ProfileDuration, ComputeError> {
        let duration = dispatch(
            &self.context,
            &mut self.kernel,
            &self.geometry,
            inputs,
            output,
        )?;

        self.logger
            .register_profiled(self.workload.label(), duration.as_duration());

        Ok(duration)
    }

    /// Launch the kernel, then check the output against the CPU reference.
    pub fn run(&mut self, inputs: &[&[f32]], output: &mut [f32]) -> Result<RunReport, ComputeError> {
        let duration = self.execute(inputs, output)?;

        let expected = self.workload.reference(inputs);
        assert_equals_approx(
            output,
            &expected,
            self.workload.tolerance(),
            self.workload.output_layout(),
        )?;

        Ok(RunReport {
            device: self.context.info().name.clone(),
            kernel: self.workload.label(),
            duration,
            throughput: Throughput::new(self.workload.operations(), duration.as_duration()),
        })
    }

    /// Show the profiling summary of the launches so far, if profiling is enabled.
    pub fn profile_summary(&mut self) {
        self.logger.profile_summary();
    }

    /// Attributes of the selected device.
    pub fn device(&self) -> &DeviceInfo {
        self.context.info()
    }

    /// Launch geometry of the kernel.
    pub fn geometry(&self) -> &LaunchGeometry {
        &self.geometry
    }
}
