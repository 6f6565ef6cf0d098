use std::process::ExitCode;

use tilecl_opencl::{configured_sources, OpenClBackend};
use tilecl_runtime::{
    config::GlobalConfig,
    input::{GemmInput, ScanInput},
    ComputeError, ComputeSession, GemmProblem, RunReport, ScanProblem, SessionOptions,
    SourceProvider, Workload,
};

const SEED: u64 = 0x7153;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = GlobalConfig::get();
    let options = SessionOptions::from_config(config.clone());
    let sources = configured_sources(&config.kernels);

    let gemm = GemmProblem::new(2048, 512, 1024);
    let gemm_input = GemmInput::random(gemm, SEED);

    let scan = ScanProblem::new(options.tiling.tile_size);
    let scan_input = ScanInput::random(scan, SEED);

    let results = [
        bench(gemm, &gemm_input.as_slices(), sources.as_ref(), &options),
        bench(scan, &scan_input.as_slices(), sources.as_ref(), &options),
    ];

    if results.iter().all(Result::is_ok) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn bench<W: Workload>(
    workload: W,
    inputs: &[&[f32]],
    sources: &dyn SourceProvider,
    options: &SessionOptions,
) -> Result<RunReport, ComputeError> {
    let label = workload.label();

    let result = launch(workload, inputs, sources, options);
    match &result {
        Ok(report) => {
            println!("Device: {}", report.device);
            println!("{label}: {}", report.throughput);
        }
        Err(err) => eprintln!("{label} failed: {err}"),
    }

    result
}

fn launch<W: Workload>(
    workload: W,
    inputs: &[&[f32]],
    sources: &dyn SourceProvider,
    options: &SessionOptions,
) -> Result<RunReport, ComputeError> {
    let mut output = vec![0.0; workload.output_len()];

    let mut session = ComputeSession::setup(OpenClBackend::new(), workload, sources, options.clone())?;
    let report = session.run(inputs, &mut output)?;
    session.profile_summary();

    log::debug!("{report}");

    Ok(report)
}
