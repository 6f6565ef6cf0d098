use tilecl_runtime::{
    config::kernels::KernelsConfig, FileSourceProvider, SourceProvider, StaticSourceProvider,
};

/// Tiled GEMM kernel, `gemm4`.
pub const GEMM4_SOURCE: &str = include_str!("../kernels/gemm4.cl");
/// Single work-group inclusive scan kernel, `par_scan`.
pub const PAR_SCAN_SOURCE: &str = include_str!("../kernels/par_scan.cl");

/// The kernel sources shipped with this crate, under their file names.
pub fn bundled_sources() -> StaticSourceProvider {
    StaticSourceProvider::default()
        .with("gemm4.cl", GEMM4_SOURCE)
        .with("par_scan.cl", PAR_SCAN_SOURCE)
}

/// Read kernel sources from the configured directory, or use the bundled ones.
pub fn configured_sources(config: &KernelsConfig) -> Box<dyn SourceProvider> {
    match &config.dir {
        Some(dir) => {
            log::info!("Reading kernel sources from {}", dir.display());
            Box::new(FileSourceProvider::new(dir.clone()))
        }
        None => Box::new(bundled_sources()),
    }
}
