use crate::{
    backend::ComputeBackend,
    context::ComputeContext,
    error::{BuildError, ComputeError, ResourceError, ResourceStage},
    geometry::{TileConfig, TILING_HEADER_NAME},
    logging::PipelineLogger,
    source::{SourceFragment, SourceProvider},
};

/// The translation units of a program: the tiling header first, then the kernel body.
pub fn program_fragments(tiling: &TileConfig, kernel_source: &str) -> Vec<SourceFragment> {
    vec![
        SourceFragment::Generated {
            name: TILING_HEADER_NAME.to_string(),
            text: tiling.header(),
        },
        SourceFragment::Named(kernel_source.to_string()),
    ]
}

/// Compile the fragments, in order, into a program for the context's device.
///
/// Reading stops at the first missing source. A compiler failure is logged with its full
/// diagnostic log and returned with the original error code.
pub fn build_program<B: ComputeBackend>(
    context: &ComputeContext<B>,
    provider: &dyn SourceProvider,
    fragments: &[SourceFragment],
    options: &str,
    logger: &mut PipelineLogger,
) -> Result<B::Program, ComputeError> {
    let sources = fragments
        .iter()
        .map(|fragment| fragment.read(provider))
        .collect::<Result<Vec<_>, _>>()?;

    if logger.compilation_activated() {
        for (fragment, source) in fragments.iter().zip(sources.iter()) {
            logger.log_compilation(format!("// ---- {fragment} ----\n{source}"));
        }
    }

    let backend = context.backend();
    let units = sources.iter().map(String::as_str).collect::<Vec<_>>();

    let mut program = backend
        .create_program(context.context(), &units)
        .map_err(ResourceError::at(ResourceStage::Program))?;
    log::trace!("Created program from {} translation units", units.len());

    if let Err(err) = backend.build_program(&mut program, context.device(), options) {
        let log = match backend.build_log(&program, context.device()) {
            Ok(log) => log,
            Err(log_err) => {
                log::warn!("Unable to fetch the build log: {log_err}");
                err.message.clone()
            }
        };
        let error = BuildError {
            code: err.code,
            log,
        };

        log::error!("{error}");
        return Err(error.into());
    }

    log::debug!("Built program for {}", context.info().name);

    Ok(program)
}
