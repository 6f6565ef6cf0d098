use crate::{
    backend::{Blocking, ComputeBackend},
    context::ComputeContext,
    error::{ComputeError, GeometryError, SubmissionError, SubmissionStage},
    geometry::LaunchGeometry,
    kernel::BoundKernel,
    profile::ProfileDuration,
    validation::validate_launch,
    workload::BufferSpec,
};

/// Run one launch: non-blocking input transfers, the kernel, then a blocking read-back.
///
/// Returns the device time of the kernel. When a submission fails after the inputs were queued,
/// the queue is drained before returning so no transfer still reads from `inputs`.
pub fn dispatch<B: ComputeBackend>(
    context: &ComputeContext<B>,
    bound: &mut BoundKernel<B>,
    geometry: &LaunchGeometry,
    inputs: &[&[f32]],
    output: &mut [f32],
) -> Result<ProfileDuration, ComputeError> {
    validate_launch(context.info(), geometry)?;
    check_host_buffers(bound.layout(), inputs, output)?;

    let result = submit(context, bound, geometry, inputs, output);

    if result.is_err() {
        context.drain();
    }

    Ok(result?)
}

// The layout ends with the output buffer, so it holds at least one entry.
fn check_host_buffers(
    layout: &[BufferSpec],
    inputs: &[&[f32]],
    output: &[f32],
) -> Result<(), GeometryError> {
    let Some(num_inputs) = layout.len().checked_sub(1) else {
        return Err(GeometryError::BufferLength {
            index: 0,
            expected: 1,
            actual: 0,
        });
    };

    if inputs.len() != num_inputs {
        return Err(GeometryError::BufferLength {
            index: inputs.len().min(num_inputs),
            expected: num_inputs,
            actual: inputs.len(),
        });
    }

    let host = inputs.iter().map(|input| input.len()).chain([output.len()]);

    for (index, (spec, actual)) in layout.iter().zip(host).enumerate() {
        if spec.len != actual {
            return Err(GeometryError::BufferLength {
                index,
                expected: spec.len,
                actual,
            });
        }
    }

    Ok(())
}

fn submit<B: ComputeBackend>(
    context: &ComputeContext<B>,
    bound: &mut BoundKernel<B>,
    geometry: &LaunchGeometry,
    inputs: &[&[f32]],
    output: &mut [f32],
) -> Result<ProfileDuration, SubmissionError> {
    let backend = context.backend();
    let queue = context.queue();

    for (index, (buffer, input)) in bound.buffers_mut().iter_mut().zip(inputs).enumerate() {
        let bytes = bytemuck::cast_slice::<f32, u8>(input);
        // SAFETY: `inputs` outlives this call and every exit path of `dispatch` either performs
        // the blocking read-back or drains the queue.
        unsafe { backend.enqueue_write(queue, buffer, bytes, Blocking::No) }
            .map_err(SubmissionError::at(SubmissionStage::Write(index)))?;
    }

    // SAFETY: every argument was bound by `BoundKernel::create` and the buffers are sized by the
    // workload layout the geometry was derived from.
    let event = unsafe { backend.enqueue_kernel(queue, bound.kernel(), geometry) }
        .map_err(SubmissionError::at(SubmissionStage::Launch))?;
    log::trace!("Launched kernel with {geometry}");

    // The output buffer follows the inputs, as checked against the layout.
    let result = &bound.buffers()[inputs.len()];

    backend
        .enqueue_read(queue, result, bytemuck::cast_slice_mut(output))
        .map_err(SubmissionError::at(SubmissionStage::Read))?;

    let (start_ns, end_ns) = backend
        .event_timestamps(&event)
        .map_err(SubmissionError::at(SubmissionStage::Profile))?;

    Ok(ProfileDuration::new(start_ns, end_ns))
}
