//! Synchronous wgpu error capture.
//!
//! wgpu reports validation and allocation failures asynchronously; wrapping
//! each resource creation in an error scope turns them back into `Result`s
//! with the driver's diagnostic text attached, so a bad shader or an
//! oversized texture fails the load call that caused it.

/// Runs `create` inside a single error scope and resolves it immediately.
pub(crate) fn scoped<T>(
    device: &wgpu::Device,
    filter: wgpu::ErrorFilter,
    create: impl FnOnce() -> T,
) -> Result<T, String> {
    let scope = device.push_error_scope(filter);
    let value = create();
    match pollster::block_on(scope.pop()) {
        None => Ok(value),
        Some(error) => Err(error.to_string()),
    }
}

/// Like [`scoped`], but also catches out-of-memory, for buffer and texture
/// allocations.
pub(crate) fn scoped_alloc<T>(
    device: &wgpu::Device,
    create: impl FnOnce() -> T,
) -> Result<T, String> {
    let oom_scope = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let validation_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    let validation = pollster::block_on(validation_scope.pop());
    let oom = pollster::block_on(oom_scope.pop());
    match validation.or(oom) {
        None => Ok(value),
        Some(error) => Err(error.to_string()),
    }
}
