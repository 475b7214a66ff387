//! C symbols for the native consumer.
//!
//! Views are addressed by the non-zero id `offscreen_create_view` returns.
//! Unknown ids are logged and treated as no-ops.

use std::ffi::{CStr, c_char};
use std::str::Utf8Error;

use offscreen_view::InputAction;

use crate::{
    OffscreenToolkitCallbacks, TextureUpdatedFn, attach_ui_thread, config, create_view,
    detach_ui_thread, release_view, run_ui_pending, set_toolkit, with_view,
};

/// Null maps to `None`; a string that is not UTF-8 is an error.
fn opt_str<'a>(ptr: *const c_char) -> Result<Option<&'a str>, Utf8Error> {
    if ptr.is_null() {
        return Ok(None);
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().map(Some)
}

/// Initialize logging. The filter comes from `logging.filter` in
/// `offscreen.toml` (or `OFFSCREEN_LOG`), falling back to `RUST_LOG`.
///
/// # Returns
/// `false` if a logger was already installed
#[unsafe(no_mangle)]
pub extern "C" fn offscreen_init_logging() -> bool {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(filter) = config().logging.filter.as_deref() {
        builder.parse_filters(filter);
    }
    builder.try_init().is_ok()
}

/// Make the calling thread the UI thread. Queued work only runs when this
/// thread calls `offscreen_ui_run_pending`.
#[unsafe(no_mangle)]
pub extern "C" fn offscreen_ui_attach() {
    log::info!("offscreen_ui_attach");
    attach_ui_thread();
}

/// Detach the UI thread. Work posted afterwards is dropped.
#[unsafe(no_mangle)]
pub extern "C" fn offscreen_ui_detach() -> bool {
    log::info!("offscreen_ui_detach");
    detach_ui_thread()
}

/// Run every queued UI task. Call from the attached UI thread.
///
/// # Returns
/// Number of tasks run, or `-1` if this thread is not attached
#[unsafe(no_mangle)]
pub extern "C" fn offscreen_ui_run_pending() -> i32 {
    match run_ui_pending() {
        Some(ran) => ran.min(i32::MAX as usize) as i32,
        None => {
            log::warn!("offscreen_ui_run_pending: thread is not attached");
            -1
        }
    }
}

/// Register the widget toolkit. Pass null to remove it; views created
/// without a toolkit show the fill color.
#[unsafe(no_mangle)]
pub extern "C" fn offscreen_set_widget_toolkit(toolkit: *const OffscreenToolkitCallbacks) {
    let callbacks = if toolkit.is_null() {
        None
    } else {
        Some(unsafe { *toolkit })
    };
    log::info!("offscreen_set_widget_toolkit: registered={}", callbacks.is_some());
    set_toolkit(callbacks);
}

/// Create a view bound to `native`.
///
/// # Arguments
/// * `class_name` - View type tag, or null for the configured default
/// * `object_name` - Object name, or null for the configured default
/// * `native` - Native peer handle; zero disables painting
/// * `texture_id` - Consumer texture name
/// * `width`, `height` - Initial texture size in pixels
/// * `on_update` - Called after each published frame, may be null
///
/// # Returns
/// View id, or `0` on failure (including names that are not UTF-8)
#[unsafe(no_mangle)]
pub extern "C" fn offscreen_create_view(
    class_name: *const c_char,
    object_name: *const c_char,
    native: u64,
    texture_id: u32,
    width: u32,
    height: u32,
    on_update: Option<TextureUpdatedFn>,
) -> u64 {
    let class_name = match opt_str(class_name) {
        Ok(class_name) => class_name,
        Err(e) => {
            log::error!("offscreen_create_view: class_name is not valid UTF-8: {}", e);
            return 0;
        }
    };
    let object_name = match opt_str(object_name) {
        Ok(object_name) => object_name,
        Err(e) => {
            log::error!("offscreen_create_view: object_name is not valid UTF-8: {}", e);
            return 0;
        }
    };
    match create_view(
        class_name,
        object_name,
        native,
        texture_id,
        width,
        height,
        on_update,
    ) {
        Ok(id) => {
            log::info!("offscreen_create_view: id={}", id);
            id
        }
        Err(e) => {
            log::error!("offscreen_create_view: failed: {:?}", e);
            0
        }
    }
}

/// Destroy a view and forget its id.
#[unsafe(no_mangle)]
pub extern "C" fn offscreen_release_view(view: u64) {
    if let Err(e) = release_view(view) {
        log::warn!("offscreen_release_view: {}", e);
    }
}

/// Latch the newest frame. Call from the consumer thread only.
///
/// # Returns
/// `true` if a new frame was latched
#[unsafe(no_mangle)]
pub extern "C" fn offscreen_update_texture(view: u64) -> bool {
    with_view(view, |bridge| bridge.request_texture_refresh()).unwrap_or(false)
}

/// Element `index` of the 4x4 row-major texture transform.
#[unsafe(no_mangle)]
pub extern "C" fn offscreen_texture_transform(view: u64, index: u32) -> f32 {
    with_view(view, |bridge| bridge.transform_component(index as usize)).unwrap_or(0.0)
}

/// The native peer is gone. The view stays registered until released.
#[unsafe(no_mangle)]
pub extern "C" fn offscreen_notify_destroyed(view: u64) {
    with_view(view, |bridge| bridge.notify_destroyed());
}

#[unsafe(no_mangle)]
pub extern "C" fn offscreen_invalidate(view: u64) {
    with_view(view, |bridge| bridge.schedule_invalidate());
}

#[unsafe(no_mangle)]
pub extern "C" fn offscreen_resize(view: u64, width: u32, height: u32) {
    log::debug!("offscreen_resize: view={} {}x{}", view, width, height);
    with_view(view, |bridge| bridge.schedule_resize(width, height));
}

/// Replay a pointer event.
///
/// # Arguments
/// * `action` - 0 down, 1 up, 2 move, 3 cancel
/// * `x`, `y` - Position in texture pixels
///
/// # Returns
/// `false` for an unknown action or view
#[unsafe(no_mangle)]
pub extern "C" fn offscreen_process_mouse_event(view: u64, action: i32, x: i32, y: i32) -> bool {
    let Some(action) = InputAction::from_raw(action) else {
        log::warn!("offscreen_process_mouse_event: unknown action {}", action);
        return false;
    };
    with_view(view, |bridge| bridge.replay_input(action, x, y)).is_some()
}

#[unsafe(no_mangle)]
pub extern "C" fn offscreen_is_view_created(view: u64) -> bool {
    with_view(view, |bridge| bridge.is_widget_ready()).unwrap_or(false)
}

/// Copy the latched frame as tightly packed RGBA8 into `dst`.
///
/// # Returns
/// `false` if nothing is latched yet or `dst_len` is too small
#[unsafe(no_mangle)]
pub extern "C" fn offscreen_copy_pixels(view: u64, dst: *mut u8, dst_len: usize) -> bool {
    if dst.is_null() {
        return false;
    }
    let dst = unsafe { std::slice::from_raw_parts_mut(dst, dst_len) };
    with_view(view, |bridge| bridge.with_latest_frame(|frame| frame.copy_packed(dst)))
        .flatten()
        .unwrap_or(false)
}
