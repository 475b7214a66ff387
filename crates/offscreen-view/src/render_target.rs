//! Shared render target: the pixel buffers, native handle and texture
//! transform exchanged between the UI thread and the native consumer.
//!
//! Everything lives behind a single mutex. The UI thread holds it for a whole
//! paint cycle through [`TargetGuard`]; the consumer takes it briefly to latch
//! the latest frame or read the transform.
//!
//! Buffers rotate between three slots: `back` (free, reused for the next
//! paint), `pending` (published, not yet latched) and `front` (latched by the
//! consumer).

use std::thread::{self, ThreadId};

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, MutexGuard};

use crate::error::{OffscreenError, Result};
use crate::frame::{RgbaPixel, Surface};
use crate::native::NativeHandle;
use crate::transform::TextureTransform;

/// Render target settings.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Color used when the widget is not available yet.
    pub fill_color: RgbaPixel,
    /// Flip texture coordinates vertically.
    pub flip_y: bool,
    /// Allocation granularity in pixels; allocations are rounded up to a multiple.
    pub size_granularity: u32,
    /// Largest width or height a surface may be locked with.
    pub max_texture_size: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            fill_color: RgbaPixel::WHITE,
            flip_y: true,
            size_granularity: 1,
            max_texture_size: 8192,
        }
    }
}

impl From<&offscreen_config::RenderConfig> for RenderOptions {
    fn from(config: &offscreen_config::RenderConfig) -> Self {
        Self {
            fill_color: RgbaPixel::from(config.fill_color),
            flip_y: config.flip_y,
            size_granularity: config.size_granularity.max(1),
            max_texture_size: config.max_texture_size,
        }
    }
}

fn round_up(value: u32, granularity: u32) -> u32 {
    if granularity <= 1 {
        value
    } else {
        value.div_ceil(granularity).saturating_mul(granularity)
    }
}

#[derive(Debug)]
struct TargetState {
    native: NativeHandle,
    texture_id: u32,
    width: u32,
    height: u32,
    back: Option<Surface>,
    pending: Option<Surface>,
    front: Option<Surface>,
    transform: Option<TextureTransform>,
    publish_count: u64,
}

/// The shared render target.
pub struct SharedRenderTarget {
    state: Mutex<TargetState>,
    options: RenderOptions,
    consumer_thread: OnceCell<ThreadId>,
}

impl SharedRenderTarget {
    pub fn new(
        native: NativeHandle,
        texture_id: u32,
        width: u32,
        height: u32,
        options: RenderOptions,
    ) -> Self {
        Self {
            state: Mutex::new(TargetState {
                native,
                texture_id,
                width,
                height,
                back: None,
                pending: None,
                front: None,
                transform: None,
                publish_count: 0,
            }),
            options,
            consumer_thread: OnceCell::new(),
        }
    }

    /// Acquire the target. Released when the guard is dropped.
    pub fn lock(&self) -> TargetGuard<'_> {
        TargetGuard {
            state: self.state.lock(),
            options: &self.options,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn current_native_handle(&self) -> NativeHandle {
        self.state.lock().native
    }

    pub fn texture_id(&self) -> u32 {
        self.state.lock().texture_id
    }

    /// Dimensions the next paint will use.
    pub fn size(&self) -> (u32, u32) {
        let state = self.state.lock();
        (state.width, state.height)
    }

    /// Set the dimensions for the next paint. Does not repaint.
    pub fn set_size(&self, width: u32, height: u32) {
        self.lock().set_size(width, height);
    }

    /// Number of frames published so far.
    pub fn publish_count(&self) -> u64 {
        self.state.lock().publish_count
    }

    /// Latch the most recently published frame.
    ///
    /// Confined to the consumer thread: the first thread to call this owns it
    /// and calls from other threads are refused. Returns `true` once per
    /// publish; publishes that were never latched are coalesced.
    pub fn pull_latest(&self) -> bool {
        let current = thread::current().id();
        let owner = *self.consumer_thread.get_or_init(|| current);
        if owner != current {
            log::warn!("pull_latest: called off the consumer thread, ignoring");
            return false;
        }

        let mut state = self.state.lock();
        match state.pending.take() {
            Some(frame) => {
                if let Some(previous) = state.front.replace(frame) {
                    if state.back.is_none() {
                        state.back = Some(previous);
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Element `index` of the last published transform, or `0.0` if nothing
    /// has been published yet or the index is out of range.
    pub fn transform_component(&self, index: usize) -> f32 {
        self.state
            .lock()
            .transform
            .and_then(|t| t.component(index))
            .unwrap_or(0.0)
    }

    pub fn transform(&self) -> Option<TextureTransform> {
        self.state.lock().transform
    }

    /// Clear the native handle. Returns the handle that was held.
    pub fn notify_native_destroyed(&self) -> NativeHandle {
        std::mem::take(&mut self.state.lock().native)
    }

    /// Run `f` on the frame latched by the last successful [`pull_latest`].
    ///
    /// [`pull_latest`]: SharedRenderTarget::pull_latest
    pub fn with_front_buffer<R>(&self, f: impl FnOnce(&Surface) -> R) -> Option<R> {
        self.state.lock().front.as_ref().map(f)
    }
}

/// Scoped hold on the render target.
pub struct TargetGuard<'a> {
    state: MutexGuard<'a, TargetState>,
    options: &'a RenderOptions,
}

impl TargetGuard<'_> {
    pub fn native_handle(&self) -> NativeHandle {
        self.state.native
    }

    pub fn texture_id(&self) -> u32 {
        self.state.texture_id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.state.width, self.state.height)
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.state.width = width;
        self.state.height = height;
    }

    pub fn fill_color(&self) -> RgbaPixel {
        self.options.fill_color
    }

    /// Obtain a drawable surface sized to the current target dimensions.
    pub fn lock_surface(&mut self) -> Result<Surface> {
        let (width, height) = self.size();
        if width == 0 || height == 0 {
            return Err(OffscreenError::SurfaceUnavailable(format!(
                "target has empty size {}x{}",
                width, height
            )));
        }
        let max = self.options.max_texture_size;
        if width > max || height > max {
            return Err(OffscreenError::SurfaceUnavailable(format!(
                "{}x{} exceeds maximum texture size {}",
                width, height, max
            )));
        }

        let granularity = self.options.size_granularity;
        let (alloc_width, alloc_height) = (round_up(width, granularity), round_up(height, granularity));
        let mut surface = self
            .state
            .back
            .take()
            .unwrap_or_else(|| Surface::with_allocation(0, 0, 0, 0));
        surface.reshape(width, height, alloc_width, alloc_height);
        Ok(surface)
    }

    /// Publish a painted surface and recompute the texture transform.
    pub fn refresh_from_surface(&mut self, surface: Surface) {
        let (alloc_width, alloc_height) = surface.allocation();
        let transform = TextureTransform::for_content(
            surface.width(),
            surface.height(),
            alloc_width,
            alloc_height,
            self.options.flip_y,
        );
        if let Some(unlatched) = self.state.pending.replace(surface) {
            self.state.back = Some(unlatched);
        }
        self.state.transform = Some(transform);
        self.state.publish_count += 1;
    }

    /// Return a surface without publishing it.
    pub fn discard_surface(&mut self, surface: Surface) {
        self.state.back = Some(surface);
    }
}
