//! The offscreen bridge: schedules UI-thread paints of a view adapter into the
//! shared render target and serves the native consumer.
//!
//! Every paint runs on the UI thread. The native side only ever touches the
//! render target (latching frames, reading the transform) and posts requests.
//!
//! Lock order is adapter, then render target. The consumer never locks the
//! adapter.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::adapter::ViewAdapter;
use crate::clock::{Clock, MonotonicClock};
use crate::error::{OffscreenError, Result};
use crate::frame::Surface;
use crate::host::HostContext;
use crate::input::{GestureTracker, InputAction};
use crate::native::{NativeCallback, NativeHandle, NoopCallback};
use crate::render_target::{RenderOptions, SharedRenderTarget};
use crate::ui::UiContext;
use crate::widget::{RepaintHandle, ViewContent, WidgetRequest, WidgetToolkit};

/// Lifecycle state of a bridge.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Uninitialized = 0,
    Bound = 1,
    Painting = 2,
    Idle = 3,
    Destroyed = 4,
}

impl BridgeState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Bound,
            2 => Self::Painting,
            3 => Self::Idle,
            _ => Self::Destroyed,
        }
    }
}

/// Counters describing what the paint pipeline has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Frames published.
    pub paints_completed: u64,
    /// Paints refused because the native handle was null.
    pub paints_skipped: u64,
    /// Widget paint routines that returned an error.
    pub paint_failures: u64,
    /// Paint cycles abandoned because no surface was available.
    pub surface_failures: u64,
    /// Frames filled with the fallback color because no widget existed.
    pub fallback_fills: u64,
    /// Pointer events delivered to the widget.
    pub inputs_delivered: u64,
}

#[derive(Default)]
struct Counters {
    paints_completed: AtomicU64,
    paints_skipped: AtomicU64,
    paint_failures: AtomicU64,
    surface_failures: AtomicU64,
    fallback_fills: AtomicU64,
    inputs_delivered: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Clears a coalescing flag when dropped, whether the task holding it ran or
/// was discarded along with its executor.
struct QueuedReset<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> QueuedReset<F> {
    fn new(reset: F) -> Self {
        Self(Some(reset))
    }

    /// Forget the reset; the task has taken over the queued state.
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl<F: FnOnce()> Drop for QueuedReset<F> {
    fn drop(&mut self) {
        if let Some(reset) = self.0.take() {
            reset();
        }
    }
}

struct BridgeInner {
    class_name: String,
    object_name: String,
    options: RenderOptions,
    target: OnceCell<SharedRenderTarget>,
    adapter: Mutex<Box<dyn ViewAdapter>>,
    widget_ready: AtomicBool,
    state: AtomicU8,
    host: Arc<dyn HostContext>,
    callback: Arc<dyn NativeCallback>,
    clock: Arc<dyn Clock>,
    gesture: Mutex<GestureTracker>,
    paint_queued: AtomicBool,
    invalidate_queued: AtomicBool,
    pending_resize: Mutex<Option<(u32, u32)>>,
    counters: Counters,
}

/// Builder for [`OffscreenBridge`].
pub struct BridgeBuilder {
    adapter: Box<dyn ViewAdapter>,
    host: Arc<dyn HostContext>,
    class_name: Option<String>,
    object_name: Option<String>,
    callback: Arc<dyn NativeCallback>,
    clock: Arc<dyn Clock>,
    options: RenderOptions,
}

impl BridgeBuilder {
    /// Tag reported by [`OffscreenBridge::class_name`]. Defaults to the adapter's.
    pub fn with_class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self
    }

    pub fn with_object_name(mut self, name: impl Into<String>) -> Self {
        self.object_name = Some(name.into());
        self
    }

    pub fn with_callback(mut self, callback: Arc<dyn NativeCallback>) -> Self {
        self.callback = callback;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> OffscreenBridge {
        let class_name = self
            .class_name
            .unwrap_or_else(|| self.adapter.class_name().to_string());
        let object_name = self.object_name.unwrap_or_else(|| class_name.clone());
        OffscreenBridge {
            inner: Arc::new(BridgeInner {
                class_name,
                object_name,
                options: self.options,
                target: OnceCell::new(),
                adapter: Mutex::new(self.adapter),
                widget_ready: AtomicBool::new(false),
                state: AtomicU8::new(BridgeState::Uninitialized as u8),
                host: self.host,
                callback: self.callback,
                clock: self.clock,
                gesture: Mutex::new(GestureTracker::new()),
                paint_queued: AtomicBool::new(false),
                invalidate_queued: AtomicBool::new(false),
                pending_resize: Mutex::new(None),
                counters: Counters::default(),
            }),
        }
    }
}

/// Cloneable handle to an offscreen view bridge.
#[derive(Clone)]
pub struct OffscreenBridge {
    inner: Arc<BridgeInner>,
}

impl OffscreenBridge {
    pub fn builder(adapter: Box<dyn ViewAdapter>, host: Arc<dyn HostContext>) -> BridgeBuilder {
        BridgeBuilder {
            adapter,
            host,
            class_name: None,
            object_name: None,
            callback: Arc::new(NoopCallback),
            clock: Arc::new(MonotonicClock),
            options: RenderOptions::default(),
        }
    }

    /// Attach the native peer and create the render target.
    pub fn bind(&self, native: NativeHandle, texture_id: u32, width: u32, height: u32) -> Result<()> {
        match self.state() {
            BridgeState::Uninitialized => {}
            BridgeState::Destroyed => return Err(OffscreenError::Destroyed),
            _ => return Err(OffscreenError::AlreadyBound),
        }
        if native.is_null() {
            log::warn!("bind({}): null native handle, painting stays disabled", self.inner.object_name);
        }
        let target =
            SharedRenderTarget::new(native, texture_id, width, height, self.inner.options.clone());
        self.inner
            .target
            .set(target)
            .map_err(|_| OffscreenError::AlreadyBound)?;
        self.inner
            .state
            .compare_exchange(
                BridgeState::Uninitialized as u8,
                BridgeState::Bound as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|_| OffscreenError::AlreadyBound)?;
        log::info!(
            "bind({}): native={} texture={} size={}x{}",
            self.inner.object_name,
            native,
            texture_id,
            width,
            height
        );
        Ok(())
    }

    pub fn state(&self) -> BridgeState {
        BridgeState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    pub fn class_name(&self) -> &str {
        &self.inner.class_name
    }

    pub fn object_name(&self) -> &str {
        &self.inner.object_name
    }

    pub fn render_target(&self) -> Option<&SharedRenderTarget> {
        self.inner.target.get()
    }

    /// Current native handle; null before binding and after destruction.
    pub fn native_handle(&self) -> NativeHandle {
        self.render_target()
            .map(|t| t.current_native_handle())
            .unwrap_or(NativeHandle::NULL)
    }

    pub fn texture_id(&self) -> Option<u32> {
        self.render_target().map(|t| t.texture_id())
    }

    /// Render target dimensions the next paint will use.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.render_target().map(|t| t.size())
    }

    pub fn stats(&self) -> BridgeStats {
        let c = &self.inner.counters;
        BridgeStats {
            paints_completed: c.paints_completed.load(Ordering::Relaxed),
            paints_skipped: c.paints_skipped.load(Ordering::Relaxed),
            paint_failures: c.paint_failures.load(Ordering::Relaxed),
            surface_failures: c.surface_failures.load(Ordering::Relaxed),
            fallback_fills: c.fallback_fills.load(Ordering::Relaxed),
            inputs_delivered: c.inputs_delivered.load(Ordering::Relaxed),
        }
    }

    pub fn is_widget_ready(&self) -> bool {
        self.inner.widget_ready.load(Ordering::SeqCst)
    }

    /// Consumer side: latch the newest frame, if any. Never schedules a paint.
    pub fn request_texture_refresh(&self) -> bool {
        match self.state() {
            BridgeState::Uninitialized => {
                log::debug!("request_texture_refresh({}): not initialized", self.inner.object_name);
                false
            }
            BridgeState::Destroyed => false,
            _ => self
                .render_target()
                .map(|t| t.pull_latest())
                .unwrap_or(false),
        }
    }

    /// Element of the texture transform; `0.0` until a frame was published.
    pub fn transform_component(&self, index: usize) -> f32 {
        self.render_target()
            .map(|t| t.transform_component(index))
            .unwrap_or(0.0)
    }

    /// Run `f` on the frame latched by the last successful refresh.
    pub fn with_latest_frame<R>(&self, f: impl FnOnce(&Surface) -> R) -> Option<R> {
        self.render_target().and_then(|t| t.with_front_buffer(f))
    }

    /// The native peer is going away: stop all handle-dependent work.
    pub fn notify_destroyed(&self) {
        let previous = BridgeState::from_u8(
            self.inner
                .state
                .swap(BridgeState::Destroyed as u8, Ordering::SeqCst),
        );
        if previous == BridgeState::Destroyed {
            return;
        }
        // Waits for an in-flight paint, which holds the target lock.
        if let Some(target) = self.render_target() {
            let handle = target.notify_native_destroyed();
            log::info!(
                "notify_destroyed({}): released native handle {}",
                self.inner.object_name,
                handle
            );
        }
        self.post("notify_destroyed", |bridge| {
            bridge.inner.adapter.lock().release_widget();
            bridge.inner.widget_ready.store(false, Ordering::SeqCst);
            log::debug!("notify_destroyed({}): widget released", bridge.inner.object_name);
        });
    }

    /// Ask the toolkit to build the widget on the UI thread, then paint once.
    pub fn create_widget(&self, toolkit: Arc<dyn WidgetToolkit>) {
        if !self.accepting("create_widget") {
            return;
        }
        self.post("create_widget", move |bridge| {
            let inner = &bridge.inner;
            if bridge.state() == BridgeState::Destroyed {
                return;
            }
            let (width, height) = bridge.size().unwrap_or((0, 0));
            let request = WidgetRequest {
                class_name: inner.class_name.clone(),
                object_name: inner.object_name.clone(),
                width,
                height,
                repaint: bridge.repaint_handle(),
            };
            let mut adapter = inner.adapter.lock();
            match adapter.create_widget(toolkit.as_ref(), &request) {
                Ok(()) => {
                    inner.widget_ready.store(true, Ordering::SeqCst);
                    // A resize that landed while the toolkit was busy only reached the target.
                    if let Some((target_width, target_height)) = bridge.size() {
                        let widget_size = adapter.widget().map(|widget| widget.size());
                        if widget_size != Some((target_width, target_height)) {
                            adapter.on_resize(target_width, target_height);
                        }
                    }
                    log::info!(
                        "create_widget({}): {} created at {}x{}",
                        inner.object_name,
                        inner.class_name,
                        width,
                        height
                    );
                }
                Err(e) => log::error!("create_widget({}): {}", inner.object_name, e),
            }
            bridge.paint(adapter.as_mut());
        });
    }

    /// Post a paint regardless of whether the widget exists yet. Coalesced
    /// with other queued paints.
    pub fn schedule_paint(&self) {
        if !self.accepting("schedule_paint") {
            return;
        }
        if self.inner.paint_queued.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = self.inner.clone();
        let queued = QueuedReset::new(move || inner.paint_queued.store(false, Ordering::SeqCst));
        self.post("schedule_paint", move |bridge| {
            drop(queued);
            let mut adapter = bridge.inner.adapter.lock();
            bridge.paint(adapter.as_mut());
        });
    }

    /// Invalidate the widget and repaint on the UI thread. No-op until the
    /// widget exists; coalesced with other queued invalidations.
    pub fn schedule_invalidate(&self) {
        if !self.accepting("schedule_invalidate") {
            return;
        }
        if !self.is_widget_ready() {
            log::debug!("schedule_invalidate({}): no widget yet", self.inner.object_name);
            return;
        }
        if self.inner.invalidate_queued.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = self.inner.clone();
        let queued = QueuedReset::new(move || inner.invalidate_queued.store(false, Ordering::SeqCst));
        self.post("schedule_invalidate", move |bridge| {
            drop(queued);
            let mut adapter = bridge.inner.adapter.lock();
            if adapter.widget().is_none() {
                return;
            }
            adapter.on_invalidate();
            bridge.paint(adapter.as_mut());
        });
    }

    /// Resize the render target now and the widget on the UI thread.
    ///
    /// The target size is updated before anything is posted, so any paint
    /// that starts afterwards already sees it. Queued resizes coalesce and the
    /// last requested size wins.
    pub fn schedule_resize(&self, width: u32, height: u32) {
        if !self.accepting("schedule_resize") {
            return;
        }
        let Some(target) = self.render_target() else {
            return;
        };
        {
            let mut guard = target.lock();
            if guard.native_handle().is_null() {
                log::debug!("schedule_resize({}): zero native handle, ignoring", self.inner.object_name);
                return;
            }
            guard.set_size(width, height);
        }
        log::info!("schedule_resize({}): {}x{}", self.inner.object_name, width, height);

        if !self.is_widget_ready() {
            return;
        }
        let first = self.inner.pending_resize.lock().replace((width, height)).is_none();
        if !first {
            return;
        }
        let inner = self.inner.clone();
        let queued = QueuedReset::new(move || {
            inner.pending_resize.lock().take();
        });
        self.post("schedule_resize", move |bridge| {
            let pending = bridge.inner.pending_resize.lock().take();
            queued.disarm();
            let Some((width, height)) = pending else {
                return;
            };
            let mut adapter = bridge.inner.adapter.lock();
            adapter.on_resize(width, height);
            adapter.on_invalidate();
            bridge.paint(adapter.as_mut());
        });
    }

    /// Replay a pointer event on the UI thread and repaint afterwards.
    ///
    /// Every event forces a full repaint: a widget that only scrolled does
    /// not invalidate itself.
    pub fn replay_input(&self, action: InputAction, x: i32, y: i32) {
        if !self.accepting("replay_input") {
            return;
        }
        if self.native_handle().is_null() {
            log::info!("replay_input({}): zero native handle, ignoring", self.inner.object_name);
            return;
        }
        if !self.is_widget_ready() {
            log::debug!("replay_input({}): no widget yet", self.inner.object_name);
            return;
        }
        let event = self
            .inner
            .gesture
            .lock()
            .stamp(action, x, y, self.inner.clock.as_ref());
        log::debug!(
            "replay_input({}): {:?} at ({}, {}) press={} t={}",
            self.inner.object_name,
            action,
            x,
            y,
            event.press_time,
            event.event_time
        );
        self.post("replay_input", move |bridge| {
            let mut adapter = bridge.inner.adapter.lock();
            if adapter.widget().is_none() {
                return;
            }
            adapter.deliver_input(&event);
            bump(&bridge.inner.counters.inputs_delivered);
            bridge.paint(adapter.as_mut());
        });
    }

    pub fn load_url(&self, url: impl Into<String>) {
        self.load(ViewContent::Url(url.into()));
    }

    pub fn load_html(&self, html: impl Into<String>, base_url: Option<String>) {
        self.load(ViewContent::Html {
            html: html.into(),
            base_url,
        });
    }

    fn load(&self, content: ViewContent) {
        if !self.accepting("load") {
            return;
        }
        self.post("load", move |bridge| {
            let mut adapter = bridge.inner.adapter.lock();
            if let Err(e) = adapter.load(content) {
                log::error!("load({}): {}", bridge.inner.object_name, e);
                return;
            }
            if adapter.widget().is_some() {
                bridge.paint(adapter.as_mut());
            }
        });
    }

    /// Handle the widget can use to request repaints. Does not keep the
    /// bridge alive.
    pub fn repaint_handle(&self) -> RepaintHandle {
        let weak: Weak<BridgeInner> = Arc::downgrade(&self.inner);
        RepaintHandle::new(move || {
            if let Some(inner) = weak.upgrade() {
                OffscreenBridge { inner }.schedule_paint();
            }
        })
    }

    fn accepting(&self, what: &str) -> bool {
        match self.state() {
            BridgeState::Uninitialized => {
                log::warn!("{}({}): view not initialized", what, self.inner.object_name);
                false
            }
            BridgeState::Destroyed => {
                log::debug!("{}({}): native peer destroyed, ignoring", what, self.inner.object_name);
                false
            }
            _ => true,
        }
    }

    /// UI context work is currently posted to.
    pub fn ui_context(&self) -> Result<UiContext> {
        self.inner
            .host
            .current_ui_context()
            .ok_or(OffscreenError::HostUnavailable)
    }

    fn post(&self, what: &str, task: impl FnOnce(&OffscreenBridge) + Send + 'static) -> bool {
        let context = match self.ui_context() {
            Ok(context) => context,
            Err(e) => {
                log::warn!("{}({}): {}, dropping", what, self.inner.object_name, e);
                return false;
            }
        };
        let bridge = self.clone();
        context.post(move || task(&bridge))
    }

    fn set_painting(&self, painting: bool) {
        let transitions: &[(BridgeState, BridgeState)] = if painting {
            &[
                (BridgeState::Bound, BridgeState::Painting),
                (BridgeState::Idle, BridgeState::Painting),
            ]
        } else {
            &[(BridgeState::Painting, BridgeState::Idle)]
        };
        for (from, to) in transitions {
            if self
                .inner
                .state
                .compare_exchange(*from as u8, *to as u8, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return;
            }
        }
    }

    /// Paint the adapter into the render target. UI thread only.
    fn paint(&self, adapter: &mut dyn ViewAdapter) {
        let inner = &self.inner;
        let Some(target) = inner.target.get() else {
            log::info!("paint({}): render target is not initialized yet", inner.object_name);
            return;
        };
        let mut guard = target.lock();
        let handle = guard.native_handle();
        if handle.is_null() {
            log::info!("paint({}): zero native handle, will not draw", inner.object_name);
            bump(&inner.counters.paints_skipped);
            return;
        }

        self.set_painting(true);
        let started = Instant::now();
        match guard.lock_surface() {
            Err(e) => {
                log::error!("paint({}): failed to lock surface: {}", inner.object_name, e);
                bump(&inner.counters.surface_failures);
            }
            Ok(mut surface) => {
                let view_size = adapter.widget().map(|widget| widget.size());
                if let Some((view_width, view_height)) = view_size {
                    log::trace!(
                        "paint({}): texture={} target={}x{} view={}x{}",
                        inner.object_name,
                        guard.texture_id(),
                        surface.width(),
                        surface.height(),
                        view_width,
                        view_height
                    );
                    if let Err(e) = adapter.paint(&mut surface) {
                        log::error!("paint({}): view painting failed: {}", inner.object_name, e);
                        bump(&inner.counters.paint_failures);
                    }
                } else {
                    log::info!(
                        "paint({}): view is not available yet, filling with fill color",
                        inner.object_name
                    );
                    surface.fill(guard.fill_color());
                    bump(&inner.counters.fallback_fills);
                }
                guard.refresh_from_surface(surface);
                // Still under the lock, so this cannot race a completed notify_destroyed.
                inner.callback.on_texture_updated(handle);
                bump(&inner.counters.paints_completed);
                log::debug!(
                    "paint({}): success, t={:.3}ms",
                    inner.object_name,
                    started.elapsed().as_secs_f64() * 1000.0
                );
            }
        }
        drop(guard);
        self.set_painting(false);
    }
}

impl std::fmt::Debug for OffscreenBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffscreenBridge")
            .field("class_name", &self.inner.class_name)
            .field("object_name", &self.inner.object_name)
            .field("state", &self.state())
            .field("native", &self.native_handle())
            .finish()
    }
}
