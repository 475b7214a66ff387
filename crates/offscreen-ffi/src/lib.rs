//! C ABI for embedding offscreen views in a native engine.
//!
//! The native side owns the UI loop: it attaches a UI executor on its UI
//! thread, pumps it with `offscreen_ui_run_pending`, and drives each view by
//! the id returned from `offscreen_create_view`. Widgets come from a toolkit
//! registered through a table of C callbacks.

pub mod ffi;

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CString, c_char, c_void};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, anyhow};
use offscreen_config::OffscreenConfig;
use offscreen_view::{
    NativeCallback, NativeHandle, OffscreenBridge, OffscreenError, OffscreenWidget,
    PendingInput, Surface, UiExecutor, ViewFactory, WidgetRequest, WidgetToolkit, global_host,
    ui_channel,
};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};

/// Notification that a view published a new frame. Called on the UI thread
/// with the render target locked; must not call back into this library.
pub type TextureUpdatedFn = extern "C" fn(native: u64);

/// Callbacks backing one foreign widget. `user_data` is passed back verbatim.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct OffscreenWidgetCallbacks {
    pub user_data: *mut c_void,
    /// Draw into RGBA8 `pixels` (`stride` bytes per row). Returns success.
    pub draw: Option<extern "C" fn(*mut c_void, *mut u8, u32, u32, u32) -> bool>,
    pub resize: Option<extern "C" fn(*mut c_void, u32, u32)>,
    pub invalidate: Option<extern "C" fn(*mut c_void)>,
    /// `(user_data, action, x, y, press_time, event_time)`; returns whether consumed.
    pub touch: Option<extern "C" fn(*mut c_void, i32, i32, i32, u64, u64) -> bool>,
    pub load_url: Option<extern "C" fn(*mut c_void, *const c_char) -> bool>,
    /// Called once when the widget is dropped.
    pub release: Option<extern "C" fn(*mut c_void)>,
}

/// Toolkit entry point: fill `out` for a widget of the given type and size.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct OffscreenToolkitCallbacks {
    pub user_data: *mut c_void,
    pub create_widget: Option<
        extern "C" fn(
            *mut c_void,
            *const c_char,
            *const c_char,
            u32,
            u32,
            *mut OffscreenWidgetCallbacks,
        ) -> bool,
    >,
}

struct ForeignWidget {
    callbacks: OffscreenWidgetCallbacks,
    size: (u32, u32),
}

// Only ever used on the UI thread the toolkit created it on.
unsafe impl Send for ForeignWidget {}

impl OffscreenWidget for ForeignWidget {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn draw(&mut self, surface: &mut Surface) -> offscreen_view::Result<()> {
        let Some(draw) = self.callbacks.draw else {
            return Ok(());
        };
        let (width, height, stride) = (surface.width(), surface.height(), surface.stride());
        let pixels = surface.as_bytes_mut().as_mut_ptr();
        if draw(self.callbacks.user_data, pixels, width, height, stride) {
            Ok(())
        } else {
            Err(OffscreenError::PaintFailed("foreign draw callback failed".into()))
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        if let Some(resize) = self.callbacks.resize {
            resize(self.callbacks.user_data, width, height);
        }
    }

    fn invalidate(&mut self) {
        if let Some(invalidate) = self.callbacks.invalidate {
            invalidate(self.callbacks.user_data);
        }
    }

    fn touch_event(&mut self, event: &PendingInput) -> bool {
        match self.callbacks.touch {
            Some(touch) => touch(
                self.callbacks.user_data,
                event.action.raw(),
                event.x,
                event.y,
                event.press_time,
                event.event_time,
            ),
            None => false,
        }
    }

    fn load_url(&mut self, url: &str) -> offscreen_view::Result<()> {
        let Some(load_url) = self.callbacks.load_url else {
            return Err(OffscreenError::Unsupported("load_url"));
        };
        let url = CString::new(url).map_err(|e| OffscreenError::LoadFailed(e.to_string()))?;
        if load_url(self.callbacks.user_data, url.as_ptr()) {
            Ok(())
        } else {
            Err(OffscreenError::LoadFailed(format!(
                "foreign load_url callback refused {}",
                url.to_string_lossy()
            )))
        }
    }
}

impl Drop for ForeignWidget {
    fn drop(&mut self) {
        if let Some(release) = self.callbacks.release {
            release(self.callbacks.user_data);
        }
    }
}

struct ForeignToolkit {
    callbacks: OffscreenToolkitCallbacks,
}

// The toolkit callbacks are only invoked from the UI thread.
unsafe impl Send for ForeignToolkit {}
unsafe impl Sync for ForeignToolkit {}

impl WidgetToolkit for ForeignToolkit {
    fn create_widget(&self, request: &WidgetRequest) -> offscreen_view::Result<Box<dyn OffscreenWidget>> {
        let create = self
            .callbacks
            .create_widget
            .ok_or_else(|| OffscreenError::WidgetCreation("toolkit has no create_widget".into()))?;
        let class_name = CString::new(request.class_name.as_str())
            .map_err(|e| OffscreenError::WidgetCreation(e.to_string()))?;
        let object_name = CString::new(request.object_name.as_str())
            .map_err(|e| OffscreenError::WidgetCreation(e.to_string()))?;

        let mut callbacks = OffscreenWidgetCallbacks {
            user_data: std::ptr::null_mut(),
            draw: None,
            resize: None,
            invalidate: None,
            touch: None,
            load_url: None,
            release: None,
        };
        let ok = create(
            self.callbacks.user_data,
            class_name.as_ptr(),
            object_name.as_ptr(),
            request.width,
            request.height,
            &mut callbacks,
        );
        if !ok {
            return Err(OffscreenError::WidgetCreation(format!(
                "toolkit refused {} '{}'",
                request.class_name, request.object_name
            )));
        }
        Ok(Box::new(ForeignWidget {
            callbacks,
            size: (request.width, request.height),
        }))
    }
}

/// Toolkit used when the native side has not registered one. Every view
/// then shows the fill color.
struct MissingToolkit;

impl WidgetToolkit for MissingToolkit {
    fn create_widget(&self, request: &WidgetRequest) -> offscreen_view::Result<Box<dyn OffscreenWidget>> {
        Err(OffscreenError::WidgetCreation(format!(
            "no widget toolkit registered for {}",
            request.class_name
        )))
    }
}

struct ForeignCallback(Option<TextureUpdatedFn>);

impl NativeCallback for ForeignCallback {
    fn on_texture_updated(&self, handle: NativeHandle) {
        if let Some(callback) = self.0 {
            callback(handle.raw());
        }
    }
}

static CONFIG: Lazy<OffscreenConfig> = Lazy::new(OffscreenConfig::load);
static TOOLKIT: Lazy<RwLock<Option<Arc<dyn WidgetToolkit>>>> = Lazy::new(|| RwLock::new(None));
static VIEWS: Lazy<Mutex<HashMap<u64, OffscreenBridge>>> = Lazy::new(|| Mutex::new(HashMap::new()));
static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static UI_EXECUTOR: RefCell<Option<UiExecutor>> = const { RefCell::new(None) };
}

pub fn config() -> &'static OffscreenConfig {
    &CONFIG
}

/// Make the calling thread the UI thread for every view.
pub fn attach_ui_thread() {
    let label = std::thread::current()
        .name()
        .unwrap_or("offscreen-ui")
        .to_string();
    let (context, executor) = ui_channel(label);
    global_host().set_default(Some(context));
    UI_EXECUTOR.with(|slot| *slot.borrow_mut() = Some(executor));
}

pub fn detach_ui_thread() -> bool {
    let executor = UI_EXECUTOR.with(|slot| slot.borrow_mut().take());
    if executor.is_some() {
        global_host().set_default(None);
    }
    executor.is_some()
}

/// Run queued UI work. `None` if this thread is not the attached UI thread.
pub fn run_ui_pending() -> Option<usize> {
    UI_EXECUTOR.with(|slot| slot.borrow().as_ref().map(UiExecutor::run_pending))
}

/// Register the foreign widget toolkit; `None` removes it.
pub fn set_toolkit(callbacks: Option<OffscreenToolkitCallbacks>) {
    let toolkit = callbacks.map(|callbacks| Arc::new(ForeignToolkit { callbacks }) as Arc<dyn WidgetToolkit>);
    *TOOLKIT.write() = toolkit;
}

fn current_toolkit() -> Arc<dyn WidgetToolkit> {
    TOOLKIT
        .read()
        .clone()
        .unwrap_or_else(|| Arc::new(MissingToolkit))
}

/// Create a view and return its id. `None` names fall back to the configured defaults.
pub fn create_view(
    class_name: Option<&str>,
    object_name: Option<&str>,
    native: u64,
    texture_id: u32,
    width: u32,
    height: u32,
    on_update: Option<TextureUpdatedFn>,
) -> Result<u64> {
    let factory = ViewFactory::from_config(
        config(),
        global_host(),
        current_toolkit(),
        Arc::new(ForeignCallback(on_update)),
    );
    let defaults = factory.defaults();
    let class_name = class_name.unwrap_or(defaults.class_name.as_str());
    let object_name = object_name.unwrap_or(defaults.object_name.as_str());
    let bridge = factory
        .create(class_name, object_name, NativeHandle::new(native), texture_id, width, height)
        .with_context(|| format!("creating {} '{}'", class_name, object_name))?;

    let id = NEXT_VIEW_ID.fetch_add(1, Ordering::SeqCst);
    VIEWS.lock().insert(id, bridge);
    Ok(id)
}

/// Destroy and forget a view.
pub fn release_view(id: u64) -> Result<()> {
    let bridge = VIEWS
        .lock()
        .remove(&id)
        .ok_or_else(|| anyhow!("unknown view id {}", id))?;
    bridge.notify_destroyed();
    Ok(())
}

/// Run `f` on a registered view. The registry lock is not held while `f` runs.
pub fn with_view<F, R>(id: u64, f: F) -> Option<R>
where
    F: FnOnce(&OffscreenBridge) -> R,
{
    let bridge = VIEWS.lock().get(&id).cloned();
    match bridge {
        Some(bridge) => Some(f(&bridge)),
        None => {
            log::warn!("unknown view id {}", id);
            None
        }
    }
}

pub fn view_count() -> usize {
    VIEWS.lock().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn refuse_url(_: *mut c_void, _url: *const c_char) -> bool {
        false
    }

    fn widget(load_url: Option<extern "C" fn(*mut c_void, *const c_char) -> bool>) -> ForeignWidget {
        ForeignWidget {
            callbacks: OffscreenWidgetCallbacks {
                user_data: std::ptr::null_mut(),
                draw: None,
                resize: None,
                invalidate: None,
                touch: None,
                load_url,
                release: None,
            },
            size: (1, 1),
        }
    }

    #[test]
    fn refused_navigation_is_a_load_error() {
        let mut refusing = widget(Some(refuse_url));
        assert!(matches!(
            refusing.load_url("https://example.com/"),
            Err(OffscreenError::LoadFailed(_))
        ));
        assert!(matches!(
            refusing.load_url("bad\0url"),
            Err(OffscreenError::LoadFailed(_))
        ));
        assert!(matches!(
            widget(None).load_url("https://example.com/"),
            Err(OffscreenError::Unsupported("load_url"))
        ));
    }
}
