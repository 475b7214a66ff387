//! Offscreen views: render a UI-toolkit widget into a texture owned by a
//! native consumer running on its own thread.
//!
//! The widget lives on the UI thread and is painted there into a
//! [`SharedRenderTarget`]. The consumer latches finished frames with
//! [`OffscreenBridge::request_texture_refresh`] and reads the texture
//! transform, while resize, invalidate and pointer input requests are posted
//! back to the UI thread through a [`UiContext`].
//!
//! Bridges are usually created through a [`ViewFactory`], which maps a view
//! type tag (`"OffscreenWebView"`, `"OffscreenView"`, or anything registered
//! later) to a [`ViewAdapter`].

mod adapter;
mod bridge;
mod clock;
mod error;
mod factory;
mod frame;
mod host;
mod input;
mod native;
mod render_target;
mod transform;
mod ui;
mod widget;

pub use adapter::{PlainViewAdapter, ViewAdapter, WebViewAdapter};
pub use bridge::{BridgeBuilder, BridgeState, BridgeStats, OffscreenBridge};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::{OffscreenError, Result};
pub use factory::{
    AdapterConstructor, DEFAULT_CLASS_NAME, DEFAULT_OBJECT_NAME, DEFAULT_TEXTURE_SIZE, ViewFactory,
    ViewParams,
};
pub use frame::{RgbaPixel, Surface};
pub use host::{HostContext, HostContextRegistry, global_host};
pub use input::{GestureTracker, InputAction, PendingInput};
pub use native::{NativeCallback, NativeHandle, NoopCallback};
pub use render_target::{RenderOptions, SharedRenderTarget, TargetGuard};
pub use transform::TextureTransform;
pub use ui::{UiContext, UiExecutor, UiTask, UiThread, ui_channel};
pub use widget::{OffscreenWidget, RepaintHandle, ViewContent, WidgetRequest, WidgetToolkit};
