//! Contracts the external UI toolkit has to fulfil.

use std::fmt;
use std::sync::Arc;

use crate::error::{OffscreenError, Result};
use crate::frame::Surface;
use crate::input::PendingInput;

/// A toolkit widget. Only ever touched on the UI thread.
pub trait OffscreenWidget: Send {
    /// Current widget size in pixels.
    fn size(&self) -> (u32, u32);

    /// Draw the widget into `surface`.
    fn draw(&mut self, surface: &mut Surface) -> Result<()>;

    fn resize(&mut self, width: u32, height: u32);

    /// Mark the widget's content as stale.
    fn invalidate(&mut self);

    /// Deliver a pointer event. Returns whether the widget consumed it.
    fn touch_event(&mut self, event: &PendingInput) -> bool;

    fn load_url(&mut self, _url: &str) -> Result<()> {
        Err(OffscreenError::Unsupported("load_url"))
    }

    fn load_html(&mut self, _html: &str, _base_url: Option<&str>) -> Result<()> {
        Err(OffscreenError::Unsupported("load_html"))
    }
}

/// Lets a widget ask for a repaint when its content changes on its own
/// (a page finishing loading, an animation tick). Posts to the UI thread.
#[derive(Clone)]
pub struct RepaintHandle {
    request: Arc<dyn Fn() + Send + Sync>,
}

impl RepaintHandle {
    pub fn new(request: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            request: Arc::new(request),
        }
    }

    /// Handle that ignores every request.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn request_repaint(&self) {
        (self.request)()
    }
}

impl fmt::Debug for RepaintHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RepaintHandle")
    }
}

/// Parameters handed to the toolkit when a widget is constructed.
#[derive(Debug, Clone)]
pub struct WidgetRequest {
    pub class_name: String,
    pub object_name: String,
    pub width: u32,
    pub height: u32,
    pub repaint: RepaintHandle,
}

/// Constructs widgets on the UI thread.
pub trait WidgetToolkit: Send + Sync {
    fn create_widget(&self, request: &WidgetRequest) -> Result<Box<dyn OffscreenWidget>>;
}

impl<F> WidgetToolkit for F
where
    F: Fn(&WidgetRequest) -> Result<Box<dyn OffscreenWidget>> + Send + Sync,
{
    fn create_widget(&self, request: &WidgetRequest) -> Result<Box<dyn OffscreenWidget>> {
        self(request)
    }
}

/// Content to show in a web view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewContent {
    Url(String),
    Html { html: String, base_url: Option<String> },
}
