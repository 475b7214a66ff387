//! View adapters: the bridge-facing face of a family of toolkit widgets.
//!
//! Each variant owns its widget once the toolkit has built it and knows how to
//! paint, resize and invalidate it. The bridge only talks to [`ViewAdapter`].

use crate::error::{OffscreenError, Result};
use crate::frame::{RgbaPixel, Surface};
use crate::input::PendingInput;
use crate::widget::{OffscreenWidget, ViewContent, WidgetRequest, WidgetToolkit};

/// Capability set of an offscreen view. Lives on the UI thread.
pub trait ViewAdapter: Send {
    /// Type tag this adapter was registered under.
    fn class_name(&self) -> &str;

    /// The widget, once the toolkit has created it.
    fn widget(&self) -> Option<&dyn OffscreenWidget>;

    fn create_widget(&mut self, toolkit: &dyn WidgetToolkit, request: &WidgetRequest) -> Result<()>;

    /// Drop the widget.
    fn release_widget(&mut self);

    /// Paint the widget into `surface`.
    fn paint(&mut self, surface: &mut Surface) -> Result<()>;

    fn on_resize(&mut self, width: u32, height: u32);

    fn on_invalidate(&mut self);

    /// Hand a replayed pointer event to the widget.
    fn deliver_input(&mut self, event: &PendingInput) -> bool;

    fn load(&mut self, _content: ViewContent) -> Result<()> {
        Err(OffscreenError::Unsupported("load"))
    }
}

fn apply_content(widget: &mut dyn OffscreenWidget, content: &ViewContent) -> Result<()> {
    match content {
        ViewContent::Url(url) => widget.load_url(url),
        ViewContent::Html { html, base_url } => widget.load_html(html, base_url.as_deref()),
    }
}

/// Web-content view.
///
/// Content requested before the widget exists is remembered and loaded as
/// soon as the toolkit delivers the widget.
pub struct WebViewAdapter {
    object_name: String,
    widget: Option<Box<dyn OffscreenWidget>>,
    pending_content: Option<ViewContent>,
    content: Option<ViewContent>,
}

impl WebViewAdapter {
    pub const CLASS_NAME: &'static str = "OffscreenWebView";

    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            widget: None,
            pending_content: None,
            content: None,
        }
    }

    /// Content most recently loaded into the widget.
    pub fn content(&self) -> Option<&ViewContent> {
        self.content.as_ref()
    }

    pub fn pending_content(&self) -> Option<&ViewContent> {
        self.pending_content.as_ref()
    }
}

impl ViewAdapter for WebViewAdapter {
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    fn widget(&self) -> Option<&dyn OffscreenWidget> {
        self.widget.as_deref()
    }

    fn create_widget(&mut self, toolkit: &dyn WidgetToolkit, request: &WidgetRequest) -> Result<()> {
        if self.widget.is_some() {
            log::debug!("WebViewAdapter({}): widget already exists", self.object_name);
            return Ok(());
        }
        let mut widget = toolkit.create_widget(request)?;
        if let Some(content) = self.pending_content.take() {
            match apply_content(widget.as_mut(), &content) {
                Ok(()) => self.content = Some(content),
                Err(e) => log::error!(
                    "WebViewAdapter({}): failed to load deferred content: {}",
                    self.object_name,
                    e
                ),
            }
        }
        self.widget = Some(widget);
        Ok(())
    }

    fn release_widget(&mut self) {
        self.widget = None;
    }

    fn paint(&mut self, surface: &mut Surface) -> Result<()> {
        match self.widget.as_mut() {
            Some(widget) => widget.draw(surface),
            None => Err(OffscreenError::NotInitialized),
        }
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        if let Some(widget) = self.widget.as_mut() {
            widget.resize(width, height);
        }
    }

    fn on_invalidate(&mut self) {
        if let Some(widget) = self.widget.as_mut() {
            widget.invalidate();
        }
    }

    fn deliver_input(&mut self, event: &PendingInput) -> bool {
        self.widget
            .as_mut()
            .map(|widget| widget.touch_event(event))
            .unwrap_or(false)
    }

    fn load(&mut self, content: ViewContent) -> Result<()> {
        match self.widget.as_mut() {
            Some(widget) => {
                apply_content(widget.as_mut(), &content)?;
                self.content = Some(content);
            }
            None => {
                log::debug!(
                    "WebViewAdapter({}): widget not created yet, deferring load",
                    self.object_name
                );
                self.pending_content = Some(content);
            }
        }
        Ok(())
    }
}

/// Generic view. Clears to its background before the widget draws, so
/// widgets with transparent regions never show stale pixels.
pub struct PlainViewAdapter {
    object_name: String,
    background: RgbaPixel,
    widget: Option<Box<dyn OffscreenWidget>>,
}

impl PlainViewAdapter {
    pub const CLASS_NAME: &'static str = "OffscreenView";

    pub fn new(object_name: impl Into<String>, background: RgbaPixel) -> Self {
        Self {
            object_name: object_name.into(),
            background,
            widget: None,
        }
    }
}

impl ViewAdapter for PlainViewAdapter {
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    fn widget(&self) -> Option<&dyn OffscreenWidget> {
        self.widget.as_deref()
    }

    fn create_widget(&mut self, toolkit: &dyn WidgetToolkit, request: &WidgetRequest) -> Result<()> {
        if self.widget.is_none() {
            self.widget = Some(toolkit.create_widget(request)?);
        } else {
            log::debug!("PlainViewAdapter({}): widget already exists", self.object_name);
        }
        Ok(())
    }

    fn release_widget(&mut self) {
        self.widget = None;
    }

    fn paint(&mut self, surface: &mut Surface) -> Result<()> {
        let widget = self.widget.as_mut().ok_or(OffscreenError::NotInitialized)?;
        surface.fill(self.background);
        widget.draw(surface)
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        if let Some(widget) = self.widget.as_mut() {
            widget.resize(width, height);
        }
    }

    fn on_invalidate(&mut self) {
        if let Some(widget) = self.widget.as_mut() {
            widget.invalidate();
        }
    }

    fn deliver_input(&mut self, event: &PendingInput) -> bool {
        self.widget
            .as_mut()
            .map(|widget| widget.touch_event(event))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputAction;
    use crate::widget::RepaintHandle;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Log {
        calls: Vec<String>,
    }

    struct StubWidget {
        log: Arc<Mutex<Log>>,
        size: (u32, u32),
    }

    impl OffscreenWidget for StubWidget {
        fn size(&self) -> (u32, u32) {
            self.size
        }

        fn draw(&mut self, surface: &mut Surface) -> Result<()> {
            surface.fill_rect(0, 0, 1, 1, RgbaPixel::BLACK);
            self.log.lock().unwrap().calls.push("draw".into());
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.size = (width, height);
            self.log.lock().unwrap().calls.push(format!("resize {}x{}", width, height));
        }

        fn invalidate(&mut self) {
            self.log.lock().unwrap().calls.push("invalidate".into());
        }

        fn touch_event(&mut self, event: &PendingInput) -> bool {
            self.log.lock().unwrap().calls.push(format!("touch {:?}", event.action));
            true
        }

        fn load_url(&mut self, url: &str) -> Result<()> {
            self.log.lock().unwrap().calls.push(format!("load {}", url));
            Ok(())
        }
    }

    fn toolkit(log: Arc<Mutex<Log>>) -> impl WidgetToolkit {
        move |request: &WidgetRequest| -> Result<Box<dyn OffscreenWidget>> {
            Ok(Box::new(StubWidget {
                log: log.clone(),
                size: (request.width, request.height),
            }))
        }
    }

    fn request() -> WidgetRequest {
        WidgetRequest {
            class_name: WebViewAdapter::CLASS_NAME.into(),
            object_name: "test".into(),
            width: 4,
            height: 4,
            repaint: RepaintHandle::noop(),
        }
    }

    #[test]
    fn web_view_defers_content_until_widget_exists() {
        let log = Arc::new(Mutex::new(Log::default()));
        let mut adapter = WebViewAdapter::new("test");

        adapter.load(ViewContent::Url("about:blank".into())).unwrap();
        assert!(adapter.widget().is_none());
        assert!(adapter.pending_content().is_some());

        adapter.create_widget(&toolkit(log.clone()), &request()).unwrap();
        assert_eq!(adapter.widget().map(|w| w.size()), Some((4, 4)));
        assert_eq!(adapter.content(), Some(&ViewContent::Url("about:blank".into())));
        assert_eq!(log.lock().unwrap().calls, vec!["load about:blank".to_string()]);
    }

    #[test]
    fn web_view_forwards_to_widget() {
        let log = Arc::new(Mutex::new(Log::default()));
        let mut adapter = WebViewAdapter::new("test");
        adapter.create_widget(&toolkit(log.clone()), &request()).unwrap();

        adapter.on_resize(8, 2);
        adapter.on_invalidate();
        let event = PendingInput {
            action: InputAction::Down,
            x: 1,
            y: 1,
            press_time: 0,
            event_time: 0,
        };
        assert!(adapter.deliver_input(&event));
        let mut surface = Surface::new(2, 2);
        adapter.paint(&mut surface).unwrap();

        assert_eq!(
            log.lock().unwrap().calls,
            vec!["resize 8x2", "invalidate", "touch Down", "draw"]
        );
    }

    #[test]
    fn paint_without_widget_is_an_error() {
        let mut adapter = WebViewAdapter::new("test");
        let mut surface = Surface::new(1, 1);
        assert!(matches!(adapter.paint(&mut surface), Err(OffscreenError::NotInitialized)));
        assert!(!adapter.deliver_input(&PendingInput {
            action: InputAction::Move,
            x: 0,
            y: 0,
            press_time: 0,
            event_time: 0,
        }));
    }

    #[test]
    fn plain_view_clears_background_before_drawing() {
        let log = Arc::new(Mutex::new(Log::default()));
        let background = RgbaPixel::new(10, 20, 30, 255);
        let mut adapter = PlainViewAdapter::new("plain", background);
        adapter.create_widget(&toolkit(log), &request()).unwrap();

        let mut surface = Surface::new(2, 2);
        adapter.paint(&mut surface).unwrap();
        assert_eq!(surface.pixel(0, 0), Some(RgbaPixel::BLACK));
        assert_eq!(surface.pixel(1, 1), Some(background));
        assert!(matches!(
            adapter.load(ViewContent::Url("x".into())),
            Err(OffscreenError::Unsupported(_))
        ));
    }

    #[test]
    fn release_drops_widget() {
        let log = Arc::new(Mutex::new(Log::default()));
        let mut adapter = PlainViewAdapter::new("plain", RgbaPixel::WHITE);
        adapter.create_widget(&toolkit(log), &request()).unwrap();
        adapter.release_widget();
        assert!(adapter.widget().is_none());
    }
}
