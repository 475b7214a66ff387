//! Creates bridges by view type tag.

use std::collections::HashMap;
use std::sync::Arc;

use offscreen_config::OffscreenConfig;

use crate::adapter::{PlainViewAdapter, ViewAdapter, WebViewAdapter};
use crate::bridge::OffscreenBridge;
use crate::clock::{Clock, MonotonicClock};
use crate::error::{OffscreenError, Result};
use crate::host::HostContext;
use crate::native::{NativeCallback, NativeHandle};
use crate::render_target::RenderOptions;
use crate::widget::WidgetToolkit;

pub const DEFAULT_CLASS_NAME: &str = WebViewAdapter::CLASS_NAME;
pub const DEFAULT_OBJECT_NAME: &str = "MyWebView";
pub const DEFAULT_TEXTURE_SIZE: u32 = 512;

/// Parameters a view is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewParams {
    pub class_name: String,
    pub object_name: String,
    pub native: NativeHandle,
    pub texture_id: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            class_name: DEFAULT_CLASS_NAME.to_string(),
            object_name: DEFAULT_OBJECT_NAME.to_string(),
            native: NativeHandle::NULL,
            texture_id: 0,
            width: DEFAULT_TEXTURE_SIZE,
            height: DEFAULT_TEXTURE_SIZE,
        }
    }
}

/// Builds the adapter for one view type.
pub type AdapterConstructor = Arc<dyn Fn(&ViewParams) -> Box<dyn ViewAdapter> + Send + Sync>;

/// Tag to adapter registry plus the collaborators every created bridge shares.
///
/// Registered constructors take precedence over the built-in
/// `OffscreenWebView` and `OffscreenView` adapters.
pub struct ViewFactory {
    constructors: HashMap<String, AdapterConstructor>,
    defaults: ViewParams,
    host: Arc<dyn HostContext>,
    toolkit: Arc<dyn WidgetToolkit>,
    callback: Arc<dyn NativeCallback>,
    clock: Arc<dyn Clock>,
    options: RenderOptions,
}

impl ViewFactory {
    pub fn new(
        host: Arc<dyn HostContext>,
        toolkit: Arc<dyn WidgetToolkit>,
        callback: Arc<dyn NativeCallback>,
    ) -> Self {
        Self {
            constructors: HashMap::new(),
            defaults: ViewParams::default(),
            host,
            toolkit,
            callback,
            clock: Arc::new(MonotonicClock),
            options: RenderOptions::default(),
        }
    }

    /// Factory seeded with the view defaults and render options from `config`.
    pub fn from_config(
        config: &OffscreenConfig,
        host: Arc<dyn HostContext>,
        toolkit: Arc<dyn WidgetToolkit>,
        callback: Arc<dyn NativeCallback>,
    ) -> Self {
        let mut factory = Self::new(host, toolkit, callback).with_options(RenderOptions::from(&config.render));
        let view = &config.view;
        factory.set_class_name(view.class_name.clone());
        factory.set_object_name(view.object_name.clone());
        factory.set_texture(view.texture_id);
        factory.set_texture_width(view.texture_width);
        factory.set_texture_height(view.texture_height);
        factory
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Render options for created bridges. The fill color doubles as the
    /// background of built-in `OffscreenView` adapters.
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Register (or replace) the adapter constructor for `tag`.
    pub fn register<F>(&mut self, tag: impl Into<String>, constructor: F)
    where
        F: Fn(&ViewParams) -> Box<dyn ViewAdapter> + Send + Sync + 'static,
    {
        self.constructors.insert(tag.into(), Arc::new(constructor));
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
            || matches!(tag, WebViewAdapter::CLASS_NAME | PlainViewAdapter::CLASS_NAME)
    }

    fn builtin_adapter(&self, tag: &str, object_name: &str) -> Option<Box<dyn ViewAdapter>> {
        match tag {
            WebViewAdapter::CLASS_NAME => Some(Box::new(WebViewAdapter::new(object_name))),
            PlainViewAdapter::CLASS_NAME => Some(Box::new(PlainViewAdapter::new(
                object_name,
                self.options.fill_color,
            ))),
            _ => None,
        }
    }

    fn adapter_for(&self, params: &ViewParams) -> Option<Box<dyn ViewAdapter>> {
        match self.constructors.get(&params.class_name) {
            Some(constructor) => Some(constructor(params)),
            None => self.builtin_adapter(&params.class_name, &params.object_name),
        }
    }

    pub fn defaults(&self) -> &ViewParams {
        &self.defaults
    }

    pub fn set_class_name(&mut self, class_name: impl Into<String>) {
        self.defaults.class_name = class_name.into();
    }

    pub fn set_object_name(&mut self, object_name: impl Into<String>) {
        self.defaults.object_name = object_name.into();
    }

    pub fn set_texture(&mut self, texture_id: u32) {
        self.defaults.texture_id = texture_id;
    }

    pub fn set_texture_width(&mut self, width: u32) {
        self.defaults.width = width;
    }

    pub fn set_texture_height(&mut self, height: u32) {
        self.defaults.height = height;
    }

    pub fn set_native_handle(&mut self, native: NativeHandle) {
        self.defaults.native = native;
    }

    /// Create and bind a bridge, then post widget construction to the UI thread.
    pub fn create(
        &self,
        class_name: &str,
        object_name: &str,
        native: NativeHandle,
        texture_id: u32,
        width: u32,
        height: u32,
    ) -> Result<OffscreenBridge> {
        self.create_with(&ViewParams {
            class_name: class_name.to_string(),
            object_name: object_name.to_string(),
            native,
            texture_id,
            width,
            height,
        })
    }

    /// Create a bridge from the factory's current defaults.
    pub fn create_default(&self) -> Result<OffscreenBridge> {
        self.create_with(&self.defaults)
    }

    pub fn create_with(&self, params: &ViewParams) -> Result<OffscreenBridge> {
        if !self.is_registered(&params.class_name) {
            return Err(OffscreenError::UnknownViewType(params.class_name.clone()));
        }
        if params.width == 0 || params.height == 0 {
            return Err(OffscreenError::InvalidSize {
                width: params.width,
                height: params.height,
            });
        }
        let adapter = self
            .adapter_for(params)
            .ok_or_else(|| OffscreenError::UnknownViewType(params.class_name.clone()))?;

        let bridge = OffscreenBridge::builder(adapter, self.host.clone())
            .with_class_name(params.class_name.clone())
            .with_object_name(params.object_name.clone())
            .with_callback(self.callback.clone())
            .with_clock(self.clock.clone())
            .with_options(self.options.clone())
            .build();
        bridge.bind(params.native, params.texture_id, params.width, params.height)?;
        log::info!(
            "create({}): class={} native={} texture={} size={}x{}",
            params.object_name,
            params.class_name,
            params.native,
            params.texture_id,
            params.width,
            params.height
        );
        bridge.create_widget(self.toolkit.clone());
        Ok(bridge)
    }
}
