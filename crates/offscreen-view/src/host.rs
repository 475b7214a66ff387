//! Access to the host application's UI context.
//!
//! The registry keeps a default context (normally the application's main UI
//! loop) and an optional custom one that, when set, takes precedence.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::ui::UiContext;

/// Accessor for the current UI context. `None` means work cannot be posted.
pub trait HostContext: Send + Sync {
    fn current_ui_context(&self) -> Option<UiContext>;
}

impl HostContext for UiContext {
    fn current_ui_context(&self) -> Option<UiContext> {
        Some(self.clone())
    }
}

/// Default plus custom UI context.
#[derive(Default)]
pub struct HostContextRegistry {
    default: RwLock<Option<UiContext>>,
    custom: RwLock<Option<UiContext>>,
}

impl HostContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(context: UiContext) -> Self {
        let registry = Self::new();
        registry.set_default(Some(context));
        registry
    }

    pub fn set_default(&self, context: Option<UiContext>) {
        *self.default.write() = context;
    }

    /// Override the default context; `None` removes the override.
    pub fn set_custom(&self, context: Option<UiContext>) {
        *self.custom.write() = context;
    }

    pub fn custom_set(&self) -> bool {
        self.custom.read().is_some()
    }

    pub fn clear(&self) {
        self.set_custom(None);
        self.set_default(None);
    }
}

impl HostContext for HostContextRegistry {
    fn current_ui_context(&self) -> Option<UiContext> {
        if let Some(custom) = self.custom.read().as_ref() {
            return Some(custom.clone());
        }
        self.default.read().clone()
    }
}

static GLOBAL_HOST: Lazy<Arc<HostContextRegistry>> =
    Lazy::new(|| Arc::new(HostContextRegistry::new()));

/// Process-wide registry used by the C ABI and the demo.
pub fn global_host() -> Arc<HostContextRegistry> {
    GLOBAL_HOST.clone()
}
