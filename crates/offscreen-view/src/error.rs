//! Error types for offscreen views.

use thiserror::Error;

/// Result type for offscreen view operations.
pub type Result<T> = std::result::Result<T, OffscreenError>;

/// Errors that can occur while creating or driving an offscreen view.
#[derive(Error, Debug)]
pub enum OffscreenError {
    /// No constructor is registered for the requested view type tag.
    #[error("unknown view type: {0}")]
    UnknownViewType(String),

    /// Requested texture size is unusable.
    #[error("invalid texture size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// Bridge has not been bound to a render target yet.
    #[error("view not initialized")]
    NotInitialized,

    /// Bridge was bound twice.
    #[error("view is already bound to a render target")]
    AlreadyBound,

    /// Native peer has been destroyed.
    #[error("native peer has been destroyed")]
    Destroyed,

    /// No drawable surface could be obtained for painting.
    #[error("surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// Widget paint routine failed.
    #[error("view paint failed: {0}")]
    PaintFailed(String),

    /// Widget could not load the requested content.
    #[error("content load failed: {0}")]
    LoadFailed(String),

    /// Widget toolkit failed to construct the widget.
    #[error("widget creation failed: {0}")]
    WidgetCreation(String),

    /// Host UI context is gone.
    #[error("host UI context is unavailable")]
    HostUnavailable,

    /// Operation not supported by this view type.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}
