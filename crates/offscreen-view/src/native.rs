//! Native peer handle and the update callback.

use std::fmt;

/// Opaque identifier of the native peer object.
///
/// The bridge never owns the peer; it only keeps the value and drops it when
/// the peer reports its destruction. Zero means "no peer".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeHandle(u64);

impl NativeHandle {
    pub const NULL: NativeHandle = NativeHandle(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for NativeHandle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle({:#x})", self.0)
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// One-way notification to the native consumer that new pixels are ready.
///
/// Invoked on the UI thread while the render target lock is held, so it must
/// not call back into the bridge synchronously. Implementations should only
/// enqueue work for the consumer thread.
pub trait NativeCallback: Send + Sync {
    fn on_texture_updated(&self, handle: NativeHandle);
}

impl<F> NativeCallback for F
where
    F: Fn(NativeHandle) + Send + Sync,
{
    fn on_texture_updated(&self, handle: NativeHandle) {
        self(handle)
    }
}

/// Callback that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallback;

impl NativeCallback for NoopCallback {
    fn on_texture_updated(&self, _handle: NativeHandle) {}
}
