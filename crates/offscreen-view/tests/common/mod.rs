#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use offscreen_view::{
    ManualClock, NativeHandle, OffscreenBridge, OffscreenError, OffscreenWidget, PendingInput,
    Result, RgbaPixel, Surface, UiExecutor, ViewFactory, WidgetRequest, WidgetToolkit, ui_channel,
};
use parking_lot::Mutex;

pub const NATIVE: NativeHandle = NativeHandle::new(0xfeed);
pub const WIDGET_COLOR: RgbaPixel = RgbaPixel::new(200, 40, 40, 255);

/// Everything the fake widget saw.
#[derive(Default)]
pub struct Recorder {
    pub calls: Mutex<Vec<String>>,
    pub inputs: Mutex<Vec<PendingInput>>,
    pub requests: Mutex<Vec<(u32, u32)>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

struct FakeWidget {
    recorder: Arc<Recorder>,
    size: (u32, u32),
}

impl OffscreenWidget for FakeWidget {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn draw(&mut self, surface: &mut Surface) -> Result<()> {
        surface.fill(WIDGET_COLOR);
        self.recorder
            .calls
            .lock()
            .push(format!("draw {}x{}", surface.width(), surface.height()));
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.recorder.calls.lock().push(format!("resize {}x{}", width, height));
    }

    fn invalidate(&mut self) {
        self.recorder.calls.lock().push("invalidate".to_string());
    }

    fn touch_event(&mut self, event: &PendingInput) -> bool {
        self.recorder.inputs.lock().push(*event);
        true
    }

    fn load_url(&mut self, url: &str) -> Result<()> {
        self.recorder.calls.lock().push(format!("load {}", url));
        Ok(())
    }
}

pub fn recording_toolkit(recorder: Arc<Recorder>) -> Arc<dyn WidgetToolkit> {
    Arc::new(move |request: &WidgetRequest| -> Result<Box<dyn OffscreenWidget>> {
        recorder.requests.lock().push((request.width, request.height));
        Ok(Box::new(FakeWidget {
            recorder: recorder.clone(),
            size: (request.width, request.height),
        }))
    })
}

pub fn failing_toolkit() -> Arc<dyn WidgetToolkit> {
    Arc::new(|_: &WidgetRequest| -> Result<Box<dyn OffscreenWidget>> {
        Err(OffscreenError::WidgetCreation("toolkit unavailable".into()))
    })
}

/// A bridge wired to a manually driven UI executor.
pub struct Harness {
    pub bridge: OffscreenBridge,
    pub executor: UiExecutor,
    pub recorder: Arc<Recorder>,
    pub clock: Arc<ManualClock>,
    pub updates: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new(width: u32, height: u32) -> anyhow::Result<Self> {
        let recorder = Arc::new(Recorder::default());
        Self::with_toolkit(recording_toolkit(recorder.clone()), recorder, width, height)
    }

    pub fn without_widget(width: u32, height: u32) -> anyhow::Result<Self> {
        Self::with_toolkit(failing_toolkit(), Arc::new(Recorder::default()), width, height)
    }

    fn with_toolkit(
        toolkit: Arc<dyn WidgetToolkit>,
        recorder: Arc<Recorder>,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        let _ = env_logger::builder().is_test(true).try_init();
        let (context, executor) = ui_channel("test-ui");
        let updates = Arc::new(AtomicUsize::new(0));
        let counter = updates.clone();
        let callback = move |handle: NativeHandle| {
            assert_eq!(handle, NATIVE);
            counter.fetch_add(1, Ordering::SeqCst);
        };
        let clock = Arc::new(ManualClock::new(0));
        let factory = ViewFactory::new(Arc::new(context), toolkit, Arc::new(callback))
            .with_clock(clock.clone());
        let bridge = factory.create("OffscreenWebView", "test-view", NATIVE, 1, width, height)?;
        Ok(Self {
            bridge,
            executor,
            recorder,
            clock,
            updates,
        })
    }

    pub fn drain(&self) -> usize {
        self.executor.run_pending()
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}
