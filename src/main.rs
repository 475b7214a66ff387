use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use offscreen_config::OffscreenConfig;
use offscreen_view::{
    InputAction, NativeHandle, OffscreenBridge, OffscreenWidget, PendingInput, RepaintHandle,
    RgbaPixel, Surface, UiThread, ViewFactory, WidgetRequest, global_host,
};

const DEMO_NATIVE: NativeHandle = NativeHandle::new(0x0ff5c2ee);

/// Stand-in for a toolkit widget: a gradient with the last touch point marked.
struct GradientWidget {
    size: (u32, u32),
    touch: Option<(i32, i32)>,
    generation: u32,
    repaint: RepaintHandle,
}

impl OffscreenWidget for GradientWidget {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn draw(&mut self, surface: &mut Surface) -> offscreen_view::Result<()> {
        let (width, height) = surface.size();
        let shade = (self.generation.wrapping_mul(16) % 256) as u8;
        for y in 0..height {
            let green = (y * 255 / height.max(1)) as u8;
            for (x, px) in surface.row_mut(y).iter_mut().enumerate() {
                let red = (x as u32 * 255 / width.max(1)) as u8;
                *px = RgbaPixel::new(red, green, shade, 255);
            }
        }
        if let Some((x, y)) = self.touch {
            let (x, y) = (x.max(0) as u32, y.max(0) as u32);
            surface.fill_rect(x.saturating_sub(4), y.saturating_sub(4), 9, 9, RgbaPixel::WHITE);
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn touch_event(&mut self, event: &PendingInput) -> bool {
        log::debug!(
            "touch {:?} at ({}, {}) held for {}ms",
            event.action,
            event.x,
            event.y,
            event.event_time.saturating_sub(event.press_time)
        );
        self.touch = match event.action {
            InputAction::Up | InputAction::Cancel => None,
            _ => Some((event.x, event.y)),
        };
        true
    }

    fn load_url(&mut self, url: &str) -> offscreen_view::Result<()> {
        log::info!("loading {}", url);
        self.generation = 0;
        self.repaint.request_repaint();
        Ok(())
    }
}

fn average_color(bridge: &OffscreenBridge) -> Option<[u8; 4]> {
    bridge.with_latest_frame(|frame| {
        let pixels = frame.to_packed_pixels();
        let bytes: &[u8] = bytemuck::cast_slice(&pixels);
        let count = pixels.len().max(1) as u64;
        let mut sums = [0u64; 4];
        for px in bytes.chunks_exact(4) {
            for (sum, channel) in sums.iter_mut().zip(px) {
                *sum += u64::from(*channel);
            }
        }
        sums.map(|sum| (sum / count) as u8)
    })
}

/// Twice as wide, half as tall.
fn stretched((width, height): (u32, u32)) -> (u32, u32) {
    (width.saturating_mul(2), height / 2 + 1)
}

/// Wait for the next frame notification and latch it.
fn next_frame(bridge: &OffscreenBridge, frames: &mpsc::Receiver<NativeHandle>) -> Result<()> {
    frames
        .recv_timeout(Duration::from_secs(2))
        .context("timed out waiting for a frame")?;
    while frames.try_recv().is_ok() {}
    if bridge.request_texture_refresh() {
        let size = bridge.with_latest_frame(|frame| frame.size());
        log::info!(
            "frame {:?} avg={:?} uv_scale=({}, {})",
            size,
            average_color(bridge),
            bridge.transform_component(0),
            bridge.transform_component(5)
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let config = OffscreenConfig::load();
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filter) = config.logging.filter.as_deref() {
        logger.parse_filters(filter);
    }
    let _ = logger.try_init();

    let ui = UiThread::spawn("offscreen-ui").context("spawning UI thread")?;
    global_host().set_default(Some(ui.context()));

    let (tx, frames) = mpsc::channel();
    let on_update = move |handle: NativeHandle| {
        let _ = tx.send(handle);
    };
    let toolkit = |request: &WidgetRequest| -> offscreen_view::Result<Box<dyn OffscreenWidget>> {
        Ok(Box::new(GradientWidget {
            size: (request.width, request.height),
            touch: None,
            generation: 0,
            repaint: request.repaint.clone(),
        }))
    };

    let mut factory = ViewFactory::from_config(&config, global_host(), Arc::new(toolkit), Arc::new(on_update));
    factory.set_native_handle(DEMO_NATIVE);
    let bridge = factory.create_default()?;
    log::info!("created {:?}", bridge);

    next_frame(&bridge, &frames)?;

    bridge.load_url("https://example.com/");
    next_frame(&bridge, &frames)?;

    let (width, height) = stretched(bridge.size().unwrap_or((0, 0)));
    bridge.schedule_resize(width, height);
    next_frame(&bridge, &frames)?;

    for (action, x, y) in [
        (InputAction::Down, 20, 20),
        (InputAction::Move, 40, 30),
        (InputAction::Up, 40, 30),
    ] {
        bridge.replay_input(action, x, y);
        std::thread::sleep(Duration::from_millis(10));
        next_frame(&bridge, &frames)?;
    }

    bridge.notify_destroyed();
    bridge.schedule_invalidate();
    log::info!("stats: {:?}", bridge.stats());

    ui.join();
    global_host().clear();
    Ok(())
}
