mod common;

use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use common::{NATIVE, Recorder, recording_toolkit};
use offscreen_view::{
    HostContextRegistry, NativeHandle, NoopCallback, UiThread, ViewFactory, ui_channel,
};

fn wait_for_frame(pull: impl Fn() -> bool) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if pull() {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    bail!("no frame published within 5s")
}

#[test]
fn consumer_latches_frames_painted_on_ui_thread() -> Result<()> {
    let ui = UiThread::spawn("offscreen-ui")?;
    let host = Arc::new(HostContextRegistry::with_default(ui.context()));
    let recorder = Arc::new(Recorder::default());
    let (tx, rx) = mpsc::channel();
    let callback = move |handle: NativeHandle| {
        let _ = tx.send(handle);
    };
    let factory = ViewFactory::new(host, recording_toolkit(recorder.clone()), Arc::new(callback));
    let bridge = factory.create("OffscreenWebView", "threaded", NATIVE, 2, 128, 64)?;

    assert_eq!(rx.recv_timeout(Duration::from_secs(5))?, NATIVE);
    wait_for_frame(|| bridge.request_texture_refresh())?;
    assert_eq!(bridge.with_latest_frame(|f| f.size()), Some((128, 64)));

    bridge.schedule_resize(256, 256);
    wait_for_frame(|| bridge.request_texture_refresh())?;
    assert_eq!(bridge.with_latest_frame(|f| f.size()), Some((256, 256)));

    bridge.notify_destroyed();
    ui.join();
    assert!(!bridge.is_widget_ready());
    assert!(!bridge.request_texture_refresh());
    Ok(())
}

#[test]
fn pulls_from_a_second_thread_are_refused() -> Result<()> {
    let (context, executor) = ui_channel("confined");
    let factory = ViewFactory::new(
        Arc::new(context),
        recording_toolkit(Arc::new(Recorder::default())),
        Arc::new(NoopCallback),
    );
    let bridge = factory.create("OffscreenView", "confined", NATIVE, 0, 8, 8)?;
    executor.run_pending();

    assert!(bridge.request_texture_refresh());
    bridge.schedule_paint();
    executor.run_pending();

    let other = bridge.clone();
    let from_other = std::thread::spawn(move || other.request_texture_refresh())
        .join()
        .map_err(|_| anyhow::anyhow!("consumer thread panicked"))?;
    assert!(!from_other);
    assert!(bridge.request_texture_refresh());
    Ok(())
}

#[test]
fn custom_context_receives_posted_work() -> Result<()> {
    let (default, default_exec) = ui_channel("default");
    let (custom, custom_exec) = ui_channel("custom");
    let host = Arc::new(HostContextRegistry::with_default(default));
    host.set_custom(Some(custom));

    let factory = ViewFactory::new(
        host.clone(),
        recording_toolkit(Arc::new(Recorder::default())),
        Arc::new(NoopCallback),
    );
    let bridge = factory.create("OffscreenWebView", "custom", NATIVE, 0, 8, 8)?;

    assert_eq!(default_exec.run_pending(), 0);
    assert_eq!(custom_exec.run_pending(), 1);
    assert!(bridge.is_widget_ready());

    host.set_custom(None);
    bridge.schedule_invalidate();
    assert_eq!(custom_exec.run_pending(), 0);
    assert_eq!(default_exec.run_pending(), 1);
    Ok(())
}

#[test]
fn work_dropped_with_an_executor_does_not_block_later_requests() -> Result<()> {
    let (first, first_exec) = ui_channel("first");
    let host = Arc::new(HostContextRegistry::with_default(first));
    let factory = ViewFactory::new(
        host.clone(),
        recording_toolkit(Arc::new(Recorder::default())),
        Arc::new(NoopCallback),
    );
    let bridge = factory.create("OffscreenWebView", "switch", NATIVE, 0, 16, 16)?;
    assert_eq!(first_exec.run_pending(), 1);
    assert_eq!(bridge.stats().paints_completed, 1);

    bridge.schedule_invalidate();
    bridge.schedule_paint();
    bridge.schedule_resize(32, 32);
    // The queued tasks go away with the executor that never ran them.
    drop(first_exec);

    let (second, second_exec) = ui_channel("second");
    host.set_default(Some(second));
    bridge.schedule_invalidate();
    bridge.schedule_paint();
    bridge.schedule_resize(48, 24);

    assert_eq!(second_exec.run_pending(), 3);
    assert_eq!(bridge.stats().paints_completed, 4);
    assert!(bridge.request_texture_refresh());
    assert_eq!(bridge.with_latest_frame(|f| f.size()), Some((48, 24)));
    Ok(())
}

#[test]
fn requests_after_executor_is_gone_are_retried_once_it_returns() -> Result<()> {
    let (first, first_exec) = ui_channel("first");
    let host = Arc::new(HostContextRegistry::with_default(first));
    let factory = ViewFactory::new(
        host.clone(),
        recording_toolkit(Arc::new(Recorder::default())),
        Arc::new(NoopCallback),
    );
    let bridge = factory.create("OffscreenView", "gone", NATIVE, 0, 8, 8)?;
    first_exec.run_pending();
    drop(first_exec);

    // Posts fail outright while the registry still points at the dead context.
    bridge.schedule_paint();
    bridge.schedule_invalidate();
    bridge.schedule_resize(12, 12);

    let (second, second_exec) = ui_channel("second");
    host.set_default(Some(second));
    bridge.schedule_paint();
    bridge.schedule_invalidate();
    bridge.schedule_resize(16, 16);
    assert_eq!(second_exec.run_pending(), 3);
    Ok(())
}
