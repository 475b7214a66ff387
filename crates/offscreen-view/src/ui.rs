//! Single-threaded cooperative executor for UI-thread work.
//!
//! Work is posted through a [`UiContext`] and runs on whichever thread drives
//! the matching [`UiExecutor`]. Posting never blocks; when the executor is gone
//! the task is dropped and the post reports failure.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A unit of UI-thread work.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

enum UiMessage {
    Run(UiTask),
    Quit,
}

/// Create a connected context/executor pair.
pub fn ui_channel(label: impl Into<String>) -> (UiContext, UiExecutor) {
    let (sender, receiver) = mpsc::channel();
    let queued = Arc::new(AtomicUsize::new(0));
    let label: Arc<str> = Arc::from(label.into());
    (
        UiContext {
            label: label.clone(),
            sender,
            queued: queued.clone(),
        },
        UiExecutor {
            label,
            receiver,
            queued,
        },
    )
}

/// Handle for posting work to the UI thread.
#[derive(Clone)]
pub struct UiContext {
    label: Arc<str>,
    sender: Sender<UiMessage>,
    queued: Arc<AtomicUsize>,
}

impl UiContext {
    /// Post `task` to the UI thread. Returns `false` (and drops the task) if
    /// the executor is gone.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.queued.fetch_add(1, Ordering::SeqCst);
        match self.sender.send(UiMessage::Run(Box::new(task))) {
            Ok(()) => true,
            Err(_) => {
                self.queued.fetch_sub(1, Ordering::SeqCst);
                log::warn!("UiContext({}): executor is gone, dropping task", self.label);
                false
            }
        }
    }

    /// Ask the executor to stop after the tasks already queued.
    pub fn quit(&self) -> bool {
        self.sender.send(UiMessage::Quit).is_ok()
    }

    /// Number of tasks posted but not yet run.
    pub fn pending(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for UiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiContext")
            .field("label", &self.label)
            .field("pending", &self.pending())
            .finish()
    }
}

/// Runs posted tasks on the thread that drives it.
pub struct UiExecutor {
    label: Arc<str>,
    receiver: Receiver<UiMessage>,
    queued: Arc<AtomicUsize>,
}

impl UiExecutor {
    fn run_task(&self, task: UiTask) {
        self.queued.fetch_sub(1, Ordering::SeqCst);
        task();
    }

    /// Run every task currently queued, including tasks those tasks post.
    /// Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(UiMessage::Run(task)) => {
                    self.run_task(task);
                    ran += 1;
                }
                Ok(UiMessage::Quit) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        ran
    }

    /// Block and run tasks until a quit request arrives or every context is dropped.
    pub fn run(self) {
        log::debug!("UiExecutor({}): running", self.label);
        loop {
            match self.receiver.recv() {
                Ok(UiMessage::Run(task)) => self.run_task(task),
                Ok(UiMessage::Quit) | Err(RecvError) => break,
            }
        }
        log::debug!("UiExecutor({}): stopped", self.label);
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A dedicated UI thread running a [`UiExecutor`].
pub struct UiThread {
    context: UiContext,
    join: Option<JoinHandle<()>>,
}

impl UiThread {
    pub fn spawn(name: impl Into<String>) -> std::io::Result<Self> {
        let name = name.into();
        let (context, executor) = ui_channel(name.clone());
        let join = thread::Builder::new().name(name).spawn(move || executor.run())?;
        Ok(Self {
            context,
            join: Some(join),
        })
    }

    pub fn context(&self) -> UiContext {
        self.context.clone()
    }

    /// Stop after the queued tasks and wait for the thread to exit.
    pub fn join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(join) = self.join.take() {
            self.context.quit();
            if join.join().is_err() {
                log::error!("UiThread({}): thread panicked", self.context.label());
            }
        }
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}
