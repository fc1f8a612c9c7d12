//! Dedicated background execution context for hardware callbacks
//!
//! A single named thread drains a queue of tasks. Hardware implementations
//! post their completions through a [`Handler`]; posting after the thread
//! has quit is a silent no-op.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::thread::{JoinHandle, ThreadId};

type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Quit,
}

/// Cheap, cloneable handle used to post work onto a [`BackgroundThread`]
#[derive(Clone)]
pub struct Handler {
    tx: Sender<Message>,
}

impl Handler {
    /// Queue `task` to run on the background thread. Returns false if the
    /// thread is gone, in which case the task is dropped unrun.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Message::Run(Box::new(task))).is_ok()
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

pub struct BackgroundThread {
    handler: Handler,
    join: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl BackgroundThread {
    pub fn start(name: &str) -> std::io::Result<Self> {
        let (tx, rx) = unbounded();
        let join = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_loop(rx))?;
        let thread_id = join.thread().id();

        Ok(Self {
            handler: Handler { tx },
            join: Some(join),
            thread_id,
        })
    }

    pub fn handler(&self) -> Handler {
        self.handler.clone()
    }

    /// True when called from the background thread itself
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Let already queued tasks run, then stop the thread and wait for it.
    ///
    /// Must not be called from the background thread; doing so only requests
    /// the quit without waiting.
    pub fn quit_safely(&mut self) {
        let _ = self.handler.tx.send(Message::Quit);

        let Some(join) = self.join.take() else {
            return;
        };
        if self.is_current() {
            log::warn!("quit_safely called from the background thread, not joining");
            return;
        }
        if join.join().is_err() {
            log::error!("Background thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }
}

impl Drop for BackgroundThread {
    fn drop(&mut self) {
        self.quit_safely();
    }
}

fn run_loop(rx: Receiver<Message>) {
    // Dropping rx on return makes every later post fail
    for message in rx.iter() {
        match message {
            Message::Run(task) => task(),
            Message::Quit => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_tasks_run_off_caller_thread() {
        let mut background = BackgroundThread::start("test-background").unwrap();
        let caller = std::thread::current().id();
        let (tx, rx) = unbounded();

        assert!(background.handler().post(move || {
            let _ = tx.send(std::thread::current().id());
        }));

        let ran_on = rx.recv().unwrap();
        assert_ne!(ran_on, caller);
        background.quit_safely();
    }

    #[test]
    fn test_quit_drains_pending_tasks() {
        let mut background = BackgroundThread::start("test-drain").unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..50 {
            let counter = counter.clone();
            background.handler().post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        background.quit_safely();
        assert_eq!(counter.load(Ordering::SeqCst), 50);
        assert!(!background.is_running());
    }

    #[test]
    fn test_post_after_quit_is_rejected() {
        let mut background = BackgroundThread::start("test-late").unwrap();
        let handler = background.handler();
        background.quit_safely();

        assert!(!handler.post(|| panic!("must not run")));
        // idempotent
        background.quit_safely();
    }
}
