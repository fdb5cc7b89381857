// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Confines work to a single OS thread.

Graphics drivers commonly tolerate calls from one thread only.  A [`MainThreadLoop`]
owns such a thread and accepts jobs from any number of other threads over one FIFO
queue.

# A brief digression on ordering

Driver state such as the bound framebuffer or the viewport is global to the context.
If two callers' jobs could interleave out of submission order, one caller's draw might
run with the other's bindings.  So there is exactly one queue, and the total execution
order is the submission order, whether jobs came in through [`MainThreadLoop::execute`]
or [`MainThreadLoop::execute_async`].

# Two ways to own a thread

* [`MainThreadLoop::spawn`] creates a dedicated worker thread.  This is what most code
  wants.
* [`MainThreadLoop::run`] turns the process's initial thread into the loop thread, for
  platforms where the driver insists on it, and runs the application entry point on a
  second thread.

```
use accelerated_pixels::main_thread_loop::{LoopConfig, MainThreadLoop};

let main_loop = MainThreadLoop::spawn(LoopConfig::default()).expect("spawn loop");
let loop_thread = main_loop.execute(|| std::thread::current().id());
assert_eq!(loop_thread, main_loop.thread_id());
main_loop.stop();
main_loop.join();
```
*/

use logwise::privacy::LogIt;
use r#continue::continuation;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Name of the thread Rust gives to `fn main`.
const PROCESS_MAIN_THREAD: &str = "main";

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("main thread loop has been stopped")]
    Stopped,
    #[error("could not spawn a loop thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Configuration for a [`MainThreadLoop`].
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Name of the loop thread (for [`MainThreadLoop::spawn`]) and prefix for log lines.
    pub thread_name: String,
}

impl LoopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            thread_name: "main_thread_loop".to_string(),
        }
    }
}

/// A single-thread job executor.  See the [module documentation](self).
#[derive(Debug)]
pub struct MainThreadLoop {
    name: String,
    //None once stopped
    sender: Mutex<Option<Sender<Job>>>,
    owner: ThreadId,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MainThreadLoop {
    /// Starts a dedicated loop thread.
    pub fn spawn(config: LoopConfig) -> Result<Arc<MainThreadLoop>, LoopError> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let move_name = config.thread_name.clone();
        let worker = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || consume(&move_name, receiver))?;
        let owner = worker.thread().id();
        logwise::info_sync!(
            "spawned loop thread {name}",
            name = LogIt(&config.thread_name)
        );
        Ok(Arc::new(MainThreadLoop {
            name: config.thread_name,
            sender: Mutex::new(Some(sender)),
            owner,
            worker: Mutex::new(Some(worker)),
        }))
    }

    /**
    Pins the calling thread as the loop thread and consumes jobs on it.

    `entry` runs on a new thread and receives the loop.  When `entry` returns the loop is
    stopped; `run` returns once every queued job has run.  A panic in `entry` is
    re-raised here after the queue is drained.

    # Panics
    If the calling thread is not the process's initial thread.  The initial thread is
    recognized by the name `main` that Rust gives it; a thread spawned with that name
    passes the check too.
    */
    pub fn run<F>(config: LoopConfig, entry: F) -> Result<(), LoopError>
    where
        F: FnOnce(Arc<MainThreadLoop>) + Send + 'static,
    {
        let current = thread::current();
        assert_eq!(
            current.name(),
            Some(PROCESS_MAIN_THREAD),
            "MainThreadLoop::run must be called from the process's main thread"
        );
        let (sender, receiver) = mpsc::channel::<Job>();
        let main_loop = Arc::new(MainThreadLoop {
            name: config.thread_name.clone(),
            sender: Mutex::new(Some(sender)),
            owner: current.id(),
            worker: Mutex::new(None),
        });
        let entry_loop = main_loop.clone();
        let entry_thread = thread::Builder::new()
            .name(format!("{} entry", config.thread_name))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| entry(entry_loop.clone())));
                entry_loop.stop();
                if let Err(payload) = result {
                    panic::resume_unwind(payload);
                }
            })?;
        drop(main_loop);
        consume(&config.thread_name, receiver);
        if let Err(payload) = entry_thread.join() {
            panic::resume_unwind(payload);
        }
        Ok(())
    }

    /// Identity of the loop thread.
    pub fn thread_id(&self) -> ThreadId {
        self.owner
    }

    pub fn is_loop_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /**
    Runs `job` on the loop thread and waits for its result.

    # Panics
    * If the loop was stopped.
    * If called from the loop thread itself, which would wait on its own queue.
    * If `job` panics; the panic is re-raised on the calling thread.
    */
    pub fn execute<F, R>(&self, job: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self.try_execute(job) {
            Ok(r) => r,
            Err(e) => panic!("{}: {e}", self.name),
        }
    }

    /// Like [`MainThreadLoop::execute`], but returns an error instead of panicking when stopped.
    pub fn try_execute<F, R>(&self, job: F) -> Result<R, LoopError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        assert!(
            !self.is_loop_thread(),
            "{}: execute called from the loop thread would wait on itself",
            self.name
        );
        let (s, r) = continuation();
        self.submit(Box::new(move || {
            s.send(panic::catch_unwind(AssertUnwindSafe(job)));
        }))?;
        match test_executors::sleep_on(r) {
            Ok(value) => Ok(value),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /**
    Queues `job` on the loop thread without waiting.

    There is nobody to report a panic to, so a panicking job aborts the process.

    # Panics
    If the loop was stopped.
    */
    pub fn execute_async<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(e) = self.try_execute_async(job) {
            panic!("{}: {e}", self.name);
        }
    }

    /// Like [`MainThreadLoop::execute_async`], but returns an error instead of panicking when stopped.
    pub fn try_execute_async<F>(&self, job: F) -> Result<(), LoopError>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = self.name.clone();
        self.submit(Box::new(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                logwise::error_sync!(
                    "{name}: asynchronous job panicked ({message}), aborting",
                    name = LogIt(&name),
                    message = LogIt(&panic_message(payload.as_ref()))
                );
                std::process::abort();
            }
        }))
    }

    /// Rejects further submissions.  Jobs already queued still run.
    pub fn stop(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            logwise::info_sync!("stopping loop {name}", name = LogIt(&self.name));
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Waits for a spawned loop thread to drain its queue and exit.  Call [`MainThreadLoop::stop`] first.
    ///
    /// Does nothing for loops created by [`MainThreadLoop::run`], or when already joined.
    pub fn join(&self) {
        assert!(
            !self.is_loop_thread(),
            "{}: join called from the loop thread",
            self.name
        );
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker
            && worker.join().is_err()
        {
            logwise::error_sync!("loop thread {name} panicked", name = LogIt(&self.name));
        }
    }

    fn submit(&self, job: Job) -> Result<(), LoopError> {
        //holding the lock across send keeps submission order equal to queue order
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.send(job).map_err(|_| LoopError::Stopped),
            None => Err(LoopError::Stopped),
        }
    }
}

fn consume(name: &str, receiver: Receiver<Job>) {
    logwise::trace_sync!("loop {name} consuming", name = LogIt(&name));
    //ends once the sender is dropped and the queue is empty
    for job in receiver {
        job();
    }
    logwise::info_sync!("loop {name} drained", name = LogIt(&name));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
