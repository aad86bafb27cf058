//! The thread that runs a program, and the driver's end of its channels.

use std::any::Any;
use std::io;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crate::engine::{run_job, Command, Event, Job};

/// One run's worker thread.
///
/// Both channels hold a single message, so the driver and the worker take
/// turns: the driver sends a command and blocks until the worker reports.
pub(crate) struct Worker {
    commands: Option<SyncSender<Command>>,
    events: Receiver<Event>,
    handle: Option<JoinHandle<()>>,
    /// Dies with the thread's closure, whoever holds the handle.
    alive: Weak<()>,
}

/// The worker ended without reporting, normally because it panicked.
pub(crate) struct WorkerLost(pub String);

impl Worker {
    pub fn spawn(job: Job, name: String, stack_size: usize) -> io::Result<Worker> {
        let (command_tx, command_rx) = mpsc::sync_channel(1);
        let (event_tx, event_rx) = mpsc::sync_channel(1);
        let token = Arc::new(());
        let alive = Arc::downgrade(&token);
        let handle = thread::Builder::new()
            .name(name)
            .stack_size(stack_size)
            .spawn(move || {
                let _token = token;
                run_job(job, command_rx, event_tx);
            })?;
        Ok(Worker {
            commands: Some(command_tx),
            events: event_rx,
            handle: Some(handle),
            alive,
        })
    }

    /// Let the worker run to its next suspension point and wait for it.
    pub fn step(&mut self) -> Result<Event, WorkerLost> {
        let sent = match &self.commands {
            Some(commands) => commands.send(Command::Step).is_ok(),
            None => false,
        };
        if sent {
            if let Ok(event) = self.events.recv() {
                return Ok(event);
            }
        }
        Err(WorkerLost(
            self.join().unwrap_or_else(|| "worker stopped without reporting".to_string()),
        ))
    }

    /// Stop the worker at its next suspension point and wait for it to exit.
    pub fn shutdown(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.try_send(Command::Abort);
        }
        if let Some(reason) = self.join() {
            tracing::warn!(%reason, "run worker panicked");
        }
    }

    /// A token that stays upgradable while the thread is running its job,
    /// even after this `Worker` is gone.
    pub fn liveness(&self) -> Weak<()> {
        self.alive.clone()
    }

    /// Join the thread; returns the panic message if it panicked.
    fn join(&mut self) -> Option<String> {
        let handle = self.handle.take()?;
        handle.join().err().map(panic_message)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
