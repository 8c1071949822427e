//! Runs template generation off the UI thread, one job at a time.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::engine::{TemplateEngine, TemplateRequest};
use crate::error::{AppError, EngineError};

/// Outcome of a finished job, as seen by the UI.
pub type JobResult = Result<(), AppError>;

/// A template generation running on its own thread.
pub struct TemplateJob {
    result_rx: Receiver<Result<(), EngineError>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl TemplateJob {
    pub fn spawn(
        engine: Arc<dyn TemplateEngine>,
        request: TemplateRequest,
    ) -> Result<Self, AppError> {
        let (result_tx, result_rx) = mpsc::channel();

        let thread_handle = thread::Builder::new()
            .name("template-engine".to_string())
            .spawn(move || {
                log::info!("template generation started");
                let result = engine.create_template(&request);
                if result_tx.send(result).is_err() {
                    log::warn!("template result dropped: receiver gone");
                }
            })?;

        Ok(Self {
            result_rx,
            thread_handle: Some(thread_handle),
        })
    }

    /// Non-blocking. `Some` once the job has ended, successfully or not.
    pub fn poll(&mut self) -> Option<JobResult> {
        let result = match self.result_rx.try_recv() {
            Ok(result) => result.map_err(AppError::from),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                log::error!("template worker disconnected without a result");
                Err(AppError::WorkerLost)
            }
        };
        self.join();
        Some(result)
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("template worker panicked");
            }
        }
    }
}
