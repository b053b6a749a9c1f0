use cadence_core::{OperationId, OperationResult};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};

use crate::error::{ExecutionError, Result};
use crate::handler::OperationHandler;

pub(crate) const THREAD_NAME: &str = "operation-handler";

type HandlerOutput = Result<OperationResult>;

/// Fixed-size pool of operation handlers with a completion-ordered result
/// stream
///
/// Owns its own multi-threaded runtime, so the blocking [`take`] must be
/// called from outside any async context.
///
/// [`take`]: HandlerExecutor::take
pub struct HandlerExecutor {
    runtime: Runtime,
    permits: Arc<Semaphore>,
    handlers: JoinSet<HandlerOutput>,
    operations: HashMap<Id, OperationId>,
    shut_down: bool,
}

impl HandlerExecutor {
    pub fn new(pool_size: usize) -> Result<Self> {
        let pool_size = pool_size.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(pool_size)
            .thread_name(THREAD_NAME)
            .enable_all()
            .build()?;

        log::info!("Handler executor started with {} workers", pool_size);
        Ok(Self {
            runtime,
            permits: Arc::new(Semaphore::new(pool_size)),
            handlers: JoinSet::new(),
            operations: HashMap::new(),
            shut_down: false,
        })
    }

    /// Start `handler` as soon as a pool slot is free
    pub fn submit(&mut self, handler: OperationHandler) -> Result<()> {
        if self.shut_down {
            return Err(ExecutionError::ShutDown);
        }

        let operation_id = handler.operation().id;
        let permits = Arc::clone(&self.permits);
        let task = self.handlers.spawn_on(
            async move {
                let mut handler = handler;
                // Waiting handlers do not occupy a pool slot, so operations
                // blocked on a dependency can not starve the ones they wait for
                handler.wait_for_start().await?;
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| ExecutionError::Interrupted { operation_id })?;
                handler.execute().await
            },
            self.runtime.handle(),
        );
        self.operations.insert(task.id(), operation_id);
        Ok(())
    }

    /// Handlers submitted but not yet taken
    pub fn in_flight(&self) -> usize {
        self.handlers.len()
    }

    /// Block until the next handler finishes. `None` when nothing is in
    /// flight.
    pub fn take(&mut self) -> Option<HandlerOutput> {
        let joined = self.runtime.block_on(self.handlers.join_next_with_id())?;
        Some(self.finish(joined))
    }

    /// Next finished handler, without blocking
    pub fn try_take(&mut self) -> Option<HandlerOutput> {
        let joined = self.handlers.try_join_next_with_id()?;
        Some(self.finish(joined))
    }

    /// Cancel every handler in flight. Each one still comes out of
    /// [`HandlerExecutor::take`], as [`ExecutionError::Interrupted`].
    pub fn shutdown_now(&mut self) {
        if !self.shut_down {
            log::info!(
                "Interrupting {} in-flight operation handlers",
                self.handlers.len()
            );
        }
        self.shut_down = true;
        self.permits.close();
        self.handlers.abort_all();
    }

    /// Stop accepting handlers and wait up to `timeout` for the runtime to
    /// wind down
    pub fn shutdown(mut self, timeout: Duration) {
        self.shutdown_now();
        while self.take().is_some() {}
        self.runtime.shutdown_timeout(timeout);
    }

    fn finish(
        &mut self,
        joined: std::result::Result<(Id, HandlerOutput), JoinError>,
    ) -> HandlerOutput {
        match joined {
            Ok((id, output)) => {
                self.operations.remove(&id);
                output
            }
            Err(e) => {
                let operation_id = self.operations.remove(&e.id()).unwrap_or_default();
                if e.is_panic() {
                    Err(ExecutionError::Panicked {
                        operation_id,
                        message: panic_message(e.into_panic()),
                    })
                } else {
                    Err(ExecutionError::Interrupted { operation_id })
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
