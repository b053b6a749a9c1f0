use async_trait::async_trait;
use cadence_core::{Operation, OperationResult, Time};
use cadence_ports::{CompletionTimeWriter, GlobalCompletionTimeReader};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{ExecutionError, ExecutionFailure, Result};
use crate::spinner::Spinner;

/// What a successful operation body produced
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    pub result_code: i32,
    pub value: Value,
}

impl OperationOutcome {
    pub fn ok(value: Value) -> Self {
        Self {
            result_code: 0,
            value,
        }
    }
}

/// Operation-specific execution logic
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    async fn execute(
        &self,
        operation: &Operation,
    ) -> std::result::Result<OperationOutcome, ExecutionFailure>;
}

/// Runs exactly one operation
///
/// Created with [`OperationHandler::init`], which reports the operation's
/// scheduled start as initiated, then consumed by [`OperationHandler::call`].
pub struct OperationHandler {
    spinner: Arc<Spinner>,
    operation: Operation,
    writer: Arc<dyn CompletionTimeWriter>,
    gct_reader: Arc<dyn GlobalCompletionTimeReader>,
    body: Arc<dyn OperationExecutor>,
    late_start_accepted: bool,
}

impl OperationHandler {
    pub fn init(
        spinner: Arc<Spinner>,
        operation: Operation,
        writer: Arc<dyn CompletionTimeWriter>,
        gct_reader: Arc<dyn GlobalCompletionTimeReader>,
        body: Arc<dyn OperationExecutor>,
    ) -> Result<Self> {
        writer
            .submit_initiated(operation.scheduled_start)
            .map_err(|source| ExecutionError::CompletionTime {
                operation_id: operation.id,
                source,
            })?;

        Ok(Self {
            spinner,
            operation,
            writer,
            gct_reader,
            body,
            late_start_accepted: false,
        })
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Wait for the spinner, run the body and report the completed time.
    ///
    /// The completed time is reported whether the body succeeds or fails,
    /// but not when the handler is cancelled mid-flight.
    pub async fn call(mut self) -> Result<OperationResult> {
        self.wait_for_start().await?;
        self.execute().await
    }

    /// Waiting phase: hold the operation back until the spinner releases it.
    /// A refused late start still reports the completed time; an accepted
    /// one is carried into the result so it is not judged again.
    pub async fn wait_for_start(&mut self) -> Result<()> {
        match self
            .spinner
            .wait_for_start(&self.operation, self.gct_reader.as_ref())
            .await
        {
            Ok(release) => {
                self.late_start_accepted = release.late_start_accepted;
                Ok(())
            }
            Err(e) => {
                self.submit_completed()?;
                Err(e)
            }
        }
    }

    /// Executing phase: run the body now and report the completed time.
    /// The actual start is read here, after any wait for a pool slot.
    pub async fn execute(self) -> Result<OperationResult> {
        let operation_id = self.operation.id;
        let clock = self.spinner.clock();
        let actual_start = clock.now();
        log::debug!("Executing operation {} ({})", operation_id, self.operation.kind);

        let outcome = self.body.execute(&self.operation).await;
        let run_duration = clock.now().duration_since(actual_start);
        self.submit_completed()?;

        let outcome = outcome.map_err(|source| ExecutionError::Failure {
            operation_id,
            source,
        })?;
        Ok(OperationResult {
            operation: self.operation,
            actual_start,
            run_duration,
            result_code: outcome.result_code,
            value: outcome.value,
            late_start_accepted: self.late_start_accepted,
        })
    }

    fn submit_completed(&self) -> Result<()> {
        self.writer
            .submit_completed(self.operation.scheduled_start)
            .map_err(|source| ExecutionError::CompletionTime {
                operation_id: self.operation.id,
                source,
            })
    }
}
