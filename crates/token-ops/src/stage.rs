//! Per-operation lifecycle.
//!
//! Every orchestrator call walks the same forward-only path:
//!
//! ```text
//! Idle → Validating → Resolving → Building → Assembling → Submitting → Confirming → Succeeded
//!                                                                                  ↘ Failed
//! ```
//!
//! Any stage may end in `Failed`. The stage that was active when the error
//! was raised travels with it in [`OperationFailure`].

use std::fmt;
use std::future::Future;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, TokenOpsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStage {
    Idle,
    Validating,
    Resolving,
    Building,
    Assembling,
    Submitting,
    Confirming,
    Succeeded,
    Failed,
}

impl OperationStage {
    fn ordinal(self) -> u8 {
        match self {
            OperationStage::Idle => 0,
            OperationStage::Validating => 1,
            OperationStage::Resolving => 2,
            OperationStage::Building => 3,
            OperationStage::Assembling => 4,
            OperationStage::Submitting => 5,
            OperationStage::Confirming => 6,
            OperationStage::Succeeded | OperationStage::Failed => 7,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OperationStage::Succeeded | OperationStage::Failed)
    }

    /// Forward moves only. Stages may be skipped (reads go straight from
    /// `Validating` to `Succeeded`); terminal stages never move again.
    pub fn can_advance_to(self, next: OperationStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == OperationStage::Failed || next.ordinal() > self.ordinal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationStage::Idle => "idle",
            OperationStage::Validating => "validating",
            OperationStage::Resolving => "resolving",
            OperationStage::Building => "building",
            OperationStage::Assembling => "assembling",
            OperationStage::Submitting => "submitting",
            OperationStage::Confirming => "confirming",
            OperationStage::Succeeded => "succeeded",
            OperationStage::Failed => "failed",
        }
    }
}

impl fmt::Display for OperationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed operation: where it stopped and why.
#[derive(Debug, Error)]
#[error("{operation} failed while {stage}: {error}")]
pub struct OperationFailure {
    pub operation: &'static str,
    pub stage: OperationStage,
    #[source]
    pub error: TokenOpsError,
}

impl OperationFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn is_retry_safe(&self) -> bool {
        self.error.is_retry_safe()
    }
}

/// Tracks the stage of a single operation. Created fresh per call.
#[derive(Debug)]
pub(crate) struct OperationMachine {
    operation: &'static str,
    stage: OperationStage,
}

impl OperationMachine {
    pub(crate) fn start(operation: &'static str) -> Self {
        debug!(operation, "operation_start");
        Self {
            operation,
            stage: OperationStage::Idle,
        }
    }

    #[cfg(test)]
    pub(crate) fn stage(&self) -> OperationStage {
        self.stage
    }

    /// Enter `stage`. Refuses to move backwards.
    pub(crate) fn advance(&mut self, stage: OperationStage) -> Result<(), OperationFailure> {
        if !self.stage.can_advance_to(stage) {
            warn!(operation = self.operation, from = %self.stage, to = %stage, "illegal_stage_transition");
            return Err(OperationFailure {
                operation: self.operation,
                stage: self.stage,
                error: TokenOpsError::TransactionBuild(format!(
                    "illegal stage transition {} -> {}",
                    self.stage, stage
                )),
            });
        }
        debug!(operation = self.operation, from = %self.stage, to = %stage, "stage_transition");
        self.stage = stage;
        Ok(())
    }

    /// Enter `stage` and run `work` in it, tagging any error with the stage.
    pub(crate) async fn run<T, F>(&mut self, stage: OperationStage, work: F) -> Result<T, OperationFailure>
    where
        F: Future<Output = Result<T, TokenOpsError>>,
    {
        self.advance(stage)?;
        work.await.map_err(|error| self.fail(error))
    }

    /// Synchronous counterpart of [`run`](Self::run).
    pub(crate) fn step<T>(
        &mut self,
        stage: OperationStage,
        work: impl FnOnce() -> Result<T, TokenOpsError>,
    ) -> Result<T, OperationFailure> {
        self.advance(stage)?;
        work().map_err(|error| self.fail(error))
    }

    /// Consumes the machine: a succeeded operation cannot move again.
    pub(crate) fn succeed(self) {
        debug!(operation = self.operation, from = %self.stage, to = %OperationStage::Succeeded, "stage_transition");
        info!(operation = self.operation, "operation_succeeded");
    }

    fn fail(&mut self, error: TokenOpsError) -> OperationFailure {
        let stage = self.stage;
        self.stage = OperationStage::Failed;
        warn!(operation = self.operation, %stage, kind = ?error.kind(), error = %error, "operation_failed");
        OperationFailure {
            operation: self.operation,
            stage,
            error,
        }
    }
}
