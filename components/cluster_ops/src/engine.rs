//! Runs an instruction list against one execution context

use crate::context::ExecContext;
use crate::dispatcher::Dispatcher;
use crate::error::{OpError, Result};
use crate::op::Instructions;
use tracing::{error, info, warn};

/// Runs operations strictly in order and stops at the first failure
///
/// There is no retry here. The failing operation's error comes back
/// wrapped in [`OpError::Stage`] naming that operation.
pub struct ClusterOpEngine {
    instructions: Instructions,
    context: ExecContext,
}

impl ClusterOpEngine {
    pub fn new(instructions: Instructions, dispatcher: Dispatcher) -> Self {
        Self {
            instructions,
            context: ExecContext::new(dispatcher),
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Names of the stages in execution order
    pub fn summary(&self) -> Vec<&'static str> {
        self.instructions.iter().map(|op| op.name()).collect()
    }

    /// Run every stage; on success hand back the populated context
    pub async fn run(self) -> Result<ExecContext> {
        let Self {
            mut instructions,
            mut context,
        } = self;
        let total = instructions.len();

        for (i, op) in instructions.iter_mut().enumerate() {
            let name = op.name();
            info!("[{}/{}] {}: {}", i + 1, total, name, op.description());

            if let Err(e) = op.prepare(&mut context) {
                error!("{} failed to prepare: {}", name, e);
                return Err(stage_error(name, e));
            }

            let executed = op.execute(&mut context).await;

            // finalize releases resources even when execute failed
            let finalized = op.finalize(&mut context);

            if let Err(e) = executed {
                if let Err(finalize_err) = finalized {
                    warn!("{} failed to finalize: {}", name, finalize_err);
                }
                error!("{} failed: {}", name, e);
                return Err(stage_error(name, e));
            }
            if let Err(e) = finalized {
                error!("{} failed to finalize: {}", name, e);
                return Err(stage_error(name, e));
            }

            info!("{} complete", name);
        }

        Ok(context)
    }
}

fn stage_error(op: &str, source: OpError) -> OpError {
    OpError::Stage {
        op: op.to_string(),
        source: Box::new(source),
    }
}
