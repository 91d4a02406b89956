//! Mock operator for testing
//!
//! Produces zero outputs of the right shape and records every call into a
//! shared [`CallLog`], so tests can check what the bench loop did without a
//! real kernel.
//!
//! # Example
//!
//! ```
//! use embpulse::operator::mock::{CallLog, MockOperator};
//! use embpulse::operator::wrapper::SplitTableBatchedEmbeddingOp;
//!
//! let log = CallLog::default();
//! let op = SplitTableBatchedEmbeddingOp::new("cpu", MockOperator::factory(log.clone()));
//! assert!(!op.is_built());
//! assert!(log.calls().is_empty());
//! ```

use super::{EmbeddingBagOperator, KernelFactory, OperatorSpec};
use crate::tensor::Tensor;
use crate::Result;
use std::sync::{Arc, Mutex, PoisonError};

/// Record of one operator call
#[derive(Debug, Clone, PartialEq)]
pub enum OpCall {
    Build(OperatorSpec),
    Forward {
        num_indices: usize,
        num_bags: usize,
        weighted: bool,
    },
    Backward {
        grad_len: usize,
    },
}

/// Shared, cloneable call history
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<OpCall>>>,
}

impl CallLog {
    pub fn push(&self, call: OpCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    /// Copy of every call recorded so far
    pub fn calls(&self) -> Vec<OpCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count_forward(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, OpCall::Forward { .. }))
            .count()
    }

    pub fn count_backward(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, OpCall::Backward { .. }))
            .count()
    }
}

/// Kernel that only records calls
pub struct MockOperator {
    spec: OperatorSpec,
    log: CallLog,
}

impl MockOperator {
    pub fn new(spec: OperatorSpec, log: CallLog) -> Self {
        log.push(OpCall::Build(spec.clone()));
        Self { spec, log }
    }

    /// Factory producing mock kernels that share `log`
    pub fn factory(log: CallLog) -> KernelFactory {
        Arc::new(move |spec: &OperatorSpec| {
            Ok(Box::new(MockOperator::new(spec.clone(), log.clone())) as Box<dyn EmbeddingBagOperator>)
        })
    }
}

impl EmbeddingBagOperator for MockOperator {
    fn forward(
        &mut self,
        indices: &Tensor<i64>,
        offsets: &Tensor<i64>,
        weights: Option<&Tensor<f32>>,
    ) -> Result<Tensor<f32>> {
        let num_bags = offsets.len().saturating_sub(1);
        self.log.push(OpCall::Forward {
            num_indices: indices.len(),
            num_bags,
            weighted: weights.is_some(),
        });

        let batch_size = num_bags / self.spec.num_tables.max(1);
        let total_dim = self.spec.total_dim();
        Ok(Tensor::with_shape(vec![0.0; batch_size * total_dim], vec![batch_size, total_dim])?
            .to(indices.device()))
    }

    fn backward(&mut self, grad: &Tensor<f32>) -> Result<()> {
        self.log.push(OpCall::Backward {
            grad_len: grad.len(),
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
