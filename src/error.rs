use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// ワーカーが待っていた相手。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Awaiting {
    /// 全ワーカーのバリア
    Barrier,
    /// 隣接ワーカーのフェーズカウンタ
    Neighbor(usize),
}

impl fmt::Display for Awaiting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Awaiting::Barrier => write!(f, "the collective barrier"),
            Awaiting::Neighbor(worker) => write!(f, "neighbor worker {worker}"),
        }
    }
}

/// 1ワーカー分の失敗。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkerFault {
    #[error("worker {worker} panicked during iteration {iteration}: {message}")]
    Panicked {
        worker: usize,
        iteration: usize,
        message: String,
    },

    #[error("worker {worker} timed out after {waited:?} waiting for {awaiting} to finish iteration {iteration}")]
    TimedOut {
        worker: usize,
        iteration: usize,
        awaiting: Awaiting,
        waited: Duration,
    },
}

impl WorkerFault {
    pub fn worker(&self) -> usize {
        match self {
            WorkerFault::Panicked { worker, .. } | WorkerFault::TimedOut { worker, .. } => *worker,
        }
    }

    pub fn iteration(&self) -> usize {
        match self {
            WorkerFault::Panicked { iteration, .. } | WorkerFault::TimedOut { iteration, .. } => {
                *iteration
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum AveragingError {
    #[error("invalid partition: {tasks} tasks cannot evenly split {n} points")]
    InvalidPartition { n: usize, tasks: usize },

    #[error("problem size must be at least 1")]
    EmptyProblem,

    #[error("buffer length mismatch: expected {expected}, got {actual}")]
    BufferLength { expected: usize, actual: usize },

    #[error("{} worker(s) failed, first: {}", .0.len(), first_fault(.0))]
    WorkerFailure(Vec<WorkerFault>),

    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: usize,
        source: std::io::Error,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn first_fault(faults: &[WorkerFault]) -> String {
    faults
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

impl AveragingError {
    /// `WorkerFailure` の場合のみ、失敗したワーカーの一覧を返す。
    pub fn faults(&self) -> &[WorkerFault] {
        match self {
            AveragingError::WorkerFailure(faults) => faults,
            _ => &[],
        }
    }
}

pub type AveragingResult<T> = Result<T, AveragingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_failure_message_names_first_fault() {
        let err = AveragingError::WorkerFailure(vec![WorkerFault::Panicked {
            worker: 2,
            iteration: 7,
            message: "boom".to_string(),
        }]);
        let text = err.to_string();
        assert!(text.contains("1 worker(s) failed"), "{text}");
        assert!(text.contains("worker 2 panicked during iteration 7"), "{text}");
        assert_eq!(err.faults().len(), 1);
    }

    #[test]
    fn timeout_message_names_neighbor() {
        let fault = WorkerFault::TimedOut {
            worker: 1,
            iteration: 3,
            awaiting: Awaiting::Neighbor(2),
            waited: Duration::from_millis(5),
        };
        assert!(fault.to_string().contains("neighbor worker 2"));
        assert_eq!(fault.worker(), 1);
        assert_eq!(fault.iteration(), 3);
    }
}
