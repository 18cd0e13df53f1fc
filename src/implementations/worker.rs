use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RunConfig;
use crate::error::{AveragingError, AveragingResult, Awaiting, WorkerFault};
use crate::implementations::WORKER_THREAD_PREFIX;
use crate::sync::{Cancellation, WaitError};

/// ワーカーが途中で抜けた理由。
#[derive(Debug)]
pub(crate) enum WorkerExit {
    Fault(WorkerFault),
    /// 他のワーカーの失敗で中止された。これ自体は失敗として数えない
    Cancelled,
}

/// ワーカースレッド内の状態。どの反復で失敗したかを記録する。
pub(crate) struct WorkerContext {
    worker: usize,
    iteration: Cell<usize>,
}

impl WorkerContext {
    fn new(worker: usize) -> Self {
        WorkerContext {
            worker,
            iteration: Cell::new(0),
        }
    }

    pub(crate) fn worker(&self) -> usize {
        self.worker
    }

    pub(crate) fn begin(&self, iteration: usize) {
        self.iteration.set(iteration);
    }

    pub(crate) fn iteration(&self) -> usize {
        self.iteration.get()
    }

    pub(crate) fn wait_failed(&self, error: WaitError, awaiting: Awaiting, waited: Duration) -> WorkerExit {
        match error {
            WaitError::Cancelled => WorkerExit::Cancelled,
            WaitError::TimedOut => WorkerExit::Fault(WorkerFault::TimedOut {
                worker: self.worker,
                iteration: self.iteration(),
                awaiting,
                waited,
            }),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn worker_builder(worker: usize, stack_size: Option<usize>) -> thread::Builder {
    let builder = thread::Builder::new().name(format!("{WORKER_THREAD_PREFIX}{worker}"));
    match stack_size {
        Some(size) => builder.stack_size(size),
        None => builder,
    }
}

/// `tasks` 本のワーカーを起動し、全員の終了を待ってから結果をまとめる。
///
/// 失敗したワーカーは `cancel` を立てて `wake_all` で待機中のワーカーを起こす。
/// 失敗が1つでもあれば、全ワーカーの失敗をワーカー番号順に `WorkerFailure` で返す。
pub(crate) fn run_workers<B, W>(
    tasks: usize,
    config: &RunConfig,
    cancel: &Cancellation,
    wake_all: W,
    body: B,
) -> AveragingResult<()>
where
    B: Fn(&WorkerContext) -> Result<(), WorkerExit> + Sync,
    W: Fn() + Sync,
{
    let stack_size = config.stack_size;
    spawn_workers(tasks, |worker| worker_builder(worker, stack_size), cancel, wake_all, body)
}

fn spawn_workers<F, B, W>(tasks: usize, builder: F, cancel: &Cancellation, wake_all: W, body: B) -> AveragingResult<()>
where
    F: Fn(usize) -> thread::Builder,
    B: Fn(&WorkerContext) -> Result<(), WorkerExit> + Sync,
    W: Fn() + Sync,
{
    let body = &body;
    let wake_all = &wake_all;

    let (outcomes, spawn_error) = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(tasks);
        let mut spawn_error = None;

        for worker in 0..tasks {
            let spawned = builder(worker).spawn_scoped(scope, move || {
                let ctx = WorkerContext::new(worker);
                debug!(worker, "worker started");

                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| body(&ctx))) {
                    Ok(outcome) => outcome,
                    Err(payload) => Err(WorkerExit::Fault(WorkerFault::Panicked {
                        worker,
                        iteration: ctx.iteration(),
                        message: panic_message(payload.as_ref()),
                    })),
                };

                match &outcome {
                    Ok(()) => debug!(worker, "worker done"),
                    Err(WorkerExit::Fault(fault)) => {
                        warn!(worker, %fault, "worker failed, cancelling run");
                        cancel.cancel();
                        wake_all();
                    }
                    Err(WorkerExit::Cancelled) => debug!(worker, "worker cancelled"),
                }
                outcome
            });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    // 起動済みのワーカーは来ない相手を待ち続けるので、中止して起こす
                    warn!(worker, error = %source, "failed to spawn worker, cancelling run");
                    cancel.cancel();
                    wake_all();
                    spawn_error = Some(AveragingError::Spawn { worker, source });
                    break;
                }
            }
        }

        let outcomes: Vec<Result<(), WorkerExit>> = handles
            .into_iter()
            .enumerate()
            .map(|(worker, handle)| {
                handle.join().unwrap_or_else(|payload| {
                    Err(WorkerExit::Fault(WorkerFault::Panicked {
                        worker,
                        iteration: 0,
                        message: panic_message(payload.as_ref()),
                    }))
                })
            })
            .collect();
        (outcomes, spawn_error)
    });

    if let Some(error) = spawn_error {
        return Err(error);
    }

    let faults: Vec<WorkerFault> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            Err(WorkerExit::Fault(fault)) => Some(fault),
            _ => None,
        })
        .collect();

    if faults.is_empty() {
        Ok(())
    } else {
        Err(AveragingError::WorkerFailure(faults))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn all_workers_run_once() {
        let ran = AtomicUsize::new(0);
        let cancel = Cancellation::new();
        run_workers(4, &RunConfig::default(), &cancel, || {}, |_ctx| {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 4);
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn panic_is_reported_with_worker_and_iteration() {
        let cancel = Cancellation::new();
        let err = run_workers(3, &RunConfig::default(), &cancel, || {}, |ctx| {
            for iteration in 0..5 {
                ctx.begin(iteration);
                if ctx.worker() == 1 && iteration == 2 {
                    panic!("injected");
                }
            }
            Ok(())
        })
        .unwrap_err();

        assert_eq!(
            err.faults(),
            &[WorkerFault::Panicked {
                worker: 1,
                iteration: 2,
                message: "injected".to_string(),
            }]
        );
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn cancelled_workers_are_not_faults() {
        let cancel = Cancellation::new();
        let err = run_workers(2, &RunConfig::default(), &cancel, || {}, |ctx| {
            if ctx.worker() == 0 {
                Err(WorkerExit::Fault(WorkerFault::Panicked {
                    worker: 0,
                    iteration: 0,
                    message: "first".to_string(),
                }))
            } else {
                Err(WorkerExit::Cancelled)
            }
        })
        .unwrap_err();
        assert_eq!(err.faults().len(), 1);
        assert_eq!(err.faults()[0].worker(), 0);
    }

    #[test]
    fn workers_are_named_by_index() {
        let cancel = Cancellation::new();
        run_workers(2, &RunConfig::default(), &cancel, || {}, |ctx| {
            let name = thread::current().name().map(str::to_string);
            assert_eq!(name, Some(format!("{WORKER_THREAD_PREFIX}{}", ctx.worker())));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn spawn_failure_releases_started_workers() {
        use crate::sync::CollectiveBarrier;

        // ワーカー2だけ起動できない。0 と 1 は3人揃うはずのバリアで待つ
        let barrier = CollectiveBarrier::new(3);
        let cancel = Cancellation::new();
        let builder = |worker| {
            let builder = worker_builder(worker, None);
            if worker == 2 { builder.stack_size(1 << 50) } else { builder }
        };

        let err = spawn_workers(3, builder, &cancel, || barrier.wake(), |_ctx| {
            barrier.wait(&cancel, None).map(|_| ()).map_err(|_| WorkerExit::Cancelled)
        })
        .unwrap_err();

        assert!(matches!(err, AveragingError::Spawn { worker: 2, .. }), "{err:?}");
        assert!(cancel.is_cancelled());
    }
}
