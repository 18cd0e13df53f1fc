use std::mem;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::warn;

use crate::error::{AveragingError, AveragingResult, WorkerFault};
use crate::implementations::worker::panic_message;
use crate::implementations::{Averaging, Stencil};
use crate::partition::{check_buffers, plan};

// rayon版: 反復ごとに区間単位で分割し、par_chunks_mut の合流をバリアとして使う
pub fn run_fork_join(
    iterations: usize,
    next: &mut [f64],
    curr: &mut [f64],
    n: usize,
    tasks: usize,
) -> AveragingResult<()> {
    run_fork_join_with(&Averaging, iterations, next, curr, n, tasks)
}

#[tracing::instrument(level = "debug", skip_all, fields(n = n, tasks = tasks, iterations = iterations))]
pub fn run_fork_join_with<'a, S: Stencil>(
    stencil: &S,
    iterations: usize,
    next: &'a mut [f64],
    curr: &'a mut [f64],
    n: usize,
    tasks: usize,
) -> AveragingResult<()> {
    check_buffers(n, next, curr)?;
    let partitions = plan(n, tasks)?;
    if iterations == 0 {
        return Ok(());
    }

    let chunk = n / tasks;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(tasks)
        .thread_name(|index| format!("averaging-fork-join-{index}"))
        .build()?;

    let mut next = next;
    let mut curr = curr;
    for iteration in 0..iterations {
        let src: &[f64] = curr;
        let dst = &mut next[1..=n];

        // 書き込み先を区間ごとに切り出すので、ロックなしで並列に書ける
        let faults: Vec<WorkerFault> = pool.install(|| {
            dst.par_chunks_mut(chunk)
                .zip(partitions.par_iter())
                .filter_map(|(dst_part, partition)| {
                    panic::catch_unwind(AssertUnwindSafe(|| {
                        let windows = src[partition.left - 1..=partition.right + 1].windows(3);
                        for (slot, window) in dst_part.iter_mut().zip(windows) {
                            *slot = stencil.apply(window[0], window[2]);
                        }
                    }))
                    .err()
                    .map(|payload| WorkerFault::Panicked {
                        worker: partition.worker,
                        iteration,
                        message: panic_message(payload.as_ref()),
                    })
                })
                .collect()
        });

        if !faults.is_empty() {
            warn!(iteration, failed = faults.len(), "fork-join sweep failed");
            return Err(AveragingError::WorkerFailure(faults));
        }

        mem::swap(&mut next, &mut curr);
    }
    Ok(())
}
