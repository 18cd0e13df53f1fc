use std::time::Instant;

use tracing::trace;

use crate::config::RunConfig;
use crate::error::{AveragingResult, Awaiting};
use crate::implementations::shared::{FIRST_READ, SharedBuffers};
use crate::implementations::worker::run_workers;
use crate::implementations::{Averaging, Stencil};
use crate::partition::{check_buffers, plan};
use crate::sync::{Cancellation, CollectiveBarrier};

/*
  全体バリア版

  - 各ワーカーは自分の区間 [left, right] だけを書き込み先に計算する
  - 計算後にバリアで全員を待つ（一番遅いワーカーが毎反復の律速になる）
  - バリアを抜けたら各自が読み書きの役割を入れ替える
    区間は互いに素なので、全体で1回入れ替えるのと同じ
*/

pub fn run_parallel_barrier(
    iterations: usize,
    next: &mut [f64],
    curr: &mut [f64],
    n: usize,
    tasks: usize,
) -> AveragingResult<()> {
    run_parallel_barrier_with(&RunConfig::default(), &Averaging, iterations, next, curr, n, tasks)
}

#[tracing::instrument(level = "debug", skip_all, fields(n = n, tasks = tasks, iterations = iterations))]
pub fn run_parallel_barrier_with<S: Stencil>(
    config: &RunConfig,
    stencil: &S,
    iterations: usize,
    next: &mut [f64],
    curr: &mut [f64],
    n: usize,
    tasks: usize,
) -> AveragingResult<()> {
    check_buffers(n, next, curr)?;
    let partitions = plan(n, tasks)?;
    if iterations == 0 {
        return Ok(());
    }

    let shared = SharedBuffers::new(next, curr);
    let leases = shared.leases(&partitions)?;
    let barrier = CollectiveBarrier::new(tasks);
    let cancel = Cancellation::new();

    run_workers(tasks, config, &cancel, || barrier.wake(), |ctx| {
        let lease = &leases[ctx.worker()];
        let partition = lease.partition();
        trace!(worker = partition.worker, left = partition.left, right = partition.right, "partition");

        let mut read = FIRST_READ;
        for iteration in 0..iterations {
            ctx.begin(iteration);

            // SAFETY: 区間は互いに素。全員がバリアで同じ反復に揃うので、
            // 読み取り中のバッファに書き込むワーカーはいない
            unsafe { lease.sweep(stencil, read) };

            let started = Instant::now();
            barrier
                .wait(&cancel, config.wait_timeout)
                .map_err(|error| ctx.wait_failed(error, Awaiting::Barrier, started.elapsed()))?;

            read ^= 1;
        }
        Ok(())
    })
}
