use std::time::Instant;

use tracing::trace;

use crate::config::RunConfig;
use crate::error::{AveragingResult, Awaiting};
use crate::implementations::shared::{FIRST_READ, SharedBuffers};
use crate::implementations::worker::{WorkerContext, WorkerExit, run_workers};
use crate::implementations::{Averaging, Stencil};
use crate::partition::{check_buffers, plan};
use crate::sync::{Cancellation, PhaseCounter};

/*
  ファジーバリア版（隣接ワーカーとの1対1の同期）

  各反復でワーカー i は:
  1. 自分の区間 [left_i, right_i] を計算
  2. arrive: 自分のフェーズカウンタを p から p+1 へ進める（待たない）
  3. i > 0 なら、ワーカー i-1 がフェーズ p を完了するまで待つ
     （次の反復で読む left_i - 1 は i-1 が書く）
  4. i < tasks-1 なら、ワーカー i+1 も同様に待つ（right_i + 1）
  5. 読み書きの役割を入れ替える

  待つのは「自分が今完了したフェーズ」だけなので、フェーズごとの待ち合わせは
  鎖になり、循環しない。遠くの遅いワーカーを待たずに済む。
*/

pub fn run_parallel_fuzzy_barrier(
    iterations: usize,
    next: &mut [f64],
    curr: &mut [f64],
    n: usize,
    tasks: usize,
) -> AveragingResult<()> {
    run_parallel_fuzzy_barrier_with(&RunConfig::default(), &Averaging, iterations, next, curr, n, tasks)
}

#[tracing::instrument(level = "debug", skip_all, fields(n = n, tasks = tasks, iterations = iterations))]
pub fn run_parallel_fuzzy_barrier_with<S: Stencil>(
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
    let counters: Vec<PhaseCounter> = (0..tasks).map(|_| PhaseCounter::new()).collect();
    let cancel = Cancellation::new();

    let wake_all = || counters.iter().for_each(PhaseCounter::wake);

    run_workers(tasks, config, &cancel, wake_all, |ctx| {
        let worker = ctx.worker();
        let lease = &leases[worker];
        let partition = lease.partition();
        trace!(worker, left = partition.left, right = partition.right, "partition");

        let mut read = FIRST_READ;
        for iteration in 0..iterations {
            ctx.begin(iteration);

            // SAFETY: 区間は互いに素。隣との境界要素は、下の待ち合わせにより
            // 隣が前の反復の書き込みと読み取りを終えてから扱う
            unsafe { lease.sweep(stencil, read) };

            let phase = counters[worker].arrive();
            debug_assert_eq!(phase, iteration);
            trace!(worker, phase, "arrived");

            if worker > 0 {
                await_neighbor(ctx, &counters[worker - 1], worker - 1, phase, &cancel, config)?;
            }
            if worker + 1 < tasks {
                await_neighbor(ctx, &counters[worker + 1], worker + 1, phase, &cancel, config)?;
            }

            read ^= 1;
        }
        Ok(())
    })
}

fn await_neighbor(
    ctx: &WorkerContext,
    counter: &PhaseCounter,
    neighbor: usize,
    phase: usize,
    cancel: &Cancellation,
    config: &RunConfig,
) -> Result<(), WorkerExit> {
    let started = Instant::now();
    counter
        .await_phase(phase, cancel, config.spin_limit, config.wait_timeout)
        .map_err(|error| ctx.wait_failed(error, Awaiting::Neighbor(neighbor), started.elapsed()))?;
    trace!(worker = ctx.worker(), neighbor, phase, "neighbor reached phase");
    Ok(())
}
