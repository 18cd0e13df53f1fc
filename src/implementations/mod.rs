pub mod barrier;
pub mod fork_join;
pub mod neighbor;
pub mod single;

mod shared;
mod worker;

use crate::config::RunConfig;
use crate::error::AveragingResult;

/// ワーカースレッド名の接頭辞。後ろにワーカー番号が付く
pub const WORKER_THREAD_PREFIX: &str = "averaging-worker-";

/// 1点の更新式。半径1のステンシルなので左右の値だけを受け取る。
pub trait Stencil: Sync {
    fn apply(&self, left: f64, right: f64) -> f64;
}

/// 左右の平均
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Averaging;

impl Stencil for Averaging {
    #[inline(always)]
    fn apply(&self, left: f64, right: f64) -> f64 {
        (left + right) / 2.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
    Sequential,
    GlobalBarrier,
    NeighborBarrier,
    ForkJoin,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Sequential,
        Variant::GlobalBarrier,
        Variant::NeighborBarrier,
        Variant::ForkJoin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variant::Sequential => "Sequential",
            Variant::GlobalBarrier => "Global Barrier",
            Variant::NeighborBarrier => "Neighbor Barrier",
            Variant::ForkJoin => "Fork-Join (rayon)",
        }
    }

    /// 既定の設定と平均化ステンシルで実行する。逐次版は `tasks` を無視する。
    pub fn run(
        self,
        iterations: usize,
        next: &mut [f64],
        curr: &mut [f64],
        n: usize,
        tasks: usize,
    ) -> AveragingResult<()> {
        self.run_with(&RunConfig::default(), &Averaging, iterations, next, curr, n, tasks)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run_with<S: Stencil>(
        self,
        config: &RunConfig,
        stencil: &S,
        iterations: usize,
        next: &mut [f64],
        curr: &mut [f64],
        n: usize,
        tasks: usize,
    ) -> AveragingResult<()> {
        match self {
            Variant::Sequential => single::run_sequential_with(stencil, iterations, next, curr, n),
            Variant::GlobalBarrier => {
                barrier::run_parallel_barrier_with(config, stencil, iterations, next, curr, n, tasks)
            }
            Variant::NeighborBarrier => neighbor::run_parallel_fuzzy_barrier_with(
                config, stencil, iterations, next, curr, n, tasks,
            ),
            Variant::ForkJoin => fork_join::run_fork_join_with(stencil, iterations, next, curr, n, tasks),
        }
    }
}
