//! 1次元の反復平均化ステンシル `next[j] = (curr[j-1] + curr[j+1]) / 2`。
//!
//! 逐次版、全体バリア版、隣接ワーカーだけを待つファジーバリア版、
//! rayon のフォークジョイン版を同じ結果になるように実装している。

pub mod config;
pub mod error;
pub mod grid;
pub mod implementations;
pub mod partition;
pub mod sync;

pub use config::RunConfig;
pub use error::{AveragingError, AveragingResult, Awaiting, WorkerFault};
pub use grid::{StencilBuffers, select_output};
pub use implementations::barrier::{run_parallel_barrier, run_parallel_barrier_with};
pub use implementations::fork_join::{run_fork_join, run_fork_join_with};
pub use implementations::neighbor::{run_parallel_fuzzy_barrier, run_parallel_fuzzy_barrier_with};
pub use implementations::single::{run_sequential, run_sequential_with};
pub use implementations::{Averaging, Stencil, Variant, WORKER_THREAD_PREFIX};
pub use partition::{Partition, plan};
