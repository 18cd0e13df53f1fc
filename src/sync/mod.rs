//! ワーカー間の同期プリミティブ。
//!
//! - [`CollectiveBarrier`]: 全員が到着するまで誰も進まないバリア
//! - [`PhaseCounter`]: ワーカーごとの完了フェーズ数。隣接ワーカーだけが待つ
//!
//! どちらも [`Cancellation`] を待機のたびに確認し、上限時間つきで待てる。

mod barrier;
mod phase;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use barrier::CollectiveBarrier;
pub use phase::PhaseCounter;

/// 待機が失敗した理由。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitError {
    /// 他のワーカーが失敗して実行が中止された
    Cancelled,
    /// 上限時間を過ぎた
    TimedOut,
}

/// 実行全体で共有する中止フラグ。
#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
