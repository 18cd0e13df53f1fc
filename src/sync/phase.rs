use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{Cancellation, WaitError};

/// 1ワーカー分のフェーズカウンタ。
///
/// 値は「完了したフェーズの数」。`arrive` は待たずに1進め、
/// `await_phase(p)` はフェーズ `p` の完了（値が `p + 1` 以上）まで待つ。
/// 担当区間への書き込み → `arrive`(Release) → 隣の Acquire 読み込み、の順序で
/// 境界要素の読み取りが安全になる。
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct PhaseCounter {
    completed: AtomicUsize,
    lock: Mutex<()>,
    advanced: Condvar,
}

impl PhaseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 完了済みフェーズ数
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    /// 今のフェーズを完了にして、その番号を返す（0始まり）。ブロックしない。
    pub fn arrive(&self) -> usize {
        let phase = self.completed.fetch_add(1, Ordering::AcqRel);
        // ロックを取ってから通知しないと、確認と wait の間に通知が落ちる
        let _guard = self.lock.lock();
        self.advanced.notify_all();
        phase
    }

    /// 待機中のスレッドを起こす。中止時に使う。
    pub fn wake(&self) {
        let _guard = self.lock.lock();
        self.advanced.notify_all();
    }

    /// フェーズ `phase` が完了するまで待つ。
    ///
    /// 最初に `spin_limit` 回だけスピンし、その後 Condvar でブロックする。
    pub fn await_phase(
        &self,
        phase: usize,
        cancel: &Cancellation,
        spin_limit: usize,
        timeout: Option<Duration>,
    ) -> Result<(), WaitError> {
        let target = phase + 1;
        for _ in 0..spin_limit {
            if self.completed.load(Ordering::Acquire) >= target {
                return Ok(());
            }
            std::hint::spin_loop();
        }

        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut guard = self.lock.lock();
        loop {
            if self.completed.load(Ordering::Acquire) >= target {
                return Ok(());
            }
            if cancel.is_cancelled() {
                return Err(WaitError::Cancelled);
            }
            match deadline {
                Some(deadline) => {
                    if self.advanced.wait_until(&mut guard, deadline).timed_out() {
                        if self.completed.load(Ordering::Acquire) >= target {
                            return Ok(());
                        }
                        return Err(WaitError::TimedOut);
                    }
                }
                None => self.advanced.wait(&mut guard),
            }
        }
    }
}
