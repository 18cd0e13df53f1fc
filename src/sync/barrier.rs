use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{Cancellation, WaitError};

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: usize,
}

/// 全員が到着するまで誰も進まない再利用可能なバリア。
///
/// `std::sync::Barrier` と違い、中止と上限時間つきの待機に対応する。
#[derive(Debug)]
pub struct CollectiveBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl CollectiveBarrier {
    pub fn new(parties: usize) -> Self {
        CollectiveBarrier {
            parties,
            state: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        }
    }

    /// 全員の到着を待つ。最後に到着したスレッドだけ `Ok(true)` を返す。
    pub fn wait(&self, cancel: &Cancellation, timeout: Option<Duration>) -> Result<bool, WaitError> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.state.lock();
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }

        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.released.notify_all();
            return Ok(true);
        }

        while state.generation == generation {
            if cancel.is_cancelled() {
                return Err(WaitError::Cancelled);
            }
            match deadline {
                Some(deadline) => {
                    if self.released.wait_until(&mut state, deadline).timed_out()
                        && state.generation == generation
                    {
                        // 到着を取り消してから抜ける
                        state.arrived -= 1;
                        return Err(WaitError::TimedOut);
                    }
                }
                None => self.released.wait(&mut state),
            }
        }
        Ok(false)
    }

    /// 待機中のスレッドを起こす。中止時に使う。
    pub fn wake(&self) {
        let _state = self.state.lock();
        self.released.notify_all();
    }
}
