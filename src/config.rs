use std::time::Duration;

/// ブロックする前にスピンする回数
pub const SPIN_BEFORE_BLOCK: usize = 256;

/// 並列エンジン共通の実行設定。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// 同期待ちの上限。`None` なら無期限に待つ。
    pub wait_timeout: Option<Duration>,
    /// フェーズ待ちで Condvar に入る前のスピン回数
    pub spin_limit: usize,
    /// ワーカースレッドのスタックサイズ。`None` なら標準の値
    pub stack_size: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            wait_timeout: None,
            spin_limit: SPIN_BEFORE_BLOCK,
            stack_size: None,
        }
    }
}

impl RunConfig {
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    pub fn with_spin_limit(mut self, spin_limit: usize) -> Self {
        self.spin_limit = spin_limit;
        self
    }
}
