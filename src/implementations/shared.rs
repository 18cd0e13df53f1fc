use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::error::{AveragingError, AveragingResult};
use crate::implementations::Stencil;
use crate::partition::Partition;

/// 最初の反復で読む側のバッファ番号 (`curr`)。書く側は `FIRST_READ ^ 1`。
pub(crate) const FIRST_READ: usize = 0;

// ポインタをスレッド間で渡すためのラッパー (Send/Sync実装)
#[derive(Clone, Copy, Debug)]
struct BufferPtr(NonNull<f64>);

// SAFETY: 書き込みは RangeLease を通して区間ごとに分けられており、
// 区間をまたぐ読み取りの順序は各エンジンの同期で保証する
unsafe impl Send for BufferPtr {}
unsafe impl Sync for BufferPtr {}

/// 呼び出し元の `curr`/`next` を実行中だけ借りて、ワーカー間で共有する。
pub(crate) struct SharedBuffers<'a> {
    buffers: [BufferPtr; 2],
    len: usize,
    _borrow: PhantomData<&'a mut [f64]>,
}

impl<'a> SharedBuffers<'a> {
    pub(crate) fn new(next: &'a mut [f64], curr: &'a mut [f64]) -> Self {
        debug_assert_eq!(next.len(), curr.len());
        let len = curr.len();
        SharedBuffers {
            buffers: [
                BufferPtr(NonNull::from(curr).cast()),
                BufferPtr(NonNull::from(next).cast()),
            ],
            len,
            _borrow: PhantomData,
        }
    }

    /// 区間ごとの書き込み権を発行する。区間が内部点に収まり、互いに重ならない場合のみ。
    pub(crate) fn leases(&self, partitions: &[Partition]) -> AveragingResult<Vec<RangeLease<'_>>> {
        let n = self.len - 2;
        let mut next_free = 1;
        for part in partitions {
            if part.is_empty() || part.left < next_free || part.right > n {
                return Err(AveragingError::InvalidPartition {
                    n,
                    tasks: partitions.len(),
                });
            }
            next_free = part.right + 1;
        }

        Ok(partitions
            .iter()
            .map(|&partition| RangeLease {
                buffers: self.buffers,
                partition,
                _shared: PhantomData,
            })
            .collect())
    }
}

/// 1ワーカーが `[left, right]` に書き込むための権利。
pub(crate) struct RangeLease<'s> {
    buffers: [BufferPtr; 2],
    partition: Partition,
    _shared: PhantomData<&'s ()>,
}

impl RangeLease<'_> {
    pub(crate) fn partition(&self) -> Partition {
        self.partition
    }

    /// `read` 側を読み、反対側の `[left, right]` に1反復分を書き込む。
    ///
    /// # Safety
    ///
    /// 呼び出している間、他のスレッドが `read` 側の `[left - 1, right + 1]` に書き込まず、
    /// 反対側の `[left, right]` を読み書きしないこと。
    pub(crate) unsafe fn sweep<S: Stencil>(&self, stencil: &S, read: usize) {
        let src = self.buffers[read].0.as_ptr() as *const f64;
        let dst = self.buffers[read ^ 1].0.as_ptr();
        for j in self.partition.indices() {
            // SAFETY: leases() で 1 <= left かつ right <= n を確認済みなので j ± 1 は範囲内
            unsafe {
                *dst.add(j) = stencil.apply(*src.add(j - 1), *src.add(j + 1));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implementations::Averaging;
    use crate::partition::plan;

    #[test]
    fn sweep_writes_only_its_range() {
        let mut curr = vec![1.0, 2.0, 4.0, 6.0, 8.0, 0.0];
        let mut next = vec![-1.0; 6];
        {
            let shared = SharedBuffers::new(&mut next, &mut curr);
            let leases = shared.leases(&plan(4, 2).unwrap()).unwrap();
            // SAFETY: 単一スレッド
            unsafe { leases[1].sweep(&Averaging, FIRST_READ) };
        }
        assert_eq!(next, vec![-1.0, -1.0, -1.0, 6.0, 3.0, -1.0]);
    }

    #[test]
    fn overlapping_partitions_are_refused() {
        let mut curr = vec![0.0; 6];
        let mut next = vec![0.0; 6];
        let shared = SharedBuffers::new(&mut next, &mut curr);
        let overlapping = [
            Partition { worker: 0, left: 1, right: 3 },
            Partition { worker: 1, left: 3, right: 4 },
        ];
        assert!(shared.leases(&overlapping).is_err());
        let outside = [Partition { worker: 0, left: 1, right: 5 }];
        assert!(shared.leases(&outside).is_err());
    }
}
