use std::mem;

use crate::error::AveragingResult;
use crate::implementations::{Averaging, Stencil};
use crate::partition::check_buffers;

/// 逐次版。並列版の正解データとして使う。
///
/// 各反復の後で `next`/`curr` の参照を入れ替えるので、
/// 奇数回なら結果は `next`、偶数回なら `curr` に残る。
pub fn run_sequential(iterations: usize, next: &mut [f64], curr: &mut [f64], n: usize) -> AveragingResult<()> {
    run_sequential_with(&Averaging, iterations, next, curr, n)
}

pub fn run_sequential_with<'a, S: Stencil>(
    stencil: &S,
    iterations: usize,
    next: &'a mut [f64],
    curr: &'a mut [f64],
    n: usize,
) -> AveragingResult<()> {
    check_buffers(n, next, curr)?;

    let mut next = next;
    let mut curr = curr;
    for _ in 0..iterations {
        // curr.windows(3) の k 番目は j = k + 1 の左右を含む
        for (dst, window) in next[1..=n].iter_mut().zip(curr.windows(3)) {
            *dst = stencil.apply(window[0], window[2]);
        }
        mem::swap(&mut next, &mut curr);
    }
    Ok(())
}
