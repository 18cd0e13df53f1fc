use crate::error::{AveragingError, AveragingResult};
use crate::implementations::Variant;

pub const N: usize = 1_000_000; // 内部点の数
pub const ITERATIONS: usize = 100; // 反復回数
pub const WARMUP_ITERATIONS: usize = 10; // ウォームアップ数
pub const LEFT_BOUNDARY: f64 = 0.0; // index 0 の固定値
pub const RIGHT_BOUNDARY: f64 = 1.0; // index n+1 の固定値

/// 反復回数の偶奇から、最終結果が入っている方のバッファを返す。
///
/// 奇数回なら `next`、偶数回（0回を含む）なら `curr`。
pub fn select_output<'a>(iterations: usize, next: &'a [f64], curr: &'a [f64]) -> &'a [f64] {
    if iterations % 2 == 1 { next } else { curr }
}

/// `current`/`next` のバッファ対。両方とも長さ `n + 2` で、両端は境界値。
#[derive(Clone, Debug)]
pub struct StencilBuffers {
    pub current: Vec<f64>,
    pub next: Vec<f64>,
}

impl StencilBuffers {
    /// 内部点を 0.0 で初期化し、両端に境界値を置く。
    pub fn new(n: usize, left: f64, right: f64) -> Self {
        let mut current = vec![0.0; n + 2];
        current[0] = left;
        current[n + 1] = right;
        StencilBuffers {
            next: current.clone(),
            current,
        }
    }

    /// 境界値込みの初期配列から作る。`next` は同じ内容の複製。
    pub fn from_values(values: Vec<f64>) -> AveragingResult<Self> {
        if values.len() < 3 {
            return Err(AveragingError::EmptyProblem);
        }
        Ok(StencilBuffers {
            next: values.clone(),
            current: values,
        })
    }

    pub fn n(&self) -> usize {
        self.current.len() - 2
    }

    pub fn run(&mut self, variant: Variant, iterations: usize, tasks: usize) -> AveragingResult<&[f64]> {
        let n = self.n();
        variant.run(iterations, &mut self.next, &mut self.current, n, tasks)?;
        Ok(self.output(iterations))
    }

    pub fn output(&self, iterations: usize) -> &[f64] {
        select_output(iterations, &self.next, &self.current)
    }
}
