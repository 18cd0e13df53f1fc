use crate::error::{AveragingError, AveragingResult};

/// ワーカー1つが担当する内部点の閉区間 `[left, right]`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partition {
    pub worker: usize,
    pub left: usize,
    pub right: usize,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.right + 1 - self.left
    }

    pub fn is_empty(&self) -> bool {
        self.right < self.left
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.left..=self.right
    }
}

/// `worker` 番目の担当区間。`n / tasks` 単位で1から詰めていく。
///
/// `tasks` の検証は [`plan`] が行う。
pub(crate) fn partition(worker: usize, n: usize, tasks: usize) -> Partition {
    let chunk = n / tasks;
    Partition {
        worker,
        left: worker * chunk + 1,
        right: (worker + 1) * chunk,
    }
}

/// 全ワーカーの区間を作る。`tasks` が `n` を割り切れない場合は余りを捨てずにエラー。
pub fn plan(n: usize, tasks: usize) -> AveragingResult<Vec<Partition>> {
    if n == 0 {
        return Err(AveragingError::EmptyProblem);
    }
    if tasks == 0 || tasks > n || n % tasks != 0 {
        return Err(AveragingError::InvalidPartition { n, tasks });
    }
    Ok((0..tasks).map(|worker| partition(worker, n, tasks)).collect())
}

/// 両バッファが長さ `n + 2` であることを確認する。
pub fn check_buffers(n: usize, next: &[f64], curr: &[f64]) -> AveragingResult<()> {
    if n == 0 {
        return Err(AveragingError::EmptyProblem);
    }
    let expected = n + 2;
    for actual in [next.len(), curr.len()] {
        if actual != expected {
            return Err(AveragingError::BufferLength { expected, actual });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_cover_interior_exactly_once() {
        let parts = plan(12, 4).unwrap();
        let mut seen = vec![0usize; 14];
        for part in &parts {
            for j in part.indices() {
                seen[j] += 1;
            }
        }
        assert_eq!(seen[0], 0);
        assert_eq!(seen[13], 0);
        assert!(seen[1..=12].iter().all(|&count| count == 1));
    }

    #[test]
    fn single_task_owns_everything() {
        assert_eq!(
            plan(5, 1).unwrap(),
            vec![Partition { worker: 0, left: 1, right: 5 }]
        );
    }

    #[test]
    fn uneven_split_is_rejected() {
        assert!(matches!(
            plan(5, 2),
            Err(AveragingError::InvalidPartition { n: 5, tasks: 2 })
        ));
    }

    #[test]
    fn too_many_or_zero_tasks_are_rejected() {
        assert!(matches!(plan(4, 8), Err(AveragingError::InvalidPartition { .. })));
        assert!(matches!(plan(4, 0), Err(AveragingError::InvalidPartition { .. })));
        assert!(matches!(plan(0, 1), Err(AveragingError::EmptyProblem)));
    }

    #[test]
    fn buffer_lengths_are_checked() {
        let good = vec![0.0; 6];
        let short = vec![0.0; 5];
        assert!(check_buffers(4, &good, &good).is_ok());
        assert!(matches!(
            check_buffers(4, &good, &short),
            Err(AveragingError::BufferLength { expected: 6, actual: 5 })
        ));
    }
}
