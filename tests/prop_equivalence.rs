//! proptest による性質テスト
//!
//! 対象: 並列版と逐次版の一致、境界の不変性、区間の被覆、割り切れない分割の拒否

use averaging_rust::{AveragingError, Variant, plan, select_output};
use proptest::prelude::*;

const EPSILON: f64 = 1e-9;

fn run(variant: Variant, values: &[f64], iterations: usize, tasks: usize) -> (Vec<f64>, Vec<f64>) {
    let n = values.len() - 2;
    let mut curr = values.to_vec();
    let mut next = values.to_vec();
    variant.run(iterations, &mut next, &mut curr, n, tasks).unwrap();
    (next, curr)
}

/// n = chunk * tasks となる問題と初期値
fn problem() -> impl Strategy<Value = (usize, Vec<f64>)> {
    (1usize..6, 1usize..6).prop_flat_map(|(chunk, tasks)| {
        let n = chunk * tasks;
        (Just(tasks), prop::collection::vec(-100.0f64..100.0, n + 2))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// どの並列版も逐次版と誤差 1e-9 以内で一致する
    #[test]
    fn parallel_matches_sequential((tasks, values) in problem(), iterations in 0usize..12) {
        let (next, curr) = run(Variant::Sequential, &values, iterations, 1);
        let expected = select_output(iterations, &next, &curr).to_vec();

        for variant in [Variant::GlobalBarrier, Variant::NeighborBarrier, Variant::ForkJoin] {
            let (next, curr) = run(variant, &values, iterations, tasks);
            let output = select_output(iterations, &next, &curr);
            for (j, (a, b)) in expected.iter().zip(output).enumerate() {
                prop_assert!((a - b).abs() <= EPSILON,
                    "{} differs at {}: {} vs {}", variant.name(), j, a, b);
            }
        }
    }

    /// index 0 と n+1 はどの実装でも書き換えられない
    #[test]
    fn boundaries_are_never_written((tasks, values) in problem(), iterations in 1usize..8) {
        let n = values.len() - 2;
        for variant in Variant::ALL {
            let (next, curr) = run(variant, &values, iterations, tasks);
            for buffer in [&next, &curr] {
                prop_assert_eq!(buffer[0], values[0]);
                prop_assert_eq!(buffer[n + 1], values[n + 1]);
            }
        }
    }

    /// 割り切れる場合、区間の和集合はちょうど 1..=n
    #[test]
    fn partitions_cover_interior(chunk in 1usize..20, tasks in 1usize..12) {
        let n = chunk * tasks;
        let parts = plan(n, tasks).unwrap();
        prop_assert_eq!(parts.len(), tasks);
        let mut expected_left = 1;
        for (worker, part) in parts.iter().enumerate() {
            prop_assert_eq!(part.worker, worker);
            prop_assert_eq!(part.left, expected_left);
            prop_assert_eq!(part.len(), chunk);
            expected_left = part.right + 1;
        }
        prop_assert_eq!(expected_left, n + 1);
    }

    /// 割り切れない場合は余りを捨てずに拒否する
    #[test]
    fn uneven_partitions_are_rejected(n in 2usize..60, tasks in 2usize..12) {
        prop_assume!(tasks <= n && n % tasks != 0);
        let is_invalid = matches!(plan(n, tasks), Err(AveragingError::InvalidPartition { .. }));
        prop_assert!(is_invalid);
    }
}
