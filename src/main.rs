use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use averaging_rust::grid::{ITERATIONS, LEFT_BOUNDARY, N, RIGHT_BOUNDARY, StencilBuffers, WARMUP_ITERATIONS};
use averaging_rust::{Averaging, RunConfig, Variant};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

const EPSILON: f64 = 1e-9;

#[derive(Parser, Debug)]
#[command(name = "averaging_bench")]
#[command(about = "1次元反復平均化ベンチマーク")]
#[command(version)]
struct Args {
    /// 内部点の数
    #[arg(short, long, default_value_t = N)]
    n: usize,

    /// 反復回数
    #[arg(short, long, default_value_t = ITERATIONS)]
    iterations: usize,

    /// ワーカー数（n を割り切る必要がある）
    #[arg(short, long, default_value_t = 2)]
    tasks: usize,

    /// 測定回数
    #[arg(long, default_value_t = 15)]
    runs: usize,

    /// ウォームアップ回数
    #[arg(long, default_value_t = 3)]
    warmup: usize,

    /// 同期待ちの上限（ミリ秒）。省略時は無期限
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// 実行する実装。省略時は全部
    #[arg(long, value_enum)]
    variant: Vec<CliVariant>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliVariant {
    /// 逐次版
    Sequential,
    /// 全体バリア版
    Barrier,
    /// 隣接ワーカーだけを待つファジーバリア版
    Fuzzy,
    /// rayon のフォークジョイン版
    ForkJoin,
}

impl From<CliVariant> for Variant {
    fn from(cli: CliVariant) -> Self {
        match cli {
            CliVariant::Sequential => Variant::Sequential,
            CliVariant::Barrier => Variant::GlobalBarrier,
            CliVariant::Fuzzy => Variant::NeighborBarrier,
            CliVariant::ForkJoin => Variant::ForkJoin,
        }
    }
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

fn main() -> Result<()> {
    setup_logging();
    let args = Args::parse();

    if args.runs == 0 {
        bail!("--runs must be at least 1");
    }

    let mut config = RunConfig::default();
    if let Some(ms) = args.timeout_ms {
        config = config.with_wait_timeout(Duration::from_millis(ms));
    }

    let variants: Vec<Variant> = if args.variant.is_empty() {
        Variant::ALL.to_vec()
    } else {
        args.variant.iter().copied().map(Variant::from).collect()
    };

    println!("=== 1次元反復平均化ベンチマーク ===");
    println!(
        "n: {}, 反復回数: {}, 測定回数: {}, ワーカー数: {}\n",
        args.n, args.iterations, args.runs, args.tasks
    );

    // 正解データ
    let mut expected = StencilBuffers::new(args.n, LEFT_BOUNDARY, RIGHT_BOUNDARY);
    let expected = expected.run(Variant::Sequential, args.iterations, 1)?.to_vec();

    for variant in variants {
        run_benchmark(variant, &args, &config, &expected)?;
    }

    println!("=== ベンチマーク完了 ===");
    Ok(())
}

fn run_benchmark(variant: Variant, args: &Args, config: &RunConfig, expected: &[f64]) -> Result<()> {
    println!("{}:", variant.name());
    info!(variant = variant.name(), "benchmark start");

    // ウォームアップ
    for _ in 0..args.warmup {
        run_once(variant, args, config, WARMUP_ITERATIONS)?;
    }

    let mut times = Vec::with_capacity(args.runs);
    let mut max_deviation = 0.0f64;
    for run in 0..args.runs {
        let (duration, output) = run_once(variant, args, config, args.iterations)?;
        max_deviation = output
            .iter()
            .zip(expected)
            .map(|(a, b)| (a - b).abs())
            .fold(max_deviation, f64::max);
        times.push(duration);
        println!("  試行 {:2}: {:?}", run + 1, duration);
    }

    // 統計計算
    times.sort();
    let median = times[times.len() / 2];
    let avg = times.iter().sum::<Duration>() / times.len() as u32;

    println!("  ---");
    println!("  最小値:   {:?}", times[0]);
    println!("  中央値:   {:?}", median);
    println!("  平均値:   {:?}", avg);
    println!("  最大値:   {:?}", times[times.len() - 1]);
    println!("  逐次版との最大誤差: {:e}", max_deviation);
    println!();

    if max_deviation > EPSILON {
        bail!("{} deviates from the sequential result by {max_deviation:e}", variant.name());
    }
    Ok(())
}

fn run_once(variant: Variant, args: &Args, config: &RunConfig, iterations: usize) -> Result<(Duration, Vec<f64>)> {
    let mut buffers = StencilBuffers::new(args.n, LEFT_BOUNDARY, RIGHT_BOUNDARY);
    let n = buffers.n();

    let start = Instant::now();
    variant.run_with(
        config,
        &Averaging,
        iterations,
        &mut buffers.next,
        &mut buffers.current,
        n,
        args.tasks,
    )?;
    let elapsed = start.elapsed();

    Ok((elapsed, buffers.output(iterations).to_vec()))
}
