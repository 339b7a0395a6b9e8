use memsim::*;
use memsim::driver::{apply_all, RandomFlood, Request, RequestGen};
use rayon::prelude::*;

/// Compares placement policies over many random floods
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: SimConfig,

    /// Number of floods (seeds 0, 1, ...)
    #[arg(short = 'r', long, default_value_t = 16)]
    runs:   u64,

    /// Flood jobs per run (defaults to three times the capacity)
    #[arg(short = 'n', long)]
    jobs:   Option<usize>,

    /// Ticks to simulate after each flood
    #[arg(short = 't', long, default_value_t = 200)]
    ticks:  u32,
}

/// Per-run figures for one policy.
#[derive(Debug, Clone, Copy)]
struct Outcome {
    policy:         Policy,
    peak:           Units,
    completed:      u64,
    left_waiting:   usize,
    rejected:       usize,
    mean_wait:      f64,
    fragmentation:  f64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    cli.config.validate()?;
    let count = cli.jobs.unwrap_or(3 * cli.config.capacity as usize);
    let (config, ticks) = (&cli.config, cli.ticks);
    let total = Instant::now();

    // Every (seed, policy) pair gets its own simulator: nothing is shared.
    let outcomes: Vec<Outcome> = (0..cli.runs)
        .into_par_iter()
        .flat_map_iter(|seed| {
            let flood = RandomFlood::with_count(seed, config.capacity, count)
                .read_requests()
                .unwrap_or_else(|e| panic!("Flood {seed} failed: {e}"));
            [Policy::FirstFit, Policy::BestFit]
                .into_iter()
                .map(move |p| run_once(config, p, flood.clone(), ticks))
        })
        .collect();

    println!("Total simulation time: {} μs", total.elapsed().as_micros());
    println!("{:<10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8}", "policy", "peak", "completed", "waiting", "rejected", "mean wait", "frag %");
    for (policy, group) in &outcomes.iter()
        .sorted_by_key(|o| o.policy)
        .chunk_by(|o| o.policy) {
        let group: Vec<&Outcome> = group.collect();
        let n = group.len() as f64;
        println!(
            "{:<10} {:>10.1} {:>10.1} {:>10.1} {:>10.1} {:>10.2} {:>8.2}",
            policy.to_string(),
            group.iter().map(|o| o.peak as f64).sum::<f64>() / n,
            group.iter().map(|o| o.completed as f64).sum::<f64>() / n,
            group.iter().map(|o| o.left_waiting as f64).sum::<f64>() / n,
            group.iter().map(|o| o.rejected as f64).sum::<f64>() / n,
            group.iter().map(|o| o.mean_wait).sum::<f64>() / n,
            group.iter().map(|o| o.fragmentation).sum::<f64>() / n * 100.0,
        );
    }

    Ok(())
}

fn run_once(config: &SimConfig, policy: Policy, flood: Vec<Request>, ticks: u32) -> Outcome {
    let mut sim = Simulator::new(config.clone().with_policy(policy))
        .unwrap_or_else(|e| panic!("Validated config rejected: {e}"));
    let rejected = apply_all(&mut sim, flood).len();
    let mut waits = vec![];
    let mut frag_samples = vec![];
    for _ in 0..ticks {
        let report = sim.tick();
        waits.extend(report.newly_admitted
            .iter()
            .filter_map(|id| sim.job(*id).and_then(|j| j.waited())));
        frag_samples.push(sim.stats().external_fragmentation());
    }
    let stats = sim.stats();
    let mean = |v: &[f64]| if v.is_empty() { 0.0 } else { v.iter().sum::<f64>() / v.len() as f64 };

    Outcome {
        policy,
        peak:           stats.peak_occupancy,
        completed:      stats.completed_count,
        left_waiting:   stats.waiting_count,
        rejected,
        mean_wait:      mean(&waits.iter().map(|w| *w as f64).collect_vec()),
        fragmentation:  mean(&frag_samples),
    }
}
