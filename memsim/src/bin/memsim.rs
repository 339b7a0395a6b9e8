use memsim::*;
use memsim::driver::{apply_all, RandomFlood, RequestGen, ScriptParser, Ticker};

/// A turn-based simulator of contiguous memory allocation
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config:     SimConfig,

    /// Request script to replay (CSV, header line first)
    #[arg(short, long, value_parser = clap::value_parser!(PathBuf))]
    script:     Option<PathBuf>,

    /// Seed for a random job flood, used when no script is given
    #[arg(long, default_value_t = 0)]
    seed:       u64,

    /// Number of flood jobs (defaults to three times the capacity)
    #[arg(short = 'n', long)]
    jobs:       Option<usize>,

    /// Ticks to run after all requests were applied
    #[arg(short = 't', long, default_value_t = 0)]
    ticks:      u32,

    /// Width of the printed memory map, in characters
    #[arg(short = 'w', long, default_value_t = 64)]
    width:      usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    cli.config.validate()?;
    let mut sim = Simulator::new(cli.config.clone())?;

    let requests = match cli.script {
        Some(ref path) => {
            anyhow::ensure!(path.is_file(), "Invalid script path {}", path.display());
            ScriptParser::new(path.clone()).read_requests()?
        },
        None => {
            let capacity = cli.config.capacity;
            let count = cli.jobs.unwrap_or(3 * capacity as usize);
            RandomFlood::with_count(cli.seed, capacity, count).read_requests()?
        }
    };
    let skipped = apply_all(&mut sim, requests);

    let ticker = Ticker::new(sim);
    let reports = ticker.run(cli.ticks)?;
    let snap = ticker.snapshot();

    print_map(&snap, cli.width);
    for r in &snap.regions {
        println!("  {}", label::region_caption(cli.config.base_address, r, &snap.admitted));
    }
    if !snap.waiting.is_empty() {
        println!("Waiting:\t{}", snap.waiting.iter().map(|j| format!("{} ({})", j.name, j.size)).join(", "));
    }
    let s = snap.stats;
    println!(
        "Tick:\t\t{}\nPolicy:\t\t{}\nOccupancy:\t{} / {} units ({:.2}%)\nPeak:\t\t{} units\nCompleted:\t{} jobs, {} units\nFragmentation:\t{:.2}%\nSkipped:\t{} requests\nAdmitted on replay: {}",
        snap.now,
        snap.policy,
        s.occupancy,
        s.capacity,
        s.utilization() * 100.0,
        s.peak_occupancy,
        s.completed_count,
        s.completed_size,
        s.external_fragmentation() * 100.0,
        skipped.len(),
        reports.iter().map(|r| r.newly_admitted.len()).sum::<usize>(),
    );

    Ok(())
}

/// Prints the address space as a bar: one letter per owner,
/// `.` for free space.
fn print_map(snap: &Snapshot, width: usize) {
    let capacity = snap.stats.capacity as u64;
    let width = width.max(1) as u64;
    let mut bar = String::with_capacity(width as usize);
    for cell in 0..width {
        let addr = (cell * capacity / width) as Units;
        let glyph = snap.regions
            .iter()
            .find(|r| r.start <= addr && addr < r.start + r.length)
            .and_then(|r| r.owner)
            .map(|o| (b'A' + (o.get() % 26) as u8) as char)
            .unwrap_or('.');
        bar.push(glyph);
    }
    println!("[{bar}]");
}
