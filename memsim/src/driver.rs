//! Everything that sits between the outside world and a [`Simulator`]:
//! sources of requests, their application, and a single-flight
//! boundary for periodic tickers.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::helpe::*;

/// One action against a simulation, as issued by a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Submit {
        name:   String,
        size:   Units,
        ticks:  Ticks,
    },
    /// Advance the clock this many times.
    Tick(u32),
    /// Remove the job with this name (admitted first, then waiting).
    Remove(String),
    SetPolicy(Policy),
    Clear,
}

/// What applying a [`Request`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Submitted(JobId),
    Ticked(Vec<TickReport>),
    Removed(JobId),
    PolicySet(Policy),
    Cleared,
}

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("line {line}: {message}")]
    Script {
        line:       usize,
        message:    String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Rejected(#[from] InvalidRequest),
    #[error("no job named '{0}'")]
    NoSuchJob(String),
    #[error(transparent)]
    UnknownJob(#[from] UnknownJob),
    #[error("a tick is already in flight")]
    TickInFlight,
}

/// Defines the interface for producing requests.
///
/// For example: [`ScriptParser`] reads them from a file, while
/// [`RandomFlood`] makes them up from a seed. The user can implement
/// their own types as needed.
pub trait RequestGen {
    fn read_requests(&mut self) -> Result<Vec<Request>, DriverError>;
}

//---START EXTERNAL INTERFACES
/// Reads a request script. The first line is a header and is skipped;
/// every other non-empty, non-comment line holds one request:
///
/// ```text
/// op,name,size,ticks
/// submit,A,4,2
/// tick
/// tick,3
/// remove,A
/// policy,best-fit
/// clear
/// ```
pub struct ScriptParser {
    pub path: PathBuf,
}

impl ScriptParser {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RequestGen for ScriptParser {
    fn read_requests(&mut self) -> Result<Vec<Request>, DriverError> {
        let fd = std::fs::File::open(&self.path)?;
        let reader = BufReader::new(fd);
        let mut res = vec![];
        // First line is the header!
        for (idx, line) in reader.lines().enumerate().skip(1) {
            if let Some(r) = parse_line(&line?, idx + 1)? {
                res.push(r);
            }
        }

        Ok(res)
    }
}

/// Parses a whole script held in memory (header line included).
pub fn parse_script(text: &str) -> Result<Vec<Request>, DriverError> {
    text.lines()
        .enumerate()
        .skip(1)
        .filter_map(|(idx, line)| parse_line(line, idx + 1).transpose())
        .collect()
}

fn parse_line(line: &str, line_no: usize) -> Result<Option<Request>, DriverError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let bad = |message: String| DriverError::Script { line: line_no, message };
    let number = |idx: usize, what: &str| -> Result<u32, DriverError> {
        let raw = fields.get(idx)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| bad(format!("missing {what}")))?;
        raw.parse::<u32>()
            .map_err(|e| bad(format!("bad {what} '{raw}': {e}")))
    };
    let name = |idx: usize| -> Result<String, DriverError> {
        fields.get(idx)
            .filter(|f| !f.is_empty())
            .map(|f| f.to_string())
            .ok_or_else(|| bad("missing job name".to_string()))
    };

    let req = match fields[0] {
        "submit"    => Request::Submit {
            name:   name(1)?,
            size:   number(2, "size")?,
            ticks:  number(3, "ticks")?,
        },
        "tick"      => {
            if fields.get(1).is_some_and(|f| !f.is_empty()) {
                Request::Tick(number(1, "tick count")?)
            } else { Request::Tick(1) }
        },
        "remove"    => Request::Remove(name(1)?),
        "policy"    => {
            let raw = fields.get(1).copied().unwrap_or_default();
            let policy = Policy::from_str(raw, true)
                .map_err(|_| bad(format!("unknown policy '{raw}'")))?;
            Request::SetPolicy(policy)
        },
        "clear"     => Request::Clear,
        other       => { return Err(bad(format!("unknown operation '{other}'"))); }
    };

    Ok(Some(req))
}

/// Floods a simulation with random jobs, reproducibly.
///
/// Names look like `job-<n>` with `n` in `0..1000` (so they may repeat),
/// sizes are uniform in `1..=capacity` and lifetimes are even numbers
/// in `2..=100`.
pub struct RandomFlood {
    rng:        StdRng,
    capacity:   Units,
    count:      usize,
}

impl RandomFlood {
    /// A flood of `3 * capacity` jobs.
    pub fn new(seed: u64, capacity: Units) -> Self {
        Self::with_count(seed, capacity, 3 * capacity as usize)
    }

    pub fn with_count(seed: u64, capacity: Units, count: usize) -> Self {
        assert!(capacity > 0, "Cannot flood an empty address space");
        Self {
            rng: StdRng::seed_from_u64(seed),
            capacity,
            count,
        }
    }

    /// Draws one random job.
    pub fn gen_single(&mut self) -> Request {
        Request::Submit {
            name:   format!("job-{}", self.rng.gen_range(0..1000)),
            size:   self.rng.gen_range(1..=self.capacity),
            ticks:  self.rng.gen_range(0..50) * 2 + 2,
        }
    }
}

impl RequestGen for RandomFlood {
    fn read_requests(&mut self) -> Result<Vec<Request>, DriverError> {
        Ok((0..self.count).map(|_| self.gen_single()).collect())
    }
}
//---END EXTERNAL INTERFACES

/// Translates `req` into calls on `sim`.
pub fn apply(sim: &mut Simulator, req: Request) -> Result<Outcome, DriverError> {
    let out = match req {
        Request::Submit { name, size, ticks } => Outcome::Submitted(sim.submit(&name, size, ticks)?),
        Request::Tick(n)        => Outcome::Ticked((0..n).map(|_| sim.tick()).collect()),
        Request::Remove(name)   => {
            let id = sim.find(&name).ok_or(DriverError::NoSuchJob(name))?;
            sim.remove(id)?;
            Outcome::Removed(id)
        },
        Request::SetPolicy(p)   => {
            sim.set_policy(p);
            Outcome::PolicySet(p)
        },
        Request::Clear          => {
            sim.clear();
            Outcome::Cleared
        },
    };

    Ok(out)
}

/// Applies every request in order. Rejected requests and unknown names
/// are logged and skipped; the simulation carries on regardless.
pub fn apply_all<I>(sim: &mut Simulator, reqs: I) -> Vec<DriverError>
where I: IntoIterator<Item = Request> {
    let mut errors = vec![];
    for req in reqs {
        if let Err(e) = apply(sim, req) {
            warn!("Skipping request: {e}");
            errors.push(e);
        }
    }

    errors
}

/// A single-flight boundary for drivers that tick on a timer.
///
/// Ticks must never overlap on the same state: if one is still running
/// when the next trigger fires, [`Ticker::try_tick`] refuses instead of
/// waiting.
#[derive(Clone)]
pub struct Ticker {
    sim: Arc<Mutex<Simulator>>,
}

impl Ticker {
    pub fn new(sim: Simulator) -> Self {
        Self { sim: Arc::new(Mutex::new(sim)) }
    }

    /// Shared handle, e.g. for a presentation layer taking snapshots.
    pub fn shared(&self) -> Arc<Mutex<Simulator>> {
        self.sim.clone()
    }

    pub fn try_tick(&self) -> Result<TickReport, DriverError> {
        match self.sim.try_lock() {
            Ok(mut sim) => Ok(sim.tick()),
            Err(TryLockError::WouldBlock) => Err(DriverError::TickInFlight),
            // A panic mid-tick means a broken invariant; do not carry on.
            Err(TryLockError::Poisoned(e)) => panic!("Simulator poisoned: {e}"),
        }
    }

    /// Runs `steps` ticks back to back, stopping early if another
    /// holder of the simulator gets in the way.
    pub fn run(&self, steps: u32) -> Result<Vec<TickReport>, DriverError> {
        (0..steps).map(|_| self.try_tick()).collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.sim
            .lock()
            .unwrap_or_else(|e| panic!("Simulator poisoned: {e}"))
            .snapshot()
    }
}
