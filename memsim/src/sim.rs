use crate::helpe::*;

/// What happened during one [`Simulator::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Clock value after the tick.
    pub now:            u64,
    /// Jobs whose lifetime ran out, in admission order.
    pub completed:      Vec<JobId>,
    /// Waiting jobs that got placed, in queue order.
    pub newly_admitted: Vec<JobId>,
}

/// Read-side figures about a simulation. None of these can be
/// changed directly; they follow from submissions, ticks and removals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub capacity:           Units,
    /// Sum of admitted job sizes.
    pub occupancy:          Units,
    /// Highest occupancy ever observed.
    pub peak_occupancy:     Units,
    /// Jobs that expired or were removed.
    pub completed_count:    u64,
    pub completed_size:     u64,
    pub admitted_count:     usize,
    pub waiting_count:      usize,
    pub free_space:         Units,
    pub largest_free:       Units,
    pub region_count:       usize,
    /// Allocated but unused units. Only fixed tables have any.
    pub internal_waste:     Units,
}

impl Stats {
    /// Occupied share of the address space, in [0, 1].
    pub fn utilization(&self) -> f64 {
        self.occupancy as f64 / self.capacity as f64
    }

    /// `1 - largest_free / free_space`: zero when all free memory is
    /// one region, approaching one as it scatters into small holes.
    pub fn external_fragmentation(&self) -> f64 {
        if self.free_space == 0 {
            0.0
        } else {
            1.0 - self.largest_free as f64 / self.free_space as f64
        }
    }
}

/// A detached copy of the whole simulator state, for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub now:        u64,
    pub policy:     Policy,
    pub regions:    Vec<Region>,
    pub admitted:   Vec<Job>,
    pub waiting:    Vec<Job>,
    pub stats:      Stats,
}

/// Time-driven occupancy simulator.
///
/// Jobs are either *admitted* (they own a region and age every tick)
/// or *waiting* (queued FIFO, retried every tick). When an admitted
/// job's lifetime runs out, its region is released and the job is
/// gone. Nothing here happens on its own: the simulation only moves
/// through [`submit`](Simulator::submit), [`tick`](Simulator::tick)
/// and [`remove`](Simulator::remove).
#[derive(Debug, Clone)]
pub struct Simulator {
    config:             SimConfig,
    allocator:          Allocator,
    policy:             Policy,
    // Both maps preserve insertion order: admission order and
    // arrival order respectively.
    admitted:           IndexMap<JobId, Job>,
    waiting:            IndexMap<JobId, Job>,
    now:                u64,
    next_id:            u32,
    // Holder of the reserved region, admitted for good.
    reserved:           Option<JobId>,
    peak_occupancy:     Units,
    completed_count:    u64,
    completed_size:     u64,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let allocator = Allocator::new(config.build_table());
        info!(
            "New simulation: {} units, {}, {}",
            config.capacity,
            config.policy,
            if config.partitions.is_empty() { "dynamic partitioning".to_string() }
            else { format!("{} fixed partitions", config.partitions.len()) }
        );

        let mut res = Self {
            policy:             config.policy,
            config,
            allocator,
            admitted:           IndexMap::new(),
            waiting:            IndexMap::new(),
            now:                0,
            next_id:            0,
            reserved:           None,
            peak_occupancy:     0,
            completed_count:    0,
            completed_size:     0,
        };
        res.reserve();
        res.observe();

        Ok(res)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn table(&self) -> &PartitionTable {
        self.allocator.table()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// The job holding the reserved region, if the configuration asks for one.
    pub fn reserved(&self) -> Option<JobId> {
        self.reserved
    }

    /// Switches policy for subsequent allocations. Admitted jobs stay
    /// where they are.
    pub fn set_policy(&mut self, policy: Policy) {
        if policy != self.policy {
            info!("Placement policy: {} -> {policy}", self.policy);
            self.policy = policy;
        }
    }

    pub fn admitted(&self) -> impl Iterator<Item = &Job> {
        self.admitted.values()
    }

    pub fn waiting(&self) -> impl Iterator<Item = &Job> {
        self.waiting.values()
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.admitted.get(&id).or_else(|| self.waiting.get(&id))
    }

    /// Looks a job up by name: admitted ones first, then the queue.
    pub fn find(&self, name: &str) -> Option<JobId> {
        self.admitted.values()
            .chain(self.waiting.values())
            .find(|j| j.name == name)
            .map(|j| j.id)
    }

    /// Submits a job asking for `size` units during `ticks` ticks.
    ///
    /// The job is admitted right away if the current policy finds room
    /// for it, otherwise it joins the tail of the waiting queue. Requests
    /// that could never be placed are rejected.
    pub fn submit(&mut self, name: &str, size: Units, ticks: Ticks) -> Result<JobId, InvalidRequest> {
        if let Err(e) = self.validate(size, ticks) {
            warn!("Rejecting '{name}': {e}");
            return Err(e);
        }
        let id = JobId(self.next_id);
        self.next_id += 1;
        let mut job = Job::new(id, name.to_string(), size, ticks, self.now);

        match self.allocator.allocate(size, id, self.policy) {
            Ok(region) => {
                job.admit(region, self.now);
                debug!("Admitted {job}");
                self.admitted.insert(id, job);
            },
            Err(AllocationFailure::NoSpace { .. }) => {
                debug!("Queued {job} ({} already waiting)", self.waiting.len());
                self.waiting.insert(id, job);
            },
            Err(e) => panic!("Validated request failed to allocate: {e}"),
        }
        self.observe();

        Ok(id)
    }

    /// Advances the simulation by one step:
    ///
    /// 1. every job admitted at tick start ages by one tick;
    /// 2. expired jobs release their regions and complete;
    /// 3. the waiting queue is replayed once, in arrival order.
    pub fn tick(&mut self) -> TickReport {
        self.now += 1;
        // Aging happens on the jobs present *before* any release,
        // so completions cannot influence each other.
        let reserved = self.reserved;
        let expired: Vec<JobId> = self.admitted
            .values_mut()
            .filter(|j| Some(j.id) != reserved)
            .filter_map(|j| if j.age() { Some(j.id) } else { None })
            .collect();
        for id in &expired {
            let job = self.admitted
                .shift_remove(id)
                .expect("Expired job missing from admitted set");
            self.release_region(&job);
            debug!("Completed {job} at t={}", self.now);
            self.record_completion(&job);
        }
        let newly_admitted = self.replay_waiting();
        self.observe();

        TickReport {
            now:        self.now,
            completed:  expired,
            newly_admitted,
        }
    }

    /// Terminates a job early, wherever it is. Counts as a completion.
    /// The reserved region's holder cannot be removed.
    pub fn remove(&mut self, id: JobId) -> Result<(), UnknownJob> {
        if self.reserved == Some(id) {
            warn!("Refusing to remove the reserved region's holder {id}");
            return Err(UnknownJob(id));
        }
        if let Some(job) = self.admitted.shift_remove(&id) {
            self.release_region(&job);
            debug!("Removed admitted {job}");
            self.record_completion(&job);
        } else if let Some(job) = self.waiting.shift_remove(&id) {
            debug!("Removed waiting {job}");
            self.record_completion(&job);
        } else {
            return Err(UnknownJob(id));
        }
        self.observe();

        Ok(())
    }

    /// Drops every job and resets the table, clock and statistics.
    /// Job ids keep counting up, so old ids stay unknown.
    pub fn clear(&mut self) {
        info!(
            "Clearing simulation ({} admitted, {} waiting dropped)",
            self.admitted.len(),
            self.waiting.len()
        );
        self.allocator.reset(self.config.build_table());
        self.admitted.clear();
        self.waiting.clear();
        self.now = 0;
        self.peak_occupancy = 0;
        self.completed_count = 0;
        self.completed_size = 0;
        self.reserve();
        self.observe();
    }

    pub fn occupancy(&self) -> Units {
        self.admitted.values().map(|j| j.size).sum()
    }

    pub fn stats(&self) -> Stats {
        let table = self.allocator.table();
        let allocated: Units = table.iter()
            .filter(|r| r.owner.is_some())
            .map(|r| r.length)
            .sum();
        let occupancy = self.occupancy();

        Stats {
            capacity:           table.capacity(),
            occupancy,
            peak_occupancy:     self.peak_occupancy,
            completed_count:    self.completed_count,
            completed_size:     self.completed_size,
            admitted_count:     self.admitted.len(),
            waiting_count:      self.waiting.len(),
            free_space:         table.free_space(),
            largest_free:       table.largest_free(),
            region_count:       table.len(),
            internal_waste:     allocated - occupancy,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            now:        self.now,
            policy:     self.policy,
            regions:    self.allocator.table().snapshot(),
            admitted:   self.admitted.values().cloned().collect(),
            waiting:    self.waiting.values().cloned().collect(),
            stats:      self.stats(),
        }
    }

    //---START INTERNALS
    fn validate(&self, size: Units, ticks: Ticks) -> Result<(), InvalidRequest> {
        self.allocator.check_request(size)?;
        let limit = self.placeable_limit();
        if size > limit {
            return Err(InvalidRequest::TooLarge { size, limit });
        }
        if ticks == 0 {
            return Err(InvalidRequest::ZeroTicks);
        }

        Ok(())
    }

    /// The biggest request that could ever be admitted, given that the
    /// reserved region never moves.
    fn placeable_limit(&self) -> Units {
        let table = self.allocator.table();
        match self.reserved {
            None                        => table.largest_partition(),
            Some(_) if table.is_fixed() => table.iter()
                .filter(|r| r.owner != self.reserved)
                .map(|r| r.length)
                .max()
                .unwrap_or(0),
            Some(_)                     => table.capacity() - self.config.reserved,
        }
    }

    /// Pins the configured reserved space at address 0, on a fresh table.
    fn reserve(&mut self) {
        let size = self.config.reserved;
        if size == 0 {
            self.reserved = None;
            return;
        }
        let id = JobId(self.next_id);
        self.next_id += 1;
        let mut job = Job::new(id, "system".to_string(), size, Ticks::MAX, self.now);
        let region = self.allocator
            .allocate(size, id, Policy::FirstFit)
            .unwrap_or_else(|e| panic!("Validated reserved space failed to allocate: {e}"));
        job.admit(region, self.now);
        debug!("Reserved {job}");
        self.admitted.insert(id, job);
        self.reserved = Some(id);
    }

    /// One pass over the queue. Jobs that fit move to the admitted set,
    /// the rest stay queued in their original relative order.
    fn replay_waiting(&mut self) -> Vec<JobId> {
        let mut newly_admitted = vec![];
        let queue = std::mem::take(&mut self.waiting);
        for (id, mut job) in queue {
            match self.allocator.allocate(job.size, id, self.policy) {
                Ok(region) => {
                    job.admit(region, self.now);
                    debug!("Admitted {job} after waiting {} ticks", self.now - job.submitted_at);
                    newly_admitted.push(id);
                    self.admitted.insert(id, job);
                },
                Err(AllocationFailure::NoSpace { .. }) => {
                    self.waiting.insert(id, job);
                },
                Err(e) => panic!("Queued job {id} became unplaceable: {e}"),
            }
        }

        newly_admitted
    }

    fn release_region(&mut self, job: &Job) {
        let region = job.region.expect("Admitted job without a region");
        if let Err(e) = self.allocator.deallocate(region) {
            panic!("Admitted job {} held a dead region: {e}", job.id);
        }
    }

    fn record_completion(&mut self, job: &Job) {
        self.completed_count += 1;
        self.completed_size += job.size as u64;
    }

    /// Samples the peak and, in debug builds, checks every invariant.
    fn observe(&mut self) {
        self.peak_occupancy = self.peak_occupancy.max(self.occupancy());
        debug_assert_eq!(crate::check_all(self), Ok(()));
    }
    //---END INTERNALS
}
