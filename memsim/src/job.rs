use crate::helpe::*;

/// Where a live job currently is. Completed jobs are gone from
/// the simulator altogether, so they have no state to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Admitted,
    Waiting,
}

impl Job {
    /// Creates a job which has not been placed yet.
    pub(crate) fn new(id: JobId, name: String, size: Units, ticks: Ticks, now: u64) -> Self {
        Self {
            id,
            name,
            size,
            remaining_ticks:    ticks,
            region:             None,
            submitted_at:       now,
            admitted_at:        None,
        }
    }

    pub fn state(&self) -> JobState {
        if self.region.is_some() { JobState::Admitted } else { JobState::Waiting }
    }

    #[inline(always)]
    pub fn is_admitted(&self) -> bool {
        self.region.is_some()
    }

    /// Ticks spent in the waiting queue before admission, if admitted.
    pub fn waited(&self) -> Option<u64> {
        self.admitted_at.map(|t| t - self.submitted_at)
    }

    pub(crate) fn admit(&mut self, region: RegionId, now: u64) {
        debug_assert!(self.region.is_none(), "Job {} admitted twice", self.id);
        self.region = Some(region);
        self.admitted_at = Some(now);
    }

    /// Ages the job by one tick. Returns `true` once it has expired.
    pub(crate) fn age(&mut self) -> bool {
        debug_assert!(self.is_admitted(), "Only admitted jobs age");
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        self.remaining_ticks == 0
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({} units, {} ticks left)", self.id, self.name, self.size, self.remaining_ticks)
    }
}
