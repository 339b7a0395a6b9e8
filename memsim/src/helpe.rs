pub use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    io::{BufRead, BufReader},
    sync::{Arc, Mutex, TryLockError},
    fmt,
    time::Instant,
};
pub use thiserror::Error;
pub use itertools::Itertools;
pub use indexmap::IndexMap;
pub use clap::{Args, Parser, ValueEnum};
pub use log::{debug, info, trace, warn};

pub use crate::{Region, Job,
    table::PartitionTable,
    policy::Policy,
    engine::Allocator,
    sim::{Simulator, Snapshot, Stats, TickReport},
    config::SimConfig,
};

/// The unit for measuring offsets, lengths and sizes. `memsim` does
/// not care what a unit stands for (bytes, pages, KiB...), as long as
/// every request and the capacity agree on it.
pub type Units = u32;

/// The unit for measuring job lifetimes.
pub type Ticks = u32;

/// A stable handle to a region of a [`PartitionTable`].
///
/// Handles index an arena of slots. Whenever a region disappears
/// (it was merged into its left neighbour) its slot's generation is
/// bumped, so the handle is stale forever, even if the slot gets reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId {
    pub(crate) slot:        u32,
    pub(crate) generation:  u32,
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}v{}", self.slot, self.generation)
    }
}

/// Identifies a submitted job. Never reused by the same [`Simulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub(crate) u32);

impl JobId {
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//---START ERRORS
/// Raised by the [`PartitionTable`] primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("region {0} does not exist")]
    InvalidRegion(RegionId),
    #[error("region {0} is already allocated")]
    RegionNotFree(RegionId),
    #[error("region {0} is not allocated")]
    RegionNotAllocated(RegionId),
    #[error("region {id} holds {length} units, {requested} requested")]
    InsufficientSpace {
        id:         RegionId,
        length:     Units,
        requested:  Units,
    },
}

/// A request which can never be satisfied. Such requests are rejected
/// outright, they never enter the waiting queue.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidRequest {
    #[error("requested size must be positive")]
    ZeroSize,
    #[error("requested lifetime must be at least one tick")]
    ZeroTicks,
    #[error("requested size {size} exceeds the largest placeable size {limit}")]
    TooLarge {
        size:   Units,
        limit:  Units,
    },
}

/// Appears while allocating from or returning memory to the engine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationFailure {
    #[error(transparent)]
    Invalid(#[from] InvalidRequest),
    /// The normal "must wait" outcome.
    #[error("no free region can hold {size} units")]
    NoSpace {
        size: Units,
    },
    #[error("region {0} is stale or not allocated")]
    UnknownRegion(RegionId),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("job {0} is neither admitted nor waiting")]
pub struct UnknownJob(pub JobId);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("address space capacity must be positive")]
    ZeroCapacity,
    #[error("partition #{0} has zero length")]
    ZeroPartition(usize),
    #[error("partitions sum to {sum}, capacity is {capacity}")]
    PartitionMismatch {
        sum:        u64,
        capacity:   Units,
    },
    #[error("reserving {reserved} units leaves no room out of {capacity}")]
    ReservedTooLarge {
        reserved:   Units,
        capacity:   Units,
    },
    #[error("reserved size {reserved} must match the first partition ({partition})")]
    ReservedMismatch {
        reserved:   Units,
        partition:  Units,
    },
}

/// Describes the first broken invariant found by [`crate::check_all`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("region {id} starts at {start}, expected {expected}")]
    Gap {
        id:         RegionId,
        start:      Units,
        expected:   Units,
    },
    #[error("region {0} has zero length")]
    Empty(RegionId),
    #[error("regions cover {covered} units, capacity is {capacity}")]
    Coverage {
        covered:    u64,
        capacity:   Units,
    },
    #[error("adjacent free regions {0} and {1} were not coalesced")]
    Uncoalesced(RegionId, RegionId),
    #[error("region {region} is owned by {owner}, which is not admitted there")]
    OrphanRegion {
        region: RegionId,
        owner:  JobId,
    },
    #[error("admitted job {0} does not own a live region")]
    Homeless(JobId),
    #[error("job {0} is both admitted and waiting")]
    Duplicated(JobId),
    #[error("waiting job {0} holds a region")]
    WaitingWithRegion(JobId),
}
//---END ERRORS
