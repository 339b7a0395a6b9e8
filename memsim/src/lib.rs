//! Welcome to `memsim`!

mod job;
mod analyze;

pub mod table;
pub mod policy;
pub mod engine;
pub mod sim;
pub mod config;
pub mod label;
pub mod driver;
pub mod helpe;

pub use crate::helpe::*;
pub use crate::analyze::{check_all, check_bijection, check_coverage};
pub use crate::job::JobState;

/// A contiguous span of the address space, as seen from outside the
/// [`PartitionTable`](table::PartitionTable).
///
/// A [`Region`] is a *value*: it is copied out of the table, and mutating
/// it changes nothing. The only way to alter the partitioning is through
/// the table's operations.
///
/// > ***ATTENTION:*** `start` and `length` are relative to the beginning
/// > of the address space. The configured base address only matters to
/// > the [`label`] helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub id:         RegionId,
    pub start:      Units,
    // Never zero.
    pub length:     Units,
    /// Present iff the region is allocated.
    pub owner:      Option<JobId>,
}

/// Our fundamental unit of interest. A [`Job`] asks for
/// [`size`](Job::size) contiguous units for
/// [`remaining_ticks`](Job::remaining_ticks) ticks.
///
/// Ticks only elapse while the job is admitted, i.e. while
/// [`region`](Job::region) is `Some`. A waiting job keeps its
/// full lifetime until it gets placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id:             JobId,
    pub name:           String,
    pub size:           Units,
    pub remaining_ticks:Ticks,
    pub region:         Option<RegionId>,
    // Clock values, kept for reporting.
    pub submitted_at:   u64,
    pub admitted_at:    Option<u64>,
}
