use crate::helpe::*;

/// Composes a [`PartitionTable`] with a [`Policy`] into allocate/release
/// operations. Either an operation succeeds completely or the table is
/// left untouched.
#[derive(Debug, Clone)]
pub struct Allocator {
    table: PartitionTable,
}

impl Allocator {
    pub fn new(table: PartitionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PartitionTable {
        &self.table
    }

    /// Rejects requests that could never be placed, no matter how
    /// long they waited.
    pub fn check_request(&self, size: Units) -> Result<(), InvalidRequest> {
        let limit = self.table.largest_partition();
        if size == 0 {
            Err(InvalidRequest::ZeroSize)
        } else if size > limit {
            Err(InvalidRequest::TooLarge { size, limit })
        } else {
            Ok(())
        }
    }

    /// Places `size` units on behalf of `owner` according to `policy`.
    pub fn allocate(
        &mut self,
        size:   Units,
        owner:  JobId,
        policy: Policy,
    ) -> Result<RegionId, AllocationFailure> {
        self.check_request(size)?;
        let Some(target) = policy.select(self.table.iter(), size) else {
            return Err(AllocationFailure::NoSpace { size });
        };
        // The policy only proposes free regions that are big enough:
        // anything else is a broken invariant, not a recoverable error.
        let placed = self.table
            .split(target, size, owner)
            .unwrap_or_else(|e| panic!("{policy} proposed an unusable region: {e}"));
        trace!("{owner} placed in {placed} ({size} units, {policy})");

        Ok(placed)
    }

    /// Returns a region to the free pool. Stale handles (e.g. a region
    /// released twice) are reported, never acted upon.
    pub fn deallocate(&mut self, region: RegionId) -> Result<(), AllocationFailure> {
        match self.table.release(region) {
            Ok(())  => Ok(()),
            Err(TableError::InvalidRegion(id)) |
            Err(TableError::RegionNotAllocated(id)) => {
                warn!("Ignoring release of stale region {id}");
                Err(AllocationFailure::UnknownRegion(id))
            },
            Err(e)  => panic!("Unexpected table error on release: {e}"),
        }
    }

    /// Replaces the table, e.g. when the simulation is reset.
    pub(crate) fn reset(&mut self, table: PartitionTable) {
        self.table = table;
    }
}
