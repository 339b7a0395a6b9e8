use crate::helpe::*;

/// Checks that the regions of `table`:
///
/// (i)     are non-empty and tile the address space without gaps or
///         overlaps, in address order;
///
/// (ii)    sum up to its capacity;
///
/// (iii)   contain no two adjacent free regions, unless the table is
///         fixed (fixed partitions never merge).
pub fn check_coverage(table: &PartitionTable) -> Result<(), InvariantError> {
    let mut expected: Units = 0;
    let mut covered: u64 = 0;
    for r in table.iter() {
        if r.length == 0 {
            return Err(InvariantError::Empty(r.id));
        }
        if r.start != expected {
            return Err(InvariantError::Gap { id: r.id, start: r.start, expected });
        }
        expected = r.start.saturating_add(r.length);
        covered += r.length as u64;
    }
    if covered != table.capacity() as u64 {
        return Err(InvariantError::Coverage { covered, capacity: table.capacity() });
    }
    if !table.is_fixed() {
        if let Some((a, b)) = table.iter()
            .tuple_windows()
            .find(|(a, b)| a.owner.is_none() && b.owner.is_none()) {
                return Err(InvariantError::Uncoalesced(a.id, b.id));
        }
    }

    Ok(())
}

/// Checks that allocated regions and admitted jobs are in one-to-one
/// correspondence, and that the waiting queue is disjoint from both.
pub fn check_bijection<'a, A, W>(
    table:      &PartitionTable,
    admitted:   A,
    waiting:    W,
) -> Result<(), InvariantError>
where
    A: IntoIterator<Item = &'a Job>,
    W: IntoIterator<Item = &'a Job>,
{
    // Region -> owner, as claimed by the jobs.
    let mut claimed: HashMap<RegionId, JobId> = HashMap::new();
    let mut admitted_ids: HashSet<JobId> = HashSet::new();
    for j in admitted {
        let owned = j.region
            .and_then(|r| table.get(r))
            .filter(|r| r.owner == Some(j.id));
        match owned {
            Some(r) => {
                if claimed.insert(r.id, j.id).is_some() {
                    return Err(InvariantError::Duplicated(j.id));
                }
            },
            None    => { return Err(InvariantError::Homeless(j.id)); }
        }
        admitted_ids.insert(j.id);
    }
    for r in table.iter() {
        if let Some(owner) = r.owner {
            if claimed.get(&r.id) != Some(&owner) {
                return Err(InvariantError::OrphanRegion { region: r.id, owner });
            }
        }
    }
    for j in waiting {
        if admitted_ids.contains(&j.id) {
            return Err(InvariantError::Duplicated(j.id));
        }
        if j.region.is_some() {
            return Err(InvariantError::WaitingWithRegion(j.id));
        }
    }

    Ok(())
}

/// Runs every check against a simulator.
pub fn check_all(sim: &Simulator) -> Result<(), InvariantError> {
    check_coverage(sim.table())?;
    check_bijection(sim.table(), sim.admitted(), sim.waiting())
}
