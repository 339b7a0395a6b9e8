use crate::helpe::*;

/// What the arena knows about a live region. The handle is
/// implied by the slot it lives in.
#[derive(Debug, Clone, Copy)]
struct Span {
    start:  Units,
    length: Units,
    owner:  Option<JobId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    span:       Option<Span>,
}

/// The ordered collection of all regions of the address space.
///
/// Regions live in a dense arena of slots and are addressed by
/// [`RegionId`] handles. A separate `layout` vector lists the live
/// slots in address order; splitting and merging update both.
///
/// A *dynamic* table starts as a single free region and splits/merges
/// on demand. A *fixed* table is carved into partitions once, at
/// construction, and never changes shape again.
#[derive(Debug, Clone)]
pub struct PartitionTable {
    capacity:   Units,
    slots:      Vec<Slot>,
    // Retired slots, ready for reuse.
    vacant:     Vec<u32>,
    // Live slots, sorted by start.
    layout:     Vec<u32>,
    fixed:      bool,
}

impl PartitionTable {
    /// Creates a dynamic table: one free region spanning `[0, capacity)`.
    pub fn new(capacity: Units) -> Self {
        assert!(capacity > 0, "Address space must not be empty");
        let mut res = Self {
            capacity,
            slots:  vec![],
            vacant: vec![],
            layout: vec![],
            fixed:  false,
        };
        let slot = res.occupy_slot(Span { start: 0, length: capacity, owner: None });
        res.layout.push(slot);

        res
    }

    /// Creates a fixed table with one free region per entry of
    /// `partitions`, laid out in the given order.
    pub fn fixed(partitions: &[Units]) -> Self {
        assert!(!partitions.is_empty(), "A fixed table needs at least one partition");
        assert!(partitions.iter().all(|p| *p > 0), "Partitions must not be empty");
        let capacity = partitions.iter()
            .map(|p| *p as u64)
            .sum::<u64>();
        let capacity = Units::try_from(capacity)
            .expect("Partitions overflow the address space");
        let mut res = Self {
            capacity,
            slots:  Vec::with_capacity(partitions.len()),
            vacant: vec![],
            layout: Vec::with_capacity(partitions.len()),
            fixed:  true,
        };
        let mut start = 0;
        for length in partitions {
            let slot = res.occupy_slot(Span { start, length: *length, owner: None });
            res.layout.push(slot);
            start += length;
        }

        res
    }

    pub fn capacity(&self) -> Units {
        self.capacity
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Number of regions currently in the table.
    pub fn len(&self) -> usize {
        self.layout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    /// Returns a copy of the region behind `id`, if the handle is live.
    pub fn get(&self, id: RegionId) -> Option<Region> {
        self.span(id).map(|s| Self::region(id, s))
    }

    /// Read-only traversal of all regions in address order.
    pub fn iter(&self) -> impl Iterator<Item = Region> + '_ {
        self.layout.iter()
            .map(|slot| {
                let entry = &self.slots[*slot as usize];
                let span = entry.span.expect("Layout references a retired slot");
                Self::region(RegionId { slot: *slot, generation: entry.generation }, span)
            })
    }

    /// Read-only view for external consumers.
    pub fn snapshot(&self) -> Vec<Region> {
        self.iter().collect()
    }

    pub fn free_space(&self) -> Units {
        self.iter()
            .filter(|r| r.owner.is_none())
            .map(|r| r.length)
            .sum()
    }

    pub fn largest_free(&self) -> Units {
        self.iter()
            .filter(|r| r.owner.is_none())
            .map(|r| r.length)
            .max()
            .unwrap_or(0)
    }

    /// The biggest request this table could ever satisfy.
    pub fn largest_partition(&self) -> Units {
        if self.fixed {
            self.iter()
                .map(|r| r.length)
                .max()
                .unwrap_or(0)
        } else { self.capacity }
    }

    /// Hands (a prefix of) a free region over to `owner`.
    ///
    /// In a dynamic table the region shrinks to exactly `requested_size`
    /// and keeps its handle; any remainder becomes a new free region right
    /// after it. In a fixed table the whole partition is handed over.
    pub fn split(
        &mut self,
        id:             RegionId,
        requested_size: Units,
        owner:          JobId,
    ) -> Result<RegionId, TableError> {
        let span = self.span(id).ok_or(TableError::InvalidRegion(id))?;
        if span.owner.is_some() {
            return Err(TableError::RegionNotFree(id));
        }
        if span.length < requested_size {
            return Err(TableError::InsufficientSpace {
                id,
                length:     span.length,
                requested:  requested_size,
            });
        }
        debug_assert!(requested_size > 0, "Zero-sized split requested");

        if !self.fixed && span.length > requested_size {
            let remainder = Span {
                start:  span.start + requested_size,
                length: span.length - requested_size,
                owner:  None,
            };
            let pos = self.position(id).expect("Live region missing from layout");
            let new_slot = self.occupy_slot(remainder);
            self.layout.insert(pos + 1, new_slot);
            self.span_mut(id).length = requested_size;
            trace!("split {id}: [{}, {}) + free [{}, {})",
                span.start, remainder.start, remainder.start, remainder.start + remainder.length);
        }
        self.span_mut(id).owner = Some(owner);

        Ok(id)
    }

    /// Frees an allocated region and merges it with its free neighbours.
    pub fn release(&mut self, id: RegionId) -> Result<(), TableError> {
        let span = self.span(id).ok_or(TableError::InvalidRegion(id))?;
        if span.owner.is_none() {
            return Err(TableError::RegionNotAllocated(id));
        }
        self.span_mut(id).owner = None;
        if self.fixed {
            return Ok(());
        }

        // Right neighbour first, so that `pos` stays valid.
        let mut pos = self.position(id).expect("Live region missing from layout");
        if pos + 1 < self.layout.len() && self.is_free_at(pos + 1) {
            self.merge_at(pos);
        }
        if pos > 0 && self.is_free_at(pos - 1) {
            pos -= 1;
            self.merge_at(pos);
        }

        Ok(())
    }

    /// One left-to-right pass merging runs of free regions. Returns
    /// the number of merges performed. A no-op on fixed tables.
    pub fn coalesce_adjacent_free(&mut self) -> usize {
        if self.fixed {
            return 0;
        }
        let mut merges = 0;
        let mut pos = 0;
        while pos + 1 < self.layout.len() {
            if self.is_free_at(pos) && self.is_free_at(pos + 1) {
                self.merge_at(pos);
                merges += 1;
            } else {
                pos += 1;
            }
        }

        merges
    }

    //---START ARENA PRIMITIVES
    fn region(id: RegionId, span: Span) -> Region {
        Region {
            id,
            start:  span.start,
            length: span.length,
            owner:  span.owner,
        }
    }

    fn span(&self, id: RegionId) -> Option<Span> {
        self.slots
            .get(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.span)
    }

    // Callers must have checked liveness.
    fn span_mut(&mut self, id: RegionId) -> &mut Span {
        self.slots[id.slot as usize]
            .span
            .as_mut()
            .expect("Mutable access to a dead region")
    }

    fn position(&self, id: RegionId) -> Option<usize> {
        self.layout.iter().position(|s| *s == id.slot)
    }

    fn is_free_at(&self, pos: usize) -> bool {
        self.slots[self.layout[pos] as usize]
            .span
            .is_some_and(|s| s.owner.is_none())
    }

    fn occupy_slot(&mut self, span: Span) -> u32 {
        match self.vacant.pop() {
            Some(slot) => {
                let entry = &mut self.slots[slot as usize];
                debug_assert!(entry.span.is_none(), "Vacant slot still in use");
                entry.span = Some(span);
                slot
            },
            None => {
                self.slots.push(Slot { generation: 0, span: Some(span) });
                (self.slots.len() - 1) as u32
            }
        }
    }

    /// Absorbs the region at `pos + 1` into the one at `pos`. The left
    /// handle survives; the right one goes stale.
    fn merge_at(&mut self, pos: usize) {
        let (left, right) = (self.layout[pos] as usize, self.layout[pos + 1] as usize);
        let absorbed = self.slots[right].span
            .take()
            .expect("Layout references a retired slot");
        self.slots[right].generation = self.slots[right].generation.wrapping_add(1);
        self.vacant.push(right as u32);
        self.layout.remove(pos + 1);

        let survivor = self.slots[left].span
            .as_mut()
            .expect("Layout references a retired slot");
        debug_assert!(survivor.owner.is_none() && absorbed.owner.is_none(), "Merging allocated regions");
        debug_assert!(survivor.start + survivor.length == absorbed.start, "Merging non-adjacent regions");
        survivor.length += absorbed.length;
        trace!("merged [{}, {}) into region at {}",
            absorbed.start, absorbed.start + absorbed.length, survivor.start);
    }
    //---END ARENA PRIMITIVES
}
