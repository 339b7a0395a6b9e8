use crate::helpe::*;

/// Rules for choosing a free region to carve a request out of.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Default)]
pub enum Policy {
    /// The first free region (in address order) that is big enough
    #[default]
    FirstFit,
    /// The smallest free region that is big enough
    BestFit,
}

impl Policy {
    /// Picks a free region for `size` units out of `regions`, which
    /// must come in address order. `None` means the request has to wait.
    #[inline(always)]
    pub fn select<I>(self, regions: I, size: Units) -> Option<RegionId>
    where I: IntoIterator<Item = Region> {
        match self {
            Policy::FirstFit    => first_fit(regions, size),
            Policy::BestFit     => best_fit(regions, size),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::FirstFit    => write!(f, "first-fit"),
            Policy::BestFit     => write!(f, "best-fit"),
        }
    }
}

#[inline(always)]
fn fits(r: &Region, size: Units) -> bool {
    r.owner.is_none() && r.length >= size
}

/// Returns the first free region with at least `size` units.
pub fn first_fit<I>(regions: I, size: Units) -> Option<RegionId>
where I: IntoIterator<Item = Region> {
    regions.into_iter()
        .find(|r| fits(r, size))
        .map(|r| r.id)
}

/// Returns the smallest free region with at least `size` units.
/// Among equally small candidates, the one with the lowest start wins.
pub fn best_fit<I>(regions: I, size: Units) -> Option<RegionId>
where I: IntoIterator<Item = Region> {
    // `min_by_key` keeps the first of several equal minima, and
    // the input is in address order.
    regions.into_iter()
        .filter(|r| fits(r, size))
        .min_by_key(|r| r.length)
        .map(|r| r.id)
}
