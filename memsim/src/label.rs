//! Pure presentation helpers. Nothing in here is stored anywhere:
//! the same input always yields the same label or color.

use crate::helpe::*;

/// Formats the inclusive address range of `region` as
/// `0x<first> - 0x<last>`, shifted by `base`.
pub fn address_range(base: Units, region: &Region) -> String {
    let first = base as u64 + region.start as u64;
    let last = first + region.length as u64 - 1;
    format!("0x{first:x} - 0x{last:x}")
}

/// A deterministic RGB color for a job name (FNV-1a over its bytes).
pub fn color_of(name: &str) -> (u8, u8, u8) {
    let hash = name.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
        (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    });
    ((hash >> 40) as u8, (hash >> 24) as u8, (hash >> 8) as u8)
}

/// A one-line description of `region`, naming its owner if any.
pub fn region_caption(base: Units, region: &Region, jobs: &[Job]) -> String {
    let range = address_range(base, region);
    match region.owner {
        None    => format!("{range}: free ({} units)", region.length),
        Some(owner) => {
            let name = jobs.iter()
                .find(|j| j.id == owner)
                .map(|j| j.name.as_str())
                .unwrap_or("?");
            format!("{range}: {name} {owner} ({} units)", region.length)
        }
    }
}
