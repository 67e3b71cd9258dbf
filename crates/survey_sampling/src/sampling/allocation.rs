//! Per-region sample-count allocation.
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::region::{Region, RegionKey};

/// Computes the target sample count per region.
///
/// Uniform mode gives every region exactly `requested_min`. Area-proportional
/// mode scales by `area / min_area` with round-half-away-from-zero and floors
/// the result at `requested_min`, so smaller regions never receive fewer than
/// the base request and allocation grows monotonically with area.
pub fn allocate(
    regions: &[Region],
    requested_min: usize,
    adjust_by_area: bool,
) -> Result<BTreeMap<RegionKey, usize>> {
    let mut counts = BTreeMap::new();

    if !adjust_by_area {
        for region in regions {
            counts.insert(region.key, requested_min);
        }
        return Ok(counts);
    }

    let min_area = regions
        .iter()
        .map(|r| r.geometry.area())
        .fold(f64::INFINITY, f64::min);
    if regions.is_empty() || !min_area.is_finite() || min_area <= 0.0 {
        return Err(Error::Geometry(format!(
            "area-proportional allocation needs regions with positive area, smallest was {min_area}"
        )));
    }

    for region in regions {
        let scaled = (requested_min as f64 * (region.geometry.area() / min_area)).round() as usize;
        counts.insert(region.key, scaled.max(requested_min));
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::*;
    use crate::geometry::Geometry;
    use crate::region::RegionRole;

    fn region_with_area(id: i64, width: f64) -> Region {
        // Height 1, so the area equals the width.
        Region::new(
            id,
            Geometry::rectangle(DVec2::ZERO, DVec2::new(width, 1.0)),
            RegionRole::Stratum,
        )
    }

    #[test]
    fn uniform_mode_gives_every_region_the_request() {
        let regions = vec![region_with_area(1, 10.0), region_with_area(2, 30.0)];
        let counts = allocate(&regions, 5, false).unwrap();
        assert_eq!(counts[&RegionKey::Id(1)], 5);
        assert_eq!(counts[&RegionKey::Id(2)], 5);
    }

    #[test]
    fn proportional_mode_scales_with_area() {
        // Areas 10, 20, 30 with a base request of 5 allocate 5, 10, 15.
        let regions = vec![
            region_with_area(1, 10.0),
            region_with_area(2, 20.0),
            region_with_area(3, 30.0),
        ];
        let counts = allocate(&regions, 5, true).unwrap();
        assert_eq!(counts[&RegionKey::Id(1)], 5);
        assert_eq!(counts[&RegionKey::Id(2)], 10);
        assert_eq!(counts[&RegionKey::Id(3)], 15);
    }

    #[test]
    fn allocation_never_drops_below_the_request() {
        let regions = vec![region_with_area(1, 10.0), region_with_area(2, 10.4)];
        let counts = allocate(&regions, 7, true).unwrap();
        assert!(counts.values().all(|&count| count >= 7));
    }

    #[test]
    fn allocation_is_monotone_in_area() {
        let regions = vec![
            region_with_area(1, 12.0),
            region_with_area(2, 25.0),
            region_with_area(3, 13.0),
            region_with_area(4, 80.0),
        ];
        let counts = allocate(&regions, 4, true).unwrap();
        let mut by_area: Vec<_> = regions
            .iter()
            .map(|r| (r.geometry.area(), counts[&r.key]))
            .collect();
        by_area.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        for pair in by_area.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn zero_area_region_fails_proportional_allocation() {
        let degenerate = Region::new(
            1,
            Geometry::polygon([(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)], Vec::new()),
            RegionRole::Stratum,
        );
        assert!(allocate(&[degenerate], 5, true).is_err());
        assert!(allocate(&[], 5, true).is_err());
    }
}
