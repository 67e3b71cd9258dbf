//! Ordered registry of accepted sample points.
use std::collections::BTreeMap;

use glam::DVec2;

use crate::region::RegionKey;

/// An accepted sample point.
///
/// `order` is 1-based and globally unique across the registry; `label` is the
/// label root concatenated with the order, which is what exports show.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplePoint {
    pub position: DVec2,
    pub region: RegionKey,
    pub order: usize,
    pub label: String,
}

impl SamplePoint {
    /// Position as an interop-friendly mint point.
    pub fn position_mint(&self) -> mint::Point2<f64> {
        mint::Point2 {
            x: self.position.x,
            y: self.position.y,
        }
    }
}

/// Ordered, keyed collection of accepted points.
///
/// Points are grouped per [`RegionKey`] and traversed deterministically: keys
/// in ascending order (`Outside` last), points in insertion order. After any
/// mutation the `order` values are contiguous `1..=N`, which keeps exported
/// output stable. The deterministic traversal also fixes the nearest-point
/// tie-break: the first point encountered in traversal order wins.
#[derive(Debug, Clone, Default)]
pub struct SampleRegistry {
    label_root: String,
    points: BTreeMap<RegionKey, Vec<SamplePoint>>,
}

impl SampleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label_root(label_root: impl Into<String>) -> Self {
        Self {
            label_root: label_root.into(),
            points: BTreeMap::new(),
        }
    }

    pub fn label_root(&self) -> &str {
        &self.label_root
    }

    pub fn len(&self) -> usize {
        self.points.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.points.values().all(Vec::is_empty)
    }

    /// Appends a point to `region`, assigning the next global order.
    pub fn add(&mut self, position: DVec2, region: RegionKey) -> &SamplePoint {
        let order = self.len() + 1;
        let label = format!("{}{}", self.label_root, order);
        let entry = self.points.entry(region).or_default();
        entry.push(SamplePoint {
            position,
            region,
            order,
            label,
        });
        entry.last().expect("point was just pushed")
    }

    /// Removes the point nearest to `query`.
    ///
    /// With `tolerance`, the nearest point is only removed when it lies
    /// within that distance. Ties keep the first point in traversal order.
    /// Renumbers on success.
    pub fn remove_nearest(&mut self, query: DVec2, tolerance: Option<f64>) -> Option<SamplePoint> {
        let mut nearest: Option<(RegionKey, usize, f64)> = None;
        for (key, points) in &self.points {
            for (index, point) in points.iter().enumerate() {
                let distance = point.position.distance(query);
                if nearest.map_or(true, |(_, _, best)| distance < best) {
                    nearest = Some((*key, index, distance));
                }
            }
        }

        let (key, index, distance) = nearest?;
        if let Some(tolerance) = tolerance {
            if distance > tolerance {
                return None;
            }
        }

        let removed = self
            .points
            .get_mut(&key)
            .map(|points| points.remove(index))?;
        self.renumber();
        Some(removed)
    }

    /// Reassigns `order` 1..=N in traversal order and refreshes labels.
    pub fn renumber(&mut self) {
        let mut order = 0;
        for points in self.points.values_mut() {
            for point in points.iter_mut() {
                order += 1;
                point.order = order;
                point.label = format!("{}{}", self.label_root, order);
            }
        }
    }

    /// Positions already accepted for `region`, for spacing checks.
    pub fn region_positions(&self, region: RegionKey) -> Vec<DVec2> {
        self.points
            .get(&region)
            .map(|points| points.iter().map(|p| p.position).collect())
            .unwrap_or_default()
    }

    /// Accepted point count per region key.
    pub fn counts_per_region(&self) -> BTreeMap<RegionKey, usize> {
        self.points
            .iter()
            .filter(|(_, points)| !points.is_empty())
            .map(|(key, points)| (*key, points.len()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SamplePoint> {
        self.points.values().flatten()
    }

    /// Renumbered copy of every point in traversal order.
    pub fn snapshot(&mut self) -> Vec<SamplePoint> {
        self.renumber();
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assigns_contiguous_orders_and_labels() {
        let mut registry = SampleRegistry::with_label_root("S");
        registry.add(DVec2::new(0.0, 0.0), RegionKey::Id(1));
        registry.add(DVec2::new(1.0, 0.0), RegionKey::Id(1));
        registry.add(DVec2::new(2.0, 0.0), RegionKey::Id(2));

        let orders: Vec<_> = registry.iter().map(|p| p.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        let labels: Vec<_> = registry.iter().map(|p| p.label.clone()).collect();
        assert_eq!(labels, vec!["S1", "S2", "S3"]);
    }

    #[test]
    fn remove_nearest_picks_the_closest_point() {
        let mut registry = SampleRegistry::new();
        registry.add(DVec2::new(0.0, 1.0), RegionKey::Id(1));
        registry.add(DVec2::new(0.0, 5.0), RegionKey::Id(1));

        let removed = registry.remove_nearest(DVec2::ZERO, None).unwrap();
        assert_eq!(removed.position, DVec2::new(0.0, 1.0));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_nearest_respects_tolerance() {
        let mut registry = SampleRegistry::new();
        registry.add(DVec2::new(10.0, 0.0), RegionKey::Id(1));

        assert!(registry.remove_nearest(DVec2::ZERO, Some(5.0)).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.remove_nearest(DVec2::ZERO, Some(15.0)).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn orders_stay_contiguous_after_mixed_edits() {
        let mut registry = SampleRegistry::with_label_root("P");
        for i in 0..5 {
            registry.add(DVec2::new(i as f64, 0.0), RegionKey::Id(1));
        }
        registry.add(DVec2::new(100.0, 0.0), RegionKey::Outside);
        registry.remove_nearest(DVec2::new(2.0, 0.0), None);
        registry.remove_nearest(DVec2::new(100.0, 0.0), None);
        registry.add(DVec2::new(50.0, 0.0), RegionKey::Id(2));

        let mut orders: Vec<_> = registry.iter().map(|p| p.order).collect();
        orders.sort_unstable();
        assert_eq!(orders, (1..=registry.len()).collect::<Vec<_>>());
    }

    #[test]
    fn traversal_orders_regions_before_outside() {
        let mut registry = SampleRegistry::new();
        registry.add(DVec2::new(0.0, 0.0), RegionKey::Outside);
        registry.add(DVec2::new(1.0, 0.0), RegionKey::Id(7));
        registry.renumber();

        let regions: Vec<_> = registry.iter().map(|p| p.region).collect();
        assert_eq!(regions, vec![RegionKey::Id(7), RegionKey::Outside]);
        assert_eq!(registry.iter().next().unwrap().order, 1);
    }

    #[test]
    fn tie_break_keeps_the_first_point_in_traversal_order() {
        let mut registry = SampleRegistry::new();
        registry.add(DVec2::new(-1.0, 0.0), RegionKey::Id(1));
        registry.add(DVec2::new(1.0, 0.0), RegionKey::Id(2));

        // Both are at distance 1; the Id(1) point is traversed first.
        let removed = registry.remove_nearest(DVec2::ZERO, None).unwrap();
        assert_eq!(removed.region, RegionKey::Id(1));
    }

    #[test]
    fn snapshot_renumbers_before_cloning() {
        let mut registry = SampleRegistry::with_label_root("X");
        registry.add(DVec2::new(0.0, 0.0), RegionKey::Id(1));
        registry.add(DVec2::new(1.0, 0.0), RegionKey::Id(1));
        registry.add(DVec2::new(2.0, 0.0), RegionKey::Id(1));
        // Remove the middle point directly through the nearest query.
        registry.remove_nearest(DVec2::new(1.0, 0.0), None);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].order, 1);
        assert_eq!(snapshot[1].order, 2);
        assert_eq!(snapshot[1].label, "X2");
    }
}
