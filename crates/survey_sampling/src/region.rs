//! Regions (sampling areas, strata, clusters) and exclusion zones.
use crate::geometry::Geometry;

/// Identifies the owner of a sample point.
///
/// `Outside` collects manually placed or grid points that fall outside every
/// configured region when outside sampling is allowed. It orders after every
/// [`RegionKey::Id`] so registry traversal stays deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegionKey {
    Id(i64),
    Outside,
}

impl PartialOrd for RegionKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RegionKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (RegionKey::Id(a), RegionKey::Id(b)) => a.cmp(b),
            (RegionKey::Id(_), RegionKey::Outside) => std::cmp::Ordering::Less,
            (RegionKey::Outside, RegionKey::Id(_)) => std::cmp::Ordering::Greater,
            (RegionKey::Outside, RegionKey::Outside) => std::cmp::Ordering::Equal,
        }
    }
}

impl std::fmt::Display for RegionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionKey::Id(id) => write!(f, "region {id}"),
            RegionKey::Outside => write!(f, "outside"),
        }
    }
}

/// How a region participates in the sampling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegionRole {
    /// A cluster in a cluster design.
    Cluster,
    /// A stratum in a stratified design.
    Stratum,
    /// The whole sampling area of a non-partitioned design.
    Global,
}

/// A delineated sampling area owning a subset of sample points.
///
/// Immutable once a run has been configured.
#[derive(Debug, Clone)]
pub struct Region {
    pub key: RegionKey,
    pub geometry: Geometry,
    pub role: RegionRole,
}

impl Region {
    pub fn new(id: i64, geometry: Geometry, role: RegionRole) -> Self {
        Self {
            key: RegionKey::Id(id),
            geometry,
            role,
        }
    }
}

/// A polygon no sample may fall into, with an optional safety buffer applied
/// before containment tests.
#[derive(Debug, Clone)]
pub struct ExclusionZone {
    pub geometry: Geometry,
    /// Buffer distance in map units, `0` disables buffering.
    pub buffer: f64,
}

impl ExclusionZone {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            buffer: 0.0,
        }
    }

    pub fn with_buffer(mut self, buffer: f64) -> Self {
        self.buffer = buffer;
        self
    }

    /// Closed containment against the buffered zone.
    ///
    /// Evaluated as a distance predicate, which is the exact Minkowski
    /// dilation test and avoids constructing an offset polygon.
    pub fn contains_buffered(&self, position: glam::DVec2) -> bool {
        self.contains_with_margin(position, 0.0)
    }

    /// Containment against the zone buffered by `buffer + margin`.
    ///
    /// Grid filtering widens every zone by an additional margin on top of
    /// the zone's own buffer.
    pub fn contains_with_margin(&self, position: glam::DVec2, margin: f64) -> bool {
        if self.geometry.contains(position) {
            return true;
        }
        let total = self.buffer + margin;
        total > 0.0 && self.geometry.distance(position) <= total
    }

    /// Distance from `position` to the buffered zone outline, zero inside.
    pub fn distance_buffered(&self, position: glam::DVec2) -> f64 {
        if self.contains_buffered(position) {
            return 0.0;
        }
        (self.geometry.distance(position) - self.buffer).max(0.0)
    }
}
