//! Systematic-grid generation: rotated, optionally zig-zagged lattices.
//!
//! The lattice is sized against a circular over-coverage region so that any
//! rotation of the grid still covers the full sampling area; filtering into
//! regions happens afterwards, once the caller has finalized the grid
//! position.
use std::collections::BTreeMap;

use glam::DVec2;
use tracing::info;

use crate::engine::events::{EventSink, ProgressEvent, ProgressEventKind};
use crate::engine::registry::SampleRegistry;
use crate::error::{Error, Result};
use crate::geometry;
use crate::region::{ExclusionZone, Region, RegionKey};
use crate::sampling::SamplingConstraints;

/// Fraction of the larger bounding-box extent used as over-coverage buffer.
///
/// There is no principled derivation for the value, so it stays configurable
/// on [`GridSpec`].
pub const DEFAULT_COVERAGE_MARGIN: f64 = 0.2;

/// Arc segmentization used when buffering the combined geometry.
pub const DEFAULT_BUFFER_SEGMENTS: usize = 50;

/// Parameters of a systematic grid.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSpec {
    /// Column spacing in map units.
    pub spacing_x: f64,
    /// Row spacing in map units.
    pub spacing_y: f64,
    /// Compass-style azimuth of the grid rows in degrees.
    pub rotation_degrees: f64,
    /// Shift odd rows right by half the column spacing.
    pub zigzag: bool,
    /// Inward buffer from the region perimeter applied during filtering.
    pub perimeter_buffer: f64,
    /// Additional outward buffer around exclusion zones during filtering.
    pub exclusion_buffer: f64,
    /// Over-coverage buffer as a fraction of the larger bbox extent.
    pub coverage_margin: f64,
    /// Segments per full circle when buffering.
    pub segments: usize,
}

impl GridSpec {
    pub fn new(spacing_x: f64, spacing_y: f64) -> Self {
        Self {
            spacing_x,
            spacing_y,
            rotation_degrees: 0.0,
            zigzag: false,
            perimeter_buffer: 0.0,
            exclusion_buffer: 0.0,
            coverage_margin: DEFAULT_COVERAGE_MARGIN,
            segments: DEFAULT_BUFFER_SEGMENTS,
        }
    }

    pub fn with_rotation_degrees(mut self, rotation_degrees: f64) -> Self {
        self.rotation_degrees = rotation_degrees;
        self
    }

    pub fn with_zigzag(mut self, zigzag: bool) -> Self {
        self.zigzag = zigzag;
        self
    }

    pub fn with_perimeter_buffer(mut self, perimeter_buffer: f64) -> Self {
        self.perimeter_buffer = perimeter_buffer;
        self
    }

    pub fn with_exclusion_buffer(mut self, exclusion_buffer: f64) -> Self {
        self.exclusion_buffer = exclusion_buffer;
        self
    }

    pub fn with_coverage_margin(mut self, coverage_margin: f64) -> Self {
        self.coverage_margin = coverage_margin;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.spacing_x.is_finite() && self.spacing_x > 0.0)
            || !(self.spacing_y.is_finite() && self.spacing_y > 0.0)
        {
            return Err(Error::InvalidConfig(format!(
                "grid spacing must be positive, got {} x {}",
                self.spacing_x, self.spacing_y
            )));
        }
        for (name, value) in [
            ("perimeter_buffer", self.perimeter_buffer),
            ("exclusion_buffer", self.exclusion_buffer),
            ("coverage_margin", self.coverage_margin),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Rotates `point` about `center` using the compass convention.
///
/// The effective mathematical angle is `(90 - azimuth) mod 180`: an azimuth
/// of 90 leaves the lattice unrotated, and 0 runs the rows along the
/// north-south axis. Preserved verbatim for compatibility with existing
/// survey layouts.
pub fn rotate_compass(point: DVec2, center: DVec2, azimuth_degrees: f64) -> DVec2 {
    let angle = (90.0 - azimuth_degrees).rem_euclid(180.0).to_radians();
    let (sin, cos) = angle.sin_cos();
    let shifted = point - center;
    center
        + DVec2::new(
            shifted.x * cos - shifted.y * sin,
            shifted.x * sin + shifted.y * cos,
        )
}

/// Translates every lattice point by `delta`.
///
/// Pure coordinate shift; filtering is not re-run until the grid position is
/// finalized.
pub fn translate(points: &mut [DVec2], delta: DVec2) {
    for point in points.iter_mut() {
        *point += delta;
    }
}

/// Builds the unfiltered, region-agnostic lattice for `regions`.
///
/// The combined region geometry is buffered outward by
/// `coverage_margin * max(bbox extent)`, a coverage circle is sized from the
/// buffered geometry's centroid to its farthest vertex, and rows are emitted
/// top-down over the circle's bounding box. Points outside the circle are
/// discarded before rotating the remainder about the combined geometry's own
/// centroid.
pub fn generate_lattice(
    regions: &[Region],
    spec: &GridSpec,
    sink: &mut dyn EventSink,
) -> Result<Vec<DVec2>> {
    spec.validate()?;

    let combined = geometry::union(
        &regions
            .iter()
            .map(|r| r.geometry.clone())
            .collect::<Vec<_>>(),
    )?;
    let (min, max) = combined.bounding_box()?;
    let extent = max - min;
    let buffer_distance = spec.coverage_margin * extent.x.max(extent.y);
    if !(buffer_distance.is_finite() && buffer_distance >= 0.0) {
        return Err(Error::Geometry(format!(
            "degenerate over-coverage buffer distance {buffer_distance}"
        )));
    }

    let buffered = combined.buffer(buffer_distance, spec.segments)?;
    let center = buffered.centroid()?;
    let radius = buffered
        .vertices()
        .into_iter()
        .map(|v| v.distance(center))
        .fold(0.0f64, f64::max);
    if radius <= 0.0 {
        return Err(Error::Geometry(
            "coverage radius collapsed to zero".into(),
        ));
    }

    let x_min = center.x - radius;
    let x_max = center.x + radius;
    let y_min = center.y - radius;
    let y_max = center.y + radius;

    let rotation_center = combined.centroid()?;
    let mut points = Vec::new();
    let mut row = 0usize;
    let mut y = y_max;
    while y >= y_min {
        let offset = if spec.zigzag && row % 2 != 0 {
            spec.spacing_x / 2.0
        } else {
            0.0
        };
        let mut x = x_min;
        while x <= x_max {
            let candidate = DVec2::new(x + offset, y);
            if candidate.distance(center) <= radius {
                points.push(rotate_compass(candidate, rotation_center, spec.rotation_degrees));
            }
            x += spec.spacing_x;
        }
        y -= spec.spacing_y;
        row += 1;
    }

    info!(
        "Generated systematic lattice with {} points (radius {:.1}).",
        points.len(),
        radius
    );
    if sink.wants(ProgressEventKind::LatticeGenerated) {
        sink.send(ProgressEvent::LatticeGenerated {
            point_count: points.len(),
        });
    }
    Ok(points)
}

/// Per-region outcome of filtering a finalized grid.
#[derive(Debug, Clone, Default)]
pub struct GridReport {
    /// Accepted point count per region key.
    pub per_region: BTreeMap<RegionKey, usize>,
    /// Total accepted points.
    pub accepted: usize,
    /// Points discarded by buffers, exclusion zones or for falling outside.
    pub dropped: usize,
}

/// Assigns lattice points to regions, honoring buffers and exclusion zones.
///
/// A point belongs to the first region (in the given order) that contains it
/// with the inward perimeter buffer satisfied, provided no buffered exclusion
/// zone claims it. Points in no region go to [`RegionKey::Outside`] when
/// outside sampling is allowed, otherwise they are dropped. The inward buffer
/// is evaluated as the exact erosion predicate
/// `contains(p) && boundary_distance(p) >= buffer`.
pub fn filter_into_regions(
    points: &[DVec2],
    regions: &[Region],
    exclusion_zones: &[ExclusionZone],
    constraints: &SamplingConstraints,
    spec: &GridSpec,
    label_root: &str,
    sink: &mut dyn EventSink,
) -> (SampleRegistry, GridReport) {
    let mut registry = SampleRegistry::with_label_root(label_root);
    let mut report = GridReport::default();

    'points: for &point in points {
        let mut owner: Option<RegionKey> = None;
        for region in regions {
            if !region.geometry.contains(point) {
                continue;
            }
            if spec.perimeter_buffer > 0.0
                && region.geometry.boundary_distance(point) < spec.perimeter_buffer
            {
                continue;
            }
            owner = Some(region.key);
            break;
        }

        let key = match owner {
            Some(key) => key,
            None if constraints.allow_outside_sampling => RegionKey::Outside,
            None => {
                report.dropped += 1;
                continue;
            }
        };

        for zone in exclusion_zones {
            if zone.contains_with_margin(point, spec.exclusion_buffer) {
                report.dropped += 1;
                continue 'points;
            }
        }

        registry.add(point, key);
        *report.per_region.entry(key).or_insert(0) += 1;
        report.accepted += 1;
    }

    registry.renumber();
    info!(
        "Grid filtering kept {} of {} points.",
        report.accepted,
        points.len()
    );
    if sink.wants(ProgressEventKind::GridFiltered) {
        sink.send(ProgressEvent::GridFiltered {
            accepted: report.accepted,
            dropped: report.dropped,
        });
    }
    (registry, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::region::RegionRole;

    fn square_region(id: i64) -> Region {
        Region::new(
            id,
            Geometry::rectangle(DVec2::ZERO, DVec2::new(100.0, 100.0)),
            RegionRole::Global,
        )
    }

    fn base_spec() -> GridSpec {
        GridSpec::new(10.0, 10.0)
    }

    #[test]
    fn validate_rejects_non_positive_spacing() {
        assert!(GridSpec::new(0.0, 10.0).validate().is_err());
        assert!(GridSpec::new(10.0, -1.0).validate().is_err());
        assert!(GridSpec::new(10.0, 10.0).validate().is_ok());
    }

    #[test]
    fn lattice_over_covers_the_square() {
        let regions = vec![square_region(1)];
        let points = generate_lattice(&regions, &base_spec(), &mut ()).unwrap();
        assert!(points.len() >= 100);
    }

    #[test]
    fn azimuth_90_is_the_identity_rotation() {
        let center = DVec2::new(50.0, 50.0);
        let point = DVec2::new(60.0, 55.0);
        let rotated = rotate_compass(point, center, 90.0);
        assert!((rotated - point).length() < 1e-9);
    }

    #[test]
    fn azimuth_0_rotates_a_quarter_turn() {
        let center = DVec2::new(50.0, 50.0);
        let rotated = rotate_compass(DVec2::new(60.0, 50.0), center, 0.0);
        assert!((rotated - DVec2::new(50.0, 60.0)).length() < 1e-9);
    }

    #[test]
    fn rotation_preserves_pairwise_distances() {
        let regions = vec![square_region(1)];
        let flat = generate_lattice(&regions, &base_spec().with_rotation_degrees(90.0), &mut ())
            .unwrap();
        let rotated =
            generate_lattice(&regions, &base_spec().with_rotation_degrees(57.0), &mut ()).unwrap();
        assert_eq!(flat.len(), rotated.len());

        for (a, b) in [(0usize, 1usize), (3, 17), (10, 42)] {
            let before = flat[a].distance(flat[b]);
            let after = rotated[a].distance(rotated[b]);
            assert!((before - after).abs() < 1e-6);
        }
    }

    #[test]
    fn zigzag_offsets_only_odd_rows() {
        let regions = vec![square_region(1)];
        // Azimuth 90 keeps the lattice unrotated so rows stay horizontal.
        let spec = base_spec().with_rotation_degrees(90.0).with_zigzag(true);
        let points = generate_lattice(&regions, &spec, &mut ()).unwrap();

        // Points arrive row-major with strictly descending y; the column
        // phase modulo the spacing identifies the zigzag shift. Row indices
        // are recovered from the y deltas, so empty rows near the top of the
        // coverage circle do not skew the parity.
        let circular_distance = |a: f64, b: f64| {
            let d = (a - b).rem_euclid(10.0);
            d.min(10.0 - d)
        };

        let first_y = points[0].y;
        let base_phase = points[0].x.rem_euclid(10.0);
        let mut alternating = 0usize;
        for point in &points {
            let row_delta = ((first_y - point.y) / 10.0).round() as usize;
            let expected = if row_delta % 2 == 1 {
                (base_phase + 5.0).rem_euclid(10.0)
            } else {
                base_phase
            };
            assert!(
                circular_distance(point.x.rem_euclid(10.0), expected) < 1e-6,
                "row delta {row_delta} has unexpected column phase"
            );
            if row_delta % 2 == 1 {
                alternating += 1;
            }
        }
        // The lattice actually contains offset rows.
        assert!(alternating > 0);
    }

    #[test]
    fn filter_assigns_points_inside_the_region_only() {
        let regions = vec![square_region(1)];
        let spec = base_spec().with_rotation_degrees(90.0);
        let points = generate_lattice(&regions, &spec, &mut ()).unwrap();
        let constraints = SamplingConstraints::default();

        let (registry, report) =
            filter_into_regions(&points, &regions, &[], &constraints, &spec, "", &mut ());

        assert!(report.accepted > 0);
        assert_eq!(report.accepted + report.dropped, points.len());
        for point in registry.iter() {
            assert_eq!(point.region, RegionKey::Id(1));
            assert!(regions[0].geometry.contains(point.position));
        }
    }

    #[test]
    fn filter_honors_the_inward_perimeter_buffer() {
        let regions = vec![square_region(1)];
        let spec = base_spec()
            .with_rotation_degrees(90.0)
            .with_perimeter_buffer(15.0);
        let points = generate_lattice(&regions, &spec, &mut ()).unwrap();
        let constraints = SamplingConstraints::default();

        let (registry, _) =
            filter_into_regions(&points, &regions, &[], &constraints, &spec, "", &mut ());
        for point in registry.iter() {
            assert!(regions[0].geometry.boundary_distance(point.position) >= 15.0);
        }
    }

    #[test]
    fn filter_sends_outside_points_to_the_outside_key_when_allowed() {
        let regions = vec![square_region(1)];
        let spec = base_spec().with_rotation_degrees(90.0);
        let points = generate_lattice(&regions, &spec, &mut ()).unwrap();
        let constraints = SamplingConstraints::new().with_allow_outside_sampling(true);

        let (registry, report) =
            filter_into_regions(&points, &regions, &[], &constraints, &spec, "", &mut ());
        assert_eq!(report.dropped, 0);
        assert_eq!(report.accepted, points.len());
        assert!(registry.counts_per_region().contains_key(&RegionKey::Outside));
    }

    #[test]
    fn filter_drops_points_in_buffered_exclusion_zones() {
        let regions = vec![square_region(1)];
        let zone = ExclusionZone::new(Geometry::rectangle(
            DVec2::new(40.0, 40.0),
            DVec2::new(60.0, 60.0),
        ));
        let spec = base_spec()
            .with_rotation_degrees(90.0)
            .with_exclusion_buffer(5.0);
        let points = generate_lattice(&regions, &spec, &mut ()).unwrap();
        let constraints = SamplingConstraints::default();

        let (registry, _) = filter_into_regions(
            &points,
            &regions,
            std::slice::from_ref(&zone),
            &constraints,
            &spec,
            "",
            &mut (),
        );
        for point in registry.iter() {
            assert!(!zone.contains_with_margin(point.position, 5.0));
        }
    }

    #[test]
    fn translate_shifts_every_point() {
        let mut points = vec![DVec2::ZERO, DVec2::new(1.0, 2.0)];
        translate(&mut points, DVec2::new(10.0, -5.0));
        assert_eq!(points[0], DVec2::new(10.0, -5.0));
        assert_eq!(points[1], DVec2::new(11.0, -3.0));
    }

    #[test]
    fn overlapping_regions_assign_to_the_first_match() {
        let big = square_region(1);
        let inner = Region::new(
            2,
            Geometry::rectangle(DVec2::new(20.0, 20.0), DVec2::new(80.0, 80.0)),
            RegionRole::Stratum,
        );
        let regions = vec![big, inner];
        let spec = base_spec().with_rotation_degrees(90.0);
        let points = generate_lattice(&regions, &spec, &mut ()).unwrap();

        let (registry, _) = filter_into_regions(
            &points,
            &regions,
            &[],
            &SamplingConstraints::default(),
            &spec,
            "",
            &mut (),
        );
        // Every accepted point belongs to region 1, which is tested first.
        assert!(registry
            .iter()
            .all(|p| p.region == RegionKey::Id(1)));
    }
}
