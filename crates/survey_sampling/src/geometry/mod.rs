//! Geometry capability layer backed by the [geo] crate.
//!
//! The engine never touches `geo` types directly; everything goes through
//! [`Geometry`], a closed set of variants with the operations the sampling
//! pipeline needs: closed containment, distances, rings, area, centroid,
//! bounding box, union and outward buffering. Coordinates are assumed to be
//! already projected (no CRS handling here).
use geo::{
    Area, BoundingRect, Centroid, Coord, EuclideanDistance, Intersects, LineString, MultiPolygon,
    Point, Polygon,
};
use glam::DVec2;

pub mod buffer;

/// A planar geometry in projected coordinates.
#[derive(Debug, Clone)]
pub enum Geometry {
    Point(Point<f64>),
    Line(LineString<f64>),
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

#[inline]
pub(crate) fn coord(p: DVec2) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

#[inline]
pub(crate) fn dvec(c: Coord<f64>) -> DVec2 {
    DVec2::new(c.x, c.y)
}

impl Geometry {
    /// Build a polygon from an exterior ring and optional interior rings.
    ///
    /// Rings do not need to be explicitly closed; `geo` closes them.
    pub fn polygon(
        exterior: impl IntoIterator<Item = (f64, f64)>,
        interiors: Vec<Vec<(f64, f64)>>,
    ) -> Self {
        let shell = LineString::from(exterior.into_iter().collect::<Vec<_>>());
        let holes = interiors.into_iter().map(LineString::from).collect();
        Geometry::Polygon(Polygon::new(shell, holes))
    }

    /// Axis-aligned rectangle polygon, handy for tests and simple areas.
    pub fn rectangle(min: DVec2, max: DVec2) -> Self {
        Self::polygon(
            [
                (min.x, min.y),
                (max.x, min.y),
                (max.x, max.y),
                (min.x, max.y),
            ],
            Vec::new(),
        )
    }

    pub fn point(position: DVec2) -> Self {
        Geometry::Point(Point::new(position.x, position.y))
    }

    /// Closed containment: points on the boundary count as inside.
    ///
    /// `geo::Contains` follows DE-9IM interior containment and excludes the
    /// boundary, so the closed test is expressed through `Intersects`.
    pub fn contains(&self, position: DVec2) -> bool {
        let p = Point::new(position.x, position.y);
        match self {
            Geometry::Point(g) => g.intersects(&p),
            Geometry::Line(g) => g.intersects(&p),
            Geometry::Polygon(g) => g.intersects(&p),
            Geometry::MultiPolygon(g) => g.intersects(&p),
        }
    }

    /// Minimum euclidean distance from `position` to this geometry.
    ///
    /// Zero when the point lies inside an areal geometry.
    pub fn distance(&self, position: DVec2) -> f64 {
        let p = Point::new(position.x, position.y);
        match self {
            Geometry::Point(g) => p.euclidean_distance(g),
            Geometry::Line(g) => p.euclidean_distance(g),
            Geometry::Polygon(g) => p.euclidean_distance(g),
            Geometry::MultiPolygon(g) => p.euclidean_distance(g),
        }
    }

    /// All boundary rings (exterior and interior, over all parts).
    ///
    /// Non-areal geometries have no rings.
    pub fn rings(&self) -> Vec<&LineString<f64>> {
        match self {
            Geometry::Point(_) | Geometry::Line(_) => Vec::new(),
            Geometry::Polygon(g) => polygon_rings(g),
            Geometry::MultiPolygon(g) => g.0.iter().flat_map(polygon_rings).collect(),
        }
    }

    /// Minimum distance from `position` to the geometry boundary.
    ///
    /// For areal geometries this is the minimum over every ring of every
    /// part, which stays meaningful for points inside the area (unlike
    /// [`Geometry::distance`], which is zero there).
    pub fn boundary_distance(&self, position: DVec2) -> f64 {
        let p = Point::new(position.x, position.y);
        match self {
            Geometry::Point(_) | Geometry::Line(_) => self.distance(position),
            _ => self
                .rings()
                .iter()
                .map(|ring| p.euclidean_distance(*ring))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// Unsigned area; zero for points and lines.
    pub fn area(&self) -> f64 {
        match self {
            Geometry::Point(_) | Geometry::Line(_) => 0.0,
            Geometry::Polygon(g) => g.unsigned_area(),
            Geometry::MultiPolygon(g) => g.unsigned_area(),
        }
    }

    pub fn centroid(&self) -> crate::error::Result<DVec2> {
        let centroid = match self {
            Geometry::Point(g) => Some(*g),
            Geometry::Line(g) => g.centroid(),
            Geometry::Polygon(g) => g.centroid(),
            Geometry::MultiPolygon(g) => g.centroid(),
        };
        centroid
            .map(|p| DVec2::new(p.x(), p.y()))
            .ok_or_else(|| crate::error::Error::Geometry("geometry has no centroid".into()))
    }

    /// Axis-aligned bounding box as `(min, max)` corners.
    pub fn bounding_box(&self) -> crate::error::Result<(DVec2, DVec2)> {
        let rect = match self {
            // BoundingRect is infallible for points.
            Geometry::Point(g) => Some(g.bounding_rect()),
            Geometry::Line(g) => g.bounding_rect(),
            Geometry::Polygon(g) => g.bounding_rect(),
            Geometry::MultiPolygon(g) => g.bounding_rect(),
        };
        rect.map(|r| (dvec(r.min()), dvec(r.max())))
            .ok_or_else(|| crate::error::Error::Geometry("geometry has no bounding box".into()))
    }

    /// Every vertex of the geometry: all ring vertices of all parts for
    /// areal geometries, the line vertices for lines, the point itself for
    /// points.
    pub fn vertices(&self) -> Vec<DVec2> {
        match self {
            Geometry::Point(g) => vec![DVec2::new(g.x(), g.y())],
            Geometry::Line(g) => g.coords().copied().map(dvec).collect(),
            _ => self
                .rings()
                .iter()
                .flat_map(|ring| ring.coords().copied().map(dvec))
                .collect(),
        }
    }

    /// Outward buffer (Minkowski dilation by a disk approximated with
    /// `segments` segments). Erosion is deliberately not constructed; inward
    /// offsets are expressed as distance predicates by the callers.
    pub fn buffer(&self, distance: f64, segments: usize) -> crate::error::Result<Geometry> {
        buffer::dilate(self, distance, segments)
    }
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<&LineString<f64>> {
    let mut rings = vec![polygon.exterior()];
    rings.extend(polygon.interiors());
    rings
}

/// Union of areal geometries into a single [`Geometry::MultiPolygon`].
pub fn union(geometries: &[Geometry]) -> crate::error::Result<Geometry> {
    use geo::BooleanOps;

    let mut parts: Vec<Polygon<f64>> = Vec::new();
    for geometry in geometries {
        match geometry {
            Geometry::Polygon(g) => parts.push(g.clone()),
            Geometry::MultiPolygon(g) => parts.extend(g.0.iter().cloned()),
            _ => {
                return Err(crate::error::Error::Geometry(
                    "union is only defined for areal geometries".into(),
                ))
            }
        }
    }

    let mut parts = parts.into_iter();
    let first = parts.next().ok_or_else(|| {
        crate::error::Error::Geometry("union of an empty geometry set".into())
    })?;

    let mut combined = MultiPolygon::new(vec![first]);
    for part in parts {
        combined = combined.union(&MultiPolygon::new(vec![part]));
    }
    if combined.0.is_empty() {
        return Err(crate::error::Error::Geometry("union produced an empty geometry".into()));
    }
    Ok(Geometry::MultiPolygon(combined))
}
