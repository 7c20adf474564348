//! Geometry policy
//!
//! Points, admissible edge directions and the tolerance rules every other
//! module measures with. Two routing modes are supported:
//! - Orthogonal: horizontal and vertical edges only (schematic wires)
//! - Octilinear: orthogonal plus the two 45° diagonals (PCB traces)

use serde::{Deserialize, Deserializer, Serialize};
use std::ops::{Add, Sub};

/// Default coincidence tolerance in drawing units.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// A 2D coordinate in drawing units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Coincidence test used everywhere: both coordinates within `tolerance`.
    pub fn coincides(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Line direction an edge may run along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horizontal,
    Vertical,
    /// Rising 45° line (dx == dy)
    Diagonal,
    /// Falling 45° line (dx == -dy)
    AntiDiagonal,
}

impl Axis {
    /// Unit-free direction vector of the axis.
    pub fn vector(self) -> (f64, f64) {
        match self {
            Axis::Horizontal => (1.0, 0.0),
            Axis::Vertical => (0.0, 1.0),
            Axis::Diagonal => (1.0, 1.0),
            Axis::AntiDiagonal => (1.0, -1.0),
        }
    }

    /// Classify the direction from `a` to `b`. Zero-length spans have no axis.
    pub fn between(a: &Point, b: &Point, epsilon: f64) -> Option<Axis> {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        if dx.abs() <= epsilon && dy.abs() <= epsilon {
            return None;
        }
        if dy.abs() <= epsilon {
            Some(Axis::Horizontal)
        } else if dx.abs() <= epsilon {
            Some(Axis::Vertical)
        } else if (dx - dy).abs() <= epsilon {
            Some(Axis::Diagonal)
        } else if (dx + dy).abs() <= epsilon {
            Some(Axis::AntiDiagonal)
        } else {
            None
        }
    }
}

/// Which axes are admissible for edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    #[default]
    Orthogonal,
    Octilinear,
}

impl RoutingMode {
    pub fn axes(self) -> &'static [Axis] {
        match self {
            RoutingMode::Orthogonal => &[Axis::Horizontal, Axis::Vertical],
            RoutingMode::Octilinear => &[
                Axis::Horizontal,
                Axis::Vertical,
                Axis::Diagonal,
                Axis::AntiDiagonal,
            ],
        }
    }
}

impl std::fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingMode::Orthogonal => write!(f, "orthogonal"),
            RoutingMode::Octilinear => write!(f, "octilinear"),
        }
    }
}

/// Snapping, tolerance and admissible directions used by transactions and rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryPolicy {
    /// Two points closer than this are the same point.
    #[serde(default = "default_epsilon", deserialize_with = "deserialize_epsilon")]
    pub epsilon: f64,

    /// Snap grid pitch; `None` disables snapping.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_grid"
    )]
    pub grid: Option<f64>,

    #[serde(default)]
    pub mode: RoutingMode,
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

/// Tolerances from documents go through the same clamping as `with_epsilon`.
fn deserialize_epsilon<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let epsilon = f64::deserialize(deserializer)?;
    Ok(if epsilon.is_finite() { epsilon.abs() } else { DEFAULT_EPSILON })
}

/// A zero or negative pitch means no grid, as with `with_grid`.
fn deserialize_grid<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let pitch = Option::<f64>::deserialize(deserializer)?;
    Ok(pitch.filter(|p| p.is_finite() && *p > 0.0))
}

impl Default for GeometryPolicy {
    fn default() -> Self {
        Self::orthogonal()
    }
}

impl GeometryPolicy {
    pub fn orthogonal() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            grid: None,
            mode: RoutingMode::Orthogonal,
        }
    }

    pub fn octilinear() -> Self {
        Self {
            mode: RoutingMode::Octilinear,
            ..Self::orthogonal()
        }
    }

    pub fn with_grid(mut self, pitch: f64) -> Self {
        self.grid = (pitch.is_finite() && pitch > 0.0).then_some(pitch);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon.abs();
        self
    }

    /// Round a point onto the grid, if one is configured.
    pub fn snap(&self, p: Point) -> Point {
        match self.grid {
            Some(g) if g > 0.0 => Point::new((p.x / g).round() * g, (p.y / g).round() * g),
            _ => p,
        }
    }

    pub fn same_point(&self, a: &Point, b: &Point) -> bool {
        a.coincides(b, self.epsilon)
    }

    pub fn axes(&self) -> &'static [Axis] {
        self.mode.axes()
    }

    /// Admissible axis from `a` to `b`, if the span runs along one.
    pub fn axis_between(&self, a: &Point, b: &Point) -> Option<Axis> {
        Axis::between(a, b, self.epsilon).filter(|axis| self.axes().contains(axis))
    }

    pub fn is_admissible(&self, a: &Point, b: &Point) -> bool {
        self.axis_between(a, b).is_some()
    }

    /// True when `p` lies on the segment `a`-`b`: inside the
    /// tolerance-expanded bounding box and collinear with it.
    pub fn point_on_segment(&self, p: &Point, a: &Point, b: &Point) -> bool {
        point_on_segment(p, a, b, self.epsilon)
    }

    /// Distance from `p` to the segment `a`-`b`.
    pub fn distance_to_segment(p: &Point, a: &Point, b: &Point) -> f64 {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let length_sq = dx * dx + dy * dy;
        if length_sq < 1e-12 {
            return p.distance_to(a);
        }
        let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
        p.distance_to(&Point::new(a.x + t * dx, a.y + t * dy))
    }
}

/// Segment membership test shared by the policy and the raw graph lookups.
pub fn point_on_segment(p: &Point, a: &Point, b: &Point, tolerance: f64) -> bool {
    let (min_x, max_x) = (a.x.min(b.x) - tolerance, a.x.max(b.x) + tolerance);
    let (min_y, max_y) = (a.y.min(b.y) - tolerance, a.y.max(b.y) + tolerance);
    if p.x < min_x || p.x > max_x || p.y < min_y || p.y > max_y {
        return false;
    }
    let len = a.distance_to(b);
    if len <= tolerance {
        return p.distance_to(a) <= tolerance;
    }
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    cross.abs() / len <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_between() {
        let o = Point::new(0.0, 0.0);
        assert_eq!(Axis::between(&o, &Point::new(5.0, 0.0), 1e-6), Some(Axis::Horizontal));
        assert_eq!(Axis::between(&o, &Point::new(0.0, -3.0), 1e-6), Some(Axis::Vertical));
        assert_eq!(Axis::between(&o, &Point::new(2.0, 2.0), 1e-6), Some(Axis::Diagonal));
        assert_eq!(Axis::between(&o, &Point::new(2.0, -2.0), 1e-6), Some(Axis::AntiDiagonal));
        assert_eq!(Axis::between(&o, &Point::new(2.0, 1.0), 1e-6), None);
        assert_eq!(Axis::between(&o, &o, 1e-6), None);
    }

    #[test]
    fn test_orthogonal_rejects_diagonals() {
        let geo = GeometryPolicy::orthogonal();
        assert!(!geo.is_admissible(&Point::new(0.0, 0.0), &Point::new(3.0, 3.0)));
        let geo = GeometryPolicy::octilinear();
        assert!(geo.is_admissible(&Point::new(0.0, 0.0), &Point::new(3.0, 3.0)));
    }

    #[test]
    fn test_point_on_segment() {
        let geo = GeometryPolicy::default().with_epsilon(0.01);
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!(geo.point_on_segment(&Point::new(5.0, 0.005), &a, &b));
        assert!(!geo.point_on_segment(&Point::new(5.0, 1.0), &a, &b));
        assert!(!geo.point_on_segment(&Point::new(11.0, 0.0), &a, &b));
        assert!(geo.point_on_segment(&Point::new(10.0, 0.0), &a, &b));
    }

    #[test]
    fn test_snap_to_grid() {
        let geo = GeometryPolicy::default().with_grid(2.54);
        let p = geo.snap(Point::new(2.6, 4.9));
        assert!((p.x - 2.54).abs() < 1e-9);
        assert!((p.y - 5.08).abs() < 1e-9);

        let free = GeometryPolicy::default();
        assert_eq!(free.snap(Point::new(2.6, 4.9)), Point::new(2.6, 4.9));
    }

    #[test]
    fn test_document_geometry_is_clamped() {
        let geo: GeometryPolicy = serde_json::from_str(r#"{"grid": 0.0}"#).unwrap();
        assert_eq!(geo.grid, None);
        assert_eq!(geo.snap(Point::new(1.3, 2.7)), Point::new(1.3, 2.7));

        let geo: GeometryPolicy = serde_json::from_str(r#"{"grid": -2.54}"#).unwrap();
        assert_eq!(geo.grid, None);

        let geo: GeometryPolicy = serde_json::from_str(r#"{"epsilon": -0.5}"#).unwrap();
        assert_eq!(geo.epsilon, 0.5);

        let geo: GeometryPolicy =
            serde_json::from_str(r#"{"grid": 1.27, "mode": "octilinear"}"#).unwrap();
        assert_eq!(geo.grid, Some(1.27));
        assert_eq!(geo.epsilon, DEFAULT_EPSILON);
    }

    #[test]
    fn test_distance() {
        let p1 = Point::new(0.0, 0.0);
        let p2 = Point::new(3.0, 4.0);
        assert!((p1.distance_to(&p2) - 5.0).abs() < 1e-9);
        let p3 = Point::new(10.0, 0.0);
        let d = GeometryPolicy::distance_to_segment(&Point::new(5.0, 2.0), &p1, &p3);
        assert!((d - 2.0).abs() < 1e-9);
    }
}
