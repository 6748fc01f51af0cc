//! Plane geometry derived from the patient-coordinate attributes of a slice.

use crate::enums::Orientation;

/// Vector in patient coordinates (millimetres).
pub type Vector3 = nalgebra::Vector3<f64>;

/// Tolerance used for the almost-equal and almost-parallel checks.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

#[inline]
pub(crate) fn is_degenerate(v: &Vector3) -> bool {
    !v.iter().all(|c| c.is_finite()) || v.norm() <= f64::EPSILON
}

/// Component-wise comparison within `tolerance`.
pub fn almost_equal(a: &Vector3, b: &Vector3, tolerance: f64) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// True when `a` and `b` point along the same line, in either direction.
///
/// Degenerate vectors are never parallel to anything.
pub fn almost_parallel(a: &Vector3, b: &Vector3, tolerance: f64) -> bool {
    if is_degenerate(a) || is_degenerate(b) {
        return false;
    }
    let cosine = a.normalize().dot(&b.normalize()).abs();
    1.0 - cosine <= tolerance
}

/// Geometry of a single imaging plane.
///
/// Values are computed when the plane is created; callers that toggle the
/// normal inversion get a new `PlaneGeometry` from [`crate::Slice::plane`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneGeometry {
    position: Option<Vector3>,
    row: Option<Vector3>,
    col: Option<Vector3>,
    normal: Option<Vector3>,
}

impl PlaneGeometry {
    pub fn new(
        position: Option<Vector3>,
        row: Option<Vector3>,
        col: Option<Vector3>,
        invert_normal: bool,
    ) -> Self {
        let normal = Self::compute_normal(row.as_ref(), col.as_ref(), invert_normal);
        Self {
            position,
            row,
            col,
            normal,
        }
    }

    /// `normalize(col × row)`, negated when `invert` is set.
    ///
    /// Returns `None` when either direction is missing or degenerate, or when
    /// the two directions are collinear.
    pub fn compute_normal(
        row: Option<&Vector3>,
        col: Option<&Vector3>,
        invert: bool,
    ) -> Option<Vector3> {
        let (row, col) = (row?, col?);
        if is_degenerate(row) || is_degenerate(col) {
            return None;
        }
        let cross = col.cross(row);
        if is_degenerate(&cross) {
            return None;
        }
        let normal = cross.normalize();
        Some(if invert { -normal } else { normal })
    }

    /// Label of the axis with the strictly largest absolute component.
    pub fn main_orientation(normal: Option<&Vector3>) -> Orientation {
        let Some(normal) = normal else {
            return Orientation::Undefined;
        };
        let (x, y, z) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
        if x > y && x > z {
            Orientation::Sagittal
        } else if y > x && y > z {
            Orientation::Coronal
        } else if z > x && z > y {
            Orientation::Transversal
        } else {
            Orientation::Undefined
        }
    }

    /// Inner product of position and normal, `NaN` if either is missing.
    pub fn position_along_normal(position: Option<&Vector3>, normal: Option<&Vector3>) -> f64 {
        match (position, normal) {
            (Some(position), Some(normal)) => position.dot(normal),
            _ => f64::NAN,
        }
    }

    pub fn position(&self) -> Option<Vector3> {
        self.position
    }

    pub fn row(&self) -> Option<Vector3> {
        self.row
    }

    pub fn col(&self) -> Option<Vector3> {
        self.col
    }

    pub fn normal(&self) -> Option<Vector3> {
        self.normal
    }

    pub fn orientation(&self) -> Orientation {
        Self::main_orientation(self.normal.as_ref())
    }

    pub fn signed_position(&self) -> f64 {
        Self::position_along_normal(self.position.as_ref(), self.normal.as_ref())
    }

    /// True when position and both directions are present and usable.
    pub fn contains_plane(&self) -> bool {
        match (&self.position, &self.row, &self.col) {
            (Some(position), Some(row), Some(col)) => {
                position.iter().all(|c| c.is_finite())
                    && !is_degenerate(row)
                    && !is_degenerate(col)
            }
            _ => false,
        }
    }
}
