//! Consistency checks deciding whether a set of slices forms one volume.

use crate::geometry::{DEFAULT_TOLERANCE, PlaneGeometry, Vector3, almost_equal, almost_parallel};
use crate::slice::Slice;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationOptions {
    /// Smallest number of slices accepted as a volume.
    pub minimum_count: usize,
    /// Tolerance of the position and normal comparisons.
    pub tolerance: f64,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            minimum_count: 3,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ValidationOptions {
    pub fn with_minimum_count(mut self, minimum_count: usize) -> Self {
        self.minimum_count = minimum_count;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Outcome of the individual checks. Callers pick the verdict they need:
/// [`ValidationResult::valid`] gates volume creation, [`ValidationResult::all_valid`]
/// additionally demands equal fields of view and regular spacing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub count_sufficient: bool,
    pub matrices_match: bool,
    pub fovs_match: bool,
    pub normals_parallel: bool,
    pub positions_in_line: bool,
    pub positions_line_parallel_to_normals: bool,
    pub distances_equidistant: bool,
}

impl ValidationResult {
    pub fn valid(&self) -> bool {
        self.count_sufficient && self.matrices_match && self.normals_parallel && self.positions_in_line
    }

    pub fn all_valid(&self) -> bool {
        self.valid()
            && self.fovs_match
            && self.positions_line_parallel_to_normals
            && self.distances_equidistant
    }

    /// Names of the checks that did not pass.
    pub fn failures(&self) -> Vec<&'static str> {
        [
            ("count_sufficient", self.count_sufficient),
            ("matrices_match", self.matrices_match),
            ("fovs_match", self.fovs_match),
            ("normals_parallel", self.normals_parallel),
            ("positions_in_line", self.positions_in_line),
            (
                "positions_line_parallel_to_normals",
                self.positions_line_parallel_to_normals,
            ),
            ("distances_equidistant", self.distances_equidistant),
        ]
        .into_iter()
        .filter_map(|(name, passed)| (!passed).then_some(name))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeValidator {
    options: ValidationOptions,
}

impl VolumeValidator {
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Run every check on `slices`, which may be given in any order.
    ///
    /// Geometric problems never produce errors; they clear the affected flags.
    pub fn validate(&self, slices: &[&Slice]) -> ValidationResult {
        let mut result = ValidationResult {
            count_sufficient: slices.len() >= self.options.minimum_count,
            ..Default::default()
        };
        if slices.is_empty() {
            return result;
        }

        let mut planes: Vec<(&Slice, PlaneGeometry)> =
            slices.iter().map(|slice| (*slice, slice.plane())).collect();
        planes.sort_by(|a, b| a.1.signed_position().total_cmp(&b.1.signed_position()));

        result.matrices_match = Self::matrices_match(&planes);
        result.fovs_match = Self::fovs_match(&planes);
        result.positions_in_line = self.positions_in_line(&planes);
        result.normals_parallel = self.normals_parallel(&planes);
        if result.positions_in_line && result.normals_parallel {
            result.positions_line_parallel_to_normals = self.line_parallel_to_normals(&planes);
        }
        result.distances_equidistant = Self::distances_equidistant(&planes);
        result
    }

    fn matrices_match(planes: &[(&Slice, PlaneGeometry)]) -> bool {
        let first = planes[0].0;
        first.pixel_count() > 0
            && planes
                .iter()
                .all(|(slice, _)| slice.rows == first.rows && slice.columns == first.columns)
    }

    fn fovs_match(planes: &[(&Slice, PlaneGeometry)]) -> bool {
        let first = planes[0].0.field_of_view();
        first.0 > 0.0
            && first.1 > 0.0
            && planes
                .iter()
                .all(|(slice, _)| slice.field_of_view() == first)
    }

    fn positions_in_line(&self, planes: &[(&Slice, PlaneGeometry)]) -> bool {
        let tolerance = self.options.tolerance;
        let Some(reference) = planes[0].1.position() else {
            return false;
        };
        let mut line: Option<Vector3> = None;
        for (_, plane) in &planes[1..] {
            let Some(position) = plane.position() else {
                return false;
            };
            if almost_equal(&position, &reference, tolerance) {
                continue;
            }
            let direction = position - reference;
            match line {
                None => line = Some(direction),
                Some(base) => {
                    if !almost_parallel(&base, &direction, tolerance) {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn normals_parallel(&self, planes: &[(&Slice, PlaneGeometry)]) -> bool {
        let Some(first) = planes[0].1.normal() else {
            return false;
        };
        planes.iter().all(|(_, plane)| {
            plane
                .normal()
                .is_some_and(|normal| almost_parallel(&first, &normal, self.options.tolerance))
        })
    }

    fn line_parallel_to_normals(&self, planes: &[(&Slice, PlaneGeometry)]) -> bool {
        let first = &planes[0].1;
        let last = &planes[planes.len() - 1].1;
        match (first.position(), last.position(), first.normal()) {
            (Some(start), Some(end), Some(normal)) => {
                almost_parallel(&(end - start), &normal, self.options.tolerance)
            }
            _ => false,
        }
    }

    // Exact comparison, unlike the position checks.
    fn distances_equidistant(planes: &[(&Slice, PlaneGeometry)]) -> bool {
        let distances: Vec<f64> = planes
            .windows(2)
            .map(|pair| (pair[1].1.signed_position() - pair[0].1.signed_position()).abs())
            .collect();
        match distances.first() {
            Some(first) => distances.iter().all(|distance| distance == first),
            None => true,
        }
    }
}
