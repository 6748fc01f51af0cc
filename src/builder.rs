use crate::grouper::stack_order;
use crate::slice::Slice;
use crate::validator::{ValidationOptions, VolumeValidator};
use crate::volume::Volume;

use ndarray::Array3;
use tracing::{debug, warn};

/// Assembles a [`Volume`] from slices that pass validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeBuilder {
    validator: VolumeValidator,
}

impl VolumeBuilder {
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            validator: VolumeValidator::new(options),
        }
    }

    /// Build a volume from `slices`, given in any order.
    ///
    /// Returns `None` when the slices are not [`valid`](crate::ValidationResult::valid).
    /// Every slice is expected to deliver exactly `rows * columns` samples.
    pub fn build(&self, slices: &[&Slice]) -> Option<Volume> {
        let result = self.validator.validate(slices);
        if !result.valid() {
            debug!(slices = slices.len(), failed = ?result.failures(), "slices do not form a volume");
            return None;
        }

        let mut ordered: Vec<&Slice> = slices.to_vec();
        ordered.sort_by(|a, b| stack_order(a, b));

        let first = ordered[0];
        let plane = first.plane();
        let normal = plane.normal()?;
        let position = plane.position()?;
        let orientation_row = plane.row()?;
        let orientation_col = plane.col()?;

        let voxel_size_z = Self::mean_distance(&ordered).unwrap_or(first.slice_thickness);

        let (rows, columns, depth) = (first.rows as usize, first.columns as usize, ordered.len());
        let expected = rows * columns * depth;
        let mut buffer = vec![0u16; expected];
        let mut offset = 0;
        for slice in &ordered {
            offset += slice.write_pixels_u16(&mut buffer, offset);
        }
        if offset != expected {
            warn!(expected, written = offset, "pixel count does not match the volume size");
        }

        let data = Array3::from_shape_vec((depth, rows, columns), buffer).ok()?;
        Some(Volume::new(
            data,
            (first.pixel_spacing_row, first.pixel_spacing_col, voxel_size_z),
            orientation_row,
            orientation_col,
            normal,
            position,
            first.pixels_are_signed,
            ordered.into_iter().cloned().collect(),
        ))
    }

    /// Mean of the distances between consecutive slices along the normal.
    fn mean_distance(ordered: &[&Slice]) -> Option<f64> {
        if ordered.len() < 2 {
            return None;
        }
        let total: f64 = ordered
            .windows(2)
            .map(|pair| (pair[1].position_along_normal() - pair[0].position_along_normal()).abs())
            .sum();
        Some(total / (ordered.len() - 1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector3;
    use crate::slice::InMemoryPixels;

    fn axial(z: f64, fill: u16) -> Slice {
        Slice::new(InMemoryPixels(vec![fill; 6]))
            .with_matrix(2, 3)
            .with_pixel_spacing(0.7, 0.9)
            .with_geometry(Vector3::new(0.0, 0.0, z), Vector3::x(), Vector3::y())
    }

    #[test]
    fn test_build_orders_and_copies_pixels() {
        let slices = [axial(0.0, 1), axial(4.0, 2), axial(2.0, 3)];
        let refs: Vec<&Slice> = slices.iter().collect();
        let volume = VolumeBuilder::default().build(&refs).unwrap();

        assert_eq!((volume.dim_x(), volume.dim_y(), volume.dim_z()), (3, 2, 3));
        assert_eq!(volume.voxel_size_x(), 0.7);
        assert_eq!(volume.voxel_size_y(), 0.9);
        assert!((volume.voxel_size_z() - 2.0).abs() < 1e-9);
        // normal points to -z, so the highest z comes first
        assert_eq!(volume.position(), Vector3::new(0.0, 0.0, 4.0));
        let expected: Vec<u16> = [2, 3, 1].iter().flat_map(|&v| vec![v; 6]).collect();
        assert_eq!(volume.voxels(), expected.as_slice());
    }

    #[test]
    fn test_build_rejects_invalid_input() {
        let slices = [axial(0.0, 1), axial(4.0, 2)];
        let refs: Vec<&Slice> = slices.iter().collect();
        assert!(VolumeBuilder::default().build(&refs).is_none());
        assert!(VolumeBuilder::default().build(&[]).is_none());
    }

    #[test]
    fn test_short_pixel_source_leaves_zeros() {
        let short = Slice::new(InMemoryPixels(vec![5; 4]))
            .with_matrix(2, 3)
            .with_pixel_spacing(0.7, 0.9)
            .with_geometry(Vector3::new(0.0, 0.0, 2.0), Vector3::x(), Vector3::y());
        let slices = [axial(0.0, 1), short, axial(4.0, 2)];
        let refs: Vec<&Slice> = slices.iter().collect();
        let volume = VolumeBuilder::default().build(&refs).unwrap();
        assert_eq!(volume.voxels().len(), 18);
        assert_eq!(&volume.voxels()[6..12], &[5, 5, 5, 5, 1, 1]);
        assert_eq!(&volume.voxels()[12..], &[1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_single_slice_uses_thickness() {
        let mut slice = axial(0.0, 1);
        slice.slice_thickness = 3.5;
        let builder = VolumeBuilder::new(ValidationOptions::default().with_minimum_count(1));
        let volume = builder.build(&[&slice]).unwrap();
        assert_eq!(volume.voxel_size_z(), 3.5);
        assert_eq!(volume.source_slices().len(), 1);
    }
}
