use crate::enums::Orientation;
use crate::geometry::{PlaneGeometry, Vector3};
use crate::slice::Slice;

use image::ImageBuffer;
use image::Luma;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::ArrayView3;
use ndarray::s;
use rayon::prelude::*;

/// Voxel grid assembled from a validated stack of slices.
///
/// The data is laid out as `(z, y, x)`: slices in ascending position along the
/// normal, rows, then columns.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<u16>,
    voxel_size: (f64, f64, f64),
    orientation_row: Vector3,
    orientation_col: Vector3,
    orientation_normal: Vector3,
    position: Vector3,
    is_signed: bool,
    source_slices: Vec<Slice>,
}

impl Volume {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        data: Array3<u16>,
        voxel_size: (f64, f64, f64),
        orientation_row: Vector3,
        orientation_col: Vector3,
        orientation_normal: Vector3,
        position: Vector3,
        is_signed: bool,
        source_slices: Vec<Slice>,
    ) -> Self {
        Self {
            data,
            voxel_size,
            orientation_row,
            orientation_col,
            orientation_normal,
            position,
            is_signed,
            source_slices,
        }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn dim_x(&self) -> u32 {
        self.data.dim().2 as u32
    }

    pub fn dim_y(&self) -> u32 {
        self.data.dim().1 as u32
    }

    pub fn dim_z(&self) -> u32 {
        self.data.dim().0 as u32
    }

    pub fn voxel_size_x(&self) -> f64 {
        self.voxel_size.0
    }

    pub fn voxel_size_y(&self) -> f64 {
        self.voxel_size.1
    }

    pub fn voxel_size_z(&self) -> f64 {
        self.voxel_size.2
    }

    pub fn orientation_row(&self) -> Vector3 {
        self.orientation_row
    }

    pub fn orientation_col(&self) -> Vector3 {
        self.orientation_col
    }

    pub fn orientation_normal(&self) -> Vector3 {
        self.orientation_normal
    }

    /// Position of the first slice.
    pub fn position(&self) -> Vector3 {
        self.position
    }

    pub fn is_signed(&self) -> bool {
        self.is_signed
    }

    /// Flat voxel buffer, row-major within each slice.
    pub fn voxels(&self) -> &[u16] {
        self.data.as_slice().unwrap_or(&[])
    }

    pub fn as_array(&self) -> ArrayView3<'_, u16> {
        self.data.view()
    }

    pub fn into_array(self) -> Array3<u16> {
        self.data
    }

    pub fn source_slices(&self) -> &[Slice] {
        &self.source_slices
    }

    /// Offset of voxel `(x, y, z)` in [`Volume::voxels`].
    pub fn voxel_index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        let (depth, height, width) = self.data.dim();
        (x < width && y < height && z < depth).then(|| (z * height + y) * width + x)
    }

    pub fn voxel(&self, x: usize, y: usize, z: usize) -> Option<u16> {
        self.data.get((z, y, x)).copied()
    }

    /// Volume axis (0 = z, 1 = y, 2 = x) perpendicular to the anatomical
    /// plane `orientation`.
    fn axis_for(&self, orientation: Orientation) -> Option<usize> {
        if orientation == Orientation::Undefined {
            return None;
        }
        [
            self.orientation_normal,
            self.orientation_col,
            self.orientation_row,
        ]
        .iter()
        .position(|direction| PlaneGeometry::main_orientation(Some(direction)) == orientation)
    }

    /// Axis-aligned plane of the given anatomical orientation, without any
    /// interpolation.
    pub fn plane(&self, index: usize, orientation: Orientation) -> Option<ArrayView2<'_, u16>> {
        let axis = self.axis_for(orientation)?;
        if index >= self.data.len_of(ndarray::Axis(axis)) {
            return None;
        }
        let view = match axis {
            0 => self.data.slice(s![index, .., ..]),
            1 => self.data.slice(s![.., index, ..]),
            _ => self.data.slice(s![.., .., index]),
        };
        Some(view)
    }

    /// 8-bit preview of a plane, windowed to the plane's own value range.
    pub fn plane_image(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let plane = self.plane(index, orientation)?;
        let (height, width) = plane.dim();
        let (min, max) = plane
            .iter()
            .fold((u16::MAX, u16::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let range = max.saturating_sub(min) as f32;
        let pixel_data: Vec<u8> = plane
            .into_par_iter()
            .map(|&v| Self::window_to_u8(v, min, range))
            .collect();
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
    }

    #[inline]
    fn window_to_u8(value: u16, min: u16, range: f32) -> u8 {
        if range <= 0.0 {
            return 0;
        }
        (((value - min) as f32 / range) * 255.0).clamp(0.0, 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume() -> Volume {
        let data = Array3::from_shape_vec((2, 2, 3), (0..12).collect()).unwrap();
        Volume::new(
            data,
            (0.5, 0.5, 2.0),
            Vector3::x(),
            Vector3::y(),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::zeros(),
            false,
            Vec::new(),
        )
    }

    #[test]
    fn test_dimensions() {
        let volume = volume();
        assert_eq!((volume.dim_x(), volume.dim_y(), volume.dim_z()), (3, 2, 2));
        assert_eq!(volume.voxels().len(), 12);
        assert_eq!(volume.voxel(2, 1, 1), Some(11));
        assert_eq!(volume.voxel(3, 0, 0), None);
    }

    #[test]
    fn test_voxel_index_matches_flat_buffer() {
        let volume = volume();
        assert_eq!(volume.voxel_index(0, 0, 0), Some(0));
        assert_eq!(volume.voxel_index(1, 1, 0), Some(4));
        assert_eq!(volume.voxel_index(2, 1, 1), Some(11));
        assert_eq!(volume.voxel_index(0, 2, 0), None);
        assert_eq!(volume.voxel_index(0, 0, 2), None);
        for (x, y, z) in [(0, 1, 1), (2, 0, 1), (1, 1, 0)] {
            let index = volume.voxel_index(x, y, z).unwrap();
            assert_eq!(Some(volume.voxels()[index]), volume.voxel(x, y, z));
        }
    }

    #[test]
    fn test_planes_follow_orientation_vectors() {
        let volume = volume();
        let transversal = volume.plane(1, Orientation::Transversal).unwrap();
        assert_eq!(transversal.iter().copied().collect::<Vec<_>>(), vec![6, 7, 8, 9, 10, 11]);
        let coronal = volume.plane(0, Orientation::Coronal).unwrap();
        assert_eq!(coronal.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 6, 7, 8]);
        let sagittal = volume.plane(2, Orientation::Sagittal).unwrap();
        assert_eq!(sagittal.iter().copied().collect::<Vec<_>>(), vec![2, 5, 8, 11]);
        assert!(volume.plane(2, Orientation::Transversal).is_none());
        assert!(volume.plane(0, Orientation::Undefined).is_none());
    }

    #[test]
    fn test_plane_image_is_windowed() {
        let image = volume().plane_image(0, Orientation::Transversal).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(0, 0).0, [0]);
        assert_eq!(image.get_pixel(2, 1).0, [255]);
    }
}
