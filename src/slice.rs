use crate::enums::Orientation;
use crate::geometry::{PlaneGeometry, Vector3};

use chrono::NaiveDateTime;
use std::fmt;
use std::sync::Arc;

/// Grey values of one slice, delivered as unsigned 16-bit samples.
pub trait PixelSource: Send + Sync {
    /// All samples of the slice, row-major.
    fn pixels_as_u16(&self) -> Vec<u16>;

    /// Write the samples into `buffer` starting at `offset` and return how many
    /// were written. Writing stops at the end of `buffer`.
    fn write_pixels_u16(&self, buffer: &mut [u16], offset: usize) -> usize {
        copy_into(&self.pixels_as_u16(), buffer, offset)
    }
}

pub(crate) fn copy_into(pixels: &[u16], buffer: &mut [u16], offset: usize) -> usize {
    let Some(target) = buffer.get_mut(offset..) else {
        return 0;
    };
    let count = pixels.len().min(target.len());
    target[..count].copy_from_slice(&pixels[..count]);
    count
}

/// Pixel source backed by an owned sample buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryPixels(pub Vec<u16>);

impl PixelSource for InMemoryPixels {
    fn pixels_as_u16(&self) -> Vec<u16> {
        self.0.clone()
    }

    fn write_pixels_u16(&self, buffer: &mut [u16], offset: usize) -> usize {
        copy_into(&self.0, buffer, offset)
    }
}

/// One 2D image together with the metadata needed to place it in a volume.
///
/// `pixel_spacing_row` is the distance between neighbouring pixels along a
/// row (x), `pixel_spacing_col` the distance along a column (y).
#[derive(Clone)]
pub struct Slice {
    pub sop_class_uid: String,
    pub sop_instance_uid: String,
    pub protocol_name: String,
    pub image_types: Vec<String>,
    pub rows: u32,
    pub columns: u32,
    pub pixel_spacing_row: f64,
    pub pixel_spacing_col: f64,
    pub slice_thickness: f64,
    pub position: Option<Vector3>,
    pub orientation_row: Option<Vector3>,
    pub orientation_col: Option<Vector3>,
    pub acquisition_date_time: Option<NaiveDateTime>,
    pub pixels_are_signed: bool,
    invert_normal: bool,
    pixels: Arc<dyn PixelSource>,
}

impl Default for Slice {
    fn default() -> Self {
        Self::new(InMemoryPixels::default())
    }
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slice")
            .field("sop_instance_uid", &self.sop_instance_uid)
            .field("rows", &self.rows)
            .field("columns", &self.columns)
            .field("position", &self.position.map(|p| [p.x, p.y, p.z]))
            .field("acquisition_date_time", &self.acquisition_date_time)
            .field("invert_normal", &self.invert_normal)
            .finish_non_exhaustive()
    }
}

impl Slice {
    pub fn new(pixels: impl PixelSource + 'static) -> Self {
        Self::from_shared(Arc::new(pixels))
    }

    pub fn from_shared(pixels: Arc<dyn PixelSource>) -> Self {
        Self {
            sop_class_uid: String::new(),
            sop_instance_uid: String::new(),
            protocol_name: String::new(),
            image_types: Vec::new(),
            rows: 0,
            columns: 0,
            pixel_spacing_row: 0.0,
            pixel_spacing_col: 0.0,
            slice_thickness: 0.0,
            position: None,
            orientation_row: None,
            orientation_col: None,
            acquisition_date_time: None,
            pixels_are_signed: false,
            invert_normal: false,
            pixels,
        }
    }

    pub fn with_matrix(mut self, rows: u32, columns: u32) -> Self {
        self.rows = rows;
        self.columns = columns;
        self
    }

    pub fn with_pixel_spacing(mut self, row: f64, col: f64) -> Self {
        self.pixel_spacing_row = row;
        self.pixel_spacing_col = col;
        self
    }

    pub fn with_geometry(mut self, position: Vector3, row: Vector3, col: Vector3) -> Self {
        self.position = Some(position);
        self.orientation_row = Some(row);
        self.orientation_col = Some(col);
        self
    }

    pub fn with_acquisition_date_time(mut self, date_time: NaiveDateTime) -> Self {
        self.acquisition_date_time = Some(date_time);
        self
    }

    /// Geometry of this slice, recomputed on every call.
    pub fn plane(&self) -> PlaneGeometry {
        PlaneGeometry::new(
            self.position,
            self.orientation_row,
            self.orientation_col,
            self.invert_normal,
        )
    }

    pub fn invert_normal(&self) -> bool {
        self.invert_normal
    }

    /// Flip the direction of the orientation normal. Later calls to
    /// [`Slice::normal`] and [`Slice::position_along_normal`] observe the change.
    pub fn set_invert_normal(&mut self, invert: bool) {
        self.invert_normal = invert;
    }

    pub fn normal(&self) -> Option<Vector3> {
        self.plane().normal()
    }

    pub fn position_along_normal(&self) -> f64 {
        self.plane().signed_position()
    }

    pub fn main_orientation(&self) -> Orientation {
        self.plane().orientation()
    }

    pub fn contains_plane(&self) -> bool {
        self.plane().contains_plane()
    }

    /// Physical extent `(x, y)` of the pixel matrix.
    pub fn field_of_view(&self) -> (f64, f64) {
        (
            self.columns as f64 * self.pixel_spacing_row,
            self.rows as f64 * self.pixel_spacing_col,
        )
    }

    pub fn pixel_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    pub fn pixels_as_u16(&self) -> Vec<u16> {
        self.pixels.pixels_as_u16()
    }

    pub fn write_pixels_u16(&self, buffer: &mut [u16], offset: usize) -> usize {
        self.pixels.write_pixels_u16(buffer, offset)
    }
}
