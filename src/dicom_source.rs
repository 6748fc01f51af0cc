//! Adapter from DICOM objects to [`Slice`]s.

use crate::error::VolumeError;
use crate::geometry::Vector3;
use crate::slice::{InMemoryPixels, Slice};

use chrono::{NaiveDateTime, NaiveTime};
use dicom::core::Tag;
use dicom::core::value::range::AsRange;
use dicom::core::value::PreciseDateTime;
use dicom::object::{FileDicomObject, InMemDicomObject, open_file};
use dicom::pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption};
use dicom_dictionary_std::tags;
use ndarray::s;
use std::path::{Path, PathBuf};
use std::{fs, io};
use tracing::debug;

type DicomObject = FileDicomObject<InMemDicomObject>;

/// Stored pixel values of the first frame, row-major.
///
/// Modality and VOI LUTs are disabled so the stored grey values survive.
/// Fails when the decoded frame does not hold `rows * columns` samples.
pub fn decode_pixels(object: &DicomObject, rows: u32, columns: u32) -> Result<Vec<u16>, VolumeError> {
    let pixel_data = object
        .decode_pixel_data()
        .map_err(|e| VolumeError::PixelData(e.to_string()))?;
    let options = ConvertOptions::new()
        .with_modality_lut(ModalityLutOption::None)
        .with_voi_lut(VoiLutOption::Identity);
    let frames = pixel_data
        .to_ndarray_with_options::<u16>(&options)
        .map_err(|e| VolumeError::PixelData(e.to_string()))?;
    let pixels: Vec<u16> = frames.slice_move(s![0, .., .., 0]).iter().copied().collect();

    let expected = rows as usize * columns as usize;
    if pixels.len() != expected {
        return Err(VolumeError::PixelData(format!(
            "decoded {} samples, expected {expected}",
            pixels.len()
        )));
    }
    Ok(pixels)
}

/// Read the slice attributes and pixels of `object`.
///
/// Rows, Columns and decodable pixel data are required. Missing geometry is
/// left empty so the slice is later excluded from grouping instead of failing
/// the whole load.
pub fn slice_from_object(object: DicomObject) -> Result<Slice, VolumeError> {
    let rows = get_required_u32(&object, tags::ROWS, "Rows")?;
    let columns = get_required_u32(&object, tags::COLUMNS, "Columns")?;
    let pixels = decode_pixels(&object, rows, columns)?;

    let spacing = get_f64_vec(&object, tags::PIXEL_SPACING).unwrap_or_default();
    // Pixel Spacing is (between rows, between columns)
    let (pixel_spacing_col, pixel_spacing_row) = match spacing.as_slice() {
        [between_rows, between_columns] => (*between_rows, *between_columns),
        _ => (0.0, 0.0),
    };

    let position = get_f64_vec(&object, tags::IMAGE_POSITION_PATIENT)
        .and_then(|values| vector_at(&values, 0));
    let orientation = get_f64_vec(&object, tags::IMAGE_ORIENTATION_PATIENT).unwrap_or_default();
    let (orientation_row, orientation_col) = if orientation.len() == 6 {
        (vector_at(&orientation, 0), vector_at(&orientation, 3))
    } else {
        (None, None)
    };

    let image_types = get_string(&object, tags::IMAGE_TYPE)
        .map(|value| value.split('\\').map(|part| part.trim().to_string()).collect())
        .unwrap_or_default();

    let mut slice = Slice::new(InMemoryPixels(pixels));
    slice.sop_class_uid = get_string(&object, tags::SOP_CLASS_UID).unwrap_or_default();
    slice.sop_instance_uid = get_string(&object, tags::SOP_INSTANCE_UID).unwrap_or_default();
    slice.protocol_name = get_string(&object, tags::PROTOCOL_NAME).unwrap_or_default();
    slice.image_types = image_types;
    slice.rows = rows;
    slice.columns = columns;
    slice.pixel_spacing_row = pixel_spacing_row;
    slice.pixel_spacing_col = pixel_spacing_col;
    slice.slice_thickness = get_f64(&object, tags::SLICE_THICKNESS).unwrap_or(0.0);
    slice.position = position;
    slice.orientation_row = orientation_row;
    slice.orientation_col = orientation_col;
    slice.acquisition_date_time = acquisition_date_time(&object);
    slice.pixels_are_signed = get_u32(&object, tags::PIXEL_REPRESENTATION) == Some(1);
    Ok(slice)
}

pub fn slice_from_file(path: impl AsRef<Path>) -> Result<Slice, VolumeError> {
    slice_from_object(open_file(path.as_ref())?)
}

/// Files in `dir` with a `.dcm` extension (any case), sorted by path.
pub fn dicom_files_in(dir: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_dicom_file(path))
        .collect();
    paths.sort();
    Ok(paths)
}

pub fn is_dicom_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
}

/// Acquisition DateTime, or Acquisition Date and Time combined.
///
/// Partial values take their earliest instant. A DT value carrying a UTC
/// offset is converted to UTC; DA/TM pairs have no offset and are kept as is.
fn acquisition_date_time(obj: &InMemDicomObject) -> Option<NaiveDateTime> {
    let from_dt = obj
        .element(tags::ACQUISITION_DATE_TIME)
        .ok()
        .and_then(|element| element.to_datetime().ok())
        .and_then(|value| value.earliest().ok())
        .map(|precise| match precise {
            PreciseDateTime::Naive(naive) => naive,
            PreciseDateTime::TimeZone(zoned) => {
                debug!(offset = %zoned.offset(), "acquisition time converted to UTC");
                zoned.naive_utc()
            }
        });
    from_dt.or_else(|| {
        let date = obj
            .element(tags::ACQUISITION_DATE)
            .ok()?
            .to_date()
            .ok()?
            .earliest()
            .ok()?;
        let time = obj
            .element(tags::ACQUISITION_TIME)
            .ok()
            .and_then(|element| element.to_time().ok())
            .and_then(|value| value.earliest().ok())
            .unwrap_or(NaiveTime::MIN);
        Some(date.and_time(time))
    })
}

fn vector_at(values: &[f64], start: usize) -> Option<Vector3> {
    let v = values.get(start..start + 3)?;
    Some(Vector3::new(v[0], v[1], v[2]))
}

// --- Helpers ---

fn get_string(obj: &DicomObject, tag: Tag) -> Option<String> {
    let value = obj.element(tag).ok()?.to_str().ok()?;
    let value = value.trim_end_matches('\0').trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn get_u32(obj: &DicomObject, tag: Tag) -> Option<u32> {
    obj.element(tag).ok()?.to_int::<u32>().ok()
}

fn get_required_u32(obj: &DicomObject, tag: Tag, name: &'static str) -> Result<u32, VolumeError> {
    obj.element(tag)
        .map_err(|_| VolumeError::MissingAttribute(name))?
        .to_int::<u32>()
        .map_err(|e| VolumeError::InvalidAttribute {
            name,
            reason: e.to_string(),
        })
}

fn get_f64(obj: &DicomObject, tag: Tag) -> Option<f64> {
    obj.element(tag).ok()?.to_float64().ok()
}

fn get_f64_vec(obj: &DicomObject, tag: Tag) -> Option<Vec<f64>> {
    obj.element(tag).ok()?.to_multi_float64().ok()
}
