use crate::builder::VolumeBuilder;
use crate::dicom_source::{dicom_files_in, slice_from_file, slice_from_object};
use crate::enums::SplitMode;
use crate::error::VolumeError;
use crate::grouper::{GroupingOptions, VolumeGrouper};
use crate::slice::Slice;
use crate::volume::Volume;

use dicom::object::{FileDicomObject, InMemDicomObject};
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, warn};

pub struct VolumeLoader;

impl VolumeLoader {
    /// Build every volume found in `slices`.
    ///
    /// Buckets that do not pass validation on their own are skipped.
    pub fn build_volumes(slices: &[Slice], options: GroupingOptions, mode: SplitMode) -> Vec<Volume> {
        let grouper = VolumeGrouper::new(options);
        let builder = VolumeBuilder::new(options.validation);
        let volumes: Vec<Volume> = grouper
            .candidates(slices, mode)
            .filter_map(|bucket| builder.build(&bucket))
            .collect();
        info!(slices = slices.len(), volumes = volumes.len(), ?mode, "volumes built");
        volumes
    }

    /// Load volumes from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - DICOM file objects, in any order
    /// * `options` - Grouping and validation settings
    /// * `mode` - Whether repeated positions become separate volumes or one stack
    ///
    /// # Errors
    ///
    /// Objects lacking Rows/Columns or with undecodable pixel data are skipped
    /// with a warning. Returns error if no volume could be built
    pub fn load_from_dicom_objects(
        dicom_objects: impl IntoIterator<Item = FileDicomObject<InMemDicomObject>>,
        options: GroupingOptions,
        mode: SplitMode,
    ) -> Result<Vec<Volume>, VolumeError> {
        let slices = Self::keep_readable(dicom_objects.into_iter().map(slice_from_object))?;
        Self::volumes_from_slices(&slices, options, mode)
    }

    /// Load volumes from file paths, reading and decoding the files in parallel
    ///
    /// # Errors
    ///
    /// Fails on the first file that cannot be opened or parsed. Slices with
    /// missing attributes or broken pixel data are skipped with a warning.
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path> + Sync],
        options: GroupingOptions,
        mode: SplitMode,
    ) -> Result<Vec<Volume>, VolumeError> {
        let results: Vec<Result<Slice, VolumeError>> =
            paths.par_iter().map(|path| slice_from_file(path.as_ref())).collect();
        let slices = Self::keep_readable(results)?;
        Self::volumes_from_slices(&slices, options, mode)
    }

    /// Load volumes from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        options: GroupingOptions,
        mode: SplitMode,
    ) -> Result<Vec<Volume>, VolumeError> {
        let paths = dicom_files_in(path)?;
        if paths.is_empty() {
            return Err(VolumeError::NoValidImages);
        }
        Self::load_from_file_paths(&paths, options, mode)
    }

    fn keep_readable(
        results: impl IntoIterator<Item = Result<Slice, VolumeError>>,
    ) -> Result<Vec<Slice>, VolumeError> {
        let mut slices = Vec::new();
        for result in results {
            match result {
                Ok(slice) => slices.push(slice),
                Err(e @ (VolumeError::Io(_) | VolumeError::Dicom(_))) => return Err(e),
                Err(e) => warn!(error = %e, "skipping DICOM object"),
            }
        }
        Ok(slices)
    }

    fn volumes_from_slices(
        slices: &[Slice],
        options: GroupingOptions,
        mode: SplitMode,
    ) -> Result<Vec<Volume>, VolumeError> {
        if slices.is_empty() {
            return Err(VolumeError::NoValidImages);
        }
        let volumes = Self::build_volumes(slices, options, mode);
        if volumes.is_empty() {
            return Err(VolumeError::NoValidImages);
        }
        Ok(volumes)
    }
}
