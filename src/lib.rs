//! # DICOM volume builder
//!
//! This crate turns a loose collection of 2D DICOM slices into 3D volumes, or
//! into 4D stacks when the same positions were acquired repeatedly.

//!
//! Every slice carries its plane geometry (position and row/column direction
//! in patient coordinates). From it the crate derives the orientation normal,
//! the dominant anatomical plane and the position of the slice along the
//! normal. Slices are then
//!  - grouped by SOP class, protocol, image type, dominant plane, matrix size
//!    and pixel spacing,
//!  - sorted along the normal and validated for consistent geometry,
//!  - split per timepoint when positions repeat,
//!  - copied into a single voxel buffer.
//!
//!  Validation never fails with an error. A failed check shows up as a
//!  `false` flag in [`ValidationResult`], and [`VolumeBuilder::build`]
//!  returns `None` for slices that do not form a volume.
//!
//!  Slices can be created by hand through [`Slice`] and any [`PixelSource`],
//!  or read from DICOM files with the [`dicom_source`] adapter. Files are
//!  read in parallel using rayon.
//!
//! # Examples
//!
//! ## Reading a directory into volumes
//!
//! To read all DICOM files from the dicom/ directory and build one volume per
//! series and timepoint. Then get the transversal image at the center of the
//! first volume.
//!
//! ```no_run
//! # use dicom_volume_builder::{VolumeLoader, GroupingOptions, Orientation, SplitMode};
//! let volumes = VolumeLoader::load_from_directory(
//!     "dicom",
//!     GroupingOptions::default(),
//!     SplitMode::PerTimepoint,
//! )
//! .expect("should have loaded volumes from directory");
//! let volume = &volumes[0];
//! let image = volume
//!     .plane_image(volume.dim().0 / 2, Orientation::Transversal)
//!     .expect("should have returned image at center of volume");
//! image.save("result.png").expect("should have written the image");
//! ```
//!
//! ## Building a volume from slices
//!
//! ```
//! # use dicom_volume_builder::{InMemoryPixels, Slice, Vector3, VolumeBuilder};
//! let slices: Vec<Slice> = [0.0, 5.0, 10.0]
//!     .into_iter()
//!     .map(|z| {
//!         Slice::new(InMemoryPixels(vec![0; 4]))
//!             .with_matrix(2, 2)
//!             .with_pixel_spacing(1.0, 1.0)
//!             .with_geometry(Vector3::new(0.0, 0.0, z), Vector3::x(), Vector3::y())
//!     })
//!     .collect();
//! let refs: Vec<&Slice> = slices.iter().collect();
//! let volume = VolumeBuilder::default().build(&refs).expect("slices form a volume");
//! assert_eq!(volume.dim_z(), 3);
//! assert!((volume.voxel_size_z() - 5.0).abs() < 1e-9);
//! ```

pub mod builder;
pub mod dicom_source;
pub mod enums;
pub mod error;
pub mod geometry;
pub mod grouper;
pub mod slice;
pub mod validator;
pub mod volume;
pub mod volume_loader;

pub use builder::VolumeBuilder;
pub use enums::{Orientation, SplitMode};
pub use error::VolumeError;
pub use geometry::{DEFAULT_TOLERANCE, PlaneGeometry, Vector3, almost_equal, almost_parallel};
pub use grouper::{GroupKey, GroupingOptions, VolumeCandidate, VolumeGrouper};
pub use slice::{InMemoryPixels, PixelSource, Slice};
pub use validator::{ValidationOptions, ValidationResult, VolumeValidator};
pub use volume::Volume;
pub use volume_loader::VolumeLoader;
