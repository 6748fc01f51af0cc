use std::{env, error::Error, path::PathBuf};

use dicom_volume_builder::{
    GroupingOptions, Orientation, SplitMode, volume_loader::VolumeLoader,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("DICOM_VOLUME_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let mut args = env::args().skip(1);
    let directory = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("dicom"));
    let preview = args.next().map(PathBuf::from);

    let volumes =
        VolumeLoader::load_from_directory(&directory, GroupingOptions::default(), SplitMode::PerTimepoint)?;
    for (i, volume) in volumes.iter().enumerate() {
        info!(
            volume = i,
            dim = ?(volume.dim_x(), volume.dim_y(), volume.dim_z()),
            voxel_size = ?(volume.voxel_size_x(), volume.voxel_size_y(), volume.voxel_size_z()),
            signed = volume.is_signed(),
            "volume"
        );
    }

    if let (Some(path), Some(volume)) = (preview, volumes.first()) {
        let orientation = volume
            .source_slices()
            .first()
            .map(|slice| slice.main_orientation())
            .unwrap_or(Orientation::Transversal);
        if let Some(image) = volume.plane_image(volume.dim().0 / 2, orientation) {
            image.save(&path)?;
            info!(path = %path.display(), "preview written");
        }
    }
    Ok(())
}
