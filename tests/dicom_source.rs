use dicom::core::{DataElement, PrimitiveValue, VR, dicom_value};
use dicom::object::{FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom_dictionary_std::{tags, uids};
use dicom_volume_builder::dicom_source::slice_from_object;
use dicom_volume_builder::{
    GroupingOptions, Orientation, SplitMode, Vector3, VolumeError, VolumeLoader,
};

fn mr_slice(instance: &str, z: &str, fill: u16) -> FileDicomObject<InMemDicomObject> {
    with_pixels(instance, z, dicom_value!(U16, [fill, fill, fill, fill, fill, fill]))
}

fn with_pixels(instance: &str, z: &str, pixels: PrimitiveValue) -> FileDicomObject<InMemDicomObject> {
    let object = InMemDicomObject::from_element_iter([
        DataElement::new(tags::SOP_CLASS_UID, VR::UI, PrimitiveValue::from(uids::MR_IMAGE_STORAGE)),
        DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from(instance)),
        DataElement::new(tags::IMAGE_TYPE, VR::CS, dicom_value!(Strs, ["ORIGINAL", "PRIMARY", "M"])),
        DataElement::new(tags::PROTOCOL_NAME, VR::LO, PrimitiveValue::from("t1_se_tra")),
        DataElement::new(tags::ACQUISITION_DATE, VR::DA, PrimitiveValue::from("20240301")),
        DataElement::new(tags::ACQUISITION_TIME, VR::TM, PrimitiveValue::from("101502.5")),
        DataElement::new(tags::SLICE_THICKNESS, VR::DS, PrimitiveValue::from("3")),
        DataElement::new(
            tags::IMAGE_POSITION_PATIENT,
            VR::DS,
            dicom_value!(Strs, ["-10", "-20", z]),
        ),
        DataElement::new(
            tags::IMAGE_ORIENTATION_PATIENT,
            VR::DS,
            dicom_value!(Strs, ["1", "0", "0", "0", "1", "0"]),
        ),
        DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)),
        DataElement::new(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, PrimitiveValue::from("MONOCHROME2")),
        DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(2_u16)),
        DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(3_u16)),
        DataElement::new(tags::PIXEL_SPACING, VR::DS, dicom_value!(Strs, ["0.5", "0.25"])),
        DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16)),
        DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(16_u16)),
        DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(15_u16)),
        DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(0_u16)),
        DataElement::new(tags::PIXEL_DATA, VR::OW, pixels),
    ]);
    object
        .with_meta(FileMetaTableBuilder::new().transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN))
        .unwrap()
}

#[test]
fn test_slice_attributes_are_read() {
    let slice = slice_from_object(mr_slice("1.2.3.1", "30", 7)).unwrap();
    assert_eq!(slice.sop_class_uid, uids::MR_IMAGE_STORAGE);
    assert_eq!(slice.sop_instance_uid, "1.2.3.1");
    assert_eq!(slice.protocol_name, "t1_se_tra");
    assert_eq!(slice.image_types, vec!["ORIGINAL", "PRIMARY", "M"]);
    assert_eq!((slice.rows, slice.columns), (2, 3));
    assert_eq!(slice.pixel_spacing_row, 0.25);
    assert_eq!(slice.pixel_spacing_col, 0.5);
    assert_eq!(slice.slice_thickness, 3.0);
    assert_eq!(slice.position, Some(Vector3::new(-10.0, -20.0, 30.0)));
    assert_eq!(slice.main_orientation(), Orientation::Transversal);
    assert!(!slice.pixels_are_signed);
    assert_eq!(
        slice.acquisition_date_time.map(|t| t.to_string()),
        Some("2024-03-01 10:15:02.500".to_string())
    );
}

#[test]
fn test_pixels_are_decoded() {
    let slice = slice_from_object(mr_slice("1.2.3.1", "30", 7)).unwrap();
    assert_eq!(slice.pixels_as_u16(), vec![7; 6]);
}

#[test]
fn test_truncated_pixel_data_is_rejected() {
    let truncated = with_pixels("1.2.3.9", "30", dicom_value!(U16, [7, 7, 7]));
    let result = slice_from_object(truncated);
    assert!(matches!(result, Err(VolumeError::PixelData(_))));
}

#[test]
fn test_loader_skips_slices_with_broken_pixels() {
    let objects = vec![
        mr_slice("1.2.3.1", "0", 1),
        mr_slice("1.2.3.2", "3", 2),
        with_pixels("1.2.3.9", "4.5", dicom_value!(U16, [9, 9, 9])),
        mr_slice("1.2.3.3", "6", 3),
    ];
    let volumes =
        VolumeLoader::load_from_dicom_objects(objects, GroupingOptions::default(), SplitMode::PerTimepoint)
            .unwrap();
    assert_eq!(volumes.len(), 1);
    assert_eq!(volumes[0].dim_z(), 3);
    assert!(!volumes[0].voxels().contains(&0));
    assert!(!volumes[0].voxels().contains(&9));
}

#[test]
fn test_loader_builds_volume_from_objects() {
    let objects = vec![
        mr_slice("1.2.3.3", "6", 3),
        mr_slice("1.2.3.1", "0", 1),
        mr_slice("1.2.3.2", "3", 2),
    ];
    let volumes =
        VolumeLoader::load_from_dicom_objects(objects, GroupingOptions::default(), SplitMode::PerTimepoint)
            .unwrap();
    assert_eq!(volumes.len(), 1);
    let volume = &volumes[0];
    assert_eq!((volume.dim_x(), volume.dim_y(), volume.dim_z()), (3, 2, 3));
    assert!((volume.voxel_size_z() - 3.0).abs() < 1e-9);
    let firsts: Vec<u16> = volume.voxels().chunks(6).map(|c| c[0]).collect();
    assert_eq!(firsts, vec![3, 2, 1]);
}

#[test]
fn test_loader_without_volumes_fails() {
    let objects = vec![mr_slice("1.2.3.1", "0", 1), mr_slice("1.2.3.2", "3", 2)];
    let result =
        VolumeLoader::load_from_dicom_objects(objects, GroupingOptions::default(), SplitMode::PerTimepoint);
    assert!(matches!(result, Err(VolumeError::NoValidImages)));
}
