use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Missing attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("Invalid attribute {name}: {reason}")]
    InvalidAttribute { name: &'static str, reason: String },

    #[error("Pixel data error: {0}")]
    PixelData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}
