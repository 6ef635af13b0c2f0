pub mod camera;
pub mod file;

use std::io;
use std::path::PathBuf;

use crate::media::MediaError;

pub use camera::{
    capture_from_camera, CameraDevice, CommandCamera, DeviceAccessError, ShutterAction,
};
pub use file::capture_from_file;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Device(#[from] DeviceAccessError),
}
