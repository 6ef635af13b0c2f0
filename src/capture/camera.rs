use std::future::Future;
use std::io;
use std::process::Stdio;

use image::DynamicImage;
use tokio::fs::File;
use tokio::process::Command;
use tracing::{info, warn};

use crate::capture::CaptureError;
use crate::media::EncodedImage;

const EBUSY: i32 = 16;

#[derive(Debug, thiserror::Error)]
pub enum DeviceAccessError {
    #[error("permission to use camera {device} was denied")]
    PermissionDenied { device: String },
    #[error("no camera found at {device}")]
    NotFound { device: String },
    #[error("camera {device} is in use by another application")]
    Busy { device: String },
    #[error("camera {device} is unavailable: {reason}")]
    Unavailable { device: String, reason: String },
}

impl DeviceAccessError {
    fn from_io(device: &str, err: io::Error) -> Self {
        let device = device.to_string();
        match err.kind() {
            io::ErrorKind::PermissionDenied => DeviceAccessError::PermissionDenied { device },
            io::ErrorKind::NotFound => DeviceAccessError::NotFound { device },
            _ if err.raw_os_error() == Some(EBUSY) => DeviceAccessError::Busy { device },
            _ => DeviceAccessError::Unavailable {
                device,
                reason: err.to_string(),
            },
        }
    }
}

/// What the user sees while the camera is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraPreview {
    pub device: String,
    pub resolution: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterAction {
    TakePhoto,
    Cancel,
}

pub trait CameraDevice {
    type Stream: CameraStream;

    async fn acquire(&self) -> Result<Self::Stream, DeviceAccessError>;
}

pub trait CameraStream {
    fn preview(&self) -> CameraPreview;

    /// Grabs the current frame at the device's native resolution.
    async fn snapshot(&mut self) -> Result<DynamicImage, CaptureError>;

    fn release(&mut self);
}

/// Owns an acquired camera stream. The stream is released exactly once: after the
/// photo, on cancel, or when the session is dropped mid-flow.
pub struct CameraSession<S: CameraStream> {
    stream: Option<S>,
    preview: CameraPreview,
}

impl<S: CameraStream> CameraSession<S> {
    pub async fn open<D>(device: &D) -> Result<Self, DeviceAccessError>
    where
        D: CameraDevice<Stream = S>,
    {
        let stream = device.acquire().await?;
        let preview = stream.preview();
        info!(device = %preview.device, "Camera acquired");
        Ok(Self {
            stream: Some(stream),
            preview,
        })
    }

    pub fn preview(&self) -> &CameraPreview {
        &self.preview
    }

    pub async fn take_photo(mut self) -> Result<EncodedImage, CaptureError> {
        let frame = match self.stream.as_mut() {
            Some(stream) => stream.snapshot().await,
            None => Err(DeviceAccessError::Unavailable {
                device: self.preview.device.clone(),
                reason: "camera already released".to_string(),
            }
            .into()),
        };
        self.release();
        Ok(EncodedImage::png_from_dynamic(&frame?)?)
    }

    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            info!(device = %self.preview.device, "Camera released");
        }
    }
}

impl<S: CameraStream> Drop for CameraSession<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Acquires the camera, hands the live preview to `await_shutter`, then either
/// snapshots a PNG still or releases the device without an image (`Ok(None)`).
pub async fn capture_from_camera<D, F, Fut>(
    device: &D,
    await_shutter: F,
) -> Result<Option<EncodedImage>, CaptureError>
where
    D: CameraDevice,
    F: FnOnce(CameraPreview) -> Fut,
    Fut: Future<Output = ShutterAction>,
{
    let session = CameraSession::open(device).await?;

    match await_shutter(session.preview().clone()).await {
        ShutterAction::TakePhoto => session.take_photo().await.map(Some),
        ShutterAction::Cancel => {
            session.cancel();
            Ok(None)
        }
    }
}

/// A V4L-style device node plus an external capture command that writes one
/// encoded frame to stdout. `{device}` in the command template is replaced with
/// the device path.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    device: String,
    command_template: String,
}

impl CommandCamera {
    pub fn new(device: impl Into<String>, command_template: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            command_template: command_template.into(),
        }
    }

    fn command_args(&self) -> Result<Vec<String>, DeviceAccessError> {
        let words = shell_words::split(&self.command_template).map_err(|err| {
            DeviceAccessError::Unavailable {
                device: self.device.clone(),
                reason: format!("invalid capture command: {err}"),
            }
        })?;
        if words.is_empty() {
            return Err(DeviceAccessError::Unavailable {
                device: self.device.clone(),
                reason: "capture command is empty".to_string(),
            });
        }
        Ok(words
            .into_iter()
            .map(|word| word.replace("{device}", &self.device))
            .collect())
    }
}

/// Runs the capture command once and decodes its stdout. Every failure, including
/// an undecodable frame, is a device problem.
async fn grab_frame(device: &str, args: &[String]) -> Result<DynamicImage, DeviceAccessError> {
    let unavailable = |reason: String| DeviceAccessError::Unavailable {
        device: device.to_string(),
        reason,
    };
    let Some((program, rest)) = args.split_first() else {
        return Err(unavailable("capture command is empty".to_string()));
    };

    let output = Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|err| unavailable(format!("failed to run {program}: {err}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(device, status = %output.status, "Camera capture command failed");
        return Err(unavailable(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    image::load_from_memory(&output.stdout).map_err(|err| {
        warn!(device, bytes = output.stdout.len(), "Camera frame could not be decoded");
        unavailable(format!("unreadable frame: {err}"))
    })
}

impl CameraDevice for CommandCamera {
    type Stream = CommandCameraStream;

    async fn acquire(&self) -> Result<Self::Stream, DeviceAccessError> {
        let args = self.command_args()?;
        let handle = File::open(&self.device)
            .await
            .map_err(|err| DeviceAccessError::from_io(&self.device, err))?;
        // One probe frame gives the preview its native resolution.
        let probe = grab_frame(&self.device, &args).await?;
        Ok(CommandCameraStream {
            device: self.device.clone(),
            args,
            handle: Some(handle),
            resolution: Some((probe.width(), probe.height())),
        })
    }
}

pub struct CommandCameraStream {
    device: String,
    args: Vec<String>,
    handle: Option<File>,
    resolution: Option<(u32, u32)>,
}

impl CameraStream for CommandCameraStream {
    fn preview(&self) -> CameraPreview {
        CameraPreview {
            device: self.device.clone(),
            resolution: self.resolution,
        }
    }

    async fn snapshot(&mut self) -> Result<DynamicImage, CaptureError> {
        if self.handle.is_none() {
            return Err(DeviceAccessError::Unavailable {
                device: self.device.clone(),
                reason: "camera already released".to_string(),
            }
            .into());
        }
        let frame = grab_frame(&self.device, &self.args).await?;
        self.resolution = Some((frame.width(), frame.height()));
        Ok(frame)
    }

    fn release(&mut self) {
        self.handle.take();
    }
}
