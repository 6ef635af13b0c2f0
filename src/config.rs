use std::env;
use std::path::PathBuf;

use anyhow::Result;
use tracing::warn;

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_ASPECT_RATIO: &str = "3:4";
pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
pub const DEFAULT_CAMERA_CAPTURE_COMMAND: &str =
    "ffmpeg -loglevel error -f v4l2 -i {device} -frames:v 1 -f image2pipe -vcodec png -";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: PathBuf,
    pub gemini_api_key: String,
    pub gemini_image_model: String,
    pub gemini_api_base_url: String,
    pub request_timeout_seconds: u64,
    pub aspect_ratio: String,
    pub output_dir: PathBuf,
    pub camera_device: String,
    pub camera_capture_command: String,
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_non_empty(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_base_url(value: String) -> String {
    value.trim_end_matches('/').to_string()
}

fn normalize_aspect_ratio(value: String) -> String {
    let trimmed = value.trim();
    let valid = trimmed
        .split_once(':')
        .map(|(w, h)| {
            w.parse::<u32>().map(|w| w > 0).unwrap_or(false)
                && h.parse::<u32>().map(|h| h > 0).unwrap_or(false)
        })
        .unwrap_or(false);
    if valid {
        trimmed.to_string()
    } else {
        warn!(
            "Unknown PORTRAIT_ASPECT_RATIO value '{}'; defaulting to {}.",
            value, DEFAULT_ASPECT_RATIO
        );
        DEFAULT_ASPECT_RATIO.to_string()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: PathBuf::from(env_non_empty("LOG_DIR", "logs")),
            gemini_api_key: env_string("GEMINI_API_KEY", "").trim().to_string(),
            gemini_image_model: env_non_empty("GEMINI_IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
            gemini_api_base_url: normalize_base_url(env_non_empty(
                "GEMINI_API_BASE_URL",
                DEFAULT_API_BASE_URL,
            )),
            request_timeout_seconds: env_u64("GEMINI_REQUEST_TIMEOUT_SECONDS", 120).max(1),
            aspect_ratio: normalize_aspect_ratio(env_non_empty(
                "PORTRAIT_ASPECT_RATIO",
                DEFAULT_ASPECT_RATIO,
            )),
            output_dir: PathBuf::from(env_non_empty("OUTPUT_DIR", ".")),
            camera_device: env_non_empty("CAMERA_DEVICE", DEFAULT_CAMERA_DEVICE),
            camera_capture_command: env_non_empty(
                "CAMERA_CAPTURE_COMMAND",
                DEFAULT_CAMERA_CAPTURE_COMMAND,
            ),
        })
    }

    #[cfg(test)]
    pub fn for_api_key(api_key: &str) -> Self {
        Config {
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            gemini_api_key: api_key.to_string(),
            gemini_image_model: DEFAULT_IMAGE_MODEL.to_string(),
            gemini_api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_seconds: 120,
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            output_dir: PathBuf::from("."),
            camera_device: DEFAULT_CAMERA_DEVICE.to_string(),
            camera_capture_command: DEFAULT_CAMERA_CAPTURE_COMMAND.to_string(),
        }
    }
}
