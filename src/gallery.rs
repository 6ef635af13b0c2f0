use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use tracing::info;
use uuid::Uuid;

use crate::media::EncodedImage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedResult {
    pub id: String,
    pub image: EncodedImage,
    pub created_at: DateTime<Utc>,
    pub style_name: String,
}

impl GeneratedResult {
    /// `ai-portrait-<id>.png`, the name used when no explicit target is given.
    pub fn default_filename(&self) -> String {
        format!("ai-portrait-{}.{}", self.id, self.image.format().extension())
    }

    pub fn local_timestamp(&self) -> String {
        self.created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

/// Results of the current session, newest first. Entries are never removed.
#[derive(Debug, Default)]
pub struct ResultGallery {
    items: VecDeque<GeneratedResult>,
}

impl ResultGallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids are random v4 UUIDs (122 random bits), so a collision within a session
    /// is negligible.
    pub fn record(&mut self, image: EncodedImage, style_name: &str) -> &GeneratedResult {
        let result = GeneratedResult {
            id: Uuid::new_v4().simple().to_string(),
            image,
            created_at: Utc::now(),
            style_name: style_name.to_string(),
        };
        info!(id = %result.id, style = %result.style_name, "Recorded generated portrait");
        self.items.push_front(result);
        &self.items[0]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedResult> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&GeneratedResult> {
        self.items.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&GeneratedResult> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Looks an entry up by 1-based position as listed, or by id.
    pub fn lookup(&self, selector: &str) -> Option<&GeneratedResult> {
        let selector = selector.trim();
        match selector.parse::<usize>() {
            Ok(position) if position >= 1 => self.get(position - 1),
            _ => self.find(selector),
        }
    }
}

fn names_a_directory(target: &Path) -> bool {
    target
        .to_str()
        .and_then(|text| text.chars().last())
        .is_some_and(std::path::is_separator)
}

/// Writes the image under `dir` as `ai-portrait-<id>.<ext>`, creating `dir` first.
async fn save_into_dir(result: &GeneratedResult, dir: &Path) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(result.default_filename());
    write_image(result, &path).await?;
    Ok(path)
}

/// Saves to an explicit `target` when given, otherwise into `default_dir`. A target
/// that is an existing directory or ends with a path separator receives the default
/// filename; anything else is the exact file to write.
pub async fn save_result(
    result: &GeneratedResult,
    target: Option<&Path>,
    default_dir: &Path,
) -> io::Result<PathBuf> {
    let Some(target) = target else {
        return save_into_dir(result, default_dir).await;
    };

    let is_dir = tokio::fs::metadata(target)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if is_dir || names_a_directory(target) {
        return save_into_dir(result, target).await;
    }

    if let Some(parent) = target.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    write_image(result, target).await?;
    Ok(target.to_path_buf())
}

async fn write_image(result: &GeneratedResult, path: &Path) -> io::Result<()> {
    tokio::fs::write(path, result.image.bytes()).await?;
    info!(id = %result.id, path = %path.display(), "Saved portrait");
    Ok(())
}
