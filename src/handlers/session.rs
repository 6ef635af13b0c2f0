use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

use crate::capture::{capture_from_camera, capture_from_file, CameraDevice, ShutterAction};
use crate::gallery::save_result;
use crate::generation::{GenerationClient, GenerationError, GenerationTransport};
use crate::handlers::commands::{
    help_text, parse_command, render_gallery, render_status, render_styles, CaptureSource,
    SessionCommand,
};
use crate::media::EncodedImage;
use crate::session::ImageSlot;
use crate::studio::{capture_notice, PortraitStudio, StudioError};
use crate::styles::{find_style, StyleDefinition};

type InputLines = Lines<BufReader<Stdin>>;

type GenerationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<EncodedImage, GenerationError>> + 'a>>;

struct PendingGeneration<'a> {
    style: &'static StyleDefinition,
    future: GenerationFuture<'a>,
}

async fn wait_for_pending(
    pending: &mut Option<PendingGeneration<'_>>,
) -> Result<EncodedImage, GenerationError> {
    match pending {
        Some(pending) => (&mut pending.future).await,
        None => std::future::pending().await,
    }
}

async fn prompt() {
    let mut stdout = tokio::io::stdout();
    let _ = stdout.write_all(b"portrait> ").await;
    let _ = stdout.flush().await;
}

/// Waits for the user to press Enter (shutter) or type `cancel`. End of input
/// counts as cancel so the device is never left open.
pub async fn read_shutter(lines: &mut InputLines) -> ShutterAction {
    match lines.next_line().await {
        Ok(Some(line)) if line.trim().eq_ignore_ascii_case("cancel") => ShutterAction::Cancel,
        Ok(Some(_)) => ShutterAction::TakePhoto,
        Ok(None) | Err(_) => ShutterAction::Cancel,
    }
}

pub async fn capture_with_camera<D: CameraDevice>(
    camera: &D,
    lines: &mut InputLines,
) -> Result<Option<EncodedImage>, crate::capture::CaptureError> {
    capture_from_camera(camera, |preview| async move {
        match preview.resolution {
            Some((w, h)) => println!("Camera {} is live ({w}x{h}).", preview.device),
            None => println!("Camera {} is live.", preview.device),
        }
        println!("Press Enter to take the photo, or type `cancel`.");
        read_shutter(lines).await
    })
    .await
}

async fn handle_capture<D: CameraDevice>(
    studio: &mut PortraitStudio,
    camera: &D,
    lines: &mut InputLines,
    slot: ImageSlot,
    source: CaptureSource,
) {
    let captured = match source {
        CaptureSource::File(path) => capture_from_file(&path).await.map(Some),
        CaptureSource::Camera => capture_with_camera(camera, lines).await,
    };

    match captured {
        Ok(Some(image)) => {
            let size = image
                .dimensions()
                .map(|(w, h)| format!(" ({w}x{h})"))
                .unwrap_or_default();
            studio.session_mut().set_image(slot, image);
            println!("Set {}{size}.", slot.label());
        }
        Ok(None) => println!("Camera closed, {} unchanged.", slot.label()),
        Err(err) => {
            warn!(slot = slot.label(), "Capture failed: {err}");
            println!("{}", capture_notice(&err));
        }
    }
}

async fn handle_save(
    studio: &PortraitStudio,
    default_dir: &Path,
    selector: &str,
    target: Option<PathBuf>,
) {
    let Some(result) = studio.gallery().lookup(selector) else {
        println!("No portrait matches `{selector}`. Run `gallery` to list them.");
        return;
    };
    match save_result(result, target.as_deref(), default_dir).await {
        Ok(path) => println!("Saved {}", path.display()),
        Err(err) => {
            warn!(id = %result.id, "Save failed: {err}");
            println!("Could not save the portrait: {err}");
        }
    }
}

/// Runs the interactive studio until `quit`, end of input or Ctrl-C. At most one
/// generation is in flight; other commands keep working while it runs.
pub async fn run_session<T, D>(
    client: &GenerationClient<T>,
    camera: &D,
    aspect_ratio: &str,
    output_dir: &Path,
) -> Result<()>
where
    T: GenerationTransport,
    D: CameraDevice,
{
    let mut studio = PortraitStudio::new(aspect_ratio);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Option<PendingGeneration<'_>> = None;

    println!("AI portrait studio ({}). Type `help` for commands.", client.model());
    info!("Interactive session started");

    loop {
        prompt().await;

        tokio::select! {
            outcome = wait_for_pending(&mut pending), if pending.is_some() => {
                let Some(finished) = pending.take() else { continue };
                println!();
                let finished = studio
                    .finish_generation(finished.style, outcome)
                    .map(|result| format!("{} ({})", result.style_name, result.id));
                match finished {
                    Ok(summary) => println!("Portrait ready: {summary}. Use `save 1` to keep it."),
                    Err(_) => {
                        if let Some(message) = studio.error() {
                            println!("! {message}");
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        warn!("Failed to read input: {err}");
                        break;
                    }
                };

                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };

                match command {
                    SessionCommand::Empty => {}
                    SessionCommand::Help => println!("{}", help_text()),
                    SessionCommand::Status => println!("{}", render_status(&studio)),
                    SessionCommand::Styles => {
                        println!("{}", render_styles(studio.session().selected_style_id()))
                    }
                    SessionCommand::SelectStyle(id) => {
                        match find_style(&id) {
                            Some(style) => println!("Style: {} ({})", style.display_name, style.id),
                            None => println!("Unknown style `{id}`; the first style will be used."),
                        }
                        studio.session_mut().set_selected_style_id(id);
                    }
                    SessionCommand::Custom(text) => {
                        if text.trim().is_empty() {
                            println!("Custom requests cleared.");
                        } else {
                            println!("Custom requests set.");
                        }
                        studio.session_mut().set_custom_text(text);
                    }
                    SessionCommand::Capture { slot, source } => {
                        handle_capture(&mut studio, camera, &mut lines, slot, source).await;
                    }
                    SessionCommand::Clear(slot) => {
                        if studio.session_mut().clear_image(slot) {
                            println!("Cleared {}.", slot.label());
                        } else {
                            println!("No {} to clear.", slot.label());
                        }
                    }
                    SessionCommand::Generate => match studio.begin_generation() {
                        Ok(prepared) => {
                            println!("Generating a {} portrait...", prepared.style.display_name);
                            let style = prepared.style;
                            let request = prepared.request;
                            pending = Some(PendingGeneration {
                                style,
                                future: Box::pin(async move { client.submit(&request).await }),
                            });
                        }
                        Err(StudioError::GenerationInProgress) => {
                            println!("A portrait is already being generated, please wait.");
                        }
                        Err(_) => {
                            if let Some(message) = studio.error() {
                                println!("! {message}");
                            }
                        }
                    },
                    SessionCommand::Gallery => println!("{}", render_gallery(studio.gallery())),
                    SessionCommand::Save { selector, target } => {
                        handle_save(&studio, output_dir, &selector, target).await;
                    }
                    SessionCommand::Quit => break,
                }
            }
        }
    }

    if pending.is_some() {
        warn!("Session ended while a generation was still in flight; the result is discarded");
    }
    info!(generated = studio.gallery().len(), "Interactive session ended");
    Ok(())
}
