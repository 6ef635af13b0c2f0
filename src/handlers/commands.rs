use std::fmt::Write as _;
use std::path::PathBuf;

use crate::gallery::ResultGallery;
use crate::session::ImageSlot;
use crate::studio::PortraitStudio;
use crate::styles::{find_style, STYLE_CATALOG};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    File(PathBuf),
    Camera,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Help,
    Status,
    Styles,
    SelectStyle(String),
    Custom(String),
    Capture { slot: ImageSlot, source: CaptureSource },
    Clear(ImageSlot),
    Generate,
    Gallery,
    Save { selector: String, target: Option<PathBuf> },
    Quit,
    Empty,
}

pub fn help_text() -> &'static str {
    "Commands:
  face <path> | face camera     set your face photo (required)
  ref <path> | ref camera       set an optional style reference photo
  clear face | clear ref        remove a photo
  styles                        list portrait styles
  style <id>                    choose a style
  custom <text>                 extra requests (hairstyle, glasses, ...); `custom` alone clears
  generate                      create a portrait
  gallery                       list generated portraits, newest first
  save <n|id> [path]            save a portrait (default: ai-portrait-<id>.png)
  status                        show the current inputs
  help                          show this message
  quit                          leave the studio"
}

fn parse_slot(word: &str) -> Option<ImageSlot> {
    match word.to_ascii_lowercase().as_str() {
        "face" => Some(ImageSlot::Face),
        "ref" | "reference" => Some(ImageSlot::Reference),
        _ => None,
    }
}

pub fn parse_command(line: &str) -> Result<SessionCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(SessionCommand::Empty);
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let head = head.trim_start_matches('/').to_ascii_lowercase();

    let command = match head.as_str() {
        "help" | "?" => SessionCommand::Help,
        "status" => SessionCommand::Status,
        "styles" => SessionCommand::Styles,
        "style" => {
            if rest.is_empty() {
                return Err("Usage: style <id> (see `styles`)".to_string());
            }
            SessionCommand::SelectStyle(rest.to_string())
        }
        "custom" => SessionCommand::Custom(rest.to_string()),
        "face" | "ref" | "reference" => {
            let slot = parse_slot(&head).ok_or_else(|| format!("Unknown slot: {head}"))?;
            let source = match rest {
                "" => return Err(format!("Usage: {head} <path> | {head} camera")),
                "camera" | "cam" => CaptureSource::Camera,
                path => CaptureSource::File(PathBuf::from(path)),
            };
            SessionCommand::Capture { slot, source }
        }
        "clear" => {
            let slot =
                parse_slot(rest).ok_or_else(|| "Usage: clear face | clear ref".to_string())?;
            SessionCommand::Clear(slot)
        }
        "generate" | "gen" => SessionCommand::Generate,
        "gallery" | "results" => SessionCommand::Gallery,
        "save" => {
            let (selector, target) = match rest.split_once(char::is_whitespace) {
                Some((selector, target)) => (selector, Some(PathBuf::from(target.trim()))),
                None => (rest, None),
            };
            if selector.is_empty() {
                return Err("Usage: save <n|id> [path]".to_string());
            }
            SessionCommand::Save {
                selector: selector.to_string(),
                target,
            }
        }
        "quit" | "exit" | "q" => SessionCommand::Quit,
        other => return Err(format!("Unknown command: {other}. Type `help` for commands.")),
    };

    Ok(command)
}

fn describe_slot(studio: &PortraitStudio, slot: ImageSlot) -> String {
    match studio.session().image(slot) {
        Some(image) => match image.dimensions() {
            Some((w, h)) => format!("{w}x{h} {}", image.mime_type()),
            None => image.mime_type().to_string(),
        },
        None => "not set".to_string(),
    }
}

pub fn render_status(studio: &PortraitStudio) -> String {
    let session = studio.session();
    let mut out = String::new();
    let selected = find_style(session.selected_style_id());
    let style_line = match selected {
        Some(style) => format!("{} ({})", style.display_name, style.id),
        None => format!(
            "{} (unknown, {} will be used)",
            session.selected_style_id(),
            STYLE_CATALOG[0].id
        ),
    };
    let custom = if session.custom_text().trim().is_empty() {
        "none"
    } else {
        session.custom_text()
    };
    let submit = if studio.is_generating() {
        "generating..."
    } else if studio.can_submit() {
        "ready"
    } else {
        "needs a face photo"
    };

    let _ = writeln!(out, "Face photo:      {}", describe_slot(studio, ImageSlot::Face));
    let _ = writeln!(out, "Reference photo: {}", describe_slot(studio, ImageSlot::Reference));
    let _ = writeln!(out, "Style:           {style_line}");
    let _ = writeln!(out, "Custom requests: {custom}");
    let _ = write!(out, "Generate:        {submit}");
    if let Some(error) = studio.error() {
        let _ = write!(out, "\n! {error}");
    }
    out
}

pub fn render_styles(selected_id: &str) -> String {
    let mut out = String::new();
    for style in STYLE_CATALOG.iter() {
        let marker = if style.id == selected_id { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "{marker} {:<11} {}  {}",
            style.id, style.display_name, style.short_description
        );
    }
    out.trim_end().to_string()
}

pub fn render_gallery(gallery: &ResultGallery) -> String {
    if gallery.is_empty() {
        return "No portraits yet. Add a face photo, pick a style and run `generate`.".to_string();
    }
    let mut out = format!("{} generated", gallery.len());
    for (index, item) in gallery.iter().enumerate() {
        let _ = write!(
            out,
            "\n{:>3}. {}  {}  {}",
            index + 1,
            item.style_name,
            item.local_timestamp(),
            item.id
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::fixtures;

    #[test]
    fn parses_capture_commands() {
        assert_eq!(
            parse_command("face ~/me.png").expect("parse"),
            SessionCommand::Capture {
                slot: ImageSlot::Face,
                source: CaptureSource::File(PathBuf::from("~/me.png")),
            }
        );
        assert_eq!(
            parse_command("REF camera").expect("parse"),
            SessionCommand::Capture {
                slot: ImageSlot::Reference,
                source: CaptureSource::Camera,
            }
        );
        assert!(parse_command("face").is_err());
    }

    #[test]
    fn keeps_custom_text_verbatim() {
        assert_eq!(
            parse_command("custom  big wavy curls,  black glasses ").expect("parse"),
            SessionCommand::Custom("big wavy curls,  black glasses".to_string())
        );
        assert_eq!(
            parse_command("custom").expect("parse"),
            SessionCommand::Custom(String::new())
        );
    }

    #[test]
    fn parses_save_with_and_without_target() {
        assert_eq!(
            parse_command("save 1").expect("parse"),
            SessionCommand::Save {
                selector: "1".to_string(),
                target: None
            }
        );
        assert_eq!(
            parse_command("save abc out/me.png").expect("parse"),
            SessionCommand::Save {
                selector: "abc".to_string(),
                target: Some(PathBuf::from("out/me.png"))
            }
        );
        assert!(parse_command("save").is_err());
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(parse_command("paint me").is_err());
        assert!(parse_command("clear everything").is_err());
        assert_eq!(parse_command("   ").expect("parse"), SessionCommand::Empty);
    }

    #[test]
    fn status_reflects_gating_and_unknown_style() {
        let mut studio = PortraitStudio::new("3:4");
        studio.session_mut().set_selected_style_id("noir");
        let status = render_status(&studio);
        assert!(status.contains("needs a face photo"));
        assert!(status.contains("noir (unknown, business will be used)"));

        studio.session_mut().set_face_image(fixtures::png(4, 5, 1));
        let status = render_status(&studio);
        assert!(status.contains("4x5 image/png"));
        assert!(status.contains("ready"));
    }

    #[test]
    fn styles_listing_marks_selection() {
        let listing = render_styles("vogue");
        assert_eq!(listing.lines().count(), STYLE_CATALOG.len());
        assert!(listing.lines().any(|line| line.starts_with("* vogue")));
        assert!(listing.lines().any(|line| line.starts_with("  business")));
    }

    #[test]
    fn gallery_listing_counts_results() {
        let mut gallery = ResultGallery::new();
        assert!(render_gallery(&gallery).starts_with("No portraits"));
        gallery.record(fixtures::png(2, 2, 1), "赛博未来");
        let listing = render_gallery(&gallery);
        assert!(listing.starts_with("1 generated"));
        assert!(listing.contains("  1. 赛博未来"));
    }
}
