use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

mod capture;
mod config;
mod gallery;
mod generation;
mod handlers;
mod media;
mod session;
mod studio;
mod styles;
mod utils;

use capture::{capture_from_file, CameraDevice, CommandCamera};
use config::Config;
use gallery::save_result;
use generation::{GeminiTransport, GenerationClient, GenerationTransport};
use handlers::commands::render_styles;
use handlers::session::{capture_with_camera, run_session};
use session::ImageSlot;
use studio::{capture_notice, PortraitStudio, GENERATION_FAILED_MESSAGE};
use styles::default_style;
use utils::http::build_http_client;
use utils::logging::init_logging;

#[derive(Parser)]
#[command(name = "portrait-studio", version, about = "AI portrait studio backed by Gemini")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the interactive studio (the default).
    Session,
    /// List the portrait styles.
    Styles,
    /// Generate a single portrait and save it.
    Generate(GenerateArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Face photo to portray.
    #[arg(long, conflicts_with = "camera")]
    face: Option<PathBuf>,
    /// Take the face photo with the camera instead.
    #[arg(long)]
    camera: bool,
    /// Style id, see `styles`.
    #[arg(long, default_value = "business")]
    style: String,
    /// Optional style reference photo.
    #[arg(long)]
    reference: Option<PathBuf>,
    /// Extra requests such as hairstyle or accessories.
    #[arg(long, default_value = "")]
    custom: String,
    /// File or directory to write the portrait to.
    #[arg(long)]
    output: Option<PathBuf>,
}

async fn load_image(
    studio: &mut PortraitStudio,
    slot: ImageSlot,
    path: &Path,
) -> anyhow::Result<()> {
    let image = capture_from_file(path).await.map_err(|err| {
        warn!(slot = slot.label(), "Capture failed: {err}");
        anyhow!("{}: {}", capture_notice(&err), path.display())
    })?;
    studio.session_mut().set_image(slot, image);
    Ok(())
}

async fn run_generate<T, D>(
    args: GenerateArgs,
    config: &Config,
    client: &GenerationClient<T>,
    camera: &D,
) -> anyhow::Result<()>
where
    T: GenerationTransport,
    D: CameraDevice,
{
    let mut studio = PortraitStudio::new(config.aspect_ratio.as_str());

    if let Some(path) = &args.face {
        load_image(&mut studio, ImageSlot::Face, path).await?;
    } else if args.camera {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        match capture_with_camera(camera, &mut lines).await {
            Ok(Some(image)) => studio.session_mut().set_face_image(image),
            Ok(None) => return Err(anyhow!("camera capture cancelled")),
            Err(err) => {
                warn!("Camera capture failed: {err}");
                return Err(anyhow!(capture_notice(&err)));
            }
        }
    }
    if let Some(path) = &args.reference {
        load_image(&mut studio, ImageSlot::Reference, path).await?;
    }
    studio.session_mut().set_selected_style_id(args.style);
    studio.session_mut().set_custom_text(args.custom);

    let outcome = studio.generate(client).await.map(|result| result.clone());
    let result = match outcome {
        Ok(result) => result,
        Err(_) => {
            let message = studio.error().unwrap_or(GENERATION_FAILED_MESSAGE);
            return Err(anyhow!(message));
        }
    };

    let target = args.output.as_deref();
    let path = save_result(&result, target, &config.output_dir)
        .await
        .with_context(|| {
            let shown = target.unwrap_or(config.output_dir.as_path());
            format!("failed to save portrait to {}", shown.display())
        })?;
    println!("{} portrait saved to {}", result.style_name, path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let config = Arc::new(Config::load()?);
    let _guards = init_logging(&config.log_level, &config.log_dir);

    if config.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY is not set; portrait generation will fail until it is configured.");
    }

    let http = build_http_client(config.request_timeout_seconds)?;
    let client = GenerationClient::new(GeminiTransport::new(http, config.clone()));
    let camera = CommandCamera::new(&config.camera_device, &config.camera_capture_command);
    info!(model = client.model(), "Starting portrait studio");

    match cli.command.unwrap_or(Command::Session) {
        Command::Session => {
            run_session(&client, &camera, &config.aspect_ratio, &config.output_dir).await
        }
        Command::Styles => {
            println!("{}", render_styles(default_style().id));
            Ok(())
        }
        Command::Generate(args) => run_generate(args, &config, &client, &camera).await,
    }
}
