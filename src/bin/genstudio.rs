//! CLI for GenStudio - prompt-driven image generation and editing.

use clap::{Args, Parser, Subcommand};
use genstudio::image::ImageBackend;
use genstudio::{
    ActionOutcome, GeminiBackend, ImageFormat, Operation, RawImage, ResultImage, Session, Studio,
    StudioClient,
};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genstudio")]
#[command(about = "Generate, edit, cut out and enhance images via the Gemini API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate four images from a text prompt
    Generate(GenerateArgs),

    /// Edit an image with a text prompt (four variants)
    Edit(EditArgs),

    /// Remove the background of an image
    RemoveBg(SourceArgs),

    /// Sharpen and relight an image
    Enhance(SourceArgs),

    /// Check that the API key and models are reachable
    Check,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the images
    prompt: String,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

#[derive(Args)]
struct EditArgs {
    /// The text prompt describing the edit
    prompt: String,

    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Args)]
struct SourceArgs {
    /// Source image (PNG, JPEG or WebP)
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // A missing API key is fatal before any action runs.
    let backend = GeminiBackend::builder().build()?;

    let (op, prompt, input, output) = match cli.command {
        Commands::Check => return check(&backend, cli.json).await,
        Commands::Generate(args) => (Operation::Generate, Some(args.prompt), None, args.output),
        Commands::Edit(args) => (
            Operation::Edit,
            Some(args.prompt),
            Some(args.source.input),
            args.source.output,
        ),
        Commands::RemoveBg(args) => (Operation::RemoveBackground, None, Some(args.input), args.output),
        Commands::Enhance(args) => (Operation::Enhance, None, Some(args.input), args.output),
    };

    let studio = Studio::new(StudioClient::new(backend));
    let mut session = Session::new();
    if let Some(prompt) = prompt {
        session.set_prompt(prompt);
    }
    let session = Mutex::new(session);
    if let Some(input) = input {
        studio.upload(&session, source_image(&input)?);
    }

    let outcome = studio.run(&session, op).await;
    let session = session.into_inner().unwrap_or_else(PoisonError::into_inner);
    if outcome != ActionOutcome::Completed {
        let message = session.error().unwrap_or("An unknown error occurred.");
        if cli.json {
            let result = serde_json::json!({
                "success": false,
                "operation": op,
                "error": message,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        anyhow::bail!("{message}");
    }

    let saved = save_results(&session, &output)?;

    if cli.json {
        let result = serde_json::json!({
            "success": true,
            "operation": op,
            "outputs": saved.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "session": session.snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for path in &saved {
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GENSTUDIO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Declares the media type from the extension, falling back to content sniffing.
fn source_image(path: &Path) -> anyhow::Result<RawImage> {
    let from_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ImageFormat::from_extension);
    let format = match from_ext {
        Some(format) => format,
        None => {
            let bytes = std::fs::read(path)?;
            ImageFormat::from_magic_bytes(&bytes).ok_or_else(|| {
                anyhow::anyhow!("{} is not a PNG, JPEG or WebP image", path.display())
            })?
        }
    };
    Ok(RawImage::file(path, format.mime_type()))
}

fn save_results(session: &Session, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut named: Vec<(String, &ResultImage)> = session
        .generated()
        .iter()
        .enumerate()
        .map(|(i, image)| (format!("generated-{}", i + 1), image))
        .collect();
    if let Some(image) = session.background_removed() {
        named.push(("background-removed".to_string(), image));
    }
    if let Some(image) = session.enhanced() {
        named.push(("enhanced".to_string(), image));
    }

    let mut saved = Vec::with_capacity(named.len());
    for (stem, image) in named {
        let ResultImage::Embedded { .. } = image else {
            println!("{stem}: {}", image.display_handle());
            continue;
        };
        let ext = image.format().unwrap_or_default().extension();
        let path = dir.join(format!("{stem}.{ext}"));
        image.save(&path)?;
        saved.push(path);
    }
    Ok(saved)
}

async fn check(backend: &GeminiBackend, json_output: bool) -> anyhow::Result<()> {
    backend.health_check().await?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "backend": backend.name(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}: OK", backend.name());
    }
    Ok(())
}
