use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fogmap::data::raster::encode_data_url;
use fogmap::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "fogmap", about = "Create and edit fog-of-war scene files")]
struct Cli {
    /// Session config file (JSON); missing fields use the profile defaults
    #[arg(long, env = "FOGMAP_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Profile::Persistent)]
    profile: Profile,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Profile {
    Classic,
    Persistent,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a fully fogged scene around a map image
    New {
        map: PathBuf,
        out: PathBuf,
        /// Token image to place at the map center (repeatable)
        #[arg(long = "token", value_name = "IMAGE")]
        tokens: Vec<PathBuf>,
    },
    /// Print a summary of a scene file
    Inspect { scene: PathBuf },
    /// Reveal a circle of fog and write the scene back
    Reveal {
        scene: PathBuf,
        x: f64,
        y: f64,
        radius: f64,
        /// Write here instead of overwriting the input
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a scene into a store directory, one file per slot
    Save { scene: PathBuf, dir: PathBuf },
    /// Export the scene persisted in a store directory
    Restore { dir: PathBuf, out: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    fogmap::logging::init();
    let cli = Cli::parse();
    let loader = ImageAssetLoader::new();

    match &cli.command {
        Command::New { map, out, tokens } => {
            let mut session = new_session(&cli)?;
            let src = embed_file(map)?;
            session.load_map(&src, &loader).await?;
            for token in tokens {
                let name = token
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                session.create_token_from_file(embed_file(token)?, &name, None);
            }
            write_scene(&session, out)?;
            println!(
                "wrote {} ({} token(s))",
                out.display(),
                session.tokens().len()
            );
        }
        Command::Inspect { scene } => {
            let json = read_scene(scene)?;
            let parsed = SceneFile::from_json(&json)?;
            let mut session = new_session(&cli)?;
            session.import_json(&json, &loader).await?;
            print_summary(&parsed, &session);
        }
        Command::Reveal {
            scene,
            x,
            y,
            radius,
            out,
        } => {
            if !(*radius > 0.0) {
                bail!("radius must be positive, got {}", radius);
            }
            let mut session = new_session(&cli)?;
            session.import_json(&read_scene(scene)?, &loader).await?;
            session.reveal(Point::new(*x, *y), *radius);
            let target = out.as_deref().unwrap_or(scene.as_path());
            write_scene(&session, target)?;
            println!(
                "revealed r={} at ({}, {}); {:.1}% of the map is visible",
                radius,
                x,
                y,
                revealed_percent(session.fog_buffer())
            );
        }
        Command::Save { scene, dir } => {
            let mut session = new_session(&cli)?;
            session.import_json(&read_scene(scene)?, &loader).await?;
            let store = FileStore::new(dir);
            let written = session.save_to(&store).await?;
            println!("saved {} slot(s) to {}", written, dir.display());
        }
        Command::Restore { dir, out } => {
            let mut session = new_session(&cli)?;
            let store = FileStore::new(dir);
            if session.restore_from_store(&store, &loader).await?.is_none() {
                bail!("no scene stored in {}", dir.display());
            }
            write_scene(&session, out)?;
            println!("restored {} token(s) into {}", session.tokens().len(), out.display());
        }
    }
    Ok(())
}

fn new_session(cli: &Cli) -> Result<Session> {
    let config = match &cli.config {
        Some(path) => {
            log::info!("using session config {}", path.display());
            SessionConfig::load(path)
                .with_context(|| format!("load config {}", path.display()))?
        }
        None => match cli.profile {
            Profile::Classic => ConfigProfile::Classic.resolve(),
            Profile::Persistent => ConfigProfile::Persistent.resolve(),
        },
    };
    Ok(Session::new(config))
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Inline an image file as a data URL so the scene is self-contained
fn embed_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(encode_data_url(mime_for(path), &bytes))
}

fn read_scene(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read scene {}", path.display()))
}

fn write_scene(session: &Session, path: &Path) -> Result<()> {
    let json = session.export_json()?;
    std::fs::write(path, json).with_context(|| format!("write scene {}", path.display()))
}

fn revealed_percent(fog: &FogBuffer) -> f64 {
    let (width, height) = fog.dimensions();
    let total = u64::from(width) * u64::from(height);
    if total == 0 {
        return 0.0;
    }
    fog.revealed_pixel_count() as f64 * 100.0 / total as f64
}

fn print_summary(scene: &SceneFile, session: &Session) {
    println!("version: {}", scene.version);
    if let Some(map) = session.map() {
        println!("map: {}x{}", map.width, map.height);
    }
    println!("fog: {:.1}% revealed", revealed_percent(session.fog_buffer()));
    let view = session.view_state();
    println!(
        "view: scale {:.3}, pan ({:.1}, {:.1})",
        view.scale, view.pan_x, view.pan_y
    );
    println!("tokens: {}", session.tokens().len());
    for token in session.tokens().tokens() {
        println!(
            "  {:<20} ({:.1}, {:.1}) d={} color={}",
            token.label,
            token.position.x,
            token.position.y,
            token.diameter,
            session
                .tokens()
                .palette_color(token.color_index)
                .unwrap_or("?")
        );
    }
}
