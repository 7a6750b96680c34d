//! ReelForge CLI
//!
//! Headless driver for the ReelForge studio core. Operates on a project
//! file on disk: configure the story, register reference assets, plan the
//! script, render frames and clips, and score the result, all without the
//! desktop shell. The project file is rewritten after every mutating step,
//! so partial progress survives a failed or cancelled run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use reelforge_core::core::continuity::StyleCategory;
use reelforge_core::core::fs::atomic_write_bytes;
use reelforge_core::core::gateway::{MusicRequest, VIDEO_MODELS};
use reelforge_core::core::project::catalog::{
    GENRE_CATEGORIES, STYLE_ART, STYLE_DIRECTORS, STYLE_WORKS,
};
use reelforge_core::core::project::{
    load_project, save_project, AssetKind, AudioTrack, Project, ProjectSettings, ReferenceAsset,
    Scene, SceneKind, VideoStatus,
};
use reelforge_core::core::script::InspireKind;
use reelforge_core::core::settings::SettingsManager;
use reelforge_core::core::studio::{AnchorKind, CancelToken, StudioEngine};
use reelforge_core::core::{
    AspectRatio, ImageData, SceneId, ShotId, DIALOGUE_LANGUAGES, LYRIC_LANGUAGES,
};
use reelforge_core::CoreError;

// =============================================================================
// Command line surface
// =============================================================================

#[derive(Parser)]
#[command(
    name = "reelforge",
    version,
    about = "Headless driver for the ReelForge studio core"
)]
struct Cli {
    /// Project file to operate on.
    #[arg(short, long, global = true, default_value = "project.json")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project file with default settings.
    New(NewArgs),
    /// Change the project's story settings.
    Config(ConfigArgs),
    /// List the built-in genre and style presets.
    Catalog(CatalogArgs),
    /// Ask the model for candidate values for a setup picker.
    Inspire(InspireArgs),
    /// Generate a story premise from the current settings.
    Premise,
    /// Let the model pick genre, style, and premise in one shot.
    Recommend,
    /// Manage reference assets (cast, props, locations).
    Asset {
        #[command(subcommand)]
        command: AssetCommands,
    },
    /// Plan the script: story bible, scenes, and shot lists.
    Plan,
    /// Print a summary of the project.
    Status(StatusArgs),
    /// Render continuity anchors and shot images.
    Visualize(VisualizeArgs),
    /// Regenerate a single continuity anchor for a scene.
    Anchor(AnchorArgs),
    /// Discard a scene's renders and generate a fresh set.
    Reshoot(SceneArgs),
    /// Rewrite a scene's script while keeping rendered frames.
    Rewrite(SceneArgs),
    /// Insert a bridging shot after an existing shot.
    InsertShot(InsertShotArgs),
    /// Remove a shot from a scene.
    RemoveShot(ShotArgs),
    /// Insert a bridging scene after an existing scene.
    InsertScene(InsertSceneArgs),
    /// Derive a shot's closing frame from its rendered image.
    LastFrame(ShotArgs),
    /// Generate video clips for a shot or a whole scene.
    Video(VideoArgs),
    /// Generate the project's theme song.
    Music(MusicArgs),
    /// Write rendered frames and the script to a directory.
    Export(ExportArgs),
    /// Show or change studio settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Args)]
struct NewArgs {
    /// Overwrite an existing project file.
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct ConfigArgs {
    /// Genre label (see `reelforge catalog genres`).
    #[arg(long)]
    genre: Option<String>,

    /// Director style label.
    #[arg(long)]
    director: Option<String>,

    /// Art style label.
    #[arg(long)]
    art: Option<String>,

    /// Reference work label.
    #[arg(long)]
    work: Option<String>,

    /// Free form style notes appended to the preset styles.
    #[arg(long)]
    custom_style: Option<String>,

    /// Dialogue language code: zh-CN, en-US, ja-JP, or ko-KR.
    #[arg(long)]
    language: Option<String>,

    /// Story scene count. 0 lets the planner decide.
    #[arg(long)]
    pages: Option<u32>,

    /// Frame aspect ratio: 16:9, 9:16, or 1:1.
    #[arg(long)]
    aspect: Option<String>,

    /// Story premise.
    #[arg(long)]
    premise: Option<String>,
}

#[derive(Args)]
struct CatalogArgs {
    /// Which list: genres, directors, art, works, or languages.
    list: String,
}

#[derive(Args)]
struct InspireArgs {
    /// Setup picker to fill: genre, director, art, or work.
    picker: String,
}

#[derive(Subcommand)]
enum AssetCommands {
    /// Register an image file as a reference asset.
    Add {
        /// Asset slot: hero, support, item, or location.
        kind: String,
        /// Display name, e.g. the character's name.
        name: String,
        /// Image file (png, jpg, webp, or gif).
        file: PathBuf,
    },
    /// List registered assets.
    List,
    /// Remove an asset by id.
    Remove { kind: String, id: String },
    /// Rename an asset.
    Rename { kind: String, id: String, name: String },
}

#[derive(Args)]
struct StatusArgs {
    /// Print the summary as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct VisualizeArgs {
    /// Scene number (1-based, as shown by `status`). Omit to render every
    /// scene that is not yet visualized.
    scene: Option<usize>,
}

#[derive(Args)]
struct AnchorArgs {
    /// Scene number.
    scene: usize,

    /// Which anchor: costume or environment.
    kind: String,
}

#[derive(Args)]
struct SceneArgs {
    /// Scene number.
    scene: usize,
}

#[derive(Args)]
struct InsertShotArgs {
    /// Scene number.
    scene: usize,

    /// Insert after this shot number.
    after: usize,
}

#[derive(Args)]
struct ShotArgs {
    /// Scene number.
    scene: usize,

    /// Shot number (1-based).
    shot: usize,
}

#[derive(Args)]
struct InsertSceneArgs {
    /// Insert after this scene number.
    after: usize,
}

#[derive(Args)]
struct VideoArgs {
    /// Scene number.
    scene: usize,

    /// Shot number. Omit to animate every rendered shot in the scene.
    shot: Option<usize>,

    /// Directory for downloaded clips.
    #[arg(long, default_value = "media")]
    out: PathBuf,
}

#[derive(Args)]
struct MusicArgs {
    /// Lyric language code (zh, en, ja, ko, es, fr, de).
    #[arg(long, default_value = "zh")]
    language: String,

    /// Song title. Skips the concept step when given with --tags.
    #[arg(long)]
    title: Option<String>,

    /// Style tags (genre, mood, instruments, tempo).
    #[arg(long)]
    tags: Option<String>,

    /// Full lyrics. Leave out for an instrumental.
    #[arg(long)]
    lyrics: Option<String>,

    /// Print the concept without submitting the render.
    #[arg(long)]
    concept_only: bool,
}

#[derive(Args)]
struct ExportArgs {
    /// Output directory.
    #[arg(default_value = "export")]
    out: PathBuf,
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Print the current settings.
    Show,
    /// Change relay credentials and generation pacing.
    Set(SettingsSetArgs),
    /// List the available video models.
    Models,
    /// Restore the default settings.
    Reset,
    /// Print the settings file location.
    Path,
}

#[derive(Args)]
struct SettingsSetArgs {
    /// Shared relay key used by every lane unless overridden. Pass an
    /// empty string to clear.
    #[arg(long)]
    api_key: Option<String>,

    /// Text lane override (script planning and music ride this lane).
    #[arg(long)]
    text_key: Option<String>,

    /// Image lane override.
    #[arg(long)]
    image_key: Option<String>,

    /// Video lane override.
    #[arg(long)]
    video_key: Option<String>,

    /// Relay base URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Music relay base URL.
    #[arg(long)]
    music_base_url: Option<String>,

    /// Video model id (see `reelforge settings models`).
    #[arg(long)]
    video_model: Option<String>,

    /// Shots rendered concurrently per batch.
    #[arg(long)]
    batch_size: Option<u32>,

    /// Pause between shot batches in milliseconds.
    #[arg(long)]
    batch_pause_ms: Option<u64>,

    /// Video job poll interval in milliseconds.
    #[arg(long)]
    video_poll_interval_ms: Option<u64>,

    /// Retry attempts for transient relay failures.
    #[arg(long)]
    max_retries: Option<u32>,
}

// =============================================================================
// Entry point
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let Cli { project, command } = Cli::parse();

    match command {
        Commands::New(args) => cmd_new(&project, args),
        Commands::Config(args) => cmd_config(&project, args),
        Commands::Catalog(args) => cmd_catalog(args),
        Commands::Inspire(args) => cmd_inspire(&project, args).await,
        Commands::Premise => cmd_premise(&project).await,
        Commands::Recommend => cmd_recommend(&project).await,
        Commands::Asset { command } => cmd_asset(&project, command),
        Commands::Plan => cmd_plan(&project).await,
        Commands::Status(args) => cmd_status(&project, args),
        Commands::Visualize(args) => cmd_visualize(&project, args).await,
        Commands::Anchor(args) => cmd_anchor(&project, args).await,
        Commands::Reshoot(args) => cmd_reshoot(&project, args).await,
        Commands::Rewrite(args) => cmd_rewrite(&project, args).await,
        Commands::InsertShot(args) => cmd_insert_shot(&project, args).await,
        Commands::RemoveShot(args) => cmd_remove_shot(&project, args),
        Commands::InsertScene(args) => cmd_insert_scene(&project, args).await,
        Commands::LastFrame(args) => cmd_last_frame(&project, args).await,
        Commands::Video(args) => cmd_video(&project, args).await,
        Commands::Music(args) => cmd_music(&project, args).await,
        Commands::Export(args) => cmd_export(&project, args),
        Commands::Settings { command } => cmd_settings(command),
    }
}

// =============================================================================
// Shared plumbing
// =============================================================================

/// Builds the studio engine from the saved settings.
fn studio() -> Result<StudioEngine> {
    let manager = SettingsManager::at_default_location()?;
    let settings = manager.load();
    let gateway = settings.gateway.build_gateway().context(
        "relay gateway is not configured; set a key with `reelforge settings set --api-key <key>`",
    )?;
    Ok(StudioEngine::from_settings(Arc::new(gateway), &settings))
}

fn open_project(path: &Path) -> Result<Project> {
    load_project(path).with_context(|| format!("failed to load project {}", path.display()))
}

fn persist(project: &Project, path: &Path) -> Result<()> {
    save_project(project, path)
        .with_context(|| format!("failed to save project {}", path.display()))
}

/// Resolves a 1-based scene number (project order, as printed by `status`)
/// to the scene's id.
fn scene_id_at(project: &Project, number: usize) -> Result<SceneId> {
    if number == 0 {
        bail!("scene numbers start at 1");
    }
    project
        .scenes
        .get(number - 1)
        .map(|scene| scene.id.clone())
        .ok_or_else(|| {
            anyhow!(
                "project has {} scene(s), no scene {}",
                project.scenes.len(),
                number
            )
        })
}

fn shot_id_at(scene: &Scene, number: usize) -> Result<ShotId> {
    if number == 0 {
        bail!("shot numbers start at 1");
    }
    scene
        .shots
        .get(number - 1)
        .map(|shot| shot.id.clone())
        .ok_or_else(|| anyhow!("scene has {} shot(s), no shot {}", scene.shots.len(), number))
}

fn scene_label(scene: &Scene) -> String {
    match scene.kind {
        SceneKind::Cover => "cover".to_string(),
        SceneKind::BackCover => "back cover".to_string(),
        SceneKind::Story => match scene.scene_index {
            Some(index) => format!("scene {index}"),
            None => "bridge scene".to_string(),
        },
    }
}

fn parse_asset_kind(label: &str) -> Result<AssetKind> {
    match label {
        "hero" => Ok(AssetKind::Hero),
        "support" => Ok(AssetKind::Support),
        "item" => Ok(AssetKind::Item),
        "location" | "loc" => Ok(AssetKind::Location),
        other => bail!("unknown asset kind '{other}' (expected hero, support, item, or location)"),
    }
}

fn parse_anchor_kind(label: &str) -> Result<AnchorKind> {
    match label {
        "costume" => Ok(AnchorKind::Costume),
        "environment" => Ok(AnchorKind::Environment),
        other => bail!("unknown anchor '{other}' (expected costume or environment)"),
    }
}

fn parse_inspire_kind(label: &str) -> Result<InspireKind> {
    match label {
        "genre" => Ok(InspireKind::Genre),
        "director" => Ok(InspireKind::Director),
        "art" => Ok(InspireKind::Art),
        "work" => Ok(InspireKind::Work),
        other => bail!("unknown picker '{other}' (expected genre, director, art, or work)"),
    }
}

fn parse_aspect(label: &str) -> Result<AspectRatio> {
    match label {
        "16:9" => Ok(AspectRatio::Widescreen),
        "9:16" => Ok(AspectRatio::Vertical),
        "1:1" => Ok(AspectRatio::Square),
        other => bail!("unknown aspect ratio '{other}' (expected 16:9, 9:16, or 1:1)"),
    }
}

fn image_mime_for(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        _ => bail!(
            "cannot tell the image type of {} (expected png, jpg, webp, or gif)",
            path.display()
        ),
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        mime if mime.starts_with("video/") => "mp4",
        _ => "png",
    }
}

fn optional(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn key_state(key: &Option<String>) -> &'static str {
    match key.as_deref() {
        Some(key) if !key.trim().is_empty() => "set",
        _ => "-",
    }
}

// =============================================================================
// Setup commands
// =============================================================================

fn cmd_new(path: &Path, args: NewArgs) -> Result<()> {
    if path.exists() && !args.force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    let project = Project::new(ProjectSettings::default());
    persist(&project, path)?;
    println!("created {}", path.display());
    println!("next: `reelforge config --premise ...`, then `reelforge plan`");
    Ok(())
}

fn cmd_config(path: &Path, args: ConfigArgs) -> Result<()> {
    let mut project = open_project(path)?;
    let settings = &mut project.settings;

    if let Some(language) = args.language {
        if !DIALOGUE_LANGUAGES.iter().any(|(code, _)| *code == language) {
            let codes: Vec<&str> = DIALOGUE_LANGUAGES.iter().map(|(code, _)| *code).collect();
            bail!(
                "unknown language '{}' (expected one of {})",
                language,
                codes.join(", ")
            );
        }
        settings.language = language;
    }
    if let Some(aspect) = args.aspect {
        settings.aspect_ratio = parse_aspect(&aspect)?;
    }
    if let Some(genre) = args.genre {
        settings.genre = genre;
    }
    if let Some(director) = args.director {
        settings.style_director = director;
    }
    if let Some(art) = args.art {
        settings.style_art = art;
    }
    if let Some(work) = args.work {
        settings.style_reference = work;
    }
    if let Some(custom) = args.custom_style {
        settings.custom_style = custom;
    }
    if let Some(pages) = args.pages {
        settings.page_count = pages;
    }
    if let Some(premise) = args.premise {
        settings.premise = premise;
    }

    persist(&project, path)?;
    println!("updated {}", path.display());
    Ok(())
}

fn cmd_catalog(args: CatalogArgs) -> Result<()> {
    match args.list.as_str() {
        "genres" => {
            for (category, genres) in GENRE_CATEGORIES {
                println!("{category}");
                for genre in *genres {
                    println!("  {genre}");
                }
            }
        }
        "directors" => {
            for entry in STYLE_DIRECTORS {
                println!("{entry}");
            }
        }
        "art" => {
            for entry in STYLE_ART {
                println!("{entry}");
            }
        }
        "works" => {
            for entry in STYLE_WORKS {
                println!("{entry}");
            }
        }
        "languages" => {
            println!("dialogue:");
            for (code, name) in DIALOGUE_LANGUAGES {
                println!("  {code}  {name}");
            }
            println!("lyrics:");
            for (code, name) in LYRIC_LANGUAGES {
                println!("  {code}  {name}");
            }
        }
        other => bail!(
            "unknown list '{other}' (expected genres, directors, art, works, or languages)"
        ),
    }
    Ok(())
}

async fn cmd_inspire(path: &Path, args: InspireArgs) -> Result<()> {
    let kind = parse_inspire_kind(&args.picker)?;
    let engine = studio()?;
    let project = open_project(path)?;

    let options = engine.inspire_options(&project.settings, kind).await?;
    for (index, option) in options.iter().enumerate() {
        println!("{}. {option}", index + 1);
    }
    println!("apply one with `reelforge config --{} '<label>'`", args.picker);
    Ok(())
}

async fn cmd_premise(path: &Path) -> Result<()> {
    let engine = studio()?;
    let mut project = open_project(path)?;

    let premise = engine.inspire_premise(&mut project.settings).await?;
    persist(&project, path)?;
    println!("{premise}");
    Ok(())
}

async fn cmd_recommend(path: &Path) -> Result<()> {
    let engine = studio()?;
    let mut project = open_project(path)?;

    engine.recommend_config(&mut project.settings).await?;
    persist(&project, path)?;

    let settings = &project.settings;
    println!("genre     {}", settings.genre);
    println!("style     {}", settings.composite_style());
    println!("premise   {}", settings.premise);
    Ok(())
}

fn cmd_asset(path: &Path, command: AssetCommands) -> Result<()> {
    let mut project = open_project(path)?;

    match command {
        AssetCommands::Add { kind, name, file } => {
            let kind = parse_asset_kind(&kind)?;
            let mime = image_mime_for(&file)?;
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            if bytes.len() > 5 * 1024 * 1024 {
                warn!(
                    "{} is {} KiB; large references inflate every request that attaches them",
                    file.display(),
                    bytes.len() / 1024
                );
            }
            let id = project
                .assets
                .add(kind, ReferenceAsset::new(name, ImageData::new(mime, bytes)));
            persist(&project, path)?;
            println!("added {kind} {id}");
        }
        AssetCommands::List => {
            let mut empty = true;
            for kind in [
                AssetKind::Hero,
                AssetKind::Support,
                AssetKind::Item,
                AssetKind::Location,
            ] {
                for asset in project.assets.list(kind) {
                    empty = false;
                    println!(
                        "{:8} {}  {}  ({} KiB)",
                        kind.prefix(),
                        asset.id,
                        asset.name,
                        asset.image.bytes.len() / 1024
                    );
                }
            }
            if empty {
                println!("no assets registered");
            }
        }
        AssetCommands::Remove { kind, id } => {
            let kind = parse_asset_kind(&kind)?;
            if !project.assets.list(kind).iter().any(|asset| asset.id == id) {
                bail!("no {kind} asset with id {id}");
            }
            project.assets.remove(kind, &id);
            persist(&project, path)?;
            println!("removed {id}");
        }
        AssetCommands::Rename { kind, id, name } => {
            let kind = parse_asset_kind(&kind)?;
            if !project.assets.rename(kind, &id, name) {
                bail!("no {kind} asset with id {id}");
            }
            persist(&project, path)?;
            println!("renamed {id}");
        }
    }
    Ok(())
}

// =============================================================================
// Production commands
// =============================================================================

async fn cmd_plan(path: &Path) -> Result<()> {
    let engine = studio()?;
    let mut project = open_project(path)?;

    engine.plan_script(&mut project).await?;
    persist(&project, path)?;

    let shots: usize = project.scenes.iter().map(|scene| scene.shots.len()).sum();
    println!("planned {} scene(s), {} shot(s)", project.scenes.len(), shots);
    println!("review with `reelforge status`, render with `reelforge visualize`");
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SceneReport {
    number: usize,
    label: String,
    shots: usize,
    rendered: usize,
    clips: usize,
    visualized: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SongReport {
    title: String,
    state: String,
    url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    genre: String,
    style: String,
    language: String,
    aspect_ratio: String,
    page_count: u32,
    premise: String,
    heroes: usize,
    supports: usize,
    items: usize,
    locations: usize,
    continuity_ready: bool,
    scenes: Vec<SceneReport>,
    song: Option<SongReport>,
}

fn song_state(track: &AudioTrack) -> String {
    if let Some(err) = &track.error {
        format!("failed: {err}")
    } else if track.loading {
        "rendering".to_string()
    } else if track.url.is_some() {
        "ready".to_string()
    } else {
        "pending".to_string()
    }
}

fn cmd_status(path: &Path, args: StatusArgs) -> Result<()> {
    let project = open_project(path)?;
    let settings = &project.settings;
    let assets = &project.assets;

    let scenes: Vec<SceneReport> = project
        .scenes
        .iter()
        .enumerate()
        .map(|(index, scene)| SceneReport {
            number: index + 1,
            label: scene_label(scene),
            shots: scene.shots.len(),
            rendered: scene
                .shots
                .iter()
                .filter(|shot| shot.image.is_some())
                .count(),
            clips: scene
                .shots
                .iter()
                .filter(|shot| matches!(shot.video_status, VideoStatus::Done))
                .count(),
            visualized: scene.visualized,
        })
        .collect();
    let song = project.audio.as_ref().map(|track| SongReport {
        title: track.title.clone(),
        state: song_state(track),
        url: track.url.clone(),
    });

    if args.json {
        let report = StatusReport {
            genre: settings.genre.clone(),
            style: settings.composite_style(),
            language: settings.language.clone(),
            aspect_ratio: settings.aspect_ratio.to_string(),
            page_count: settings.page_count,
            premise: settings.premise.clone(),
            heroes: assets.list(AssetKind::Hero).len(),
            supports: assets.list(AssetKind::Support).len(),
            items: assets.list(AssetKind::Item).len(),
            locations: assets.list(AssetKind::Location).len(),
            continuity_ready: project.continuity.category != StyleCategory::Unknown,
            scenes,
            song,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("project    {}", path.display());
    println!("genre      {}", settings.genre);
    println!("style      {}", settings.composite_style());
    println!(
        "language   {}   aspect {}   pages {}",
        settings.language, settings.aspect_ratio, settings.page_count
    );
    if !settings.premise.is_empty() {
        println!("premise    {}", settings.premise);
    }
    println!(
        "assets     {} hero, {} support, {} item, {} location",
        assets.list(AssetKind::Hero).len(),
        assets.list(AssetKind::Support).len(),
        assets.list(AssetKind::Item).len(),
        assets.list(AssetKind::Location).len()
    );
    println!(
        "continuity {}",
        if project.continuity.category != StyleCategory::Unknown {
            "analyzed"
        } else {
            "pending"
        }
    );

    if scenes.is_empty() {
        println!("script     not planned");
    } else {
        println!();
        for scene in &scenes {
            let mut line = format!(
                "[{}] {:12} {} shot(s), {} rendered",
                scene.number, scene.label, scene.shots, scene.rendered
            );
            if scene.clips > 0 {
                line.push_str(&format!(", {} clip(s)", scene.clips));
            }
            if scene.visualized {
                line.push_str("  visualized");
            }
            println!("{line}");
        }
    }

    if let Some(song) = &song {
        println!();
        println!("song       \"{}\" {}", song.title, song.state);
    }
    Ok(())
}

async fn cmd_visualize(path: &Path, args: VisualizeArgs) -> Result<()> {
    let engine = studio()?;
    let mut project = open_project(path)?;

    let targets: Vec<(usize, SceneId)> = match args.scene {
        Some(number) => vec![(number, scene_id_at(&project, number)?)],
        None => project
            .scenes
            .iter()
            .enumerate()
            .filter(|(_, scene)| !scene.shots.is_empty() && !scene.visualized)
            .map(|(index, scene)| (index + 1, scene.id.clone()))
            .collect(),
    };
    if targets.is_empty() {
        bail!("nothing to visualize; run `reelforge plan` first");
    }

    for (number, scene_id) in &targets {
        println!("visualizing scene {number}...");
        let outcome = engine.generate_scene_images(&mut project, scene_id).await;
        persist(&project, path)?;
        outcome.with_context(|| format!("visualizing scene {number} failed"))?;

        if let Some(scene) = project.scene(scene_id) {
            let rendered = scene
                .shots
                .iter()
                .filter(|shot| shot.image.is_some())
                .count();
            println!(
                "scene {number}: {rendered} of {} shot(s) rendered",
                scene.shots.len()
            );
        }
    }
    Ok(())
}

async fn cmd_anchor(path: &Path, args: AnchorArgs) -> Result<()> {
    let kind = parse_anchor_kind(&args.kind)?;
    let engine = studio()?;
    let mut project = open_project(path)?;
    let scene_id = scene_id_at(&project, args.scene)?;

    engine.regenerate_anchor(&mut project, &scene_id, kind).await?;
    persist(&project, path)?;
    println!("{} anchor regenerated for scene {}", args.kind, args.scene);
    Ok(())
}

async fn cmd_reshoot(path: &Path, args: SceneArgs) -> Result<()> {
    let engine = studio()?;
    let mut project = open_project(path)?;
    let scene_id = scene_id_at(&project, args.scene)?;

    println!("reshooting scene {}...", args.scene);
    let outcome = engine.reshoot_scene(&mut project, &scene_id).await;
    persist(&project, path)?;
    outcome.with_context(|| format!("reshooting scene {} failed", args.scene))?;
    println!("scene {} rendered", args.scene);
    Ok(())
}

async fn cmd_rewrite(path: &Path, args: SceneArgs) -> Result<()> {
    let engine = studio()?;
    let mut project = open_project(path)?;
    let scene_id = scene_id_at(&project, args.scene)?;

    engine.rewrite_scene(&mut project, &scene_id).await?;
    persist(&project, path)?;

    if let Some(scene) = project.scene(&scene_id) {
        println!(
            "scene {} rewritten ({} shot(s))",
            args.scene,
            scene.shots.len()
        );
    }
    Ok(())
}

async fn cmd_insert_shot(path: &Path, args: InsertShotArgs) -> Result<()> {
    let engine = studio()?;
    let mut project = open_project(path)?;
    let scene_id = scene_id_at(&project, args.scene)?;
    let after_id = {
        let scene = project
            .scene(&scene_id)
            .ok_or_else(|| anyhow!("scene {} not found", args.scene))?;
        shot_id_at(scene, args.after)?
    };

    let shot_id = engine.insert_shot(&mut project, &scene_id, &after_id).await?;
    persist(&project, path)?;

    let position = project
        .scene(&scene_id)
        .and_then(|scene| scene.shots.iter().position(|shot| shot.id == shot_id))
        .map(|index| index + 1)
        .unwrap_or(args.after + 1);
    println!("inserted shot {} in scene {}", position, args.scene);
    Ok(())
}

fn cmd_remove_shot(path: &Path, args: ShotArgs) -> Result<()> {
    let engine = studio()?;
    let mut project = open_project(path)?;
    let scene_id = scene_id_at(&project, args.scene)?;
    let shot_id = {
        let scene = project
            .scene(&scene_id)
            .ok_or_else(|| anyhow!("scene {} not found", args.scene))?;
        shot_id_at(scene, args.shot)?
    };

    engine.remove_shot(&mut project, &scene_id, &shot_id)?;
    persist(&project, path)?;
    println!("removed shot {} from scene {}", args.shot, args.scene);
    Ok(())
}

async fn cmd_insert_scene(path: &Path, args: InsertSceneArgs) -> Result<()> {
    let engine = studio()?;
    let mut project = open_project(path)?;
    let after_id = scene_id_at(&project, args.after)?;

    println!("writing bridge scene after scene {}...", args.after);
    let scene_id = engine.insert_scene(&mut project, &after_id).await?;
    persist(&project, path)?;

    let position = project
        .scene_position(&scene_id)
        .map(|index| index + 1)
        .unwrap_or(args.after + 1);
    println!("inserted scene {position}; renders are pending `reelforge visualize {position}`");
    Ok(())
}

async fn cmd_last_frame(path: &Path, args: ShotArgs) -> Result<()> {
    let engine = studio()?;
    let mut project = open_project(path)?;
    let scene_id = scene_id_at(&project, args.scene)?;
    let shot_id = {
        let scene = project
            .scene(&scene_id)
            .ok_or_else(|| anyhow!("scene {} not found", args.scene))?;
        shot_id_at(scene, args.shot)?
    };

    engine
        .generate_last_frame(&mut project, &scene_id, &shot_id)
        .await?;
    persist(&project, path)?;
    println!(
        "closing frame rendered for scene {} shot {}",
        args.scene, args.shot
    );
    Ok(())
}

async fn cmd_video(path: &Path, args: VideoArgs) -> Result<()> {
    let engine = studio()?;
    let mut project = open_project(path)?;
    let scene_id = scene_id_at(&project, args.scene)?;

    let targets: Vec<(usize, ShotId)> = {
        let scene = project
            .scene(&scene_id)
            .ok_or_else(|| anyhow!("scene {} not found", args.scene))?;
        match args.shot {
            Some(number) => vec![(number, shot_id_at(scene, number)?)],
            None => scene
                .shots
                .iter()
                .enumerate()
                .filter(|(_, shot)| shot.image.is_some())
                .map(|(index, shot)| (index + 1, shot.id.clone()))
                .collect(),
        }
    };
    if targets.is_empty() {
        bail!(
            "scene {} has no rendered shots; run `reelforge visualize {}` first",
            args.scene,
            args.scene
        );
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    // Ctrl-C stops between polls; the shot reverts to idle, finished clips
    // stay on disk.
    let cancel = Arc::new(CancelToken::new());
    let watcher = tokio::spawn({
        let cancel = Arc::clone(&cancel);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("cancel requested, stopping after the current poll");
                cancel.cancel();
            }
        }
    });

    let mut written = 0usize;
    for (number, shot_id) in &targets {
        println!("animating scene {} shot {number}...", args.scene);
        let outcome = engine
            .generate_shot_video(&mut project, &scene_id, shot_id, &cancel)
            .await;
        persist(&project, path)?;

        match outcome {
            Ok(()) => {
                let clip = project
                    .scene(&scene_id)
                    .and_then(|scene| scene.shot(shot_id))
                    .and_then(|shot| shot.video.as_ref());
                if let Some(clip) = clip {
                    let file = args.out.join(format!(
                        "clip-{}-{}.{}",
                        args.scene,
                        number,
                        extension_for_mime(&clip.mime)
                    ));
                    atomic_write_bytes(&file, &clip.bytes)?;
                    println!("wrote {}", file.display());
                    written += 1;
                } else {
                    warn!("scene {} shot {number} finished without a clip payload", args.scene);
                }
            }
            Err(CoreError::Cancelled) => {
                println!("cancelled; {written} clip(s) written");
                watcher.abort();
                return Ok(());
            }
            Err(err) => {
                watcher.abort();
                return Err(err)
                    .with_context(|| format!("animating scene {} shot {number} failed", args.scene));
            }
        }
    }

    watcher.abort();
    println!("{written} clip(s) written to {}", args.out.display());
    Ok(())
}

async fn cmd_music(path: &Path, args: MusicArgs) -> Result<()> {
    let MusicArgs {
        language,
        title,
        tags,
        lyrics,
        concept_only,
    } = args;
    if !LYRIC_LANGUAGES.iter().any(|(code, _)| *code == language) {
        let codes: Vec<&str> = LYRIC_LANGUAGES.iter().map(|(code, _)| *code).collect();
        bail!(
            "unknown lyric language '{}' (expected one of {})",
            language,
            codes.join(", ")
        );
    }

    let engine = studio()?;
    let mut project = open_project(path)?;

    let request = match (title, tags) {
        (Some(title), Some(tags)) => MusicRequest::new(title, tags, lyrics.unwrap_or_default()),
        (None, None) => {
            let request = engine
                .generate_music_concept(&project.settings, &language)
                .await?;
            println!("title  {}", request.title);
            println!("tags   {}", request.tags);
            if !request.lyrics.is_empty() {
                println!();
                println!("{}", request.lyrics);
            }
            request
        }
        _ => bail!("--title and --tags must be given together"),
    };

    if concept_only {
        return Ok(());
    }

    println!("rendering \"{}\"...", request.title);
    let outcome = engine.generate_music(&mut project, &request).await;
    persist(&project, path)?;
    outcome?;

    if let Some(url) = project.audio.as_ref().and_then(|track| track.url.as_ref()) {
        println!("song ready: {url}");
    }
    Ok(())
}

// =============================================================================
// Export
// =============================================================================

fn cmd_export(path: &Path, args: ExportArgs) -> Result<()> {
    let project = open_project(path)?;
    if project.scenes.is_empty() {
        bail!("nothing to export; run `reelforge plan` first");
    }
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    let settings = &project.settings;
    let mut script = String::new();
    script.push_str("# Shooting script\n\n");
    script.push_str(&format!("Genre: {}\n", settings.genre));
    script.push_str(&format!("Style: {}\n", settings.composite_style()));
    if !settings.premise.is_empty() {
        script.push_str(&format!("Premise: {}\n", settings.premise));
    }
    if let Some(url) = project.audio.as_ref().and_then(|track| track.url.as_ref()) {
        script.push_str(&format!("Song: {url}\n"));
    }
    script.push('\n');

    let mut frames = 0usize;
    for (index, scene) in project.scenes.iter().enumerate() {
        let number = index + 1;
        script.push_str(&format!("## [{}] {}\n\n", number, scene_label(scene)));
        if let Some(meta) = &scene.metadata {
            script.push_str(&format!("Setting: {}\n", meta.setting));
            if !meta.mood.is_empty() {
                script.push_str(&format!("Mood: {}\n", meta.mood));
            }
            script.push('\n');
        }
        for (position, shot) in scene.shots.iter().enumerate() {
            let shot_number = position + 1;
            script.push_str(&format!("{}. {}\n", shot_number, shot.visual_description));
            if !shot.caption.is_empty() {
                script.push_str(&format!("   Caption: {}\n", shot.caption));
            }
            if !shot.dialogue.is_empty() {
                script.push_str(&format!("   Dialogue: {}\n", shot.dialogue));
            }

            if let Some(image) = &shot.image {
                let file = args.out.join(format!(
                    "frame-{}-{}.{}",
                    number,
                    shot_number,
                    extension_for_mime(&image.mime)
                ));
                atomic_write_bytes(&file, &image.bytes)?;
                frames += 1;
            }
            if let Some(frame) = &shot.last_frame {
                let file = args.out.join(format!(
                    "frame-{}-{}-end.{}",
                    number,
                    shot_number,
                    extension_for_mime(&frame.mime)
                ));
                atomic_write_bytes(&file, &frame.bytes)?;
                frames += 1;
            }
        }
        script.push('\n');
    }

    atomic_write_bytes(&args.out.join("script.md"), script.as_bytes())?;
    println!(
        "exported {} frame(s) and script.md to {}",
        frames,
        args.out.display()
    );
    Ok(())
}

// =============================================================================
// Settings
// =============================================================================

fn cmd_settings(command: SettingsCommands) -> Result<()> {
    let manager = SettingsManager::at_default_location()?;

    match command {
        SettingsCommands::Path => {
            println!("{}", manager.settings_path().display());
        }
        SettingsCommands::Models => {
            for (id, label) in VIDEO_MODELS {
                println!("{id:24} {label}");
            }
        }
        SettingsCommands::Show => {
            let settings = manager.load();
            let gateway = &settings.gateway;
            println!("settings   {}", manager.settings_path().display());
            println!("base url   {}", gateway.base_url);
            println!("music url  {}", gateway.music_base_url);
            println!("model      {}", gateway.video_model);
            println!(
                "keys       shared {} | text {} | image {} | video {}",
                key_state(&gateway.api_key),
                key_state(&gateway.text_key),
                key_state(&gateway.image_key),
                key_state(&gateway.video_key)
            );
            let generation = &settings.generation;
            println!(
                "batching   {} shot(s) per batch, {} ms pause",
                generation.batch_size, generation.batch_pause_ms
            );
            println!(
                "polling    video {} ms x {}, music {} ms x {}",
                generation.video_poll_interval_ms,
                generation.video_poll_limit,
                generation.music_poll_interval_ms,
                generation.music_poll_limit
            );
            let retry = &settings.retry;
            println!(
                "retry      {} tries from {} ms, backoff x{}",
                retry.max_retries, retry.initial_delay_ms, retry.backoff_factor
            );
        }
        SettingsCommands::Reset => {
            manager.reset()?;
            println!("settings reset to defaults");
        }
        SettingsCommands::Set(args) => {
            let mut settings = manager.load();
            if let Some(model) = args.video_model {
                if !VIDEO_MODELS.iter().any(|(id, _)| *id == model) {
                    bail!("unknown video model '{model}'; run `reelforge settings models`");
                }
                settings.gateway.video_model = model;
            }
            if let Some(key) = args.api_key {
                settings.gateway.api_key = optional(key);
            }
            if let Some(key) = args.text_key {
                settings.gateway.text_key = optional(key);
            }
            if let Some(key) = args.image_key {
                settings.gateway.image_key = optional(key);
            }
            if let Some(key) = args.video_key {
                settings.gateway.video_key = optional(key);
            }
            if let Some(url) = args.base_url {
                settings.gateway.base_url = url;
            }
            if let Some(url) = args.music_base_url {
                settings.gateway.music_base_url = url;
            }
            if let Some(size) = args.batch_size {
                settings.generation.batch_size = size;
            }
            if let Some(pause) = args.batch_pause_ms {
                settings.generation.batch_pause_ms = pause;
            }
            if let Some(interval) = args.video_poll_interval_ms {
                settings.generation.video_poll_interval_ms = interval;
            }
            if let Some(retries) = args.max_retries {
                settings.retry.max_retries = retries;
            }
            manager.save(&settings)?;
            println!("saved {}", manager.settings_path().display());
        }
    }
    Ok(())
}
