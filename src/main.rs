//! ImageStory CLI - inspect and maintain the fairy tale asset store

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use imagestory::config::{self, ImageStoryConfig};
use imagestory::features::VoiceFeatures;
use imagestory::repository::{NewTale, VoiceChoice};
use imagestory::ui::{self, Icons, OutputMode};
use imagestory::{AssetKind, Library};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "imagestory")]
#[command(version)]
#[command(about = "Local asset store for narrated fairy tales")]
#[command(long_about = r#"
ImageStory keeps the assets of generated fairy tales: story texts, source
images, narration voices and background music, plus the tales that tie
them together.

Example usage:
  imagestory init
  imagestory add image --title "Forest" forest.png
  imagestory list tales
  imagestory recommend --pitch 160 --std-dev 16
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Directory holding asset files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show row counts per table
    Stats,

    /// Drop and recreate every table
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// List stored assets of one kind
    List {
        /// fairy_tale, voice, image, text or music
        kind: String,

        /// Only music of this genre
        #[arg(long)]
        genre: Option<String>,
    },

    /// Show one asset
    Show { kind: String, id: i64 },

    /// Delete one asset and its file
    Delete { kind: String, id: i64 },

    /// Add an asset
    Add {
        #[command(subcommand)]
        asset: AddAsset,
    },

    /// Change the title of a voice
    RenameVoice { id: i64, title: String },

    /// Find the stored voice closest to the given pitch
    Recommend {
        #[arg(long)]
        pitch: f64,

        #[arg(long, default_value = "15.0")]
        std_dev: f64,
    },

    /// Save a copy of a tale narrated by another voice
    Revoice {
        tale: i64,
        voice: i64,

        /// Title of the new tale
        #[arg(long)]
        title: String,

        /// Narration audio file
        #[arg(long)]
        audio: PathBuf,

        /// The voice was recommended rather than picked
        #[arg(long)]
        recommended: bool,
    },
}

#[derive(Subcommand)]
enum AddAsset {
    /// Voice sample with its features
    Voice {
        #[arg(long)]
        title: String,

        /// Voice sample audio file
        audio: PathBuf,

        /// Attribute JSON
        #[arg(long, default_value = "{}")]
        attribute: String,

        /// Feature descriptor JSON file; overrides --pitch/--std-dev
        #[arg(long)]
        features: Option<PathBuf>,

        #[arg(long, default_value = "140.0")]
        pitch: f64,

        #[arg(long, default_value = "15.0")]
        std_dev: f64,
    },

    /// Source image
    Image {
        #[arg(long)]
        title: String,

        file: PathBuf,
    },

    /// Story text
    Text { file: PathBuf },

    /// Background music
    Music {
        #[arg(long)]
        title: String,

        #[arg(long)]
        genre: String,

        file: PathBuf,
    },

    /// Fairy tale referencing stored assets
    Tale {
        #[arg(long)]
        title: String,

        #[arg(long)]
        voice: i64,

        #[arg(long)]
        image: i64,

        #[arg(long)]
        text: i64,

        #[arg(long)]
        music: i64,

        #[arg(long, default_value = "")]
        theme: String,

        /// Narration audio file
        #[arg(long)]
        audio: PathBuf,
    },
}

/// Paths and policy after merging flags over the config file
struct Settings {
    config_path: PathBuf,
    database: PathBuf,
    data_dir: PathBuf,
    config: ImageStoryConfig,
}

impl Settings {
    fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
        let config = config::load_config(Some(&config_path))?.unwrap_or_default();
        let base = Path::new(".");

        let database = cli
            .database
            .clone()
            .or_else(|| config.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| config::default_database_path_in(base));
        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| config.data_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| config::default_data_dir_in(base));

        Ok(Self { config_path, database, data_dir, config })
    }

    fn open_library(&self) -> anyhow::Result<Library> {
        config::ensure_db_dir(&self.database)?;
        tracing::debug!("Opening {} with assets in {}", self.database.display(), self.data_dir.display());
        Ok(Library::open(&self.database, &self.data_dir, self.config.mismatch_policy())?)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(cli.verbose))
        .init();

    let settings = Settings::resolve(&cli)?;
    let mode = OutputMode::from_flag(cli.json);

    if let Err(e) = run(cli.command, &settings, mode) {
        ui::error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}

fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}

fn run(command: Commands, settings: &Settings, mode: OutputMode) -> anyhow::Result<()> {
    match command {
        Commands::Init { force } => {
            let config = ImageStoryConfig {
                database: Some(settings.database.to_string_lossy().to_string()),
                data_dir: Some(settings.data_dir.to_string_lossy().to_string()),
                reset_on_mismatch: Some(false),
            };
            config::write_config(&settings.config_path, &config, force)?;
            let library = settings.open_library()?;

            if mode.is_json() {
                print_json(&config)?;
            } else {
                ui::header("ImageStory initialized");
                ui::status(Icons::INFO, "Config", &settings.config_path.display().to_string());
                ui::status(Icons::DATABASE, "Database", &settings.database.display().to_string());
                ui::status(Icons::FOLDER, "Assets", &library.files().root().display().to_string());
            }
        }

        Commands::Stats => {
            let library = settings.open_library()?;
            let stats = library.database().stats()?;
            if mode.is_json() {
                print_json(&stats)?;
            } else {
                ui::header(&format!("ImageStory Statistics ({})", settings.database.display()));
                println!("{}", ui::stats_table(&stats));
            }
        }

        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!("reset drops every stored row; pass --yes to confirm");
            }
            let library = settings.open_library()?;
            library.database().reset()?;
            if !mode.is_json() {
                ui::success("All tables recreated");
                ui::warn("Asset files were left in place");
            }
        }

        Commands::List { kind, genre } => {
            let kind: AssetKind = kind.parse()?;
            let library = settings.open_library()?;
            list(&library, kind, genre.as_deref(), mode)?;
        }

        Commands::Show { kind, id } => {
            let kind: AssetKind = kind.parse()?;
            let library = settings.open_library()?;
            show(&library, kind, id, mode)?;
        }

        Commands::Delete { kind, id } => {
            let kind: AssetKind = kind.parse()?;
            let library = settings.open_library()?;
            let deleted = match kind {
                AssetKind::FairyTale => library.fairy_tales().delete(id)?,
                AssetKind::Voice => library.voices().delete(id)?,
                AssetKind::Image => library.images().delete(id)?,
                AssetKind::Text => library.texts().delete(id)?,
                AssetKind::Music => library.musics().delete(id)?,
            };
            if mode.is_json() {
                print_json(&serde_json::json!({ "kind": kind, "id": id, "deleted": deleted }))?;
            } else if deleted {
                ui::asset_deleted(kind, id);
            } else {
                ui::warn(&format!("No {} with id {}", kind, id));
            }
        }

        Commands::Add { asset } => {
            let library = settings.open_library()?;
            let (kind, id, title) = add(&library, asset)?;
            if mode.is_json() {
                print_json(&serde_json::json!({ "kind": kind, "id": id }))?;
            } else {
                ui::asset_saved(kind, id, &title);
            }
        }

        Commands::RenameVoice { id, title } => {
            let library = settings.open_library()?;
            let renamed = library.voices().rename(id, &title)?;
            if mode.is_json() {
                print_json(&serde_json::json!({ "id": id, "renamed": renamed }))?;
            } else if renamed {
                ui::success(&format!("Voice {} is now '{}'", id, title));
            } else {
                ui::warn(&format!("No voice with id {}", id));
            }
        }

        Commands::Recommend { pitch, std_dev } => {
            let library = settings.open_library()?;
            let target = VoiceFeatures::new(pitch, std_dev, VoiceFeatures::neutral().mfcc_values);
            let best = library.voices().recommend(&target)?;
            let voice = match best {
                Some(id) => library.voices().get(id)?,
                None => None,
            };

            if mode.is_json() {
                print_json(&voice)?;
            } else {
                match voice {
                    Some(voice) => {
                        let features = library.voices().features_of(&voice);
                        println!("{} {} ({})", Icons::STAR, voice.title, voice.id.unwrap_or_default());
                        ui::summary_row("Similarity", &format!("{:.3}", target.similarity(&features)));
                        ui::summary_row("Average pitch", &format!("{:.1}", features.average_pitch));
                    }
                    None => ui::warn("No voices stored yet"),
                }
            }
        }

        Commands::Revoice { tale, voice, title, audio, recommended } => {
            let library = settings.open_library()?;
            let bytes = std::fs::read(&audio)?;
            let choice = if recommended { VoiceChoice::Recommended } else { VoiceChoice::Selected };
            let id = library.fairy_tales().revoice(tale, voice, &title, &bytes, choice)?;
            if mode.is_json() {
                print_json(&serde_json::json!({ "kind": AssetKind::FairyTale, "id": id, "originalStoryId": tale }))?;
            } else {
                ui::asset_saved(AssetKind::FairyTale, id, &title);
                ui::summary_row("Copied from", &tale.to_string());
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_rows<T: Serialize>(items: &[T], rows: Vec<ui::AssetRow>, kind: AssetKind, mode: OutputMode) -> anyhow::Result<()> {
    if mode.is_json() {
        return print_json(&items);
    }
    if rows.is_empty() {
        ui::warn(&format!("No {} records", kind));
    } else {
        ui::section(&format!(" {} {} ({}) ", Icons::for_kind(kind), kind.table(), rows.len()));
        println!("{}", ui::asset_table(&rows));
    }
    Ok(())
}

fn list(library: &Library, kind: AssetKind, genre: Option<&str>, mode: OutputMode) -> anyhow::Result<()> {
    match kind {
        AssetKind::FairyTale => {
            let tales = library.fairy_tales().all()?;
            print_rows(&tales, tales.iter().map(ui::AssetRow::from).collect(), kind, mode)
        }
        AssetKind::Voice => {
            let voices = library.voices().all()?;
            print_rows(&voices, voices.iter().map(ui::AssetRow::from).collect(), kind, mode)
        }
        AssetKind::Image => {
            let images = library.images().all()?;
            print_rows(&images, images.iter().map(ui::AssetRow::from).collect(), kind, mode)
        }
        AssetKind::Text => {
            let texts = library.texts().all()?;
            print_rows(&texts, texts.iter().map(ui::AssetRow::from).collect(), kind, mode)
        }
        AssetKind::Music => {
            let musics = match genre {
                Some(genre) => library.musics().by_genre(genre)?,
                None => library.musics().all()?,
            };
            print_rows(&musics, musics.iter().map(ui::AssetRow::from).collect(), kind, mode)
        }
    }
}

fn show(library: &Library, kind: AssetKind, id: i64, mode: OutputMode) -> anyhow::Result<()> {
    let not_found = || imagestory::Error::NotFound { kind, id };

    match kind {
        AssetKind::FairyTale => {
            let (tale, content) = library.fairy_tales().get_with_text(id)?;
            if mode.is_json() {
                return print_json(&serde_json::json!({ "tale": tale, "content": content }));
            }
            ui::header(&tale.title);
            ui::summary_row("Voice", &tale.voice_id.to_string());
            ui::summary_row("Image", &tale.image_id.to_string());
            ui::summary_row("Text", &tale.text_id.to_string());
            ui::summary_row("Music", &tale.music_id.to_string());
            ui::summary_row("Created", &ui::format_millis(tale.created_at));
            ui::summary_row("Attributes", &tale.attribute);
            ui::section(" Story ");
            println!("{}", content);
        }
        AssetKind::Voice => {
            let voice = library.voices().get(id)?.ok_or_else(not_found)?;
            let features = library.voices().features_of(&voice);
            if mode.is_json() {
                return print_json(&serde_json::json!({ "voice": voice, "features": features }));
            }
            ui::header(&voice.title);
            ui::summary_row("Sample", &voice.voice_path);
            ui::summary_row("Average pitch", &format!("{:.1}", features.average_pitch));
            ui::summary_row("Pitch std dev", &format!("{:.1}", features.pitch_std_dev));
            ui::summary_row("Attributes", &voice.attribute);
        }
        AssetKind::Image => {
            let image = library.images().get(id)?.ok_or_else(not_found)?;
            if mode.is_json() {
                return print_json(&image);
            }
            ui::header(&image.title);
            ui::summary_row("File", &image.image_path);
            ui::summary_row("Created", &ui::format_millis(image.created_at));
        }
        AssetKind::Text => {
            let (text, content) = library.texts().get_with_content(id)?.ok_or_else(not_found)?;
            if mode.is_json() {
                return print_json(&serde_json::json!({ "text": text, "content": content }));
            }
            ui::header(&text.text_path);
            println!("{}", content);
        }
        AssetKind::Music => {
            let music = library.musics().get(id)?.ok_or_else(not_found)?;
            if mode.is_json() {
                return print_json(&music);
            }
            ui::header(&music.title);
            ui::summary_row("Genre", &music.attribute);
            ui::summary_row("File", &music.music_path);
        }
    }
    Ok(())
}

/// Store one asset; returns its kind, id and a display title
fn add(library: &Library, asset: AddAsset) -> anyhow::Result<(AssetKind, i64, String)> {
    match asset {
        AddAsset::Voice { title, audio, attribute, features, pitch, std_dev } => {
            let sample = std::fs::read(&audio)?;
            let features = match features {
                Some(path) => VoiceFeatures::from_json(&std::fs::read_to_string(path)?)?,
                None => VoiceFeatures::new(pitch, std_dev, VoiceFeatures::neutral().mfcc_values),
            };
            let id = library.voices().save(&title, &attribute, &sample, &features)?;
            Ok((AssetKind::Voice, id, title))
        }
        AddAsset::Image { title, file } => {
            let bytes = std::fs::read(&file)?;
            let extension = file.extension().and_then(|e| e.to_str()).unwrap_or("png");
            let id = library.images().save(&title, &bytes, extension)?;
            Ok((AssetKind::Image, id, title))
        }
        AddAsset::Text { file } => {
            let content = std::fs::read_to_string(&file)?;
            let id = library.texts().save(&content)?;
            Ok((AssetKind::Text, id, file.display().to_string()))
        }
        AddAsset::Music { title, genre, file } => {
            let bytes = std::fs::read(&file)?;
            let id = library.musics().save(&title, &genre, &bytes)?;
            Ok((AssetKind::Music, id, title))
        }
        AddAsset::Tale { title, voice, image, text, music, theme, audio } => {
            let narration = std::fs::read(&audio)?;
            let features = library.voices().features(voice)?;
            let id = library.fairy_tales().save(&NewTale {
                title: &title,
                voice_id: voice,
                image_id: image,
                text_id: text,
                music_id: music,
                theme: &theme,
                audio: &narration,
                features: &features,
            })?;
            Ok((AssetKind::FairyTale, id, title))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_levels() {
        assert_eq!(log_filter(false).to_string(), "info");
        assert_eq!(log_filter(true).to_string(), "debug");
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("imagestory.toml");
        let stored = ImageStoryConfig {
            database: Some("from_config.db".to_string()),
            data_dir: Some("config_assets".to_string()),
            reset_on_mismatch: None,
        };
        config::write_config(&config_path, &stored, false).unwrap();

        let cli = Cli::parse_from([
            "imagestory",
            "--config",
            config_path.to_str().unwrap(),
            "--database",
            "flag.db",
            "stats",
        ]);
        let settings = Settings::resolve(&cli).unwrap();
        assert_eq!(settings.database, PathBuf::from("flag.db"));
        assert_eq!(settings.data_dir, PathBuf::from("config_assets"));
    }
}
