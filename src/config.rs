use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub thumbnails: ThumbnailConfig,

    #[serde(default)]
    pub rename: RenameConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directory holding the images. Only its top level is scanned.
    #[serde(default = "default_library_root")]
    pub root: PathBuf,

    #[serde(default = "default_image_extensions")]
    pub extensions: Vec<String>,
}

fn default_library_root() -> PathBuf {
    dirs::picture_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_image_extensions() -> Vec<String> {
    vec![
        "png".to_string(),
        "jpg".to_string(),
        "jpeg".to_string(),
        "gif".to_string(),
        "webm".to_string(),
        "webp".to_string(),
    ]
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: default_library_root(),
            extensions: default_image_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Thumbnail directory. Defaults to `<library root>/thumbnails`.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Transcoder binary used to render thumbnails.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// Output width in pixels; height keeps the aspect ratio.
    #[serde(default = "default_thumb_width")]
    pub width: u32,

    /// JPEG quality scale passed to the transcoder (2 is best, 31 worst).
    #[serde(default = "default_thumb_quality")]
    pub quality: u8,

    /// Seek position for video and animated sources.
    #[serde(default = "default_seek")]
    pub seek: String,

    #[serde(default = "default_animated_extensions")]
    pub animated_extensions: Vec<String>,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_thumb_width() -> u32 {
    120
}

fn default_thumb_quality() -> u8 {
    3
}

fn default_seek() -> String {
    "00:00:01".to_string()
}

fn default_animated_extensions() -> Vec<String> {
    vec!["webm".to_string(), "gif".to_string()]
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            path: None,
            ffmpeg: default_ffmpeg(),
            width: default_thumb_width(),
            quality: default_thumb_quality(),
            seek: default_seek(),
            animated_extensions: default_animated_extensions(),
        }
    }
}

/// Window the bulk renamer draws fabricated timestamps from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RenameConfig {
    /// Youngest allowed timestamp, in months before now.
    #[serde(default = "default_newest_months_ago")]
    pub newest_months_ago: u32,

    /// Oldest allowed timestamp, in months before now.
    #[serde(default = "default_oldest_months_ago")]
    pub oldest_months_ago: u32,
}

fn default_newest_months_ago() -> u32 {
    3
}

fn default_oldest_months_ago() -> u32 {
    12
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            newest_months_ago: default_newest_months_ago(),
            oldest_months_ago: default_oldest_months_ago(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("galleria")
        .join("images.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            library: LibraryConfig::default(),
            thumbnails: ThumbnailConfig::default(),
            rename: RenameConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Create default config
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn library_root(&self) -> &Path {
        &self.library.root
    }

    /// Resolved thumbnail directory.
    pub fn thumbnail_dir(&self) -> PathBuf {
        self.thumbnails
            .path
            .clone()
            .unwrap_or_else(|| self.library.root.join("thumbnails"))
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("galleria")
    }

    fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("GALLERIA_CONFIG") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }
}
