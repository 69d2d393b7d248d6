use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

use crate::config::ThumbnailConfig;
use crate::error::{GalleryError, Result};

/// Thumbnail file name for an image: the extension replaced by `.jpg`.
///
/// Video and animated sources still map to a still `.jpg`.
pub fn thumbnail_name(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    format!("{}.jpg", stem)
}

/// The directory thumbnails live in, addressed by image file name.
#[derive(Debug, Clone)]
pub struct ThumbnailDir {
    dir: PathBuf,
}

impl ThumbnailDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn ensure(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| GalleryError::file_access(&self.dir, e))?;
        }
        Ok(())
    }

    /// Thumbnail path for the image called `file_name`.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(thumbnail_name(file_name))
    }

    pub fn has(&self, file_name: &str) -> bool {
        self.path_for(file_name).exists()
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

/// Renders a still thumbnail for an image or video.
pub trait Thumbnailer {
    fn generate(&self, source: &Path, target: &Path) -> Result<()>;
}

/// Runs ffmpeg as a blocking subprocess. No timeout is applied.
#[derive(Debug, Clone)]
pub struct FfmpegThumbnailer {
    program: String,
    width: u32,
    quality: u8,
    seek: String,
    animated_extensions: Vec<String>,
}

impl FfmpegThumbnailer {
    pub fn new(config: &ThumbnailConfig) -> Self {
        Self {
            program: config.ffmpeg.clone(),
            width: config.width,
            quality: config.quality,
            seek: config.seek.clone(),
            animated_extensions: config.animated_extensions.clone(),
        }
    }

    fn is_animated(&self, source: &Path) -> bool {
        super::discovery::has_extension(source, &self.animated_extensions)
    }

    /// Arguments for one invocation, in the order the tool expects them.
    pub fn command_args(&self, source: &Path, target: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        // Grab a single frame one second in for clips
        let animated = self.is_animated(source);
        if animated {
            args.push("-ss".into());
            args.push(self.seek.clone().into());
        }

        args.push("-i".into());
        args.push(source.as_os_str().to_owned());
        args.push("-vf".into());
        args.push(format!("scale={}:-1", self.width).into());
        args.push("-q:v".into());
        args.push(self.quality.to_string().into());
        args.push("-y".into());

        if animated {
            args.push("-vframes".into());
            args.push("1".into());
        }

        args.push(target.as_os_str().to_owned());
        args
    }
}

impl Thumbnailer for FfmpegThumbnailer {
    fn generate(&self, source: &Path, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| GalleryError::file_access(parent, e))?;
        }

        let args = self.command_args(source, target);
        debug!(
            "Thumbnail command: {} {}",
            self.program,
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| GalleryError::ExternalTool {
                tool: self.program.clone(),
                message: format!("failed to start: {}", e),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(GalleryError::ExternalTool {
                tool: self.program.clone(),
                message: format!(
                    "{} exited with {}. Output: {}",
                    source.display(),
                    output.status,
                    stderr
                ),
            });
        }

        if !target.exists() {
            return Err(GalleryError::ExternalTool {
                tool: self.program.clone(),
                message: format!(
                    "finished but {} was not created. Output: {}",
                    target.display(),
                    stderr
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_thumbnail_name() {
        assert_eq!(thumbnail_name("cat.png"), "cat.jpg");
        assert_eq!(thumbnail_name("clip.webm"), "clip.jpg");
        assert_eq!(thumbnail_name("archive.tar.gif"), "archive.tar.jpg");
        assert_eq!(thumbnail_name("noext"), "noext.jpg");
    }

    #[test]
    fn test_still_image_args() {
        let thumbnailer = FfmpegThumbnailer::new(&ThumbnailConfig::default());
        let args = args_as_strings(
            thumbnailer.command_args(Path::new("/lib/a.png"), Path::new("/lib/thumbnails/a.jpg")),
        );

        assert_eq!(
            args,
            vec!["-i", "/lib/a.png", "-vf", "scale=120:-1", "-q:v", "3", "-y", "/lib/thumbnails/a.jpg"]
        );
    }

    #[test]
    fn test_animated_args_seek_and_limit_frames() {
        let thumbnailer = FfmpegThumbnailer::new(&ThumbnailConfig::default());
        let args = args_as_strings(
            thumbnailer.command_args(Path::new("/lib/b.GIF"), Path::new("/lib/thumbnails/b.jpg")),
        );

        assert_eq!(&args[..4], &["-ss", "00:00:01", "-i", "/lib/b.GIF"]);
        assert_eq!(&args[args.len() - 3..], &["-vframes", "1", "/lib/thumbnails/b.jpg"]);
    }

    #[test]
    fn test_missing_program_is_external_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ThumbnailConfig {
            ffmpeg: "galleria-no-such-transcoder".to_string(),
            ..ThumbnailConfig::default()
        };
        let err = FfmpegThumbnailer::new(&config)
            .generate(&dir.path().join("a.png"), &dir.path().join("thumbs/a.jpg"))
            .unwrap_err();
        assert!(matches!(err, GalleryError::ExternalTool { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_success_without_output_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ThumbnailConfig {
            ffmpeg: "true".to_string(),
            ..ThumbnailConfig::default()
        };
        let err = FfmpegThumbnailer::new(&config)
            .generate(&dir.path().join("a.png"), &dir.path().join("thumbs/a.jpg"))
            .unwrap_err();
        match err {
            GalleryError::ExternalTool { message, .. } => assert!(message.contains("not created")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_thumbnail_dir_paths() {
        let dir = tempfile::tempdir().unwrap();
        let thumbs = ThumbnailDir::new(dir.path().join("thumbnails"));
        thumbs.ensure().unwrap();
        assert!(thumbs.path().is_dir());

        assert!(!thumbs.has("x.webp"));
        std::fs::write(thumbs.path().join("x.jpg"), b"jpg").unwrap();
        assert!(thumbs.has("x.webp"));
        assert_eq!(thumbs.path_for("x.webp"), dir.path().join("thumbnails/x.jpg"));
    }
}
