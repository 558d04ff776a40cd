//! Folder scanning for audio files

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// File extensions treated as audio
pub const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "ogg", "flac", "m4a", "aac"];

/// Error type for scanning operations
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Configuration for a folder scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory to scan
    pub directory: PathBuf,
    /// File extensions to include (case-insensitive)
    pub extensions: Vec<String>,
    /// Whether to scan subdirectories recursively
    pub recursive: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            extensions: AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            recursive: true,
        }
    }
}

impl ScanConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }
}

/// Whether `path` has one of the default audio extensions
pub fn is_audio_file(path: &Path) -> bool {
    has_extension(path, AUDIO_EXTENSIONS.iter().copied())
}

fn has_extension<'a>(path: &Path, mut extensions: impl Iterator<Item = &'a str>) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Collect all audio files under the configured directory, sorted by path
pub fn collect_audio_files(config: &ScanConfig) -> Result<Vec<PathBuf>, ScanError> {
    if !config.directory.is_dir() {
        return Err(ScanError::NotADirectory(config.directory.clone()));
    }

    let mut files = Vec::new();
    collect_into(&config.directory, config, &mut files)?;
    files.sort();
    debug!(directory = %config.directory.display(), found = files.len(), "Scan complete");
    Ok(files)
}

fn collect_into(dir: &Path, config: &ScanConfig, files: &mut Vec<PathBuf>) -> Result<(), ScanError> {
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();

        if path.is_file() {
            if has_extension(&path, config.extensions.iter().map(String::as_str)) {
                files.push(path);
            }
        } else if path.is_dir() && config.recursive {
            // Unreadable subfolders are skipped
            if let Err(e) = collect_into(&path, config, files) {
                warn!(path = %path.display(), error = %e, "Skipping folder");
            }
        }
    }
    Ok(())
}

/// Expand a mix of files and folders into audio files.
///
/// Files are kept in the given order when they look like audio; folders are
/// scanned recursively and contribute their files sorted by path.
pub fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            match collect_audio_files(&ScanConfig::new(input.clone())) {
                Ok(found) => files.extend(found),
                Err(e) => warn!(path = %input.display(), error = %e, "Could not scan folder"),
            }
        } else if is_audio_file(input) {
            files.push(input.clone());
        } else {
            warn!(path = %input.display(), "Skipping non-audio file");
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("aural-scan-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_scan_config_default() {
        let config = ScanConfig::default();
        assert!(config.recursive);
        assert!(config.extensions.contains(&"m4a".to_string()));
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("a.mp3")));
        assert!(is_audio_file(Path::new("B.FLAC")));
        assert!(is_audio_file(Path::new("dir/c.m4a")));
        assert!(!is_audio_file(Path::new("cover.jpg")));
        assert!(!is_audio_file(Path::new("README")));
    }

    #[test]
    fn test_nonexistent_directory() {
        let config = ScanConfig::new("/nonexistent");
        assert!(matches!(
            collect_audio_files(&config),
            Err(ScanError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_collects_sorted_and_recursive() {
        let dir = scratch_dir("tree");
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        for name in ["b.mp3", "a.WAV", "notes.txt", "sub/c.ogg"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }

        let files = collect_audio_files(&ScanConfig::new(dir.clone())).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(&dir).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.WAV", "b.mp3", "sub/c.ogg"]);

        let flat = ScanConfig {
            recursive: false,
            ..ScanConfig::new(dir.clone())
        };
        assert_eq!(collect_audio_files(&flat).unwrap().len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_expand_inputs_mixes_files_and_folders() {
        let dir = scratch_dir("inputs");
        std::fs::write(dir.join("x.flac"), b"").unwrap();
        std::fs::write(dir.join("y.aac"), b"").unwrap();

        let single = PathBuf::from("/somewhere/z.mp3");
        let inputs = vec![single.clone(), dir.clone(), PathBuf::from("image.png")];
        let files = expand_inputs(&inputs);

        assert_eq!(files, vec![single, dir.join("x.flac"), dir.join("y.aac")]);
        std::fs::remove_dir_all(&dir).ok();
    }
}
