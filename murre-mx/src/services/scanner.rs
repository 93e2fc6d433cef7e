//! Input discovery
//!
//! Expands the CLI inputs into the list of files to process: explicit
//! file paths pass through untouched (including missing ones, so the
//! pipeline can report them per item), directories are walked for audio
//! files.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Audio file scanner
pub struct FileScanner {
    extensions: Vec<&'static str>,
}

impl FileScanner {
    pub fn new() -> Self {
        Self {
            extensions: vec![
                "wav", "flac", "mp3", "ogg", "oga", "m4a", "aac", "opus", "wma", "aiff",
            ],
        }
    }

    /// Expand input paths into an ordered list of files.
    ///
    /// Directory contents are sorted so repeat runs produce the same
    /// submission order. Hidden entries and unreadable subtrees are
    /// skipped with a log line rather than aborting the walk.
    pub fn collect(&self, inputs: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for input in inputs {
            if input.is_dir() {
                let mut found = self.scan_directory(input);
                found.sort();
                tracing::info!(
                    path = %input.display(),
                    count = found.len(),
                    "Scanned directory"
                );
                files.extend(found);
            } else {
                // Files (and missing paths) are handed to the pipeline
                // as-is; existence is validated per item there.
                files.push(input.clone());
            }
        }

        files
    }

    fn scan_directory(&self, root: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            // The root itself is exempt so scans of dot-named working
            // directories still descend
            .filter_entry(|e| {
                e.depth() == 0 || !is_hidden(e.file_name().to_string_lossy().as_ref())
            })
        {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    if self.is_audio_extension(entry.path()) {
                        found.push(entry.path().to_path_buf());
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    // Continue scanning, don't abort
                }
            }
        }

        found
    }

    fn is_audio_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|known| *known == ext))
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_hidden(file_name: &str) -> bool {
    file_name.starts_with('.') && file_name.len() > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_scans_directories_sorted() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("b.wav"), b"x").unwrap();
        std::fs::write(temp_dir.path().join("a.flac"), b"x").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"x").unwrap();

        let files = FileScanner::new().collect(&[temp_dir.path().to_path_buf()]);

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.flac"));
        assert!(files[1].ends_with("b.wav"));
    }

    #[test]
    fn test_collect_passes_explicit_files_through() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("readme.txt");
        std::fs::write(&file, b"x").unwrap();

        // Explicit files are not extension-filtered
        let files = FileScanner::new().collect(&[file.clone()]);
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_collect_keeps_missing_paths_for_per_item_reporting() {
        let missing = PathBuf::from("/nonexistent/chorus.wav");
        let files = FileScanner::new().collect(&[missing.clone()]);
        assert_eq!(files, vec![missing]);
    }

    #[test]
    fn test_hidden_entries_skipped() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(".hidden.wav"), b"x").unwrap();
        std::fs::write(temp_dir.path().join("visible.wav"), b"x").unwrap();

        let files = FileScanner::new().collect(&[temp_dir.path().to_path_buf()]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("visible.wav"));
    }
}
