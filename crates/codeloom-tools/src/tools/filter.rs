//! Shared walk filters for the search tools.

use std::path::Path;
use walkdir::DirEntry;

const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "target",
    "dist",
    "build",
    ".next",
    "__pycache__",
    ".venv",
    "vendor",
];

const IGNORED_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "poetry.lock",
    "composer.lock",
    "Gemfile.lock",
];

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "ico", "webp", "pdf", "zip", "gz", "tar", "bz2", "7z", "exe",
    "dll", "so", "dylib", "a", "o", "class", "bin", "wasm", "woff", "woff2", "ttf", "eot", "mp3",
    "mp4", "mov", "sqlite", "db",
];

/// Directory-walk filter: prunes ignored directories and hidden entries.
pub fn keep_entry(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        return !IGNORED_DIRS.contains(&name.as_ref()) && !name.starts_with('.');
    }
    true
}

/// Per-file filter: drops lockfiles and files with binary extensions.
pub fn keep_file(path: &Path) -> bool {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        if IGNORED_FILES.contains(&name) {
            return false;
        }
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => !BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => true,
    }
}
