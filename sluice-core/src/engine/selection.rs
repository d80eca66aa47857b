//! Picks which file of a torrent gets streamed.
//!
//! Selection runs once when metadata arrives and again on an episode change.
//! Priority: an episode-pattern match beats an explicit file index beats the
//! largest video file; a torrent with no video files falls back to file 0.

use regex::Regex;

use super::commands::StartOptions;
use crate::session::FileEntry;

/// Extensions treated as video content, lowercased.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "webm", "ts", "mov", "wmv", "flv", "m4v", "3gp", "mpg", "mpeg", "ogv",
];

/// Whether a path names a video file, judged by extension alone.
pub fn is_video_file(path: &str) -> bool {
    std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Compiles the matcher for one `(season, episode)` pair.
///
/// Matches `S01E02`, `s1e2`, `1x02`, `S01.E02`, `S01_E02` and the like,
/// case-insensitively, with leading zeros optional on both sides. Word
/// boundaries keep `S1E2` from matching inside `S12E02` or `E21`.
///
/// Returns `None` only if the pattern fails to compile, which decimal
/// season/episode numbers never provoke.
pub fn episode_pattern(season: u32, episode: u32) -> Option<Regex> {
    Regex::new(&format!(
        r"(?i)(s0?{season}[.\s_-]?e0?{episode}\b)|(\b0?{season}x0?{episode}\b)"
    ))
    .ok()
}

/// Chooses the file to stream. Returns its index, or `None` for an empty
/// file list.
pub fn select_file(files: &[FileEntry], requested: &StartOptions) -> Option<usize> {
    if let (Some(season), Some(episode)) = (requested.season, requested.episode) {
        if let Some(pattern) = episode_pattern(season, episode) {
            let matched = files
                .iter()
                .find(|f| is_video_file(&f.path) && pattern.is_match(&f.path));
            if let Some(file) = matched {
                return Some(file.index);
            }
        }
        // No episode match: fall through to the remaining rules.
    }

    if let Some(index) = requested.file_index {
        if index < files.len() {
            return Some(index);
        }
    }

    let mut best: Option<&FileEntry> = None;
    for file in files {
        if !is_video_file(&file.path) {
            continue;
        }
        if best.is_none_or(|b| file.size > b.size) {
            best = Some(file);
        }
    }
    match best {
        Some(file) => Some(file.index),
        None if !files.is_empty() => Some(0),
        None => None,
    }
}
