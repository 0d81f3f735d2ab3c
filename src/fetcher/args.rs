//! Argument lists for the external fetch tool

use crate::config::{FetchConfig, ToolsConfig};
use crate::types::Quality;

/// Output file name template, relative to the working directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Build the argument list that fetches and transcodes `target`
///
/// Collections are expanded by the tool; for everything else `--no-playlist`
/// keeps a watch link from pulling in its surrounding playlist. Failing entries
/// of a collection are skipped rather than aborting the whole run.
pub fn fetch_args(
    target: &str,
    is_collection: bool,
    quality: Quality,
    tools: &ToolsConfig,
    fetch: &FetchConfig,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--no-check-certificates".into(),
        "--user-agent".into(),
        tools.user_agent.clone(),
        "-x".into(),
        "--audio-format".into(),
        fetch.audio_format.clone(),
        "--audio-quality".into(),
        quality.as_arg().into(),
        "-o".into(),
        OUTPUT_TEMPLATE.into(),
    ];

    if let Some(ffmpeg) = &tools.ffmpeg_path {
        args.push("--ffmpeg-location".into());
        args.push(ffmpeg.to_string_lossy().into_owned());
    }

    args.extend([
        "--no-warnings".into(),
        "--ignore-errors".into(),
        "--encoding".into(),
        "utf-8".into(),
    ]);

    if !is_collection {
        args.push("--no-playlist".into());
    }

    args.push(target.to_string());
    args
}

/// Build the cheap metadata query that prints a playlist's size
///
/// Only the first entry is resolved; the tool prints the playlist count for it.
pub fn count_args(target: &str) -> Vec<String> {
    vec![
        "--flat-playlist".into(),
        "--print".into(),
        "%(playlist_count)s".into(),
        "--playlist-items".into(),
        "1".into(),
        "--no-warnings".into(),
        target.to_string(),
    ]
}

/// Build a metadata-only search printing one JSON object per hit
pub fn search_args(query: &str, limit: usize) -> Vec<String> {
    vec![
        "--flat-playlist".into(),
        "--dump-json".into(),
        "--no-warnings".into(),
        "--encoding".into(),
        "utf-8".into(),
        format!("ytsearch{limit}:{query}"),
    ]
}
