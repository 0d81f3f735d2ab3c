//! Parsers for the external tool's metadata output

use crate::types::SearchResult;
use serde::Deserialize;

/// Extract the playlist size from the output of a count query
///
/// The tool may print warnings or `NA` before the number, so the last line that
/// consists only of digits wins. Returns `None` if no such line exists.
pub fn parse_playlist_count(stdout: &str) -> Option<u32> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|line| line.parse().ok())
        .next_back()
}

#[derive(Deserialize)]
struct FlatEntry {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
}

impl From<FlatEntry> for SearchResult {
    fn from(entry: FlatEntry) -> Self {
        let channel = entry
            .channel
            .or(entry.uploader)
            .unwrap_or_else(|| "Unknown".to_string());
        SearchResult {
            url: format!("https://www.youtube.com/watch?v={}", entry.id),
            thumbnail: format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", entry.id),
            title: entry.title.unwrap_or_else(|| entry.id.clone()),
            duration_secs: entry
                .duration
                .filter(|d| d.is_finite() && *d >= 0.0)
                .map(|d| d.round() as u64),
            channel,
            id: entry.id,
        }
    }
}

/// Parse one JSON object per line into search results
///
/// Lines that are not valid entries are skipped and logged at debug level.
pub fn parse_search_results(stdout: &str) -> Vec<SearchResult> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<FlatEntry>(line) {
            Ok(entry) => Some(SearchResult::from(entry)),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable search line");
                None
            }
        })
        .collect()
}
