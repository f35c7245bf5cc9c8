use once_cell::sync::Lazy;
use regex::Regex;

/// Recognized video URL shapes, in match order. Each has the video id as
/// its first capture group.
static URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // watch?v=<id> on any host (mirrors and alternate front-ends included)
        r"^https?://(?:www\.)?[A-Za-z0-9.-]+/watch\?v=([A-Za-z0-9_-]+)",
        // short link
        r"^https?://youtu\.be/([A-Za-z0-9_-]+)",
        r"^https?://(?:www\.)?youtube\.com/embed/([A-Za-z0-9_-]+)",
        r"^https?://(?:www\.)?youtube\.com/v/([A-Za-z0-9_-]+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Check whether a URL matches one of the recognized video URL shapes
pub fn validate_url(url: &str) -> bool {
    let url = url.trim();
    URL_PATTERNS.iter().any(|re| re.is_match(url))
}

/// Extract the video id from the first pattern that matches
pub fn extract_id(url: &str) -> Option<String> {
    let url = url.trim();
    URL_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Format a view/like count for display: 1500 -> "1.5K", 2300000 -> "2.3M"
pub fn format_count(n: u64) -> String {
    const SCALES: [(u64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];

    for (threshold, suffix) in SCALES {
        if n >= threshold {
            return format!("{:.1}{}", n as f64 / threshold as f64, suffix);
        }
    }

    n.to_string()
}

/// Location the backend serves a finished download from
pub fn artifact_url(api_url: &str, filename: &str) -> String {
    format!(
        "{}/downloads/{}",
        api_url.trim_end_matches('/'),
        urlencoding::encode(filename)
    )
}
