use std::path::{Path, PathBuf};

use url::Url;

pub const WAYBACK_BASE_URL: &str = "https://web.archive.org";

const INDEX_TOKEN: &str = "index";

/// Local placement of one archived page: `<root>/<directory>/<filename>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPath {
    pub directory: String,
    pub filename: String,
}

impl LocalPath {
    pub fn dir_under(&self, root: &Path) -> PathBuf {
        root.join(&self.directory)
    }

    pub fn file_under(&self, root: &Path) -> PathBuf {
        root.join(&self.directory).join(&self.filename)
    }
}

#[derive(Debug, Clone)]
pub struct UrlMapper {
    archive_base: String,
}

impl Default for UrlMapper {
    fn default() -> Self {
        Self::new(WAYBACK_BASE_URL)
    }
}

impl UrlMapper {
    pub fn new(archive_base: impl Into<String>) -> Self {
        let archive_base = archive_base.into();
        Self {
            archive_base: archive_base.trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/web/{timestamp}/{original_url}`, with the original URL left untouched.
    pub fn snapshot_url(&self, original_url: &str, timestamp: &str) -> String {
        format!("{}/web/{}/{}", self.archive_base, timestamp, original_url)
    }

    pub fn local_path(&self, original_url: &str) -> LocalPath {
        local_path(original_url)
    }
}

/// Derives the storage location from the URL path alone. Query strings and
/// fragments are ignored, so URLs differing only there share a file.
pub fn local_path(original_url: &str) -> LocalPath {
    let flat = flatten_path(&url_path(original_url));
    LocalPath {
        filename: format!("{}.html", flat),
        directory: flat,
    }
}

fn url_path(original_url: &str) -> String {
    match Url::parse(original_url) {
        Ok(parsed) => parsed.path().to_string(),
        // Not an absolute URL: everything before the query/fragment is the path.
        Err(_) => original_url
            .split(&['?', '#'][..])
            .next()
            .unwrap_or("")
            .to_string(),
    }
}

fn flatten_path(path: &str) -> String {
    let mut path = path.to_string();
    if path.ends_with('/') {
        path.push_str(INDEX_TOKEN);
    }

    let decoded = urlencoding::decode_binary(path.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded);

    let flat = decoded
        .replace(&['/', '\\'][..], "_")
        .trim_matches('_')
        .to_string();

    match flat.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => flat,
    }
}
