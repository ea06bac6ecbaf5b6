use std::collections::HashSet;
use std::path::Path;

use nyx_core::url_util::strip_url;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlacklistError {
    #[error("blacklist file missing or empty: {0}")]
    MissingOrEmpty(String),
}

/// Set of MD5 hex digests loaded once at startup.
pub struct Blacklist {
    hashes: HashSet<String>,
}

impl Blacklist {
    /// Reads a whitespace-separated file of hex digests. A missing or
    /// empty file is a startup condition callers should treat as exit
    /// code 0 (not an error to recover from).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BlacklistError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|_| BlacklistError::MissingOrEmpty(path.display().to_string()))?;

        let hashes: HashSet<String> = contents
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        if hashes.is_empty() {
            return Err(BlacklistError::MissingOrEmpty(path.display().to_string()));
        }

        tracing::info!(count = hashes.len(), "loaded blacklist");
        Ok(Self { hashes })
    }

    /// Checks both the full URL's hash and the stripped form's hash.
    pub fn is_blacklisted(&self, url: &str) -> bool {
        let full = format!("{:x}", md5::compute(url.as_bytes()));
        if self.hashes.contains(&full) {
            return true;
        }
        let stripped = strip_url(url);
        let stripped_hash = format!("{:x}", md5::compute(stripped.as_bytes()));
        self.hashes.contains(&stripped_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile_path::TempPath {
        tempfile_path::TempPath::new(contents)
    }

    mod tempfile_path {
        use std::io::Write;
        use std::path::{Path, PathBuf};

        pub struct TempPath(PathBuf);

        impl TempPath {
            pub fn new(contents: &str) -> Self {
                let path = std::env::temp_dir().join(format!(
                    "nyx-blacklist-test-{}-{}",
                    std::process::id(),
                    contents.len()
                ));
                let mut f = std::fs::File::create(&path).unwrap();
                f.write_all(contents.as_bytes()).unwrap();
                TempPath(path)
            }
        }

        impl AsRef<Path> for TempPath {
            fn as_ref(&self) -> &Path {
                &self.0
            }
        }

        impl Drop for TempPath {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }
    }

    #[test]
    fn empty_file_is_missing_or_empty() {
        let p = write_temp("");
        assert!(matches!(
            Blacklist::load(&p),
            Err(BlacklistError::MissingOrEmpty(_))
        ));
    }

    #[test]
    fn matches_full_and_stripped_url_hash() {
        let url = "http://abc.onion/page";
        let stripped = nyx_core::url_util::strip_url(url);
        let full_hash = format!("{:x}", md5::compute(url.as_bytes()));
        let stripped_hash = format!("{:x}", md5::compute(stripped.as_bytes()));

        let p = write_temp(&format!("{} {}", full_hash, stripped_hash));
        let bl = Blacklist::load(&p).unwrap();
        assert!(bl.is_blacklisted(url));
    }

    #[test]
    fn unknown_url_is_not_blacklisted() {
        let p = write_temp("deadbeefdeadbeefdeadbeefdeadbeef");
        let bl = Blacklist::load(&p).unwrap();
        assert!(!bl.is_blacklisted("http://other.onion/"));
    }
}
