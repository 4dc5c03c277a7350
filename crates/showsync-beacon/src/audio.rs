//! Audio asset resolution for sequence base names.
//!
//! The show controller plays sequence files that may have a companion
//! audio file with the same base name (`MyShow.fseq` -> `MyShow.mp3`).
//! The resolver probes the media directory across a fixed extension
//! priority list and exposes the match as a public URL path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

/// Audio file extensions probed for a sequence base name, in priority
/// order. The first extension that exists on disk wins.
pub const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "m4a", "mp4", "aac", "ogg", "wav"];

/// Characters escaped when a base name is embedded in a URL path segment:
/// everything outside `[A-Za-z0-9]` except `-`, `_`, `.` and `~`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Maps sequence base names to the public URL of a matching audio asset.
///
/// Lookups are memoized, including misses: the media directory is not
/// expected to change during a process lifetime, so cached results are
/// never invalidated.
#[derive(Debug)]
pub struct AudioResolver {
    music_dir: PathBuf,
    url_prefix: String,
    cache: Mutex<HashMap<String, Option<String>>>,
}

impl AudioResolver {
    /// Create a resolver over the given media directory. `url_prefix` is
    /// the public path under which that directory is served, without a
    /// trailing slash.
    pub fn new(music_dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            music_dir: music_dir.into(),
            url_prefix: url_prefix.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the audio URL for a sequence base name, or `None` when no
    /// matching file exists. An empty base never matches.
    pub fn resolve(&self, base: &str) -> Option<String> {
        if base.is_empty() {
            return None;
        }

        // A poisoned lock only means another thread panicked mid-insert;
        // the map itself is still usable.
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(hit) = cache.get(base) {
            return hit.clone();
        }

        let resolved = self.probe(base);
        cache.insert(base.to_owned(), resolved.clone());
        resolved
    }

    /// Probe the filesystem across the extension priority list.
    fn probe(&self, base: &str) -> Option<String> {
        for ext in AUDIO_EXTENSIONS {
            if self.music_dir.join(format!("{base}.{ext}")).is_file() {
                let encoded = utf8_percent_encode(base, PATH_SEGMENT);
                let url = format!("{}/{encoded}.{ext}", self.url_prefix);
                debug!(base, url, "audio asset resolved");
                return Some(url);
            }
        }
        debug!(base, "no audio asset for sequence");
        None
    }
}
