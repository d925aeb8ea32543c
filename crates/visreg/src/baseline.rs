//! Named baseline persistence.
//!
//! One PNG per baseline at `{root}/{sanitized(name)}.png`. Captures always
//! overwrite; the store never creates a baseline on its own.

use crate::codec::{self, IMAGE_EXTENSION};
use crate::result::{VisregError, VisregResult};
use image::RgbaImage;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Sanitized stems longer than this are shortened and suffixed with a digest
const MAX_STEM_LEN: usize = 120;

/// Characters kept from the original name when a stem is shortened
const TRUNCATED_PREFIX_LEN: usize = 100;

/// Distinguishes temp files of concurrent writers within one process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Map a baseline name to a filesystem-safe file stem.
///
/// ASCII letters, digits, `-` and `_` are kept; everything else (path
/// separators, dots, spaces, non-ASCII) becomes `_`. A trailing `.png` is
/// dropped first so `"home.png"` and `"home"` share a file. The mapping is
/// deterministic.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let trimmed = strip_extension(name);
    let stem: String = trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.len() <= MAX_STEM_LEN {
        return stem;
    }
    let digest = Sha256::digest(name.as_bytes());
    let suffix: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
    format!("{}-{suffix}", &stem[..TRUNCATED_PREFIX_LEN])
}

fn strip_extension(name: &str) -> &str {
    let suffix_len = IMAGE_EXTENSION.len() + 1;
    let Some(split) = name.len().checked_sub(suffix_len).filter(|&i| i > 0) else {
        return name;
    };
    // `get` is None when `split` falls inside a multi-byte character
    match (name.get(..split), name.get(split..)) {
        (Some(head), Some(tail))
            if tail.starts_with('.') && tail[1..].eq_ignore_ascii_case(IMAGE_EXTENSION) =>
        {
            head
        }
        _ => name,
    }
}

/// Directory of baseline images
#[derive(Debug, Clone)]
pub struct BaselineStore {
    root: PathBuf,
}

impl BaselineStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// first capture.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a baseline name maps to
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root
            .join(format!("{}.{IMAGE_EXTENSION}", sanitize_name(name)))
    }

    /// Whether a baseline file exists for `name`
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Store `image` as the baseline for `name`, replacing any previous one.
    ///
    /// The file is written to a temporary name and renamed into place, so
    /// readers see either the old or the new baseline, never a partial one.
    /// Concurrent captures of one name: last writer wins.
    ///
    /// # Errors
    ///
    /// Returns [`VisregError::InvalidArgument`] for an empty name or a
    /// zero-sized image. Write failures are logged and give `Ok(false)`.
    pub fn capture(&self, name: &str, image: &RgbaImage) -> VisregResult<bool> {
        validate_name(name)?;
        if codec::is_empty(image) {
            return Err(VisregError::invalid_argument(format!(
                "cannot capture empty image ({}x{}) as baseline '{name}'",
                image.width(),
                image.height()
            )));
        }

        let path = self.path_for(name);
        let written = codec::encode_png(image).and_then(|bytes| {
            self.write_atomic(&path, &bytes)?;
            Ok(bytes.len())
        });

        match written {
            Ok(bytes) => {
                info!(
                    baseline = name,
                    path = %path.display(),
                    width = image.width(),
                    height = image.height(),
                    bytes,
                    "captured baseline"
                );
                Ok(true)
            }
            Err(e) => {
                warn!(baseline = name, path = %path.display(), error = %e, "failed to capture baseline");
                Ok(false)
            }
        }
    }

    /// Load the baseline for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`VisregError::BaselineNotFound`] if nothing was captured
    /// under `name`, or [`VisregError::Decode`] if the file is corrupt.
    pub fn read(&self, name: &str) -> VisregResult<RgbaImage> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(VisregError::BaselineNotFound {
                name: name.to_string(),
            });
        }
        debug!(baseline = name, path = %path.display(), "reading baseline");
        codec::load(&path)
    }

    /// Delete the baseline for `name`. Returns whether a file was removed.
    pub fn remove(&self, name: &str) -> VisregResult<bool> {
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(baseline = name, path = %path.display(), "removed baseline");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Stored baseline stems, sorted. An absent root yields an empty list.
    pub fn names(&self) -> VisregResult<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_image = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(IMAGE_EXTENSION));
            if !is_image || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.starts_with('.') {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> VisregResult<()> {
        fs::create_dir_all(&self.root)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("baseline");
        let tmp_path = self.root.join(format!(
            ".{stem}.{}-{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = fs::write(&tmp_path, bytes).and_then(|()| fs::rename(&tmp_path, path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> VisregResult<()> {
    if strip_extension(name).trim().is_empty() {
        return Err(VisregError::invalid_argument("baseline name must not be empty"));
    }
    Ok(())
}
