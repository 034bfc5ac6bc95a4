//! Image lifecycle for stock color variants.
//!
//! Every persisted variant carries exactly three images, one per
//! [`ImageSlot`]. Uploaded files are stored under an upload root; rows keep
//! the servable path relative to that root. Files are removed best-effort
//! when their variant goes away: failures are logged, never surfaced.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::types::DbId;

/// Number of images attached to every variant.
pub const IMAGES_PER_VARIANT: usize = 3;

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// The three image slots of a variant, in upload order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    Stock,
    Color,
    Removal,
}

impl ImageSlot {
    pub const ALL: [ImageSlot; IMAGES_PER_VARIANT] =
        [ImageSlot::Stock, ImageSlot::Color, ImageSlot::Removal];

    /// Column name of the slot, also the prefix of update upload fields.
    pub fn field_prefix(self) -> &'static str {
        match self {
            ImageSlot::Stock => "stock_image",
            ImageSlot::Color => "color_image",
            ImageSlot::Removal => "removal_image",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.field_prefix() == s)
    }
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_prefix())
    }
}

// ---------------------------------------------------------------------------
// Files and references
// ---------------------------------------------------------------------------

/// A file already written to disk by the upload decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field_name: String,
    pub original_name: String,
    pub stored_path: PathBuf,
}

/// An image as stored on a variant row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Path relative to the upload root, `/`-separated.
    pub path: String,
    pub original_name: String,
}

/// The three images of one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantImages {
    pub stock: ImageRef,
    pub color: ImageRef,
    pub removal: ImageRef,
}

impl VariantImages {
    pub fn get(&self, slot: ImageSlot) -> &ImageRef {
        match slot {
            ImageSlot::Stock => &self.stock,
            ImageSlot::Color => &self.color,
            ImageSlot::Removal => &self.removal,
        }
    }

    pub fn refs(&self) -> [&ImageRef; IMAGES_PER_VARIANT] {
        [&self.stock, &self.color, &self.removal]
    }

    pub fn into_refs(self) -> [ImageRef; IMAGES_PER_VARIANT] {
        [self.stock, self.color, self.removal]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("{variants} variant(s) need {expected} image file(s), received {received}")]
    FileCount {
        variants: usize,
        expected: usize,
        received: usize,
    },

    #[error("Stored file {0} is outside the upload directory")]
    OutsideRoot(PathBuf),

    #[error("Unsafe image path: {0}")]
    UnsafePath(String),
}

// ---------------------------------------------------------------------------
// Create path: positional assignment
// ---------------------------------------------------------------------------

/// Every variant must come with exactly three files.
pub fn check_file_count(variants: usize, files: usize) -> Result<(), ImageError> {
    let expected = variants * IMAGES_PER_VARIANT;
    if expected != files {
        return Err(ImageError::FileCount {
            variants,
            expected,
            received: files,
        });
    }
    Ok(())
}

/// Assign uploaded files to variants in fixed groups of three, in
/// submission order: `[stock, color, removal]` for the first variant, then
/// the next three for the second, and so on.
pub fn group_in_threes(
    upload_root: &Path,
    files: &[UploadedFile],
    variant_count: usize,
) -> Result<Vec<VariantImages>, ImageError> {
    check_file_count(variant_count, files.len())?;

    files
        .chunks_exact(IMAGES_PER_VARIANT)
        .map(|group| {
            let image = |file: &UploadedFile| -> Result<ImageRef, ImageError> {
                Ok(ImageRef {
                    path: servable_path(upload_root, &file.stored_path)?,
                    original_name: file.original_name.clone(),
                })
            };
            Ok(VariantImages {
                stock: image(&group[0])?,
                color: image(&group[1])?,
                removal: image(&group[2])?,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Path transforms
// ---------------------------------------------------------------------------

/// Map a stored path to the `/`-separated path relative to the upload root.
pub fn servable_path(upload_root: &Path, stored: &Path) -> Result<String, ImageError> {
    let relative = stored
        .strip_prefix(upload_root)
        .map_err(|_| ImageError::OutsideRoot(stored.to_path_buf()))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return Err(ImageError::OutsideRoot(stored.to_path_buf())),
        }
    }
    if parts.is_empty() {
        return Err(ImageError::OutsideRoot(stored.to_path_buf()));
    }
    Ok(parts.join("/"))
}

/// Map a servable path back to its location under the upload root.
///
/// Absolute paths and paths that climb out of the root are refused.
pub fn stored_path(upload_root: &Path, servable: &str) -> Result<PathBuf, ImageError> {
    let unsafe_path = || ImageError::UnsafePath(servable.to_string());
    if servable.is_empty() || servable.starts_with('/') || servable.starts_with('\\') {
        return Err(unsafe_path());
    }

    let mut path = upload_root.to_path_buf();
    for part in servable.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => return Err(unsafe_path()),
            p if p.contains(':') => return Err(unsafe_path()),
            p => path.push(p),
        }
    }
    Ok(path)
}

// ---------------------------------------------------------------------------
// Update path: uploads keyed by variant and slot
// ---------------------------------------------------------------------------

/// Upload field name for `slot` of `variant_id`, e.g. `stock_image_-1`.
pub fn update_field_name(variant_id: DbId, slot: ImageSlot) -> String {
    format!("{}_{}", slot.field_prefix(), variant_id)
}

/// Inverse of [`update_field_name`].
pub fn parse_update_field(name: &str) -> Option<(DbId, ImageSlot)> {
    ImageSlot::ALL.into_iter().find_map(|slot| {
        let id = name.strip_prefix(slot.field_prefix())?.strip_prefix('_')?;
        id.parse::<DbId>().ok().map(|id| (id, slot))
    })
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

/// Delete the files behind `refs`, logging failures. Returns how many were
/// removed.
pub async fn delete_best_effort<'a, I>(upload_root: &Path, refs: I) -> usize
where
    I: IntoIterator<Item = &'a ImageRef>,
{
    let paths: Vec<PathBuf> = refs
        .into_iter()
        .filter_map(|image| match stored_path(upload_root, &image.path) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping image deletion");
                None
            }
        })
        .collect();

    let mut removed = 0;
    for path in paths {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete image file");
            }
        }
    }
    removed
}

/// Remove freshly uploaded files after a request was rejected.
pub async fn discard_uploads<'a, I>(files: I)
where
    I: IntoIterator<Item = &'a UploadedFile>,
{
    let paths: Vec<&Path> = files.into_iter().map(|f| f.stored_path.as_path()).collect();
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to discard upload");
        }
    }
}
