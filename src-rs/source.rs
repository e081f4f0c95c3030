//! Named image inputs: in-memory uploads, files, folders and zip archives.

use crate::error::{StitchError, StitchResult};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Extensions accepted when scanning a folder, matched case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    Memory(Vec<u8>),
    File(PathBuf),
    /// Lives in a run-scoped temp directory and may be removed after use.
    Extracted(PathBuf),
}

/// A named blob of image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    name: String,
    origin: Origin,
}

impl ImageSource {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            origin: Origin::Memory(bytes),
        }
    }

    /// Source backed by a file; named after the file name. Bytes are read on demand.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: file_name_of(&path),
            origin: Origin::File(path),
        }
    }

    fn extracted(path: PathBuf) -> Self {
        Self {
            name: file_name_of(&path),
            origin: Origin::Extracted(path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing file, if the source is not held in memory.
    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            Origin::Memory(_) => None,
            Origin::File(path) | Origin::Extracted(path) => Some(path),
        }
    }

    pub fn read_bytes(&self) -> StitchResult<Cow<'_, [u8]>> {
        match &self.origin {
            Origin::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
            Origin::File(path) | Origin::Extracted(path) => fs::read(path)
                .map(Cow::Owned)
                .map_err(|e| StitchError::io(path, e)),
        }
    }

    /// Delete the backing file if it was extracted for this run.
    ///
    /// Failures are logged; the temp directory sweeps leftovers on drop.
    pub fn release(&self) {
        if let Origin::Extracted(path) = &self.origin {
            if let Err(err) = fs::remove_file(path) {
                warn!("failed to remove extracted file {}: {err}", path.display());
            }
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// True when `name` carries one of the accepted image extensions.
pub fn is_image_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Sources for explicitly named files, in the given order.
pub fn sources_from_paths<P: AsRef<Path>>(paths: &[P]) -> StitchResult<Vec<ImageSource>> {
    paths
        .iter()
        .map(|p| {
            let path = p.as_ref();
            if !path.exists() {
                return Err(StitchError::InvalidLocation(path.to_path_buf()));
            }
            if !path.is_file() {
                return Err(StitchError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
                ));
            }
            Ok(ImageSource::from_path(path))
        })
        .collect()
}

/// Check that `dir` exists and is a directory.
pub fn validate_folder(dir: &Path) -> StitchResult<()> {
    if !dir.exists() {
        return Err(StitchError::InvalidLocation(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(StitchError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

fn list_image_files(dir: &Path) -> StitchResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| StitchError::io(dir, e))? {
        let entry = entry.map_err(|e| StitchError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        if is_image_name(&name.to_string_lossy()) {
            files.push(path);
        }
    }
    // read_dir order is platform-dependent; grouping is order-sensitive.
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Image files directly inside `dir`, sorted by file name.
pub fn sources_from_folder(dir: &Path) -> StitchResult<Vec<ImageSource>> {
    validate_folder(dir)?;
    let sources: Vec<ImageSource> = list_image_files(dir)?
        .into_iter()
        .map(ImageSource::from_path)
        .collect();
    debug!("found {} images in {}", sources.len(), dir.display());
    Ok(sources)
}

/// A zip archive unpacked into a temporary directory for one run.
///
/// The directory and anything left in it are removed when this is dropped.
pub struct ExtractedArchive {
    dir: TempDir,
    sources: Vec<ImageSource>,
}

impl ExtractedArchive {
    pub fn open(path: &Path) -> StitchResult<Self> {
        if !path.is_file() {
            return Err(StitchError::InvalidLocation(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| StitchError::io(path, e))?;
        Self::extract(zip::ZipArchive::new(file)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> StitchResult<Self> {
        Self::extract(zip::ZipArchive::new(Cursor::new(bytes))?)
    }

    fn extract<R: std::io::Read + std::io::Seek>(mut archive: zip::ZipArchive<R>) -> StitchResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("image-stitch-")
            .tempdir()
            .map_err(|e| StitchError::io(std::env::temp_dir(), e))?;
        archive.extract(dir.path())?;
        // Only the top level counts, like a folder scan.
        let sources = list_image_files(dir.path())?
            .into_iter()
            .map(ImageSource::extracted)
            .collect::<Vec<_>>();
        debug!(
            "extracted {} images into {}",
            sources.len(),
            dir.path().display()
        );
        Ok(Self { dir, sources })
    }

    pub fn sources(&self) -> &[ImageSource] {
        &self.sources
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
