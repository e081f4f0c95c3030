//! In-place folder mode.
//!
//! Stitched images are written next to their originals and the originals are
//! removed once the stitched file is safely on disk. Single images are left
//! alone. A group that fails keeps all of its files.

use crate::archive::GroupFailure;
use crate::compositor::{composite, encode_png};
use crate::config::StitchOptions;
use crate::error::{StitchError, StitchResult};
use crate::grouping::{group_sources, Group};
use crate::naming::UniqueNames;
use crate::progress::{fraction, ProgressSink};
use crate::source::{sources_from_folder, validate_folder};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedFile {
    pub path: PathBuf,
    pub members: Vec<String>,
    pub size: (u32, u32),
    /// Originals that could not be deleted after writing.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub leftovers: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderReport {
    pub folder: PathBuf,
    pub dry_run: bool,
    pub combined: Vec<CombinedFile>,
    pub untouched: Vec<String>,
    pub failures: Vec<GroupFailure>,
}

fn existing_names(dir: &Path) -> StitchResult<UniqueNames> {
    let mut names = UniqueNames::new();
    for entry in fs::read_dir(dir).map_err(|e| StitchError::io(dir, e))? {
        let entry = entry.map_err(|e| StitchError::io(dir, e))?;
        names.reserve(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

fn write_group(group: &Group, target: &Path, dry_run: bool) -> StitchResult<CombinedFile> {
    let canvas = composite(group)?;
    let size = canvas.dimensions();
    let mut leftovers = Vec::new();

    if !dry_run {
        let name = target.display().to_string();
        let bytes = encode_png(canvas, &name)?;
        fs::write(target, bytes).map_err(|e| StitchError::io(target, e))?;
        for member in group.members() {
            let Some(path) = member.path() else { continue };
            if let Err(err) = fs::remove_file(path) {
                warn!("failed to delete original {}: {err}", path.display());
                leftovers.push(path.to_path_buf());
            }
        }
    }

    Ok(CombinedFile {
        path: target.to_path_buf(),
        members: group.names(),
        size,
        leftovers,
    })
}

/// Stitch similar images inside `dir` and replace them with the result.
///
/// The folder is checked before anything is read. With `dry_run` every group
/// is still decoded and stitched, but nothing is written or deleted.
pub fn combine_folder(
    dir: &Path,
    options: &StitchOptions,
    dry_run: bool,
    progress: &mut impl ProgressSink,
) -> StitchResult<FolderReport> {
    options.validate()?;
    validate_folder(dir)?;

    let groups = group_sources(sources_from_folder(dir)?, options);
    let total = groups.len();
    let mut names = existing_names(dir)?;
    let mut report = FolderReport {
        folder: dir.to_path_buf(),
        dry_run,
        ..Default::default()
    };
    info!("combining {} groups in {}", total, dir.display());

    for (index, group) in groups.into_iter().enumerate() {
        if group.is_singleton() {
            report.untouched.push(group.first().name().to_string());
        } else {
            let name = names.claim(&options.naming.name_for(group.first().name()));
            let target = dir.join(&name);
            match write_group(&group, &target, dry_run) {
                Ok(combined) => {
                    debug!("combined {} images into {}", group.len(), target.display());
                    report.combined.push(combined);
                }
                Err(err) => {
                    warn!("skipping group starting at {}: {err}", group.first().name());
                    report.failures.push(GroupFailure {
                        members: group.names(),
                        error: err.to_string(),
                    });
                }
            }
        }
        progress.report(fraction(index + 1, total));
    }

    Ok(report)
}
