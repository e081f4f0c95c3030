//! Group -> stitch -> name -> zip.

use crate::compositor::{composite, encode_png};
use crate::config::StitchOptions;
use crate::error::{StitchError, StitchResult};
use crate::grouping::{group_sources, Group};
use crate::naming::UniqueNames;
use crate::progress::{fraction, ProgressSink};
use crate::source::ImageSource;
use serde::Serialize;
use std::io::{Cursor, Write};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const DEFAULT_ARCHIVE_NAME: &str = "combined_images.zip";
pub const ARCHIVE_MIME: &str = "application/zip";

/// One written archive entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryReport {
    pub name: String,
    pub members: Vec<String>,
    pub bytes: usize,
    pub composited: bool,
    /// Composite dimensions; absent for passthrough entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<(u32, u32)>,
}

/// A group that was skipped because stitching or reading failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupFailure {
    pub members: Vec<String>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveOutput {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub entries: Vec<EntryReport>,
    pub failures: Vec<GroupFailure>,
}

impl ArchiveOutput {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Payload {
    bytes: Vec<u8>,
    size: Option<(u32, u32)>,
}

fn render_group(group: &Group, entry_name: &str) -> StitchResult<Payload> {
    if group.is_singleton() {
        let bytes = group.first().read_bytes()?.into_owned();
        return Ok(Payload { bytes, size: None });
    }
    let canvas = composite(group)?;
    let size = canvas.dimensions();
    let bytes = encode_png(canvas, entry_name)?;
    Ok(Payload {
        bytes,
        size: Some(size),
    })
}

fn write_entry(
    writer: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    bytes: &[u8],
    file_options: SimpleFileOptions,
) -> StitchResult<()> {
    writer.start_file(name, file_options)?;
    writer
        .write_all(bytes)
        .map_err(|e| StitchError::io(name, e))
}

/// Group `sources`, stitch every multi-member group and zip the results.
///
/// Each group yields one deflated entry named by `options.naming`, made unique
/// within the archive. Singletons are stored with their original bytes. A
/// group that fails to read or decode is skipped and listed in
/// [`ArchiveOutput::failures`]; the run carries on. `progress` gets
/// `(i + 1) / groups` after every group, failed or not. A zip error while
/// writing one entry is recorded the same way; only an error while finishing
/// the archive itself is returned as `Err`, since no readable archive exists then.
pub fn build_archive(
    sources: Vec<ImageSource>,
    options: &StitchOptions,
    progress: &mut impl ProgressSink,
) -> StitchResult<ArchiveOutput> {
    options.validate()?;

    let groups = group_sources(sources, options);
    let total = groups.len();
    info!("archiving {} images in {} groups", groups.iter().map(Group::len).sum::<usize>(), total);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let file_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut names = UniqueNames::new();
    let mut entries = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (index, group) in groups.into_iter().enumerate() {
        let proposed = options.naming.name_for(group.first().name());

        let written = render_group(&group, &proposed).and_then(|payload| {
            let name = names.claim(&proposed);
            write_entry(&mut writer, &name, &payload.bytes, file_options)?;
            Ok((name, payload))
        });

        match written {
            Ok((name, payload)) => {
                debug!("wrote entry {name} ({} bytes)", payload.bytes.len());
                entries.push(EntryReport {
                    name,
                    members: group.names(),
                    bytes: payload.bytes.len(),
                    composited: !group.is_singleton(),
                    size: payload.size,
                });
            }
            Err(err) => {
                warn!("skipping group starting at {}: {err}", group.first().name());
                failures.push(GroupFailure {
                    members: group.names(),
                    error: err.to_string(),
                });
            }
        }

        for member in group.members() {
            member.release();
        }
        progress.report(fraction(index + 1, total));
    }

    let bytes = writer.finish()?.into_inner();
    info!(
        "archive ready: {} entries, {} skipped groups, {} bytes",
        entries.len(),
        failures.len(),
        bytes.len()
    );
    Ok(ArchiveOutput {
        bytes,
        entries,
        failures,
    })
}
