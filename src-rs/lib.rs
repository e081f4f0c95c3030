//! Group images by filename similarity, stitch each group side by side and
//! package the results as a zip archive (or write them back into a folder).
//!
//! ```no_run
//! use image_stitch::{build_archive, sources_from_folder, NoProgress, StitchOptions};
//! use std::path::Path;
//!
//! # fn main() -> image_stitch::StitchResult<()> {
//! let sources = sources_from_folder(Path::new("screenshots"))?;
//! let output = build_archive(sources, &StitchOptions::default(), &mut NoProgress)?;
//! std::fs::write("combined_images.zip", &output.bytes).ok();
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod compositor;
pub mod config;
pub mod error;
pub mod folder;
pub mod grouping;
pub mod naming;
pub mod progress;
pub mod settings;
pub mod similarity;
pub mod source;

pub use crate::archive::{
    build_archive, ArchiveOutput, EntryReport, GroupFailure, ARCHIVE_MIME, DEFAULT_ARCHIVE_NAME,
};
pub use crate::config::StitchOptions;
pub use crate::error::{StitchError, StitchResult};
pub use crate::folder::{combine_folder, FolderReport};
pub use crate::grouping::{group_sources, Group, Named};
pub use crate::naming::NamingPolicy;
pub use crate::progress::{NoProgress, ProgressSink};
pub use crate::settings::Settings;
pub use crate::similarity::similarity;
pub use crate::source::{
    is_image_name, sources_from_folder, sources_from_paths, ExtractedArchive, ImageSource,
};
