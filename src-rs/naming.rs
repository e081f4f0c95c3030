//! Output names for stitched groups.
//!
//! A policy maps the first member's name to an output name. The default
//! prepends `combined_` and keeps the original extension. Since two groups can
//! map to the same name, [`UniqueNames`] hands out `_2`, `_3`, ... variants
//! instead of letting a later entry shadow an earlier one.

use crate::error::{StitchError, StitchResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_PREFIX: &str = "combined_";
pub const DEFAULT_SUFFIX: &str = "_combined";
pub const DEFAULT_SUFFIX_EXTENSION: &str = "png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NamingPolicy {
    /// `<prefix><name>`, e.g. `combined_photo1.jpg`.
    ///
    /// The extension is kept as-is, but stitched output is always PNG, so a
    /// group led by a `.jpg`, `.gif` or `.bmp` file yields PNG bytes under that
    /// extension. Use [`NamingPolicy::Suffix`] when the name must match the
    /// content.
    Prefix { prefix: String },
    /// `<stem><suffix>.<extension>`, e.g. `photo1_combined.png`.
    Suffix { suffix: String, extension: String },
    /// The first member's name unchanged.
    KeepName,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self::Prefix {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl NamingPolicy {
    pub fn suffix() -> Self {
        Self::Suffix {
            suffix: DEFAULT_SUFFIX.to_string(),
            extension: DEFAULT_SUFFIX_EXTENSION.to_string(),
        }
    }

    pub fn name_for(&self, first_name: &str) -> String {
        match self {
            Self::Prefix { prefix } => format!("{prefix}{first_name}"),
            Self::Suffix { suffix, extension } => {
                let (stem, _) = split_extension(first_name);
                format!("{stem}{suffix}.{}", extension.trim_start_matches('.'))
            }
            Self::KeepName => first_name.to_string(),
        }
    }

    pub fn validate(&self) -> StitchResult<()> {
        match self {
            Self::Prefix { prefix } if prefix.is_empty() => Err(StitchError::invalid_options(
                "prefix naming needs a non-empty prefix",
            )),
            Self::Prefix { prefix } if prefix.contains(['/', '\\']) => Err(
                StitchError::invalid_options("prefix must not contain path separators"),
            ),
            Self::Suffix { suffix, extension } if suffix.is_empty() || extension.is_empty() => {
                Err(StitchError::invalid_options(
                    "suffix naming needs a suffix and an extension",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Split `name.ext` into (`name`, `Some("ext")`). A leading dot is not an extension.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Hands out names not yet used within one archive or folder.
#[derive(Debug, Default)]
pub struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` as used without claiming it, e.g. a file already on disk.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.taken.insert(name.into());
    }

    /// `name` itself if free, else the first free `stem_N.ext` with N >= 2.
    pub fn claim(&mut self, name: &str) -> String {
        if self.taken.insert(name.to_string()) {
            return name.to_string();
        }
        let (stem, ext) = split_extension(name);
        let mut n = 2usize;
        loop {
            let candidate = match ext {
                Some(ext) => format!("{stem}_{n}.{ext}"),
                None => format!("{stem}_{n}"),
            };
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
