//! Output file naming.
//!
//! A part of `msg001.eml` written to `/out` is named
//! `/out/msg001_body_text.html` or `/out/msg001_attachment_002_report.pdf`.
//! When that name is taken, copy `n` is
//! `/out/msg001_attachment_002_copy_00n_report.pdf`. Downstream consumers
//! parse these names, so the format must not change.

use std::fmt;
use std::path::{Path, PathBuf};

use mailsplit_mime::{Part, PartRole};

use crate::error::{PipelineError, Result};

/// Role segment of an output name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTag {
    Body,
    /// 1-based attachment index.
    Attachment(usize),
}

impl RoleTag {
    pub fn for_part(part: &Part) -> Self {
        match part.role {
            PartRole::Body => Self::Body,
            PartRole::Attachment | PartRole::NestedMessage => {
                Self::Attachment(part.attachment_index().unwrap_or(part.ordinal))
            }
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body => write!(f, "body"),
            Self::Attachment(index) => write!(f, "attachment_{index:03}"),
        }
    }
}

/// Derives output paths for the parts of one source file. Never touches
/// the filesystem.
#[derive(Debug, Clone)]
pub struct OutputPathBuilder {
    output_dir: PathBuf,
    base_name: String,
}

impl OutputPathBuilder {
    pub fn new(output_dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_name: base_name.into(),
        }
    }

    /// Builder for a source file, writing into `output_dir` or, when that
    /// is `None`, next to the source.
    pub fn for_source(source: &Path, output_dir: Option<&Path>) -> Result<Self> {
        let base_name = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| {
                PipelineError::InvalidInput(format!(
                    "source path has no file name: {}",
                    source.display()
                ))
            })?;

        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };

        Ok(Self::new(output_dir, base_name))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn build(&self, part: &Part) -> OutputPath {
        self.build_named(RoleTag::for_part(part), &part.filename)
    }

    pub fn build_named(&self, role: RoleTag, filename: &str) -> OutputPath {
        OutputPath {
            dir: self.output_dir.clone(),
            prefix: format!("{}_{role}", self.base_name),
            filename: filename.to_string(),
        }
    }
}

/// Deterministic output path of one part and its copy variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPath {
    dir: PathBuf,
    /// `{base}_{roleTag}`
    prefix: String,
    filename: String,
}

impl OutputPath {
    /// The name used when nothing collides.
    pub fn base(&self) -> PathBuf {
        self.candidate(0)
    }

    /// Candidate for `copy`; copy 0 has no suffix.
    pub fn candidate(&self, copy: u32) -> PathBuf {
        let name = if copy == 0 {
            format!("{}_{}", self.prefix, self.filename)
        } else {
            format!("{}_copy_{copy:03}_{}", self.prefix, self.filename)
        };
        self.dir.join(name)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Lower-cased extension of the part filename.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }
}
