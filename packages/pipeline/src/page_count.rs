//! Best-effort page counting for output files.
//!
//! Page counts are catalog metadata only. Callers treat any error as a
//! count of 0.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::bytes::Regex;

use crate::error::{PipelineError, Result};

/// Page objects in a PDF. `\b` keeps `/Type /Pages` out.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PDF_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Type\s*/Page\b").expect("valid regex"));

/// Upper bound on TIFF directories walked, against corrupt offset chains.
const MAX_TIFF_PAGES: u32 = 10_000;

#[async_trait]
pub trait PageCounter: Send + Sync {
    async fn count_pages(&self, path: &Path) -> Result<u32>;
}

/// Reports 0 pages for everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPageCounter;

#[async_trait]
impl PageCounter for NoPageCounter {
    async fn count_pages(&self, _path: &Path) -> Result<u32> {
        Ok(0)
    }
}

/// Counts pages by sniffing the file contents.
///
/// PDF page objects and TIFF directories are counted, single-frame raster
/// images are one page, everything else is 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPageCounter;

#[async_trait]
impl PageCounter for HeuristicPageCounter {
    async fn count_pages(&self, path: &Path) -> Result<u32> {
        let bytes = tokio::fs::read(path).await?;
        count_pages_in(&bytes)
    }
}

pub fn count_pages_in(bytes: &[u8]) -> Result<u32> {
    if bytes.starts_with(b"%PDF-") {
        let pages = PDF_PAGE.find_iter(bytes).count();
        return Ok(u32::try_from(pages).unwrap_or(u32::MAX));
    }
    if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        return count_tiff_directories(bytes);
    }
    if is_single_frame_image(bytes) {
        return Ok(1);
    }
    Ok(0)
}

fn is_single_frame_image(bytes: &[u8]) -> bool {
    bytes.starts_with(b"\x89PNG\r\n\x1a\n")
        || bytes.starts_with(b"\xff\xd8\xff")
        || bytes.starts_with(b"GIF87a")
        || bytes.starts_with(b"GIF89a")
        || bytes.starts_with(b"BM")
}

fn count_tiff_directories(bytes: &[u8]) -> Result<u32> {
    let little_endian = bytes.starts_with(b"II");
    let read_u16 = |at: usize| -> Result<u16> {
        let raw: [u8; 2] = bytes
            .get(at..at + 2)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| truncated_tiff(at))?;
        Ok(if little_endian {
            u16::from_le_bytes(raw)
        } else {
            u16::from_be_bytes(raw)
        })
    };
    let read_u32 = |at: usize| -> Result<u32> {
        let raw: [u8; 4] = bytes
            .get(at..at + 4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| truncated_tiff(at))?;
        Ok(if little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        })
    };

    let mut offset = read_u32(4)? as usize;
    let mut seen = HashSet::new();
    let mut pages = 0;

    while offset != 0 {
        if !seen.insert(offset) || pages >= MAX_TIFF_PAGES {
            return Err(PipelineError::PageCount(format!(
                "TIFF directory chain loops at offset {offset}"
            )));
        }
        let entries = usize::from(read_u16(offset)?);
        pages += 1;
        offset = read_u32(offset + 2 + entries * 12)? as usize;
    }

    Ok(pages)
}

fn truncated_tiff(at: usize) -> PipelineError {
    PipelineError::PageCount(format!("TIFF truncated at offset {at}"))
}
