// MIT License - Copyright (c) 2026 powermax-lan-bridge authors

use tracing::{debug, warn};

use crate::error::{PowermaxError, Result};

pub(crate) const PAGE_SIZE: usize = 0x100;
const PAGE_COUNT: usize = 0x100;

type Page = [Option<u8>; PAGE_SIZE];

/// Sparse, page-addressed image of the panel's settings memory.
///
/// Up to 256 pages of 256 bytes each; pages are allocated lazily and every
/// byte slot stays "not yet known" until a download chunk fills it. This keeps
/// absent data distinct from zero — a read that touches any unknown byte fails
/// with [`PowermaxError::MissingData`] instead of zero-filling.
///
/// One store lives for one connection attempt and is cleared on reconnect.
#[derive(Debug)]
pub struct RawSettingsStore {
    pages: Vec<Option<Box<Page>>>,
}

impl Default for RawSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RawSettingsStore {
    pub fn new() -> Self {
        Self { pages: vec![None; PAGE_COUNT] }
    }

    /// Drop all downloaded data.
    pub fn clear(&mut self) {
        self.pages = vec![None; PAGE_COUNT];
    }

    /// Write a byte sequence at a global offset (`page * 256 + index`),
    /// splitting across page boundaries. Missing pages are allocated
    /// all-absent before filling. Overwrites are idempotent.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let page_min = offset / PAGE_SIZE;
        let index_min = offset % PAGE_SIZE;
        let end = offset + bytes.len() - 1;
        let page_max = end / PAGE_SIZE;
        let index_max = end % PAGE_SIZE;

        let mut src = bytes.iter();
        for page in page_min..=page_max {
            if page >= PAGE_COUNT {
                // Unreachable with 8-bit page/index wire headers
                warn!("write beyond page 0xFF dropped (offset {:#X}, {} bytes)", offset, bytes.len());
                return;
            }
            let start = if page == page_min { index_min } else { 0 };
            let stop = if page == page_max { index_max } else { PAGE_SIZE - 1 };
            let slots = self.pages[page].get_or_insert_with(|| Box::new([None; PAGE_SIZE]));
            for slot in &mut slots[start..=stop] {
                // write() is only called with exactly matching lengths
                if let Some(b) = src.next() {
                    *slot = Some(*b);
                }
            }
        }
    }

    /// Read the inclusive byte range `start..=end` relative to `page`,
    /// spanning into following pages as needed. Fails with `MissingData`
    /// if any byte of the span is still unknown.
    pub fn read(&self, page: u8, start: usize, end: usize) -> Result<Vec<u8>> {
        let offset = page as usize * PAGE_SIZE + start;
        let len = end.checked_sub(start).map(|d| d + 1).unwrap_or(0);
        let mut result = Vec::with_capacity(len);

        for global in offset..offset + len {
            let byte = self
                .pages
                .get(global / PAGE_SIZE)
                .and_then(|p| p.as_ref())
                .and_then(|p| p[global % PAGE_SIZE]);
            match byte {
                Some(b) => result.push(b),
                None => {
                    debug!("read({:#04X}, {}, {}): missing data", page, start, end);
                    return Err(PowermaxError::MissingData { page, start, end });
                }
            }
        }
        Ok(result)
    }

    /// Whether every byte of the range `start..=end` relative to `page` is
    /// known. Used to decide when a download pass has everything it asked for.
    pub fn contains(&self, page: u8, start: usize, end: usize) -> bool {
        let offset = page as usize * PAGE_SIZE + start;
        let len = end.checked_sub(start).map(|d| d + 1).unwrap_or(0);
        (offset..offset + len).all(|global| {
            self.pages
                .get(global / PAGE_SIZE)
                .and_then(|p| p.as_ref())
                .is_some_and(|p| p[global % PAGE_SIZE].is_some())
        })
    }

    /// Read a range and decode it as panel text.
    ///
    /// Returns `Ok(None)` when the first byte is the 0xFF "never provisioned"
    /// sentinel. Byte 0x00 terminates the string; 0x01/0x03/0x05 map to the
    /// accented characters the panel's character set packs into control codes;
    /// any other byte below 0x20 is dropped with a debug log. Trailing
    /// whitespace is trimmed.
    pub fn read_text(&self, page: u8, start: usize, end: usize) -> Result<Option<String>> {
        let data = self.read(page, start, end)?;
        if data.first() == Some(&0xFF) {
            return Ok(None);
        }
        let mut result = String::new();
        for &b in &data {
            match b {
                0x00 => break,
                0x01 => result.push('é'),
                0x03 => result.push('è'),
                0x05 => result.push('à'),
                b if b >= 0x20 => result.push(b as char),
                b => debug!("unhandled character code {:#04X} in settings text", b),
            }
        }
        Ok(Some(result.trim_end().to_string()))
    }
}
