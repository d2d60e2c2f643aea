//! Byte-level PDF probe.
//!
//! Scans raw bytes for a handful of structural markers without parsing the
//! document: the `/Count` of the page tree, the first `/MediaBox` and an
//! `/Encrypt` entry. The result seeds the estimated phase of the page
//! geometry before the renderer has measured anything, and lets the file
//! drop surface reject obvious non-PDFs early.

use serde::Serialize;

use crate::schema::PageSize;

/// Counts above this are treated as garbage.
const MAX_PAGES: usize = 1_000_000;
/// Bytes searched after a `/Pages` marker for its `/Count`.
const COUNT_WINDOW: usize = 500;
/// Bytes searched after `/MediaBox` for the array.
const MEDIABOX_WINDOW: usize = 100;

/// What a probe could tell about a PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfProbe {
    pub has_header: bool,
    pub page_count_hint: Option<usize>,
    pub first_page_size: Option<PageSize>,
    pub has_encrypt_marker: bool,
}

impl PdfProbe {
    pub fn scan(bytes: &[u8]) -> Self {
        Self {
            has_header: has_pdf_header(bytes),
            page_count_hint: count_pages(bytes),
            first_page_size: first_media_box(bytes),
            has_encrypt_marker: find(bytes, b"/Encrypt", 0).is_some(),
        }
    }

    /// Estimated sizes for every page: the first media box (or `fallback`)
    /// repeated `page_count` times.
    pub fn estimated_sizes(&self, page_count: usize, fallback: PageSize) -> Vec<PageSize> {
        vec![self.first_page_size.unwrap_or(fallback); page_count]
    }
}

/// `%PDF-` within the first KiB, as readers tolerate leading junk.
pub fn has_pdf_header(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    find(head, b"%PDF-", 0).is_some()
}

/// Largest `/Count` that follows a `/Pages` marker; the root of the page tree
/// carries the total, intermediate nodes carry smaller counts.
pub fn count_pages(bytes: &[u8]) -> Option<usize> {
    let mut max_count = 0;
    let mut pos = 0;
    while let Some(i) = find(bytes, b"/Pages", pos) {
        let end = (i + COUNT_WINDOW).min(bytes.len());
        if let Some(count) = find_count(bytes, i, end) {
            if count > max_count && count < MAX_PAGES {
                max_count = count;
            }
        }
        pos = i + 1;
    }
    (max_count > 0).then_some(max_count)
}

/// Dimensions of the first `/MediaBox [x0 y0 x1 y1]`.
pub fn first_media_box(bytes: &[u8]) -> Option<PageSize> {
    let mut search = 0;
    while let Some(i) = find(bytes, b"/MediaBox", search) {
        search = i + 1;
        let end = (i + 9 + MEDIABOX_WINDOW).min(bytes.len());
        let mut pos = i + 9;
        while pos < end && bytes[pos] != b'[' {
            pos += 1;
        }
        if pos >= end {
            continue;
        }
        pos += 1;

        let mut numbers = Vec::with_capacity(4);
        while numbers.len() < 4 && pos < end {
            while pos < end && is_whitespace(bytes[pos]) {
                pos += 1;
            }
            if pos >= end || bytes[pos] == b']' {
                break;
            }
            match parse_float(bytes, pos, end) {
                Some((num, next)) => {
                    numbers.push(num);
                    pos = next;
                }
                None => break,
            }
        }

        if numbers.len() == 4 {
            let width = (numbers[2] - numbers[0]).abs();
            let height = (numbers[3] - numbers[1]).abs();
            if width > 0.0 && width < 10000.0 && height > 0.0 && height < 10000.0 {
                return Some(PageSize::new(width, height));
            }
        }
    }
    None
}

fn find(bytes: &[u8], pattern: &[u8], from: usize) -> Option<usize> {
    if from >= bytes.len() || pattern.len() > bytes.len() - from {
        return None;
    }
    bytes[from..]
        .windows(pattern.len())
        .position(|w| w == pattern)
        .map(|p| p + from)
}

fn find_count(bytes: &[u8], start: usize, end: usize) -> Option<usize> {
    let i = find(&bytes[..end], b"/Count", start)?;
    let mut pos = i + 6;
    while pos < end && is_whitespace(bytes[pos]) {
        pos += 1;
    }

    let mut num = 0usize;
    let mut found_digit = false;
    while pos < end && bytes[pos].is_ascii_digit() {
        found_digit = true;
        num = num * 10 + (bytes[pos] - b'0') as usize;
        pos += 1;
        if num > MAX_PAGES {
            return None;
        }
    }
    found_digit.then_some(num)
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\0' | b'\x0c')
}

fn parse_float(bytes: &[u8], start: usize, end: usize) -> Option<(f64, usize)> {
    let mut pos = start;
    if pos < end && (bytes[pos] == b'-' || bytes[pos] == b'+') {
        pos += 1;
    }
    while pos < end && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
        pos += 1;
    }
    if pos == start {
        return None;
    }
    let text = std::str::from_utf8(&bytes[start..pos]).ok()?;
    text.parse::<f64>().ok().map(|n| (n, pos))
}
