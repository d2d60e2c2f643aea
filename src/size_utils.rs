//! Conversion from millimetres to PDF points, plus the standard
//! paper sizes used when nothing better is known about a page.
//!
//! Layout works in points scaled by the render scale: at scale 1.0 the
//! renderer draws one CSS pixel per point.

/// PDF user-space units per inch.
pub const PT_PER_INCH: f64 = 72.0;

/// Converts millimeters to points.
///
/// 1 point = 1/72 inch; 1 inch = 25.4 mm.
pub fn pt_from_mm(mm: f64) -> f64 {
    mm / 25.4 * PT_PER_INCH
}

/// A4 in points, rounded the way PDF producers write it.
pub fn a4_pt() -> (f64, f64) {
    (595.0, 842.0)
}

/// Letter in points.
pub fn letter_pt() -> (f64, f64) {
    (612.0, 792.0)
}

/// Resolves a paper name ("A4", "Letter") or a custom size in millimetres to
/// a size in points. Unknown names fall back to A4.
pub fn paper_pt(name: Option<&str>, custom_mm: Option<(f64, f64)>) -> (f64, f64) {
    if let Some((w, h)) = custom_mm {
        if w > 0.0 && h > 0.0 {
            return (pt_from_mm(w), pt_from_mm(h));
        }
    }
    match name {
        Some("Letter") | Some("letter") => letter_pt(),
        _ => a4_pt(),
    }
}
