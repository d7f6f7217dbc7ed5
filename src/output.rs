//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Looks are shown by their label and gallery position first; the filename a
//! look would be saved under comes second, as an indented context line. That
//! keeps `list` readable as a lookbook while still telling the user exactly
//! what `archive` and `export` will write.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! portrait.jpg (image/jpeg, 2.4 MB)
//!     Dimensions: 640x480
//!     Advisory: Low resolution (640x480). For best results, use an image at least 800x1000px.
//! ```
//!
//! ## List
//!
//! ```text
//! Natural & Everyday Looks
//! 001 Soft Beach Waves
//!     File: natural-looks/Soft-Beach-Waves.png
//!     Note: Loose texture, low maintenance
//!
//! Glamorous & Evening Looks
//!     No looks in this category.
//! ```
//!
//! ## Archive
//!
//! ```text
//! hairstyle-studio-looks.zip (3 looks)
//!     natural-looks/Soft-Beach-Waves.png
//!     natural-looks/Sleek-Low-Bun.png
//!     glamorous-looks/Old-Hollywood-Curls.png
//! Skipped 1 look
//!     n3: HTTP 404: not found
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::archive::ArchiveOutput;
use crate::download::DownloadReport;
use crate::intake::{RejectedReason, UploadedImage};
use crate::naming;
use crate::types::{Category, HairstyleLook, LookCollection};

pub const EMPTY_CATEGORY_MESSAGE: &str = "No looks in this category.";

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check(upload: &UploadedImage) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}, {})",
        upload.name(),
        upload.media_type(),
        format_size(upload.bytes().len())
    )];
    match upload.dimensions() {
        Some(dims) => lines.push(format!("{}Dimensions: {dims}", indent(1))),
        None => lines.push(format!("{}Dimensions: unknown (could not decode)", indent(1))),
    }
    for advisory in upload.advisories() {
        lines.push(format!("{}Advisory: {advisory}", indent(1)));
    }
    lines
}

pub fn format_rejection(name: &str, reason: &RejectedReason) -> Vec<String> {
    vec![format!("{name}: rejected, {reason}")]
}

pub fn print_check(upload: &UploadedImage) {
    for line in format_check(upload) {
        println!("{line}");
    }
}

pub fn print_rejection(name: &str, reason: &RejectedReason) {
    for line in format_rejection(name, reason) {
        println!("{line}");
    }
}

// ============================================================================
// List
// ============================================================================

fn look_lines(index: usize, category: Category, look: &HairstyleLook) -> Vec<String> {
    let filename = naming::look_filename(&look.label, &look.id);
    let mut lines = vec![
        format!("{} {}", format_index(index), look.label),
        format!("{}File: {}/{filename}", indent(1), category.folder()),
    ];
    if !look.note.is_empty() {
        lines.push(format!("{}Note: {}", indent(1), look.note));
    }
    lines
}

/// Both galleries, natural first. The `File:` line is the single-look
/// export name; archive entries may add a `-2` suffix on label clashes.
pub fn format_gallery(collection: &LookCollection) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, category) in Category::ALL.into_iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(category.title().to_string());
        let looks = collection.looks(category);
        if looks.is_empty() {
            lines.push(format!("{}{EMPTY_CATEGORY_MESSAGE}", indent(1)));
            continue;
        }
        for (pos, look) in looks.iter().enumerate() {
            lines.extend(look_lines(pos + 1, category, look));
        }
    }
    lines
}

pub fn print_gallery(collection: &LookCollection) {
    for line in format_gallery(collection) {
        println!("{line}");
    }
}

// ============================================================================
// Archive / export
// ============================================================================

pub fn format_archive(output: &ArchiveOutput) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}, {})",
        output.filename,
        plural(output.entries.len(), "look"),
        format_size(output.bytes.len())
    )];
    for entry in &output.entries {
        lines.push(format!("{}{}", indent(1), entry.path));
    }
    if !output.skipped.is_empty() {
        lines.push(format!("Skipped {}", plural(output.skipped.len(), "look")));
        for failure in &output.skipped {
            lines.push(format!("{}{}: {}", indent(1), failure.look_id, failure.source));
        }
    }
    lines
}

pub fn print_archive(output: &ArchiveOutput) {
    for line in format_archive(output) {
        println!("{line}");
    }
}

pub fn format_downloads(reports: &[DownloadReport]) -> Vec<String> {
    reports
        .iter()
        .map(|report| match &report.result {
            Ok(path) => format!("Saved {} → {}", report.filename, path.display()),
            Err(e) => format!("Failed {}: {e}", report.filename),
        })
        .collect()
}

pub fn print_downloads(reports: &[DownloadReport]) {
    for line in format_downloads(reports) {
        println!("{line}");
    }
}
