//! Filename derivation for exported looks.
//!
//! Every export path (single download and archive entries) names files from the
//! look's display label: each run of whitespace becomes one hyphen, and the
//! extension is always `.png`, the generation service's output format.
//!
//! - `"Soft Beach Waves"` → `Soft-Beach-Waves.png`
//! - `"Sleek  Bob"` → `Sleek-Bob.png`
//! - `"Already-Hyphenated"` → `Already-Hyphenated.png`
//!
//! Path separators are also mapped to hyphens so a label can never escape its
//! category folder inside an archive.

use std::collections::HashSet;

/// Extension of every exported image.
pub const IMAGE_EXTENSION: &str = "png";

/// Replace each whitespace run (and any path separator) with a single hyphen.
///
/// Idempotent: `label_slug(&label_slug(x)) == label_slug(x)`.
pub fn label_slug(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut in_run = false;
    for ch in label.chars() {
        if ch.is_whitespace() {
            if !in_run {
                slug.push('-');
                in_run = true;
            }
            continue;
        }
        in_run = false;
        if ch == '/' || ch == '\\' {
            slug.push('-');
        } else {
            slug.push(ch);
        }
    }
    slug
}

/// Filename for a look: `<label-with-hyphens>.png`.
///
/// Labels that slug to nothing usable (empty, or only hyphens) fall back to
/// `fallback`, which callers pass as the look id.
pub fn look_filename(label: &str, fallback: &str) -> String {
    let slug = label_slug(label);
    let stem = if slug.chars().all(|c| c == '-') {
        label_slug(fallback)
    } else {
        slug
    };
    format!("{stem}.{IMAGE_EXTENSION}")
}

/// Return `name` unless already taken, else `stem-2.ext`, `stem-3.ext`, ...
///
/// The returned name is recorded in `taken`.
pub fn unique_filename(name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (name, String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{stem}-{n}{ext}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
