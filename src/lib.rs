//! # Hairstyle Studio
//!
//! The core of a hairstyle try-on studio. A user uploads a portrait, picks a
//! face shape and hair length, and an external generation service answers
//! with two galleries of hairstyle looks. This crate owns everything around
//! that call: taking in the portrait, holding the results, and getting the
//! looks out again as single images or one zip archive.
//!
//! # Architecture: One Session, Four Parts
//!
//! ```text
//! 1. Intake     portrait bytes  →  UploadedImage     (validate, preview, measure, advise)
//! 2. Generate   UploadedImage   →  LookCollection    (external service)
//! 3. Archive    LookCollection  →  looks.zip         (fetch all, one folder per gallery)
//! 4. Export     HairstyleLook   →  <Label>.png       (one look, fire-and-forget)
//! ```
//!
//! Everything lives only as long as the session. Nothing is persisted between
//! runs besides the files the user explicitly downloads.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`intake`] | Upload state machine: drop zone, previews, stale-measurement discard, advisories, submission gate |
//! | [`session`] | Upload → generating → results → start over |
//! | [`generation`] | Boundary to the hairstyle generation service (`reqwest` multipart) |
//! | [`archive`] | Download-all: concurrent fetch, failure policy, zip packaging |
//! | [`export`] | Download-one |
//! | [`fetch`] | Boundary to the network: URL in, bytes out |
//! | [`download`] | Boundary to the platform's "save file" |
//! | [`types`] | Looks, collections, categories, face shape and hair length |
//! | [`naming`] | Label → filename derivation shared by archive and export |
//! | [`imaging`] | Header-only dimension reads via the `image` crate |
//! | [`config`] | Layered `studio.toml` loading and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Boundaries Are Traits
//!
//! The network ([`fetch::Fetcher`]), the platform download
//! ([`download::DownloadSink`]), the archive format ([`archive::ArchiveWriter`]),
//! image decoding ([`imaging::ImageBackend`]) and the generation service
//! ([`generation::StyleGenerator`]) are all traits. Production code gets the
//! `reqwest`/`zip`/`image` implementations; tests get in-memory doubles and
//! never touch the network.
//!
//! ## Latest Upload Wins
//!
//! Measuring an image happens off the caller's thread and may finish after the
//! user has already picked another photo. Every upload carries a generation
//! number; a measurement is applied only if its number still matches the
//! current upload. Out-of-order results are dropped, never applied.
//!
//! ## Previews Are Released Exactly Once
//!
//! A [`intake::PreviewHandle`] is released by consuming it, so the type
//! system rules out a second release. Dropping a handle releases it too, so
//! no path can leak one.
//!
//! ## All-or-Nothing Archives by Default
//!
//! If any look fails to download, no archive is produced and the error names
//! the look. A partial zip that silently lacks a look is worse than a clear
//! failure. `failure_policy = "skip-failed"` opts into partial archives with
//! the skipped looks reported.

pub mod archive;
pub mod config;
pub mod download;
pub mod export;
pub mod fetch;
pub mod generation;
pub mod imaging;
pub mod intake;
pub mod logging;
pub mod naming;
pub mod output;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
