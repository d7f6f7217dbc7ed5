//! Download-all archive: fetch every look, file it under its category, zip.
//!
//! ```text
//! hairstyle-studio-looks.zip
//! ├── natural-looks/
//! │   ├── Soft-Beach-Waves.png
//! │   └── Sleek-Low-Bun.png
//! └── glamorous-looks/
//!     └── Old-Hollywood-Curls.png
//! ```
//!
//! ## Pipeline
//!
//! 1. Plan one entry per look, in display order. Filenames come from
//!    [`naming::look_filename`]; collisions inside a folder get `-2`, `-3`, ...
//! 2. Issue every fetch at once and await them together. No fetch waits on
//!    another; the archive is only written after all of them have settled.
//! 3. Write folders and files through an [`ArchiveWriter`] on the blocking
//!    pool, then finalize to bytes.
//!
//! ## Failure policy
//!
//! [`FailurePolicy::AllOrNothing`] (the default) fails the whole build on the
//! first failed fetch: no archive is written and fetched bytes are dropped.
//! [`FailurePolicy::SkipFailed`] waits for every fetch, archives the
//! successes, and lists the failures in [`ArchiveOutput::skipped`].
//!
//! ## Re-entrancy
//!
//! A builder runs one build at a time. A call made while another is in flight
//! returns [`ArchiveError::AlreadyBuilding`] immediately; it is not queued.
//! The flag is cleared when the build ends, whether it succeeded or failed.

use crate::config::{ArchiveConfig, Compression, FailurePolicy};
use crate::fetch::{FetchError, Fetcher};
use crate::naming;
use crate::types::{Category, LookCollection};
use futures::future::{join_all, try_join_all};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One look whose image could not be fetched.
#[derive(Error, Debug)]
#[error("could not fetch look '{look_id}' from {url}: {source}")]
pub struct FetchFailure {
    pub look_id: String,
    pub url: String,
    #[source]
    pub source: FetchError,
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("an archive is already being built")]
    AlreadyBuilding,
    #[error("there are no looks to archive")]
    EmptyCollection,
    #[error(transparent)]
    Fetch(#[from] FetchFailure),
    #[error("none of the {0} looks could be fetched")]
    NothingFetched(usize),
    #[error("failed to finalize archive: {0}")]
    Finalization(String),
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Archive-writer boundary: create folders, add files, finalize to bytes.
pub trait ArchiveWriter: Send {
    fn create_folder(&mut self, folder: &str) -> Result<(), WriteError>;

    fn add_file(&mut self, folder: &str, name: &str, bytes: &[u8]) -> Result<(), WriteError>;

    fn finish(self: Box<Self>) -> Result<Vec<u8>, WriteError>;
}

/// In-memory zip writer.
pub struct ZipArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl ZipArchiveWriter {
    pub fn new(compression: Compression) -> Self {
        let method = match compression {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflated => CompressionMethod::Deflated,
        };
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default()
                .compression_method(method)
                .unix_permissions(0o644),
        }
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn create_folder(&mut self, folder: &str) -> Result<(), WriteError> {
        self.zip.add_directory(format!("{folder}/"), self.options)?;
        Ok(())
    }

    fn add_file(&mut self, folder: &str, name: &str, bytes: &[u8]) -> Result<(), WriteError> {
        self.zip.start_file(format!("{folder}/{name}"), self.options)?;
        self.zip.write_all(bytes)?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, WriteError> {
        Ok(self.zip.finish()?.into_inner())
    }
}

/// Creates a fresh writer for each build.
pub type WriterFactory = Box<dyn Fn() -> Box<dyn ArchiveWriter> + Send + Sync>;

/// Where one look landed in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub category: Category,
    pub look_id: String,
    /// `folder/filename` inside the archive.
    pub path: String,
}

/// A finished archive.
#[derive(Debug)]
pub struct ArchiveOutput {
    /// Name to save the archive under.
    pub filename: String,
    pub bytes: Vec<u8>,
    pub entries: Vec<ArchiveEntry>,
    /// Only ever non-empty under [`FailurePolicy::SkipFailed`].
    pub skipped: Vec<FetchFailure>,
}

struct PlannedEntry {
    category: Category,
    look_id: String,
    url: String,
    filename: String,
}

/// Assign every look its folder and a collision-free filename, in display order.
fn plan_entries(collection: &LookCollection) -> Vec<PlannedEntry> {
    let mut taken: HashMap<Category, HashSet<String>> = HashMap::new();
    collection
        .iter()
        .map(|(category, look)| {
            let name = naming::look_filename(&look.label, &look.id);
            let filename = naming::unique_filename(&name, taken.entry(category).or_default());
            PlannedEntry {
                category,
                look_id: look.id.clone(),
                url: look.image_url.clone(),
                filename,
            }
        })
        .collect()
}

/// Clears the building flag when a build ends, however it ends.
struct BuildingGuard<'a>(&'a AtomicBool);

impl Drop for BuildingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Builds download-all archives for look collections.
pub struct ArchiveBuilder {
    fetcher: Arc<dyn Fetcher>,
    config: ArchiveConfig,
    writer_factory: WriterFactory,
    building: AtomicBool,
}

impl ArchiveBuilder {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: ArchiveConfig) -> Self {
        let compression = config.compression;
        Self::with_writer(
            fetcher,
            config,
            Box::new(move || {
                Box::new(ZipArchiveWriter::new(compression)) as Box<dyn ArchiveWriter>
            }),
        )
    }

    pub fn with_writer(
        fetcher: Arc<dyn Fetcher>,
        config: ArchiveConfig,
        writer_factory: WriterFactory,
    ) -> Self {
        Self {
            fetcher,
            config,
            writer_factory,
            building: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// True while a build is in flight. Check before offering download-all.
    pub fn is_building(&self) -> bool {
        self.building.load(Ordering::Acquire)
    }

    /// Fetch every look and package them into one archive.
    pub async fn build_archive(
        &self,
        collection: &LookCollection,
    ) -> Result<ArchiveOutput, ArchiveError> {
        if collection.is_empty() {
            return Err(ArchiveError::EmptyCollection);
        }
        if self
            .building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("archive build suppressed: already building");
            return Err(ArchiveError::AlreadyBuilding);
        }
        let _guard = BuildingGuard(&self.building);

        let result = self.run(collection).await;
        match &result {
            Ok(output) => info!(
                filename = %output.filename,
                files = output.entries.len(),
                skipped = output.skipped.len(),
                bytes = output.bytes.len(),
                "archive built"
            ),
            Err(e) => error!(error = %e, "archive build failed"),
        }
        result
    }

    async fn run(&self, collection: &LookCollection) -> Result<ArchiveOutput, ArchiveError> {
        let planned = plan_entries(collection);
        info!(
            looks = planned.len(),
            policy = ?self.config.failure_policy,
            "fetching looks for archive"
        );

        let fetches = planned.iter().map(|entry| {
            let fetcher = Arc::clone(&self.fetcher);
            async move {
                fetcher
                    .fetch(&entry.url)
                    .await
                    .map_err(|source| FetchFailure {
                        look_id: entry.look_id.clone(),
                        url: entry.url.clone(),
                        source,
                    })
            }
        });

        let (fetched, skipped) = match self.config.failure_policy {
            FailurePolicy::AllOrNothing => {
                let bodies = try_join_all(fetches).await?;
                (planned.into_iter().zip(bodies).collect::<Vec<_>>(), Vec::new())
            }
            FailurePolicy::SkipFailed => {
                let results = join_all(fetches).await;
                let mut fetched = Vec::new();
                let mut skipped = Vec::new();
                for (entry, result) in planned.into_iter().zip(results) {
                    match result {
                        Ok(bytes) => fetched.push((entry, bytes)),
                        Err(failure) => {
                            warn!(look_id = %failure.look_id, error = %failure.source, "skipping look");
                            skipped.push(failure);
                        }
                    }
                }
                if fetched.is_empty() {
                    return Err(ArchiveError::NothingFetched(skipped.len()));
                }
                (fetched, skipped)
            }
        };

        let writer = (self.writer_factory)();
        let (bytes, entries) = tokio::task::spawn_blocking(move || write_archive(writer, fetched))
            .await
            .map_err(|e| ArchiveError::Finalization(format!("writer task failed: {e}")))?
            .map_err(|e| ArchiveError::Finalization(e.to_string()))?;

        Ok(ArchiveOutput {
            filename: self.config.filename.clone(),
            bytes,
            entries,
            skipped,
        })
    }
}

fn write_archive(
    mut writer: Box<dyn ArchiveWriter>,
    fetched: Vec<(PlannedEntry, Vec<u8>)>,
) -> Result<(Vec<u8>, Vec<ArchiveEntry>), WriteError> {
    for category in Category::ALL {
        writer.create_folder(category.folder())?;
    }
    let mut entries = Vec::with_capacity(fetched.len());
    for (entry, bytes) in fetched {
        let folder = entry.category.folder();
        writer.add_file(folder, &entry.filename, &bytes)?;
        entries.push(ArchiveEntry {
            category: entry.category,
            path: format!("{folder}/{}", entry.filename),
            look_id: entry.look_id,
        });
    }
    Ok((writer.finish()?, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FetchEvent, MockFetcher, look, sample_collection, zip_listing};
    use std::time::Duration;

    fn builder(fetcher: Arc<MockFetcher>, policy: FailurePolicy) -> ArchiveBuilder {
        ArchiveBuilder::new(
            fetcher,
            ArchiveConfig {
                failure_policy: policy,
                ..ArchiveConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn all_fetched_looks_land_in_category_folders() {
        let collection = sample_collection();
        let fetcher = Arc::new(MockFetcher::serving(&collection));
        let output = builder(fetcher, FailurePolicy::AllOrNothing)
            .build_archive(&collection)
            .await
            .unwrap();

        assert_eq!(output.filename, "hairstyle-studio-looks.zip");
        assert!(output.skipped.is_empty());
        let files = zip_listing(&output.bytes);
        assert_eq!(
            files,
            vec![
                "glamorous-looks/Old-Hollywood-Curls.png".to_string(),
                "natural-looks/Sleek-Low-Bun.png".to_string(),
                "natural-looks/Soft-Beach-Waves.png".to_string(),
            ]
        );
        assert_eq!(output.entries.len(), 3);
        assert_eq!(output.entries[0].path, "natural-looks/Soft-Beach-Waves.png");
    }

    #[tokio::test]
    async fn one_failed_fetch_fails_whole_build() {
        let collection = sample_collection();
        let fetcher = Arc::new(MockFetcher::serving(&collection));
        fetcher.fail_with_status("https://looks.test/n2.png", 404);

        let b = builder(Arc::clone(&fetcher), FailurePolicy::AllOrNothing);
        let err = b.build_archive(&collection).await.unwrap_err();
        match err {
            ArchiveError::Fetch(failure) => {
                assert_eq!(failure.look_id, "n2");
                assert!(matches!(failure.source, FetchError::Status { status: 404, .. }));
            }
            other => panic!("expected fetch failure, got {other:?}"),
        }
        assert!(!b.is_building());
    }

    #[tokio::test]
    async fn failed_build_can_be_retried() {
        let collection = sample_collection();
        let fetcher = Arc::new(MockFetcher::serving(&collection));
        fetcher.fail_with_status("https://looks.test/g1.png", 500);
        let b = builder(Arc::clone(&fetcher), FailurePolicy::AllOrNothing);
        assert!(b.build_archive(&collection).await.is_err());

        fetcher.serve("https://looks.test/g1.png", b"png".to_vec());
        let output = b.build_archive(&collection).await.unwrap();
        assert_eq!(output.entries.len(), 3);
    }

    #[tokio::test]
    async fn skip_failed_archives_the_rest() {
        let collection = sample_collection();
        let fetcher = Arc::new(MockFetcher::serving(&collection));
        fetcher.fail_with_status("https://looks.test/n1.png", 503);

        let output = builder(fetcher, FailurePolicy::SkipFailed)
            .build_archive(&collection)
            .await
            .unwrap();
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].look_id, "n1");
        assert_eq!(
            zip_listing(&output.bytes),
            vec![
                "glamorous-looks/Old-Hollywood-Curls.png".to_string(),
                "natural-looks/Sleek-Low-Bun.png".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn skip_failed_with_nothing_fetched_errors() {
        let collection = sample_collection();
        let fetcher = Arc::new(MockFetcher::new());
        let err = builder(fetcher, FailurePolicy::SkipFailed)
            .build_archive(&collection)
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NothingFetched(3)));
    }

    #[tokio::test]
    async fn fetches_are_issued_before_any_completes() {
        let collection = sample_collection();
        let fetcher = Arc::new(MockFetcher::serving(&collection));
        builder(Arc::clone(&fetcher), FailurePolicy::AllOrNothing)
            .build_archive(&collection)
            .await
            .unwrap();

        let events = fetcher.events();
        let first_completion = events
            .iter()
            .position(|e| matches!(e, FetchEvent::Completed(_)))
            .unwrap();
        let starts = events
            .iter()
            .filter(|e| matches!(e, FetchEvent::Started(_)))
            .count();
        assert_eq!(starts, 3);
        assert!(
            events[..first_completion]
                .iter()
                .all(|e| matches!(e, FetchEvent::Started(_))),
            "all fetches should start before the first completes: {events:?}"
        );
        assert_eq!(first_completion, 3);
    }

    #[tokio::test]
    async fn concurrent_invocation_is_suppressed() {
        let collection = Arc::new(sample_collection());
        let (fetcher, gate) = MockFetcher::gated(&collection);
        let fetcher = Arc::new(fetcher);
        let b = Arc::new(builder(Arc::clone(&fetcher), FailurePolicy::AllOrNothing));

        let first = {
            let b = Arc::clone(&b);
            let collection = Arc::clone(&collection);
            tokio::spawn(async move { b.build_archive(&collection).await })
        };
        fetcher.wait_started().await;
        assert!(b.is_building());

        let second = b.build_archive(&collection).await;
        assert!(matches!(second, Err(ArchiveError::AlreadyBuilding)));

        gate.add_permits(3);
        let output = tokio::time::timeout(Duration::from_secs(5), first)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(output.entries.len(), 3);
        assert!(!b.is_building());
        // The suppressed call issued no fetches of its own.
        assert_eq!(fetcher.started_count(), 3);
    }

    #[tokio::test]
    async fn empty_collection_is_rejected() {
        let fetcher = Arc::new(MockFetcher::new());
        let err = builder(fetcher, FailurePolicy::AllOrNothing)
            .build_archive(&LookCollection::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::EmptyCollection));
    }

    #[tokio::test]
    async fn duplicate_labels_get_suffixed() {
        let collection = LookCollection::new(
            vec![look("n1", "Soft Beach Waves"), look("n2", "Soft Beach Waves")],
            vec![look("g1", "Soft Beach Waves")],
        )
        .unwrap();
        let fetcher = Arc::new(MockFetcher::serving(&collection));
        let output = builder(fetcher, FailurePolicy::AllOrNothing)
            .build_archive(&collection)
            .await
            .unwrap();
        assert_eq!(
            zip_listing(&output.bytes),
            vec![
                "glamorous-looks/Soft-Beach-Waves.png".to_string(),
                "natural-looks/Soft-Beach-Waves-2.png".to_string(),
                "natural-looks/Soft-Beach-Waves.png".to_string(),
            ]
        );
    }

    struct BrokenWriter;

    impl ArchiveWriter for BrokenWriter {
        fn create_folder(&mut self, _folder: &str) -> Result<(), WriteError> {
            Ok(())
        }

        fn add_file(&mut self, _folder: &str, _name: &str, _bytes: &[u8]) -> Result<(), WriteError> {
            Err(WriteError::Io(std::io::Error::other("disk full")))
        }

        fn finish(self: Box<Self>) -> Result<Vec<u8>, WriteError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn writer_failure_is_finalization_error() {
        let collection = sample_collection();
        let fetcher = Arc::new(MockFetcher::serving(&collection));
        let b = ArchiveBuilder::with_writer(
            fetcher,
            ArchiveConfig::default(),
            Box::new(|| Box::new(BrokenWriter) as Box<dyn ArchiveWriter>),
        );
        let err = b.build_archive(&collection).await.unwrap_err();
        assert!(matches!(err, ArchiveError::Finalization(msg) if msg.contains("disk full")));
        assert!(!b.is_building());
    }

    #[test]
    fn stored_zip_round_trips_contents() {
        let mut writer: Box<dyn ArchiveWriter> = Box::new(ZipArchiveWriter::new(Compression::Stored));
        writer.create_folder("natural-looks").unwrap();
        writer.add_file("natural-looks", "a.png", b"abc").unwrap();
        let bytes = writer.finish().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name("natural-looks/a.png").unwrap();
        let mut contents = Vec::new();
        std::io::Read::read_to_end(&mut file, &mut contents).unwrap();
        assert_eq!(contents, b"abc");
    }
}
