//! Shared test utilities for the hairstyle-studio test suite.
//!
//! Provides synthetic image bytes, look/collection fixtures, and in-memory
//! stand-ins for the three external boundaries (network fetch, platform
//! download, generation service).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let collection = sample_collection();
//! let fetcher = MockFetcher::serving(&collection);
//! fetcher.fail_with_status("https://looks.test/n2.png", 404);
//! ```

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use tokio::sync::{Notify, Semaphore};

use crate::download::DownloadSink;
use crate::fetch::{FetchError, Fetcher};
use crate::generation::{GenerationError, StyleGenerator};
use crate::intake::GenerationRequest;
use crate::types::{HairstyleLook, LookCollection};

// =========================================================================
// Synthetic images
// =========================================================================

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([180, 120, 90]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// A solid-colour PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

/// A solid-colour JPEG of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

// =========================================================================
// Look fixtures
// =========================================================================

/// A look hosted at `https://looks.test/{id}.png`.
pub fn look(id: &str, label: &str) -> HairstyleLook {
    HairstyleLook {
        id: id.to_string(),
        image_url: format!("https://looks.test/{id}.png"),
        label: label.to_string(),
        note: format!("Notes for {label}"),
        alt: format!("Portrait with {label}"),
    }
}

/// Two natural looks and one glamorous look.
pub fn sample_collection() -> LookCollection {
    LookCollection::new(
        vec![look("n1", "Soft Beach Waves"), look("n2", "Sleek Low Bun")],
        vec![look("g1", "Old Hollywood Curls")],
    )
    .unwrap()
}

/// Sorted file paths in a zip, directories excluded.
pub fn zip_listing(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names = Vec::new();
    for i in 0..archive.len() {
        let file = archive.by_index(i).unwrap();
        if !file.is_dir() {
            names.push(file.name().to_string());
        }
    }
    names.sort();
    names
}

// =========================================================================
// Fetch
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    Started(String),
    Completed(String),
}

/// In-memory fetcher. Unknown URLs answer HTTP 404.
///
/// A gated fetcher blocks every fetch after it has started until the test
/// adds permits to the returned semaphore.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, Result<Vec<u8>, u16>>>,
    events: Mutex<Vec<FetchEvent>>,
    started: Notify,
    gate: Option<Arc<Semaphore>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves a small PNG for every look in the collection.
    pub fn serving(collection: &LookCollection) -> Self {
        let fetcher = Self::new();
        for (_, look) in collection.iter() {
            fetcher.serve(&look.image_url, png_bytes(2, 2));
        }
        fetcher
    }

    pub fn gated(collection: &LookCollection) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut fetcher = Self::serving(collection);
        fetcher.gate = Some(Arc::clone(&gate));
        (fetcher, gate)
    }

    pub fn serve(&self, url: &str, bytes: Vec<u8>) {
        self.responses.lock().unwrap().insert(url.to_string(), Ok(bytes));
    }

    pub fn fail_with_status(&self, url: &str, status: u16) {
        self.responses.lock().unwrap().insert(url.to_string(), Err(status));
    }

    pub fn events(&self) -> Vec<FetchEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, FetchEvent::Started(_)))
            .count()
    }

    /// Resolves once at least one fetch has started.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.events
            .lock()
            .unwrap()
            .push(FetchEvent::Started(url.to_string()));
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        tokio::task::yield_now().await;

        let response = self.responses.lock().unwrap().get(url).cloned();
        self.events
            .lock()
            .unwrap()
            .push(FetchEvent::Completed(url.to_string()));
        match response {
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(status)) => Err(FetchError::Status {
                status,
                body: String::new(),
            }),
            None => Err(FetchError::Status {
                status: 404,
                body: "not found".into(),
            }),
        }
    }
}

// =========================================================================
// Download sink
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkRequest {
    Bytes { filename: String, bytes: Vec<u8> },
    Url { url: String, filename: String },
}

/// Records every triggered save.
#[derive(Default)]
pub struct MemorySink {
    requests: Mutex<Vec<SinkRequest>>,
}

impl MemorySink {
    pub fn requests(&self) -> Vec<SinkRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl DownloadSink for MemorySink {
    fn trigger_bytes(&self, filename: &str, bytes: Vec<u8>) {
        self.requests.lock().unwrap().push(SinkRequest::Bytes {
            filename: filename.to_string(),
            bytes,
        });
    }

    fn trigger_url(&self, url: &str, filename: &str) {
        self.requests.lock().unwrap().push(SinkRequest::Url {
            url: url.to_string(),
            filename: filename.to_string(),
        });
    }
}

// =========================================================================
// Generation
// =========================================================================

/// Answers every request with a fixed collection, or HTTP 502 when failing.
pub struct MockGenerator {
    collection: Option<LookCollection>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn returning(collection: LookCollection) -> Self {
        Self {
            collection: Some(collection),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            collection: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StyleGenerator for MockGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<LookCollection, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.collection.clone().ok_or(GenerationError::Status(502))
    }
}
