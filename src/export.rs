//! Single-look download.

use crate::download::DownloadSink;
use crate::naming;
use crate::types::HairstyleLook;
use std::sync::Arc;
use tracing::debug;

/// Saves one look under `<label-with-hyphens>.png`.
///
/// Fire-and-forget: the sink owns the transfer and any failure reporting.
pub struct SingleAssetExporter {
    sink: Arc<dyn DownloadSink>,
}

impl SingleAssetExporter {
    pub fn new(sink: Arc<dyn DownloadSink>) -> Self {
        Self { sink }
    }

    /// Filename a look is saved under.
    pub fn filename_for(look: &HairstyleLook) -> String {
        naming::look_filename(&look.label, &look.id)
    }

    pub fn export_one(&self, look: &HairstyleLook) {
        let filename = Self::filename_for(look);
        debug!(look_id = %look.id, %filename, "exporting look");
        self.sink.trigger_url(&look.image_url, &filename);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MemorySink, SinkRequest, look};

    #[test]
    fn export_triggers_url_save_with_hyphenated_name() {
        let sink = Arc::new(MemorySink::default());
        let exporter = SingleAssetExporter::new(sink.clone());

        exporter.export_one(&look("n1", "Soft Beach Waves"));

        assert_eq!(
            sink.requests(),
            vec![SinkRequest::Url {
                url: "https://looks.test/n1.png".into(),
                filename: "Soft-Beach-Waves.png".into(),
            }]
        );
    }

    #[test]
    fn export_name_matches_archive_name() {
        let l = look("g1", "Old  Hollywood Curls");
        assert_eq!(SingleAssetExporter::filename_for(&l), "Old-Hollywood-Curls.png");
    }
}
