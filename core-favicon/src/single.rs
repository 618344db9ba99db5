//! Per-icon-URL download and decode

use crate::downloader::DownloaderMessage;
use crate::icon::IconImage;
use bridge_traits::{BlobStore, HttpClient};
use bytes::Bytes;
use core_runtime::logging::redact_url;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Where a resolver is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    /// Nothing cached and no download triggered yet
    NotStarted,
    /// A download task is running
    InFlight,
    /// An image is available
    Completed,
    /// The one download attempt produced no image
    Failed,
}

/// Everything a download task needs, shared by all resolvers
#[derive(Clone)]
pub(crate) struct DownloadContext {
    pub runtime: Handle,
    pub http_client: Arc<dyn HttpClient>,
    pub blob_store: Arc<dyn BlobStore>,
    pub sender: UnboundedSender<DownloaderMessage>,
}

/// Owns the download lifecycle of exactly one icon URL
///
/// At most one download is ever triggered per resolver; the coordinator keeps
/// one resolver per icon URL for the life of the process.
#[derive(Debug)]
pub struct SingleFaviconDownloader {
    favicon_url: String,
    home_page_url: Option<String>,
    icon_image: Option<IconImage>,
    state: DownloadState,
}

impl SingleFaviconDownloader {
    /// Create a resolver, completing it at once if the blob store has the icon
    pub(crate) fn new(
        favicon_url: impl Into<String>,
        home_page_url: Option<String>,
        blob_store: &dyn BlobStore,
    ) -> Self {
        let favicon_url = favicon_url.into();
        let icon_image = match blob_store.get(&favicon_url) {
            Ok(Some(data)) => match IconImage::decode(&data) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!(
                        favicon_url = %redact_url(&favicon_url),
                        error = %e,
                        "Cached icon bytes do not decode"
                    );
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(
                    favicon_url = %redact_url(&favicon_url),
                    error = %e,
                    "Blob store lookup failed"
                );
                None
            }
        };

        let state = if icon_image.is_some() {
            debug!(favicon_url = %redact_url(&favicon_url), "Icon loaded from blob store");
            DownloadState::Completed
        } else {
            DownloadState::NotStarted
        };

        Self {
            favicon_url,
            home_page_url,
            icon_image,
            state,
        }
    }

    pub fn favicon_url(&self) -> &str {
        &self.favicon_url
    }

    /// The home page that first asked for this icon
    pub fn home_page_url(&self) -> Option<&str> {
        self.home_page_url.as_deref()
    }

    pub fn icon_image(&self) -> Option<&IconImage> {
        self.icon_image.as_ref()
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    /// Start the download unless one already ran or is running
    ///
    /// Returns `true` only when this call started a download. `false` means
    /// the result (present or not) is already known or on its way.
    pub(crate) fn download_if_needed(&mut self, context: &DownloadContext) -> bool {
        if self.state != DownloadState::NotStarted {
            return false;
        }
        self.state = DownloadState::InFlight;
        debug!(favicon_url = %redact_url(&self.favicon_url), "Downloading icon");

        let favicon_url = self.favicon_url.clone();
        let context_for_task = context.clone();
        context.runtime.spawn(async move {
            let image = download(&context_for_task, &favicon_url).await;
            let _ = context_for_task
                .sender
                .send(DownloaderMessage::DownloadFinished { favicon_url, image });
        });
        true
    }

    /// Record the outcome of the download this resolver started
    pub(crate) fn finish(&mut self, image: Option<IconImage>) {
        self.state = if image.is_some() {
            DownloadState::Completed
        } else {
            DownloadState::Failed
        };
        self.icon_image = image;
    }
}

async fn download(context: &DownloadContext, favicon_url: &str) -> Option<IconImage> {
    let data = match context.http_client.fetch_bytes(favicon_url).await {
        Ok(data) => data,
        Err(e) => {
            debug!(favicon_url = %redact_url(&favicon_url), error = %e, "Icon download failed");
            return None;
        }
    };

    let blob_store = context.blob_store.clone();
    let key = favicon_url.to_string();
    match tokio::task::spawn_blocking(move || store_and_decode(blob_store.as_ref(), &key, data))
        .await
    {
        Ok(image) => image,
        Err(e) => {
            warn!(favicon_url = %redact_url(&favicon_url), error = %e, "Icon decode task failed");
            None
        }
    }
}

/// Decode `data`, keeping it in the blob store only if it is a usable image
fn store_and_decode(
    blob_store: &dyn BlobStore,
    favicon_url: &str,
    data: Bytes,
) -> Option<IconImage> {
    let image = match IconImage::decode(&data) {
        Ok(image) => image,
        Err(e) => {
            debug!(
                favicon_url = %redact_url(&favicon_url),
                error = %e,
                "Downloaded icon does not decode"
            );
            return None;
        }
    };

    if let Err(e) = blob_store.put(favicon_url, data) {
        warn!(favicon_url = %redact_url(&favicon_url), error = %e, "Failed to store icon bytes");
    }
    Some(image)
}
