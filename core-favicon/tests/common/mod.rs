//! Shared fakes for downloader tests

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{FaviconFinder, HttpClient, HttpRequest, HttpResponse, MemoryBlobStore};
use bytes::Bytes;
use core_favicon::FaviconDownloader;
use core_runtime::config::FaviconConfig;
use core_runtime::events::{CacheEvent, CoreEvent, FaviconEvent, Receiver};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

pub const WAIT: Duration = Duration::from_secs(5);

pub fn png(size: u32) -> Bytes {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(size, size, Rgba([20, 40, 60, 255])));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    Bytes::from(buffer.into_inner())
}

/// Finder answering from a fixed table and recording every call
#[derive(Default)]
pub struct ScriptedFinder {
    answers: Mutex<HashMap<String, Option<Vec<String>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFinder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(&self, home_page_url: &str, candidates: Option<&[&str]>) {
        self.answers.lock().unwrap().insert(
            home_page_url.to_string(),
            candidates.map(|c| c.iter().map(|s| s.to_string()).collect()),
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FaviconFinder for ScriptedFinder {
    async fn find_favicon_urls(&self, home_page_url: &str) -> Option<Vec<String>> {
        self.calls.lock().unwrap().push(home_page_url.to_string());
        self.answers
            .lock()
            .unwrap()
            .get(home_page_url)
            .cloned()
            .flatten()
    }
}

/// HTTP client serving fixed bodies; unknown URLs are 404
#[derive(Default)]
pub struct ScriptedHttp {
    bodies: Mutex<HashMap<String, Bytes>>,
    requests: Mutex<HashMap<String, usize>>,
}

impl ScriptedHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, body: Bytes) {
        self.bodies.lock().unwrap().insert(url.to_string(), body);
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.requests.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.requests.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        *self
            .requests
            .lock()
            .unwrap()
            .entry(request.url.clone())
            .or_default() += 1;

        let (status, body) = match self.bodies.lock().unwrap().get(&request.url) {
            Some(body) => (200, body.clone()),
            None => (404, Bytes::new()),
        };
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body,
        })
    }
}

pub struct Harness {
    pub finder: Arc<ScriptedFinder>,
    pub http: Arc<ScriptedHttp>,
    pub blob_store: Arc<MemoryBlobStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            finder: ScriptedFinder::new(),
            http: ScriptedHttp::new(),
            blob_store: Arc::new(MemoryBlobStore::new()),
        }
    }

    pub fn config(&self, cache_dir: &Path) -> core_runtime::config::FaviconConfigBuilder {
        FaviconConfig::builder()
            .cache_dir(cache_dir)
            .http_client(self.http.clone())
            .blob_store(self.blob_store.clone())
            .favicon_finder(self.finder.clone())
            .save_delay(Duration::from_millis(50))
    }

    pub fn downloader(&self, cache_dir: &Path) -> FaviconDownloader {
        FaviconDownloader::new(self.config(cache_dir).build().unwrap()).unwrap()
    }
}

/// Pump messages until `done` holds
pub async fn pump_until<F>(downloader: &mut FaviconDownloader, mut done: F)
where
    F: FnMut(&mut FaviconDownloader) -> bool,
{
    timeout(WAIT, async {
        while !done(downloader) {
            downloader.process_next().await;
        }
    })
    .await
    .expect("timed out pumping downloader");
}

/// Pump messages until `favicon_url` is announced
pub async fn wait_for_available(
    downloader: &mut FaviconDownloader,
    events: &mut Receiver<CoreEvent>,
    favicon_url: &str,
) {
    timeout(WAIT, async {
        loop {
            tokio::select! {
                event = events.recv() => {
                    if let Ok(CoreEvent::Favicon(FaviconEvent::Available { favicon_url: url })) = event {
                        if url == favicon_url {
                            return;
                        }
                    }
                }
                _ = downloader.process_next() => {}
            }
        }
    })
    .await
    .expect("timed out waiting for favicon");
}

/// Pump messages for `duration`, returning every event published meanwhile
pub async fn collect_events(
    downloader: &mut FaviconDownloader,
    events: &mut Receiver<CoreEvent>,
    duration: Duration,
) -> Vec<CoreEvent> {
    let deadline = Instant::now() + duration;
    let mut seen = Vec::new();
    loop {
        tokio::select! {
            event = events.recv() => {
                if let Ok(event) = event {
                    seen.push(event);
                }
            }
            _ = downloader.process_next() => {}
            _ = sleep(deadline.saturating_duration_since(Instant::now())) => break,
        }
    }
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

/// Events already published, without pumping
pub fn drain(events: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

pub fn saved(events: &[CoreEvent], cache: &str) -> Vec<usize> {
    events
        .iter()
        .filter_map(|event| match event {
            CoreEvent::Cache(CacheEvent::Saved { cache: c, entries }) if c == cache => {
                Some(*entries)
            }
            _ => None,
        })
        .collect()
}

pub fn available(events: &[CoreEvent], favicon_url: &str) -> usize {
    events
        .iter()
        .filter(|event| {
            matches!(
                event,
                CoreEvent::Favicon(FaviconEvent::Available { favicon_url: url }) if url == favicon_url
            )
        })
        .count()
}
