//! Favicon Coordinator - Resolve, Cache, and Announce Feed Icons
//!
//! `FaviconDownloader` answers "what is this feed's icon?" without ever
//! blocking. Anything not already known is worked out in the background:
//!
//! 1. Discovery asks the [`FaviconFinder`] for the icons a home page declares
//!    and appends the conventional `/favicon.ico`.
//! 2. Candidates are tried one at a time, in order, each through the
//!    [`SingleFaviconDownloader`] for its URL.
//! 3. The first candidate that yields an image wins and a
//!    [`FaviconEvent::Available`] is published. If the only candidate was the
//!    synthesized default and it failed, the home page is remembered as having
//!    no icon.
//!
//! ## Ownership
//!
//! The downloader is a single-owner value: all cache state is mutated through
//! `&mut self`. Background tasks (discovery, downloads, save timers) never
//! touch that state; they post a [`DownloaderMessage`] which the owner applies
//! in [`process_pending`](FaviconDownloader::process_pending) or
//! [`process_next`](FaviconDownloader::process_next).
//!
//! ## Usage
//!
//! ```ignore
//! use core_favicon::{Feed, FaviconDownloader};
//! use core_runtime::config::FaviconConfig;
//!
//! let config = FaviconConfig::builder().cache_dir("/path/to/cache").build()?;
//! let mut downloader = FaviconDownloader::new(config)?;
//! let mut events = downloader.subscribe();
//!
//! let feed = Feed::new("1", "https://example.com/feed.xml");
//! if downloader.favicon_for(&feed).is_none() {
//!     // Not known yet; an Available event will follow if an icon turns up.
//!     while downloader.process_next().await {
//!         // ...
//!     }
//! }
//!
//! downloader.flush().await?;
//! ```

use crate::error::{FaviconError, Result};
use crate::feed::{
    default_favicon_url, home_page_url_from_feed_url, host_of, normalize_home_page_url, Feed,
    FeedSetting,
};
use crate::icon::IconImage;
use crate::lookup_cache::{
    CacheKind, HomePageToFaviconUrl, HomePagesWithoutFavicon, PendingWrite, PersistedCache,
};
use crate::memo::IconMemoCache;
use crate::single::{DownloadContext, DownloadState, SingleFaviconDownloader};
use bridge_traits::FaviconFinder;
use core_runtime::config::FaviconConfig;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus, FaviconEvent};
use core_runtime::logging::redact_url;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast::Receiver;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Results posted back to the owner by background work
#[derive(Debug)]
pub enum DownloaderMessage {
    /// The finder answered for a home page (`None` when discovery failed)
    DiscoveryFinished {
        home_page_url: String,
        candidates: Option<Vec<String>>,
    },
    /// A resolver's one download finished (`None` when it produced no image)
    DownloadFinished {
        favicon_url: String,
        image: Option<IconImage>,
    },
    /// A lookup cache's save delay elapsed
    SaveDue(CacheKind),
}

/// Candidates still to try for one home page
#[derive(Debug)]
struct PendingDiscovery {
    current: Option<String>,
    remaining: VecDeque<String>,
    only_default: bool,
}

/// Resolves and caches favicons for feeds
pub struct FaviconDownloader {
    config: FaviconConfig,
    context: DownloadContext,
    favicon_finder: Arc<dyn FaviconFinder>,
    event_bus: EventBus,
    receiver: UnboundedReceiver<DownloaderMessage>,
    app_icon: Option<IconImage>,
    single_downloaders: HashMap<String, SingleFaviconDownloader>,
    home_page_to_favicon_url: PersistedCache<HomePageToFaviconUrl>,
    home_pages_without_favicon: PersistedCache<HomePagesWithoutFavicon>,
    discoveries_in_flight: HashSet<String>,
    pending: HashMap<String, PendingDiscovery>,
    /// Last write started for each cache; the next write of that cache waits on it
    writes_in_flight: HashMap<CacheKind, JoinHandle<()>>,
    memo: IconMemoCache,
}

impl FaviconDownloader {
    /// Create a downloader with its own event bus
    ///
    /// Must be called from within a Tokio runtime; background work is spawned
    /// onto that runtime. Reads both lookup caches from `config.cache_dir`.
    pub fn new(config: FaviconConfig) -> Result<Self> {
        let event_bus = EventBus::new(config.event_buffer_size);
        Self::with_event_bus(config, event_bus)
    }

    /// Create a downloader that publishes onto an existing event bus
    pub fn with_event_bus(config: FaviconConfig, event_bus: EventBus) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            FaviconError::Runtime(format!(
                "FaviconDownloader must be created inside a Tokio runtime: {}",
                e
            ))
        })?;
        let (sender, receiver) = mpsc::unbounded_channel();

        let app_icon = config
            .app_icon
            .as_ref()
            .and_then(|data| match IconImage::decode(data) {
                Ok(icon) => Some(icon),
                Err(e) => {
                    warn!(error = %e, "Application icon does not decode");
                    None
                }
            });

        let home_page_to_favicon_url: PersistedCache<HomePageToFaviconUrl> =
            PersistedCache::load(CacheKind::HomePageToFaviconUrl, &config.cache_dir);
        let home_pages_without_favicon: PersistedCache<HomePagesWithoutFavicon> =
            PersistedCache::load(CacheKind::HomePagesWithoutFavicon, &config.cache_dir);

        info!(
            remembered = home_page_to_favicon_url.get().len(),
            without_favicon = home_pages_without_favicon.get().len(),
            "Favicon downloader ready"
        );

        let context = DownloadContext {
            runtime,
            http_client: config.http_client.clone(),
            blob_store: config.blob_store.clone(),
            sender,
        };

        Ok(Self {
            favicon_finder: config.favicon_finder.clone(),
            config,
            context,
            event_bus,
            receiver,
            app_icon,
            single_downloaders: HashMap::new(),
            home_page_to_favicon_url,
            home_pages_without_favicon,
            discoveries_in_flight: HashSet::new(),
            pending: HashMap::new(),
            writes_in_flight: HashMap::new(),
            memo: IconMemoCache::new(),
        })
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The icon for `feed`, if already known
    ///
    /// An explicit icon URL wins. Otherwise the feed's home page is used, or
    /// one derived from the feed URL's scheme and host.
    pub fn favicon_for(&mut self, feed: &Feed) -> Option<IconImage> {
        if let Some(favicon_url) = feed.favicon_url.as_deref() {
            return self.favicon_with(favicon_url, feed.home_page_url.as_deref());
        }

        let home_page_url = feed
            .home_page_url
            .clone()
            .or_else(|| home_page_url_from_feed_url(&feed.url));

        match home_page_url {
            Some(home_page_url) => self.favicon_with_home_page_url(&home_page_url),
            None => {
                debug!(feed_id = %feed.feed_id, "No home page for feed");
                None
            }
        }
    }

    /// The icon for `feed` scaled for display, memoized per feed
    pub fn favicon_as_icon(&mut self, feed: &Feed) -> Option<IconImage> {
        if let Some(icon) = self.memo.get(&feed.feed_id) {
            return Some(icon);
        }

        let icon = self
            .favicon_for(feed)?
            .scaled_to_fit(self.config.icon_dimension);
        self.memo.insert(feed.feed_id.clone(), icon.clone());
        Some(icon)
    }

    /// The icon at `favicon_url`, if already downloaded
    ///
    /// Starts the download the first time the URL is seen.
    pub fn favicon_with(
        &mut self,
        favicon_url: &str,
        home_page_url: Option<&str>,
    ) -> Option<IconImage> {
        let favicon_url = favicon_url.trim();
        if favicon_url.is_empty() {
            return None;
        }

        let home_page_url = home_page_url.and_then(normalize_home_page_url);
        self.prepare_single_downloader(favicon_url, home_page_url.as_deref());
        self.current_image(favicon_url)
    }

    /// The icon for a home page, if already known
    ///
    /// Unknown home pages start discovery and return `None`; the answer
    /// arrives later as a [`FaviconEvent`].
    pub fn favicon_with_home_page_url(&mut self, home_page_url: &str) -> Option<IconImage> {
        let home_page_url = normalize_home_page_url(home_page_url)?;

        if host_of(&home_page_url).is_some_and(|host| self.config.is_app_icon_host(&host)) {
            return self.app_icon.clone();
        }

        if self.home_pages_without_favicon.get().contains(&home_page_url) {
            return None;
        }

        if let Some(favicon_url) = self
            .home_page_to_favicon_url
            .get()
            .get(&home_page_url)
            .cloned()
        {
            self.prepare_single_downloader(&favicon_url, Some(&home_page_url));
            return self.current_image(&favicon_url);
        }

        self.discover(home_page_url);
        None
    }

    /// Forget every scaled icon
    pub fn reset_cache(&mut self) {
        self.memo.reset();
        let _ = self.event_bus.emit(CoreEvent::Cache(CacheEvent::IconsReset));
    }

    /// React to the host changing one of `feed`'s settings
    pub fn feed_setting_did_change(&mut self, feed: &Feed, setting: FeedSetting) {
        if !setting.affects_favicon() {
            return;
        }
        debug!(feed_id = %feed.feed_id, ?setting, "Feed setting changed, re-resolving icon");
        self.memo.remove(&feed.feed_id);
        let _ = self.favicon_for(feed);
    }

    pub fn single_downloader(&self, favicon_url: &str) -> Option<&SingleFaviconDownloader> {
        self.single_downloaders.get(favicon_url)
    }

    /// The icon URL remembered for a home page
    pub fn remembered_favicon_url(&self, home_page_url: &str) -> Option<&str> {
        let home_page_url = normalize_home_page_url(home_page_url)?;
        self.home_page_to_favicon_url
            .get()
            .get(&home_page_url)
            .map(String::as_str)
    }

    /// Whether a home page is known to have no icon
    pub fn has_no_favicon(&self, home_page_url: &str) -> bool {
        normalize_home_page_url(home_page_url)
            .is_some_and(|url| self.home_pages_without_favicon.get().contains(&url))
    }

    // ------------------------------------------------------------------
    // Message pump
    // ------------------------------------------------------------------

    /// Apply every message already posted by background work
    ///
    /// Returns the number of messages handled. Never waits.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.receiver.try_recv() {
            self.handle_message(message);
            handled += 1;
        }
        handled
    }

    /// Wait for the next message from background work and apply it
    pub async fn process_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(message) => {
                self.handle_message(message);
                true
            }
            None => false,
        }
    }

    /// Write every cache with unsaved changes now
    ///
    /// Intended for shutdown. Waits for timer-driven writes still running,
    /// then writes what they did not cover. Returns the first write error;
    /// every cache is attempted regardless.
    pub async fn flush(&mut self) -> Result<()> {
        let mut first_error = None;

        for kind in [
            CacheKind::HomePageToFaviconUrl,
            CacheKind::HomePagesWithoutFavicon,
        ] {
            if let Some(previous) = self.writes_in_flight.remove(&kind) {
                if let Err(e) = previous.await {
                    warn!(cache = kind.file_name(), error = %e, "Lookup cache write task failed");
                }
            }

            let outcome = match self.take_write(kind, false) {
                None => continue,
                Some(Err(e)) => Err(e),
                Some(Ok(write)) => self
                    .context
                    .runtime
                    .spawn_blocking(move || write.write().map(|_| write.entries))
                    .await
                    .unwrap_or_else(|e| Err(FaviconError::Persistence(e.to_string()))),
            };

            report_save(&self.event_bus, kind, &outcome);
            if let Err(e) = outcome {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn handle_message(&mut self, message: DownloaderMessage) {
        match message {
            DownloaderMessage::DiscoveryFinished {
                home_page_url,
                candidates,
            } => self.handle_discovery_finished(home_page_url, candidates),
            DownloaderMessage::DownloadFinished { favicon_url, image } => {
                self.handle_download_finished(favicon_url, image)
            }
            DownloaderMessage::SaveDue(kind) => self.handle_save_due(kind),
        }
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Get or create the resolver for `favicon_url` and start its download
    ///
    /// The first time a home page is seen it is remembered against this icon
    /// URL. If that icon is already resolved no completion will follow, so it
    /// is announced here; returns whether that happened.
    fn prepare_single_downloader(
        &mut self,
        favicon_url: &str,
        home_page_url: Option<&str>,
    ) -> bool {
        let mut first_time_seeing_home_page = false;
        if let Some(home_page_url) = home_page_url {
            if !self
                .home_page_to_favicon_url
                .get()
                .contains_key(home_page_url)
            {
                self.remember_favicon_url(home_page_url, favicon_url);
                first_time_seeing_home_page = true;
            }
        }

        let announce = match self.single_downloaders.get_mut(favicon_url) {
            Some(downloader) => {
                let started = downloader.download_if_needed(&self.context);
                first_time_seeing_home_page && !started && downloader.icon_image().is_some()
            }
            None => {
                let mut downloader = SingleFaviconDownloader::new(
                    favicon_url,
                    home_page_url.map(str::to_string),
                    self.context.blob_store.as_ref(),
                );
                downloader.download_if_needed(&self.context);
                self.single_downloaders
                    .insert(favicon_url.to_string(), downloader);
                false
            }
        };

        if announce {
            debug!(
                favicon_url = %redact_url(&favicon_url),
                "Icon already resolved for another home page"
            );
            self.post_favicon_available(favicon_url);
        }
        announce
    }

    fn current_image(&self, favicon_url: &str) -> Option<IconImage> {
        self.single_downloaders
            .get(favicon_url)
            .and_then(|downloader| downloader.icon_image().cloned())
    }

    fn discover(&mut self, home_page_url: String) {
        if self.pending.contains_key(&home_page_url)
            || !self.discoveries_in_flight.insert(home_page_url.clone())
        {
            return;
        }
        debug!(home_page_url = %redact_url(&home_page_url), "Discovering favicons");

        let finder = self.favicon_finder.clone();
        let sender = self.context.sender.clone();
        self.context.runtime.spawn(async move {
            let candidates = finder.find_favicon_urls(&home_page_url).await;
            let _ = sender.send(DownloaderMessage::DiscoveryFinished {
                home_page_url,
                candidates,
            });
        });
    }

    fn handle_discovery_finished(&mut self, home_page_url: String, found: Option<Vec<String>>) {
        self.discoveries_in_flight.remove(&home_page_url);

        let mut candidates: Vec<String> = Vec::new();
        for candidate in found.unwrap_or_default() {
            let candidate = candidate.trim();
            if !candidate.is_empty() && !candidates.iter().any(|c| c == candidate) {
                candidates.push(candidate.to_string());
            }
        }
        if let Some(default) = default_favicon_url(&home_page_url) {
            if !candidates.iter().any(|c| c.eq_ignore_ascii_case(&default)) {
                candidates.push(default);
            }
        }

        if candidates.is_empty() {
            debug!(home_page_url = %redact_url(&home_page_url), "No favicon candidates");
            return;
        }

        let only_default = candidates.len() == 1;
        debug!(
            home_page_url = %redact_url(&home_page_url),
            candidates = candidates.len(),
            only_default,
            "Discovery finished"
        );

        self.pending.insert(
            home_page_url.clone(),
            PendingDiscovery {
                current: None,
                remaining: candidates.into(),
                only_default,
            },
        );
        self.try_next_candidate(&home_page_url);
    }

    /// Move a home page on to its next candidate
    ///
    /// Candidates already resolved are accepted and ones already failed are
    /// skipped without waiting; otherwise the home page waits for the
    /// candidate's download.
    fn try_next_candidate(&mut self, home_page_url: &str) {
        loop {
            let Some(pending) = self.pending.get_mut(home_page_url) else {
                return;
            };

            let Some(candidate) = pending.remaining.pop_front() else {
                let only_default = pending.only_default;
                self.pending.remove(home_page_url);
                debug!(home_page_url = %redact_url(&home_page_url), "Favicon candidates exhausted");
                if only_default {
                    self.mark_without_favicon(home_page_url);
                }
                return;
            };
            pending.current = Some(candidate.clone());

            let announced = self.prepare_single_downloader(&candidate, Some(home_page_url));
            match self
                .single_downloaders
                .get(&candidate)
                .map(SingleFaviconDownloader::state)
            {
                Some(DownloadState::Completed) => {
                    self.accept_candidate(home_page_url, &candidate, !announced);
                    return;
                }
                Some(DownloadState::Failed) => continue,
                _ => return,
            }
        }
    }

    fn accept_candidate(&mut self, home_page_url: &str, favicon_url: &str, announce: bool) {
        self.pending.remove(home_page_url);
        self.remember_favicon_url(home_page_url, favicon_url);
        if announce {
            self.post_favicon_available(favicon_url);
        }
    }

    fn handle_download_finished(&mut self, favicon_url: String, image: Option<IconImage>) {
        let Some(downloader) = self.single_downloaders.get_mut(&favicon_url) else {
            warn!(favicon_url = %redact_url(&favicon_url), "Download finished for unknown icon");
            return;
        };
        downloader.finish(image);
        let succeeded = downloader.icon_image().is_some();

        if succeeded {
            self.post_favicon_available(&favicon_url);
        } else {
            debug!(favicon_url = %redact_url(&favicon_url), "No icon at URL");
        }

        let waiting: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.current.as_deref() == Some(favicon_url.as_str()))
            .map(|(home_page_url, _)| home_page_url.clone())
            .collect();

        for home_page_url in waiting {
            if succeeded {
                self.accept_candidate(&home_page_url, &favicon_url, false);
            } else {
                self.try_next_candidate(&home_page_url);
            }
        }
    }

    fn post_favicon_available(&self, favicon_url: &str) {
        info!(favicon_url = %redact_url(&favicon_url), "Favicon available");
        let _ = self
            .event_bus
            .emit(CoreEvent::Favicon(FaviconEvent::Available {
                favicon_url: favicon_url.to_string(),
            }));
    }

    // ------------------------------------------------------------------
    // Lookup cache persistence
    // ------------------------------------------------------------------

    fn remember_favicon_url(&mut self, home_page_url: &str, favicon_url: &str) {
        let arm = self.home_page_to_favicon_url.update(|map| {
            if map.get(home_page_url).map(String::as_str) == Some(favicon_url) {
                return false;
            }
            map.insert(home_page_url.to_string(), favicon_url.to_string());
            true
        });
        if arm {
            self.schedule_save(CacheKind::HomePageToFaviconUrl);
        }
    }

    fn mark_without_favicon(&mut self, home_page_url: &str) {
        let arm = self
            .home_pages_without_favicon
            .update(|set| set.insert(home_page_url.to_string()));
        if arm {
            self.schedule_save(CacheKind::HomePagesWithoutFavicon);
        }

        info!(home_page_url = %redact_url(&home_page_url), "No favicon for home page");
        let _ = self
            .event_bus
            .emit(CoreEvent::Favicon(FaviconEvent::NoFavicon {
                home_page_url: home_page_url.to_string(),
            }));
    }

    fn schedule_save(&self, kind: CacheKind) {
        let delay = self.config.save_delay;
        let sender = self.context.sender.clone();
        self.context.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sender.send(DownloaderMessage::SaveDue(kind));
        });
    }

    fn take_write(&mut self, kind: CacheKind, timer_fired: bool) -> Option<Result<PendingWrite>> {
        match (kind, timer_fired) {
            (CacheKind::HomePageToFaviconUrl, true) => self.home_page_to_favicon_url.save_due(),
            (CacheKind::HomePageToFaviconUrl, false) => self.home_page_to_favicon_url.take_write(),
            (CacheKind::HomePagesWithoutFavicon, true) => {
                self.home_pages_without_favicon.save_due()
            }
            (CacheKind::HomePagesWithoutFavicon, false) => {
                self.home_pages_without_favicon.take_write()
            }
        }
    }

    fn handle_save_due(&mut self, kind: CacheKind) {
        match self.take_write(kind, true) {
            None => {}
            Some(Err(e)) => report_save(&self.event_bus, kind, &Err(e)),
            Some(Ok(write)) => {
                let previous = self.writes_in_flight.remove(&kind);
                let event_bus = self.event_bus.clone();
                let runtime = self.context.runtime.clone();
                let handle = self.context.runtime.spawn(async move {
                    // Writes of one cache land in the order their snapshots were taken
                    if let Some(previous) = previous {
                        let _ = previous.await;
                    }
                    let outcome = runtime
                        .spawn_blocking(move || write.write().map(|_| write.entries))
                        .await
                        .unwrap_or_else(|e| Err(FaviconError::Persistence(e.to_string())));
                    report_save(&event_bus, kind, &outcome);
                });
                self.writes_in_flight.insert(kind, handle);
            }
        }
    }
}

fn report_save(event_bus: &EventBus, kind: CacheKind, outcome: &Result<usize>) {
    let cache = kind.file_name().to_string();
    let event = match outcome {
        Ok(entries) => CacheEvent::Saved {
            cache,
            entries: *entries,
        },
        Err(e) => {
            warn!(cache = %cache, error = %e, "Failed to save lookup cache");
            CacheEvent::SaveFailed {
                cache,
                message: e.to_string(),
            }
        }
    };
    let _ = event_bus.emit(CoreEvent::Cache(event));
}
