//! One run against one site: "memo or discover" for the banner and for
//! every gallery.
//!
//! The session owns the prober, so the probe strategy it settles on is
//! shared by every discovery in the run, and the memo, so all lookups and
//! writes go through one store.

use crate::config::SiteConfig;
use crate::discover::{self, DiscoverPlan, Discovery, DiscoveryEvent};
use crate::manifest::{self, GallerySpec};
use crate::memo::{self, Lookup, Memo, MemoStats};
use crate::pattern::{GalleryPattern, PatternError};
use crate::probe::Prober;
use crate::site::{self, SiteRoot};
use serde::Serialize;
use std::sync::mpsc::Sender;

/// A manifest gallery with its resolved image list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedGallery {
    pub spec: GallerySpec,
    pub images: Vec<String>,
}

pub struct Session {
    root: SiteRoot,
    config: SiteConfig,
    plan: DiscoverPlan,
    prober: Box<dyn Prober>,
    memo: Memo,
    stats: MemoStats,
    progress: Option<Sender<DiscoveryEvent>>,
}

impl Session {
    pub fn new(
        root: SiteRoot,
        config: SiteConfig,
        prober: Box<dyn Prober>,
        memo: Memo,
    ) -> Result<Self, PatternError> {
        let plan = DiscoverPlan::from_config(&config.discovery)?;
        Ok(Self {
            root,
            config,
            plan,
            prober,
            memo,
            stats: MemoStats::default(),
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: Sender<DiscoveryEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn root(&self) -> &SiteRoot {
        &self.root
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    pub fn stats(&self) -> &MemoStats {
        &self.stats
    }

    /// Banner image paths, from the memo when fresh.
    pub async fn banner_images(&mut self) -> Vec<String> {
        let base = site::normalize_base(&self.config.discovery.base);
        let key = memo::memo_key(&base, None);
        let plan = self.plan.clone();
        self.memoized(&key, &base, &plan).await
    }

    /// Image paths of one gallery.
    ///
    /// An exact list (`count` + `pattern`) is returned without probing or
    /// memoizing. Otherwise the gallery directory is discovered with the
    /// gallery's own naming and start index, under a per-gallery memo key.
    pub async fn gallery_images(&mut self, gallery: &GallerySpec) -> Vec<String> {
        let galleries_base = self.config.galleries.base.clone();
        let limit = self.config.discovery.target_count;
        if let Some(exact) = gallery.exact_urls(&galleries_base, limit) {
            log::info!("gallery {}: {} listed image(s)", gallery.id, exact.len());
            return exact;
        }
        let base = gallery.base(&galleries_base);
        let key = memo::memo_key(&base, Some(&gallery.id));
        let plan = self.gallery_plan(gallery);
        self.memoized(&key, &base, &plan).await
    }

    /// Every gallery of the manifest, resolved. No manifest, no galleries.
    pub async fn galleries(&mut self) -> Vec<ResolvedGallery> {
        let Some(manifest) =
            manifest::load_manifest(&self.root, &self.config.galleries.manifest).await
        else {
            return Vec::new();
        };
        let mut resolved = Vec::with_capacity(manifest.galleries.len());
        for spec in manifest.galleries {
            let images = self.gallery_images(&spec).await;
            resolved.push(ResolvedGallery { spec, images });
        }
        resolved
    }

    fn gallery_plan(&self, gallery: &GallerySpec) -> DiscoverPlan {
        let plan = match gallery.pattern.as_deref().map(GalleryPattern::parse) {
            Some(Ok(pattern)) => self
                .plan
                .with_naming(vec![pattern.template], vec![pattern.extension]),
            Some(Err(err)) => {
                log::warn!("gallery {}: ignoring pattern: {err}", gallery.id);
                self.plan.clone()
            }
            None => self.plan.clone(),
        };
        plan.starting_at(gallery.start())
    }

    async fn memoized(&mut self, key: &str, base: &str, plan: &DiscoverPlan) -> Vec<String> {
        let lookup = self.memo.lookup::<Vec<String>>(key);
        self.stats.record(&lookup);
        match lookup {
            Lookup::Fresh(images) => {
                log::info!("memo hit for {base}: {} image(s)", images.len());
                return images;
            }
            Lookup::Expired => log::debug!("memo entry for {base} expired"),
            Lookup::Absent => log::debug!("no memo entry for {base}"),
        }

        let discovery = self.discover(base, plan).await;
        let ttl = self.memo.policy().ttl_for(&discovery.images);
        self.memo.put(key, &discovery.images, ttl);
        discovery.images
    }

    async fn discover(&self, base: &str, plan: &DiscoverPlan) -> Discovery {
        let prober = self.prober.as_ref();
        let progress = self.progress.as_ref();
        match self.config.discovery.batch_size {
            0 | 1 => discover::discover(prober, base, plan, progress).await,
            n => discover::discover_batch(prober, base, plan, n, progress).await,
        }
    }
}
