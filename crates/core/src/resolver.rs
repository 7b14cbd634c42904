//! The lazily initialized lookup context shared by every call site.

use std::sync::OnceLock;

use log::{error, info, warn};
use serde::Serialize;

use crate::cache::{read_name_list, CacheLayout, Fingerprint, FingerprintCache};
use crate::config::ResolverConfig;
use crate::discovery::{discover_from, DiscoveryPlan};
use crate::image::ImageSource;
use crate::mapper::NameMapping;

/// Where the obfuscated names behind the current mapping came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameOrigin {
    Cache,
    Discovery,
    /// Discovery failed; every lookup is a passthrough.
    Unavailable,
}

impl NameOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            NameOrigin::Cache => "cache",
            NameOrigin::Discovery => "discovery",
            NameOrigin::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug)]
struct Resolved {
    mapping: NameMapping,
    origin: NameOrigin,
    obfuscated: Vec<String>,
}

/// Name translation context.
///
/// Nothing happens at construction. The first call to [`NameResolver::resolve`] (or
/// [`NameResolver::initialize`]) consults the cache, runs discovery if needed, and builds the
/// mapping; concurrent first callers block until that finishes and it never runs again. After
/// that, lookups are lock-free reads.
pub struct NameResolver {
    config: ResolverConfig,
    layout: CacheLayout,
    source: Box<dyn ImageSource>,
    true_names: Option<Vec<String>>,
    use_cache: bool,
    resolved: OnceLock<Resolved>,
}

impl NameResolver {
    pub fn new(config: ResolverConfig, source: Box<dyn ImageSource>) -> Self {
        let layout = CacheLayout::new(&config.cache);
        Self {
            config,
            layout,
            source,
            true_names: None,
            use_cache: true,
            resolved: OnceLock::new(),
        }
    }

    /// Use `names` as the true-name list instead of reading the configured file.
    pub fn with_true_names(mut self, names: Vec<String>) -> Self {
        self.true_names = Some(names);
        self
    }

    /// Neither read nor write the fingerprint cache; always run discovery.
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn is_initialized(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Run initialization now if it has not happened yet.
    pub fn initialize(&self) -> &NameMapping {
        &self.resolved().mapping
    }

    pub fn mapping(&self) -> &NameMapping {
        self.initialize()
    }

    pub fn origin(&self) -> NameOrigin {
        self.resolved().origin
    }

    /// Obfuscated names in extraction order.
    pub fn obfuscated_names(&self) -> &[String] {
        &self.resolved().obfuscated
    }

    /// Translate a true export name into the name the host binary exports it under.
    ///
    /// Never fails: names outside the target prefix, unknown names, and every name after a
    /// failed discovery come back unchanged.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.mapping().resolve(name)
    }

    fn resolved(&self) -> &Resolved {
        self.resolved.get_or_init(|| self.build())
    }

    fn build(&self) -> Resolved {
        info!("Initializing name resolver for {}", self.source.name());
        let (obfuscated, origin) = self.load_obfuscated_names();
        let true_names = self.load_true_names();
        let mapping = NameMapping::build(&self.config.name_prefix, &true_names, &obfuscated);
        info!("Name mapping ready: {} entries from {}", mapping.len(), origin.as_str());
        Resolved { mapping, origin, obfuscated }
    }

    fn load_obfuscated_names(&self) -> (Vec<String>, NameOrigin) {
        let cache = FingerprintCache::new(self.layout.clone());
        let fingerprint = if self.use_cache {
            match Fingerprint::of_file(&self.config.target_library) {
                Ok(fingerprint) => Some(fingerprint),
                Err(err) => {
                    warn!("Cache disabled for this run: {err:#}");
                    None
                }
            }
        } else {
            None
        };

        if let Some(names) = fingerprint.and_then(|current| cache.load_if_fresh(current)) {
            return (names, NameOrigin::Cache);
        }

        let plan = DiscoveryPlan::from_config(&self.config);
        let report = match discover_from(self.source.as_ref(), &plan) {
            Ok(report) => report,
            Err(_) => return (Vec::new(), NameOrigin::Unavailable),
        };

        if let Some(fingerprint) = fingerprint {
            if let Err(err) = cache.store(&report.names, fingerprint) {
                error!("Failed to persist name cache: {err:#}");
            }
        }
        (report.names, NameOrigin::Discovery)
    }

    fn load_true_names(&self) -> Vec<String> {
        if let Some(names) = &self.true_names {
            return names.clone();
        }
        match read_name_list(&self.layout.true_names_path) {
            Ok(names) => names,
            Err(err) => {
                error!("True-name list unavailable, lookups will pass through: {err:#}");
                Vec::new()
            }
        }
    }
}
