//! Online tile source description.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::coord::MAX_ZOOM;
use crate::error::{TileError, TileResult};
use crate::tile::TileIdentity;

/// Default number of simultaneous requests against one source.
pub const DEFAULT_PARALLEL_REQUESTS_LIMIT: usize = 8;

/// A remote tile server: a pool of hosts sharing one URL template.
///
/// The template may use `{host}`, `{z}`, `{x}` and `{y}` placeholders, e.g.
/// `https://{host}/{z}/{x}/{y}.png`. Hosts are used round-robin.
///
/// Two sources are the same source when their host pool, template and zoom
/// bounds match. The display name and the request limit are not part of
/// the identity.
pub struct TileSource {
    name: String,
    hosts: Vec<String>,
    url_template: String,
    zoom_min: u8,
    zoom_max: u8,
    parallel_requests_limit: usize,
    next_host: AtomicUsize,
}

impl TileSource {
    /// Creates a tile source.
    ///
    /// # Errors
    ///
    /// Returns `TileError::InvalidArgument` if the host pool is empty, a host
    /// name is blank, the template lacks any of `{z}`, `{x}`, `{y}`, or the
    /// zoom bounds are inverted or above the supported maximum.
    pub fn new(
        name: impl Into<String>,
        hosts: Vec<String>,
        url_template: impl Into<String>,
        zoom_min: u8,
        zoom_max: u8,
    ) -> TileResult<Self> {
        let url_template = url_template.into();

        if hosts.is_empty() {
            return Err(TileError::invalid("tile source needs at least one host"));
        }
        if hosts.iter().any(|h| h.trim().is_empty()) {
            return Err(TileError::invalid("tile source host must not be blank"));
        }
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !url_template.contains(placeholder) {
                return Err(TileError::invalid(format!(
                    "url template '{}' is missing {}",
                    url_template, placeholder
                )));
            }
        }
        if zoom_min > zoom_max || zoom_max > MAX_ZOOM {
            return Err(TileError::invalid(format!(
                "invalid zoom bounds {}..={}",
                zoom_min, zoom_max
            )));
        }

        Ok(Self {
            name: name.into(),
            hosts,
            url_template,
            zoom_min,
            zoom_max,
            parallel_requests_limit: DEFAULT_PARALLEL_REQUESTS_LIMIT,
            next_host: AtomicUsize::new(0),
        })
    }

    /// The public OpenStreetMap Mapnik servers.
    pub fn openstreetmap() -> Self {
        Self {
            name: "OpenStreetMap".to_string(),
            hosts: vec![
                "a.tile.openstreetmap.org".to_string(),
                "b.tile.openstreetmap.org".to_string(),
                "c.tile.openstreetmap.org".to_string(),
            ],
            url_template: "https://{host}/{z}/{x}/{y}.png".to_string(),
            zoom_min: 0,
            zoom_max: 18,
            parallel_requests_limit: 2,
            next_host: AtomicUsize::new(0),
        }
    }

    /// Set the default parallel request limit handed to new download jobs.
    ///
    /// Zero means unbounded.
    pub fn with_parallel_requests_limit(mut self, limit: usize) -> Self {
        self.parallel_requests_limit = limit;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    pub fn zoom_min(&self) -> u8 {
        self.zoom_min
    }

    pub fn zoom_max(&self) -> u8 {
        self.zoom_max
    }

    pub fn parallel_requests_limit(&self) -> usize {
        self.parallel_requests_limit
    }

    /// Whether the source serves tiles at this zoom level.
    pub fn supports_zoom(&self, zoom: u8) -> bool {
        (self.zoom_min..=self.zoom_max).contains(&zoom)
    }

    /// Builds the request URL for a tile, rotating through the host pool.
    pub fn tile_url(&self, tile: &TileIdentity) -> String {
        let index = self.next_host.fetch_add(1, Ordering::Relaxed) % self.hosts.len();
        self.url_template
            .replace("{host}", &self.hosts[index])
            .replace("{z}", &tile.zoom().to_string())
            .replace("{x}", &tile.tile_x().to_string())
            .replace("{y}", &tile.tile_y().to_string())
    }

    /// Stable text form of the source identity, used in cache keys.
    pub fn identity_key(&self) -> String {
        format!(
            "{}|{}|{}-{}",
            self.hosts.join(","),
            self.url_template,
            self.zoom_min,
            self.zoom_max
        )
    }
}

impl PartialEq for TileSource {
    fn eq(&self, other: &Self) -> bool {
        self.hosts == other.hosts
            && self.url_template == other.url_template
            && self.zoom_min == other.zoom_min
            && self.zoom_max == other.zoom_max
    }
}

impl Eq for TileSource {}

impl Hash for TileSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hosts.hash(state);
        self.url_template.hash(state);
        self.zoom_min.hash(state);
        self.zoom_max.hash(state);
    }
}

impl fmt::Debug for TileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileSource")
            .field("name", &self.name)
            .field("hosts", &self.hosts)
            .field("url_template", &self.url_template)
            .field("zoom_min", &self.zoom_min)
            .field("zoom_max", &self.zoom_max)
            .field("parallel_requests_limit", &self.parallel_requests_limit)
            .finish()
    }
}
