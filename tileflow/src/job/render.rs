//! Local render job and the references it carries.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::{TileError, TileResult};
use crate::tile::TileIdentity;

// =============================================================================
// Map data
// =============================================================================

/// Reference to a vector map-data file.
///
/// Identity is the file path. The modification time travels with the
/// reference so cached renderings older than the data can be flagged stale.
#[derive(Debug, Clone)]
pub struct MapDataRef {
    path: PathBuf,
    last_modified: DateTime<Utc>,
}

impl MapDataRef {
    pub fn new(path: impl Into<PathBuf>, last_modified: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            last_modified,
        }
    }

    /// Creates a reference from an existing file, reading its modification time.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let modified = std::fs::metadata(&path)?.modified()?;
        Ok(Self {
            path,
            last_modified: DateTime::<Utc>::from(modified),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }
}

impl PartialEq for MapDataRef {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for MapDataRef {}

impl Hash for MapDataRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

// =============================================================================
// Theme
// =============================================================================

/// A theme supplied in memory, identified by name and content digest.
#[derive(Clone)]
pub struct EmbeddedTheme {
    name: String,
    data: Arc<[u8]>,
    digest: [u8; 32],
}

impl EmbeddedTheme {
    pub fn new(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        let digest: [u8; 32] = Sha256::digest(&data).into();
        Self {
            name: name.into(),
            data,
            digest,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn digest_hex(&self) -> String {
        self.digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl PartialEq for EmbeddedTheme {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.digest == other.digest
    }
}

impl Eq for EmbeddedTheme {}

impl Hash for EmbeddedTheme {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.digest.hash(state);
    }
}

impl fmt::Debug for EmbeddedTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedTheme")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Which cartographic theme a render job uses.
///
/// `NoTheme` has to be chosen explicitly; a builder that was never given a
/// theme refuses to build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThemeRef {
    /// Theme read from a file.
    File(PathBuf),
    /// Theme supplied in memory.
    Embedded(EmbeddedTheme),
    /// Render without a theme.
    NoTheme,
}

impl ThemeRef {
    /// Stable text form, used in cache keys.
    pub fn key(&self) -> String {
        match self {
            ThemeRef::File(path) => format!("file:{}", path.display()),
            ThemeRef::Embedded(theme) => format!("embedded:{}:{}", theme.name, theme.digest_hex()),
            ThemeRef::NoTheme => "none".to_string(),
        }
    }
}

// =============================================================================
// Display model
// =============================================================================

/// Display configuration shared by all render jobs of one map view.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayModel {
    /// Device pixel density multiplier.
    pub device_scale_factor: f32,
    /// User-chosen scale multiplier.
    pub user_scale_factor: f32,
    /// Background colour as ARGB.
    pub background_color: u32,
}

impl Default for DisplayModel {
    fn default() -> Self {
        Self {
            device_scale_factor: 1.0,
            user_scale_factor: 1.0,
            background_color: 0xFFF8_F4F0,
        }
    }
}

// =============================================================================
// Render job
// =============================================================================

/// Describes how to render one tile locally from map data plus a theme.
///
/// Equality covers the tile, the map data, the theme and the text scale.
/// Display model and the rendering flags do not distinguish jobs.
#[derive(Debug, Clone)]
pub struct RenderJob {
    tile: TileIdentity,
    has_alpha: bool,
    map_data: Arc<MapDataRef>,
    theme: ThemeRef,
    display_model: Arc<DisplayModel>,
    text_scale: f32,
    labels_only: bool,
    hide_markers: bool,
}

impl RenderJob {
    /// Starts building a render job for `tile`.
    pub fn builder(tile: TileIdentity) -> RenderJobBuilder {
        RenderJobBuilder::new(tile)
    }

    pub fn tile(&self) -> TileIdentity {
        self.tile
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub fn map_data(&self) -> &Arc<MapDataRef> {
        &self.map_data
    }

    pub fn theme(&self) -> &ThemeRef {
        &self.theme
    }

    pub fn display_model(&self) -> &Arc<DisplayModel> {
        &self.display_model
    }

    pub fn text_scale(&self) -> f32 {
        self.text_scale
    }

    /// Only the label layer is produced; the result is never cached.
    pub fn labels_only(&self) -> bool {
        self.labels_only
    }

    pub fn hide_markers(&self) -> bool {
        self.hide_markers
    }

    /// Same job for a different tile.
    pub fn with_tile(&self, tile: TileIdentity) -> Self {
        Self {
            tile,
            ..self.clone()
        }
    }

    /// Stable serialization of the identity fields.
    pub fn cache_key(&self) -> String {
        format!(
            "render|{}|{}|{:08x}|{}",
            self.map_data.path().display(),
            self.theme.key(),
            self.text_scale.to_bits(),
            self.tile
        )
    }
}

impl PartialEq for RenderJob {
    fn eq(&self, other: &Self) -> bool {
        self.tile == other.tile
            && self.map_data == other.map_data
            && self.theme == other.theme
            && self.text_scale.to_bits() == other.text_scale.to_bits()
    }
}

impl Eq for RenderJob {}

impl Hash for RenderJob {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tile.hash(state);
        self.map_data.hash(state);
        self.theme.hash(state);
        self.text_scale.to_bits().hash(state);
    }
}

/// Builder for [`RenderJob`].
///
/// Map data, theme and display model are required. Text scale defaults to 1.
#[derive(Debug, Clone)]
pub struct RenderJobBuilder {
    tile: TileIdentity,
    has_alpha: bool,
    map_data: Option<Arc<MapDataRef>>,
    theme: Option<ThemeRef>,
    display_model: Option<Arc<DisplayModel>>,
    text_scale: f32,
    labels_only: bool,
    hide_markers: bool,
}

impl RenderJobBuilder {
    fn new(tile: TileIdentity) -> Self {
        Self {
            tile,
            has_alpha: false,
            map_data: None,
            theme: None,
            display_model: None,
            text_scale: 1.0,
            labels_only: false,
            hide_markers: false,
        }
    }

    pub fn map_data(mut self, map_data: Arc<MapDataRef>) -> Self {
        self.map_data = Some(map_data);
        self
    }

    pub fn theme(mut self, theme: ThemeRef) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn display_model(mut self, display_model: Arc<DisplayModel>) -> Self {
        self.display_model = Some(display_model);
        self
    }

    pub fn text_scale(mut self, text_scale: f32) -> Self {
        self.text_scale = text_scale;
        self
    }

    pub fn transparent(mut self, has_alpha: bool) -> Self {
        self.has_alpha = has_alpha;
        self
    }

    pub fn labels_only(mut self, labels_only: bool) -> Self {
        self.labels_only = labels_only;
        self
    }

    pub fn hide_markers(mut self, hide_markers: bool) -> Self {
        self.hide_markers = hide_markers;
        self
    }

    /// Validates and builds the job.
    ///
    /// # Errors
    ///
    /// Returns `TileError::InvalidArgument` if a required reference is missing
    /// or the text scale is not a positive finite number.
    pub fn build(self) -> TileResult<RenderJob> {
        let map_data = self
            .map_data
            .ok_or_else(|| TileError::invalid("map data must be set"))?;
        let theme = self.theme.ok_or_else(|| {
            TileError::invalid("theme must be set (use ThemeRef::NoTheme to render without one)")
        })?;
        let display_model = self
            .display_model
            .ok_or_else(|| TileError::invalid("display model must be set"))?;

        if !self.text_scale.is_finite() || self.text_scale <= 0.0 {
            return Err(TileError::invalid(format!(
                "invalid text scale: {}",
                self.text_scale
            )));
        }

        Ok(RenderJob {
            tile: self.tile,
            has_alpha: self.has_alpha,
            map_data,
            theme,
            display_model,
            text_scale: self.text_scale,
            labels_only: self.labels_only,
            hide_markers: self.hide_markers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tile() -> TileIdentity {
        TileIdentity::new(1, 2, 3, 256).unwrap()
    }

    fn map_data(path: &str) -> Arc<MapDataRef> {
        Arc::new(MapDataRef::new(
            path,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn builder() -> RenderJobBuilder {
        RenderJob::builder(tile())
            .map_data(map_data("/maps/berlin.map"))
            .theme(ThemeRef::File(PathBuf::from("/themes/default.xml")))
            .display_model(Arc::new(DisplayModel::default()))
    }

    #[test]
    fn test_build_valid() {
        let job = builder().text_scale(1.5).build().unwrap();
        assert_eq!(job.tile(), tile());
        assert_eq!(job.text_scale(), 1.5);
        assert!(!job.labels_only());
    }

    #[test]
    fn test_missing_map_data_rejected() {
        let result = RenderJob::builder(tile())
            .theme(ThemeRef::NoTheme)
            .display_model(Arc::new(DisplayModel::default()))
            .build();
        assert!(matches!(result, Err(TileError::InvalidArgument(_))));
    }

    #[test]
    fn test_omitted_theme_rejected_but_explicit_none_accepted() {
        let omitted = RenderJob::builder(tile())
            .map_data(map_data("/maps/berlin.map"))
            .display_model(Arc::new(DisplayModel::default()))
            .build();
        assert!(omitted.is_err());

        let explicit = RenderJob::builder(tile())
            .map_data(map_data("/maps/berlin.map"))
            .theme(ThemeRef::NoTheme)
            .display_model(Arc::new(DisplayModel::default()))
            .build();
        assert!(explicit.is_ok());
    }

    #[test]
    fn test_missing_display_model_rejected() {
        let result = RenderJob::builder(tile())
            .map_data(map_data("/maps/berlin.map"))
            .theme(ThemeRef::NoTheme)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_text_scales_rejected() {
        for scale in [0.0, -1.0, f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let result = builder().text_scale(scale).build();
            assert!(result.is_err(), "text scale {} should be rejected", scale);
        }
    }

    #[test]
    fn test_equality_ignores_flags_and_display_model() {
        let a = builder().build().unwrap();
        let b = builder()
            .labels_only(true)
            .hide_markers(true)
            .transparent(true)
            .display_model(Arc::new(DisplayModel {
                device_scale_factor: 2.0,
                ..DisplayModel::default()
            }))
            .build()
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_covers_identity_fields() {
        let base = builder().build().unwrap();
        assert_ne!(base, builder().text_scale(2.0).build().unwrap());
        assert_ne!(base, builder().theme(ThemeRef::NoTheme).build().unwrap());
        assert_ne!(
            base,
            builder()
                .map_data(map_data("/maps/hamburg.map"))
                .build()
                .unwrap()
        );
        assert_ne!(base, base.with_tile(TileIdentity::new(0, 0, 3, 256).unwrap()));
    }

    #[test]
    fn test_map_data_identity_is_path() {
        let older = map_data("/maps/berlin.map");
        let newer = Arc::new(MapDataRef::new("/maps/berlin.map", Utc::now()));
        assert_eq!(*older, *newer);
    }

    #[test]
    fn test_embedded_theme_identity_is_content() {
        let a = EmbeddedTheme::new("osmarender", b"<rendertheme/>".to_vec());
        let b = EmbeddedTheme::new("osmarender", b"<rendertheme/>".to_vec());
        let c = EmbeddedTheme::new("osmarender", b"<rendertheme version=\"5\"/>".to_vec());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(ThemeRef::Embedded(a).key().starts_with("embedded:osmarender:"));
    }

    #[test]
    fn test_cache_key_is_stable() {
        let a = builder().build().unwrap();
        let b = builder().labels_only(true).build().unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert!(a.cache_key().starts_with("render|/maps/berlin.map|file:"));
        assert_ne!(a.cache_key(), builder().text_scale(2.0).build().unwrap().cache_key());
    }
}
