//! Glyph outlines for the Text formation.
//!
//! A string is laid out left to right with a TrueType/OpenType font and every
//! glyph contour (outer shapes and holes alike) becomes one [`GlyphPath`]: a
//! flattened polyline that knows its arclength and can return the point at a
//! normalized position along it.
//!
//! Fonts are loaded at most once per [`GlyphProvider`]. The process-wide
//! provider returned by [`GlyphProvider::global`] starts out
//! [`FontState::NotLoaded`]; callers check its state before sampling text and
//! fall back to another formation when no font is ready.

use crate::error::GlyphError;
use glam::Vec2;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use ttf_parser::{Face, OutlineBuilder};

/// Line segments used to flatten each quadratic or cubic curve.
const CURVE_SEGMENTS: usize = 12;

/// One flattened glyph contour.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphPath {
    points: Vec<Vec2>,
    /// `cumulative[k]` is the length from `points[0]` to `points[k]`.
    cumulative: Vec<f32>,
}

impl GlyphPath {
    /// Build a path from polyline vertices. Closed paths get a final segment
    /// back to the first vertex.
    ///
    /// Returns `None` for degenerate input (fewer than two distinct points).
    pub fn new(mut points: Vec<Vec2>, closed: bool) -> Option<Self> {
        points.dedup();
        if closed && points.len() > 1 && points.first() != points.last() {
            points.push(points[0]);
        }
        if points.len() < 2 {
            return None;
        }

        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in points.windows(2) {
            total += pair[0].distance(pair[1]);
            cumulative.push(total);
        }

        if total <= 0.0 {
            return None;
        }
        Some(Self { points, cumulative })
    }

    /// Total arclength.
    #[inline]
    pub fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Point at normalized position `u` in `[0, 1]` along the path.
    pub fn point_at(&self, u: f32) -> Vec2 {
        let target = u.clamp(0.0, 1.0) * self.length();
        // First vertex whose cumulative length reaches the target.
        let k = self
            .cumulative
            .partition_point(|&d| d < target)
            .clamp(1, self.points.len() - 1);
        let (d0, d1) = (self.cumulative[k - 1], self.cumulative[k]);
        let t = if d1 > d0 { (target - d0) / (d1 - d0) } else { 0.0 };
        self.points[k - 1].lerp(self.points[k], t)
    }
}

/// Anything that can turn a string into glyph contours.
pub trait OutlineSource: Send + Sync {
    /// Contours for `text` rendered at `size` world units per em, in reading
    /// order.
    fn outline(&self, text: &str, size: f32) -> Vec<GlyphPath>;
}

/// A parsed font face that produces glyph outlines.
pub struct OutlineFont {
    data: Vec<u8>,
    face_index: u32,
}

impl std::fmt::Debug for OutlineFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineFont")
            .field("bytes", &self.data.len())
            .field("face_index", &self.face_index)
            .finish()
    }
}

impl OutlineFont {
    /// Validate and keep font data.
    pub fn from_bytes(data: Vec<u8>, face_index: u32) -> Result<Self, GlyphError> {
        Face::parse(&data, face_index)?;
        Ok(Self { data, face_index })
    }

    /// Read and validate a font file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GlyphError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| GlyphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(data, 0)
    }

    fn face(&self) -> Option<Face<'_>> {
        // Parsing succeeded once in the constructor; the bytes never change.
        Face::parse(&self.data, self.face_index).ok()
    }
}

impl OutlineSource for OutlineFont {
    fn outline(&self, text: &str, size: f32) -> Vec<GlyphPath> {
        let Some(face) = self.face() else {
            return Vec::new();
        };

        let scale = size / face.units_per_em() as f32;
        let line_height =
            (face.ascender() as f32 - face.descender() as f32 + face.line_gap() as f32) * scale;
        let fallback = face.glyph_index('?');

        let mut collector = PathCollector::new(scale);
        for ch in text.chars() {
            if ch == '\n' {
                collector.pen = Vec2::new(0.0, collector.pen.y - line_height);
                continue;
            }
            let Some(glyph) = face.glyph_index(ch).or(fallback) else {
                continue;
            };
            face.outline_glyph(glyph, &mut collector);
            collector.finish_contour(false);

            let advance = face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
            collector.pen.x += advance;
        }
        collector.paths
    }
}

/// Collects flattened contours from `ttf_parser` outline callbacks.
struct PathCollector {
    scale: f32,
    pen: Vec2,
    current: Vec<Vec2>,
    paths: Vec<GlyphPath>,
}

impl PathCollector {
    fn new(scale: f32) -> Self {
        Self {
            scale,
            pen: Vec2::ZERO,
            current: Vec::new(),
            paths: Vec::new(),
        }
    }

    fn map(&self, x: f32, y: f32) -> Vec2 {
        self.pen + Vec2::new(x, y) * self.scale
    }

    fn last(&self) -> Vec2 {
        self.current.last().copied().unwrap_or(self.pen)
    }

    fn finish_contour(&mut self, closed: bool) {
        let points = std::mem::take(&mut self.current);
        if let Some(path) = GlyphPath::new(points, closed) {
            self.paths.push(path);
        }
    }
}

impl OutlineBuilder for PathCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        self.finish_contour(false);
        let p = self.map(x, y);
        self.current.push(p);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.current.push(p);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let p0 = self.last();
        let c = self.map(x1, y1);
        let p1 = self.map(x, y);
        for step in 1..=CURVE_SEGMENTS {
            let t = step as f32 / CURVE_SEGMENTS as f32;
            let mt = 1.0 - t;
            self.current.push(p0 * (mt * mt) + c * (2.0 * mt * t) + p1 * (t * t));
        }
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let p0 = self.last();
        let c0 = self.map(x1, y1);
        let c1 = self.map(x2, y2);
        let p1 = self.map(x, y);
        for step in 1..=CURVE_SEGMENTS {
            let t = step as f32 / CURVE_SEGMENTS as f32;
            let mt = 1.0 - t;
            self.current.push(
                p0 * (mt * mt * mt)
                    + c0 * (3.0 * mt * mt * t)
                    + c1 * (3.0 * mt * t * t)
                    + p1 * (t * t * t),
            );
        }
    }

    fn close(&mut self) {
        self.finish_contour(true);
    }
}

/// Load state of a [`GlyphProvider`].
#[derive(Debug)]
pub enum FontState<'a> {
    /// No load has completed yet.
    NotLoaded,
    Ready(Arc<OutlineFont>),
    /// Loading failed; the failure is final for this provider.
    Failed(&'a GlyphError),
}

/// A load-once slot for the font used by the Text formation.
///
/// The first completed load wins and is cached for the provider's lifetime,
/// success or failure. Failures are logged once and never retried.
#[derive(Debug, Default)]
pub struct GlyphProvider {
    slot: OnceLock<Result<Arc<OutlineFont>, GlyphError>>,
}

static GLOBAL_PROVIDER: GlyphProvider = GlyphProvider::new();

impl GlyphProvider {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// The process-wide provider.
    pub fn global() -> &'static GlyphProvider {
        &GLOBAL_PROVIDER
    }

    /// Run `load` unless a load already completed, and return the cached result.
    pub fn load_with<F>(&self, load: F) -> Result<Arc<OutlineFont>, &GlyphError>
    where
        F: FnOnce() -> Result<OutlineFont, GlyphError>,
    {
        let result = self.slot.get_or_init(|| {
            let result = load().map(Arc::new);
            match &result {
                Ok(font) => log::info!("glyph source loaded ({:?})", font),
                Err(e) => log::warn!("glyph source failed to load, text will fall back: {}", e),
            }
            result
        });
        result.as_ref().map(Arc::clone)
    }

    /// Load a font file into the slot.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Arc<OutlineFont>, &GlyphError> {
        self.load_with(|| OutlineFont::from_file(path))
    }

    /// Load a font file on a background thread. The frame loop keeps running
    /// and sees [`FontState::NotLoaded`] until the load completes.
    pub fn spawn_load(&'static self, path: PathBuf) -> JoinHandle<()> {
        std::thread::spawn(move || {
            let _ = self.load_file(path);
        })
    }

    pub fn state(&self) -> FontState<'_> {
        match self.slot.get() {
            None => FontState::NotLoaded,
            Some(Ok(font)) => FontState::Ready(Arc::clone(font)),
            Some(Err(e)) => FontState::Failed(e),
        }
    }

    /// The loaded font, or `None` while pending or after a failure.
    pub fn font(&self) -> Option<Arc<OutlineFont>> {
        match self.state() {
            FontState::Ready(font) => Some(font),
            _ => None,
        }
    }

    /// Outline `text`, reporting why it could not be done.
    pub fn outline(&self, text: &str, size: f32) -> Result<Vec<GlyphPath>, GlyphError> {
        let font = self.font().ok_or(GlyphError::NotLoaded)?;
        let paths = font.outline(text, size);
        if paths.is_empty() {
            return Err(GlyphError::EmptyOutline(text.to_string()));
        }
        Ok(paths)
    }
}
