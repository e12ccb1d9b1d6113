//! Font discovery, text measurement and glyph drawing (rusttype).
//!
//! Cards use two faces: a heavy display face for the date and a body face
//! for the readings. Each is found by trying a list of candidate file names
//! under the assets directory (`<assets>/fonts/` first, then `<assets>/`),
//! then a shared fallback list. A role with no loadable candidate gets the
//! DejaVu Sans face compiled into the binary, so a bare assets directory
//! still renders.
//!
//! Glyphs are rasterized by rusttype and alpha-blended straight onto an RGB
//! canvas.

use super::layout::TextMeasure;
use image::{Rgb, RgbImage};
use rusttype::{Font, Scale, point};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("not a usable TrueType/OpenType font: {0}")]
    Invalid(PathBuf),
    #[error("built-in font failed to parse")]
    Builtin,
}

/// DejaVu Sans, used for any role whose candidates all fail.
pub const BUILTIN_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontRole {
    Date,
    Body,
}

impl fmt::Display for FontRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontRole::Date => f.write_str("date"),
            FontRole::Body => f.write_str("body"),
        }
    }
}

/// A loaded font and the file it came from (`None` for the built-in face).
pub struct FontFace {
    font: Font<'static>,
    path: Option<PathBuf>,
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFace").field("path", &self.path).finish()
    }
}

impl FontFace {
    pub fn load(path: &Path) -> Result<Self, FontError> {
        let bytes = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| FontError::Invalid(path.to_path_buf()))?;
        Ok(Self {
            font,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn builtin() -> Result<Self, FontError> {
        let font = Font::try_from_bytes(BUILTIN_FONT).ok_or(FontError::Builtin)?;
        Ok(Self { font, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Draw `text` with its top edge at `y` and its origin at `x`.
    pub fn draw(&self, img: &mut RgbImage, size: u32, x: i32, y: i32, color: Rgb<u8>, text: &str) {
        let scale = Scale::uniform(size as f32);
        let v_metrics = self.font.v_metrics(scale);
        let origin = point(x as f32, y as f32 + v_metrics.ascent);

        for glyph in self.font.layout(text, scale, origin) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let px = gx as i32 + bb.min.x;
                let py = gy as i32 + bb.min.y;
                if px < 0 || py < 0 {
                    return;
                }
                let (px, py) = (px as u32, py as u32);
                if px >= img.width() || py >= img.height() {
                    return;
                }
                blend(img.get_pixel_mut(px, py), color, coverage);
            });
        }
    }

    /// Draw `text` centered on `(cx, cy)`, vertically between ascender and
    /// descender.
    pub fn draw_centered(
        &self,
        img: &mut RgbImage,
        size: u32,
        (cx, cy): (f32, f32),
        color: Rgb<u8>,
        text: &str,
    ) {
        let width = self.width(text, size) as f32;
        let v_metrics = self.font.v_metrics(Scale::uniform(size as f32));
        let height = (v_metrics.ascent - v_metrics.descent).max(1.0);
        let x = (cx - width / 2.0).round() as i32;
        let y = (cy - height / 2.0).round() as i32;
        self.draw(img, size, x, y, color, text);
    }
}

fn blend(dst: &mut Rgb<u8>, color: Rgb<u8>, coverage: f32) {
    let alpha = coverage.clamp(0.0, 1.0);
    if alpha == 0.0 {
        return;
    }
    let inv = 1.0 - alpha;
    for (d, s) in dst.0.iter_mut().zip(color.0) {
        *d = (s as f32 * alpha + *d as f32 * inv).round() as u8;
    }
}

impl TextMeasure for FontFace {
    /// Advance width of the laid-out line, kerning included. Side bearings
    /// and trailing spaces count, ink does not.
    fn width(&self, text: &str, size: u32) -> u32 {
        let scale = Scale::uniform(size as f32);
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .map_or(0, |w| w.ceil().max(0.0) as u32)
    }

    fn height(&self, text: &str, size: u32) -> u32 {
        let scale = Scale::uniform(size as f32);
        let v_metrics = self.font.v_metrics(scale);
        let (top, bottom) = self
            .font
            .layout(text, scale, point(0.0, v_metrics.ascent))
            .filter_map(|g| g.pixel_bounding_box())
            .fold((i32::MAX, i32::MIN), |(top, bottom), bb| {
                (top.min(bb.min.y), bottom.max(bb.max.y))
            });
        if top > bottom { 0 } else { (bottom - top) as u32 }
    }
}

/// The two faces a card needs.
#[derive(Debug)]
pub struct FontLibrary {
    pub date: FontFace,
    pub body: FontFace,
}

impl FontLibrary {
    /// Resolve each role from its candidates, then from `fallback`.
    pub fn load(
        assets_dir: &Path,
        date: &[String],
        body: &[String],
        fallback: &[String],
    ) -> Result<Self, FontError> {
        Ok(Self {
            date: find_face(assets_dir, FontRole::Date, date, fallback)?,
            body: find_face(assets_dir, FontRole::Body, body, fallback)?,
        })
    }

    /// Use one file for both roles.
    pub fn single(path: &Path) -> Result<Self, FontError> {
        Ok(Self {
            date: FontFace::load(path)?,
            body: FontFace::load(path)?,
        })
    }

    /// The built-in face for both roles.
    pub fn builtin() -> Result<Self, FontError> {
        Ok(Self {
            date: FontFace::builtin()?,
            body: FontFace::builtin()?,
        })
    }
}

fn find_face(
    assets_dir: &Path,
    role: FontRole,
    candidates: &[String],
    fallback: &[String],
) -> Result<FontFace, FontError> {
    let search_dirs = [assets_dir.join("fonts"), assets_dir.to_path_buf()];
    for name in candidates.iter().chain(fallback) {
        for dir in &search_dirs {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            match FontFace::load(&path) {
                Ok(face) => {
                    tracing::debug!(%role, path = %path.display(), "loaded font");
                    if !candidates.contains(name) {
                        tracing::warn!(%role, font = %name, "using fallback font");
                    }
                    return Ok(face);
                }
                Err(e) => tracing::warn!(%role, error = %e, "skipping font"),
            }
        }
    }
    tracing::warn!(
        %role,
        assets_dir = %assets_dir.display(),
        tried = ?candidates.iter().chain(fallback).collect::<Vec<_>>(),
        "no font found, using built-in face"
    );
    FontFace::builtin()
}
