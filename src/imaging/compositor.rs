//! Card compositing.
//!
//! Readings are laid out two per card. Card `n` (1-based) is drawn on the
//! template's `n`th background image, with the date label across the top
//! and each reading wrapped into its block:
//!
//! ```text
//! readings  [r0 r1] [r2 r3] ... [r10 r11]
//! cards        1       2           6          → horoscope_1.jpg … horoscope_6.jpg
//! ```
//!
//! An odd trailing reading gets a card of its own with the second block
//! left empty. A background that is missing or unreadable is replaced by a
//! solid dark canvas; the card still renders and records
//! [`Background::Blank`].

use super::fonts::FontLibrary;
use super::layout::fit_text;
use super::template::{CANVAS_SIZE, Template, lookup};
use crate::types::Reading;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageError, Rgb, RgbImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fill used when a template background can't be loaded (`#0f0f1a`).
pub const BLANK_COLOR: Rgb<u8> = Rgb([0x0f, 0x0f, 0x1a]);

pub const JPEG_QUALITY: u8 = 95;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("image encoding failed: {0}")]
    Image(#[from] ImageError),
}

/// Font sizes and spacing for card text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardStyle {
    pub body_start_size: u32,
    pub body_min_size: u32,
    pub line_padding: u32,
    pub date_size: u32,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            body_start_size: 24,
            body_min_size: 16,
            line_padding: 12,
            date_size: 47,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    Template(PathBuf),
    Blank,
}

impl Background {
    pub fn is_blank(&self) -> bool {
        matches!(self, Background::Blank)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCard {
    /// 1-based card number.
    pub index: usize,
    pub path: PathBuf,
    pub background: Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCard {
    pub index: usize,
    pub jpeg: Vec<u8>,
    pub background: Background,
}

/// One card's worth of readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardPlan<'r> {
    pub index: usize,
    pub readings: &'r [Reading],
}

/// Split `readings` into cards of two.
pub fn plan_cards(readings: &[Reading]) -> Vec<CardPlan<'_>> {
    readings
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| CardPlan {
            index: i + 1,
            readings: pair,
        })
        .collect()
}

pub fn card_file_name(index: usize) -> String {
    format!("horoscope_{index}.jpg")
}

/// Background for card `index`, scaled to the canvas, or a blank canvas.
pub fn load_background(
    assets_dir: &Path,
    template: &Template,
    index: usize,
) -> (RgbImage, Background) {
    let path = template.background_path(assets_dir, index);
    match image::open(&path) {
        Ok(img) => {
            let mut rgb = img.to_rgb8();
            if rgb.dimensions() != (CANVAS_SIZE, CANVAS_SIZE) {
                tracing::debug!(
                    path = %path.display(),
                    from = ?rgb.dimensions(),
                    "resizing background"
                );
                rgb = image::imageops::resize(&rgb, CANVAS_SIZE, CANVAS_SIZE, FilterType::Lanczos3);
            }
            (rgb, Background::Template(path))
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "template missing; using blank canvas");
            (
                RgbImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, BLANK_COLOR),
                Background::Blank,
            )
        }
    }
}

/// Draws reading cards onto template backgrounds.
pub struct Compositor<'f> {
    fonts: &'f FontLibrary,
    assets_dir: PathBuf,
    style: CardStyle,
}

impl<'f> Compositor<'f> {
    pub fn new(fonts: &'f FontLibrary, assets_dir: &Path, style: CardStyle) -> Self {
        Self {
            fonts,
            assets_dir: assets_dir.to_path_buf(),
            style,
        }
    }

    /// Render one JPEG per pair of readings into `out_dir`.
    ///
    /// Files are named `horoscope_{n}.jpg`; existing files are overwritten.
    /// Cards come back in pair order.
    #[tracing::instrument(skip(self, readings), fields(count = readings.len()))]
    pub fn render(
        &self,
        readings: &[Reading],
        date_label: &str,
        template_id: &str,
        out_dir: &Path,
    ) -> Result<Vec<RenderedCard>, RenderError> {
        std::fs::create_dir_all(out_dir).map_err(|source| RenderError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let template = lookup(template_id);
        plan_cards(readings)
            .into_iter()
            .map(|plan| -> Result<RenderedCard, RenderError> {
                let (img, background) = self.compose(template, &plan, date_label);
                let path = out_dir.join(card_file_name(plan.index));
                write_jpeg(&img, &path)?;
                tracing::info!(card = plan.index, path = %path.display(), "rendered card");
                Ok(RenderedCard {
                    index: plan.index,
                    path,
                    background,
                })
            })
            .collect()
    }

    /// Like [`render`](Self::render) but returns encoded JPEG bytes.
    pub fn render_to_memory(
        &self,
        readings: &[Reading],
        date_label: &str,
        template_id: &str,
    ) -> Result<Vec<EncodedCard>, RenderError> {
        let template = lookup(template_id);
        plan_cards(readings)
            .into_iter()
            .map(|plan| -> Result<EncodedCard, RenderError> {
                let (img, background) = self.compose(template, &plan, date_label);
                let mut jpeg = Vec::new();
                encode_jpeg(&img, &mut jpeg)?;
                Ok(EncodedCard {
                    index: plan.index,
                    jpeg,
                    background,
                })
            })
            .collect()
    }

    fn compose(&self, template: &Template, plan: &CardPlan<'_>, date_label: &str) -> (RgbImage, Background) {
        let (mut img, background) = load_background(&self.assets_dir, template, plan.index);

        let label = template.date_mode.apply(date_label);
        self.fonts.date.draw_centered(
            &mut img,
            self.style.date_size,
            template.date_rect.center(),
            template.date_color,
            &label,
        );

        for (reading, rect) in plan.readings.iter().zip(template.blocks()) {
            let fitted = fit_text(
                &self.fonts.body,
                &reading.text,
                rect.width(),
                rect.height(),
                self.style.body_start_size,
                self.style.body_min_size,
                self.style.line_padding,
            );
            if fitted.total_height() > rect.height() {
                tracing::warn!(sign = %reading.sign, size = fitted.size, "reading overflows its block");
            }
            let mut y = rect.y1 as i32;
            for line in &fitted.lines {
                self.fonts.body.draw(
                    &mut img,
                    fitted.size,
                    rect.x1 as i32,
                    y,
                    template.text_color,
                    line,
                );
                y += fitted.line_height as i32;
            }
        }

        (img, background)
    }
}

fn encode_jpeg(img: &RgbImage, out: &mut impl Write) -> Result<(), ImageError> {
    JpegEncoder::new_with_quality(out, JPEG_QUALITY).encode_image(img)
}

fn write_jpeg(img: &RgbImage, path: &Path) -> Result<(), RenderError> {
    let io_err = |source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    encode_jpeg(img, &mut writer)?;
    writer.flush().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_readings;
    use tempfile::TempDir;

    fn fonts() -> FontLibrary {
        FontLibrary::builtin().unwrap()
    }

    // =========================================================================
    // Planning
    // =========================================================================

    #[test]
    fn card_count_is_half_rounded_up() {
        let readings = sample_readings("1 May 2026");
        for n in [0, 1, 2, 5, 11, 12] {
            let plans = plan_cards(&readings[..n]);
            assert_eq!(plans.len(), n.div_ceil(2), "n = {n}");
        }
    }

    #[test]
    fn odd_trailing_reading_gets_its_own_card() {
        let readings = sample_readings("1 May 2026");
        let plans = plan_cards(&readings[..5]);
        assert_eq!(plans[2].index, 3);
        assert_eq!(plans[2].readings.len(), 1);
        assert_eq!(plans[2].readings[0].sign, readings[4].sign);
    }

    #[test]
    fn file_names_are_one_based() {
        assert_eq!(card_file_name(1), "horoscope_1.jpg");
        assert_eq!(card_file_name(6), "horoscope_6.jpg");
    }

    // =========================================================================
    // Backgrounds
    // =========================================================================

    #[test]
    fn missing_background_is_blank_canvas() {
        let tmp = TempDir::new().unwrap();
        let (img, bg) = load_background(tmp.path(), lookup("1"), 1);
        assert_eq!(bg, Background::Blank);
        assert_eq!(img.dimensions(), (CANVAS_SIZE, CANVAS_SIZE));
        assert_eq!(*img.get_pixel(540, 540), BLANK_COLOR);
    }

    #[test]
    fn corrupt_background_is_blank_canvas() {
        let tmp = TempDir::new().unwrap();
        let template = lookup("2");
        let path = template.background_path(tmp.path(), 1);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not a jpeg").unwrap();

        let (_, bg) = load_background(tmp.path(), template, 1);
        assert!(bg.is_blank());
    }

    #[test]
    fn small_background_is_scaled_to_canvas() {
        let tmp = TempDir::new().unwrap();
        let template = lookup("2");
        let path = template.background_path(tmp.path(), 2);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(540, 540, Rgb([200, 40, 40]))
            .save(&path)
            .unwrap();

        let (img, bg) = load_background(tmp.path(), template, 2);
        assert_eq!(bg, Background::Template(path));
        assert_eq!(img.dimensions(), (CANVAS_SIZE, CANVAS_SIZE));
        let px = img.get_pixel(540, 540);
        assert!(px.0[0] > 150 && px.0[1] < 90, "got {px:?}");
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn render_writes_one_jpeg_per_pair() {
        let fonts = fonts();
        let assets = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let readings = sample_readings("15 March 2026");
        let compositor = Compositor::new(&fonts, assets.path(), CardStyle::default());

        let cards = compositor
            .render(&readings, "15 March 2026", "1", &out.path().join("cards"))
            .unwrap();

        assert_eq!(cards.len(), 6);
        for (i, card) in cards.iter().enumerate() {
            assert_eq!(card.index, i + 1);
            assert!(card.background.is_blank());
            assert_eq!(card.path, out.path().join("cards").join(card_file_name(i + 1)));
            let dims = image::image_dimensions(&card.path).unwrap();
            assert_eq!(dims, (CANVAS_SIZE, CANVAS_SIZE));
        }
    }

    #[test]
    fn render_draws_text_onto_blank_canvas() {
        let fonts = fonts();
        let assets = TempDir::new().unwrap();
        let readings = sample_readings("15 March 2026");
        let compositor = Compositor::new(&fonts, assets.path(), CardStyle::default());
        let template = lookup("1");

        let plans = plan_cards(&readings[..1]);
        let (img, _) = compositor.compose(template, &plans[0], "15 March 2026");

        let block1 = template.block1;
        let lit_in_block1 = (block1.y1..block1.y2)
            .flat_map(|y| (block1.x1..block1.x2).map(move |x| (x, y)))
            .any(|(x, y)| *img.get_pixel(x, y) != BLANK_COLOR);
        assert!(lit_in_block1);

        let block2 = template.block2;
        let lit_in_block2 = (block2.y1..block2.y2)
            .flat_map(|y| (block2.x1..block2.x2).map(move |x| (x, y)))
            .any(|(x, y)| *img.get_pixel(x, y) != BLANK_COLOR);
        assert!(!lit_in_block2, "odd trailing card leaves block 2 empty");
    }

    #[test]
    fn render_to_memory_returns_jpeg_bytes() {
        let fonts = fonts();
        let assets = TempDir::new().unwrap();
        let readings = sample_readings("15 March 2026");
        let compositor = Compositor::new(&fonts, assets.path(), CardStyle::default());

        let cards = compositor
            .render_to_memory(&readings[..3], "15 March 2026", "2")
            .unwrap();
        assert_eq!(cards.len(), 2);
        for card in &cards {
            assert_eq!(&card.jpeg[..2], &[0xFF, 0xD8]);
        }
    }
}
