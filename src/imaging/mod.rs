//! Card rendering — pure Rust, no system image libraries.
//!
//! | Concern | Crate / function |
//! |---|---|
//! | **Decode background** | `image::open` (JPEG, PNG) |
//! | **Scale to canvas** | `image::imageops::resize` with `Lanczos3` |
//! | **Glyphs** | `rusttype` layout + coverage rasterizer, alpha-blended |
//! | **Encode** | `image::codecs::jpeg::JpegEncoder`, quality 95 |
//!
//! The module is split into:
//! - **Layout**: [`TextMeasure`] trait, greedy wrap and font-size search (pure)
//! - **Template**: static registry of backgrounds, rectangles and colors
//! - **Fonts**: font discovery and the rusttype [`TextMeasure`] implementation
//! - **Compositor**: pairs readings onto cards and writes JPEGs

pub mod compositor;
pub mod fonts;
pub mod layout;
pub mod template;

pub use compositor::{
    Background, CardStyle, Compositor, EncodedCard, RenderError, RenderedCard, plan_cards,
};
pub use fonts::{FontError, FontFace, FontLibrary};
pub use layout::{FittedText, TextMeasure, fit_text, wrap_words};
pub use template::{DateMode, Rect, Template};
