//! Card template registry.
//!
//! A template is a numbered series of 1080×1080 background images (one per
//! card) plus the rectangles and colors the compositor draws into. The
//! registry is static; [`lookup`] falls back to the default template for
//! unknown ids and never fails.

use image::Rgb;
use std::path::{Path, PathBuf};

/// Canvas side length in pixels. Cards are square.
pub const CANVAS_SIZE: u32 = 1080;

/// Id of the template used when a lookup misses.
pub const DEFAULT_TEMPLATE: &str = "1";

/// Axis-aligned box in canvas pixels, corners inclusive-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Rect {
    pub const fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.x1 + self.x2) as f32 / 2.0,
            (self.y1 + self.y2) as f32 / 2.0,
        )
    }
}

/// How the date label is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMode {
    Full,
    /// Day and month only.
    NoYear,
}

impl DateMode {
    pub fn apply(self, label: &str) -> String {
        match self {
            DateMode::Full => label.to_string(),
            DateMode::NoYear => crate::dates::strip_year(label),
        }
    }
}

/// How background files are numbered inside a template directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePattern {
    /// `{prefix}{n:04}.{ext}`
    Padded {
        prefix: &'static str,
        ext: &'static str,
    },
    /// `{n}.{ext}`
    Plain { ext: &'static str },
}

impl FilePattern {
    pub fn file_name(&self, number: usize) -> String {
        match self {
            FilePattern::Padded { prefix, ext } => format!("{prefix}{number:04}.{ext}"),
            FilePattern::Plain { ext } => format!("{number}.{ext}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub id: &'static str,
    pub dir_name: &'static str,
    pub file_pattern: FilePattern,
    pub date_rect: Rect,
    pub block1: Rect,
    pub block2: Rect,
    pub text_color: Rgb<u8>,
    pub date_color: Rgb<u8>,
    pub date_mode: DateMode,
}

impl Template {
    /// Background for card `card_number` (1-based).
    pub fn background_path(&self, assets_dir: &Path, card_number: usize) -> PathBuf {
        assets_dir
            .join(self.dir_name)
            .join(self.file_pattern.file_name(card_number))
    }

    pub fn blocks(&self) -> [Rect; 2] {
        [self.block1, self.block2]
    }
}

static TEMPLATES: &[Template] = &[
    Template {
        id: "1",
        dir_name: "final-template-without-para-date",
        file_pattern: FilePattern::Padded {
            prefix: "zodiac_sign_template_page-",
            ext: "jpg",
        },
        date_rect: Rect::new(221, 48, 863, 122),
        block1: Rect::new(242, 247, 1022, 548),
        block2: Rect::new(54, 712, 843, 1008),
        text_color: Rgb([230, 221, 212]),
        date_color: Rgb([28, 56, 33]),
        date_mode: DateMode::Full,
    },
    Template {
        id: "2",
        dir_name: "Template-2",
        file_pattern: FilePattern::Plain { ext: "jpg" },
        date_rect: Rect::new(383, 43, 701, 99),
        block1: Rect::new(94, 333, 501, 979),
        block2: Rect::new(600, 334, 1015, 980),
        text_color: Rgb([0, 0, 0]),
        date_color: Rgb([255, 255, 255]),
        date_mode: DateMode::NoYear,
    },
];

/// Every registered template, in id order.
pub fn all() -> &'static [Template] {
    TEMPLATES
}

/// Template for `id`, or the default template when `id` is unknown.
pub fn lookup(id: &str) -> &'static Template {
    find(id).unwrap_or_else(|| {
        tracing::warn!(id, fallback = DEFAULT_TEMPLATE, "unknown template id");
        &TEMPLATES[0]
    })
}

/// Template for `id`, if registered.
pub fn find(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}
