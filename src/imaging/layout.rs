//! Text fitting: greedy word wrap plus a font-size search.
//!
//! All functions here are pure. Glyph metrics come in through
//! [`TextMeasure`], so the wrap and search logic is tested with a
//! fixed-advance measure and no font files.

/// Pixel metrics of rendered text at an integer font size.
pub trait TextMeasure {
    /// Advance width of `text` as one line.
    fn width(&self, text: &str, size: u32) -> u32;
    /// Bounding-box height of `text`.
    fn height(&self, text: &str, size: u32) -> u32;
}

/// Sample used for line height: one ascender, one descender.
pub const LINE_HEIGHT_SAMPLE: &str = "Hg";

/// Result of [`fit_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedText {
    pub size: u32,
    pub lines: Vec<String>,
    /// Distance between consecutive baselines. 0 when there are no lines.
    pub line_height: u32,
}

impl FittedText {
    pub fn total_height(&self) -> u32 {
        self.line_height * self.lines.len() as u32
    }
}

/// Break `text` into lines no wider than `max_width`.
///
/// Words are separated by any whitespace and rejoined with single spaces.
/// Each word goes on the current line if the joined line still fits, and
/// starts a new line otherwise. A word wider than `max_width` on its own
/// gets a line to itself; it is never split.
pub fn wrap_words(measure: &dyn TextMeasure, text: &str, size: u32, max_width: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure.width(&candidate, size) <= max_width {
            current = candidate;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Find the largest size in `min_size..=start_size` at which `text` wraps
/// into a `box_width` × `box_height` box.
///
/// Sizes are tried from `start_size` downward, one pixel at a time; the
/// first that fits wins. This relies on line count never decreasing as the
/// size grows, which holds for any measure whose widths grow with size.
///
/// When nothing fits, the `min_size` layout is returned and overflows the
/// box. A `start_size` below `min_size` is tried alone. Blank text yields no
/// lines and a zero line height.
pub fn fit_text(
    measure: &dyn TextMeasure,
    text: &str,
    box_width: u32,
    box_height: u32,
    start_size: u32,
    min_size: u32,
    line_padding: u32,
) -> FittedText {
    if text.trim().is_empty() {
        return FittedText {
            size: start_size,
            lines: Vec::new(),
            line_height: 0,
        };
    }

    let smallest = min_size.min(start_size);
    let mut fitted = None;
    for size in (smallest..=start_size).rev() {
        let lines = wrap_words(measure, text, size, box_width);
        let line_height = measure.height(LINE_HEIGHT_SAMPLE, size) + line_padding;
        let attempt = FittedText {
            size,
            lines,
            line_height,
        };
        if attempt.total_height() <= box_height {
            tracing::debug!(size, lines = attempt.lines.len(), "text fits");
            return attempt;
        }
        fitted = Some(attempt);
    }

    let overflow = fitted.expect("size range always has at least one entry");
    tracing::debug!(
        size = overflow.size,
        height = overflow.total_height(),
        box_height,
        "text overflows at minimum size"
    );
    overflow
}
