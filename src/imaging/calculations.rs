//! Pure geometry used by the transformation stages.
//!
//! No pixel formats and no I/O here: callers pass a predicate that answers
//! "is the pixel at (x, y) visible?", which keeps the scan testable with
//! plain closures.

/// An axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether this rectangle covers a whole `width` x `height` image.
    pub fn is_full(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

/// Smallest rectangle containing every pixel for which `visible` is true.
///
/// Returns `None` when no pixel is visible (including empty images).
pub fn visible_bounds(width: u32, height: u32, visible: impl Fn(u32, u32) -> bool) -> Option<Rect> {
    let row_visible = |y: u32| (0..width).any(|x| visible(x, y));
    let col_visible = |x: u32, top: u32, bottom: u32| (top..=bottom).any(|y| visible(x, y));

    let top = (0..height).find(|&y| row_visible(y))?;
    // `top` is visible, so a bottom row exists
    let bottom = (top..height).rev().find(|&y| row_visible(y))?;
    let left = (0..width).find(|&x| col_visible(x, top, bottom))?;
    let right = (left..width).rev().find(|&x| col_visible(x, top, bottom))?;

    Some(Rect {
        x: left,
        y: top,
        width: right - left + 1,
        height: bottom - top + 1,
    })
}
