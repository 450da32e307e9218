/// Viewport windowing over the loaded sequence
///
/// Only the items near the viewport are mounted once the list grows past the
/// virtualization threshold. Item heights are estimated, not measured.
use std::ops::Range;

/// Half-open index range `[start, end)` into the loaded sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleWindow {
    pub start: usize,
    pub end: usize,
}

impl VisibleWindow {
    /// The whole sequence
    pub fn full(len: usize) -> Self {
        Self { start: 0, end: len }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Scroll geometry of the list container
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Offset of the viewport from the top of the content
    pub scroll_top: f32,
    /// Height of the whole content
    pub scroll_height: f32,
    /// Height of the viewport
    pub client_height: f32,
}

impl ScrollMetrics {
    pub fn distance_to_bottom(&self) -> f32 {
        self.scroll_height - self.scroll_top - self.client_height
    }

    /// Whether the viewport is less than `tolerance` px away from the bottom
    pub fn is_at_bottom(&self, tolerance: f32) -> bool {
        self.distance_to_bottom() < tolerance
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    /// Estimated height of one item, gap included
    pub item_height: f32,
    /// Items kept mounted beyond each edge of the viewport
    pub overscan: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            item_height: 250.0,
            overscan: 20,
        }
    }
}

/// Compute the window of items to mount for a scroll position.
///
/// `start = max(0, floor(top / E) - O)` and
/// `end = min(len, ceil((top + H) / E) + O)`.
pub fn compute_window(
    scroll_top: f32,
    viewport_height: f32,
    loaded_len: usize,
    config: &WindowConfig,
) -> VisibleWindow {
    if loaded_len == 0 || !(config.item_height > 0.0) {
        return VisibleWindow::full(loaded_len);
    }

    // Negative offsets happen during overscroll bounce
    let top = scroll_top.max(0.0);
    let bottom = top + viewport_height.max(0.0);

    let first = (top / config.item_height).floor() as usize;
    let last = (bottom / config.item_height).ceil() as usize;

    let end = last.saturating_add(config.overscan).min(loaded_len);
    let start = first.saturating_sub(config.overscan).min(end);

    VisibleWindow { start, end }
}

/// Number of items rendered from a slice of `len` items so only whole rows
/// show. A slice shorter than one row is rendered as-is.
pub fn row_aligned_len(len: usize, columns: usize) -> usize {
    let columns = columns.max(1);
    let whole = (len / columns) * columns;
    if whole == 0 {
        len
    } else {
        whole
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_at_top() {
        let config = WindowConfig::default();
        let window = compute_window(0.0, 800.0, 500, &config);
        // ceil(800 / 250) + 20
        assert_eq!(window, VisibleWindow { start: 0, end: 24 });
    }

    #[test]
    fn test_window_in_the_middle() {
        let config = WindowConfig::default();
        let window = compute_window(10_000.0, 800.0, 500, &config);
        // floor(10000 / 250) - 20 = 20, ceil(10800 / 250) + 20 = 64
        assert_eq!(window, VisibleWindow { start: 20, end: 64 });
        assert_eq!(window.len(), 44);
    }

    #[test]
    fn test_window_is_clamped_to_loaded_length() {
        let config = WindowConfig::default();
        let window = compute_window(1_000_000.0, 800.0, 120, &config);
        assert_eq!(window.end, 120);
        assert!(window.start <= window.end);
    }

    #[test]
    fn test_window_bounds_hold_for_all_offsets() {
        let config = WindowConfig {
            item_height: 97.0,
            overscan: 5,
        };
        for len in [0, 1, 7, 150] {
            let mut top = -300.0;
            while top < 20_000.0 {
                let w = compute_window(top, 640.0, len, &config);
                assert!(w.start <= w.end, "start > end at {top}");
                assert!(w.end <= len, "end past length at {top}");
                top += 37.5;
            }
        }
    }

    #[test]
    fn test_zero_item_height_disables_windowing() {
        let config = WindowConfig {
            item_height: 0.0,
            overscan: 20,
        };
        assert_eq!(compute_window(500.0, 800.0, 42, &config), VisibleWindow::full(42));
    }

    #[test]
    fn test_row_alignment_keeps_whole_rows() {
        // Three columns, eleven candidates: three full rows
        assert_eq!(row_aligned_len(11, 3), 9);
        assert_eq!(row_aligned_len(12, 3), 12);
        assert_eq!(row_aligned_len(12, 5), 10);
    }

    #[test]
    fn test_row_alignment_short_slice_is_untouched() {
        assert_eq!(row_aligned_len(2, 3), 2);
        assert_eq!(row_aligned_len(0, 3), 0);
        assert_eq!(row_aligned_len(7, 0), 7);
    }

    #[test]
    fn test_row_alignment_property() {
        for columns in 1..8 {
            for len in 0..40 {
                let expected = if len < columns { len } else { (len / columns) * columns };
                assert_eq!(row_aligned_len(len, columns), expected);
            }
        }
    }

    #[test]
    fn test_bottom_detection() {
        let metrics = ScrollMetrics {
            scroll_top: 1199.0,
            scroll_height: 2000.0,
            client_height: 800.0,
        };
        assert!(metrics.is_at_bottom(2.0));
        assert!(!ScrollMetrics { scroll_top: 1190.0, ..metrics }.is_at_bottom(2.0));
    }
}
