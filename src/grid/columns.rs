/// Column count detection for the card grid
///
/// The grid wraps cards onto lines, so the number of columns is whatever fits
/// on the first line. It changes with the window width and, when fewer cards
/// than columns are mounted, with the rendered count.
use crate::media::timer::TimerHandle;

/// Offsets closer than this are treated as the same row (px)
const ROW_TOLERANCE: f32 = 1.0;

/// Position of one grid child relative to the grid origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Lay out `count` equally sized children the way the wrap container does:
/// left to right, starting a new line when the next child would overflow.
pub fn wrap_layout(
    count: usize,
    available_width: f32,
    item_width: f32,
    item_height: f32,
    spacing: f32,
) -> Vec<ChildBox> {
    let mut boxes = Vec::with_capacity(count);
    let (mut x, mut y) = (0.0_f32, 0.0_f32);

    for _ in 0..count {
        if x > 0.0 && x + item_width > available_width {
            x = 0.0;
            y += item_height + spacing;
        }
        boxes.push(ChildBox {
            x,
            y,
            width: item_width,
            height: item_height,
        });
        x += item_width + spacing;
    }

    boxes
}

/// Width the cards wrap within, given the measured width of the grid content
/// and the padding on each side of it
pub fn wrap_width(content_width: f32, padding: f32) -> f32 {
    (content_width - padding * 2.0).max(0.0)
}

/// Count the children sharing the first child's top offset.
///
/// Always at least 1, including before anything is rendered.
pub fn measure_columns(children: &[ChildBox]) -> usize {
    let Some(first) = children.first() else {
        return 1;
    };

    children
        .iter()
        .take_while(|child| (child.y - first.y).abs() < ROW_TOLERANCE)
        .count()
        .max(1)
}

/// Runs a deferred job at most once per frame.
///
/// Holds a single pending handle: scheduling while a job is pending is a
/// no-op, so bursts of triggers collapse into one run.
#[derive(Debug)]
pub struct FrameScheduler<H> {
    pending: Option<H>,
}

impl<H> Default for FrameScheduler<H> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<H: TimerHandle> FrameScheduler<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a job unless one is already pending. `start` returns the job and
    /// the handle that can abort it.
    pub fn schedule<T>(&mut self, start: impl FnOnce() -> (T, H)) -> Option<T> {
        if self.pending.is_some() {
            return None;
        }
        let (job, handle) = start();
        self.pending = Some(handle);
        Some(job)
    }

    /// The frame arrived. Returns false when nothing was pending.
    pub fn fire(&mut self) -> bool {
        self.pending.take().is_some()
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending job, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
    }
}
