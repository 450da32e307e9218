/// Touch and scroll interpretation for "load the next page"
///
/// Three paths ask for the next page:
/// - the bottom sentinel coming into view while scrolling down,
/// - pulling past the bottom and releasing beyond the pull threshold,
/// - a fast upward fling released at the bottom.
///
/// All of them are gated on "nothing in flight and more pages exist".
use std::time::Instant;

use super::window::ScrollMetrics;

/// Height of the sentinel marker at the end of the list (px)
const SENTINEL_HEIGHT: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Why a page was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTrigger {
    Initial,
    Sentinel,
    Pull,
    Fling,
    Retry,
}

/// Pagination state the triggers are gated on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchGate {
    pub in_flight: bool,
    pub has_more: bool,
}

impl FetchGate {
    pub fn is_open(&self) -> bool {
        !self.in_flight && self.has_more
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    /// Pull needed to load on release (px)
    pub pull_threshold: f32,
    /// Pull distance is clamped to this (px)
    pub max_pull: f32,
    /// Release speed counted as a fling (px/s)
    pub speed_threshold: f32,
    /// "At bottom" tolerance while the finger is down (px)
    pub bottom_tolerance: f32,
    /// "At bottom" tolerance at release (px)
    pub release_bottom_tolerance: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pull_threshold: 120.0,
            max_pull: 180.0,
            speed_threshold: 1200.0,
            bottom_tolerance: 2.0,
            release_bottom_tolerance: 10.0,
        }
    }
}

/// Where and when a touch began
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchStart {
    pub y: f32,
    pub time: Instant,
    pub at_bottom: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GesturePhase {
    Idle,
    TrackingTouch(TouchStart),
    PullCandidate(TouchStart),
}

impl GesturePhase {
    fn start(&self) -> Option<TouchStart> {
        match self {
            GesturePhase::Idle => None,
            GesturePhase::TrackingTouch(start) | GesturePhase::PullCandidate(start) => Some(*start),
        }
    }
}

/// Outcome of a finger move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchMove {
    pub pull_distance: f32,
    /// The move belongs to a pull; the platform's own scrolling should not run
    pub prevent_default: bool,
}

/// Pull distance for a finger `delta_y` px above its start, if the gesture is
/// a pull at all.
pub fn pull_distance(
    delta_y: f32,
    started_at_bottom: bool,
    at_bottom_now: bool,
    max_pull: f32,
) -> Option<f32> {
    if (started_at_bottom || at_bottom_now) && delta_y > 0.0 {
        Some(delta_y.min(max_pull))
    } else {
        None
    }
}

/// Decide whether a released gesture loads the next page
pub fn release_trigger(
    pull_distance: f32,
    at_bottom: bool,
    delta_y: f32,
    speed: f32,
    gate: FetchGate,
    config: &GestureConfig,
) -> Option<FetchTrigger> {
    if !gate.is_open() {
        return None;
    }
    if pull_distance >= config.pull_threshold {
        return Some(FetchTrigger::Pull);
    }
    let swipe_up = delta_y > 0.0;
    if at_bottom && swipe_up && speed > config.speed_threshold {
        return Some(FetchTrigger::Fling);
    }
    None
}

/// Decide whether the sentinel being in view loads the next page
pub fn sentinel_trigger(
    visible: bool,
    direction: ScrollDirection,
    gate: FetchGate,
) -> Option<FetchTrigger> {
    let wanted = visible && direction == ScrollDirection::Down && gate.is_open();
    wanted.then_some(FetchTrigger::Sentinel)
}

/// Whether the 1px marker after the last card intersects the viewport.
/// `footer_height` is the content rendered below the marker.
pub fn sentinel_visible(metrics: &ScrollMetrics, footer_height: f32) -> bool {
    let marker_top = metrics.scroll_height - footer_height - SENTINEL_HEIGHT;
    metrics.scroll_top + metrics.client_height > marker_top
}

/// Direction and speed of container scrolling
#[derive(Debug, Clone, Copy)]
struct ScrollTracker {
    last: Option<(f32, Instant)>,
    direction: ScrollDirection,
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self {
            last: None,
            direction: ScrollDirection::Down,
        }
    }
}

impl ScrollTracker {
    /// Record a scroll position; returns the speed when it can be computed
    fn record(&mut self, top: f32, now: Instant) -> Option<f32> {
        let previous = self.last.replace((top, now));
        let (last_top, last_time) = previous?;

        let delta = top - last_top;
        if delta > 0.0 {
            self.direction = ScrollDirection::Down;
        } else if delta < 0.0 {
            self.direction = ScrollDirection::Up;
        }

        let elapsed = now.duration_since(last_time).as_secs_f32();
        (elapsed > 0.0).then(|| delta.abs() / elapsed)
    }
}

#[derive(Debug, Clone)]
pub struct GestureController {
    config: GestureConfig,
    phase: GesturePhase,
    pull_distance: f32,
    speed: f32,
    scroll: ScrollTracker,
}

impl GestureController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            phase: GesturePhase::Idle,
            pull_distance: 0.0,
            speed: 0.0,
            scroll: ScrollTracker::default(),
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn pull_distance(&self) -> f32 {
        self.pull_distance
    }

    /// Last scroll or gesture speed (px/s)
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn direction(&self) -> ScrollDirection {
        self.scroll.direction
    }

    pub fn is_pull_armed(&self) -> bool {
        self.pull_distance >= self.config.pull_threshold
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn on_scroll(&mut self, scroll_top: f32, now: Instant) {
        if let Some(speed) = self.scroll.record(scroll_top, now) {
            self.speed = speed;
        }
    }

    /// A finger went down. Without metrics (nothing laid out yet) the touch
    /// is tracked but never counts as starting at the bottom.
    pub fn touch_start(&mut self, y: f32, now: Instant, metrics: Option<&ScrollMetrics>) {
        let at_bottom = metrics.is_some_and(|m| m.is_at_bottom(self.config.bottom_tolerance));
        self.phase = GesturePhase::TrackingTouch(TouchStart {
            y,
            time: now,
            at_bottom,
        });
    }

    pub fn touch_move(&mut self, y: f32, metrics: Option<&ScrollMetrics>) -> TouchMove {
        let Some(start) = self.phase.start() else {
            return TouchMove {
                pull_distance: self.pull_distance,
                prevent_default: false,
            };
        };

        // Finger moving up is positive
        let delta_y = start.y - y;
        let at_bottom_now = metrics.is_some_and(|m| m.is_at_bottom(self.config.bottom_tolerance));

        match pull_distance(delta_y, start.at_bottom, at_bottom_now, self.config.max_pull) {
            Some(pull) => {
                self.pull_distance = pull;
                self.phase = GesturePhase::PullCandidate(start);
                TouchMove {
                    pull_distance: pull,
                    prevent_default: true,
                }
            }
            None => {
                self.pull_distance = 0.0;
                self.phase = GesturePhase::TrackingTouch(start);
                TouchMove {
                    pull_distance: 0.0,
                    prevent_default: false,
                }
            }
        }
    }

    /// The finger lifted. Returns the trigger if this release loads a page;
    /// the gesture is reset either way.
    pub fn touch_end(
        &mut self,
        y: f32,
        now: Instant,
        metrics: Option<&ScrollMetrics>,
        gate: FetchGate,
    ) -> Option<FetchTrigger> {
        let start = self.phase.start()?;
        let pull = self.pull_distance;
        self.reset();

        let elapsed = now.duration_since(start.time).as_secs_f32();
        if elapsed <= 0.0 {
            return None;
        }

        let delta_y = start.y - y;
        let speed = delta_y.abs() / elapsed;
        self.speed = speed;

        let tolerance = self.config.release_bottom_tolerance;
        let at_bottom = metrics.is_some_and(|m| m.is_at_bottom(tolerance));
        let trigger = release_trigger(pull, at_bottom, delta_y, speed, gate, &self.config);
        if let Some(trigger) = trigger {
            log::debug!("release loads next page ({trigger:?}, pull {pull:.0}px, {speed:.0}px/s)");
        }
        trigger
    }

    /// The platform cancelled the touch
    pub fn touch_cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.phase = GesturePhase::Idle;
        self.pull_distance = 0.0;
    }

    /// Forget the scroll history, as when the list starts over at the top
    pub fn reset_scroll(&mut self) {
        self.scroll = ScrollTracker::default();
        self.speed = 0.0;
    }

    pub fn check_sentinel(&self, visible: bool, gate: FetchGate) -> Option<FetchTrigger> {
        sentinel_trigger(visible, self.scroll.direction, gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const OPEN: FetchGate = FetchGate {
        in_flight: false,
        has_more: true,
    };

    fn at_bottom() -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 1200.0,
            scroll_height: 2000.0,
            client_height: 800.0,
        }
    }

    fn mid_list() -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 300.0,
            ..at_bottom()
        }
    }

    fn controller() -> GestureController {
        GestureController::new(GestureConfig::default())
    }

    #[test]
    fn test_pull_is_clamped() {
        let mut gestures = controller();
        let t0 = Instant::now();
        gestures.touch_start(600.0, t0, Some(&at_bottom()));

        for y in [590.0, 500.0, 300.0, 0.0, -400.0] {
            let moved = gestures.touch_move(y, Some(&at_bottom()));
            assert!((0.0..=180.0).contains(&moved.pull_distance));
            assert!(moved.prevent_default);
        }
        assert_eq!(gestures.pull_distance(), 180.0);
        assert!(matches!(gestures.phase(), GesturePhase::PullCandidate(_)));
    }

    #[test]
    fn test_moving_down_is_not_a_pull() {
        let mut gestures = controller();
        gestures.touch_start(300.0, Instant::now(), Some(&at_bottom()));
        gestures.touch_move(100.0, Some(&at_bottom()));

        let moved = gestures.touch_move(450.0, Some(&at_bottom()));
        assert_eq!(moved.pull_distance, 0.0);
        assert!(!moved.prevent_default);
        assert!(matches!(gestures.phase(), GesturePhase::TrackingTouch(_)));
    }

    #[test]
    fn test_pull_away_from_bottom_is_ignored() {
        let mut gestures = controller();
        gestures.touch_start(600.0, Instant::now(), Some(&mid_list()));
        let moved = gestures.touch_move(300.0, Some(&mid_list()));
        assert_eq!(moved.pull_distance, 0.0);
    }

    #[test]
    fn test_reaching_bottom_mid_gesture_allows_pull() {
        let mut gestures = controller();
        gestures.touch_start(600.0, Instant::now(), Some(&mid_list()));
        let moved = gestures.touch_move(450.0, Some(&at_bottom()));
        assert_eq!(moved.pull_distance, 150.0);
    }

    #[test]
    fn test_pull_release_past_threshold_loads_once() {
        let mut gestures = controller();
        let t0 = Instant::now();
        gestures.touch_start(600.0, t0, Some(&at_bottom()));
        gestures.touch_move(470.0, Some(&at_bottom()));
        assert!(gestures.is_pull_armed());

        let release = t0 + Duration::from_millis(900);
        assert_eq!(
            gestures.touch_end(470.0, release, Some(&at_bottom()), OPEN),
            Some(FetchTrigger::Pull)
        );
        assert_eq!(gestures.pull_distance(), 0.0);
        assert_eq!(gestures.phase(), GesturePhase::Idle);

        // A second release without a new touch does nothing
        assert_eq!(gestures.touch_end(470.0, release, Some(&at_bottom()), OPEN), None);
    }

    #[test]
    fn test_short_pull_does_not_load() {
        let mut gestures = controller();
        let t0 = Instant::now();
        gestures.touch_start(600.0, t0, Some(&at_bottom()));
        gestures.touch_move(520.0, Some(&at_bottom()));

        let release = t0 + Duration::from_millis(900);
        assert_eq!(gestures.touch_end(520.0, release, Some(&at_bottom()), OPEN), None);
        assert_eq!(gestures.pull_distance(), 0.0);
    }

    #[test]
    fn test_fast_fling_at_bottom_loads() {
        let mut gestures = controller();
        let t0 = Instant::now();
        gestures.touch_start(700.0, t0, Some(&mid_list()));

        // 300px in 100ms = 3000 px/s
        let release = t0 + Duration::from_millis(100);
        assert_eq!(
            gestures.touch_end(400.0, release, Some(&at_bottom()), OPEN),
            Some(FetchTrigger::Fling)
        );
        assert!((gestures.speed() - 3000.0).abs() < 1.0);
    }

    #[test]
    fn test_slow_or_downward_fling_does_not_load() {
        let config = GestureConfig::default();
        assert_eq!(release_trigger(0.0, true, 300.0, 800.0, OPEN, &config), None);
        assert_eq!(release_trigger(0.0, true, -300.0, 5000.0, OPEN, &config), None);
        assert_eq!(release_trigger(0.0, false, 300.0, 5000.0, OPEN, &config), None);
    }

    #[test]
    fn test_release_is_gated() {
        let config = GestureConfig::default();
        let busy = FetchGate {
            in_flight: true,
            has_more: true,
        };
        let done = FetchGate {
            in_flight: false,
            has_more: false,
        };
        assert_eq!(release_trigger(180.0, true, 300.0, 5000.0, busy, &config), None);
        assert_eq!(release_trigger(180.0, true, 300.0, 5000.0, done, &config), None);
    }

    #[test]
    fn test_zero_duration_release_only_resets() {
        let mut gestures = controller();
        let t0 = Instant::now();
        gestures.touch_start(600.0, t0, Some(&at_bottom()));
        gestures.touch_move(400.0, Some(&at_bottom()));

        assert_eq!(gestures.touch_end(400.0, t0, Some(&at_bottom()), OPEN), None);
        assert_eq!(gestures.pull_distance(), 0.0);
    }

    #[test]
    fn test_touch_without_layout_is_harmless() {
        let mut gestures = controller();
        let t0 = Instant::now();
        assert_eq!(gestures.touch_move(10.0, None).pull_distance, 0.0);

        gestures.touch_start(600.0, t0, None);
        assert_eq!(gestures.touch_move(400.0, None).pull_distance, 0.0);
        assert_eq!(gestures.touch_end(400.0, t0 + Duration::from_millis(50), None, OPEN), None);
    }

    #[test]
    fn test_scroll_direction_and_speed() {
        let mut gestures = controller();
        let t0 = Instant::now();
        gestures.on_scroll(100.0, t0);
        gestures.on_scroll(50.0, t0 + Duration::from_millis(100));
        assert_eq!(gestures.direction(), ScrollDirection::Up);
        assert!((gestures.speed() - 500.0).abs() < 1.0);

        // No movement keeps the last direction
        gestures.on_scroll(50.0, t0 + Duration::from_millis(200));
        assert_eq!(gestures.direction(), ScrollDirection::Up);

        gestures.on_scroll(250.0, t0 + Duration::from_millis(300));
        assert_eq!(gestures.direction(), ScrollDirection::Down);
    }

    #[test]
    fn test_sentinel_requires_downward_scroll() {
        let mut gestures = controller();
        let t0 = Instant::now();
        assert_eq!(gestures.check_sentinel(true, OPEN), Some(FetchTrigger::Sentinel));

        gestures.on_scroll(500.0, t0);
        gestures.on_scroll(400.0, t0 + Duration::from_millis(16));
        assert_eq!(gestures.check_sentinel(true, OPEN), None);

        gestures.on_scroll(450.0, t0 + Duration::from_millis(32));
        assert_eq!(gestures.check_sentinel(false, OPEN), None);
        let busy = FetchGate {
            in_flight: true,
            has_more: true,
        };
        assert_eq!(gestures.check_sentinel(true, busy), None);
    }

    #[test]
    fn test_reset_scroll_reopens_the_sentinel() {
        let mut gestures = controller();
        let t0 = Instant::now();
        gestures.on_scroll(4000.0, t0);
        gestures.on_scroll(3000.0, t0 + Duration::from_millis(100));
        assert_eq!(gestures.direction(), ScrollDirection::Up);
        assert_eq!(gestures.check_sentinel(true, OPEN), None);

        gestures.reset_scroll();
        assert_eq!(gestures.direction(), ScrollDirection::Down);
        assert_eq!(gestures.speed(), 0.0);
        assert_eq!(gestures.check_sentinel(true, OPEN), Some(FetchTrigger::Sentinel));

        // The first scroll after the reset has nothing to compare against
        gestures.on_scroll(0.0, t0 + Duration::from_millis(200));
        assert_eq!(gestures.direction(), ScrollDirection::Down);
    }

    #[test]
    fn test_sentinel_visibility() {
        assert!(sentinel_visible(&at_bottom(), 40.0));
        assert!(!sentinel_visible(&mid_list(), 40.0));
        let near = ScrollMetrics {
            scroll_top: 1150.0,
            ..at_bottom()
        };
        // Marker sits at 1959..1960, viewport ends at 1950
        assert!(!sentinel_visible(&near, 40.0));
    }
}
