/// The loaded sequence and everything derived from it
///
/// Owns the records fetched so far, the keyset position of the next page and
/// the single in-flight request, along with the handle that can abort it.
/// Decides which slice of the sequence is
/// mounted for the current scroll position and column count.
use std::ops::Range;

use super::gesture::{FetchGate, FetchTrigger};
use super::window::{compute_window, row_aligned_len, ScrollMetrics, VisibleWindow, WindowConfig};
use crate::media::timer::TimerHandle;
use crate::state::data::{Cursor, Page, Record};

/// Identifies one page request; responses carrying another ticket are stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket(u64);

/// A page request the caller must run
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub ticket: FetchTicket,
    pub cursor: Option<Cursor>,
    pub page_size: usize,
    pub trigger: FetchTrigger,
}

/// What happened to a page response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Appended this many records
    Applied(usize),
    /// The request failed; the loaded sequence is untouched
    Failed,
    /// Response to a request that is no longer current
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListConfig {
    pub page_size: usize,
    pub virtualization_threshold: usize,
    pub window: WindowConfig,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            virtualization_threshold: 100,
            window: WindowConfig::default(),
        }
    }
}

/// Range of the loaded sequence to mount, plus the estimated space taken by
/// the rows around it
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub range: Range<usize>,
    pub top_spacer: f32,
    pub bottom_spacer: f32,
}

/// Snapshot for the stats panel
#[derive(Debug, Clone, PartialEq)]
pub struct ListStats {
    pub total: Option<i64>,
    pub loaded: usize,
    pub rendered: usize,
    /// Window before row alignment
    pub window: Range<usize>,
    pub next_cursor: Option<Cursor>,
    pub virtualized: bool,
    pub in_flight: bool,
    pub has_more: bool,
    pub columns: usize,
}

#[derive(Debug)]
pub struct ListOrchestrator<H = ()> {
    config: ListConfig,
    records: Vec<Record>,
    next_cursor: Option<Cursor>,
    has_more: bool,
    in_flight: Option<FetchTicket>,
    /// Aborts the in-flight request
    fetch: Option<H>,
    last_ticket: u64,
    /// At least one page arrived
    loaded_once: bool,
    total: Option<i64>,
    error: Option<String>,
    window: VisibleWindow,
    scroll: Option<ScrollMetrics>,
    columns: usize,
    touch_mode: bool,
    torn_down: bool,
}

impl<H: TimerHandle> ListOrchestrator<H> {
    pub fn new(config: ListConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
            next_cursor: None,
            has_more: true,
            in_flight: None,
            fetch: None,
            last_ticket: 0,
            loaded_once: false,
            total: None,
            error: None,
            window: VisibleWindow::default(),
            scroll: None,
            columns: 1,
            touch_mode: false,
            torn_down: false,
        }
    }

    // ========== Pagination ==========

    pub fn gate(&self) -> FetchGate {
        FetchGate {
            in_flight: self.in_flight.is_some(),
            has_more: self.has_more,
        }
    }

    /// Start the next page request unless one is in flight, the stream is
    /// exhausted, or the list was torn down.
    pub fn request_next_page(&mut self, trigger: FetchTrigger) -> Option<PageRequest> {
        if self.torn_down || !self.gate().is_open() {
            log::debug!("ignoring {trigger:?} trigger (gate {:?})", self.gate());
            return None;
        }

        self.last_ticket += 1;
        let ticket = FetchTicket(self.last_ticket);
        self.in_flight = Some(ticket);
        self.error = None;

        Some(PageRequest {
            ticket,
            cursor: self.next_cursor.clone(),
            page_size: self.config.page_size,
            trigger,
        })
    }

    /// Keep the handle of the job running `ticket`. A job for a request that
    /// is no longer current is aborted straight away.
    pub fn track_fetch(&mut self, ticket: FetchTicket, handle: H) {
        if self.in_flight == Some(ticket) {
            if let Some(previous) = self.fetch.replace(handle) {
                previous.cancel();
            }
        } else {
            handle.cancel();
        }
    }

    fn abort_fetch(&mut self) {
        if let Some(handle) = self.fetch.take() {
            log::debug!("aborting page request {:?}", self.in_flight);
            handle.cancel();
        }
        self.in_flight = None;
    }

    /// Apply the response to a page request
    pub fn apply_page<E: std::fmt::Display>(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page, E>,
    ) -> PageOutcome {
        if self.torn_down || self.in_flight != Some(ticket) {
            return PageOutcome::Ignored;
        }
        self.in_flight = None;
        self.fetch = None;

        match result {
            Ok(page) => {
                let count = page.items.len();
                let last = page.is_last(self.config.page_size);

                self.records.extend(page.items);
                self.total = Some(page.total);
                self.next_cursor = if last { None } else { page.next_cursor };
                self.has_more = self.next_cursor.is_some();
                self.loaded_once = true;
                self.recompute_window();

                log::info!(
                    "📄 Loaded {count} records ({} total, {})",
                    self.records.len(),
                    if self.has_more { "more available" } else { "end of stream" }
                );
                PageOutcome::Applied(count)
            }
            Err(e) => {
                log::warn!("⚠️  Page fetch failed: {e}");
                self.error = Some(e.to_string());
                PageOutcome::Failed
            }
        }
    }

    /// Forget every loaded record and start again from the top of the stream.
    /// The request in flight is aborted; should its response still arrive,
    /// it is ignored. Scroll metrics are dropped with the content they
    /// measured.
    pub fn reset(&mut self) {
        self.abort_fetch();
        self.records.clear();
        self.next_cursor = None;
        self.has_more = true;
        self.loaded_once = false;
        self.error = None;
        self.scroll = None;
        self.recompute_window();
    }

    /// Abort the request in flight and stop applying responses
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.abort_fetch();
    }

    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.next_cursor.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Waiting for the very first page
    pub fn is_loading(&self) -> bool {
        !self.loaded_once && self.error.is_none()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // ========== Records ==========

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Swap in a newer version of a loaded record, keeping its position
    pub fn replace_record(&mut self, record: Record) -> bool {
        match self.records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => {
                *existing = record;
                true
            }
            None => false,
        }
    }

    // ========== Windowing ==========

    pub fn set_touch_mode(&mut self, touch: bool) {
        if self.touch_mode != touch {
            self.touch_mode = touch;
            self.recompute_window();
        }
    }

    pub fn is_touch_mode(&self) -> bool {
        self.touch_mode
    }

    pub fn should_virtualize(&self) -> bool {
        !self.touch_mode && self.records.len() > self.config.virtualization_threshold
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Returns true when the column count changed
    pub fn set_columns(&mut self, columns: usize) -> bool {
        let columns = columns.max(1);
        if self.columns == columns {
            return false;
        }
        self.columns = columns;
        self.recompute_window();
        true
    }

    pub fn on_scroll(&mut self, metrics: ScrollMetrics) {
        self.scroll = Some(metrics);
        self.recompute_window();
    }

    pub fn scroll_metrics(&self) -> Option<&ScrollMetrics> {
        self.scroll.as_ref()
    }

    /// Window config for the current column count: a row of `columns` items
    /// shares one estimated row height.
    fn effective_window_config(&self) -> WindowConfig {
        WindowConfig {
            item_height: self.config.window.item_height / self.columns as f32,
            overscan: self.config.window.overscan,
        }
    }

    fn recompute_window(&mut self) {
        let len = self.records.len();
        self.window = match (self.should_virtualize(), self.scroll) {
            (true, Some(metrics)) => compute_window(
                metrics.scroll_top,
                metrics.client_height,
                len,
                &self.effective_window_config(),
            ),
            (true, None) => compute_window(0.0, 0.0, len, &self.effective_window_config()),
            (false, _) => VisibleWindow::full(len),
        };
    }

    pub fn window(&self) -> VisibleWindow {
        self.window
    }

    /// What to mount: the window, started on a row boundary and trimmed to
    /// whole rows, except that the final partial row shows once nothing more
    /// can arrive.
    pub fn render_plan(&self) -> RenderPlan {
        let columns = self.columns.max(1);
        let len = self.records.len();
        let window = self.window;

        let start = window.start - window.start % columns;
        let untrimmed = window.end - start;
        let end = if !self.has_more && !self.is_fetching() && window.end == len {
            window.end
        } else {
            start + row_aligned_len(untrimmed, columns)
        };

        let row_height = self.config.window.item_height;
        let (top_spacer, bottom_spacer) = if self.should_virtualize() {
            let rows_above = start / columns;
            let rows_below = (len - end).div_ceil(columns);
            (rows_above as f32 * row_height, rows_below as f32 * row_height)
        } else {
            (0.0, 0.0)
        };

        RenderPlan {
            range: start..end,
            top_spacer,
            bottom_spacer,
        }
    }

    /// Records to mount, in order
    pub fn rendered(&self) -> &[Record] {
        &self.records[self.render_plan().range]
    }

    /// Height of the mounted grid plus its spacers, before anything is laid out
    pub fn estimated_content_height(&self) -> f32 {
        let rows = self.records.len().div_ceil(self.columns.max(1));
        rows as f32 * self.config.window.item_height
    }

    /// Items whose covers should be loaded ahead of being mounted
    pub fn preload_range(&self, margin: usize) -> Range<usize> {
        let range = self.render_plan().range;
        range.start.saturating_sub(margin)..(range.end + margin).min(self.records.len())
    }

    pub fn stats(&self) -> ListStats {
        ListStats {
            total: self.total,
            loaded: self.records.len(),
            rendered: self.render_plan().range.len(),
            window: self.window.range(),
            next_cursor: self.next_cursor().cloned(),
            virtualized: self.should_virtualize(),
            in_flight: self.is_fetching(),
            has_more: self.has_more,
            columns: self.columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::library::tests::{fixture_record, seeded};
    use crate::state::library::Library;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Handle that remembers whether its job was aborted
    #[derive(Debug)]
    struct Abort(Rc<Cell<bool>>);

    impl TimerHandle for Abort {
        fn cancel(self) {
            self.0.set(true);
        }
    }

    fn tracked() -> (ListOrchestrator<Abort>, Rc<Cell<bool>>, PageRequest) {
        let mut list = ListOrchestrator::new(ListConfig::default());
        let aborted = Rc::new(Cell::new(false));
        let request = list.request_next_page(FetchTrigger::Initial).unwrap();
        list.track_fetch(request.ticket, Abort(aborted.clone()));
        (list, aborted, request)
    }

    fn list() -> ListOrchestrator {
        ListOrchestrator::new(ListConfig::default())
    }

    /// Drive the list against a catalog until the stream ends
    fn load_all(list: &mut ListOrchestrator, library: &Library) -> Vec<usize> {
        let mut sizes = Vec::new();
        while let Some(request) = list.request_next_page(FetchTrigger::Sentinel) {
            let page = library
                .fetch_page(request.cursor.as_ref(), request.page_size)
                .unwrap();
            match list.apply_page::<String>(request.ticket, Ok(page)) {
                PageOutcome::Applied(count) => sizes.push(count),
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        sizes
    }

    fn page_of(range: Range<usize>, more: bool) -> Page {
        let items: Vec<_> = range.map(fixture_record).collect();
        Page {
            next_cursor: if more { items.last().map(Record::cursor) } else { None },
            total: 1000,
            items,
        }
    }

    #[test]
    fn test_twelve_records_arrive_as_five_five_two() {
        let library = seeded(12);
        let mut list = list();

        assert_eq!(load_all(&mut list, &library), vec![5, 5, 2]);
        assert!(list.next_cursor().is_none());
        assert!(!list.has_more());
        assert_eq!(list.len(), 12);
        assert_eq!(list.stats().total, Some(12));
    }

    #[test]
    fn test_only_one_request_in_flight() {
        let mut list = list();
        let first = list.request_next_page(FetchTrigger::Initial).unwrap();

        assert!(list.request_next_page(FetchTrigger::Sentinel).is_none());
        assert!(list.request_next_page(FetchTrigger::Pull).is_none());
        assert!(list.request_next_page(FetchTrigger::Fling).is_none());

        list.apply_page::<String>(first.ticket, Ok(page_of(0..5, true)));
        let second = list.request_next_page(FetchTrigger::Sentinel).unwrap();
        assert_ne!(first.ticket, second.ticket);
        assert_eq!(second.cursor, Some(fixture_record(4).cursor()));
    }

    #[test]
    fn test_failed_fetch_keeps_records_and_allows_retry() {
        let mut list = list();
        let first = list.request_next_page(FetchTrigger::Initial).unwrap();
        list.apply_page::<String>(first.ticket, Ok(page_of(0..5, true)));

        let second = list.request_next_page(FetchTrigger::Sentinel).unwrap();
        let outcome = list.apply_page(second.ticket, Err::<Page, _>("disk I/O error"));
        assert_eq!(outcome, PageOutcome::Failed);
        assert_eq!(list.len(), 5);
        assert_eq!(list.error(), Some("disk I/O error"));
        assert!(!list.is_fetching());

        let retry = list.request_next_page(FetchTrigger::Retry).unwrap();
        assert_eq!(retry.cursor, second.cursor);
        assert!(list.error().is_none());
    }

    #[test]
    fn test_stale_and_torn_down_responses_are_ignored() {
        let mut list = list();
        let request = list.request_next_page(FetchTrigger::Initial).unwrap();

        let bogus = FetchTicket(request.ticket.0 + 7);
        assert_eq!(
            list.apply_page::<String>(bogus, Ok(page_of(0..5, true))),
            PageOutcome::Ignored
        );

        list.teardown();
        assert_eq!(
            list.apply_page::<String>(request.ticket, Ok(page_of(0..5, true))),
            PageOutcome::Ignored
        );
        assert!(list.is_empty());
        assert!(list.request_next_page(FetchTrigger::Sentinel).is_none());
    }

    #[test]
    fn test_reset_drops_records_and_stale_responses() {
        let mut list = list();
        let first = list.request_next_page(FetchTrigger::Initial).unwrap();
        list.apply_page::<String>(first.ticket, Ok(page_of(0..5, true)));
        let stale = list.request_next_page(FetchTrigger::Sentinel).unwrap();

        list.reset();
        assert!(list.is_empty());
        assert!(list.is_loading());
        assert_eq!(
            list.apply_page::<String>(stale.ticket, Ok(page_of(5..10, true))),
            PageOutcome::Ignored
        );

        let fresh = list.request_next_page(FetchTrigger::Initial).unwrap();
        assert!(fresh.cursor.is_none());
        assert_eq!(
            list.apply_page::<String>(fresh.ticket, Ok(page_of(0..5, true))),
            PageOutcome::Applied(5)
        );
    }

    #[test]
    fn test_reset_forgets_scroll_position_of_old_content() {
        let mut list = list();
        let first = list.request_next_page(FetchTrigger::Initial).unwrap();
        list.apply_page::<String>(first.ticket, Ok(page_of(0..5, true)));
        list.on_scroll(ScrollMetrics {
            scroll_top: 3_000.0,
            scroll_height: 4_000.0,
            client_height: 800.0,
        });

        list.reset();
        assert!(list.scroll_metrics().is_none());

        let fresh = list.request_next_page(FetchTrigger::Initial).unwrap();
        list.apply_page::<String>(fresh.ticket, Ok(page_of(0..5, true)));
        assert!(list.scroll_metrics().is_none());
        assert_eq!(list.window(), VisibleWindow::full(5));
        assert!(list.request_next_page(FetchTrigger::Sentinel).is_some());
    }

    #[test]
    fn test_reset_aborts_request_in_flight() {
        let (mut list, aborted, stale) = tracked();

        list.reset();
        assert!(aborted.get());
        assert!(!list.is_fetching());

        let fresh = list.request_next_page(FetchTrigger::Initial).unwrap();
        assert_eq!(
            list.apply_page::<String>(stale.ticket, Ok(page_of(0..5, true))),
            PageOutcome::Ignored
        );
        assert!(list.is_fetching());
        assert_eq!(
            list.apply_page::<String>(fresh.ticket, Ok(page_of(0..5, true))),
            PageOutcome::Applied(5)
        );
    }

    #[test]
    fn test_teardown_aborts_request_in_flight() {
        let (mut list, aborted, _) = tracked();
        list.teardown();
        assert!(aborted.get());
    }

    #[test]
    fn test_finished_request_is_not_aborted() {
        let (mut list, aborted, request) = tracked();
        list.apply_page::<String>(request.ticket, Ok(page_of(0..5, true)));
        list.reset();
        assert!(!aborted.get());
    }

    #[test]
    fn test_handle_for_stale_request_is_aborted() {
        let (mut list, _, stale) = tracked();
        list.reset();
        list.request_next_page(FetchTrigger::Initial).unwrap();

        let late = Rc::new(Cell::new(false));
        list.track_fetch(stale.ticket, Abort(late.clone()));
        assert!(late.get());
        assert!(list.is_fetching());
    }

    #[test]
    fn test_short_page_ends_the_stream() {
        let mut list = list();
        let request = list.request_next_page(FetchTrigger::Initial).unwrap();
        // Cursor present, but fewer items than requested
        list.apply_page::<String>(request.ticket, Ok(page_of(0..3, true)));

        assert!(!list.has_more());
        assert!(list.request_next_page(FetchTrigger::Pull).is_none());
    }

    #[test]
    fn test_partial_row_is_withheld_while_more_may_arrive() {
        let mut list = list();
        list.set_columns(3);
        let request = list.request_next_page(FetchTrigger::Initial).unwrap();
        list.config.page_size = 11;
        list.apply_page::<String>(request.ticket, Ok(page_of(0..11, true)));

        assert!(list.has_more());
        assert_eq!(list.render_plan().range, 0..9);
        assert_eq!(list.rendered().len(), 9);
    }

    #[test]
    fn test_partial_row_shows_at_end_of_stream() {
        let mut list = list();
        list.set_columns(3);
        let library = seeded(11);
        load_all(&mut list, &library);

        assert_eq!(list.render_plan().range, 0..11);
    }

    #[test]
    fn test_small_list_is_not_virtualized() {
        let mut list = list();
        let request = list.request_next_page(FetchTrigger::Initial).unwrap();
        list.config.page_size = 100;
        list.apply_page::<String>(request.ticket, Ok(page_of(0..100, true)));
        list.on_scroll(ScrollMetrics {
            scroll_top: 9000.0,
            scroll_height: 30_000.0,
            client_height: 800.0,
        });

        assert!(!list.should_virtualize());
        assert_eq!(list.window(), VisibleWindow::full(100));
    }

    fn large_list(columns: usize) -> ListOrchestrator {
        let mut list = list();
        list.config.page_size = 300;
        list.set_columns(columns);
        let request = list.request_next_page(FetchTrigger::Initial).unwrap();
        list.apply_page::<String>(request.ticket, Ok(page_of(0..300, true)));
        list
    }

    #[test]
    fn test_large_list_is_windowed() {
        let mut list = large_list(1);
        assert!(list.should_virtualize());

        list.on_scroll(ScrollMetrics {
            scroll_top: 10_000.0,
            scroll_height: 75_000.0,
            client_height: 800.0,
        });
        assert_eq!(list.window(), VisibleWindow { start: 20, end: 64 });

        let plan = list.render_plan();
        assert_eq!(plan.range, 20..64);
        assert_eq!(plan.top_spacer, 20.0 * 250.0);
        assert_eq!(plan.bottom_spacer, (300.0 - 64.0) * 250.0);
    }

    #[test]
    fn test_windowed_range_starts_on_a_row_boundary() {
        let mut list = large_list(4);
        // 4 columns: 62.5px per item
        list.on_scroll(ScrollMetrics {
            scroll_top: 5_000.0,
            scroll_height: 18_750.0,
            client_height: 800.0,
        });
        // floor(5000 / 62.5) - 20 = 60, ceil(5800 / 62.5) + 20 = 113
        assert_eq!(list.window(), VisibleWindow { start: 60, end: 113 });

        let plan = list.render_plan();
        assert_eq!(plan.range.start % 4, 0);
        assert_eq!(plan.range.len() % 4, 0);
        assert_eq!(plan.range, 60..112);
        assert_eq!(plan.top_spacer, 15.0 * 250.0);
    }

    #[test]
    fn test_touch_mode_disables_windowing() {
        let mut list = large_list(1);
        list.on_scroll(ScrollMetrics {
            scroll_top: 10_000.0,
            scroll_height: 75_000.0,
            client_height: 800.0,
        });
        list.set_touch_mode(true);

        assert!(!list.should_virtualize());
        assert_eq!(list.window(), VisibleWindow::full(300));
        assert_eq!(list.render_plan().top_spacer, 0.0);
    }

    #[test]
    fn test_replace_record_keeps_position() {
        let mut list = list();
        let request = list.request_next_page(FetchTrigger::Initial).unwrap();
        list.apply_page::<String>(request.ticket, Ok(page_of(0..5, true)));

        let mut updated = fixture_record(2);
        updated.cover_url = Some("/covers/new.jpg".into());
        assert!(list.replace_record(updated.clone()));
        assert_eq!(list.records()[2], updated);
        assert!(!list.replace_record(fixture_record(99)));
    }

    #[test]
    fn test_preload_range_widens_rendered_range() {
        let mut list = large_list(1);
        list.on_scroll(ScrollMetrics {
            scroll_top: 10_000.0,
            scroll_height: 75_000.0,
            client_height: 800.0,
        });
        assert_eq!(list.preload_range(10), 10..74);
    }
}
