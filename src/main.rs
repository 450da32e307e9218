use iced::event::{self, Event};
use iced::task;
use iced::widget::scrollable::{AbsoluteOffset, Viewport};
use iced::widget::{
    button, canvas, column, container, image, row, scrollable, stack, text, Space,
};
use iced::{touch, window, Alignment, Element, Length, Size, Subscription, Task, Theme};
use iced_aw::Wrap;
use rfd::FileDialog;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Declare the modules
mod grid;
mod media;
mod state;
mod ui;

use grid::columns::{measure_columns, wrap_layout, wrap_width, FrameScheduler};
use grid::gesture::{sentinel_visible, FetchTrigger, GestureConfig, GestureController};
use grid::list::{FetchTicket, ListConfig, ListOrchestrator, PageOutcome, PageRequest};
use grid::window::{ScrollMetrics, WindowConfig};
use media::cover::{CoverError, CoverImage, CoverService};
use media::image_cache::ImageLoadCache;
use media::preview::{HoverPreview, HoverStart, ResolveRequest};
use media::timer::TimerToken;
use state::config::Config;
use state::data::{Page, Record};
use state::error::LibraryError;
use state::library::Library;
use state::source::{self, ImportResult};
use ui::card::{self, CardView};
use ui::dialog::PreviewDialog;
use ui::pull_indicator::PullIndicator;
use ui::stats::Dashboard;

const WINDOW_SIZE: Size = Size::new(1280.0, 800.0);
const HEADER_HEIGHT: f32 = 64.0;
/// Space below the last card: status line or pull indicator
const FOOTER_HEIGHT: f32 = 48.0;
const GRID_PADDING: f32 = 16.0;
const STATS_WIDTH: f32 = 300.0;
/// Delay standing in for "next animation frame"
const FRAME: Duration = Duration::from_millis(16);

fn grid_scroll_id() -> scrollable::Id {
    scrollable::Id::new("media-wall-grid")
}

/// Main application state
struct MediaWall {
    config: Config,
    db_path: PathBuf,
    list: ListOrchestrator<task::Handle>,
    gesture: GestureController,
    /// Which covers finished loading this session
    images: ImageLoadCache,
    /// Decoded covers by URL
    covers: HashMap<String, image::Handle>,
    preview: HoverPreview<task::Handle>,
    measure: FrameScheduler<task::Handle>,
    cover_service: CoverService,
    window_size: Size,
    /// Width of the scrolled content as last reported by the grid
    content_width: Option<f32>,
    /// Record shown in the preview dialog
    dialog: Option<Record>,
    /// Ids with a cover regeneration in progress
    regenerating: HashSet<String>,
    show_stats: bool,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    PageLoaded(FetchTicket, Result<Page, Arc<LibraryError>>),
    Scrolled(Viewport),
    Touch(touch::Event),
    WindowResized(Size),
    /// The deferred column measurement is due
    MeasureColumns,
    CoverLoaded(String, Result<CoverImage, Arc<CoverError>>),
    HoverStart(String),
    HoverEnd(String),
    HoverElapsed(String, TimerToken),
    SourceResolved(String, Result<Option<Record>, Arc<LibraryError>>),
    OpenPreview(String),
    ClosePreview,
    RegenerateCover(String),
    CoverRegenerated(String, Result<Option<String>, Arc<CoverError>>),
    CoverStored(String, Result<Option<Record>, Arc<LibraryError>>),
    ToggleStats,
    /// Retry the page fetch that failed
    Retry,
    /// User clicked the "Import Folder" button
    ImportFolder,
    /// Background import completed with results
    ImportComplete(Result<ImportResult, Arc<LibraryError>>),
    CloseRequested(window::Id),
}

impl MediaWall {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let config = Config::load().unwrap_or_else(|e| {
            log::warn!("⚠️  Ignoring unreadable configuration: {e}");
            Config::default()
        });

        let db_path = config
            .database_path()
            .unwrap_or_else(|| PathBuf::from("media_wall.db"));

        let opened = Library::open(&db_path).and_then(|library| {
            let count = library.record_count()?;
            log::info!(
                "🎬 Media wall initialized with {count} records ({})",
                library.path().display()
            );
            Ok(count)
        });

        let status = match opened {
            Ok(count) => format!("{count} records in catalog."),
            Err(e) => {
                log::warn!("⚠️  Catalog at {} is unavailable: {e}", db_path.display());
                format!("Catalog unavailable: {e}")
            }
        };

        let mut list = ListOrchestrator::new(ListConfig {
            page_size: config.page_size,
            virtualization_threshold: config.virtualization_threshold,
            window: WindowConfig {
                item_height: config.estimated_item_height,
                overscan: config.overscan,
            },
        });
        list.set_touch_mode(config.touch_mode.unwrap_or(false));

        let gesture = GestureController::new(GestureConfig {
            pull_threshold: config.pull_threshold,
            max_pull: config.max_pull,
            speed_threshold: config.speed_threshold,
            ..GestureConfig::default()
        });

        let mut app = MediaWall {
            db_path,
            list,
            gesture,
            images: ImageLoadCache::new(),
            covers: HashMap::new(),
            preview: HoverPreview::new(config.preview_delay(), config.source_ttl()),
            measure: FrameScheduler::new(),
            cover_service: CoverService::new(
                &config.cover_service_url,
                &config.cover_timestamp,
                config.cover_timeout(),
            ),
            window_size: WINDOW_SIZE,
            content_width: None,
            dialog: None,
            regenerating: HashSet::new(),
            show_stats: false,
            status,
            config,
        };

        let first_page = app.next_page(FetchTrigger::Initial);
        (app, first_page)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PageLoaded(ticket, result) => match self.list.apply_page(ticket, result) {
                PageOutcome::Applied(_) => {
                    // Level check: the new rows may still leave the bottom in view
                    let metrics = self.grown_metrics();
                    Task::batch([self.after_list_change(), self.check_sentinel(metrics)])
                }
                PageOutcome::Failed => Task::none(),
                PageOutcome::Ignored => {
                    log::debug!("dropping stale page response");
                    Task::none()
                }
            },
            Message::Scrolled(viewport) => {
                let metrics = ScrollMetrics {
                    scroll_top: viewport.absolute_offset().y,
                    scroll_height: viewport.content_bounds().height,
                    client_height: viewport.bounds().height,
                };
                self.gesture.on_scroll(metrics.scroll_top, Instant::now());

                let width = viewport.content_bounds().width;
                let resized = self.content_width != Some(width);
                self.content_width = Some(width);

                let before = self.list.render_plan().range;
                self.list.on_scroll(metrics);

                let mut tasks = vec![self.check_sentinel(metrics)];
                if self.list.render_plan().range != before {
                    tasks.push(self.after_list_change());
                } else if resized {
                    tasks.push(self.schedule_measure());
                }
                Task::batch(tasks)
            }
            Message::Touch(event) => self.on_touch(event),
            Message::WindowResized(size) => {
                self.window_size = size;
                self.content_width = None;
                let metrics = self.grown_metrics();
                Task::batch([self.schedule_measure(), self.check_sentinel(metrics)])
            }
            Message::MeasureColumns => {
                if !self.measure.fire() {
                    return Task::none();
                }
                let rendered = self.list.render_plan().range.len();
                let boxes = wrap_layout(
                    rendered,
                    self.grid_width(),
                    self.config.card_width,
                    self.config.estimated_item_height - self.config.spacing,
                    self.config.spacing,
                );
                let columns = measure_columns(&boxes);
                if self.list.set_columns(columns) {
                    log::debug!("grid now has {columns} columns");
                    let metrics = self.grown_metrics();
                    Task::batch([self.after_list_change(), self.check_sentinel(metrics)])
                } else {
                    Task::none()
                }
            }
            Message::CoverLoaded(url, result) => {
                match result {
                    Ok(cover) => {
                        let handle =
                            image::Handle::from_rgba(cover.width, cover.height, cover.pixels);
                        self.covers.insert(url.clone(), handle);
                        self.images.mark_loaded(&url);
                    }
                    Err(e) => {
                        log::warn!("⚠️  Failed to load cover {url}: {e}");
                        self.images.load_failed(&url);
                    }
                }
                Task::none()
            }
            Message::HoverStart(id) => match self.preview.hover_start(&id, Instant::now()) {
                HoverStart::Activated => Task::none(),
                HoverStart::Debounce => {
                    let (timer, handle) =
                        Task::perform(tokio::time::sleep(self.preview.delay()), |_| ()).abortable();
                    let token = self.preview.arm(&id, handle);
                    timer.map(move |_| Message::HoverElapsed(id.clone(), token))
                }
            },
            Message::HoverEnd(id) => {
                self.preview.hover_end(&id);
                Task::none()
            }
            Message::HoverElapsed(id, token) => {
                match self.preview.timer_elapsed(&id, token, Instant::now()) {
                    Some(request) => self.resolve_source(request),
                    None => Task::none(),
                }
            }
            Message::SourceResolved(id, result) => match result {
                Ok(latest) => {
                    let fallback = self.list.record(&id).and_then(|r| r.media_url.clone());
                    let source = latest
                        .as_ref()
                        .and_then(|record| record.media_url.clone())
                        .or(fallback);

                    if self.preview.source_resolved(&id, source, Instant::now()) {
                        log::debug!("preview active for {id}");
                    }
                    match latest {
                        Some(record) => self.replace_record(record),
                        None => Task::none(),
                    }
                }
                Err(e) => {
                    log::warn!("⚠️  Could not resolve media source for {id}: {e}");
                    self.preview.source_failed(&id);
                    Task::none()
                }
            },
            Message::OpenPreview(id) => {
                let Some(record) = self.list.record(&id).cloned() else {
                    return Task::none();
                };
                self.dialog = Some(record);
                match self.preview.request_source(&id, Instant::now()) {
                    Some(request) => self.resolve_source(request),
                    None => Task::none(),
                }
            }
            Message::ClosePreview => {
                self.dialog = None;
                Task::none()
            }
            Message::RegenerateCover(id) => {
                if !self.regenerating.insert(id.clone()) {
                    return Task::none();
                }
                self.status = format!("Regenerating cover for {id}...");

                let service = self.cover_service.clone();
                let key = id.clone();
                Task::perform(
                    async move { service.regenerate(&key, true).await.map_err(Arc::new) },
                    move |result| Message::CoverRegenerated(id.clone(), result),
                )
            }
            Message::CoverRegenerated(id, result) => {
                let db_path = self.db_path.clone();
                let key = id.clone();
                match result {
                    Ok(Some(cover_url)) => Task::perform(
                        source::store_cover(db_path, key, cover_url),
                        move |result| Message::CoverStored(id.clone(), result),
                    ),
                    // The service stored the cover itself; read the record back
                    Ok(None) => Task::perform(source::fetch_record(db_path, key), move |result| {
                        Message::CoverStored(id.clone(), result)
                    }),
                    Err(e) => {
                        self.regenerating.remove(&id);
                        log::warn!("⚠️  Cover regeneration failed for {id}: {e}");
                        self.status = format!("Cover regeneration failed for {id}: {e}");
                        Task::none()
                    }
                }
            }
            Message::CoverStored(id, result) => {
                self.regenerating.remove(&id);
                match result {
                    Ok(Some(record)) => {
                        self.status = format!("✅ Cover updated for {id}.");
                        if let Some(url) = record.cover_url.as_deref() {
                            self.images.retry(url);
                        }
                        self.replace_record(record)
                    }
                    Ok(None) => {
                        self.status = format!("{id} is no longer in the catalog.");
                        Task::none()
                    }
                    Err(e) => {
                        self.status = format!("Could not store the new cover for {id}: {e}");
                        Task::none()
                    }
                }
            }
            Message::ToggleStats => {
                self.show_stats = !self.show_stats;
                self.content_width = None;
                self.schedule_measure()
            }
            Message::Retry => self.next_page(FetchTrigger::Retry),
            Message::ImportFolder => {
                // Show the native folder picker dialog
                let folder = FileDialog::new()
                    .set_title("Select Folder with Videos")
                    .pick_folder();

                if let Some(folder_path) = folder {
                    self.status = format!("Importing from {}...", folder_path.display());

                    // Launch async import task
                    return Task::perform(
                        source::import_folder(folder_path, self.db_path.clone()),
                        Message::ImportComplete,
                    );
                }

                Task::none()
            }
            Message::ImportComplete(result) => match result {
                Ok(result) => {
                    self.status = format!(
                        "✅ Import complete! Added {} videos, skipped {} duplicates.",
                        result.imported_count, result.skipped_count
                    );

                    // Start over from the newest record
                    self.list.reset();
                    self.gesture.reset_scroll();
                    self.dialog = None;
                    Task::batch([
                        scrollable::scroll_to(grid_scroll_id(), AbsoluteOffset { x: 0.0, y: 0.0 }),
                        self.next_page(FetchTrigger::Initial),
                    ])
                }
                Err(e) => {
                    self.status = format!("Import failed: {e}");
                    Task::none()
                }
            },
            Message::CloseRequested(id) => {
                self.teardown();
                window::close(id)
            }
        }
    }

    // ========== Paging ==========

    fn next_page(&mut self, trigger: FetchTrigger) -> Task<Message> {
        match self.list.request_next_page(trigger) {
            Some(request) => self.fetch_page(request),
            None => Task::none(),
        }
    }

    fn fetch_page(&mut self, request: PageRequest) -> Task<Message> {
        log::debug!(
            "fetching {} records after {:?} ({:?})",
            request.page_size,
            request.cursor,
            request.trigger
        );
        let ticket = request.ticket;
        let (fetch, handle) = Task::perform(
            source::fetch_page(
                self.db_path.clone(),
                request.cursor,
                request.page_size,
                self.config.fetch_retries,
            ),
            move |result| Message::PageLoaded(ticket, result),
        )
        .abortable();
        self.list.track_fetch(ticket, handle);
        fetch
    }

    fn check_sentinel(&mut self, metrics: ScrollMetrics) -> Task<Message> {
        let visible = sentinel_visible(&metrics, FOOTER_HEIGHT);
        match self.gesture.check_sentinel(visible, self.list.gate()) {
            Some(trigger) => self.next_page(trigger),
            None => Task::none(),
        }
    }

    /// Scroll metrics accounting for content added since the last scroll
    /// event, which the scrollable only reports on the next scroll.
    fn grown_metrics(&self) -> ScrollMetrics {
        let estimated = self.list.estimated_content_height() + FOOTER_HEIGHT + GRID_PADDING * 2.0;
        match self.list.scroll_metrics() {
            Some(metrics) => ScrollMetrics {
                scroll_height: metrics.scroll_height.max(estimated),
                ..*metrics
            },
            None => ScrollMetrics {
                scroll_top: 0.0,
                scroll_height: estimated,
                client_height: self.window_size.height - HEADER_HEIGHT,
            },
        }
    }

    // ========== Rendering support ==========

    /// Preload covers and re-measure columns after the rendered set changed
    fn after_list_change(&mut self) -> Task<Message> {
        Task::batch([self.preload_covers(), self.schedule_measure()])
    }

    fn preload_covers(&mut self) -> Task<Message> {
        let range = self.list.preload_range(self.config.preload_margin);
        let urls = self.images.preload_batch(
            self.list.records()[range]
                .iter()
                .filter_map(|record| record.cover_url.as_deref()),
        );

        Task::batch(urls.into_iter().map(|url| {
            let service = self.cover_service.clone();
            let key = url.clone();
            Task::perform(
                async move { service.load_cover(&url).await },
                move |result| Message::CoverLoaded(key.clone(), result.map_err(Arc::new)),
            )
        }))
    }

    fn schedule_measure(&mut self) -> Task<Message> {
        self.measure
            .schedule(|| {
                Task::perform(tokio::time::sleep(FRAME), |_| Message::MeasureColumns).abortable()
            })
            .unwrap_or_else(Task::none)
    }

    /// Width available to the card grid: measured once the grid reported
    /// its layout, estimated from the window before that
    fn grid_width(&self) -> f32 {
        let content_width = self.content_width.unwrap_or_else(|| {
            let stats_width = if self.show_stats { STATS_WIDTH } else { 0.0 };
            self.window_size.width - stats_width
        });
        wrap_width(content_width, GRID_PADDING)
    }

    fn replace_record(&mut self, record: Record) -> Task<Message> {
        if let Some(open) = self.dialog.as_mut().filter(|open| open.id == record.id) {
            *open = record.clone();
        }
        if self.list.replace_record(record) {
            self.preload_covers()
        } else {
            Task::none()
        }
    }

    fn resolve_source(&self, request: ResolveRequest) -> Task<Message> {
        let id = request.id;
        Task::perform(
            source::fetch_record(self.db_path.clone(), id.clone()),
            move |result| Message::SourceResolved(id.clone(), result),
        )
    }

    // ========== Gestures ==========

    fn on_touch(&mut self, event: touch::Event) -> Task<Message> {
        let mut tasks = Vec::new();
        if self.config.touch_mode.is_none() && !self.list.is_touch_mode() {
            log::info!("👆 Touch input detected, rendering the whole list");
            self.list.set_touch_mode(true);
            tasks.push(self.after_list_change());
        }

        let now = Instant::now();
        let metrics = self.list.scroll_metrics().copied();

        match event {
            touch::Event::FingerPressed { position, .. } => {
                self.gesture.touch_start(position.y, now, metrics.as_ref());
            }
            touch::Event::FingerMoved { position, .. } => {
                // The scrollable has no overscroll of its own to suppress
                let _ = self.gesture.touch_move(position.y, metrics.as_ref());
            }
            touch::Event::FingerLifted { position, .. } => {
                let gate = self.list.gate();
                let trigger = self.gesture.touch_end(position.y, now, metrics.as_ref(), gate);
                if let Some(trigger) = trigger {
                    tasks.push(self.next_page(trigger));
                }
            }
            touch::Event::FingerLost { .. } => self.gesture.touch_cancel(),
        }

        Task::batch(tasks)
    }

    fn teardown(&mut self) {
        log::info!("👋 Closing media wall");
        self.list.teardown();
        self.preview.teardown();
        self.measure.cancel();
    }

    // ========== View ==========

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let header = row![
            text("Media Wall").size(28),
            Space::with_width(Length::Fill),
            text(&self.status).size(13),
            button("Import Folder")
                .on_press(Message::ImportFolder)
                .padding(8),
            button(if self.show_stats { "Hide stats" } else { "Stats" })
                .on_press(Message::ToggleStats)
                .style(button::secondary)
                .padding(8),
        ]
        .spacing(12)
        .padding(16)
        .height(HEADER_HEIGHT)
        .align_y(Alignment::Center);

        let body: Element<Message> = if self.list.is_loading() {
            centered(text("Loading...").size(18).into())
        } else if self.list.is_empty() {
            match self.list.error() {
                Some(error) => centered(
                    column![
                        text(format!("Could not load media: {error}")),
                        button("Retry").on_press(Message::Retry),
                    ]
                    .spacing(12)
                    .align_x(Alignment::Center)
                    .into(),
                ),
                None => centered(text("No media yet. Import a folder to get started.").into()),
            }
        } else {
            self.grid()
        };

        let main: Element<Message> = if self.show_stats {
            row![
                container(body).width(Length::Fill),
                container(self.dashboard().view())
                    .width(STATS_WIDTH)
                    .padding(16),
            ]
            .into()
        } else {
            body
        };

        let content = column![header, main];

        match &self.dialog {
            Some(record) => {
                let dialog = PreviewDialog {
                    record,
                    cover: self.cover_handle(record),
                    source: self
                        .preview
                        .source(&record.id)
                        .or(record.media_url.as_deref()),
                    resolving: self.preview.is_resolving(&record.id),
                    regenerating: self.regenerating.contains(&record.id),
                };
                stack![content, dialog.view()].into()
            }
            None => content.into(),
        }
    }

    fn grid(&self) -> Element<Message> {
        let plan = self.list.render_plan();

        let cards = self
            .list
            .rendered()
            .iter()
            .map(|record| {
                CardView {
                    record,
                    cover: self.cover_handle(record),
                    cover_pending: record
                        .cover_url
                        .as_deref()
                        .is_some_and(|url| self.images.is_pending(url)),
                    active_source: self
                        .preview
                        .is_active(&record.id)
                        .then(|| self.preview.source(&record.id))
                        .flatten(),
                    ready: self.preview.is_ready(&record.id),
                    regenerating: self.regenerating.contains(&record.id),
                }
                .view(self.config.card_width)
            })
            .collect();

        let wrap = Wrap::with_elements(cards)
            .spacing(self.config.spacing)
            .line_spacing(self.config.spacing);

        let mut items = column![].width(Length::Fill).padding(GRID_PADDING);
        if plan.top_spacer > 0.0 {
            items = items.push(Space::with_height(plan.top_spacer));
        }
        items = items.push(wrap);
        if plan.bottom_spacer > 0.0 {
            items = items.push(Space::with_height(plan.bottom_spacer));
        }
        if self.list.is_fetching() {
            items = items.push(card::skeleton_row(
                self.list.columns(),
                self.config.card_width,
                self.config.spacing,
            ));
        }
        items = items.push(self.footer());

        scrollable(items)
            .id(grid_scroll_id())
            .on_scroll(Message::Scrolled)
            .height(Length::Fill)
            .into()
    }

    fn footer(&self) -> Element<Message> {
        let pull = self.gesture.pull_distance();
        if pull > 0.0 {
            let indicator = PullIndicator {
                distance: pull,
                threshold: self.config.pull_threshold,
                max_pull: self.config.max_pull,
            };
            return canvas(indicator)
                .width(Length::Fill)
                .height(FOOTER_HEIGHT)
                .into();
        }

        let status: Element<Message> = match (self.list.error(), self.list.has_more()) {
            (Some(error), _) => row![
                text(format!("Loading failed: {error}")).size(13),
                button("Retry").on_press(Message::Retry).padding(6),
            ]
            .spacing(12)
            .align_y(Alignment::Center)
            .into(),
            (None, true) if self.list.is_fetching() => text("Loading more...").size(13).into(),
            (None, true) => text("Scroll for more").size(13).into(),
            (None, false) => text(format!("All {} items loaded", self.list.len())).size(13).into(),
        };

        container(status)
            .width(Length::Fill)
            .height(FOOTER_HEIGHT)
            .center_x(Length::Fill)
            .center_y(FOOTER_HEIGHT)
            .into()
    }

    fn cover_handle(&self, record: &Record) -> Option<&image::Handle> {
        record
            .cover_url
            .as_deref()
            .filter(|url| self.images.is_loaded(url))
            .and_then(|url| self.covers.get(url))
    }

    fn dashboard(&self) -> Dashboard {
        Dashboard {
            list: self.list.stats(),
            scroll_speed: self.gesture.speed(),
            pull_distance: self.gesture.pull_distance(),
            pull_armed: self.gesture.is_pull_armed(),
            hover_timers: self.preview.pending_timers(),
            covers_loaded: self.images.loaded_count(),
            touch_mode: self.list.is_touch_mode(),
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let events = event::listen_with(|event, _status, _window| match event {
            Event::Touch(touch) => Some(Message::Touch(touch)),
            Event::Window(window::Event::Resized(size)) => Some(Message::WindowResized(size)),
            _ => None,
        });

        Subscription::batch([events, window::close_requests().map(Message::CloseRequested)])
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn centered(content: Element<Message>) -> Element<Message> {
    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    iced::application("Media Wall", MediaWall::update, MediaWall::view)
        .subscription(MediaWall::subscription)
        .theme(MediaWall::theme)
        .window_size(WINDOW_SIZE)
        .exit_on_close_request(false)
        .centered()
        .run_with(MediaWall::new)
}
