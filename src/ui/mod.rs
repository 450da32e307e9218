/// UI module
///
/// Widgets of the media wall:
/// - Media cards and loading skeletons (card.rs)
/// - Pull-to-load indicator drawn on a canvas (pull_indicator.rs)
/// - Live list statistics (stats.rs)
/// - Record preview dialog (dialog.rs)

pub mod card;
pub mod dialog;
pub mod pull_indicator;
pub mod stats;
