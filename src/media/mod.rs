/// Media module
///
/// This module handles everything a card shows beyond its record:
/// - Cover loading and regeneration (cover.rs)
/// - Which covers already loaded this session (image_cache.rs)
/// - Hover-triggered playable previews (preview.rs)
/// - Cancellable timers backing the hover delay (timer.rs)

pub mod cover;
pub mod image_cache;
pub mod preview;
pub mod timer;
