/// Grid module
///
/// Everything that decides what the card grid shows and when it grows:
/// - Viewport windowing math (window.rs)
/// - Column measurement and frame-coalesced scheduling (columns.rs)
/// - Touch gestures and scroll tracking (gesture.rs)
/// - The paginated, windowed sequence itself (list.rs)

pub mod columns;
pub mod gesture;
pub mod list;
pub mod window;
