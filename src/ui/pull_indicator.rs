/// Pull-to-load feedback drawn below the last card
use iced::alignment::{Horizontal, Vertical};
use iced::widget::canvas::{self, Frame, Text};
use iced::{Color, Point, Rectangle, Renderer, Size, Theme};

use crate::Message;

/// Draws how far the current pull has travelled towards the threshold
#[derive(Debug, Clone, Copy)]
pub struct PullIndicator {
    pub distance: f32,
    pub threshold: f32,
    pub max_pull: f32,
}

impl PullIndicator {
    /// Fraction of the bar to fill, in `[0, 1]`
    pub fn progress(&self) -> f32 {
        if self.max_pull <= 0.0 {
            return 0.0;
        }
        (self.distance / self.max_pull).clamp(0.0, 1.0)
    }

    pub fn is_armed(&self) -> bool {
        self.distance >= self.threshold
    }

    pub fn label(&self) -> &'static str {
        if self.is_armed() {
            "Release to load more"
        } else {
            "Pull up to load more"
        }
    }
}

impl canvas::Program<Message> for PullIndicator {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: iced::mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());

        let track_height = 4.0;
        let track_y = bounds.height - track_height;
        frame.fill_rectangle(
            Point::new(0.0, track_y),
            Size::new(bounds.width, track_height),
            Color::from_rgb(0.25, 0.25, 0.27),
        );

        // Threshold marker
        let marker_x = bounds.width * (self.threshold / self.max_pull.max(1.0)).min(1.0);
        frame.fill_rectangle(
            Point::new(marker_x - 1.0, track_y - 2.0),
            Size::new(2.0, track_height + 2.0),
            Color::from_rgb(0.6, 0.6, 0.6),
        );

        let fill = if self.is_armed() {
            Color::from_rgb(0.3, 0.8, 0.4)
        } else {
            Color::from_rgb(0.4, 0.6, 1.0)
        };
        frame.fill_rectangle(
            Point::new(0.0, track_y),
            Size::new(bounds.width * self.progress(), track_height),
            fill,
        );

        frame.fill_text(Text {
            content: self.label().to_string(),
            position: Point::new(bounds.width / 2.0, track_y / 2.0),
            color: Color::WHITE,
            size: 13.0.into(),
            horizontal_alignment: Horizontal::Center,
            vertical_alignment: Vertical::Center,
            ..Text::default()
        });

        vec![frame.into_geometry()]
    }
}
