/// Media cards for the grid
use iced::widget::{button, column, container, image, mouse_area, row, stack, text, Space};
use iced::{Alignment, Background, Border, Color, ContentFit, Element, Length, Theme};

use crate::state::data::Record;
use crate::Message;

/// Height of the cover area (16:9 at the default card width)
pub const COVER_HEIGHT: f32 = 169.0;

/// Everything a card shows beyond its record
#[derive(Debug, Clone, Copy)]
pub struct CardView<'a> {
    pub record: &'a Record,
    /// Decoded cover, present once the cover finished loading
    pub cover: Option<&'a image::Handle>,
    /// The cover load was issued and has not finished
    pub cover_pending: bool,
    /// Playable source when the hover preview is active
    pub active_source: Option<&'a str>,
    /// A source was resolved at least once
    pub ready: bool,
    pub regenerating: bool,
}

impl<'a> CardView<'a> {
    pub fn view(self, width: f32) -> Element<'a, Message> {
        let id = self.record.id.clone();

        let cover = self.cover_area();
        let cover: Element<'a, Message> = match self.active_source {
            Some(source) => stack![cover, preview_overlay(source)].into(),
            None => cover,
        };

        let title = text(&self.record.id).size(14);
        let created = text(self.record.created_at.format("%Y-%m-%d %H:%M").to_string())
            .size(11)
            .color(Color::from_rgb(0.6, 0.6, 0.6));

        let regenerate = if self.regenerating {
            button(text("Regenerating...").size(11)).style(button::secondary)
        } else {
            button(text("New cover").size(11))
                .style(button::secondary)
                .on_press(Message::RegenerateCover(id.clone()))
        };

        let actions = row![
            button(text(if self.ready { "Preview ✓" } else { "Preview" }).size(11))
                .on_press(Message::OpenPreview(id.clone())),
            regenerate,
        ]
        .spacing(6)
        .align_y(Alignment::Center);

        let content = column![cover, title, created, actions].spacing(4);

        let card = container(content)
            .width(width)
            .padding(6)
            .style(container::rounded_box);

        mouse_area(card)
            .on_enter(Message::HoverStart(id.clone()))
            .on_exit(Message::HoverEnd(id))
            .into()
    }

    fn cover_area(&self) -> Element<'a, Message> {
        match (self.cover, self.record.cover_url.as_ref()) {
            (Some(handle), _) => image(handle.clone())
                .width(Length::Fill)
                .height(COVER_HEIGHT)
                .content_fit(ContentFit::Cover)
                .into(),
            (None, Some(_)) if self.cover_pending => skeleton(Length::Fill, COVER_HEIGHT),
            (None, cover_url) => {
                let label = if cover_url.is_some() {
                    "Cover unavailable"
                } else {
                    "No cover"
                };
                container(text(label).size(12))
                    .width(Length::Fill)
                    .height(COVER_HEIGHT)
                    .center_x(Length::Fill)
                    .center_y(COVER_HEIGHT)
                    .style(placeholder_style)
                    .into()
            }
        }
    }
}

fn preview_overlay<'a>(source: &str) -> Element<'a, Message> {
    let name = source.rsplit(['/', '\\']).next().unwrap_or(source).to_string();
    container(
        container(text(format!("▶ {name}")).size(12).color(Color::WHITE))
            .padding([2, 6])
            .style(badge_style),
    )
    .width(Length::Fill)
    .height(COVER_HEIGHT)
    .align_bottom(COVER_HEIGHT)
    .padding(6)
    .into()
}

/// Grey block standing in for content that has not loaded yet
pub fn skeleton<'a>(width: impl Into<Length>, height: f32) -> Element<'a, Message> {
    container(Space::new(Length::Fill, Length::Fill))
        .width(width)
        .height(height)
        .style(skeleton_style)
        .into()
}

/// A row of card-shaped skeletons shown while the next page loads
pub fn skeleton_row<'a>(columns: usize, card_width: f32, spacing: f32) -> Element<'a, Message> {
    let cards = (0..columns.max(1)).map(|_| {
        container(
            column![
                skeleton(Length::Fill, COVER_HEIGHT),
                skeleton(Length::FillPortion(2), 14.0),
                skeleton(Length::FillPortion(1), 11.0),
            ]
            .spacing(4),
        )
        .width(card_width)
        .padding(6)
        .into()
    });

    row(cards).spacing(spacing).into()
}

fn skeleton_style(_theme: &Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(Color::from_rgb(0.22, 0.22, 0.24))),
        border: Border::default().rounded(4),
        ..Default::default()
    }
}

fn placeholder_style(_theme: &Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(Color::from_rgb(0.15, 0.15, 0.16))),
        text_color: Some(Color::from_rgb(0.5, 0.5, 0.5)),
        border: Border::default().rounded(4),
        ..Default::default()
    }
}

fn badge_style(_theme: &Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(Color::from_rgba(0.0, 0.0, 0.0, 0.7))),
        border: Border::default().rounded(3),
        ..Default::default()
    }
}
