/// Preview dialog for one record
use iced::widget::{button, column, container, image, mouse_area, opaque, row, text, Space};
use iced::{Alignment, Color, ContentFit, Element, Length};

use crate::state::data::Record;
use crate::Message;

#[derive(Debug, Clone, Copy)]
pub struct PreviewDialog<'a> {
    /// Latest version known for the record
    pub record: &'a Record,
    pub cover: Option<&'a image::Handle>,
    /// Resolved playable source, None while the lookup runs
    pub source: Option<&'a str>,
    pub resolving: bool,
    pub regenerating: bool,
}

impl<'a> PreviewDialog<'a> {
    pub fn view(self) -> Element<'a, Message> {
        let record = self.record;

        let cover: Element<'a, Message> = match self.cover {
            Some(handle) => image(handle.clone())
                .width(Length::Fill)
                .height(338.0)
                .content_fit(ContentFit::Contain)
                .into(),
            None => Space::new(Length::Fill, Length::Fixed(0.0)).into(),
        };

        let source = match (self.source, self.resolving) {
            (Some(source), _) => text(format!("Source: {source}")),
            (None, true) => text("Source: resolving...").color(Color::from_rgb(0.6, 0.6, 0.6)),
            (None, false) => text("Source: none").color(Color::from_rgb(0.8, 0.4, 0.4)),
        };

        let cover_url = text(format!(
            "Cover: {}",
            record.cover_url.as_deref().unwrap_or("none")
        ))
        .size(12);

        let regenerate = if self.regenerating {
            button("Regenerating...")
        } else {
            button("Regenerate cover").on_press(Message::RegenerateCover(record.id.clone()))
        };

        let content = column![
            text(&record.id).size(24),
            text(record.created_at.to_rfc3339()).size(12),
            cover,
            source.size(14),
            cover_url,
            row![
                regenerate.style(button::secondary),
                Space::with_width(Length::Fill),
                button("Close").on_press(Message::ClosePreview),
            ]
            .align_y(Alignment::Center),
        ]
        .spacing(10)
        .width(640);

        let panel = opaque(
            container(content)
                .padding(20)
                .style(container::rounded_box),
        );

        // The backdrop swallows pointer input meant for the grid below
        let backdrop = container(panel)
            .center(Length::Fill)
            .style(|_theme| container::Style {
                background: Some(Color::from_rgba(0.0, 0.0, 0.0, 0.6).into()),
                ..Default::default()
            });

        opaque(mouse_area(backdrop).on_press(Message::ClosePreview))
    }
}
