/// Live statistics about the list, for tuning the paging and windowing knobs
use iced::widget::{column, container, row, text};
use iced::{Element, Length};

use crate::grid::list::ListStats;
use crate::Message;

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub list: ListStats,
    /// px/s
    pub scroll_speed: f32,
    pub pull_distance: f32,
    pub pull_armed: bool,
    pub hover_timers: usize,
    pub covers_loaded: usize,
    pub touch_mode: bool,
}

impl Dashboard {
    /// Label/value pairs in display order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let next_page = match (self.list.in_flight, self.list.has_more) {
            (true, _) => "loading",
            (false, true) => "available",
            (false, false) => "end of stream",
        };

        vec![
            (
                "Total records",
                self.list
                    .total
                    .map_or_else(|| "-".to_string(), |total| total.to_string()),
            ),
            ("Loaded", self.list.loaded.to_string()),
            ("Rendered", self.list.rendered.to_string()),
            (
                "Window",
                format!("{}..{}", self.list.window.start, self.list.window.end),
            ),
            (
                "Windowing",
                if self.list.virtualized { "on" } else { "off" }.to_string(),
            ),
            ("Columns", self.list.columns.to_string()),
            ("Scroll speed", format!("{:.0} px/s", self.scroll_speed)),
            (
                "Pull distance",
                if self.pull_armed {
                    format!("{:.0} px (release to load)", self.pull_distance)
                } else {
                    format!("{:.0} px", self.pull_distance)
                },
            ),
            ("Next page", next_page.to_string()),
            (
                "Next cursor",
                self.list
                    .next_cursor
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |cursor| cursor.id.clone()),
            ),
            ("Hover timers", self.hover_timers.to_string()),
            ("Covers loaded", self.covers_loaded.to_string()),
            (
                "Input",
                if self.touch_mode { "touch" } else { "pointer" }.to_string(),
            ),
        ]
    }

    pub fn view<'a>(self) -> Element<'a, Message> {
        let rows = self.entries().into_iter().map(|(label, value)| {
            row![
                text(label).size(12).width(Length::Fixed(110.0)),
                text(value).size(12),
            ]
            .spacing(8)
            .into()
        });

        container(column(rows).spacing(4))
            .padding(10)
            .style(container::rounded_box)
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dashboard() -> Dashboard {
        Dashboard {
            list: ListStats {
                total: Some(12),
                loaded: 10,
                rendered: 9,
                window: 0..10,
                next_cursor: None,
                virtualized: false,
                in_flight: false,
                has_more: true,
                columns: 3,
            },
            scroll_speed: 1234.6,
            pull_distance: 0.0,
            pull_armed: false,
            hover_timers: 0,
            covers_loaded: 7,
            touch_mode: false,
        }
    }

    fn value(dashboard: &Dashboard, label: &str) -> String {
        dashboard
            .entries()
            .into_iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v)
            .unwrap()
    }

    #[test]
    fn test_entries() {
        let dashboard = dashboard();
        assert_eq!(value(&dashboard, "Total records"), "12");
        assert_eq!(value(&dashboard, "Rendered"), "9");
        assert_eq!(value(&dashboard, "Scroll speed"), "1235 px/s");
        assert_eq!(value(&dashboard, "Next page"), "available");
        assert_eq!(value(&dashboard, "Window"), "0..10");
        assert_eq!(value(&dashboard, "Pull distance"), "0 px");
    }

    #[test]
    fn test_armed_pull_is_called_out() {
        let mut dashboard = dashboard();
        dashboard.pull_distance = 130.0;
        dashboard.pull_armed = true;
        assert_eq!(
            value(&dashboard, "Pull distance"),
            "130 px (release to load)"
        );
    }

    #[test]
    fn test_next_page_state() {
        let mut dashboard = dashboard();
        dashboard.list.in_flight = true;
        assert_eq!(value(&dashboard, "Next page"), "loading");

        dashboard.list.in_flight = false;
        dashboard.list.has_more = false;
        dashboard.list.total = None;
        assert_eq!(value(&dashboard, "Next page"), "end of stream");
        assert_eq!(value(&dashboard, "Total records"), "-");
    }
}
