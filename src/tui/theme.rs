use std::env;

use chrono::{DateTime, Utc};
use ratatui::style::Color;

use crate::model::config::{AppearanceConfig, ColorThresholds, ThemeChoice};
use crate::model::ticket::{Status, Ticket, TicketType};

/// Parsed color theme for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub text_bright: Color,
    pub highlight: Color,
    pub dim: Color,
    pub red: Color,
    pub yellow: Color,
    pub green: Color,
    pub cyan: Color,
    pub purple: Color,
    pub blue: Color,
    pub selection_bg: Color,
    pub selection_border: Color,
    pub card_border: Color,
    pub thresholds: ColorThresholds,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::dark()
    }
}

impl Theme {
    /// Purple-tinted palette for dark terminal backgrounds
    pub fn dark() -> Self {
        Theme {
            background: Color::Rgb(0x0C, 0x00, 0x1B),
            text: Color::Rgb(0xB0, 0xAA, 0xFF),
            text_bright: Color::Rgb(0xFF, 0xFF, 0xFF),
            highlight: Color::Rgb(0xFB, 0x41, 0x96),
            dim: Color::Rgb(0x7D, 0x78, 0xBF),
            red: Color::Rgb(0xFF, 0x44, 0x44),
            yellow: Color::Rgb(0xFF, 0xD7, 0x00),
            green: Color::Rgb(0x44, 0xFF, 0x88),
            cyan: Color::Rgb(0x44, 0xDD, 0xFF),
            purple: Color::Rgb(0xCC, 0x66, 0xFF),
            blue: Color::Rgb(0x44, 0x88, 0xFF),
            selection_bg: Color::Rgb(0x3D, 0x14, 0x38),
            selection_border: Color::Rgb(0xFB, 0x41, 0x96),
            card_border: Color::Rgb(0x3A, 0x35, 0x6B),
            thresholds: ColorThresholds::default(),
        }
    }

    /// Same roles as [`Theme::dark`], darkened for light backgrounds
    pub fn light() -> Self {
        Theme {
            background: Color::Rgb(0xFA, 0xF8, 0xFF),
            text: Color::Rgb(0x2E, 0x28, 0x5C),
            text_bright: Color::Rgb(0x00, 0x00, 0x00),
            highlight: Color::Rgb(0xC2, 0x18, 0x5B),
            dim: Color::Rgb(0x8A, 0x86, 0xA8),
            red: Color::Rgb(0xC6, 0x28, 0x28),
            yellow: Color::Rgb(0xB2, 0x8A, 0x00),
            green: Color::Rgb(0x2E, 0x7D, 0x32),
            cyan: Color::Rgb(0x00, 0x83, 0x8F),
            purple: Color::Rgb(0x7B, 0x1F, 0xA2),
            blue: Color::Rgb(0x15, 0x65, 0xC0),
            selection_bg: Color::Rgb(0xF3, 0xD9, 0xE8),
            selection_border: Color::Rgb(0xC2, 0x18, 0x5B),
            card_border: Color::Rgb(0xC9, 0xC5, 0xE0),
            thresholds: ColorThresholds::default(),
        }
    }

    /// Create a theme from the appearance config. `auto` follows the
    /// terminal's `COLORFGBG` hint and falls back to dark.
    pub fn from_config(appearance: &AppearanceConfig) -> Self {
        let choice = match appearance.theme {
            ThemeChoice::Auto => detect_background(env::var("COLORFGBG").ok().as_deref()),
            other => other,
        };
        let mut theme = match choice {
            ThemeChoice::Light => Theme::light(),
            _ => Theme::dark(),
        };
        theme.thresholds = appearance.color_thresholds.clone();
        theme
    }

    pub fn status_color(&self, status: Status) -> Color {
        match status {
            Status::Backlog => self.dim,
            Status::Ready => self.cyan,
            Status::InProgress => self.highlight,
            Status::Review => self.yellow,
            Status::Done => self.green,
        }
    }

    pub fn type_color(&self, ticket_type: TicketType) -> Color {
        match ticket_type {
            TicketType::Story => self.text,
            TicketType::Bug => self.red,
            TicketType::Spike => self.purple,
            TicketType::Epic => self.blue,
        }
    }

    /// Priorities at or above the high-priority threshold stand out
    pub fn priority_color(&self, priority: u8) -> Color {
        if priority <= self.thresholds.high_priority {
            self.red
        } else {
            self.text
        }
    }

    pub fn points_color(&self, points: u32) -> Color {
        if points >= self.thresholds.large_points {
            self.yellow
        } else {
            self.text
        }
    }

    /// Title color for a card: dimmed once the ticket has gone stale
    pub fn title_color(&self, ticket: &Ticket, now: DateTime<Utc>) -> Color {
        let idle_days = (now - ticket.updated_at).num_days();
        if ticket.status != Status::Done && idle_days >= self.thresholds.stale_days {
            self.dim
        } else {
            self.text_bright
        }
    }
}

/// Read a `COLORFGBG` value like `15;0`: the last field is the background
/// palette index, where 7 and 9..=15 are light.
fn detect_background(colorfgbg: Option<&str>) -> ThemeChoice {
    let bg = colorfgbg
        .and_then(|v| v.rsplit(';').next())
        .and_then(|v| v.trim().parse::<u8>().ok());
    match bg {
        Some(7) | Some(9..=15) => ThemeChoice::Light,
        _ => ThemeChoice::Dark,
    }
}
