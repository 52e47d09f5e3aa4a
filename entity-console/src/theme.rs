//! Kanagawa Dragon theme module.
//!
//! A low-contrast, warm, dark palette plus the semantic styles the views use.

use ratatui::style::Color;

/// Kanagawa Dragon color palette
pub mod colors {
    use super::Color;

    // === Background Colors ===
    /// Dragon Black - Primary background
    pub const BG_DARK: Color = Color::Rgb(0x18, 0x16, 0x16);
    /// Slightly lighter background for panels and modals
    pub const BG_MEDIUM: Color = Color::Rgb(0x1D, 0x1C, 0x19);
    /// Background for focused inputs
    pub const BG_HIGHLIGHT: Color = Color::Rgb(0x28, 0x27, 0x27);

    // === Foreground Colors ===
    /// Old White - Primary text color
    pub const FG_PRIMARY: Color = Color::Rgb(0xC5, 0xC9, 0xC5);
    /// Dimmed text for secondary information
    pub const FG_DIM: Color = Color::Rgb(0x72, 0x71, 0x69);
    /// Very dim text for hints and placeholders
    pub const FG_HINT: Color = Color::Rgb(0x54, 0x54, 0x54);

    // === Accent Colors ===
    /// Dragon Red - errors and destructive actions
    pub const RED: Color = Color::Rgb(0xC4, 0x74, 0x6E);
    /// Dragon Green - success
    pub const GREEN: Color = Color::Rgb(0x8A, 0x9A, 0x7B);
    /// Carp Yellow - warnings, scheduled dates
    pub const YELLOW: Color = Color::Rgb(0xC4, 0xB2, 0x8A);
    /// Dragon Blue - info, selected items
    pub const BLUE: Color = Color::Rgb(0x8B, 0xA4, 0xB0);
    /// Purple - section headers
    pub const PURPLE: Color = Color::Rgb(0x95, 0x7F, 0xB8);

    // === UI Element Colors ===
    /// Wall Gray - borders and separators
    pub const BORDER: Color = Color::Rgb(0x72, 0x71, 0x69);
    pub const BORDER_DIM: Color = Color::Rgb(0x3A, 0x3A, 0x3A);
    /// Accent border for focused elements
    pub const BORDER_ACCENT: Color = Color::Rgb(0x8B, 0xA4, 0xB0);

    // === Status Colors ===
    pub const STATUS_CONNECTED: Color = GREEN;
    pub const STATUS_DISCONNECTED: Color = RED;
    pub const STATUS_PENDING: Color = YELLOW;
}

/// Semantic styling helpers
pub mod styles {
    use super::colors;
    use ratatui::style::{Modifier, Style};

    /// Style for primary text
    pub fn text() -> Style {
        Style::default().fg(colors::FG_PRIMARY)
    }

    /// Style for dimmed/secondary text
    pub fn text_dim() -> Style {
        Style::default().fg(colors::FG_DIM)
    }

    /// Style for hint text
    pub fn text_hint() -> Style {
        Style::default().fg(colors::FG_HINT)
    }

    /// Style for error messages
    pub fn error() -> Style {
        Style::default().fg(colors::RED)
    }

    /// Style for info messages
    pub fn info() -> Style {
        Style::default().fg(colors::BLUE)
    }

    /// Style for selected/highlighted items
    pub fn selected() -> Style {
        Style::default()
            .fg(colors::BG_DARK)
            .bg(colors::BLUE)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(colors::BORDER_ACCENT)
    }

    pub fn border() -> Style {
        Style::default().fg(colors::BORDER)
    }

    pub fn border_dim() -> Style {
        Style::default().fg(colors::BORDER_DIM)
    }

    /// Style for block titles
    pub fn title() -> Style {
        Style::default()
            .fg(colors::FG_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for accent titles (content headers)
    pub fn title_accent() -> Style {
        Style::default()
            .fg(colors::BLUE)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_active() -> Style {
        Style::default()
            .fg(colors::BLUE)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_inactive() -> Style {
        Style::default().fg(colors::FG_DIM)
    }

    pub fn form_label() -> Style {
        Style::default().fg(colors::FG_DIM)
    }

    pub fn form_input_focused() -> Style {
        Style::default()
            .fg(colors::FG_PRIMARY)
            .bg(colors::BG_HIGHLIGHT)
    }

    pub fn form_input() -> Style {
        Style::default()
            .fg(colors::FG_PRIMARY)
            .bg(colors::BG_MEDIUM)
    }

    pub fn button() -> Style {
        Style::default()
            .fg(colors::FG_PRIMARY)
            .bg(colors::BG_MEDIUM)
    }

    pub fn button_focused() -> Style {
        Style::default()
            .fg(colors::BG_DARK)
            .bg(colors::BLUE)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for buttons that cannot be used right now
    pub fn button_disabled() -> Style {
        Style::default()
            .fg(colors::FG_HINT)
            .bg(colors::BG_MEDIUM)
            .add_modifier(Modifier::DIM)
    }

    /// Style for danger buttons (cancel)
    pub fn button_danger() -> Style {
        Style::default()
            .fg(colors::BG_DARK)
            .bg(colors::RED)
            .add_modifier(Modifier::BOLD)
    }
}
