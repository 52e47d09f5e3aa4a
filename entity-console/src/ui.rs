//! UI rendering module.
//!
//! This module handles all the TUI rendering using ratatui: the entity list,
//! the create form with inline validation messages, and the points scroll view.

use chrono::{Datelike, Months, NaiveDate};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, List, ListItem, ListState, Paragraph, Scrollbar,
        ScrollbarOrientation, ScrollbarState, Tabs, Wrap,
    },
    Frame,
};

use crate::app::{App, FormField, FormState, LogLevel, Tab};
use crate::scroll::ScrollContainer;
use crate::scroller::PointListWidget;
use crate::theme::{colors, styles};
use crate::validate::Clock;

/// Tab bar, main content, log area
fn main_layout(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status bar / tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(5), // Log area
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

fn content_block(title: String) -> Block<'static> {
    Block::default()
        .title(title)
        .title_style(styles::title_accent())
        .borders(Borders::ALL)
        .border_style(styles::border())
        .style(Style::default().bg(colors::BG_DARK))
}

/// Screen area the points list is drawn into for a terminal of size `area`
pub fn scroll_viewport(area: Rect) -> Rect {
    let [_, main, _] = main_layout(area);
    Block::default().borders(Borders::ALL).inner(main)
}

/// Render the entire UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Fill background with theme color
    let bg_block = Block::default().style(Style::default().bg(colors::BG_DARK));
    frame.render_widget(bg_block, area);

    let [tabs, main, logs] = main_layout(area);
    render_tabs(frame, app, tabs);
    render_main_content(frame, app, main);
    render_logs(frame, app, logs);

    // Render overlays
    if app.form_state.is_some() {
        render_form_modal(frame, app, area);
    }

    if app.error_popup.is_some() {
        render_error_popup(frame, app, area);
    }

    if app.show_help {
        render_help_overlay(frame, area);
    }
}

/// Render the tab bar
fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Tab::all()
        .iter()
        .map(|tab| {
            let style = if *tab == app.active_tab {
                styles::tab_active()
            } else {
                styles::tab_inactive()
            };
            Line::from(Span::styled(format!(" {} ", tab.name()), style))
        })
        .collect();

    let selected = Tab::all()
        .iter()
        .position(|t| *t == app.active_tab)
        .unwrap_or(0);

    let status_style = if app.api_connected {
        Style::default().fg(colors::STATUS_CONNECTED)
    } else if app.is_loading {
        Style::default().fg(colors::STATUS_PENDING)
    } else {
        Style::default().fg(colors::STATUS_DISCONNECTED)
    };

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .title(" Entity Console ")
                .title_style(styles::title())
                .title_bottom(Line::from(Span::styled(
                    format!(" {} ", app.status_text()),
                    status_style,
                )))
                .borders(Borders::ALL)
                .border_style(styles::border())
                .style(Style::default().bg(colors::BG_MEDIUM)),
        )
        .select(selected)
        .style(styles::text())
        .highlight_style(styles::tab_active())
        .divider(Span::styled(" | ", styles::border_dim()));

    frame.render_widget(tabs, area);
}

/// Render the main content area based on active tab
fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.active_tab {
        Tab::Entities => render_entities_view(frame, app, area),
        Tab::Scroll => render_scroll_view(frame, app, area),
    }
}

/// Render the entity list view
fn render_entities_view(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .entities
        .iter()
        .enumerate()
        .map(|(i, entity)| {
            let is_selected = i == app.list_selected;
            let style = if is_selected {
                styles::selected()
            } else {
                styles::text()
            };
            let secondary = if is_selected { style } else { styles::text_dim() };

            let scheduled_style = if is_selected {
                style
            } else if entity.scheduled_date.is_some() {
                Style::default().fg(colors::YELLOW)
            } else {
                styles::text_hint()
            };

            let content = Line::from(vec![
                Span::styled(format!("{:24}", entity.display_name()), style),
                Span::styled(" │ ", styles::border_dim()),
                Span::styled(format!("{:16}", entity.created_label()), secondary),
                Span::styled(" │ ", styles::border_dim()),
                Span::styled(format!("{:10}", entity.scheduled_label()), scheduled_style),
                Span::styled(" │ ", styles::border_dim()),
                Span::styled(format!("#{}", entity.id), secondary),
            ]);

            ListItem::new(content)
        })
        .collect();

    let list = List::new(items)
        .block(content_block(format!(" Entities ({}) ", app.entities.len())))
        .style(styles::text());

    let mut state = ListState::default().with_selected(Some(app.list_selected));
    frame.render_stateful_widget(list, area, &mut state);

    if app.entities.is_empty() {
        render_empty_state(frame, area, "No entities found. Press c to create one.", app.is_loading);
    }
}

/// Render the points scroll view
fn render_scroll_view(frame: &mut Frame, app: &App, area: Rect) {
    let Some(view) = &app.scroll_view else {
        return;
    };

    let title = match view.active_point() {
        Some(active) => format!(" Points · active #{} ", active),
        None => " Points ".to_string(),
    };
    let block = content_block(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(PointListWidget::new(view), inner);

    let scroller = view.scroller();
    if scroller.max_scroll_top() > 0.0 {
        let mut state = ScrollbarState::new(scroller.max_scroll_top().ceil() as usize + 1)
            .position(scroller.rendered_offset().max(0) as usize)
            .viewport_content_length(scroller.client_height() as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .style(styles::border_dim())
                .thumb_style(Style::default().fg(colors::BLUE)),
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut state,
        );
    }
}

/// Render the log area
fn render_logs(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .logs
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .map(|entry| {
            let (prefix, color) = match entry.level {
                LogLevel::Info => ("i", colors::BLUE),
                LogLevel::Success => ("+", colors::GREEN),
                LogLevel::Warning => ("!", colors::YELLOW),
                LogLevel::Error => ("x", colors::RED),
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", prefix), Style::default().fg(color)),
                Span::styled(&entry.message, styles::text_dim()),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" System Log ")
            .title_style(Style::default().fg(colors::FG_DIM))
            .borders(Borders::ALL)
            .border_style(styles::border_dim())
            .style(Style::default().bg(colors::BG_DARK)),
    );

    frame.render_widget(list, area);
}

/// Render empty state message
fn render_empty_state(frame: &mut Frame, area: Rect, message: &str, is_loading: bool) {
    let text = if is_loading { "Loading..." } else { message };

    let paragraph = Paragraph::new(text)
        .style(styles::text_dim())
        .alignment(Alignment::Center);

    let inner = Block::default().borders(Borders::ALL).inner(area);
    let y = inner.y + inner.height / 2;
    let centered = Rect::new(inner.x, y, inner.width, 1);

    frame.render_widget(paragraph, centered);
}

/// Render the entity form modal
fn render_form_modal(frame: &mut Frame, app: &App, area: Rect) {
    let Some(form) = &app.form_state else {
        return;
    };
    let clock = app.clock();

    let popup_area = centered_rect(58, 16, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(" New Entity ")
        .title_style(styles::title())
        .borders(Borders::ALL)
        .border_style(styles::border_focused())
        .style(Style::default().bg(colors::BG_MEDIUM));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Name
            Constraint::Length(1), // Name errors
            Constraint::Length(3), // Scheduled date
            Constraint::Length(1), // Date errors
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Buttons
            Constraint::Length(1), // Form error
        ])
        .margin(1)
        .split(inner);

    render_text_field(
        frame,
        "Name:",
        &form.name,
        form.current_field() == FormField::Name,
        chunks[0],
    );
    render_field_errors(frame, form, FormField::Name, clock, chunks[1]);

    render_date_field(
        frame,
        "Scheduled:",
        &form.scheduled_date,
        form.current_field() == FormField::ScheduledDate,
        chunks[2],
    );
    render_field_errors(frame, form, FormField::ScheduledDate, clock, chunks[3]);

    render_form_buttons(
        frame,
        form.current_field(),
        form.is_valid(clock) && !form.submitting,
        chunks[5],
    );

    let footer = if form.submitting {
        Some(("Saving...", styles::info()))
    } else {
        form.error.as_deref().map(|e| (e, styles::error()))
    };
    if let Some((text, style)) = footer {
        let paragraph = Paragraph::new(text)
            .style(style)
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, chunks[6]);
    }

    if form.current_field().is_date() {
        let today = clock.now().date_naive();
        render_mini_calendar(frame, &form.scheduled_date, today, area, popup_area);
    }
}

/// Validation messages under a field, once it has been touched
fn render_field_errors(
    frame: &mut Frame,
    form: &FormState,
    field: FormField,
    clock: &dyn Clock,
    area: Rect,
) {
    let messages: Vec<String> = form
        .visible_errors(field, clock)
        .iter()
        .map(|e| match e.key() {
            "dateAfterNow" => "Date must be after now".to_string(),
            _ => e.to_string(),
        })
        .collect();
    if messages.is_empty() {
        return;
    }

    let error_area = Rect::new(
        area.x + 15,
        area.y,
        area.width.saturating_sub(15),
        area.height,
    );
    let text = Paragraph::new(format!("✗ {}", messages.join("; "))).style(styles::error());
    frame.render_widget(text, error_area);
}

fn field_layout(frame: &mut Frame, label: &str, area: Rect) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(14), Constraint::Min(10)])
        .split(area);

    let label_text = Paragraph::new(label)
        .style(styles::form_label())
        .alignment(Alignment::Right);
    frame.render_widget(label_text, chunks[0]);
    chunks[1]
}

fn input_block(is_focused: bool) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(if is_focused {
            styles::border_focused()
        } else {
            styles::border_dim()
        })
}

/// Render a text input field
fn render_text_field(frame: &mut Frame, label: &str, value: &str, is_focused: bool, area: Rect) {
    let input_area = field_layout(frame, label, area);

    let input_style = if is_focused {
        styles::form_input_focused()
    } else {
        styles::form_input()
    };

    let cursor = if is_focused { "█" } else { "" };
    let input = Paragraph::new(format!(" {}{}", value, cursor))
        .style(input_style)
        .block(input_block(is_focused));
    frame.render_widget(input, input_area);
}

/// Render the date field: typed text plus stepping hints
fn render_date_field(frame: &mut Frame, label: &str, value: &str, is_focused: bool, area: Rect) {
    let input_area = field_layout(frame, label, area);

    let input_style = if is_focused {
        styles::form_input_focused()
    } else {
        styles::form_input()
    };

    let display = if value.is_empty() && !is_focused {
        Line::from(Span::styled(" YYYY-MM-DD", styles::text_hint()))
    } else {
        let cursor = if is_focused { "█" } else { "" };
        let hint = if is_focused { "  ◀-7 ▲+1 ▼-1 +7▶" } else { "" };
        Line::from(vec![
            Span::raw(format!(" {}{}", value, cursor)),
            Span::styled(hint, styles::text_hint()),
        ])
    };

    let input = Paragraph::new(display)
        .style(input_style)
        .block(input_block(is_focused));
    frame.render_widget(input, input_area);
}

/// Render form buttons. Save is drawn disabled while the form is invalid.
fn render_form_buttons(frame: &mut Frame, focused: FormField, can_submit: bool, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Length(12),
            Constraint::Length(2),
            Constraint::Length(12),
            Constraint::Percentage(30),
        ])
        .split(area);

    let save_style = match (focused == FormField::SubmitButton, can_submit) {
        (true, true) => styles::button_focused(),
        (true, false) => styles::button_disabled().add_modifier(Modifier::REVERSED),
        (false, true) => styles::button(),
        (false, false) => styles::button_disabled(),
    };
    let save_btn = Paragraph::new(format!("  [ {} ]  ", FormField::SubmitButton.label()))
        .style(save_style)
        .alignment(Alignment::Center);
    frame.render_widget(save_btn, chunks[1]);

    let cancel_style = if focused == FormField::CancelButton {
        styles::button_danger()
    } else {
        styles::button()
    };
    let cancel_btn = Paragraph::new(format!(" [ {} ] ", FormField::CancelButton.label()))
        .style(cancel_style)
        .alignment(Alignment::Center);
    frame.render_widget(cancel_btn, chunks[3]);
}

/// Render error popup
fn render_error_popup(frame: &mut Frame, app: &App, area: Rect) {
    let Some(popup) = &app.error_popup else {
        return;
    };

    let popup_width = (area.width * 60 / 100).clamp(30, 60);
    let popup_area = centered_rect(popup_width, 7, area);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(format!(" {} ", popup.title))
        .title_style(
            Style::default()
                .fg(Color::White)
                .bg(colors::RED)
                .add_modifier(Modifier::BOLD),
        )
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors::RED))
        .style(Style::default().bg(Color::Rgb(0x2A, 0x18, 0x18)));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let text = Paragraph::new(popup.message.as_str())
        .style(styles::text())
        .wrap(Wrap { trim: true });
    frame.render_widget(text, inner);

    let hint = Paragraph::new("Press ESC or ENTER to dismiss")
        .style(styles::text_hint())
        .alignment(Alignment::Center);
    let hint_area = Rect::new(
        popup_area.x,
        popup_area.y + popup_area.height.saturating_sub(1),
        popup_area.width,
        1,
    );
    frame.render_widget(hint, hint_area);
}

fn help_line(keys: &'static str, action: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<16}", keys), Style::default().fg(colors::BLUE)),
        Span::raw(action),
    ])
}

fn help_section(title: &'static str) -> Line<'static> {
    Line::from(Span::styled(
        title,
        Style::default()
            .fg(colors::PURPLE)
            .add_modifier(Modifier::BOLD),
    ))
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 28, area);
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .fg(colors::BLUE)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        help_section("Navigation"),
        help_line("Tab/Shift+Tab", "Switch tabs / form fields"),
        help_line("j/k or Up/Down", "Move in the entity list"),
        help_line("g/G", "First / last entity"),
        Line::from(""),
        help_section("Entities"),
        help_line("c", "Create new entity"),
        help_line("r", "Refresh list"),
        Line::from(""),
        help_section("Scroll"),
        help_line("g / Enter", "Generate points"),
        help_line("j/k", "Move active point"),
        help_line("PgUp/PgDn", "Move active point by 10"),
        help_line("x", "Clear points"),
        Line::from(""),
        help_section("Form Editing"),
        help_line("Type text", "Edit fields directly"),
        help_line("Up/Down", "Date: +/-1 day"),
        help_line("Left/Right", "Date: +/-7 days"),
        help_line("Enter", "Next field / Submit on button"),
        help_line("Esc", "Cancel / Close form"),
        Line::from(""),
        help_section("General"),
        help_line("q/Ctrl+C", "Quit"),
    ];

    let paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .title_style(styles::title())
                .borders(Borders::ALL)
                .border_style(styles::border())
                .style(Style::default().bg(colors::BG_MEDIUM)),
        )
        .style(styles::text());

    frame.render_widget(paragraph, popup_area);
}

/// Helper to create a centered rectangle
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

/// Render a mini calendar next to the form. Days before `today` are dimmed.
fn render_mini_calendar(
    frame: &mut Frame,
    date_str: &str,
    today: NaiveDate,
    screen_area: Rect,
    form_area: Rect,
) {
    let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").unwrap_or(today);
    let Some(first_of_month) = date.with_day(1) else {
        return;
    };
    let Some(days_in_month) = first_of_month
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
    else {
        return;
    };

    let cal_width = 24;
    let cal_height = 10;

    // Right of the form if there is space, otherwise left, otherwise centered
    let cal_x = if form_area.x + form_area.width + cal_width + 2 < screen_area.width {
        form_area.x + form_area.width + 1
    } else if form_area.x >= cal_width + 2 {
        form_area.x - cal_width - 1
    } else {
        (screen_area.width.saturating_sub(cal_width)) / 2
    };

    let cal_area = Rect::new(
        cal_x,
        (form_area.y + 2).min(screen_area.height.saturating_sub(cal_height)),
        cal_width.min(screen_area.width),
        cal_height.min(screen_area.height),
    );

    frame.render_widget(Clear, cal_area);

    let mut lines = vec![
        Line::from(Span::styled(
            format!("{:^22}", date.format("%B %Y").to_string()),
            Style::default()
                .fg(colors::BLUE)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(" Mo Tu We Th Fr ", styles::text_dim()),
            Span::styled("Sa ", Style::default().fg(colors::BLUE)),
            Span::styled("Su", Style::default().fg(colors::RED)),
        ]),
    ];

    // 0 = Monday
    let first_weekday = first_of_month.weekday().num_days_from_monday() as usize;
    let mut day = 1u32;

    for week in 0..6 {
        if day > days_in_month {
            break;
        }
        let mut spans = vec![Span::raw(" ")];

        for weekday in 0..7 {
            if (week == 0 && weekday < first_weekday) || day > days_in_month {
                spans.push(Span::raw("   "));
                continue;
            }

            let this_day = first_of_month.with_day(day).unwrap_or(first_of_month);
            let style = if day == date.day() {
                styles::selected()
            } else if this_day == today {
                Style::default()
                    .fg(colors::YELLOW)
                    .add_modifier(Modifier::BOLD)
            } else if this_day < today {
                styles::text_hint()
            } else if weekday == 5 {
                Style::default().fg(colors::BLUE)
            } else if weekday == 6 {
                Style::default().fg(colors::RED)
            } else {
                styles::text()
            };

            spans.push(Span::styled(format!("{:2} ", day), style));
            day += 1;
        }

        lines.push(Line::from(spans));
    }

    lines.push(Line::from(Span::styled("▲▼±1d  ◀▶±7d", styles::text_hint())));

    let calendar = Paragraph::new(lines).block(
        Block::default()
            .title(" Calendar ")
            .title_style(styles::title())
            .borders(Borders::ALL)
            .border_style(styles::border_focused())
            .style(Style::default().bg(colors::BG_MEDIUM)),
    );

    frame.render_widget(calendar, cal_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::FixedClock;
    use chrono::{Local, TimeZone};
    use ratatui::{backend::TestBackend, Terminal};

    fn app() -> App {
        let clock = FixedClock(Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap());
        App::new(30, Box::new(clock))
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_scroll_viewport_is_inside_main_area() {
        let area = Rect::new(0, 0, 80, 30);
        let viewport = scroll_viewport(area);
        // tabs take 3 rows, the border 1 more; logs 5 plus the bottom border
        assert_eq!(viewport, Rect::new(1, 4, 78, 20));
    }

    #[test]
    fn test_render_scroll_tab() {
        let mut app = app();
        app.switch_tab(Tab::Scroll);
        app.tick(80, 30);

        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();
        assert!(screen_text(&terminal).contains("No points. Press g to generate."));
    }

    #[test]
    fn test_render_form_shows_touched_errors() {
        let mut app = app();
        app.open_create_form();
        if let Some(form) = app.form_state.as_mut() {
            form.handle_char('a');
            form.handle_backspace();
        }

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("New Entity"));
        assert!(text.contains("This field is required"));
    }
}
