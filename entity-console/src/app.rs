//! Application state and event handling.
//!
//! This module implements the Elm Architecture pattern for state management,
//! with a centralized App struct holding all application state.
//! Includes the entity creation form and the points scroll view.

use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::layout::Rect;

use crate::api::{ApiCommand, ApiMessage};
use crate::models::{Entity, NewEntity};
use crate::scroller::{rect_bounds, ScrollView};
use crate::ui;
use crate::validate::{
    parse_date_candidate, validate_all, Clock, DateAfterNow, Required, ValidationError,
};

/// Active tab in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    /// Entity list view (default)
    #[default]
    Entities,
    /// Points scroll demo
    Scroll,
}

impl Tab {
    pub fn all() -> &'static [Tab] {
        &[Tab::Entities, Tab::Scroll]
    }

    /// Move to the next tab
    pub fn next(&self) -> Self {
        match self {
            Tab::Entities => Tab::Scroll,
            Tab::Scroll => Tab::Entities,
        }
    }

    /// Move to the previous tab
    pub fn previous(&self) -> Self {
        // Two tabs: previous and next coincide
        self.next()
    }

    /// Get the display name of the tab
    pub fn name(&self) -> &'static str {
        match self {
            Tab::Entities => "Entities",
            Tab::Scroll => "Scroll",
        }
    }
}

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Editing a form field
    Editing,
}

/// Fields of the entity form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    ScheduledDate,
    SubmitButton,
    CancelButton,
}

impl FormField {
    pub fn entity_fields() -> &'static [FormField] {
        &[
            FormField::Name,
            FormField::ScheduledDate,
            FormField::SubmitButton,
            FormField::CancelButton,
        ]
    }

    /// Get display label for the field
    pub fn label(&self) -> &'static str {
        match self {
            FormField::Name => "Name",
            FormField::ScheduledDate => "Scheduled",
            FormField::SubmitButton => "Save",
            FormField::CancelButton => "Cancel",
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, FormField::Name | FormField::ScheduledDate)
    }

    pub fn is_date(&self) -> bool {
        *self == FormField::ScheduledDate
    }
}

/// State for the entity creation form
#[derive(Debug, Clone)]
pub struct FormState {
    /// Currently focused field index
    pub focused_field: usize,
    pub fields: Vec<FormField>,
    pub name: String,
    /// Raw `YYYY-MM-DD` input
    pub scheduled_date: String,
    name_touched: bool,
    date_touched: bool,
    /// A create request is in flight
    pub submitting: bool,
    /// Form-level error message
    pub error: Option<String>,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new_create_entity()
    }
}

impl FormState {
    pub fn new_create_entity() -> Self {
        Self {
            focused_field: 0,
            fields: FormField::entity_fields().to_vec(),
            name: String::new(),
            scheduled_date: String::new(),
            name_touched: false,
            date_touched: false,
            submitting: false,
            error: None,
        }
    }

    /// Get the current focused field
    pub fn current_field(&self) -> FormField {
        self.fields[self.focused_field]
    }

    /// Move to the next field; the field being left counts as touched
    pub fn next_field(&mut self) {
        self.touch(self.current_field());
        self.focused_field = (self.focused_field + 1) % self.fields.len();
    }

    /// Move to the previous field
    pub fn prev_field(&mut self) {
        self.touch(self.current_field());
        self.focused_field = self
            .focused_field
            .checked_sub(1)
            .unwrap_or(self.fields.len() - 1);
    }

    fn touch(&mut self, field: FormField) {
        match field {
            FormField::Name => self.name_touched = true,
            FormField::ScheduledDate => self.date_touched = true,
            _ => {}
        }
    }

    pub fn is_touched(&self, field: FormField) -> bool {
        match field {
            FormField::Name => self.name_touched,
            FormField::ScheduledDate => self.date_touched,
            _ => false,
        }
    }

    fn current_text_mut(&mut self) -> Option<&mut String> {
        match self.current_field() {
            FormField::Name => Some(&mut self.name),
            FormField::ScheduledDate => Some(&mut self.scheduled_date),
            _ => None,
        }
    }

    /// Handle character input
    pub fn handle_char(&mut self, c: char) {
        let field = self.current_field();
        if field.is_date() && !(c.is_ascii_digit() || c == '-') {
            return;
        }
        if let Some(text) = self.current_text_mut() {
            text.push(c);
            self.touch(field);
            self.error = None;
        }
    }

    /// Handle backspace
    pub fn handle_backspace(&mut self) {
        let field = self.current_field();
        if let Some(text) = self.current_text_mut() {
            text.pop();
            self.touch(field);
            self.error = None;
        }
    }

    /// Step the scheduled date by `days`. Unparseable input starts from `today`.
    pub fn step_date(&mut self, days: i64, today: NaiveDate) {
        if !self.current_field().is_date() {
            return;
        }
        let base = NaiveDate::parse_from_str(self.scheduled_date.trim(), "%Y-%m-%d").unwrap_or(today);
        self.scheduled_date = (base + chrono::Duration::days(days))
            .format("%Y-%m-%d")
            .to_string();
        self.date_touched = true;
        self.error = None;
    }

    /// Every validation failure for `field`, touched or not
    pub fn field_errors(&self, field: FormField, clock: &dyn Clock) -> Vec<ValidationError> {
        match field {
            FormField::Name => validate_all(&self.name, &[&Required]),
            FormField::ScheduledDate => {
                let after_now = DateAfterNow::new(clock);
                validate_all(&self.scheduled_date, &[&Required, &after_now])
            }
            _ => Vec::new(),
        }
    }

    /// Failures to display: only for fields the user has touched
    pub fn visible_errors(&self, field: FormField, clock: &dyn Clock) -> Vec<ValidationError> {
        if self.is_touched(field) {
            self.field_errors(field, clock)
        } else {
            Vec::new()
        }
    }

    /// Whether the form may be submitted
    pub fn is_valid(&self, clock: &dyn Clock) -> bool {
        self.fields
            .iter()
            .all(|f| self.field_errors(*f, clock).is_empty())
    }

    /// Build the create payload from form state
    pub fn build_new_entity(&self) -> Result<NewEntity, &'static str> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Name is required");
        }
        let scheduled = parse_date_candidate(&self.scheduled_date)
            .ok_or("Scheduled date must be YYYY-MM-DD")?;
        Ok(NewEntity {
            name: name.to_string(),
            scheduled_date: scheduled.with_timezone(&Utc),
        })
    }
}

/// Error popup state
#[derive(Debug, Clone)]
pub struct ErrorPopup {
    pub title: String,
    pub message: String,
    /// When the error was shown
    pub shown_at: Instant,
    /// Auto-dismiss duration (None for manual dismiss)
    pub auto_dismiss: Option<Duration>,
}

impl ErrorPopup {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            shown_at: Instant::now(),
            auto_dismiss: Some(Duration::from_secs(5)),
        }
    }

    pub fn should_dismiss(&self) -> bool {
        self.auto_dismiss
            .is_some_and(|duration| self.shown_at.elapsed() > duration)
    }
}

/// Log entry for the message area
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub message: String,
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(message, LogLevel::Info)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::with_level(message, LogLevel::Success)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_level(message, LogLevel::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(message, LogLevel::Error)
    }

    fn with_level(message: impl Into<String>, level: LogLevel) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }
}

/// Main application state
#[derive(Debug)]
pub struct App {
    /// Whether the application should quit
    pub should_quit: bool,

    pub active_tab: Tab,

    pub input_mode: InputMode,

    /// Entities as last loaded from the API
    pub entities: Vec<Entity>,

    /// Selected index in the entity list
    pub list_selected: usize,

    /// Scroll demo; exists only while its tab is open
    pub scroll_view: Option<ScrollView>,

    /// Number of points generated by the scroll demo
    point_count: u32,

    pub error_popup: Option<ErrorPopup>,

    pub form_state: Option<FormState>,

    pub logs: Vec<LogEntry>,
    /// Maximum number of log entries to keep
    max_logs: usize,

    pub api_connected: bool,

    /// Last data refresh time
    pub last_refresh: Option<Instant>,

    pub is_loading: bool,

    /// Frame counter for animations
    pub frame_count: u64,

    pub show_help: bool,

    clock: Box<dyn Clock>,
}

impl App {
    /// Create a new application instance
    pub fn new(point_count: u32, clock: Box<dyn Clock>) -> Self {
        let mut app = Self {
            should_quit: false,
            active_tab: Tab::Entities,
            input_mode: InputMode::Normal,
            entities: Vec::new(),
            list_selected: 0,
            scroll_view: None,
            point_count,
            error_popup: None,
            form_state: None,
            logs: Vec::new(),
            max_logs: 100,
            api_connected: false,
            last_refresh: None,
            is_loading: true,
            frame_count: 0,
            show_help: false,
            clock,
        };

        app.log(LogEntry::info("Entity console initialized"));
        app.log(LogEntry::info("Connecting to API..."));
        app
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Add a log entry
    pub fn log(&mut self, entry: LogEntry) {
        match entry.level {
            LogLevel::Info | LogLevel::Success => tracing::info!("{}", entry.message),
            LogLevel::Warning => tracing::warn!("{}", entry.message),
            LogLevel::Error => tracing::error!("{}", entry.message),
        }
        self.logs.push(entry);
        if self.logs.len() > self.max_logs {
            self.logs.remove(0);
        }
    }

    /// Show an error popup
    pub fn show_error(&mut self, title: impl Into<String>, message: impl Into<String>) {
        let title = title.into();
        let message = message.into();
        self.log(LogEntry::error(format!("{}: {}", title, message)));
        self.error_popup = Some(ErrorPopup::new(title, message));
    }

    pub fn dismiss_error(&mut self) {
        self.error_popup = None;
    }

    /// Switch tabs. Leaving the scroll tab tears its view down; entering it
    /// builds a fresh one.
    pub fn switch_tab(&mut self, tab: Tab) {
        if tab == self.active_tab {
            return;
        }
        self.active_tab = tab;
        self.list_selected = 0;
        self.scroll_view = match tab {
            Tab::Scroll => Some(ScrollView::new(self.point_count, StdRng::from_entropy())),
            Tab::Entities => None,
        };
    }

    /// Open the entity creation form
    pub fn open_create_form(&mut self) {
        self.form_state = Some(FormState::new_create_entity());
        self.input_mode = InputMode::Editing;
    }

    /// Close the current form
    pub fn close_form(&mut self) {
        self.form_state = None;
        self.input_mode = InputMode::Normal;
    }

    /// Handle API messages
    pub fn handle_api_message(&mut self, message: ApiMessage) {
        match message {
            ApiMessage::EntitiesLoaded(entities) => {
                let count = entities.len();
                self.entities = entities;
                self.list_selected = self.list_selected.min(count.saturating_sub(1));
                self.is_loading = false;
                self.last_refresh = Some(Instant::now());
                self.log(LogEntry::success(format!("Loaded {} entities", count)));
            }
            ApiMessage::Error(error) => {
                self.is_loading = false;
                if let Some(form) = &mut self.form_state {
                    form.submitting = false;
                }
                self.show_error("API Error", error);
            }
            ApiMessage::ConnectionStatus(connected) => {
                let was_connected = self.api_connected;
                self.api_connected = connected;

                if connected && !was_connected {
                    self.log(LogEntry::success("Connected to API"));
                } else if !connected && was_connected {
                    self.log(LogEntry::warning("Disconnected from API"));
                }
            }
            ApiMessage::Created(entity) => {
                self.log(LogEntry::success(format!(
                    "Entity \"{}\" created ({})",
                    entity.display_name(),
                    entity.id
                )));
                self.close_form();
                self.switch_tab(Tab::Entities);
            }
        }
    }

    /// Handle key events and return optional API command
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<ApiCommand> {
        if self.error_popup.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ')) {
                self.dismiss_error();
            }
            return None;
        }

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Enter) {
                self.show_help = false;
            }
            return None;
        }

        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Editing => self.handle_editing_key(key),
        }
    }

    /// Handle keys in normal mode
    fn handle_normal_key(&mut self, key: KeyEvent) -> Option<ApiCommand> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
                return Some(ApiCommand::Shutdown);
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                return Some(ApiCommand::Shutdown);
            }
            KeyCode::Char('?') => {
                self.show_help = true;
                return None;
            }
            KeyCode::Char('r') => {
                self.is_loading = true;
                self.log(LogEntry::info("Refreshing data..."));
                return Some(ApiCommand::RefreshEntities);
            }
            KeyCode::Tab => {
                self.switch_tab(self.active_tab.next());
                return None;
            }
            KeyCode::BackTab => {
                self.switch_tab(self.active_tab.previous());
                return None;
            }
            _ => {}
        }

        match self.active_tab {
            Tab::Entities => self.handle_entities_key(key),
            Tab::Scroll => self.handle_scroll_key(key),
        }

        None
    }

    fn handle_entities_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') {
            self.open_create_form();
            return;
        }

        let total = self.entities.len();
        if total == 0 {
            return;
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.list_selected = (self.list_selected + 1) % total;
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.list_selected = self.list_selected.checked_sub(1).unwrap_or(total - 1);
            }
            KeyCode::Char('g') | KeyCode::Home => {
                self.list_selected = 0;
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.list_selected = total.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn handle_scroll_key(&mut self, key: KeyEvent) {
        let now = self.clock.now();
        let Some(view) = &mut self.scroll_view else {
            return;
        };

        match key.code {
            KeyCode::Char('g') | KeyCode::Enter => {
                view.generate(now);
                let active = view.active_point();
                if let Some(active) = active {
                    self.log(LogEntry::info(format!("Generated points, active #{}", active)));
                }
            }
            KeyCode::Char('j') | KeyCode::Down => view.move_active(1),
            KeyCode::Char('k') | KeyCode::Up => view.move_active(-1),
            KeyCode::PageDown => view.move_active(10),
            KeyCode::PageUp => view.move_active(-10),
            KeyCode::Char('x') => view.clear(),
            _ => {}
        }
    }

    /// Handle keys in editing mode (form)
    fn handle_editing_key(&mut self, key: KeyEvent) -> Option<ApiCommand> {
        let today = self.clock.now().date_naive();
        let Some(form) = &mut self.form_state else {
            self.input_mode = InputMode::Normal;
            return None;
        };
        if form.submitting {
            return None;
        }

        match key.code {
            KeyCode::Esc => self.close_form(),
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right
                if form.current_field().is_date() =>
            {
                let days = match key.code {
                    KeyCode::Up => 1,
                    KeyCode::Down => -1,
                    KeyCode::Right => 7,
                    _ => -7,
                };
                form.step_date(days, today);
            }
            KeyCode::Down => form.next_field(),
            KeyCode::Up => form.prev_field(),
            KeyCode::Backspace => form.handle_backspace(),
            KeyCode::Enter => return self.handle_form_submit(),
            KeyCode::Char(c) => form.handle_char(c),
            _ => {}
        }

        None
    }

    /// Handle form submission
    fn handle_form_submit(&mut self) -> Option<ApiCommand> {
        let form = self.form_state.as_mut()?;

        match form.current_field() {
            FormField::CancelButton => {
                self.close_form();
                return None;
            }
            field if field.is_input() => {
                form.next_field();
                return None;
            }
            _ => {}
        }

        // Submit is disabled while any validator fails
        if !form.is_valid(self.clock.as_ref()) {
            form.touch(FormField::Name);
            form.touch(FormField::ScheduledDate);
            form.error = Some("Fix the highlighted fields".to_string());
            return None;
        }

        match form.build_new_entity() {
            Ok(dto) => {
                form.submitting = true;
                self.log(LogEntry::info("Creating entity..."));
                Some(ApiCommand::CreateEntity(dto))
            }
            Err(e) => {
                form.error = Some(e.to_string());
                None
            }
        }
    }

    /// Update per-frame state; `width`/`height` are the terminal size
    pub fn tick(&mut self, width: u16, height: u16) {
        self.frame_count = self.frame_count.wrapping_add(1);

        if let Some(view) = &mut self.scroll_view {
            let viewport = ui::scroll_viewport(Rect::new(0, 0, width, height));
            view.layout(rect_bounds(viewport));
        }

        if self
            .error_popup
            .as_ref()
            .is_some_and(|popup| popup.should_dismiss())
        {
            self.error_popup = None;
        }
    }

    /// Get the status bar text
    pub fn status_text(&self) -> String {
        let connection = if self.api_connected {
            "Connected"
        } else {
            "Disconnected"
        };

        let loading = if self.is_loading { " [Loading...]" } else { "" };

        let last_refresh = self
            .last_refresh
            .map(|t| {
                let secs = t.elapsed().as_secs();
                if secs < 60 {
                    format!(" ({}s ago)", secs)
                } else {
                    format!(" ({}m ago)", secs / 60)
                }
            })
            .unwrap_or_default();

        let hints = match self.active_tab {
            Tab::Entities => "c: Create | r: Refresh",
            Tab::Scroll => "g: Generate | j/k: Move | x: Clear",
        };

        format!(
            "{}{}{} | {} | ?: Help | {} | q: Quit",
            connection,
            loading,
            last_refresh,
            self.active_tab.name(),
            hints
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::FixedClock;
    use chrono::{Local, TimeZone};

    fn clock() -> FixedClock {
        FixedClock(Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
    }

    fn app() -> App {
        App::new(30, Box::new(clock()))
    }

    fn press(app: &mut App, code: KeyCode) -> Option<ApiCommand> {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn focus(app: &mut App, field: FormField) {
        while app.form_state.as_ref().unwrap().current_field() != field {
            press(app, KeyCode::Tab);
        }
    }

    fn entity(id: i64, name: &str) -> Entity {
        Entity {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
            scheduled_date: None,
        }
    }

    #[test]
    fn test_tab_cycle() {
        assert_eq!(Tab::Entities.next(), Tab::Scroll);
        assert_eq!(Tab::Scroll.next(), Tab::Entities);
        assert_eq!(Tab::Scroll.previous(), Tab::Entities);
    }

    #[test]
    fn test_scroll_view_lives_only_on_its_tab() {
        let mut app = app();
        assert!(app.scroll_view.is_none());

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.active_tab, Tab::Scroll);
        assert!(app.scroll_view.is_some());

        app.tick(80, 30);
        assert!(app.scroll_view.as_ref().unwrap().is_laid_out());

        press(&mut app, KeyCode::Char('g'));
        let view = app.scroll_view.as_ref().unwrap();
        assert_eq!(view.points().len(), 30);
        assert!(view.active_point().is_some());

        let feed = app.scroll_view.as_ref().unwrap().feed();
        assert_eq!(feed.listener_count(), 1);

        press(&mut app, KeyCode::Tab);
        assert!(app.scroll_view.is_none());
        assert_eq!(feed.listener_count(), 0);
    }

    #[test]
    fn test_form_validation_flow() {
        let mut app = app();
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.input_mode, InputMode::Editing);

        let c = clock();
        let form = app.form_state.as_ref().unwrap();
        assert!(!form.is_valid(&c));
        assert!(form.visible_errors(FormField::Name, &c).is_empty());

        type_text(&mut app, "test");
        focus(&mut app, FormField::ScheduledDate);
        type_text(&mut app, "2024-06-16");
        assert!(app.form_state.as_ref().unwrap().is_valid(&c));

        focus(&mut app, FormField::Name);
        for _ in 0..4 {
            press(&mut app, KeyCode::Backspace);
        }
        let form = app.form_state.as_ref().unwrap();
        assert!(!form.is_valid(&c));
        assert_eq!(
            form.visible_errors(FormField::Name, &c),
            vec![ValidationError::Required]
        );

        type_text(&mut app, "test");
        focus(&mut app, FormField::ScheduledDate);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        let form = app.form_state.as_ref().unwrap();
        assert_eq!(form.scheduled_date, "2024-06-14");
        let errors = form.visible_errors(FormField::ScheduledDate, &c);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key(), "dateAfterNow");
        assert!(!form.is_valid(&c));

        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Up);
        assert!(app.form_state.as_ref().unwrap().is_valid(&c));
    }

    #[test]
    fn test_submit_refused_while_invalid() {
        let mut app = app();
        press(&mut app, KeyCode::Char('c'));
        focus(&mut app, FormField::SubmitButton);
        assert!(press(&mut app, KeyCode::Enter).is_none());

        let form = app.form_state.as_ref().unwrap();
        assert!(form.error.is_some());
        assert!(form.is_touched(FormField::Name));
    }

    #[test]
    fn test_submit_sends_create_command() {
        let mut app = app();
        press(&mut app, KeyCode::Char('c'));
        type_text(&mut app, "  alpha ");
        focus(&mut app, FormField::ScheduledDate);
        type_text(&mut app, "2024-07-01");
        focus(&mut app, FormField::SubmitButton);

        match press(&mut app, KeyCode::Enter) {
            Some(ApiCommand::CreateEntity(dto)) => {
                assert_eq!(dto.name, "alpha");
                let expected = parse_date_candidate("2024-07-01").unwrap();
                assert_eq!(dto.scheduled_date, expected.with_timezone(&Utc));
            }
            other => panic!("expected create command, got {:?}", other),
        }
        assert!(app.form_state.as_ref().unwrap().submitting);

        app.handle_api_message(ApiMessage::Created(entity(9, "alpha")));
        assert!(app.form_state.is_none());
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.active_tab, Tab::Entities);
    }

    #[test]
    fn test_error_reenables_form() {
        let mut app = app();
        app.open_create_form();
        app.form_state.as_mut().unwrap().submitting = true;
        app.handle_api_message(ApiMessage::Error("boom".to_string()));
        assert!(!app.form_state.as_ref().unwrap().submitting);
        assert!(app.error_popup.is_some());
    }

    #[test]
    fn test_date_field_rejects_letters() {
        let mut form = FormState::new_create_entity();
        form.next_field();
        form.handle_char('a');
        form.handle_char('2');
        assert_eq!(form.scheduled_date, "2");
    }

    #[test]
    fn test_step_date_from_empty_starts_today() {
        let mut form = FormState::new_create_entity();
        form.next_field();
        form.step_date(7, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(form.scheduled_date, "2024-06-22");
    }

    #[test]
    fn test_entity_list_navigation() {
        let mut app = app();
        app.handle_api_message(ApiMessage::EntitiesLoaded(vec![
            entity(1, "a"),
            entity(2, "b"),
            entity(3, "c"),
        ]));
        assert!(!app.is_loading);

        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.list_selected, 2);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.list_selected, 0);
        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.list_selected, 2);

        app.handle_api_message(ApiMessage::EntitiesLoaded(vec![entity(1, "a")]));
        assert_eq!(app.list_selected, 0);
    }

    #[test]
    fn test_quit() {
        let mut app = app();
        assert!(matches!(
            press(&mut app, KeyCode::Char('q')),
            Some(ApiCommand::Shutdown)
        ));
        assert!(app.should_quit);
    }
}
