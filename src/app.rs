use arboard::Clipboard;
use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::ListState;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::calendar::{DayCalendarData, MonthCalendarData, days_in_month};
use crate::grouping::{GroupedExercise, format_day_summary, group_logs};
use crate::history::{HistoryViewModel, LoadOutcome};
use crate::storage::{self, LogStore, ThemePreference};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Loading,
    Calendar,
    DayDetail,
    Error,
}

pub struct App {
    pub should_quit: bool,
    pub mode: Mode,
    pub status: Option<String>,
    pub theme: ThemePreference,
    pub history: HistoryViewModel<LogStore>,
    pub month_index: usize,
    pub selected_date: NaiveDate,
    pub day_exercises: Vec<GroupedExercise>,
    pub day_set_count: usize,
    pub detail_state: ListState,
    pub show_help: bool,
    today_override: Option<NaiveDate>,
    today: NaiveDate,
    toast: Option<Toast>,
}

impl App {
    pub fn new(store: Arc<LogStore>, today_override: Option<NaiveDate>, theme: ThemePreference) -> Self {
        let today = today_override.unwrap_or_else(|| Local::now().date_naive());
        let mut app = App {
            should_quit: false,
            mode: Mode::Loading,
            status: None,
            theme,
            history: HistoryViewModel::new(store),
            month_index: 0,
            selected_date: today,
            day_exercises: Vec::new(),
            day_set_count: 0,
            detail_state: ListState::default(),
            show_help: false,
            today_override,
            today,
            toast: None,
        };
        app.reload();
        app
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Snapshots today once per load; every future-date check in the UI uses
    /// the same snapshot as the aggregation.
    pub fn reload(&mut self) {
        self.today = self
            .today_override
            .unwrap_or_else(|| Local::now().date_naive());
        self.mode = Mode::Loading;
        self.status = None;
        self.history.load_calendar_data(self.today);
    }

    pub fn tick(&mut self) {
        match self.history.poll() {
            Some(LoadOutcome::Loaded { months }) => {
                self.mode = Mode::Calendar;
                if self.selected_date > self.today
                    || self.selected_date.year() != self.today.year()
                {
                    self.selected_date = self.today;
                }
                self.month_index = months.saturating_sub(1).min(self.selected_date.month0() as usize);
            }
            Some(LoadOutcome::Failed(message)) => {
                self.mode = Mode::Error;
                self.status = Some(message);
            }
            None => {}
        }
    }

    pub fn current_month(&self) -> Option<&MonthCalendarData> {
        self.history.months().get(self.month_index)
    }

    pub fn selected_day(&self) -> Option<&DayCalendarData> {
        self.current_month()
            .and_then(|month| month.day(self.selected_date))
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if self.show_help {
            match key.code {
                KeyCode::Char('h') | KeyCode::Esc => self.show_help = false,
                KeyCode::Char('q') => self.quit(),
                _ => {}
            }
            return;
        }

        match self.mode {
            Mode::DayDetail => self.handle_detail_input(key),
            Mode::Calendar => self.handle_calendar_input(key),
            Mode::Loading | Mode::Error => match key.code {
                KeyCode::Char('q') => self.quit(),
                KeyCode::Char('r') => self.reload(),
                _ => {}
            },
        }
    }

    fn handle_calendar_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('h') => self.show_help = true,
            KeyCode::Char('t') => self.cycle_theme(),
            KeyCode::Char('c') => self.copy_day_to_clipboard(),
            KeyCode::Char('[') => self.shift_month(-1),
            KeyCode::Char(']') => self.shift_month(1),
            KeyCode::Left => self.move_selection(-1),
            KeyCode::Right => self.move_selection(1),
            KeyCode::Up => self.move_selection(-7),
            KeyCode::Down => self.move_selection(7),
            KeyCode::Enter => self.open_selected_day(),
            _ => {}
        }
    }

    fn handle_detail_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('h') => self.show_help = true,
            KeyCode::Char('c') => self.copy_day_to_clipboard(),
            KeyCode::Esc | KeyCode::Backspace => self.mode = Mode::Calendar,
            KeyCode::Up => self.select_previous_exercise(),
            KeyCode::Down => self.select_next_exercise(),
            _ => {}
        }
    }

    fn quit(&mut self) {
        self.history.cancel();
        self.should_quit = true;
    }

    /// Moves the selected day, ignoring moves onto future days or outside the
    /// loaded year.
    pub fn move_selection(&mut self, days: i64) {
        let Some(target) = self
            .selected_date
            .checked_add_signed(ChronoDuration::days(days))
        else {
            return;
        };
        if !self.is_selectable(target) {
            return;
        }
        self.selected_date = target;
        self.month_index = target.month0() as usize;
    }

    pub fn shift_month(&mut self, delta: i32) {
        let months = self.history.months().len();
        if months == 0 {
            return;
        }
        let index = self.month_index as i64 + i64::from(delta);
        if index < 0 || index >= months as i64 {
            return;
        }
        let month = index as u32 + 1;
        let day = self
            .selected_date
            .day()
            .min(days_in_month(self.today.year(), month));
        let Some(mut target) = NaiveDate::from_ymd_opt(self.today.year(), month, day) else {
            return;
        };
        if target > self.today {
            target = self.today;
        }
        self.month_index = index as usize;
        self.selected_date = target;
    }

    fn is_selectable(&self, date: NaiveDate) -> bool {
        date.year() == self.today.year()
            && date <= self.today
            && (date.month0() as usize) < self.history.months().len()
    }

    pub fn open_selected_day(&mut self) {
        if !self.is_selectable(self.selected_date) {
            return;
        }
        if self.load_selected_day() {
            self.detail_state
                .select(if self.day_exercises.is_empty() { None } else { Some(0) });
            self.mode = Mode::DayDetail;
        }
    }

    fn load_selected_day(&mut self) -> bool {
        self.history.set_selected_date(self.selected_date);
        match self.history.selected_logs() {
            Ok(logs) => {
                self.day_set_count = logs.len();
                self.day_exercises = group_logs(&logs);
                true
            }
            Err(err) => {
                tracing::error!(error = %err, date = %self.selected_date, "failed to load day logs");
                self.set_toast(format!("Failed to load day: {err}"), true);
                false
            }
        }
    }

    fn select_previous_exercise(&mut self) {
        if self.day_exercises.is_empty() {
            return;
        }
        let selected = self.detail_state.selected().unwrap_or(0);
        let new_index = if selected == 0 {
            self.day_exercises.len() - 1
        } else {
            selected - 1
        };
        self.detail_state.select(Some(new_index));
    }

    fn select_next_exercise(&mut self) {
        if self.day_exercises.is_empty() {
            return;
        }
        let selected = self.detail_state.selected().unwrap_or(0);
        let new_index = if selected + 1 >= self.day_exercises.len() {
            0
        } else {
            selected + 1
        };
        self.detail_state.select(Some(new_index));
    }

    fn cycle_theme(&mut self) {
        self.theme = match self.theme {
            ThemePreference::Terminal => ThemePreference::Dark,
            ThemePreference::Dark => ThemePreference::Light,
            ThemePreference::Light => ThemePreference::Terminal,
        };
        if let Err(err) = storage::write_theme(self.theme) {
            self.set_toast(format!("Failed to save theme: {err}"), true);
        }
    }

    fn copy_day_to_clipboard(&mut self) {
        if self.mode != Mode::DayDetail && !self.load_selected_day() {
            return;
        }
        if self.day_exercises.is_empty() {
            self.set_toast("No sets logged on this day.", true);
            return;
        }

        let label = self.selected_date.format("%a %Y-%m-%d").to_string();
        let text = format_day_summary(&label, &self.day_exercises);
        match Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(_) => self.set_toast("Copied day summary.", false),
            Err(err) => self.set_toast(format!("Clipboard error: {err}"), true),
        }
    }

    pub fn active_toast(&mut self) -> Option<ToastView> {
        let toast = self.toast.as_ref()?;
        if toast.created_at.elapsed() > Duration::from_secs(2) {
            self.toast = None;
            return None;
        }
        Some(ToastView {
            message: toast.message.clone(),
            is_error: toast.is_error,
        })
    }

    fn set_toast(&mut self, message: impl Into<String>, is_error: bool) {
        self.toast = Some(Toast {
            message: message.into(),
            created_at: Instant::now(),
            is_error,
        });
    }
}

struct Toast {
    message: String,
    created_at: Instant,
    is_error: bool,
}

pub struct ToastView {
    pub message: String,
    pub is_error: bool,
}
