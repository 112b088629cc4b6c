use chrono::{Datelike, Weekday};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Wrap,
};

use crate::app::{App, Mode};
use crate::calendar::{DayCalendarData, MonthCalendarData};
use crate::grouping::format_weight;
use crate::layout::{CalendarGrid, CellRect, GridCell, month_cells};
use crate::storage::ThemePreference;

// Terminal cells are roughly twice as tall as they are wide.
const ROW_ASPECT: u32 = 2;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let size = frame.area();
    let theme = theme_from(app.theme);
    draw_background(frame, size, &theme);
    draw_history(frame, app, size, &theme);

    match app.mode {
        Mode::Loading => draw_overlay(frame, size, "Loading workout history...", &theme),
        Mode::Error => draw_overlay(
            frame,
            size,
            app.status.as_deref().unwrap_or("Unknown error"),
            &theme,
        ),
        Mode::Calendar | Mode::DayDetail => {}
    }

    if matches!(app.mode, Mode::Calendar | Mode::DayDetail) && !app.show_help {
        if let Some(toast) = app.active_toast() {
            draw_toast(frame, size, &toast.message, toast.is_error, &theme);
        }
    }

    if app.show_help {
        draw_help(frame, size, &theme);
    }
}

fn draw_history(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    let content = area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    });

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(2)])
        .split(content);

    let header = Paragraph::new(header_line(app, theme))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(theme.border_style())
                .style(theme.panel_style()),
        );
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let month_title = app
        .current_month()
        .map(MonthCalendarData::label)
        .unwrap_or_else(|| "Calendar".to_string());
    let calendar_block = panel_block(&month_title, theme);
    let calendar_area = calendar_block.inner(body[0]);
    frame.render_widget(calendar_block, body[0]);
    if let Some(month) = app.current_month() {
        draw_month_grid(frame, app, month, calendar_area, theme);
    }

    draw_day_panel(frame, app, body[1], theme);

    let footer = Paragraph::new(footer_line(app, theme))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(theme.border_style())
                .style(theme.panel_style()),
        );
    frame.render_widget(footer, chunks[2]);
}

/// Widest grid whose scaled height still fits `area`.
fn fit_grid(area: Rect, cell_count: usize) -> Option<(CalendarGrid, Vec<CellRect>)> {
    let mut width = u32::from(area.width);
    while width >= 7 {
        let grid = CalendarGrid {
            vertical_gap: ROW_ASPECT,
            ..CalendarGrid::new(width, 1)
        };
        let placement = grid.place(cell_count);
        if placement.height / ROW_ASPECT <= u32::from(area.height) {
            return Some((grid, placement.cells));
        }
        width -= 1;
    }
    None
}

fn draw_month_grid(
    frame: &mut Frame,
    app: &App,
    month: &MonthCalendarData,
    area: Rect,
    theme: &Theme,
) {
    let cells = month_cells(month);
    let Some((_, placement)) = fit_grid(area, cells.len()) else {
        frame.render_widget(
            Paragraph::new("Terminal too small").style(theme.muted_style()),
            area,
        );
        return;
    };

    for (cell, rect) in cells.iter().zip(placement.iter()) {
        let target = Rect {
            x: area.x + rect.x as u16,
            y: area.y + (rect.y / ROW_ASPECT) as u16,
            width: rect.width as u16,
            height: (rect.height / ROW_ASPECT).max(1) as u16,
        };
        if target.width == 0 || target.bottom() > area.bottom() {
            continue;
        }
        match cell {
            GridCell::Header(weekday) => {
                let label = Paragraph::new(weekday_label(*weekday))
                    .alignment(Alignment::Center)
                    .style(theme.muted_style().add_modifier(Modifier::BOLD));
                frame.render_widget(label, target);
            }
            GridCell::Blank => {}
            GridCell::Day(day) => draw_day_cell(frame, app, day, target, theme),
        }
    }
}

fn draw_day_cell(frame: &mut Frame, app: &App, day: &DayCalendarData, area: Rect, theme: &Theme) {
    let is_selected = day.day == app.selected_date;
    let is_today = day.day == app.today();

    let mut number_style = if day.is_future_date {
        theme.muted_style()
    } else {
        Style::default().fg(theme.text)
    };
    if is_today {
        number_style = number_style
            .fg(theme.highlight)
            .add_modifier(Modifier::BOLD);
    }

    let marker = if day.is_future_date {
        Span::raw("")
    } else if day.has_activity() {
        Span::styled(
            format!("●{}", day.exercise_activity_count),
            Style::default().fg(theme.success),
        )
    } else {
        Span::styled("·", theme.muted_style())
    };

    let mut style = theme.panel_style();
    if is_selected {
        style = if app.mode == Mode::DayDetail {
            Style::default()
                .bg(theme.accent)
                .fg(theme.accent_contrast())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.accent).add_modifier(Modifier::REVERSED)
        };
    }

    let number = Span::styled(format!("{:>2}", day.day.day()), number_style);
    let lines = if area.height >= 4 && area.width >= 5 {
        vec![Line::from(number), Line::from(marker)]
    } else {
        vec![Line::from(vec![number, Span::raw(" "), marker])]
    };

    let mut paragraph = Paragraph::new(lines).alignment(Alignment::Center).style(style);
    if area.height >= 4 && area.width >= 5 {
        paragraph = paragraph.block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(if is_selected {
                    Style::default().fg(theme.accent)
                } else {
                    theme.border_style()
                }),
        );
    }
    frame.render_widget(paragraph, area);
}

fn draw_day_panel(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(area);

    let summary_lines = match app.current_month() {
        Some(month) => {
            let active_days = month
                .daily_data_list
                .iter()
                .filter(|day| day.has_activity())
                .count();
            let total_sets: usize = month
                .daily_data_list
                .iter()
                .map(|day| day.exercise_activity_count)
                .sum();
            let selected = app.selected_day();
            let mut lines = vec![
                Line::from(Span::styled(
                    month.label(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(format!("Active days: {active_days}")),
                Line::from(format!("Sets logged: {total_sets}")),
            ];
            if let Some(day) = selected {
                lines.push(Line::from(vec![
                    Span::raw(format!("Selected: {} ", day.day.format("%a %Y-%m-%d"))),
                    Span::styled(
                        format!("{} sets", day.exercise_activity_count),
                        theme.muted_style(),
                    ),
                ]));
            }
            lines
        }
        None => vec![Line::from("No history yet.")],
    };

    let summary = Paragraph::new(summary_lines)
        .alignment(Alignment::Left)
        .block(panel_block("Summary", theme))
        .wrap(Wrap { trim: true });
    frame.render_widget(summary, sections[0]);

    let items: Vec<ListItem> = if app.mode != Mode::DayDetail {
        vec![ListItem::new(Line::from(Span::styled(
            "Press Enter to open the selected day",
            theme.muted_style(),
        )))]
    } else if app.day_exercises.is_empty() {
        vec![ListItem::new(Line::from("No sets logged")).style(theme.panel_style())]
    } else {
        app.day_exercises
            .iter()
            .map(|exercise| {
                let sets = exercise
                    .sets
                    .iter()
                    .map(|set| format!("{}×{}", set.reps, format_weight(set.weight_kg)))
                    .collect::<Vec<_>>()
                    .join("  ");
                ListItem::new(vec![
                    Line::from(vec![
                        Span::styled(&exercise.name, Style::default().add_modifier(Modifier::BOLD)),
                        Span::styled(
                            format!("  {} kg", format_weight(exercise.volume_kg)),
                            theme.muted_style(),
                        ),
                    ]),
                    Line::from(Span::styled(sets, theme.muted_style())),
                ])
                .style(theme.panel_style())
            })
            .collect()
    };

    let title = if app.mode == Mode::DayDetail {
        format!("{} · {} sets", app.selected_date.format("%b %d"), app.day_set_count)
    } else {
        "Day".to_string()
    };
    let list = List::new(items)
        .block(panel_block(&title, theme))
        .highlight_style(
            Style::default()
                .bg(theme.accent)
                .fg(theme.accent_contrast())
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▍ ");
    frame.render_stateful_widget(list, sections[1], &mut app.detail_state);
}

fn header_line(app: &App, theme: &Theme) -> Line<'static> {
    Line::from(vec![
        Span::styled("Liftlog", theme.title_style()),
        Span::raw("  "),
        Span::styled("Today", theme.muted_style()),
        Span::raw(": "),
        Span::styled(
            app.today().format("%Y-%m-%d").to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("Theme", theme.muted_style()),
        Span::raw(": "),
        Span::raw(theme_label(app.theme)),
    ])
}

fn footer_line(app: &App, theme: &Theme) -> Line<'static> {
    let hints = match app.mode {
        Mode::DayDetail => "Up/Down move · c copy · Esc back · q quit",
        _ => "Arrows move · [ ] month · Enter open · c copy · r reload · h help · q quit",
    };
    let mut spans = vec![Span::styled(hints, theme.muted_style())];
    if app.history.is_loading() {
        spans.push(Span::raw("   |   "));
        spans.push(Span::styled("loading…", Style::default().fg(theme.highlight)));
    }
    Line::from(spans)
}

fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

fn draw_overlay(frame: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let block = centered_rect(60, 20, area);
    frame.render_widget(Clear, block);
    let paragraph = Paragraph::new(message)
        .alignment(Alignment::Center)
        .block(panel_block("Status", theme))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, block);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1]);
    vertical[1]
}

fn draw_toast(frame: &mut Frame, area: Rect, message: &str, is_error: bool, theme: &Theme) {
    let width = toast_width(message, area.width);
    let height = 3;
    let x = area.x + area.width.saturating_sub(width + 1);
    let y = area.y + area.height.saturating_sub(height + 4);
    let rect = Rect::new(x, y, width, height).intersection(area);

    frame.render_widget(Clear, rect);
    let style = if is_error {
        Style::default().fg(theme.error).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.success).add_modifier(Modifier::BOLD)
    };
    let title = if is_error { "Error" } else { "Done" };
    let paragraph = Paragraph::new(Line::from(Span::styled(message, style)))
        .alignment(Alignment::Center)
        .block(panel_block(title, theme));
    frame.render_widget(paragraph, rect);
}

fn toast_width(message: &str, available: u16) -> u16 {
    u16::try_from(message.len())
        .unwrap_or(u16::MAX)
        .saturating_add(6)
        .clamp(20, available.saturating_sub(2).max(20))
}

fn draw_help(frame: &mut Frame, area: Rect, theme: &Theme) {
    let block = centered_rect(60, 60, area);
    frame.render_widget(Clear, block);

    let header_style = Style::default().add_modifier(Modifier::BOLD).fg(theme.accent);
    let key_style = Style::default().fg(theme.highlight);
    let key_row = |key: &'static str, action: &'static str| {
        Row::new(vec![
            Cell::from(Span::styled(key, key_style)),
            Cell::from(action),
        ])
    };

    let rows = vec![
        Row::new(vec![
            Cell::from(Span::styled("Calendar", header_style)),
            Cell::from(""),
        ]),
        key_row("Left/Right", "Previous / next day"),
        key_row("Up/Down", "Previous / next week"),
        key_row("[ / ]", "Previous / next month"),
        key_row("Enter", "Open the selected day"),
        Row::new(vec![Cell::from(""), Cell::from("")]),
        Row::new(vec![
            Cell::from(Span::styled("Actions", header_style)),
            Cell::from(""),
        ]),
        key_row("c", "Copy the day summary"),
        key_row("r", "Reload history"),
        key_row("t", "Cycle theme"),
        key_row("Esc", "Back to the calendar"),
        key_row("h", "Toggle help"),
        key_row("q", "Quit"),
    ];

    let table = Table::new(rows, [Constraint::Length(14), Constraint::Min(10)])
        .block(panel_block("Help", theme))
        .column_spacing(2);
    frame.render_widget(table, block);
}

fn draw_background(frame: &mut Frame, area: Rect, theme: &Theme) {
    let block = Block::default().style(Style::default().bg(theme.bg).fg(theme.text));
    frame.render_widget(block, area);
}

fn panel_block(title: &str, theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme.border_style())
        .style(theme.panel_style())
        .title(Line::from(Span::styled(
            format!(" {} ", title),
            theme.title_style(),
        )))
}

#[derive(Clone, Copy)]
struct Theme {
    bg: Color,
    panel: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    highlight: Color,
    success: Color,
    error: Color,
    accent_dark: Color,
}

impl Theme {
    fn panel_style(&self) -> Style {
        Style::default().bg(self.panel).fg(self.text)
    }

    fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    fn title_style(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    fn accent_contrast(&self) -> Color {
        if matches!(self.bg, Color::Rgb(242, 244, 248)) {
            self.accent_dark
        } else {
            Color::Black
        }
    }
}

fn theme_from(pref: ThemePreference) -> Theme {
    match pref {
        ThemePreference::Terminal => Theme {
            bg: Color::Reset,
            panel: Color::Reset,
            border: Color::DarkGray,
            text: Color::Reset,
            muted: Color::DarkGray,
            accent: Color::Cyan,
            highlight: Color::Yellow,
            success: Color::Green,
            error: Color::Red,
            accent_dark: Color::Black,
        },
        ThemePreference::Dark => Theme {
            bg: Color::Rgb(16, 20, 24),
            panel: Color::Rgb(24, 30, 36),
            border: Color::Rgb(58, 70, 82),
            text: Color::Rgb(226, 232, 236),
            muted: Color::Rgb(140, 152, 164),
            accent: Color::Rgb(255, 140, 66),
            highlight: Color::Rgb(255, 214, 102),
            success: Color::Rgb(110, 214, 140),
            error: Color::Rgb(255, 110, 110),
            accent_dark: Color::Rgb(90, 40, 10),
        },
        ThemePreference::Light => Theme {
            bg: Color::Rgb(242, 244, 248),
            panel: Color::Rgb(255, 255, 255),
            border: Color::Rgb(210, 218, 228),
            text: Color::Rgb(28, 32, 40),
            muted: Color::Rgb(104, 116, 132),
            accent: Color::Rgb(232, 102, 30),
            highlight: Color::Rgb(196, 120, 0),
            success: Color::Rgb(30, 140, 80),
            error: Color::Rgb(210, 50, 60),
            accent_dark: Color::Rgb(60, 24, 4),
        },
    }
}

fn theme_label(theme: ThemePreference) -> &'static str {
    match theme {
        ThemePreference::Terminal => "Terminal",
        ThemePreference::Dark => "Chalk",
        ThemePreference::Light => "Daylight",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_grid_shrinks_to_available_height() {
        let area = Rect::new(0, 0, 80, 12);
        let (grid, cells) = fit_grid(area, 7 + 35).unwrap();
        assert!(grid.container_width <= 80);
        let bottom = cells
            .iter()
            .map(|cell| (cell.y + cell.height) / ROW_ASPECT)
            .max()
            .unwrap();
        assert!(bottom <= 12);
    }

    #[test]
    fn toast_width_handles_long_messages() {
        assert_eq!(toast_width("Saved", 80), 20);
        assert_eq!(toast_width(&"x".repeat(40), 80), 46);
        assert_eq!(toast_width(&"x".repeat(70_000), 80), 78);
    }

    #[test]
    fn fit_grid_gives_up_on_tiny_areas() {
        assert!(fit_grid(Rect::new(0, 0, 6, 20), 10).is_none());
    }
}
