//! Geometry for the month calendar: a fixed 7-column grid whose first row
//! holds half-height weekday headers.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::calendar::{DayCalendarData, MonthCalendarData};

pub const COLUMNS: u32 = 7;

/// Data cells in a complete six-week grid.
pub const FULL_GRID_CELLS: usize = 42;

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarGrid {
    pub container_width: u32,
    pub horizontal_gap: u32,
    pub vertical_gap: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub row: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPlacement {
    pub cells: Vec<CellRect>,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCell<'a> {
    Header(Weekday),
    Blank,
    Day(&'a DayCalendarData),
}

impl CalendarGrid {
    pub fn new(container_width: u32, gap: u32) -> Self {
        Self {
            container_width,
            horizontal_gap: gap,
            vertical_gap: gap,
        }
    }

    /// Truncating integer division; widths narrower than the gaps give 0.
    pub fn column_width(&self) -> u32 {
        self.container_width
            .saturating_sub((COLUMNS - 1) * self.horizontal_gap)
            / COLUMNS
    }

    pub fn header_height(&self) -> u32 {
        self.column_width() / 2
    }

    /// Places `cell_count` cells: up to 7 header cells on row 0, then data
    /// cells seven to a row. The reported height always leaves room for six
    /// data rows plus one.
    pub fn place(&self, cell_count: usize) -> GridPlacement {
        let column_width = self.column_width();
        let header_height = self.header_height();
        let stride = column_width + self.horizontal_gap;

        let mut cells = Vec::with_capacity(cell_count);
        let mut row = 0;
        let mut column = 0;
        let mut y = 0;
        let mut row_height = 0;
        let mut height = 0;

        for index in 0..cell_count {
            let is_header = index < COLUMNS as usize;
            // Data cells never share the header row.
            let starts_data = index == COLUMNS as usize;
            if column == COLUMNS || starts_data {
                y += row_height + self.vertical_gap;
                row += 1;
                column = 0;
            }
            let cell_height = if is_header {
                header_height
            } else {
                column_width
            };
            row_height = cell_height;
            cells.push(CellRect {
                x: column * stride,
                y,
                width: column_width,
                height: cell_height,
                row,
                column,
            });
            height = y + row_height;
            column += 1;
        }

        // Anything short of six full weeks reserves one more row.
        let data_cells = cell_count.saturating_sub(COLUMNS as usize);
        if cell_count > 0 && data_cells < FULL_GRID_CELLS {
            height += self.vertical_gap + column_width;
        }

        GridPlacement { cells, height }
    }
}

/// Empty cells before day 1 so it lands in its ISO weekday column.
pub fn leading_blanks(first_of_month: NaiveDate) -> usize {
    (first_of_month.weekday().number_from_monday() - 1) as usize
}

/// The ordered cell sequence for `month`, index-aligned with
/// [`CalendarGrid::place`].
pub fn month_cells(month: &MonthCalendarData) -> Vec<GridCell<'_>> {
    let blanks = leading_blanks(month.month);
    let mut cells = Vec::with_capacity(WEEKDAYS.len() + blanks + month.daily_data_list.len());
    cells.extend(WEEKDAYS.iter().map(|weekday| GridCell::Header(*weekday)));
    cells.extend(std::iter::repeat_n(GridCell::Blank, blanks));
    cells.extend(month.daily_data_list.iter().map(GridCell::Day));
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn overlaps(a: &CellRect, b: &CellRect) -> bool {
        a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
    }

    fn month_data(year: i32, month: u32, days: u32) -> MonthCalendarData {
        MonthCalendarData {
            month: date(year, month, 1),
            daily_data_list: (1..=days)
                .map(|day| DayCalendarData {
                    day: date(year, month, day),
                    is_future_date: false,
                    exercise_activity_count: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn column_width_truncates() {
        let grid = CalendarGrid::new(350, 2);
        assert_eq!(grid.column_width(), 48);
        assert_eq!(grid.header_height(), 24);
    }

    #[test]
    fn zero_width_gives_zero_sized_cells() {
        let grid = CalendarGrid::new(0, 2);
        let placement = grid.place(14);
        assert_eq!(grid.column_width(), 0);
        assert!(placement.cells.iter().all(|cell| cell.width == 0 && cell.height == 0));
    }

    #[test]
    fn header_row_is_half_height() {
        let grid = CalendarGrid::new(350, 2);
        let placement = grid.place(7 + 31);
        for cell in &placement.cells[..7] {
            assert_eq!(cell.row, 0);
            assert_eq!(cell.y, 0);
            assert_eq!(cell.height, 24);
        }
        let first_data = placement.cells[7];
        assert_eq!((first_data.row, first_data.column), (1, 0));
        assert_eq!(first_data.y, 24 + 2);
        assert_eq!(first_data.height, 48);
    }

    #[test]
    fn columns_align_across_rows() {
        let grid = CalendarGrid::new(350, 2);
        let placement = grid.place(7 + 35);
        for cell in &placement.cells {
            assert_eq!(cell.x, cell.column * 50);
        }
    }

    #[test]
    fn cells_never_overlap_and_rows_hold_seven() {
        for width in [7, 50, 200, 350, 1024] {
            for count in [0, 3, 7, 8, 28, 37, 49] {
                let grid = CalendarGrid::new(width, 2);
                let placement = grid.place(count);
                assert_eq!(placement.cells.len(), count);

                for (i, a) in placement.cells.iter().enumerate() {
                    for b in &placement.cells[i + 1..] {
                        assert!(!overlaps(a, b), "width {width} count {count}: {a:?} {b:?}");
                    }
                }

                let rows = placement.cells.last().map(|cell| cell.row + 1).unwrap_or(0);
                for row in 0..rows.saturating_sub(1) {
                    let in_row = placement.cells.iter().filter(|c| c.row == row).count();
                    assert_eq!(in_row, 7, "width {width} count {count} row {row}");
                }

                if width >= 12 {
                    assert!(placement.cells.iter().all(|cell| cell.x + cell.width <= width));
                }
            }
        }
    }

    #[test]
    fn height_pads_grids_short_of_six_weeks() {
        let grid = CalendarGrid::new(350, 2);
        // header + 5 full weeks, plus the reserved row
        assert_eq!(grid.place(7 + 35).height, 24 + 6 * (2 + 48));
        // a partial sixth week counts as a row and still gets the reserve
        assert_eq!(grid.place(7 + 36).height, 24 + 7 * (2 + 48));
        // header only
        assert_eq!(grid.place(7).height, 24 + 2 + 48);
        assert_eq!(grid.place(0).height, 0);
    }

    #[test]
    fn complete_six_week_grid_is_not_padded() {
        let grid = CalendarGrid::new(350, 2);
        let placement = grid.place(7 + FULL_GRID_CELLS);
        assert_eq!(placement.height, 24 + 6 * (2 + 48));
        let last = placement.cells.last().unwrap();
        assert_eq!(last.y + last.height, placement.height);
    }

    #[test]
    fn leading_blanks_follow_iso_weekday() {
        // 2024-05-01 is a Wednesday
        assert_eq!(leading_blanks(date(2024, 5, 1)), 2);
        // 2024-01-01 is a Monday
        assert_eq!(leading_blanks(date(2024, 1, 1)), 0);
        // 2024-09-01 is a Sunday
        assert_eq!(leading_blanks(date(2024, 9, 1)), 6);
    }

    #[test]
    fn month_cells_put_day_one_under_its_weekday() {
        let may = month_data(2024, 5, 31);
        let cells = month_cells(&may);
        assert_eq!(cells.len(), 7 + 2 + 31);
        assert_eq!(cells[0], GridCell::Header(Weekday::Mon));
        assert_eq!(cells[7], GridCell::Blank);

        let placement = CalendarGrid::new(350, 2).place(cells.len());
        let day_one = placement.cells[9];
        let wednesday_header = placement.cells[2];
        assert!(matches!(cells[9], GridCell::Day(day) if day.day == date(2024, 5, 1)));
        assert_eq!(day_one.x, wednesday_header.x);
    }
}
