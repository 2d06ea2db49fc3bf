use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

impl DatePart {
    fn width(self) -> usize {
        match self {
            DatePart::Year => 4,
            DatePart::Month | DatePart::Day => 2,
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            DatePart::Year => "[YYYY]",
            DatePart::Month => "[MM]",
            DatePart::Day => "[DD]",
        }
    }
}

/// Segment-by-segment editor for an optional date. Typing into an unset
/// date starts from `fallback`; `Delete` clears it again.
#[derive(Debug, Clone)]
pub struct DateInputState {
    pub date: Option<NaiveDate>,
    pub editing: bool,
    pub date_part: DatePart,
    fallback: NaiveDate,
    buffer: String,
}

impl DateInputState {
    pub fn new(date: Option<NaiveDate>, fallback: NaiveDate) -> Self {
        Self {
            date,
            editing: false,
            date_part: DatePart::Year,
            fallback,
            buffer: String::new(),
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        self.date_part = DatePart::Year;
        self.buffer.clear();
    }

    pub fn next_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Month,
            DatePart::Month => DatePart::Day,
            DatePart::Day => DatePart::Year,
        };
        self.buffer.clear();
    }

    pub fn previous_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Day,
            DatePart::Month => DatePart::Year,
            DatePart::Day => DatePart::Month,
        };
        self.buffer.clear();
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.buffer.push(c);
                if self.buffer.len() == self.date_part.width() {
                    self.commit_segment();
                    self.next_date_part();
                }
            }
            KeyCode::Backspace => {
                self.buffer.pop();
            }
            KeyCode::Delete => {
                self.date = None;
                self.buffer.clear();
            }
            KeyCode::Right => self.next_date_part(),
            KeyCode::Left => self.previous_date_part(),
            _ => {}
        }
    }

    /// Apply the typed segment. Values that would make an impossible date
    /// (month 13, February 30th) are dropped.
    fn commit_segment(&mut self) {
        let Ok(value) = self.buffer.parse::<u32>() else {
            return;
        };
        let base = self.date.unwrap_or(self.fallback);
        let updated = match self.date_part {
            DatePart::Year => i32::try_from(value)
                .ok()
                .filter(|year| (1900..=2100).contains(year))
                .and_then(|year| base.with_year(year)),
            DatePart::Month => base.with_month(value),
            DatePart::Day => base.with_day(value),
        };
        if let Some(date) = updated {
            self.date = Some(date);
        }
    }

    pub fn get_display_string(&self) -> String {
        let Some(date) = self.date else {
            return if self.editing {
                format!("Not set {}", self.date_part.placeholder())
            } else {
                "Not set".to_string()
            };
        };
        if !self.editing {
            return date.format("%Y-%m-%d").to_string();
        }

        let cursor = if self.buffer.is_empty() {
            self.date_part.placeholder().to_string()
        } else {
            format!("[{}]", self.buffer)
        };
        let (year, month, day) = (
            format!("{:04}", date.year()),
            format!("{:02}", date.month()),
            format!("{:02}", date.day()),
        );
        match self.date_part {
            DatePart::Year => format!("{year}{cursor}-{month}-{day}"),
            DatePart::Month => format!("{year}-{month}{cursor}-{day}"),
            DatePart::Day => format!("{year}-{month}-{day}{cursor}"),
        }
    }
}
