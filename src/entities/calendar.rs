//! Month view of a cronograma

use chrono::{Datelike, Duration, NaiveDate};

use crate::entities::project::{Project, ProjectStatus};

/// One day cell with the projects due that day
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDay<'a> {
    pub date: NaiveDate,
    pub projects: Vec<&'a Project>,
}

/// Weeks of a month, Monday first. Days outside the month are `None`.
#[derive(Debug, Clone)]
pub struct MonthCalendar<'a> {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<[Option<CalendarDay<'a>>; 7]>,
}

impl<'a> MonthCalendar<'a> {
    /// Bucket non-archived projects by due date. Returns `None` for an invalid month.
    pub fn build(year: i32, month: u32, projects: &'a [Project]) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let offset = first.weekday().num_days_from_monday() as usize;

        let mut weeks: Vec<[Option<CalendarDay<'a>>; 7]> = Vec::new();
        let mut week: [Option<CalendarDay<'a>>; 7] = Default::default();
        let mut slot = offset;
        let mut date = first;

        while date.month() == month {
            let mut due: Vec<&Project> = projects
                .iter()
                .filter(|p| p.due_date == date && p.status != ProjectStatus::Archived)
                .collect();
            due.sort_by(|a, b| a.title.cmp(&b.title));
            week[slot] = Some(CalendarDay {
                date,
                projects: due,
            });

            slot += 1;
            if slot == 7 {
                weeks.push(std::mem::take(&mut week));
                slot = 0;
            }
            date += Duration::days(1);
        }
        if slot > 0 {
            weeks.push(week);
        }

        Some(Self { year, month, weeks })
    }

    /// Parse `YYYY-MM`
    pub fn parse_month(s: &str) -> Option<(i32, u32)> {
        let (y, m) = s.trim().split_once('-')?;
        let year = y.parse().ok()?;
        let month = m.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
    }

    pub fn days(&self) -> impl Iterator<Item = &CalendarDay<'a>> {
        self.weeks.iter().flat_map(|w| w.iter().flatten())
    }

    /// Number of projects shown in the month
    pub fn project_count(&self) -> usize {
        self.days().map(|d| d.projects.len()).sum()
    }

    pub fn title(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_default()
    }
}
