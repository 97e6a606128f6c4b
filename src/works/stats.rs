use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{Work, WorkStatus};

pub const NO_AREA_LABEL: &str = "Sem área";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub submitted: usize,
    pub under_review: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn tally<'a>(works: impl IntoIterator<Item = &'a Work>) -> Self {
        let mut counts = StatusCounts::default();
        for work in works {
            counts.total += 1;
            match work.status {
                WorkStatus::Submitted => counts.submitted += 1,
                WorkStatus::UnderReview => counts.under_review += 1,
                WorkStatus::Approved => counts.approved += 1,
                WorkStatus::Rejected => counts.rejected += 1,
            }
        }
        counts
    }

    pub fn get(&self, status: WorkStatus) -> usize {
        match status {
            WorkStatus::Submitted => self.submitted,
            WorkStatus::UnderReview => self.under_review,
            WorkStatus::Approved => self.approved,
            WorkStatus::Rejected => self.rejected,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AreaCount {
    pub area: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub counts: StatusCounts,
    pub by_area: Vec<AreaCount>,
    pub by_year: Vec<YearCount>,
}

/// Aggregates the full work list for the coordinator charts.
///
/// Areas are ordered by descending count, ties by name; years ascend.
pub fn dashboard_stats(works: &[Work]) -> DashboardStats {
    let mut area_totals: HashMap<&str, usize> = HashMap::new();
    let mut year_totals: BTreeMap<i32, usize> = BTreeMap::new();

    for work in works {
        let area = work.area_name().unwrap_or(NO_AREA_LABEL);
        *area_totals.entry(area).or_default() += 1;
        *year_totals.entry(work.year).or_default() += 1;
    }

    let mut by_area: Vec<AreaCount> = area_totals
        .into_iter()
        .map(|(area, count)| AreaCount {
            area: area.to_string(),
            count,
        })
        .collect();
    by_area.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.area.cmp(&b.area)));

    let by_year = year_totals
        .into_iter()
        .map(|(year, total)| YearCount { year, total })
        .collect();

    DashboardStats {
        counts: StatusCounts::tally(works),
        by_area,
        by_year,
    }
}

/// Status tab on the student dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(WorkStatus),
}

impl StatusFilter {
    pub const ALL_KEY: &'static str = "todos";

    pub fn from_param(value: Option<&str>) -> Self {
        value
            .and_then(WorkStatus::parse)
            .map(StatusFilter::Only)
            .unwrap_or(StatusFilter::All)
    }

    pub fn key(&self) -> &'static str {
        match self {
            StatusFilter::All => Self::ALL_KEY,
            StatusFilter::Only(status) => status.as_str(),
        }
    }

    fn matches(&self, status: WorkStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(expected) => *expected == status,
        }
    }
}

/// Case-insensitive substring match on title or author combined with the status tab.
pub fn filter_works<'a>(works: &'a [Work], query: &str, filter: StatusFilter) -> Vec<&'a Work> {
    let needle = query.trim().to_lowercase();
    works
        .iter()
        .filter(|work| filter.matches(work.status))
        .filter(|work| {
            needle.is_empty()
                || work.title.to_lowercase().contains(&needle)
                || work.author.to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::works::fixtures::work;

    #[test]
    fn tallies_every_status() {
        let works = vec![
            work("A", WorkStatus::Submitted, None, 2024),
            work("B", WorkStatus::Submitted, None, 2024),
            work("C", WorkStatus::Approved, None, 2024),
            work("D", WorkStatus::Rejected, None, 2024),
            work("E", WorkStatus::UnderReview, None, 2024),
        ];
        let counts = StatusCounts::tally(&works);
        assert_eq!(counts.total, 5);
        assert_eq!(counts.get(WorkStatus::Submitted), 2);
        assert_eq!(counts.under_review, 1);
        assert_eq!(counts.approved, 1);
        assert_eq!(counts.rejected, 1);
    }

    #[test]
    fn groups_by_area_with_fallback_label() {
        let works = vec![
            work("A", WorkStatus::Submitted, Some("Redes"), 2023),
            work("B", WorkStatus::Submitted, Some("IA"), 2024),
            work("C", WorkStatus::Approved, Some("IA"), 2024),
            work("D", WorkStatus::Approved, None, 2025),
        ];
        let stats = dashboard_stats(&works);
        assert_eq!(
            stats.by_area,
            vec![
                AreaCount {
                    area: "IA".into(),
                    count: 2
                },
                AreaCount {
                    area: "Redes".into(),
                    count: 1
                },
                AreaCount {
                    area: NO_AREA_LABEL.into(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn years_are_sorted_ascending() {
        let works = vec![
            work("A", WorkStatus::Submitted, None, 2025),
            work("B", WorkStatus::Submitted, None, 2023),
            work("C", WorkStatus::Submitted, None, 2025),
        ];
        let stats = dashboard_stats(&works);
        assert_eq!(
            stats.by_year,
            vec![
                YearCount {
                    year: 2023,
                    total: 1
                },
                YearCount {
                    year: 2025,
                    total: 2
                },
            ]
        );
    }

    #[test]
    fn empty_list_has_no_chart_rows() {
        let stats = dashboard_stats(&[]);
        assert_eq!(stats.counts, StatusCounts::default());
        assert!(stats.by_area.is_empty());
        assert!(stats.by_year.is_empty());
    }

    #[test]
    fn filters_by_text_and_status() {
        let mut other_author = work("Sistemas Distribuídos", WorkStatus::Approved, None, 2024);
        other_author.author = "Maria Lopes".to_string();
        let works = vec![
            work("Visão Computacional", WorkStatus::Submitted, None, 2024),
            work("Redes de Sensores", WorkStatus::Approved, None, 2024),
            other_author,
        ];

        let by_title = filter_works(&works, "visão", StatusFilter::All);
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title, "Visão Computacional");

        let by_author = filter_works(&works, "LOPES", StatusFilter::All);
        assert_eq!(by_author.len(), 1);

        let approved = filter_works(&works, "", StatusFilter::Only(WorkStatus::Approved));
        assert_eq!(approved.len(), 2);

        let none = filter_works(&works, "redes", StatusFilter::Only(WorkStatus::Rejected));
        assert!(none.is_empty());
    }

    #[test]
    fn unknown_tab_means_all() {
        assert_eq!(StatusFilter::from_param(Some("todos")), StatusFilter::All);
        assert_eq!(StatusFilter::from_param(Some("bogus")), StatusFilter::All);
        assert_eq!(StatusFilter::from_param(None), StatusFilter::All);
        assert_eq!(
            StatusFilter::from_param(Some("approved")),
            StatusFilter::Only(WorkStatus::Approved)
        );
    }
}
