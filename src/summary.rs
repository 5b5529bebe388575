// 📊 Dashboard Summary + contribution filtering
//
// Pure functions over a slice of contributions. The caller applies role
// visibility first, so a village manager's dashboard only ever sees their
// own village.

use crate::entities::{Contribution, PaymentType, User, Village};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// FILTER
// ============================================================================

/// Contribution list filters; empty fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionFilter {
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub payment_type: Option<PaymentType>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive match on donor name or contact
    #[serde(default)]
    pub search: Option<String>,
}

impl ContributionFilter {
    pub fn matches(&self, c: &Contribution) -> bool {
        if let Some(village) = non_blank(&self.village) {
            if c.village != village {
                return false;
            }
        }
        if let Some(payment_type) = self.payment_type {
            if c.payment_type != payment_type {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if c.date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if c.date > to {
                return false;
            }
        }
        if let Some(search) = non_blank(&self.search) {
            let needle = search.to_lowercase();
            if !c.donor_name.to_lowercase().contains(&needle)
                && !c.donor_contact.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Role visibility: village managers only see their assigned village
pub fn visible_to(user: Option<&User>, village: &str) -> bool {
    match user.and_then(|u| u.visible_village()) {
        Some(assigned) => assigned == village,
        None => true,
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VillagePerformance {
    pub village: String,
    pub total: u64,
    pub contributors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBreakdown {
    pub payment_type: PaymentType,
    pub total: u64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    /// `YYYY-MM` for monthly points, `YYYY-MM-DD` for daily ones
    pub period: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_funds: u64,
    /// Distinct donor names
    pub total_contributors: usize,
    pub today_total: u64,
    pub villages: Vec<VillagePerformance>,
    pub payment_types: Vec<PaymentBreakdown>,
    /// Last seven days, oldest first
    pub daily_growth: Vec<TrendPoint>,
    /// Last six months, oldest first
    pub monthly_trend: Vec<TrendPoint>,
}

impl DashboardSummary {
    pub fn compute(contributions: &[&Contribution], villages: &[Village], today: NaiveDate) -> Self {
        let sum = |filter: &dyn Fn(&Contribution) -> bool| -> u64 {
            contributions
                .iter()
                .filter(|c| filter(**c))
                .map(|c| c.amount)
                .sum()
        };

        let villages = villages
            .iter()
            .map(|v| {
                let in_village: Vec<&&Contribution> =
                    contributions.iter().filter(|c| c.village == v.name).collect();
                VillagePerformance {
                    village: v.name.clone(),
                    total: in_village.iter().map(|c| c.amount).sum(),
                    contributors: distinct_donors(in_village.iter().map(|c| **c)),
                }
            })
            .collect();

        let payment_types = PaymentType::ALL
            .iter()
            .map(|&payment_type| PaymentBreakdown {
                payment_type,
                total: sum(&|c| c.payment_type == payment_type),
                count: contributions
                    .iter()
                    .filter(|c| c.payment_type == payment_type)
                    .count(),
            })
            .collect();

        let daily_growth = (0..7)
            .rev()
            .map(|offset| {
                let day = today - Duration::days(offset);
                TrendPoint {
                    period: day.format("%Y-%m-%d").to_string(),
                    total: sum(&|c| c.date == day),
                }
            })
            .collect();

        let monthly_trend = (0..6)
            .rev()
            .map(|offset| {
                let (year, month) = months_back(today, offset);
                TrendPoint {
                    period: format!("{:04}-{:02}", year, month),
                    total: sum(&|c| c.date.year() == year && c.date.month() == month),
                }
            })
            .collect();

        DashboardSummary {
            total_funds: sum(&|_| true),
            total_contributors: distinct_donors(contributions.iter().copied()),
            today_total: sum(&|c| c.date == today),
            villages,
            payment_types,
            daily_growth,
            monthly_trend,
        }
    }
}

fn distinct_donors<'a>(contributions: impl Iterator<Item = &'a Contribution>) -> usize {
    contributions
        .map(|c| c.donor_name.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// (year, month) `offset` calendar months before `date`
fn months_back(date: NaiveDate, offset: u32) -> (i32, u32) {
    let index = date.year() * 12 + date.month0() as i32 - offset as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Role;

    fn contribution(id: i64, donor: &str, village: &str, amount: u64, payment_type: PaymentType, date: (i32, u32, u32)) -> Contribution {
        Contribution {
            id,
            donor_name: donor.to_string(),
            donor_contact: format!("98765{:05}", id),
            village: village.to_string(),
            locality: "Main Market".to_string(),
            amount,
            payment_type,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        }
    }

    fn sample() -> Vec<Contribution> {
        vec![
            contribution(1, "Rajesh Kumar", "Chandrapur", 5000, PaymentType::Cash, (2024, 1, 15)),
            contribution(2, "Priya Sharma", "Mohisguha", 3000, PaymentType::Online, (2024, 2, 10)),
            contribution(3, "Rajesh Kumar", "Chandrapur", 1000, PaymentType::Cash, (2024, 3, 1)),
            contribution(4, "Sunita Devi", "Chatra", 2000, PaymentType::Other, (2024, 3, 3)),
        ]
    }

    #[test]
    fn test_summary_totals() {
        let data = sample();
        let refs: Vec<&Contribution> = data.iter().collect();
        let today = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();

        let summary = DashboardSummary::compute(&refs, &Village::defaults(), today);

        assert_eq!(summary.total_funds, 11000);
        assert_eq!(summary.total_contributors, 3);
        assert_eq!(summary.today_total, 2000);

        let chandrapur = &summary.villages[0];
        assert_eq!(chandrapur.village, "Chandrapur");
        assert_eq!(chandrapur.total, 6000);
        assert_eq!(chandrapur.contributors, 1);

        let cash = summary
            .payment_types
            .iter()
            .find(|p| p.payment_type == PaymentType::Cash)
            .unwrap();
        assert_eq!((cash.total, cash.count), (6000, 2));
    }

    #[test]
    fn test_trends_cover_recent_periods() {
        let data = sample();
        let refs: Vec<&Contribution> = data.iter().collect();
        let today = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();

        let summary = DashboardSummary::compute(&refs, &[], today);

        let months: Vec<&str> = summary.monthly_trend.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(months, vec!["2023-10", "2023-11", "2023-12", "2024-01", "2024-02", "2024-03"]);
        assert_eq!(summary.monthly_trend[5].total, 3000);

        assert_eq!(summary.daily_growth.len(), 7);
        assert_eq!(summary.daily_growth[0].period, "2024-02-26");
        assert_eq!(summary.daily_growth[4].total, 1000);
        assert_eq!(summary.daily_growth[6].total, 2000);
    }

    #[test]
    fn test_empty_summary() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let summary = DashboardSummary::compute(&[], &Village::defaults(), today);

        assert_eq!(summary.total_funds, 0);
        assert_eq!(summary.total_contributors, 0);
        assert!(summary.villages.iter().all(|v| v.total == 0));
    }

    #[test]
    fn test_filter_combines_fields() {
        let data = sample();
        let filter = ContributionFilter {
            village: Some("Chandrapur".to_string()),
            date_from: NaiveDate::from_ymd_opt(2024, 2, 1),
            ..Default::default()
        };

        let ids: Vec<i64> = data.iter().filter(|c| filter.matches(c)).map(|c| c.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let data = sample();
        let by_name = ContributionFilter {
            search: Some("PRIYA".to_string()),
            ..Default::default()
        };
        let by_contact = ContributionFilter {
            search: Some("00004".to_string()),
            ..Default::default()
        };
        let blank = ContributionFilter {
            search: Some("  ".to_string()),
            ..Default::default()
        };

        assert_eq!(data.iter().filter(|c| by_name.matches(c)).count(), 1);
        assert_eq!(data.iter().find(|c| by_contact.matches(c)).unwrap().id, 4);
        assert_eq!(data.iter().filter(|c| blank.matches(c)).count(), 4);
    }

    #[test]
    fn test_visibility_by_role() {
        let manager = User::new("ChatraManager", "123", Role::VillageManager, "Chatra Manager", Some("Chatra"));
        let core = User::new("User1", "123", Role::CoreTeam, "User 1", None);

        assert!(visible_to(Some(&manager), "Chatra"));
        assert!(!visible_to(Some(&manager), "Chandrapur"));
        assert!(visible_to(Some(&core), "Chandrapur"));
        assert!(visible_to(None, "Chandrapur"));
    }

    #[test]
    fn test_months_back_crosses_year() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(months_back(date, 0), (2024, 2));
        assert_eq!(months_back(date, 2), (2023, 12));
        assert_eq!(months_back(date, 14), (2022, 12));
    }
}
