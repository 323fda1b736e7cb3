//! Read-only summaries computed from already loaded collections.

use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Client, Communication, Job, JobStatus, TimeEntry};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOverview {
    pub total_clients: usize,
    pub average_rating: f64,
    pub total_revenue: f64,
    pub top_clients: Vec<Client>,
    pub recent_communications: Vec<Communication>,
}

/// Totals across all clients: top 5 by revenue, 10 newest communications.
pub fn client_overview(clients: &[Client], communications: &[Communication]) -> ClientOverview {
    let total_clients = clients.len();
    let average_rating = if total_clients > 0 {
        clients.iter().map(|c| c.rating as f64).sum::<f64>() / total_clients as f64
    } else {
        0.0
    };
    let total_revenue = clients.iter().map(|c| c.total_revenue).sum();

    let mut top_clients = clients.to_vec();
    top_clients.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
    top_clients.truncate(5);

    let mut recent_communications = communications.to_vec();
    recent_communications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_communications.truncate(10);

    ClientOverview {
        total_clients,
        average_rating,
        total_revenue,
        top_clients,
        recent_communications,
    }
}

/// Where an "average job hours" figure comes from. The two give different
/// answers and are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationSource {
    /// Mean logged minutes per time entry.
    TimeEntries,
    /// Mean `estimatedHours` over jobs that have an estimate.
    JobEstimates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardKpis {
    pub completed_jobs: usize,
    pub active_jobs: usize,
    pub total_revenue: f64,
    pub average_job_hours: f64,
}

pub fn average_job_hours(jobs: &[Job], entries: &[TimeEntry], source: DurationSource) -> f64 {
    let hours = match source {
        DurationSource::TimeEntries => {
            if entries.is_empty() {
                0.0
            } else {
                let minutes: i64 = entries.iter().map(|e| e.duration).sum();
                minutes as f64 / entries.len() as f64 / 60.0
            }
        }
        DurationSource::JobEstimates => {
            let estimated: Vec<f64> = jobs
                .iter()
                .map(|j| j.estimated_hours)
                .filter(|h| *h > 0.0)
                .collect();
            if estimated.is_empty() {
                0.0
            } else {
                estimated.iter().sum::<f64>() / estimated.len() as f64
            }
        }
    };
    (hours * 10.0).round() / 10.0
}

/// Revenue counts completed jobs only; "active" means in progress.
pub fn dashboard_kpis(jobs: &[Job], entries: &[TimeEntry], source: DurationSource) -> DashboardKpis {
    let completed: Vec<&Job> = jobs.iter().filter(|j| j.status == JobStatus::Completed).collect();
    DashboardKpis {
        completed_jobs: completed.len(),
        active_jobs: jobs.iter().filter(|j| j.status == JobStatus::InProgress).count(),
        total_revenue: completed.iter().map(|j| j.total_cost).sum(),
        average_job_hours: average_job_hours(jobs, entries, source),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetail {
    pub completed_jobs: usize,
    pub active_jobs: usize,
    pub cancelled_jobs: usize,
    pub total_revenue: f64,
    pub average_job_value: f64,
    pub recent_revenue: f64,
    pub completion_rate: f64,
    pub completed_communications: usize,
    pub pending_communications: usize,
    /// Revenue of recently completed jobs per `YYYY-MM`, oldest month first.
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: f64,
}

/// Breakdown for one client's jobs and communications. `recent_revenue`
/// and `monthly_revenue` cover jobs completed within six months of `now`.
pub fn client_detail(jobs: &[Job], communications: &[Communication], now: DateTime<Utc>) -> ClientDetail {
    let six_months_ago = now.checked_sub_months(Months::new(6)).unwrap_or(now);
    let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count();

    let completed_jobs = count(JobStatus::Completed);
    let total_revenue: f64 = jobs.iter().map(|j| j.total_cost).sum();

    let recent: Vec<(DateTime<Utc>, f64)> = jobs
        .iter()
        .filter(|j| j.status == JobStatus::Completed)
        .filter_map(|j| {
            let ts = DateTime::parse_from_rfc3339(j.completed_at.as_deref()?).ok()?;
            Some((ts.with_timezone(&Utc), j.total_cost))
        })
        .filter(|(ts, _)| *ts > six_months_ago)
        .collect();
    let recent_revenue = recent.iter().map(|(_, cost)| cost).sum();

    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();
    for (ts, cost) in &recent {
        *by_month.entry(ts.format("%Y-%m").to_string()).or_default() += cost;
    }
    let monthly_revenue = by_month
        .into_iter()
        .map(|(month, revenue)| MonthlyRevenue { month, revenue })
        .collect();

    let completed_communications = communications.iter().filter(|c| c.is_completed).count();

    ClientDetail {
        completed_jobs,
        active_jobs: jobs.iter().filter(|j| j.status.is_open()).count(),
        cancelled_jobs: count(JobStatus::Cancelled),
        total_revenue,
        average_job_value: if jobs.is_empty() { 0.0 } else { total_revenue / jobs.len() as f64 },
        recent_revenue,
        completion_rate: if jobs.is_empty() {
            0.0
        } else {
            completed_jobs as f64 / jobs.len() as f64 * 100.0
        },
        completed_communications,
        pending_communications: communications.len() - completed_communications,
        monthly_revenue,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostDrift {
    pub job_id: String,
    pub title: String,
    pub stored: f64,
    pub expected: f64,
}

/// Jobs whose stored `totalCost` no longer equals hours × rate.
pub fn cost_drift(jobs: &[Job], tolerance: f64) -> Vec<CostDrift> {
    jobs.iter()
        .filter(|j| (j.total_cost - j.expected_cost()).abs() > tolerance)
        .map(|j| CostDrift {
            job_id: j.id.clone(),
            title: j.title.clone(),
            stored: j.total_cost,
            expected: j.expected_cost(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommunicationType;

    fn job(status: JobStatus, hours: f64, rate: f64) -> Job {
        let mut j = Job::new("job", "Jan", "", hours, rate);
        j.status = status;
        j
    }

    #[test]
    fn test_duration_sources_differ() {
        let jobs = vec![job(JobStatus::Pending, 4.0, 10.0), job(JobStatus::Pending, 0.0, 10.0)];
        let entries = vec![
            TimeEntry::finished("x", 120, None),
            TimeEntry::finished("x", 480, None),
        ];
        assert_eq!(average_job_hours(&jobs, &entries, DurationSource::TimeEntries), 5.0);
        assert_eq!(average_job_hours(&jobs, &entries, DurationSource::JobEstimates), 4.0);
        assert_eq!(average_job_hours(&[], &[], DurationSource::TimeEntries), 0.0);
    }

    #[test]
    fn test_dashboard_counts_completed_revenue() {
        let jobs = vec![
            job(JobStatus::Completed, 2.0, 100.0),
            job(JobStatus::InProgress, 3.0, 100.0),
            job(JobStatus::Cancelled, 1.0, 100.0),
        ];
        let kpis = dashboard_kpis(&jobs, &[], DurationSource::JobEstimates);
        assert_eq!(kpis.completed_jobs, 1);
        assert_eq!(kpis.active_jobs, 1);
        assert_eq!(kpis.total_revenue, 200.0);
        assert_eq!(kpis.average_job_hours, 2.0);
    }

    #[test]
    fn test_client_detail_recent_revenue() {
        let now = Utc::now();
        let mut recent = job(JobStatus::Completed, 1.0, 100.0);
        recent.completed_at = Some(crate::models::iso(now - chrono::Duration::days(10)));
        let mut old = job(JobStatus::Completed, 1.0, 300.0);
        old.completed_at = Some(crate::models::iso(now - chrono::Duration::days(400)));
        let open = job(JobStatus::Pending, 1.0, 200.0);

        let comms = vec![
            Communication::new("c", CommunicationType::Phone, "a").complete(),
            Communication::new("c", CommunicationType::Sms, "b"),
        ];
        let detail = client_detail(&[recent, old, open], &comms, now);

        assert_eq!(detail.completed_jobs, 2);
        assert_eq!(detail.active_jobs, 1);
        assert_eq!(detail.total_revenue, 600.0);
        assert_eq!(detail.average_job_value, 200.0);
        assert_eq!(detail.recent_revenue, 100.0);
        assert!((detail.completion_rate - 66.666).abs() < 0.01);
        assert_eq!(detail.completed_communications, 1);
        assert_eq!(detail.pending_communications, 1);
        assert_eq!(detail.monthly_revenue.len(), 1);
        assert_eq!(detail.monthly_revenue[0].revenue, 100.0);
    }

    #[test]
    fn test_monthly_revenue_groups_by_month() {
        let now = DateTime::parse_from_rfc3339("2024-05-20T12:00:00.000Z")
            .unwrap()
            .with_timezone(&Utc);
        let done = |at: &str, cost: f64| {
            let mut j = job(JobStatus::Completed, 1.0, cost);
            j.completed_at = Some(at.to_string());
            j
        };
        let jobs = vec![
            done("2024-05-02T08:00:00.000Z", 100.0),
            done("2024-03-15T08:00:00.000Z", 50.0),
            done("2024-05-19T08:00:00.000Z", 25.0),
            done("2023-01-10T08:00:00.000Z", 999.0),
        ];
        let detail = client_detail(&jobs, &[], now);
        let months: Vec<(&str, f64)> = detail
            .monthly_revenue
            .iter()
            .map(|m| (m.month.as_str(), m.revenue))
            .collect();
        assert_eq!(months, [("2024-03", 50.0), ("2024-05", 125.0)]);
        assert_eq!(detail.recent_revenue, 175.0);
    }

    #[test]
    fn test_overview_orders_top_clients() {
        let mut a = Client::new("A");
        a.total_revenue = 10.0;
        a.rating = 4;
        let mut b = Client::new("B");
        b.total_revenue = 30.0;
        let overview = client_overview(&[a, b], &[]);
        assert_eq!(overview.top_clients[0].name, "B");
        assert_eq!(overview.total_revenue, 40.0);
        assert_eq!(overview.average_rating, 4.5);
        assert_eq!(client_overview(&[], &[]).average_rating, 0.0);
    }

    #[test]
    fn test_cost_drift_detects_edited_total() {
        let clean = job(JobStatus::Pending, 2.0, 50.0);
        let mut edited = job(JobStatus::Pending, 2.0, 50.0);
        edited.total_cost = 150.0;
        let drift = cost_drift(&[clean, edited.clone()], 0.01);
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].job_id, edited.id);
        assert_eq!(drift[0].expected, 100.0);
    }

    #[test]
    fn test_new_jobs_never_drift() {
        for hours in [0.0, 0.5, 1.0, 7.25, 40.0] {
            for rate in [0.0, 45.5, 80.0, 120.0] {
                let j = job(JobStatus::Pending, hours, rate);
                assert!(cost_drift(&[j], 1e-9).is_empty(), "{}h x {}", hours, rate);
            }
        }
    }
}
