pub mod queries;
pub mod series;
pub mod types;

pub use queries::Scope;
pub use types::*;

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};

use crate::date_util::{format_timestamp, midnight_utc, start_of_iso_week};
use crate::error::{Error, Result};
use crate::model::{SubmissionStatus, SubtaskStatus};
use crate::storage::{repository, Database};

pub const RECENT_LIMIT: u32 = 10;
pub const RECENT_PENDING_LIMIT: u32 = 5;

/// Run one section query on a pooled reader connection.
async fn read<T, F>(db: &Database, query: F) -> Result<T>
where
    F: FnOnce(&rusqlite::Connection) -> std::result::Result<T, rusqlite::Error> + Send + 'static,
    T: Send + 'static,
{
    db.reader()
        .call(move |conn| query(&*conn))
        .await
        .map_err(|e| Error::Database(e.to_string()))
}

/// Resolve the manager profile, its department set and the team leads under it.
async fn resolve_scope(db: &Database, manager_id: &str) -> Result<(ManagerProfile, Scope)> {
    let manager_id = manager_id.to_string();
    let resolved = read(db, move |conn| {
        let Some(row) = repository::get_manager(conn, &manager_id)? else {
            return Ok(None);
        };
        let departments = repository::list_manager_departments(conn, &row.id)?;
        let department_ids: Vec<String> = departments.iter().map(|d| d.id.clone()).collect();
        let team_lead_ids = repository::list_team_lead_ids(conn, &row.id, &department_ids)?;
        Ok(Some((
            ManagerProfile {
                id: row.id.clone(),
                name: row.name,
                email: row.email,
                departments,
            },
            Scope {
                manager_id: row.id,
                department_ids,
                team_lead_ids,
            },
        )))
    })
    .await?;

    resolved.ok_or_else(|| Error::NotFound("Manager not found".into()))
}

/// Compute the dashboard snapshot for `manager_id` as of `now`.
///
/// The department and team lead sets are resolved first; every section
/// query then runs concurrently against them. Any failure aborts the whole
/// snapshot.
pub async fn compute_manager_stats(
    db: &Database,
    manager_id: &str,
    now: DateTime<Utc>,
) -> Result<ManagerStats> {
    let (profile, scope) = resolve_scope(db, manager_id).await?;
    log::debug!(
        "Computing stats for manager {} ({} departments, {} team leads)",
        scope.manager_id,
        scope.department_ids.len(),
        scope.team_lead_ids.len()
    );
    let scope = Arc::new(scope);

    let today = now.date_naive();
    let today_start = format_timestamp(midnight_utc(today));
    let week_start = format_timestamp(midnight_utc(start_of_iso_week(today)));
    let month_start = format_timestamp(midnight_utc(today.with_day(1).unwrap_or(today)));
    let weekly_start = format_timestamp(midnight_utc(series::weekly_window_start(today)));
    let year = today.year();

    macro_rules! section {
        (|$conn:ident, $scope:ident| $body:expr) => {{
            let $scope = Arc::clone(&scope);
            read(db, move |$conn| $body)
        }};
    }

    let (
        totals,
        today_counts,
        week_counts,
        month_counts,
        submission_breakdown,
        subtask_breakdown,
        admin_task_breakdown,
        submission_spans,
        subtask_spans,
        by_month,
        weekly_stamps,
        lead_rows,
        departments,
        pending_approvals,
        recent_submissions,
        recent_subtasks,
        recent_pending,
    ) = tokio::try_join!(
        section!(|c, s| queries::totals(c, &s)),
        section!(|c, s| queries::window_counts(c, &s, &today_start)),
        section!(|c, s| queries::window_counts(c, &s, &week_start)),
        section!(|c, s| queries::window_counts(c, &s, &month_start)),
        section!(|c, s| queries::submission_breakdown(c, &s)),
        section!(|c, s| queries::subtask_breakdown(c, &s)),
        section!(|c, s| queries::admin_task_breakdown(c, &s)),
        section!(|c, s| queries::submission_spans(c, &s)),
        section!(|c, s| queries::subtask_spans(c, &s)),
        section!(|c, s| queries::submissions_by_month(c, &s, year)),
        section!(|c, s| queries::submission_created_since(c, &s, &weekly_start)),
        section!(|c, s| queries::team_lead_performance(c, &s)),
        section!(|c, s| queries::department_rollups(c, &s)),
        section!(|c, s| queries::pending_approval_count(c, &s)),
        section!(|c, s| queries::recent_submissions(c, &s, false, RECENT_LIMIT)),
        section!(|c, s| queries::recent_subtasks(c, &s, RECENT_LIMIT)),
        section!(|c, s| queries::recent_submissions(c, &s, true, RECENT_PENDING_LIMIT)),
    )?;

    let work_total = submission_breakdown.total + subtask_breakdown.total;
    let work_completed = submission_breakdown.completed + subtask_breakdown.completed;
    let performance = Performance {
        avg_submission_completion_time: series::average_hours(&submission_spans),
        avg_subtask_completion_time: series::average_hours(&subtask_spans),
        submission_efficiency: submission_breakdown.completion_rate,
        subtask_efficiency: subtask_breakdown.completion_rate,
        overall_efficiency: series::completion_rate(work_completed, work_total),
        approval_rate: series::completion_rate(
            submission_breakdown.approved,
            submission_breakdown.approved + submission_breakdown.rejected,
        ),
    };

    let charts = Charts {
        weekly_submissions: series::weekly_series(&weekly_stamps, today),
        monthly_submissions: series::monthly_series(&by_month),
        quarterly_submissions: series::quarterly_series(&by_month),
        submission_status_distribution: submission_status_series(&submission_breakdown),
        subtask_status_distribution: subtask_status_series(&subtask_breakdown),
    };

    Ok(ManagerStats {
        manager: profile,
        totals,
        today: today_counts,
        this_week: week_counts,
        this_month: month_counts,
        breakdown: Breakdown {
            submissions: submission_breakdown,
            subtasks: subtask_breakdown,
            admin_tasks: admin_task_breakdown,
        },
        performance,
        charts,
        insights: Insights {
            top_performing_team_leads: series::rank_team_leads(lead_rows),
            departments,
            pending_approvals,
        },
        recent: Recent {
            submissions: recent_submissions,
            subtasks: recent_subtasks,
            pending_approvals: recent_pending,
        },
    })
}

fn submission_status_series(b: &SubmissionBreakdown) -> ChartSeries {
    let counts = SubmissionStatus::ALL
        .iter()
        .map(|status| match status {
            SubmissionStatus::Pending => b.pending,
            SubmissionStatus::InProgress => b.in_progress,
            SubmissionStatus::Completed => b.completed,
            SubmissionStatus::Approved => b.approved,
            SubmissionStatus::Rejected => b.rejected,
        })
        .collect();
    ChartSeries {
        labels: SubmissionStatus::ALL.iter().map(|s| s.to_string()).collect(),
        counts,
    }
}

fn subtask_status_series(b: &TaskBreakdown) -> ChartSeries {
    let counts = SubtaskStatus::ALL
        .iter()
        .map(|status| match status {
            SubtaskStatus::Pending => b.pending,
            SubtaskStatus::InProgress => b.in_progress,
            SubtaskStatus::Completed => b.completed,
        })
        .collect();
    ChartSeries {
        labels: SubtaskStatus::ALL.iter().map(|s| s.to_string()).collect(),
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AdminTask, Department, Employee, Form, FormSubmission, Manager, Subtask, TeamLead};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        // Wednesday of ISO week 25
        Utc.with_ymd_and_hms(2025, 6, 18, 12, 0, 0).unwrap()
    }

    fn submission(id: &str, form: &str, by: &str, status: &str, created: &str) -> FormSubmission {
        FormSubmission {
            id: id.to_string(),
            form_id: form.to_string(),
            submitted_by: by.to_string(),
            assigned_to: Some("tl1".to_string()),
            status: status.to_string(),
            admin_status: None,
            created_at: created.to_string(),
            completed_at: None,
        }
    }

    fn subtask(id: &str, lead: &str, status: &str, created: &str) -> Subtask {
        Subtask {
            id: id.to_string(),
            title: format!("Subtask {id}"),
            submission_id: None,
            team_lead_id: lead.to_string(),
            assigned_employees: Vec::new(),
            status: status.to_string(),
            created_at: created.to_string(),
            completed_at: None,
        }
    }

    fn person(id: &str, manager: &str, dept: &str) -> (TeamLead, Employee) {
        (
            TeamLead {
                id: id.to_string(),
                name: format!("Lead {id}"),
                email: None,
                manager_id: manager.to_string(),
                department_id: dept.to_string(),
            },
            Employee {
                id: format!("e-{id}"),
                name: format!("Employee {id}"),
                email: None,
                manager_id: manager.to_string(),
                department_id: dept.to_string(),
            },
        )
    }

    async fn seeded() -> Database {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                for (id, name) in [("d1", "Finance"), ("d2", "Operations"), ("d9", "Legal")] {
                    repository::upsert_department(
                        conn,
                        &Department {
                            id: id.to_string(),
                            name: name.to_string(),
                        },
                    )?;
                }
                repository::upsert_manager(
                    conn,
                    &Manager {
                        id: "m1".to_string(),
                        name: "Mia".to_string(),
                        email: "mia@example.com".to_string(),
                        department_ids: vec!["d1".to_string(), "d2".to_string()],
                    },
                )?;
                repository::upsert_manager(
                    conn,
                    &Manager {
                        id: "m2".to_string(),
                        name: "Max".to_string(),
                        email: "max@example.com".to_string(),
                        department_ids: vec!["d1".to_string()],
                    },
                )?;

                // tl3 reports to m1 but sits outside m1's departments
                for (id, manager, dept) in [
                    ("tl1", "m1", "d1"),
                    ("tl2", "m1", "d2"),
                    ("tl3", "m1", "d9"),
                    ("tl4", "m2", "d1"),
                ] {
                    let (lead, employee) = person(id, manager, dept);
                    repository::upsert_team_lead(conn, &lead)?;
                    if id != "tl3" {
                        repository::upsert_employee(conn, &employee)?;
                    }
                }

                for (id, dept) in [("f1", "d1"), ("f2", "d2"), ("f9", "d9")] {
                    repository::upsert_form(
                        conn,
                        &Form {
                            id: id.to_string(),
                            title: format!("Form {id}"),
                            department_id: dept.to_string(),
                            created_by: Some("m1".to_string()),
                            fields: serde_json::json!([]),
                            created_at: "2025-01-01T00:00:00Z".to_string(),
                        },
                    )?;
                }

                let mut s1 = submission("s1", "f1", "m1", "completed", "2025-06-16T08:00:00Z");
                s1.completed_at = Some("2025-06-16T10:00:00Z".to_string());
                s1.admin_status = Some("pending".to_string());
                let s2 = submission("s2", "f2", "m1", "pending", "2025-06-18T09:00:00Z");
                let mut s3 = submission("s3", "f1", "m1", "approved", "2025-02-10T00:00:00Z");
                s3.admin_status = Some("approved".to_string());
                let mut s4 = submission("s4", "f1", "m1", "rejected", "2025-02-11T00:00:00Z");
                s4.admin_status = Some("rejected".to_string());
                let s5 = submission("s5", "f1", "m1", "archived", "2024-12-01T00:00:00Z");
                let s6 = submission("s6", "f1", "m2", "completed", "2025-06-17T00:00:00Z");
                for s in [s1, s2, s3, s4, s5, s6] {
                    repository::upsert_submission(conn, &s)?;
                }

                let mut st1 = subtask("st1", "tl1", "completed", "2025-06-17T00:00:00Z");
                st1.completed_at = Some("2025-06-17T04:00:00Z".to_string());
                st1.assigned_employees = vec!["e-tl1".to_string(), "e-tl2".to_string()];
                let st2 = subtask("st2", "tl1", "pending", "2025-06-18T01:00:00Z");
                let st3 = subtask("st3", "tl2", "in_progress", "2025-06-01T00:00:00Z");
                let mut st4 = subtask("st4", "tl3", "completed", "2025-06-17T00:00:00Z");
                st4.completed_at = Some("2025-06-17T01:00:00Z".to_string());
                for st in [st1, st2, st3, st4] {
                    repository::upsert_subtask(conn, &st)?;
                }

                for (id, assignee, status) in [
                    ("at1", "m1", "completed"),
                    ("at2", "m1", "pending"),
                    ("at3", "m2", "pending"),
                ] {
                    repository::upsert_admin_task(
                        conn,
                        &AdminTask {
                            id: id.to_string(),
                            title: format!("Admin task {id}"),
                            assigned_to: assignee.to_string(),
                            status: status.to_string(),
                            created_at: "2025-06-02T00:00:00Z".to_string(),
                        },
                    )?;
                }
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_unknown_manager_is_not_found() {
        let db = Database::open_memory().await.unwrap();
        let err = compute_manager_stats(&db, "ghost", now()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_manager_without_records_has_zero_rates() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                repository::upsert_manager(
                    conn,
                    &Manager {
                        id: "m1".to_string(),
                        name: "Mia".to_string(),
                        email: "mia@example.com".to_string(),
                        department_ids: Vec::new(),
                    },
                )?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();

        let stats = compute_manager_stats(&db, "m1", now()).await.unwrap();
        assert_eq!(stats.totals.submissions, 0);
        assert_eq!(stats.breakdown.submissions.completion_rate, 0.0);
        assert_eq!(stats.breakdown.subtasks.completion_rate, 0.0);
        assert_eq!(stats.breakdown.admin_tasks.completion_rate, 0.0);
        assert_eq!(stats.performance.avg_submission_completion_time, 0.0);
        assert_eq!(stats.performance.avg_subtask_completion_time, 0.0);
        assert_eq!(stats.performance.overall_efficiency, 0.0);
        assert_eq!(stats.performance.approval_rate, 0.0);
        assert_eq!(stats.charts.weekly_submissions.counts, vec![0; 8]);
        assert_eq!(stats.charts.monthly_submissions.counts, vec![0; 12]);
        assert_eq!(stats.charts.quarterly_submissions.counts, vec![0; 4]);
        assert!(stats.insights.top_performing_team_leads.is_empty());
        assert!(stats.recent.submissions.is_empty());
    }

    #[tokio::test]
    async fn test_scoped_totals_and_breakdowns() {
        let db = seeded().await;
        let stats = compute_manager_stats(&db, "m1", now()).await.unwrap();

        assert_eq!(stats.manager.name, "Mia");
        let dept_names: Vec<&str> = stats.manager.departments.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(dept_names, vec!["Finance", "Operations"]);

        let t = &stats.totals;
        assert_eq!(
            (t.team_leads, t.employees, t.forms, t.submissions, t.subtasks, t.admin_tasks, t.departments),
            (2, 2, 2, 5, 3, 2, 2)
        );

        // The legacy "archived" submission counts toward the total only.
        let s = &stats.breakdown.submissions;
        assert_eq!((s.total, s.pending, s.in_progress, s.completed, s.approved, s.rejected), (5, 1, 0, 1, 1, 1));
        assert_eq!(s.completion_rate, 20.0);
        assert!(s.pending + s.in_progress + s.completed + s.approved + s.rejected <= s.total);

        let st = &stats.breakdown.subtasks;
        assert_eq!((st.total, st.pending, st.in_progress, st.completed), (3, 1, 1, 1));
        assert_eq!(st.completion_rate, 33.3);

        let at = &stats.breakdown.admin_tasks;
        assert_eq!((at.total, at.completed), (2, 1));
        assert_eq!(at.completion_rate, 50.0);
    }

    #[tokio::test]
    async fn test_performance_figures() {
        let db = seeded().await;
        let p = compute_manager_stats(&db, "m1", now()).await.unwrap().performance;

        assert_eq!(p.avg_submission_completion_time, 2.0);
        assert_eq!(p.avg_subtask_completion_time, 4.0);
        assert_eq!(p.submission_efficiency, 20.0);
        assert_eq!(p.subtask_efficiency, 33.3);
        assert_eq!(p.overall_efficiency, 25.0);
        assert_eq!(p.approval_rate, 50.0);
    }

    #[tokio::test]
    async fn test_time_windows() {
        let db = seeded().await;
        let stats = compute_manager_stats(&db, "m1", now()).await.unwrap();

        let today = &stats.today;
        assert_eq!(
            (today.submissions, today.completed_submissions, today.subtasks, today.completed_subtasks),
            (1, 0, 1, 0)
        );
        let week = &stats.this_week;
        assert_eq!(
            (week.submissions, week.completed_submissions, week.subtasks, week.completed_subtasks),
            (2, 1, 2, 1)
        );
        let month = &stats.this_month;
        assert_eq!(
            (month.submissions, month.completed_submissions, month.subtasks, month.completed_subtasks),
            (2, 1, 3, 1)
        );
    }

    #[tokio::test]
    async fn test_charts_are_dense() {
        let db = seeded().await;
        let charts = compute_manager_stats(&db, "m1", now()).await.unwrap().charts;

        assert_eq!(charts.weekly_submissions.labels.len(), 8);
        assert_eq!(charts.weekly_submissions.labels.last().map(String::as_str), Some("W25"));
        assert_eq!(charts.weekly_submissions.counts, vec![0, 0, 0, 0, 0, 0, 0, 2]);

        assert_eq!(charts.monthly_submissions.labels.len(), 12);
        assert_eq!(charts.monthly_submissions.counts, vec![0, 2, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0]);
        assert_eq!(charts.quarterly_submissions.counts, vec![2, 2, 0, 0]);

        assert_eq!(
            charts.submission_status_distribution.labels,
            vec!["pending", "in_progress", "completed", "approved", "rejected"]
        );
        assert_eq!(charts.submission_status_distribution.counts, vec![1, 0, 1, 1, 1]);
        assert_eq!(charts.subtask_status_distribution.counts, vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn test_insights_and_recent_activity() {
        let db = seeded().await;
        let stats = compute_manager_stats(&db, "m1", now()).await.unwrap();

        let leads: Vec<(&str, f64)> = stats
            .insights
            .top_performing_team_leads
            .iter()
            .map(|l| (l.id.as_str(), l.completion_rate))
            .collect();
        assert_eq!(leads, vec![("tl1", 50.0), ("tl2", 0.0)]);
        assert_eq!(stats.insights.pending_approvals, 1);

        let finance = &stats.insights.departments[0];
        assert_eq!(finance.id, "d1");
        assert_eq!((finance.team_leads, finance.employees), (1, 1));
        assert_eq!((finance.submissions, finance.completed_submissions), (4, 1));
        assert_eq!(finance.completion_rate, 25.0);

        let recent: Vec<&str> = stats.recent.submissions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(recent, vec!["s2", "s1", "s4", "s3", "s5"]);
        assert_eq!(stats.recent.submissions[0].form_title.as_deref(), Some("Form f2"));
        assert_eq!(stats.recent.submissions[1].assigned_to.as_deref(), Some("Lead tl1"));

        let subtasks: Vec<(&str, u64)> = stats
            .recent
            .subtasks
            .iter()
            .map(|s| (s.id.as_str(), s.assignee_count))
            .collect();
        assert_eq!(subtasks, vec![("st2", 0), ("st1", 2), ("st3", 0)]);

        let pending: Vec<&str> = stats.recent.pending_approvals.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(pending, vec!["s1"]);
    }
}
