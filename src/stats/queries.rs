//! Read-only SQL behind each snapshot section. Every function here depends
//! only on the resolved [`Scope`], never on another query's result.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params_from_iter, Connection};

use super::series::completion_rate;
use super::types::{
    DepartmentRollup, RecentSubmission, RecentSubtask, SubmissionBreakdown, TaskBreakdown,
    TeamLeadPerformance, Totals, WindowCounts,
};
use crate::date_util::parse_timestamp;

/// The ID sets every section query filters on.
#[derive(Debug, Clone)]
pub struct Scope {
    pub manager_id: String,
    pub department_ids: Vec<String>,
    pub team_lead_ids: Vec<String>,
}

/// Numbered placeholders `?first..?first+n-1`. An empty list renders `NULL`
/// so that `x IN (NULL)` matches nothing.
fn in_list(first: usize, n: usize) -> String {
    if n == 0 {
        return "NULL".to_string();
    }
    (first..first + n)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn count(conn: &Connection, sql: &str, binds: &[&str]) -> Result<u64, rusqlite::Error> {
    let n: i64 = conn.query_row(sql, params_from_iter(binds.iter()), |row| row.get(0))?;
    Ok(n as u64)
}

fn lead_binds(scope: &Scope) -> Vec<&str> {
    scope.team_lead_ids.iter().map(String::as_str).collect()
}

pub fn totals(conn: &Connection, scope: &Scope) -> Result<Totals, rusqlite::Error> {
    let manager = scope.manager_id.as_str();
    let dept_binds: Vec<&str> = scope.department_ids.iter().map(String::as_str).collect();

    let employees = count(
        conn,
        "SELECT COUNT(*) FROM employees WHERE manager_id = ?1",
        &[manager],
    )?;
    let forms = count(
        conn,
        &format!(
            "SELECT COUNT(*) FROM forms WHERE department_id IN ({})",
            in_list(1, dept_binds.len())
        ),
        &dept_binds,
    )?;
    let submissions = count(
        conn,
        "SELECT COUNT(*) FROM form_submissions WHERE submitted_by = ?1",
        &[manager],
    )?;
    let subtasks = count(
        conn,
        &format!(
            "SELECT COUNT(*) FROM subtasks WHERE team_lead_id IN ({})",
            in_list(1, scope.team_lead_ids.len())
        ),
        &lead_binds(scope),
    )?;
    let admin_tasks = count(
        conn,
        "SELECT COUNT(*) FROM admin_tasks WHERE assigned_to = ?1",
        &[manager],
    )?;

    Ok(Totals {
        team_leads: scope.team_lead_ids.len() as u64,
        employees,
        forms,
        submissions,
        subtasks,
        admin_tasks,
        departments: scope.department_ids.len() as u64,
    })
}

/// Created and completed work since `since` (stored timestamp format).
pub fn window_counts(
    conn: &Connection,
    scope: &Scope,
    since: &str,
) -> Result<WindowCounts, rusqlite::Error> {
    let manager = scope.manager_id.as_str();

    let submissions = count(
        conn,
        "SELECT COUNT(*) FROM form_submissions WHERE submitted_by = ?1 AND created_at >= ?2",
        &[manager, since],
    )?;
    let completed_submissions = count(
        conn,
        "SELECT COUNT(*) FROM form_submissions
         WHERE submitted_by = ?1 AND status = 'completed' AND completed_at >= ?2",
        &[manager, since],
    )?;

    let leads = in_list(2, scope.team_lead_ids.len());
    let mut binds = vec![since];
    binds.extend(lead_binds(scope));
    let subtasks = count(
        conn,
        &format!("SELECT COUNT(*) FROM subtasks WHERE created_at >= ?1 AND team_lead_id IN ({leads})"),
        &binds,
    )?;
    let completed_subtasks = count(
        conn,
        &format!(
            "SELECT COUNT(*) FROM subtasks
             WHERE status = 'completed' AND completed_at >= ?1 AND team_lead_id IN ({leads})"
        ),
        &binds,
    )?;

    Ok(WindowCounts {
        submissions,
        completed_submissions,
        subtasks,
        completed_subtasks,
    })
}

pub fn submission_breakdown(
    conn: &Connection,
    scope: &Scope,
) -> Result<SubmissionBreakdown, rusqlite::Error> {
    let (total, pending, in_progress, completed, approved, rejected) = conn.query_row(
        "SELECT
            COUNT(*),
            SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END),
            SUM(CASE WHEN status = 'in_progress' THEN 1 ELSE 0 END),
            SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END),
            SUM(CASE WHEN status = 'approved' THEN 1 ELSE 0 END),
            SUM(CASE WHEN status = 'rejected' THEN 1 ELSE 0 END)
         FROM form_submissions
         WHERE submitted_by = ?1",
        [&scope.manager_id],
        |row| {
            Ok((
                row.get::<_, i64>(0)? as u64,
                row.get::<_, Option<i64>>(1)?.unwrap_or(0) as u64,
                row.get::<_, Option<i64>>(2)?.unwrap_or(0) as u64,
                row.get::<_, Option<i64>>(3)?.unwrap_or(0) as u64,
                row.get::<_, Option<i64>>(4)?.unwrap_or(0) as u64,
                row.get::<_, Option<i64>>(5)?.unwrap_or(0) as u64,
            ))
        },
    )?;

    Ok(SubmissionBreakdown {
        total,
        pending,
        in_progress,
        completed,
        approved,
        rejected,
        completion_rate: completion_rate(completed, total),
    })
}

fn task_breakdown(
    conn: &Connection,
    sql: &str,
    binds: &[&str],
) -> Result<TaskBreakdown, rusqlite::Error> {
    let (total, pending, in_progress, completed) =
        conn.query_row(sql, params_from_iter(binds.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)? as u64,
                row.get::<_, Option<i64>>(1)?.unwrap_or(0) as u64,
                row.get::<_, Option<i64>>(2)?.unwrap_or(0) as u64,
                row.get::<_, Option<i64>>(3)?.unwrap_or(0) as u64,
            ))
        })?;
    Ok(TaskBreakdown {
        total,
        pending,
        in_progress,
        completed,
        completion_rate: completion_rate(completed, total),
    })
}

const TASK_STATUS_COLUMNS: &str = "COUNT(*),
    SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END),
    SUM(CASE WHEN status = 'in_progress' THEN 1 ELSE 0 END),
    SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END)";

pub fn subtask_breakdown(conn: &Connection, scope: &Scope) -> Result<TaskBreakdown, rusqlite::Error> {
    let sql = format!(
        "SELECT {TASK_STATUS_COLUMNS} FROM subtasks WHERE team_lead_id IN ({})",
        in_list(1, scope.team_lead_ids.len())
    );
    task_breakdown(conn, &sql, &lead_binds(scope))
}

pub fn admin_task_breakdown(
    conn: &Connection,
    scope: &Scope,
) -> Result<TaskBreakdown, rusqlite::Error> {
    let sql = format!("SELECT {TASK_STATUS_COLUMNS} FROM admin_tasks WHERE assigned_to = ?1");
    task_breakdown(conn, &sql, &[scope.manager_id.as_str()])
}

fn completion_spans(
    conn: &Connection,
    sql: &str,
    binds: &[&str],
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(binds.iter()), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut spans = Vec::new();
    for row in rows {
        let (created, completed) = row?;
        match (parse_timestamp(&created), parse_timestamp(&completed)) {
            (Some(c), Some(d)) => spans.push((c, d)),
            _ => log::debug!("Skipping unparseable completion span {created} -> {completed}"),
        }
    }
    Ok(spans)
}

/// Creation/completion pairs of completed submissions.
pub fn submission_spans(
    conn: &Connection,
    scope: &Scope,
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, rusqlite::Error> {
    completion_spans(
        conn,
        "SELECT created_at, completed_at FROM form_submissions
         WHERE submitted_by = ?1 AND status = 'completed' AND completed_at IS NOT NULL",
        &[scope.manager_id.as_str()],
    )
}

/// Creation/completion pairs of completed subtasks.
pub fn subtask_spans(
    conn: &Connection,
    scope: &Scope,
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, rusqlite::Error> {
    let sql = format!(
        "SELECT created_at, completed_at FROM subtasks
         WHERE status = 'completed' AND completed_at IS NOT NULL AND team_lead_id IN ({})",
        in_list(1, scope.team_lead_ids.len())
    );
    completion_spans(conn, &sql, &lead_binds(scope))
}

/// Submissions created in `year`, keyed by month number. Months without
/// activity are absent.
pub fn submissions_by_month(
    conn: &Connection,
    scope: &Scope,
    year: i32,
) -> Result<HashMap<u32, u64>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT CAST(substr(created_at, 6, 2) AS INTEGER) AS month, COUNT(*)
         FROM form_submissions
         WHERE submitted_by = ?1 AND substr(created_at, 1, 4) = ?2
         GROUP BY month",
    )?;
    let rows = stmt.query_map([scope.manager_id.clone(), format!("{year:04}")], |row| {
        Ok((row.get::<_, i64>(0)? as u32, row.get::<_, i64>(1)? as u64))
    })?;
    rows.collect()
}

/// Creation timestamps of submissions created at or after `since`.
pub fn submission_created_since(
    conn: &Connection,
    scope: &Scope,
    since: &str,
) -> Result<Vec<DateTime<Utc>>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT created_at FROM form_submissions WHERE submitted_by = ?1 AND created_at >= ?2",
    )?;
    let rows = stmt.query_map([scope.manager_id.as_str(), since], |row| row.get::<_, String>(0))?;
    let mut stamps = Vec::new();
    for row in rows {
        if let Some(ts) = parse_timestamp(&row?) {
            stamps.push(ts);
        }
    }
    Ok(stamps)
}

/// Subtask completion per team lead in scope, unranked.
pub fn team_lead_performance(
    conn: &Connection,
    scope: &Scope,
) -> Result<Vec<TeamLeadPerformance>, rusqlite::Error> {
    let sql = format!(
        "SELECT tl.team_lead_id, tl.name,
                COUNT(st.subtask_id),
                SUM(CASE WHEN st.status = 'completed' THEN 1 ELSE 0 END)
         FROM team_leads tl
         LEFT JOIN subtasks st ON st.team_lead_id = tl.team_lead_id
         WHERE tl.team_lead_id IN ({})
         GROUP BY tl.team_lead_id, tl.name",
        in_list(1, scope.team_lead_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(lead_binds(scope).iter()), |row| {
        let total = row.get::<_, i64>(2)? as u64;
        let completed = row.get::<_, Option<i64>>(3)?.unwrap_or(0) as u64;
        Ok(TeamLeadPerformance {
            id: row.get(0)?,
            name: row.get(1)?,
            total_subtasks: total,
            completed_subtasks: completed,
            completion_rate: completion_rate(completed, total),
        })
    })?;
    rows.collect()
}

/// Per-department headcount and submission completion for the manager's departments.
pub fn department_rollups(
    conn: &Connection,
    scope: &Scope,
) -> Result<Vec<DepartmentRollup>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT d.department_id, d.name,
            (SELECT COUNT(*) FROM team_leads t
              WHERE t.manager_id = ?1 AND t.department_id = d.department_id),
            (SELECT COUNT(*) FROM employees e
              WHERE e.manager_id = ?1 AND e.department_id = d.department_id),
            (SELECT COUNT(*) FROM form_submissions s JOIN forms f ON f.form_id = s.form_id
              WHERE s.submitted_by = ?1 AND f.department_id = d.department_id),
            (SELECT COUNT(*) FROM form_submissions s JOIN forms f ON f.form_id = s.form_id
              WHERE s.submitted_by = ?1 AND f.department_id = d.department_id
                AND s.status = 'completed')
         FROM bridge_manager_departments b
         JOIN departments d ON d.department_id = b.department_id
         WHERE b.manager_id = ?1
         ORDER BY d.name, d.department_id",
    )?;
    let rows = stmt.query_map([&scope.manager_id], |row| {
        let submissions = row.get::<_, i64>(4)? as u64;
        let completed = row.get::<_, i64>(5)? as u64;
        Ok(DepartmentRollup {
            id: row.get(0)?,
            name: row.get(1)?,
            team_leads: row.get::<_, i64>(2)? as u64,
            employees: row.get::<_, i64>(3)? as u64,
            submissions,
            completed_submissions: completed,
            completion_rate: completion_rate(completed, submissions),
        })
    })?;
    rows.collect()
}

const PENDING_APPROVAL: &str = "s.status = 'completed' AND s.admin_status = 'pending'";

/// Completed submissions still awaiting admin review.
pub fn pending_approval_count(conn: &Connection, scope: &Scope) -> Result<u64, rusqlite::Error> {
    count(
        conn,
        &format!("SELECT COUNT(*) FROM form_submissions s WHERE s.submitted_by = ?1 AND {PENDING_APPROVAL}"),
        &[scope.manager_id.as_str()],
    )
}

/// Newest submissions first. With `pending_only`, only those awaiting approval.
pub fn recent_submissions(
    conn: &Connection,
    scope: &Scope,
    pending_only: bool,
    limit: u32,
) -> Result<Vec<RecentSubmission>, rusqlite::Error> {
    let extra = if pending_only {
        format!(" AND {PENDING_APPROVAL}")
    } else {
        String::new()
    };
    let sql = format!(
        "SELECT s.submission_id, f.title, s.status, s.admin_status, tl.name,
                s.created_at, s.completed_at
         FROM form_submissions s
         LEFT JOIN forms f ON f.form_id = s.form_id
         LEFT JOIN team_leads tl ON tl.team_lead_id = s.assigned_to
         WHERE s.submitted_by = ?1{extra}
         ORDER BY s.created_at DESC, s.submission_id DESC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params![scope.manager_id, limit], |row| {
        Ok(RecentSubmission {
            id: row.get(0)?,
            form_title: row.get(1)?,
            status: row.get(2)?,
            admin_status: row.get(3)?,
            assigned_to: row.get(4)?,
            created_at: row.get(5)?,
            completed_at: row.get(6)?,
        })
    })?;
    rows.collect()
}

pub fn recent_subtasks(
    conn: &Connection,
    scope: &Scope,
    limit: u32,
) -> Result<Vec<RecentSubtask>, rusqlite::Error> {
    let sql = format!(
        "SELECT st.subtask_id, st.title, st.status, tl.name,
                (SELECT COUNT(*) FROM bridge_subtask_employees b WHERE b.subtask_id = st.subtask_id),
                st.created_at, st.completed_at
         FROM subtasks st
         LEFT JOIN team_leads tl ON tl.team_lead_id = st.team_lead_id
         WHERE st.team_lead_id IN ({})
         ORDER BY st.created_at DESC, st.subtask_id DESC
         LIMIT {limit}",
        in_list(1, scope.team_lead_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(lead_binds(scope).iter()), |row| {
        Ok(RecentSubtask {
            id: row.get(0)?,
            title: row.get(1)?,
            status: row.get(2)?,
            team_lead: row.get(3)?,
            assignee_count: row.get::<_, i64>(4)? as u64,
            created_at: row.get(5)?,
            completed_at: row.get(6)?,
        })
    })?;
    rows.collect()
}
