use rusqlite::{params, Connection, OptionalExtension};

use crate::model::{
    AdminTask, Department, Employee, Form, FormSubmission, Manager, Role, Subtask, TeamLead,
};

// ── Departments & managers ─────────────────────────────────────────

pub fn upsert_department(conn: &Connection, dept: &Department) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO departments (department_id, name, cached_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(department_id) DO UPDATE SET
            name=excluded.name, cached_at=excluded.cached_at",
        params![dept.id, dept.name],
    )?;
    Ok(())
}

/// Upsert a manager and replace its department memberships.
pub fn upsert_manager(conn: &Connection, manager: &Manager) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO managers (manager_id, name, email, cached_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(manager_id) DO UPDATE SET
            name=excluded.name, email=excluded.email, cached_at=excluded.cached_at",
        params![manager.id, manager.name, manager.email],
    )?;

    conn.execute(
        "DELETE FROM bridge_manager_departments WHERE manager_id = ?1",
        params![manager.id],
    )?;
    for dept_id in &manager.department_ids {
        conn.execute(
            "INSERT OR IGNORE INTO bridge_manager_departments (manager_id, department_id)
             VALUES (?1, ?2)",
            params![manager.id, dept_id],
        )?;
    }
    Ok(())
}

/// Profile fields of a manager as shown on the dashboard.
#[derive(Debug, Clone)]
pub struct ManagerRow {
    pub id: String,
    pub name: String,
    pub email: String,
}

pub fn get_manager(conn: &Connection, manager_id: &str) -> Result<Option<ManagerRow>, rusqlite::Error> {
    conn.query_row(
        "SELECT manager_id, name, email FROM managers WHERE manager_id = ?1",
        params![manager_id],
        |row| {
            Ok(ManagerRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Departments referenced by a manager, ordered by name.
pub fn list_manager_departments(
    conn: &Connection,
    manager_id: &str,
) -> Result<Vec<Department>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT d.department_id, d.name
         FROM bridge_manager_departments b
         JOIN departments d ON d.department_id = b.department_id
         WHERE b.manager_id = ?1
         ORDER BY d.name, d.department_id",
    )?;
    let rows = stmt.query_map(params![manager_id], |row| {
        Ok(Department {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect()
}

/// IDs of the team leads reporting to `manager_id` inside any of `department_ids`.
pub fn list_team_lead_ids(
    conn: &Connection,
    manager_id: &str,
    department_ids: &[String],
) -> Result<Vec<String>, rusqlite::Error> {
    if department_ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = (0..department_ids.len())
        .map(|i| format!("?{}", i + 2))
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "SELECT team_lead_id FROM team_leads
         WHERE manager_id = ?1 AND department_id IN ({placeholders})
         ORDER BY team_lead_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    stmt.raw_bind_parameter(1, manager_id)?;
    for (i, dept_id) in department_ids.iter().enumerate() {
        stmt.raw_bind_parameter(i + 2, dept_id)?;
    }
    let mut ids = Vec::new();
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

// ── People ─────────────────────────────────────────────────────────

pub fn upsert_team_lead(conn: &Connection, lead: &TeamLead) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO team_leads (team_lead_id, name, email, manager_id, department_id, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
         ON CONFLICT(team_lead_id) DO UPDATE SET
            name=excluded.name, email=COALESCE(excluded.email, team_leads.email),
            manager_id=excluded.manager_id, department_id=excluded.department_id,
            cached_at=excluded.cached_at",
        params![
            lead.id,
            lead.name,
            lead.email,
            lead.manager_id,
            lead.department_id
        ],
    )?;
    Ok(())
}

pub fn upsert_employee(conn: &Connection, employee: &Employee) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO employees (employee_id, name, email, manager_id, department_id, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
         ON CONFLICT(employee_id) DO UPDATE SET
            name=excluded.name, email=COALESCE(excluded.email, employees.email),
            manager_id=excluded.manager_id, department_id=excluded.department_id,
            cached_at=excluded.cached_at",
        params![
            employee.id,
            employee.name,
            employee.email,
            employee.manager_id,
            employee.department_id
        ],
    )?;
    Ok(())
}

// ── Forms & work items ─────────────────────────────────────────────

pub fn upsert_form(conn: &Connection, form: &Form) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO forms (form_id, title, department_id, created_by, fields_json, created_at, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
         ON CONFLICT(form_id) DO UPDATE SET
            title=excluded.title, department_id=excluded.department_id,
            created_by=excluded.created_by, fields_json=excluded.fields_json,
            created_at=excluded.created_at, cached_at=excluded.cached_at",
        params![
            form.id,
            form.title,
            form.department_id,
            form.created_by,
            form.fields.to_string(),
            form.created_at
        ],
    )?;
    Ok(())
}

pub fn upsert_submission(
    conn: &Connection,
    submission: &FormSubmission,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO form_submissions (
            submission_id, form_id, submitted_by, assigned_to, status, admin_status,
            created_at, completed_at, cached_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime('now'))
        ON CONFLICT(submission_id) DO UPDATE SET
            form_id=excluded.form_id, submitted_by=excluded.submitted_by,
            assigned_to=excluded.assigned_to, status=excluded.status,
            admin_status=excluded.admin_status, created_at=excluded.created_at,
            completed_at=excluded.completed_at, cached_at=excluded.cached_at",
        params![
            submission.id,
            submission.form_id,
            submission.submitted_by,
            submission.assigned_to,
            submission.status,
            submission.admin_status,
            submission.created_at,
            submission.completed_at,
        ],
    )?;
    Ok(())
}

/// Upsert a subtask and replace its employee assignments.
pub fn upsert_subtask(conn: &Connection, subtask: &Subtask) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO subtasks (
            subtask_id, title, submission_id, team_lead_id, status,
            created_at, completed_at, cached_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'))
        ON CONFLICT(subtask_id) DO UPDATE SET
            title=excluded.title, submission_id=excluded.submission_id,
            team_lead_id=excluded.team_lead_id, status=excluded.status,
            created_at=excluded.created_at, completed_at=excluded.completed_at,
            cached_at=excluded.cached_at",
        params![
            subtask.id,
            subtask.title,
            subtask.submission_id,
            subtask.team_lead_id,
            subtask.status,
            subtask.created_at,
            subtask.completed_at,
        ],
    )?;

    conn.execute(
        "DELETE FROM bridge_subtask_employees WHERE subtask_id = ?1",
        params![subtask.id],
    )?;
    for employee_id in &subtask.assigned_employees {
        conn.execute(
            "INSERT OR IGNORE INTO bridge_subtask_employees (subtask_id, employee_id)
             VALUES (?1, ?2)",
            params![subtask.id, employee_id],
        )?;
    }
    Ok(())
}

pub fn upsert_admin_task(conn: &Connection, task: &AdminTask) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO admin_tasks (admin_task_id, title, assigned_to, status, created_at, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
         ON CONFLICT(admin_task_id) DO UPDATE SET
            title=excluded.title, assigned_to=excluded.assigned_to, status=excluded.status,
            created_at=excluded.created_at, cached_at=excluded.cached_at",
        params![
            task.id,
            task.title,
            task.assigned_to,
            task.status,
            task.created_at
        ],
    )?;
    Ok(())
}

// ── Sessions ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub token: String,
    pub user_id: String,
    /// Raw role text; callers decide how to treat unknown roles.
    pub role: String,
    pub created_at: String,
    pub expires_at: String,
}

pub fn insert_session(conn: &Connection, session: &SessionRow) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO sessions (token, user_id, role, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            session.token,
            session.user_id,
            session.role,
            session.created_at,
            session.expires_at
        ],
    )?;
    Ok(())
}

/// Look up a session that has not expired as of `now` (stored timestamp format).
pub fn find_active_session(
    conn: &Connection,
    token: &str,
    now: &str,
) -> Result<Option<SessionRow>, rusqlite::Error> {
    conn.query_row(
        "SELECT token, user_id, role, created_at, expires_at
         FROM sessions WHERE token = ?1 AND expires_at > ?2",
        params![token, now],
        |row| {
            Ok(SessionRow {
                token: row.get(0)?,
                user_id: row.get(1)?,
                role: row.get(2)?,
                created_at: row.get(3)?,
                expires_at: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn delete_session(conn: &Connection, token: &str) -> Result<bool, rusqlite::Error> {
    let count = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(count > 0)
}

pub fn purge_expired_sessions(conn: &Connection, now: &str) -> Result<usize, rusqlite::Error> {
    conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])
}

/// Whether `user_id` exists in the collection backing `role`.
pub fn user_exists(conn: &Connection, user_id: &str, role: Role) -> Result<bool, rusqlite::Error> {
    let sql = match role {
        Role::Manager => "SELECT COUNT(*) FROM managers WHERE manager_id = ?1",
        Role::TeamLead => "SELECT COUNT(*) FROM team_leads WHERE team_lead_id = ?1",
        Role::Employee => "SELECT COUNT(*) FROM employees WHERE employee_id = ?1",
        // Admin accounts live with the external auth provider.
        Role::Admin => return Ok(true),
    };
    let count: i64 = conn.query_row(sql, params![user_id], |row| row.get(0))?;
    Ok(count > 0)
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// ── Status ─────────────────────────────────────────────────────────

/// Row counts per record collection, in display order.
pub fn collection_counts(conn: &Connection) -> Result<Vec<(&'static str, i64)>, rusqlite::Error> {
    const TABLES: &[(&str, &str)] = &[
        ("Departments", "departments"),
        ("Managers", "managers"),
        ("Team leads", "team_leads"),
        ("Employees", "employees"),
        ("Forms", "forms"),
        ("Submissions", "form_submissions"),
        ("Subtasks", "subtasks"),
        ("Admin tasks", "admin_tasks"),
        ("Sessions", "sessions"),
    ];
    let mut counts = Vec::with_capacity(TABLES.len());
    for (label, table) in TABLES {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        counts.push((*label, n));
    }
    Ok(counts)
}
