//! Bulk load of record collections from a JSON document.
//!
//! The document mirrors the application's collections:
//!
//! ```json
//! {
//!   "departments": [{"id": "d1", "name": "Finance"}],
//!   "managers": [{"id": "m1", "name": "Mia", "email": "mia@example.com", "departmentIds": ["d1"]}],
//!   "teamLeads": [], "employees": [], "forms": [],
//!   "submissions": [], "subtasks": [], "adminTasks": []
//! }
//! ```
//!
//! Every collection is optional. Records are upserted by ID inside one
//! transaction, so a failed import leaves the store unchanged.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::date_util::normalize_timestamp;
use crate::error::{Error, Result};
use crate::model::{
    AdminStatus, AdminTask, AdminTaskStatus, Department, Employee, Form, FormSubmission, Manager,
    Subtask, SubtaskStatus, SubmissionStatus, TeamLead,
};
use crate::storage::{repository, Database};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportDocument {
    pub departments: Vec<Department>,
    pub managers: Vec<Manager>,
    pub team_leads: Vec<TeamLead>,
    pub employees: Vec<Employee>,
    pub forms: Vec<Form>,
    pub submissions: Vec<FormSubmission>,
    pub subtasks: Vec<Subtask>,
    pub admin_tasks: Vec<AdminTask>,
}

/// Number of records written per collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub departments: usize,
    pub managers: usize,
    pub team_leads: usize,
    pub employees: usize,
    pub forms: usize,
    pub submissions: usize,
    pub subtasks: usize,
    pub admin_tasks: usize,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.departments
            + self.managers
            + self.team_leads
            + self.employees
            + self.forms
            + self.submissions
            + self.subtasks
            + self.admin_tasks
    }
}

pub fn parse_document(json: &str) -> Result<ImportDocument> {
    Ok(serde_json::from_str(json)?)
}

pub async fn import_file(db: &Database, path: impl AsRef<Path>) -> Result<ImportReport> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| Error::Import(format!("{}: {e}", path.display())))?;
    import_document(db, parse_document(&json)?).await
}

/// Normalize timestamps and write every record of `doc`.
pub async fn import_document(db: &Database, mut doc: ImportDocument) -> Result<ImportReport> {
    normalize(&mut doc)?;

    let report = db
        .writer()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut report = ImportReport::default();

            for d in &doc.departments {
                repository::upsert_department(&tx, d)?;
                report.departments += 1;
            }
            for m in &doc.managers {
                repository::upsert_manager(&tx, m)?;
                report.managers += 1;
            }
            for t in &doc.team_leads {
                repository::upsert_team_lead(&tx, t)?;
                report.team_leads += 1;
            }
            for e in &doc.employees {
                repository::upsert_employee(&tx, e)?;
                report.employees += 1;
            }
            for f in &doc.forms {
                repository::upsert_form(&tx, f)?;
                report.forms += 1;
            }
            for s in &doc.submissions {
                repository::upsert_submission(&tx, s)?;
                report.submissions += 1;
            }
            for s in &doc.subtasks {
                repository::upsert_subtask(&tx, s)?;
                report.subtasks += 1;
            }
            for a in &doc.admin_tasks {
                repository::upsert_admin_task(&tx, a)?;
                report.admin_tasks += 1;
            }

            tx.commit()?;
            Ok::<_, rusqlite::Error>(report)
        })
        .await
        .map_err(|e| Error::Import(e.to_string()))?;

    log::info!("Imported {} records", report.total());
    Ok(report)
}

fn timestamp(kind: &str, id: &str, value: &str) -> Result<String> {
    normalize_timestamp(value)
        .ok_or_else(|| Error::Import(format!("{kind} {id}: invalid timestamp '{value}'")))
}

fn optional_timestamp(kind: &str, id: &str, value: Option<&str>) -> Result<Option<String>> {
    value.map(|v| timestamp(kind, id, v)).transpose()
}

fn warn_unknown_status<T: std::str::FromStr>(kind: &str, id: &str, status: &str) {
    if status.parse::<T>().is_err() {
        log::warn!("{kind} {id} has unrecognized status '{status}'");
    }
}

fn normalize(doc: &mut ImportDocument) -> Result<()> {
    for f in &mut doc.forms {
        f.created_at = timestamp("form", &f.id, &f.created_at)?;
    }
    for s in &mut doc.submissions {
        s.created_at = timestamp("submission", &s.id, &s.created_at)?;
        s.completed_at = optional_timestamp("submission", &s.id, s.completed_at.as_deref())?;
        warn_unknown_status::<SubmissionStatus>("submission", &s.id, &s.status);
        if let Some(admin) = &s.admin_status {
            warn_unknown_status::<AdminStatus>("submission", &s.id, admin);
        }
    }
    for s in &mut doc.subtasks {
        s.created_at = timestamp("subtask", &s.id, &s.created_at)?;
        s.completed_at = optional_timestamp("subtask", &s.id, s.completed_at.as_deref())?;
        warn_unknown_status::<SubtaskStatus>("subtask", &s.id, &s.status);
    }
    for a in &mut doc.admin_tasks {
        a.created_at = timestamp("admin task", &a.id, &a.created_at)?;
        warn_unknown_status::<AdminTaskStatus>("admin task", &a.id, &a.status);
    }
    Ok(())
}
