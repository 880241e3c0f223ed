//! Records read by the statistics pipeline, and the status vocabularies they
//! carry. Status columns are stored as their snake_case string form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::InvalidValue {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

status_enum!(
    /// Lifecycle of a form submission handled by a team lead.
    SubmissionStatus, "submission status" {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Approved => "approved",
        Rejected => "rejected",
    }
);

status_enum!(
    /// Admin review outcome of a completed submission.
    AdminStatus, "admin status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

status_enum!(
    SubtaskStatus, "subtask status" {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
    }
);

status_enum!(
    AdminTaskStatus, "admin task status" {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
    }
);

status_enum!(
    Role, "role" {
        Admin => "admin",
        Manager => "manager",
        TeamLead => "team_lead",
        Employee => "employee",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manager {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamLead {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub manager_id: String,
    pub department_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub manager_id: String,
    pub department_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    pub title: String,
    pub department_id: String,
    #[serde(default)]
    pub created_by: Option<String>,
    /// Field schema as built by the form designer; stored opaquely.
    #[serde(default)]
    pub fields: serde_json::Value,
    pub created_at: String,
}

/// Status fields are kept as raw strings so legacy values survive a
/// round trip through the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub id: String,
    pub form_id: String,
    pub submitted_by: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    pub status: String,
    #[serde(default)]
    pub admin_status: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub submission_id: Option<String>,
    pub team_lead_id: String,
    #[serde(default)]
    pub assigned_employees: Vec<String>,
    pub status: String,
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminTask {
    pub id: String,
    pub title: String,
    pub assigned_to: String,
    pub status: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!(
            "in_progress".parse::<SubmissionStatus>().unwrap(),
            SubmissionStatus::InProgress
        );
        assert_eq!(SubmissionStatus::Approved.to_string(), "approved");
        assert_eq!("team_lead".parse::<Role>().unwrap(), Role::TeamLead);
        assert_eq!(SubmissionStatus::ALL.len(), 5);
        assert_eq!(SubtaskStatus::ALL.len(), 3);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "archived".parse::<SubmissionStatus>().unwrap_err();
        assert!(err.to_string().contains("archived"));
        assert!("Manager".parse::<Role>().is_err());
    }

    #[test]
    fn test_submission_deserializes_camel_case() {
        let json = r#"{
            "id": "s1",
            "formId": "f1",
            "submittedBy": "m1",
            "assignedTo": "tl1",
            "status": "completed",
            "adminStatus": "pending",
            "createdAt": "2025-01-01T08:00:00Z",
            "completedAt": "2025-01-01T10:00:00Z"
        }"#;
        let s: FormSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(s.form_id, "f1");
        assert_eq!(s.assigned_to.as_deref(), Some("tl1"));
        assert_eq!(s.completed_at.as_deref(), Some("2025-01-01T10:00:00Z"));
    }
}
