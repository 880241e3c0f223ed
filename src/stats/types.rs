use serde::Serialize;

use crate::model::Department;

/// Dashboard snapshot for one manager.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerStats {
    pub manager: ManagerProfile,
    pub totals: Totals,
    pub today: WindowCounts,
    pub this_week: WindowCounts,
    pub this_month: WindowCounts,
    pub breakdown: Breakdown,
    pub performance: Performance,
    pub charts: Charts,
    pub insights: Insights,
    pub recent: Recent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub departments: Vec<Department>,
}

/// Flat record counts within the manager's scope.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub team_leads: u64,
    pub employees: u64,
    pub forms: u64,
    pub submissions: u64,
    pub subtasks: u64,
    pub admin_tasks: u64,
    pub departments: u64,
}

/// Activity since the start of a time window.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowCounts {
    pub submissions: u64,
    pub completed_submissions: u64,
    pub subtasks: u64,
    pub completed_subtasks: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub submissions: SubmissionBreakdown,
    pub subtasks: TaskBreakdown,
    pub admin_tasks: TaskBreakdown,
}

/// Status partition of submissions. Statuses outside the five buckets are
/// counted in `total` only.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionBreakdown {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub approved: u64,
    pub rejected: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBreakdown {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub completion_rate: f64,
}

/// Durations are in hours, everything else is a percentage.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub avg_submission_completion_time: f64,
    pub avg_subtask_completion_time: f64,
    pub submission_efficiency: f64,
    pub subtask_efficiency: f64,
    pub overall_efficiency: f64,
    pub approval_rate: f64,
}

/// One chart series; `labels` and `counts` always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Charts {
    pub weekly_submissions: ChartSeries,
    pub monthly_submissions: ChartSeries,
    pub quarterly_submissions: ChartSeries,
    pub submission_status_distribution: ChartSeries,
    pub subtask_status_distribution: ChartSeries,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamLeadPerformance {
    pub id: String,
    pub name: String,
    pub total_subtasks: u64,
    pub completed_subtasks: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRollup {
    pub id: String,
    pub name: String,
    pub team_leads: u64,
    pub employees: u64,
    pub submissions: u64,
    pub completed_submissions: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub top_performing_team_leads: Vec<TeamLeadPerformance>,
    pub departments: Vec<DepartmentRollup>,
    pub pending_approvals: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSubmission {
    pub id: String,
    pub form_title: Option<String>,
    pub status: String,
    pub admin_status: Option<String>,
    /// Name of the team lead the submission is assigned to.
    pub assigned_to: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSubtask {
    pub id: String,
    pub title: String,
    pub status: String,
    pub team_lead: Option<String>,
    pub assignee_count: u64,
    pub created_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recent {
    pub submissions: Vec<RecentSubmission>,
    pub subtasks: Vec<RecentSubtask>,
    pub pending_approvals: Vec<RecentSubmission>,
}
