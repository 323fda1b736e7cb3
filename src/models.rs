use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamps are stored as fixed-width UTC ISO-8601 with milliseconds, so
/// they also sort correctly as strings.
pub fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now() -> String {
    iso(Utc::now())
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in-progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Pending and in-progress jobs still need work.
    pub fn is_open(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::InProgress)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "in-progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!(
                "unknown job status '{}' (pending, in-progress, completed, cancelled)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoType {
    Before,
    Progress,
    After,
    Issue,
    Solution,
}

impl PhotoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoType::Before => "before",
            PhotoType::Progress => "progress",
            PhotoType::After => "after",
            PhotoType::Issue => "issue",
            PhotoType::Solution => "solution",
        }
    }
}

impl FromStr for PhotoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(PhotoType::Before),
            "progress" => Ok(PhotoType::Progress),
            "after" => Ok(PhotoType::After),
            "issue" => Ok(PhotoType::Issue),
            "solution" => Ok(PhotoType::Solution),
            other => Err(format!("unknown photo type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationType {
    Phone,
    Email,
    Sms,
    Meeting,
    Other,
}

impl CommunicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationType::Phone => "phone",
            CommunicationType::Email => "email",
            CommunicationType::Sms => "sms",
            CommunicationType::Meeting => "meeting",
            CommunicationType::Other => "other",
        }
    }
}

impl FromStr for CommunicationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phone" => Ok(CommunicationType::Phone),
            "email" => Ok(CommunicationType::Email),
            "sms" => Ok(CommunicationType::Sms),
            "meeting" => Ok(CommunicationType::Meeting),
            "other" => Ok(CommunicationType::Other),
            other => Err(format!("unknown communication type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: JobStatus,
    pub client_name: String,
    /// Set by the synchronizer once the job is linked to a client record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(default)]
    pub address: String,
    pub estimated_hours: f64,
    pub hourly_rate: f64,
    pub total_cost: f64, // stored, not recomputed on read
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Job {
    pub fn new(
        title: &str,
        client_name: &str,
        address: &str,
        estimated_hours: f64,
        hourly_rate: f64,
    ) -> Self {
        let ts = now();
        Self {
            id: new_id(),
            title: title.to_string(),
            description: String::new(),
            status: JobStatus::Pending,
            client_name: client_name.to_string(),
            client_id: None,
            client_phone: None,
            client_email: None,
            address: address.to_string(),
            estimated_hours,
            hourly_rate,
            total_cost: estimated_hours * hourly_rate,
            created_at: ts.clone(),
            updated_at: ts,
            completed_at: None,
            scheduled_date: None,
            category: None,
            tags: None,
        }
    }

    pub fn expected_cost(&self) -> f64 {
        self.estimated_hours * self.hourly_rate
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: String,
    pub job_id: String,
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub duration: i64, // minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
}

impl TimeEntry {
    /// An entry that ended now and lasted `minutes`.
    pub fn finished(job_id: &str, minutes: i64, description: Option<String>) -> Self {
        let end = Utc::now();
        let start = end - chrono::Duration::minutes(minutes);
        Self {
            id: new_id(),
            job_id: job_id.to_string(),
            start_time: iso(start),
            end_time: Some(iso(end)),
            duration: minutes,
            description,
            created_at: iso(end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub job_id: String,
    #[serde(rename = "type")]
    pub kind: PhotoType,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
}

impl Photo {
    pub fn new(job_id: &str, kind: PhotoType, url: &str) -> Self {
        Self {
            id: new_id(),
            job_id: job_id.to_string(),
            kind,
            url: url.to_string(),
            description: None,
            created_at: now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub rating: u8, // 1-5
    // Aggregates below are maintained by the synchronizer.
    #[serde(default)]
    pub total_jobs: u32,
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub average_job_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_contact_reminder: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_contact_method: Option<CommunicationType>,
}

impl Client {
    pub fn new(name: &str) -> Self {
        let ts = now();
        Self {
            id: new_id(),
            name: name.to_string(),
            phone: None,
            email: None,
            address: None,
            notes: None,
            rating: 5,
            total_jobs: 0,
            total_revenue: 0.0,
            average_job_value: 0.0,
            last_contact_date: None,
            next_contact_reminder: None,
            created_at: ts.clone(),
            updated_at: ts,
            tags: Vec::new(),
            preferred_contact_method: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub id: String,
    pub client_id: String,
    #[serde(rename = "type")]
    pub kind: CommunicationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub is_completed: bool,
}

impl Communication {
    pub fn new(client_id: &str, kind: CommunicationType, content: &str) -> Self {
        Self {
            id: new_id(),
            client_id: client_id.to_string(),
            kind,
            subject: None,
            content: content.to_string(),
            scheduled_date: None,
            completed_date: None,
            created_at: now(),
            is_completed: false,
        }
    }

    pub fn complete(mut self) -> Self {
        self.is_completed = true;
        self.completed_date = Some(now());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: CommunicationType,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub category: String,
    pub created_at: String,
    pub updated_at: String,
}

impl MessageTemplate {
    pub fn new(name: &str, kind: CommunicationType, category: &str, content: &str) -> Self {
        let ts = now();
        Self {
            id: new_id(),
            name: name.to_string(),
            subject: None,
            content: content.to_string(),
            kind,
            variables: Vec::new(),
            category: category.to_string(),
            created_at: ts.clone(),
            updated_at: ts,
        }
    }
}
