/// Project analysis through an external summarizer
///
/// The core builds a [`ProjectSnapshot`] of a project (members, tasks,
/// effort and lateness) and hands it to a [`Summarizer`]. The summarizer is
/// opaque: it may be an LLM gateway or anything else that answers with a
/// [`ProjectAnalysis`].
///
/// Analysis is read-only. Any summarizer failure, including an answer that
/// fails validation, surfaces as `ExternalService` and leaves the store
/// untouched.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use trellis_shared::services::analysis::{AnalysisService, HttpSummarizer};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, caller: Uuid, project_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let summarizer = HttpSummarizer::new("http://summarizer.internal/v1/analyze", None, Duration::from_secs(30))?;
/// let service = AnalysisService::new(pool, Some(Arc::new(summarizer)));
///
/// let analysis = service.analyze(caller, project_id).await?;
/// println!("risk {}", analysis.risk_score);
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::projects::find_project;
use crate::auth::authorization::require_member;
use crate::error::{CoreError, CoreResult};
use crate::models::membership::{MemberDetail, Membership, ProjectRole};
use crate::models::project::Project;
use crate::models::task::{Task, TaskPriority, TaskStatus};

/// Summarizer error types
#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    /// No summarizer endpoint configured
    #[error("Project analysis is not configured")]
    NotConfigured,

    /// Request could not be sent or timed out
    #[error("Summarizer request failed: {0}")]
    Transport(String),

    /// Summarizer answered with a non-success status
    #[error("Summarizer returned status {0}")]
    Status(u16),

    /// Body was not a valid analysis
    #[error("Summarizer returned an invalid analysis: {0}")]
    InvalidResponse(String),
}

/// A project member as seen by the summarizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberSnapshot {
    pub name: String,
    pub role: ProjectRole,
}

/// A task as seen by the summarizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSnapshot {
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category: Option<String>,
    pub story_points: i32,
    /// `None` when unassigned
    pub assignee: Option<String>,
    pub is_overdue: bool,
    pub days_overdue: i64,
    pub due_date: Option<DateTime<Utc>>,
}

/// Everything the summarizer gets to see about a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSnapshot {
    pub project_name: String,
    /// `YYYY-MM-DD`
    pub analysis_date: String,
    pub total_story_points: i64,
    pub completed_story_points: i64,
    pub members: Vec<MemberSnapshot>,
    pub tasks: Vec<TaskSnapshot>,
}

fn member_name(member: &MemberDetail) -> String {
    match (&member.first_name, &member.last_name) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        (Some(first), None) => first.clone(),
        (None, Some(last)) => last.clone(),
        (None, None) => member.email.clone(),
    }
}

impl ProjectSnapshot {
    /// Builds a snapshot as of `now`
    ///
    /// Assignees who are no longer members show up as unassigned.
    pub fn build(
        project: &Project,
        members: &[MemberDetail],
        tasks: &[Task],
        now: DateTime<Utc>,
    ) -> Self {
        let names: HashMap<Uuid, String> = members
            .iter()
            .map(|m| (m.user_id, member_name(m)))
            .collect();

        let mut total_story_points = 0i64;
        let mut completed_story_points = 0i64;

        let tasks = tasks
            .iter()
            .map(|task| {
                total_story_points += i64::from(task.story_points);
                if task.status.is_done() {
                    completed_story_points += i64::from(task.story_points);
                }

                TaskSnapshot {
                    title: task.title.clone(),
                    status: task.status,
                    priority: task.priority,
                    category: task.category.clone(),
                    story_points: task.story_points,
                    assignee: task.assignee_id.and_then(|id| names.get(&id).cloned()),
                    is_overdue: task.is_overdue(now),
                    days_overdue: task.days_overdue(now),
                    due_date: task.due_date,
                }
            })
            .collect();

        Self {
            project_name: project.name.clone(),
            analysis_date: now.format("%Y-%m-%d").to_string(),
            total_story_points,
            completed_story_points,
            members: members
                .iter()
                .map(|m| MemberSnapshot {
                    name: member_name(m),
                    role: m.role,
                })
                .collect(),
            tasks,
        }
    }
}

/// Overall mood of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Summarizer verdict on a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectAnalysis {
    pub summary: String,

    /// Most important first
    pub recommendations: Vec<String>,

    /// 0 = no risk, 100 = certain trouble
    pub risk_score: u8,

    /// 0 = stalled, 100 = excellent
    pub performance_score: u8,

    pub sentiment: Sentiment,
}

impl ProjectAnalysis {
    /// Checks score ranges
    pub fn validate(&self) -> Result<(), SummarizerError> {
        if self.risk_score > 100 {
            return Err(SummarizerError::InvalidResponse(format!(
                "risk_score {} is out of range 0-100",
                self.risk_score
            )));
        }

        if self.performance_score > 100 {
            return Err(SummarizerError::InvalidResponse(format!(
                "performance_score {} is out of range 0-100",
                self.performance_score
            )));
        }

        Ok(())
    }
}

/// Turns a project snapshot into an analysis
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Human-readable name, used in logs
    fn name(&self) -> &str;

    async fn summarize(
        &self,
        snapshot: &ProjectSnapshot,
    ) -> Result<ProjectAnalysis, SummarizerError>;
}

/// Runs a summarizer and validates its answer
pub async fn summarize_validated(
    summarizer: &dyn Summarizer,
    snapshot: &ProjectSnapshot,
) -> Result<ProjectAnalysis, SummarizerError> {
    let analysis = summarizer.summarize(snapshot).await?;
    analysis.validate()?;
    Ok(analysis)
}

/// Summarizer reached over HTTP
///
/// POSTs the snapshot as JSON and expects a [`ProjectAnalysis`] JSON body.
/// An API key, when configured, is sent as a bearer token.
pub struct HttpSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpSummarizer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SummarizerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SummarizerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    fn name(&self) -> &str {
        "http"
    }

    async fn summarize(
        &self,
        snapshot: &ProjectSnapshot,
    ) -> Result<ProjectAnalysis, SummarizerError> {
        let mut request = self.client.post(&self.endpoint).json(snapshot);

        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SummarizerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummarizerError::Status(status.as_u16()));
        }

        response
            .json::<ProjectAnalysis>()
            .await
            .map_err(|e| SummarizerError::InvalidResponse(e.to_string()))
    }
}

/// Builds snapshots and asks the summarizer about them
#[derive(Clone)]
pub struct AnalysisService {
    pool: PgPool,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl AnalysisService {
    pub fn new(pool: PgPool, summarizer: Option<Arc<dyn Summarizer>>) -> Self {
        Self { pool, summarizer }
    }

    /// Snapshot of a project the caller belongs to
    pub async fn snapshot(&self, caller_id: Uuid, project_id: Uuid) -> CoreResult<ProjectSnapshot> {
        let mut tx = self.pool.begin().await?;

        let project = find_project(&mut *tx, project_id).await?;
        require_member(&mut *tx, project_id, caller_id).await?;

        let members = Membership::list_by_project(&mut *tx, project_id).await?;
        let tasks = Task::list_by_project(&mut *tx, project_id).await?;

        tx.commit().await?;

        Ok(ProjectSnapshot::build(&project, &members, &tasks, Utc::now()))
    }

    /// Analyzes a project the caller belongs to
    ///
    /// # Errors
    ///
    /// `ExternalService` when no summarizer is configured or it fails.
    pub async fn analyze(&self, caller_id: Uuid, project_id: Uuid) -> CoreResult<ProjectAnalysis> {
        let snapshot = self.snapshot(caller_id, project_id).await?;

        let summarizer = self
            .summarizer
            .as_ref()
            .ok_or(SummarizerError::NotConfigured)?;

        summarize_validated(summarizer.as_ref(), &snapshot)
            .await
            .map_err(|e| {
                tracing::warn!(
                    project_id = %project_id,
                    summarizer = summarizer.name(),
                    error = %e,
                    "Project analysis failed"
                );
                CoreError::from(e)
            })
    }
}
