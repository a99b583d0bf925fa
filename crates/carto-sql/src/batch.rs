//! Asynchronous batch jobs.
//!
//! A job is submitted once and then polled at a fixed interval until it
//! leaves the `pending`/`running` states.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Server-side state of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
    Canceled,
    /// Any status this client does not know.
    Unknown,
}

impl JobStatus {
    /// Whether the job may still change state.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

impl From<&str> for JobStatus {
    fn from(status: &str) -> Self {
        match status {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "done" => Self::Done,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Unknown,
        }
    }
}

/// A job that finished with `done`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub job_id: String,
    /// Number of status requests made.
    pub polls: u32,
    /// The final status document.
    pub response: Value,
}

#[derive(Debug, Serialize)]
struct JobRequest<'a> {
    query: JobQueries<'a>,
}

#[derive(Debug, Serialize)]
struct JobQueries<'a> {
    query: Vec<JobQuery<'a>>,
}

#[derive(Debug, Serialize)]
struct JobQuery<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    onsuccess: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    onerror: Option<&'a str>,
}

fn job_request(sql: &str, on_success: Option<&str>, on_error: Option<&str>) -> Result<Value> {
    let request = JobRequest {
        query: JobQueries {
            query: vec![JobQuery {
                query: sql,
                onsuccess: on_success,
                onerror: on_error,
            }],
        },
    };
    serde_json::to_value(&request).map_err(|e| Error::Decode(e.to_string()))
}

/// Picks the most specific failure message from a status document.
pub(crate) fn failure_reason(status: &str, response: &Value) -> String {
    response
        .pointer("/query/query/0/failed_reason")
        .and_then(Value::as_str)
        .or_else(|| response.get("failed_reason").and_then(Value::as_str))
        .map_or_else(
            || format!("query failed with status \"{status}\""),
            String::from,
        )
}

/// Submits `sql` as a batch job and polls it to completion.
///
/// # Errors
///
/// [`Error::JobFailed`] if the job ends in any state but `done`;
/// [`Error::Remote`] or [`Error::Decode`] if submission or a poll fails.
pub async fn run_job(
    transport: &Transport,
    sql: &str,
    on_success: Option<&str>,
    on_error: Option<&str>,
) -> Result<JobSummary> {
    let config = transport.config();
    let submitted = transport
        .post_json(&config.job_url(), &job_request(sql, on_success, on_error)?)
        .await?;
    let job_id = submitted
        .get("job_id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Decode(format!("job submission returned no job_id: {submitted}")))?
        .to_string();
    debug!(%job_id, "job submitted");

    let url = config.job_status_url(&job_id);
    let mut polls = 0;
    loop {
        tokio::time::sleep(config.poll_interval).await;
        polls += 1;
        let response = transport.get_json(&url).await?;
        let status = response
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default();
        debug!(%job_id, status, polls, "job polled");

        match JobStatus::from(status) {
            s if s.is_in_progress() => {}
            JobStatus::Done => {
                info!(%job_id, polls, "job done");
                return Ok(JobSummary {
                    job_id,
                    polls,
                    response,
                });
            }
            _ => return Err(Error::JobFailed(failure_reason(status, &response))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_parsing() {
        assert_eq!(JobStatus::from("pending"), JobStatus::Pending);
        assert_eq!(JobStatus::from("done"), JobStatus::Done);
        assert_eq!(JobStatus::from("cancelled"), JobStatus::Canceled);
        assert_eq!(JobStatus::from("exploded"), JobStatus::Unknown);
        assert!(JobStatus::Running.is_in_progress());
        assert!(!JobStatus::Failed.is_in_progress());
    }

    #[test]
    fn test_job_request_shape() {
        assert_eq!(
            job_request("select 1", Some("select 2"), None).unwrap(),
            json!({"query": {"query": [{"query": "select 1", "onsuccess": "select 2"}]}})
        );
    }

    #[test]
    fn test_failure_reason_precedence() {
        let nested = json!({
            "status": "failed",
            "failed_reason": "outer",
            "query": {"query": [{"failed_reason": "inner"}]}
        });
        assert_eq!(failure_reason("failed", &nested), "inner");
        assert_eq!(
            failure_reason("failed", &json!({"failed_reason": "outer"})),
            "outer"
        );
        assert_eq!(
            failure_reason("canceled", &json!({"status": "canceled"})),
            "query failed with status \"canceled\""
        );
    }
}
