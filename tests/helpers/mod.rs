//! HTTP helpers for the E2E tests
#![allow(dead_code)]

use reqwest::multipart;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

/// Response from POST /api/v1/statements
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub statement_id: Uuid,
    pub job_id: Uuid,
    pub status: String,
}

/// Response from GET /api/v1/jobs/{id}
#[derive(Debug, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub status: String,
    pub progress: i32,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Base URL of the server under test, `API_BASE_URL` or localhost.
pub fn base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Upload statement text for a month.
pub async fn upload_statement(
    client: &reqwest::Client,
    base_url: &str,
    statement_month: &str,
    filename: &str,
    contents: &[u8],
) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
    let form = multipart::Form::new()
        .text("statement_month", statement_month.to_string())
        .part(
            "statement_file",
            multipart::Part::bytes(contents.to_vec())
                .file_name(filename.to_string())
                .mime_str("text/plain")?,
        );

    let response = client
        .post(format!("{}/api/v1/statements", base_url))
        .multipart(form)
        .send()
        .await?;
    Ok(response)
}

/// Poll a job until it is completed or failed (with timeout)
pub async fn poll_job(
    client: &reqwest::Client,
    base_url: &str,
    job_id: Uuid,
    timeout_secs: u64,
) -> Result<JobSnapshot, Box<dyn std::error::Error>> {
    let max_polls = timeout_secs * 2; // Poll every 500ms

    for poll in 0..max_polls {
        let response = client
            .get(format!("{}/api/v1/jobs/{}", base_url, job_id))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Job status check failed: {}", error_text).into());
        }

        let snapshot = response.json::<JobSnapshot>().await?;
        match snapshot.status.as_str() {
            "completed" | "failed" => return Ok(snapshot),
            "pending" | "running" => {
                if poll % 10 == 0 && poll > 0 {
                    println!("  ... still waiting (poll {}/{}, progress {}%)", poll, max_polls, snapshot.progress);
                }
                sleep(Duration::from_millis(500)).await;
            }
            other => return Err(format!("Unknown job status: {}", other).into()),
        }
    }

    Err(format!("Job did not finish within {} seconds", timeout_secs).into())
}

/// Delete the statement for a month if one exists.
pub async fn delete_statement_for_month(
    client: &reqwest::Client,
    base_url: &str,
    statement_month: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let statements: Vec<serde_json::Value> = client
        .get(format!("{}/api/v1/statements", base_url))
        .send()
        .await?
        .json()
        .await?;

    for statement in statements {
        if statement["period"] == statement_month {
            let id = statement["id"].as_str().ok_or("statement without id")?;
            client
                .delete(format!("{}/api/v1/statements/{}", base_url, id))
                .send()
                .await?
                .error_for_status()?;
        }
    }
    Ok(())
}
