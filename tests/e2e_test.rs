//! End-to-end tests over HTTP
//!
//! These tests require:
//! 1. PostgreSQL database running
//! 2. API server running on the configured port (embedded worker enabled,
//!    or the worker binary running alongside)
//!
//! Run with: cargo test --test e2e_test -- --ignored --nocapture --test-threads=1
//!
//! Set API_BASE_URL to override default (http://localhost:3000)

mod fixtures;
mod helpers;

use fixtures::*;
use helpers::*;
use serde_json::{json, Value};

const MONTH: &str = "2025-12";

#[tokio::test]
#[ignore] // Requires running API server and database
async fn test_e2e_health_check() {
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Health check failed");

    assert!(
        response.status().is_success(),
        "Health check returned non-success status: {}",
        response.status()
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["checks"]["database"]["status"], "ok");

    println!("✓ Health check passed");
}

#[tokio::test]
#[ignore] // Requires running API server and database
async fn test_e2e_metrics_exposed() {
    let client = reqwest::Client::new();
    let body = client
        .get(format!("{}/metrics", base_url()))
        .send()
        .await
        .expect("Metrics request failed")
        .text()
        .await
        .unwrap();
    // Descriptions are registered at startup; counters appear once recorded.
    assert!(body.is_empty() || body.contains("# "));
}

#[tokio::test]
#[ignore] // Requires running API server and database
async fn test_e2e_upload_parse_and_review() {
    let base_url = base_url();
    let client = reqwest::Client::new();
    delete_statement_for_month(&client, &base_url, MONTH)
        .await
        .expect("cleanup failed");

    // 1. Upload and wait for the parse job
    let response = upload_statement(&client, &base_url, MONTH, "december.txt", DECEMBER_2025.as_bytes())
        .await
        .expect("upload failed");
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
    let upload: UploadResponse = response.json().await.unwrap();

    let job = poll_job(&client, &base_url, upload.job_id, 120)
        .await
        .expect("job polling failed");
    assert_eq!(job.status, "completed", "job error: {:?}", job.error);
    let result = job.result.expect("no result");
    assert_eq!(result["transactions_count"], json!(DECEMBER_2025_RECORDS.len()));
    println!("✓ Parsed {} records", DECEMBER_2025_RECORDS.len());

    // 2. A second upload for the same month is rejected
    let duplicate = upload_statement(&client, &base_url, MONTH, "again.txt", DECEMBER_2025.as_bytes())
        .await
        .unwrap();
    assert_eq!(duplicate.status(), reqwest::StatusCode::CONFLICT);

    // 3. Statement detail
    let detail: Value = client
        .get(format!("{}/api/v1/statements/{}", base_url, upload.statement_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["statement"]["period"], MONTH);
    assert_eq!(detail["statement"]["status"], "parsed");
    let transactions = detail["transactions"].as_array().expect("transactions array");
    assert_eq!(transactions.len(), DECEMBER_2025_RECORDS.len());

    let check = transactions
        .iter()
        .find(|t| t["check_number"] == "2730")
        .expect("check 2730 missing");
    assert_eq!(check["amount_cents"], -50_000);
    assert_eq!(check["transaction_type"], "check");

    // 4. Ignore then unmatch a record
    let fee_id = transactions
        .iter()
        .find(|t| t["transaction_type"] == "fee")
        .and_then(|t| t["id"].as_str())
        .expect("fee missing")
        .to_string();

    let ignored: Value = client
        .post(format!("{}/api/v1/transactions/{}/ignore", base_url, fee_id))
        .json(&json!({ "reason": "bank fee, no receipt" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ignored["match_status"], "ignored");
    assert_eq!(ignored["notes"], "bank fee, no receipt");

    let unmatched: Value = client
        .post(format!("{}/api/v1/transactions/{}/unmatch", base_url, fee_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unmatched["match_status"], "unmatched");

    // 5. Deposits cannot become expenses
    let deposit_id = transactions
        .iter()
        .find(|t| t["transaction_type"] == "deposit")
        .and_then(|t| t["id"].as_str())
        .expect("deposit missing");
    let rejected = client
        .post(format!("{}/api/v1/transactions/{}/create-expense", base_url, deposit_id))
        .json(&json!({ "vendor_name": "Bankcard" }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), reqwest::StatusCode::BAD_REQUEST);

    // 6. Complete and delete
    let completed: Value = client
        .post(format!("{}/api/v1/statements/{}/complete", base_url, upload.statement_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(completed["status"], "completed");

    let deleted = client
        .delete(format!("{}/api/v1/statements/{}", base_url, upload.statement_id))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);

    let gone = client
        .get(format!("{}/api/v1/statements/{}", base_url, upload.statement_id))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), reqwest::StatusCode::NOT_FOUND);

    println!("✓ Upload, parse and review flow passed");
}

#[tokio::test]
#[ignore] // Requires running API server and database
async fn test_e2e_upload_validation() {
    let base_url = base_url();
    let client = reqwest::Client::new();

    let bad_month = upload_statement(&client, &base_url, "December 2025", "december.txt", b"text")
        .await
        .unwrap();
    assert_eq!(bad_month.status(), reqwest::StatusCode::BAD_REQUEST);

    let empty = upload_statement(&client, &base_url, "1999-01", "empty.txt", b"")
        .await
        .unwrap();
    assert_eq!(empty.status(), reqwest::StatusCode::BAD_REQUEST);

    let unknown_job = client
        .get(format!("{}/api/v1/jobs/{}", base_url, uuid::Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_job.status(), reqwest::StatusCode::NOT_FOUND);
}
