//! CLI command implementations.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde_json::{Value, json};
use url::Url;

pub struct SubmitArgs {
    pub release: String,
    pub inputs: Vec<String>,
    pub repo: String,
    pub service: String,
    pub owner: String,
    pub environment: String,
    pub criticality: String,
    pub data_classification: String,
    pub internet_facing: bool,
    pub idempotency_key: Option<String>,
    pub wait: bool,
}

fn validate_api_base(raw: &str) -> anyhow::Result<String> {
    let url = Url::parse(raw).context("invalid api url")?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("api url must use http or https");
    }
    if url.host_str().is_none() {
        bail!("api url must include a host");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Submit scanner artifacts as one async batch job.
pub async fn submit(api_url: &str, role: &str, args: SubmitArgs) -> anyhow::Result<()> {
    let api_base = validate_api_base(api_url)?;
    let asset = json!({
        "repo": &args.repo,
        "service": &args.service,
        "owner": &args.owner,
        "environment": &args.environment,
        "criticality": &args.criticality,
        "data_classification": &args.data_classification,
    });

    let mut reports = Vec::new();
    for pair in &args.inputs {
        let (tool, path_str) = pair
            .split_once('=')
            .with_context(|| format!("invalid --input value: {pair}"))?;
        let path = Path::new(path_str);
        if !path.exists() {
            eprintln!("skip missing artifact for tool={tool}: {}", path.display());
            continue;
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let report: Value = serde_json::from_str(&raw)
            .with_context(|| format!("artifact for tool={tool} is not valid JSON"))?;
        reports.push(json!({
            "tool": tool,
            "asset": asset,
            "report": report,
            "evidence_uri": format!("file://{}", path.display()),
        }));
    }
    if reports.is_empty() {
        bail!("no readable scanner artifacts given");
    }

    let body = json!({
        "release_id": &args.release,
        "reports": reports,
        "asset_context": {
            "internet_facing": args.internet_facing,
            "environment": &args.environment,
            "data_classification": &args.data_classification,
        },
    });

    let client = reqwest::Client::new();
    let mut request = client
        .post(format!("{api_base}/api/v1/jobs/scanner/batch"))
        .header("x-role", role)
        .json(&body);
    if let Some(key) = &args.idempotency_key {
        request = request.header("idempotency-key", key);
    }
    let response = request.send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        bail!("submission rejected ({status}): {detail}");
    }
    let record: Value = response.json().await?;
    let job_id = record["job_id"]
        .as_str()
        .context("response missing job_id")?
        .to_string();
    println!("job {} {}", job_id, record["status"].as_str().unwrap_or("?"));

    if args.wait {
        let final_record = poll_job(&client, &api_base, role, &job_id).await?;
        println!("{}", serde_json::to_string_pretty(&final_record)?);
        let status = final_record["status"].as_str().unwrap_or("?");
        if status != "succeeded" {
            bail!("job ended {status}");
        }
    }
    Ok(())
}

/// Show a job's current status record.
pub async fn job(api_url: &str, role: &str, id: &str) -> anyhow::Result<()> {
    let api_base = validate_api_base(api_url)?;
    let client = reqwest::Client::new();
    let record = fetch_job(&client, &api_base, role, id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn fetch_job(
    client: &reqwest::Client,
    api_base: &str,
    role: &str,
    id: &str,
) -> anyhow::Result<Value> {
    let response = client
        .get(format!("{api_base}/api/v1/jobs/{id}"))
        .header("x-role", role)
        .send()
        .await?;
    if !response.status().is_success() {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        bail!("job lookup failed ({status}): {detail}");
    }
    Ok(response.json().await?)
}

async fn poll_job(
    client: &reqwest::Client,
    api_base: &str,
    role: &str,
    id: &str,
) -> anyhow::Result<Value> {
    loop {
        let record = fetch_job(client, api_base, role, id).await?;
        match record["status"].as_str() {
            Some("succeeded") | Some("failed") | Some("rejected") => return Ok(record),
            _ => tokio::time::sleep(Duration::from_millis(250)).await,
        }
    }
}
