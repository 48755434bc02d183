//! Calls `/predict` for every user in the matrix artifact and writes the
//! results to a single JSON file.

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter};

use book_recommender::{artifacts::read_matrix_artifact, models::PredictResponse};

#[derive(Debug, Deserialize)]
struct BatchConfig {
    #[serde(default = "default_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_matrix_path")]
    matrix_path: String,
    #[serde(default = "default_output_path")]
    output_path: String,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_matrix_path() -> String {
    "user_item_matrix.json".to_string()
}

fn default_output_path() -> String {
    "all_recommendations.json".to_string()
}

/// Recommended items on success, otherwise an error string
async fn fetch_recommendations(client: &reqwest::Client, base_url: &str, user_id: &str) -> Value {
    let url = format!("{}/predict", base_url.trim_end_matches('/'));
    let response = match client.post(&url).query(&[("user_id", user_id)]).send().await {
        Ok(response) => response,
        Err(e) => return Value::String(format!("Error: {}", e)),
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Value::String(format!("Error: {} - {}", status.as_u16(), body));
    }

    match response.json::<PredictResponse>().await {
        Ok(body) => Value::from(body.recommended_books),
        Err(e) => Value::String(format!("Error: {}", e)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();
    let config: BatchConfig = envy::from_env().context("Failed to load batch config")?;

    let file = File::open(&config.matrix_path)
        .with_context(|| format!("Failed to open {}", config.matrix_path))?;
    let users = read_matrix_artifact(BufReader::new(file))?.users;
    tracing::info!(users = users.len(), "Requesting recommendations for all users");

    let client = reqwest::Client::new();
    let mut all_recommendations = Map::new();
    let mut failures = 0usize;

    for user_id in users {
        let result = fetch_recommendations(&client, &config.api_base_url, &user_id).await;
        if result.is_string() {
            failures += 1;
            tracing::warn!(user_id = %user_id, result = %result, "Prediction request failed");
        }
        all_recommendations.insert(user_id, result);
    }

    let output = File::create(&config.output_path)
        .with_context(|| format!("Failed to create {}", config.output_path))?;
    serde_json::to_writer_pretty(BufWriter::new(output), &Value::Object(all_recommendations))?;

    tracing::info!(
        output = %config.output_path,
        failures,
        "Recommendations for all users saved"
    );
    Ok(())
}
