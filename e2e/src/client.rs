//! HTTP client that simulates how the browser front end talks to the proxy

use reqwest::{Client, Method};

use crate::types::ProxyResponse;

pub const CHAT_PATH: &str = "/api/chat";

/// Build an HTTP client
pub fn build_client() -> Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("Failed to build reqwest client")
}

/// POST a JSON chat request to the proxy
pub async fn send_chat(
    client: &Client,
    proxy_addr: &str,
    request_body: serde_json::Value,
) -> anyhow::Result<ProxyResponse> {
    let url = format!("http://{proxy_addr}{CHAT_PATH}");

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&request_body)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send request to proxy: {}", e))?;

    collect(resp).await
}

/// POST a raw body to the chat endpoint (for malformed-input tests)
pub async fn send_raw_chat(client: &Client, proxy_addr: &str, body: &str) -> anyhow::Result<ProxyResponse> {
    let url = format!("http://{proxy_addr}{CHAT_PATH}");

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send raw request to proxy: {}", e))?;

    collect(resp).await
}

/// Send a bodiless request with an arbitrary method (OPTIONS, GET, ...)
pub async fn send_method(
    client: &Client,
    proxy_addr: &str,
    method: Method,
    path: &str,
) -> anyhow::Result<ProxyResponse> {
    let url = format!("http://{proxy_addr}{path}");

    let resp = client
        .request(method.clone(), &url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to {} {}: {}", method, url, e))?;

    collect(resp).await
}

async fn collect(resp: reqwest::Response) -> anyhow::Result<ProxyResponse> {
    let status = resp.status().as_u16();
    let headers = resp.headers().clone();
    let body_text = resp
        .text()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read proxy response: {}", e))?;

    let body = serde_json::from_str(&body_text).unwrap_or(serde_json::Value::Null);

    Ok(ProxyResponse {
        status,
        headers,
        body_text,
        body,
    })
}
