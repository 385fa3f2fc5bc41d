use crate::http::send_with_retry;
use crate::{Assignment, Catalog, Course, Repo};
use anyhow::{Context, bail};
use repoman_core::url::extract_name;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Catalog backed by the course management web service.
pub struct HttpCatalog {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpCatalog {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> anyhow::Result<T> {
        let url = format!("{}/api/v1{}", self.base_url, path);
        debug!(url = %url, "catalog request");
        let response = send_with_retry(|| {
            let request = self.client.get(&url);
            if self.api_key.is_empty() {
                request
            } else {
                request.bearer_auth(&self.api_key)
            }
        })
        .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => bail!("unauthorized: invalid API key"),
            status => bail!("unexpected status code: {}", status.as_u16()),
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("decode {what}"))
    }
}

impl Catalog for HttpCatalog {
    async fn courses(&self) -> anyhow::Result<Vec<Course>> {
        self.get_json("/courses", "courses").await
    }

    async fn assignments(&self, course_id: &str) -> anyhow::Result<Vec<Assignment>> {
        self.get_json(&format!("/courses/{course_id}/assignments"), "assignments")
            .await
    }

    async fn assignment_repos(&self, assignment_id: &str) -> anyhow::Result<Vec<Repo>> {
        let mut repos: Vec<Repo> = self
            .get_json(&format!("/assignments/{assignment_id}/repos"), "repos")
            .await?;
        for repo in &mut repos {
            if repo.name.is_empty() || repo.name == "unknown" {
                repo.name = extract_name(&repo.url);
            }
        }
        Ok(repos)
    }
}
