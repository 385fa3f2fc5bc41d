pub mod auth;
pub mod client;
pub mod http;

use anyhow::bail;
use repoman_core::model::RepoDescriptor;
use repoman_core::url::extract_name;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Component, Path};

pub use client::HttpCatalog;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    #[serde(default)]
    pub name: String,
    pub url: String,
}

/// Source of courses, assignments and the student repositories behind them.
pub trait Catalog {
    fn courses(&self) -> impl Future<Output = anyhow::Result<Vec<Course>>> + Send;

    fn assignments(
        &self,
        course_id: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<Assignment>>> + Send;

    fn assignment_repos(
        &self,
        assignment_id: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<Repo>>> + Send;
}

/// True when `name` is a single ordinary path component, so `root.join(name)`
/// stays directly under `root`.
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Maps catalog records to batch items cloned under `root/<name>`. A name that
/// is not a plain directory name falls back to the one in the URL; if that is
/// unusable too the whole mapping fails.
pub fn descriptors(
    repos: &[Repo],
    root: &Path,
    use_http: bool,
) -> anyhow::Result<Vec<RepoDescriptor>> {
    repos
        .iter()
        .map(|repo| {
            let name = if is_plain_name(&repo.name) {
                repo.name.clone()
            } else {
                extract_name(&repo.url)
            };
            if !is_plain_name(&name) {
                bail!(
                    "repository {:?} ({}) has no usable directory name",
                    repo.name,
                    repo.url
                );
            }
            Ok(RepoDescriptor {
                local_path: root.join(&name),
                name,
                remote_url: repo.url.clone(),
                use_http,
            })
        })
        .collect()
}
