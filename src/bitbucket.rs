use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::config::{BitbucketConfig, Credentials};
use crate::error::{ErrorKind, Result};
use crate::log;
use crate::release::Repository;

/// Bitbucket Cloud REST client bound to a single repository.
pub struct Bitbucket {
    config: BitbucketConfig,
    http_client: Client,
    verbose: bool,
}

#[derive(Deserialize)]
struct Page<T> {
    values: Vec<T>,
}

#[derive(Deserialize)]
struct Commit {
    hash: String,
}

#[derive(Deserialize)]
struct PullRequest {
    id: u64,
}

#[derive(Serialize, Debug, PartialEq)]
struct BranchRef<'a> {
    branch: BranchName<'a>,
}

#[derive(Serialize, Debug, PartialEq)]
struct BranchName<'a> {
    name: &'a str,
}

#[derive(Serialize, Debug, PartialEq)]
struct NewPullRequest<'a> {
    title: &'a str,
    source: BranchRef<'a>,
    destination: BranchRef<'a>,
}

impl<'a> NewPullRequest<'a> {
    fn new(title: &'a str, source: &'a str, destination: &'a str) -> Self {
        Self {
            title,
            source: BranchRef { branch: BranchName { name: source } },
            destination: BranchRef { branch: BranchName { name: destination } },
        }
    }
}

impl Bitbucket {
    pub fn build(config: BitbucketConfig, verbose: bool) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { config, http_client, verbose })
    }

    fn repo_url(&self, tail: &str) -> String {
        format!(
            "{}/repositories/{}/{}/{tail}",
            self.config.api_url,
            urlencoding::encode(&self.config.workspace),
            urlencoding::encode(&self.config.repo_slug),
        )
    }

    fn commits_url(&self, branch: &str) -> String {
        format!("{}?include={}&pagelen=1", self.repo_url("commits"), urlencoding::encode(branch))
    }

    fn src_url(&self, revision: &str, path: &str) -> String {
        let path = path.trim_start_matches('/')
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");

        self.repo_url(&format!("src/{}/{path}", urlencoding::encode(revision)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.credentials {
            Credentials::Basic { username, password } => request.basic_auth(username, Some(password)),
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::Anonymous => request,
        }
    }

    async fn send(&self, url: String, request: RequestBuilder) -> Result<Response> {
        if self.verbose {
            log(format!("requesting {url}"));
        }

        let response = self.authorize(request).send().await?;

        if !response.status().is_success() {
            let status_code = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorKind::Status { url, status_code, body })
        }

        Ok(response)
    }
}

impl Repository for Bitbucket {
    async fn latest_revision(&self, branch: &str) -> Result<String> {
        let url = self.commits_url(branch);
        let response = self.send(url.clone(), self.http_client.get(url.as_str())).await?;

        let page: Page<Commit> = serde_json::from_slice(&response.bytes().await?)?;

        page.values.into_iter()
            .next()
            .map(|c| c.hash)
            .ok_or_else(|| ErrorKind::NoRevision {
                workspace: self.config.workspace.clone(),
                repo_slug: self.config.repo_slug.clone(),
                branch: branch.to_string(),
            })
    }

    async fn read_file(&self, path: &str, revision: &str) -> Result<String> {
        let url = self.src_url(revision, path);
        let response = self.send(url.clone(), self.http_client.get(url.as_str())).await?;

        Ok(response.text().await?)
    }

    async fn commit_file(&self, path: &str, content: &str, branch: &str, author: &str, message: &str) -> Result<()> {
        let url = self.repo_url("src");
        let form = [
            (path, content),
            ("author", author),
            ("message", message),
            ("branch", branch),
        ];

        self.send(url.clone(), self.http_client.post(url.as_str()).form(&form)).await?;

        Ok(())
    }

    async fn open_pull_request(&self, title: &str, source: &str, destination: &str) -> Result<u64> {
        let url = self.repo_url("pullrequests");
        let body = serde_json::to_vec(&NewPullRequest::new(title, source, destination))?;

        let request = self.http_client.post(url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        let response = self.send(url, request).await?;
        let pr: PullRequest = serde_json::from_slice(&response.bytes().await?)?;

        Ok(pr.id)
    }

    fn pull_request_link(&self, id: u64) -> String {
        self.config.pull_request_link(id)
    }
}
