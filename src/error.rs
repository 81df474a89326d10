use reqwest::StatusCode;
use thiserror::Error;

use crate::release::Stage;


pub type Result<T> = std::result::Result<T, ErrorKind>;

#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("resolving latest revision failed: {}", .0)]
    ResolvingRevision(ErrorKind),

    #[error("reading manifest failed: {}", .0)]
    ReadingManifest(ErrorKind),

    #[error("editing manifest failed: {}", .0)]
    Editing(EditError),

    #[error("committing branch failed: {}", .0)]
    CommittingBranch(ErrorKind),

    #[error("opening pull request failed: {}", .0)]
    OpeningPullRequest(ErrorKind),
}

impl ReleaseError {
    /// The stage the run stopped in.
    pub fn stage(&self) -> Stage {
        match self {
            ReleaseError::ResolvingRevision(_) => Stage::ResolvingRevision,
            ReleaseError::ReadingManifest(_) => Stage::ReadingManifest,
            ReleaseError::Editing(_) => Stage::Editing,
            ReleaseError::CommittingBranch(_) => Stage::CommittingBranch,
            ReleaseError::OpeningPullRequest(_) => Stage::OpeningPullRequest,
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("manifest is not valid JSON: {}", .0)]
    Parse(serde_json::Error),

    #[error("package {package} not found")]
    DependencyNotFound { package: String },

    /// The canonical formatter emitted text that does not parse back. Never a caller error.
    #[error("formatted manifest failed to re-parse: {}", .0)]
    FormatterInvariant(serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("request to {url} failed with {status_code}: {body}")]
    Status { url: String, status_code: StatusCode, body: String },

    #[error("cannot retrieve last commit information for {workspace}/{repo_slug} on {branch}, make sure that the branch exists and you have read access to the repository")]
    NoRevision { workspace: String, repo_slug: String, branch: String },

    #[error("reqwest error: {}", .0)]
    Reqwest(#[from]reqwest::Error),

    #[error("deserializing failed: {}", .0)]
    Serde(#[from]serde_json::Error),
}
