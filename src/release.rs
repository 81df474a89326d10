use std::fmt::Display;

use crate::config::ReleaseRequest;
use crate::error::{ReleaseError, Result};
use crate::log;
use crate::manifest::{edit_dependency_version, DependencyEdit};
use crate::progress::Progress;

/// Remote repository operations a release needs, in the order they are used.
#[allow(async_fn_in_trait)]
pub trait Repository {
    async fn latest_revision(&self, branch: &str) -> Result<String>;

    async fn read_file(&self, path: &str, revision: &str) -> Result<String>;

    async fn commit_file(&self, path: &str, content: &str, branch: &str, author: &str, message: &str) -> Result<()>;

    async fn open_pull_request(&self, title: &str, source: &str, destination: &str) -> Result<u64>;

    fn pull_request_link(&self, id: u64) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolvingRevision,
    ReadingManifest,
    Editing,
    CommittingBranch,
    OpeningPullRequest,
}

impl Stage {
    pub const COUNT: usize = 5;

    pub fn position(self) -> usize {
        match self {
            Stage::ResolvingRevision => 1,
            Stage::ReadingManifest => 2,
            Stage::Editing => 3,
            Stage::CommittingBranch => 4,
            Stage::OpeningPullRequest => 5,
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::ResolvingRevision => "Resolving revision",
            Stage::ReadingManifest => "Reading manifest",
            Stage::Editing => "Editing manifest",
            Stage::CommittingBranch => "Committing branch",
            Stage::OpeningPullRequest => "Opening pull request",
        })
    }
}

#[derive(Debug, PartialEq)]
pub enum ReleaseOutcome {
    PullRequest { id: u64, title: String, link: String },
    DryRun { branch: String, message: String },
}

impl Display for ReleaseOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseOutcome::PullRequest { id, title, link } =>
                write!(f, "Pull request #{id} {title} created\nCheck out: {link}"),
            ReleaseOutcome::DryRun { branch, message } =>
                write!(f, "Dry run, nothing pushed. Would commit \"{message}\" to {branch}"),
        }
    }
}

/// One dependency bump, run as a strictly linear pipeline.
///
/// Every stage returns a `Result` and the first failure ends the run. Nothing is undone: if the
/// pull request cannot be opened the branch and commit stay on the remote.
pub struct Release<'a, R> {
    repo: &'a R,
    request: &'a ReleaseRequest,
    progress: Progress,
}

impl<'a, R: Repository> Release<'a, R> {
    pub fn new(repo: &'a R, request: &'a ReleaseRequest, progress: Progress) -> Self {
        Self { repo, request, progress }
    }

    pub async fn run(&self) -> std::result::Result<ReleaseOutcome, ReleaseError> {
        let revision = self.resolve_revision().await?;
        let manifest = self.read_manifest(&revision).await?;
        let edit = self.edit(&manifest)?;

        let branch = self.request.update_branch();
        let message = self.request.commit_message(&edit.previous);

        if self.request.dry_run {
            return Ok(ReleaseOutcome::DryRun { branch, message })
        }

        self.commit_branch(&edit, &branch, &message).await?;
        let id = self.open_pull_request(&branch, &message).await?;

        Ok(ReleaseOutcome::PullRequest {
            id,
            title: message,
            link: self.repo.pull_request_link(id),
        })
    }

    fn enter(&self, stage: Stage) {
        self.progress.set_stage(stage);

        if self.request.verbose {
            log(format!("{stage} ({}/{})", stage.position(), Stage::COUNT));
        }
    }

    async fn resolve_revision(&self) -> std::result::Result<String, ReleaseError> {
        self.enter(Stage::ResolvingRevision);

        let revision = self.repo.latest_revision(&self.request.branch).await
            .map_err(ReleaseError::ResolvingRevision)?;

        if self.request.verbose {
            log(format!("{} is at {revision}", self.request.branch));
        }

        Ok(revision)
    }

    async fn read_manifest(&self, revision: &str) -> std::result::Result<String, ReleaseError> {
        self.enter(Stage::ReadingManifest);

        let manifest = self.repo.read_file(&self.request.manifest_path, revision).await
            .map_err(ReleaseError::ReadingManifest)?;

        if self.request.verbose {
            log(format!("read {} ({} bytes)", self.request.manifest_path, manifest.len()));
        }

        Ok(manifest)
    }

    fn edit(&self, manifest: &str) -> std::result::Result<DependencyEdit, ReleaseError> {
        self.enter(Stage::Editing);

        edit_dependency_version(manifest, &self.request.package_name, &self.request.version)
            .map_err(ReleaseError::Editing)
    }

    async fn commit_branch(&self, edit: &DependencyEdit, branch: &str, message: &str) -> std::result::Result<(), ReleaseError> {
        self.enter(Stage::CommittingBranch);

        self.repo.commit_file(&self.request.manifest_path, &edit.content, branch, &self.request.author, message).await
            .map_err(ReleaseError::CommittingBranch)
    }

    async fn open_pull_request(&self, branch: &str, message: &str) -> std::result::Result<u64, ReleaseError> {
        self.enter(Stage::OpeningPullRequest);

        self.repo.open_pull_request(message, branch, &self.request.branch).await
            .map_err(ReleaseError::OpeningPullRequest)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use reqwest::StatusCode;

    use super::*;
    use crate::error::{EditError, ErrorKind};

    const MANIFEST: &str = r#"{"name":"x","dependencies":{"bitbucket":"^2.9.0","dotenv":"^16.0.3"}}"#;

    #[derive(Debug, PartialEq)]
    enum Call {
        LatestRevision { branch: String },
        ReadFile { path: String, revision: String },
        CommitFile { path: String, content: String, branch: String, author: String, message: String },
        OpenPullRequest { title: String, source: String, destination: String },
    }

    struct FakeRepo {
        manifest: String,
        fail_at: Option<Stage>,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeRepo {
        fn new(manifest: &str) -> Self {
            Self { manifest: manifest.to_string(), fail_at: None, calls: Mutex::new(Vec::new()) }
        }

        fn failing_at(mut self, stage: Stage) -> Self {
            self.fail_at = Some(stage);
            self
        }

        fn record(&self, call: Call, stage: Stage) -> Result<()> {
            self.calls.lock().unwrap().push(call);

            if self.fail_at == Some(stage) {
                return Err(ErrorKind::Status {
                    url: "https://api.example.test".into(),
                    status_code: StatusCode::INTERNAL_SERVER_ERROR,
                    body: String::new(),
                })
            }

            Ok(())
        }

        fn calls(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
    }

    impl Repository for FakeRepo {
        async fn latest_revision(&self, branch: &str) -> Result<String> {
            self.record(Call::LatestRevision { branch: branch.into() }, Stage::ResolvingRevision)?;
            Ok("c0ffee".into())
        }

        async fn read_file(&self, path: &str, revision: &str) -> Result<String> {
            self.record(Call::ReadFile { path: path.into(), revision: revision.into() }, Stage::ReadingManifest)?;
            Ok(self.manifest.clone())
        }

        async fn commit_file(&self, path: &str, content: &str, branch: &str, author: &str, message: &str) -> Result<()> {
            self.record(Call::CommitFile {
                path: path.into(),
                content: content.into(),
                branch: branch.into(),
                author: author.into(),
                message: message.into(),
            }, Stage::CommittingBranch)
        }

        async fn open_pull_request(&self, title: &str, source: &str, destination: &str) -> Result<u64> {
            self.record(Call::OpenPullRequest {
                title: title.into(),
                source: source.into(),
                destination: destination.into(),
            }, Stage::OpeningPullRequest)?;
            Ok(17)
        }

        fn pull_request_link(&self, id: u64) -> String {
            format!("https://bitbucket.org/acme/web/pull-requests/{id}")
        }
    }

    fn request(package: &str) -> ReleaseRequest {
        ReleaseRequest {
            package_name: package.into(),
            version: "^3.0.1".into(),
            branch: "main".into(),
            author: "Bot <bot@example.com>".into(),
            manifest_path: "package.json".into(),
            dry_run: false,
            verbose: false,
        }
    }

    async fn run(repo: &FakeRepo, request: &ReleaseRequest) -> std::result::Result<ReleaseOutcome, ReleaseError> {
        Release::new(repo, request, Progress::hidden()).run().await
    }

    #[tokio::test]
    async fn runs_every_stage_in_order() {
        let repo = FakeRepo::new(MANIFEST);
        let request = request("bitbucket");

        let outcome = run(&repo, &request).await.unwrap();

        let message = "Update version of package bitbucket from ^2.9.0 to ^3.0.1";
        assert_eq!(outcome, ReleaseOutcome::PullRequest {
            id: 17,
            title: message.into(),
            link: "https://bitbucket.org/acme/web/pull-requests/17".into(),
        });

        let calls = repo.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0], Call::LatestRevision { branch: "main".into() });
        assert_eq!(calls[1], Call::ReadFile { path: "package.json".into(), revision: "c0ffee".into() });

        let Call::CommitFile { path, content, branch, author, message: commit_message } = &calls[2] else {
            panic!("expected commit, got {:?}", calls[2]);
        };
        assert_eq!(path, "package.json");
        assert_eq!(branch, "update-bitbucket-^3.0.1");
        assert_eq!(author, "Bot <bot@example.com>");
        assert_eq!(commit_message, message);
        assert!(content.contains("\"bitbucket\": \"^3.0.1\""));
        assert!(content.contains("\"dotenv\": \"^16.0.3\""));

        assert_eq!(calls[3], Call::OpenPullRequest {
            title: message.into(),
            source: "update-bitbucket-^3.0.1".into(),
            destination: "main".into(),
        });
    }

    #[tokio::test]
    async fn outcome_prints_confirmation() {
        let repo = FakeRepo::new(MANIFEST);

        let outcome = run(&repo, &request("dotenv")).await.unwrap();

        assert_eq!(
            outcome.to_string(),
            "Pull request #17 Update version of package dotenv from ^16.0.3 to ^3.0.1 created\n\
             Check out: https://bitbucket.org/acme/web/pull-requests/17"
        );
    }

    #[tokio::test]
    async fn missing_package_never_commits() {
        let repo = FakeRepo::new(MANIFEST);

        let err = run(&repo, &request("dontknow")).await.unwrap_err();

        assert!(matches!(err, ReleaseError::Editing(EditError::DependencyNotFound { ref package }) if package == "dontknow"));
        assert_eq!(err.stage(), Stage::Editing);
        assert_eq!(repo.calls().len(), 2);
    }

    #[tokio::test]
    async fn malformed_manifest_never_commits() {
        let repo = FakeRepo::new("<html>not json</html>");

        let err = run(&repo, &request("bitbucket")).await.unwrap_err();

        assert!(matches!(err, ReleaseError::Editing(EditError::Parse(_))));
        assert_eq!(repo.calls().len(), 2);
    }

    #[tokio::test]
    async fn revision_failure_stops_before_reading() {
        let repo = FakeRepo::new(MANIFEST).failing_at(Stage::ResolvingRevision);

        let err = run(&repo, &request("bitbucket")).await.unwrap_err();

        assert_eq!(err.stage(), Stage::ResolvingRevision);
        assert_eq!(repo.calls(), vec![Call::LatestRevision { branch: "main".into() }]);
    }

    #[tokio::test]
    async fn read_failure_stops_before_editing() {
        let repo = FakeRepo::new(MANIFEST).failing_at(Stage::ReadingManifest);

        let err = run(&repo, &request("bitbucket")).await.unwrap_err();

        assert!(matches!(err, ReleaseError::ReadingManifest(ErrorKind::Status { .. })));
        assert_eq!(repo.calls().len(), 2);
    }

    #[tokio::test]
    async fn commit_failure_opens_no_pull_request() {
        let repo = FakeRepo::new(MANIFEST).failing_at(Stage::CommittingBranch);

        let err = run(&repo, &request("bitbucket")).await.unwrap_err();

        assert_eq!(err.stage(), Stage::CommittingBranch);
        let calls = repo.calls();
        assert_eq!(calls.len(), 3);
        assert!(!calls.iter().any(|c| matches!(c, Call::OpenPullRequest { .. })));
    }

    #[tokio::test]
    async fn pull_request_failure_keeps_commit() {
        let repo = FakeRepo::new(MANIFEST).failing_at(Stage::OpeningPullRequest);

        let err = run(&repo, &request("bitbucket")).await.unwrap_err();

        assert_eq!(err.stage(), Stage::OpeningPullRequest);
        let calls = repo.calls();
        assert_eq!(calls.len(), 4);
        assert!(matches!(calls[2], Call::CommitFile { .. }));
    }

    #[tokio::test]
    async fn dry_run_stops_before_mutating() {
        let repo = FakeRepo::new(MANIFEST);
        let mut request = request("bitbucket");
        request.dry_run = true;

        let outcome = run(&repo, &request).await.unwrap();

        assert_eq!(outcome, ReleaseOutcome::DryRun {
            branch: "update-bitbucket-^3.0.1".into(),
            message: "Update version of package bitbucket from ^2.9.0 to ^3.0.1".into(),
        });
        assert_eq!(repo.calls().len(), 2);
    }
}
