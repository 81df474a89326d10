use std::{env, time::Duration};

use clap::{builder::NonEmptyStringValueParser, Parser};

/// Pin one dependency in a Bitbucket repository's package.json and open a pull request for it.
///
/// Every option can also be set through its PKGBUMP_* environment variable. Credentials are only
/// read from the environment: USERNAME and PASSWORD, or TOKEN.
#[derive(Parser, Clone, Debug)]
#[command(author, disable_version_flag = true)]
pub struct CliOpts {
    #[arg(long, visible_alias = "packageName", env = "PKGBUMP_PACKAGE_NAME", value_parser = NonEmptyStringValueParser::new(),
        help = "Name of the dependency to update")]
    pub package_name: String,

    #[arg(long, env = "PKGBUMP_VERSION", value_parser = NonEmptyStringValueParser::new(),
        help = "Version specifier to pin the dependency to, written as-is")]
    pub version: String,

    #[arg(long, env = "PKGBUMP_WORKSPACE", value_parser = NonEmptyStringValueParser::new(),
        help = "Bitbucket workspace owning the repository")]
    pub workspace: String,

    #[arg(long, visible_alias = "repoSlug", env = "PKGBUMP_REPO_SLUG", value_parser = NonEmptyStringValueParser::new(),
        help = "Repository slug")]
    pub repo_slug: String,

    #[arg(long, env = "PKGBUMP_BRANCH", default_value = "master", value_parser = NonEmptyStringValueParser::new(),
        help = "Branch to read package.json from and to open the pull request against")]
    pub branch: String,

    #[arg(long, env = "PKGBUMP_AUTHOR", default_value = "Update Script <noreply@redocly.com>",
        help = "Commit author, as 'Name <email>'")]
    pub author: String,

    #[arg(long, visible_alias = "packageJsonPath", env = "PKGBUMP_PACKAGE_JSON_PATH", default_value = "package.json",
        help = "Path of package.json inside the repository")]
    pub package_json_path: String,

    #[arg(long, env = "PKGBUMP_API_URL", default_value = "https://api.bitbucket.org/2.0",
        help = "Bitbucket REST API base url")]
    pub api_url: String,

    #[arg(long, env = "PKGBUMP_WEB_URL", default_value = "https://bitbucket.org",
        help = "Bitbucket web base url, used for the pull request link")]
    pub web_url: String,

    #[arg(long, env = "PKGBUMP_TIMEOUT_SECS", default_value_t = 5,
        help = "Timeout for each request to Bitbucket, in seconds")]
    pub timeout_secs: u64,

    #[arg(long, env = "PKGBUMP_DRY_RUN", default_value_t = false,
        help = "Resolve, read and edit package.json but don't push a branch or open a pull request")]
    pub dry_run: bool,

    #[arg(short, long, env = "PKGBUMP_VERBOSE", default_value_t = false,
        help = "Verbose logging")]
    pub verbose: bool,
}

/// How requests to the repository host are authenticated.
#[derive(Clone, PartialEq)]
pub enum Credentials {
    Basic { username: String, password: String },
    Token(String),
    Anonymous,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f.debug_struct("Basic").field("username", username).finish_non_exhaustive(),
            Credentials::Token(_) => f.write_str("Token(..)"),
            Credentials::Anonymous => f.write_str("Anonymous"),
        }
    }
}

impl Credentials {
    /// `USERNAME` and `PASSWORD` win over `TOKEN` when both are set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self where F: Fn(&str) -> Option<String> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        match (non_empty("USERNAME"), non_empty("PASSWORD"), non_empty("TOKEN")) {
            (Some(username), Some(password), _) => Credentials::Basic { username, password },
            (_, _, Some(token)) => Credentials::Token(token),
            _ => Credentials::Anonymous,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BitbucketConfig {
    pub api_url: String,
    pub web_url: String,
    pub workspace: String,
    pub repo_slug: String,
    pub timeout: Duration,
    pub credentials: Credentials,
}

impl BitbucketConfig {
    pub fn new(opts: &CliOpts, credentials: Credentials) -> Self {
        Self {
            api_url: opts.api_url.trim_end_matches('/').to_string(),
            web_url: opts.web_url.trim_end_matches('/').to_string(),
            workspace: opts.workspace.clone(),
            repo_slug: opts.repo_slug.clone(),
            timeout: Duration::from_secs(opts.timeout_secs),
            credentials,
        }
    }

    pub fn pull_request_link(&self, id: u64) -> String {
        format!("{}/{}/{}/pull-requests/{id}", self.web_url, self.workspace, self.repo_slug)
    }
}

/// Everything one release run needs, fixed before the first remote call.
#[derive(Debug, Clone)]
pub struct ReleaseRequest {
    pub package_name: String,
    pub version: String,
    pub branch: String,
    pub author: String,
    pub manifest_path: String,
    pub dry_run: bool,
    pub verbose: bool,
}

impl From<&CliOpts> for ReleaseRequest {
    fn from(opts: &CliOpts) -> Self {
        Self {
            package_name: opts.package_name.clone(),
            version: opts.version.clone(),
            branch: opts.branch.clone(),
            author: opts.author.clone(),
            manifest_path: opts.package_json_path.clone(),
            dry_run: opts.dry_run,
            verbose: opts.verbose,
        }
    }
}

impl ReleaseRequest {
    pub fn update_branch(&self) -> String {
        format!("update-{}-{}", self.package_name, self.version)
    }

    pub fn commit_message(&self, previous: &str) -> String {
        format!("Update version of package {} from {previous} to {}", self.package_name, self.version)
    }
}
