
use std::process::exit;

use clap::Parser;
use pkgbump::bitbucket::Bitbucket;
use pkgbump::config::{BitbucketConfig, Credentials, ReleaseRequest};
use pkgbump::progress::Progress;
use pkgbump::release::Release;
use pkgbump::{log, CliOpts};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let opts = CliOpts::parse();

    let credentials = Credentials::from_env();
    if credentials == Credentials::Anonymous {
        log("No USERNAME/PASSWORD or TOKEN set, requests will be anonymous");
    }

    let repo = match Bitbucket::build(BitbucketConfig::new(&opts, credentials), opts.verbose) {
        Ok(v) => v,
        Err(e) => {
            log(format!("Unable to set up HTTP client: {e}"));
            exit(-1)
        }
    };

    let request = ReleaseRequest::from(&opts);
    let progress = Progress::new();

    log(format!(
        "Updating {} to {} in {}/{} ({})",
        request.package_name, request.version, opts.workspace, opts.repo_slug, request.branch
    ));

    match Release::new(&repo, &request, progress.clone()).run().await {
        Ok(outcome) => {
            progress.finish("Done");
            log(outcome);
            exit(0)
        },
        Err(e) => {
            progress.abandon(format!("{} failed", e.stage()));
            log(format!("Update failed: {e}"));
            exit(-1)
        }
    }
}
