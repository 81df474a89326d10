//! Pins a dependency in a remote repository's `package.json` and opens a pull request for it.
//!
//! [`manifest`] holds the pure edit-and-format step, [`release`] drives it between the remote
//! calls of a [`release::Repository`] such as [`bitbucket::Bitbucket`].

use std::fmt::Display;

pub mod bitbucket;
pub mod config;
pub mod error;
pub mod manifest;
pub mod progress;
pub mod release;

pub use config::CliOpts;

fn now() -> String {
    chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn log<M: Display>(msg: M) {
    println!("{} {msg}", now());
}
