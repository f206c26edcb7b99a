//! Build script for opsconsole
//!
//! Embeds the git revision, build time and cargo profile reported by
//! `opsconsole --version`.

use std::env;
use std::process::Command;

use chrono::Utc;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    let revision = git(&["describe", "--always", "--dirty"]).unwrap_or_else(|| "unknown".to_string());
    let build_time = Utc::now().to_rfc3339();
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=OPSCONSOLE_GIT_REVISION={}", revision);
    println!("cargo:rustc-env=OPSCONSOLE_BUILD_TIME={}", build_time);
    println!("cargo:rustc-env=OPSCONSOLE_BUILD_PROFILE={}", profile);

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=build.rs");
}
