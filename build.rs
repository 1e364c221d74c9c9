// SPDX-License-Identifier: MPL-2.0

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=BARCODE_SCANNER_VERSION");

    // Packagers (flatpak, distro builds) set the version explicitly
    let version = std::env::var("BARCODE_SCANNER_VERSION").unwrap_or_else(|_| git_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Version derived from `git describe`
///
/// - exact tag `v0.1.0` becomes `0.1.0-<hash>`
/// - `v0.1.0-5-gabcdef1` becomes `0.1.0-dirty-abcdef1`
/// - no tags at all falls back to the package version plus hash
fn git_version() -> String {
    let commit_hash = run_git(&["rev-parse", "--short", "HEAD"]);

    let Some(described) = run_git(&["describe", "--tags", "--match", "v*"]) else {
        let package_version = env!("CARGO_PKG_VERSION");
        return match commit_hash {
            Some(hash) => format!("{}-{}", package_version, hash),
            None => package_version.to_string(),
        };
    };

    let described = described.strip_prefix('v').unwrap_or(&described).to_string();

    let parts: Vec<&str> = described.rsplitn(3, '-').collect();
    if parts.len() == 3 {
        let hash = parts[0].strip_prefix('g').unwrap_or(parts[0]);
        format!("{}-dirty-{}", parts[2], hash)
    } else {
        format!(
            "{}-{}",
            described,
            commit_hash.unwrap_or_else(|| "unknown".to_string())
        )
    }
}

fn run_git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
