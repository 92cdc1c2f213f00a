// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=SCAN_JAPAN_VERSION");

    // Packagers can pin the version string
    let version = std::env::var("SCAN_JAPAN_VERSION").unwrap_or_else(|_| describe_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `git describe` output without the tag prefix, or the package version
///
/// "v0.3.0" becomes "0.3.0"; "v0.3.0-5-gabcdef1" becomes "0.3.0-dev-abcdef1".
fn describe_version() -> String {
    let described = Command::new("git")
        .args(["describe", "--tags", "--always", "--match", "v*"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string());

    let Some(described) = described else {
        return env!("CARGO_PKG_VERSION").to_string();
    };

    let described = described.strip_prefix('v').unwrap_or(&described);
    let parts: Vec<&str> = described.rsplitn(3, '-').collect();
    match parts.as_slice() {
        [hash, _commits, base] => {
            format!("{}-dev-{}", base, hash.strip_prefix('g').unwrap_or(hash))
        }
        _ if described.contains('.') => described.to_string(),
        // Untagged repository: describe printed a bare hash
        _ => format!("{}-{}", env!("CARGO_PKG_VERSION"), described),
    }
}
