// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    // Re-run build script if git HEAD changes
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");

    // Packagers can pin the version string
    println!("cargo::rerun-if-env-changed=CAMERA_UPLOADER_VERSION");
    let version = if let Ok(v) = std::env::var("CAMERA_UPLOADER_VERSION") {
        v
    } else {
        get_git_version()
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

fn get_git_version() -> String {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--match", "v*"])
        .output();

    let version = match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        // Source tarballs have no git metadata
        _ => return env!("CARGO_PKG_VERSION").to_string(),
    };

    // Strip 'v' prefix if present
    let version = version.strip_prefix('v').unwrap_or(&version);

    let commit_hash = get_commit_hash().unwrap_or_else(|| "unknown".to_string());

    // "0.1.0-5-gabcdef1" => "0.1.0+5.abcdef1", exact tags => "0.1.0"
    if version.contains('-') {
        let parts: Vec<&str> = version.rsplitn(3, '-').collect();
        if parts.len() >= 3 {
            let hash = parts[0].strip_prefix('g').unwrap_or(parts[0]);
            let base_version = parts[2];
            format!("{}+{}.{}", base_version, parts[1], hash)
        } else {
            version.to_string()
        }
    } else if version.contains('.') {
        version.to_string()
    } else {
        // `--always` fell back to a bare commit hash (no tags yet)
        format!("{}+{}", env!("CARGO_PKG_VERSION"), commit_hash)
    }
}

fn get_commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}
