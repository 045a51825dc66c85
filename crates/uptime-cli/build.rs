use std::process::Command;

/// Embed a short commit hash for `--version`. CI builds from a tarball can
/// pass `UPTIME_GIT_HASH` instead.
fn main() {
    println!("cargo:rerun-if-env-changed=UPTIME_GIT_HASH");
    println!("cargo:rerun-if-changed=../../.git/HEAD");

    let hash = std::env::var("UPTIME_GIT_HASH")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(git_short_hash)
        .unwrap_or_default();

    println!("cargo:rustc-env=GIT_HASH={}", hash.trim());
}

fn git_short_hash() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    String::from_utf8(out.stdout).ok()
}
