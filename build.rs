use chrono::Utc;
use std::env;
use std::fs::{metadata, File};
use std::io::Write;
use std::path::Path;

fn main() {
    let Some(out_dir) = env::var_os("OUT_DIR") else {
        return;
    };
    let dest_path = Path::new(&out_dir).join("version.rs");
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let cargo_toml_path = Path::new(&manifest_dir).join("Cargo.toml");

    // Regenerate only when Cargo.toml is newer than the generated file
    let should_regenerate = match (metadata(&dest_path), metadata(&cargo_toml_path)) {
        (Ok(generated), Ok(manifest)) => match (generated.modified(), manifest.modified()) {
            (Ok(generated), Ok(manifest)) => manifest > generated,
            _ => true,
        },
        _ => true,
    };

    if should_regenerate {
        let build_time = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
        let git_hash = std::process::Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .output()
            .ok()
            .filter(|output| output.status.success())
            .and_then(|output| String::from_utf8(output.stdout).ok())
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if let Ok(mut f) = File::create(&dest_path) {
            #[allow(clippy::uninlined_format_args)]
            let _ = writeln!(
                &mut f,
                r###"pub const BUILD_TIME: &str = "{}";
pub const GIT_HASH: &str = "{}";"###,
                build_time, git_hash
            );
        }
    }

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
