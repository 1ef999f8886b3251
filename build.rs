use anyhow::Result;
use chrono::TimeZone;
use std::env;
use std::fs;
use std::process::Command;
use vergen_gitcl::{Emitter, GitclBuilder};

fn main() -> Result<()> {
    // Generate git information
    let gitcl = GitclBuilder::default()
        .describe(true, true, Some("[0-9]*"))
        .build()?;

    let gitcl_res = Emitter::default()
        .idempotent()
        .fail_on_error()
        .add_instructions(&gitcl)
        .and_then(|emitter| emitter.emit());

    if let Err(e) = gitcl_res {
        eprintln!("error occurred while generating instructions: {e:?}");
        Emitter::default().idempotent().fail_on_error().emit()?;
    }

    // Add build timestamp
    let now = match env::var("SOURCE_DATE_EPOCH") {
        Ok(val) => chrono::Utc
            .timestamp_opt(val.parse::<i64>()?, 0)
            .single()
            .ok_or_else(|| anyhow::anyhow!("SOURCE_DATE_EPOCH out of range: {val}"))?,
        Err(_) => chrono::Utc::now(),
    };

    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    );

    // Get sbc library version using cargo metadata
    let sbc_version = get_sbc_version_from_metadata().unwrap_or_else(|_| {
        read_sbc_version_fallback().unwrap_or_else(|_| "unknown".to_string())
    });
    println!("cargo:rustc-env=SBC_VERSION={sbc_version}");

    println!("cargo:rerun-if-changed=sbc/Cargo.toml");

    Ok(())
}

/// Reads the sbc version from `cargo metadata`, covering both the workspace
/// member and a registry dependency.
fn get_sbc_version_from_metadata() -> Result<String> {
    let output = Command::new("cargo")
        .args(["metadata", "--format-version", "1"])
        .output()?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed");
    }

    let metadata: serde_json::Value = serde_json::from_slice(&output.stdout)?;

    let packages = metadata["packages"].as_array().into_iter().flatten();
    let member = packages
        .filter(|package| package["name"].as_str() == Some("sbc"))
        .find_map(|package| package["version"].as_str());
    if let Some(version) = member {
        return Ok(version.to_string());
    }

    let nodes = metadata["resolve"]["nodes"].as_array().into_iter().flatten();
    for id in nodes.filter_map(|node| node["id"].as_str()) {
        // "sbc 0.1.0 (registry+...)"
        let mut parts = id.split(' ');
        if parts.next() == Some("sbc") {
            if let Some(version) = parts.next() {
                return Ok(version.to_string());
            }
        }
    }

    anyhow::bail!("sbc package not found in metadata");
}

/// Fallback: reads the version line of sbc/Cargo.toml.
fn read_sbc_version_fallback() -> Result<String> {
    let toml_content = fs::read_to_string("sbc/Cargo.toml")?;

    for line in toml_content.lines() {
        let line = line.trim();
        if line.starts_with("version") && line.contains("=") {
            if let Some(equals_pos) = line.find('=') {
                let version_part = line[equals_pos + 1..].trim();
                let version = version_part.trim_matches('"').trim_matches('\'');
                return Ok(version.to_string());
            }
        }
    }

    anyhow::bail!("Could not find version in sbc/Cargo.toml");
}
