use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::CONFIG_FILE_NAME;

const MANIFEST_ENTRY: &str = "manifest.json";
const CONFIG_ENTRY_DIR: &str = "config/";
const DATA_ENTRY_DIR: &str = "data/";
pub const BUNDLE_FORMAT_V1: &str = "gradebook-workspace-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub restored_files: Vec<String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Zips the workspace config (if any) and the store's data files, with a
/// manifest carrying a SHA-256 per entry.
pub fn export_workspace_bundle(
    workspace_path: &Path,
    store_files: &[PathBuf],
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let mut entries: Vec<(String, PathBuf)> = Vec::new();
    let config_path = workspace_path.join(CONFIG_FILE_NAME);
    if config_path.is_file() {
        entries.push((format!("{}{}", CONFIG_ENTRY_DIR, CONFIG_FILE_NAME), config_path));
    }
    for f in store_files {
        let Some(name) = f.file_name().and_then(|n| n.to_str()) else {
            return Err(anyhow!("unsupported store file name: {}", f.to_string_lossy()));
        };
        entries.push((format!("{}{}", DATA_ENTRY_DIR, name), f.clone()));
    }

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let mut contents: Vec<(String, Vec<u8>)> = Vec::with_capacity(entries.len());
    for (entry, path) in entries {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        contents.push((entry, bytes));
    }

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "entries": contents.iter().map(|(entry, bytes)| json!({
            "path": entry,
            "sha256": sha256_hex(bytes),
            "size": bytes.len(),
        })).collect::<Vec<_>>(),
    });

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (entry, bytes) in &contents {
        zip.start_file(entry.as_str(), opts)
            .with_context(|| format!("failed to start entry {}", entry))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write entry {}", entry))?;
    }

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: contents.len() + 1,
    })
}

/// Restores a bundle into `workspace_path`. Every entry is checked against
/// the manifest before any file in the workspace is replaced.
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let listed = manifest
        .get("entries")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("manifest.json has no entries"))?;

    let mut restored: Vec<(PathBuf, Vec<u8>)> = Vec::with_capacity(listed.len());
    for item in listed {
        let entry = item
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("manifest entry without path"))?;
        let expected = item
            .get("sha256")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("manifest entry {} without sha256", entry))?;
        let target = entry_target(workspace_path, entry)?;

        let mut bytes = Vec::new();
        archive
            .by_name(entry)
            .with_context(|| format!("bundle missing {}", entry))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read {}", entry))?;
        if sha256_hex(&bytes) != expected {
            return Err(anyhow!("checksum mismatch for {}", entry));
        }
        restored.push((target, bytes));
    }

    std::fs::create_dir_all(workspace_path).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace_path.to_string_lossy()
        )
    })?;

    let mut restored_files = Vec::with_capacity(restored.len());
    for (dst, bytes) in restored {
        let mut tmp_name = dst.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".importing");
        let tmp_dst = dst.with_file_name(tmp_name);
        std::fs::write(&tmp_dst, &bytes).with_context(|| {
            format!("failed to write {}", tmp_dst.to_string_lossy())
        })?;
        std::fs::rename(&tmp_dst, &dst).with_context(|| {
            format!("failed to move restored file to {}", dst.to_string_lossy())
        })?;
        restored_files.push(dst.to_string_lossy().to_string());
    }

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        restored_files,
    })
}

// Entries map to plain file names inside the workspace; anything with a
// nested path is refused.
fn entry_target(workspace_path: &Path, entry: &str) -> anyhow::Result<PathBuf> {
    let name = entry
        .strip_prefix(CONFIG_ENTRY_DIR)
        .filter(|n| *n == CONFIG_FILE_NAME)
        .or_else(|| entry.strip_prefix(DATA_ENTRY_DIR))
        .ok_or_else(|| anyhow!("unexpected bundle entry {}", entry))?;
    let is_plain = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    if !is_plain || name == ".." {
        return Err(anyhow!("unsafe bundle entry {}", entry));
    }
    Ok(workspace_path.join(name))
}
