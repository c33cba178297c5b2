use anyhow::{Context, Result};
use std::path::PathBuf;

use chromaprep::dataset::{MANIFEST_FILENAME, METADATA_FILENAME};

/// Display information about a produced dataset directory
pub fn run(dir: PathBuf) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Not a dataset directory: {}", dir.display());
    }

    println!("chromaprep Dataset Information");
    println!("==============================");
    println!("Directory: {}", dir.display());
    println!();

    let metadata_path = dir.join(METADATA_FILENAME);
    if metadata_path.exists() {
        let content = std::fs::read_to_string(&metadata_path)
            .context("Failed to read metadata sidecar")?;
        let metadata: serde_json::Value =
            serde_json::from_str(&content).context("Failed to parse metadata sidecar")?;

        println!("Run Metadata:");
        if let Some(object) = metadata.as_object() {
            for (key, value) in object {
                println!("  {key}: {value}");
            }
        }
        println!();
    } else {
        println!("No {METADATA_FILENAME} sidecar found");
        println!();
    }

    let manifest_path = dir.join(MANIFEST_FILENAME);
    if manifest_path.exists() {
        let mut reader = csv::Reader::from_path(&manifest_path)
            .context("Failed to open manifest")?;

        let labeled = reader
            .headers()
            .map(|headers| headers.iter().any(|h| h == "Label"))
            .unwrap_or(false);
        let rows = reader.records().count();

        println!("Manifest:");
        println!("  Rows: {rows}");
        println!("  Label column: {}", if labeled { "yes" } else { "no" });
    } else {
        println!("No {MANIFEST_FILENAME} found");
    }

    Ok(())
}
