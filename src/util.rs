use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let mut file = File::create(path)
        .with_context(|| format!("failed to create jsonl file: {}", path.display()))?;

    for item in items {
        let line = serde_json::to_string(item)
            .with_context(|| format!("failed to serialize jsonl record: {}", path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to write jsonl file: {}", path.display()))?;
        file.write_all(b"\n")
            .with_context(|| format!("failed to write jsonl file: {}", path.display()))?;
    }

    Ok(())
}

pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read jsonl file: {}", path.display()))?;

    let mut items = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let item = serde_json::from_str(line).with_context(|| {
            format!("failed to parse jsonl line {} in {}", index + 1, path.display())
        })?;
        items.push(item);
    }

    Ok(items)
}

pub fn normalize_title(raw: &str) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    let mut dot_run = 0usize;

    for character in raw.chars() {
        if character == '.' {
            dot_run += 1;
            continue;
        }

        flush_dot_run(&mut collapsed, dot_run);
        dot_run = 0;
        collapsed.push(character);
    }
    flush_dot_run(&mut collapsed, dot_run);

    collapsed
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

fn flush_dot_run(out: &mut String, dot_run: usize) {
    if dot_run == 1 {
        out.push('.');
    } else if dot_run >= 2 {
        out.push(' ');
    }
}

pub fn level_of(section_id: &str) -> u32 {
    section_id.matches('.').count() as u32 + 1
}

pub fn parent_of(section_id: &str) -> Option<String> {
    section_id
        .rsplit_once('.')
        .map(|(parent, _)| parent.to_string())
}
