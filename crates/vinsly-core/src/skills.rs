//! Skills: directories under `.claude/skills` holding a `SKILL.md` manifest
//! and optional assets, plus their ZIP archive import/export.

use crate::bundle::{read_bounded, BundleLimits};
use crate::error::{Result, VinslyError};
use crate::frontmatter;
use crate::io::{atomic_write, ensure_dir};
use crate::paths::{self, SKILL_MANIFEST};
use crate::types::Scope;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MACOS_METADATA_PREFIX: &str = "__MACOSX";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillFile {
    /// Directory name.
    pub name: String,
    pub directory: String,
    /// Path of the `SKILL.md` manifest.
    pub path: String,
    pub content: String,
    pub scope: Scope,
    /// True when the directory holds anything besides the manifest.
    pub has_assets: bool,
}

impl SkillFile {
    /// `description` from the manifest frontmatter, if any.
    pub fn description(&self) -> Option<String> {
        let doc = frontmatter::parse(&self.content)?;
        doc.frontmatter
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

fn has_additional_assets(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        entry.file_type().is_ok_and(|ft| ft.is_dir()) || entry.file_name() != SKILL_MANIFEST
    })
}

fn skill_from_dir(dir: &Path, scope: Scope) -> Result<Option<SkillFile>> {
    let manifest = dir.join(SKILL_MANIFEST);
    if !dir.is_dir() || !manifest.is_file() {
        return Ok(None);
    }
    let Some(name) = dir.file_name().and_then(|s| s.to_str()) else {
        tracing::warn!(dir = %dir.display(), "skipping skill with non-UTF-8 name");
        return Ok(None);
    };

    Ok(Some(SkillFile {
        name: name.to_string(),
        directory: dir.to_string_lossy().into_owned(),
        path: manifest.to_string_lossy().into_owned(),
        content: std::fs::read_to_string(&manifest)?,
        scope,
        has_assets: has_additional_assets(dir),
    }))
}

fn read_skills_in(dir: &Path, scope: Scope) -> Result<Vec<SkillFile>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|ft| ft.is_dir()))
        .map(|e| e.path())
        .collect();
    dirs.sort();

    let mut skills = Vec::with_capacity(dirs.len());
    for dir in dirs {
        if let Some(skill) = skill_from_dir(&dir, scope)? {
            skills.push(skill);
        }
    }
    Ok(skills)
}

/// Skill directories for `scope`, sorted by name. Directories without a
/// manifest are ignored.
pub fn list_skills(scope: Scope, project: Option<&Path>) -> Result<Vec<SkillFile>> {
    read_skills_in(&paths::skills_dir(scope, project)?, scope)
}

pub fn list_skills_from_directory(directory: &Path) -> Result<Vec<SkillFile>> {
    read_skills_in(&paths::project_skills_dir(directory), Scope::Project)
}

// ---------------------------------------------------------------------------
// Write / delete
// ---------------------------------------------------------------------------

/// Write `<skills dir>/<name>/SKILL.md` and return the manifest path.
pub fn write_skill(
    scope: Scope,
    name: &str,
    content: &str,
    project: Option<&Path>,
) -> Result<PathBuf> {
    paths::validate_entry_name(name)?;
    let skills_dir = paths::skills_dir(scope, project)?;
    ensure_dir(&skills_dir)?;
    paths::ensure_path_in_skills_dir(&skills_dir)?;

    let manifest = skills_dir.join(name).join(SKILL_MANIFEST);
    atomic_write(&manifest, content.as_bytes())?;
    tracing::info!(path = %manifest.display(), "wrote skill");
    Ok(manifest)
}

/// Remove a skill directory. `path` may name the directory or any file in it.
pub fn delete_skill(path: &str) -> Result<()> {
    let path = paths::expand_path(path)?;
    let directory = if path.is_dir() {
        path
    } else {
        path.parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| VinslyError::NotFound(path.display().to_string()))?
    };
    if !directory.exists() {
        return Err(VinslyError::NotFound(directory.display().to_string()));
    }
    paths::ensure_path_in_skills_dir(&directory)?;
    std::fs::remove_dir_all(&directory)?;
    tracing::info!(dir = %directory.display(), "deleted skill");
    Ok(())
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Add `source` and everything below it to `zip`, rooted at `root_name/`.
fn add_tree<W: Write + Seek>(zip: &mut ZipWriter<W>, source: &Path, root_name: &str) -> Result<()> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| VinslyError::InvalidArchive(e.to_string()))?;
        let mut archive_path = PathBuf::from(root_name);
        if !relative.as_os_str().is_empty() {
            archive_path.push(relative);
        }
        let name = archive_path.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            zip.write_all(&std::fs::read(entry.path())?)?;
        }
    }
    Ok(())
}

fn dir_name(dir: &Path) -> Result<&str> {
    dir.file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| VinslyError::InvalidEntryName {
            name: dir.display().to_string(),
            reason: "skill directory has no usable name".to_string(),
        })
}

/// Zip one skill directory to `dest`. The archive holds a single root folder
/// named after the skill.
pub fn export_skill_directory(directory: &str, dest: &Path) -> Result<()> {
    let source = paths::expand_path(directory)?;
    if !source.is_dir() {
        return Err(VinslyError::NotFound(source.display().to_string()));
    }
    paths::ensure_path_in_skills_dir(&source)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    add_tree(&mut zip, &source, dir_name(&source)?)?;
    atomic_write(dest, &zip.finish()?.into_inner())?;
    tracing::info!(skill = %source.display(), dest = %dest.display(), "exported skill");
    Ok(())
}

/// Zip several skill directories into one archive, one root folder each.
/// Directories that no longer exist are skipped.
pub fn export_skills_archive(directories: &[String], dest: &Path) -> Result<()> {
    if directories.is_empty() {
        return Err(VinslyError::InvalidArchive(
            "no skill directories provided".to_string(),
        ));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut exported = 0usize;
    for directory in directories {
        let source = paths::expand_path(directory)?;
        if !source.exists() {
            tracing::debug!(dir = %source.display(), "skipping missing skill directory");
            continue;
        }
        paths::ensure_path_in_skills_dir(&source)?;
        add_tree(&mut zip, &source, dir_name(&source)?)?;
        exported += 1;
    }

    atomic_write(dest, &zip.finish()?.into_inner())?;
    tracing::info!(count = exported, dest = %dest.display(), "exported skills archive");
    Ok(())
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// First path component of an entry, or `None` for macOS metadata.
fn root_component(enclosed: &Path) -> Option<String> {
    match enclosed.components().next() {
        Some(Component::Normal(part)) => {
            let part = part.to_string_lossy().into_owned();
            (!part.starts_with(MACOS_METADATA_PREFIX)).then_some(part)
        }
        _ => None,
    }
}

/// `base/desired`, or `base/desired-1`, `base/desired-2`, ... whichever is free.
fn next_available_dir(base: &Path, desired: &str) -> PathBuf {
    let candidate = base.join(desired);
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|n| base.join(format!("{desired}-{n}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

fn archive_root<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let mut root: Option<String> = None;
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let Some(enclosed) = entry.enclosed_name() else {
            return Err(VinslyError::InvalidArchive(format!(
                "unsafe path '{}'",
                entry.name()
            )));
        };
        let Some(part) = root_component(&enclosed) else {
            continue;
        };
        match &root {
            Some(existing) if *existing != part => {
                return Err(VinslyError::InvalidArchive(
                    "archive must contain a single root folder (zip the skill directory)"
                        .to_string(),
                ))
            }
            Some(_) => {}
            None => root = Some(part),
        }
    }
    root.ok_or_else(|| VinslyError::InvalidArchive("archive missing skill folder".to_string()))
}

fn extract_into<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    target: &Path,
    limits: &BundleLimits,
) -> Result<()> {
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(enclosed) = entry.enclosed_name() else {
            continue;
        };
        if root_component(&enclosed).is_none() {
            continue;
        }
        let relative: PathBuf = enclosed.components().skip(1).collect();
        let output = target.join(relative);

        if entry.is_dir() {
            ensure_dir(&output)?;
            continue;
        }
        let name = entry.name().to_string();
        let too_large = |size: u64| VinslyError::TooLarge {
            what: name.clone(),
            size,
            limit: limits.max_file_bytes,
        };
        if entry.size() > limits.max_file_bytes {
            return Err(too_large(entry.size()));
        }
        // The declared size can lie; the read itself is capped too.
        let Some(bytes) = read_bounded(&mut entry, limits.max_file_bytes)? else {
            return Err(too_large(limits.max_file_bytes + 1));
        };
        if let Some(parent) = output.parent() {
            ensure_dir(parent)?;
        }
        std::fs::write(&output, bytes)?;
    }

    if !target.join(SKILL_MANIFEST).is_file() {
        return Err(VinslyError::InvalidArchive(format!(
            "archive did not contain {SKILL_MANIFEST}"
        )));
    }
    Ok(())
}

/// Unpack a skill archive into `base`, never overwriting an existing skill.
/// Returns the created directory. Nothing is left behind on failure.
pub fn extract_skill_archive(bytes: &[u8], base: &Path, limits: &BundleLimits) -> Result<PathBuf> {
    if bytes.len() as u64 > limits.max_archive_bytes {
        return Err(VinslyError::TooLarge {
            what: "archive".to_string(),
            size: bytes.len() as u64,
            limit: limits.max_archive_bytes,
        });
    }
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let root = archive_root(&mut archive)?;

    let target = next_available_dir(base, &root);
    ensure_dir(&target)?;
    if let Err(e) = extract_into(&mut archive, &target, limits) {
        if let Err(cleanup) = std::fs::remove_dir_all(&target) {
            tracing::warn!(dir = %target.display(), error = %cleanup, "failed to clean up partial skill");
        }
        return Err(e);
    }
    Ok(target)
}

/// Import a skill archive from disk into the skills directory for `scope`.
pub fn import_skill_archive(
    archive_path: &str,
    scope: Scope,
    project: Option<&Path>,
    limits: &BundleLimits,
) -> Result<PathBuf> {
    let archive_path = paths::expand_path(archive_path)?;
    if !archive_path.is_file() {
        return Err(VinslyError::NotFound(archive_path.display().to_string()));
    }
    let size = std::fs::metadata(&archive_path)?.len();
    if size > limits.max_archive_bytes {
        return Err(VinslyError::TooLarge {
            what: archive_path.display().to_string(),
            size,
            limit: limits.max_archive_bytes,
        });
    }

    let skills_dir = paths::skills_dir(scope, project)?;
    ensure_dir(&skills_dir)?;
    paths::ensure_path_in_skills_dir(&skills_dir)?;

    let bytes = std::fs::read(&archive_path)?;
    let target = extract_skill_archive(&bytes, &skills_dir, limits)?;
    tracing::info!(dir = %target.display(), "imported skill archive");
    Ok(target)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
