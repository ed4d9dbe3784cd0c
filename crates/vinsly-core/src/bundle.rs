//! ZIP bundles of agent definitions.
//!
//! An export holds one `<name>.md` entry per agent. Import walks the archive
//! entries in order and collects per-entry problems as readable strings rather
//! than failing the whole batch. Whole-input problems (oversized input, a
//! corrupt archive, a timeout) are returned as errors.

use crate::agent::{self, Agent};
use crate::error::{Result, VinslyError};
use crate::io::atomic_write;
use crate::paths;
use crate::types::Scope;
use serde::Serialize;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::time::Duration;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
pub const MAX_ARCHIVE_BYTES: u64 = 50 * 1024 * 1024;
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

const MACOS_METADATA_PREFIX: &str = "__MACOSX";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleLimits {
    pub max_file_bytes: u64,
    pub max_archive_bytes: u64,
    pub timeout: Duration,
}

impl Default for BundleLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: MAX_FILE_BYTES,
            max_archive_bytes: MAX_ARCHIVE_BYTES,
            timeout: OPERATION_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    pub documents: Vec<Agent>,
    /// One message per rejected entry, each prefixed with the entry name.
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Pack `agents` into a deflated ZIP, one `<name>.md` entry each.
///
/// Agents sharing a name collapse into one entry holding the last one's content.
pub fn export_agents(agents: &[Agent]) -> Result<Vec<u8>> {
    let mut entries: Vec<(String, String)> = Vec::with_capacity(agents.len());
    for a in agents {
        let file_name = a.file_name();
        let markdown = agent::agent_to_markdown(a)?;
        match entries.iter_mut().find(|(name, _)| *name == file_name) {
            Some(existing) => {
                tracing::debug!(entry = %file_name, "overwriting duplicate bundle entry");
                existing.1 = markdown;
            }
            None => entries.push((file_name, markdown)),
        }
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, markdown) in &entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(markdown.as_bytes())?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Write an agent bundle to `dest` atomically.
pub fn export_agents_to_file(agents: &[Agent], dest: &Path) -> Result<()> {
    let bytes = export_agents(agents)?;
    atomic_write(dest, &bytes)?;
    tracing::info!(count = agents.len(), dest = %dest.display(), "exported agent bundle");
    Ok(())
}

/// Write a single agent as a standalone markdown file.
pub fn export_agent_file(agent: &Agent, dest: &Path) -> Result<()> {
    let markdown = agent::agent_to_markdown(agent)?;
    atomic_write(dest, markdown.as_bytes())
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Read at most `limit` bytes from `reader`. `Ok(None)` means the stream
/// held more than that, whatever size its header declared.
pub(crate) fn read_bounded<R: Read>(reader: R, limit: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut buf)?;
    Ok((buf.len() as u64 <= limit).then_some(buf))
}

fn check_size(what: &str, size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(VinslyError::TooLarge {
            what: what.to_string(),
            size,
            limit,
        });
    }
    Ok(())
}

/// Unpack a bundle produced by [`export_agents`] (or any ZIP of agent files).
///
/// Directories, non-markdown entries and macOS metadata are skipped without
/// comment. Every other entry either becomes an [`Agent`] or adds one message
/// to [`ImportResult::errors`].
pub fn import_agents(bytes: &[u8], scope: Scope, limits: &BundleLimits) -> Result<ImportResult> {
    check_size("archive", bytes.len() as u64, limits.max_archive_bytes)?;

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut result = ImportResult::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_dir() || !name.ends_with(".md") || name.starts_with(MACOS_METADATA_PREFIX) {
            continue;
        }

        let oversized = format!("{name}: File exceeds {} bytes", limits.max_file_bytes);
        if entry.size() > limits.max_file_bytes {
            tracing::warn!(entry = %name, size = entry.size(), "skipping oversized bundle entry");
            result.errors.push(oversized);
            continue;
        }

        let text = match read_bounded(&mut entry, limits.max_file_bytes) {
            Ok(Some(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    result.errors.push(format!("{name}: Failed to read entry"));
                    continue;
                }
            },
            Ok(None) => {
                tracing::warn!(entry = %name, "bundle entry inflated past its declared size");
                result.errors.push(oversized);
                continue;
            }
            Err(e) => {
                tracing::warn!(entry = %name, error = %e, "failed to read bundle entry");
                result.errors.push(format!("{name}: Failed to read entry"));
                continue;
            }
        };

        if !agent::has_valid_definition(&text) {
            result.errors.push(format!(
                "{name}: Missing required frontmatter (name and description)"
            ));
            continue;
        }

        match agent::to_agent(&text, &name, scope, None) {
            Some(a) => match paths::validate_entry_name(&a.name) {
                Ok(()) => result.documents.push(a),
                Err(VinslyError::InvalidEntryName { name: bad, reason }) => result
                    .errors
                    .push(format!("{name}: Invalid agent name '{bad}': {reason}")),
                Err(e) => result.errors.push(format!("{name}: {e}")),
            },
            None => result.errors.push(format!("{name}: Failed to parse agent")),
        }
    }

    tracing::info!(
        imported = result.documents.len(),
        rejected = result.errors.len(),
        "imported agent bundle"
    );
    Ok(result)
}

/// Parse a single agent markdown file's bytes.
pub fn import_agent_bytes(
    bytes: &[u8],
    file_name: &str,
    scope: Scope,
    explicit_path: Option<&str>,
    limits: &BundleLimits,
) -> Result<Option<Agent>> {
    check_size(file_name, bytes.len() as u64, limits.max_file_bytes)?;
    let text = String::from_utf8_lossy(bytes);
    Ok(agent::to_agent(&text, file_name, scope, explicit_path))
}

// ---------------------------------------------------------------------------
// Async file entry points
// ---------------------------------------------------------------------------

/// Await `fut`, failing with [`VinslyError::Timeout`] once `limit` elapses.
async fn within<F: std::future::Future>(limit: Duration, what: String, fut: F) -> Result<F::Output> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| VinslyError::Timeout(what))
}

/// Read a file after checking its size, giving up after `limits.timeout`.
pub async fn read_limited(path: &Path, limit: u64, limits: &BundleLimits) -> Result<Vec<u8>> {
    let meta = tokio::fs::metadata(path).await?;
    check_size(&path.display().to_string(), meta.len(), limit)?;
    let what = format!("reading {}", path.display());
    Ok(within(limits.timeout, what, tokio::fs::read(path)).await??)
}

/// Import an agent bundle from disk.
pub async fn import_archive_file(
    path: &Path,
    scope: Scope,
    limits: BundleLimits,
) -> Result<ImportResult> {
    let bytes = read_limited(path, limits.max_archive_bytes, &limits).await?;
    let task = tokio::task::spawn_blocking(move || import_agents(&bytes, scope, &limits));
    let what = format!("opening archive {}", path.display());
    within(limits.timeout, what, task)
        .await?
        .map_err(|e| VinslyError::Join(e.to_string()))?
}

/// Import one agent markdown file from disk. `Ok(None)` means the file is not
/// a valid agent definition.
pub async fn import_agent_file(
    path: &Path,
    scope: Scope,
    limits: BundleLimits,
) -> Result<Option<Agent>> {
    let bytes = read_limited(path, limits.max_file_bytes, &limits).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let path_str = path.to_string_lossy();
    import_agent_bytes(&bytes, &file_name, scope, Some(&path_str), &limits)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn agent_md(name: &str, description: &str) -> String {
        format!("---\nname: {name}\ndescription: {description}\n---\n\nBody of {name}.")
    }

    fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap().into_inner()
    }

    fn sample(name: &str) -> Agent {
        agent::to_agent(&agent_md(name, "does things"), "x.md", Scope::Global, None).unwrap()
    }

    #[test]
    fn export_then_import_roundtrip() {
        let agents = vec![sample("alpha"), sample("beta")];
        let bytes = export_agents(&agents).unwrap();
        let result = import_agents(&bytes, Scope::Global, &BundleLimits::default()).unwrap();
        assert!(result.errors.is_empty());
        assert_eq!(result.documents, agents);
    }

    #[test]
    fn export_duplicate_names_last_wins() {
        let first = sample("dup");
        let mut second = sample("dup");
        second.body = "Replacement body.".into();
        let bytes = export_agents(&[first, second]).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(archive.len(), 1);
        let mut text = String::new();
        archive.by_index(0).unwrap().read_to_string(&mut text).unwrap();
        assert!(text.ends_with("Replacement body."));
    }

    #[test]
    fn import_partial_failure() {
        let good = agent_md("good", "fine");
        let bytes = zip_of(&[
            ("good.md", good.as_str()),
            ("broken.md", "---\nname: broken\n---\nno description"),
            ("notes.txt", "not markdown"),
            ("nested/", ""),
        ]);
        let result = import_agents(&bytes, Scope::Project, &BundleLimits::default()).unwrap();
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].name, "good");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("broken.md"));
        assert!(result.errors[0].contains("Missing required frontmatter"));
    }

    #[test]
    fn import_empty_archive() {
        let bytes = zip_of(&[]);
        let result = import_agents(&bytes, Scope::Project, &BundleLimits::default()).unwrap();
        assert!(result.documents.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn import_keeps_entry_order() {
        let b = agent_md("b", "second");
        let a = agent_md("a", "first");
        let bytes = zip_of(&[("b.md", b.as_str()), ("a.md", a.as_str())]);
        let result = import_agents(&bytes, Scope::Project, &BundleLimits::default()).unwrap();
        let names: Vec<_> = result.documents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn import_skips_macos_metadata() {
        let bytes = zip_of(&[("__MACOSX/._a.md", "\0\0binary")]);
        let result = import_agents(&bytes, Scope::Project, &BundleLimits::default()).unwrap();
        assert!(result.errors.is_empty());
    }

    #[test]
    fn import_rejects_oversized_archive_before_parsing() {
        let limits = BundleLimits {
            max_archive_bytes: 4,
            ..BundleLimits::default()
        };
        let err = import_agents(b"not even a zip", Scope::Project, &limits).unwrap_err();
        assert!(matches!(err, VinslyError::TooLarge { .. }));
    }

    #[test]
    fn import_rejects_garbage() {
        let err = import_agents(b"garbage", Scope::Project, &BundleLimits::default()).unwrap_err();
        assert!(matches!(err, VinslyError::Zip(_)));
    }

    #[test]
    fn import_flags_oversized_entries() {
        let big = agent_md("big", &"x".repeat(64));
        let ok = agent_md("ok", "small");
        let bytes = zip_of(&[("big.md", big.as_str()), ("ok.md", ok.as_str())]);
        let limits = BundleLimits {
            max_file_bytes: 60,
            ..BundleLimits::default()
        };
        let result = import_agents(&bytes, Scope::Project, &limits).unwrap();
        assert_eq!(result.documents.len(), 1);
        assert!(result.errors[0].starts_with("big.md:"));
    }

    #[tokio::test]
    async fn import_archive_file_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agents.zip");
        export_agents_to_file(&[sample("disk")], &path).unwrap();

        let result = import_archive_file(&path, Scope::Global, BundleLimits::default())
            .await
            .unwrap();
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].name, "disk");
    }

    #[tokio::test]
    async fn import_agent_file_uses_real_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("solo.md");
        export_agent_file(&sample("solo"), &path).unwrap();

        let a = import_agent_file(&path, Scope::Project, BundleLimits::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.path, path.to_string_lossy());
    }

    #[tokio::test]
    async fn oversized_file_rejected_before_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.md");
        std::fs::write(&path, vec![b'a'; 128]).unwrap();
        let limits = BundleLimits {
            max_file_bytes: 16,
            ..BundleLimits::default()
        };
        let err = import_agent_file(&path, Scope::Project, limits).await.unwrap_err();
        assert!(matches!(err, VinslyError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn stalled_work_times_out() {
        let err = within(Duration::ZERO, "reading x".into(), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(matches!(&err, VinslyError::Timeout(what) if what == "reading x"));
    }

    #[tokio::test]
    async fn finished_work_beats_the_deadline() {
        let out = within(Duration::from_secs(5), "x".into(), async { 7 }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn zero_timeout_fails_archive_import() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agents.zip");
        export_agents_to_file(&[sample("alpha")], &path).unwrap();
        let limits = BundleLimits {
            timeout: Duration::ZERO,
            ..BundleLimits::default()
        };
        // A tiny archive can finish before the timer fires.
        match import_archive_file(&path, Scope::Project, limits).await {
            Err(VinslyError::Timeout(what)) => assert!(what.contains("agents.zip")),
            Ok(result) => assert_eq!(result.documents.len(), 1),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bounded_read_caps_at_limit() {
        let data = vec![b'x'; 32];
        assert_eq!(read_bounded(data.as_slice(), 32).unwrap().unwrap().len(), 32);
        assert!(read_bounded(data.as_slice(), 31).unwrap().is_none());
        assert!(read_bounded(&b""[..], 0).unwrap().unwrap().is_empty());
    }

    #[test]
    fn import_rejects_unsafe_agent_names() {
        let good = agent_md("good", "fine");
        let nested = agent_md("team/reviewer", "escapes the agents dir");
        let dotted = agent_md("..", "parent");
        let bytes = zip_of(&[
            ("good.md", good.as_str()),
            ("nested.md", nested.as_str()),
            ("dotted.md", dotted.as_str()),
        ]);
        let result = import_agents(&bytes, Scope::Project, &BundleLimits::default()).unwrap();
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].name, "good");
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].starts_with("nested.md: Invalid agent name 'team/reviewer'"));
        assert!(result.errors[1].starts_with("dotted.md: Invalid agent name '..'"));
    }
}
