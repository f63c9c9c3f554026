//! Build cache loader.
//!
//! Best-effort restore of a saved layer archive. Every failure is folded
//! into `CacheOutcome::Error`; this step never fails a run.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::adapters::DockerCli;
use crate::domain::{CacheKey, CacheOutcome};

use super::{Session, StepContext};

/// Archive file extension inside the cache directory
const ARCHIVE_EXT: &str = "tar";

/// Hash the contents of every file matching `patterns` under `root`.
///
/// Files are visited in sorted path order so the hash is stable. Returns
/// the first 16 hex chars of the SHA-256.
pub fn content_hash(root: &Path, patterns: &[String]) -> Result<String> {
    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let full = root.join(pattern);
        let full = full.to_string_lossy();
        for entry in glob::glob(&full).with_context(|| format!("Invalid glob: {}", pattern))? {
            let path = entry.context("Failed to read glob entry")?;
            if path.is_file() {
                files.push(path);
            }
        }
    }

    files.sort();
    files.dedup();

    let mut hasher = Sha256::new();
    for path in &files {
        let relative = path.strip_prefix(root).unwrap_or(path);
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        let contents = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        hasher.update(&contents);
    }

    let digest = hasher.finalize();
    Ok(hex::encode(&digest[..8]))
}

/// Find the archive to restore: exact key first, then the newest archive
/// matching each prefix in turn
pub fn find_archive(cache_dir: &Path, key: &CacheKey) -> Result<Option<(String, PathBuf)>> {
    let exact = cache_dir.join(format!("{}.{}", key.primary, ARCHIVE_EXT));
    if exact.is_file() {
        return Ok(Some((key.primary.clone(), exact)));
    }

    if !cache_dir.is_dir() {
        return Ok(None);
    }

    let mut archives: Vec<(String, PathBuf, SystemTime)> = Vec::new();
    for entry in std::fs::read_dir(cache_dir)
        .with_context(|| format!("Failed to list {}", cache_dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXT) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        archives.push((stem.to_string(), path, modified));
    }

    for prefix in &key.restore_prefixes {
        let newest = archives
            .iter()
            .filter(|(stem, _, _)| stem.starts_with(prefix.as_str()))
            .max_by_key(|(_, _, modified)| *modified);

        if let Some((stem, path, _)) = newest {
            return Ok(Some((stem.clone(), path.clone())));
        }
    }

    Ok(None)
}

/// Compute the cache key for this run
pub fn cache_key(ctx: &StepContext<'_>) -> Result<CacheKey> {
    let hash = content_hash(ctx.workspace, &ctx.settings.cache.hash_globs)?;
    Ok(CacheKey::new(
        ctx.config.client_code(),
        ctx.config.environment(),
        &hash,
    ))
}

async fn try_restore(ctx: &StepContext<'_>, session: &Session) -> Result<CacheOutcome> {
    let key = cache_key(ctx)?;
    debug!(key = %key.primary, "Looking up layer cache");

    let Some((matched, archive)) = find_archive(&ctx.settings.cache_dir, &key)? else {
        return Ok(CacheOutcome::Miss);
    };

    let spec = DockerCli::new(&ctx.settings.tools.docker).load(&archive).envs(session.env());
    ctx.runner.run_checked(&spec, ctx.timeout).await?;

    Ok(CacheOutcome::Restored { key: matched })
}

/// Restore the layer cache; never returns an error
pub async fn restore_cache(ctx: &StepContext<'_>, session: &Session) -> CacheOutcome {
    match try_restore(ctx, session).await {
        Ok(outcome) => {
            info!(outcome = %outcome.summary(), "Layer cache lookup finished");
            outcome
        }
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Layer cache restore failed, continuing without cache");
            CacheOutcome::Error {
                message: format!("{:#}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_is_stable_and_content_sensitive() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Dockerfile"), "FROM python:3.11").unwrap();
        std::fs::create_dir_all(temp.path().join("flows")).unwrap();
        std::fs::write(temp.path().join("flows/main.py"), "print('hi')").unwrap();

        let patterns = vec!["Dockerfile".to_string(), "**/*.py".to_string()];
        let first = content_hash(temp.path(), &patterns).unwrap();
        let second = content_hash(temp.path(), &patterns).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 16);

        std::fs::write(temp.path().join("flows/main.py"), "print('bye')").unwrap();
        assert_ne!(first, content_hash(temp.path(), &patterns).unwrap());
    }

    #[test]
    fn test_exact_key_preferred() {
        let temp = TempDir::new().unwrap();
        let key = CacheKey::new("pkt", "stg", "abc");
        std::fs::write(temp.path().join(format!("{}.tar", key.primary)), "x").unwrap();
        std::fs::write(temp.path().join("datateer-docker-pipeline-pkt-stg-old.tar"), "x").unwrap();

        let (matched, _) = find_archive(temp.path(), &key).unwrap().unwrap();
        assert_eq!(matched, "datateer-docker-pipeline-pkt-stg-abc");
    }

    #[test]
    fn test_prefix_fallback_by_specificity() {
        let temp = TempDir::new().unwrap();
        let key = CacheKey::new("pkt", "stg", "abc");
        std::fs::write(temp.path().join("datateer-docker-pipeline-pkt-prd-111.tar"), "x").unwrap();
        std::fs::write(temp.path().join("datateer-docker-pipeline-other-stg-222.tar"), "x").unwrap();

        // No pkt-stg archive, so the client-level prefix matches
        let (matched, _) = find_archive(temp.path(), &key).unwrap().unwrap();
        assert_eq!(matched, "datateer-docker-pipeline-pkt-prd-111");
    }

    #[test]
    fn test_missing_cache_dir_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let key = CacheKey::new("pkt", "stg", "abc");
        assert!(find_archive(&temp.path().join("nope"), &key).unwrap().is_none());
    }
}
