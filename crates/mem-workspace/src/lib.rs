//! # mem-workspace
//!
//! Workspace resolver (C2): derives and normalizes a workspace identifier
//! for tagging memory points, with in-memory TTL caching.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;

const RESERVED: &[&str] =
    &["system", "metadata", "admin", "internal", "default", "null", "undefined", "root"];

static VALID_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid regex"));
static INVALID_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_-]+").expect("valid regex"));
static REPEATED_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid regex"));

/// How the caller wishes to supply an explicit workspace for this call.
/// Distinct from "not provided", which continues the resolution chain.
#[derive(Debug, Clone)]
pub enum Explicit {
    NotProvided,
    None,
    Value(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Explicit,
    Cache,
    Manifest,
    Cwd,
    Default,
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub value: Option<String>,
    pub source: Source,
}

/// 1–100 chars, `[a-zA-Z0-9_-]+`, not reserved (case-insensitive).
#[must_use]
pub fn validate(name: &str) -> bool {
    (1..=100).contains(&name.len())
        && VALID_SLUG.is_match(name)
        && !RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

#[must_use]
pub fn normalize_for_storage(name: &str) -> String {
    name.to_lowercase()
}

/// Strip a `@scope/` prefix, strip a leading `mcp-` prefix, replace
/// characters outside `[a-zA-Z0-9_-]` with `-`, collapse repeats, trim.
#[must_use]
pub fn normalize_manifest_name(raw: &str) -> String {
    let without_scope = raw.split_once('/').map_or(raw, |(scope, rest)| {
        if scope.starts_with('@') { rest } else { raw }
    });
    let without_prefix = without_scope.strip_prefix("mcp-").unwrap_or(without_scope);
    let replaced = INVALID_CHAR.replace_all(without_prefix, "-");
    let collapsed = REPEATED_DASH.replace_all(&replaced, "-");
    collapsed.trim_matches('-').to_string()
}

struct CacheEntry {
    value: Option<String>,
    source: Source,
    cached_at: Instant,
}

pub struct WorkspaceResolver {
    ttl: Duration,
    default: Option<String>,
    cache: Mutex<Option<CacheEntry>>,
}

impl WorkspaceResolver {
    #[must_use]
    pub fn new(ttl: Duration, default: Option<String>) -> Self {
        Self { ttl, default, cache: Mutex::new(None) }
    }

    pub fn clear(&self) {
        *self.cache.lock().expect("cache mutex poisoned") = None;
    }

    /// Resolve the priority chain: explicit → fresh cache → nearest
    /// ancestor manifest → cwd basename → configured default.
    pub fn resolve(&self, explicit: Explicit, start_dir: &Path) -> Result<Resolved, String> {
        match explicit {
            Explicit::Value(value) => {
                if !validate(&value) {
                    return Err(format!("invalid workspace '{value}'"));
                }
                let normalized = normalize_for_storage(&value);
                self.store(Some(normalized.clone()), Source::Explicit);
                return Ok(Resolved { value: Some(normalized), source: Source::Explicit });
            }
            Explicit::None => {
                return Ok(Resolved { value: None, source: Source::Explicit });
            }
            Explicit::NotProvided => {}
        }

        if let Some(cached) = self.fresh_cache() {
            return Ok(cached);
        }

        if let Some(name) = nearest_manifest_name(start_dir, 5) {
            let normalized = normalize_for_storage(&normalize_manifest_name(&name));
            if validate(&normalized) {
                self.store(Some(normalized.clone()), Source::Manifest);
                return Ok(Resolved { value: Some(normalized), source: Source::Manifest });
            }
        }

        if let Some(basename) = start_dir.file_name().and_then(|n| n.to_str()) {
            let normalized = normalize_for_storage(basename);
            if validate(&normalized) {
                self.store(Some(normalized.clone()), Source::Cwd);
                return Ok(Resolved { value: Some(normalized), source: Source::Cwd });
            }
        }

        let value = self.default.clone();
        self.store(value.clone(), Source::Default);
        Ok(Resolved { value, source: Source::Default })
    }

    fn fresh_cache(&self) -> Option<Resolved> {
        let guard = self.cache.lock().expect("cache mutex poisoned");
        let entry = guard.as_ref()?;
        if entry.cached_at.elapsed() <= self.ttl {
            Some(Resolved { value: entry.value.clone(), source: Source::Cache })
        } else {
            None
        }
    }

    fn store(&self, value: Option<String>, source: Source) {
        *self.cache.lock().expect("cache mutex poisoned") =
            Some(CacheEntry { value, source, cached_at: Instant::now() });
    }
}

/// Walk up to `max_parents` ancestors looking for `package.json` (`name`)
/// or `Cargo.toml` (`[package] name`).
fn nearest_manifest_name(start: &Path, max_parents: usize) -> Option<String> {
    let mut dir = Some(start.to_path_buf());
    for _ in 0..=max_parents {
        let current = dir.as_ref()?;
        if let Some(name) = read_package_json_name(current).or_else(|| read_cargo_toml_name(current)) {
            return Some(name);
        }
        dir = current.parent().map(Path::to_path_buf);
    }
    None
}

fn read_package_json_name(dir: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(dir.join("package.json")).ok()?;
    let value: serde_json::Value = serde_json::from_str(&contents).ok()?;
    value.get("name")?.as_str().map(str::to_string)
}

fn read_cargo_toml_name(dir: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(dir.join("Cargo.toml")).ok()?;
    let value: toml::Value = contents.parse().ok()?;
    value.get("package")?.get("name")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_plain_slug() {
        assert!(validate("my-project_1"));
    }

    #[test]
    fn validate_rejects_reserved_names_case_insensitively() {
        assert!(!validate("Default"));
        assert!(!validate("SYSTEM"));
    }

    #[test]
    fn validate_rejects_invalid_characters() {
        assert!(!validate("my project"));
        assert!(!validate(""));
    }

    #[test]
    fn normalize_manifest_name_strips_scope_and_prefix() {
        assert_eq!(normalize_manifest_name("@acme/mcp-memory-tools"), "memory-tools");
    }

    #[test]
    fn normalize_manifest_name_collapses_invalid_chars() {
        assert_eq!(normalize_manifest_name("My Cool!!Project"), "My-Cool-Project");
    }

    #[test]
    fn explicit_none_short_circuits_without_touching_cache() {
        let resolver = WorkspaceResolver::new(Duration::from_secs(60), None);
        let resolved = resolver.resolve(Explicit::None, Path::new("/tmp")).unwrap();
        assert!(resolved.value.is_none());
        assert_eq!(resolved.source, Source::Explicit);
    }

    #[test]
    fn explicit_value_is_validated_and_normalized() {
        let resolver = WorkspaceResolver::new(Duration::from_secs(60), None);
        let resolved = resolver.resolve(Explicit::Value("MyProj".to_string()), Path::new("/tmp")).unwrap();
        assert_eq!(resolved.value.as_deref(), Some("myproj"));
    }

    #[test]
    fn explicit_invalid_value_is_rejected() {
        let resolver = WorkspaceResolver::new(Duration::from_secs(60), None);
        assert!(resolver.resolve(Explicit::Value("default".to_string()), Path::new("/tmp")).is_err());
    }

    #[test]
    fn falls_back_to_configured_default_when_cwd_invalid() {
        let resolver = WorkspaceResolver::new(Duration::from_secs(60), Some("fallback".to_string()));
        // "/" has no file_name and no manifests, so it must hit the default.
        let resolved = resolver.resolve(Explicit::NotProvided, Path::new("/")).unwrap();
        assert_eq!(resolved.value.as_deref(), Some("fallback"));
        assert_eq!(resolved.source, Source::Default);
    }

    #[test]
    fn clear_invalidates_the_cache() {
        let resolver = WorkspaceResolver::new(Duration::from_secs(60), Some("fallback".to_string()));
        resolver.resolve(Explicit::NotProvided, Path::new("/")).unwrap();
        resolver.clear();
        let resolved = resolver.resolve(Explicit::NotProvided, Path::new("/")).unwrap();
        assert_eq!(resolved.source, Source::Default);
    }

    #[test]
    fn manifest_lookup_reads_cargo_toml_package_name() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Cargo.toml"), "[package]\nname = \"my-workspace\"\n").unwrap();
        let resolver = WorkspaceResolver::new(Duration::from_secs(60), None);
        let resolved = resolver.resolve(Explicit::NotProvided, tmp.path()).unwrap();
        assert_eq!(resolved.value.as_deref(), Some("my-workspace"));
        assert_eq!(resolved.source, Source::Manifest);
    }
}
