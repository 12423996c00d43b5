// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "RADWATCH_SOURCES_PATH";

/// The closed set of source tags the deployment knows about. Records
/// carrying an unlisted tag are still processed (the normalizer is
/// total) but logged as unexpected.
pub fn default_known_sources() -> Vec<String> {
    [
        "fda-device-recall",
        "fda-drug-recall",
        "fda-drug-shortage",
        "ashp-shortage",
        "cms-pfs",
        "federal-register",
        "cdph",
        "rhb",
        "mbc",
        "vendor-advisory",
        "payer-bulletin",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Load the known-source list from an explicit path. TOML or JSON.
pub fn load_sources_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading source list from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load using env var + fallbacks:
/// 1) $RADWATCH_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) built-in defaults
pub fn load_sources_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("RADWATCH_SOURCES_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(default_known_sources())
}

pub fn is_known_source<S: AsRef<str>>(tag: S, known: &[String]) -> bool {
    let s = tag.as_ref();
    known.iter().any(|k| k.eq_ignore_ascii_case(s))
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("sources");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported source list format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<String>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() {
            set.insert(t.to_string());
        }
    }
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn dedup_trim_and_formats_work() {
        let toml = r#"sources = [" cdph ", "", "rhb", "rhb"]"#;
        let json = r#"["mbc", "  cms-pfs  ", ""]"#;
        let toml_out = parse_toml(toml).unwrap();
        assert_eq!(toml_out, vec!["cdph".to_string(), "rhb".to_string()]);
        let json_out = parse_json(json).unwrap();
        assert_eq!(json_out, vec!["cms-pfs".to_string(), "mbc".to_string()]);
    }

    #[test]
    fn known_source_matching_is_case_insensitive() {
        let known = default_known_sources();
        assert!(is_known_source("FDA-Device-Recall", &known));
        assert!(is_known_source("cms-pfs", &known));
        assert!(!is_known_source("unknown-feed", &known));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so a real config/ in the repo does not interfere.
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);

        // No files in temp CWD: built-in defaults.
        let v = load_sources_default().unwrap();
        assert_eq!(v, default_known_sources());

        // Env var takes precedence.
        let p_json = tmp.path().join("sources.json");
        fs::write(&p_json, r#"["cdph"]"#).unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        let v2 = load_sources_default().unwrap();
        assert_eq!(v2, vec!["cdph".to_string()]);
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
