//! # Institution Registry
//! Canonical institution profiles and the text matcher. Profiles are loaded
//! from TOML (file path overridable via env, embedded default otherwise) and
//! compiled into one case-insensitive, word-boundary alternation per
//! institution. Matching is deterministic and independent of profile order.
//!
//! The registry also owns the India-market keyword list used for the
//! per-article linkage weight.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const DEFAULT_INSTITUTIONS_PATH: &str = "config/institutions.toml";
pub const ENV_INSTITUTIONS_PATH: &str = "INSTITUTIONS_CONFIG_PATH";

/// Embedded default registry, used when no config file is present.
const DEFAULT_REGISTRY_TOML: &str = include_str!("../config/institutions.toml");

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    india_keywords: Vec<String>,
    #[serde(default, rename = "institution")]
    institutions: Vec<ProfileEntry>,
}

#[derive(Debug, Deserialize)]
struct ProfileEntry {
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
}

/// One tracked institution: canonical name, aliases, compiled matcher.
#[derive(Debug, Clone)]
pub struct InstitutionProfile {
    pub canonical_name: String,
    pub aliases: Vec<String>,
    pattern: Regex,
}

impl InstitutionProfile {
    fn compile(name: &str, aliases: &[String]) -> Result<Self> {
        let mut alts: Vec<String> = Vec::with_capacity(aliases.len() + 1);
        alts.push(regex::escape(name));
        alts.extend(aliases.iter().map(|a| regex::escape(a)));
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alts.join("|")))
            .with_context(|| format!("compiling matcher for {name}"))?;
        Ok(Self {
            canonical_name: name.to_string(),
            aliases: aliases.to_vec(),
            pattern,
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Read-only registry shared across computations.
#[derive(Debug)]
pub struct InstitutionRegistry {
    profiles: Vec<InstitutionProfile>,
    india_patterns: Vec<Regex>,
}

impl InstitutionRegistry {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(raw).context("parsing institutions toml")?;
        let mut profiles = Vec::with_capacity(file.institutions.len());
        for entry in &file.institutions {
            profiles.push(InstitutionProfile::compile(&entry.name, &entry.aliases)?);
        }
        let india_patterns = file
            .india_keywords
            .iter()
            .map(|kw| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(kw)))
                    .with_context(|| format!("compiling india keyword {kw}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            profiles,
            india_patterns,
        })
    }

    /// Load from `INSTITUTIONS_CONFIG_PATH`, then the default path, then the
    /// embedded registry. A malformed file on disk is an error, not a
    /// silent fallback.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_INSTITUTIONS_PATH)
            .unwrap_or_else(|_| DEFAULT_INSTITUTIONS_PATH.to_string());
        if Path::new(&path).exists() {
            let raw =
                fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            return Self::from_toml_str(&raw);
        }
        Self::from_toml_str(DEFAULT_REGISTRY_TOML)
    }

    pub fn profiles(&self) -> &[InstitutionProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Canonical names of every institution mentioned in `text`.
    ///
    /// The result is an ordered set, so the outcome never depends on the
    /// iteration order of the profiles.
    pub fn match_text(&self, text: &str) -> BTreeSet<String> {
        self.profiles
            .iter()
            .filter(|p| p.matches(text))
            .map(|p| p.canonical_name.clone())
            .collect()
    }

    /// Total occurrence count of India-market keywords in `text`.
    /// Every occurrence counts; there is no per-article cap.
    pub fn india_linkage(&self, text: &str) -> u32 {
        self.india_patterns
            .iter()
            .map(|re| re.find_iter(text).count() as u32)
            .sum()
    }
}
