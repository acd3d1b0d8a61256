//! Site configuration (component J / ambient stack, §4.10 SPEC_FULL). Loads
//! the TOML-sourced `SiteConfig`, layering an explicit site config over
//! built-in defaults with `utils::merge`, the way the teacher layers
//! `_config.toml` over its own defaults.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Deserialize;
use toml::Value as TomlValue;

use crate::utils::{merge, MergeError};

#[derive(Debug, Clone, Deserialize)]
pub struct RawMenuEntry {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub weight: i64,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOutputFormat {
    pub name: String,
    #[serde(rename = "mediaType")]
    pub media_type: String,
    #[serde(rename = "baseName", default = "default_base_name")]
    pub base_name: String,
    #[serde(rename = "isPlainText", default)]
    pub is_plain_text: bool,
}

fn default_base_name() -> String {
    "index".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    #[serde(rename = "languageCode")]
    pub language_code: String,
    pub copyright: String,
    pub params: TomlValue,
    pub menus: BTreeMap<String, Vec<RawMenuEntry>>,
    pub taxonomies: BTreeMap<String, String>,
    #[serde(rename = "outputFormats")]
    pub output_formats: Vec<RawOutputFormat>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            base_url: "/".to_string(),
            language_code: "en".to_string(),
            copyright: String::new(),
            params: TomlValue::Table(Default::default()),
            menus: BTreeMap::new(),
            taxonomies: default_taxonomies(),
            output_formats: vec![RawOutputFormat {
                name: "HTML".to_string(),
                media_type: "text/html".to_string(),
                base_name: "index".to_string(),
                is_plain_text: false,
            }],
        }
    }
}

fn default_taxonomies() -> BTreeMap<String, String> {
    let mut m = BTreeMap::new();
    m.insert("tag".to_string(), "tags".to_string());
    m.insert("category".to_string(), "categories".to_string());
    m
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(toml::de::Error),
    Merge(MergeError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "invalid site config: {}", e),
            ConfigError::Merge(_) => write!(f, "site config merge conflict: mismatched types"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parses `text` as TOML and layers it over `SiteConfig::default()` via
/// `utils::merge`, so an explicit config need only set what it overrides.
pub fn load(text: &str) -> Result<SiteConfig, ConfigError> {
    let mut base = toml::Value::try_from(SiteConfig::default()).expect("default SiteConfig always serializes");
    let overrides: TomlValue = toml::from_str(text).map_err(ConfigError::Parse)?;
    merge(&mut base, &overrides).map_err(ConfigError::Merge)?;
    base.try_into().map_err(ConfigError::Parse)
}

pub fn params_to_dict(params: &TomlValue) -> IndexMap<String, crate::value::TemplateValue> {
    let mut out = IndexMap::new();
    if let TomlValue::Table(table) = params {
        for (k, v) in table {
            out.insert(k.clone(), toml_to_template_value(v));
        }
    }
    out
}

fn toml_to_template_value(v: &TomlValue) -> crate::value::TemplateValue {
    use crate::value::TemplateValue;
    match v {
        TomlValue::String(s) => TemplateValue::String(s.clone()),
        TomlValue::Integer(i) => TemplateValue::Number(*i),
        TomlValue::Float(f) => TemplateValue::String(f.to_string()),
        TomlValue::Boolean(b) => TemplateValue::Bool(*b),
        TomlValue::Array(arr) => TemplateValue::AnyArray(arr.iter().map(toml_to_template_value).collect()),
        TomlValue::Table(t) => {
            let mut d = IndexMap::new();
            for (k, v) in t {
                d.insert(k.clone(), toml_to_template_value(v));
            }
            TemplateValue::new_dict(d)
        }
        TomlValue::Datetime(dt) => TemplateValue::String(dt.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_title_and_base_url() {
        let cfg = load(r#"title = "My Site"
baseURL = "https://example.com/""#)
            .unwrap();
        assert_eq!(cfg.title, "My Site");
        assert_eq!(cfg.base_url, "https://example.com/");
    }

    #[test]
    fn defaults_survive_when_unset() {
        let cfg = load("title = \"X\"").unwrap();
        assert_eq!(cfg.language_code, "en");
        assert_eq!(cfg.taxonomies.get("tag"), Some(&"tags".to_string()));
    }

    #[test]
    fn custom_taxonomies_override_defaults() {
        let cfg = load(
            r#"title = "X"
[taxonomies]
author = "authors""#,
        )
        .unwrap();
        assert_eq!(cfg.taxonomies.get("author"), Some(&"authors".to_string()));
    }

    #[test]
    fn params_become_a_template_dict() {
        let cfg = load(
            r#"title = "X"
[params]
subtitle = "hello""#,
        )
        .unwrap();
        let dict = params_to_dict(&cfg.params);
        assert!(dict.contains_key("subtitle"));
    }
}
