//! Translation shim (component J, §4.10, §6). `i18n/<lang>.yaml` files are
//! flat `key: value` maps, loaded the way the teacher loads front matter
//! and data files with `serde_yaml`.

use std::collections::HashMap;

pub trait Translator {
    /// Returns the translated string for `key` in `lang`, or `None` if no
    /// translation exists — callers fall back to `key` itself (§6).
    fn translate(&self, lang: &str, key: &str) -> Option<String>;
}

#[derive(Default)]
pub struct MapTranslator {
    entries: HashMap<(String, String), String>,
}

impl MapTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, lang: &str, key: &str, value: impl Into<String>) {
        self.entries.insert((lang.to_string(), key.to_string()), value.into());
    }

    /// Loads one language's translations from a flat YAML mapping, the
    /// `i18n/<lang>.yaml` file layout.
    pub fn load_yaml(&mut self, lang: &str, yaml: &str) -> Result<(), serde_yaml::Error> {
        let map: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(yaml)?;
        for (key, value) in map {
            let rendered = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => serde_yaml::to_string(&other).unwrap_or_default().trim().to_string(),
            };
            self.insert(lang, &key, rendered);
        }
        Ok(())
    }
}

impl Translator for MapTranslator {
    fn translate(&self, lang: &str, key: &str) -> Option<String> {
        self.entries.get(&(lang.to_string(), key.to_string())).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_known_key() {
        let mut t = MapTranslator::new();
        t.insert("en", "greeting", "Hello");
        assert_eq!(t.translate("en", "greeting"), Some("Hello".to_string()));
    }

    #[test]
    fn missing_key_returns_none() {
        let t = MapTranslator::new();
        assert_eq!(t.translate("en", "nope"), None);
    }

    #[test]
    fn loads_flat_yaml_map() {
        let mut t = MapTranslator::new();
        t.load_yaml("fr", "greeting: Bonjour\ncount: 3\n").unwrap();
        assert_eq!(t.translate("fr", "greeting"), Some("Bonjour".to_string()));
        assert_eq!(t.translate("fr", "count"), Some("3".to_string()));
    }

    #[test]
    fn different_languages_are_isolated() {
        let mut t = MapTranslator::new();
        t.insert("en", "greeting", "Hello");
        assert_eq!(t.translate("de", "greeting"), None);
    }
}
