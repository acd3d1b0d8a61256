use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::page::PageHandle;
use crate::value::TemplateValue;

/// term-key (case-preserving) → pages tagged with that term, per §3 invariant
/// 5: lookup is case-insensitive with exact-match precedence.
#[derive(Default, Clone)]
pub struct TermMap {
    terms: IndexMap<String, Vec<PageHandle>>,
    lower_index: HashMap<String, String>,
}

impl TermMap {
    pub fn insert(&mut self, term: &str, page: PageHandle) {
        self.lower_index
            .entry(term.to_lowercase())
            .or_insert_with(|| term.to_string());
        self.terms
            .entry(term.to_string())
            .or_insert_with(Vec::new)
            .push(page);
    }

    /// Exact match first; falls back to a case-insensitive match.
    pub fn get(&self, key: &str) -> Option<&Vec<PageHandle>> {
        if let Some(v) = self.terms.get(key) {
            return Some(v);
        }
        let canonical = self.lower_index.get(&key.to_lowercase())?;
        self.terms.get(canonical)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.terms.keys()
    }

    pub fn to_template_value(&self) -> TemplateValue {
        let mut map = IndexMap::new();
        for (k, pages) in &self.terms {
            map.insert(k.clone(), TemplateValue::PageArray(pages.clone()));
        }
        TemplateValue::TaxonomyTerms(Rc::new(map))
    }
}

/// taxonomy name → TermMap, per §3 `SiteContext.Taxonomies`.
#[derive(Default, Clone)]
pub struct Taxonomies {
    pub by_name: IndexMap<String, TermMap>,
}

impl Taxonomies {
    pub fn add(&mut self, taxonomy: &str, term: &str, page: PageHandle) {
        self.by_name
            .entry(taxonomy.to_string())
            .or_insert_with(TermMap::default)
            .insert(term, page);
    }

    pub fn to_template_value(&self) -> TemplateValue {
        let mut map = IndexMap::new();
        for (name, terms) in &self.by_name {
            map.insert(name.clone(), terms.to_template_value());
        }
        TemplateValue::Taxonomies(Rc::new(map))
    }
}
