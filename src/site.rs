use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::menu::MenuEntryHandle;
use crate::page::PageHandle;
use crate::scratch::ScratchHandle;
use crate::taxonomy::Taxonomies;
use crate::value::TemplateValue;

pub type SiteHandle = Rc<RefCell<SiteData>>;

#[derive(Clone)]
pub struct OutputFormat {
    pub name: String,
    pub media_type: String,
    pub base_name: String,
    pub is_plain_text: bool,
}

/// SiteContext, per §3. `Sites` defaults to a single-element vec containing
/// self (multi-site views are out of scope per §1, but the field must
/// resolve, not error).
pub struct SiteData {
    pub title: String,
    pub base_url: String,
    pub language_code: String,
    pub copyright: String,
    pub language: String,
    pub languages: Vec<String>,
    pub params: IndexMap<String, TemplateValue>,
    pub menus: IndexMap<String, Vec<MenuEntryHandle>>,
    pub taxonomies: Taxonomies,
    pub home: Option<PageHandle>,
    pub pages: Vec<PageHandle>,
    pub all_pages: Vec<PageHandle>,
    pub store: ScratchHandle,
    pub output_formats: Vec<OutputFormat>,
}

impl SiteData {
    pub fn new(title: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            base_url: crate::path::ensure_trailing_slash(&base_url.into()),
            language_code: "en".to_string(),
            copyright: String::new(),
            language: "en".to_string(),
            languages: vec!["en".to_string()],
            params: IndexMap::new(),
            menus: IndexMap::new(),
            taxonomies: Taxonomies::default(),
            home: None,
            pages: Vec::new(),
            all_pages: Vec::new(),
            store: crate::scratch::new_store(),
            output_formats: vec![OutputFormat {
                name: "html".to_string(),
                media_type: "text/html".to_string(),
                base_name: "index".to_string(),
                is_plain_text: false,
            }],
        }
    }

    pub fn is_multilingual(&self) -> bool {
        self.languages.len() > 1
    }
}

pub fn field(site: &SiteHandle, name: &str) -> TemplateValue {
    let s = site.borrow();
    match name {
        "title" => TemplateValue::String(s.title.clone()),
        "baseurl" => TemplateValue::String(s.base_url.clone()),
        "languagecode" => TemplateValue::String(s.language_code.clone()),
        "copyright" => TemplateValue::String(s.copyright.clone()),
        "language" => TemplateValue::String(s.language.clone()),
        "languages" => TemplateValue::StringArray(s.languages.clone()),
        "params" => TemplateValue::new_dict(s.params.clone()),
        "menus" => {
            let mut map = IndexMap::new();
            for (k, v) in &s.menus {
                map.insert(k.clone(), TemplateValue::MenuArray(v.clone()));
            }
            TemplateValue::Menus(Rc::new(map))
        }
        "taxonomies" => s.taxonomies.to_template_value(),
        "home" => s
            .home
            .clone()
            .map(TemplateValue::Page)
            .unwrap_or(TemplateValue::Nil),
        "pages" => TemplateValue::PageArray(s.pages.clone()),
        "allpages" => TemplateValue::PageArray(s.all_pages.clone()),
        "sites" => TemplateValue::SitesArray(vec![site.clone()]),
        "store" => TemplateValue::Scratch(s.store.clone()),
        "outputformats" => TemplateValue::OutputFormats(Rc::new(s.output_formats.clone())),
        "ismultilingual" => TemplateValue::Bool(s.is_multilingual()),
        _ => TemplateValue::Nil,
    }
}
