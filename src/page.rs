use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::frontmatter::ParamValue;
use crate::resource::ResourceHandle;
use crate::site::SiteHandle;
use crate::value::{Dict, TemplateValue};

/// Page kind, per §3 `PageContext.kind`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Home,
    Page,
    Section,
    Term,
    Taxonomy,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Home => "home",
            Kind::Page => "page",
            Kind::Section => "section",
            Kind::Term => "term",
            Kind::Taxonomy => "taxonomy",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FileInfo {
    pub path: String,
    pub dir: String,
    pub filename: String,
    pub ext: String,
}

pub type PageHandle = Rc<RefCell<PageData>>;

/// PageContext, per §3. Built once during load; `parent`/`ancestors`/`pages`
/// and the `site` backref are filled in during the "fill-in-wiring" phase
/// (§3 lifecycle note) and are otherwise immutable.
pub struct PageData {
    pub title: String,
    pub date: Option<chrono::NaiveDateTime>,
    pub lastmod: Option<chrono::NaiveDateTime>,
    pub draft: bool,
    pub kind: Kind,
    pub section: String,
    pub page_type: String,
    pub slug: String,
    pub rel_permalink: String,
    pub content: String,
    pub summary: String,
    pub plain: String,
    pub table_of_contents: String,
    pub description: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub params: IndexMap<String, ParamValue>,
    pub file: Option<FileInfo>,
    pub language: String,
    pub translations: Vec<PageHandle>,
    pub parent: Option<Weak<RefCell<PageData>>>,
    pub ancestors: Vec<PageHandle>,
    pub pages: Vec<PageHandle>,
    pub site: Option<SiteHandle>,
    pub layout: Option<String>,
    pub resources: Vec<ResourceHandle>,
    pub weight: Option<i64>,
}

impl PageData {
    pub fn new(kind: Kind, title: impl Into<String>, rel_permalink: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: None,
            lastmod: None,
            draft: false,
            kind,
            section: String::new(),
            page_type: "page".to_string(),
            slug: String::new(),
            rel_permalink: rel_permalink.into(),
            content: String::new(),
            summary: String::new(),
            plain: String::new(),
            table_of_contents: String::new(),
            description: String::new(),
            tags: Vec::new(),
            categories: Vec::new(),
            params: IndexMap::new(),
            file: None,
            language: "en".to_string(),
            translations: Vec::new(),
            parent: None,
            ancestors: Vec::new(),
            pages: Vec::new(),
            site: None,
            layout: None,
            resources: Vec::new(),
            weight: None,
        }
    }

    pub fn permalink(&self, base_url: &str) -> String {
        let base = crate::path::ensure_trailing_slash(base_url);
        format!("{}{}", base, self.rel_permalink.trim_start_matches('/'))
    }

    /// Identity of this page's position within `container`, by `relPermalink`.
    fn index_in(&self, container: &[PageHandle]) -> Option<usize> {
        container
            .iter()
            .position(|p| p.borrow().rel_permalink == self.rel_permalink)
    }

    pub fn prev_in_section(&self) -> Option<PageHandle> {
        let parent = self.parent.as_ref()?.upgrade()?;
        let parent = parent.borrow();
        let idx = self.index_in(&parent.pages)?;
        if idx == 0 {
            None
        } else {
            Some(parent.pages[idx - 1].clone())
        }
    }

    pub fn next_in_section(&self) -> Option<PageHandle> {
        let parent = self.parent.as_ref()?.upgrade()?;
        let parent = parent.borrow();
        let idx = self.index_in(&parent.pages)?;
        parent.pages.get(idx + 1).cloned()
    }
}

/// Field-access table for `Page` (§4.1). Lookup is case-insensitive; unknown
/// fields resolve to Nil rather than erroring.
pub fn field(page: &PageHandle, name: &str) -> TemplateValue {
    let p = page.borrow();
    match name {
        "title" => TemplateValue::String(p.title.clone()),
        "date" => p
            .date
            .map(|d| TemplateValue::String(d.format("%Y-%m-%dT%H:%M:%S").to_string()))
            .unwrap_or(TemplateValue::Nil),
        "lastmod" => p
            .lastmod
            .map(|d| TemplateValue::String(d.format("%Y-%m-%dT%H:%M:%S").to_string()))
            .unwrap_or(TemplateValue::Nil),
        "draft" => TemplateValue::Bool(p.draft),
        "kind" => TemplateValue::String(p.kind.as_str().to_string()),
        "section" => TemplateValue::String(p.section.clone()),
        "type" => TemplateValue::String(p.page_type.clone()),
        "slug" => TemplateValue::String(p.slug.clone()),
        "relpermalink" => TemplateValue::String(p.rel_permalink.clone()),
        "permalink" => {
            let base = p
                .site
                .as_ref()
                .map(|s| s.borrow().base_url.clone())
                .unwrap_or_default();
            TemplateValue::String(p.permalink(&base))
        }
        "content" => TemplateValue::Html(p.content.clone()),
        "summary" => TemplateValue::Html(p.summary.clone()),
        "plain" => TemplateValue::String(p.plain.clone()),
        "tableofcontents" => TemplateValue::Html(p.table_of_contents.clone()),
        "description" => TemplateValue::String(p.description.clone()),
        "tags" => TemplateValue::StringArray(p.tags.clone()),
        "categories" => TemplateValue::StringArray(p.categories.clone()),
        "params" => {
            let mut map = IndexMap::new();
            for (k, v) in &p.params {
                map.insert(k.clone(), v.to_template_value());
            }
            TemplateValue::new_dict(map)
        }
        "file" => p
            .file
            .clone()
            .map(|f| TemplateValue::File(Rc::new(f)))
            .unwrap_or(TemplateValue::Nil),
        "resources" => TemplateValue::PageResources(p.resources.clone()),
        "language" => TemplateValue::String(p.language.clone()),
        "translations" => TemplateValue::PageArray(p.translations.clone()),
        "parent" => p
            .parent
            .as_ref()
            .and_then(|w| w.upgrade())
            .map(TemplateValue::Page)
            .unwrap_or(TemplateValue::Nil),
        "ancestors" => TemplateValue::PageArray(p.ancestors.clone()),
        "pages" => TemplateValue::PageArray(p.pages.clone()),
        "site" => p
            .site
            .clone()
            .map(TemplateValue::Site)
            .unwrap_or(TemplateValue::Nil),
        "layout" => p
            .layout
            .clone()
            .map(TemplateValue::String)
            .unwrap_or(TemplateValue::Nil),
        "weight" => p
            .weight
            .map(TemplateValue::Number)
            .unwrap_or(TemplateValue::Nil),
        "ishome" => TemplateValue::Bool(p.kind == Kind::Home),
        "ispage" => TemplateValue::Bool(p.kind == Kind::Page),
        "issection" => TemplateValue::Bool(p.kind == Kind::Section),
        "istaxonomy" => TemplateValue::Bool(p.kind == Kind::Taxonomy),
        "isterm" => TemplateValue::Bool(p.kind == Kind::Term),
        "isnode" => TemplateValue::Bool(matches!(
            p.kind,
            Kind::Home | Kind::Section | Kind::Taxonomy | Kind::Term
        )),
        _ => TemplateValue::Nil,
    }
}

/// Split out since `prevInSection`/`nextInSection` need the unborrowed handle.
pub fn field_with_handle(page: &PageHandle, name: &str) -> TemplateValue {
    match name {
        "previnsection" => page
            .borrow()
            .prev_in_section()
            .map(TemplateValue::Page)
            .unwrap_or(TemplateValue::Nil),
        "nextinsection" => page
            .borrow()
            .next_in_section()
            .map(TemplateValue::Page)
            .unwrap_or(TemplateValue::Nil),
        _ => field(page, name),
    }
}
