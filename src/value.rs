use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::menu::{self, MenuEntryHandle};
use crate::page::{self, FileInfo, PageHandle};
use crate::resource::{Resource, ResourceHandle};
use crate::scratch::ScratchHandle;
use crate::site::{self, OutputFormat, SiteHandle};
use crate::taxonomy::{TermMap, Taxonomies};

/// A `Dict` slot is a shared, mutable, insertion-ordered map — shared because
/// scratch-store-promoted dicts and resource `Params` dicts are read and
/// written through multiple `TemplateValue` handles (§4.2 `setInMap`).
pub type Dict = Rc<RefCell<IndexMap<String, TemplateValue>>>;

#[derive(Clone)]
pub struct UrlValue {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: String,
    pub fragment: String,
}

#[derive(Clone)]
pub struct LanguageData {
    pub lang: String,
    pub language_name: String,
    pub weight: i64,
}

#[derive(Clone)]
pub struct NavItemData {
    pub name: String,
    pub url: String,
    pub children: Vec<Rc<NavItemData>>,
}

#[derive(Clone)]
pub struct DocsMountData {
    pub path: String,
    pub target: String,
}

#[derive(Clone)]
pub struct ShortcodeData {
    pub name: String,
    pub params: IndexMap<String, TemplateValue>,
    pub inner: String,
}

#[derive(Clone)]
pub struct HookData {
    pub destination: String,
    pub text: String,
    pub title: String,
}

#[derive(Clone)]
pub struct MediaTypeInfo {
    pub main_type: String,
    pub sub_type: String,
    pub suffix: String,
}

impl MediaTypeInfo {
    pub fn full_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }
}

/// The closed sum type backing every expression result in the template
/// runtime (§3, §4.1, §9 "dynamic typing → tagged variants"). All variants
/// that wrap mutable domain state do so via `Rc`/`Rc<RefCell<_>>` handles:
/// entities outlive the build and are never freed mid-render (§9 "no GC is
/// required"), and `Clone` on a `TemplateValue` is always cheap.
#[derive(Clone)]
pub enum TemplateValue {
    Nil,
    Bool(bool),
    Number(i64),
    String(String),
    /// Pre-escaped HTML; emitted as-is by `Output` nodes (§4.6).
    Html(String),
    Page(PageHandle),
    Site(SiteHandle),
    Language(Rc<LanguageData>),
    File(Rc<FileInfo>),
    Sites(Vec<SiteHandle>),
    PageResources(Vec<ResourceHandle>),
    Resource(ResourceHandle),
    /// `.Data` projection of a Resource (exposes `.Integrity` etc).
    ResourceData(ResourceHandle),
    PageArray(Vec<PageHandle>),
    StringArray(Vec<String>),
    SitesArray(Vec<SiteHandle>),
    AnyArray(Vec<TemplateValue>),
    DocsMount(Rc<DocsMountData>),
    DocsMountArray(Vec<Rc<DocsMountData>>),
    NavItem(Rc<NavItemData>),
    NavArray(Vec<Rc<NavItemData>>),
    MenuEntry(MenuEntryHandle),
    MenuArray(Vec<MenuEntryHandle>),
    Menus(Rc<IndexMap<String, Vec<MenuEntryHandle>>>),
    OutputFormats(Rc<Vec<OutputFormat>>),
    OutputFormat(Rc<OutputFormat>),
    Taxonomies(Rc<IndexMap<String, TemplateValue>>),
    TaxonomyTerms(Rc<IndexMap<String, TemplateValue>>),
    MediaType(Rc<MediaTypeInfo>),
    Dict(Dict),
    Scratch(ScratchHandle),
    Url(Rc<UrlValue>),
    VersionString(String),
    Shortcode(Rc<ShortcodeData>),
    LinkHook(Rc<HookData>),
    ImageHook(Rc<HookData>),
    HeadingHook(Rc<HookData>),
}

impl TemplateValue {
    pub fn new_dict(map: IndexMap<String, TemplateValue>) -> Self {
        TemplateValue::Dict(Rc::new(RefCell::new(map)))
    }

    pub fn string(s: impl Into<String>) -> Self {
        TemplateValue::String(s.into())
    }

    pub fn html(s: impl Into<String>) -> Self {
        TemplateValue::Html(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TemplateValue::Nil => "nil",
            TemplateValue::Bool(_) => "bool",
            TemplateValue::Number(_) => "number",
            TemplateValue::String(_) => "string",
            TemplateValue::Html(_) => "html",
            TemplateValue::Page(_) => "page",
            TemplateValue::Site(_) => "site",
            TemplateValue::Language(_) => "language",
            TemplateValue::File(_) => "file",
            TemplateValue::Sites(_) => "sites",
            TemplateValue::PageResources(_) => "pageresources",
            TemplateValue::Resource(_) => "resource",
            TemplateValue::ResourceData(_) => "resourcedata",
            TemplateValue::PageArray(_) => "pagearray",
            TemplateValue::StringArray(_) => "stringarray",
            TemplateValue::SitesArray(_) => "sitesarray",
            TemplateValue::AnyArray(_) => "array",
            TemplateValue::DocsMount(_) => "docsmount",
            TemplateValue::DocsMountArray(_) => "docsmountarray",
            TemplateValue::NavItem(_) => "navitem",
            TemplateValue::NavArray(_) => "navarray",
            TemplateValue::MenuEntry(_) => "menuentry",
            TemplateValue::MenuArray(_) => "menuarray",
            TemplateValue::Menus(_) => "menus",
            TemplateValue::OutputFormats(_) => "outputformats",
            TemplateValue::OutputFormat(_) => "outputformat",
            TemplateValue::Taxonomies(_) => "taxonomies",
            TemplateValue::TaxonomyTerms(_) => "taxonomyterms",
            TemplateValue::MediaType(_) => "mediatype",
            TemplateValue::Dict(_) => "dict",
            TemplateValue::Scratch(_) => "scratch",
            TemplateValue::Url(_) => "url",
            TemplateValue::VersionString(_) => "versionstring",
            TemplateValue::Shortcode(_) => "shortcode",
            TemplateValue::LinkHook(_) => "linkhook",
            TemplateValue::ImageHook(_) => "imagehook",
            TemplateValue::HeadingHook(_) => "headinghook",
        }
    }

    /// Truthiness per §4.6: Nil=false; Bool=value; Number=value≠0;
    /// String/Html=non-empty; Dict=non-empty; any typed array=non-empty;
    /// otherwise true.
    pub fn truthy(&self) -> bool {
        match self {
            TemplateValue::Nil => false,
            TemplateValue::Bool(b) => *b,
            TemplateValue::Number(n) => *n != 0,
            TemplateValue::String(s) | TemplateValue::Html(s) | TemplateValue::VersionString(s) => {
                !s.is_empty()
            }
            TemplateValue::Dict(d) => !d.borrow().is_empty(),
            TemplateValue::PageArray(v) => !v.is_empty(),
            TemplateValue::StringArray(v) => !v.is_empty(),
            TemplateValue::SitesArray(v) => !v.is_empty(),
            TemplateValue::AnyArray(v) => !v.is_empty(),
            TemplateValue::PageResources(v) => !v.is_empty(),
            TemplateValue::MenuArray(v) => !v.is_empty(),
            TemplateValue::NavArray(v) => !v.is_empty(),
            TemplateValue::DocsMountArray(v) => !v.is_empty(),
            TemplateValue::Sites(v) => !v.is_empty(),
            _ => true,
        }
    }

    /// Renders as template output text. `Html` is emitted verbatim; other
    /// scalars stringify plainly; complex values fall back to a debug-ish
    /// placeholder (Hugo templates rarely print these directly).
    pub fn stringify(&self) -> String {
        match self {
            TemplateValue::Nil => String::new(),
            TemplateValue::Bool(b) => b.to_string(),
            TemplateValue::Number(n) => n.to_string(),
            TemplateValue::String(s) => s.clone(),
            TemplateValue::Html(s) => s.clone(),
            TemplateValue::VersionString(s) => s.clone(),
            TemplateValue::StringArray(items) => items.join(" "),
            TemplateValue::AnyArray(items) => items
                .iter()
                .map(|v| v.stringify())
                .collect::<Vec<_>>()
                .join(" "),
            TemplateValue::Url(u) => format!("{}://{}{}", u.scheme, u.host, u.path),
            _ => format!("<{}>", self.type_name()),
        }
    }

    /// Case-insensitive field access (§4.1). Unknown fields, and access on
    /// `Nil`, resolve to `Nil` rather than erroring.
    pub fn field(&self, name: &str) -> TemplateValue {
        // Fixed struct-like field tables lowercase the query themselves;
        // `Dict` (arbitrary user/param data) needs the *original* case to
        // honor "exact key first, then lowercased" (§4.1).
        let lower = name.to_lowercase();
        match self {
            TemplateValue::Nil => TemplateValue::Nil,
            TemplateValue::Page(p) => page::field_with_handle(p, &lower),
            TemplateValue::Site(s) => site::field(s, &lower),
            TemplateValue::MenuEntry(m) => menu::field(m, &lower),
            TemplateValue::Resource(r) => crate::resource::field(r, &lower),
            TemplateValue::ResourceData(r) => crate::resource::data_field(r, &lower),
            TemplateValue::File(f) => file_field(f, &lower),
            TemplateValue::Dict(d) => dict_field(d, name),
            TemplateValue::PageArray(items) => page_array_field(items, &lower),
            TemplateValue::MenuArray(items) => match lower.as_str() {
                "len" => TemplateValue::Number(items.len() as i64),
                _ => TemplateValue::Nil,
            },
            TemplateValue::StringArray(items) => match lower.as_str() {
                "len" => TemplateValue::Number(items.len() as i64),
                "reverse" => {
                    let mut v = items.clone();
                    v.reverse();
                    TemplateValue::StringArray(v)
                }
                _ => TemplateValue::Nil,
            },
            TemplateValue::AnyArray(items) => match lower.as_str() {
                "len" => TemplateValue::Number(items.len() as i64),
                _ => TemplateValue::Nil,
            },
            TemplateValue::Url(u) => match lower.as_str() {
                "scheme" => TemplateValue::String(u.scheme.clone()),
                "host" => TemplateValue::String(u.host.clone()),
                "path" => TemplateValue::String(u.path.clone()),
                "query" => TemplateValue::String(u.query.clone()),
                "fragment" => TemplateValue::String(u.fragment.clone()),
                _ => TemplateValue::Nil,
            },
            TemplateValue::MediaType(m) => match lower.as_str() {
                "maintype" => TemplateValue::String(m.main_type.clone()),
                "subtype" => TemplateValue::String(m.sub_type.clone()),
                "suffix" => TemplateValue::String(m.suffix.clone()),
                "type" => TemplateValue::String(m.full_type()),
                _ => TemplateValue::Nil,
            },
            TemplateValue::OutputFormat(o) => match lower.as_str() {
                "name" => TemplateValue::String(o.name.clone()),
                "mediatype" => TemplateValue::String(o.media_type.clone()),
                "basename" => TemplateValue::String(o.base_name.clone()),
                "isplaintext" => TemplateValue::Bool(o.is_plain_text),
                _ => TemplateValue::Nil,
            },
            TemplateValue::Taxonomies(map) | TemplateValue::TaxonomyTerms(map) => map
                .get(name)
                .cloned()
                .or_else(|| {
                    map.iter()
                        .find(|(k, _)| k.to_lowercase() == lower)
                        .map(|(_, v)| v.clone())
                })
                .unwrap_or(TemplateValue::Nil),
            _ => TemplateValue::Nil,
        }
    }
}

fn file_field(f: &FileInfo, name: &str) -> TemplateValue {
    match name {
        "path" => TemplateValue::String(f.path.clone()),
        "dir" => TemplateValue::String(f.dir.clone()),
        "filename" => TemplateValue::String(f.filename.clone()),
        "ext" => TemplateValue::String(f.ext.clone()),
        _ => TemplateValue::Nil,
    }
}

/// `Dict` lookup tries the exact key first, then lowercased (§4.1).
fn dict_field(d: &Dict, name: &str) -> TemplateValue {
    let map = d.borrow();
    if let Some(v) = map.get(name) {
        return v.clone();
    }
    let lower = name.to_lowercase();
    map.iter()
        .find(|(k, _)| k.to_lowercase() == lower)
        .map(|(_, v)| v.clone())
        .unwrap_or(TemplateValue::Nil)
}

/// PageArray zero-arg pseudo-fields (§4.1): byDate, byLastmod,
/// byPublishDate, byTitle, byWeight, reverse, len. Sorts are stable and
/// ascending; `byWeight` only reorders pairs where both sides carry an
/// explicit weight, so a weightless page keeps its original position
/// relative to every other page rather than sinking to the end.
fn page_array_field(items: &[PageHandle], name: &str) -> TemplateValue {
    let mut out = items.to_vec();
    match name {
        "len" => return TemplateValue::Number(items.len() as i64),
        "reverse" => {
            out.reverse();
            return TemplateValue::PageArray(out);
        }
        "bydate" => out.sort_by(|a, b| a.borrow().date.cmp(&b.borrow().date)),
        "bylastmod" => out.sort_by(|a, b| a.borrow().lastmod.cmp(&b.borrow().lastmod)),
        "bypublishdate" => out.sort_by(|a, b| a.borrow().date.cmp(&b.borrow().date)),
        "bytitle" => out.sort_by(|a, b| a.borrow().title.cmp(&b.borrow().title)),
        "byweight" => out.sort_by(|a, b| match (a.borrow().weight, b.borrow().weight) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => std::cmp::Ordering::Equal,
        }),
        _ => return TemplateValue::Nil,
    }
    TemplateValue::PageArray(out)
}

/// HTML-escapes `& < > "` (§4.6). Idempotent unless applied twice on text
/// containing any of the four characters (§8 property 8) — `&` re-escaping
/// to `&amp;amp;` is the expected, non-idempotent case.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape_html(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_is_idempotent_without_special_chars() {
        let s = "hello world";
        assert_eq!(escape_html(s), escape_html(&escape_html(s)));
    }

    #[test]
    fn escape_changes_on_second_pass_with_ampersand() {
        let s = "a & b";
        let once = escape_html(s);
        let twice = escape_html(&once);
        assert_ne!(once, twice);
    }

    #[test]
    fn nil_field_access_is_nil() {
        assert!(matches!(TemplateValue::Nil.field("anything"), TemplateValue::Nil));
    }

    #[test]
    fn dict_lookup_tries_exact_then_lowercase() {
        let mut map = IndexMap::new();
        map.insert("Foo".to_string(), TemplateValue::Number(1));
        map.insert("bar".to_string(), TemplateValue::Number(2));
        let dict = TemplateValue::new_dict(map);
        assert!(matches!(dict.field("Foo"), TemplateValue::Number(1)));
        assert!(matches!(dict.field("foo"), TemplateValue::Number(1)));
        assert!(matches!(dict.field("bar"), TemplateValue::Number(2)));
        assert!(matches!(dict.field("BAR"), TemplateValue::Number(2)));
    }

    #[test]
    fn truthiness_rules() {
        assert!(!TemplateValue::Nil.truthy());
        assert!(!TemplateValue::Number(0).truthy());
        assert!(TemplateValue::Number(1).truthy());
        assert!(!TemplateValue::String(String::new()).truthy());
        assert!(TemplateValue::String("x".into()).truthy());
    }

    #[test]
    fn by_weight_keeps_weightless_pages_in_place() {
        use crate::page::{Kind, PageData};

        let a = Rc::new(RefCell::new(PageData::new(Kind::Page, "a", "/a/")));
        let b = Rc::new(RefCell::new(PageData::new(Kind::Page, "b", "/b/")));
        b.borrow_mut().weight = Some(5);

        let sorted = page_array_field(&[a.clone(), b.clone()], "byweight");
        let TemplateValue::PageArray(out) = sorted else {
            panic!("expected PageArray");
        };
        assert_eq!(out[0].borrow().title, "a");
        assert_eq!(out[1].borrow().title, "b");
    }
}
