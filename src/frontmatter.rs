use indexmap::IndexMap;

use crate::value::TemplateValue;

/// A front-matter param scalar (§3: "tagged variant over {string, bool,
/// number}").
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    String(String),
    Bool(bool),
    Number(i64),
    Array(Vec<ParamValue>),
}

impl ParamValue {
    pub fn to_template_value(&self) -> TemplateValue {
        match self {
            ParamValue::String(s) => TemplateValue::String(s.clone()),
            ParamValue::Bool(b) => TemplateValue::Bool(*b),
            ParamValue::Number(n) => TemplateValue::Number(*n),
            ParamValue::Array(items) => TemplateValue::AnyArray(
                items.iter().map(ParamValue::to_template_value).collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// One `menu:` entry declared in front matter, before resolution into the
/// site-wide `MenuEntry` tree (§4.3).
#[derive(Clone, Debug, Default)]
pub struct FrontMatterMenu {
    pub menu: String,
    pub weight: i64,
    pub name: Option<String>,
    pub parent: Option<String>,
    pub identifier: Option<String>,
    pub pre: Option<String>,
    pub post: Option<String>,
    pub title: Option<String>,
}

impl FrontMatterMenu {
    pub fn new(menu: impl Into<String>) -> Self {
        Self {
            menu: menu.into(),
            ..Default::default()
        }
    }
}

/// FrontMatter, per §3.
#[derive(Clone, Debug, Default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<chrono::NaiveDateTime>,
    pub draft: bool,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub layout: Option<String>,
    pub content_type: Option<String>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub params: IndexMap<String, ParamValue>,
    pub menus: Vec<FrontMatterMenu>,
}

/// ParsedContent, per §3. Immutable once produced.
#[derive(Clone, Debug)]
pub struct ParsedContent {
    pub front_matter: FrontMatter,
    pub body: String,
}
