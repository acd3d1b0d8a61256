use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::page::PageHandle;
use crate::value::{Dict, TemplateValue};

pub type MenuEntryHandle = Rc<RefCell<MenuEntryData>>;

/// MenuEntry, per §3. The tree is built by resolving `parent` identifiers
/// after every entry for a menu name has been collected; ordering is
/// (weight asc, name asc) at every level (§3).
#[derive(Clone)]
pub struct MenuEntryData {
    pub name: String,
    pub url: String,
    pub page_ref: Option<PageHandle>,
    pub title: String,
    pub weight: i64,
    pub parent: Option<String>,
    pub identifier: String,
    pub pre: String,
    pub post: String,
    pub menu: String,
    pub params: IndexMap<String, TemplateValue>,
    pub children: Vec<MenuEntryHandle>,
}

impl MenuEntryData {
    pub fn new(menu: impl Into<String>, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            name: identifier.clone(),
            url: String::new(),
            page_ref: None,
            title: String::new(),
            weight: 0,
            parent: None,
            identifier,
            pre: String::new(),
            post: String::new(),
            menu: menu.into(),
            params: IndexMap::new(),
            children: Vec::new(),
        }
    }
}

/// Sorts `entries` by (weight asc, name asc), stably, and recurses into
/// children — matches the ordering contract in §3.
pub fn sort_menu_entries(entries: &mut [MenuEntryHandle]) {
    entries.sort_by(|a, b| {
        let a = a.borrow();
        let b = b.borrow();
        a.weight.cmp(&b.weight).then_with(|| a.name.cmp(&b.name))
    });
    for e in entries.iter() {
        let mut children = e.borrow().children.clone();
        sort_menu_entries(&mut children);
        e.borrow_mut().children = children;
    }
}

/// Builds a parent/child tree from a flat list of entries sharing one menu
/// name, by resolving `parent` identifiers. Entries whose `parent` does not
/// match any sibling's `identifier` become roots.
pub fn build_tree(flat: Vec<MenuEntryHandle>) -> Vec<MenuEntryHandle> {
    let by_id: IndexMap<String, MenuEntryHandle> = flat
        .iter()
        .map(|e| (e.borrow().identifier.clone(), e.clone()))
        .collect();

    let mut roots = Vec::new();
    for entry in &flat {
        let parent_id = entry.borrow().parent.clone();
        match parent_id.and_then(|pid| by_id.get(&pid).cloned()) {
            Some(parent) => {
                if !Rc::ptr_eq(&parent, entry) {
                    parent.borrow_mut().children.push(entry.clone());
                }
            }
            None => roots.push(entry.clone()),
        }
    }

    sort_menu_entries(&mut roots);
    roots
}

pub fn field(entry: &MenuEntryHandle, name: &str) -> TemplateValue {
    let e = entry.borrow();
    match name {
        "name" => TemplateValue::String(e.name.clone()),
        "url" => TemplateValue::String(e.url.clone()),
        "pageref" => e
            .page_ref
            .clone()
            .map(TemplateValue::Page)
            .unwrap_or(TemplateValue::Nil),
        "title" => TemplateValue::String(e.title.clone()),
        "weight" => TemplateValue::Number(e.weight),
        "parent" => e
            .parent
            .clone()
            .map(TemplateValue::String)
            .unwrap_or(TemplateValue::Nil),
        "identifier" => TemplateValue::String(e.identifier.clone()),
        "pre" => TemplateValue::Html(e.pre.clone()),
        "post" => TemplateValue::Html(e.post.clone()),
        "menu" => TemplateValue::String(e.menu.clone()),
        "params" => TemplateValue::new_dict(e.params.clone()),
        "page" => e
            .page_ref
            .clone()
            .map(TemplateValue::Page)
            .unwrap_or(TemplateValue::Nil),
        "haschildren" => TemplateValue::Bool(!e.children.is_empty()),
        "children" => TemplateValue::MenuArray(e.children.clone()),
        _ => TemplateValue::Nil,
    }
}
