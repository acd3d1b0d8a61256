use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::TemplateValue;

pub type ScratchHandle = Rc<RefCell<ScratchStore>>;

/// Per-page/per-site mutable key-value store (§4.2, component B). All
/// operations are confined to a single store instance; the embedder is
/// responsible for keying stores by entity identity (page or site), matching
/// the teacher's `Arc<RwLock<HashMap<..>>>` pattern generalized to the
/// single-threaded model of §5.
#[derive(Default)]
pub struct ScratchStore {
    values: IndexMap<String, TemplateValue>,
}

pub fn new_store() -> ScratchHandle {
    Rc::new(RefCell::new(ScratchStore::default()))
}

impl ScratchStore {
    pub fn get(&self, key: &str) -> TemplateValue {
        self.values.get(key).cloned().unwrap_or(TemplateValue::Nil)
    }

    pub fn set(&mut self, key: &str, value: TemplateValue) {
        self.values.insert(key.to_string(), value);
    }

    /// `add`: Nil → set; existing array → append; existing scalar → array of
    /// two (§4.2).
    pub fn add(&mut self, key: &str, value: TemplateValue) {
        let existing = self.values.shift_remove(key);
        let merged = match existing {
            None | Some(TemplateValue::Nil) => value,
            Some(TemplateValue::AnyArray(mut items)) => {
                items.push(value);
                TemplateValue::AnyArray(items)
            }
            Some(other) => TemplateValue::AnyArray(vec![other, value]),
        };
        self.values.insert(key.to_string(), merged);
    }

    pub fn delete(&mut self, key: &str) {
        self.values.shift_remove(key);
    }

    /// Promotes the slot named `map_key` to a `Dict` if absent, then sets
    /// `key` within it (§4.2).
    pub fn set_in_map(&mut self, map_key: &str, key: &str, value: TemplateValue) {
        let slot = self.values.entry(map_key.to_string()).or_insert_with(|| {
            TemplateValue::new_dict(IndexMap::new())
        });
        if !matches!(slot, TemplateValue::Dict(_)) {
            *slot = TemplateValue::new_dict(IndexMap::new());
        }
        if let TemplateValue::Dict(dict) = slot {
            dict.borrow_mut().insert(key.to_string(), value);
        }
    }

    pub fn delete_in_map(&mut self, map_key: &str, key: &str) {
        if let Some(TemplateValue::Dict(dict)) = self.values.get(map_key) {
            dict.borrow_mut().shift_remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_coalesces_to_array() {
        let mut s = ScratchStore::default();
        s.add("k", TemplateValue::String("a".into()));
        s.add("k", TemplateValue::String("b".into()));
        match s.get("k") {
            TemplateValue::AnyArray(items) => assert_eq!(items.len(), 2),
            other => panic!("expected array, got {:?}", other.type_name()),
        }
    }

    #[test]
    fn set_in_map_promotes_to_dict() {
        let mut s = ScratchStore::default();
        s.set_in_map("m", "foo", TemplateValue::String("bar".into()));
        match s.get("m") {
            TemplateValue::Dict(d) => match d.borrow().get("foo") {
                Some(TemplateValue::String(v)) => assert_eq!(v, "bar"),
                other => panic!("expected string, got {:?}", other.map(|v| v.type_name())),
            },
            other => panic!("expected dict, got {:?}", other.type_name()),
        }
    }

    #[test]
    fn delete_removes_key() {
        let mut s = ScratchStore::default();
        s.set("k", TemplateValue::Bool(true));
        s.delete("k");
        assert!(matches!(s.get("k"), TemplateValue::Nil));
    }
}
