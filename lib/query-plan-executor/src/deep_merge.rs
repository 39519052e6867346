use serde_json::{Map, Value};

/// Deeply merges `source` into `target` in place. Objects merge key by key,
/// arrays of equal shape merge element by element, anything else replaces
/// the target. A null source leaves the target untouched.
pub fn deep_merge(target: &mut Value, source: Value) {
    if source.is_null() {
        return;
    }
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            deep_merge_objects(target_map, source_map);
        }
        (Value::Array(target_items), Value::Array(source_items)) => {
            for (target_item, source_item) in target_items.iter_mut().zip(source_items) {
                deep_merge(target_item, source_item);
            }
        }
        (target, source) => *target = source,
    }
}

pub fn deep_merge_objects(target_map: &mut Map<String, Value>, source_map: Map<String, Value>) {
    if target_map.is_empty() {
        *target_map = source_map;
        return;
    }
    for (key, source_value) in source_map {
        match target_map.get_mut(&key) {
            Some(target_value) => deep_merge(target_value, source_value),
            None => {
                target_map.insert(key, source_value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_merge_recursively() {
        let mut target = json!({ "user": { "id": "1", "name": "Ann" } });
        deep_merge(&mut target, json!({ "user": { "email": "ann@corp.test" } }));
        assert_eq!(
            target,
            json!({ "user": { "id": "1", "name": "Ann", "email": "ann@corp.test" } })
        );
    }

    #[test]
    fn arrays_merge_element_by_element() {
        let mut target = json!({ "items": [{ "id": "1" }, { "id": "2" }] });
        deep_merge(
            &mut target,
            json!({ "items": [{ "price": 10 }, { "price": 20 }] }),
        );
        assert_eq!(
            target,
            json!({ "items": [{ "id": "1", "price": 10 }, { "id": "2", "price": 20 }] })
        );
    }

    #[test]
    fn shorter_source_arrays_leave_the_tail_alone() {
        let mut target = json!([{ "id": "1" }, { "id": "2" }]);
        deep_merge(&mut target, json!([{ "seen": true }]));
        assert_eq!(target, json!([{ "id": "1", "seen": true }, { "id": "2" }]));
    }

    #[test]
    fn scalars_replace_the_target() {
        let mut target = json!({ "count": 1 });
        deep_merge(&mut target, json!({ "count": 2 }));
        assert_eq!(target, json!({ "count": 2 }));
    }

    #[test]
    fn null_sources_are_ignored() {
        let mut target = json!({ "user": { "id": "1" } });
        deep_merge(&mut target, Value::Null);
        assert_eq!(target, json!({ "user": { "id": "1" } }));
    }

    #[test]
    fn empty_targets_take_the_source_wholesale() {
        let mut target = json!({});
        deep_merge(&mut target, json!({ "user": { "id": "1" } }));
        assert_eq!(target, json!({ "user": { "id": "1" } }));
    }
}
