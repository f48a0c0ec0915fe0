//! JSON overlay for layered configuration.

use serde_json::{Map, Value};

/// Overlay `layer` onto `base`. Objects merge key by key, any other value
/// replaces. A leaf present in `locked` is never overridden.
pub(super) fn overlay(base: &mut Value, layer: &Value, locked: Option<&Value>) {
    let Value::Object(layer_map) = layer else {
        if locked.is_none() {
            *base = layer.clone();
        }
        return;
    };
    let locked_map = match locked {
        None => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => return,
    };
    if !base.is_object() {
        *base = Value::Object(Map::new());
    }
    let Value::Object(base_map) = base else {
        return;
    };

    for (key, value) in layer_map {
        let lock = locked_map.and_then(|map| map.get(key));
        if matches!(lock, Some(lock) if !lock.is_object()) {
            continue;
        }
        match base_map.get_mut(key) {
            Some(existing) => overlay(existing, value, lock),
            None if lock.is_none() => {
                base_map.insert(key.clone(), value.clone());
            }
            None => {
                let mut slot = Value::Object(Map::new());
                overlay(&mut slot, value, lock);
                base_map.insert(key.clone(), slot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::overlay;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_and_leaves_replace() {
        let mut base = json!({ "memory": { "recall": { "limit": 5 }, "path": "a.db" } });
        overlay(
            &mut base,
            &json!({ "memory": { "recall": { "limit": 3 } } }),
            None,
        );
        assert_eq!(
            base,
            json!({ "memory": { "recall": { "limit": 3 }, "path": "a.db" } })
        );
    }

    #[test]
    fn locked_leaves_survive_overlay() {
        let locked = json!({ "llm": { "provider": "google" } });
        let mut base = locked.clone();
        overlay(
            &mut base,
            &json!({ "llm": { "provider": "openai", "model": "x" } }),
            Some(&locked),
        );
        assert_eq!(base, json!({ "llm": { "provider": "google", "model": "x" } }));
    }
}
