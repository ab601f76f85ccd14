use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

/// Deep-merges settings fragments over a base document
#[derive(Debug, Default)]
pub struct ConfigMerger;

impl ConfigMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge fragments in the given order; later fragments win
    pub fn merge_configs(&self, mut base: Value, fragments: Vec<(PathBuf, Value)>) -> Value {
        for (path, fragment) in fragments {
            debug!("  Merging {}...", path.display());
            Self::deep_merge(&mut base, fragment);
        }
        base
    }

    fn deep_merge(base: &mut Value, other: Value) {
        match (base, other) {
            (Value::Object(base_map), Value::Object(other_map)) => {
                for (key, value) in other_map {
                    match base_map.get_mut(&key) {
                        Some(base_value) => Self::deep_merge(base_value, value),
                        None => {
                            base_map.insert(key, value);
                        }
                    }
                }
            }
            // A fragment that only declares `module:` must not wipe the base subtree
            (_, Value::Null) => {}
            (base_val, other_val) => {
                *base_val = other_val;
            }
        }
    }
}
