//! Permission tree lookup
//!
//! The tree is nested JSON objects. Walking a dotted key lands on an area
//! node whose `VIEW`/`CREATE`/`UPDATE`/`DELETE` entries hold the permission
//! strings a role must carry.

use std::path::Path;

use serde_json::{Map, Value};

use crate::action::Action;
use crate::error::{Error, Result};

/// Wildcard grant that allows every action on every area.
pub const ADMIN_GRANT: &str = "ADMIN.GRANTED";

/// Back-office areas in the built-in tree.
const DEFAULT_AREAS: &[&str] = &[
    "DASHBOARD",
    "MANAGE_PRODUCT.PRODUCT",
    "MANAGE_PRODUCT.PRODUCT_TYPE",
    "MANAGE_PRODUCT.COMMENT",
    "MANAGE_ORDER.ORDER",
    "MANAGE_ORDER.REVIEW",
    "SETTING.CITY",
    "SETTING.DELIVERY_TYPE",
    "SETTING.PAYMENT_TYPE",
    "SYSTEM.USER",
    "SYSTEM.ROLE",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PermissionTree {
    root: Value,
}

impl PermissionTree {
    pub fn from_value(root: Value) -> Result<Self> {
        if !root.is_object() {
            return Err(Error::NotAnObject);
        }
        Ok(Self { root })
    }

    /// Load a tree from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let tree = Self::from_value(serde_json::from_str(&contents)?)?;
        tracing::info!(path = %path.display(), "loaded permission tree");
        Ok(tree)
    }

    /// Node at a dotted key, if every segment exists.
    pub fn node(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.root, |node, segment| node.get(segment))
    }

    /// Permission string required for `action` on `key`.
    pub fn permission(&self, key: &str, action: Action) -> Option<&str> {
        self.node(key)?.get(action.as_key())?.as_str()
    }
}

impl Default for PermissionTree {
    /// Storefront back-office tree: every area gets `<AREA>.<ACTION>`
    /// strings, plus the `ADMIN` wildcard entry.
    fn default() -> Self {
        let mut root = Map::new();
        root.insert("ADMIN".into(), Value::String(ADMIN_GRANT.into()));

        'areas: for area in DEFAULT_AREAS {
            let mut node = &mut root;
            for segment in area.split('.') {
                node = match node
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new()))
                {
                    Value::Object(map) => map,
                    _ => continue 'areas,
                };
            }
            for action in Action::ALL {
                node.insert(
                    action.as_key().into(),
                    Value::String(format!("{area}.{}", action.as_key())),
                );
            }
        }

        Self {
            root: Value::Object(root),
        }
    }
}
