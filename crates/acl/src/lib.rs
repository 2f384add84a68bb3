//! Back-office access control
//!
//! A static permission tree maps dotted area keys (`SYSTEM.USER`,
//! `MANAGE_PRODUCT.PRODUCT`) to one permission string per action. A user's
//! role carries the list of granted strings; `evaluate` answers which of the
//! requested actions that list allows. `ADMIN.GRANTED` allows everything.

pub mod action;
pub mod error;
pub mod tree;

pub use action::{Access, Action};
pub use error::{Error, Result};
pub use tree::{ADMIN_GRANT, PermissionTree};

/// Resolve the requested actions on `key` against `granted`.
///
/// Keys or actions missing from the tree resolve to false. Actions not in
/// `actions` are always false in the result.
pub fn evaluate(
    tree: &PermissionTree,
    key: &str,
    actions: &[Action],
    granted: &[String],
) -> Access {
    let is_admin = granted.iter().any(|p| p == ADMIN_GRANT);
    let mut access = Access::default();

    for &action in actions {
        let allowed = is_admin
            || tree
                .permission(key, action)
                .is_some_and(|needed| granted.iter().any(|p| p == needed));
        access.set(action, allowed);
    }

    tracing::trace!(key, ?access, is_admin, "evaluated permissions");
    access
}
