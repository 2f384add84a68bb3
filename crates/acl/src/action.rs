//! Actions and the per-action answer

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::View, Action::Create, Action::Update, Action::Delete];

    /// Key used in the permission tree.
    pub fn as_key(self) -> &'static str {
        match self {
            Action::View => "VIEW",
            Action::Create => "CREATE",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown action {s:?}, expected VIEW, CREATE, UPDATE or DELETE"))
    }
}

/// Resolved permission per action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Access {
    pub view: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl Access {
    pub fn all() -> Self {
        Self {
            view: true,
            create: true,
            update: true,
            delete: true,
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Create => self.create,
            Action::Update => self.update,
            Action::Delete => self.delete,
        }
    }

    pub(crate) fn set(&mut self, action: Action, allowed: bool) {
        match action {
            Action::View => self.view = allowed,
            Action::Create => self.create = allowed,
            Action::Update => self.update = allowed,
            Action::Delete => self.delete = allowed,
        }
    }
}
