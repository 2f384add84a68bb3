//! Session capability injected into the gate
//!
//! The gate never touches a router or the in-memory user directly. When a
//! session has to end it clears storage itself, then asks the sink to drop
//! the cached identity and navigate to the login route.

use session_auth::RETURN_URL_PARAM;

/// Routes the gate needs to know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    pub home: String,
    pub login: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            home: "/".into(),
            login: "/login".into(),
        }
    }
}

impl Routes {
    /// Where a login redirect should send the user from `current`.
    ///
    /// No `returnUrl` is attached when already on the home or login route.
    pub fn redirect_from(&self, current: &str) -> LoginRedirect {
        let path = current.split(['?', '#']).next().unwrap_or(current);
        let return_url = if path == self.home || path == self.login {
            None
        } else {
            Some(current.to_owned())
        };
        LoginRedirect {
            path: self.login.clone(),
            return_url,
        }
    }
}

/// A navigation to the login route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub path: String,
    pub return_url: Option<String>,
}

impl LoginRedirect {
    /// Query to attach to the navigation, if any.
    pub fn query(&self) -> Option<(&'static str, &str)> {
        self.return_url
            .as_deref()
            .map(|url| (RETURN_URL_PARAM, url))
    }
}

/// Application side of a session ending.
pub trait SessionSink: Send + Sync {
    /// Forget the in-memory user.
    fn invalidate(&self);

    /// Path the user is currently on.
    fn current_path(&self) -> String;

    /// Replace the current location with the login route.
    fn redirect_to_login(&self, redirect: LoginRedirect);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_page_gets_return_url() {
        let redirect = Routes::default().redirect_from("/admin/orders?page=2");
        assert_eq!(redirect.path, "/login");
        assert_eq!(
            redirect.query(),
            Some(("returnUrl", "/admin/orders?page=2"))
        );
    }

    #[test]
    fn home_and_login_get_no_query() {
        let routes = Routes::default();
        assert_eq!(routes.redirect_from("/").query(), None);
        assert_eq!(routes.redirect_from("/login").query(), None);
        assert_eq!(routes.redirect_from("/login?returnUrl=%2Fcart").query(), None);
    }

    #[test]
    fn custom_routes_are_respected() {
        let routes = Routes {
            home: "/shop".into(),
            login: "/sign-in".into(),
        };
        let redirect = routes.redirect_from("/shop");
        assert_eq!(redirect.path, "/sign-in");
        assert!(redirect.return_url.is_none());
        assert_eq!(
            routes.redirect_from("/").return_url.as_deref(),
            Some("/")
        );
    }
}
