//! Navigation model for the admin dashboard chrome.

use serde::Serialize;

use crate::identity::{Identity, ADMIN_ROLE};

pub const SIDEBAR_TITLE: &str = "Portfolio Admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
    pub icon: &'static str,
    pub active: bool,
    pub disabled: bool,
}

const NAV: &[(&str, &str, &str, bool)] = &[
    ("Dashboard", "/dashboard", "📊", false),
    ("Case Studies", "/dashboard/case-studies", "📁", false),
    ("Latest Works", "/dashboard/latest-works", "🖼️", false),
    ("Blogs", "/dashboard/blogs", "✍️", false),
    ("eBooks", "#", "📚", true),
];

/// Fixed navigation; the item whose href equals `path` exactly is active.
pub fn sidebar(path: &str) -> Vec<NavItem> {
    NAV.iter()
        .map(|&(label, href, icon, disabled)| NavItem {
            label,
            href,
            icon,
            active: !disabled && href == path,
            disabled,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Topbar {
    pub display_name: String,
    pub role: Option<String>,
}

pub fn topbar(identity: &Identity, role: Option<&str>) -> Topbar {
    Topbar {
        display_name: identity.name().to_string(),
        role: role.map(str::to_string),
    }
}

/// Only admins get a link into the dashboard from the public navbar.
pub fn shows_dashboard_link(role: Option<&str>) -> bool {
    role == Some(ADMIN_ROLE)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminShell {
    pub title: &'static str,
    pub sidebar: Vec<NavItem>,
    pub topbar: Topbar,
    pub show_dashboard_link: bool,
}

impl AdminShell {
    pub fn build(path: &str, identity: &Identity, role: Option<&str>) -> Self {
        Self {
            title: SIDEBAR_TITLE,
            sidebar: sidebar(path),
            topbar: topbar(identity, role),
            show_dashboard_link: shows_dashboard_link(role),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(display_name: Option<&str>) -> Identity {
        Identity {
            uid: "u1".to_string(),
            email: "admin@example.com".to_string(),
            display_name: display_name.map(str::to_string),
        }
    }

    #[test]
    fn test_sidebar_marks_exact_match_active() {
        let items = sidebar("/dashboard/blogs");
        let active: Vec<_> = items.iter().filter(|i| i.active).map(|i| i.label).collect();
        assert_eq!(active, ["Blogs"]);

        // prefix is not a match
        assert!(sidebar("/dashboard/blogs/new").iter().all(|i| !i.active));
    }

    #[test]
    fn test_ebooks_is_disabled() {
        let items = sidebar("#");
        let ebooks = items.iter().find(|i| i.label == "eBooks").unwrap();
        assert!(ebooks.disabled);
        assert_eq!(ebooks.href, "#");
        assert!(!ebooks.active);
        assert_eq!(items.len(), 5);
    }

    #[test]
    fn test_topbar_falls_back_to_email() {
        assert_eq!(topbar(&identity(Some("Ada")), None).display_name, "Ada");
        assert_eq!(
            topbar(&identity(None), Some("admin")),
            Topbar {
                display_name: "admin@example.com".to_string(),
                role: Some("admin".to_string()),
            }
        );
    }

    #[test]
    fn test_dashboard_link_only_for_admins() {
        assert!(shows_dashboard_link(Some("admin")));
        assert!(!shows_dashboard_link(Some("editor")));
        assert!(!shows_dashboard_link(None));

        let shell = AdminShell::build("/dashboard", &identity(None), Some("admin"));
        assert_eq!(shell.title, "Portfolio Admin");
        assert!(shell.show_dashboard_link);
        assert!(shell.sidebar[0].active);
    }
}
