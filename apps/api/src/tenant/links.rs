use serde::Serialize;

use crate::tenant::source::DEFAULT_TENANT;

/// First path segments that belong to the site itself, not to a company.
const RESERVED_SEGMENTS: &[&str] = &["portfolio", "resume", "contact", DEFAULT_TENANT];

/// The company a page path belongs to: `/acme/resume` → `acme`.
pub fn company_from_path(path: &str) -> Option<&str> {
    let first = path.trim_start_matches('/').split('/').next()?;
    if first.is_empty() || RESERVED_SEGMENTS.contains(&first) {
        None
    } else {
        Some(first)
    }
}

/// Prefixes `href` with the company segment when there is one.
pub fn company_href(company: Option<&str>, href: &str) -> String {
    match company {
        Some(company) => format!("/{company}{href}"),
        None => href.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageLinks {
    pub home: String,
    pub resume: String,
    pub portfolio: String,
    pub contact: String,
}

impl PageLinks {
    pub fn for_tenant(key: &str) -> Self {
        let company = (key != DEFAULT_TENANT).then_some(key);
        Self {
            home: company_href(company, "/"),
            resume: company_href(company, "/resume"),
            portfolio: company_href(company, "/portfolio"),
            contact: company_href(company, "/contact"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_from_path() {
        assert_eq!(company_from_path("/acme/resume"), Some("acme"));
        assert_eq!(company_from_path("/acme"), Some("acme"));
        assert_eq!(company_from_path("/acme/"), Some("acme"));
        assert_eq!(company_from_path("/resume"), None);
        assert_eq!(company_from_path("/default/portfolio"), None);
        assert_eq!(company_from_path("/"), None);
        assert_eq!(company_from_path(""), None);
    }

    #[test]
    fn test_company_href() {
        assert_eq!(company_href(Some("acme"), "/resume"), "/acme/resume");
        assert_eq!(company_href(None, "/resume"), "/resume");
    }

    #[test]
    fn test_default_tenant_links_are_unprefixed() {
        let links = PageLinks::for_tenant("default");
        assert_eq!(links.portfolio, "/portfolio");
        let links = PageLinks::for_tenant("acme");
        assert_eq!(links.home, "/acme/");
        assert_eq!(links.contact, "/acme/contact");
    }
}
