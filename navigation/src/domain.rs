use std::fmt;
use url::Url;

/// A parsed menu link target.
#[derive(Clone, Debug, PartialEq)]
pub enum LinkUrl {
    /// Placeholder for items that don't link anywhere
    NoLink,
    Absolute(Url),
    /// Site relative path, may carry a query or fragment
    Relative(String),
}

impl LinkUrl {
    pub const NO_LINK: &'static str = "<nolink>";

    pub fn parse(raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            None | Some("") | Some(Self::NO_LINK) | Some("route:<nolink>") => {
                return LinkUrl::NoLink;
            }
            Some(raw) => raw,
        };

        if let Some(path) = raw.strip_prefix("internal:") {
            return LinkUrl::Relative(path.to_string());
        }

        match Url::parse(raw) {
            Ok(url) => LinkUrl::Absolute(url),
            Err(_) => LinkUrl::Relative(raw.to_string()),
        }
    }

    /// Path component only; scheme, host, query and fragment are dropped.
    pub fn path(&self) -> Option<&str> {
        match self {
            LinkUrl::NoLink => None,
            LinkUrl::Absolute(url) => Some(url.path()),
            LinkUrl::Relative(raw) => {
                let end = raw.find(['?', '#']).unwrap_or(raw.len());
                Some(&raw[..end])
            }
        }
    }

    pub fn is_no_link(&self) -> bool {
        matches!(self, LinkUrl::NoLink)
    }
}

impl fmt::Display for LinkUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkUrl::NoLink => f.write_str(Self::NO_LINK),
            LinkUrl::Absolute(url) => f.write_str(url.as_str()),
            LinkUrl::Relative(path) => f.write_str(path),
        }
    }
}

/// Decides whether a link leaves the family of internal sites.
#[derive(Clone, Debug, Default)]
pub struct InternalDomainResolver {
    domains: Vec<String>,
}

impl InternalDomainResolver {
    const PROTOCOLS: &'static [&'static str] = &["tel", "mailto"];

    pub fn new(domains: Vec<String>) -> Self {
        InternalDomainResolver {
            domains: domains.into_iter().map(|d| d.to_lowercase()).collect(),
        }
    }

    pub fn is_external(&self, url: &LinkUrl) -> bool {
        let LinkUrl::Absolute(url) = url else {
            return false;
        };
        match url.host_str() {
            Some(host) => !self.is_internal_host(&host.to_lowercase()),
            // mailto:, tel: and friends
            None => true,
        }
    }

    /// Scheme of links that need special presentation, e.g. phone numbers.
    pub fn protocol(&self, url: &LinkUrl) -> Option<&'static str> {
        let LinkUrl::Absolute(url) = url else {
            return None;
        };
        Self::PROTOCOLS
            .iter()
            .find(|protocol| **protocol == url.scheme())
            .copied()
    }

    fn is_internal_host(&self, host: &str) -> bool {
        self.domains.iter().any(|domain| match domain.strip_prefix("*.") {
            Some(parent) => host == parent || host.ends_with(&format!(".{parent}")),
            None => host == domain,
        })
    }
}
