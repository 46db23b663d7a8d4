use axum::{
    extract::{Request, State},
    http::{header, Uri},
    middleware::Next,
    response::Response,
};

use crate::config::Config;
use crate::AppState;

/// Outcome of host inspection: the root marketing site, or one tenant's
/// namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum HostRoute {
    Root,
    Tenant(String),
}

/// Validates that a slug only contains lowercase ASCII letters, digits and
/// hyphens, does not start or end with a hyphen, and is between 2 and 63
/// characters. Anything else never reaches the directory lookup.
pub fn is_valid_slug(s: &str) -> bool {
    let len = s.len();
    len >= 2
        && len <= 63
        && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !s.starts_with('-')
        && !s.ends_with('-')
}

/// Pure host-header parsing. No authentication, no lookups.
///
/// Unrecognized host shapes fail open to the root site: misrouting to the
/// wrong tenant would be a security defect, misrouting to the marketing
/// page is not. Reserved slugs are re-checked here as defense in depth and
/// also resolve to the root site.
pub fn resolve_host(config: &Config, host: &str) -> HostRoute {
    let host = host.split(':').next().unwrap_or(host).to_lowercase();
    if host.is_empty() {
        return HostRoute::Root;
    }

    let labels: Vec<&str> = host.split('.').collect();

    let slug = if labels.iter().any(|l| *l == config.dev_root_token) {
        // Local development: "mueller.localhost" → "mueller",
        // bare "localhost" → root site.
        if labels[0] == config.dev_root_token {
            return HostRoute::Root;
        }
        labels[0]
    } else if host == config.root_domain {
        return HostRoute::Root;
    } else if host.ends_with(&format!(".{}", config.root_domain)) && labels.len() == 3 {
        if labels[0] == "www" {
            return HostRoute::Root;
        }
        labels[0]
    } else {
        return HostRoute::Root;
    };

    if !is_valid_slug(slug) || config.is_reserved_slug(slug) {
        return HostRoute::Root;
    }

    HostRoute::Tenant(slug.to_string())
}

/// Resolves the tenant from the `Host` header, records the outcome as a
/// request extension and rewrites the path into the tenant namespace
/// `/tenants/{slug}/...`. The extension, not the path, is what the
/// authorization extractors trust.
pub async fn resolve_tenant_host(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let route = resolve_host(&state.config, host);

    if let HostRoute::Tenant(slug) = &route {
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        if !path_and_query.starts_with("/tenants/") {
            let rewritten = format!("/tenants/{slug}{path_and_query}");
            if let Ok(uri) = rewritten.parse::<Uri>() {
                *request.uri_mut() = uri;
            }
        }
    }

    request.extensions_mut().insert(route);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RESERVED_SLUGS;

    fn config() -> Config {
        Config {
            database_url: String::new(),
            host: String::new(),
            port: 0,
            root_domain: "kanzleihub.de".into(),
            dev_root_token: "localhost".into(),
            reserved_slugs: RESERVED_SLUGS.iter().map(|s| s.to_string()).collect(),
            session_max_age_days: 30,
            production: true,
        }
    }

    #[test]
    fn production_subdomain_resolves_tenant() {
        assert_eq!(
            resolve_host(&config(), "mueller.kanzleihub.de"),
            HostRoute::Tenant("mueller".into())
        );
    }

    #[test]
    fn port_suffix_is_stripped() {
        assert_eq!(
            resolve_host(&config(), "mueller.kanzleihub.de:8443"),
            HostRoute::Tenant("mueller".into())
        );
    }

    #[test]
    fn bare_root_domain_and_www_are_root() {
        assert_eq!(resolve_host(&config(), "kanzleihub.de"), HostRoute::Root);
        assert_eq!(resolve_host(&config(), "www.kanzleihub.de"), HostRoute::Root);
    }

    #[test]
    fn dev_host_rules() {
        assert_eq!(
            resolve_host(&config(), "mueller.localhost:3000"),
            HostRoute::Tenant("mueller".into())
        );
        assert_eq!(resolve_host(&config(), "localhost:3000"), HostRoute::Root);
    }

    #[test]
    fn unknown_shapes_fail_open_to_root() {
        assert_eq!(resolve_host(&config(), "example.com"), HostRoute::Root);
        assert_eq!(
            resolve_host(&config(), "a.b.mueller.kanzleihub.de"),
            HostRoute::Root
        );
        assert_eq!(resolve_host(&config(), ""), HostRoute::Root);
    }

    #[test]
    fn reserved_slugs_never_resolve_even_on_valid_hosts() {
        for slug in ["admin", "www", "api", "status"] {
            let host = format!("{slug}.kanzleihub.de");
            assert_eq!(resolve_host(&config(), &host), HostRoute::Root, "{slug}");
        }
        assert_eq!(resolve_host(&config(), "admin.localhost"), HostRoute::Root);
    }

    #[test]
    fn junk_labels_fail_open() {
        assert_eq!(resolve_host(&config(), "-bad-.kanzleihub.de"), HostRoute::Root);
        assert_eq!(resolve_host(&config(), "x.kanzleihub.de"), HostRoute::Root);
    }
}
