//! Hostname → storage target resolution.
//!
//! Pure functions, recomputed on every request. Multi-segment hosts
//! (`p1.sites.example.com`) resolve to the FIRST dot-delimited label;
//! everything after the first dot is the serving domain and never
//! participates in routing.

use skylift_core::ProjectId;

use crate::error::ProxyError;

/// Extract the project id from a request's Host header value.
///
/// A single-label host (`localhost`) has no subdomain to route on and
/// is rejected — forwarding it would target an undefined prefix.
pub fn project_from_host(host: &str) -> Result<ProjectId, ProxyError> {
    // Host headers may carry a port; it plays no part in routing.
    let hostname = host.split(':').next().unwrap_or("");

    let Some((label, rest)) = hostname.split_once('.') else {
        return Err(ProxyError::BadHost {
            host: host.to_string(),
            reason: "no subdomain label".to_string(),
        });
    };
    if rest.is_empty() {
        return Err(ProxyError::BadHost {
            host: host.to_string(),
            reason: "empty domain after subdomain".to_string(),
        });
    }

    ProjectId::parse(label).map_err(|e| ProxyError::BadHost {
        host: host.to_string(),
        reason: e.to_string(),
    })
}

/// The one path transformation the proxy performs: bare `/` becomes
/// `/index.html`. Every other path passes through byte-identical.
///
/// Operates on the URI path component only — query strings never
/// appear here. [`upstream_url`] carries them over unchanged.
pub fn rewrite_path(path: &str) -> &str {
    if path == "/" { "/index.html" } else { path }
}

/// Target URL for a resolved request: `{base}/{project}{path}`.
pub fn target_url(base: &str, project: &ProjectId, path: &str) -> String {
    format!("{}/{}{}", base.trim_end_matches('/'), project, path)
}

/// Full upstream URL: rewritten path under the project's storage
/// prefix, original query string appended. The rewrite keys on the
/// path alone, so `GET /?x=1` forwards as `/index.html?x=1`.
pub fn upstream_url(
    base: &str,
    project: &ProjectId,
    path: &str,
    query: Option<&str>,
) -> String {
    let mut url = target_url(base, project, rewrite_path(path));
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://sites.example.net/__outputs";

    #[test]
    fn first_label_is_the_project_id() {
        let p = project_from_host("p1.example.com").unwrap();
        assert_eq!(p.as_str(), "p1");
    }

    #[test]
    fn multi_segment_hosts_use_only_the_first_label() {
        let p = project_from_host("p1.sites.example.com").unwrap();
        assert_eq!(p.as_str(), "p1");
    }

    #[test]
    fn port_is_ignored() {
        let p = project_from_host("p1.localtest.me:8000").unwrap();
        assert_eq!(p.as_str(), "p1");
    }

    #[test]
    fn single_label_host_is_rejected() {
        assert!(matches!(
            project_from_host("localhost"),
            Err(ProxyError::BadHost { .. })
        ));
        assert!(matches!(
            project_from_host("localhost:8000"),
            Err(ProxyError::BadHost { .. })
        ));
    }

    #[test]
    fn empty_or_dotted_garbage_is_rejected() {
        assert!(project_from_host("").is_err());
        assert!(project_from_host(".example.com").is_err());
        assert!(project_from_host("p1.").is_err());
    }

    #[test]
    fn target_ends_exactly_in_the_project_id() {
        let p = project_from_host("p1.example.com").unwrap();
        let target = target_url(BASE, &p, "");
        assert!(target.ends_with("/p1"));
        assert_eq!(target, "https://sites.example.net/__outputs/p1");
    }

    #[test]
    fn hostname_case_does_not_fork_storage_prefixes() {
        // DNS is case-insensitive; the storage prefix must not be.
        let p = project_from_host("P1.example.com").unwrap();
        assert_eq!(target_url(BASE, &p, "/a.css"), format!("{BASE}/p1/a.css"));
    }

    #[test]
    fn root_path_rewrites_to_index_html() {
        assert_eq!(rewrite_path("/"), "/index.html");
    }

    #[test]
    fn all_other_paths_pass_through_byte_identical() {
        for path in ["/index.html", "/a/", "/a/b.css", "//"] {
            assert_eq!(rewrite_path(path), path);
        }
    }

    #[test]
    fn query_strings_survive_the_root_rewrite() {
        let p = project_from_host("p1.example.com").unwrap();
        assert_eq!(
            upstream_url(BASE, &p, "/", Some("x=1")),
            format!("{BASE}/p1/index.html?x=1")
        );
        assert_eq!(
            upstream_url(BASE, &p, "/a.css", Some("v=2")),
            format!("{BASE}/p1/a.css?v=2")
        );
        assert_eq!(
            upstream_url(BASE, &p, "/", None),
            format!("{BASE}/p1/index.html")
        );
    }
}
