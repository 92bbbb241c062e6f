/*
 * Responsibility
 * - 公開 prefix → backend base URL の静的な対応表 (起動時に一度だけ組み立てる)
 * - prefix マッチ (segment 単位) と path rewrite
 * - /health が返す service 名の一覧
 * - upstream URL が entry の範囲 (base path + namespace) から外れないことの確認
 */
use url::Url;

use crate::config::BackendUrls;
use crate::services::auth::AccessPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRewrite {
    /// Forward the public path unchanged (`/auth/login` → `/auth/login`).
    Preserve,
    /// Drop the public prefix (`/api/order/orders/` → `/orders/`).
    StripPrefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected(AccessPolicy),
}

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub name: &'static str,
    pub prefix: &'static str,
    pub base_url: Url,
    pub rewrite: PathRewrite,
    pub access: Access,
}

impl RouteEntry {
    fn protected(name: &'static str, prefix: &'static str, base_url: &Url) -> Self {
        Self {
            name,
            prefix,
            base_url: base_url.clone(),
            rewrite: PathRewrite::StripPrefix,
            access: Access::Protected(AccessPolicy::mutation_requires_admin()),
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self.access, Access::Public)
    }

    /// Rewritten backend path when `path` falls under this prefix.
    fn rewrite_path(&self, path: &str) -> Option<String> {
        let rest = path.strip_prefix(self.prefix)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }

        let rewritten = match self.rewrite {
            PathRewrite::Preserve => path.to_string(),
            PathRewrite::StripPrefix if rest.is_empty() => "/".to_string(),
            PathRewrite::StripPrefix => rest.to_string(),
        };
        Some(rewritten)
    }

    /// Backend-side path that every URL built from this entry must stay under.
    fn upstream_scope(&self) -> String {
        let base = self.base_url.path().trim_end_matches('/');
        match self.rewrite {
            PathRewrite::Preserve => format!("{base}{}", self.prefix),
            PathRewrite::StripPrefix => base.to_string(),
        }
    }

    /// Upstream URL for a rewritten path.
    ///
    /// `None` when URL normalisation (dot segments, `%2e`) would move the
    /// request out of this entry's scope on the backend.
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> Option<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let raw = match query {
            Some(q) if !q.is_empty() => format!("{base}{path}?{q}"),
            _ => format!("{base}{path}"),
        };
        let url = Url::parse(&raw).ok()?;

        let scope = self.upstream_scope();
        let rest = url.path().strip_prefix(scope.as_str())?;
        let in_scope = (rest.is_empty() || rest.starts_with('/'))
            && url.origin() == self.base_url.origin();

        in_scope.then_some(url)
    }
}

/// `.`/`..` segments (raw or percent-encoded) and encoded separators.
///
/// Prefix matching works on the raw path while the upstream URL is normalised,
/// so such paths could be matched against one entry and land elsewhere.
pub fn is_traversal(path: &str) -> bool {
    path.split('/').any(|segment| {
        let segment = segment.to_ascii_lowercase();
        let decoded = segment.replace("%2e", ".");
        decoded == "."
            || decoded == ".."
            || segment.contains("%2f")
            || segment.contains("%5c")
            || segment.contains('\\')
    })
}

/// A resolved dispatch target: the matched entry plus the rewritten path.
#[derive(Debug)]
pub struct Target<'a> {
    pub entry: &'a RouteEntry,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    /// Login relay + the four resource backends.
    pub fn from_backends(backends: &BackendUrls) -> Self {
        Self::new(vec![
            RouteEntry {
                name: "auth",
                prefix: "/auth",
                base_url: backends.user.clone(),
                rewrite: PathRewrite::Preserve,
                access: Access::Public,
            },
            RouteEntry::protected("user", "/api/user", &backends.user),
            RouteEntry::protected("restaurant", "/api/restaurant", &backends.restaurant),
            RouteEntry::protected("order", "/api/order", &backends.order),
            RouteEntry::protected("payment", "/api/payment", &backends.payment),
        ])
    }

    pub fn resolve(&self, path: &str) -> Option<Target<'_>> {
        self.entries.iter().find_map(|entry| {
            entry
                .rewrite_path(path)
                .map(|path| Target { entry, path })
        })
    }

    /// Names of the protected resource backends, in table order.
    pub fn service_names(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|e| !e.is_public())
            .map(|e| e.name)
            .collect()
    }
}
