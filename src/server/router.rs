//! Route resolution.

/// Where a request path leads.
#[derive(Debug, PartialEq, Eq)]
pub enum Route<'a> {
    /// `/` exactly.
    Home,
    /// `/static/<rest>`: a file from the static store.
    Static(&'a str),
    /// `/<short>`: one path segment, looked up in the redirect map.
    Redirect(&'a str),
    /// Anything deeper or with a trailing slash.
    Invalid(&'a str),
}

/// Resolve a raw request path. Matching happens on the encoded path;
/// captured pieces are percent-decoded by the handlers.
pub fn resolve(path: &str) -> Route<'_> {
    if path == "/" {
        return Route::Home;
    }
    if let Some(rest) = path.strip_prefix("/static/") {
        return Route::Static(rest);
    }
    let rest = path.strip_prefix('/').unwrap_or(path);
    if !rest.is_empty() && !rest.contains('/') {
        return Route::Redirect(rest);
    }
    Route::Invalid(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("/"), Route::Home);
        assert_eq!(resolve("/abc"), Route::Redirect("abc"));
        assert_eq!(resolve("/abc-123"), Route::Redirect("abc-123"));
        // "/static" without the trailing slash is an ordinary short code
        assert_eq!(resolve("/static"), Route::Redirect("static"));
        assert_eq!(resolve("/static/styles.css"), Route::Static("styles.css"));
        assert_eq!(resolve("/static/img/logo.png"), Route::Static("img/logo.png"));
        assert_eq!(resolve("/abc/"), Route::Invalid("abc/"));
        assert_eq!(resolve("/a/b/c"), Route::Invalid("a/b/c"));
        assert_eq!(resolve("//"), Route::Invalid("/"));
    }
}
