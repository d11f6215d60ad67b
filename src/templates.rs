//! HTML templates with development-mode reload.
//!
//! Templates are plain HTML with `{{name}}` placeholders; values are
//! HTML-escaped when substituted. A template loaded from a live directory
//! re-checks the file's modification time on every render and reloads when
//! it changed, so edits show up without a restart. Embedded templates are
//! parsed once and never reload.

use std::time::SystemTime;

use tokio::sync::RwLock;

use crate::assets::{AssetError, AssetStore};

/// Error type for template loading and rendering.
#[derive(Debug)]
pub enum TemplateError {
    /// Underlying asset read failed.
    Load { name: String, source: AssetError },
    /// Template file is not valid UTF-8.
    Utf8 { name: String },
    /// Placeholder opened with `{{` but never closed.
    Malformed { name: String },
    /// Placeholder has no value in the substitution list.
    MissingVar { name: String, var: String },
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::Load { name, source } => {
                write!(f, "could not load template {}: {}", name, source)
            }
            TemplateError::Utf8 { name } => {
                write!(f, "template {} is not valid UTF-8", name)
            }
            TemplateError::Malformed { name } => {
                write!(f, "template {} has an unclosed placeholder", name)
            }
            TemplateError::MissingVar { name, var } => {
                write!(f, "template {} has no value for '{{{{{}}}}}'", name, var)
            }
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateError::Load { source, .. } => Some(source),
            _ => None,
        }
    }
}

struct Cached {
    source: String,
    modified: Option<SystemTime>,
}

/// A loaded template. Shared by reference across request handlers; the
/// cached source sits behind a lock so a development-mode reload does not
/// disturb concurrent renders.
pub struct Template {
    store: AssetStore,
    name: String,
    cached: RwLock<Cached>,
}

impl Template {
    /// Load a template by name from an asset store.
    pub async fn load(store: AssetStore, name: &str) -> Result<Self, TemplateError> {
        let modified = store
            .modified(name)
            .await
            .map_err(|source| TemplateError::Load {
                name: name.to_string(),
                source,
            })?;
        let source = read_source(&store, name).await?;
        Ok(Self {
            store,
            name: name.to_string(),
            cached: RwLock::new(Cached { source, modified }),
        })
    }

    /// Render the template with the given placeholder values.
    pub async fn render(&self, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
        self.refresh().await?;
        let cached = self.cached.read().await;
        substitute(&self.name, &cached.source, vars)
    }

    /// Reload the source when the file on disk is newer than the cache.
    /// Embedded stores report no modification time and are never reloaded.
    async fn refresh(&self) -> Result<(), TemplateError> {
        let on_disk = match self.store.modified(&self.name).await {
            Ok(Some(t)) => t,
            Ok(None) => return Ok(()),
            Err(source) => {
                return Err(TemplateError::Load {
                    name: self.name.clone(),
                    source,
                })
            }
        };

        {
            let cached = self.cached.read().await;
            if let Some(current) = cached.modified {
                if on_disk <= current {
                    return Ok(());
                }
            }
        }

        let source = read_source(&self.store, &self.name).await?;
        let mut cached = self.cached.write().await;
        cached.source = source;
        cached.modified = Some(on_disk);
        Ok(())
    }
}

async fn read_source(store: &AssetStore, name: &str) -> Result<String, TemplateError> {
    let bytes = store.read(name).await.map_err(|source| TemplateError::Load {
        name: name.to_string(),
        source,
    })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| TemplateError::Utf8 {
        name: name.to_string(),
    })
}

/// Replace `{{name}}` placeholders with escaped values.
fn substitute(name: &str, source: &str, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| TemplateError::Malformed {
            name: name.to_string(),
        })?;
        let var = after[..end].trim();
        let value = vars
            .iter()
            .find(|(k, _)| *k == var)
            .map(|(_, v)| *v)
            .ok_or_else(|| TemplateError::MissingVar {
                name: name.to_string(),
                var: var.to_string(),
            })?;
        escape_into(&mut out, value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// HTML-escape a value into the output buffer.
fn escape_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets;
    use std::time::Duration;

    #[test]
    fn test_substitute() {
        let out = substitute(
            "t",
            "<h1>{{title}}</h1><p>{{ body }}</p>",
            &[("title", "Hi"), ("body", "there")],
        )
        .unwrap();
        assert_eq!(out, "<h1>Hi</h1><p>there</p>");
    }

    #[test]
    fn test_substitute_escapes_values() {
        let out = substitute("t", "{{v}}", &[("v", "<script>&\"'</script>")]).unwrap();
        assert_eq!(out, "&lt;script&gt;&amp;&quot;&#39;&lt;/script&gt;");
    }

    #[test]
    fn test_substitute_missing_var() {
        let err = substitute("t", "{{nope}}", &[]).unwrap_err();
        assert!(matches!(err, TemplateError::MissingVar { .. }));
    }

    #[test]
    fn test_substitute_unclosed() {
        let err = substitute("t", "a {{broken", &[]).unwrap_err();
        assert!(matches!(err, TemplateError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_render_embedded() {
        let store = AssetStore::mount(false, "", assets::TEMPLATES).unwrap();
        let tpl = Template::load(store, "home.html").await.unwrap();
        let out = tpl.render(&[("title", "Home")]).await.unwrap();
        assert!(out.contains("Home"));
    }

    #[tokio::test]
    async fn test_dev_reload_on_modification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "one {{n}}").unwrap();

        let store = AssetStore::mount(true, dir.path(), assets::TEMPLATES).unwrap();
        let tpl = Template::load(store, "page.html").await.unwrap();
        assert_eq!(tpl.render(&[("n", "1")]).await.unwrap(), "one 1");

        // Rewrite and push the mtime firmly past the cached one
        std::fs::write(&path, "two {{n}}").unwrap();
        let f = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        f.set_modified(SystemTime::now() + Duration::from_secs(10))
            .unwrap();

        assert_eq!(tpl.render(&[("n", "2")]).await.unwrap(), "two 2");
    }

    #[tokio::test]
    async fn test_unchanged_file_not_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "stable").unwrap();

        let store = AssetStore::mount(true, dir.path(), assets::TEMPLATES).unwrap();
        let tpl = Template::load(store, "page.html").await.unwrap();
        assert_eq!(tpl.render(&[]).await.unwrap(), "stable");
        assert_eq!(tpl.render(&[]).await.unwrap(), "stable");
    }

    #[tokio::test]
    async fn test_load_missing_template() {
        let store = AssetStore::mount(false, "", assets::TEMPLATES).unwrap();
        assert!(matches!(
            Template::load(store, "absent.html").await,
            Err(TemplateError::Load { .. })
        ));
    }
}
