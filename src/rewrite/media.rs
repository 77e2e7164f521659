//! Embedded media references and their resolution against host storage.

use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::domain::ContextId;
use crate::error::{ExportError, Result};
use crate::host::{FileStore, StoredFile};

/// Host endpoint that serves stored files.
const FILE_ENDPOINT: &str = "/pluginfile.php";

/// Component owning files that may be embedded in a restricted export.
const LESSON_COMPONENT: &str = "mod_lesson";

/// A parsed reference to a stored host file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaRef {
    pub context_id: ContextId,
    pub component: String,
    pub file_area: String,
    pub item_id: i64,
    /// Directory path, always starting and ending with `/`.
    pub file_path: String,
    pub file_name: String,
}

impl MediaRef {
    /// Parses a file URL served by `site_url`.
    ///
    /// Accepts both the slash-argument form
    /// (`/pluginfile.php/<ctx>/<component>/<area>/<item>/<path...>/<file>`)
    /// and the query form (`/pluginfile.php?file=/<ctx>/...`). Returns `None`
    /// for anything else.
    pub fn parse(url: &str, site_url: &str) -> Option<Self> {
        let prefix = format!("{}{}", site_url.trim_end_matches('/'), FILE_ENDPOINT);
        let params = url.strip_prefix(prefix.as_str())?;

        let params = if params.starts_with('?') {
            let start = params.find("file=")? + "file=".len();
            let rest = &params[start..];
            rest.split('&').next().unwrap_or(rest)
        } else {
            params.split(['?', '#']).next().unwrap_or(params)
        };

        let decoded = url_decode(params);
        let mut parts = decoded.split('/');
        if !parts.next()?.is_empty() {
            return None;
        }

        let context_id: i64 = parts.next()?.parse().ok()?;
        let component = clean_name(parts.next()?)?;
        let file_area = clean_name(parts.next()?)?;
        let item = parts.next()?;
        let mut rest: Vec<&str> = parts.collect();

        let (item_id, file_name) = match rest.pop() {
            None => (0, item.to_string()),
            Some(name) => match item.parse::<i64>() {
                Ok(id) => (id, name.to_string()),
                Err(_) => {
                    rest.insert(0, item);
                    (0, name.to_string())
                }
            },
        };
        if file_name.is_empty() {
            return None;
        }

        let file_path = if rest.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", rest.join("/"))
        };

        Some(Self {
            context_id: ContextId::new(context_id),
            component,
            file_area,
            item_id,
            file_path,
            file_name,
        })
    }

    /// Returns the alternative reading where the item id was really the
    /// first directory of the path.
    pub fn with_item_in_path(&self) -> Option<Self> {
        if self.item_id == 0 {
            return None;
        }
        Some(Self {
            item_id: 0,
            file_path: format!("/{}{}", self.item_id, self.file_path),
            ..self.clone()
        })
    }
}

/// Resolves media URLs to file contents through a [`FileStore`].
pub struct MediaResolver<'a, S: FileStore + ?Sized> {
    store: &'a S,
    site_url: &'a str,
}

impl<'a, S: FileStore + ?Sized> MediaResolver<'a, S> {
    pub fn new(store: &'a S, site_url: &'a str) -> Self {
        Self { store, site_url }
    }

    /// Fetches the file behind `url`.
    ///
    /// With `restrict_to` set, only files owned by the lesson component in
    /// that context are allowed. A miss is retried once with the item id
    /// folded into the path.
    pub fn resolve(&self, url: &str, restrict_to: Option<ContextId>) -> Result<StoredFile> {
        let unavailable = || ExportError::MediaUnavailable {
            url: url.to_string(),
        };

        let media = MediaRef::parse(url, self.site_url).ok_or_else(unavailable)?;

        if let Some(context) = restrict_to
            && (media.component != LESSON_COMPONENT || media.context_id != context)
        {
            debug!(url, "media outside the lesson context");
            return Err(unavailable());
        }

        if let Some(file) = self.store.find_file(&media)? {
            return Ok(file);
        }
        if let Some(folded) = media.with_item_in_path()
            && let Some(file) = self.store.find_file(&folded)?
        {
            return Ok(file);
        }
        Err(unavailable())
    }
}

/// Decodes `%xx` escapes and `+` the way form-encoded URLs do.
fn url_decode(s: &str) -> String {
    let spaced = s.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Accepts host component/area names: lowercase letters, digits, underscores.
fn clean_name(s: &str) -> Option<String> {
    let ok = !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    ok.then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const SITE: &str = "https://school.example";

    #[test]
    fn parses_slash_arguments() {
        let media = MediaRef::parse(
            "https://school.example/pluginfile.php/12/mod_lesson/page_contents/34/diagrams/My%20Map.png",
            SITE,
        )
        .unwrap();
        assert_eq!(media.context_id, ContextId::new(12));
        assert_eq!(media.component, "mod_lesson");
        assert_eq!(media.file_area, "page_contents");
        assert_eq!(media.item_id, 34);
        assert_eq!(media.file_path, "/diagrams/");
        assert_eq!(media.file_name, "My Map.png");
    }

    #[test]
    fn parses_query_form() {
        let media = MediaRef::parse(
            "https://school.example/pluginfile.php?file=%2F12%2Fmod_lesson%2Fpage_contents%2F34%2Fa.jpg",
            SITE,
        )
        .unwrap();
        assert_eq!(media.item_id, 34);
        assert_eq!(media.file_path, "/");
        assert_eq!(media.file_name, "a.jpg");
    }

    #[test]
    fn missing_item_means_item_zero() {
        let media =
            MediaRef::parse("https://school.example/pluginfile.php/12/mod_lesson/intro/a.jpg", SITE)
                .unwrap();
        assert_eq!(media.item_id, 0);
        assert_eq!(media.file_name, "a.jpg");
    }

    #[test]
    fn slash_form_ignores_query_string() {
        let media = MediaRef::parse(
            "https://school.example/pluginfile.php/12/mod_lesson/page_contents/3/a.jpg?forcedownload=1",
            SITE,
        )
        .unwrap();
        assert_eq!(media.file_name, "a.jpg");
    }

    #[test]
    fn rejects_other_hosts_and_endpoints() {
        assert!(MediaRef::parse("https://elsewhere.example/pluginfile.php/1/a/b/c.png", SITE).is_none());
        assert!(MediaRef::parse("https://school.example/draftfile.php/1/a/b/c.png", SITE).is_none());
        assert!(MediaRef::parse("https://school.example/pluginfile.php/x/a/b/c.png", SITE).is_none());
    }

    #[test]
    fn folds_item_into_path() {
        let media = MediaRef::parse(
            "https://school.example/pluginfile.php/12/mod_lesson/page_contents/2024/a.png",
            SITE,
        )
        .unwrap();
        let folded = media.with_item_in_path().unwrap();
        assert_eq!(folded.item_id, 0);
        assert_eq!(folded.file_path, "/2024/");
    }

    // ===========================================
    // Resolver
    // ===========================================

    struct FakeStore {
        file: MediaRef,
        lookups: RefCell<Vec<MediaRef>>,
    }

    impl FileStore for FakeStore {
        fn find_file(&self, media: &MediaRef) -> Result<Option<StoredFile>> {
            self.lookups.borrow_mut().push(media.clone());
            Ok((media == &self.file).then(|| StoredFile {
                filename: media.file_name.clone(),
                mime_type: Some("image/png".into()),
                content: vec![1, 2, 3],
            }))
        }
    }

    fn store_with(path: &str, item_id: i64) -> FakeStore {
        FakeStore {
            file: MediaRef {
                context_id: ContextId::new(12),
                component: "mod_lesson".into(),
                file_area: "page_contents".into(),
                item_id,
                file_path: path.into(),
                file_name: "a.png".into(),
            },
            lookups: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn resolves_direct_hit() {
        let store = store_with("/", 5);
        let resolver = MediaResolver::new(&store, SITE);
        let file = resolver
            .resolve(
                "https://school.example/pluginfile.php/12/mod_lesson/page_contents/5/a.png",
                None,
            )
            .unwrap();
        assert_eq!(file.content, vec![1, 2, 3]);
        assert_eq!(store.lookups.borrow().len(), 1);
    }

    #[test]
    fn retries_with_item_folded_into_path() {
        let store = store_with("/5/", 0);
        let resolver = MediaResolver::new(&store, SITE);
        let file = resolver.resolve(
            "https://school.example/pluginfile.php/12/mod_lesson/page_contents/5/a.png",
            None,
        );
        assert!(file.is_ok());
        assert_eq!(store.lookups.borrow().len(), 2);
    }

    #[test]
    fn restricted_resolution_rejects_foreign_context() {
        let store = store_with("/", 5);
        let resolver = MediaResolver::new(&store, SITE);
        let err = resolver
            .resolve(
                "https://school.example/pluginfile.php/12/mod_lesson/page_contents/5/a.png",
                Some(ContextId::new(99)),
            )
            .unwrap_err();
        assert!(matches!(err, ExportError::MediaUnavailable { .. }));
        assert!(store.lookups.borrow().is_empty());
    }

    #[test]
    fn restricted_resolution_rejects_foreign_component() {
        let store = store_with("/", 5);
        let resolver = MediaResolver::new(&store, SITE);
        let err = resolver.resolve(
            "https://school.example/pluginfile.php/12/user/icon/5/a.png",
            Some(ContextId::new(12)),
        );
        assert!(err.is_err());
    }

    #[test]
    fn miss_is_media_unavailable() {
        let store = store_with("/other/", 0);
        let resolver = MediaResolver::new(&store, SITE);
        let err = resolver
            .resolve(
                "https://school.example/pluginfile.php/12/mod_lesson/page_contents/5/a.png",
                None,
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "media unavailable: https://school.example/pluginfile.php/12/mod_lesson/page_contents/5/a.png"
        );
    }
}
