//! Entry-point links shown next to a lesson.

use std::collections::BTreeMap;

use url::Url;

use crate::config::Config;
use crate::domain::{ExportFormat, GroupId, ModuleContext, UserId};
use crate::error::{ExportError, Result};
use crate::host::AccessControl;

/// Capability needed to reorder pages.
pub const MANAGE_CAPABILITY: &str = "mod/lesson:managelesson";

const EXPORT_PATH: &str = "local/lessonexport/export.php";
const SORT_PATH: &str = "local/lessonexport/sortpages.php";

/// Label shown for a format's export link.
pub fn export_label(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Pdf => "Export as PDF",
        ExportFormat::Epub => "Export as EPUB",
    }
}

/// Label of the reorder link.
pub const SORT_LABEL: &str = "Sort pages";

/// Returns the export and reorder links `user` may follow, keyed by label.
///
/// One export link per format the user holds the export capability for,
/// plus the reorder link for lesson managers. `on_behalf_of` and `group`
/// are passed through as query parameters.
pub fn export_links<A: AccessControl + ?Sized>(
    access: &A,
    config: &Config,
    module: &ModuleContext,
    user: UserId,
    on_behalf_of: Option<UserId>,
    group: Option<GroupId>,
) -> Result<BTreeMap<String, String>> {
    let base = site_base(config)?;
    let mut links = BTreeMap::new();

    for format in ExportFormat::ALL {
        if !access.has_capability(&format.capability(), module.context_id, user)? {
            continue;
        }
        let mut url = endpoint(&base, EXPORT_PATH)?;
        url.query_pairs_mut()
            .append_pair("id", &module.module_id.to_string())
            .append_pair("type", format.as_str());
        append_scope(&mut url, on_behalf_of, group);
        links.insert(export_label(format).to_string(), url.to_string());
    }

    if access.has_capability(MANAGE_CAPABILITY, module.context_id, user)? {
        let mut url = endpoint(&base, SORT_PATH)?;
        url.query_pairs_mut()
            .append_pair("id", &module.module_id.to_string());
        append_scope(&mut url, on_behalf_of, group);
        links.insert(SORT_LABEL.to_string(), url.to_string());
    }

    Ok(links)
}

fn site_base(config: &Config) -> Result<Url> {
    Url::parse(&format!("{}/", config.site_root()))
        .map_err(|e| ExportError::Config(format!("site_url '{}': {e}", config.site_url)))
}

fn endpoint(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| ExportError::Config(format!("cannot build link to {path}: {e}")))
}

fn append_scope(url: &mut Url, on_behalf_of: Option<UserId>, group: Option<GroupId>) {
    let mut query = url.query_pairs_mut();
    if let Some(user) = on_behalf_of {
        query.append_pair("userid", &user.to_string());
    }
    if let Some(group) = group {
        query.append_pair("groupid", &group.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContextId, GroupMode, LessonId, ModuleId};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    struct Caps(HashSet<&'static str>);

    impl AccessControl for Caps {
        fn has_capability(&self, cap: &str, _ctx: ContextId, _user: UserId) -> Result<bool> {
            Ok(self.0.contains(cap))
        }
        fn is_group_member(&self, _group: GroupId, _user: UserId) -> Result<bool> {
            Ok(false)
        }
        fn user_fullname(&self, _user: UserId) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn module() -> ModuleContext {
        ModuleContext {
            module_id: ModuleId::new(12),
            context_id: ContextId::new(40),
            course_id: 2,
            lesson_id: LessonId::new(3),
            group_mode: GroupMode::None,
        }
    }

    fn config() -> Config {
        Config {
            site_url: "https://school.example/moodle/".into(),
            ..Config::default()
        }
    }

    #[test]
    fn links_follow_capabilities() {
        let caps = Caps(["local/lessonexport:exportpdf"].into_iter().collect());
        let links =
            export_links(&caps, &config(), &module(), UserId::new(5), None, None).unwrap();

        assert_eq!(links.len(), 1);
        assert_eq!(
            links["Export as PDF"],
            "https://school.example/moodle/local/lessonexport/export.php?id=12&type=pdf"
        );
    }

    #[test]
    fn managers_get_sort_link_with_scope() {
        let caps = Caps(
            [
                "local/lessonexport:exportpdf",
                "local/lessonexport:exportepub",
                MANAGE_CAPABILITY,
            ]
            .into_iter()
            .collect(),
        );
        let links = export_links(
            &caps,
            &config(),
            &module(),
            UserId::new(5),
            Some(UserId::new(8)),
            Some(GroupId::new(3)),
        )
        .unwrap();

        assert_eq!(links.len(), 3);
        assert_eq!(
            links["Export as EPUB"],
            "https://school.example/moodle/local/lessonexport/export.php?id=12&type=epub&userid=8&groupid=3"
        );
        assert_eq!(
            links[SORT_LABEL],
            "https://school.example/moodle/local/lessonexport/sortpages.php?id=12&userid=8&groupid=3"
        );
    }

    #[test]
    fn no_capabilities_no_links() {
        let links = export_links(
            &Caps(HashSet::new()),
            &config(),
            &module(),
            UserId::new(5),
            None,
            None,
        )
        .unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn unparseable_site_url_is_a_config_error() {
        let bad = Config {
            site_url: "not a url".into(),
            ..Config::default()
        };
        let err = export_links(&Caps(HashSet::new()), &bad, &module(), UserId::new(1), None, None)
            .unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));
    }
}
