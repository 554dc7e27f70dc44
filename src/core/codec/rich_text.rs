//! Embedded object references inside rich text markup

use crate::domain::PortableId;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// What to do with one embed element while rewriting markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedAction {
    /// Leave the element untouched
    Keep,
    /// Point the element at another object
    Replace(PortableId),
    /// Remove the element from the markup
    Drop,
}

fn embed_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<(embed-inline|embed)\b([^>]*?)\bobject_uuid="([^"]+)"([^>]*?)/>"#)
            .expect("embed pattern is valid")
    })
}

/// Object uuids embedded in the markup, in document order, without duplicates
pub fn embedded_uuids(markup: &str) -> Vec<PortableId> {
    let mut uuids: Vec<PortableId> = Vec::new();
    for captures in embed_pattern().captures_iter(markup) {
        if let Ok(uuid) = PortableId::new(&captures[3]) {
            if !uuids.contains(&uuid) {
                uuids.push(uuid);
            }
        }
    }
    uuids
}

/// Rewrites every embed element according to `resolve`
///
/// `resolve` is called once per element, so an object embedded twice is
/// asked about twice; callers memoize decisions themselves.
pub fn rewrite_embeds<F>(markup: &str, mut resolve: F) -> String
where
    F: FnMut(&PortableId) -> EmbedAction,
{
    embed_pattern()
        .replace_all(markup, |captures: &Captures<'_>| {
            let Ok(uuid) = PortableId::new(&captures[3]) else {
                return captures[0].to_string();
            };
            match resolve(&uuid) {
                EmbedAction::Keep => captures[0].to_string(),
                EmbedAction::Replace(target) => format!(
                    r#"<{}{}object_uuid="{}"{}/>"#,
                    &captures[1], &captures[2], target, &captures[4]
                ),
                EmbedAction::Drop => String::new(),
            }
        })
        .into_owned()
}
