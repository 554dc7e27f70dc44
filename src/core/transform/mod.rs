//! Transform pipeline
//!
//! Record transformers run on sections, languages, state groups, content
//! types and content objects before they enter the working graph. A
//! transformer returns `None` (no change) or a replacement record, which may
//! carry a new identifier or `removed: true`.
//!
//! Resolution order, first applicable transformer wins:
//!
//! - content objects: exact uuid → class → global (registration order)
//! - other categories: exact identifier → wildcard `*` → static rename map
//!
//! Declarative rules from configuration are turned into transformers by
//! [`rules::build_pipeline`].

pub mod object;
pub mod rules;

use crate::domain::{
    ClassIdentifier, ContentObjectRecord, ContentTypeRecord, FerryError, LanguageRecord,
    PortableId, Result, SectionRecord, StateGroupRecord,
};
use std::collections::{BTreeMap, HashMap};

pub use object::{remap_references, transform_content_object, DroppedTarget, RewriteContext};
pub use rules::{build_pipeline, RuleAction, TransformCategory};

/// Key passed to wildcard and global transformers
pub const WILDCARD: &str = "*";

/// A record transformer
///
/// `key` is the key the transformer was selected by: the exact identifier,
/// the class identifier, or [`WILDCARD`].
pub trait Transformer<R>: Send + Sync {
    fn transform(&self, record: &R, key: &str) -> Result<Option<R>>;
}

impl<R, F> Transformer<R> for F
where
    F: Fn(&R, &str) -> Result<Option<R>> + Send + Sync,
{
    fn transform(&self, record: &R, key: &str) -> Result<Option<R>> {
        self(record, key)
    }
}

/// Identifier-keyed records a category pipeline can rename or remove
pub trait CategoryRecord: Clone + Send + Sync {
    /// Record type name used in messages
    const RECORD_TYPE: &'static str;

    fn identifier(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error when `identifier` is not a valid identifier.
    fn set_identifier(&mut self, identifier: String) -> Result<()>;

    fn is_removed(&self) -> bool;

    fn set_removed(&mut self);
}

impl CategoryRecord for SectionRecord {
    const RECORD_TYPE: &'static str = "section";

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn set_identifier(&mut self, identifier: String) -> Result<()> {
        self.identifier = identifier;
        Ok(())
    }

    fn is_removed(&self) -> bool {
        self.removed
    }

    fn set_removed(&mut self) {
        self.removed = true;
    }
}

impl CategoryRecord for LanguageRecord {
    const RECORD_TYPE: &'static str = "language";

    fn identifier(&self) -> &str {
        &self.locale
    }

    fn set_identifier(&mut self, identifier: String) -> Result<()> {
        self.locale = identifier;
        Ok(())
    }

    fn is_removed(&self) -> bool {
        self.removed
    }

    fn set_removed(&mut self) {
        self.removed = true;
    }
}

impl CategoryRecord for StateGroupRecord {
    const RECORD_TYPE: &'static str = "content-state-group";

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn set_identifier(&mut self, identifier: String) -> Result<()> {
        self.identifier = identifier;
        Ok(())
    }

    fn is_removed(&self) -> bool {
        self.removed
    }

    fn set_removed(&mut self) {
        self.removed = true;
    }
}

impl CategoryRecord for ContentTypeRecord {
    const RECORD_TYPE: &'static str = "content-type";

    fn identifier(&self) -> &str {
        self.identifier.as_str()
    }

    fn set_identifier(&mut self, identifier: String) -> Result<()> {
        self.identifier = ClassIdentifier::new(identifier).map_err(FerryError::Transform)?;
        Ok(())
    }

    fn is_removed(&self) -> bool {
        self.removed
    }

    fn set_removed(&mut self) {
        self.removed = true;
    }
}

/// Transformers for one identifier-keyed category
pub struct CategoryTransforms<R> {
    exact: HashMap<String, Box<dyn Transformer<R>>>,
    wildcard: Vec<Box<dyn Transformer<R>>>,
    static_map: BTreeMap<String, String>,
}

impl<R: CategoryRecord> CategoryTransforms<R> {
    pub fn new() -> Self {
        Self {
            exact: HashMap::new(),
            wildcard: Vec::new(),
            static_map: BTreeMap::new(),
        }
    }

    /// Registers a transformer for one identifier, replacing any previous one
    pub fn register_exact(
        &mut self,
        identifier: impl Into<String>,
        transformer: impl Transformer<R> + 'static,
    ) {
        self.exact.insert(identifier.into(), Box::new(transformer));
    }

    pub fn has_exact(&self, identifier: &str) -> bool {
        self.exact.contains_key(identifier)
    }

    /// Registers a wildcard transformer
    pub fn register_wildcard(&mut self, transformer: impl Transformer<R> + 'static) {
        self.wildcard.push(Box::new(transformer));
    }

    /// Adds a static rename `from` → `to`
    pub fn map(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.static_map.insert(from.into(), to.into());
    }

    pub fn static_map(&self) -> &BTreeMap<String, String> {
        &self.static_map
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcard.is_empty() && self.static_map.is_empty()
    }

    /// Runs the first applicable transformer
    pub fn apply(&self, record: &R) -> Result<Option<R>> {
        let key = record.identifier().to_string();

        if let Some(transformer) = self.exact.get(&key) {
            if let Some(replacement) = transformer.transform(record, &key)? {
                return Ok(Some(replacement));
            }
        }

        for transformer in &self.wildcard {
            if let Some(replacement) = transformer.transform(record, WILDCARD)? {
                return Ok(Some(replacement));
            }
        }

        if let Some(target) = self.static_map.get(&key) {
            let mut replacement = record.clone();
            replacement.set_identifier(target.clone())?;
            return Ok(Some(replacement));
        }

        Ok(None)
    }
}

impl<R: CategoryRecord> Default for CategoryTransforms<R> {
    fn default() -> Self {
        Self::new()
    }
}

type ObjectTransformer = Box<dyn Transformer<ContentObjectRecord>>;

/// Transformers for content objects
#[derive(Default)]
pub struct ObjectTransforms {
    exact: HashMap<PortableId, ObjectTransformer>,
    by_class: HashMap<ClassIdentifier, Vec<ObjectTransformer>>,
    global: Vec<ObjectTransformer>,
}

impl ObjectTransforms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_exact(
        &mut self,
        uuid: PortableId,
        transformer: impl Transformer<ContentObjectRecord> + 'static,
    ) {
        self.exact.insert(uuid, Box::new(transformer));
    }

    pub fn has_exact(&self, uuid: &PortableId) -> bool {
        self.exact.contains_key(uuid)
    }

    pub fn register_class(
        &mut self,
        class: ClassIdentifier,
        transformer: impl Transformer<ContentObjectRecord> + 'static,
    ) {
        self.by_class
            .entry(class)
            .or_default()
            .push(Box::new(transformer));
    }

    pub fn register_global(&mut self, transformer: impl Transformer<ContentObjectRecord> + 'static) {
        self.global.push(Box::new(transformer));
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.by_class.is_empty() && self.global.is_empty()
    }

    /// Runs the first applicable transformer
    pub fn apply(&self, record: &ContentObjectRecord) -> Result<Option<ContentObjectRecord>> {
        if let Some(transformer) = self.exact.get(&record.uuid) {
            if let Some(replacement) = transformer.transform(record, record.uuid.as_str())? {
                return Ok(Some(replacement));
            }
        }

        if let Some(transformers) = self.by_class.get(&record.class_identifier) {
            for transformer in transformers {
                if let Some(replacement) =
                    transformer.transform(record, record.class_identifier.as_str())?
                {
                    return Ok(Some(replacement));
                }
            }
        }

        for transformer in &self.global {
            if let Some(replacement) = transformer.transform(record, WILDCARD)? {
                return Ok(Some(replacement));
            }
        }

        Ok(None)
    }
}

/// Every transformer of an import run
#[derive(Default)]
pub struct TransformPipeline {
    pub sections: CategoryTransforms<SectionRecord>,
    pub languages: CategoryTransforms<LanguageRecord>,
    pub states: CategoryTransforms<StateGroupRecord>,
    pub content_types: CategoryTransforms<ContentTypeRecord>,
    pub objects: ObjectTransforms,
}

impl TransformPipeline {
    /// Pipeline that changes nothing
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
            && self.languages.is_empty()
            && self.states.is_empty()
            && self.content_types.is_empty()
            && self.objects.is_empty()
    }
}

impl std::fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("section_map", &self.sections.static_map)
            .field("language_map", &self.languages.static_map)
            .field("state_map", &self.states.static_map)
            .field("content_type_map", &self.content_types.static_map)
            .field("object_transforms", &!self.objects.is_empty())
            .finish()
    }
}
