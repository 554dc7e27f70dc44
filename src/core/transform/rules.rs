//! Declarative transform rules
//!
//! Turns the `[transforms.*]` configuration tables into transformers and
//! checks every target identifier against the destination first, so a typo
//! fails the run before anything is ingested.

use super::{CategoryRecord, CategoryTransforms, TransformPipeline, WILDCARD};
use crate::adapters::store::ContentStore;
use crate::config::{CategoryTransformConfig, TransformRule, TransformsConfig};
use crate::domain::{ClassIdentifier, ContentObjectRecord, FerryError, PortableId, Result};
use std::fmt;

const CLASS_SCOPE_PREFIX: &str = "class:";

/// Record category a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformCategory {
    Section,
    Language,
    State,
    ContentType,
    Object,
}

impl TransformCategory {
    /// Configuration table name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Section => "sections",
            Self::Language => "languages",
            Self::State => "states",
            Self::ContentType => "content_types",
            Self::Object => "objects",
        }
    }

    /// Whether `identifier` names an existing entity of this category in
    /// the destination
    async fn exists(&self, store: &dyn ContentStore, identifier: &str) -> Result<bool> {
        Ok(match self {
            Self::Section => store.fetch_section(identifier).await?.is_some(),
            Self::Language => store.fetch_language(identifier).await?.is_some(),
            Self::State => store.fetch_state_group(identifier).await?.is_some(),
            Self::ContentType => {
                let Ok(class) = ClassIdentifier::new(identifier) else {
                    return Ok(false);
                };
                store.fetch_content_type(&class).await?.is_some()
            }
            Self::Object => {
                let Ok(uuid) = PortableId::new(identifier) else {
                    return Ok(false);
                };
                store.fetch_object_by_uuid(&uuid).await?.is_some()
            }
        })
    }
}

impl fmt::Display for TransformCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a rule does to a matching record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleAction {
    /// Exclude the record (and, for objects, its subtree)
    Remove,
    /// Give the object a new portable id
    RemapUuid(PortableId),
    /// Move the object to another section
    SetSection(String),
    /// Rename an identifier-keyed record
    SetIdentifier(String),
}

impl RuleAction {
    fn parse(category: TransformCategory, rule: &TransformRule) -> Result<Self> {
        let value = || {
            rule.value.clone().ok_or_else(|| {
                rule_error(category, rule, format!("action '{}' requires a value", rule.action))
            })
        };
        let action = match (category, rule.action.as_str()) {
            (_, "remove") => Self::Remove,
            (TransformCategory::Object, "remap_uuid") => {
                let uuid = PortableId::new(value()?)
                    .map_err(|e| rule_error(category, rule, e.to_string()))?;
                Self::RemapUuid(uuid)
            }
            (TransformCategory::Object, "set_section") => Self::SetSection(value()?),
            (TransformCategory::Object, _) => {
                return Err(rule_error(
                    category,
                    rule,
                    format!("unsupported action '{}'", rule.action),
                ))
            }
            (_, "set_identifier") => Self::SetIdentifier(value()?),
            _ => {
                return Err(rule_error(
                    category,
                    rule,
                    format!("unsupported action '{}'", rule.action),
                ))
            }
        };
        Ok(action)
    }

    /// Applies the action to an identifier-keyed record
    ///
    /// Returns `None` when the record already looks like the result.
    pub fn apply_to_category<R: CategoryRecord>(&self, record: &R) -> Result<Option<R>> {
        match self {
            Self::Remove if record.is_removed() => Ok(None),
            Self::Remove => {
                let mut replacement = record.clone();
                replacement.set_removed();
                Ok(Some(replacement))
            }
            Self::SetIdentifier(identifier) if record.identifier() == identifier => Ok(None),
            Self::SetIdentifier(identifier) => {
                let mut replacement = record.clone();
                replacement.set_identifier(identifier.clone())?;
                Ok(Some(replacement))
            }
            Self::RemapUuid(_) | Self::SetSection(_) => Err(FerryError::Transform(format!(
                "{:?} does not apply to {} records",
                self,
                R::RECORD_TYPE
            ))),
        }
    }

    /// Applies the action to a content object record
    pub fn apply_to_object(
        &self,
        record: &ContentObjectRecord,
    ) -> Result<Option<ContentObjectRecord>> {
        let mut replacement = record.clone();
        match self {
            Self::Remove if record.removed => return Ok(None),
            Self::Remove => replacement.removed = true,
            Self::RemapUuid(uuid) if record.uuid == *uuid => return Ok(None),
            Self::RemapUuid(uuid) => replacement.uuid = uuid.clone(),
            Self::SetSection(section) if record.section_identifier.as_ref() == Some(section) => {
                return Ok(None)
            }
            Self::SetSection(section) => replacement.section_identifier = Some(section.clone()),
            Self::SetIdentifier(_) => {
                return Err(FerryError::Transform(format!(
                    "{:?} does not apply to content objects",
                    self
                )))
            }
        }
        Ok(Some(replacement))
    }
}

fn rule_error(category: TransformCategory, rule: &TransformRule, reason: String) -> FerryError {
    FerryError::Transform(format!(
        "transforms.{} rule on scope '{}': {}",
        category, rule.scope, reason
    ))
}

/// One uuid or identifier may carry a single exact transformer
fn duplicate_scope(category: TransformCategory, scope: &str) -> FerryError {
    FerryError::Transform(format!(
        "transforms.{} has more than one map entry or rule for '{}'",
        category, scope
    ))
}

async fn require_target(
    store: &dyn ContentStore,
    category: TransformCategory,
    target_category: TransformCategory,
    identifier: &str,
    origin: &str,
) -> Result<()> {
    if target_category.exists(store, identifier).await? {
        return Ok(());
    }
    Err(FerryError::Transform(format!(
        "transforms.{} {}: target '{}' does not exist in the destination {}",
        category, origin, identifier, target_category
    )))
}

/// Builds the transform pipeline from configuration
///
/// # Errors
///
/// Returns [`FerryError::Transform`] when a rule is malformed or names a
/// target that does not exist in the destination.
pub async fn build_pipeline(
    config: &TransformsConfig,
    store: &dyn ContentStore,
) -> Result<TransformPipeline> {
    let mut pipeline = TransformPipeline::new();

    build_category(
        &mut pipeline.sections,
        &config.sections,
        TransformCategory::Section,
        store,
    )
    .await?;
    build_category(
        &mut pipeline.languages,
        &config.languages,
        TransformCategory::Language,
        store,
    )
    .await?;
    build_category(
        &mut pipeline.states,
        &config.states,
        TransformCategory::State,
        store,
    )
    .await?;
    build_category(
        &mut pipeline.content_types,
        &config.content_types,
        TransformCategory::ContentType,
        store,
    )
    .await?;
    build_objects(&mut pipeline, &config.objects, store).await?;

    tracing::debug!(pipeline = ?pipeline, "Transform pipeline built");
    Ok(pipeline)
}

async fn build_category<R: CategoryRecord + 'static>(
    transforms: &mut CategoryTransforms<R>,
    config: &CategoryTransformConfig,
    category: TransformCategory,
    store: &dyn ContentStore,
) -> Result<()> {
    for (from, to) in &config.map {
        require_target(store, category, category, to, &format!("map entry '{}'", from)).await?;
        transforms.map(from.clone(), to.clone());
    }

    for rule in &config.rules {
        let action = RuleAction::parse(category, rule)?;
        if let RuleAction::SetIdentifier(target) = &action {
            require_target(store, category, category, target, &format!("rule '{}'", rule.scope))
                .await?;
        }
        let transformer = move |record: &R, _: &str| -> Result<Option<R>> {
            action.apply_to_category(record)
        };
        if rule.scope == WILDCARD {
            transforms.register_wildcard(transformer);
        } else {
            if transforms.has_exact(&rule.scope) {
                return Err(duplicate_scope(category, &rule.scope));
            }
            transforms.register_exact(rule.scope.clone(), transformer);
        }
    }
    Ok(())
}

async fn build_objects(
    pipeline: &mut TransformPipeline,
    config: &CategoryTransformConfig,
    store: &dyn ContentStore,
) -> Result<()> {
    let category = TransformCategory::Object;

    for (from, to) in &config.map {
        let from = PortableId::new(from.as_str()).map_err(|e| {
            FerryError::Transform(format!("transforms.objects map entry '{}': {}", from, e))
        })?;
        let to = PortableId::new(to.as_str()).map_err(|e| {
            FerryError::Transform(format!("transforms.objects map entry '{}': {}", from, e))
        })?;
        let action = RuleAction::RemapUuid(to);
        pipeline.objects.register_exact(
            from,
            move |record: &ContentObjectRecord, _: &str| -> Result<Option<ContentObjectRecord>> {
                action.apply_to_object(record)
            },
        );
    }

    for rule in &config.rules {
        let action = RuleAction::parse(category, rule)?;
        if let RuleAction::SetSection(section) = &action {
            require_target(
                store,
                category,
                TransformCategory::Section,
                section,
                &format!("rule '{}'", rule.scope),
            )
            .await?;
        }
        let transformer =
            move |record: &ContentObjectRecord, _: &str| -> Result<Option<ContentObjectRecord>> {
                action.apply_to_object(record)
            };

        if rule.scope == WILDCARD {
            pipeline.objects.register_global(transformer);
        } else if let Some(class) = rule.scope.strip_prefix(CLASS_SCOPE_PREFIX) {
            require_target(
                store,
                category,
                TransformCategory::ContentType,
                class,
                &format!("rule '{}'", rule.scope),
            )
            .await?;
            let class = ClassIdentifier::new(class).map_err(|e| rule_error(category, rule, e))?;
            pipeline.objects.register_class(class, transformer);
        } else {
            let uuid = PortableId::new(rule.scope.as_str())
                .map_err(|e| rule_error(category, rule, e.to_string()))?;
            if pipeline.objects.has_exact(&uuid) {
                return Err(duplicate_scope(category, uuid.as_str()));
            }
            pipeline.objects.register_exact(uuid, transformer);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryStore;
    use crate::domain::{ContentTypeDefinition, FieldDefinition, SectionRecord};
    use std::collections::BTreeMap;

    fn rule(scope: &str, action: &str, value: Option<&str>) -> TransformRule {
        TransformRule {
            scope: scope.to_string(),
            action: action.to_string(),
            value: value.map(str::to_string),
        }
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.register_content_type(ContentTypeDefinition {
            identifier: ClassIdentifier::new("folder").unwrap(),
            fields: BTreeMap::<String, FieldDefinition>::new(),
        })
        .unwrap();
        store
    }

    fn object(uuid: &str, class: &str) -> ContentObjectRecord {
        ContentObjectRecord {
            uuid: PortableId::new(uuid).unwrap(),
            class_identifier: ClassIdentifier::new(class).unwrap(),
            section_identifier: None,
            owner: None,
            states: BTreeMap::new(),
            main_node: None,
            main_language: None,
            translations: BTreeMap::new(),
            attributes: BTreeMap::new(),
            related: Vec::new(),
            locations: Vec::new(),
            removed: false,
        }
    }

    #[tokio::test]
    async fn test_section_map_to_existing_target() {
        let store = store();
        let mut config = TransformsConfig::default();
        config
            .sections
            .map
            .insert("legacy".to_string(), "standard".to_string());

        let pipeline = build_pipeline(&config, &store).await.unwrap();
        let record = SectionRecord {
            identifier: "legacy".to_string(),
            name: "Legacy".to_string(),
            navigation_part: None,
            removed: false,
        };
        let replacement = pipeline.sections.apply(&record).unwrap().unwrap();
        assert_eq!(replacement.identifier, "standard");
    }

    #[tokio::test]
    async fn test_unknown_map_target_is_fatal() {
        let store = store();
        let mut config = TransformsConfig::default();
        config
            .sections
            .map
            .insert("legacy".to_string(), "nowhere".to_string());

        let err = build_pipeline(&config, &store).await.unwrap_err();
        assert!(matches!(err, FerryError::Transform(ref msg) if msg.contains("nowhere")));
    }

    #[tokio::test]
    async fn test_object_rules_by_scope() {
        let store = store();
        let mut config = TransformsConfig::default();
        config.objects.rules = vec![
            rule("class:folder", "set_section", Some("standard")),
            rule("u-1", "remap_uuid", Some("u-2")),
            rule("*", "remove", None),
        ];

        let pipeline = build_pipeline(&config, &store).await.unwrap();

        let exact = pipeline.objects.apply(&object("u-1", "article")).unwrap().unwrap();
        assert_eq!(exact.uuid.as_str(), "u-2");

        let by_class = pipeline.objects.apply(&object("f", "folder")).unwrap().unwrap();
        assert_eq!(by_class.section_identifier.as_deref(), Some("standard"));

        let global = pipeline.objects.apply(&object("a", "article")).unwrap().unwrap();
        assert!(global.removed);
    }

    #[tokio::test]
    async fn test_object_map_and_rule_on_same_uuid_is_fatal() {
        let store = store();
        let mut config = TransformsConfig::default();
        config.objects.map.insert("u-1".to_string(), "u-2".to_string());
        config.objects.rules = vec![rule("u-1", "remove", None)];

        let err = build_pipeline(&config, &store).await.unwrap_err();
        assert!(matches!(err, FerryError::Transform(ref msg) if msg.contains("'u-1'")));
    }

    #[tokio::test]
    async fn test_unknown_class_scope_is_fatal() {
        let store = store();
        let mut config = TransformsConfig::default();
        config.objects.rules = vec![rule("class:gallery", "remove", None)];
        assert!(build_pipeline(&config, &store).await.is_err());
    }

    #[tokio::test]
    async fn test_set_identifier_is_rejected_for_objects() {
        let store = store();
        let mut config = TransformsConfig::default();
        config.objects.rules = vec![rule("*", "set_identifier", Some("x"))];
        let err = build_pipeline(&config, &store).await.unwrap_err();
        assert!(err.to_string().contains("unsupported action"));
    }

    #[test]
    fn test_rule_that_already_holds_is_not_applicable() {
        let action = RuleAction::SetSection("standard".to_string());
        let mut record = object("a", "article");
        record.section_identifier = Some("standard".to_string());
        assert!(action.apply_to_object(&record).unwrap().is_none());
    }
}
