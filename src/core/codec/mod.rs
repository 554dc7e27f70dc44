//! Attribute codec set
//!
//! One encode/decode pair per [`AttributeKind`]. The exporter encodes stored
//! values into portable JSON; the importer decodes portable JSON back into
//! typed values before verifying and committing them.
//!
//! | Kind | Portable encoding |
//! |---|---|
//! | `text` | string (`null` decodes to `""`) |
//! | `boolean` | `true`/`false` (`0`/`1` accepted on decode) |
//! | `integer` | number |
//! | `relation` | uuid string or `null` |
//! | `relation_list`, `tags` | array of uuid strings |
//! | `rich_text` | markup string |
//! | `binary`, `image` | `null` or `{file, filename, found, ...}` |
//! | `selection` | array of option identifiers |
//! | `price` | `{amount_minor, currency, vat_included}` |
//! | `user_account` | `{login, email, password_hash, password_hash_type, enabled}` |

pub mod rich_text;

use crate::domain::{
    AttributeKind, AttributeValue, CodecError, FileReference, PortableId, Price, RichText,
    UserAccount,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use rich_text::{embedded_uuids, rewrite_embeds, EmbedAction};

/// Encodes a typed value into its portable JSON form
pub fn encode(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Text(text) => Value::String(text.clone()),
        AttributeValue::Boolean(flag) => Value::Bool(*flag),
        AttributeValue::Integer(number) => Value::from(*number),
        AttributeValue::Relation(target) => target
            .as_ref()
            .map(|uuid| Value::String(uuid.to_string()))
            .unwrap_or(Value::Null),
        AttributeValue::RelationList(targets) | AttributeValue::Tags(targets) => {
            Value::Array(targets.iter().map(|uuid| Value::String(uuid.to_string())).collect())
        }
        AttributeValue::RichText(text) => Value::String(text.markup.clone()),
        AttributeValue::Binary(file) | AttributeValue::Image(file) => match file {
            Some(reference) => to_value(reference),
            None => Value::Null,
        },
        AttributeValue::Selection(options) => {
            Value::Array(options.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Price(price) => to_value(price),
        AttributeValue::UserAccount(account) => to_value(account),
    }
}

/// Decodes a portable JSON value for the given kind
pub fn decode(kind: AttributeKind, value: &Value) -> Result<AttributeValue, CodecError> {
    let decoded = match kind {
        AttributeKind::Text => AttributeValue::Text(match value {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            other => return Err(mismatch(kind, "a string", other)),
        }),
        AttributeKind::Boolean => AttributeValue::Boolean(decode_bool(value)?),
        AttributeKind::Integer => AttributeValue::Integer(match value {
            Value::Number(number) => number
                .as_i64()
                .ok_or_else(|| mismatch(kind, "a whole number", value))?,
            Value::String(text) => text
                .trim()
                .parse()
                .map_err(|_| mismatch(kind, "a whole number", value))?,
            other => return Err(mismatch(kind, "a whole number", other)),
        }),
        AttributeKind::Relation => AttributeValue::Relation(match value {
            Value::Null => None,
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(uuid_from(kind, text)?),
            other => return Err(mismatch(kind, "a uuid or null", other)),
        }),
        AttributeKind::RelationList => AttributeValue::RelationList(decode_uuid_list(kind, value)?),
        AttributeKind::Tags => AttributeValue::Tags(decode_uuid_list(kind, value)?),
        AttributeKind::RichText => AttributeValue::RichText(RichText {
            markup: match value {
                Value::Null => String::new(),
                Value::String(markup) => markup.clone(),
                other => return Err(mismatch(kind, "a markup string", other)),
            },
        }),
        AttributeKind::Binary => AttributeValue::Binary(decode_file(kind, value)?),
        AttributeKind::Image => AttributeValue::Image(decode_file(kind, value)?),
        AttributeKind::Selection => AttributeValue::Selection(match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(option) => Ok(option.clone()),
                    Value::Number(number) => Ok(number.to_string()),
                    other => Err(mismatch(kind, "option identifiers", other)),
                })
                .collect::<Result<_, _>>()?,
            other => return Err(mismatch(kind, "an array", other)),
        }),
        AttributeKind::Price => AttributeValue::Price(from_value::<Price>(kind, value)?),
        AttributeKind::UserAccount => {
            AttributeValue::UserAccount(from_value::<UserAccount>(kind, value)?)
        }
    };
    Ok(decoded)
}

fn decode_bool(value: &Value) -> Result<bool, CodecError> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Null => Ok(false),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(mismatch(AttributeKind::Boolean, "true, false, 0 or 1", value)),
        },
        Value::String(text) => match text.as_str() {
            "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            _ => Err(mismatch(AttributeKind::Boolean, "true, false, 0 or 1", value)),
        },
        other => Err(mismatch(AttributeKind::Boolean, "true, false, 0 or 1", other)),
    }
}

fn decode_uuid_list(kind: AttributeKind, value: &Value) -> Result<Vec<PortableId>, CodecError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => uuid_from(kind, text),
                other => Err(mismatch(kind, "uuid strings", other)),
            })
            .collect(),
        other => Err(mismatch(kind, "an array of uuids", other)),
    }
}

fn decode_file(kind: AttributeKind, value: &Value) -> Result<Option<FileReference>, CodecError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(_) => from_value::<FileReference>(kind, value).map(Some),
        other => Err(mismatch(kind, "a file reference or null", other)),
    }
}

fn uuid_from(kind: AttributeKind, text: &str) -> Result<PortableId, CodecError> {
    PortableId::new(text).map_err(|message| CodecError::Decode {
        kind: kind.to_string(),
        message,
    })
}

fn from_value<T: DeserializeOwned>(kind: AttributeKind, value: &Value) -> Result<T, CodecError> {
    serde_json::from_value(value.clone()).map_err(|e| CodecError::Decode {
        kind: kind.to_string(),
        message: e.to_string(),
    })
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
    // Plain structs with string keys always serialize
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn mismatch(kind: AttributeKind, expected: &str, found: &Value) -> CodecError {
    CodecError::Decode {
        kind: kind.to_string(),
        message: format!("expected {expected}, found {found}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::secret::secret_string;
    use serde_json::json;
    use test_case::test_case;

    fn id(value: &str) -> PortableId {
        PortableId::new(value).unwrap()
    }

    fn file(uuid: &str) -> FileReference {
        FileReference {
            file: id(uuid),
            filename: "logo.png".to_string(),
            found: true,
            alternative_text: Some("Logo".to_string()),
            path: None,
        }
    }

    #[test_case(AttributeValue::Text("Home".to_string()) ; "plain text")]
    #[test_case(AttributeValue::Text(String::new()) ; "empty text")]
    #[test_case(AttributeValue::Boolean(true) ; "boolean")]
    #[test_case(AttributeValue::Integer(-42) ; "integer")]
    #[test_case(AttributeValue::Relation(Some(id("u1"))) ; "relation")]
    #[test_case(AttributeValue::Relation(None) ; "empty relation")]
    #[test_case(AttributeValue::RelationList(vec![id("u1"), id("u2")]) ; "relation list")]
    #[test_case(AttributeValue::RichText(RichText { markup: r#"<p><embed object_uuid="u1"/></p>"#.to_string() }) ; "rich text")]
    #[test_case(AttributeValue::Binary(Some(FileReference { alternative_text: None, ..file("f1") })) ; "binary")]
    #[test_case(AttributeValue::Image(Some(file("f2"))) ; "image")]
    #[test_case(AttributeValue::Image(None) ; "empty image")]
    #[test_case(AttributeValue::Selection(vec![]) ; "empty selection")]
    #[test_case(AttributeValue::Selection(vec!["red".to_string(), "blue".to_string()]) ; "selection")]
    #[test_case(AttributeValue::Price(Price { amount_minor: 1999, currency: "EUR".to_string(), vat_included: true }) ; "price")]
    #[test_case(AttributeValue::Tags(vec![id("t1")]) ; "tags")]
    fn test_round_trip(value: AttributeValue) {
        let encoded = encode(&value);
        let decoded = decode(value.kind(), &encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_user_account_round_trip() {
        let value = AttributeValue::UserAccount(UserAccount {
            login: "editor".to_string(),
            email: "editor@example.com".to_string(),
            password_hash: secret_string("$2y$10$hash".to_string()),
            password_hash_type: "bcrypt".to_string(),
            enabled: true,
        });
        let encoded = encode(&value);
        assert_eq!(encoded["password_hash"], "$2y$10$hash");
        assert_eq!(decode(AttributeKind::UserAccount, &encoded).unwrap(), value);
    }

    #[test_case(json!(1), true ; "one")]
    #[test_case(json!("0"), false ; "string zero")]
    #[test_case(json!(null), false ; "null")]
    fn test_boolean_lenient_decode(input: Value, expected: bool) {
        assert_eq!(
            decode(AttributeKind::Boolean, &input).unwrap(),
            AttributeValue::Boolean(expected)
        );
    }

    #[test]
    fn test_null_text_decodes_empty() {
        assert_eq!(
            decode(AttributeKind::Text, &Value::Null).unwrap(),
            AttributeValue::Text(String::new())
        );
    }

    #[test_case(AttributeKind::Integer, json!("abc") ; "integer from text")]
    #[test_case(AttributeKind::RelationList, json!("u1") ; "relation list from string")]
    #[test_case(AttributeKind::Image, json!(42) ; "image from number")]
    #[test_case(AttributeKind::Price, json!({"currency": "EUR"}) ; "price without amount")]
    fn test_shape_mismatch_is_error(kind: AttributeKind, input: Value) {
        let err = decode(kind, &input).unwrap_err();
        assert!(err.to_string().contains(kind.as_str()));
    }
}
