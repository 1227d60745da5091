use serde_json::{Map, Value};
use thiserror::Error;

pub const PK_KEY: &str = "$pk";
pub const EQ_KEY: &str = "$eq";
pub const SELECT_KEY: &str = "$select";
// Aliases accepted from older saved query documents.
pub const LEGACY_FILTER_KEY: &str = "filter";
pub const LEGACY_SELECT_KEY: &str = "bins";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterKey {
    #[default]
    Pk,
    Eq,
}

impl FilterKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pk => PK_KEY,
            Self::Eq => EQ_KEY,
        }
    }
}

/// Session-side parsing context. The default filter key decides which seed
/// document the query editor starts from; namespace and set never enter the
/// parse step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseContext {
    pub default_filter_key: FilterKey,
}

impl ParseContext {
    #[must_use]
    pub fn seed_document(&self) -> &'static str {
        match self.default_filter_key {
            FilterKey::Pk => r#"{"$pk": []}"#,
            FilterKey::Eq => r#"{"$eq": {}}"#,
        }
    }
}

/// A validated query document. Only [`parse`] constructs the first two
/// variants; `Scan` comes from the scan action and carries no document.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySpec {
    PkLookup {
        keys: Vec<Value>,
        select: Option<Vec<String>>,
    },
    EqualityFilter {
        criteria: Map<String, Value>,
    },
    Scan,
}

impl QuerySpec {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PkLookup { .. } => "pk-lookup",
            Self::EqualityFilter { .. } => "equality",
            Self::Scan => "scan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("query is not valid JSON: {0}")]
    MalformedJson(String),
    #[error("nothing to query")]
    EmptyQuery,
    #[error("query has no recognized filter key; start from {seed}")]
    UnrecognizedShape { seed: &'static str },
    #[error("{field} is not an array")]
    NotAnArray { field: &'static str },
    #[error("{field} filter cannot be empty")]
    EmptyFilter { field: &'static str },
    #[error("$select should not be empty")]
    EmptyProjection,
}

/// Validates a raw query document and produces the matching [`QuerySpec`].
///
/// Shape detection is ordered: a `$pk` key wins over `$eq` even when both are
/// present, so parsing stays total and deterministic. An invalid document
/// never yields a spec.
pub fn parse(raw: &str, context: &ParseContext) -> Result<QuerySpec, ValidationError> {
    let document: Value =
        serde_json::from_str(raw).map_err(|error| ValidationError::MalformedJson(error.to_string()))?;

    let Some(object) = document.as_object() else {
        return Err(ValidationError::UnrecognizedShape {
            seed: context.seed_document(),
        });
    };
    if object.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }

    if let Some(keys) = object.get(PK_KEY) {
        return parse_pk_lookup(keys, object);
    }
    if let Some(criteria) = object.get(EQ_KEY).or_else(|| object.get(LEGACY_FILTER_KEY)) {
        return parse_equality_filter(criteria);
    }

    Err(ValidationError::UnrecognizedShape {
        seed: context.seed_document(),
    })
}

fn parse_pk_lookup(keys: &Value, object: &Map<String, Value>) -> Result<QuerySpec, ValidationError> {
    let Some(keys) = keys.as_array() else {
        return Err(ValidationError::NotAnArray { field: PK_KEY });
    };
    if keys.is_empty() {
        return Err(ValidationError::EmptyFilter { field: PK_KEY });
    }

    let select = match object.get(SELECT_KEY).or_else(|| object.get(LEGACY_SELECT_KEY)) {
        None => None,
        Some(projection) => {
            let Some(fields) = projection.as_array() else {
                return Err(ValidationError::NotAnArray { field: SELECT_KEY });
            };
            if fields.is_empty() {
                return Err(ValidationError::EmptyProjection);
            }
            Some(fields.iter().map(projection_field).collect())
        }
    };

    Ok(QuerySpec::PkLookup {
        keys: keys.clone(),
        select,
    })
}

fn parse_equality_filter(criteria: &Value) -> Result<QuerySpec, ValidationError> {
    // A non-mapping body carries no usable criteria and fails the same way
    // as an empty one.
    let criteria = criteria
        .as_object()
        .filter(|criteria| !criteria.is_empty())
        .ok_or(ValidationError::EmptyFilter { field: EQ_KEY })?;

    Ok(QuerySpec::EqualityFilter {
        criteria: criteria.clone(),
    })
}

fn projection_field(value: &Value) -> String {
    match value {
        Value::String(name) => name.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse, FilterKey, ParseContext, QuerySpec, ValidationError};

    fn pk_context() -> ParseContext {
        ParseContext::default()
    }

    #[test]
    fn malformed_json_is_rejected_before_shape_checks() {
        let error = parse("{not json", &pk_context()).expect_err("parse should fail");
        assert!(matches!(error, ValidationError::MalformedJson(_)));
    }

    #[test]
    fn empty_document_is_empty_query() {
        let error = parse("{}", &pk_context()).expect_err("parse should fail");
        assert_eq!(error, ValidationError::EmptyQuery);
    }

    #[test]
    fn documents_without_filter_keys_are_unrecognized() {
        for raw in [r#"{"limit": 10}"#, r#"{"select": ["a"]}"#, "[1, 2]", "\"scan\""] {
            let error = parse(raw, &pk_context()).expect_err("parse should fail");
            assert!(
                matches!(error, ValidationError::UnrecognizedShape { .. } | ValidationError::EmptyQuery),
                "unexpected error for {raw}: {error:?}"
            );
        }

        let error = parse(r#"{"where": {"a": 1}}"#, &pk_context()).expect_err("parse should fail");
        assert!(matches!(error, ValidationError::UnrecognizedShape { .. }));
    }

    #[test]
    fn unrecognized_shape_suggests_the_context_seed() {
        let context = ParseContext {
            default_filter_key: FilterKey::Eq,
        };
        let error = parse(r#"{"where": {}}"#, &context).expect_err("parse should fail");
        assert_eq!(
            error,
            ValidationError::UnrecognizedShape {
                seed: r#"{"$eq": {}}"#
            }
        );
    }

    #[test]
    fn pk_lookup_requires_an_array() {
        let error = parse(r#"{"$pk": "abc"}"#, &pk_context()).expect_err("parse should fail");
        assert_eq!(error, ValidationError::NotAnArray { field: "$pk" });
    }

    #[test]
    fn empty_pk_filter_is_rejected() {
        let error = parse(r#"{"$pk": []}"#, &pk_context()).expect_err("parse should fail");
        assert_eq!(error, ValidationError::EmptyFilter { field: "$pk" });
    }

    #[test]
    fn pk_lookup_without_projection_parses() {
        let spec = parse(r#"{"$pk": ["abc"]}"#, &pk_context()).expect("parse should succeed");
        assert_eq!(
            spec,
            QuerySpec::PkLookup {
                keys: vec![json!("abc")],
                select: None,
            }
        );
    }

    #[test]
    fn pk_lookup_with_projection_parses() {
        let spec = parse(r#"{"$pk": [1, 2], "$select": ["name", "age"]}"#, &pk_context())
            .expect("parse should succeed");
        assert_eq!(
            spec,
            QuerySpec::PkLookup {
                keys: vec![json!(1), json!(2)],
                select: Some(vec!["name".to_string(), "age".to_string()]),
            }
        );
    }

    #[test]
    fn projection_must_be_a_non_empty_array() {
        let error = parse(r#"{"$pk": ["abc"], "$select": []}"#, &pk_context())
            .expect_err("parse should fail");
        assert_eq!(error, ValidationError::EmptyProjection);

        let error = parse(r#"{"$pk": ["abc"], "$select": "name"}"#, &pk_context())
            .expect_err("parse should fail");
        assert_eq!(error, ValidationError::NotAnArray { field: "$select" });
    }

    #[test]
    fn legacy_bins_alias_is_accepted_for_projection() {
        let spec = parse(r#"{"$pk": ["abc"], "bins": ["name"]}"#, &pk_context())
            .expect("parse should succeed");
        assert_eq!(
            spec,
            QuerySpec::PkLookup {
                keys: vec![json!("abc")],
                select: Some(vec!["name".to_string()]),
            }
        );
    }

    #[test]
    fn equality_filter_parses() {
        let spec = parse(r#"{"$eq": {"age": 30}}"#, &pk_context()).expect("parse should succeed");
        let QuerySpec::EqualityFilter { criteria } = spec else {
            panic!("expected an equality filter");
        };
        assert_eq!(criteria.get("age"), Some(&json!(30)));
    }

    #[test]
    fn legacy_filter_alias_is_accepted() {
        let spec = parse(r#"{"filter": {"city": "porto"}}"#, &pk_context())
            .expect("parse should succeed");
        assert_eq!(spec.kind(), "equality");
    }

    #[test]
    fn empty_or_non_mapping_equality_body_is_rejected() {
        let error = parse(r#"{"$eq": {}}"#, &pk_context()).expect_err("parse should fail");
        assert_eq!(error, ValidationError::EmptyFilter { field: "$eq" });

        let error = parse(r#"{"$eq": [1]}"#, &pk_context()).expect_err("parse should fail");
        assert_eq!(error, ValidationError::EmptyFilter { field: "$eq" });
    }

    #[test]
    fn pk_wins_when_both_filter_keys_are_present() {
        let spec = parse(r#"{"$pk": ["k"], "$eq": {"a": 1}}"#, &pk_context())
            .expect("parse should succeed");
        assert_eq!(spec.kind(), "pk-lookup");
    }

    #[test]
    fn pk_validation_applies_even_when_eq_is_also_present() {
        // Precedence holds for invalid documents too: the $pk branch is
        // entered and fails there, it never falls through to $eq.
        let error = parse(r#"{"$pk": [], "$eq": {"a": 1}}"#, &pk_context())
            .expect_err("parse should fail");
        assert_eq!(error, ValidationError::EmptyFilter { field: "$pk" });
    }

    #[test]
    fn seed_documents_round_trip_into_their_own_empty_errors() {
        for default_filter_key in [FilterKey::Pk, FilterKey::Eq] {
            let context = ParseContext { default_filter_key };
            let error = parse(context.seed_document(), &context).expect_err("seed is empty");
            assert!(matches!(error, ValidationError::EmptyFilter { .. }));
        }
    }
}
