//! Translation of `sort` option values into backend sort fields.

use serde::Serialize;

/// Relevance; kept as is rather than mapped to a sortable field.
pub const RELEVANCE_FIELD: &str = "score";
/// Suffix of the single-valued, sortable copy of an indexed field.
pub const SORTABLE_SUFFIX: &str = "_sort";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    fn parse(token: &str) -> Self {
        if token.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else if token.eq_ignore_ascii_case("desc") || token.starts_with(['d', 'D']) {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortField {
    pub field: String,
    pub order: SortOrder,
}

impl SortField {
    /// `field order`, as sent to the backend.
    pub fn clause(&self) -> String {
        format!("{} {}", self.field, self.order.as_str())
    }
}

/// Parse `"<field> [asc|desc]"`. Anything else is ignored with a warning.
pub fn translate_sort(spec: &str) -> Option<SortField> {
    let tokens: Vec<&str> = spec.split_whitespace().collect();
    let (field, order) = match tokens.as_slice() {
        [field] => (*field, SortOrder::Asc),
        [field, order] => (*field, SortOrder::parse(order)),
        _ => {
            tracing::warn!(sort = spec, "Expected a sort of the form '<field> [asc|desc]', ignoring");
            return None;
        }
    };

    let field = if field == RELEVANCE_FIELD {
        field.to_string()
    } else {
        format!("{field}{SORTABLE_SUFFIX}")
    };
    Some(SortField { field, order })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sort(field: &str, order: SortOrder) -> Option<SortField> {
        Some(SortField {
            field: field.to_string(),
            order,
        })
    }

    #[test]
    fn translates_field_and_direction() {
        assert_eq!(translate_sort("created desc"), sort("created_sort", SortOrder::Desc));
        assert_eq!(translate_sort("created ASC"), sort("created_sort", SortOrder::Asc));
        assert_eq!(translate_sort("title"), sort("title_sort", SortOrder::Asc));
    }

    #[test]
    fn relevance_is_not_suffixed() {
        assert_eq!(translate_sort("score"), sort("score", SortOrder::Asc));
        assert_eq!(translate_sort("score desc"), sort("score", SortOrder::Desc));
    }

    #[test]
    fn loose_direction_tokens() {
        assert_eq!(translate_sort("created down"), sort("created_sort", SortOrder::Desc));
        assert_eq!(translate_sort("created up"), sort("created_sort", SortOrder::Asc));
    }

    #[test]
    fn malformed_specs_are_ignored() {
        assert_eq!(translate_sort(""), None);
        assert_eq!(translate_sort("   "), None);
        assert_eq!(translate_sort("a b c"), None);
    }

    #[test]
    fn clause_renders_for_backend() {
        assert_eq!(
            translate_sort("created desc").unwrap().clause(),
            "created_sort desc"
        );
    }
}
