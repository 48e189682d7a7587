//! Token substitution for cloned text and structured payloads.
//!
//! Template rows embed a literal `{pageName}` placeholder wherever the page
//! name appears (titles, query names, trigger payloads). Cloning rewrites the
//! placeholder to the target page's real name.

use serde_json::Value;

/// Placeholder token embedded in template rows.
pub const PAGE_NAME_TOKEN: &str = "{pageName}";

/// Replace every literal occurrence of the placeholder with `target_name`.
/// Empty input is returned unchanged.
pub fn substitute(text: &str, target_name: &str) -> String {
    if text.is_empty() {
        return text.to_string();
    }
    text.replace(PAGE_NAME_TOKEN, target_name)
}

/// Substitute into an optional text field.
pub fn substitute_opt(text: Option<&str>, target_name: &str) -> Option<String> {
    text.map(|t| substitute(t, target_name))
}

/// Substitute through a structured payload.
///
/// Strings are parsed as JSON first; a parse failure falls back to literal
/// text substitution. Parsed (or already structured) values are serialized,
/// substituted on the serialized text, and re-parsed; if the re-parse fails
/// the substituted text is returned as a string. Substituting on serialized
/// text means a target name containing quotes or backslashes can corrupt the
/// payload; that matches the stored-template contract, where page names are
/// plain identifiers.
pub fn substitute_deep(value: &Value, target_name: &str) -> Value {
    let structured = match value {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed) => parsed,
            Err(_) => return Value::String(substitute(s, target_name)),
        },
        other => other.clone(),
    };

    let serialized = structured.to_string();
    let substituted = substitute(&serialized, target_name);

    match serde_json::from_str::<Value>(&substituted) {
        Ok(parsed) => parsed,
        Err(_) => Value::String(substituted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitute_replaces_token() {
        assert_eq!(substitute("{pageName} Detail", "ingrType"), "ingrType Detail");
    }

    #[test]
    fn substitute_handles_multiple_occurrences() {
        assert_eq!(
            substitute("{pageName}List and {pageName}Dtl", "brndList"),
            "brndListList and brndListDtl"
        );
    }

    #[test]
    fn substitute_returns_empty_unchanged() {
        assert_eq!(substitute("", "ingrType"), "");
    }

    #[test]
    fn substitute_leaves_tokenless_text_alone() {
        assert_eq!(substitute("Add New", "ingrType"), "Add New");
    }

    #[test]
    fn substitute_deep_walks_nested_structures() {
        let payload = json!({
            "class": "onLoad",
            "content": [{ "tableName": "{pageName}" }]
        });

        let result = substitute_deep(&payload, "ingrType");

        assert_eq!(result["class"], "onLoad");
        assert_eq!(result["content"][0]["tableName"], "ingrType");
    }

    #[test]
    fn substitute_deep_parses_serialized_strings() {
        let payload = Value::String(r#"[{"action":"refresh","params":["{pageName}Grid"]}]"#.into());

        let result = substitute_deep(&payload, "ingrType");

        assert_eq!(result[0]["params"][0], "ingrTypeGrid");
    }

    #[test]
    fn substitute_deep_falls_back_to_text_on_parse_failure() {
        let payload = Value::String("plain {pageName} text".into());

        let result = substitute_deep(&payload, "ingrType");

        assert_eq!(result, Value::String("plain ingrType text".into()));
    }

    #[test]
    fn substitute_deep_quote_in_target_corrupts_serialized_form() {
        // Substitution happens on serialized text, so a quoted target breaks
        // the structure and the result degrades to a string.
        let payload = json!({ "tableName": "{pageName}" });

        let result = substitute_deep(&payload, "bad\"name");

        assert!(result.is_string());
    }
}
