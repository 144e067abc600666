use std::collections::HashMap;

fn table(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn expands_every_reference() {
    let vars = table(&[("kind", "doc"), ("_userId", "alice")]);
    let out = quarry_template::expand(&vars, "type:${kind} AND owner:${_userId}");
    assert_eq!(out, "type:doc AND owner:alice");
    assert!(quarry_template::missing_placeholders(&out).is_empty());
}

#[test]
fn unresolved_references_survive_expansion() {
    let vars = table(&[("_userId", "alice")]);
    let out = quarry_template::expand(&vars, "type:${kind} AND owner:${_userId}");
    assert_eq!(out, "type:${kind} AND owner:alice");

    let missing = quarry_template::missing_placeholders(&out);
    assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["kind"]);
}

#[test]
fn missing_with_table_checks_raw_text() {
    let vars = table(&[("a", "1")]);
    let missing = quarry_template::missing_placeholders_with(&vars, "${a} ${b} ${c}");
    assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["b", "c"]);
}

#[test]
fn escaped_user_in_private_path() {
    let path = quarry_template::escape_query_chars(&quarry_template::private_path("bob"));
    assert_eq!(path, "a\\:bob\\/private");
}
