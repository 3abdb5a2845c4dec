use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::models::Activity;

fn placeholder_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i):[a-z0-9._-]+").expect("Invalid regex"))
}

/// Replaces `:subject.<key>`, `:causer.<key>` and `:properties.<key>` tokens
/// with values taken from `activity`.
///
/// Everything after the first `.` is one flat key, so `:properties.a.b` looks
/// up the key `"a.b"`. Unknown prefixes, unset relations and missing keys leave
/// the token as written. Substituted values are not scanned again.
pub fn replace_placeholders(description: &str, activity: &Activity) -> String {
    placeholder_regex()
        .replace_all(description, |caps: &Captures| {
            let token = &caps[0];
            resolve(token, activity).unwrap_or_else(|| token.to_string())
        })
        .into_owned()
}

fn resolve(token: &str, activity: &Activity) -> Option<String> {
    let (attribute, key) = token[1..].split_once('.')?;

    let source = attribute_map(attribute, activity)?;
    source.get(key).map(stringify)
}

fn attribute_map<'a>(attribute: &str, activity: &'a Activity) -> Option<&'a Map<String, Value>> {
    match attribute {
        "subject" => activity.subject.as_ref().map(|model| &model.attributes),
        "causer" => activity.causer.as_ref().map(|model| &model.attributes),
        "properties" => Some(&activity.properties),
        _ => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
