//! Route template resolution: path key -> absolute URL.

use crate::config::RouteTable;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type ParamMap = BTreeMap<String, Value>;

/// Path substitutions and query-string values for a single request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_params: Option<ParamMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_params: Option<ParamMap>,
}

impl RequestParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn path(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path_params
            .get_or_insert_with(ParamMap::new)
            .insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_params
            .get_or_insert_with(ParamMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// Resolve `key` against `routes` into `base_url + template`, with placeholders substituted and
/// the query string appended.
///
/// Returns `None` when the key has no route or its template is blank. Placeholders without a
/// matching path param are left verbatim.
#[must_use]
pub fn resolve_url(
    routes: &RouteTable,
    base_url: &str,
    key: &str,
    params: &RequestParams,
) -> Option<String> {
    let template = routes.template(key)?;
    if template.trim().is_empty() {
        return None;
    }

    let mut path = template.to_string();
    if let Some(path_params) = &params.path_params {
        for (name, value) in path_params {
            substitute_placeholder(&mut path, name, &value_to_string(value));
        }
    }

    let mut url = format!("{base_url}{path}");

    if let Some(query_params) = &params.query_params
        && !query_params.is_empty()
    {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in query_params {
            query.append_pair(name, &value_to_string(value));
        }
        url.push('?');
        url.push_str(&query.finish());
    }

    Some(url)
}

/// Replace the first `:name` placeholder that is not the prefix of a longer name.
fn substitute_placeholder(path: &mut String, name: &str, value: &str) {
    let needle = format!(":{name}");
    let mut from = 0;
    while let Some(offset) = path[from..].find(&needle) {
        let start = from + offset;
        let end = start + needle.len();
        let continues = path[end..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        if !continues {
            path.replace_range(start..end, value);
            return;
        }
        from = end;
    }
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}
