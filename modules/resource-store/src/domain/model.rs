//! Domain models: resource rows, write payloads, output shaping.

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::domain::error::ResourceError;

/// One stored resource instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    pub id: i64,
    pub app_id: Uuid,
    pub resource_type: String,
    /// The JSON document, binary fields holding asset ids.
    pub data: Value,
    pub author_id: Option<Uuid>,
    /// Display-name snapshot of the author taken at write time.
    pub author_name: Option<String>,
    pub clonable: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
}

/// A resource row to be inserted.
#[derive(Clone, Debug)]
pub struct NewResource {
    pub app_id: Uuid,
    pub resource_type: String,
    pub data: Value,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub clonable: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
}

/// Mutable columns of an update.
#[derive(Clone, Debug)]
pub struct ResourceUpdate {
    pub data: Value,
    pub clonable: bool,
    pub updated_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
}

/// One multipart body part uploaded alongside a resource payload.
#[derive(Clone, Debug)]
pub struct AssetUpload {
    pub filename: Option<String>,
    pub mime: String,
    pub data: Vec<u8>,
}

/// A binary blob to persist in the same transaction as its resource.
#[derive(Clone, Debug)]
pub struct NewAsset {
    pub id: Uuid,
    pub filename: Option<String>,
    pub mime: String,
    pub data: Vec<u8>,
}

/// Raw query-string parameters of a list/count request.
#[derive(Clone, Debug, Default)]
pub struct QueryParams {
    pub filter: Option<String>,
    pub orderby: Option<String>,
    pub select: Option<String>,
    pub top: Option<String>,
    pub team: Option<String>,
}

/// `$team` narrowing requested on a query/count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeamFilter {
    Member,
    Manager,
}

impl TeamFilter {
    pub fn parse(raw: &str) -> Result<Self, ResourceError> {
        match raw {
            "member" => Ok(Self::Member),
            "manager" => Ok(Self::Manager),
            other => Err(ResourceError::query_syntax(format!(
                "invalid $team value '{other}'"
            ))),
        }
    }
}

/// The requester's team neighborhood, precomputed once per request when the
/// action's role set (or a `$team` parameter) needs it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TeamView {
    /// Users sharing a team where the requester holds role `member`
    /// (the requester included).
    pub co_member_ids: BTreeSet<Uuid>,
    /// Users in teams where the requester holds role `manager`.
    pub managed_member_ids: BTreeSet<Uuid>,
}

impl TeamView {
    #[must_use]
    pub fn ids_for(&self, filter: TeamFilter) -> &BTreeSet<Uuid> {
        match filter {
            TeamFilter::Member => &self.co_member_ids,
            TeamFilter::Manager => &self.managed_member_ids,
        }
    }
}

/// An incoming write body split into its data and reserved parts.
///
/// `$expires` and `$clonable` are writable reserved keys; the output-only
/// keys (`id`, `$created`, `$updated`, `$author`) are stripped silently so
/// a fetched resource can be round-tripped back into an update.
#[derive(Clone, Debug, PartialEq)]
pub struct WritePayload {
    pub data: Value,
    pub expires: Option<OffsetDateTime>,
    pub clonable: Option<bool>,
}

impl WritePayload {
    pub fn from_body(body: Value) -> Result<Self, ResourceError> {
        let Value::Object(mut map) = body else {
            return Err(ResourceError::invalid_field(
                "",
                "resource payload must be a JSON object",
            ));
        };

        let expires = match map.remove("$expires") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(
                OffsetDateTime::parse(&raw, &Rfc3339).map_err(|_| {
                    ResourceError::invalid_field("$expires", "must be an ISO 8601 date")
                })?,
            ),
            Some(_) => {
                return Err(ResourceError::invalid_field(
                    "$expires",
                    "must be an ISO 8601 date",
                ));
            }
        };

        let clonable = match map.remove("$clonable") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(b)) => Some(b),
            Some(_) => {
                return Err(ResourceError::invalid_field(
                    "$clonable",
                    "must be a boolean",
                ));
            }
        };

        for output_only in ["id", "$created", "$updated", "$author"] {
            map.remove(output_only);
        }

        Ok(Self {
            data: Value::Object(map),
            expires,
            clonable,
        })
    }
}

/// Shape a stored resource into its output document.
///
/// With no `$select`, the full document is returned: `id`, the data fields,
/// `$created`/`$updated`, plus `$author`, `$expires` and `$clonable` when
/// present. With `$select`, exactly the named fields appear (including `id`
/// only when selected); unknown names are silently absent.
#[must_use]
pub fn shape_output(resource: &Resource, select: &[String]) -> Value {
    let data = resource.data.as_object();

    if select.is_empty() {
        let mut out = Map::new();
        out.insert("id".to_owned(), json!(resource.id));
        if let Some(fields) = data {
            for (k, v) in fields {
                out.insert(k.clone(), v.clone());
            }
        }
        out.insert("$created".to_owned(), timestamp(resource.created_at));
        out.insert("$updated".to_owned(), timestamp(resource.updated_at));
        if let Some(author) = author_field(resource) {
            out.insert("$author".to_owned(), author);
        }
        if let Some(expires) = resource.expires_at {
            out.insert("$expires".to_owned(), timestamp(expires));
        }
        if resource.clonable {
            out.insert("$clonable".to_owned(), Value::Bool(true));
        }
        return Value::Object(out);
    }

    let mut out = Map::new();
    for name in select {
        let value = match name.as_str() {
            "id" => Some(json!(resource.id)),
            "$created" => Some(timestamp(resource.created_at)),
            "$updated" => Some(timestamp(resource.updated_at)),
            "$expires" => resource.expires_at.map(timestamp),
            "$author" => author_field(resource),
            "$clonable" => Some(Value::Bool(resource.clonable)),
            field => data.and_then(|d| d.get(field)).cloned(),
        };
        if let Some(v) = value {
            out.insert(name.clone(), v);
        }
    }
    Value::Object(out)
}

fn author_field(resource: &Resource) -> Option<Value> {
    resource.author_id.map(|id| {
        let mut author = Map::new();
        author.insert("id".to_owned(), json!(id));
        if let Some(name) = &resource.author_name {
            author.insert("name".to_owned(), json!(name));
        }
        Value::Object(author)
    })
}

fn timestamp(at: OffsetDateTime) -> Value {
    at.format(&Rfc3339)
        .map_or(Value::Null, Value::String)
}
