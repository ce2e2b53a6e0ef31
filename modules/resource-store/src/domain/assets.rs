//! Binary-field dereferencing for resource writes.
//!
//! Payload values of `format: binary` fields arrive as either the index of a
//! co-uploaded multipart part (`"0"`, `"1"`, ...) or the id of an asset
//! already attached to the resource. Resolution rewrites index references to
//! freshly minted asset ids, enforces that every uploaded part is used
//! exactly once, and reports which previously attached assets became
//! orphaned.

use serde_json::Value;
use uuid::Uuid;

use crate::domain::error::ResourceError;
use crate::domain::model::{AssetUpload, NewAsset};

#[derive(Clone, Debug)]
pub struct ResolvedAssets {
    /// The payload with binary-field values replaced by asset ids.
    pub data: Value,
    /// Assets to persist in the same transaction as the resource row.
    pub new_assets: Vec<NewAsset>,
    /// Previously attached assets no longer referenced by the payload.
    pub removed_asset_ids: Vec<Uuid>,
}

pub fn resolve_references(
    binary_fields: &[String],
    data: Value,
    uploads: Vec<AssetUpload>,
    existing_ids: &[Uuid],
) -> Result<ResolvedAssets, ResourceError> {
    let Value::Object(mut map) = data else {
        // Payloads are schema-validated objects before resolution runs.
        return Ok(ResolvedAssets {
            data,
            new_assets: Vec::new(),
            removed_asset_ids: Vec::new(),
        });
    };

    let mut claimed: Vec<bool> = vec![false; uploads.len()];
    let mut new_assets: Vec<Option<NewAsset>> = uploads
        .into_iter()
        .map(|u| {
            Some(NewAsset {
                id: Uuid::new_v4(),
                filename: u.filename,
                mime: u.mime,
                data: u.data,
            })
        })
        .collect();
    let mut referenced_existing: Vec<Uuid> = Vec::new();

    for field in binary_fields {
        let Some(value) = map.get_mut(field) else {
            continue;
        };
        let Some(raw) = value.as_str() else {
            return Err(ResourceError::invalid_field(
                field.clone(),
                "binary field must be a string reference",
            ));
        };

        if let Ok(index) = raw.parse::<usize>() {
            let Some(slot) = claimed.get_mut(index) else {
                return Err(ResourceError::invalid_field(
                    field.clone(),
                    format!("no uploaded asset with index {index}"),
                ));
            };
            if *slot {
                return Err(ResourceError::invalid_field(
                    field.clone(),
                    format!("uploaded asset {index} is referenced more than once"),
                ));
            }
            *slot = true;
            // The id is minted here; the slot stays Some until collected.
            let id = new_assets[index].as_ref().map(|a| a.id);
            if let Some(id) = id {
                *value = Value::String(id.to_string());
            }
            continue;
        }

        if let Ok(id) = Uuid::parse_str(raw) {
            if existing_ids.contains(&id) {
                referenced_existing.push(id);
                continue;
            }
            return Err(ResourceError::invalid_field(
                field.clone(),
                "does not reference an asset of this resource",
            ));
        }

        return Err(ResourceError::invalid_field(
            field.clone(),
            "must be an uploaded asset index or an asset id",
        ));
    }

    if claimed.iter().any(|used| !used) {
        return Err(ResourceError::UnusedAssets);
    }

    let removed_asset_ids = existing_ids
        .iter()
        .filter(|id| !referenced_existing.contains(id))
        .copied()
        .collect();

    Ok(ResolvedAssets {
        data: Value::Object(map),
        new_assets: new_assets.iter_mut().filter_map(Option::take).collect(),
        removed_asset_ids,
    })
}
