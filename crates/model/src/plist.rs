//! Property-list serialization for profiles.
//!
//! `encode` is a pure transform from a [`Profile`] to XML plist bytes; the
//! same buffer is written to disk by the store and base64-wrapped into the
//! server's upload envelope by the client. `decode` is the inverse. Top-level
//! key order and the order of `PayloadContent` entries are part of the format
//! contract: the server UI displays payloads in serialized order.
//!
//! Timestamps are rendered as plist `<date>` values, UTC at seconds
//! precision; round-tripping compares equal at that precision. Unknown
//! top-level keys are ignored for forward compatibility, but an unknown
//! payload discriminator fails the whole decode.

use std::io::Cursor;
use std::time::SystemTime;

use chrono::{DateTime, SubsecRound, Utc};
use plist::{Date, Dictionary, Value};
use uuid::Uuid;

use crate::error::ModelError;
use crate::payload::{bool_or, decode_payload, optional_string, required_string, wire_uuid};
use crate::profile::{Profile, ProfileScope};

/// Render a profile to XML property-list bytes.
pub fn encode(profile: &Profile) -> Result<Vec<u8>, ModelError> {
    let mut dict = Dictionary::new();
    dict.insert("PayloadType".into(), Value::String("Configuration".into()));
    dict.insert(
        "PayloadVersion".into(),
        Value::Integer(i64::from(profile.version).into()),
    );
    dict.insert(
        "PayloadIdentifier".into(),
        Value::String(profile.identifier.clone()),
    );
    dict.insert("PayloadUUID".into(), Value::String(wire_uuid(profile.uuid)));
    dict.insert(
        "PayloadDisplayName".into(),
        Value::String(profile.display_name.clone()),
    );
    dict.insert(
        "PayloadDescription".into(),
        Value::String(profile.description.clone()),
    );
    dict.insert(
        "PayloadOrganization".into(),
        Value::String(profile.organization.clone()),
    );
    dict.insert(
        "PayloadScope".into(),
        Value::String(profile.scope.as_str().into()),
    );
    dict.insert(
        "PayloadRemovalDisallowed".into(),
        Value::Boolean(profile.removal_disallowed),
    );
    dict.insert(
        "PayloadContent".into(),
        Value::Array(
            profile
                .payloads
                .iter()
                .map(|payload| Value::Dictionary(payload.to_attribute_map()))
                .collect(),
        ),
    );
    dict.insert(
        "PayloadCreationDate".into(),
        Value::Date(to_plist_date(profile.created_at)),
    );
    dict.insert(
        "PayloadModificationDate".into(),
        Value::Date(to_plist_date(profile.modified_at)),
    );

    let mut buf = Vec::new();
    Value::Dictionary(dict)
        .to_writer_xml(&mut buf)
        .map_err(|err| ModelError::Serialization(err.to_string()))?;
    Ok(buf)
}

/// Decode property-list bytes back into a profile.
///
/// The local `id` is not represented in the format and is freshly assigned.
pub fn decode(bytes: &[u8]) -> Result<Profile, ModelError> {
    let value = Value::from_reader(Cursor::new(bytes))
        .map_err(|err| ModelError::Decode(err.to_string()))?;
    let dict = value.as_dictionary().ok_or_else(|| {
        ModelError::Decode("top-level plist value is not a dictionary".to_string())
    })?;

    let payloads = match dict.get("PayloadContent") {
        Some(content) => {
            let entries = content.as_array().ok_or_else(|| {
                ModelError::Decode("PayloadContent is not an array".to_string())
            })?;
            let mut payloads = Vec::with_capacity(entries.len());
            for entry in entries {
                let payload_dict = entry.as_dictionary().ok_or_else(|| {
                    ModelError::Decode("PayloadContent entry is not a dictionary".to_string())
                })?;
                payloads.push(decode_payload(payload_dict)?);
            }
            payloads
        }
        None => Vec::new(),
    };

    let uuid_raw = required_string(dict, "PayloadUUID")?;
    let uuid = Uuid::parse_str(&uuid_raw)
        .map_err(|_| ModelError::Decode(format!("invalid PayloadUUID: {uuid_raw}")))?;

    let scope = match dict.get("PayloadScope").and_then(Value::as_string) {
        Some(raw) => ProfileScope::parse(raw)?,
        None => ProfileScope::User,
    };

    let version = match dict.get("PayloadVersion").and_then(Value::as_signed_integer) {
        Some(raw) => u32::try_from(raw)
            .map_err(|_| ModelError::Decode(format!("invalid PayloadVersion: {raw}")))?,
        None => 1,
    };

    Ok(Profile {
        id: Uuid::new_v4(),
        display_name: required_string(dict, "PayloadDisplayName")?,
        identifier: required_string(dict, "PayloadIdentifier")?,
        organization: optional_string(dict, "PayloadOrganization").unwrap_or_default(),
        description: optional_string(dict, "PayloadDescription").unwrap_or_default(),
        scope,
        removal_disallowed: bool_or(dict, "PayloadRemovalDisallowed", false),
        version,
        uuid,
        payloads,
        created_at: date_or_now(dict, "PayloadCreationDate"),
        modified_at: date_or_now(dict, "PayloadModificationDate"),
    })
}

fn to_plist_date(ts: DateTime<Utc>) -> Date {
    Date::from(SystemTime::from(ts.trunc_subsecs(0)))
}

fn date_or_now(dict: &Dictionary, key: &str) -> DateTime<Utc> {
    dict.get(key)
        .and_then(Value::as_date)
        .map(|date| DateTime::<Utc>::from(SystemTime::from(date)).trunc_subsecs(0))
        .unwrap_or_else(|| Utc::now().trunc_subsecs(0))
}
