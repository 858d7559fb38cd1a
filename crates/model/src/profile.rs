//! Configuration profile aggregate.
//!
//! A profile owns its metadata and an ordered list of payloads. All mutation
//! goes through the operations below; the model performs no internal locking
//! and expects a single writer.

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::payload::Payload;

/// Deployment scope of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileScope {
    User,
    System,
}

impl ProfileScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::System => "System",
        }
    }

    pub(crate) fn parse(raw: &str) -> Result<Self, crate::error::ModelError> {
        match raw {
            "User" => Ok(Self::User),
            "System" => Ok(Self::System),
            other => Err(crate::error::ModelError::Decode(format!(
                "unknown profile scope: {other}"
            ))),
        }
    }
}

/// A named, versioned bundle of device settings — the unit of deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Local identity, never serialized.
    pub id: Uuid,
    pub display_name: String,
    /// Reverse-DNS identifier, e.g. `com.example.office-wifi`.
    pub identifier: String,
    pub organization: String,
    pub description: String,
    pub scope: ProfileScope,
    pub removal_disallowed: bool,
    /// Format version. Starts at 1.
    pub version: u32,
    /// Profile instance id. Regenerated on duplication.
    pub uuid: Uuid,
    pub payloads: Vec<Payload>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Profile {
    /// Create an empty profile. When no identifier is given, one is derived
    /// from the display name.
    pub fn new(
        name: impl Into<String>,
        identifier: Option<&str>,
        organization: impl Into<String>,
    ) -> Self {
        let display_name = name.into();
        let identifier = identifier
            .map(str::to_string)
            .unwrap_or_else(|| default_identifier(&display_name));
        let now = Utc::now().trunc_subsecs(0);

        Self {
            id: Uuid::new_v4(),
            display_name,
            identifier,
            organization: organization.into(),
            description: String::new(),
            scope: ProfileScope::User,
            removal_disallowed: false,
            version: 1,
            uuid: Uuid::new_v4(),
            payloads: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn add_payload(&mut self, payload: Payload) {
        self.payloads.push(payload);
    }

    /// Remove the payload with the given instance id, returning it.
    pub fn remove_payload(&mut self, uuid: &Uuid) -> Option<Payload> {
        let index = self.payloads.iter().position(|p| p.uuid() == *uuid)?;
        Some(self.payloads.remove(index))
    }

    /// Replace the payload with the given instance id in place, keeping the
    /// list order. Returns false when no payload matches.
    pub fn replace_payload(&mut self, uuid: &Uuid, payload: Payload) -> bool {
        match self.payloads.iter_mut().find(|p| p.uuid() == *uuid) {
            Some(slot) => {
                *slot = payload;
                true
            }
            None => false,
        }
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }

    /// Deep-copy the profile with fresh identity: new local id, new profile
    /// instance id, identifier suffixed `.copy`, and every payload given a
    /// fresh instance id with its identifier re-namespaced under the new
    /// profile identifier. All other field content is preserved.
    pub fn duplicate(&self) -> Profile {
        let mut copy = self.clone();
        copy.id = Uuid::new_v4();
        copy.uuid = Uuid::new_v4();
        copy.identifier = format!("{}.copy", self.identifier);

        let now = Utc::now().trunc_subsecs(0);
        copy.created_at = now;
        copy.modified_at = now;

        for payload in &mut copy.payloads {
            payload.reassign_identity(&copy.identifier);
        }

        copy
    }

    /// Check the profile and all of its payloads, returning one message per
    /// violation. Payload messages are prefixed with their 1-based index and
    /// variant name. Never mutates state.
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();

        if self.display_name.trim().is_empty() {
            violations.push("Profile name is required".to_string());
        }

        if self.identifier.trim().is_empty() {
            violations.push("Profile identifier is required".to_string());
        } else if !is_valid_identifier(&self.identifier) {
            violations.push(
                "Profile identifier must be in reverse DNS format (e.g. com.example.profile)"
                    .to_string(),
            );
        }

        for (index, payload) in self.payloads.iter().enumerate() {
            for violation in payload.validate() {
                violations.push(format!(
                    "Payload {} ({}): {violation}",
                    index + 1,
                    payload.variant_name()
                ));
            }
        }

        violations
    }

    /// Stamp the modification time. Never moves backwards, even if the wall
    /// clock does.
    pub fn touch(&mut self) {
        let now = Utc::now().trunc_subsecs(0);
        if now > self.modified_at {
            self.modified_at = now;
        }
    }
}

fn default_identifier(name: &str) -> String {
    format!("com.example.{}", name.to_lowercase().replace(' ', ""))
}

/// Reverse-DNS shape: at least two dot-separated segments, none empty.
pub fn is_valid_identifier(identifier: &str) -> bool {
    let mut segments = 0usize;
    for segment in identifier.split('.') {
        if segment.is_empty() {
            return false;
        }
        segments += 1;
    }
    segments >= 2
}
