//! Polymorphic payload variants.
//!
//! Responsibilities:
//! - Define the payload sum type and its per-variant settings.
//! - Per-variant `validate` and `to_attribute_map`/`from_attribute_map`.
//! - Decode dispatch through [`PAYLOAD_REGISTRY`], a lookup table keyed by
//!   the `PayloadType` discriminator string.
//!
//! Invariants:
//! - The discriminator uniquely determines which variant's fields exist.
//! - Unknown discriminators fail decode; payloads are never dropped silently.
//! - Attribute-map key names and ordering are a compatibility contract and
//!   are written out explicitly, never derived from field introspection.
//!
//! Adding a payload kind means implementing the same two operations and
//! adding one registry entry; the dispatcher itself never grows branches.

use plist::{Dictionary, Value};
use uuid::Uuid;

use crate::error::ModelError;

/// Wire discriminator for Wi-Fi payloads.
pub const WIFI_PAYLOAD_TYPE: &str = "com.apple.wifi.managed";

/// Wire discriminator for VPN payloads.
pub const VPN_PAYLOAD_TYPE: &str = "com.apple.vpn.managed";

/// Wi-Fi encryption kinds understood by the managed network payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiEncryption {
    None,
    Wep,
    Wpa,
    Wpa2,
    Wpa3,
    Wpa2Enterprise,
}

impl WifiEncryption {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Wep => "WEP",
            Self::Wpa => "WPA",
            Self::Wpa2 => "WPA2",
            Self::Wpa3 => "WPA3",
            Self::Wpa2Enterprise => "WPA2Enterprise",
        }
    }

    fn parse(raw: &str) -> Result<Self, ModelError> {
        match raw {
            "None" => Ok(Self::None),
            "WEP" => Ok(Self::Wep),
            "WPA" => Ok(Self::Wpa),
            "WPA2" => Ok(Self::Wpa2),
            "WPA3" => Ok(Self::Wpa3),
            "WPA2Enterprise" => Ok(Self::Wpa2Enterprise),
            other => Err(ModelError::Decode(format!(
                "unknown Wi-Fi encryption type: {other}"
            ))),
        }
    }
}

/// Proxy configuration kinds for the Wi-Fi payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    None,
    Manual,
    Auto,
}

impl ProxyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Manual => "Manual",
            Self::Auto => "Auto",
        }
    }

    fn parse(raw: &str) -> Result<Self, ModelError> {
        match raw {
            "None" => Ok(Self::None),
            "Manual" => Ok(Self::Manual),
            "Auto" => Ok(Self::Auto),
            other => Err(ModelError::Decode(format!("unknown proxy type: {other}"))),
        }
    }
}

/// VPN connection kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpnKind {
    L2tp,
    Pptp,
    Ipsec,
    Ikev2,
    CiscoAnyConnect,
}

impl VpnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::L2tp => "L2TP",
            Self::Pptp => "PPTP",
            Self::Ipsec => "IPSec",
            Self::Ikev2 => "IKEv2",
            Self::CiscoAnyConnect => "CiscoAnyConnect",
        }
    }

    fn parse(raw: &str) -> Result<Self, ModelError> {
        match raw {
            "L2TP" => Ok(Self::L2tp),
            "PPTP" => Ok(Self::Pptp),
            "IPSec" => Ok(Self::Ipsec),
            "IKEv2" => Ok(Self::Ikev2),
            "CiscoAnyConnect" => Ok(Self::CiscoAnyConnect),
            other => Err(ModelError::Decode(format!(
                "unknown VPN connection type: {other}"
            ))),
        }
    }
}

/// Managed Wi-Fi network settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WifiPayload {
    pub identifier: String,
    pub uuid: Uuid,
    pub version: u32,
    pub display_name: String,
    pub description: Option<String>,
    pub organization: Option<String>,
    pub ssid: String,
    pub hidden_network: bool,
    pub auto_join: bool,
    pub encryption: WifiEncryption,
    pub password: Option<String>,
    pub proxy: ProxyKind,
    pub proxy_server: Option<String>,
    pub proxy_port: Option<u16>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
}

impl WifiPayload {
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        ssid: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            uuid: Uuid::new_v4(),
            version: 1,
            display_name: display_name.into(),
            description: None,
            organization: None,
            ssid: ssid.into(),
            hidden_network: false,
            auto_join: true,
            encryption: WifiEncryption::None,
            password: None,
            proxy: ProxyKind::None,
            proxy_server: None,
            proxy_port: None,
            proxy_username: None,
            proxy_password: None,
        }
    }

    /// Check the payload's settings, returning one message per violation.
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();

        if self.ssid.is_empty() {
            violations.push("SSID is required".to_string());
        }

        if self.encryption != WifiEncryption::None
            && self.password.as_deref().unwrap_or("").is_empty()
        {
            violations.push("Password is required for encrypted networks".to_string());
        }

        if self.proxy == ProxyKind::Manual {
            if self.proxy_server.is_none() {
                violations.push("Proxy server is required for manual proxy".to_string());
            }
            if self.proxy_port.is_none() {
                violations.push("Proxy port is required for manual proxy".to_string());
            }
        }

        violations
    }

    pub fn to_attribute_map(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.insert(
            "PayloadType".into(),
            Value::String(WIFI_PAYLOAD_TYPE.into()),
        );
        dict.insert(
            "PayloadVersion".into(),
            Value::Integer(i64::from(self.version).into()),
        );
        dict.insert(
            "PayloadIdentifier".into(),
            Value::String(self.identifier.clone()),
        );
        dict.insert("PayloadUUID".into(), Value::String(wire_uuid(self.uuid)));
        dict.insert(
            "PayloadDisplayName".into(),
            Value::String(self.display_name.clone()),
        );
        if let Some(description) = &self.description {
            dict.insert(
                "PayloadDescription".into(),
                Value::String(description.clone()),
            );
        }
        if let Some(organization) = &self.organization {
            dict.insert(
                "PayloadOrganization".into(),
                Value::String(organization.clone()),
            );
        }
        dict.insert("SSID_STR".into(), Value::String(self.ssid.clone()));
        dict.insert("HiddenNetwork".into(), Value::Boolean(self.hidden_network));
        dict.insert("AutoJoin".into(), Value::Boolean(self.auto_join));
        dict.insert(
            "EncryptionType".into(),
            Value::String(self.encryption.as_str().into()),
        );
        if let Some(password) = &self.password {
            dict.insert("Password".into(), Value::String(password.clone()));
        }
        dict.insert("ProxyType".into(), Value::String(self.proxy.as_str().into()));
        if self.proxy == ProxyKind::Manual {
            if let Some(server) = &self.proxy_server {
                dict.insert("ProxyServer".into(), Value::String(server.clone()));
            }
            if let Some(port) = self.proxy_port {
                dict.insert("ProxyPort".into(), Value::Integer(i64::from(port).into()));
            }
            if let Some(username) = &self.proxy_username {
                dict.insert("ProxyUsername".into(), Value::String(username.clone()));
            }
            if let Some(password) = &self.proxy_password {
                dict.insert("ProxyPassword".into(), Value::String(password.clone()));
            }
        }
        dict
    }

    fn from_attribute_map(dict: &Dictionary) -> Result<Self, ModelError> {
        Ok(Self {
            identifier: required_string(dict, "PayloadIdentifier")?,
            uuid: required_uuid(dict)?,
            version: required_version(dict)?,
            display_name: required_string(dict, "PayloadDisplayName")?,
            description: optional_string(dict, "PayloadDescription"),
            organization: optional_string(dict, "PayloadOrganization"),
            ssid: required_string(dict, "SSID_STR")?,
            hidden_network: bool_or(dict, "HiddenNetwork", false),
            auto_join: bool_or(dict, "AutoJoin", true),
            encryption: WifiEncryption::parse(&required_string(dict, "EncryptionType")?)?,
            password: optional_string(dict, "Password"),
            proxy: ProxyKind::parse(&required_string(dict, "ProxyType")?)?,
            proxy_server: optional_string(dict, "ProxyServer"),
            proxy_port: optional_port(dict)?,
            proxy_username: optional_string(dict, "ProxyUsername"),
            proxy_password: optional_string(dict, "ProxyPassword"),
        })
    }
}

/// Managed VPN connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct VpnPayload {
    pub identifier: String,
    pub uuid: Uuid,
    pub version: u32,
    pub display_name: String,
    pub description: Option<String>,
    pub organization: Option<String>,
    pub connection_kind: VpnKind,
    pub server: String,
    pub account: Option<String>,
    pub password: Option<String>,
    pub certificate: Option<Vec<u8>>,
    pub enable_on_demand: bool,
    pub disconnect_on_sleep: bool,
}

impl VpnPayload {
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        connection_kind: VpnKind,
        server: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            uuid: Uuid::new_v4(),
            version: 1,
            display_name: display_name.into(),
            description: None,
            organization: None,
            connection_kind,
            server: server.into(),
            account: None,
            password: None,
            certificate: None,
            enable_on_demand: false,
            disconnect_on_sleep: false,
        }
    }

    /// Check the payload's settings, returning one message per violation.
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();

        if self.server.is_empty() {
            violations.push("Server is required".to_string());
        }

        match self.connection_kind {
            VpnKind::L2tp | VpnKind::Pptp => {
                if self.account.as_deref().unwrap_or("").is_empty()
                    || self.password.as_deref().unwrap_or("").is_empty()
                {
                    violations.push(format!(
                        "Account and password are required for {}",
                        self.connection_kind.as_str()
                    ));
                }
            }
            VpnKind::Ipsec | VpnKind::Ikev2 => {
                if self.certificate.is_none() {
                    violations.push(format!(
                        "Certificate is required for {}",
                        self.connection_kind.as_str()
                    ));
                }
            }
            VpnKind::CiscoAnyConnect => {
                if self.account.as_deref().unwrap_or("").is_empty() {
                    violations.push("Account is required for Cisco AnyConnect".to_string());
                }
            }
        }

        violations
    }

    pub fn to_attribute_map(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.insert("PayloadType".into(), Value::String(VPN_PAYLOAD_TYPE.into()));
        dict.insert(
            "PayloadVersion".into(),
            Value::Integer(i64::from(self.version).into()),
        );
        dict.insert(
            "PayloadIdentifier".into(),
            Value::String(self.identifier.clone()),
        );
        dict.insert("PayloadUUID".into(), Value::String(wire_uuid(self.uuid)));
        dict.insert(
            "PayloadDisplayName".into(),
            Value::String(self.display_name.clone()),
        );
        if let Some(description) = &self.description {
            dict.insert(
                "PayloadDescription".into(),
                Value::String(description.clone()),
            );
        }
        if let Some(organization) = &self.organization {
            dict.insert(
                "PayloadOrganization".into(),
                Value::String(organization.clone()),
            );
        }
        dict.insert(
            "VPNType".into(),
            Value::String(self.connection_kind.as_str().into()),
        );
        dict.insert("Server".into(), Value::String(self.server.clone()));
        dict.insert("EnableOnDemand".into(), Value::Boolean(self.enable_on_demand));
        dict.insert(
            "DisconnectOnSleep".into(),
            Value::Boolean(self.disconnect_on_sleep),
        );
        if let Some(account) = &self.account {
            dict.insert("Account".into(), Value::String(account.clone()));
        }
        if let Some(password) = &self.password {
            dict.insert("Password".into(), Value::String(password.clone()));
        }
        if let Some(certificate) = &self.certificate {
            dict.insert("Certificate".into(), Value::Data(certificate.clone()));
        }
        dict
    }

    fn from_attribute_map(dict: &Dictionary) -> Result<Self, ModelError> {
        Ok(Self {
            identifier: required_string(dict, "PayloadIdentifier")?,
            uuid: required_uuid(dict)?,
            version: required_version(dict)?,
            display_name: required_string(dict, "PayloadDisplayName")?,
            description: optional_string(dict, "PayloadDescription"),
            organization: optional_string(dict, "PayloadOrganization"),
            connection_kind: VpnKind::parse(&required_string(dict, "VPNType")?)?,
            server: required_string(dict, "Server")?,
            account: optional_string(dict, "Account"),
            password: optional_string(dict, "Password"),
            certificate: dict
                .get("Certificate")
                .and_then(Value::as_data)
                .map(<[u8]>::to_vec),
            enable_on_demand: bool_or(dict, "EnableOnDemand", false),
            disconnect_on_sleep: bool_or(dict, "DisconnectOnSleep", false),
        })
    }
}

/// One typed settings block inside a profile.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Wifi(WifiPayload),
    Vpn(VpnPayload),
}

impl Payload {
    /// The wire discriminator identifying this variant.
    pub fn payload_type(&self) -> &'static str {
        match self {
            Self::Wifi(_) => WIFI_PAYLOAD_TYPE,
            Self::Vpn(_) => VPN_PAYLOAD_TYPE,
        }
    }

    /// Human-readable variant name, used in validation messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Wifi(_) => "Wi-Fi",
            Self::Vpn(_) => "VPN",
        }
    }

    fn identifier_slug(&self) -> &'static str {
        match self {
            Self::Wifi(_) => "wifi",
            Self::Vpn(_) => "vpn",
        }
    }

    /// The payload's unique instance id. Immutable once assigned, except
    /// through [`Payload::reassign_identity`] during profile duplication.
    pub fn uuid(&self) -> Uuid {
        match self {
            Self::Wifi(p) => p.uuid,
            Self::Vpn(p) => p.uuid,
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            Self::Wifi(p) => &p.identifier,
            Self::Vpn(p) => &p.identifier,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Wifi(p) => &p.display_name,
            Self::Vpn(p) => &p.display_name,
        }
    }

    pub fn validate(&self) -> Vec<String> {
        match self {
            Self::Wifi(p) => p.validate(),
            Self::Vpn(p) => p.validate(),
        }
    }

    pub fn to_attribute_map(&self) -> Dictionary {
        match self {
            Self::Wifi(p) => p.to_attribute_map(),
            Self::Vpn(p) => p.to_attribute_map(),
        }
    }

    /// Assign a fresh instance id and re-namespace the identifier under
    /// `profile_identifier`. Used by profile duplication.
    pub(crate) fn reassign_identity(&mut self, profile_identifier: &str) {
        let identifier = format!("{profile_identifier}.{}", self.identifier_slug());
        match self {
            Self::Wifi(p) => {
                p.uuid = Uuid::new_v4();
                p.identifier = identifier;
            }
            Self::Vpn(p) => {
                p.uuid = Uuid::new_v4();
                p.identifier = identifier;
            }
        }
    }
}

type DecodeFn = fn(&Dictionary) -> Result<Payload, ModelError>;

/// Payload variants known to the decoder, keyed by discriminator.
static PAYLOAD_REGISTRY: &[(&str, DecodeFn)] = &[
    (WIFI_PAYLOAD_TYPE, |dict| {
        WifiPayload::from_attribute_map(dict).map(Payload::Wifi)
    }),
    (VPN_PAYLOAD_TYPE, |dict| {
        VpnPayload::from_attribute_map(dict).map(Payload::Vpn)
    }),
];

/// Decode one payload attribute map, dispatching on its discriminator.
pub fn decode_payload(dict: &Dictionary) -> Result<Payload, ModelError> {
    let discriminator = dict
        .get("PayloadType")
        .and_then(Value::as_string)
        .ok_or_else(|| {
            ModelError::Decode("payload is missing required key PayloadType".to_string())
        })?;

    match PAYLOAD_REGISTRY.iter().find(|(ty, _)| *ty == discriminator) {
        Some((_, decode)) => decode(dict),
        None => Err(ModelError::UnknownPayloadType(discriminator.to_string())),
    }
}

/// Profile and payload UUIDs are written uppercase, matching how the
/// platform's own tooling renders them.
pub(crate) fn wire_uuid(uuid: Uuid) -> String {
    uuid.to_string().to_uppercase()
}

pub(crate) fn required_string(dict: &Dictionary, key: &str) -> Result<String, ModelError> {
    dict.get(key)
        .and_then(Value::as_string)
        .map(str::to_string)
        .ok_or_else(|| ModelError::Decode(format!("payload is missing required key {key}")))
}

pub(crate) fn optional_string(dict: &Dictionary, key: &str) -> Option<String> {
    dict.get(key).and_then(Value::as_string).map(str::to_string)
}

pub(crate) fn bool_or(dict: &Dictionary, key: &str, default: bool) -> bool {
    dict.get(key).and_then(Value::as_boolean).unwrap_or(default)
}

pub(crate) fn required_uuid(dict: &Dictionary) -> Result<Uuid, ModelError> {
    let raw = required_string(dict, "PayloadUUID")?;
    Uuid::parse_str(&raw).map_err(|_| ModelError::Decode(format!("invalid PayloadUUID: {raw}")))
}

pub(crate) fn required_version(dict: &Dictionary) -> Result<u32, ModelError> {
    let raw = dict
        .get("PayloadVersion")
        .and_then(Value::as_signed_integer)
        .ok_or_else(|| {
            ModelError::Decode("payload is missing required key PayloadVersion".to_string())
        })?;
    u32::try_from(raw).map_err(|_| ModelError::Decode(format!("invalid PayloadVersion: {raw}")))
}

fn optional_port(dict: &Dictionary) -> Result<Option<u16>, ModelError> {
    match dict.get("ProxyPort").and_then(Value::as_signed_integer) {
        Some(raw) => u16::try_from(raw)
            .map(Some)
            .map_err(|_| ModelError::Decode(format!("invalid ProxyPort: {raw}"))),
        None => Ok(None),
    }
}
