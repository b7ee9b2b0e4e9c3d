use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type OrganizationId = i64;
pub type UrlId = i64;
pub type EndpointId = i64;

/// An organization owning any number of URLs. URLs may belong to several organizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    /// Layer on the map, e.g. "municipality" or "province".
    #[serde(default)]
    pub type_name: Option<String>,
    /// Unknown for organizations imported before creation dates were tracked.
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
}

/// A domain name under observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Url {
    pub id: UrlId,
    pub address: String,
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub is_dead: bool,
    #[serde(default)]
    pub is_dead_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub not_resolvable: bool,
    #[serde(default)]
    pub not_resolvable_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub organizations: Vec<OrganizationId>,
}

impl Url {
    /// Whether the URL counts towards reports at `when`: it existed, and neither died
    /// nor stopped resolving before that moment. A flag without a timestamp is final.
    pub fn is_relevant_at(&self, when: DateTime<Utc>) -> bool {
        if self.created_on > when {
            return false;
        }
        if self.is_dead && !self.is_dead_since.is_some_and(|since| since >= when) {
            return false;
        }
        if self.not_resolvable && !self.not_resolvable_since.is_some_and(|since| since >= when) {
            return false;
        }
        true
    }

    /// Moment the URL stopped resolving, if it did. Without a recorded moment the URL
    /// never resolved, so this is its creation.
    pub fn not_resolvable_on(&self) -> Option<DateTime<Utc>> {
        self.not_resolvable.then(|| self.not_resolvable_since.unwrap_or(self.created_on))
    }

    /// Moment the URL was declared dead, if it was. Falls back to creation like
    /// `not_resolvable_on`.
    pub fn died_on(&self) -> Option<DateTime<Utc>> {
        self.is_dead.then(|| self.is_dead_since.unwrap_or(self.created_on))
    }
}

/// A service (protocol + port) on one IP version of a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: EndpointId,
    pub url_id: UrlId,
    /// 4 or 6.
    pub ip_version: u8,
    pub protocol: String,
    pub port: u16,
    pub discovered_on: DateTime<Utc>,
    #[serde(default)]
    pub is_dead: bool,
    #[serde(default)]
    pub is_dead_since: Option<DateTime<Utc>>,
}

impl Endpoint {
    pub fn is_ipv6(&self) -> bool {
        self.ip_version == 6
    }

    pub fn is_alive_at(&self, when: DateTime<Utc>) -> bool {
        self.discovered_on <= when
            && (!self.is_dead || self.is_dead_since.is_some_and(|since| since >= when))
    }

    /// Dead without a recorded moment means dead since discovery.
    pub fn died_on(&self) -> Option<DateTime<Utc>> {
        self.is_dead.then(|| self.is_dead_since.unwrap_or(self.discovered_on))
    }

    /// Human readable service label, e.g. `https/443 IPv4`.
    pub fn concat(&self) -> String {
        format!("{}/{} IPv{}", self.protocol, self.port, self.ip_version)
    }
}
