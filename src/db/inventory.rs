use std::collections::{BTreeSet, HashMap};

use rusqlite::params_from_iter;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::connection::{db_error, from_db_time, opt_from_db_time, to_db_time};
use super::Database;
use crate::errors::VulnmapError;
use crate::models::{
    Endpoint, Organization, OrganizationId, ScanEvent, SubjectKind, Url, UrlId,
};
use crate::reporting::Inventory;

/// Feed document accepted by `import`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryImport {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub urls: Vec<Url>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub scans: Vec<ScanEvent>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportCounts {
    pub organizations: usize,
    pub urls: usize,
    pub endpoints: usize,
    pub scans: usize,
}

/// Which part of the inventory to load.
#[derive(Debug, Clone, Copy)]
pub enum InventoryScope<'a> {
    All,
    Urls(&'a [UrlId]),
    Organizations(&'a [OrganizationId]),
}

/// `column IN (?, ?, ...)`, or a constant when there is nothing to filter on.
fn id_filter(column: &str, ids: Option<&[i64]>) -> String {
    match ids {
        None => "1 = 1".to_string(),
        Some([]) => "0 = 1".to_string(),
        Some(ids) => format!("{} IN ({})", column, vec!["?"; ids.len()].join(", ")),
    }
}

fn subject_kind_str(kind: SubjectKind) -> &'static str {
    match kind {
        SubjectKind::Endpoint => "endpoint",
        SubjectKind::Url => "url",
    }
}

impl Database {
    /// Upsert a feed document. Existing rows are updated in place, never replaced, so
    /// stored reports of known URLs survive a re-import.
    pub fn import(&self, batch: &InventoryImport) -> Result<ImportCounts, VulnmapError> {
        for endpoint in &batch.endpoints {
            if endpoint.ip_version != 4 && endpoint.ip_version != 6 {
                return Err(VulnmapError::InvalidInput(format!(
                    "Endpoint {} has IP version {}, expected 4 or 6",
                    endpoint.id, endpoint.ip_version
                )));
            }
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(|e| db_error("Failed to start import", e))?;

        for org in &batch.organizations {
            tx.execute(
                "INSERT INTO organizations (id, name, country, type_name, created_on) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, country = excluded.country,
                 type_name = excluded.type_name, created_on = excluded.created_on",
                rusqlite::params![
                    org.id,
                    org.name,
                    org.country,
                    org.type_name,
                    org.created_on.as_ref().map(to_db_time)
                ],
            ).map_err(|e| db_error("Failed to import organization", e))?;
        }

        for url in &batch.urls {
            tx.execute(
                "INSERT INTO urls (id, address, created_on, is_dead, is_dead_since, not_resolvable, not_resolvable_since)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET address = excluded.address, created_on = excluded.created_on,
                 is_dead = excluded.is_dead, is_dead_since = excluded.is_dead_since,
                 not_resolvable = excluded.not_resolvable, not_resolvable_since = excluded.not_resolvable_since",
                rusqlite::params![
                    url.id,
                    url.address,
                    to_db_time(&url.created_on),
                    url.is_dead,
                    url.is_dead_since.as_ref().map(to_db_time),
                    url.not_resolvable,
                    url.not_resolvable_since.as_ref().map(to_db_time)
                ],
            ).map_err(|e| db_error("Failed to import url", e))?;

            for org in &url.organizations {
                tx.execute(
                    "INSERT OR IGNORE INTO url_organizations (url_id, organization_id) VALUES (?1, ?2)",
                    rusqlite::params![url.id, org],
                ).map_err(|e| db_error(&format!("Failed to link url {} to organization {}", url.id, org), e))?;
            }
        }

        for ep in &batch.endpoints {
            tx.execute(
                "INSERT INTO endpoints (id, url_id, ip_version, protocol, port, discovered_on, is_dead, is_dead_since)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET url_id = excluded.url_id, ip_version = excluded.ip_version,
                 protocol = excluded.protocol, port = excluded.port, discovered_on = excluded.discovered_on,
                 is_dead = excluded.is_dead, is_dead_since = excluded.is_dead_since",
                rusqlite::params![
                    ep.id,
                    ep.url_id,
                    ep.ip_version,
                    ep.protocol,
                    ep.port,
                    to_db_time(&ep.discovered_on),
                    ep.is_dead,
                    ep.is_dead_since.as_ref().map(to_db_time)
                ],
            ).map_err(|e| db_error(&format!("Failed to import endpoint {}", ep.id), e))?;
        }

        for scan in &batch.scans {
            tx.execute(
                "INSERT INTO scan_events (id, subject_kind, subject_id, scan_type, rating, determined_on, last_scan_moment, is_explained, explanation)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET last_scan_moment = excluded.last_scan_moment,
                 is_explained = excluded.is_explained, explanation = excluded.explanation",
                rusqlite::params![
                    scan.id,
                    subject_kind_str(scan.subject_kind),
                    scan.subject_id,
                    scan.scan_type,
                    scan.rating,
                    to_db_time(&scan.determined_on),
                    to_db_time(&scan.last_scan_moment),
                    scan.is_explained,
                    scan.explanation
                ],
            ).map_err(|e| db_error(&format!("Failed to import scan {}", scan.id), e))?;
        }

        tx.commit().map_err(|e| db_error("Failed to commit import", e))?;

        let counts = ImportCounts {
            organizations: batch.organizations.len(),
            urls: batch.urls.len(),
            endpoints: batch.endpoints.len(),
            scans: batch.scans.len(),
        };
        info!(?counts, "Imported inventory");
        Ok(counts)
    }

    /// Load entities and scan events into an in-memory inventory.
    pub fn load_inventory(&self, scope: InventoryScope<'_>) -> Result<Inventory, VulnmapError> {
        let url_ids: Option<Vec<UrlId>> = match scope {
            InventoryScope::All => None,
            InventoryScope::Urls(ids) => Some(ids.to_vec()),
            InventoryScope::Organizations(orgs) => Some(self.url_ids_of_organizations(orgs)?),
        };

        let conn = self.lock()?;
        let url_filter = url_ids.as_deref();

        let mut urls = load_urls(&conn, url_filter)?;
        let links = load_links(&conn, url_filter)?;
        for url in &mut urls {
            url.organizations = links.get(&url.id).cloned().unwrap_or_default();
        }

        let org_ids: Option<Vec<OrganizationId>> = match scope {
            InventoryScope::All => None,
            InventoryScope::Urls(_) | InventoryScope::Organizations(_) => {
                let mut ids: BTreeSet<OrganizationId> = links.values().flatten().copied().collect();
                if let InventoryScope::Organizations(requested) = scope {
                    ids.extend(requested.iter().copied());
                }
                Some(ids.into_iter().collect())
            }
        };
        let organizations = load_organizations(&conn, org_ids.as_deref())?;

        let endpoints = load_endpoints(&conn, url_filter)?;
        let endpoint_ids: Option<Vec<i64>> = url_filter.map(|_| endpoints.iter().map(|e| e.id).collect());

        let mut scans = load_scans(&conn, SubjectKind::Endpoint, endpoint_ids.as_deref())?;
        scans.extend(load_scans(&conn, SubjectKind::Url, url_filter)?);

        Ok(Inventory::new(organizations, urls, endpoints, scans))
    }

    pub fn all_url_ids(&self) -> Result<Vec<UrlId>, VulnmapError> {
        self.ids("SELECT id FROM urls ORDER BY id", &[])
    }

    pub fn all_organization_ids(&self) -> Result<Vec<OrganizationId>, VulnmapError> {
        self.ids("SELECT id FROM organizations ORDER BY id", &[])
    }

    pub fn url_ids_of_organizations(&self, orgs: &[OrganizationId]) -> Result<Vec<UrlId>, VulnmapError> {
        let sql = format!(
            "SELECT DISTINCT url_id FROM url_organizations WHERE {} ORDER BY url_id",
            id_filter("organization_id", Some(orgs))
        );
        self.ids(&sql, orgs)
    }

    pub fn organizations_of_urls(&self, urls: &[UrlId]) -> Result<Vec<OrganizationId>, VulnmapError> {
        let sql = format!(
            "SELECT DISTINCT organization_id FROM url_organizations WHERE {} ORDER BY organization_id",
            id_filter("url_id", Some(urls))
        );
        self.ids(&sql, urls)
    }

    pub fn get_url(&self, id: UrlId) -> Result<Option<Url>, VulnmapError> {
        let conn = self.lock()?;
        Ok(load_urls(&conn, Some(std::slice::from_ref(&id)))?.pop())
    }

    pub fn get_organization(&self, id: OrganizationId) -> Result<Option<Organization>, VulnmapError> {
        let conn = self.lock()?;
        Ok(load_organizations(&conn, Some(std::slice::from_ref(&id)))?.pop())
    }

    fn ids(&self, sql: &str, params: &[i64]) -> Result<Vec<i64>, VulnmapError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(|e| db_error("Query failed", e))?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get::<_, i64>(0))
            .map_err(|e| db_error("Query failed", e))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| db_error("Row read failed", e))
    }
}

fn load_urls(conn: &rusqlite::Connection, ids: Option<&[UrlId]>) -> Result<Vec<Url>, VulnmapError> {
    let sql = format!(
        "SELECT id, address, created_on, is_dead, is_dead_since, not_resolvable, not_resolvable_since FROM urls WHERE {} ORDER BY id",
        id_filter("id", ids)
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| db_error("Query failed", e))?;
    let rows = stmt
        .query_map(params_from_iter(ids.unwrap_or(&[]).iter()), |row| {
            Ok(Url {
                id: row.get(0)?,
                address: row.get(1)?,
                created_on: from_db_time(2, &row.get::<_, String>(2)?)?,
                is_dead: row.get(3)?,
                is_dead_since: opt_from_db_time(4, row.get(4)?)?,
                not_resolvable: row.get(5)?,
                not_resolvable_since: opt_from_db_time(6, row.get(6)?)?,
                organizations: Vec::new(),
            })
        })
        .map_err(|e| db_error("Query failed", e))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| db_error("Failed to read urls", e))
}

fn load_links(
    conn: &rusqlite::Connection,
    url_ids: Option<&[UrlId]>,
) -> Result<HashMap<UrlId, Vec<OrganizationId>>, VulnmapError> {
    let sql = format!(
        "SELECT url_id, organization_id FROM url_organizations WHERE {} ORDER BY url_id, organization_id",
        id_filter("url_id", url_ids)
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| db_error("Query failed", e))?;
    let rows = stmt
        .query_map(params_from_iter(url_ids.unwrap_or(&[]).iter()), |row| {
            Ok((row.get::<_, UrlId>(0)?, row.get::<_, OrganizationId>(1)?))
        })
        .map_err(|e| db_error("Query failed", e))?;

    let mut links: HashMap<UrlId, Vec<OrganizationId>> = HashMap::new();
    for row in rows {
        let (url, org) = row.map_err(|e| db_error("Failed to read url organizations", e))?;
        links.entry(url).or_default().push(org);
    }
    Ok(links)
}

fn load_organizations(
    conn: &rusqlite::Connection,
    ids: Option<&[OrganizationId]>,
) -> Result<Vec<Organization>, VulnmapError> {
    let sql = format!(
        "SELECT id, name, country, type_name, created_on FROM organizations WHERE {} ORDER BY id",
        id_filter("id", ids)
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| db_error("Query failed", e))?;
    let rows = stmt
        .query_map(params_from_iter(ids.unwrap_or(&[]).iter()), |row| {
            Ok(Organization {
                id: row.get(0)?,
                name: row.get(1)?,
                country: row.get(2)?,
                type_name: row.get(3)?,
                created_on: opt_from_db_time(4, row.get(4)?)?,
            })
        })
        .map_err(|e| db_error("Query failed", e))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| db_error("Failed to read organizations", e))
}

fn load_endpoints(conn: &rusqlite::Connection, url_ids: Option<&[UrlId]>) -> Result<Vec<Endpoint>, VulnmapError> {
    let sql = format!(
        "SELECT id, url_id, ip_version, protocol, port, discovered_on, is_dead, is_dead_since FROM endpoints WHERE {} ORDER BY id",
        id_filter("url_id", url_ids)
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| db_error("Query failed", e))?;
    let rows = stmt
        .query_map(params_from_iter(url_ids.unwrap_or(&[]).iter()), |row| {
            Ok(Endpoint {
                id: row.get(0)?,
                url_id: row.get(1)?,
                ip_version: row.get(2)?,
                protocol: row.get(3)?,
                port: row.get(4)?,
                discovered_on: from_db_time(5, &row.get::<_, String>(5)?)?,
                is_dead: row.get(6)?,
                is_dead_since: opt_from_db_time(7, row.get(7)?)?,
            })
        })
        .map_err(|e| db_error("Query failed", e))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| db_error("Failed to read endpoints", e))
}

fn load_scans(
    conn: &rusqlite::Connection,
    kind: SubjectKind,
    subject_ids: Option<&[i64]>,
) -> Result<Vec<ScanEvent>, VulnmapError> {
    let sql = format!(
        "SELECT id, subject_id, scan_type, rating, determined_on, last_scan_moment, is_explained, explanation
         FROM scan_events WHERE subject_kind = '{}' AND {} ORDER BY determined_on, id",
        subject_kind_str(kind),
        id_filter("subject_id", subject_ids)
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| db_error("Query failed", e))?;
    let rows = stmt
        .query_map(params_from_iter(subject_ids.unwrap_or(&[]).iter()), |row| {
            Ok(ScanEvent {
                id: row.get(0)?,
                subject_kind: kind,
                subject_id: row.get(1)?,
                scan_type: row.get(2)?,
                rating: row.get(3)?,
                determined_on: from_db_time(4, &row.get::<_, String>(4)?)?,
                last_scan_moment: from_db_time(5, &row.get::<_, String>(5)?)?,
                is_explained: row.get(6)?,
                explanation: row.get(7)?,
            })
        })
        .map_err(|e| db_error("Query failed", e))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| db_error("Failed to read scan events", e))
}
