use chrono::{DateTime, Utc};
use rusqlite::params_from_iter;

use super::connection::{db_error, from_db_time, to_db_time};
use super::Database;
use crate::errors::VulnmapError;
use crate::models::{
    OrganizationCalculation, OrganizationId, OrganizationReport, UrlCalculation, UrlId, UrlReport,
};

const URL_REPORT_COLUMNS: &str = "id, url_id, at_when, calculation";
const ORGANIZATION_REPORT_COLUMNS: &str = "id, organization_id, at_when, calculation";

struct StoredRow {
    id: i64,
    owner_id: i64,
    at_when: DateTime<Utc>,
    calculation: String,
}

fn read_row(row: &rusqlite::Row) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        at_when: from_db_time(2, &row.get::<_, String>(2)?)?,
        calculation: row.get(3)?,
    })
}

fn url_report(row: StoredRow) -> Result<UrlReport, VulnmapError> {
    let calculation: UrlCalculation = serde_json::from_str(&row.calculation)?;
    let mut report = UrlReport::new(row.at_when, calculation);
    report.id = Some(row.id);
    report.url_id = row.owner_id;
    Ok(report)
}

fn organization_report(row: StoredRow) -> Result<OrganizationReport, VulnmapError> {
    let calculation: OrganizationCalculation = serde_json::from_str(&row.calculation)?;
    let mut report = OrganizationReport::new(row.at_when, calculation);
    report.id = Some(row.id);
    report.organization_id = row.owner_id;
    Ok(report)
}

fn insert_url_report(conn: &rusqlite::Connection, report: &UrlReport) -> Result<i64, VulnmapError> {
    let t = &report.totals;
    conn.execute(
        "INSERT INTO url_reports (url_id, at_when, high, medium, low, ok, total_issues, total_endpoints, is_ok, calculation)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            report.url_id,
            to_db_time(&report.at_when),
            t.high,
            t.medium,
            t.low,
            t.ok,
            t.total_issues,
            t.total_endpoints,
            report.is_ok,
            serde_json::to_string(&report.calculation)?
        ],
    ).map_err(|e| db_error("Failed to store url report", e))?;
    Ok(conn.last_insert_rowid())
}

fn insert_organization_report(
    conn: &rusqlite::Connection,
    report: &OrganizationReport,
) -> Result<i64, VulnmapError> {
    let t = &report.totals;
    let u = &report.url_totals;
    conn.execute(
        "INSERT INTO organization_reports (organization_id, at_when, high, medium, low, ok, total_issues,
         total_urls, high_urls, medium_urls, low_urls, ok_urls, calculation)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        rusqlite::params![
            report.organization_id,
            to_db_time(&report.at_when),
            t.high,
            t.medium,
            t.low,
            t.ok,
            t.total_issues,
            u.total_urls,
            u.high_urls,
            u.medium_urls,
            u.low_urls,
            u.ok_urls,
            serde_json::to_string(&report.calculation)?
        ],
    ).map_err(|e| db_error("Failed to store organization report", e))?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Replace the whole snapshot history of a URL in one transaction.
    pub fn replace_url_reports(&self, url_id: UrlId, reports: &[UrlReport]) -> Result<usize, VulnmapError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(|e| db_error("Failed to start transaction", e))?;
        tx.execute("DELETE FROM url_reports WHERE url_id = ?1", rusqlite::params![url_id])
            .map_err(|e| db_error("Failed to clear url reports", e))?;
        for report in reports {
            insert_url_report(&tx, report)?;
        }
        tx.commit().map_err(|e| db_error("Failed to commit url reports", e))?;
        Ok(reports.len())
    }

    pub fn replace_organization_reports(
        &self,
        organization_id: OrganizationId,
        reports: &[OrganizationReport],
    ) -> Result<usize, VulnmapError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(|e| db_error("Failed to start transaction", e))?;
        tx.execute(
            "DELETE FROM organization_reports WHERE organization_id = ?1",
            rusqlite::params![organization_id],
        ).map_err(|e| db_error("Failed to clear organization reports", e))?;
        for report in reports {
            insert_organization_report(&tx, report)?;
        }
        tx.commit().map_err(|e| db_error("Failed to commit organization reports", e))?;
        Ok(reports.len())
    }

    pub fn append_organization_report(&self, report: &OrganizationReport) -> Result<i64, VulnmapError> {
        let conn = self.lock()?;
        insert_organization_report(&conn, report)
    }

    /// Snapshot history of a URL, oldest first.
    pub fn url_reports(&self, url_id: UrlId) -> Result<Vec<UrlReport>, VulnmapError> {
        self.url_reports_for_urls(std::slice::from_ref(&url_id))
    }

    pub fn url_reports_for_urls(&self, url_ids: &[UrlId]) -> Result<Vec<UrlReport>, VulnmapError> {
        if url_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM url_reports WHERE url_id IN ({}) ORDER BY url_id, at_when, id",
            URL_REPORT_COLUMNS,
            vec!["?"; url_ids.len()].join(", ")
        );
        let rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&sql).map_err(|e| db_error("Query failed", e))?;
            let rows = stmt
                .query_map(params_from_iter(url_ids.iter()), read_row)
                .map_err(|e| db_error("Query failed", e))?;
            let collected = rows
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| db_error("Failed to read url reports", e))?;
            collected
        };
        rows.into_iter().map(url_report).collect()
    }

    /// Latest URL snapshot at or before `at`.
    pub fn latest_url_report(&self, url_id: UrlId, at: DateTime<Utc>) -> Result<Option<UrlReport>, VulnmapError> {
        let sql = format!(
            "SELECT {} FROM url_reports WHERE url_id = ?1 AND at_when <= ?2 ORDER BY at_when DESC, id DESC LIMIT 1",
            URL_REPORT_COLUMNS
        );
        let row = self.optional_row(&sql, url_id, at)?;
        row.map(url_report).transpose()
    }

    pub fn organization_reports(&self, organization_id: OrganizationId) -> Result<Vec<OrganizationReport>, VulnmapError> {
        let sql = format!(
            "SELECT {} FROM organization_reports WHERE organization_id = ?1 ORDER BY at_when, id",
            ORGANIZATION_REPORT_COLUMNS
        );
        let rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&sql).map_err(|e| db_error("Query failed", e))?;
            let rows = stmt
                .query_map(rusqlite::params![organization_id], read_row)
                .map_err(|e| db_error("Query failed", e))?;
            let collected = rows
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| db_error("Failed to read organization reports", e))?;
            collected
        };
        rows.into_iter().map(organization_report).collect()
    }

    pub fn latest_organization_report(
        &self,
        organization_id: OrganizationId,
        at: DateTime<Utc>,
    ) -> Result<Option<OrganizationReport>, VulnmapError> {
        let sql = format!(
            "SELECT {} FROM organization_reports WHERE organization_id = ?1 AND at_when <= ?2 ORDER BY at_when DESC, id DESC LIMIT 1",
            ORGANIZATION_REPORT_COLUMNS
        );
        let row = self.optional_row(&sql, organization_id, at)?;
        row.map(organization_report).transpose()
    }

    /// Raw stored payload of the newest organization snapshot, unparsed.
    pub fn latest_organization_calculation(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<String>, VulnmapError> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT calculation FROM organization_reports WHERE organization_id = ?1 ORDER BY at_when DESC, id DESC LIMIT 1",
            rusqlite::params![organization_id],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(raw) => Ok(Some(raw)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_error("Query failed", e)),
        }
    }

    fn optional_row(&self, sql: &str, owner_id: i64, at: DateTime<Utc>) -> Result<Option<StoredRow>, VulnmapError> {
        let conn = self.lock()?;
        match conn.query_row(sql, rusqlite::params![owner_id, to_db_time(&at)], read_row) {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_error("Query failed", e)),
        }
    }
}
