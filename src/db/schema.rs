pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS organizations (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    country TEXT,
    type_name TEXT,
    created_on TEXT
);

CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY,
    address TEXT NOT NULL,
    created_on TEXT NOT NULL,
    is_dead INTEGER NOT NULL DEFAULT 0,
    is_dead_since TEXT,
    not_resolvable INTEGER NOT NULL DEFAULT 0,
    not_resolvable_since TEXT
);

CREATE TABLE IF NOT EXISTS url_organizations (
    url_id INTEGER NOT NULL REFERENCES urls(id) ON DELETE CASCADE,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    PRIMARY KEY (url_id, organization_id)
);

CREATE TABLE IF NOT EXISTS endpoints (
    id INTEGER PRIMARY KEY,
    url_id INTEGER NOT NULL REFERENCES urls(id) ON DELETE CASCADE,
    ip_version INTEGER NOT NULL,
    protocol TEXT NOT NULL,
    port INTEGER NOT NULL,
    discovered_on TEXT NOT NULL,
    is_dead INTEGER NOT NULL DEFAULT 0,
    is_dead_since TEXT
);

CREATE TABLE IF NOT EXISTS scan_events (
    id INTEGER PRIMARY KEY,
    subject_kind TEXT NOT NULL,
    subject_id INTEGER NOT NULL,
    scan_type TEXT NOT NULL,
    rating TEXT NOT NULL,
    determined_on TEXT NOT NULL,
    last_scan_moment TEXT NOT NULL,
    is_explained INTEGER NOT NULL DEFAULT 0,
    explanation TEXT
);

CREATE TABLE IF NOT EXISTS url_reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url_id INTEGER NOT NULL REFERENCES urls(id) ON DELETE CASCADE,
    at_when TEXT NOT NULL,
    high INTEGER NOT NULL DEFAULT 0,
    medium INTEGER NOT NULL DEFAULT 0,
    low INTEGER NOT NULL DEFAULT 0,
    ok INTEGER NOT NULL DEFAULT 0,
    total_issues INTEGER NOT NULL DEFAULT 0,
    total_endpoints INTEGER NOT NULL DEFAULT 0,
    is_ok INTEGER NOT NULL DEFAULT 0,
    calculation TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS organization_reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    at_when TEXT NOT NULL,
    high INTEGER NOT NULL DEFAULT 0,
    medium INTEGER NOT NULL DEFAULT 0,
    low INTEGER NOT NULL DEFAULT 0,
    ok INTEGER NOT NULL DEFAULT 0,
    total_issues INTEGER NOT NULL DEFAULT 0,
    total_urls INTEGER NOT NULL DEFAULT 0,
    high_urls INTEGER NOT NULL DEFAULT 0,
    medium_urls INTEGER NOT NULL DEFAULT 0,
    low_urls INTEGER NOT NULL DEFAULT 0,
    ok_urls INTEGER NOT NULL DEFAULT 0,
    calculation TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_endpoints_url ON endpoints(url_id);
CREATE INDEX IF NOT EXISTS idx_scan_events_subject ON scan_events(subject_kind, subject_id);
CREATE INDEX IF NOT EXISTS idx_url_organizations_org ON url_organizations(organization_id);
CREATE INDEX IF NOT EXISTS idx_url_reports_url_when ON url_reports(url_id, at_when);
CREATE INDEX IF NOT EXISTS idx_organization_reports_org_when ON organization_reports(organization_id, at_when);
";
