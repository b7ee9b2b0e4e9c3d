use std::fmt::Write;

use crate::cli::commands::{ReportArgs, ReportKind};
use crate::cli::context::CliContext;
use crate::errors::VulnmapError;
use crate::models::{FindingCalculation, IssueTotals, OrganizationReport, UrlReport};
use crate::reporting::reporting_now;

fn counters(t: &IssueTotals) -> String {
    format!("high {} medium {} low {} ok {}", t.high, t.medium, t.low, t.ok)
}

fn finding_line(out: &mut String, indent: &str, f: &FindingCalculation) {
    let mut flags = String::new();
    if f.is_explained {
        flags.push_str(" [explained]");
    }
    if f.is_repeated {
        flags.push_str(" [repeated]");
    }
    let _ = writeln!(out, "{}{:<50} {:<10}{}", indent, f.scan_type, f.rating, flags);
}

pub fn render_url_report(report: &UrlReport) -> String {
    let calc = &report.calculation;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (url {}) at {}: {}{}",
        calc.url,
        calc.url_id,
        report.at_when.to_rfc3339(),
        counters(&report.totals),
        if report.is_ok { ", ok" } else { "" }
    );
    for finding in &calc.ratings {
        finding_line(&mut out, "  ", finding);
    }
    for endpoint in &calc.endpoints {
        let _ = writeln!(out, "  {} (endpoint {})", endpoint.concat, endpoint.id);
        for finding in &endpoint.ratings {
            finding_line(&mut out, "    ", finding);
        }
    }
    out
}

pub fn render_organization_report(report: &OrganizationReport) -> String {
    let calc = &report.calculation;
    let u = &report.url_totals;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (organization {}) at {}: {}",
        calc.name,
        calc.organization_id,
        report.at_when.to_rfc3339(),
        counters(&report.totals)
    );
    let _ = writeln!(
        out,
        "  urls {}: high {} medium {} low {} ok {}",
        u.total_urls, u.high_urls, u.medium_urls, u.low_urls, u.ok_urls
    );
    for url in &calc.urls {
        let _ = writeln!(out, "  {:<40} {}", url.url, counters(&url.totals));
    }
    out
}

pub async fn handle_report(ctx: &CliContext, args: ReportArgs) -> Result<(), VulnmapError> {
    let db = ctx.open_database()?;
    let at = args.at.unwrap_or_else(reporting_now);

    match args.kind {
        ReportKind::Url => {
            if db.get_url(args.id)?.is_none() {
                return Err(VulnmapError::NotFound(format!("Url {} not found", args.id)));
            }
            let reports = if args.history {
                db.url_reports(args.id)?
            } else {
                db.latest_url_report(args.id, at)?.into_iter().collect()
            };
            if reports.is_empty() {
                return Err(VulnmapError::NotFound(format!("No report for url {}", args.id)));
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                reports.iter().for_each(|r| print!("{}", render_url_report(r)));
            }
        }
        ReportKind::Organization => {
            if db.get_organization(args.id)?.is_none() {
                return Err(VulnmapError::NotFound(format!("Organization {} not found", args.id)));
            }
            let reports = if args.history {
                db.organization_reports(args.id)?
            } else {
                db.latest_organization_report(args.id, at)?.into_iter().collect()
            };
            if reports.is_empty() {
                return Err(VulnmapError::NotFound(format!("No report for organization {}", args.id)));
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                reports.iter().for_each(|r| print!("{}", render_organization_report(r)));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UrlCalculation, UrlTotals, OrganizationCalculation};
    use crate::reporting::test_support::day;

    fn url_calc() -> UrlCalculation {
        UrlCalculation {
            url: "test.nl".into(),
            url_id: 10,
            is_ok: false,
            totals: IssueTotals { high: 1, ..Default::default() },
            ratings: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    #[test]
    fn test_render_url_report_header() {
        let text = render_url_report(&UrlReport::new(day(2), url_calc()));
        assert!(text.starts_with("test.nl (url 10) at 2026-03-02T10:00:00+00:00: high 1 medium 0 low 0 ok 0"));
    }

    #[test]
    fn test_render_organization_lists_urls() {
        let mut url_totals = UrlTotals::default();
        url_totals.count(&url_calc());
        let calc = OrganizationCalculation {
            organization_id: 1,
            name: "Gemeente Test".into(),
            totals: IssueTotals { high: 1, ..Default::default() },
            url_totals,
            urls: vec![url_calc()],
        };
        let text = render_organization_report(&OrganizationReport::new(day(2), calc));
        assert!(text.contains("urls 1: high 1 medium 0 low 0 ok 0"));
        assert!(text.contains("test.nl"));
    }
}
