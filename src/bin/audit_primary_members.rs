//! Scans every account and reports those violating the one-primary rule.
//!
//! Usage: `audit_primary_members [path/to/memberbase.db]`
//!
//! Opens the database read-only, so it is safe to run against a live store.
//! Violations are printed one JSON object per line; the process exits with
//! status 1 when any are found so the check can gate a cron job or CI step.

use std::path::PathBuf;
use std::process::ExitCode;

use memberbase::MemberDb;

fn main() -> ExitCode {
    env_logger::init();

    let db = match std::env::args().nth(1) {
        Some(path) => MemberDb::open_readonly_at(&PathBuf::from(path)),
        None => MemberDb::open_readonly(),
    };
    let db = match db {
        Ok(db) => db,
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let census = match db.primary_census() {
        Ok(rows) => rows,
        Err(e) => {
            log::error!("Census query failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let total = census.len();
    let violations: Vec<_> = census
        .into_iter()
        .filter(|row| row.violates_invariant())
        .collect();

    for row in &violations {
        match serde_json::to_string(row) {
            Ok(line) => println!("{}", line),
            Err(e) => log::error!("Failed to serialize census row: {}", e),
        }
    }

    if violations.is_empty() {
        log::info!("{} accounts audited, no violations", total);
        ExitCode::SUCCESS
    } else {
        log::warn!("{} of {} accounts violate the primary rule", violations.len(), total);
        ExitCode::FAILURE
    }
}
