//! Record types served by the application.

mod token;
mod user;

pub use token::Token;
pub use user::User;

use chrono::{DateTime, SubsecRound, Utc};
use micro_engine::{Database, EnsureOptions};

/// Current time truncated to milliseconds, as stored in timestamp fields.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Current time as integer milliseconds since the epoch.
pub fn now_ms() -> i64 {
    now().timestamp_millis()
}

/// Synchronize the indexes of every record type.
pub fn ensure_indexes(db: &Database, options: EnsureOptions) -> micro_engine::Result<()> {
    for (name, report) in [
        ("user", db.collection::<User>().ensure_indexes(options)?),
        ("token", db.collection::<Token>().ensure_indexes(options)?),
    ] {
        tracing::info!(
            collection = name,
            created = report.created.len(),
            recreated = report.recreated.len(),
            conflicts = report.conflicts.len(),
            "indexes synchronized"
        );
    }
    Ok(())
}
