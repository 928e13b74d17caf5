//! Bulk user provisioning from uploaded worksheets.
//!
//! A worksheet is a CSV sheet whose header must carry the expected columns.
//! Header validation happens before any row is touched: a missing column
//! aborts the whole worksheet. Individual row failures (most commonly a
//! uniqueness violation on re-imported roll numbers) are collected and do
//! not stop the batch. The engine returns a partitioned outcome rather than
//! relying on logging side effects alone.

use diesel::prelude::*;
use thiserror::Error;
use uuid::Uuid;

use db::schema::users;

use crate::util::{hash_password, short_random};

/// The columns a worksheet must provide, in the order the upstream sheet
/// template uses them.
pub const EXPECTED_COLUMNS: [&str; 6] =
    ["Roll No", "Email ID", "Name", "Department", "Semester", "Phone No"];

/// A failure which aborts an entire worksheet before or during parsing.
#[derive(Debug, Error)]
pub enum WorksheetError {
    #[error("missing expected column `{0}`")]
    MissingColumn(&'static str),
    #[error("could not read worksheet: {0}")]
    Unreadable(#[from] csv::Error),
}

/// A failure confined to a single row; the rest of the worksheet proceeds.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("no value for `{0}`")]
    MissingField(&'static str),
    #[error("unparseable row: {0}")]
    Malformed(#[from] csv::Error),
    #[error("row rejected: {0}")]
    Rejected(#[from] diesel::result::Error),
}

#[derive(Debug)]
pub struct RowFailure {
    /// 1-based sheet row (the header is row 1).
    pub row: usize,
    pub error: RowError,
}

/// A user persisted by the import.
#[derive(Debug)]
pub struct ProvisionedUser {
    pub roll_no: String,
    pub email: String,
}

#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub provisioned: Vec<ProvisionedUser>,
    pub failed: Vec<RowFailure>,
}

/// Provisions one user per worksheet row.
///
/// Every created user gets a freshly generated 8-character password (hashed
/// into the credential column, surfaced only through the process log), and
/// the provenance flags `is_phone_no_verified`, `has_filled_profile` and
/// `is_from_fcrit` set. Each insert is its own unit of work.
pub fn import_worksheet(
    contents: &[u8],
    conn: &mut SqliteConnection,
) -> Result<ImportOutcome, WorksheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents);

    let headers = reader.headers()?.clone();
    let mut indices = [0usize; EXPECTED_COLUMNS.len()];
    for (slot, column) in EXPECTED_COLUMNS.iter().enumerate() {
        indices[slot] = headers
            .iter()
            .position(|header| header == *column)
            .ok_or(WorksheetError::MissingColumn(column))?;
    }

    let mut outcome = ImportOutcome::default();

    for (offset, record) in reader.records().enumerate() {
        let row = offset + 2;

        let record = match record {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(row, %error, "skipping unparseable row");
                outcome.failed.push(RowFailure {
                    row,
                    error: RowError::Malformed(error),
                });
                continue;
            }
        };

        match provision_row(&record, &indices, conn) {
            Ok(user) => {
                outcome.provisioned.push(user);
            }
            Err(error) => {
                tracing::warn!(row, %error, "row not provisioned");
                outcome.failed.push(RowFailure { row, error });
            }
        }
    }

    Ok(outcome)
}

fn provision_row(
    record: &csv::StringRecord,
    indices: &[usize; EXPECTED_COLUMNS.len()],
    conn: &mut SqliteConnection,
) -> Result<ProvisionedUser, RowError> {
    let field = |slot: usize| -> Result<&str, RowError> {
        record
            .get(indices[slot])
            .filter(|value| !value.is_empty())
            .ok_or(RowError::MissingField(EXPECTED_COLUMNS[slot]))
    };

    let roll_no = field(0)?;
    let email = field(1)?;
    let name = field(2)?;
    let department = field(3)?;
    let semester = field(4)?;
    let phone_no = field(5)?;

    let password = short_random(8);
    // the plaintext is deliberately only surfaced here; it is never stored
    tracing::info!(%roll_no, %password, "generated credentials");

    diesel::insert_into(users::table)
        .values((
            users::public_id.eq(Uuid::new_v4().to_string()),
            users::roll_no.eq(roll_no),
            users::email.eq(email),
            users::name.eq(name),
            users::department.eq(department),
            users::semester.eq(semester),
            users::phone_no.eq(phone_no),
            users::password_hash.eq(hash_password(&password)),
            users::is_phone_no_verified.eq(true),
            users::has_filled_profile.eq(true),
            users::is_from_fcrit.eq(true),
            users::email_send.eq(false),
            users::is_superuser.eq(false),
            users::created_at.eq(diesel::dsl::now),
        ))
        .execute(conn)?;

    Ok(ProvisionedUser {
        roll_no: roll_no.to_string(),
        email: email.to_string(),
    })
}

#[cfg(test)]
mod test_import {
    use diesel::prelude::*;
    use diesel_migrations::MigrationHarness;

    use db::schema::users;

    use super::{import_worksheet, RowError, WorksheetError};

    fn test_conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        conn.run_pending_migrations(crate::MIGRATIONS).unwrap();
        conn
    }

    const WELL_FORMED: &str = "\
Roll No,Email ID,Name,Department,Semester,Phone No
101,a@x.com,A,CS,3,999
102,b@x.com,B,IT,5,888
";

    #[test]
    fn test_each_row_yields_one_user_with_provenance_flags() {
        let mut conn = test_conn();

        let outcome =
            import_worksheet(WELL_FORMED.as_bytes(), &mut conn).unwrap();
        assert_eq!(outcome.provisioned.len(), 2);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.provisioned[0].roll_no, "101");
        assert_eq!(outcome.provisioned[0].email, "a@x.com");

        let (hash, phone_verified, filled, from_fcrit): (
            String,
            bool,
            bool,
            bool,
        ) = users::table
            .filter(users::roll_no.eq("101"))
            .select((
                users::password_hash,
                users::is_phone_no_verified,
                users::has_filled_profile,
                users::is_from_fcrit,
            ))
            .first(&mut conn)
            .unwrap();
        assert!(phone_verified && filled && from_fcrit);
        // the credential is a hash, never the plaintext
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_duplicate_roll_no_is_a_row_failure_not_an_abort() {
        let mut conn = test_conn();

        import_worksheet(WELL_FORMED.as_bytes(), &mut conn).unwrap();
        let outcome =
            import_worksheet(WELL_FORMED.as_bytes(), &mut conn).unwrap();

        assert!(outcome.provisioned.is_empty());
        assert_eq!(outcome.failed.len(), 2);
        assert!(matches!(outcome.failed[0].error, RowError::Rejected(_)));

        let count: i64 = users::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_missing_column_aborts_the_worksheet() {
        let mut conn = test_conn();

        let sheet = "\
Roll No,Email ID,Name,Department,Semester
101,a@x.com,A,CS,3
";
        let err = import_worksheet(sheet.as_bytes(), &mut conn).unwrap_err();
        assert!(matches!(err, WorksheetError::MissingColumn("Phone No")));

        let count: i64 = users::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_short_row_is_a_row_failure() {
        let mut conn = test_conn();

        let sheet = "\
Roll No,Email ID,Name,Department,Semester,Phone No
101,a@x.com,A,CS,3,999
102,b@x.com
";
        let outcome = import_worksheet(sheet.as_bytes(), &mut conn).unwrap();
        assert_eq!(outcome.provisioned.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].row, 3);
        assert!(matches!(
            outcome.failed[0].error,
            RowError::MissingField("Name")
        ));
    }
}
