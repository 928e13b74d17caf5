//! End-to-end tests of the admin bulk-action workflow. These drive the
//! application over HTTP (via Rocket's blocking local client) against a
//! throwaway SQLite database, and assert on the database state directly.

use diesel::prelude::*;
use diesel::SqliteConnection;
use rocket::http::{ContentType, Header};
use rocket::local::blocking::Client;
use uuid::Uuid;

use db::email::EmailRow;
use db::schema::{
    emails, events, participation_members, participations, transactions,
    user_requests, users, worksheets,
};
use db::user::User;

use crate::admin::setup::SetupForm;
use crate::auth::login::PasswordLoginForm;
use crate::make_rocket;
use crate::util::hash_password;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "random@string123!!:";

const WORKSHEET: &str = "\
Roll No,Email ID,Name,Department,Semester,Phone No
101,a@x.com,A,CS,3,999
102,b@x.com,B,IT,5,888
";

fn get_test_rocket_instance() -> (Client, SqliteConnection) {
    let db_name = std::env::temp_dir()
        .join(format!("{}.db", Uuid::now_v7()))
        .to_str()
        .unwrap()
        .to_string();

    let mut conn = SqliteConnection::establish(&db_name)
        .expect("Database connection failed");
    diesel::sql_query("PRAGMA journal_mode=WAL")
        .execute(&mut conn)
        .expect("Failed to enable WAL mode");
    diesel::sql_query("pragma synchronous = off;")
        .execute(&mut conn)
        .expect("Failed to disable synchronous commit");

    let rocket = make_rocket(&db_name);
    (Client::tracked(rocket).unwrap(), conn)
}

/// Creates the superuser via first-run setup and logs in as them.
fn admin_client() -> (Client, SqliteConnection) {
    let (client, conn) = get_test_rocket_instance();

    client
        .post("/admin/setup")
        .header(ContentType::Form)
        .body(
            serde_urlencoded::to_string(&SetupForm {
                name: "admin".to_string(),
                roll_no: "0".to_string(),
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
                password2: ADMIN_PASSWORD.to_string(),
            })
            .unwrap(),
        )
        .dispatch();

    client
        .post("/login")
        .header(ContentType::Form)
        .body(
            serde_urlencoded::to_string(&PasswordLoginForm {
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
            })
            .unwrap(),
        )
        .dispatch();

    (client, conn)
}

fn insert_worksheet(conn: &mut SqliteConnection, contents: &str) -> String {
    let public_id = Uuid::new_v4().to_string();
    diesel::insert_into(worksheets::table)
        .values((
            worksheets::public_id.eq(&public_id),
            worksheets::filename.eq("students.csv"),
            worksheets::contents.eq(contents.as_bytes()),
        ))
        .execute(conn)
        .unwrap();
    public_id
}

fn selection_body(public_ids: &[String]) -> String {
    public_ids
        .iter()
        .map(|id| format!("selected={id}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn student_public_ids(conn: &mut SqliteConnection) -> Vec<String> {
    users::table
        .filter(users::is_superuser.eq(false))
        .order_by(users::roll_no.asc())
        .select(users::public_id)
        .load(conn)
        .unwrap()
}

#[test]
fn import_provisions_one_user_per_row() {
    let (client, mut conn) = admin_client();
    let sheet_id = insert_worksheet(&mut conn, WORKSHEET);

    let response = client
        .post("/admin/worksheets/import")
        .header(ContentType::Form)
        .body(selection_body(&[sheet_id]))
        .dispatch();
    let body = response.into_string().unwrap();
    assert!(body.contains("2 provisioned"));

    let students: Vec<User> = users::table
        .filter(users::is_superuser.eq(false))
        .order_by(users::roll_no.asc())
        .load(&mut conn)
        .unwrap();
    assert_eq!(students.len(), 2);

    let first = &students[0];
    assert_eq!(first.roll_no, "101");
    assert_eq!(first.email, "a@x.com");
    assert_eq!(first.name, "A");
    assert_eq!(first.department, "CS");
    assert_eq!(first.semester, "3");
    assert_eq!(first.phone_no, "999");
    assert!(first.is_phone_no_verified);
    assert!(first.has_filled_profile);
    assert!(first.is_from_fcrit);
    assert!(!first.email_send);
    // the stored credential is a hash, never the plaintext
    assert!(first.password_hash.starts_with("$argon2"));
}

#[test]
fn reimporting_existing_roll_numbers_does_not_duplicate() {
    let (client, mut conn) = admin_client();
    let sheet_id = insert_worksheet(&mut conn, WORKSHEET);

    for _ in 0..2 {
        let response = client
            .post("/admin/worksheets/import")
            .header(ContentType::Form)
            .body(selection_body(&[sheet_id.clone()]))
            .dispatch();
        assert!(response.status().code < 500);
    }

    let count: i64 = users::table
        .filter(users::is_superuser.eq(false))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn malformed_worksheet_aborts_itself_but_not_the_batch() {
    let (client, mut conn) = admin_client();
    let missing_column = "\
Roll No,Email ID,Name,Department,Semester
201,c@x.com,C,CS,3
";
    let bad_id = insert_worksheet(&mut conn, missing_column);
    let good_id = insert_worksheet(&mut conn, WORKSHEET);

    let response = client
        .post("/admin/worksheets/import")
        .header(ContentType::Form)
        .body(selection_body(&[bad_id, good_id]))
        .dispatch();
    let body = response.into_string().unwrap();
    assert!(body.contains("Error processing students.csv"));
    assert!(body.contains("missing expected column `Phone No`"));
    assert!(body.contains("2 provisioned"));

    let count: i64 = users::table
        .filter(users::is_superuser.eq(false))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn uploading_a_worksheet_stages_it_for_import() {
    let (client, mut conn) = admin_client();

    let boundary = "X-TEST-BOUNDARY";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"worksheet\"; filename=\"students.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {WORKSHEET}\r\n\
         --{boundary}--\r\n"
    );
    let response = client
        .post("/admin/worksheets")
        .header(Header::new(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        ))
        .body(body)
        .dispatch();
    assert!(response.status().code < 400);

    let (filename, contents): (String, Vec<u8>) = worksheets::table
        .select((worksheets::filename, worksheets::contents))
        .first(&mut conn)
        .unwrap();
    assert_eq!(filename, "students.csv");
    assert_eq!(contents, WORKSHEET.as_bytes());
}

#[test]
fn credentials_email_reissues_passwords_and_sets_the_flag() {
    let (client, mut conn) = admin_client();
    let sheet_id = insert_worksheet(&mut conn, WORKSHEET);
    client
        .post("/admin/worksheets/import")
        .header(ContentType::Form)
        .body(selection_body(&[sheet_id]))
        .dispatch();

    let old_hashes: Vec<String> = users::table
        .filter(users::is_superuser.eq(false))
        .order_by(users::roll_no.asc())
        .select(users::password_hash)
        .load(&mut conn)
        .unwrap();

    let selected = student_public_ids(&mut conn);
    let response = client
        .post("/admin/users/email")
        .header(ContentType::Form)
        .body(selection_body(&selected))
        .dispatch();
    let body = response.into_string().unwrap();
    assert!(body.contains("Email sent successfully to 2 selected users."));

    let students: Vec<User> = users::table
        .filter(users::is_superuser.eq(false))
        .order_by(users::roll_no.asc())
        .load(&mut conn)
        .unwrap();
    for (student, old_hash) in students.iter().zip(&old_hashes) {
        assert!(student.email_send);
        // a fresh temporary password was issued as part of the dispatch
        assert_ne!(&student.password_hash, old_hash);
    }

    // one record per dispatched message
    let dispatched: Vec<EmailRow> = emails::table
        .order_by(emails::id.asc())
        .load(&mut conn)
        .unwrap();
    assert_eq!(dispatched.len(), 2);
    assert!(dispatched[0].recipients.contains("a@x.com"));
    assert!(dispatched[0]
        .contents
        .as_deref()
        .unwrap()
        .contains("User ID: 101"));
}

#[test]
fn failed_dispatch_leaves_the_row_untouched_and_the_batch_continues() {
    let (client, mut conn) = admin_client();
    // the first row's address cannot be parsed as a mailbox, so its
    // dispatch fails; the second row is well-formed
    let sheet = "\
Roll No,Email ID,Name,Department,Semester,Phone No
101,not-a-mailbox,A,CS,3,999
102,b@x.com,B,IT,5,888
";
    let sheet_id = insert_worksheet(&mut conn, sheet);
    client
        .post("/admin/worksheets/import")
        .header(ContentType::Form)
        .body(selection_body(&[sheet_id]))
        .dispatch();

    let old_hashes: Vec<String> = users::table
        .filter(users::is_superuser.eq(false))
        .order_by(users::roll_no.asc())
        .select(users::password_hash)
        .load(&mut conn)
        .unwrap();

    let selected = student_public_ids(&mut conn);
    let response = client
        .post("/admin/users/email")
        .header(ContentType::Form)
        .body(selection_body(&selected))
        .dispatch();
    let body = response.into_string().unwrap();
    assert!(body.contains("Email sent successfully to 1 selected users."));
    assert!(body.contains("1 dispatches failed"));

    let students: Vec<User> = users::table
        .filter(users::is_superuser.eq(false))
        .order_by(users::roll_no.asc())
        .load(&mut conn)
        .unwrap();

    // the failed recipient keeps its credentials and its flag
    assert!(!students[0].email_send);
    assert_eq!(students[0].password_hash, old_hashes[0]);

    // the recipient after the failure was still processed
    assert!(students[1].email_send);
    assert_ne!(students[1].password_hash, old_hashes[1]);

    let dispatched: Vec<EmailRow> =
        emails::table.load(&mut conn).unwrap();
    assert_eq!(dispatched.len(), 1);
    assert!(dispatched[0].recipients.contains("b@x.com"));
}

#[test]
fn user_export_has_header_arity_matching_every_row() {
    let (client, mut conn) = admin_client();
    let sheet_id = insert_worksheet(&mut conn, WORKSHEET);
    client
        .post("/admin/worksheets/import")
        .header(ContentType::Form)
        .body(selection_body(&[sheet_id]))
        .dispatch();

    let selected = student_public_ids(&mut conn);
    let response = client
        .post("/admin/users/export")
        .header(ContentType::Form)
        .body(selection_body(&selected))
        .dispatch();

    assert_eq!(response.content_type(), Some(ContentType::CSV));
    assert_eq!(
        response.headers().get_one("Content-Disposition"),
        Some("attachment; filename=user.csv")
    );

    let body = response.into_string().unwrap();
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let header_len = reader.headers().unwrap().len();
    let records: Vec<csv::StringRecord> =
        reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.len(), header_len);
    }
}

#[test]
fn participation_export_uses_the_fixed_projection() {
    let (client, mut conn) = admin_client();
    let sheet_id = insert_worksheet(&mut conn, WORKSHEET);
    client
        .post("/admin/worksheets/import")
        .header(ContentType::Form)
        .body(selection_body(&[sheet_id]))
        .dispatch();

    diesel::insert_into(events::table)
        .values((
            events::public_id.eq(Uuid::new_v4().to_string()),
            events::title.eq("Robo Race"),
        ))
        .execute(&mut conn)
        .unwrap();
    diesel::insert_into(transactions::table)
        .values((
            transactions::public_id.eq(Uuid::new_v4().to_string()),
            transactions::transaction_id.eq("TXN-1"),
            transactions::upi_transaction_id.eq("UPI-1"),
        ))
        .execute(&mut conn)
        .unwrap();
    let event_id: i64 = events::table
        .select(events::id)
        .first(&mut conn)
        .unwrap();
    let txn_id: i64 = transactions::table
        .select(transactions::id)
        .first(&mut conn)
        .unwrap();

    let participation_public_id = Uuid::new_v4().to_string();
    diesel::insert_into(participations::table)
        .values((
            participations::public_id.eq(&participation_public_id),
            participations::part_id.eq("P-1"),
            participations::team_name.eq("Team Rocket"),
            participations::event_id.eq(event_id),
            participations::transaction_id.eq(txn_id),
            participations::is_verified.eq(true),
        ))
        .execute(&mut conn)
        .unwrap();
    let participation_id: i64 = participations::table
        .select(participations::id)
        .first(&mut conn)
        .unwrap();

    let member_ids: Vec<i64> = users::table
        .filter(users::is_superuser.eq(false))
        .order_by(users::roll_no.asc())
        .select(users::id)
        .load(&mut conn)
        .unwrap();
    for member_id in &member_ids {
        diesel::insert_into(participation_members::table)
            .values((
                participation_members::participation_id.eq(participation_id),
                participation_members::user_id.eq(member_id),
            ))
            .execute(&mut conn)
            .unwrap();
    }

    let response = client
        .post("/admin/participations/export")
        .header(ContentType::Form)
        .body(selection_body(&[participation_public_id]))
        .dispatch();

    assert_eq!(
        response.headers().get_one("Content-Disposition"),
        Some("attachment; filename=participation.csv")
    );

    let body = response.into_string().unwrap();
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec![
            "Team name",
            "part_id",
            "event",
            "transaction_id",
            "Verified",
            "Members_name"
        ]
    );
    let record = reader.records().next().unwrap().unwrap();
    assert_eq!(&record[0], "Team Rocket");
    assert_eq!(&record[2], "Robo Race");
    assert_eq!(&record[5], "A_101|B_102");
}

#[test]
fn approving_a_request_is_idempotent() {
    let (client, mut conn) = admin_client();

    let request_public_id = Uuid::new_v4().to_string();
    diesel::insert_into(user_requests::table)
        .values((
            user_requests::public_id.eq(&request_public_id),
            user_requests::name.eq("C"),
            user_requests::email.eq("c@x.com"),
            user_requests::phone_no.eq("777"),
            user_requests::department.eq("EXTC"),
            user_requests::semester.eq("7"),
        ))
        .execute(&mut conn)
        .unwrap();

    for _ in 0..2 {
        let response = client
            .post("/admin/requests/approve")
            .header(ContentType::Form)
            .body(selection_body(&[request_public_id.clone()]))
            .dispatch();
        let body = response.into_string().unwrap();
        assert!(body.contains("Approved 1 selected requests."));
    }

    let (count, approved): (i64, bool) = (
        user_requests::table
            .count()
            .get_result(&mut conn)
            .unwrap(),
        user_requests::table
            .select(user_requests::is_approved)
            .first(&mut conn)
            .unwrap(),
    );
    assert_eq!(count, 1);
    assert!(approved);
}

#[test]
fn user_list_search_narrows_the_listing() {
    let (client, mut conn) = admin_client();
    let sheet_id = insert_worksheet(&mut conn, WORKSHEET);
    client
        .post("/admin/worksheets/import")
        .header(ContentType::Form)
        .body(selection_body(&[sheet_id]))
        .dispatch();

    let body = client
        .get("/admin/users")
        .dispatch()
        .into_string()
        .unwrap();
    assert!(body.contains("a@x.com"));
    assert!(body.contains("b@x.com"));

    let body = client
        .get("/admin/users?q=101")
        .dispatch()
        .into_string()
        .unwrap();
    assert!(body.contains("a@x.com"));
    assert!(!body.contains("b@x.com"));
}

#[test]
fn failed_login_is_rendered_logged_out() {
    let (client, _conn) = get_test_rocket_instance();

    client
        .post("/admin/setup")
        .header(ContentType::Form)
        .body(
            serde_urlencoded::to_string(&SetupForm {
                name: "admin".to_string(),
                roll_no: "0".to_string(),
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
                password2: ADMIN_PASSWORD.to_string(),
            })
            .unwrap(),
        )
        .dispatch();

    let body = client
        .post("/login")
        .header(ContentType::Form)
        .body(
            serde_urlencoded::to_string(&PasswordLoginForm {
                email: ADMIN_EMAIL.to_string(),
                password: "wrong-password".to_string(),
            })
            .unwrap(),
        )
        .dispatch()
        .into_string()
        .unwrap();

    assert!(body.contains("Incorrect password."));
    // no logged-in chrome for the account that failed to authenticate
    assert!(!body.contains("Logout"));
    assert!(!body.contains(r#"href="/admin""#));
}

#[test]
fn admin_pages_are_refused_without_a_superuser() {
    let (client, mut conn) = get_test_rocket_instance();

    // no login cookie at all
    let response = client.get("/admin/users").dispatch();
    assert_ne!(response.status().code, 200);

    // a logged-in non-superuser gets the 403 page
    diesel::insert_into(users::table)
        .values((
            users::public_id.eq(Uuid::new_v4().to_string()),
            users::roll_no.eq("101"),
            users::name.eq("A"),
            users::email.eq("a@x.com"),
            users::department.eq("CS"),
            users::semester.eq("3"),
            users::phone_no.eq("999"),
            users::password_hash.eq(hash_password("password123")),
            users::is_superuser.eq(false),
        ))
        .execute(&mut conn)
        .unwrap();

    client
        .post("/login")
        .header(ContentType::Form)
        .body(
            serde_urlencoded::to_string(&PasswordLoginForm {
                email: "a@x.com".to_string(),
                password: "password123".to_string(),
            })
            .unwrap(),
        )
        .dispatch();

    let body = client
        .get("/admin/users")
        .dispatch()
        .into_string()
        .unwrap();
    assert!(body.contains("403"));
}
