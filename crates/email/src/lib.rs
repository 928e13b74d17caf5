//! Sends emails.
//!
//! Every dispatched message is recorded in the `emails` table. Debug builds
//! skip the SMTP hop entirely (so local development and tests never touch the
//! network) but still record what would have been sent.
use std::sync::Arc;

use db::DbConn;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("malformed mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not construct message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp dispatch failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Sends an email to each `(name, address)` pair in `to`.
///
/// Returns only once the message has been handed to the SMTP relay, so
/// callers can act on the outcome (e.g. flip a delivery flag).
#[cfg(debug_assertions)]
pub async fn send_mail(
    to: Vec<(&str, &str)>,
    subject: &str,
    html_contents: &str,
    _text_contents: &str,
    db: Arc<DbConn>,
) -> Result<(), EmailError> {
    use lettre::message::Mailbox;
    use uuid::Uuid;

    // mailbox validation matches the SMTP path: an unroutable address is
    // an error in both builds
    for (name, email) in &to {
        format!("{name} <{email}>").parse::<Mailbox>()?;
    }

    let msg_id = format!("{}@localhost", Uuid::now_v7());
    tracing::info!(%msg_id, subject, "debug build, skipping SMTP dispatch");
    record_dispatch(msg_id, recipient_list(&to), html_contents.to_string(), db)
        .await;
    Ok(())
}

#[cfg(not(debug_assertions))]
pub async fn send_mail(
    to: Vec<(&str, &str)>,
    subject: &str,
    html_contents: &str,
    text_contents: &str,
    db: Arc<DbConn>,
) -> Result<(), EmailError> {
    use lettre::{
        message::{header::ContentType, Mailbox, MultiPart, SinglePart},
        transport::smtp::authentication::Credentials,
        AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    };
    use uuid::Uuid;

    let mut msg = Message::builder();
    for (name, email) in &to {
        msg = msg.to(format!("{name} <{email}>").parse::<Mailbox>()?);
    }

    let msg_id = format!(
        "{}@{}",
        Uuid::now_v7(),
        std::env::var("SMTP_DOMAIN").unwrap()
    );

    let msg = msg
        .from(std::env::var("SMTP_FROM").unwrap().parse::<Mailbox>()?)
        .subject(subject)
        .message_id(Some(msg_id.clone()))
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .content_type(ContentType::TEXT_PLAIN)
                        .body(text_contents.to_string()),
                )
                .singlepart(
                    SinglePart::builder()
                        .content_type(ContentType::TEXT_HTML)
                        .body(html_contents.to_string()),
                ),
        )?;

    let creds = Credentials::new(
        std::env::var("SMTP_USERNAME").unwrap(),
        std::env::var("SMTP_PASSWORD").unwrap(),
    );
    let mailer: AsyncSmtpTransport<Tokio1Executor> =
        AsyncSmtpTransport::<Tokio1Executor>::relay(
            &std::env::var("SMTP_HOST").unwrap(),
        )?
        .credentials(creds)
        .build();

    mailer.send(msg).await?;

    record_dispatch(msg_id, recipient_list(&to), html_contents.to_string(), db)
        .await;

    Ok(())
}

fn recipient_list(to: &[(&str, &str)]) -> String {
    to.iter()
        .map(|(name, email)| format!("{name} <{email}>"))
        .collect::<Vec<_>>()
        .join(",")
}

async fn record_dispatch(
    msg_id: String,
    recipients: String,
    contents: String,
    db: Arc<DbConn>,
) {
    use db::schema::emails;
    use diesel::prelude::*;

    db.run(move |conn| {
        if let Err(error) = diesel::insert_into(emails::table)
            .values((
                emails::message_id.eq(&msg_id),
                emails::recipients.eq(&recipients),
                emails::contents.eq(&contents),
            ))
            .execute(conn)
        {
            tracing::warn!(%msg_id, %error, "failed to record dispatched email");
        }
    })
    .await
}
