//! Email service for sending account confirmation messages.

use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::path::Path;

use crate::{config::Config, errors::Error};

pub struct EmailService {
    transport: EmailTransport,
    from_email: String,
    from_name: String,
    server_url: String,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

impl EmailService {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let email_config = &config.email;

        let transport = match &email_config.transport {
            crate::config::EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let smtp_builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                }
                .map_err(|e| Error::Internal {
                    operation: format!("create SMTP transport: {e}"),
                })?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                EmailTransport::Smtp(smtp_builder.build())
            }
            crate::config::EmailTransportConfig::File { path } => {
                // File transport for development/testing
                let emails_dir = Path::new(path);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| Error::Internal {
                        operation: format!("create emails directory: {e}"),
                    })?;
                }
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
        };

        Ok(Self {
            transport,
            from_email: email_config.from_email.clone(),
            from_name: email_config.from_name.clone(),
            server_url: config.server_url.clone(),
        })
    }

    /// Send the account confirmation email carrying the one-time link.
    pub async fn send_confirmation_email(&self, to_email: &str, to_name: &str, confirm_token: &str) -> Result<(), Error> {
        let confirm_link = format!(
            "{}/authentication/confirm/{}",
            self.server_url.trim_end_matches('/'),
            confirm_token
        );

        let subject = "Confirm your email address";
        let body = self.create_confirmation_body(to_name, &confirm_link);

        self.send_email(to_email, to_name, subject, &body).await
    }

    async fn send_email(&self, to_email: &str, to_name: &str, subject: &str, body: &str) -> Result<(), Error> {
        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse::<Mailbox>()
            .map_err(|e| Error::Internal {
                operation: format!("parse from email: {e}"),
            })?;

        let to = format!("{to_name} <{to_email}>").parse::<Mailbox>().map_err(|e| Error::Internal {
            operation: format!("parse to email: {e}"),
        })?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| Error::Internal {
                operation: format!("build email message: {e}"),
            })?;

        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send SMTP email: {e}"),
                })?;
            }
            EmailTransport::File(file) => {
                file.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send file email: {e}"),
                })?;
            }
        }

        Ok(())
    }

    fn create_confirmation_body(&self, to_name: &str, confirm_link: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Confirm your email address</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .footer {{ margin-top: 30px; font-size: 12px; color: #666; }}
    </style>
</head>
<body>
    <div class="container">
        <h2>Welcome, {to_name}!</h2>

        <p>Thanks for creating an account. To start using it, please confirm your email address by clicking the link below:</p>

        <p><a href="{confirm_link}">Confirm your email address</a></p>

        <p>Or copy and paste this link into your browser:</p>
        <p>{confirm_link}</p>

        <p>This link will expire in 24 hours.</p>

        <div class="footer">
            <p>If you did not create this account, you can safely ignore this email.</p>
            <p>This is an automated message, please do not reply to this email.</p>
        </div>
    </div>
</body>
</html>"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_config;

    #[tokio::test]
    async fn test_email_service_creation() {
        let config = create_test_config();
        let email_service = EmailService::new(&config);
        assert!(email_service.is_ok());
    }

    #[tokio::test]
    async fn test_file_transport_writes_email() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config();
        config.email.transport = crate::config::EmailTransportConfig::File {
            path: dir.path().to_string_lossy().into_owned(),
        };

        let email_service = EmailService::new(&config).unwrap();
        email_service
            .send_confirmation_email("alice@example.com", "alice", "tok123")
            .await
            .unwrap();

        let written = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn test_confirmation_email_body() {
        let config = create_test_config();
        let email_service = EmailService::new(&config).unwrap();

        let body = email_service.create_confirmation_body("alice", "http://localhost:8000/authentication/confirm/abc123");

        assert!(body.contains("Welcome, alice!"));
        assert!(body.contains("http://localhost:8000/authentication/confirm/abc123"));
        assert!(body.contains("Confirm your email address"));
    }
}
