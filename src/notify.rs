use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use miette::{miette, Context, IntoDiagnostic, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::server::RequestInfo;

/// everything an alert about an unresolved path carries
#[derive(Clone, Copy, Debug)]
pub struct Alert<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub missing_path: &'a str,
    pub request: &'a RequestInfo,
}

/// side effect raised for requests that resolve to no page
#[async_trait]
pub trait NotFoundNotifier: Send + Sync {
    async fn notify(&self, alert: Alert<'_>) -> Result<()>;
}

/// Delivers alerts by piping a mail message into a sendmail
/// compatible binary.
pub struct SendmailNotifier {
    command: PathBuf,
}

impl SendmailNotifier {
    pub fn new(command: PathBuf) -> Self {
        Self { command }
    }

    fn format_message(alert: &Alert<'_>) -> String {
        format!(
            "From: {from}\r\n\
             To: {to}\r\n\
             Subject: 404 for {path}\r\n\
             \r\n\
             No page matched {path}.\r\n\
             Method: {method}\r\n\
             Remote address: {remote}\r\n",
            from = alert.from,
            to = alert.to,
            path = alert.missing_path,
            method = alert.request.method,
            remote = alert.request.remote_addr.as_deref().unwrap_or("unknown"),
        )
    }
}

impl Default for SendmailNotifier {
    fn default() -> Self {
        Self::new(PathBuf::from("/usr/sbin/sendmail"))
    }
}

#[async_trait]
impl NotFoundNotifier for SendmailNotifier {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn notify(&self, alert: Alert<'_>) -> Result<()> {
        let message = Self::format_message(&alert);

        let mut child = Command::new(&self.command)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .into_diagnostic()
            .context("spawning the mail transport")?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| miette!("the mail transport has no stdin"))?;
        stdin.write_all(message.as_bytes()).await.into_diagnostic()?;
        drop(stdin);

        let status = child.wait().await.into_diagnostic()?;
        if !status.success() {
            return Err(miette!("the mail transport exited with {status}"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn request() -> RequestInfo {
        RequestInfo::from_lookup(|name| match name {
            "REQUEST_URI" => Some("/missing".to_owned()),
            "REQUEST_METHOD" => Some("GET".to_owned()),
            "REMOTE_ADDR" => Some("198.51.100.7".to_owned()),
            _ => None,
        })
    }

    #[test]
    fn test_message_carries_addresses_and_path() {
        let request = request();
        let alert = Alert {
            from: "server@example.com",
            to: "ops@example.com",
            missing_path: "/missing",
            request: &request,
        };

        let message = SendmailNotifier::format_message(&alert);

        assert!(message.starts_with("From: server@example.com\r\n"));
        assert!(message.contains("To: ops@example.com\r\n"));
        assert!(message.contains("Subject: 404 for /missing\r\n"));
        assert!(message.contains("Remote address: 198.51.100.7"));
        assert_eq!(message.matches("\r\n\r\n").count(), 1);
    }

    #[tokio::test]
    async fn test_notify_runs_the_transport() {
        let notifier = SendmailNotifier::new(PathBuf::from("/bin/cat"));
        let request = request();
        let alert = Alert {
            from: "server@example.com",
            to: "ops@example.com",
            missing_path: "/missing",
            request: &request,
        };

        notifier.notify(alert).await.unwrap();
    }

    #[tokio::test]
    async fn test_notify_surfaces_transport_failure() {
        let notifier = SendmailNotifier::new(PathBuf::from("/bin/false"));
        let request = request();
        let alert = Alert {
            from: "server@example.com",
            to: "ops@example.com",
            missing_path: "/missing",
            request: &request,
        };

        assert!(notifier.notify(alert).await.is_err());
    }
}
