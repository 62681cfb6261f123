//! Tests for notification delivery
//!
#![cfg(unix)]
#![allow(missing_docs)]

use std::{
    io::{BufRead, BufReader, Read, Write},
    net::TcpListener,
    thread::{self, JoinHandle},
};

use common::RecordingChannel;
use n8n_backup::{
    Config,
    notify::{
        EmailChannel, NotificationChannel, NotificationError, NotificationEvent, Notifier,
        WebhookChannel,
    },
};
use shared::test::init_test_logger;

mod common;

/// A request captured by [`serve_once`].
struct Request {
    head: String,
    body: String,
}

/// Accept a single HTTP request and answer it with `status`.
fn serve_once(status: &'static str) -> (String, JoinHandle<Request>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/hook", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut head = String::new();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            let lower = line.to_ascii_lowercase();
            if let Some(value) = lower.strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
            head.push_str(&line);
        }

        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).unwrap();

        write!(
            stream,
            "HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
        )
        .unwrap();
        stream.flush().unwrap();

        Request {
            head,
            body: String::from_utf8(body).unwrap(),
        }
    });

    (url, handle)
}

#[test]
fn every_channel_is_attempted() {
    init_test_logger();
    let first = RecordingChannel::failing();
    let second = RecordingChannel::default();
    let channels: Vec<Box<dyn NotificationChannel>> =
        vec![Box::new(first.clone()), Box::new(second.clone())];
    let notifier = Notifier::new(channels);

    notifier.notify(&NotificationEvent::failure("subject", "body"));

    assert_eq!(first.events().len(), 1);
    assert_eq!(second.events().len(), 1);
    assert!(second.events()[0].is_error());
}

#[test]
fn no_channels() {
    let notifier = Notifier::default();
    assert_eq!(notifier.channel_count(), 0);
    notifier.notify(&NotificationEvent::success("subject", "body"));
}

#[test]
fn channels_from_config() {
    let mut config = Config::default();
    assert_eq!(Notifier::from_config(&config).channel_count(), 0);

    config.notifications.webhook_url = "http://localhost:5678/webhook/backup".to_string();
    assert_eq!(Notifier::from_config(&config).channel_count(), 1);

    config.notifications.smtp.host = "smtp.example.com".to_string();
    assert_eq!(Notifier::from_config(&config).channel_count(), 1);

    config.notifications.smtp.to = "ops@example.com".to_string();
    assert_eq!(Notifier::from_config(&config).channel_count(), 2);

    config.notifications.webhook_url = "   ".to_string();
    assert_eq!(Notifier::from_config(&config).channel_count(), 1);
}

#[test]
fn webhook_posts_json() {
    init_test_logger();
    let (url, handle) = serve_once("200 OK");
    let channel = WebhookChannel::new(url);
    let event = NotificationEvent::success("n8n Backup Successful - 20240101-020000", "All good");

    channel.deliver(&event).unwrap();
    let request = handle.join().unwrap();

    assert!(request.head.starts_with("POST /hook "));
    assert!(
        request
            .head
            .to_ascii_lowercase()
            .contains("content-type: application/json")
    );

    let payload: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(payload["event"], "backup_success");
    assert_eq!(
        payload["subject"],
        "n8n Backup Successful - 20240101-020000"
    );
    assert_eq!(payload["body"], "All good");

    let timestamp = payload["timestamp"].as_str().unwrap();
    let parsed = chrono::DateTime::parse_from_rfc3339(timestamp).unwrap();
    assert_eq!(parsed.timestamp(), event.timestamp.timestamp());
}

#[test]
fn webhook_failure_event() {
    let (url, handle) = serve_once("200 OK");
    let channel = WebhookChannel::new(url);

    channel
        .deliver(&NotificationEvent::failure("n8n Backup FAILED", "boom"))
        .unwrap();
    let request = handle.join().unwrap();

    let payload: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(payload["event"], "backup_error");
}

#[test]
fn webhook_error_status() {
    let (url, handle) = serve_once("500 Internal Server Error");
    let channel = WebhookChannel::new(url);

    let result = channel.deliver(&NotificationEvent::success("subject", "body"));
    handle.join().unwrap();

    assert!(matches!(result, Err(NotificationError::Webhook(_))));
}

fn email_config() -> Config {
    let mut config = Config::default();
    config.notifications.smtp.host = "smtp.example.com".to_string();
    config.notifications.smtp.user = "backup@example.com".to_string();
    config.notifications.smtp.to = "ops@example.com, oncall@example.com".to_string();
    config
}

#[test]
fn email_needs_host_and_recipient() {
    let mut config = email_config();
    config.notifications.smtp.to = " , ".to_string();
    assert!(EmailChannel::from_config(&config).is_none());

    let mut config = email_config();
    config.notifications.smtp.host = String::new();
    assert!(EmailChannel::from_config(&config).is_none());

    assert!(EmailChannel::from_config(&email_config()).is_some());
}

#[test]
fn email_message() {
    let channel = EmailChannel::from_config(&email_config()).unwrap();
    let event = NotificationEvent::failure(
        "n8n Backup FAILED - 20240101-020000",
        "pg_dump failed",
    );

    let message = channel.message(&event).unwrap();

    let envelope = message.envelope();
    assert_eq!(envelope.from().unwrap().to_string(), "backup@example.com");
    let recipients: Vec<String> = envelope.to().iter().map(ToString::to_string).collect();
    assert_eq!(recipients, vec!["ops@example.com", "oncall@example.com"]);

    let formatted = String::from_utf8(message.formatted()).unwrap();
    assert!(formatted.contains("Subject: n8n Backup FAILED - 20240101-020000"));
    assert!(formatted.contains("pg_dump failed"));
}

#[test]
fn email_invalid_recipient() {
    let mut config = email_config();
    config.notifications.smtp.to = "not an address".to_string();
    let channel = EmailChannel::from_config(&config).unwrap();

    let result = channel.message(&NotificationEvent::success("subject", "body"));

    assert!(matches!(
        result,
        Err(NotificationError::Address(_, address)) if address == "not an address"
    ));
}
