//! Reply delivery and failure reporting.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use teloxide::utils::html;
use tracing::{debug, error, info, warn};

use crate::error::HandlerError;
use crate::incoming::IncomingMessage;
use crate::messenger::{DeliveryError, DeliveryErrorKind, Messenger, OutgoingMessage};

/// Reply when Telegram itself could not be reached.
pub const CONTACT_FAILED: &str = "*Error contacting Telegram.*";

/// Reply from the process-wide fallback.
pub const FALLBACK_ERROR: &str = "An error occurred";

/// Longest error text quoted back in a failure reply.
pub const MAX_DETAIL_CHARS: usize = 1024;

/// Counts from a fan-out of replies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub sent: usize,
    pub failed: usize,
}

/// Send every message concurrently and wait for all of them.
///
/// Order between the messages is not preserved. A failed send is logged and
/// does not stop the others.
pub async fn deliver_all(
    messenger: &dyn Messenger,
    chat_id: i64,
    messages: Vec<OutgoingMessage>,
) -> DeliverySummary {
    let results = join_all(
        messages
            .into_iter()
            .map(|message| messenger.send(chat_id, message)),
    )
    .await;

    let mut summary = DeliverySummary::default();
    for result in results {
        match result {
            Ok(_) => summary.sent += 1,
            Err(e) => {
                summary.failed += 1;
                log_delivery_failure(chat_id, &e);
            }
        }
    }
    summary
}

/// Delete a message after `delay` on a detached task. Failures are logged.
pub fn schedule_delete(
    messenger: Arc<dyn Messenger>,
    chat_id: i64,
    message_id: i32,
    delay: Duration,
) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match messenger.delete(chat_id, message_id).await {
            Ok(()) => debug!(chat_id, message_id, "Placeholder deleted"),
            Err(e) => {
                warn!(chat_id, message_id, error = %e, "Failed to delete placeholder")
            }
        }
    });
}

/// Report a handler failure to the user who triggered it.
///
/// Blocked-by-user failures are only logged. Transport failures get a fixed
/// notice, other delivery failures quote Telegram's message, and anything
/// that is not a delivery failure gets the generic template. Quoted error
/// text is HTML-escaped and cut to [`MAX_DETAIL_CHARS`].
pub async fn report_failure(messenger: &dyn Messenger, msg: &IncomingMessage, err: &HandlerError) {
    let reply = match err {
        HandlerError::Delivery(e) => match e.kind {
            DeliveryErrorKind::BlockedByUser => {
                info!(chat_id = msg.chat_id, "Bot was blocked by the user");
                return;
            }
            DeliveryErrorKind::Transport => {
                warn!(chat_id = msg.chat_id, error = %e, "Error sending message");
                OutgoingMessage::markdown(CONTACT_FAILED)
            }
            DeliveryErrorKind::Other => {
                warn!(chat_id = msg.chat_id, error = %e, "Error sending message");
                OutgoingMessage::html(format!(
                    "<b>An error occurred: {}</b>",
                    error_detail(&e.message)
                ))
            }
        },
        other => {
            error!(chat_id = msg.chat_id, error = %other, "An error occurred");
            OutgoingMessage::html(format!(
                "<b>An error occurred.</b>\n<i>Error: {}</i>",
                error_detail(&other.to_string())
            ))
        }
    };

    if let Err(e) = messenger.send(msg.chat_id, reply.reply_to(msg.message_id)).await {
        log_delivery_failure(msg.chat_id, &e);
    }
}

/// Escape error text for an HTML reply, keeping at most
/// [`MAX_DETAIL_CHARS`] characters.
fn error_detail(text: &str) -> String {
    let mut chars = text.chars();
    let mut detail: String = chars.by_ref().take(MAX_DETAIL_CHARS).collect();
    if chars.next().is_some() {
        detail.push('…');
    }
    html::escape(&detail)
}

/// Last-resort handling for errors a handler did not deal with itself.
pub async fn report_unhandled(
    messenger: &dyn Messenger,
    msg: &IncomingMessage,
    err: &HandlerError,
) {
    error!(
        update_id = msg.update_id,
        query = ?msg.text,
        error = %err,
        "Error while handling update"
    );

    match err.delivery_kind() {
        Some(DeliveryErrorKind::BlockedByUser) => {
            info!(chat_id = msg.chat_id, "Bot was blocked by the user");
        }
        Some(DeliveryErrorKind::Transport) => {
            error!(chat_id = msg.chat_id, "Could not contact Telegram");
        }
        _ => {
            if let Err(e) = messenger
                .send(msg.chat_id, OutgoingMessage::plain(FALLBACK_ERROR))
                .await
            {
                log_delivery_failure(msg.chat_id, &e);
            }
        }
    }
}

fn log_delivery_failure(chat_id: i64, e: &DeliveryError) {
    match e.kind {
        DeliveryErrorKind::BlockedByUser => info!(chat_id, "Bot was blocked by the user"),
        _ => warn!(chat_id, error = %e, "Failed to send message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::MessageFormat;
    use crate::testing::{incoming, RecordingMessenger};
    use tailbot_tailnet::TailnetError;

    fn delivery(kind: DeliveryErrorKind, message: &str) -> HandlerError {
        HandlerError::Delivery(DeliveryError::new(kind, message))
    }

    #[tokio::test]
    async fn test_deliver_all_continues_after_failure() {
        let messenger = RecordingMessenger::new()
            .fail_when("two", DeliveryErrorKind::Other);
        let messages = ["one", "two", "three"]
            .into_iter()
            .map(OutgoingMessage::html)
            .collect();

        let summary = deliver_all(&messenger, 42, messages).await;

        assert_eq!(summary, DeliverySummary { sent: 2, failed: 1 });
        let mut texts = messenger.sent_texts();
        texts.sort();
        assert_eq!(texts, vec!["one", "three"]);
        assert_eq!(messenger.attempts(), 3);
    }

    #[tokio::test]
    async fn test_deliver_all_empty() {
        let messenger = RecordingMessenger::new();
        let summary = deliver_all(&messenger, 42, Vec::new()).await;
        assert_eq!(summary, DeliverySummary::default());
        assert_eq!(messenger.attempts(), 0);
    }

    #[tokio::test]
    async fn test_report_blocked_sends_nothing() {
        let messenger = RecordingMessenger::new();
        let err = delivery(DeliveryErrorKind::BlockedByUser, "Forbidden: bot was blocked by the user");

        report_failure(&messenger, &incoming("/list"), &err).await;

        assert_eq!(messenger.attempts(), 0);
    }

    #[tokio::test]
    async fn test_report_transport_failure() {
        let messenger = RecordingMessenger::new();
        let err = delivery(DeliveryErrorKind::Transport, "connection reset");

        report_failure(&messenger, &incoming("/list"), &err).await;

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.text, CONTACT_FAILED);
        assert_eq!(sent[0].1.format, MessageFormat::Markdown);
        assert_eq!(sent[0].1.reply_to, Some(incoming("/list").message_id));
    }

    #[tokio::test]
    async fn test_report_other_delivery_failure() {
        let messenger = RecordingMessenger::new();
        let err = delivery(DeliveryErrorKind::Other, "Bad Request: message is too long");

        report_failure(&messenger, &incoming("/list"), &err).await;

        let sent = messenger.sent();
        assert_eq!(sent[0].1.text, "<b>An error occurred: Bad Request: message is too long</b>");
        assert_eq!(sent[0].1.format, MessageFormat::Html);
    }

    #[tokio::test]
    async fn test_report_unknown_error() {
        let messenger = RecordingMessenger::new();
        let err = HandlerError::Upstream(TailnetError::Network("dns failure".into()));

        report_failure(&messenger, &incoming("/list"), &err).await;

        assert_eq!(
            messenger.sent_texts(),
            vec!["<b>An error occurred.</b>\n<i>Error: network error: dns failure</i>"]
        );
    }

    #[tokio::test]
    async fn test_report_upstream_error_page() {
        let messenger = RecordingMessenger::new();
        let page = format!("<html><style>.cf_error_{{}}</style>*[`{}", "x".repeat(5000));
        let err = HandlerError::Upstream(TailnetError::Status {
            status: 502,
            message: page,
        });

        report_failure(&messenger, &incoming("/list"), &err).await;

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        let reply = &sent[0].1;
        assert_eq!(reply.format, MessageFormat::Html);
        assert!(reply.text.contains("&lt;html&gt;&lt;style&gt;.cf_error_{}&lt;/style&gt;*[`"));
        assert!(!reply.text.contains("<html>"));
        assert!(reply.text.ends_with("…</i>"));
        assert!(reply.text.chars().count() < 4096);
    }

    #[test]
    fn test_error_detail_keeps_short_text() {
        assert_eq!(error_detail("a_b <c>"), "a_b &lt;c&gt;");
        let exact = "y".repeat(MAX_DETAIL_CHARS);
        assert_eq!(error_detail(&exact), exact);
    }

    #[tokio::test]
    async fn test_report_failure_when_reply_also_fails() {
        // The failure notice itself cannot be delivered; it is tried once.
        let messenger = RecordingMessenger::new().fail_when("", DeliveryErrorKind::Transport);
        let err = delivery(DeliveryErrorKind::Transport, "connection reset");

        report_failure(&messenger, &incoming("/list"), &err).await;

        assert_eq!(messenger.attempts(), 1);
        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unhandled_replies_generic_message() {
        let messenger = RecordingMessenger::new();

        report_unhandled(&messenger, &incoming("/cmd"), &delivery(DeliveryErrorKind::Other, "Bad Request")).await;
        report_unhandled(&messenger, &incoming("/cmd"), &HandlerError::TimedOut).await;

        assert_eq!(messenger.sent_texts(), vec![FALLBACK_ERROR, FALLBACK_ERROR]);
    }

    #[tokio::test]
    async fn test_unhandled_blocked_and_transport_are_logged_only() {
        let messenger = RecordingMessenger::new();

        report_unhandled(&messenger, &incoming("/cmd"), &delivery(DeliveryErrorKind::BlockedByUser, "blocked")).await;
        report_unhandled(&messenger, &incoming("/cmd"), &delivery(DeliveryErrorKind::Transport, "offline")).await;

        assert_eq!(messenger.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_delete_after_delay() {
        let messenger = Arc::new(RecordingMessenger::new());
        schedule_delete(messenger.clone(), 42, 99, Duration::from_millis(3000));

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(messenger.deleted().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(messenger.deleted(), vec![(42, 99)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_delete_failure_is_swallowed() {
        let messenger = Arc::new(RecordingMessenger::new().fail_deletes());
        schedule_delete(messenger.clone(), 42, 99, Duration::from_millis(3000));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(messenger.deleted().is_empty());
        assert_eq!(messenger.delete_attempts(), 1);
    }
}
