use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::models::{Activity, CreateEmailTask, CreateNotification, EmailTask, GameMaster};
use crate::db::{EmailQueueRepository, NotificationRepository};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::AppState;

/// Types of notifications sent to GMs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GmNotificationType {
    Assignment,
    Modified,
    Cancelled,
    Unassigned,
}

impl GmNotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GmNotificationType::Assignment => "assignment",
            GmNotificationType::Modified => "modified",
            GmNotificationType::Cancelled => "cancelled",
            GmNotificationType::Unassigned => "unassigned",
        }
    }

    fn title_key(&self) -> &'static str {
        match self {
            GmNotificationType::Assignment => "notifications.assignment.title",
            GmNotificationType::Modified => "notifications.modified.title",
            GmNotificationType::Cancelled => "notifications.cancelled.title",
            GmNotificationType::Unassigned => "notifications.unassigned.title",
        }
    }

    fn message_key(&self) -> &'static str {
        match self {
            GmNotificationType::Assignment => "notifications.assignment.message",
            GmNotificationType::Modified => "notifications.modified.message",
            GmNotificationType::Cancelled => "notifications.cancelled.message",
            GmNotificationType::Unassigned => "notifications.unassigned.message",
        }
    }
}

/// Dispatch request at the notification boundary. The core builds one of
/// these and hands it over; it never inspects the transport behind it.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationRequest {
    pub gm_id: String,
    pub gm_email: String,
    pub gm_name: String,
    pub notification_type: String,
    pub event_id: String,
    pub title: String,
    pub message: String,
    pub event_data: serde_json::Value,
}

impl NotificationRequest {
    /// Render a request for one GM and one activity, using the default
    /// language catalogs for title and message.
    pub fn for_activity(
        gm: &GameMaster,
        activity: &Activity,
        notification_type: GmNotificationType,
    ) -> Self {
        let date = activity.date.format("%d/%m/%Y").to_string();
        let start = activity.start_time.format("%H:%M").to_string();
        let end = activity.end_time.format("%H:%M").to_string();

        let params: &[(&str, &str)] = &[
            ("title", activity.title.as_str()),
            ("date", date.as_str()),
            ("start", start.as_str()),
            ("end", end.as_str()),
        ];

        let event_data = serde_json::json!({
            "activity_id": activity.id,
            "title": activity.title,
            "date": activity.date,
            "start_time": activity.start_time,
            "end_time": activity.end_time,
            "status": activity.status,
        });

        Self {
            gm_id: gm.id.clone(),
            gm_email: gm.email.clone(),
            gm_name: gm.name.clone(),
            notification_type: notification_type.as_str().to_string(),
            event_id: activity.id.clone(),
            title: i18n::t(notification_type.title_key()),
            message: i18n::t_with(notification_type.message_key(), params),
            event_data,
        }
    }
}

/// Result of a dispatch attempt, per the boundary contract.
#[derive(Debug)]
pub struct DispatchResult {
    pub success: bool,
    pub error: Option<String>,
}

/// Rendered email handed to the mail channel.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub event_data: Option<String>,
}

/// Transport seam: the dispatcher renders messages, the channel delivers
/// them (HTTP mail function today, anything else tomorrow).
#[async_trait]
pub trait MailChannel: Send + Sync + 'static {
    async fn send(&self, message: &EmailMessage) -> AppResult<()>;
}

/// Mail channel posting to the configured mail-dispatch function.
pub struct WebhookMailer {
    client: reqwest::Client,
    webhook_url: String,
    sender: String,
}

impl WebhookMailer {
    pub fn new(webhook_url: String, sender: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
            sender,
        }
    }
}

#[async_trait]
impl MailChannel for WebhookMailer {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        let payload = serde_json::json!({
            "from": self.sender,
            "to": message.recipient,
            "subject": message.subject,
            "body": message.body,
            "event_data": message.event_data,
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Mail(format!(
                "Mail function error ({}): {}",
                status, body
            )));
        }

        Ok(())
    }
}

/// Heuristics to decide whether a delivery error is likely transient and
/// should be retried. Inspects common HTTP and network error strings.
fn is_retryable_error(err: Option<&str>) -> bool {
    let e = match err {
        Some(v) => v.to_lowercase(),
        None => return false,
    };

    if e.contains("too many requests")
        || e.contains("429")
        || e.contains("timeout")
        || e.contains("timed out")
        || e.contains("temporarily unavailable")
        || e.contains("service unavailable")
        || e.contains("bad gateway")
        || e.contains("connection reset")
        || e.contains("connection refused")
        || e.contains("failed to send")
    {
        return true;
    }

    // Parse numeric status codes in the shape "Mail function error (503): ..."
    if e.contains("mail function error (") {
        if let Some(open) = e.find('(') {
            if let Some(close_rel) = e[open + 1..].find(')') {
                let code_str = &e[open + 1..open + 1 + close_rel];
                if let Ok(code) = code_str.parse::<u16>() {
                    return code == 429 || code >= 500;
                }
            }
        }
    }

    // Default conservative behavior: do not retry
    false
}

/// Dispatcher for GM notifications: in-app row plus (when configured) an
/// email via the persistent retry queue.
///
/// Fire-and-forget from the engine's perspective: `dispatch` never returns an
/// error; failures are logged and reflected in the `DispatchResult` only.
pub struct NotificationService {
    pool: SqlitePool,
    state: Arc<AppState>,
}

impl NotificationService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            pool: state.db.clone(),
            state: state.clone(),
        }
    }

    pub async fn dispatch(&self, request: NotificationRequest) -> DispatchResult {
        let event_data_json = serde_json::to_string(&request.event_data).ok();

        // In-app notification first; it is the part "queued" means.
        let notification = match NotificationRepository::create(
            &self.pool,
            CreateNotification {
                gm_id: request.gm_id.clone(),
                notification_type: request.notification_type.clone(),
                title: request.title.clone(),
                message: request.message.clone(),
                event_data: event_data_json.clone(),
            },
        )
        .await
        {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(
                    "Failed to store notification for GM {}: {:?}",
                    request.gm_id,
                    e
                );
                return DispatchResult {
                    success: false,
                    error: Some(e.to_string()),
                };
            }
        };

        // Email channel is optional; without it the dispatch is in-app only.
        let mailer = self.state.mailer.read().await.clone();
        let Some(mailer) = mailer else {
            return DispatchResult {
                success: true,
                error: None,
            };
        };

        let message = EmailMessage {
            recipient: request.gm_email.clone(),
            subject: request.title.clone(),
            body: request.message.clone(),
            event_data: event_data_json.clone(),
        };

        match mailer.send(&message).await {
            Ok(_) => DispatchResult {
                success: true,
                error: None,
            },
            Err(e) => {
                let err_str = e.to_string();
                if is_retryable_error(Some(&err_str)) {
                    if let Err(qe) = self
                        .enqueue_retry(&notification.id, &request, &message)
                        .await
                    {
                        tracing::warn!(
                            "Failed to enqueue email retry for notification {}: {:?}",
                            notification.id,
                            qe
                        );
                    }
                } else {
                    tracing::warn!(
                        "Email to {} failed permanently: {}",
                        request.gm_email,
                        err_str
                    );
                }
                DispatchResult {
                    success: true,
                    error: Some(err_str),
                }
            }
        }
    }

    /// Enqueue a failed email for background retry processing.
    async fn enqueue_retry(
        &self,
        notification_id: &str,
        request: &NotificationRequest,
        message: &EmailMessage,
    ) -> AppResult<()> {
        let cfg = &self.state.config.email_retry;
        let now = Utc::now().naive_utc();
        let next_attempt_at = now + chrono::Duration::seconds(cfg.initial_backoff_seconds as i64);
        let expires_at = now + chrono::Duration::seconds(cfg.default_ttl_seconds as i64);

        let task = CreateEmailTask {
            notification_id: Some(notification_id.to_string()),
            gm_id: request.gm_id.clone(),
            recipient: message.recipient.clone(),
            subject: message.subject.clone(),
            body: message.body.clone(),
            event_data: message.event_data.clone(),
            max_attempts: Some(cfg.max_attempts as i64),
            next_attempt_at: Some(next_attempt_at),
            expires_at: Some(expires_at),
        };

        EmailQueueRepository::create(&self.pool, task).await?;
        tracing::info!(
            "Enqueued email retry: notification={}, recipient={}, next_attempt_at={}",
            notification_id,
            message.recipient,
            next_attempt_at
        );
        Ok(())
    }

    /// Process a single queued email task: attempt delivery, schedule
    /// retries with exponential backoff, move to DLQ when exhausted or
    /// expired.
    pub async fn process_queued_email(&self, task: EmailTask) -> AppResult<()> {
        let now = Utc::now().naive_utc();

        if let Some(exp) = task.expires_at {
            if exp <= now {
                tracing::info!(
                    "Email task {} expired (expires_at={} now={}), moving to DLQ",
                    task.id,
                    exp,
                    now
                );
                let _ = EmailQueueRepository::mark_dead(
                    &self.pool,
                    &task.id,
                    Some("expired".to_string()),
                )
                .await;
                return Ok(());
            }
        }

        let mailer = self.state.mailer.read().await.clone();
        let Some(mailer) = mailer else {
            // Channel not configured -> transient; schedule retry.
            let cfg = &self.state.config.email_retry;
            let next = now + chrono::Duration::seconds(cfg.initial_backoff_seconds as i64);
            let _ = EmailQueueRepository::register_attempt_and_schedule(
                &self.pool,
                &task.id,
                next,
                Some("Mail channel not configured".to_string()),
            )
            .await;
            return Ok(());
        };

        let message = EmailMessage {
            recipient: task.recipient.clone(),
            subject: task.subject.clone(),
            body: task.body.clone(),
            event_data: task.event_data.clone(),
        };

        match mailer.send(&message).await {
            Ok(_) => {
                let _ = EmailQueueRepository::mark_succeeded(&self.pool, &task.id).await;
                tracing::info!("Queued email {} sent successfully", task.id);
                Ok(())
            }
            Err(e) => {
                let err_str = e.to_string();

                // Permanent errors -> move to DLQ
                if !is_retryable_error(Some(&err_str)) {
                    let _ =
                        EmailQueueRepository::mark_dead(&self.pool, &task.id, Some(err_str.clone()))
                            .await;
                    tracing::warn!("Queued email {} moved to DLQ: {}", task.id, err_str);
                    return Ok(());
                }

                // Transient error -> schedule retry with exponential backoff
                let cfg = &self.state.config.email_retry;
                let attempts = task.attempts as u32;

                // delay = min(max_backoff, initial_backoff * 2^attempts)
                let mut delay: u64 = cfg.initial_backoff_seconds;
                for _ in 0..attempts {
                    delay = delay.saturating_mul(2);
                    if delay >= cfg.max_backoff_seconds {
                        delay = cfg.max_backoff_seconds;
                        break;
                    }
                }

                let next = now + chrono::Duration::seconds(delay as i64);

                match EmailQueueRepository::register_attempt_and_schedule(
                    &self.pool,
                    &task.id,
                    next,
                    Some(err_str.clone()),
                )
                .await
                {
                    Ok(updated) => {
                        if updated.status == "dead" {
                            tracing::warn!(
                                "Queued email {} reached max attempts and moved to DLQ",
                                task.id
                            );
                        } else {
                            tracing::info!(
                                "Queued email {} rescheduled after error: {}",
                                task.id,
                                err_str
                            );
                        }
                        Ok(())
                    }
                    Err(e) => {
                        tracing::warn!("Failed to reschedule queued email {}: {:?}", task.id, e);
                        Ok(())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CreateGameMaster;
    use crate::db::GameMasterRepository;
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn retryable_error_heuristics() {
        assert!(is_retryable_error(Some("Request timed out")));
        assert!(is_retryable_error(Some("Mail function error (503): upstream down")));
        assert!(is_retryable_error(Some("429 Too Many Requests")));
        assert!(!is_retryable_error(Some("Mail function error (400): bad payload")));
        assert!(!is_retryable_error(Some("invalid recipient")));
        assert!(!is_retryable_error(None));
    }

    fn sample_activity(id: &str) -> Activity {
        let now = Utc::now().naive_utc();
        Activity {
            id: id.to_string(),
            title: "Session VR Horror".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            duration: 60,
            activity_type: "gaming".to_string(),
            status: "pending".to_string(),
            is_assigned: false,
            assigned_gm_id: None,
            game_id: None,
            admin_notes: None,
            description: None,
            source: "manual".to_string(),
            external_ref: None,
            assignment_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn request_renders_localized_message() {
        let now = Utc::now().naive_utc();
        let gm = GameMaster {
            id: "gm1".to_string(),
            name: "Alex".to_string(),
            email: "alex@center.test".to_string(),
            phone: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let req = NotificationRequest::for_activity(
            &gm,
            &sample_activity("ev1"),
            GmNotificationType::Assignment,
        );

        assert_eq!(req.notification_type, "assignment");
        assert_eq!(req.event_id, "ev1");
        assert!(req.message.contains("Session VR Horror"));
        assert!(req.message.contains("14:00"));
        assert_eq!(req.event_data["activity_id"], "ev1");
    }

    #[tokio::test]
    async fn dispatch_without_mailer_stores_in_app_row() {
        let state = crate::services::testing::state().await;
        let gm = GameMasterRepository::create(
            &state.db,
            CreateGameMaster {
                name: "Alex".into(),
                email: "alex@center.test".into(),
                phone: None,
            },
        )
        .await
        .unwrap();

        // The activity only feeds the snapshot; it does not need to exist.
        let service = NotificationService::new(&state);
        let result = service
            .dispatch(NotificationRequest::for_activity(
                &gm,
                &sample_activity("ev1"),
                GmNotificationType::Assignment,
            ))
            .await;

        assert!(result.success);
        let rows = NotificationRepository::find_by_gm(&state.db, &gm.id, 10, 0, false)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].notification_type, "assignment");
        assert!(!rows[0].is_read);
    }

    #[tokio::test]
    async fn expired_queue_task_moves_to_dlq() {
        let state = crate::services::testing::state().await;
        let now = Utc::now().naive_utc();

        let task = EmailQueueRepository::create(
            &state.db,
            CreateEmailTask {
                notification_id: None,
                gm_id: "gm1".into(),
                recipient: "gm@center.test".into(),
                subject: "s".into(),
                body: "b".into(),
                event_data: None,
                max_attempts: Some(5),
                next_attempt_at: Some(now),
                expires_at: Some(now - chrono::Duration::minutes(1)),
            },
        )
        .await
        .unwrap();

        let service = NotificationService::new(&state);
        service.process_queued_email(task.clone()).await.unwrap();

        let stored = EmailQueueRepository::find_by_id(&state.db, &task.id)
            .await
            .unwrap();
        assert_eq!(stored.status, "dead");
        assert_eq!(stored.last_error.as_deref(), Some("expired"));
    }
}
