// service/notification_service.rs
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use tokio::{sync::mpsc, time::sleep};
use uuid::Uuid;

use crate::{
    models::{jobmodel::Job, ratingmodel::Rating},
    service::error::ServiceError,
};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 1000;
const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    JobClaimed,
    RatingRequested,
}

/// One message for one user. The gateway decides how it reaches them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notice {
    pub recipient_id: Uuid,
    pub kind: NoticeKind,
    pub job_id: Uuid,
    pub message: String,
    pub link: Option<String>,
}

#[async_trait]
pub trait NotificationGateway: Send + Sync + std::fmt::Debug {
    async fn deliver(&self, notice: &Notice) -> Result<(), ServiceError>;
}

/// Posts each notice as JSON to a webhook that owns the actual e-mail or
/// push delivery.
#[derive(Debug, Clone)]
pub struct WebhookGateway {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl NotificationGateway for WebhookGateway {
    async fn deliver(&self, notice: &Notice) -> Result<(), ServiceError> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(notice)
            .send()
            .await
            .map_err(|e| ServiceError::Notification(format!("Network error: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "No response body".to_string());
            Err(ServiceError::Notification(format!(
                "Webhook returned {}: {}",
                status, body
            )))
        }
    }
}

/// Used when no webhook is configured.
#[derive(Debug, Clone, Default)]
pub struct LogGateway;

#[async_trait]
impl NotificationGateway for LogGateway {
    async fn deliver(&self, notice: &Notice) -> Result<(), ServiceError> {
        tracing::info!(
            "Notice for {} ({:?}, job {}): {}",
            notice.recipient_id,
            notice.kind,
            notice.job_id,
            notice.message
        );
        Ok(())
    }
}

/// Queues notices and delivers them from a background worker, so callers
/// never wait on the gateway.
#[derive(Debug, Clone)]
pub struct NotificationService {
    sender: mpsc::Sender<Notice>,
}

impl NotificationService {
    pub fn new(gateway: Arc<dyn NotificationGateway>, timeout: Duration) -> Self {
        Self::with_retry_delay(gateway, timeout, Duration::from_millis(RETRY_DELAY_MS))
    }

    pub fn with_retry_delay(
        gateway: Arc<dyn NotificationGateway>,
        timeout: Duration,
        retry_delay: Duration,
    ) -> Self {
        let (sender, mut receiver) = mpsc::channel::<Notice>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(notice) = receiver.recv().await {
                let _ = deliver_with_retries(gateway.as_ref(), &notice, timeout, retry_delay).await;
            }
            tracing::debug!("Notification queue closed");
        });

        Self { sender }
    }

    /// Never blocks; a full or closed queue drops the notice with a warning.
    pub fn enqueue(&self, notice: Notice) {
        if let Err(e) = self.sender.try_send(notice) {
            let notice = match e {
                mpsc::error::TrySendError::Full(n) | mpsc::error::TrySendError::Closed(n) => n,
            };
            tracing::warn!(
                "Dropping {:?} notice for {} on job {}: queue unavailable",
                notice.kind,
                notice.recipient_id,
                notice.job_id
            );
        }
    }

    pub fn notify_job_claimed(&self, job: &Job, worker_id: Uuid) {
        self.enqueue(Notice {
            recipient_id: job.employer_id,
            kind: NoticeKind::JobClaimed,
            job_id: job.id,
            message: format!("Your job \"{}\" was claimed by {}", job.title, worker_id),
            link: None,
        });
    }

    pub fn notify_rating_link(&self, job: &Job, rating: &Rating, link: String) {
        self.enqueue(Notice {
            recipient_id: rating.rater_id,
            kind: NoticeKind::RatingRequested,
            job_id: job.id,
            message: format!("How did \"{}\" go? Leave a rating.", job.title),
            link: Some(link),
        });
    }
}

async fn deliver_with_retries(
    gateway: &dyn NotificationGateway,
    notice: &Notice,
    timeout: Duration,
    retry_delay: Duration,
) -> Result<(), ServiceError> {
    let mut last_error = None;

    for attempt in 1..=MAX_RETRIES {
        let outcome = match tokio::time::timeout(timeout, gateway.deliver(notice)).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Notification(format!(
                "delivery timed out after {}ms",
                timeout.as_millis()
            ))),
        };

        match outcome {
            Ok(()) => {
                tracing::info!(
                    "Notice {:?} delivered to {} (attempt {})",
                    notice.kind,
                    notice.recipient_id,
                    attempt
                );
                return Ok(());
            }
            Err(e) => {
                last_error = Some(e);
                if attempt < MAX_RETRIES {
                    let delay = retry_delay * 2_u32.pow(attempt - 1);
                    tracing::warn!(
                        "Notice delivery attempt {} failed for {}. Retrying in {}ms...",
                        attempt,
                        notice.recipient_id,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    let error = last_error.unwrap_or_else(|| ServiceError::Notification("unknown failure".into()));
    tracing::error!(
        "Notice for {} failed after {} attempts: {}",
        notice.recipient_id,
        MAX_RETRIES,
        error
    );
    Err(error)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    };

    /// Records every notice and fails the first `failures` attempts.
    #[derive(Debug, Default)]
    pub struct RecordingGateway {
        pub delivered: Mutex<Vec<Notice>>,
        pub attempts: AtomicU32,
        failures: u32,
    }

    impl RecordingGateway {
        pub fn failing(failures: u32) -> Self {
            Self {
                failures,
                ..Self::default()
            }
        }

        pub fn delivered(&self) -> Vec<Notice> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationGateway for RecordingGateway {
        async fn deliver(&self, notice: &Notice) -> Result<(), ServiceError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                return Err(ServiceError::Notification("webhook down".into()));
            }
            self.delivered.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    fn notice() -> Notice {
        Notice {
            recipient_id: Uuid::new_v4(),
            kind: NoticeKind::RatingRequested,
            job_id: Uuid::new_v4(),
            message: "rate please".into(),
            link: Some("http://localhost/rate/1".into()),
        }
    }

    #[tokio::test]
    async fn test_retries_until_delivered() {
        let gateway = RecordingGateway::failing(2);
        let result = deliver_with_retries(
            &gateway,
            &notice(),
            Duration::from_secs(1),
            Duration::from_millis(1),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(gateway.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(gateway.delivered().len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let gateway = RecordingGateway::failing(10);
        let result = deliver_with_retries(
            &gateway,
            &notice(),
            Duration::from_secs(1),
            Duration::from_millis(1),
        )
        .await;

        assert!(matches!(result, Err(ServiceError::Notification(_))));
        assert_eq!(gateway.attempts.load(Ordering::SeqCst), MAX_RETRIES);
    }

    #[tokio::test]
    async fn test_queue_delivers_in_background() {
        let gateway = Arc::new(RecordingGateway::default());
        let service = NotificationService::with_retry_delay(
            gateway.clone(),
            Duration::from_secs(1),
            Duration::from_millis(1),
        );

        let sent = notice();
        service.enqueue(sent.clone());

        for _ in 0..100 {
            if !gateway.delivered().is_empty() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(gateway.delivered(), vec![sent]);
    }
}
