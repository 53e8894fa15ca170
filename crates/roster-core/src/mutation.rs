//! Mutation coordinator — owns the create and upsert forms.
//!
//! Each operation is serialized: a submit while the previous request is
//! still in flight is refused client-side, before any network call. On
//! success the originating fields are cleared and the owner is told to
//! refresh the listing; on failure the server's message is surfaced and
//! the fields are preserved for resubmission. There is no implicit retry.

use std::sync::Arc;

use roster_api::UpsertOutcome;
use tokio::sync::mpsc;
use tracing::debug;

use crate::directory::UserDirectory;
use crate::error::CoreError;

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A blocking notification for the user. The UI holds input until it is
/// dismissed, mirroring a modal alert.
#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Error,
        }
    }
}

/// Mutation settlements delivered to [`MutationCoordinator::handle`].
#[derive(Debug)]
pub enum MutationEvent {
    CreateFinished(Result<(), CoreError>),
    UpsertFinished(Result<UpsertOutcome, CoreError>),
}

/// What the owner should do after a settlement was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled {
    /// The mutation landed; re-fetch the listing for the current query.
    pub refresh: bool,
}

/// Create-form state: name, email, in-flight flag.
#[derive(Debug, Default)]
pub struct CreateForm {
    pub name: String,
    pub email: String,
    in_flight: bool,
}

impl CreateForm {
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether a submit would pass the client-side guard.
    pub fn submittable(&self) -> bool {
        !self.in_flight && !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// Upsert-form state: id (free text), name, email, in-flight flag.
#[derive(Debug)]
pub struct UpsertForm {
    pub id: String,
    pub name: String,
    pub email: String,
    in_flight: bool,
}

impl Default for UpsertForm {
    fn default() -> Self {
        Self {
            // The sandbox's historical default target id.
            id: "4".into(),
            name: String::new(),
            email: String::new(),
            in_flight: false,
        }
    }
}

impl UpsertForm {
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    fn parsed_id(&self) -> Option<i64> {
        self.id.trim().parse().ok()
    }

    pub fn submittable(&self) -> bool {
        !self.in_flight
            && self.parsed_id().is_some()
            && !self.name.trim().is_empty()
            && !self.email.trim().is_empty()
    }
}

/// Submits create and upsert operations with double-submission protection
/// and deterministic result classification.
pub struct MutationCoordinator<D> {
    directory: Arc<D>,
    pub create: CreateForm,
    pub upsert: UpsertForm,
    notice: Option<Notice>,
    events: mpsc::UnboundedSender<MutationEvent>,
}

impl<D: UserDirectory> MutationCoordinator<D> {
    /// Returns the receiving end of the event channel; the owner must pump
    /// received events back into [`handle`](Self::handle).
    pub fn new(directory: Arc<D>) -> (Self, mpsc::UnboundedReceiver<MutationEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            directory,
            create: CreateForm::default(),
            upsert: UpsertForm::default(),
            notice: None,
            events,
        };
        (coordinator, rx)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Submit the create form. Returns `false` on a client-side guard
    /// rejection (empty field or create already in flight) — no request
    /// is sent and nothing is surfaced as an error.
    pub fn submit_create(&mut self) -> bool {
        if !self.create.submittable() {
            return false;
        }
        self.create.in_flight = true;
        debug!(name = %self.create.name, "submitting create");

        let directory = Arc::clone(&self.directory);
        let events = self.events.clone();
        let name = self.create.name.clone();
        let email = self.create.email.clone();
        tokio::spawn(async move {
            let result = directory.create(name, email).await;
            let _ = events.send(MutationEvent::CreateFinished(result));
        });
        true
    }

    /// Submit the upsert form. Returns `false` on a guard rejection
    /// (empty field, unparsable id, or upsert already in flight).
    pub fn submit_upsert(&mut self) -> bool {
        if !self.upsert.submittable() {
            return false;
        }
        let Some(id) = self.upsert.parsed_id() else {
            return false;
        };
        self.upsert.in_flight = true;
        debug!(id, name = %self.upsert.name, "submitting upsert");

        let directory = Arc::clone(&self.directory);
        let events = self.events.clone();
        let name = self.upsert.name.clone();
        let email = self.upsert.email.clone();
        tokio::spawn(async move {
            let result = directory.upsert(id, name, email).await;
            let _ = events.send(MutationEvent::UpsertFinished(result));
        });
        true
    }

    /// Apply a settlement. The busy flag reaches a cleared state on every
    /// path; fields are cleared only on success.
    pub fn handle(&mut self, event: MutationEvent) -> Settled {
        match event {
            MutationEvent::CreateFinished(result) => {
                self.create.in_flight = false;
                match result {
                    Ok(()) => {
                        self.create.name.clear();
                        self.create.email.clear();
                        Settled { refresh: true }
                    }
                    Err(e) => {
                        self.notice = Some(Notice::error(e.to_string()));
                        Settled { refresh: false }
                    }
                }
            }
            MutationEvent::UpsertFinished(result) => {
                self.upsert.in_flight = false;
                match result {
                    Ok(outcome) => {
                        // The id is retained for convenience.
                        self.upsert.name.clear();
                        self.upsert.email.clear();
                        let branch = match outcome {
                            UpsertOutcome::Created => "created",
                            UpsertOutcome::Updated => "updated",
                        };
                        self.notice = Some(Notice::success(format!("Upsert result: {branch}")));
                        Settled { refresh: true }
                    }
                    Err(e) => {
                        self.notice = Some(Notice::error(e.to_string()));
                        Settled { refresh: false }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use roster_api::User;

    use super::*;

    /// Directory double recording mutation calls. `create` fails with the
    /// queued rejection when one is set; `upsert` reports the queued
    /// outcome.
    #[derive(Default)]
    struct FakeDirectory {
        creates: Mutex<Vec<(String, String)>>,
        upserts: Mutex<Vec<(i64, String, String)>>,
        reject_with: Mutex<Option<CoreError>>,
        outcome_created: AtomicUsize,
        /// When set, mutation calls never settle.
        stall: std::sync::atomic::AtomicBool,
    }

    impl FakeDirectory {
        fn reject(&self, err: CoreError) {
            *self.reject_with.lock().unwrap() = Some(err);
        }
    }

    impl UserDirectory for FakeDirectory {
        async fn list(&self, _query: String) -> Result<Vec<User>, CoreError> {
            Ok(Vec::new())
        }

        async fn create(&self, name: String, email: String) -> Result<(), CoreError> {
            self.creates.lock().unwrap().push((name, email));
            if self.stall.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            match self.reject_with.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        async fn upsert(
            &self,
            id: i64,
            name: String,
            email: String,
        ) -> Result<UpsertOutcome, CoreError> {
            self.upserts.lock().unwrap().push((id, name, email));
            if self.stall.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if let Some(err) = self.reject_with.lock().unwrap().take() {
                return Err(err);
            }
            if self.outcome_created.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(UpsertOutcome::Created)
            } else {
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    fn coordinator() -> (
        Arc<FakeDirectory>,
        MutationCoordinator<FakeDirectory>,
        mpsc::UnboundedReceiver<MutationEvent>,
    ) {
        let directory = Arc::new(FakeDirectory::default());
        let (coordinator, rx) = MutationCoordinator::new(Arc::clone(&directory));
        (directory, coordinator, rx)
    }

    #[tokio::test]
    async fn empty_fields_are_guard_rejected() {
        let (directory, mut mc, _rx) = coordinator();

        assert!(!mc.submit_create());
        mc.create.name = "Ada".into();
        assert!(!mc.submit_create());

        mc.upsert.name = "Ada".into();
        mc.upsert.email = "ada@x.com".into();
        mc.upsert.id = "not a number".into();
        assert!(!mc.submit_upsert());

        tokio::task::yield_now().await;
        assert!(directory.creates.lock().unwrap().is_empty());
        assert!(directory.upserts.lock().unwrap().is_empty());
        assert!(mc.notice().is_none(), "guard rejections are not errors");
    }

    #[tokio::test]
    async fn double_submit_performs_no_second_request() {
        let (directory, mut mc, _rx) = coordinator();
        directory.stall.store(true, Ordering::SeqCst);
        mc.create.name = "Ada".into();
        mc.create.email = "ada@x.com".into();

        assert!(mc.submit_create());
        assert!(mc.create.in_flight());
        tokio::task::yield_now().await;

        assert!(!mc.submit_create(), "second submit refused while in flight");
        tokio::task::yield_now().await;

        assert_eq!(directory.creates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_success_clears_fields_and_requests_refresh() {
        let (_directory, mut mc, mut rx) = coordinator();
        mc.create.name = "Ada".into();
        mc.create.email = "ada@x.com".into();

        assert!(mc.submit_create());
        let settled = mc.handle(rx.recv().await.unwrap());

        assert_eq!(settled, Settled { refresh: true });
        assert!(mc.create.name.is_empty());
        assert!(mc.create.email.is_empty());
        assert!(!mc.create.in_flight());
        assert!(mc.notice().is_none());
    }

    #[tokio::test]
    async fn create_failure_preserves_fields_and_surfaces_message() {
        let (directory, mut mc, mut rx) = coordinator();
        directory.reject(CoreError::Rejected {
            status: 409,
            message: "email already exists".into(),
        });
        mc.create.name = "Ada".into();
        mc.create.email = "ada@x.com".into();

        assert!(mc.submit_create());
        let settled = mc.handle(rx.recv().await.unwrap());

        assert_eq!(settled, Settled { refresh: false });
        assert_eq!(mc.create.name, "Ada");
        assert_eq!(mc.create.email, "ada@x.com");
        assert!(!mc.create.in_flight());

        let notice = mc.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "email already exists");
    }

    #[tokio::test]
    async fn upsert_reports_branch_and_retains_id() {
        let (_directory, mut mc, mut rx) = coordinator();
        mc.upsert.id = "4".into();
        mc.upsert.name = "Ada".into();
        mc.upsert.email = "ada@x.com".into();

        assert!(mc.submit_upsert());
        let settled = mc.handle(rx.recv().await.unwrap());

        assert_eq!(settled, Settled { refresh: true });
        assert_eq!(mc.upsert.id, "4", "id retained for convenience");
        assert!(mc.upsert.name.is_empty());
        assert!(mc.upsert.email.is_empty());

        let notice = mc.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.message, "Upsert result: created");

        // Same id again takes the update branch.
        mc.upsert.name = "Ada B".into();
        mc.upsert.email = "ada@y.com".into();
        assert!(mc.submit_upsert());
        mc.handle(rx.recv().await.unwrap());
        assert_eq!(mc.notice().unwrap().message, "Upsert result: updated");
    }

    #[tokio::test]
    async fn upsert_failure_preserves_fields() {
        let (directory, mut mc, mut rx) = coordinator();
        directory.reject(CoreError::Rejected {
            status: 409,
            message: "email already exists".into(),
        });
        mc.upsert.name = "Ada".into();
        mc.upsert.email = "taken@x.com".into();

        assert!(mc.submit_upsert());
        let settled = mc.handle(rx.recv().await.unwrap());

        assert_eq!(settled, Settled { refresh: false });
        assert_eq!(mc.upsert.name, "Ada");
        assert_eq!(mc.upsert.email, "taken@x.com");
        assert_eq!(mc.notice().unwrap().message, "email already exists");
    }

    #[tokio::test]
    async fn notice_is_dismissible() {
        let (directory, mut mc, mut rx) = coordinator();
        directory.reject(CoreError::Timeout);
        mc.create.name = "Ada".into();
        mc.create.email = "ada@x.com".into();

        mc.submit_create();
        mc.handle(rx.recv().await.unwrap());
        assert!(mc.notice().is_some());

        mc.dismiss_notice();
        assert!(mc.notice().is_none());
    }
}
