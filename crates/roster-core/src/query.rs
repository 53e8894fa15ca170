//! Query controller — owns the search text and the displayed listing.
//!
//! The search string updates synchronously on every keystroke; fetches are
//! debounced behind a quiescence window. Each issued fetch is tagged with a
//! monotonically increasing sequence number, and a settlement is applied
//! only if its sequence is still the latest issued — a slower, older
//! request resolving late can never overwrite a newer result.
//!
//! All state mutation happens in [`QueryController::handle`], driven by the
//! owning event loop. Spawned tasks only perform I/O and report back over
//! the event channel.

use std::sync::Arc;
use std::time::Duration;

use roster_api::User;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::directory::UserDirectory;
use crate::error::CoreError;

/// Idle duration that must elapse with no new query input before a
/// search fetch fires.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Name sort applied over the stable listing. Additive to the fetch
/// order; cycling never re-fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Unsorted,
    NameAsc,
    NameDesc,
}

impl SortOrder {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unsorted => "",
            Self::NameAsc => "▲",
            Self::NameDesc => "▼",
        }
    }
}

/// Settlements and timer firings delivered to [`QueryController::handle`].
#[derive(Debug)]
pub enum ListingEvent {
    /// The debounce window elapsed with no further input.
    Quiesced { query: String },
    /// A listing fetch settled.
    Finished {
        seq: u64,
        result: Result<Vec<User>, CoreError>,
    },
}

/// Owns the authoritative mapping from search string to displayed listing.
pub struct QueryController<D> {
    directory: Arc<D>,
    query: String,
    /// Listing in the order the server returned it.
    users: Vec<User>,
    /// Listing with the active sort applied; what consumers render.
    view: Vec<User>,
    loading: bool,
    error: Option<String>,
    /// Sequence number of the most recently issued fetch.
    issued: u64,
    sort: SortOrder,
    window: Duration,
    debounce: CancellationToken,
    events: mpsc::UnboundedSender<ListingEvent>,
}

impl<D: UserDirectory> QueryController<D> {
    /// Create a controller with the default quiescence window. Returns the
    /// receiving end of the event channel; the owner must pump received
    /// events back into [`handle`](Self::handle).
    pub fn new(directory: Arc<D>) -> (Self, mpsc::UnboundedReceiver<ListingEvent>) {
        Self::with_window(directory, DEBOUNCE_WINDOW)
    }

    /// Create a controller with a custom quiescence window.
    pub fn with_window(
        directory: Arc<D>,
        window: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ListingEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let controller = Self {
            directory,
            query: String::new(),
            users: Vec::new(),
            view: Vec::new(),
            loading: false,
            error: None,
            issued: 0,
            sort: SortOrder::default(),
            window,
            debounce: CancellationToken::new(),
            events,
        };
        (controller, rx)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn query(&self) -> &str {
        &self.query
    }

    /// The listing with the active sort applied.
    pub fn listing(&self) -> &[User] {
        &self.view
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Update the search string immediately and re-arm the quiescence
    /// timer. Only one timer is ever live: arming cancels any pending one,
    /// so only the final call in a burst survives to fire.
    pub fn set_query(&mut self, text: impl Into<String>) {
        self.query = text.into();

        self.debounce.cancel();
        self.debounce = CancellationToken::new();

        let token = self.debounce.clone();
        let events = self.events.clone();
        let query = self.query.clone();
        let window = self.window;
        tokio::spawn(async move {
            tokio::select! {
                // Cancellation wins even if the deadline has also passed.
                biased;

                () = token.cancelled() => {}
                () = tokio::time::sleep(window) => {
                    let _ = events.send(ListingEvent::Quiesced { query });
                }
            }
        });
    }

    /// Fetch the listing for the current search text immediately. Called
    /// once on mount, on explicit submit, and after every successful
    /// mutation. Disarms any pending debounce timer, which would only
    /// repeat this same fetch.
    pub fn refresh(&mut self) {
        self.debounce.cancel();
        self.fetch(self.query.clone());
    }

    /// Rotate Unsorted → NameAsc → NameDesc over the stable listing.
    pub fn cycle_sort(&mut self) {
        self.sort = match self.sort {
            SortOrder::Unsorted => SortOrder::NameAsc,
            SortOrder::NameAsc => SortOrder::NameDesc,
            SortOrder::NameDesc => SortOrder::Unsorted,
        };
        self.apply_sort();
    }

    /// Apply a timer firing or fetch settlement. The sole mutation entry
    /// point for listing state.
    pub fn handle(&mut self, event: ListingEvent) {
        match event {
            ListingEvent::Quiesced { query } => self.fetch(query),
            ListingEvent::Finished { seq, result } => {
                if seq != self.issued {
                    // A newer fetch was issued while this one was in
                    // flight; its settlement owns the loading flag.
                    debug!(seq, latest = self.issued, "discarding stale listing response");
                    return;
                }
                self.loading = false;
                match result {
                    Ok(users) => {
                        debug!(count = users.len(), "listing replaced");
                        self.users = users;
                        self.error = None;
                        self.apply_sort();
                    }
                    Err(e) => {
                        // Keep the previous listing on failure.
                        self.error = Some(e.to_string());
                    }
                }
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn fetch(&mut self, query: String) {
        self.issued += 1;
        let seq = self.issued;
        self.loading = true;
        self.error = None;
        debug!(seq, %query, "issuing listing fetch");

        let directory = Arc::clone(&self.directory);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = directory.list(query).await;
            let _ = events.send(ListingEvent::Finished { seq, result });
        });
    }

    fn apply_sort(&mut self) {
        self.view = self.users.clone();
        match self.sort {
            SortOrder::Unsorted => {}
            SortOrder::NameAsc => self.view.sort_by(|a, b| a.name.cmp(&b.name)),
            SortOrder::NameDesc => self.view.sort_by(|a, b| b.name.cmp(&a.name)),
        }
    }
}
