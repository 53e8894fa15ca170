//! `roster-core` — client-side request/state synchronization.
//!
//! Two controllers, each the sole owner of its state:
//!
//! - [`QueryController`] owns the search text and the displayed listing:
//!   debounced search-as-you-type, sequence-tagged fetches, staleness
//!   discard.
//! - [`MutationCoordinator`] owns the create and upsert forms:
//!   double-submission guarding, result classification, refresh
//!   delegation after successful mutations.
//!
//! Both talk to the remote store through the [`UserDirectory`] seam and
//! report settlements over event channels; the embedding event loop pumps
//! those events back into `handle`, which is the only place state mutates.
//! There is no locking because there is no shared mutable state.

pub mod directory;
pub mod error;
pub mod mutation;
pub mod query;

pub use directory::UserDirectory;
pub use error::CoreError;
pub use mutation::{MutationCoordinator, MutationEvent, Notice, NoticeLevel, Settled};
pub use query::{DEBOUNCE_WINDOW, ListingEvent, QueryController, SortOrder};

// The wire record is the domain record; nothing to enrich client-side.
pub use roster_api::{UpsertOutcome, User};
