//! All possible UI actions. Actions are the sole mechanism for state
//! mutation apart from text entry into the focused input.

use roster_core::{ListingEvent, MutationEvent};

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation ────────────────────────────────────────────────
    FocusNext,
    FocusPrev,

    // ── Operations ────────────────────────────────────────────────
    /// Submit whatever the focused pane maps to (refresh / create / upsert).
    Submit,
    CycleSort,

    // ── Overlays ──────────────────────────────────────────────────
    ToggleHelp,
    DismissNotice,

    // ── Controller settlements (from roster-core channels) ────────
    Listing(ListingEvent),
    Mutation(MutationEvent),
}
