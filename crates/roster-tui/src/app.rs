//! The application: one screen wiring the query controller and mutation
//! coordinator to a search bar, a user table, and the create/upsert forms.
//!
//! The event loop multiplexes terminal input with the controllers' event
//! channels. Every settlement flows back through the owning controller's
//! `handle` before anything is rendered, so the UI never observes
//! half-applied state.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use roster_api::UsersClient;
use roster_core::{
    ListingEvent, MutationCoordinator, MutationEvent, NoticeLevel, QueryController,
};
use throbber_widgets_tui::{Throbber, ThrobberState};
use tokio::sync::mpsc;
use tracing::debug;
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use crate::action::Action;
use crate::event::{Event, EventReader};
use crate::theme;
use crate::tui::Tui;
use crate::widgets::{centered_rect, input_field};

const TICK_RATE: Duration = Duration::from_millis(250);
const RENDER_RATE: Duration = Duration::from_millis(33);

/// Which input field owns keystrokes. Tab order follows the visual layout
/// top-to-bottom, left-to-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Search,
    CreateName,
    CreateEmail,
    UpsertId,
    UpsertName,
    UpsertEmail,
}

impl Focus {
    const ORDER: [Self; 6] = [
        Self::Search,
        Self::CreateName,
        Self::CreateEmail,
        Self::UpsertId,
        Self::UpsertName,
        Self::UpsertEmail,
    ];

    pub fn next(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

pub struct App {
    query: QueryController<UsersClient>,
    mutation: MutationCoordinator<UsersClient>,
    listing_rx: mpsc::UnboundedReceiver<ListingEvent>,
    mutation_rx: mpsc::UnboundedReceiver<MutationEvent>,

    focus: Focus,
    search: Input,
    create_name: Input,
    create_email: Input,
    upsert_id: Input,
    upsert_name: Input,
    upsert_email: Input,

    throbber: ThrobberState,
    help_visible: bool,
    running: bool,
    server_label: String,
}

impl App {
    pub fn new(client: UsersClient, debounce: Duration, server_label: String) -> Self {
        let client = Arc::new(client);
        let (query, listing_rx) = QueryController::with_window(Arc::clone(&client), debounce);
        let (mutation, mutation_rx) = MutationCoordinator::new(client);
        let upsert_id = Input::new(mutation.upsert.id.clone());
        Self {
            query,
            mutation,
            listing_rx,
            mutation_rx,
            focus: Focus::Search,
            search: Input::default(),
            create_name: Input::default(),
            create_email: Input::default(),
            upsert_id,
            upsert_name: Input::default(),
            upsert_email: Input::default(),
            throbber: ThrobberState::default(),
            help_visible: false,
            running: true,
            server_label,
        }
    }

    /// Main loop. Fetches the unfiltered listing once up front, then pumps
    /// terminal events and controller settlements until quit.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;

        let mut events = EventReader::new(TICK_RATE, RENDER_RATE);

        // One unfiltered fetch on mount; everything after is event-driven.
        self.query.refresh();

        while self.running {
            let action = tokio::select! {
                Some(event) = events.next() => match event {
                    Event::Key(key) => self.map_key(key),
                    Event::Resize(w, h) => Some(Action::Resize(w, h)),
                    Event::Tick => Some(Action::Tick),
                    Event::Render => Some(Action::Render),
                },
                Some(event) = self.listing_rx.recv() => Some(Action::Listing(event)),
                Some(event) = self.mutation_rx.recv() => Some(Action::Mutation(event)),
            };

            if let Some(action) = action {
                let render = matches!(action, Action::Render);
                self.apply(action);
                if render {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        events.stop();
        tui.exit()?;
        Ok(())
    }

    // ── Input handling ───────────────────────────────────────────────

    /// Translate a key press into an action, or feed it to the focused
    /// input. Overlays swallow everything except their dismissal keys.
    fn map_key(&mut self, key: KeyEvent) -> Option<Action> {
        if self.mutation.notice().is_some() {
            return match key.code {
                KeyCode::Enter | KeyCode::Esc => Some(Action::DismissNotice),
                _ => None,
            };
        }
        if self.help_visible {
            return match key.code {
                KeyCode::Esc | KeyCode::F(1) => Some(Action::ToggleHelp),
                _ => None,
            };
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(Action::Quit),
            (_, KeyCode::Esc) => Some(Action::Quit),
            (_, KeyCode::F(1)) => Some(Action::ToggleHelp),
            (KeyModifiers::CONTROL, KeyCode::Char('s')) => Some(Action::CycleSort),
            (_, KeyCode::Tab) => Some(Action::FocusNext),
            (_, KeyCode::BackTab) => Some(Action::FocusPrev),
            (_, KeyCode::Enter) => Some(Action::Submit),
            _ => {
                self.feed_focused(key);
                None
            }
        }
    }

    /// Route a keystroke to the focused input and mirror its value into
    /// the owning controller. The search text debounces on every change.
    fn feed_focused(&mut self, key: KeyEvent) {
        let event = crossterm::event::Event::Key(key);
        let changed = match self.focus {
            Focus::Search => self.search.handle_event(&event),
            Focus::CreateName => self.create_name.handle_event(&event),
            Focus::CreateEmail => self.create_email.handle_event(&event),
            Focus::UpsertId => self.upsert_id.handle_event(&event),
            Focus::UpsertName => self.upsert_name.handle_event(&event),
            Focus::UpsertEmail => self.upsert_email.handle_event(&event),
        };
        if !changed.is_some_and(|c| c.value) {
            return;
        }
        match self.focus {
            Focus::Search => self.query.set_query(self.search.value()),
            Focus::CreateName => self.mutation.create.name = self.create_name.value().to_owned(),
            Focus::CreateEmail => {
                self.mutation.create.email = self.create_email.value().to_owned();
            }
            Focus::UpsertId => self.mutation.upsert.id = self.upsert_id.value().to_owned(),
            Focus::UpsertName => self.mutation.upsert.name = self.upsert_name.value().to_owned(),
            Focus::UpsertEmail => {
                self.mutation.upsert.email = self.upsert_email.value().to_owned();
            }
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::Tick => self.throbber.calc_next(),
            Action::Render => {}
            Action::Resize(w, h) => debug!(w, h, "terminal resized"),
            Action::FocusNext => self.focus = self.focus.next(),
            Action::FocusPrev => self.focus = self.focus.prev(),
            Action::CycleSort => self.query.cycle_sort(),
            Action::ToggleHelp => self.help_visible = !self.help_visible,
            Action::DismissNotice => self.mutation.dismiss_notice(),
            Action::Submit => self.submit_focused(),
            Action::Listing(event) => self.query.handle(event),
            Action::Mutation(event) => {
                let settled = self.mutation.handle(event);
                self.sync_form_inputs();
                if settled.refresh {
                    self.query.refresh();
                }
            }
        }
    }

    /// Enter in the search bar forces an immediate fetch; Enter in a form
    /// submits that form. Guard-rejected submits are silently ignored.
    fn submit_focused(&mut self) {
        match self.focus {
            Focus::Search => self.query.refresh(),
            Focus::CreateName | Focus::CreateEmail => {
                self.mutation.submit_create();
            }
            Focus::UpsertId | Focus::UpsertName | Focus::UpsertEmail => {
                self.mutation.submit_upsert();
            }
        }
    }

    /// Rebuild the form inputs from coordinator state after a settlement
    /// (success clears the originating fields; failure leaves them).
    fn sync_form_inputs(&mut self) {
        self.create_name = Input::new(self.mutation.create.name.clone());
        self.create_email = Input::new(self.mutation.create.email.clone());
        self.upsert_id = Input::new(self.mutation.upsert.id.clone());
        self.upsert_name = Input::new(self.mutation.upsert.name.clone());
        self.upsert_email = Input::new(self.mutation.upsert.email.clone());
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),  // search
                Constraint::Min(5),     // listing
                Constraint::Length(12), // forms
                Constraint::Length(1),  // status bar
            ])
            .split(frame.area());

        self.render_search(frame, chunks[0]);
        self.render_listing(frame, chunks[1]);
        self.render_forms(frame, chunks[2]);
        self.render_status_bar(frame, chunks[3]);

        if self.help_visible {
            self.render_help_overlay(frame);
        }
        if self.mutation.notice().is_some() {
            self.render_notice(frame);
        }
    }

    fn render_search(&self, frame: &mut Frame, area: Rect) {
        input_field(
            frame,
            area,
            "Search (name or email)",
            &self.search,
            self.focus == Focus::Search,
        );
    }

    fn render_listing(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(Line::styled(" Users ", theme::title_style()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(inner);

        // Status line: throbber while loading, otherwise error or count.
        if self.query.loading() {
            let throbber = Throbber::default()
                .label("fetching…")
                .style(Style::default().fg(theme::ACCENT));
            frame.render_stateful_widget(throbber, rows[0], &mut self.throbber);
        } else if let Some(error) = self.query.error() {
            frame.render_widget(
                Paragraph::new(format!("Error: {error}")).style(theme::error_text()),
                rows[0],
            );
        } else {
            frame.render_widget(
                Paragraph::new(format!("{} users", self.query.listing().len()))
                    .style(theme::key_hint()),
                rows[0],
            );
        }

        if self.query.listing().is_empty() && !self.query.loading() {
            frame.render_widget(
                Paragraph::new("No users found").style(theme::key_hint()),
                rows[1],
            );
            return;
        }

        let header = Row::new([
            Cell::from("ID"),
            Cell::from(format!("Name {}", self.query.sort().label())),
            Cell::from("Email"),
        ])
        .style(theme::table_header());

        let body = self.query.listing().iter().map(|user| {
            Row::new([
                Cell::from(user.id.to_string()),
                Cell::from(user.name.clone()),
                Cell::from(user.email.clone()),
            ])
            .style(theme::table_row())
        });

        let table = Table::new(
            body,
            [
                Constraint::Length(6),
                Constraint::Percentage(40),
                Constraint::Percentage(54),
            ],
        )
        .header(header)
        .column_spacing(2);
        frame.render_widget(table, rows[1]);
    }

    fn render_forms(&self, frame: &mut Frame, area: Rect) {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        self.render_create_form(frame, halves[0]);
        self.render_upsert_form(frame, halves[1]);
    }

    fn render_create_form(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(Line::styled(" Create user ", theme::title_style()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(inner);

        input_field(
            frame,
            rows[0],
            "Name",
            &self.create_name,
            self.focus == Focus::CreateName,
        );
        input_field(
            frame,
            rows[1],
            "Email",
            &self.create_email,
            self.focus == Focus::CreateEmail,
        );

        let hint = if self.mutation.create.in_flight() {
            Line::styled("creating…", Style::default().fg(theme::ACCENT))
        } else if self.mutation.create.submittable() {
            Line::styled("Enter to create", theme::key_hint())
        } else {
            Line::styled("name and email required", theme::key_hint())
        };
        frame.render_widget(Paragraph::new(hint), rows[2]);
    }

    fn render_upsert_form(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(Line::styled(" Upsert user ", theme::title_style()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(inner);

        input_field(
            frame,
            rows[0],
            "Id",
            &self.upsert_id,
            self.focus == Focus::UpsertId,
        );
        input_field(
            frame,
            rows[1],
            "Name",
            &self.upsert_name,
            self.focus == Focus::UpsertName,
        );
        input_field(
            frame,
            rows[2],
            "Email",
            &self.upsert_email,
            self.focus == Focus::UpsertEmail,
        );

        let hint = if self.mutation.upsert.in_flight() {
            Line::styled("upserting…", Style::default().fg(theme::ACCENT))
        } else if self.mutation.upsert.submittable() {
            Line::styled("Enter to upsert", theme::key_hint())
        } else {
            Line::styled("numeric id, name, and email required", theme::key_hint())
        };
        frame.render_widget(Paragraph::new(hint), rows[3]);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let hints = Line::from(vec![
            Span::styled(&self.server_label, theme::key_hint()),
            Span::raw("  "),
            Span::styled("Tab", theme::key_hint_key()),
            Span::styled(" field  ", theme::key_hint()),
            Span::styled("Enter", theme::key_hint_key()),
            Span::styled(" submit  ", theme::key_hint()),
            Span::styled("^S", theme::key_hint_key()),
            Span::styled(" sort  ", theme::key_hint()),
            Span::styled("F1", theme::key_hint_key()),
            Span::styled(" help  ", theme::key_hint()),
            Span::styled("Esc", theme::key_hint_key()),
            Span::styled(" quit", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), area);
    }

    fn render_help_overlay(&self, frame: &mut Frame) {
        let area = centered_rect(frame.area(), 48, 14);
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(Line::styled(" Help ", theme::title_style()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let entry = |key: &'static str, what: &'static str| {
            Line::from(vec![
                Span::styled(format!("{key:>9}  "), theme::key_hint_key()),
                Span::styled(what, theme::key_hint()),
            ])
        };
        let lines = vec![
            entry("Tab", "next field"),
            entry("Shift+Tab", "previous field"),
            entry("Enter", "submit focused form / refresh search"),
            entry("Ctrl+S", "cycle name sort"),
            entry("F1", "toggle this help"),
            entry("Esc", "quit (or close overlay)"),
            entry("Ctrl+C", "quit"),
            Line::raw(""),
            Line::styled(
                "Search fetches 500ms after you stop typing.",
                theme::key_hint(),
            ),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_notice(&self, frame: &mut Frame) {
        let Some(notice) = self.mutation.notice() else {
            return;
        };
        let (title, color) = match notice.level {
            NoticeLevel::Success => (" Success ", theme::SUCCESS_GREEN),
            NoticeLevel::Error => (" Error ", theme::ERROR_RED),
        };
        let area = centered_rect(frame.area(), 56, 7);
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(Line::styled(title, Style::default().fg(color)))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(color));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let body = vec![
            Line::raw(notice.message.clone()),
            Line::raw(""),
            Line::styled("Enter to dismiss", theme::key_hint()),
        ];
        frame.render_widget(Paragraph::new(body).wrap(Wrap { trim: true }), inner);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use roster_api::TransportConfig;

    use super::*;

    fn app() -> App {
        let client = UsersClient::new("http://127.0.0.1:9", &TransportConfig::default()).unwrap();
        App::new(client, Duration::from_millis(500), "test".into())
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn focus_order_wraps_both_directions() {
        let mut focus = Focus::Search;
        for expected in [
            Focus::CreateName,
            Focus::CreateEmail,
            Focus::UpsertId,
            Focus::UpsertName,
            Focus::UpsertEmail,
            Focus::Search,
        ] {
            focus = focus.next();
            assert_eq!(focus, expected);
        }
        assert_eq!(Focus::Search.prev(), Focus::UpsertEmail);
    }

    #[tokio::test]
    async fn global_keys_map_to_actions() {
        let mut app = app();
        assert!(matches!(
            app.map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        ));
        assert!(matches!(app.map_key(press(KeyCode::Esc)), Some(Action::Quit)));
        assert!(matches!(
            app.map_key(press(KeyCode::Tab)),
            Some(Action::FocusNext)
        ));
        assert!(matches!(
            app.map_key(press(KeyCode::Enter)),
            Some(Action::Submit)
        ));
        assert!(matches!(
            app.map_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)),
            Some(Action::CycleSort)
        ));
    }

    #[tokio::test]
    async fn typing_into_search_updates_query_immediately() {
        let mut app = app();
        for c in ['a', 'd', 'a'] {
            app.map_key(press(KeyCode::Char(c)));
        }
        assert_eq!(app.query.query(), "ada");
        assert_eq!(app.search.value(), "ada");
    }

    #[tokio::test]
    async fn typing_into_forms_mirrors_coordinator_fields() {
        let mut app = app();
        app.focus = Focus::CreateName;
        for c in ['A', 'd', 'a'] {
            app.map_key(press(KeyCode::Char(c)));
        }
        assert_eq!(app.mutation.create.name, "Ada");

        app.focus = Focus::UpsertId;
        app.map_key(press(KeyCode::Char('2')));
        assert_eq!(app.mutation.upsert.id, "42");
    }

    #[tokio::test]
    async fn overlays_swallow_input_until_dismissed() {
        let mut app = app();
        app.help_visible = true;
        assert!(app.map_key(press(KeyCode::Char('x'))).is_none());
        assert!(matches!(
            app.map_key(press(KeyCode::Esc)),
            Some(Action::ToggleHelp)
        ));
        app.apply(Action::ToggleHelp);
        assert!(!app.help_visible);
    }
}
