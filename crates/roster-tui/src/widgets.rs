//! Small rendering helpers shared by the app's panes.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use tui_input::Input;

use crate::theme;

/// Render a bordered single-line text field, scrolled to keep the cursor
/// visible. Places the terminal cursor when the field has focus.
pub fn input_field(frame: &mut Frame, area: Rect, label: &str, input: &Input, focused: bool) {
    let border = if focused {
        theme::border_focused()
    } else {
        theme::border_default()
    };
    let block = Block::default()
        .title(format!(" {label} "))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = usize::from(inner.width.max(1));
    let scroll = input.visual_scroll(width.saturating_sub(1));
    #[allow(clippy::cast_possible_truncation)]
    let paragraph = Paragraph::new(input.value()).scroll((0, scroll as u16));
    frame.render_widget(paragraph, inner);

    if focused {
        #[allow(clippy::cast_possible_truncation)]
        let cursor_x = inner.x + (input.visual_cursor().saturating_sub(scroll)) as u16;
        frame.set_cursor_position((cursor_x.min(inner.right().saturating_sub(1)), inner.y));
    }
}

/// Centered overlay rectangle, clamped to the frame.
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width.saturating_sub(2));
    let h = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect::new(x, y, w, h)
}
