use color_eyre::Result;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Clear, Paragraph, Wrap},
};

use crate::components::popups::{centered_rect_fixed, draw_popup_frame, inner_rect};
use crate::tui::Frame;

use super::{FocusTarget, FormAction, FormPopup};

/// Lines one field takes: label/value, help or error, spacer.
const LINES_PER_FIELD: u16 = 3;

/// Vertical thumb position for the scroll indicator.
///
/// `None` when everything fits (`total <= visible`) or the track is empty.
pub fn compute_scrollbar_thumb(
    total: usize,
    visible: usize,
    scroll: usize,
    track_height: u16,
) -> Option<usize> {
    if track_height == 0 || total == 0 || visible == 0 || total <= visible {
        return None;
    }

    let max_thumb_y = track_height.saturating_sub(1) as usize;
    let denom = total.saturating_sub(visible).max(1);
    let ratio = (scroll as f32) / (denom as f32);
    let thumb_y = (ratio * (max_thumb_y as f32)).round() as usize;
    Some(thumb_y.min(max_thumb_y))
}

/// How many fields fit next to the fixed header/footer lines.
fn fields_per_page(inner_height: u16, header_lines: usize) -> usize {
    let footer = 4u16;
    let avail = inner_height
        .saturating_sub(footer)
        .saturating_sub(header_lines as u16);
    (avail / LINES_PER_FIELD).max(1) as usize
}

pub(super) fn render_form_popup(popup: &mut FormPopup, f: &mut Frame<'_>, area: Rect) -> Result<()> {
    if area.width < 5 || area.height < 5 {
        return Ok(());
    }

    let (w, h) = {
        let schema = popup.form().schema();
        (schema.min_width, schema.min_height)
    };
    let dialog = centered_rect_fixed(area, w, h);
    let _ = draw_popup_frame(f, dialog, &popup.form().schema().title);
    let inner = inner_rect(dialog);
    f.render_widget(Clear, inner);

    let mut lines: Vec<Line> = Vec::new();

    // Header: description, then errors that don't belong to a single field.
    if let Some(desc) = &popup.form().schema().description {
        for l in desc.lines() {
            lines.push(Line::from(Span::styled(
                l.to_string(),
                Style::default().fg(Color::Gray),
            )));
        }
        lines.push(Line::raw(""));
    }
    if !popup.form().form_errors().is_empty() {
        for e in popup.form().form_errors() {
            lines.push(Line::from(Span::styled(
                format!("• {e}"),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
        }
        lines.push(Line::raw(""));
    }

    let per_page = fields_per_page(inner.height, lines.len());
    popup.ensure_visible(per_page);
    let scroll = popup.scroll();
    let popup = &*popup;
    let form = popup.form();
    let focused_key = form.focused().and_then(FocusTarget::field);

    let total = form.visible_fields().count();
    for field in form.visible_fields().skip(scroll).take(per_page) {
        let focused = focused_key == Some(field.key.as_str());

        let mut spans = vec![Span::styled(
            format!("{}{}:", field.label, if field.required { "*" } else { "" }),
            Style::default().fg(Color::White).add_modifier(if focused {
                Modifier::BOLD
            } else {
                Modifier::empty()
            }),
        )];
        let value = if focused && popup.is_editing() {
            let raw = popup.input().value();
            if field.is_secret() {
                "•".repeat(raw.chars().count())
            } else {
                raw.to_string()
            }
        } else {
            popup.display_value(field)
        };
        let value_style = if focused {
            Style::default().fg(Color::Black).bg(Color::White)
        } else {
            Style::default().fg(Color::Cyan)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(value, value_style));
        if focused && popup.is_editing() {
            spans.push(Span::styled("▏", Style::default().fg(Color::White)));
        }
        lines.push(Line::from(spans));

        if let Some(err) = form.field_error(&field.key) {
            lines.push(Line::from(Span::styled(
                err.to_string(),
                Style::default().fg(Color::Red),
            )));
        } else if let Some(help) = &field.help {
            lines.push(Line::from(Span::styled(
                help.clone(),
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines.push(Line::raw(""));
    }

    // Buttons
    let mut buttons: Vec<Span> = Vec::new();
    for action in form.schema().actions() {
        let label = match action {
            FormAction::Submit => form.schema().submit_label.clone(),
            other => other.to_string(),
        };
        let selected = form.focused() == Some(&FocusTarget::Action(action));
        let style = if selected {
            Style::default().fg(Color::Black).bg(Color::White).bold()
        } else {
            Style::default().fg(Color::White).bg(Color::Black)
        };
        if !buttons.is_empty() {
            buttons.push(Span::raw("   "));
        }
        buttons.push(Span::styled(format!("[ {label} ]"), style));
    }
    lines.push(Line::from(buttons));

    lines.push(Line::raw(""));
    if let Some(label) = form.in_progress() {
        lines.push(Line::from(vec![
            Span::styled("… ", Style::default().fg(Color::Yellow)),
            Span::styled(label.to_string(), Style::default().fg(Color::Yellow)),
            Span::styled("   Esc: Abort", Style::default().fg(Color::DarkGray)),
        ]));
    } else {
        lines.push(
            Line::from(vec![
                Span::styled("Tab/↑↓", Style::default().fg(Color::White)),
                Span::raw(": Navigate   "),
                Span::styled("Enter", Style::default().fg(Color::White)),
                Span::raw(if popup.is_editing() {
                    ": Confirm edit   "
                } else {
                    ": Edit/Activate   "
                }),
                Span::styled("←/→", Style::default().fg(Color::White)),
                Span::raw(": Choose   "),
                Span::styled("Esc", Style::default().fg(Color::White)),
                Span::raw(": Cancel"),
            ])
            .fg(Color::DarkGray),
        );
    }

    f.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }), inner);

    // Scroll track along the right edge
    if inner.width >= 1 {
        let track = Rect {
            x: inner.x + inner.width.saturating_sub(1),
            y: inner.y,
            width: 1,
            height: inner.height,
        };
        if let Some(thumb) = compute_scrollbar_thumb(total, per_page, scroll, track.height) {
            let track_lines: Vec<Line> = (0..track.height)
                .map(|i| {
                    if i as usize == thumb {
                        Line::from(Span::styled("█", Style::default().fg(Color::Gray)))
                    } else {
                        Line::from(Span::styled("│", Style::default().fg(Color::DarkGray)))
                    }
                })
                .collect();
            f.render_widget(Paragraph::new(Text::from(track_lines)), track);
        }
    }

    Ok(())
}
