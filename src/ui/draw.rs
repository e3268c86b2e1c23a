use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use ratatui::{Frame, Terminal};
// Use Popup from tui-widgets to render simple modals
use tui_widgets::popup::Popup;

use crate::controller::Side;
use crate::formats::FormatRegistry;

use super::app::{App, HELP_SECTIONS};
use super::edit::{LineEditor, PairColumn};
use super::panes::PaneFocus;
use super::settings::SettingKey;

const BORDER: Color = Color::Rgb(0x5f, 0x87, 0x87);
const ACTIVE_BORDER: Color = Color::Rgb(0x87, 0xd7, 0xd7);
const ACCENT: Color = Color::Rgb(0xd7, 0xaf, 0x5f);
const SELECTION_FG: Color = Color::Black;
const SELECTION_BG: Color = Color::Rgb(0x87, 0xaf, 0xd7);
const PAIRED_FG: Color = Color::Rgb(0x87, 0xd7, 0x87);
const STATUS_FG: Color = Color::Black;
const STATUS_BG: Color = Color::Rgb(0x87, 0x87, 0x87);

const CONFIRM_HELP: &str = "Y/Enter: confirm  N/Esc: cancel";
const SAVE_CHANGES_HELP: &str = "Y: save  N: discard  Esc/C: cancel";
const MESSAGE_HELP: &str = "Enter/Esc: close";
const PATH_HELP: &str = "Enter: accept  Esc: cancel";
const FORM_HELP: &str = "Up/Down: field  Enter: save  Esc: cancel";
const PAIR_HELP: &str =
    "Up/Down: field  Tab: column  Ctrl+Right/Left: copy across  Enter: save  Esc: cancel";
const LANGUAGE_HELP: &str = "j/k: choose  Enter: apply  Esc: cancel";
const SETTINGS_HELP: &str = "j/k: move  Space/Enter: change  h/l: cycle  s: save  Esc: cancel";
const FILTER_HELP: &str = "Type wildcard filter (* ?)  Enter/Esc: back to list";
const HELP_MODAL_FOOTER: &str = "j/k: scroll  Esc/q: close";

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_body(frame, layout[1], app);
    draw_footer(frame, layout[2], app);

    draw_contact_modal(frame, size, app);
    draw_multi_modal(frame, size, app);
    draw_pair_modal(frame, size, app);
    draw_language_modal(frame, size, app);
    draw_settings_modal(frame, size, app);
    draw_help_modal(frame, size, app);
    draw_path_modal(frame, size, app);
    draw_confirm_modal(frame, size, app);
    draw_save_modal(frame, size, app);
    draw_message_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let title = app.controller.window_title();
    let language = app.controller.language().to_string();
    let width = area.width as usize;
    let pad = width.saturating_sub(title.chars().count() + language.chars().count() + 2);
    let line = Line::from(vec![
        Span::styled(format!(" {}", title), header_text_style()),
        Span::raw(" ".repeat(pad)),
        Span::styled(format!("{} ", language), Style::default().fg(BORDER)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_body(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if app.controller.two_panels() {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        draw_panel(frame, chunks[0], app, Side::Left);
        draw_panel(frame, chunks[1], app, Side::Right);
    } else {
        draw_panel(frame, area, app, Side::Left);
    }
}

fn draw_panel(frame: &mut Frame<'_>, area: Rect, app: &mut App, side: Side) {
    let active = app.controller.active() == side;
    let mut title = vec![Span::styled(
        format!(" {} ", app.controller.panel_header(side)),
        header_text_style(),
    )];
    if let Some(version) = app.controller.model(side).version() {
        title.push(Span::styled(
            format!("[vCard {}] ", version),
            Style::default().fg(BORDER),
        ));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(active))
        .title(Line::from(title));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height < 3 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    // Header row plus a separator line take two rows
    let visible = layout[0].height.saturating_sub(2) as usize;
    app.panes.get_mut(side).scroll_into_view(visible);
    draw_table(frame, layout[0], app, side, visible);
    draw_filter_line(frame, layout[1], app, side);
}

fn draw_table(frame: &mut Frame<'_>, area: Rect, app: &App, side: Side, visible: usize) {
    let panel = app.controller.panel(side);
    let model = &panel.model;
    let pane = app.panes.get(side);
    let date_format = app.controller.date_format();
    let active = app.controller.active() == side && app.panes.focus == PaneFocus::Table;
    let compare = model.view_mode().is_compare();

    let header = Row::new(
        model
            .visible_columns()
            .iter()
            .map(|c| Cell::from(c.header()))
            .collect::<Vec<_>>(),
    )
    .style(header_text_style())
    .bottom_margin(1);

    let rows: Vec<Row> = panel
        .proxy
        .rows()
        .iter()
        .enumerate()
        .skip(pane.offset)
        .take(visible)
        .map(|(view_row, &model_row)| {
            let selected = panel.selected_columns(model_row).unwrap_or(0..0);
            let cells = (0..model.column_count())
                .map(|col| {
                    let cell = Cell::from(model.cell(model_row, col, date_format));
                    if selected.contains(&col) {
                        cell.style(selection_style())
                    } else {
                        cell
                    }
                })
                .collect::<Vec<_>>();
            let mut style = Style::default();
            if compare && model.item(model_row).is_some_and(|i| i.pair_item()) {
                style = style.fg(PAIRED_FG);
            }
            if pane.marked.contains(&view_row) {
                style = style.fg(ACCENT).add_modifier(Modifier::BOLD);
            }
            if active && view_row == pane.cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Row::new(cells).style(style)
        })
        .collect();

    let count = model.column_count().max(1) as u32;
    let widths: Vec<Constraint> = (0..count).map(|_| Constraint::Ratio(1, count)).collect();

    if rows.is_empty() {
        let text = if model.source().is_empty() && model.is_empty() {
            "No list loaded (o: open)"
        } else {
            "No records"
        };
        frame.render_widget(Table::new(Vec::<Row>::new(), widths).header(header), area);
        let message_area = Rect {
            y: area.y.saturating_add(2),
            height: area.height.saturating_sub(2),
            ..area
        };
        frame.render_widget(
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .style(Style::default().fg(BORDER)),
            message_area,
        );
        return;
    }

    frame.render_widget(Table::new(rows, widths).header(header), area);
}

fn draw_filter_line(frame: &mut Frame<'_>, area: Rect, app: &App, side: Side) {
    let pane = app.panes.get(side);
    let editing = app.controller.active() == side && app.panes.focus == PaneFocus::Filter;
    let label = "Filter: ";
    let line = Line::from(vec![
        Span::styled(label, header_text_style()),
        Span::raw(pane.filter.value().to_string()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
    if editing {
        let x = area
            .x
            .saturating_add(label.len() as u16 + pane.filter.visual_cursor() as u16);
        frame.set_cursor_position((x, area.y));
    }
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let message = if app.panes.focus == PaneFocus::Filter {
        FILTER_HELP.to_string()
    } else {
        let mode = app.controller.mode_status();
        match &app.status {
            Some(status) => format!("{}  |  {}", mode, status),
            None => format!("{}  |  {}", mode, action_hints(app)),
        }
    };
    let style = Style::default().fg(STATUS_FG).bg(STATUS_BG);
    let background = Block::default().style(Style::default().bg(STATUS_BG));
    frame.render_widget(background, area);
    frame.render_widget(Paragraph::new(message).style(style), area);
}

/// Key hints for the commands currently allowed.
fn action_hints(app: &App) -> String {
    let access = app.controller.action_access();
    let mut hints = Vec::new();
    if access.edit {
        hints.push("e: edit");
    }
    if access.remove {
        hints.push("d: remove");
    }
    if access.copy {
        hints.push("c: copy");
    }
    if access.move_rows {
        hints.push("m: move");
    }
    if access.compare {
        hints.push("C: compare");
    }
    hints.push("F1: help");
    hints.join("  ")
}

// =============================================================================
// Simple modals (Popup)
// =============================================================================

fn popup_text(lines: Vec<Line<'static>>) -> Text<'static> {
    Text::from(lines)
}

fn draw_message_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.message_modal.as_ref() else {
        return;
    };
    let mut lines: Vec<Line> = modal
        .lines
        .iter()
        .flat_map(|l| l.lines())
        .map(|l| Line::from(l.to_string()))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(MESSAGE_HELP, header_text_style())));

    let title = Line::from(Span::styled(
        format!(" {} ", modal.title.to_uppercase()),
        header_text_style(),
    ));
    let popup = Popup::new(popup_text(lines))
        .title(title)
        .border_style(border_style(true));
    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn draw_confirm_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.confirm_modal.as_ref() else {
        return;
    };
    let mut lines: Vec<Line> = modal
        .message
        .lines()
        .map(|l| Line::from(l.to_string()))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(CONFIRM_HELP));

    let title_line = Line::from(Span::styled(modal.title.clone(), header_text_style()));
    let popup = Popup::new(popup_text(lines))
        .title(title_line)
        .border_style(border_style(true));
    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn draw_save_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.save_modal.as_ref() else {
        return;
    };
    let mut lines: Vec<Line> = modal
        .message
        .lines()
        .map(|l| Line::from(l.to_string()))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(SAVE_CHANGES_HELP));

    let title_line = Line::from(Span::styled("SAVE CHANGES", header_text_style()));
    let popup = Popup::new(popup_text(lines))
        .title(title_line)
        .border_style(border_style(true));
    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn draw_path_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.path_modal.as_ref() else {
        return;
    };
    let label = "PATH: ";
    // Pad so the popup is wide enough to type a path
    let min_width = (area.width.saturating_mul(2) / 3) as usize;
    let value = format!("{:<width$}", modal.input.value(), width = min_width.saturating_sub(label.len()));
    let lines = vec![
        Line::from(vec![
            Span::styled(label, header_text_style()),
            Span::raw(value),
        ]),
        Line::from(Span::styled(format_hint(), Style::default().fg(BORDER))),
        Line::from(""),
        Line::from(PATH_HELP),
    ];
    let cursor = modal.input.visual_cursor();
    let title_line = Line::from(Span::styled(modal.title(), header_text_style()));
    let popup = Popup::new(popup_text(lines))
        .title(title_line)
        .border_style(border_style(true));
    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);

    if let Some(popup_area) = app.modal_popup.area() {
        let inner = Block::default().borders(Borders::ALL).inner(*popup_area);
        let x = inner.x.saturating_add(label.len() as u16 + cursor as u16);
        frame.set_cursor_position((x, inner.y));
    }
}

/// Supported file types, e.g. `vCard (*.vcf *.vcard)  CSV (*.csv)`.
fn format_hint() -> String {
    FormatRegistry::supported_filters()
        .iter()
        .map(|(name, extensions)| {
            let patterns: Vec<String> = extensions.iter().map(|e| format!("*.{}", e)).collect();
            format!("{} ({})", name, patterns.join(" "))
        })
        .collect::<Vec<_>>()
        .join("  ")
}

// =============================================================================
// Form modals
// =============================================================================

fn centered(area: Rect, width_pct: u16, height: u16) -> Rect {
    let width = area
        .width
        .saturating_mul(width_pct)
        .saturating_div(100)
        .max(40)
        .min(area.width);
    let height = height.min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

/// Clear `area`, draw a titled frame with a help footer and return the inside.
fn modal_block(frame: &mut Frame<'_>, area: Rect, title: &str, footer: &str) -> Rect {
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(true))
        .title(Line::from(Span::styled(format!(" {} ", title), header_text_style())))
        .title_bottom(Line::from(Span::styled(format!(" {} ", footer), header_text_style())))
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    inner
}

fn form_line(label: &str, label_width: usize, value: &str, highlight: bool) -> Line<'static> {
    let label_style = if highlight {
        selection_style()
    } else {
        header_text_style()
    };
    Line::from(vec![
        Span::styled(format!("{:<width$} ", label, width = label_width), label_style),
        Span::raw(value.to_string()),
    ])
}

fn place_cursor(frame: &mut Frame<'_>, inner: Rect, row: usize, column: usize, editor: &LineEditor) {
    if row >= inner.height as usize {
        return;
    }
    let x = inner
        .x
        .saturating_add(column as u16)
        .saturating_add(editor.visual_cursor() as u16);
    frame.set_cursor_position((x.min(inner.right().saturating_sub(1)), inner.y + row as u16));
}

fn draw_contact_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.contact_modal.as_ref() else {
        return;
    };
    let rows: Vec<_> = modal.form.rows().collect();
    let label_width = rows.iter().map(|(f, _)| f.label().len()).max().unwrap_or(0);
    let modal_area = centered(area, 70, rows.len() as u16 + 2);
    let title = match modal.target {
        super::app::ContactTarget::Add => "ADD RECORD",
        super::app::ContactTarget::Edit { .. } => "EDIT RECORD",
    };
    let inner = modal_block(frame, modal_area, title, FORM_HELP);

    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .map(|(idx, (field, input))| {
            form_line(field.label(), label_width, input.value(), idx == modal.form.selected)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
    if let Some((_, input)) = rows.get(modal.form.selected) {
        place_cursor(frame, inner, modal.form.selected, label_width + 1, input);
    }
}

fn draw_multi_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.multi_modal.as_ref() else {
        return;
    };
    let rows: Vec<_> = modal.form.rows().collect();
    let label_width = rows.iter().map(|(f, _)| f.label().len()).max().unwrap_or(0);
    let modal_area = centered(area, 60, rows.len() as u16 + 4);
    let title = format!("EDIT {} RECORDS", modal.rows.len());
    let inner = modal_block(frame, modal_area, &title, FORM_HELP);

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "Empty fields differ between records; leave them untouched to keep them.",
            Style::default().fg(BORDER),
        )),
        Line::from(""),
    ];
    lines.extend(rows.iter().enumerate().map(|(idx, (field, input))| {
        form_line(field.label(), label_width, input.value(), idx == modal.form.selected)
    }));
    frame.render_widget(Paragraph::new(lines), inner);
    if let Some((_, input)) = rows.get(modal.form.selected) {
        place_cursor(frame, inner, modal.form.selected + 2, label_width + 1, input);
    }
}

fn draw_pair_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.pair_modal.as_ref() else {
        return;
    };
    let rows: Vec<_> = modal.form.rows().collect();
    let label_width = rows.iter().map(|(f, _, _)| f.label().len()).max().unwrap_or(0);
    let modal_area = centered(area, 90, rows.len() as u16 + 4);
    let inner = modal_block(frame, modal_area, "RECORDS", PAIR_HELP);

    let column_width = (inner.width as usize).saturating_sub(label_width + 3) / 2;
    let (first_header, second_header) = &modal.request.headers;
    let mut lines: Vec<Line> = vec![
        Line::from(vec![
            Span::raw(" ".repeat(label_width + 1)),
            Span::styled(
                format!("{:<width$}", first_header, width = column_width),
                header_text_style(),
            ),
            Span::styled(LINE.vertical, Style::default().fg(BORDER)),
            Span::styled(format!(" {}", second_header), header_text_style()),
        ]),
        Line::from(""),
    ];
    for (idx, (field, first, second)) in rows.iter().enumerate() {
        let selected = idx == modal.form.selected;
        let cell_style = |column: PairColumn| {
            if selected && modal.form.column == column {
                selection_style()
            } else if first.value() != second.value() {
                Style::default().fg(ACCENT)
            } else {
                Style::default()
            }
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<width$} ", field.label(), width = label_width),
                header_text_style(),
            ),
            Span::styled(
                format!("{:<width$}", truncate(first.value(), column_width), width = column_width),
                cell_style(PairColumn::First),
            ),
            Span::styled(LINE.vertical, Style::default().fg(BORDER)),
            Span::styled(
                format!(" {}", truncate(second.value(), column_width)),
                cell_style(PairColumn::Second),
            ),
        ]));
    }
    frame.render_widget(Paragraph::new(lines), inner);

    if let Some((_, first, second)) = rows.get(modal.form.selected) {
        let (column, editor) = match modal.form.column {
            PairColumn::First => (label_width + 1, *first),
            PairColumn::Second => (label_width + 1 + column_width + 2, *second),
        };
        place_cursor(frame, inner, modal.form.selected + 2, column, editor);
    }
}

fn draw_language_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.language_modal.as_ref() else {
        return;
    };
    let modal_area = centered(area, 40, (modal.names.len() as u16 + 2).min(20));
    let inner = modal_block(frame, modal_area, "LANGUAGE", LANGUAGE_HELP);
    let height = inner.height as usize;
    let offset = modal.selected.saturating_sub(height.saturating_sub(1));
    let current = app.controller.language();
    let lines: Vec<Line> = modal
        .names
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(idx, name)| {
            let marker = if name == current { "* " } else { "  " };
            let style = if idx == modal.selected {
                selection_style()
            } else {
                Style::default()
            };
            Line::from(Span::styled(format!("{}{}", marker, name), style))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_settings_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.settings_modal.as_ref() else {
        return;
    };
    let label_width = SettingKey::ALL.iter().map(|k| k.label().len()).max().unwrap_or(0);
    let modal_area = centered(area, 70, SettingKey::ALL.len() as u16 + 2);
    let inner = modal_block(frame, modal_area, "SETTINGS", SETTINGS_HELP);

    let lines: Vec<Line> = SettingKey::ALL
        .iter()
        .enumerate()
        .map(|(idx, key)| {
            let selected = idx == modal.selected;
            let value = match (&modal.editor, selected) {
                (Some(editor), true) => editor.value().to_string(),
                _ => modal.value(*key),
            };
            form_line(key.label(), label_width, &value, selected)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
    if let Some(editor) = modal.editor.as_ref() {
        place_cursor(frame, inner, modal.selected, label_width + 1, editor);
    }
}

fn draw_help_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.help_modal.as_mut() else {
        return;
    };
    let modal_area = centered(area, 60, area.height.saturating_mul(4) / 5);
    let content_width = modal_area.width.saturating_sub(4) as usize;
    let action_width = 30usize;

    let mut lines: Vec<Line> = Vec::new();
    for (section_idx, section) in HELP_SECTIONS.iter().enumerate() {
        let header_text = format!(" {} ", section.title);
        let padding_total = content_width.saturating_sub(header_text.len());
        let left_pad = padding_total / 2;
        lines.push(Line::from(Span::styled(
            format!(
                "{}{}{}",
                LINE.horizontal.repeat(left_pad),
                header_text,
                LINE.horizontal.repeat(padding_total - left_pad)
            ),
            header_text_style(),
        )));
        for (action, keys) in section.entries {
            lines.push(Line::from(vec![
                Span::raw(format!("{:<width$}", action, width = action_width)),
                Span::styled(*keys, header_text_style()),
            ]));
        }
        if section_idx + 1 < HELP_SECTIONS.len() {
            lines.push(Line::from(""));
        }
    }

    modal.total_lines = lines.len();
    modal.viewport_height = modal_area.height.saturating_sub(2) as usize;
    let max_scroll = modal.total_lines.saturating_sub(modal.viewport_height);
    modal.scroll = modal.scroll.min(max_scroll);

    let indicator = match (modal.can_scroll_up(), modal.can_scroll_down()) {
        (true, true) => "▲▼",
        (true, false) => "▲ ",
        (false, true) => " ▼",
        (false, false) => "  ",
    };
    let visible: Vec<Line> = lines
        .into_iter()
        .skip(modal.scroll)
        .take(modal.viewport_height)
        .collect();

    let inner = modal_block(
        frame,
        modal_area,
        &format!("HELP {}", indicator),
        HELP_MODAL_FOOTER,
    );
    frame.render_widget(Paragraph::new(visible), inner);
}

// =============================================================================
// Styles
// =============================================================================

fn selection_style() -> Style {
    Style::default().fg(SELECTION_FG).bg(SELECTION_BG)
}

fn border_style(active: bool) -> Style {
    Style::default().fg(if active { ACTIVE_BORDER } else { BORDER })
}

fn header_text_style() -> Style {
    Style::default().fg(ACCENT)
}

fn truncate(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max_len.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_values() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }

    #[test]
    fn format_hint_lists_every_extension() {
        assert_eq!(format_hint(), "vCard (*.vcf *.vcard)  CSV (*.csv)");
    }

    #[test]
    fn centered_rect_fits_area() {
        let area = Rect::new(0, 0, 100, 30);
        let rect = centered(area, 50, 10);
        assert_eq!(rect, Rect::new(25, 10, 50, 10));
        let small = centered(Rect::new(0, 0, 20, 5), 50, 10);
        assert_eq!(small, Rect::new(0, 0, 20, 5));
    }
}
