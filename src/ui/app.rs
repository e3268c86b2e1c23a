use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tui_widgets::popup::PopupState;

use crate::contact::ContactItem;
use crate::controller::{
    AppContext, CommandError, Controller, EditRequest, PairEditRequest, RemoveRequest, Side,
};
use crate::languages::FALLBACK_NATIVE_NAME;

use super::draw;
use super::edit::{ContactForm, LineEditor, MultiForm, PairColumn, PairForm};
use super::panes::{PaneFocus, Panes};
use super::settings::SettingsModal;

/// Error, warning or information text; any key closes it.
#[derive(Debug, Clone)]
pub struct MessageModal {
    pub title: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ConfirmModal {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

/// Action to perform when the confirm modal is accepted
#[derive(Debug, Clone)]
pub enum ConfirmAction {
    Remove(RemoveRequest),
    /// Open the multi-record editor
    MultiEdit {
        side: Side,
        rows: Vec<usize>,
        items: Vec<ContactItem>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterSave {
    Quit,
    Close,
}

/// Panels still to be asked about, and what happens once all are answered.
#[derive(Debug, Clone)]
pub struct SaveQueue {
    remaining: Vec<Side>,
    then: AfterSave,
}

#[derive(Debug, Clone)]
pub struct SaveChangesModal {
    pub side: Side,
    pub message: String,
    queue: SaveQueue,
}

#[derive(Debug, Clone)]
pub enum PathPurpose {
    Open,
    SaveAs(Option<SaveQueue>),
}

#[derive(Debug, Clone)]
pub struct PathModal {
    pub purpose: PathPurpose,
    pub input: LineEditor,
}

impl PathModal {
    pub fn title(&self) -> &'static str {
        match self.purpose {
            PathPurpose::Open => "OPEN CONTACT LIST",
            PathPurpose::SaveAs(_) => "SAVE CONTACT LIST AS",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ContactTarget {
    Add,
    Edit { side: Side, row: usize },
}

#[derive(Debug, Clone)]
pub struct ContactModal {
    pub target: ContactTarget,
    pub form: ContactForm,
}

#[derive(Debug, Clone)]
pub struct MultiModal {
    pub side: Side,
    pub rows: Vec<usize>,
    pub form: MultiForm,
}

#[derive(Debug, Clone)]
pub struct PairModal {
    pub request: PairEditRequest,
    pub form: PairForm,
}

#[derive(Debug, Clone)]
pub struct LanguageModal {
    pub names: Vec<String>,
    pub selected: usize,
}

/// Help modal state with scroll support
#[derive(Debug, Clone)]
pub struct HelpModal {
    pub scroll: usize,
    pub total_lines: usize,
    /// Set during rendering
    pub viewport_height: usize,
}

impl HelpModal {
    pub fn new(total_lines: usize) -> Self {
        Self {
            scroll: 0,
            total_lines,
            viewport_height: 10,
        }
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max_scroll = self.total_lines.saturating_sub(self.viewport_height);
        self.scroll = (self.scroll + lines).min(max_scroll);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn can_scroll_up(&self) -> bool {
        self.scroll > 0
    }

    pub fn can_scroll_down(&self) -> bool {
        self.scroll + self.viewport_height < self.total_lines
    }
}

/// A section in the help modal
pub struct HelpSection {
    pub title: &'static str,
    pub entries: &'static [(&'static str, &'static str)],
}

pub const HELP_SECTIONS: &[HelpSection] = &[
    HelpSection {
        title: "Panels",
        entries: &[
            ("Other panel", "Tab"),
            ("Move cursor", "Up/Down, j/k, PgUp/PgDn, Home/End"),
            ("Mark record", "Space, Insert"),
            ("Clear marks", "Esc"),
            ("Filter", "/"),
            ("Show two panels", "2"),
            ("Swap panels", "x"),
            ("Sort", "t"),
        ],
    },
    HelpSection {
        title: "Files",
        entries: &[
            ("Open", "o"),
            ("Save", "s"),
            ("Save as", "S"),
            ("Close list", "w"),
            ("Quit", "q, F10"),
        ],
    },
    HelpSection {
        title: "Records",
        entries: &[
            ("Add", "a"),
            ("Edit", "Enter, e"),
            ("Remove", "Delete, d"),
            ("Copy to other panel", "c, F5"),
            ("Move to other panel", "m, F6"),
            ("Join two records", "J"),
        ],
    },
    HelpSection {
        title: "Compare",
        entries: &[("Compare mode", "C"), ("Compare result", "r")],
    },
    HelpSection {
        title: "Fixes",
        entries: &[
            ("Swap names", "n"),
            ("Split names", "N"),
            ("Drop slashes", "\\"),
            ("Split numbers", "p"),
            ("Generate full names", "f"),
            ("Drop full names", "F"),
            ("International phone prefix", "i"),
        ],
    },
    HelpSection {
        title: "Program",
        entries: &[("Settings", ","), ("Language", "L"), ("Help", "F1, ?")],
    },
];

pub struct App<'a> {
    ctx: &'a mut AppContext,
    pub controller: Controller,
    pub panes: Panes,
    pub status: Option<String>,
    pub should_quit: bool,
    // Popup state for simple modals (tui-widgets popup)
    pub modal_popup: PopupState,
    pub message_modal: Option<MessageModal>,
    pub confirm_modal: Option<ConfirmModal>,
    pub save_modal: Option<SaveChangesModal>,
    pub path_modal: Option<PathModal>,
    pub contact_modal: Option<ContactModal>,
    pub multi_modal: Option<MultiModal>,
    pub pair_modal: Option<PairModal>,
    pub language_modal: Option<LanguageModal>,
    pub settings_modal: Option<SettingsModal>,
    pub help_modal: Option<HelpModal>,
}

impl<'a> App<'a> {
    pub fn new(ctx: &'a mut AppContext, controller: Controller) -> Self {
        let mut app = Self {
            ctx,
            controller,
            panes: Panes::default(),
            status: None,
            should_quit: false,
            modal_popup: PopupState::default(),
            message_modal: None,
            confirm_modal: None,
            save_modal: None,
            path_modal: None,
            contact_modal: None,
            multi_modal: None,
            pair_modal: None,
            language_modal: None,
            settings_modal: None,
            help_modal: None,
        };
        app.sync_selection(app.controller.active());
        app
    }

    /// Show messages produced while loading the startup lists.
    pub fn show_startup_messages(&mut self, messages: Vec<String>) {
        if !messages.is_empty() {
            self.show_message("Warnings", messages);
        }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        while !self.should_quit {
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        // Ctrl+C always quits
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.should_quit = true;
            return;
        }

        if self.message_modal.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.message_modal = None;
            }
            return;
        }
        if self.help_modal.is_some() {
            self.handle_help_modal_key(key);
            return;
        }
        if self.confirm_modal.is_some() {
            self.handle_confirm_modal_key(key);
            return;
        }
        if self.save_modal.is_some() {
            self.handle_save_modal_key(key);
            return;
        }
        if self.path_modal.is_some() {
            self.handle_path_modal_key(key);
            return;
        }
        if self.contact_modal.is_some() {
            self.handle_contact_modal_key(key);
            return;
        }
        if self.multi_modal.is_some() {
            self.handle_multi_modal_key(key);
            return;
        }
        if self.pair_modal.is_some() {
            self.handle_pair_modal_key(key);
            return;
        }
        if self.language_modal.is_some() {
            self.handle_language_modal_key(key);
            return;
        }
        if self.settings_modal.is_some() {
            self.handle_settings_modal_key(key);
            return;
        }

        match self.panes.focus {
            PaneFocus::Filter => self.handle_filter_key(key),
            PaneFocus::Table => self.handle_table_key(key),
        }
    }

    fn handle_table_key(&mut self, key: KeyEvent) {
        let side = self.controller.active();
        let rows = self.controller.panel(side).proxy.row_count();
        match key.code {
            KeyCode::Char('q') | KeyCode::F(10) => self.request_quit(),
            KeyCode::F(1) | KeyCode::Char('?') => self.show_help(),
            KeyCode::Tab | KeyCode::BackTab => self.other_panel(),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::PageUp => self.move_cursor(-10),
            KeyCode::PageDown => self.move_cursor(10),
            KeyCode::Home => self.move_cursor(-(rows as isize)),
            KeyCode::End => self.move_cursor(rows as isize),
            KeyCode::Char(' ') | KeyCode::Insert => {
                if rows > 0 {
                    self.panes.get_mut(side).toggle_mark();
                    self.move_cursor(1);
                }
            }
            KeyCode::Esc => {
                self.panes.get_mut(side).marked.clear();
                self.sync_selection(side);
            }
            KeyCode::Char('/') => self.panes.focus = PaneFocus::Filter,
            KeyCode::Enter | KeyCode::Char('e') => self.edit(),
            KeyCode::Char('a') => {
                self.contact_modal = Some(ContactModal {
                    target: ContactTarget::Add,
                    form: ContactForm::new(&ContactItem::default()),
                });
            }
            KeyCode::Delete | KeyCode::Char('d') => match self.controller.request_remove() {
                Ok(request) => {
                    self.modal_popup = PopupState::default();
                    self.confirm_modal = Some(ConfirmModal {
                        title: "REMOVE".to_string(),
                        message: request.prompt().to_string(),
                        action: ConfirmAction::Remove(request),
                    });
                }
                Err(err) => self.show_error(err),
            },
            KeyCode::Char('c') | KeyCode::F(5) => {
                let result = self.controller.copy();
                self.report_count(result, "copied");
            }
            KeyCode::Char('m') | KeyCode::F(6) => {
                let result = self.controller.move_rows();
                self.report_count(result, "moved");
            }
            KeyCode::Char('J') => match self.controller.request_join() {
                Ok(request) => self.open_pair_editor(request),
                Err(err) => self.show_error(err),
            },
            KeyCode::Char('C') => {
                if let Err(err) = self.controller.toggle_compare() {
                    self.show_error(err);
                }
                self.after_change();
            }
            KeyCode::Char('r') => match self.controller.request_compare_result() {
                Ok(request) => self.open_pair_editor(request),
                Err(err) => self.show_error(err),
            },
            KeyCode::Char('n') => {
                let result = self.controller.swap_names();
                self.report_count(result, "names swapped");
            }
            KeyCode::Char('N') => {
                let result = self.controller.split_names();
                self.report_count(result, "names split");
            }
            KeyCode::Char('\\') => {
                let result = self.controller.drop_slashes();
                self.report_count(result, "slashes dropped");
            }
            KeyCode::Char('p') => {
                let result = self.controller.split_numbers();
                self.report_count(result, "numbers split");
            }
            KeyCode::Char('f') => {
                let result = self.controller.generate_full_names();
                self.report_count(result, "full names generated");
            }
            KeyCode::Char('F') => {
                let result = self.controller.drop_full_names();
                self.report_count(result, "full names dropped");
            }
            KeyCode::Char('i') => {
                let rule = self.ctx.settings.default_country_rule;
                let result = self.controller.intl_phone_prefix(rule);
                self.report_count(result, "phones converted");
            }
            KeyCode::Char('o') => {
                let last = self.ctx.store.last_contact_file();
                self.open_path_modal(PathPurpose::Open, &last);
            }
            KeyCode::Char('s') => self.save(),
            KeyCode::Char('S') => {
                let current = self.controller.model(side).source().to_string();
                self.open_path_modal(PathPurpose::SaveAs(None), &current);
            }
            KeyCode::Char('w') => {
                if self.controller.model(side).changed() {
                    self.advance_save_queue(SaveQueue {
                        remaining: vec![side],
                        then: AfterSave::Close,
                    });
                } else {
                    self.close_active();
                }
            }
            KeyCode::Char('2') => {
                let on = !self.controller.two_panels();
                self.controller.set_two_panels(self.ctx, on);
                self.panes.focus = PaneFocus::Table;
                self.after_change();
            }
            KeyCode::Char('t') => {
                self.controller.toggle_sort(self.ctx);
                self.set_status(if self.controller.sorting() {
                    "Sorting enabled"
                } else {
                    "Sorting disabled"
                });
                self.after_change();
            }
            KeyCode::Char('x') => match self.controller.swap_panels() {
                Ok(()) => {
                    self.panes.swap();
                    self.after_change();
                }
                Err(err) => self.show_error(err),
            },
            KeyCode::Char('L') => self.open_language_modal(),
            KeyCode::Char(',') => {
                self.settings_modal = Some(SettingsModal::new(
                    &self.ctx.settings,
                    self.ctx.registry.csv_config(),
                ));
            }
            _ => {}
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        let side = self.controller.active();
        match key.code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => {
                self.panes.focus = PaneFocus::Table;
            }
            _ => {
                if self.panes.get_mut(side).filter.handle_key_event(key) {
                    let text = self.panes.get(side).filter.value().to_string();
                    self.controller.set_filter(side, &text);
                    self.after_change();
                }
            }
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Push the cursor/marks of `side` into the controller.
    fn sync_selection(&mut self, side: Side) {
        let rows = self.controller.panel(side).proxy.row_count();
        let selection = self.panes.get(side).selection(rows);
        self.controller.select_rows(side, &selection);
    }

    fn move_cursor(&mut self, delta: isize) {
        let side = self.controller.active();
        let rows = self.controller.panel(side).proxy.row_count();
        self.panes.get_mut(side).move_cursor(delta, rows);
        self.sync_selection(side);
    }

    fn other_panel(&mut self) {
        self.controller.other_panel();
        let side = self.controller.active();
        if self.controller.panel(side).selected_rows().is_empty() {
            self.sync_selection(side);
        }
    }

    /// Drop stale marks after list contents changed and reselect.
    fn after_change(&mut self) {
        for side in [Side::Left, Side::Right] {
            let rows = self.controller.panel(side).proxy.row_count();
            self.panes.get_mut(side).reset(rows);
        }
        self.sync_selection(self.controller.active());
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn edit(&mut self) {
        match self.controller.request_edit() {
            Ok(EditRequest::Single { side, row, item }) => {
                self.contact_modal = Some(ContactModal {
                    target: ContactTarget::Edit { side, row },
                    form: ContactForm::new(&item),
                });
            }
            Ok(EditRequest::Multi { side, rows, items }) => {
                self.modal_popup = PopupState::default();
                self.confirm_modal = Some(ConfirmModal {
                    title: "EDIT".to_string(),
                    message: "Are You really want to edit more than one record?\nOnly some fields can this edited in this mode"
                        .to_string(),
                    action: ConfirmAction::MultiEdit { side, rows, items },
                });
            }
            Err(err) => self.show_error(err),
        }
    }

    fn open_pair_editor(&mut self, request: PairEditRequest) {
        let form = PairForm::new(&request.first_item, &request.second_item);
        self.pair_modal = Some(PairModal { request, form });
    }

    fn report_count(&mut self, result: Result<usize, CommandError>, what: &str) {
        match result {
            Ok(count) => {
                self.set_status(format!("{} record(s) {}", count, what));
                self.after_change();
            }
            Err(err) => self.show_error(err),
        }
    }

    fn save(&mut self) {
        match self.controller.save(self.ctx) {
            Ok(Some(warnings)) => self.saved(warnings),
            Ok(None) => self.open_path_modal(PathPurpose::SaveAs(None), ""),
            Err(err) => self.show_error(err),
        }
    }

    fn saved(&mut self, warnings: Vec<String>) {
        let side = self.controller.active();
        self.set_status(format!("Saved {}", self.controller.model(side).source()));
        if !warnings.is_empty() {
            self.show_message("Warnings", warnings);
        }
    }

    fn close_active(&mut self) {
        self.controller.close();
        let side = self.controller.active();
        self.panes.get_mut(side).cursor = 0;
        self.after_change();
    }

    fn request_quit(&mut self) {
        let remaining = self.controller.unsaved_panels();
        if remaining.is_empty() {
            self.should_quit = true;
        } else {
            self.advance_save_queue(SaveQueue {
                remaining,
                then: AfterSave::Quit,
            });
        }
    }

    /// Ask about the next unsaved panel, or finish.
    fn advance_save_queue(&mut self, mut queue: SaveQueue) {
        if queue.remaining.is_empty() {
            match queue.then {
                AfterSave::Quit => self.should_quit = true,
                AfterSave::Close => self.close_active(),
            }
            return;
        }
        let side = queue.remaining.remove(0);
        let message = format!(
            "'{}' was changed.\nSave changes?",
            self.controller.model(side).display_name()
        );
        self.modal_popup = PopupState::default();
        self.save_modal = Some(SaveChangesModal {
            side,
            message,
            queue,
        });
    }

    fn open_path_modal(&mut self, purpose: PathPurpose, initial: &str) {
        self.modal_popup = PopupState::default();
        self.path_modal = Some(PathModal {
            purpose,
            input: LineEditor::new(initial),
        });
    }

    fn open_language_modal(&mut self) {
        let mut names = self.ctx.languages.native_names();
        if names.is_empty() {
            names.push(FALLBACK_NATIVE_NAME.to_string());
        }
        let selected = names
            .iter()
            .position(|n| n == self.controller.language())
            .unwrap_or(0);
        self.language_modal = Some(LanguageModal { names, selected });
    }

    // =========================================================================
    // Modal key handling
    // =========================================================================

    fn handle_confirm_modal_key(&mut self, key: KeyEvent) {
        let Some(modal) = self.confirm_modal.take() else {
            return;
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {}
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => match modal.action {
                ConfirmAction::Remove(request) => {
                    let removed = self.controller.remove_rows(&request);
                    self.set_status(format!("{} record(s) removed", removed));
                    self.after_change();
                }
                ConfirmAction::MultiEdit { side, rows, items } => {
                    self.multi_modal = Some(MultiModal {
                        side,
                        rows,
                        form: MultiForm::new(&items),
                    });
                }
            },
            _ => self.confirm_modal = Some(modal),
        }
    }

    fn handle_save_modal_key(&mut self, key: KeyEvent) {
        let Some(modal) = self.save_modal.take() else {
            return;
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                match self.controller.save_side(self.ctx, modal.side) {
                    Ok(Some(warnings)) => {
                        for warning in warnings {
                            warn!(%warning, "save warning");
                        }
                        self.advance_save_queue(modal.queue);
                    }
                    Ok(None) => {
                        self.controller.set_active(modal.side);
                        self.open_path_modal(PathPurpose::SaveAs(Some(modal.queue)), "");
                    }
                    Err(err) => self.show_error(err),
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') => self.advance_save_queue(modal.queue),
            KeyCode::Esc | KeyCode::Char('c') | KeyCode::Char('C') => {}
            _ => self.save_modal = Some(modal),
        }
    }

    fn handle_path_modal_key(&mut self, key: KeyEvent) {
        let Some(mut modal) = self.path_modal.take() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {}
            KeyCode::Enter => {
                let path = expand_path(modal.input.value());
                if path.as_os_str().is_empty() {
                    self.path_modal = Some(modal);
                    return;
                }
                match modal.purpose {
                    PathPurpose::Open => match self.controller.open(self.ctx, &path) {
                        Ok(warnings) => {
                            info!(path = %path.display(), "opened contact list");
                            self.set_status(format!("Opened {}", path.display()));
                            self.after_change();
                            if !warnings.is_empty() {
                                self.show_message("Warnings", warnings);
                            }
                        }
                        Err(err) => self.show_error(err),
                    },
                    PathPurpose::SaveAs(queue) => match self.controller.save_as(self.ctx, &path) {
                        Ok(warnings) => {
                            self.saved(warnings);
                            if let Some(queue) = queue {
                                self.advance_save_queue(queue);
                            }
                        }
                        Err(err) => self.show_error(err),
                    },
                }
            }
            _ => {
                modal.input.handle_key_event(key);
                self.path_modal = Some(modal);
            }
        }
    }

    fn handle_contact_modal_key(&mut self, key: KeyEvent) {
        let Some(mut modal) = self.contact_modal.take() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {}
            KeyCode::Enter => {
                let item = modal.form.to_item();
                match modal.target {
                    ContactTarget::Add => {
                        if item.is_empty() {
                            self.set_status("Empty record not added");
                        } else {
                            self.controller.add_item(item);
                            self.set_status("Record added");
                        }
                    }
                    ContactTarget::Edit { side, row } => {
                        self.controller.apply_edit(side, row, item);
                        self.set_status("Record changed");
                    }
                }
                self.after_change();
            }
            KeyCode::Up | KeyCode::BackTab => {
                modal.form.select_prev();
                self.contact_modal = Some(modal);
            }
            KeyCode::Down | KeyCode::Tab => {
                modal.form.select_next();
                self.contact_modal = Some(modal);
            }
            _ => {
                if let Some(input) = modal.form.current_mut() {
                    input.handle_key_event(key);
                }
                self.contact_modal = Some(modal);
            }
        }
    }

    fn handle_multi_modal_key(&mut self, key: KeyEvent) {
        let Some(mut modal) = self.multi_modal.take() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {}
            KeyCode::Enter => {
                let edit = modal.form.to_edit();
                if !edit.is_empty() {
                    let changed = self.controller.apply_multi_edit(modal.side, &modal.rows, &edit);
                    self.set_status(format!(
                        "{} field(s) set on {} record(s)",
                        edit.changes().len(),
                        changed
                    ));
                    self.after_change();
                }
            }
            KeyCode::Up | KeyCode::BackTab => {
                modal.form.select_prev();
                self.multi_modal = Some(modal);
            }
            KeyCode::Down | KeyCode::Tab => {
                modal.form.select_next();
                self.multi_modal = Some(modal);
            }
            _ => {
                if let Some(input) = modal.form.current_mut() {
                    input.handle_key_event(key);
                }
                self.multi_modal = Some(modal);
            }
        }
    }

    fn handle_pair_modal_key(&mut self, key: KeyEvent) {
        let Some(mut modal) = self.pair_modal.take() else {
            return;
        };
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {}
            KeyCode::Enter => {
                let (first, second) = modal.form.to_items();
                if self.controller.apply_pair_edit(&modal.request, first, second) {
                    self.set_status("Records saved");
                }
                self.after_change();
            }
            KeyCode::Up => {
                modal.form.select_prev();
                self.pair_modal = Some(modal);
            }
            KeyCode::Down => {
                modal.form.select_next();
                self.pair_modal = Some(modal);
            }
            KeyCode::Tab | KeyCode::BackTab => {
                modal.form.switch_column();
                self.pair_modal = Some(modal);
            }
            KeyCode::Right if ctrl => {
                modal.form.copy_field(PairColumn::First);
                self.pair_modal = Some(modal);
            }
            KeyCode::Left if ctrl => {
                modal.form.copy_field(PairColumn::Second);
                self.pair_modal = Some(modal);
            }
            _ => {
                if let Some(input) = modal.form.current_mut() {
                    input.handle_key_event(key);
                }
                self.pair_modal = Some(modal);
            }
        }
    }

    fn handle_language_modal_key(&mut self, key: KeyEvent) {
        let Some(mut modal) = self.language_modal.take() else {
            return;
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {}
            KeyCode::Up | KeyCode::Char('k') => {
                modal.selected = modal.selected.saturating_sub(1);
                self.language_modal = Some(modal);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                modal.selected = (modal.selected + 1).min(modal.names.len().saturating_sub(1));
                self.language_modal = Some(modal);
            }
            KeyCode::Enter => {
                if let Some(name) = modal.names.get(modal.selected) {
                    match self.controller.change_language(self.ctx, name) {
                        Ok(()) => self.set_status(format!("Language: {}", name)),
                        Err(err) => self.show_error(err),
                    }
                }
            }
            _ => self.language_modal = Some(modal),
        }
    }

    fn handle_settings_modal_key(&mut self, key: KeyEvent) {
        let Some(mut modal) = self.settings_modal.take() else {
            return;
        };
        if let Some(editor) = modal.editor.as_mut() {
            match key.code {
                KeyCode::Esc => modal.editor = None,
                KeyCode::Enter => modal.activate(),
                _ => {
                    editor.handle_key_event(key);
                }
            }
            self.settings_modal = Some(modal);
            return;
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {}
            KeyCode::Char('s') => {
                self.controller.apply_csv_config(self.ctx, modal.csv);
                self.controller.apply_settings(self.ctx, modal.draft);
                self.set_status("Settings saved");
                self.after_change();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                modal.select_prev();
                self.settings_modal = Some(modal);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                modal.select_next();
                self.settings_modal = Some(modal);
            }
            KeyCode::Left | KeyCode::Char('h') => {
                modal.cycle(false);
                self.settings_modal = Some(modal);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                modal.cycle(true);
                self.settings_modal = Some(modal);
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                modal.activate();
                self.settings_modal = Some(modal);
            }
            _ => self.settings_modal = Some(modal),
        }
    }

    // =========================================================================
    // Help Modal
    // =========================================================================

    fn help_total_lines(&self) -> usize {
        HELP_SECTIONS.iter().map(|s| s.entries.len() + 2).sum()
    }

    pub fn show_help(&mut self) {
        self.help_modal = Some(HelpModal::new(self.help_total_lines()));
    }

    fn handle_help_modal_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::F(1)) {
            self.help_modal = None;
            return;
        }
        let Some(modal) = self.help_modal.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => modal.scroll_down(1),
            KeyCode::Char('k') | KeyCode::Up => modal.scroll_up(1),
            KeyCode::PageDown => {
                let page = modal.viewport_height.saturating_sub(1).max(1);
                modal.scroll_down(page);
            }
            KeyCode::PageUp => {
                let page = modal.viewport_height.saturating_sub(1).max(1);
                modal.scroll_up(page);
            }
            _ => {}
        }
    }

    // =========================================================================
    // Messages
    // =========================================================================

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some(message.into());
    }

    fn show_error(&mut self, err: impl std::fmt::Display) {
        warn!(error = %err, "command failed");
        self.show_message("Error", vec![err.to_string()]);
    }

    fn show_message(&mut self, title: &str, lines: Vec<String>) {
        self.modal_popup = PopupState::default();
        self.message_modal = Some(MessageModal {
            title: title.to_string(),
            lines,
        });
    }
}

/// Expand a leading `~` to the home directory.
fn expand_path(raw: &str) -> PathBuf {
    let raw = raw.trim();
    match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match home::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(raw),
        },
        _ => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, Settings};
    use crate::contact::Phone;
    use crate::formats::FormatRegistry;
    use crate::languages::{LanguageCatalog, SystemLocale};
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn context(dir: &TempDir) -> AppContext {
        let locale = SystemLocale::from_posix("en_GB");
        AppContext {
            settings: Settings::defaults_for(&locale),
            store: ConfigStore::at(&dir.path().join("doublecontact.toml"), locale.clone()),
            languages: LanguageCatalog::new(),
            registry: FormatRegistry::default(),
        }
    }

    fn person(first: &str, phone: &str) -> ContactItem {
        let mut item = ContactItem::with_names(first, "");
        item.phones.push(Phone::new(phone, &["cell"]));
        item
    }

    #[test]
    fn remove_asks_before_deleting() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let mut controller = Controller::new(&ctx);
        controller.add_item(person("A", "111"));
        controller.add_item(person("B", "222"));
        let mut app = App::new(&mut ctx, controller);

        app.handle_key(key(KeyCode::Char('d')));
        assert!(app.confirm_modal.is_some());
        assert_eq!(app.controller.model(Side::Left).row_count(), 2);

        app.handle_key(key(KeyCode::Char('n')));
        assert!(app.confirm_modal.is_none());
        assert_eq!(app.controller.model(Side::Left).row_count(), 2);

        app.handle_key(key(KeyCode::Char('d')));
        app.handle_key(key(KeyCode::Char('y')));
        assert_eq!(app.controller.model(Side::Left).row_count(), 1);
        assert_eq!(app.controller.model(Side::Left).items()[0].first_name, "B");
    }

    #[test]
    fn settings_save_stores_csv_profile() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let controller = Controller::new(&ctx);
        let mut app = App::new(&mut ctx, controller);

        app.handle_key(key(KeyCode::Char(',')));
        app.settings_modal.as_mut().unwrap().csv.separator = ";".into();
        app.handle_key(key(KeyCode::Char('s')));
        assert!(app.settings_modal.is_none());
        assert_eq!(app.ctx.registry.csv_config().separator, ";");
        assert_eq!(app.ctx.store.csv_config().unwrap().separator, ";");
    }

    #[test]
    fn sort_toggle_reports_state() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let controller = Controller::new(&ctx);
        let mut app = App::new(&mut ctx, controller);
        let before = app.controller.sorting();

        app.handle_key(key(KeyCode::Char('t')));
        let expected = if before { "Sorting disabled" } else { "Sorting enabled" };
        assert_eq!(app.status.as_deref(), Some(expected));
    }

    #[test]
    fn precondition_errors_open_message() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let controller = Controller::new(&ctx);
        let mut app = App::new(&mut ctx, controller);

        app.handle_key(key(KeyCode::Char('C')));
        let modal = app.message_modal.as_ref().unwrap();
        assert_eq!(modal.title, "Error");
        assert_eq!(
            modal.lines[0],
            "Compare mode requires show two panels and load contact lists in both panels"
        );
        app.handle_key(key(KeyCode::Esc));
        assert!(app.message_modal.is_none());
    }

    #[test]
    fn quit_with_changes_asks_then_discards() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let mut controller = Controller::new(&ctx);
        controller.add_item(person("A", "111"));
        let mut app = App::new(&mut ctx, controller);

        app.handle_key(key(KeyCode::Char('q')));
        assert!(!app.should_quit);
        assert!(app.save_modal.as_ref().unwrap().message.ends_with("was changed.\nSave changes?"));

        app.handle_key(key(KeyCode::Esc));
        assert!(app.save_modal.is_none());
        assert!(!app.should_quit);

        app.handle_key(key(KeyCode::Char('q')));
        app.handle_key(key(KeyCode::Char('n')));
        assert!(app.should_quit);
    }

    #[test]
    fn saving_unnamed_list_on_quit_asks_for_path() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.vcf");
        let mut ctx = context(&dir);
        let mut controller = Controller::new(&ctx);
        controller.add_item(person("A", "111"));
        let mut app = App::new(&mut ctx, controller);

        app.handle_key(key(KeyCode::Char('q')));
        app.handle_key(key(KeyCode::Char('y')));
        let modal = app.path_modal.as_mut().unwrap();
        modal.input.set_value(&target.display().to_string());
        app.handle_key(key(KeyCode::Enter));
        assert!(target.is_file());
        assert!(app.should_quit);
    }

    #[test]
    fn editing_through_form_updates_record() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let mut controller = Controller::new(&ctx);
        controller.add_item(person("A", "111"));
        let mut app = App::new(&mut ctx, controller);

        app.handle_key(key(KeyCode::Enter));
        let modal = app.contact_modal.as_mut().unwrap();
        modal.form.current_mut().unwrap().set_value("Zed");
        app.handle_key(key(KeyCode::Enter));
        assert!(app.contact_modal.is_none());
        assert_eq!(app.controller.model(Side::Left).items()[0].last_name, "Zed");
    }

    #[test]
    fn filter_typing_narrows_active_panel() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let mut controller = Controller::new(&ctx);
        controller.add_item(person("Alpha", "111"));
        controller.add_item(person("Beta", "222"));
        let mut app = App::new(&mut ctx, controller);

        app.handle_key(key(KeyCode::Char('/')));
        assert_eq!(app.panes.focus, PaneFocus::Filter);
        app.handle_key(key(KeyCode::Char('b')));
        assert_eq!(app.controller.panel(Side::Left).proxy.rows(), &[1]);
        assert_eq!(app.controller.panel(Side::Left).selected_rows(), vec![1]);
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.panes.focus, PaneFocus::Table);
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = home::home_dir() {
            assert_eq!(expand_path("~/a.vcf"), home.join("a.vcf"));
        }
        assert_eq!(expand_path(" /tmp/x.csv "), PathBuf::from("/tmp/x.csv"));
        assert_eq!(expand_path("~user/x"), PathBuf::from("~user/x"));
    }
}
