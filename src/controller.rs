//! Main window logic without a screen: both panels, the active panel, and
//! every command the user can issue. Commands that need a dialog are split
//! into a `request_*` step returning what the dialog needs and an `apply_*`
//! step run once the user confirms.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigStore, CsvConfig, Settings};
use crate::contact::ContactItem;
use crate::formats::{FormatError, FormatRegistry};
use crate::languages::{self, LanguageCatalog};
use crate::model::{refresh_pairs, ContactModel, MultiEdit, ViewMode};
use crate::proxy::SortFilterProxy;

pub const APP_TITLE: &str = "Double Contact";

/// Everything the program shares, owned by `main` and passed by reference.
#[derive(Debug)]
pub struct AppContext {
    pub settings: Settings,
    pub store: ConfigStore,
    pub languages: LanguageCatalog,
    pub registry: FormatRegistry,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Record not selected")]
    NoSelection,
    #[error("Strongly two records on current panel must be selected for this operation")]
    WrongSelectionCount,
    #[error("Group editing is not implemented, select one record")]
    SingleRecordRequired,
    #[error("Compare mode requires show two panels and load contact lists in both panels")]
    CompareUnavailable,
    #[error("Two panels and compare mode needed for this operation")]
    CompareModeRequired,
    #[error("Operation requires show two panels")]
    TwoPanelsRequired,
    #[error("UI loading error: no translation for {0}")]
    LanguageUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

// =============================================================================
// Selection echo suppression
// =============================================================================

/// Flag held while a selection change is being mirrored onto the other
/// panel, so the mirrored change is not mirrored back.
#[derive(Debug, Clone, Default)]
pub struct SelectionLock(Rc<Cell<bool>>);

impl SelectionLock {
    pub fn is_locked(&self) -> bool {
        self.0.get()
    }

    /// `None` when already held.
    pub fn acquire(&self) -> Option<SelectionGuard> {
        if self.0.get() {
            return None;
        }
        self.0.set(true);
        Some(SelectionGuard(Rc::clone(&self.0)))
    }
}

/// Releases the lock on drop.
#[derive(Debug)]
pub struct SelectionGuard(Rc<Cell<bool>>);

impl Drop for SelectionGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// =============================================================================
// Requests handed to the UI
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditRequest {
    Single {
        side: Side,
        row: usize,
        item: ContactItem,
    },
    /// The UI must ask "edit more than one record?" before showing the
    /// multi-record editor.
    Multi {
        side: Side,
        rows: Vec<usize>,
        items: Vec<ContactItem>,
    },
}

/// Two records shown side by side for joining or comparing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairEditRequest {
    pub first: (Side, usize),
    pub second: (Side, usize),
    pub first_item: ContactItem,
    pub second_item: ContactItem,
    pub headers: (String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveRequest {
    pub side: Side,
    pub rows: Vec<usize>,
}

impl RemoveRequest {
    pub fn prompt(&self) -> &'static str {
        "Are You really want to delete selected items?"
    }
}

/// Which commands are currently enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionAccess {
    pub copy: bool,
    pub move_rows: bool,
    pub compare: bool,
    pub edit: bool,
    pub remove: bool,
    pub swap_names: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub test_data: bool,
    pub quiet: bool,
    pub files: Vec<std::path::PathBuf>,
}

// =============================================================================
// Panels
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Panel {
    pub model: ContactModel,
    pub proxy: SortFilterProxy,
    /// Selected model rows and the column span selected in each.
    selection: BTreeMap<usize, Range<usize>>,
}

impl Panel {
    fn new(settings: &Settings, sorted: bool) -> Self {
        let mut panel = Self {
            model: ContactModel::new(&settings.columns),
            ..Self::default()
        };
        panel.proxy.set_sorted(sorted);
        panel
    }

    pub fn selected_rows(&self) -> Vec<usize> {
        self.selection.keys().copied().collect()
    }

    pub fn selected_columns(&self, row: usize) -> Option<Range<usize>> {
        self.selection.get(&row).cloned()
    }
}

// =============================================================================
// Controller
// =============================================================================

#[derive(Debug)]
pub struct Controller {
    panels: [Panel; 2],
    active: Side,
    two_panels: bool,
    sorting: bool,
    language: String,
    date_format: String,
    selection_lock: SelectionLock,
}

impl Controller {
    pub fn new(ctx: &AppContext) -> Self {
        let sorting = ctx.store.sorting_enabled();
        let stored_language = ctx.store.read_language();
        let language = if stored_language.is_empty() {
            ctx.languages
                .system_language_native_name(ctx.store.locale())
        } else {
            stored_language
        };
        Self {
            panels: [
                Panel::new(&ctx.settings, sorting),
                Panel::new(&ctx.settings, sorting),
            ],
            active: Side::Left,
            two_panels: ctx.store.show_two_panels(),
            sorting,
            language,
            date_format: ctx.settings.date_format.clone(),
            selection_lock: SelectionLock::default(),
        }
    }

    /// Load the lists requested on the command line, or the last opened
    /// file. Returns messages for the user.
    pub fn startup(&mut self, ctx: &AppContext, options: &StartupOptions) -> Vec<String> {
        let mut messages = Vec::new();
        if options.test_data {
            self.panels[0].model.test_list();
        } else if !options.files.is_empty() && !options.quiet {
            if let Some(left) = options.files.first() {
                self.open_into(ctx, Side::Left, left, &mut messages);
            }
            if let Some(right) = options.files.get(1) {
                self.two_panels = true;
                self.open_into(ctx, Side::Right, right, &mut messages);
            }
        } else if !options.quiet && ctx.settings.open_last_files_at_startup {
            let last = ctx.store.last_contact_file();
            let path = Path::new(&last);
            if !last.is_empty() && path.is_file() {
                self.open_into(ctx, Side::Left, path, &mut messages);
            }
        }
        self.rebuild_views();
        messages
    }

    fn open_into(&mut self, ctx: &AppContext, side: Side, path: &Path, messages: &mut Vec<String>) {
        match self.panels[side.index()]
            .model
            .open(path, &ctx.registry, &ctx.settings)
        {
            Ok(warnings) => messages.extend(warnings),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to open contact list");
                messages.push(err.to_string());
            }
        }
    }

    // -------------------------------------------------------------------------
    // State access
    // -------------------------------------------------------------------------

    pub fn panel(&self, side: Side) -> &Panel {
        &self.panels[side.index()]
    }

    pub fn model(&self, side: Side) -> &ContactModel {
        &self.panels[side.index()].model
    }

    pub fn active(&self) -> Side {
        self.active
    }

    pub fn two_panels(&self) -> bool {
        self.two_panels
    }

    pub fn sorting(&self) -> bool {
        self.sorting
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    #[cfg(test)]
    pub fn selection_lock(&self) -> &SelectionLock {
        &self.selection_lock
    }

    pub fn set_active(&mut self, side: Side) {
        if side == Side::Right && !self.two_panels {
            return;
        }
        self.active = side;
    }

    pub fn other_panel(&mut self) {
        self.set_active(self.active.other());
    }

    fn active_panel(&self) -> &Panel {
        self.panel(self.active)
    }

    fn pair_mut(&mut self, side: Side) -> (&mut Panel, &mut Panel) {
        let [left, right] = &mut self.panels;
        match side {
            Side::Left => (left, right),
            Side::Right => (right, left),
        }
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Replace the selection of `side` with the given view rows.
    pub fn select_rows(&mut self, side: Side, view_rows: &[usize]) {
        let panel = &mut self.panels[side.index()];
        let columns = 0..panel.model.column_count();
        panel.selection = view_rows
            .iter()
            .filter_map(|&r| panel.proxy.map_to_source(r))
            .map(|row| (row, columns.clone()))
            .collect();
        self.selection_changed(side);
    }

    /// In compare mode, mirror the selection of `side` onto the paired rows
    /// of the other panel.
    pub fn selection_changed(&mut self, side: Side) {
        let Some(_guard) = self.selection_lock.acquire() else {
            return;
        };
        if !self.panel(side).model.view_mode().is_compare() {
            return;
        }
        let rows = self.panel(side).selected_rows();
        if rows.is_empty() {
            return;
        }
        let column_span = 0..self.panel(side).model.column_count();
        let pairs: Vec<usize> = rows
            .iter()
            .filter_map(|&row| self.panel(side).model.item(row).and_then(ContactItem::pair_index))
            .collect();

        let opposite = side.other();
        let opposite_rows = self.panel(opposite).model.row_count();
        let target = &mut self.panels[opposite.index()];
        target.selection.clear();
        for pair in pairs.into_iter().filter(|&p| p < opposite_rows) {
            target.selection.insert(pair, column_span.clone());
        }
        debug!(?side, mirrored = target.selection.len(), "mirrored compare selection");
        // The mirrored change notifies like any other; the held lock stops it.
        self.selection_changed(opposite);
    }

    fn require_selection(&self) -> Result<Vec<usize>, CommandError> {
        let rows = self.active_panel().selected_rows();
        if rows.is_empty() {
            Err(CommandError::NoSelection)
        } else {
            Ok(rows)
        }
    }

    fn single_selection(&self, side: Side) -> Result<usize, CommandError> {
        match self.panel(side).selected_rows().as_slice() {
            [] => Err(CommandError::NoSelection),
            [row] => Ok(*row),
            _ => Err(CommandError::SingleRecordRequired),
        }
    }

    // -------------------------------------------------------------------------
    // Modes
    // -------------------------------------------------------------------------

    pub fn toggle_compare(&mut self) -> Result<(), CommandError> {
        self.panels[0].selection.clear();
        self.panels[1].selection.clear();
        let active = self.active;
        if self.panel(active).model.view_mode() == ViewMode::Standard {
            if !self.two_panels || self.panels.iter().any(|p| p.model.is_empty()) {
                return Err(CommandError::CompareUnavailable);
            }
            let (main, opposite) = self.pair_mut(active);
            main.model.set_view_mode(ViewMode::CompareMain, &mut opposite.model);
            info!(?active, "compare mode on");
        } else {
            let (main, opposite) = self.pair_mut(active);
            main.model.set_view_mode(ViewMode::Standard, &mut opposite.model);
            info!("compare mode off");
        }
        self.rebuild_views();
        Ok(())
    }

    pub fn set_two_panels(&mut self, ctx: &mut AppContext, on: bool) {
        self.two_panels = on;
        if !on {
            self.active = Side::Left;
        }
        ctx.store.set_show_two_panels(on);
    }

    pub fn toggle_sort(&mut self, ctx: &mut AppContext) {
        self.sorting = !self.sorting;
        for panel in &mut self.panels {
            panel.proxy.set_sorted(self.sorting);
        }
        ctx.store.set_sorting_enabled(self.sorting);
        self.rebuild_views();
    }

    pub fn set_filter(&mut self, side: Side, filter: &str) {
        let date_format = self.date_format.clone();
        let panel = &mut self.panels[side.index()];
        panel.proxy.set_filter_wildcard(filter);
        panel.proxy.rebuild(&panel.model, &date_format);
    }

    /// Exchange the two lists, keeping their contents and dirty flags.
    pub fn swap_panels(&mut self) -> Result<(), CommandError> {
        if !self.two_panels {
            return Err(CommandError::TwoPanelsRequired);
        }
        self.panels.swap(0, 1);
        for panel in &mut self.panels {
            panel.selection.clear();
        }
        Ok(())
    }

    /// Recompute pairs after list contents changed, then refresh both views.
    fn update_view_mode(&mut self) {
        let [left, right] = &mut self.panels;
        match (left.model.view_mode(), right.model.view_mode()) {
            (ViewMode::CompareMain, _) => refresh_pairs(&mut left.model, &mut right.model),
            (_, ViewMode::CompareMain) => refresh_pairs(&mut right.model, &mut left.model),
            _ => {}
        }
        self.rebuild_views();
    }

    fn rebuild_views(&mut self) {
        for panel in &mut self.panels {
            panel.proxy.rebuild(&panel.model, &self.date_format);
        }
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    pub fn request_edit(&self) -> Result<EditRequest, CommandError> {
        let rows = self.require_selection()?;
        let model = &self.active_panel().model;
        if let [row] = rows.as_slice() {
            let item = model.item(*row).cloned().ok_or(CommandError::NoSelection)?;
            return Ok(EditRequest::Single {
                side: self.active,
                row: *row,
                item,
            });
        }
        let items = rows.iter().filter_map(|&r| model.item(r).cloned()).collect();
        Ok(EditRequest::Multi {
            side: self.active,
            rows,
            items,
        })
    }

    pub fn apply_edit(&mut self, side: Side, row: usize, item: ContactItem) -> bool {
        let applied = self.panels[side.index()].model.set_row(row, item);
        self.update_view_mode();
        applied
    }

    pub fn apply_multi_edit(&mut self, side: Side, rows: &[usize], edit: &MultiEdit) -> usize {
        let changed = self.panels[side.index()].model.apply_multi_edit(rows, edit);
        self.update_view_mode();
        changed
    }

    pub fn add_item(&mut self, item: ContactItem) -> usize {
        let row = self.panels[self.active.index()].model.add_row(item);
        self.update_view_mode();
        row
    }

    pub fn request_join(&self) -> Result<PairEditRequest, CommandError> {
        let rows = self.require_selection()?;
        let [first, second] = rows.as_slice() else {
            return Err(CommandError::WrongSelectionCount);
        };
        let model = &self.active_panel().model;
        let first_item = model.item(*first).cloned().ok_or(CommandError::NoSelection)?;
        let second_item = model.item(*second).cloned().ok_or(CommandError::NoSelection)?;
        Ok(PairEditRequest {
            first: (self.active, *first),
            second: (self.active, *second),
            first_item,
            second_item,
            headers: ("Item 1".to_string(), "Item 2".to_string()),
        })
    }

    pub fn request_compare_result(&self) -> Result<PairEditRequest, CommandError> {
        if !self.two_panels || !self.active_panel().model.view_mode().is_compare() {
            return Err(CommandError::CompareModeRequired);
        }
        let left_row = self.single_selection(Side::Left)?;
        let right_row = self.single_selection(Side::Right)?;
        let first_item = self
            .model(Side::Left)
            .item(left_row)
            .cloned()
            .ok_or(CommandError::NoSelection)?;
        let second_item = self
            .model(Side::Right)
            .item(right_row)
            .cloned()
            .ok_or(CommandError::NoSelection)?;
        Ok(PairEditRequest {
            first: (Side::Left, left_row),
            second: (Side::Right, right_row),
            first_item,
            second_item,
            headers: ("Left item".to_string(), "Right item".to_string()),
        })
    }

    /// Store the records returned by the pair editor.
    pub fn apply_pair_edit(&mut self, request: &PairEditRequest, first: ContactItem, second: ContactItem) -> bool {
        let (first_side, first_row) = request.first;
        let (second_side, second_row) = request.second;
        let stored_first = self.panels[first_side.index()].model.set_row(first_row, first);
        let stored_second = self.panels[second_side.index()].model.set_row(second_row, second);
        self.update_view_mode();
        stored_first && stored_second
    }

    pub fn request_remove(&self) -> Result<RemoveRequest, CommandError> {
        Ok(RemoveRequest {
            side: self.active,
            rows: self.require_selection()?,
        })
    }

    pub fn remove_rows(&mut self, request: &RemoveRequest) -> usize {
        let panel = &mut self.panels[request.side.index()];
        let removed = panel.model.remove_rows(&request.rows);
        panel.selection.clear();
        self.update_view_mode();
        removed
    }

    pub fn copy(&mut self) -> Result<usize, CommandError> {
        let rows = self.require_selection()?;
        if !self.two_panels {
            return Err(CommandError::TwoPanelsRequired);
        }
        let (source, target) = self.pair_mut(self.active);
        let copied = source.model.copy_rows(&rows, &mut target.model);
        source.selection.clear();
        self.update_view_mode();
        Ok(copied)
    }

    pub fn move_rows(&mut self) -> Result<usize, CommandError> {
        let rows = self.require_selection()?;
        if !self.two_panels {
            return Err(CommandError::TwoPanelsRequired);
        }
        let (source, target) = self.pair_mut(self.active);
        let moved = source.model.copy_rows(&rows, &mut target.model);
        source.model.remove_rows(&rows);
        source.selection.clear();
        self.update_view_mode();
        Ok(moved)
    }

    fn bulk(&mut self, op: impl FnOnce(&mut ContactModel, &[usize]) -> usize) -> Result<usize, CommandError> {
        let rows = self.require_selection()?;
        let changed = op(&mut self.panels[self.active.index()].model, &rows);
        self.update_view_mode();
        Ok(changed)
    }

    pub fn swap_names(&mut self) -> Result<usize, CommandError> {
        self.bulk(ContactModel::swap_names)
    }

    pub fn split_names(&mut self) -> Result<usize, CommandError> {
        self.bulk(ContactModel::split_names)
    }

    pub fn drop_slashes(&mut self) -> Result<usize, CommandError> {
        self.bulk(ContactModel::drop_slashes)
    }

    pub fn split_numbers(&mut self) -> Result<usize, CommandError> {
        self.bulk(ContactModel::split_numbers)
    }

    pub fn generate_full_names(&mut self) -> Result<usize, CommandError> {
        self.bulk(ContactModel::generate_full_names)
    }

    pub fn drop_full_names(&mut self) -> Result<usize, CommandError> {
        self.bulk(ContactModel::drop_full_names)
    }

    pub fn intl_phone_prefix(&mut self, country_rule: i64) -> Result<usize, CommandError> {
        self.bulk(|model, rows| model.intl_phone_prefix(rows, country_rule))
    }

    // -------------------------------------------------------------------------
    // Files
    // -------------------------------------------------------------------------

    /// Open `path` into the active panel and remember it as the last file.
    pub fn open(&mut self, ctx: &mut AppContext, path: &Path) -> Result<Vec<String>, FormatError> {
        let panel = &mut self.panels[self.active.index()];
        let warnings = panel.model.open(path, &ctx.registry, &ctx.settings)?;
        panel.selection.clear();
        ctx.store.set_last_contact_file(&path.display().to_string());
        self.update_view_mode();
        Ok(warnings)
    }

    /// Save the active list to where it came from. `Ok(None)` means the list
    /// has no file yet and needs a name.
    pub fn save(&mut self, ctx: &AppContext) -> Result<Option<Vec<String>>, FormatError> {
        self.save_side(ctx, self.active)
    }

    pub fn save_side(&mut self, ctx: &AppContext, side: Side) -> Result<Option<Vec<String>>, FormatError> {
        let model = &mut self.panels[side.index()].model;
        let Some(path) = model.path().map(Path::to_path_buf) else {
            return Ok(None);
        };
        model.save_as(&path, &ctx.registry, &ctx.settings).map(Some)
    }

    pub fn save_as(&mut self, ctx: &mut AppContext, path: &Path) -> Result<Vec<String>, FormatError> {
        let warnings = self.panels[self.active.index()]
            .model
            .save_as(path, &ctx.registry, &ctx.settings)?;
        ctx.store.set_last_contact_file(&path.display().to_string());
        Ok(warnings)
    }

    /// Close the active list. Leaving a list empty ends compare mode.
    pub fn close(&mut self) {
        let active = self.active;
        let (panel, opposite) = self.pair_mut(active);
        panel.model.close();
        panel.selection.clear();
        if panel.model.view_mode().is_compare() {
            panel.model.set_view_mode(ViewMode::Standard, &mut opposite.model);
        }
        self.rebuild_views();
    }

    /// Panels with unsaved changes, for the quit prompt.
    pub fn unsaved_panels(&self) -> Vec<Side> {
        [Side::Left, Side::Right]
            .into_iter()
            .filter(|side| self.model(*side).changed())
            .collect()
    }

    // -------------------------------------------------------------------------
    // Settings and language
    // -------------------------------------------------------------------------

    pub fn apply_settings(&mut self, ctx: &mut AppContext, mut settings: Settings) {
        ctx.store.write(&mut settings);
        self.date_format = settings.date_format.clone();
        for panel in &mut self.panels {
            panel.model.set_visible_columns(&settings.columns);
            panel.selection.clear();
        }
        ctx.settings = settings;
        self.rebuild_views();
    }

    pub fn apply_csv_config(&mut self, ctx: &mut AppContext, csv: CsvConfig) {
        ctx.store.set_csv_config(&csv);
        debug!(encoding = %csv.encoding, separator = %csv.separator, "csv profile saved");
        ctx.registry.set_csv_config(csv);
    }

    /// Switch the interface language. The previous language stays when the
    /// translation for the new one is missing.
    pub fn change_language(&mut self, ctx: &mut AppContext, native_name: &str) -> Result<(), CommandError> {
        let code = ctx.languages.native_name_to_code(native_name).to_string();
        if let Some(path) = languages::translation_file(&code) {
            if !path.is_file() {
                warn!(language = %native_name, path = %path.display(), "translation not found");
                return Err(CommandError::LanguageUnavailable(native_name.to_string()));
            }
        }
        self.language = native_name.to_string();
        ctx.store.write_language(native_name);
        info!(language = %native_name, code = %code, "language changed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Derived text
    // -------------------------------------------------------------------------

    pub fn panel_header(&self, side: Side) -> String {
        let model = self.model(side);
        let marker = if model.changed() { "*" } else { "" };
        format!("{}{}", marker, model.display_name())
    }

    pub fn window_title(&self) -> String {
        if self.active_panel().model.source().is_empty() {
            APP_TITLE.to_string()
        } else {
            format!("{} - {}", APP_TITLE, self.panel_header(self.active))
        }
    }

    pub fn mode_status(&self) -> String {
        let panels = if self.two_panels { "two panels" } else { "one panel" };
        let sorting = if self.sorting { "sorted" } else { "not sorted" };
        let mode = match self.model(Side::Left).view_mode() {
            ViewMode::Standard => "simple editing",
            ViewMode::CompareMain | ViewMode::CompareOpposite => "compare",
        };
        format!("Mode: {}, {}, {}", panels, sorting, mode)
    }

    pub fn action_access(&self) -> ActionAccess {
        let has_selection = !self.active_panel().selection.is_empty();
        ActionAccess {
            copy: has_selection && self.two_panels,
            move_rows: has_selection && self.two_panels,
            compare: self.two_panels,
            edit: has_selection,
            remove: has_selection,
            swap_names: has_selection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Phone;
    use crate::languages::SystemLocale;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        ctx: AppContext,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let locale = SystemLocale::from_posix("en_GB");
        let store = ConfigStore::at(&dir.path().join("doublecontact.toml"), locale.clone());
        let ctx = AppContext {
            settings: Settings::defaults_for(&locale),
            store,
            languages: LanguageCatalog::new(),
            registry: FormatRegistry::default(),
        };
        Fixture { _dir: dir, ctx }
    }

    fn person(first: &str, last: &str, phone: &str) -> ContactItem {
        let mut item = ContactItem::with_names(first, last);
        if !phone.is_empty() {
            item.phones.push(Phone::new(phone, &["cell"]));
        }
        item
    }

    /// Left: Ivan, Olga, Nobody. Right: Maria, Ivan's double, Olga's double.
    fn loaded(ctx: &AppContext) -> Controller {
        let mut c = Controller::new(ctx);
        c.add_item(person("Ivan", "Petrov", "+7 912 000-00-01"));
        c.add_item(person("Olga", "Sidorova", "+7 912 000-00-02"));
        c.add_item(person("Nobody", "Special", ""));
        c.set_active(Side::Right);
        c.add_item(person("Maria", "Kuznetsova", "+7 999 111-11-11"));
        c.add_item(person("Vanya", "", "8 912 000 00 01"));
        c.add_item(person("Olya", "", "89120000002"));
        c.set_active(Side::Left);
        c
    }

    #[test]
    fn compare_requires_two_loaded_panels() {
        let mut f = fixture();
        let mut c = Controller::new(&f.ctx);
        c.add_item(person("A", "", ""));
        assert_eq!(c.toggle_compare(), Err(CommandError::CompareUnavailable));
        assert_eq!(c.model(Side::Left).view_mode(), ViewMode::Standard);

        let mut c = loaded(&f.ctx);
        c.set_two_panels(&mut f.ctx, false);
        assert_eq!(c.toggle_compare(), Err(CommandError::CompareUnavailable));
        assert_eq!(c.model(Side::Left).view_mode(), ViewMode::Standard);
        assert_eq!(c.model(Side::Right).view_mode(), ViewMode::Standard);
    }

    #[test]
    fn compare_toggle_sets_counterpart_modes_and_clears_selection() {
        let f = fixture();
        let mut c = loaded(&f.ctx);
        c.select_rows(Side::Left, &[0]);
        c.toggle_compare().unwrap();
        assert_eq!(c.model(Side::Left).view_mode(), ViewMode::CompareMain);
        assert_eq!(c.model(Side::Right).view_mode(), ViewMode::CompareOpposite);
        assert!(c.panel(Side::Left).selected_rows().is_empty());
        assert_eq!(c.mode_status(), "Mode: two panels, not sorted, compare");

        c.toggle_compare().unwrap();
        assert_eq!(c.model(Side::Left).view_mode(), ViewMode::Standard);
        assert_eq!(c.model(Side::Right).view_mode(), ViewMode::Standard);
        assert_eq!(c.mode_status(), "Mode: two panels, not sorted, simple editing");
    }

    #[test]
    fn selecting_paired_rows_mirrors_full_column_span() {
        let f = fixture();
        let mut c = loaded(&f.ctx);
        c.toggle_compare().unwrap();

        c.select_rows(Side::Left, &[0, 1]);
        let right = c.panel(Side::Right);
        assert_eq!(right.selected_rows(), vec![1, 2]);
        let span = 0..c.model(Side::Left).column_count();
        assert_eq!(right.selected_columns(1), Some(span.clone()));
        assert_eq!(right.selected_columns(2), Some(span));
        // The echo did not clear the origin.
        assert_eq!(c.panel(Side::Left).selected_rows(), vec![0, 1]);
        assert!(!c.selection_lock().is_locked());

        c.select_rows(Side::Left, &[2]);
        assert!(c.panel(Side::Right).selected_rows().is_empty());
    }

    #[test]
    fn selection_is_not_mirrored_outside_compare_mode() {
        let f = fixture();
        let mut c = loaded(&f.ctx);
        c.select_rows(Side::Right, &[2]);
        c.select_rows(Side::Left, &[0]);
        assert_eq!(c.panel(Side::Right).selected_rows(), vec![2]);
    }

    #[test]
    fn held_lock_suppresses_mirroring() {
        let f = fixture();
        let mut c = loaded(&f.ctx);
        c.toggle_compare().unwrap();
        let guard = c.selection_lock().acquire().unwrap();
        assert!(c.selection_lock().acquire().is_none());
        c.select_rows(Side::Left, &[0]);
        assert!(c.panel(Side::Right).selected_rows().is_empty());
        drop(guard);
        c.select_rows(Side::Left, &[0]);
        assert_eq!(c.panel(Side::Right).selected_rows(), vec![1]);
    }

    #[test]
    fn join_requires_exactly_two_rows_and_applies_on_confirm_only() {
        let f = fixture();
        let mut c = loaded(&f.ctx);
        assert_eq!(c.request_join(), Err(CommandError::NoSelection));
        c.select_rows(Side::Left, &[0]);
        assert_eq!(c.request_join(), Err(CommandError::WrongSelectionCount));
        c.select_rows(Side::Left, &[0, 1, 2]);
        assert_eq!(c.request_join(), Err(CommandError::WrongSelectionCount));
        assert!(!c.model(Side::Left).items().is_empty());

        c.select_rows(Side::Left, &[0, 2]);
        let before = c.model(Side::Left).items().to_vec();
        let request = c.request_join().unwrap();
        assert_eq!(request.first, (Side::Left, 0));
        assert_eq!(request.second, (Side::Left, 2));
        assert_eq!(c.model(Side::Left).items(), before.as_slice());

        let mut merged = request.first_item.clone();
        merged.note = "joined".into();
        assert!(c.apply_pair_edit(&request, merged, request.second_item.clone()));
        assert_eq!(c.model(Side::Left).items()[0].note, "joined");
    }

    #[test]
    fn compare_result_needs_compare_mode_and_one_row_per_panel() {
        let f = fixture();
        let mut c = loaded(&f.ctx);
        assert_eq!(c.request_compare_result(), Err(CommandError::CompareModeRequired));
        c.toggle_compare().unwrap();
        assert_eq!(c.request_compare_result(), Err(CommandError::NoSelection));

        c.select_rows(Side::Left, &[0]);
        let request = c.request_compare_result().unwrap();
        assert_eq!(request.first, (Side::Left, 0));
        assert_eq!(request.second, (Side::Right, 1));
        assert_eq!(request.headers.0, "Left item");

        c.select_rows(Side::Left, &[0, 1]);
        assert_eq!(c.request_compare_result(), Err(CommandError::SingleRecordRequired));
    }

    #[test]
    fn swap_panels_preserves_contents_and_dirty_flags() {
        let mut f = fixture();
        let mut c = loaded(&f.ctx);
        c.set_active(Side::Right);
        c.close();
        c.add_item(person("Solo", "", ""));
        let left_before = c.model(Side::Left).items().to_vec();
        let right_before = c.model(Side::Right).items().to_vec();
        let flags = (c.model(Side::Left).changed(), c.model(Side::Right).changed());

        c.swap_panels().unwrap();
        assert_eq!(c.model(Side::Left).items(), right_before.as_slice());
        assert_eq!(c.model(Side::Right).items(), left_before.as_slice());
        assert_eq!((c.model(Side::Right).changed(), c.model(Side::Left).changed()), flags);

        c.set_two_panels(&mut f.ctx, false);
        assert_eq!(c.swap_panels(), Err(CommandError::TwoPanelsRequired));
    }

    #[test]
    fn one_panel_mode_forces_left_and_disables_copy() {
        let mut f = fixture();
        let mut c = loaded(&f.ctx);
        c.set_active(Side::Right);
        c.select_rows(Side::Right, &[0]);
        assert!(c.action_access().copy);

        c.set_two_panels(&mut f.ctx, false);
        assert_eq!(c.active(), Side::Left);
        c.select_rows(Side::Left, &[0]);
        let access = c.action_access();
        assert!(!access.copy && !access.move_rows && !access.compare);
        assert!(access.edit);
        assert_eq!(c.copy(), Err(CommandError::TwoPanelsRequired));
        assert!(!f.ctx.store.show_two_panels());

        c.set_active(Side::Right);
        assert_eq!(c.active(), Side::Left);
    }

    #[test]
    fn commands_without_selection_do_not_mutate() {
        let f = fixture();
        let mut c = loaded(&f.ctx);
        let before = c.model(Side::Left).items().to_vec();
        assert_eq!(c.swap_names(), Err(CommandError::NoSelection));
        assert_eq!(c.split_names(), Err(CommandError::NoSelection));
        assert_eq!(c.drop_slashes(), Err(CommandError::NoSelection));
        assert_eq!(c.split_numbers(), Err(CommandError::NoSelection));
        assert_eq!(c.generate_full_names(), Err(CommandError::NoSelection));
        assert_eq!(c.drop_full_names(), Err(CommandError::NoSelection));
        assert_eq!(c.intl_phone_prefix(0), Err(CommandError::NoSelection));
        assert_eq!(c.copy(), Err(CommandError::NoSelection));
        assert_eq!(c.move_rows(), Err(CommandError::NoSelection));
        assert_eq!(c.request_remove(), Err(CommandError::NoSelection));
        assert_eq!(c.request_edit(), Err(CommandError::NoSelection));
        assert_eq!(c.model(Side::Left).items(), before.as_slice());
    }

    #[test]
    fn edit_request_distinguishes_single_and_multi() {
        let f = fixture();
        let mut c = loaded(&f.ctx);
        c.select_rows(Side::Left, &[1]);
        let EditRequest::Single { side, row, mut item } = c.request_edit().unwrap() else {
            panic!("expected single edit");
        };
        item.title = "Dr".into();
        assert!(c.apply_edit(side, row, item));
        assert_eq!(c.model(Side::Left).items()[1].title, "Dr");

        c.select_rows(Side::Left, &[0, 1]);
        let EditRequest::Multi { side, rows, items } = c.request_edit().unwrap() else {
            panic!("expected multi edit");
        };
        assert_eq!(items.len(), 2);
        let mut edit = MultiEdit::default();
        edit.set(crate::model::SharedField::Organization, "Acme");
        assert_eq!(c.apply_multi_edit(side, &rows, &edit), 2);
    }

    #[test]
    fn move_and_remove_update_both_panels() {
        let f = fixture();
        let mut c = loaded(&f.ctx);
        c.select_rows(Side::Left, &[2]);
        assert_eq!(c.move_rows(), Ok(1));
        assert_eq!(c.model(Side::Left).row_count(), 2);
        assert_eq!(c.model(Side::Right).row_count(), 4);
        assert!(c.panel(Side::Left).selected_rows().is_empty());

        c.select_rows(Side::Left, &[0, 1]);
        let request = c.request_remove().unwrap();
        assert_eq!(request.prompt(), "Are You really want to delete selected items?");
        assert_eq!(c.model(Side::Left).row_count(), 2);
        assert_eq!(c.remove_rows(&request), 2);
        assert!(c.model(Side::Left).is_empty());
    }

    #[test]
    fn pairs_follow_edits_in_compare_mode() {
        let f = fixture();
        let mut c = loaded(&f.ctx);
        c.toggle_compare().unwrap();
        assert_eq!(c.model(Side::Left).items()[0].pair_index(), Some(1));
        c.set_active(Side::Right);
        c.select_rows(Side::Right, &[1]);
        let request = c.request_remove().unwrap();
        c.remove_rows(&request);
        assert_eq!(c.model(Side::Left).items()[0].pair_index(), None);
        assert_eq!(c.model(Side::Left).items()[1].pair_index(), Some(1));
    }

    #[test]
    fn headers_and_title_reflect_changes() {
        let f = fixture();
        let mut c = Controller::new(&f.ctx);
        assert_eq!(c.window_title(), "Double Contact");
        c.panels[0].model.test_list();
        assert_eq!(c.panel_header(Side::Left), "Test data");
        assert_eq!(c.window_title(), "Double Contact - Test data");
        c.add_item(person("New", "", ""));
        assert_eq!(c.panel_header(Side::Left), "*Test data");
        assert_eq!(c.unsaved_panels(), vec![Side::Left]);
    }

    #[test]
    fn save_without_path_asks_for_name() {
        let f = fixture();
        let mut c = Controller::new(&f.ctx);
        c.add_item(person("A", "", ""));
        assert!(c.save(&f.ctx).unwrap().is_none());
        assert!(c.model(Side::Left).changed());
    }

    #[test]
    fn save_as_then_open_round_trip_and_remember_path() {
        let mut f = fixture();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.vcf");
        let mut c = Controller::new(&f.ctx);
        c.add_item(person("Anna", "Karenina", "+7 900 000-00-00"));
        c.save_as(&mut f.ctx, &path).unwrap();
        assert!(!c.model(Side::Left).changed());
        assert_eq!(c.panel_header(Side::Left), "list.vcf");
        assert_eq!(f.ctx.store.last_contact_file(), path.display().to_string());

        c.set_active(Side::Right);
        c.open(&mut f.ctx, &path).unwrap();
        assert_eq!(c.model(Side::Right).items()[0].last_name, "Karenina");
    }

    #[test]
    fn sort_toggle_persists_and_reorders_view() {
        let mut f = fixture();
        let mut c = loaded(&f.ctx);
        c.toggle_sort(&mut f.ctx);
        assert!(c.sorting());
        assert!(f.ctx.store.sorting_enabled());
        assert_eq!(c.panel(Side::Left).proxy.rows(), &[0, 1, 2]);
        assert_eq!(c.panel(Side::Right).proxy.rows(), &[1, 2, 0]);
        assert!(c.mode_status().contains(", sorted,"));
    }

    #[test]
    fn filter_applies_to_one_panel() {
        let f = fixture();
        let mut c = loaded(&f.ctx);
        c.set_filter(Side::Left, "sid*");
        assert_eq!(c.panel(Side::Left).proxy.rows(), &[1]);
        assert_eq!(c.panel(Side::Right).proxy.row_count(), 3);
        c.select_rows(Side::Left, &[0]);
        assert_eq!(c.panel(Side::Left).selected_rows(), vec![1]);
    }

    #[test]
    fn missing_translation_keeps_previous_language() {
        let mut f = fixture();
        f.ctx.languages.load_str("en_GB\tEnglish\tEnglish (United Kingdom)\nxx_XX\tNowhere\tNowhereish\n");
        let mut c = Controller::new(&f.ctx);
        let previous = c.language().to_string();
        assert_eq!(
            c.change_language(&mut f.ctx, "Nowhereish"),
            Err(CommandError::LanguageUnavailable("Nowhereish".into()))
        );
        assert_eq!(c.language(), previous);

        c.change_language(&mut f.ctx, "English (United Kingdom)").unwrap();
        assert_eq!(f.ctx.store.read_language(), "English (United Kingdom)");
    }

    #[test]
    fn csv_profile_is_persisted_and_used_by_the_registry() {
        let mut f = fixture();
        let mut c = Controller::new(&f.ctx);
        let csv = CsvConfig {
            separator: ";".into(),
            ..CsvConfig::default()
        };
        c.apply_csv_config(&mut f.ctx, csv.clone());
        assert_eq!(f.ctx.registry.csv_config().separator, ";");

        let path = f._dir.path().join("doublecontact.toml");
        let reopened = ConfigStore::at(&path, SystemLocale::from_posix("en_GB"));
        assert_eq!(reopened.csv_config(), Some(csv));
    }
}
