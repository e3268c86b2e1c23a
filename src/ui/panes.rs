use std::collections::BTreeSet;

use crate::controller::Side;

use super::edit::LineEditor;

/// Which part of a panel has keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaneFocus {
    #[default]
    Table,
    Filter,
}

/// Cursor, marks and filter text of one table. Rows are view rows.
#[derive(Debug, Default)]
pub struct PaneState {
    pub cursor: usize,
    pub offset: usize,
    pub marked: BTreeSet<usize>,
    pub filter: LineEditor,
}

impl PaneState {
    /// Marked rows, or the cursor row when nothing is marked.
    pub fn selection(&self, row_count: usize) -> Vec<usize> {
        if !self.marked.is_empty() {
            return self.marked.iter().copied().filter(|r| *r < row_count).collect();
        }
        if self.cursor < row_count {
            vec![self.cursor]
        } else {
            Vec::new()
        }
    }

    pub fn toggle_mark(&mut self) {
        if !self.marked.remove(&self.cursor) {
            self.marked.insert(self.cursor);
        }
    }

    pub fn move_cursor(&mut self, delta: isize, row_count: usize) {
        if row_count == 0 {
            self.cursor = 0;
            return;
        }
        let max = row_count as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, max) as usize;
    }

    /// Forget marks and keep the cursor inside the table.
    pub fn reset(&mut self, row_count: usize) {
        self.marked.clear();
        self.cursor = self.cursor.min(row_count.saturating_sub(1));
    }

    /// Scroll so the cursor stays within `height` visible rows.
    pub fn scroll_into_view(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }
    }
}

#[derive(Debug, Default)]
pub struct Panes {
    left: PaneState,
    right: PaneState,
    pub focus: PaneFocus,
}

impl Panes {
    pub fn get(&self, side: Side) -> &PaneState {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, side: Side) -> &mut PaneState {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.left, &mut self.right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_prefers_marks_over_cursor() {
        let mut pane = PaneState::default();
        assert_eq!(pane.selection(0), Vec::<usize>::new());
        pane.cursor = 2;
        assert_eq!(pane.selection(5), vec![2]);
        pane.toggle_mark();
        pane.cursor = 4;
        pane.toggle_mark();
        assert_eq!(pane.selection(5), vec![2, 4]);
        pane.toggle_mark();
        assert_eq!(pane.selection(5), vec![2]);
    }

    #[test]
    fn cursor_is_clamped_and_scrolled() {
        let mut pane = PaneState::default();
        pane.move_cursor(10, 3);
        assert_eq!(pane.cursor, 2);
        pane.move_cursor(-5, 3);
        assert_eq!(pane.cursor, 0);
        pane.cursor = 7;
        pane.scroll_into_view(5);
        assert_eq!(pane.offset, 3);
        pane.reset(4);
        assert_eq!(pane.cursor, 3);
    }
}
