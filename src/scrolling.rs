//! Virtual-list scroll state.
//!
//! Lists are rendered through a selected-index/offset pair rather than
//! absolute screen coordinates, so a registry with more components than the
//! terminal has rows scrolls instead of failing to render.

/// Scroll window over a list of `total` items, `visible` rows tall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollState {
    /// Currently highlighted item index
    pub selected: usize,
    /// Index of the first visible item
    pub offset: usize,
    /// Total number of items
    pub total: usize,
    /// Number of rows available for items
    pub visible: usize,
}

impl ScrollState {
    pub fn new(total: usize, visible: usize) -> Self {
        Self {
            selected: 0,
            offset: 0,
            total,
            visible: visible.max(1),
        }
    }

    /// Adjust the window height (e.g. after a terminal resize) and keep the
    /// selection visible.
    pub fn set_visible(&mut self, visible: usize) {
        self.visible = visible.max(1);
        self.clamp_offset();
    }

    /// Move the highlight up one item
    pub fn up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
        self.clamp_offset();
    }

    /// Move the highlight down one item
    pub fn down(&mut self) {
        if self.total > 0 && self.selected + 1 < self.total {
            self.selected += 1;
        }
        self.clamp_offset();
    }

    /// Move the highlight up one page
    pub fn page_up(&mut self) {
        self.selected = self.selected.saturating_sub(self.visible);
        self.clamp_offset();
    }

    /// Move the highlight down one page
    pub fn page_down(&mut self) {
        if self.total > 0 {
            self.selected = (self.selected + self.visible).min(self.total - 1);
        }
        self.clamp_offset();
    }

    /// Jump to the first item
    pub fn home(&mut self) {
        self.selected = 0;
        self.clamp_offset();
    }

    /// Jump to the last item
    pub fn end(&mut self) {
        self.selected = self.total.saturating_sub(1);
        self.clamp_offset();
    }

    /// Index range of the items currently in the window
    pub fn visible_range(&self) -> std::ops::Range<usize> {
        self.offset..(self.offset + self.visible).min(self.total)
    }

    /// Keep the selection inside the window
    fn clamp_offset(&mut self) {
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + self.visible {
            self.offset = self.selected + 1 - self.visible;
        }
        // Window may have grown past the end of the list
        if self.offset + self.visible > self.total {
            self.offset = self.total.saturating_sub(self.visible);
        }
    }
}
