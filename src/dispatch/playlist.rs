//! Active playlist state.
//!
//! One playlist is active at a time, owned and mutated exclusively by the
//! dispatcher. Navigation wraps at both ends.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistItem {
    pub path: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistState {
    pub id: String,
    pub name: Option<String>,
    pub items: Vec<PlaylistItem>,
    pub index: usize,
    pub playing: bool,
}

impl PlaylistState {
    pub fn new(id: &str, items: Vec<PlaylistItem>) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            items,
            index: 0,
            playing: false,
        }
    }

    pub fn current(&self) -> Option<&PlaylistItem> {
        self.items.get(self.index)
    }

    pub fn next(&mut self) {
        if !self.items.is_empty() {
            self.index = (self.index + 1) % self.items.len();
        }
    }

    pub fn previous(&mut self) {
        if !self.items.is_empty() {
            self.index = (self.index + self.items.len() - 1) % self.items.len();
        }
    }

    /// Jump to a 1-based position. False when out of range.
    pub fn goto(&mut self, position: usize) -> bool {
        if position >= 1 && position <= self.items.len() {
            self.index = position - 1;
            true
        } else {
            false
        }
    }
}

/// Parse playlist items from a loaded source: either the contents of a
/// playlist file (one path per line, `#` comments skipped) or an inline
/// `|`-separated list.
pub fn parse_items(source: &str) -> Vec<PlaylistItem> {
    let lines: Vec<&str> = if source.contains('\n') {
        source.lines().collect()
    } else {
        source.split('|').collect()
    };

    lines
        .into_iter()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| PlaylistItem {
            path: line.to_string(),
            name: None,
        })
        .collect()
}
