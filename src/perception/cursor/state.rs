use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Classified meaning of the pointer glyph at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CursorState {
    /// Attackable.
    RedSword,
    /// Lootable.
    Hand,
    /// Dead or forbidden.
    Prohibited,
    /// Indeterminate.
    None,
}

impl CursorState {
    pub const GLYPHS: [CursorState; 3] = [
        CursorState::RedSword,
        CursorState::Hand,
        CursorState::Prohibited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CursorState::RedSword => "RED_SWORD",
            CursorState::Hand => "HAND",
            CursorState::Prohibited => "PROHIBITED",
            CursorState::None => "NONE",
        }
    }

    /// File stem of the reference image for this state, if it has one.
    pub fn template_stem(&self) -> Option<&'static str> {
        match self {
            CursorState::RedSword => Some("red_sword"),
            CursorState::Hand => Some("hand"),
            CursorState::Prohibited => Some("prohibited"),
            CursorState::None => None,
        }
    }
}

impl std::fmt::Display for CursorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Most frequent state with its count. Ties go to the state seen first.
pub fn majority(samples: &[CursorState]) -> (CursorState, usize) {
    let mut counts: IndexMap<CursorState, usize> = IndexMap::new();
    for sample in samples {
        *counts.entry(*sample).or_insert(0) += 1;
    }

    let mut best = (CursorState::None, 0);
    for (state, count) in counts {
        if count > best.1 {
            best = (state, count);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_picks_most_common() {
        let samples = [
            CursorState::RedSword,
            CursorState::RedSword,
            CursorState::None,
        ];
        assert_eq!(majority(&samples), (CursorState::RedSword, 2));
    }

    #[test]
    fn majority_ties_go_to_first_seen() {
        let samples = [
            CursorState::Hand,
            CursorState::None,
            CursorState::Prohibited,
        ];
        assert_eq!(majority(&samples), (CursorState::Hand, 1));
    }

    #[test]
    fn majority_of_nothing_is_none() {
        assert_eq!(majority(&[]), (CursorState::None, 0));
    }
}
