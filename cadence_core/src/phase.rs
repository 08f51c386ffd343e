// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The five callback phases of a frame.

use core::fmt;

/// Category a callback is posted into.
///
/// Phases run in declaration order within every frame: input first, then
/// animation, insets animation, traversal (measure/layout/draw), and finally
/// commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// Input event handling.
    Input,
    /// Animations, including frame-time callbacks.
    Animation,
    /// Window insets animations, run after regular animations settle.
    InsetsAnimation,
    /// Measure, layout and draw.
    Traversal,
    /// Post-draw work that needs the final frame time.
    Commit,
}

impl Phase {
    /// Number of phases.
    pub const COUNT: usize = 5;

    /// All phases in execution order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Input,
        Self::Animation,
        Self::InsetsAnimation,
        Self::Traversal,
        Self::Commit,
    ];

    /// Returns the position of this phase in execution order.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Input => 0,
            Self::Animation => 1,
            Self::InsetsAnimation => 2,
            Self::Traversal => 3,
            Self::Commit => 4,
        }
    }

    /// Returns the phase at `index` in execution order.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Returns a short lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Animation => "animation",
            Self::InsetsAnimation => "insets_animation",
            Self::Traversal => "traversal",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
