//! Input trigger adapter: button edges to read requests.

/// Debounced button report: current state bits and the bits that changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonEdge {
    pub state: u32,
    pub changed: u32,
}

impl ButtonEdge {
    /// Press edge of the 1-based `button`.
    #[must_use]
    pub const fn pressed(button: u8) -> Self {
        let bit = bit(button);
        Self {
            state: bit,
            changed: bit,
        }
    }

    /// Release edge of the 1-based `button`.
    #[must_use]
    pub const fn released(button: u8) -> Self {
        Self {
            state: 0,
            changed: bit(button),
        }
    }
}

const fn bit(button: u8) -> u32 {
    match button {
        1..=32 => 1 << (button - 1),
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("button {0} out of range 1..=32")]
pub struct InvalidButton(pub u8);

/// Turns the press edge of one button into a "read now" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTrigger {
    mask: u32,
}

impl ReadTrigger {
    /// Trigger on the 1-based `button`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidButton`] outside `1..=32`.
    pub const fn for_button(button: u8) -> Result<Self, InvalidButton> {
        match bit(button) {
            0 => Err(InvalidButton(button)),
            mask => Ok(Self { mask }),
        }
    }

    /// Whether `edge` is a press of the configured button.
    #[must_use]
    pub const fn is_read_request(&self, edge: ButtonEdge) -> bool {
        edge.state & edge.changed & self.mask != 0
    }
}

impl Default for ReadTrigger {
    fn default() -> Self {
        Self { mask: 1 }
    }
}
