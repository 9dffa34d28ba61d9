use std::fmt;

/// Which pointer drives interaction for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputModality {
    /// Neither a controller connect nor the watchdog has resolved yet.
    #[default]
    Undecided,
    Controller,
    Gaze,
}

impl InputModality {
    pub fn is_decided(self) -> bool {
        self != InputModality::Undecided
    }
}

impl fmt::Display for InputModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputModality::Undecided => "undecided",
            InputModality::Controller => "controller",
            InputModality::Gaze => "gaze",
        };
        f.write_str(name)
    }
}

/// Single-assignment holder for the session's modality.
#[derive(Debug, Default)]
pub struct ModalityCell {
    value: InputModality,
}

impl ModalityCell {
    pub fn get(&self) -> InputModality {
        self.value
    }

    /// Settle the modality. Only the first decision sticks.
    pub fn decide(&mut self, modality: InputModality) -> bool {
        if self.value.is_decided() || !modality.is_decided() {
            return false;
        }
        self.value = modality;
        true
    }
}
