use std::collections::HashSet;

use crate::wizard::Confirmation;

/// Source of operator answers for wizards that ask before running.
pub trait ConfirmationChannel {
    fn confirm(&self, identifier: &str, confirmation: &Confirmation) -> bool;
}

/// Answers supplied up front (`--confirm`, `--confirm-all`, config file).
#[derive(Debug, Clone, Default)]
pub struct PresetConfirmations {
    granted: HashSet<String>,
    all: bool,
}

impl PresetConfirmations {
    pub fn new<I, S>(granted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granted: granted.into_iter().map(Into::into).collect(),
            all: false,
        }
    }

    pub fn all() -> Self {
        Self {
            granted: HashSet::new(),
            all: true,
        }
    }

    pub fn grant_all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }
}

impl ConfirmationChannel for PresetConfirmations {
    fn confirm(&self, identifier: &str, _confirmation: &Confirmation) -> bool {
        self.all || self.granted.contains(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_answers_only_listed_wizards() {
        let question = Confirmation::new("Are you sure?", "It changes data.").default_value(true);
        let channel = PresetConfirmations::new(["textToTextMedia"]);
        assert!(channel.confirm("textToTextMedia", &question));
        assert!(!channel.confirm("imageToTextMedia", &question));
        assert!(PresetConfirmations::all().confirm("imageToTextMedia", &question));
        assert!(PresetConfirmations::default().grant_all(true).confirm("x", &question));
    }
}
