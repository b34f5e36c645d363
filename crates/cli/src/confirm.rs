use core_upgrader_core::{Confirmation, ConfirmationChannel, PresetConfirmations};
use dialoguer::Select;
use std::io::IsTerminal;

/// Preset answers first; otherwise ask on the terminal when allowed.
pub struct TerminalConfirmations {
    preset: PresetConfirmations,
    interactive: bool,
}

impl TerminalConfirmations {
    pub fn new(preset: PresetConfirmations, interactive: bool) -> Self {
        Self { preset, interactive }
    }

    fn can_prompt(&self) -> bool {
        self.interactive && std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
    }
}

impl ConfirmationChannel for TerminalConfirmations {
    fn confirm(&self, identifier: &str, confirmation: &Confirmation) -> bool {
        if self.preset.confirm(identifier, confirmation) {
            return true;
        }
        if !self.can_prompt() {
            return false;
        }

        eprintln!();
        eprintln!("[{identifier}] {}", confirmation.message);
        let items = [
            confirmation.confirm_label.as_str(),
            confirmation.deny_label.as_str(),
        ];
        let answer = Select::new()
            .with_prompt(confirmation.title.as_str())
            .items(&items)
            .default(if confirmation.default_value { 0 } else { 1 })
            .interact();
        match answer {
            Ok(selection) => selection == 0,
            Err(err) => {
                tracing::warn!(wizard = identifier, error = %err, "confirmation prompt failed");
                false
            }
        }
    }
}
