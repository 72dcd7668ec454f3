use super::styles::{DANGER, PROMPT};
use console::Term;
use kennel::error::{KennelError, Result};
use kennel::prompt::{ConflictChoice, ConflictReport, Prompter};
use tracing::warn;

/// Asks on the terminal's stderr. Without a terminal every question gets the
/// cautious answer, unless `--yes` was passed for confirmations.
pub struct ConsolePrompter {
    term: Term,
    assume_yes: bool,
}

impl ConsolePrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            term: Term::stderr(),
            assume_yes,
        }
    }

    fn ask(&self, question: &str) -> Option<String> {
        if !self.term.is_term() {
            return None;
        }
        self.term
            .write_str(&format!("{} ", PROMPT.apply_to(question)))
            .ok()?;
        self.term.read_line().ok()
    }

    pub fn read_secret(&self, label: &str) -> Result<String> {
        if !self.term.is_term() {
            return Err(KennelError::Validation(format!(
                "{label} required: pass it as an option when not on a terminal"
            )));
        }
        self.term.write_str(&format!("{}: ", PROMPT.apply_to(label)))?;
        Ok(self.term.read_secure_line()?)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

impl Prompter for ConsolePrompter {
    fn resolve_conflict(&self, report: &ConflictReport) -> ConflictChoice {
        let _ = self.term.write_line(&format!(
            "{}",
            DANGER.apply_to(format!(
                "The published catalogue has {} items, the copy being saved has {}.",
                report.remote_items, report.local_items
            ))
        ));
        // --yes never overwrites a larger published catalogue
        if self.assume_yes {
            warn!("conflict resolved non-interactively: keeping the published copy");
            return ConflictChoice::TakeRemote;
        }
        match self.ask("Overwrite it with your copy? [y/N]") {
            Some(answer) if is_yes(&answer) => ConflictChoice::KeepLocal,
            _ => ConflictChoice::TakeRemote,
        }
    }

    fn confirm_empty_write(&self) -> bool {
        self.confirm("The catalogue is empty and no backup exists. Save it anyway?")
    }

    fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        self.ask(&format!("{question} [y/N]"))
            .is_some_and(|answer| is_yes(&answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_answers() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES\n"));
        assert!(!is_yes(""));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn assume_yes_confirms_but_keeps_published_copy() {
        let prompter = ConsolePrompter::new(true);
        assert!(prompter.confirm("Delete 1 item(s)?"));
        let report = ConflictReport {
            local_items: 1,
            remote_items: 5,
        };
        assert_eq!(prompter.resolve_conflict(&report), ConflictChoice::TakeRemote);
    }
}
