//! Tab completion and usage hints for the chordcubes REPL.

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;

use crate::patterns::Style;
use crate::session::COMMAND_WORDS;
use crate::staves::voicing::known_symbols;

#[derive(Default)]
pub struct ChordHelper;

impl ChordHelper {
    pub fn new() -> Self {
        Self
    }
}

/// Candidate words for the argument position of `command`.
fn argument_words(command: &str) -> Vec<String> {
    match command {
        "style" => Style::ALL.iter().map(|s| s.name().to_string()).collect(),
        "lock" => vec!["bass".into(), "melody".into()],
        "staves" => vec!["on".into(), "off".into()],
        "progression" | "prog" => known_symbols().map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

/// Start offset and candidates for completing `line` (text up to the cursor).
pub(crate) fn candidates(line: &str) -> (usize, Vec<String>) {
    let start = line.rfind(char::is_whitespace).map(|i| i + 1).unwrap_or(0);
    let prefix = &line[start..];
    let words: Vec<&str> = line[..start].split_whitespace().collect();

    let pool: Vec<String> = match words.first() {
        None => COMMAND_WORDS.iter().map(|w| w.to_string()).collect(),
        // progression takes any number of symbols; the others take one word
        Some(cmd) if words.len() == 1 || *cmd == "progression" || *cmd == "prog" => argument_words(cmd),
        Some(_) => Vec::new(),
    };
    let matches = pool.into_iter().filter(|w| w.starts_with(prefix)).collect();
    (start, matches)
}

fn usage_hint(line: &str) -> Option<&'static str> {
    let hint = match line {
        "bpm " => "<40..300>",
        "style " => "rock|jazz|electronic|funk|latin|hiphop",
        "lock " => "bass|melody",
        "chord " => "C4 E4 G4 [--dur 1.0]",
        "progression " => "I V vi IV",
        "staves " => "on|off",
        _ => return None,
    };
    Some(hint)
}

impl Completer for ChordHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, words) = candidates(&line[..pos]);
        let pairs = words
            .into_iter()
            .map(|w| Pair { display: w.clone(), replacement: w })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ChordHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<Self::Hint> {
        if pos != line.len() {
            return None;
        }
        usage_hint(line).map(str::to_string)
    }
}

impl Highlighter for ChordHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        // Dim the hint
        Cow::Owned(format!("\x1b[90m{}\x1b[0m", hint))
    }
}

impl Validator for ChordHelper {}

impl Helper for ChordHelper {}
