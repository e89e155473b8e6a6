//! Quick-fix commands derived from cached compiler errors.

use lsp_types::{Command, Position, Range, Url};
use pursls_types::{
    HOLE_INFERRED_TYPE, MODULE_NOT_FOUND, RebuildError, is_import_code, is_unknown_token_code,
    suggestion_title,
};

use crate::commands::ServerCommand;
use crate::diagnostics::FileDiagnostic;
use crate::edits::Replacement;

pub const APPLY_ALL_TITLE: &str = "Apply all suggestions";
pub const APPLY_ALL_IMPORTS_TITLE: &str = "Apply all import suggestions";
pub const BUILD_TITLE: &str = "Run build";

fn before_or_equal(a: Position, b: Position) -> bool {
    (a.line, a.character) <= (b.line, b.character)
}

/// Whether `outer` contains `inner`, comparing (line, character) pairs.
#[must_use]
pub fn contains(outer: Range, inner: Range) -> bool {
    before_or_equal(outer.start, inner.start) && before_or_equal(inner.end, outer.end)
}

fn replacement_for(error: &RebuildError) -> Option<Replacement> {
    let suggestion = error.suggestion()?;
    let span = error.suggestion_span()?;
    Some(Replacement::new(suggestion.replacement(), span.to_range()))
}

/// Commands offered for `requested` in a file whose cached entries are `cached`.
///
/// Per-error commands come first, in cache order, followed by the file-wide
/// "apply all" commands. Overlapping triggers are not deduplicated.
#[must_use]
pub fn get_actions(uri: &Url, cached: &[FileDiagnostic], requested: Range) -> Vec<Command> {
    let mut actions = Vec::new();

    for entry in cached {
        let error = entry.error();
        let Some(position) = error.position() else {
            continue;
        };
        let error_range = position.to_range();
        if !contains(requested, error_range) {
            continue;
        }
        let code = error.error_code();

        if let Some(replacement) = replacement_for(error) {
            let command = ServerCommand::ReplaceSuggestion {
                uri: uri.clone(),
                replacement,
            };
            actions.push(command.to_lsp(suggestion_title(code)));
        }

        if code == MODULE_NOT_FOUND {
            actions.push(ServerCommand::Build.to_lsp(BUILD_TITLE));
        }

        if code == HOLE_INFERRED_TYPE
            && let Some(info) = error.extra_info()
        {
            for completion in &info.completions {
                let command = ServerCommand::FillTypedHole {
                    uri: uri.clone(),
                    range: error_range,
                    replacement: completion.identifier.clone(),
                };
                let title = format!("Fill hole with {}", completion.identifier);
                actions.push(command.to_lsp(title));
            }
        }

        if is_unknown_token_code(code) {
            let command = ServerCommand::FixTypo {
                uri: uri.clone(),
                line: error_range.start.line,
                column: error_range.start.character,
            };
            actions.push(command.to_lsp("Fix typo or import identifier"));
        }
    }

    let all: Vec<(&str, Replacement)> = cached
        .iter()
        .filter_map(|entry| {
            let error = entry.error();
            replacement_for(error).map(|r| (error.error_code(), r))
        })
        .collect();

    if !all.is_empty() {
        let command = ServerCommand::ReplaceAllSuggestions {
            uri: uri.clone(),
            replacements: all.iter().map(|(_, r)| r.clone()).collect(),
        };
        actions.push(command.to_lsp(APPLY_ALL_TITLE));
    }

    let imports: Vec<Replacement> = all
        .into_iter()
        .filter(|(code, _)| is_import_code(code))
        .map(|(_, r)| r)
        .collect();
    if !imports.is_empty() {
        let command = ServerCommand::ReplaceAllSuggestions {
            uri: uri.clone(),
            replacements: imports,
        };
        actions.push(command.to_lsp(APPLY_ALL_IMPORTS_TITLE));
    }

    actions
}
