//! Compiler output through to quick fixes, without a daemon.

use std::path::PathBuf;

use lsp_types::{DiagnosticSeverity, Position, Range, Url};
use pursls_config::Settings;
use pursls_lsp::actions::{BUILD_TITLE, get_actions};
use pursls_lsp::diagnostics::convert;
use pursls_lsp::parser::{parse, parse_build_output};

fn root() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\project")
    } else {
        PathBuf::from("/project")
    }
}

const OUTPUT: &str = "Compiling A\n\
Compiling Main\n\
{\"errors\":[{\"errorCode\":\"ModuleNotFound\",\"message\":\"Module Data.Missing was not found.\",\
\"filename\":\"src/A.purs\",\"position\":{\"startLine\":2,\"startColumn\":1,\"endLine\":2,\"endColumn\":5},\
\"errorLink\":\"https://github.com/purescript/documentation/blob/master/errors/ModuleNotFound.md\"}],\
\"warnings\":[]}\n";

#[test]
fn test_noise_then_result_yields_build_action() {
    let result = parse(OUTPUT).unwrap();
    let conversion = convert(&root(), &Settings::default(), result);

    let path = root().join("src").join("A.purs");
    let cached = conversion.by_file.get(&path).unwrap();
    assert_eq!(cached.len(), 1);
    let diagnostic = cached[0].diagnostic();
    assert_eq!(
        diagnostic.range,
        Range::new(Position::new(1, 0), Position::new(1, 4))
    );
    assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
    assert_eq!(diagnostic.source.as_deref(), Some("PureScript"));
    assert!(diagnostic.code_description.is_some());

    let uri = Url::from_file_path(&path).unwrap();
    let actions = get_actions(
        &uri,
        cached,
        Range::new(Position::new(0, 0), Position::new(5, 0)),
    );
    let titles: Vec<&str> = actions.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec![BUILD_TITLE]);
}

#[test]
fn test_failing_build_exit_still_parsed() {
    let result = parse_build_output(Some(1), OUTPUT).unwrap();
    assert_eq!(result.errors.len(), 1);
    assert!(parse_build_output(Some(2), OUTPUT).is_err());
}

#[test]
fn test_files_are_keyed_under_root() {
    let result = parse(OUTPUT).unwrap();
    let conversion = convert(&root(), &Settings::default(), result);
    let root = root();
    assert!(conversion.by_file.keys().all(|p| p.starts_with(&root)));
}
