//! Compiler error codes the server reacts to.

pub const MODULE_NOT_FOUND: &str = "ModuleNotFound";

pub const HOLE_INFERRED_TYPE: &str = "HoleInferredType";

const IMPORT_CODES: &[&str] = &[
    "UnusedImport",
    "DuplicateImport",
    "UnusedExplicitImport",
    "UnusedDctorImport",
    "UnusedDctorExplicitImport",
    "ImplicitImport",
    "ImplicitQualifiedImport",
    "ImplicitQualifiedImportReExport",
    "HidingImport",
];

const UNKNOWN_TOKEN_CODES: &[&str] = &[
    "UnknownName",
    "UnknownValue",
    "UnknownType",
    "UnknownDataConstructor",
    "UnknownTypeConstructor",
    "UnknownClass",
];

/// Whether a suggestion for this code only touches import declarations.
#[must_use]
pub fn is_import_code(code: &str) -> bool {
    IMPORT_CODES.contains(&code)
}

/// Whether this code reports an identifier the compiler could not resolve.
#[must_use]
pub fn is_unknown_token_code(code: &str) -> bool {
    UNKNOWN_TOKEN_CODES.contains(&code)
}

/// Command title for applying the suggestion attached to an error with this code.
#[must_use]
pub fn suggestion_title(code: &str) -> &'static str {
    match code {
        "UnusedImport" | "DuplicateImport" => "Remove import",
        "UnusedExplicitImport" | "UnusedDctorImport" | "UnusedDctorExplicitImport" => {
            "Remove unused references"
        }
        "ImplicitImport"
        | "ImplicitQualifiedImport"
        | "ImplicitQualifiedImportReExport"
        | "HidingImport" => "Make import explicit",
        "MissingTypeDeclaration" => "Add type annotation",
        "MissingKindDeclaration" => "Add kind annotation",
        "WildcardInferredType" => "Replace wildcard with inferred type",
        _ => "Apply suggestion",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_codes() {
        assert!(is_import_code("UnusedImport"));
        assert!(is_import_code("ImplicitQualifiedImport"));
        assert!(!is_import_code("MissingTypeDeclaration"));
        assert!(!is_import_code("unusedimport"));
    }

    #[test]
    fn test_unknown_token_codes() {
        assert!(is_unknown_token_code("UnknownName"));
        assert!(is_unknown_token_code("UnknownDataConstructor"));
        assert!(!is_unknown_token_code(MODULE_NOT_FOUND));
    }

    #[test]
    fn test_suggestion_titles() {
        assert_eq!(suggestion_title("DuplicateImport"), "Remove import");
        assert_eq!(suggestion_title("HidingImport"), "Make import explicit");
        assert_eq!(suggestion_title("MissingTypeDeclaration"), "Add type annotation");
        assert_eq!(suggestion_title("ShadowedName"), "Apply suggestion");
    }
}
