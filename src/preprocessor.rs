//! The macro preprocessor: directive dispatch, comment/whitespace handling,
//! and function-/object-like macro expansion, feeding the lexer with a
//! directive-free token stream.

pub mod directive;
pub mod driver;
pub mod error;
pub mod expand;
pub mod location;
pub mod store;

pub use driver::{preprocess, IncludeResolver, NoIncludes};
pub use error::{Diagnostic, ErrorKind, Severity};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_without_directives() {
        let (out, diags) = preprocess("int main() { return 0; }\n", 0, &NoIncludes);
        assert_eq!(out, "int main() { return 0; }\n");
        assert!(diags.is_empty());
    }

    #[test]
    fn object_like_macro_substitutes_body() {
        let (out, diags) = preprocess("#define X Y\nX\n", 0, &NoIncludes);
        assert_eq!(out.trim(), "Y");
        assert!(diags.is_empty());
    }

    #[test]
    fn function_like_macro_substitutes_arguments() {
        let (out, diags) = preprocess("#define ADD(a,b) a+b\nADD(1, 2)\n", 0, &NoIncludes);
        assert_eq!(out.trim(), "1+2");
        assert!(diags.is_empty());
    }

    #[test]
    fn token_paste_joins_operands() {
        let (out, diags) = preprocess("#define CAT(a,b) a ## b\nCAT(foo, bar)\n", 0, &NoIncludes);
        assert_eq!(out.trim(), "foobar");
        assert!(diags.is_empty());
    }

    #[test]
    fn stringify_escapes_quotes() {
        let (out, diags) = preprocess("#define STR(x) #x\nSTR(y z)\n", 0, &NoIncludes);
        assert_eq!(out.trim(), "\"y z\"");
        assert!(diags.is_empty());
    }

    #[test]
    fn redefining_a_define_macro_is_an_error() {
        let (_out, diags) = preprocess("#define X 1\n#define X 2\n", 0, &NoIncludes);
        assert!(diags.iter().any(|d| matches!(d.kind, ErrorKind::MacroNameRedefine(_))));
    }

    #[test]
    fn set_allows_redefinition() {
        let (out, diags) = preprocess("#set X 1\n#set X 2\nX\n", 0, &NoIncludes);
        assert_eq!(out.trim(), "2");
        assert!(!diags.iter().any(|d| matches!(d.kind, ErrorKind::MacroNameRedefine(_))));
    }

    #[test]
    fn undef_removes_the_macro() {
        let (out, _diags) = preprocess("#define X 1\n#undef X\nX\n", 0, &NoIncludes);
        assert_eq!(out.trim(), "X");
    }

    #[test]
    fn line_comment_is_blanked() {
        let (out, _diags) = preprocess("int x; // trailing\n", 0, &NoIncludes);
        assert!(out.starts_with("int x; "));
        assert!(!out.contains("trailing"));
    }

    #[test]
    fn block_comment_preserves_line_count() {
        let (out, _diags) = preprocess("/* a\nb */\nx\n", 0, &NoIncludes);
        assert_eq!(out.matches('\n').count(), 3);
    }
}
