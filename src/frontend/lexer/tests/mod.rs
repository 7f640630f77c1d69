//! Scanner unit tests

use crate::frontend::lexer::tokens::{Keyword, Op, TokenKind};
use crate::frontend::lexer::{tokenize, Scanner};

mod basics {
    use super::*;

    #[test]
    fn test_empty_source() {
        let tokens = tokenize("");
        assert_eq!(tokens.len(), 1);
        assert!(matches!(tokens[0].kind, TokenKind::Eof));
    }

    #[test]
    fn test_whitespace_only() {
        let tokens = tokenize("  \t\r\n  ");
        assert_eq!(tokens.len(), 1);
        assert!(matches!(tokens[0].kind, TokenKind::Eof));
    }

    #[test]
    fn test_eof_is_idempotent() {
        let mut scanner = Scanner::new("a");
        assert!(matches!(scanner.next_token().kind, TokenKind::Identifier(_)));
        assert!(matches!(scanner.next_token().kind, TokenKind::Eof));
        assert!(matches!(scanner.next_token().kind, TokenKind::Eof));
    }

    #[test]
    fn test_line_and_column() {
        let tokens = tokenize("a\n  b");
        assert_eq!(tokens[0].span.start.line, 1);
        assert_eq!(tokens[0].span.start.column, 1);
        assert_eq!(tokens[1].span.start.line, 2);
        assert_eq!(tokens[1].span.start.column, 3);
    }

    #[test]
    fn test_line_comment() {
        let tokens = tokenize("a // trailing words\nb");
        assert_eq!(tokens.len(), 3);
        assert!(matches!(tokens[1].kind, TokenKind::Identifier(ref n) if n == "b"));
    }

    #[test]
    fn test_block_comment() {
        let tokens = tokenize("a /* x\ny */ b");
        assert_eq!(tokens.len(), 3);
        assert!(matches!(tokens[1].kind, TokenKind::Identifier(ref n) if n == "b"));
    }

    #[test]
    fn test_block_comment_is_not_nested() {
        // The first `*/` closes the comment; the rest is real input.
        let tokens = tokenize("/* /* */ x");
        assert_eq!(tokens.len(), 2);
        assert!(matches!(tokens[0].kind, TokenKind::Identifier(ref n) if n == "x"));
    }
}

mod words {
    use super::*;

    #[test]
    fn test_identifier() {
        let tokens = tokenize("my_var2");
        assert!(matches!(tokens[0].kind, TokenKind::Identifier(ref n) if n == "my_var2"));
    }

    #[test]
    fn test_keywords() {
        for (src, kw) in [
            ("int", Keyword::Int),
            ("var", Keyword::Var),
            ("while", Keyword::While),
            ("removeIndex", Keyword::RemoveIndex),
            ("self", Keyword::SelfValue),
            ("implement", Keyword::Implement),
        ] {
            let tokens = tokenize(src);
            assert!(
                matches!(tokens[0].kind, TokenKind::Keyword(k) if k == kw),
                "expected {src} to lex as keyword"
            );
        }
    }

    #[test]
    fn test_single_uppercase_is_generic_param() {
        let tokens = tokenize("T");
        assert!(matches!(tokens[0].kind, TokenKind::GenericParam('T')));
    }

    #[test]
    fn test_multi_letter_uppercase_is_identifier() {
        let tokens = tokenize("TU");
        assert!(matches!(tokens[0].kind, TokenKind::Identifier(ref n) if n == "TU"));
    }

    #[test]
    fn test_question_absorbed_into_word() {
        let tokens = tokenize("int? n");
        assert!(matches!(tokens[0].kind, TokenKind::Keyword(Keyword::Int)));
        assert_eq!(tokens[0].lexeme, "int?");
        assert!(tokens[0].absorbed_question());
        assert!(matches!(tokens[1].kind, TokenKind::Identifier(ref n) if n == "n"));
    }

    #[test]
    fn test_standalone_question_is_operator() {
        let tokens = tokenize(") ? 1 : 2");
        assert!(tokens[1].is_op(Op::Question));
    }
}

mod numbers {
    use super::*;

    #[test]
    fn test_int_literal() {
        let tokens = tokenize("420");
        assert!(matches!(tokens[0].kind, TokenKind::IntLiteral(420)));
    }

    #[test]
    fn test_float_literal() {
        let tokens = tokenize("3.25");
        assert!(matches!(tokens[0].kind, TokenKind::FloatLiteral(f) if f == 3.25));
    }

    #[test]
    fn test_dot_without_digit_is_member_access() {
        let tokens = tokenize("1.x");
        assert!(matches!(tokens[0].kind, TokenKind::IntLiteral(1)));
        assert!(tokens[1].is_op(Op::Dot));
    }

    #[test]
    fn test_exponent() {
        let tokens = tokenize("1e3 2.5E-2");
        assert!(matches!(tokens[0].kind, TokenKind::FloatLiteral(f) if f == 1000.0));
        assert!(matches!(tokens[1].kind, TokenKind::FloatLiteral(f) if f == 0.025));
    }

    #[test]
    fn test_exponent_requires_digits() {
        let tokens = tokenize("1e+");
        assert!(matches!(tokens[0].kind, TokenKind::Error(_)));
        assert!(matches!(tokens[1].kind, TokenKind::Eof));
    }
}

mod strings {
    use super::*;

    #[test]
    fn test_plain_string() {
        let tokens = tokenize(r#""hello""#);
        assert!(matches!(tokens[0].kind, TokenKind::StringLiteral(ref s) if s == "hello"));
    }

    #[test]
    fn test_escapes_decoded() {
        let tokens = tokenize(r#""a\n\t\r\"\\b""#);
        assert!(
            matches!(tokens[0].kind, TokenKind::StringLiteral(ref s) if s == "a\n\t\r\"\\b")
        );
    }

    #[test]
    fn test_unknown_escape_keeps_byte() {
        let tokens = tokenize(r#""a\qb""#);
        assert!(matches!(tokens[0].kind, TokenKind::StringLiteral(ref s) if s == "aqb"));
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = tokenize(r#""abc"#);
        assert!(matches!(tokens[0].kind, TokenKind::Error(_)));
    }
}

mod operators {
    use super::*;

    #[test]
    fn test_two_byte_operators() {
        let tokens = tokenize("== != <= >= && || ++ -- += -= *= /=");
        let expected = [
            Op::EqEq,
            Op::Neq,
            Op::Le,
            Op::Ge,
            Op::AndAnd,
            Op::OrOr,
            Op::PlusPlus,
            Op::MinusMinus,
            Op::PlusEq,
            Op::MinusEq,
            Op::StarEq,
            Op::SlashEq,
        ];
        for (token, op) in tokens.iter().zip(expected) {
            assert!(token.is_op(op), "expected {op:?}, got {:?}", token.kind);
        }
    }

    #[test]
    fn test_single_byte_operators() {
        let tokens = tokenize("+ - * / % = ! & | ; , . : ( ) { } [ ] < >");
        assert_eq!(tokens.len(), 22);
        assert!(tokens[0].is_op(Op::Plus));
        assert!(tokens[8].is_op(Op::Pipe));
        assert!(tokens[19].is_op(Op::Lt));
        assert!(tokens[20].is_op(Op::Gt));
    }

    #[test]
    fn test_unknown_byte_errors_and_advances() {
        let tokens = tokenize("@ a");
        assert!(matches!(tokens[0].kind, TokenKind::Error(_)));
        assert!(matches!(tokens[1].kind, TokenKind::Identifier(ref n) if n == "a"));
    }
}

mod generic_hint {
    use super::*;

    #[test]
    fn test_lt_after_generic_keyword() {
        let tokens = tokenize("generic<T>");
        assert!(tokens[1].is_op(Op::Lt));
        assert!(tokens[1].generic_open);
    }

    #[test]
    fn test_lt_after_uppercase_letter() {
        let tokens = tokenize("T < 3");
        assert!(tokens[1].is_op(Op::Lt));
        assert!(tokens[1].generic_open);
    }

    #[test]
    fn test_lt_after_plain_identifier() {
        let tokens = tokenize("x < 3");
        assert!(tokens[1].is_op(Op::Lt));
        assert!(!tokens[1].generic_open);
    }
}

mod round_trip {
    use super::*;

    // Concatenating raw lexemes reproduces the source with whitespace
    // and comments elided.
    #[test]
    fn test_lexemes_reproduce_source() {
        let source = "int? n = x? 1 : 2 while (n <= 10) { n += 2 }";
        let tokens = tokenize(source);
        let joined: String = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        let stripped: String = source.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        assert_eq!(joined, stripped);
    }

    #[test]
    fn test_comments_are_elided() {
        let tokens = tokenize("a /* mid */ b // tail\nc");
        let joined: String = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(joined, "abc");
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Progress: the scanner terminates with a single trailing Eof on
        // arbitrary byte soup.
        #[test]
        fn scanner_always_terminates(src in ".{0,256}") {
            let tokens = tokenize(&src);
            prop_assert!(matches!(tokens.last().unwrap().kind, TokenKind::Eof));
            let eof_count = tokens
                .iter()
                .filter(|t| matches!(t.kind, TokenKind::Eof))
                .count();
            prop_assert_eq!(eof_count, 1);
        }

        // Tokens come out strictly left to right.
        #[test]
        fn spans_are_monotonic(src in "[ -~]{0,256}") {
            let tokens = tokenize(&src);
            let mut prev = 0usize;
            for token in &tokens {
                prop_assert!(token.span.start.offset >= prev);
                prev = token.span.start.offset;
            }
        }
    }
}
