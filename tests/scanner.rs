#[cfg(test)]
mod scanner_tests {
    use loxide as lox;

    use lox::scanner::*;
    use lox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_logical_aliases() {
        assert_token_sequence(
            "a & b | c",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::AMPERSAND, "&"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::PIPE, "|"),
                (TokenType::IDENTIFIER, "c"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords() {
        assert_token_sequence(
            "try catch finally throw exit include import fn",
            &[
                (TokenType::TRY, "try"),
                (TokenType::CATCH, "catch"),
                (TokenType::FINALLY, "finally"),
                (TokenType::THROW, "throw"),
                (TokenType::EXIT, "exit"),
                (TokenType::INCLUDE, "include"),
                (TokenType::IMPORT, "import"),
                (TokenType::FUN, "fn"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >=",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_literals() {
        let scanner = Scanner::new(b"123 3.14 \"hello\" ident");
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert!(matches!(tokens[0].token_type, TokenType::NUMBER(n) if n == 123.0));
        assert!(matches!(tokens[1].token_type, TokenType::NUMBER(n) if (n - 3.14).abs() < 1e-9));
        assert!(matches!(&tokens[2].token_type, TokenType::STRING(s) if s == "hello"));
        assert_eq!(tokens[3].token_type, TokenType::IDENTIFIER);
        assert_eq!(tokens[3].lexeme, "ident");
    }

    #[test]
    fn test_scanner_06_comments_and_lines() {
        let scanner = Scanner::new(b"one // a comment\ntwo");
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 3); // one, two, EOF
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_scanner_07_unexpected_character() {
        let scanner = Scanner::new(b",.$(");
        let results: Vec<_> = scanner.collect();

        // COMMA, DOT, error for '$', LEFT_PAREN, EOF
        assert_eq!(results.len(), 5);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);

        let err = results
            .iter()
            .find_map(|r| r.as_ref().err())
            .expect("expected a lex error");
        assert!(err.to_string().contains("Unexpected character"));
    }

    #[test]
    fn test_scanner_08_unterminated_string() {
        let scanner = Scanner::new(b"\"never closed");
        let results: Vec<_> = scanner.collect();

        let err = results
            .iter()
            .find_map(|r| r.as_ref().err())
            .expect("expected a lex error");
        assert!(err.to_string().contains("Unterminated string"));
    }

    #[test]
    fn test_scanner_09_token_identity_ignores_location() {
        let a = Token::new(
            TokenType::IDENTIFIER,
            "x",
            std::rc::Rc::from(""),
            std::rc::Rc::from("a.lox"),
            1,
        );
        let b = Token::new(
            TokenType::IDENTIFIER,
            "x",
            std::rc::Rc::from("dir"),
            std::rc::Rc::from("b.lox"),
            99,
        );

        assert_eq!(a, b);
    }
}
