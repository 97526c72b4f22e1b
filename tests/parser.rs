#[cfg(test)]
mod parser_tests {
    use vesper::ast_printer::AstPrinter;
    use vesper::parser::Parser;
    use vesper::scanner::Scanner;
    use vesper::token::Token;

    /// Scan + parse, rendering statements through the AST printer and
    /// diagnostics through Display.
    fn parse_to_strings(source: &str) -> (Vec<String>, Vec<String>) {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .filter_map(Result::ok)
            .collect();

        let (statements, diagnostics) = Parser::new(&tokens).parse();

        (
            statements.iter().map(AstPrinter::print_stmt).collect(),
            diagnostics.iter().map(|e| e.to_string()).collect(),
        )
    }

    #[test]
    fn test_arithmetic_precedence() {
        let (stmts, diags) = parse_to_strings("8 == 1 * 5 + 1;");

        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
        assert_eq!(stmts, vec!["(expr (== 8 (+ (* 1 5) 1)))"]);
    }

    #[test]
    fn test_unary_binds_tighter_than_factor() {
        let (stmts, diags) = parse_to_strings("-1 * !x;");

        assert!(diags.is_empty());
        assert_eq!(stmts, vec!["(expr (* (- 1) (! x)))"]);
    }

    #[test]
    fn test_ternary_nests_to_the_right() {
        let (stmts, diags) = parse_to_strings("1 ? 2 ? 3 : 4 : 5;");

        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
        assert_eq!(stmts, vec!["(expr (?: 1 (?: 2 3 4) 5))"]);
    }

    #[test]
    fn test_stray_colon_is_reported() {
        let (_stmts, diags) = parse_to_strings("1 : 2;");

        assert_eq!(diags.len(), 1);
        assert!(
            diags[0].contains("Cannot find corresponding '?' for ':'"),
            "got: {}",
            diags[0]
        );
    }

    #[test]
    fn test_unmatched_question_reported_at_opening_token() {
        let (_stmts, diags) = parse_to_strings("1 +\n1 ? 2;");

        assert_eq!(diags.len(), 1);
        assert!(
            diags[0].contains("Cannot find corresponding ':' for '?'"),
            "got: {}",
            diags[0]
        );
        // Reported at the '?' on line 2, not at the statement start.
        assert!(diags[0].contains("[line 2]"), "got: {}", diags[0]);
    }

    #[test]
    fn test_comma_sequence_is_lowest_precedence() {
        let (stmts, diags) = parse_to_strings("1 + 2, 3;");

        assert!(diags.is_empty());
        assert_eq!(stmts, vec!["(expr (, (+ 1 2) 3))"]);
    }

    #[test]
    fn test_invalid_assignment_target_is_non_fatal() {
        let (stmts, diags) = parse_to_strings("1 + 2 = 3; print 4;");

        assert_eq!(diags.len(), 1);
        assert!(diags[0].contains("Invalid assignment target"), "got: {}", diags[0]);

        // Parsing continued in place: both statements survived.
        assert_eq!(stmts, vec!["(expr (+ 1 2))", "(print 4)"]);
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let (stmts, diags) = parse_to_strings("a = b = 1;");

        assert!(diags.is_empty());
        assert_eq!(stmts, vec!["(expr (= a (= b 1)))"]);
    }

    #[test]
    fn test_property_assignment_becomes_set() {
        let (stmts, diags) = parse_to_strings("a.b = 1;");

        assert!(diags.is_empty());
        assert_eq!(stmts, vec!["(expr (set (. a b) 1))"]);
    }

    #[test]
    fn test_bare_expression_becomes_implicit_print() {
        // Documented quirk: no trailing ';' promotes the expression to print.
        let (stmts, diags) = parse_to_strings("1 + 2");

        assert!(diags.is_empty());
        assert_eq!(stmts, vec!["(print (+ 1 2))"]);
    }

    #[test]
    fn test_for_desugars_into_block_and_while() {
        let (stmts, diags) = parse_to_strings("for (var i = 0; i < 3; i = i + 1) print i;");

        assert!(diags.is_empty());
        assert_eq!(
            stmts,
            vec!["(block (var i 0) (while (< i 3) (block (print i) (expr (= i (+ i 1))))))"]
        );
    }

    #[test]
    fn test_for_with_empty_clauses_defaults_condition_to_true() {
        let (stmts, diags) = parse_to_strings("for (;;) print 1;");

        assert!(diags.is_empty());
        assert_eq!(stmts, vec!["(while true (print 1))"]);
    }

    #[test]
    fn test_class_members_statics_and_getters() {
        let source = "class Circle < Shape { \
                      class origin() { return 0; } \
                      area { return 1; } \
                      scale(f) { return f; } }";
        let (stmts, diags) = parse_to_strings(source);

        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
        assert_eq!(
            stmts,
            vec![
                "(class Circle < Shape \
                 (static origin () (return 0)) \
                 (getter area (return 1)) \
                 (fun scale (f) (return f)))"
            ]
        );
    }

    #[test]
    fn test_lambda_in_primary_position() {
        let (stmts, diags) = parse_to_strings("var f = fun (a, b) { return a; };");

        assert!(diags.is_empty());
        assert_eq!(stmts, vec!["(var f (fun (a b) (return a)))"]);
    }

    #[test]
    fn test_super_access() {
        let (stmts, diags) = parse_to_strings("class B < A { m() { return super.m(); } }");

        assert!(diags.is_empty());
        assert_eq!(
            stmts,
            vec!["(class B < A (fun m () (return (call (super m)))))"]
        );
    }

    #[test]
    fn test_recovery_yields_one_diagnostic_per_malformed_statement() {
        let (stmts, diags) = parse_to_strings("var = 1; var x = 2;");

        // The malformed declaration produced exactly one diagnostic, and
        // parsing resumed at the next statement boundary.
        assert_eq!(diags.len(), 1);
        assert!(diags[0].contains("Expected variable name"), "got: {}", diags[0]);
        assert_eq!(stmts, vec!["(var x 2)"]);
    }

    #[test]
    fn test_call_arguments_use_assignment_tier() {
        // ',' separates arguments instead of forming a sequence expression.
        let (stmts, diags) = parse_to_strings("f(1, 2);");

        assert!(diags.is_empty());
        assert_eq!(stmts, vec!["(expr (call f 1 2))"]);
    }

    #[test]
    fn test_printer_is_deterministic() {
        let tokens: Vec<Token> = Scanner::new(b"1 ? 2 : 3 + f(x.y, -4);".as_slice())
            .filter_map(Result::ok)
            .collect();

        let (statements, diagnostics) = Parser::new(&tokens).parse();
        assert!(diagnostics.is_empty());
        assert_eq!(statements.len(), 1);

        let first = AstPrinter::print_stmt(&statements[0]);
        let second = AstPrinter::print_stmt(&statements[0]);
        assert_eq!(first, second);
    }
}
