#[cfg(test)]
mod resolver_tests {
    use vesper::error::VesperError;
    use vesper::pipeline;

    /// Run the full pipeline, capturing program output and diagnostics.
    fn run_program(source: &str) -> (String, Vec<VesperError>) {
        let mut out: Vec<u8> = Vec::new();
        let diagnostics = pipeline::run(source.as_bytes(), &mut out);

        (
            String::from_utf8(out).expect("interpreter output is UTF-8"),
            diagnostics,
        )
    }

    fn assert_static_error(source: &str, expected_message: &str) {
        let (output, diagnostics) = run_program(source);

        assert!(
            diagnostics
                .iter()
                .any(|e| e.to_string().contains(expected_message)),
            "expected a diagnostic containing '{}', got: {:?}",
            expected_message,
            diagnostics
        );

        // Static diagnostics must prevent execution from starting.
        assert_eq!(output, "", "no output may be produced: {:?}", output);
    }

    #[test]
    fn test_reading_local_in_its_own_initializer() {
        assert_static_error(
            "var a = 1; { var a = a; print a; }",
            "Cannot read local variable in its own initializer",
        );
    }

    #[test]
    fn test_duplicate_declaration_in_local_scope() {
        assert_static_error(
            "{ var a = 1; var a = 2; }",
            "Variable already declared in this scope",
        );
    }

    #[test]
    fn test_return_at_top_level() {
        assert_static_error("print 1; return 2;", "Cannot return from top-level code");
    }

    #[test]
    fn test_return_value_from_initializer() {
        assert_static_error(
            "class A { init() { return 5; } } print A();",
            "Cannot return a value from an initializer",
        );
    }

    #[test]
    fn test_bare_return_in_initializer_is_fine() {
        let (output, diagnostics) = run_program("class A { init() { return; } } print A();");

        assert!(diagnostics.is_empty(), "got: {:?}", diagnostics);
        assert_eq!(output, "A instance\n");
    }

    #[test]
    fn test_this_outside_class() {
        assert_static_error("print this;", "Cannot use 'this' outside of a class");
    }

    #[test]
    fn test_this_in_function_outside_class() {
        assert_static_error(
            "fun f() { return this; } print f();",
            "Cannot use 'this' outside of a class",
        );
    }

    #[test]
    fn test_super_outside_class() {
        assert_static_error("print super.m;", "Cannot use 'super' outside of a class");
    }

    #[test]
    fn test_super_without_superclass() {
        assert_static_error(
            "class A { m() { return super.m(); } } A().m();",
            "Cannot use 'super' in a class with no superclass",
        );
    }

    #[test]
    fn test_class_inheriting_from_itself() {
        assert_static_error("class A < A {}", "A class cannot inherit from itself");
    }

    #[test]
    fn test_this_in_static_method() {
        assert_static_error(
            "class A { class m() { return this; } } print A.m();",
            "Cannot use 'this' in a static method",
        );
    }

    #[test]
    fn test_super_in_static_method() {
        assert_static_error(
            "class A { m() { return 1; } } \
             class B < A { class m() { return super.m(); } } \
             print B.m();",
            "Cannot use 'super' in a static method",
        );
    }

    #[test]
    fn test_static_errors_accumulate() {
        let (output, diagnostics) = run_program("return 1; print this;");

        assert_eq!(diagnostics.len(), 2, "got: {:?}", diagnostics);
        assert_eq!(output, "");
    }

    #[test]
    fn test_shadowing_in_distinct_scopes_is_legal() {
        let (output, diagnostics) = run_program("var a = 1; { var a = 2; print a; } print a;");

        assert!(diagnostics.is_empty(), "got: {:?}", diagnostics);
        assert_eq!(output, "2\n1\n");
    }
}
