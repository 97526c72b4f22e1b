#[cfg(test)]
mod interpreter_tests {
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

    /// Program must run cleanly; returns its output.
    fn run_ok(source: &str) -> String {
        let (output, diagnostics) = run_program(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        output
    }

    /// Program must fail at runtime; returns (output-before-failure, message).
    fn run_err(source: &str) -> (String, String) {
        let (output, diagnostics) = run_program(source);
        assert_eq!(diagnostics.len(), 1, "expected one runtime diagnostic: {:?}", diagnostics);
        assert!(diagnostics[0].is_runtime(), "not a runtime error: {}", diagnostics[0]);
        let message = diagnostics[0].to_string();
        (output, message)
    }

    // ── scoping and closures ───────────────────────────────────────────────

    #[test]
    fn test_shadowing_three_nesting_levels() {
        let source = r#"
            var a = "global a";
            var b = "global b";
            var c = "global c";
            {
              var a = "outer a";
              var b = "outer b";
              {
                var a = "inner a";
                print a;
                print b;
                print c;
              }
              print a;
              print b;
              print c;
            }
            print a;
            print b;
            print c;
        "#;

        assert_eq!(
            run_ok(source),
            "inner a\nouter b\nglobal c\n\
             outer a\nouter b\nglobal c\n\
             global a\nglobal b\nglobal c\n"
        );
    }

    #[test]
    fn test_closure_observes_definition_environment() {
        // The classic resolver check: the function printed the same binding
        // both times even though a shadowing declaration appeared between
        // the calls.
        let source = r#"
            var a = "global";
            {
              fun showA() {
                print a;
              }
              showA();
              var a = "block";
              showA();
            }
        "#;

        assert_eq!(run_ok(source), "global\nglobal\n");
    }

    #[test]
    fn test_counter_closure_keeps_state_after_scope_exit() {
        let source = r#"
            fun makeCounter() {
              var i = 0;
              fun count() {
                i = i + 1;
                print i;
              }
              return count;
            }
            var counter = makeCounter();
            counter();
            counter();
        "#;

        assert_eq!(run_ok(source), "1\n2\n");
    }

    // ── calls and arity ────────────────────────────────────────────────────

    #[test]
    fn test_arity_mismatch_reports_expected_vs_actual() {
        let (output, message) = run_err("fun f(a, b) { return a + b; } print f(1);");

        assert_eq!(output, "");
        assert!(
            message.contains("Expected 2 arguments but got 1"),
            "got: {}",
            message
        );
    }

    #[test]
    fn test_exact_arity_succeeds() {
        assert_eq!(run_ok("fun f(a, b) { return a + b; } print f(1, 2);"), "3\n");
    }

    #[test]
    fn test_calling_a_non_callable() {
        let (_output, message) = run_err("var x = 5; x();");

        assert!(
            message.contains("Can only call functions and classes"),
            "got: {}",
            message
        );
    }

    #[test]
    fn test_lambda_is_first_class() {
        let source = "var twice = fun (x) { return x + x; }; print twice(4);";
        assert_eq!(run_ok(source), "8\n");
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn test_return_unwinds_only_to_the_call_boundary() {
        let source = r#"
            fun find() {
              while (true) {
                return "found";
                print "unreachable";
              }
            }
            print find();
            print "after";
        "#;

        assert_eq!(run_ok(source), "found\nafter\n");
    }

    // ── classes, inheritance, super ────────────────────────────────────────

    #[test]
    fn test_super_binds_to_declaring_classes_parent() {
        let source = r#"
            class A { m() { return "A"; } }
            class B < A { m() { return "B"; } test() { return super.m(); } }
            class C < B {}
            print C().test();
        "#;

        assert_eq!(run_ok(source), "A\n");
    }

    #[test]
    fn test_method_override_dispatches_on_receiver() {
        let source = r#"
            class A { m() { return "A"; } }
            class B < A { m() { return "B"; } }
            class C < B {}
            print C().m();
        "#;

        assert_eq!(run_ok(source), "B\n");
    }

    #[test]
    fn test_super_method_sees_original_receiver_this() {
        let source = r#"
            class A { name() { return "instance of " + this.kind; } }
            class B < A {
              init() { this.kind = "B"; }
              name() { return super.name(); }
            }
            print B().name();
        "#;

        assert_eq!(run_ok(source), "instance of B\n");
    }

    #[test]
    fn test_initializer_returns_instance() {
        let source = r#"
            class P { init(x) { this.x = x; } }
            var p = P(5);
            print p.x;
            print p;
        "#;

        assert_eq!(run_ok(source), "5\nP instance\n");
    }

    #[test]
    fn test_bare_return_in_initializer_still_yields_instance() {
        let source = r#"
            class P {
              init(x) {
                this.x = x;
                return;
                this.x = 0;
              }
            }
            print P(7).x;
        "#;

        assert_eq!(run_ok(source), "7\n");
    }

    #[test]
    fn test_class_arity_comes_from_init() {
        let (_output, message) = run_err("class P { init(x) {} } P();");

        assert!(
            message.contains("Expected 1 arguments but got 0"),
            "got: {}",
            message
        );
    }

    #[test]
    fn test_getter_evaluates_immediately() {
        let source = r#"
            class Circle {
              init(r) { this.r = r; }
              area { return 3 * this.r * this.r; }
            }
            print Circle(2).area;
        "#;

        assert_eq!(run_ok(source), "12\n");
    }

    #[test]
    fn test_static_method_on_class_value() {
        let source = "class Math { class square(n) { return n * n; } } print Math.square(3);";

        assert_eq!(run_ok(source), "9\n");
    }

    #[test]
    fn test_static_method_not_reachable_through_instance() {
        let (_output, message) =
            run_err("class A { class m() { return 1; } } print A().m();");

        assert!(message.contains("Undefined property 'm'"), "got: {}", message);
    }

    #[test]
    fn test_static_method_closes_over_enclosing_locals() {
        let source = r#"
            {
              var factor = 10;
              class Scaler { class scale(n) { return n * factor; } }
              print Scaler.scale(3);
            }
        "#;

        assert_eq!(run_ok(source), "30\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let source = r#"
            class A { m() { return "method"; } }
            var a = A();
            a.m = "field";
            print a.m;
        "#;

        assert_eq!(run_ok(source), "field\n");
    }

    #[test]
    fn test_set_creates_field_on_the_instance_only() {
        let source = r#"
            class Base {}
            class Derived < Base {}
            var d = Derived();
            d.x = 1;
            print d.x;
        "#;

        assert_eq!(run_ok(source), "1\n");
    }

    #[test]
    fn test_last_method_declaration_wins() {
        let source = "class A { m() { return 1; } m() { return 2; } } print A().m();";

        assert_eq!(run_ok(source), "2\n");
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let (_output, message) = run_err("var NotAClass = 1; class A < NotAClass {}");

        assert!(message.contains("Superclass must be a class"), "got: {}", message);
    }

    #[test]
    fn test_undefined_property() {
        let (_output, message) = run_err("class A {} print A().missing;");

        assert!(
            message.contains("Undefined property 'missing'"),
            "got: {}",
            message
        );
    }

    #[test]
    fn test_property_access_on_non_instance() {
        let (_output, message) = run_err("var s = \"str\"; print s.size;");

        assert!(
            message.contains("Only instances have properties"),
            "got: {}",
            message
        );
    }

    // ── operators and semantics ────────────────────────────────────────────

    #[test]
    fn test_truthiness_nil_and_false_only() {
        let source = r#"
            print 0 ? "zero is truthy" : "zero is falsy";
            print "" ? "empty is truthy" : "empty is falsy";
            print nil ? "nil is truthy" : "nil is falsy";
            print false ? "false is truthy" : "false is falsy";
        "#;

        assert_eq!(
            run_ok(source),
            "zero is truthy\nempty is truthy\nnil is falsy\nfalse is falsy\n"
        );
    }

    #[test]
    fn test_logical_operators_yield_deciding_operand() {
        let source = r#"
            print 1 or 2;
            print nil or "fallback";
            print nil and 2;
            print 1 and 2;
        "#;

        assert_eq!(run_ok(source), "1\nfallback\nnil\n2\n");
    }

    #[test]
    fn test_logical_short_circuit_skips_right_operand() {
        let source = r#"
            fun shout() { print "evaluated"; return true; }
            false and shout();
            true or shout();
            print "done";
        "#;

        assert_eq!(run_ok(source), "done\n");
    }

    #[test]
    fn test_equality_has_no_coercion() {
        let source = r#"
            print 1 == 1;
            print nil == nil;
            print 1 == "1";
            print "a" == "a";
            print nil == false;
        "#;

        assert_eq!(run_ok(source), "true\ntrue\nfalse\ntrue\nfalse\n");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn test_plus_type_error_names_operator_and_operands() {
        let (_output, message) = run_err("print 1 + \"a\";");

        assert!(
            message.contains("Operands of '+' must be two numbers or two strings"),
            "got: {}",
            message
        );
        assert!(message.contains("got 1 and a"), "got: {}", message);
    }

    #[test]
    fn test_comparison_requires_numbers() {
        let (_output, message) = run_err("print \"a\" < \"b\";");

        assert!(
            message.contains("Operands of '<' must be numbers"),
            "got: {}",
            message
        );
    }

    #[test]
    fn test_division_follows_ieee() {
        assert_eq!(run_ok("print 1 / 0;"), "inf\n");
        assert_eq!(run_ok("print 10 / 4;"), "2.5\n");
    }

    #[test]
    fn test_comma_yields_rightmost_value() {
        assert_eq!(run_ok("print (1, 2, 3);"), "3\n");
    }

    #[test]
    fn test_comma_evaluates_left_operand_for_effect() {
        assert_eq!(run_ok("var a = 0; print (a = 5, a + 1);"), "6\n");
    }

    #[test]
    fn test_ternary_picks_branch_by_truthiness() {
        assert_eq!(run_ok("print 1 ? 2 : 3; print nil ? 2 : 3;"), "2\n3\n");
    }

    // ── runtime errors and fail-fast behavior ──────────────────────────────

    #[test]
    fn test_undefined_variable_is_fatal() {
        let (output, message) = run_err("print 1; print missing; print 2;");

        // Fail-fast: the first statement ran, the third never did.
        assert_eq!(output, "1\n");
        assert!(
            message.contains("Undefined variable 'missing'"),
            "got: {}",
            message
        );
    }

    #[test]
    fn test_unary_minus_requires_number() {
        let (_output, message) = run_err("print -\"oops\";");

        assert!(
            message.contains("Operand of '-' must be a number"),
            "got: {}",
            message
        );
    }

    // ── loops and printing ─────────────────────────────────────────────────

    #[test]
    fn test_for_loop_counts() {
        assert_eq!(
            run_ok("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn test_while_loop_with_assignment_condition() {
        let source = r#"
            var i = 3;
            while (i > 0) {
              print i;
              i = i - 1;
            }
        "#;

        assert_eq!(run_ok(source), "3\n2\n1\n");
    }

    #[test]
    fn test_print_formatting() {
        let source = r#"
            print 3;
            print 2.5;
            print "plain";
            print true;
            print nil;
            fun f() {}
            print f;
            print clock;
            var g = fun () { return 1; };
            print g;
            class K {}
            print K;
            print K();
        "#;

        assert_eq!(
            run_ok(source),
            "3\n2.5\nplain\ntrue\nnil\n<fn f>\n<native fn clock>\n<fn>\nK\nK instance\n"
        );
    }

    #[test]
    fn test_clock_native_returns_a_number() {
        assert_eq!(run_ok("print clock() > 0;"), "true\n");
    }

    #[test]
    fn test_implicit_print_quirk_executes() {
        // The parser's no-semicolon quirk reaches the runtime as a print.
        assert_eq!(run_ok("1 + 2"), "3\n");
    }
}
