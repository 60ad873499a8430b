use loxide as lox;

use lox::interpreter::{Completion, Interpreter, Sink};
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;

/// Run a program through the whole pipeline, capturing `print` output.
fn try_run(source: &str) -> Result<(String, Completion), String> {
    let tokens = Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    let statements = Parser::new(tokens)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    let locals = Resolver::new()
        .resolve(&statements)
        .map_err(|errors| errors[0].to_string())?;

    let sink = Sink::buffer();
    let mut interpreter = Interpreter::with_sink(sink.clone());

    let completion = interpreter
        .interpret(&statements, locals)
        .map_err(|e| e.to_string())?;

    Ok((sink.contents(), completion))
}

fn run(source: &str) -> String {
    let (output, completion) = try_run(source).expect("program failed");
    assert_eq!(completion, Completion::Finished);
    output
}

fn run_err(source: &str) -> String {
    try_run(source).expect_err("program unexpectedly succeeded")
}

// ───────────────────────── truthiness & equality ────────────────────────────

#[test]
fn zero_is_falsy() {
    assert_eq!(run(r#"if (0) print "a"; else print "b";"#), "b");
}

#[test]
fn empty_string_is_truthy() {
    assert_eq!(run(r#"if ("") print "a"; else print "b";"#), "a");
}

#[test]
fn nil_and_false_are_falsy() {
    assert_eq!(run(r#"if (nil) print "a"; else print "b";"#), "b");
    assert_eq!(run(r#"if (false) print "a"; else print "b";"#), "b");
}

#[test]
fn numeric_equality_ignores_spelling() {
    assert_eq!(run("print 1 == 1.0;"), "true");
    assert_eq!(run("print nil == nil;"), "true");
    assert_eq!(run("print nil == 0;"), "false");
    assert_eq!(run(r#"print "a" == "a";"#), "true");
    assert_eq!(run(r#"print 1 == "1";"#), "false");
}

#[test]
fn user_defined_equals_overrides_identity() {
    let source = r#"
        class Point {
            init(x) { this.x = x; }
            equals(other) { return this.x == other.x; }
        }
        print Point(1) == Point(1);
        print Point(1) == Point(2);
    "#;
    assert_eq!(run(source), "truefalse");
}

#[test]
fn instances_compare_by_identity_without_equals() {
    let source = r#"
        class Empty {}
        var a = Empty();
        var b = a;
        print a == b;
        print a == Empty();
    "#;
    assert_eq!(run(source), "truefalse");
}

// ───────────────────────── operators ────────────────────────────────────────

#[test]
fn arithmetic_and_comparison() {
    assert_eq!(run("print 1 + 2 * 3;"), "7");
    assert_eq!(run("print (1 + 2) * 3;"), "9");
    assert_eq!(run("print 7 / 2;"), "3.5");
    assert_eq!(run("print 3 > 2;"), "true");
    assert_eq!(run("print 2 <= 2;"), "true");
    assert_eq!(run("print -3;"), "-3");
}

#[test]
fn plus_concatenates_when_either_side_is_a_string() {
    assert_eq!(run(r#"print "a" + "b";"#), "ab");
    assert_eq!(run(r#"print "n=" + 4;"#), "n=4");
    assert_eq!(run(r#"print 4 + "!";"#), "4!");
}

#[test]
fn plus_rejects_number_and_non_string() {
    let err = run_err("print 1 + nil;");
    assert!(err.contains("Operands must be two numbers or two strings"));
}

#[test]
fn arithmetic_rejects_non_numbers() {
    let err = run_err(r#"print "a" - "b";"#);
    assert!(err.contains("Operands must be a number"));

    let err = run_err("print nil > 1;");
    assert!(err.contains("Operands must be a number"));
}

#[test]
fn word_logicals_short_circuit() {
    let source = r#"
        var called = 0;
        fn side() { called = called + 1; return true; }
        var a = false and side();
        var b = true or side();
        print called;
        print a;
        print b;
    "#;
    assert_eq!(run(source), "0falsetrue");
}

#[test]
fn symbolic_logicals_short_circuit_identically() {
    let source = r#"
        var called = 0;
        fn side() { called = called + 1; return true; }
        var a = false & side();
        var b = true | side();
        print called;
        print a;
        print b;
    "#;
    assert_eq!(run(source), "0falsetrue");
}

#[test]
fn logicals_return_operands_not_booleans() {
    assert_eq!(run("print 0 | 3;"), "3");
    assert_eq!(run("print 1 & 2;"), "2");
    assert_eq!(run(r#"print nil or "fallback";"#), "fallback");
}

// ───────────────────────── variables & closures ─────────────────────────────

#[test]
fn block_scoping_shadows_and_restores() {
    let source = r#"
        var x = "outer";
        {
            var x = "inner";
            print x;
        }
        print x;
    "#;
    assert_eq!(run(source), "innerouter");
}

#[test]
fn assignment_to_undeclared_is_an_error() {
    let err = run_err("missing = 1;");
    assert!(err.contains("Undefined variable 'missing'"));
}

#[test]
fn first_global_self_reference_reads_nil() {
    assert_eq!(run("var x = x; print x;"), "nil");
}

#[test]
fn global_self_reference_reads_previous_binding() {
    assert_eq!(run("var x = 1; var x = x + 1; print x;"), "2");
}

#[test]
fn closures_capture_their_defining_frame() {
    let source = r#"
        fn counter() {
            var n = 0;
            return || { n = n + 1; return n; };
        }
        var a = counter();
        var b = counter();
        print a();
        print a();
        print b();
    "#;
    assert_eq!(run(source), "121");
}

#[test]
fn closures_from_one_call_share_state() {
    let source = r#"
        var bump = nil;
        var read = nil;
        fn pair() {
            var n = 0;
            fn inc() { n = n + 1; return n; }
            fn get() { return n; }
            bump = inc;
            read = get;
        }
        pair();
        bump();
        bump();
        print read();
    "#;
    assert_eq!(run(source), "2");
}

#[test]
fn lambda_values_are_first_class() {
    let source = r#"
        var add = |a, b| { return a + b; };
        print add(1, 2);
        fn apply(f, x) { return f(x); }
        print apply(|n| { return n * n; }, 5);
    "#;
    assert_eq!(run(source), "325");
}

// ───────────────────────── functions & calls ────────────────────────────────

#[test]
fn function_returns_nil_without_return() {
    assert_eq!(run("fn f() {} print f();"), "nil");
}

#[test]
fn call_arity_is_exact() {
    let err = run_err("fn f(a) { return a; } f(1, 2);");
    assert!(err.contains("Expected 1 arguments but got 2"));

    let err = run_err("fn g(a, b) { return a; } g(1);");
    assert!(err.contains("Expected 2 arguments but got 1"));
}

#[test]
fn only_callables_can_be_called() {
    let err = run_err(r#"var x = 3; x();"#);
    assert!(err.contains("Can only call functions and classes"));
}

#[test]
fn recursion_works_within_the_ceiling() {
    let source = r#"
        fn fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(10);
    "#;
    assert_eq!(run(source), "55");
}

#[test]
fn runaway_recursion_is_a_stack_overflow() {
    let err = run_err("fn f() { f(); } f();");
    assert!(err.contains("Stack overflow"));
}

#[test]
fn stack_overflow_is_never_rescued() {
    let source = r#"
        fn f() { f(); }
        try { f(); } catch (RuntimeError e) { print "rescued"; }
    "#;
    let err = run_err(source);
    assert!(err.contains("Stack overflow"));
}

#[test]
fn unbounded_loops_hit_the_same_ceiling() {
    let err = run_err("var i = 0; while (i < 100000) { i = i + 1; }");
    assert!(err.contains("Stack overflow"));
}

#[test]
fn short_loops_run_to_completion() {
    let source = r#"
        var total = 0;
        for (var i = 1; i <= 10; i = i + 1) { total = total + i; }
        print total;
    "#;
    assert_eq!(run(source), "55");
}

// ───────────────────────── classes & inheritance ────────────────────────────

#[test]
fn fields_are_created_on_first_assignment() {
    let source = r#"
        class Box {}
        var box = Box();
        box.value = 9;
        print box.value;
    "#;
    assert_eq!(run(source), "9");
}

#[test]
fn undefined_property_is_an_error() {
    let err = run_err("class Box {} print Box().missing;");
    assert!(err.contains("Undefined property 'missing'"));
}

#[test]
fn only_instances_have_properties() {
    let err = run_err("var x = 1; print x.y;");
    assert!(err.contains("Only instances can have properties"));

    let err = run_err(r#"var x = "s"; x.y = 1;"#);
    assert!(err.contains("Only instances have fields"));
}

#[test]
fn initializer_result_is_always_the_instance() {
    let source = r#"
        class C {
            init() {
                this.v = 1;
                return;
            }
        }
        var c = C();
        print c.v;
    "#;
    assert_eq!(run(source), "1");
}

#[test]
fn instances_share_reference_semantics() {
    let source = r#"
        class Box {}
        var a = Box();
        var b = a;
        b.value = 5;
        print a.value;
    "#;
    assert_eq!(run(source), "5");
}

#[test]
fn methods_resolve_through_the_superclass_chain() {
    let source = r#"
        class A { hello() { return "A"; } }
        class B < A {}
        print B().hello();
    "#;
    assert_eq!(run(source), "A");
}

#[test]
fn subclass_methods_shadow_ancestors() {
    let source = r#"
        class A { hello() { return "A"; } }
        class B < A { hello() { return "B"; } }
        print B().hello();
    "#;
    assert_eq!(run(source), "B");
}

#[test]
fn super_calls_the_ancestor_with_the_subclass_this() {
    let source = r#"
        class A {
            name() { return "A:" + this.tag; }
        }
        class B < A {
            init() { this.tag = "b"; }
            name() { return "B"; }
            viaSuper() { return super.name(); }
        }
        print B().viaSuper();
    "#;
    assert_eq!(run(source), "A:b");
}

#[test]
fn superclass_must_be_a_class() {
    let err = run_err("var NotAClass = 1; class C < NotAClass {}");
    assert!(err.contains("Superclass must be a class"));
}

#[test]
fn bound_methods_remember_their_instance() {
    let source = r#"
        class Greeter {
            init(name) { this.name = name; }
            greet() { return "hi " + this.name; }
        }
        var method = Greeter("ada").greet;
        print method();
    "#;
    assert_eq!(run(source), "hi ada");
}

#[test]
fn to_string_hook_drives_stringification() {
    let source = r#"
        class Point {
            init(x) { this.x = x; }
            toString() { return "Point(" + this.x + ")"; }
        }
        print Point(7);
        print "at " + Point(3);
    "#;
    assert_eq!(run(source), "Point(7)at Point(3)");
}

#[test]
fn plain_instances_print_their_class() {
    assert_eq!(run("class Box {} print Box();"), "<instance Box>");
    assert_eq!(run("class Box {} print Box;"), "<class Box>");
    assert_eq!(run("fn f() {} print f;"), "<fn f>");
}

// ───────────────────────── errors & control transfer ────────────────────────

#[test]
fn throw_and_catch_by_exact_class() {
    let source = r#"
        class SomeError < RuntimeError {
            init(m) { this.m = m; }
            message() { return this.m; }
        }
        try { throw SomeError("x"); } catch (SomeError e) { print e.message(); }
    "#;
    assert_eq!(run(source), "x");
}

#[test]
fn catch_matches_thrown_subclasses_of_the_named_type() {
    let source = r#"
        class Base < RuntimeError {}
        class Derived < Base {}
        try { throw Derived(); } catch (Base e) { print e.getType(); }
    "#;
    assert_eq!(run(source), "RuntimeError");
}

#[test]
fn catch_runtime_error_matches_everything() {
    let source = r#"
        class SomeError < RuntimeError {}
        try { throw SomeError(); } catch (RuntimeError e) { print "caught"; }
    "#;
    assert_eq!(run(source), "caught");
}

#[test]
fn first_matching_clause_wins() {
    let source = r#"
        class SomeError < RuntimeError {}
        try { throw SomeError(); }
        catch (SomeError e) { print "specific"; }
        catch (RuntimeError e) { print "general"; }
    "#;
    assert_eq!(run(source), "specific");
}

#[test]
fn clauses_may_list_several_error_types() {
    let source = r#"
        class E1 < RuntimeError {}
        class E2 < RuntimeError {}
        try { throw E2(); } catch (E1, E2 e) { print "caught"; }
    "#;
    assert_eq!(run(source), "caught");
}

#[test]
fn unmatched_errors_propagate() {
    let source = r#"
        class E1 < RuntimeError {}
        class E2 < RuntimeError {}
        try { throw E1(); } catch (E2 e) { print "wrong"; }
    "#;
    let err = run_err(source);
    assert!(err.contains("E1"));
    assert!(err.contains("No message defined"));
}

#[test]
fn interpreter_faults_surface_as_error_instances() {
    let source = r#"
        try { print missing; }
        catch (InterpreterRuntimeError e) {
            print e.getType();
            print " / ";
            print e.message();
        }
    "#;
    assert_eq!(
        run(source),
        "InterpreterRuntimeError / Undefined variable 'missing'"
    );
}

#[test]
fn faults_match_catch_runtime_error_too() {
    let source = r#"
        try { print 1 + nil; } catch (RuntimeError e) { print e.message(); }
    "#;
    assert_eq!(run(source), "Operands must be two numbers or two strings");
}

#[test]
fn throw_requires_an_error_instance() {
    let err = run_err("throw 5;");
    assert!(err.contains("Only objects extending 'RuntimeError' can be thrown"));
}

#[test]
fn throwing_a_non_error_is_uncatchable() {
    let source = r#"
        class Plain {}
        try { throw Plain(); } catch (RuntimeError e) { print "rescued"; }
    "#;
    let err = run_err(source);
    assert!(err.contains("Only objects extending 'RuntimeError' can be thrown"));
}

#[test]
fn finally_runs_after_a_clean_body() {
    let source = r#"
        try { print "body"; } finally { print "finally"; }
    "#;
    assert_eq!(run(source), "bodyfinally");
}

#[test]
fn finally_runs_when_an_error_is_rescued() {
    let source = r#"
        class E < RuntimeError {}
        try { throw E(); } catch (E e) { print "caught"; } finally { print "finally"; }
    "#;
    assert_eq!(run(source), "caughtfinally");
}

#[test]
fn finally_runs_while_an_error_propagates() {
    let source = r#"
        class E < RuntimeError {}
        fn f() {
            try { throw E(); } finally { print "cleanup"; }
        }
        try { f(); } catch (E e) { print "outer"; }
    "#;
    assert_eq!(run(source), "cleanupouter");
}

#[test]
fn finally_runs_with_a_return_in_flight() {
    let source = r#"
        fn f() {
            try { return 1; } finally { print "ran"; }
        }
        print f();
    "#;
    assert_eq!(run(source), "ran1");
}

#[test]
fn a_signal_from_finally_supersedes_the_one_in_flight() {
    let source = r#"
        fn f() {
            try { return 1; } finally { return 2; }
        }
        print f();
    "#;
    assert_eq!(run(source), "2");
}

// ───────────────────────── exit ─────────────────────────────────────────────

#[test]
fn exit_carries_its_code_to_the_top() {
    let (_, completion) = try_run("exit 2;").expect("run failed");
    assert_eq!(completion, Completion::Exit(2));
}

#[test]
fn exit_defaults_to_code_zero() {
    let (_, completion) = try_run("exit;").expect("run failed");
    assert_eq!(completion, Completion::Exit(0));
}

#[test]
fn exit_escapes_any_nesting_depth_and_catch_clauses() {
    let source = r#"
        fn deep() {
            try { exit 3; } catch (RuntimeError e) { print "no"; }
        }
        fn outer() { deep(); }
        outer();
        print "unreachable";
    "#;
    let (output, completion) = try_run(source).expect("run failed");
    assert_eq!(completion, Completion::Exit(3));
    assert_eq!(output, "");
}

#[test]
fn finally_still_runs_before_exit_takes_effect() {
    let source = r#"
        try { exit 1; } finally { print "cleanup"; }
    "#;
    let (output, completion) = try_run(source).expect("run failed");
    assert_eq!(completion, Completion::Exit(1));
    assert_eq!(output, "cleanup");
}

#[test]
fn non_integer_exit_codes_are_faults() {
    let err = run_err("exit 1.5;");
    assert!(err.contains("Exit code must be an integer"));

    let err = run_err(r#"exit "two";"#);
    assert!(err.contains("Invalid exit code"));
}

// ───────────────────────── builtins ─────────────────────────────────────────

#[test]
fn println_appends_a_newline_print_does_not() {
    assert_eq!(run(r#"print "a"; print "b";"#), "ab");
    assert_eq!(run(r#"println("a"); println("b");"#), "a\nb\n");
}

#[test]
fn get_var_reads_by_name() {
    let source = r#"
        var answer = 42;
        print getVar("answer");
    "#;
    assert_eq!(run(source), "42");
}

#[test]
fn get_property_reads_instance_fields_by_name() {
    let source = r#"
        class Box { init(v) { this.v = v; } }
        print getProperty(Box(9), "v");
        print getProperty(1, "v");
    "#;
    assert_eq!(run(source), "9nil");
}

#[test]
fn clock_returns_a_number() {
    assert_eq!(run("print clock() > 0;"), "true");
}

#[test]
fn base_error_class_answers_the_uniform_protocol() {
    let source = r#"
        var e = RuntimeError();
        print e.message();
        print "/";
        print e.getType();
    "#;
    assert_eq!(run(source), "No message defined/RuntimeError");
}

// ───────────────────────── stringification ──────────────────────────────────

#[test]
fn numbers_print_without_trailing_zero_fraction() {
    assert_eq!(run("print 3.0;"), "3");
    assert_eq!(run("print 3.5;"), "3.5");
    assert_eq!(run("print 0;"), "0");
}

#[test]
fn division_by_zero_follows_ieee() {
    assert_eq!(run("print 1 / 0;"), "inf");
}
