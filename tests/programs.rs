//! Whole programs driven through the public interpreter API

#![expect(clippy::unwrap_used)] // test code OK

use atto::value::{nil, val};
use atto::{Config, EvalErrorKind, Interpreter, ParseErrorKind, ScriptedConsole, Value};
use pretty_assertions::assert_eq;

const FIZZBUZZ: &str = include_str!("../demos/fizzbuzz.at");
const SUM: &str = include_str!("../demos/sum.at");
const PRIMES: &str = include_str!("../demos/primes.at");

fn eval(expression: &str) -> Result<Value, atto::Error> {
    let interpreter = Interpreter::new().unwrap();
    interpreter.eval_expression(expression, &mut ScriptedConsole::default())
}

#[test]
fn test_documented_properties() {
    let test_cases: Vec<(&str, Value)> = vec![
        ("+ 5 7", val(12)),
        ("- * 3 3 5", val(4)),
        ("pair 3 17", val([3, 17])),
        ("fuse pair 3 17 pair 5 8", val([3, 17, 5, 8])),
        ("head pair 3 17", val(3)),
        ("tail fuse 3 fuse 17 9", val([17, 9])),
        ("if true 10 head null", val(10)),
        ("if false / 1 0 5", val(5)),
        ("litr \"3\"", val(3)),
        ("- 7 litr \"3\"", val(4)),
        ("str 4", val("4")),
        ("= true litr \"false\"", val(false)),
        ("= null litr \"null\"", val(true)),
        ("len fuse 1 fuse 2 3", val(3)),
    ];

    for (i, (expression, expected)) in test_cases.into_iter().enumerate() {
        assert_eq!(
            eval(expression).unwrap(),
            expected,
            "Property #{} failed: {expression}",
            i + 1
        );
    }
}

#[test]
fn test_litr_reads_back_str_of_atoms() {
    for atom in ["0", "42", "neg 17", "true", "false", "null"] {
        let round_trip = eval(&format!("= litr str {atom} {atom}")).unwrap();
        assert_eq!(round_trip, val(true), "litr str {atom}");
    }
}

#[test]
fn test_user_function_definition() {
    let mut console = ScriptedConsole::default();
    let result = atto::run("fn add x y is + x y\nfn main is add 5 3", &mut console);
    assert_eq!(result, Ok(val(8)));
}

#[test]
fn test_structural_recursion_across_nested_boundaries() {
    let source = "
        fn size l is
            if = null l
                0
                + 1 size tail l

        fn main is size fuse 1 fuse 2 3
    ";
    assert_eq!(
        atto::run(source, &mut ScriptedConsole::default()),
        Ok(val(3))
    );
}

#[test]
fn test_redefinition_applies_to_earlier_call_sites() {
    let source = "
        fn greeting is \"hello\"
        fn main is print greeting
        fn greeting is \"goodbye\"
    ";
    let mut console = ScriptedConsole::default();
    let result = atto::run(source, &mut console).unwrap();
    assert_eq!(result, val("goodbye"));
    assert_eq!(console.output(), ["goodbye"]);
}

#[test]
fn test_redefinition_must_keep_arity() {
    let source = "fn f x is x\nfn main is f 1\nfn f x y is x";
    let err = atto::run(source, &mut ScriptedConsole::default()).unwrap_err();
    assert_eq!(err.parse_kind(), Some(ParseErrorKind::ArityConflict));
}

#[test]
fn test_errors() {
    let test_cases: Vec<(&str, EvalErrorKind)> = vec![
        ("head null", EvalErrorKind::EmptyList),
        ("tail null", EvalErrorKind::EmptyList),
        ("/ 1 0", EvalErrorKind::DivisionByZero),
        ("% 1 0", EvalErrorKind::DivisionByZero),
        ("+ 1 \"a\"", EvalErrorKind::TypeMismatch),
        ("if 1 2 3", EvalErrorKind::TypeMismatch),
    ];
    for (expression, kind) in test_cases {
        let err = eval(expression).unwrap_err();
        assert_eq!(err.eval_kind(), Some(kind), "{expression}");
    }
}

#[test]
fn test_unknown_function_fails_before_running() {
    let source = "fn main is -> print \"started\" no_such_function 1";
    let mut console = ScriptedConsole::default();
    let err = atto::run(source, &mut console).unwrap_err();
    assert_eq!(err.parse_kind(), Some(ParseErrorKind::UnknownFunction));
    assert!(console.output().is_empty());
}

#[test]
fn test_incomplete_body() {
    let err = atto::run("fn main is + 1", &mut ScriptedConsole::default()).unwrap_err();
    assert_eq!(
        err.parse_kind(),
        Some(ParseErrorKind::UnexpectedEndOfExpression)
    );
}

#[test]
fn test_deep_recursion() {
    let source = "
        fn count n is
            if = n 0
                0
                + 1 count - n 1

        fn main n is count n
    ";
    let mut interpreter = Interpreter::new().unwrap();
    interpreter.load(source).unwrap();
    let result = interpreter
        .run_main(vec![val(100_000)], &mut ScriptedConsole::default())
        .unwrap();
    assert_eq!(result, val(100_000));
}

#[test]
fn test_deeply_nested_source() {
    let depth = 100_000;
    let source = format!("fn main is len {}null", "fuse 1 ".repeat(depth));
    let result = atto::run(&source, &mut ScriptedConsole::default()).unwrap();
    assert_eq!(result, val(depth as i64));
}

#[test]
fn test_deeply_nested_values_render_and_compare() {
    let depth = 100_000;
    let mut interpreter = Interpreter::new().unwrap();
    interpreter
        .load("fn nest n is if = n 0 null wrap nest - n 1")
        .unwrap();
    let expected = format!("{}null{}", "[".repeat(depth), "]".repeat(depth));

    let mut console = ScriptedConsole::default();
    let rendered = interpreter
        .eval_expression(&format!("str nest {depth}"), &mut console)
        .unwrap();
    assert!(rendered == val(expected.as_str()), "str of a deep nest");

    interpreter
        .eval_expression(&format!("print nest {depth}"), &mut console)
        .unwrap();
    assert!(console.output() == [expected], "print of a deep nest");

    let same = interpreter
        .eval_expression(&format!("= nest {depth} nest {depth}"), &mut console)
        .unwrap();
    assert_eq!(same, val(true));
}

#[test]
fn test_fizzbuzz_demo() {
    let mut interpreter = Interpreter::new().unwrap();
    interpreter.load(FIZZBUZZ).unwrap();

    let mut console = ScriptedConsole::default();
    let result = interpreter
        .run_main(vec![Value::litr("15")], &mut console)
        .unwrap();
    assert_eq!(result, nil());
    assert_eq!(
        console.output(),
        [
            "1", "2", "Fizz", "4", "Buzz", "Fizz", "7", "8", "Fizz", "Buzz", "11", "Fizz", "13",
            "14", "FizzBuzz"
        ]
    );
}

#[test]
fn test_sum_demo() {
    let mut interpreter = Interpreter::new().unwrap();
    interpreter.load(SUM).unwrap();

    let mut console = ScriptedConsole::new(["4 5  -2 10"]);
    interpreter.run_main(vec![], &mut console).unwrap();
    assert_eq!(console.prompts(), ["numbers: "]);
    assert_eq!(console.output(), ["total: 17"]);
}

#[test]
fn test_primes_demo() {
    let mut interpreter = Interpreter::new().unwrap();
    interpreter.load(PRIMES).unwrap();

    let mut console = ScriptedConsole::default();
    let result = interpreter
        .run_main(vec![val(20)], &mut console)
        .unwrap();
    assert_eq!(result, val([2, 3, 5, 7, 11, 13, 17, 19]));
    assert_eq!(console.output(), ["[2, 3, 5, 7, 11, 13, 17, 19]"]);
}

#[test]
fn test_sessions_accumulate_definitions() {
    let mut interpreter = Interpreter::with_config(Config {
        load_prelude: false,
        max_call_depth: None,
    })
    .unwrap();
    let mut console = ScriptedConsole::default();

    interpreter.load("fn double x is + x x").unwrap();
    interpreter.load("fn quadruple x is double double x").unwrap();
    assert_eq!(
        interpreter.eval_expression("quadruple 5", &mut console),
        Ok(val(20))
    );

    interpreter.load("fn double x is * x 3").unwrap();
    assert_eq!(
        interpreter.eval_expression("quadruple 5", &mut console),
        Ok(val(45))
    );
    assert_eq!(interpreter.function_names(), ["double", "quadruple"]);
}

#[test]
fn test_error_messages_name_the_location() {
    let err = atto::run("fn main is\n    / 10 - 2 2", &mut ScriptedConsole::default()).unwrap_err();
    assert_eq!(err.eval_kind(), Some(EvalErrorKind::DivisionByZero));
    assert!(err.to_string().contains("line 2"), "{err}");
}
