use verbena::error::{CompileErrorKind, LexErrorKind};
use verbena::{CompileOptions, loader, processor};

mod common;

#[test]
fn unterminated_string_names_the_line() {
    let unit = common::fixture("unterminated");
    let err = processor::compile(&unit, &CompileOptions::default()).unwrap_err();

    assert_eq!(err.line, 2);
    assert_eq!(err.kind, CompileErrorKind::Lexical(LexErrorKind::UnterminatedString));
    assert_eq!(
        err.to_string(),
        "tests/data/unterminated.va:2: '\"never closed': unterminated string"
    );
}

#[test]
fn first_syntax_error_wins() {
    let unit = loader::from_text("bad.va", "x = (1 +\ny = ]\n".to_string());
    let err = processor::compile(&unit, &CompileOptions::default()).unwrap_err();

    assert_eq!(err.to_string(), "bad.va:1: newline: expected expression");
}

#[test]
fn runtime_errors_reach_the_caller() {
    let unit = loader::from_text("boom.va", "xs = [1]\nxs[5] = 2\n".to_string());
    let mut out = Vec::new();
    let mut err = Vec::new();
    let e =
        processor::interpret(&unit, &CompileOptions::default(), &mut out, &mut err).unwrap_err();

    assert_eq!(e.to_string(), "cannot assign past the end of list");
}

#[test]
fn runaway_recursion_is_a_runtime_error() {
    let src = "fn down(n)\n  return down(n + 1)\nend\n";
    let mut out = Vec::new();
    let mut err = Vec::new();

    let uncaught = loader::from_text("deep.va", format!("{src}down(0)\n"));
    let e = processor::interpret(&uncaught, &CompileOptions::default(), &mut out, &mut err)
        .unwrap_err();
    assert_eq!(e.to_string(), "Maximum call stack size exceeded");

    let caught = loader::from_text(
        "deep.va",
        format!("{src}try\n  down(0)\ncatch e\n  print e\nend\nprint down\n"),
    );
    processor::interpret(&caught, &CompileOptions::default(), &mut out, &mut err).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Maximum call stack size exceeded\n<fn down>\n"
    );
}

#[test]
fn dollar_identifiers_are_a_dialect_option() {
    let unit = loader::from_text("d.va", "$x = 1\n".to_string());
    assert!(processor::compile(&unit, &CompileOptions::default()).is_err());

    let options = CompileOptions {
        dollar_identifiers: true,
        ..CompileOptions::default()
    };
    let compiled = processor::compile(&unit, &options).unwrap();
    assert_eq!(compiled.code, "let $x = null;\n$x = 1;\n");
}
