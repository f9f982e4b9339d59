//! Rendering of failed and ambiguous calls.
//!
//! Text output goes through ariadne in colorless mode, so these check the
//! pieces that matter (code, message, label text, source excerpt) rather than
//! ariadne's exact box drawing.

use std::sync::Arc;

use grove_resolve::diagnostics::{render_resolution, to_json, DiagnosticOptions};
use grove_resolve::{
    Argument, ArgumentList, Engine, InMemoryUniverse, MethodSig, Param, Registries, ResolutionResult, Span, Ty,
    TypeDecl, UsageContext,
};

// ── Helpers ────────────────────────────────────────────────────────────

fn engine() -> Engine {
    let universe = InMemoryUniverse::new()
        .with(TypeDecl::class("Object"))
        .with(
            TypeDecl::interface("Map")
                .type_params(&["K", "V"])
                .method(MethodSig::new("get", vec![Param::positional("key", Ty::param("K"))], Ty::param("V"))),
        )
        .with(
            TypeDecl::class("Printer")
                .extends(Ty::object())
                .method(MethodSig::new("print", vec![Param::positional("x", Ty::int())], Ty::nominal("Void")))
                .method(MethodSig::new("print", vec![Param::positional("x", Ty::string())], Ty::nominal("Void"))),
        );
    Engine::new(Arc::new(universe), Registries::builder().with_builtins().build())
}

fn opts() -> DiagnosticOptions {
    DiagnosticOptions::colorless()
}

// ── Text ───────────────────────────────────────────────────────────────

#[test]
fn conversion_failure_points_at_the_argument() {
    let source = "counts.get(42)";
    let mut args = ArgumentList::new();
    args.push_positional(Argument::at(Ty::int(), Span::new(11, 13)));
    let result = engine().resolve_call(&Ty::map(Ty::string(), Ty::int()), "get", &args, &UsageContext::new());

    let output = render_resolution(&result, source, &args, Some(Span::new(0, 14)), &opts())
        .expect("an unresolved call renders");
    assert!(output.contains("[R0004]"), "missing code: {}", output);
    assert!(
        output.contains("`Map::get(String)` parameter `key` expects `String`, found `Int`"),
        "missing message: {}",
        output
    );
    assert!(output.contains("expected `String`, found `Int`"), "missing label: {}", output);
    assert!(output.contains("counts.get(42)"), "missing source line: {}", output);
    assert!(output.contains("positional argument 1"), "missing help: {}", output);
}

#[test]
fn unknown_member_names_the_receiver() {
    let source = "p.scan()";
    let args = ArgumentList::new();
    let result = engine().resolve_call(&Ty::nominal("Printer"), "scan", &args, &UsageContext::new());
    let output = render_resolution(&result, source, &args, None, &opts()).expect("an unresolved call renders");
    assert!(output.contains("[R0005]"), "{}", output);
    assert!(output.contains("no method `scan` on `Printer`"), "{}", output);
}

#[test]
fn ambiguous_calls_list_the_tied_candidates() {
    let source = "p.print(x)";
    let args = ArgumentList::new().positional(Ty::Unknown);
    let result = engine().resolve_call(&Ty::nominal("Printer"), "print", &args, &UsageContext::new());
    assert!(matches!(result, ResolutionResult::Ambiguous { .. }));
    let output = render_resolution(&result, source, &args, Some(Span::new(0, 10)), &opts())
        .expect("an ambiguous call renders");
    assert!(output.contains("[R0009]"), "{}", output);
    assert!(output.contains("`Printer::print(Int)` or `Printer::print(String)`"), "{}", output);
}

#[test]
fn resolved_calls_render_nothing() {
    let args = ArgumentList::new().positional(Ty::string());
    let result = engine().resolve_call(&Ty::map(Ty::string(), Ty::int()), "get", &args, &UsageContext::new());
    assert_eq!(render_resolution(&result, "m.get(k)", &args, None, &opts()), None);
}

// ── JSON ───────────────────────────────────────────────────────────────

#[test]
fn json_diagnostics_are_one_object_per_line() {
    let args = ArgumentList::new().positional(Ty::bool());
    let result = engine().resolve_call(&Ty::nominal("Printer"), "print", &args, &UsageContext::new());
    let output = render_resolution(&result, "p.print(true)", &args, None, &DiagnosticOptions::json_mode())
        .expect("an unresolved call renders");
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let parsed: serde_json::Value =
            serde_json::from_str(line).unwrap_or_else(|e| panic!("invalid JSON output: {}\n{}", e, line));
        assert_eq!(parsed["code"], "R0004");
        assert_eq!(parsed["severity"], "error");
    }
}

#[test]
fn resolved_call_json() {
    let args = ArgumentList::new().positional(Ty::string());
    let result = engine().resolve_call(&Ty::map(Ty::string(), Ty::int()), "get", &args, &UsageContext::new());
    let json = serde_json::to_string_pretty(&to_json(&result)).unwrap();
    insta::assert_snapshot!(json, @r###"
    {
      "candidate": "Map::get(String)",
      "conversions": [
        {
          "argument": {
            "index": 0,
            "kind": "positional"
          },
          "cost": 0,
          "expected": "String",
          "found": "String",
          "kind": "identity",
          "param": 0
        }
      ],
      "origin": "declared",
      "slots": [
        {
          "binding": "single",
          "sources": {
            "index": 0,
            "kind": "positional"
          }
        }
      ],
      "status": "resolved",
      "type": "Int"
    }
    "###);
}

#[test]
fn ambiguous_call_json() {
    let args = ArgumentList::new().positional(Ty::Unknown);
    let result = engine().resolve_call(&Ty::nominal("Printer"), "print", &args, &UsageContext::new());
    insta::assert_snapshot!(serde_json::to_string_pretty(&to_json(&result)).unwrap(), @r###"
    {
      "candidates": [
        "Printer::print(Int)",
        "Printer::print(String)"
      ],
      "status": "ambiguous"
    }
    "###);
}
