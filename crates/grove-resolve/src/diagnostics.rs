//! Ariadne rendering of failed resolutions.
//!
//! A call that does not resolve is reported against the host's source text
//! for the call: each rejection reason becomes one report, labelled at the
//! offending argument when its span is known and at the call otherwise.
//! JSON mode emits one object per line instead.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use grove_common::{LineIndex, Span};
use serde_json::json;

use crate::args::{ArgSource, ArgumentList};
use crate::engine::ResolutionResult;
use crate::error::ResolveError;

/// Code for ambiguous calls, which are a result rather than an error.
pub const AMBIGUOUS_CODE: &str = "R0009";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticOptions {
    pub color: bool,
    pub json: bool,
}

impl DiagnosticOptions {
    /// Plain text, deterministic output.
    pub fn colorless() -> Self {
        DiagnosticOptions {
            color: false,
            json: false,
        }
    }

    pub fn json_mode() -> Self {
        DiagnosticOptions {
            color: false,
            json: true,
        }
    }
}

// ── Span Helpers ───────────────────────────────────────────────────────

fn whole(source_len: usize) -> Range<usize> {
    0..source_len
}

fn call_range(call_span: Option<Span>, source_len: usize) -> Range<usize> {
    call_span.map_or_else(|| whole(source_len), |s| s.to_range(source_len))
}

/// Span of the argument an error is about, when the host supplied one.
fn argument_range(source: ArgSource, args: &ArgumentList, source_len: usize) -> Option<Range<usize>> {
    let span = args.get(source)?.span?;
    Some(span.to_range(source_len))
}

fn argument_label(source: ArgSource) -> String {
    match source {
        ArgSource::Positional(i) => format!("positional argument {}", i + 1),
        ArgSource::Named(i) => format!("named argument {}", i + 1),
        ArgSource::Closure(i) => format!("closure argument {}", i + 1),
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

struct Diagnostic {
    code: &'static str,
    message: String,
    labels: Vec<(Range<usize>, String)>,
    help: Option<String>,
}

fn describe_error(err: &ResolveError, args: &ArgumentList, call: Range<usize>, source_len: usize) -> Diagnostic {
    let message = err.to_string();
    let mut labels = Vec::new();
    let mut help = None;
    match err {
        ResolveError::ConversionError {
            param,
            expected,
            found,
            source,
            ..
        } => {
            let range = argument_range(*source, args, source_len).unwrap_or_else(|| call.clone());
            labels.push((range, format!("expected `{}`, found `{}`", expected, found)));
            help = Some(format!(
                "{} has type `{}`, which does not convert to parameter `{}`",
                argument_label(*source),
                found,
                param
            ));
        }
        ResolveError::UnknownNamedArgument { key, source, .. } => {
            let range = argument_range(*source, args, source_len).unwrap_or_else(|| call.clone());
            labels.push((range, format!("`{}` is not accepted here", key)));
        }
        ResolveError::MissingNamedKey { key, .. } => {
            labels.push((call, format!("missing `{}`", key)));
            help = Some(format!("add `{}: <value>` to the call", key));
        }
        ResolveError::ArityMismatch { expected, found, kind, .. } => {
            labels.push((call, format!("{} {} arguments given, {} expected", found, kind, expected)));
        }
        ResolveError::NoCandidates { receiver, .. } => {
            labels.push((call, format!("receiver is `{}`", receiver)));
        }
        ResolveError::DuplicateNamedArgument { first, span, .. } => {
            if let Some(first) = first {
                labels.push((first.to_range(source_len), "first given here".to_string()));
            }
            let again = span.map_or_else(|| call.clone(), |s| s.to_range(source_len));
            labels.push((again, "given again here".to_string()));
        }
        ResolveError::Cancelled | ResolveError::InternalInconsistency(_) => {
            labels.push((call, message.clone()));
        }
    }
    Diagnostic {
        code: err.code(),
        message,
        labels,
        help,
    }
}

fn write_report(diag: &Diagnostic, source: &str, opts: &DiagnosticOptions) -> String {
    if opts.json {
        let index = LineIndex::new(source);
        let spans: Vec<_> = diag
            .labels
            .iter()
            .map(|(range, label)| {
                let (line, column) = index.line_col(range.start as u32);
                json!({
                    "start": range.start,
                    "end": range.end,
                    "line": line,
                    "column": column,
                    "label": label,
                })
            })
            .collect();
        let value = json!({
            "code": diag.code,
            "severity": "error",
            "message": diag.message,
            "spans": spans,
            "help": diag.help,
        });
        return value.to_string();
    }

    let primary = diag
        .labels
        .first()
        .map_or_else(|| whole(source.len()), |(range, _)| range.clone());
    let config = Config::default().with_color(opts.color);
    let mut builder = Report::build(ReportKind::Error, primary)
        .with_code(diag.code)
        .with_message(&diag.message)
        .with_config(config);
    for (i, (range, label)) in diag.labels.iter().enumerate() {
        let color = if i == 0 { Color::Red } else { Color::Blue };
        builder.add_label(Label::new(range.clone()).with_message(label).with_color(color));
    }
    if let Some(help) = &diag.help {
        builder.set_help(help);
    }
    let report = builder.finish();

    let mut buf = Vec::new();
    if report.write(Source::from(source), &mut buf).is_err() {
        return format!("error[{}]: {}", diag.code, diag.message);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Render one error against `source`, the text of the call.
pub fn render_error(
    err: &ResolveError,
    source: &str,
    args: &ArgumentList,
    call_span: Option<Span>,
    opts: &DiagnosticOptions,
) -> String {
    let call = call_range(call_span, source.len());
    let diag = describe_error(err, args, call, source.len());
    write_report(&diag, source, opts)
}

/// Render a non-resolved result; `None` for a resolved one.
///
/// Unresolved results give one report per rejection reason, separated by
/// newlines.
pub fn render_resolution(
    result: &ResolutionResult,
    source: &str,
    args: &ArgumentList,
    call_span: Option<Span>,
    opts: &DiagnosticOptions,
) -> Option<String> {
    match result {
        ResolutionResult::Resolved { .. } => None,
        ResolutionResult::Unresolved { reasons, .. } => {
            let rendered: Vec<String> = reasons
                .iter()
                .map(|r| render_error(r, source, args, call_span, opts))
                .collect();
            Some(rendered.join("\n"))
        }
        ResolutionResult::Ambiguous { tied } => {
            let ids: Vec<String> = tied.iter().map(|c| format!("`{}`", c.id)).collect();
            let diag = Diagnostic {
                code: AMBIGUOUS_CODE,
                message: format!("ambiguous call: {} candidates match equally well", tied.len()),
                labels: vec![(call_range(call_span, source.len()), format!("could be {}", ids.join(" or ")))],
                help: Some("add a cast to an argument to pick one".to_string()),
            };
            Some(write_report(&diag, source, opts))
        }
    }
}

fn error_json(err: &ResolveError) -> serde_json::Value {
    json!({
        "code": err.code(),
        "message": err.to_string(),
        "candidate": err.candidate().map(|c| c.as_str()),
        "argument": err.arg_source(),
    })
}

/// Machine-readable summary of a result.
pub fn to_json(result: &ResolutionResult) -> serde_json::Value {
    match result {
        ResolutionResult::Resolved {
            candidate,
            mapping,
            conversions,
            inferred_type,
        } => {
            let conversions: Vec<_> = conversions
                .iter()
                .map(|c| {
                    json!({
                        "param": c.param,
                        "argument": c.source,
                        "expected": c.expected.to_string(),
                        "found": c.found.to_string(),
                        "kind": c.conversion.kind.to_string(),
                        "cost": c.conversion.cost,
                    })
                })
                .collect();
            json!({
                "status": "resolved",
                "candidate": candidate.id,
                "origin": candidate.origin,
                "type": inferred_type.to_string(),
                "slots": mapping.slots,
                "conversions": conversions,
            })
        }
        ResolutionResult::Unresolved { considered, reasons } => json!({
            "status": "unresolved",
            "considered": considered,
            "reasons": reasons.iter().map(error_json).collect::<Vec<_>>(),
        }),
        ResolutionResult::Ambiguous { tied } => json!({
            "status": "ambiguous",
            "candidates": tied.iter().map(|c| c.id.clone()).collect::<Vec<_>>(),
        }),
    }
}
