//! One-shot dynamic calls from text arguments.

use std::io::Write;
use std::time::Instant;

use typedl_core::{LibraryDescriptor, LoaderConfig, SymbolDecl, SymbolId, Value};
use typedl_loader::LoadedLibrary;

use crate::error::HarnessError;
use crate::probe::elapsed_ns;
use crate::structured_log::{LogEmitter, LogLevel, Outcome, Phase};

/// Parse `args` as the parameters of `decl`.
pub fn parse_args(decl: &SymbolDecl, args: &[String]) -> Result<Vec<Value>, HarnessError> {
    let params = decl.signature().params();
    if params.len() != args.len() {
        return Err(HarnessError::Arity {
            symbol: decl.name().to_string(),
            expected: params.len(),
            actual: args.len(),
        });
    }
    params
        .iter()
        .zip(args)
        .map(|(ty, text)| Value::parse(*ty, text).map_err(HarnessError::from))
        .collect()
}

/// Open `descriptor`'s library, call `symbol` with `args`, and close it.
///
/// The declaration is trusted as the export's real signature. The parsed
/// arguments are logged at trace level, the outcome as one `symbol_call`
/// record.
pub fn call_symbol<W: Write>(
    descriptor: LibraryDescriptor,
    symbol: &str,
    args: &[String],
    config: &LoaderConfig,
    log: &mut LogEmitter<W>,
) -> Result<Value, HarnessError> {
    let library = descriptor.path().to_string();
    let Some((id, decl)) = descriptor.iter().find(|(_, decl)| decl.name() == symbol) else {
        let err = HarnessError::UnknownSymbol {
            name: symbol.to_string(),
            library: library.clone(),
        };
        let mut entry = log
            .entry(LogLevel::Error, "symbol_call")
            .with_phase(Phase::Call)
            .with_library(&library)
            .with_error(&err);
        entry.symbol = Some(symbol.to_string());
        log.emit_entry(entry)?;
        log.flush()?;
        return Err(err);
    };
    let signature = decl.signature().to_string();
    let name = decl.name().to_string();

    let started = Instant::now();
    let result = match parse_args(decl, args) {
        Ok(values) => {
            let entry = log
                .entry(LogLevel::Trace, "call_arguments")
                .with_phase(Phase::Call)
                .with_library(&library)
                .with_symbol(&name, &signature)
                .with_details(serde_json::json!({
                    "args": values.iter().map(Value::to_string).collect::<Vec<_>>(),
                }));
            log.emit_entry(entry)?;
            open_and_call(descriptor, id, &values, config)
        }
        Err(e) => Err(e),
    };

    let entry = log
        .entry(LogLevel::Info, "symbol_call")
        .with_phase(Phase::Call)
        .with_library(&library)
        .with_symbol(&name, &signature)
        .with_latency_ns(elapsed_ns(started));
    let entry = match &result {
        Ok(value) => entry
            .with_outcome(Outcome::Pass)
            .with_details(serde_json::json!({ "result": value.to_string() })),
        Err(e) => {
            let mut entry = entry.with_error(e);
            entry.level = LogLevel::Error;
            entry
        }
    };
    log.emit_entry(entry)?;
    log.flush()?;
    result
}

fn open_and_call(
    descriptor: LibraryDescriptor,
    id: SymbolId,
    values: &[Value],
    config: &LoaderConfig,
) -> Result<Value, HarnessError> {
    let lib = LoadedLibrary::open_with(descriptor, config)?;
    // SAFETY: manifests are the operator's assertion of each export's ABI;
    // calling through them is the purpose of this command.
    #[allow(unsafe_code)]
    let value = unsafe { lib.call_dynamic(id, values) }?;
    lib.close()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use typedl_core::ParseError;

    use crate::structured_log::{LogEntry, validate_log_line};

    fn ldexp() -> LibraryDescriptor {
        LibraryDescriptor::builder("libm.so.6")
            .prototype("double ldexp(double x, int exp)")
            .build()
            .unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_arguments_by_declared_type() {
        let d = ldexp();
        let (_, decl) = d.iter().next().unwrap();
        let values = parse_args(decl, &strings(&["1.5", "0x3"])).unwrap();
        assert_eq!(values, [Value::F64(1.5), Value::I32(3)]);
    }

    #[test]
    fn wrong_count_or_text_is_rejected() {
        let d = ldexp();
        let (_, decl) = d.iter().next().unwrap();
        let err = parse_args(decl, &strings(&["1.5"])).unwrap_err();
        assert!(matches!(err, HarnessError::Arity { expected: 2, actual: 1, .. }));

        let err = parse_args(decl, &strings(&["1.5", "three"])).unwrap_err();
        assert!(matches!(err, HarnessError::Argument(ParseError::BadValue { .. })));
    }

    fn entries(log: LogEmitter<Vec<u8>>) -> Vec<LogEntry> {
        let text = String::from_utf8(log.into_inner()).unwrap();
        text.lines()
            .enumerate()
            .map(|(i, line)| validate_log_line(line, i + 1).unwrap())
            .collect()
    }

    #[test]
    fn unknown_symbol_fails_before_opening() {
        // The library path is never opened for an unknown symbol.
        let d = LibraryDescriptor::builder("/nonexistent/typedl/libm.so")
            .prototype("double cos(double)")
            .build()
            .unwrap();
        let mut log = LogEmitter::to_buffer("call", "test");
        let err = call_symbol(
            d,
            "sin",
            &strings(&["0"]),
            &LoaderConfig::default(),
            &mut log,
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::UnknownSymbol { ref name, .. } if name == "sin"));

        let logged = entries(log);
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].phase, Some(Phase::Call));
        assert_eq!(logged[0].symbol.as_deref(), Some("sin"));
        assert_eq!(logged[0].outcome, Some(Outcome::Fail));
    }

    #[test]
    fn failed_open_is_logged_after_the_arguments() {
        let mut log = LogEmitter::to_buffer("call", "test");
        let d = LibraryDescriptor::builder("/nonexistent/typedl/libm.so")
            .prototype("double ldexp(double x, int exp)")
            .build()
            .unwrap();
        let err = call_symbol(
            d,
            "ldexp",
            &strings(&["1.5", "2"]),
            &LoaderConfig::default(),
            &mut log,
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Load(_)), "{err}");

        let logged = entries(log);
        assert_eq!(logged.len(), 2);
        assert_eq!(logged[0].level, LogLevel::Trace);
        assert_eq!(logged[0].details.as_ref().unwrap()["args"][1], "2");
        assert_eq!(logged[1].level, LogLevel::Error);
        assert_eq!(logged[1].signature.as_deref(), Some("double (double, int)"));
        assert!(logged[1].error.as_deref().unwrap().contains("/nonexistent/typedl/libm.so"));
    }
}
