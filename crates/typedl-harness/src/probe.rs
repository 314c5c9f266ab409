//! Descriptor summaries and library probes.
//!
//! A probe opens a descriptor's library, resolves every declaration once and
//! reports what it found, together with a SHA-256 of the object file and the
//! loader counters at the end of the run.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use typedl_core::{LibraryDescriptor, LoaderConfig, Manifest};
use typedl_loader::dynamic::is_dispatchable;
use typedl_loader::{LoadedLibrary, LoaderStats, snapshot};

use crate::error::HarnessError;
use crate::structured_log::{LogEmitter, LogLevel, Outcome, Phase, now_utc};

/// One declaration as seen by `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclSummary {
    pub name: String,
    pub signature: String,
    /// Whether the `call` command can invoke this signature.
    pub callable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorSummary {
    pub library: String,
    pub symbols: Vec<DeclSummary>,
}

/// Describe a descriptor without opening its library.
#[must_use]
pub fn summarize(descriptor: &LibraryDescriptor) -> DescriptorSummary {
    DescriptorSummary {
        library: descriptor.path().to_string(),
        symbols: descriptor
            .iter()
            .map(|(_, decl)| DeclSummary {
                name: decl.name().to_string(),
                signature: decl.signature().to_string(),
                callable: is_dispatchable(decl.signature()),
            })
            .collect(),
    }
}

/// Load the manifest at `path`, build its descriptor and summarize it.
///
/// Logs one `symbol_declared` record per declaration (outcome `skip` when the
/// `call` command cannot invoke it) and a closing `manifest_validate` record.
pub fn validate<W: Write>(
    path: &Path,
    log: &mut LogEmitter<W>,
) -> Result<DescriptorSummary, HarnessError> {
    let started = Instant::now();
    let descriptor = match Manifest::from_file(path).and_then(|m| m.to_descriptor()) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            let entry = log
                .entry(LogLevel::Error, "manifest_validate")
                .with_phase(Phase::Validate)
                .with_error(&e)
                .with_details(serde_json::json!({ "manifest": path.display().to_string() }));
            log.emit_entry(entry)?;
            log.flush()?;
            return Err(e.into());
        }
    };

    let summary = summarize(&descriptor);
    for decl in &summary.symbols {
        let outcome = if decl.callable {
            Outcome::Pass
        } else {
            Outcome::Skip
        };
        let entry = log
            .entry(LogLevel::Debug, "symbol_declared")
            .with_phase(Phase::Validate)
            .with_library(&summary.library)
            .with_symbol(&decl.name, &decl.signature)
            .with_outcome(outcome)
            .with_details(serde_json::json!({ "callable": decl.callable }));
        log.emit_entry(entry)?;
    }

    let callable = summary.symbols.iter().filter(|s| s.callable).count();
    let entry = log
        .entry(LogLevel::Info, "manifest_validate")
        .with_phase(Phase::Validate)
        .with_library(&summary.library)
        .with_outcome(Outcome::Pass)
        .with_latency_ns(elapsed_ns(started))
        .with_details(serde_json::json!({
            "manifest": path.display().to_string(),
            "declarations": summary.symbols.len(),
            "callable": callable,
        }));
    log.emit_entry(entry)?;
    log.flush()?;
    Ok(summary)
}

/// Resolution result for one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolProbe {
    pub index: usize,
    pub name: String,
    pub signature: String,
    pub resolved: bool,
    pub callable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ns: u64,
}

/// Machine-readable probe report.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub schema_version: u32,
    pub generated_utc: String,
    /// Library as declared.
    pub library: String,
    /// Path handed to the platform loader.
    pub resolved_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub symbols: Vec<SymbolProbe>,
    pub resolved: usize,
    pub missing: usize,
    pub stats: LoaderStats,
}

impl ProbeReport {
    /// Every declaration resolved.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.missing == 0
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Open `descriptor`'s library, resolve each declaration and close it again.
///
/// Missing symbols are reported in the result; only a library that cannot be
/// opened or closed is an error.
pub fn probe<W: Write>(
    descriptor: LibraryDescriptor,
    config: &LoaderConfig,
    log: &mut LogEmitter<W>,
) -> Result<ProbeReport, HarnessError> {
    let library = descriptor.path().to_string();

    let started = Instant::now();
    let lib = match LoadedLibrary::open_with(descriptor, config) {
        Ok(lib) => lib,
        Err(e) => {
            let entry = log
                .entry(LogLevel::Error, "library_open")
                .with_phase(Phase::Open)
                .with_library(&library)
                .with_error(&e)
                .with_details(serde_json::json!({ "kind": format!("{:?}", e.kind) }));
            log.emit_entry(entry)?;
            return Err(e.into());
        }
    };
    let entry = log
        .entry(LogLevel::Info, "library_open")
        .with_phase(Phase::Open)
        .with_library(&library)
        .with_outcome(Outcome::Pass)
        .with_latency_ns(elapsed_ns(started))
        .with_details(serde_json::json!({ "path": lib.path().display().to_string() }));
    log.emit_entry(entry)?;

    let mut symbols = Vec::with_capacity(lib.descriptor().len());
    for (id, decl) in lib.descriptor().iter() {
        let started = Instant::now();
        let result = lib.resolve(id);
        let latency_ns = elapsed_ns(started);
        let signature = decl.signature().to_string();

        let mut entry = log
            .entry(LogLevel::Info, "symbol_resolve")
            .with_phase(Phase::Resolve)
            .with_library(&library)
            .with_symbol(decl.name(), &signature)
            .with_latency_ns(latency_ns);
        entry = match &result {
            Ok(_) => entry.with_outcome(Outcome::Pass),
            Err(e) => {
                entry.level = LogLevel::Warn;
                entry.with_error(e)
            }
        };
        log.emit_entry(entry)?;

        symbols.push(SymbolProbe {
            index: id.index(),
            name: decl.name().to_string(),
            signature,
            resolved: result.is_ok(),
            callable: is_dispatchable(decl.signature()),
            error: result.err().map(|e| e.to_string()),
            latency_ns,
        });
    }

    let resolved_path = lib.path().to_path_buf();
    let (sha256, size_bytes) = match file_digest(&resolved_path) {
        Some((digest, size)) => (Some(digest), Some(size)),
        None => (None, None),
    };

    lib.close()?;
    let entry = log
        .entry(LogLevel::Info, "library_close")
        .with_phase(Phase::Close)
        .with_library(&library)
        .with_outcome(Outcome::Pass);
    log.emit_entry(entry)?;
    log.flush()?;

    let resolved = symbols.iter().filter(|s| s.resolved).count();
    Ok(ProbeReport {
        schema_version: 1,
        generated_utc: now_utc(),
        library,
        resolved_path: resolved_path.display().to_string(),
        sha256,
        size_bytes,
        missing: symbols.len() - resolved,
        resolved,
        symbols,
        stats: snapshot(),
    })
}

pub(crate) fn elapsed_ns(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

/// SHA-256 and size of the file at `path`, if it is a readable regular file.
///
/// Bare library names searched by the platform loader have no file here.
#[must_use]
pub fn file_digest(path: &Path) -> Option<(String, u64)> {
    use sha2::Digest;
    if !path.is_file() {
        return None;
    }
    let data = std::fs::read(path).ok()?;
    Some((hex_lower(&sha2::Sha256::digest(&data)), data.len() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use typedl_core::CType;

    #[test]
    fn summary_marks_callable_shapes() {
        let d = LibraryDescriptor::builder("libm.so.6")
            .prototype("double cos(double)")
            .declare("fmaf", vec![CType::F32, CType::F32, CType::F32], CType::F32)
            .build()
            .unwrap();
        let summary = summarize(&d);
        assert_eq!(summary.library, "libm.so.6");
        assert_eq!(
            summary.symbols,
            [
                DeclSummary {
                    name: "cos".into(),
                    signature: "double (double)".into(),
                    callable: true,
                },
                DeclSummary {
                    name: "fmaf".into(),
                    signature: "float (float, float, float)".into(),
                    callable: false,
                },
            ]
        );
    }

    fn scratch(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("typedl-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn log_lines(log: LogEmitter<Vec<u8>>) -> Vec<crate::structured_log::LogEntry> {
        let text = String::from_utf8(log.into_inner()).unwrap();
        text.lines()
            .enumerate()
            .map(|(i, line)| crate::structured_log::validate_log_line(line, i + 1).unwrap())
            .collect()
    }

    #[test]
    fn validate_logs_each_declaration() {
        let path = scratch("validate").join("m.json");
        std::fs::write(
            &path,
            r#"{"library":"libm.so.6","symbols":[
                {"name":"cos","signature":"double (double)"},
                {"name":"fmaf","signature":"float (float, float, float)"}
            ]}"#,
        )
        .unwrap();
        let mut log = LogEmitter::to_buffer("validate", "test");
        let summary = validate(&path, &mut log).unwrap();
        assert_eq!(summary.symbols.len(), 2);

        let entries = log_lines(log);
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.phase == Some(Phase::Validate)));
        assert_eq!(entries[0].symbol.as_deref(), Some("cos"));
        assert_eq!(entries[0].outcome, Some(Outcome::Pass));
        assert_eq!(entries[1].level, LogLevel::Debug);
        assert_eq!(entries[1].outcome, Some(Outcome::Skip));
        assert_eq!(entries[2].event, "manifest_validate");
        assert_eq!(entries[2].details.as_ref().unwrap()["callable"], 1);
    }

    #[test]
    fn validate_logs_bad_manifest_as_failure() {
        let path = scratch("validate-bad").join("bad.json");
        std::fs::write(
            &path,
            r#"{"library":"libm.so.6","symbols":[{"name":"cos","signature":"quaternion (double)"}]}"#,
        )
        .unwrap();
        let mut log = LogEmitter::to_buffer("validate", "test");
        let err = validate(&path, &mut log).unwrap_err();
        assert!(matches!(err, HarnessError::Manifest(_)), "{err}");

        let entries = log_lines(log);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome, Some(Outcome::Fail));
        assert!(entries[0].error.as_deref().unwrap().contains("quaternion"));
    }

    #[test]
    fn digest_of_known_content() {
        let dir = std::env::temp_dir().join(format!("typedl-digest-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("abc.bin");
        std::fs::write(&path, b"abc").unwrap();
        let (digest, size) = file_digest(&path).unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(size, 3);
        assert!(file_digest(&dir.join("missing.bin")).is_none());
        assert!(file_digest(Path::new("libm.so.6")).is_none());
    }

    #[test]
    fn unopenable_library_is_logged_and_returned() {
        let d = LibraryDescriptor::builder("/nonexistent/typedl/libnothing.so")
            .prototype("int nothing(void)")
            .build()
            .unwrap();
        let mut log = LogEmitter::to_buffer("probe", "test");
        let err = probe(d, &LoaderConfig::default(), &mut log).unwrap_err();
        assert!(matches!(err, HarnessError::Load(_)), "{err}");

        let text = String::from_utf8(log.into_inner()).unwrap();
        let line = text.lines().next().unwrap();
        let entry = crate::structured_log::validate_log_line(line, 1).unwrap();
        assert_eq!(entry.outcome, Some(Outcome::Fail));
        assert_eq!(entry.phase, Some(Phase::Open));
    }
}
