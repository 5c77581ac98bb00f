//! Lexer → parser pipeline integration tests
//!
//! Sources and configuration are read from temporary files.

use std::fs;
use std::path::PathBuf;

use skyc_drv::{Config, DriverError, EmitType, InternerMode, Session, UnitOutput, CONFIG_FILE_NAME};
use skyc_par::{Code, FuncId, Instruction, ResultCount};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write temp file");
    path
}

#[test]
fn test_file_units_compile() {
    let dir = TempDir::new().expect("temp dir");
    let fib = write(
        &dir,
        "fib.sky",
        "local function fib(n)\n  if n < 2 then return n end\n  return fib(n - 1) + fib(n - 2)\nend\nreturn fib(10)\n",
    );
    let counter = write(
        &dir,
        "counter.sky",
        "local count = 0\nfunction bump() count = count + 1 return count end\n",
    );

    let mut session = Session::new(Config::default());
    let fib_id = session.add_file(&fib).expect("reads");
    let counter_id = session.add_file(&counter).expect("reads");
    let results = session.compile().expect("compiles");

    let fib_code = results.requests(fib_id).expect("requests");
    assert_eq!(fib_code.functions().count(), 2);
    assert!(fib_code.unpatched_jumps().is_empty());
    // `return fib(10)` in the main chunk is a tail call
    assert!(fib_code
        .function(FuncId(0))
        .expect("main")
        .instructions()
        .any(|i| matches!(i, Instruction::Call { tail: true, .. })));

    let counter_code = results.requests(counter_id).expect("requests");
    let bump = counter_code
        .function(FuncId(1))
        .and_then(|f| f.summary.clone())
        .expect("closed");
    assert_eq!(bump.upvalues.len(), 1);
    assert!(bump.upvalues[0].in_stack);
}

#[test]
fn test_error_names_the_file() {
    let dir = TempDir::new().expect("temp dir");
    let bad = write(&dir, "bad.sky", "local x = 1\nif x then\n  x = 2");

    let mut session = Session::new(Config::default());
    session.add_file(&bad).expect("reads");
    let err = session.compile().expect_err("rejects");
    let compile = err.as_compile_error().expect("compile error");
    assert!(compile.is_syntax());
    assert_eq!(compile.line, 3);
    assert!(compile.chunk.ends_with("bad.sky"));
    assert!(err
        .to_string()
        .ends_with("bad.sky:3: 'end' expected (to close 'if' at line 2) near <eof>"));
}

#[test]
fn test_missing_source_file() {
    let dir = TempDir::new().expect("temp dir");
    let mut session = Session::new(Config::default());
    let err = session
        .add_file(dir.path().join("missing.sky"))
        .expect_err("missing");
    assert!(matches!(err, DriverError::Io { .. }));
}

#[test]
fn test_config_file_drives_session() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write(
        &dir,
        CONFIG_FILE_NAME,
        "emit = \"tokens\"\n\n[limits]\nmax_depth = 20\n\n[log]\nfilter = \"skyc_par=trace\"\n",
    );
    let config = Config::load(&config_path).expect("loads");
    assert_eq!(config.emit, EmitType::Tokens);
    assert_eq!(config.limits.max_depth, 20);
    assert_eq!(config.log.filter, "skyc_par=trace");

    let source = write(&dir, "tokens.sky", "return 1 + 2");
    let mut session = Session::new(config);
    let id = session.add_file(&source).expect("reads");
    let results = session.compile().expect("lexes");
    assert!(matches!(results.get(id), Some(UnitOutput::Tokens(tokens)) if tokens.len() == 4));
}

#[test]
fn test_config_limits_reject_deep_nesting() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write(&dir, CONFIG_FILE_NAME, "[limits]\nmax_depth = 20\n");
    let config = Config::load(&config_path).expect("loads");

    let mut session = Session::new(config);
    session.add_source("deep", format!("x = {}1{}", "(".repeat(30), ")".repeat(30)));
    let err = session.compile().expect_err("too deep");
    assert!(err.to_string().contains("chunk has too many syntax levels"));
}

#[test]
fn test_invalid_config_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write(&dir, CONFIG_FILE_NAME, "interner = \"global\"\n");
    let err = Config::load(&config_path).expect_err("rejects");
    match err {
        DriverError::Config { path, .. } => assert_eq!(path, Some(config_path)),
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn test_parallel_batch_matches_sequential() {
    let dir = TempDir::new().expect("temp dir");
    let sources: Vec<_> = (0..6)
        .map(|i| {
            write(
                &dir,
                &format!("unit{i}.sky"),
                &format!("local t = {{}}\nfor i = 1, {i} do t[i] = i * 2 end\nreturn t\n"),
            )
        })
        .collect();

    let compile = |mode: InternerMode| {
        let mut session = Session::new(Config {
            interner: mode,
            ..Config::default()
        });
        for path in &sources {
            session.add_file(path).expect("reads");
        }
        session.compile().expect("compiles")
    };
    let sequential = compile(InternerMode::Local);
    let parallel = compile(InternerMode::Shared);

    assert_eq!(sequential.units.len(), parallel.units.len());
    for ((a_id, a), (b_id, b)) in sequential.units.iter().zip(&parallel.units) {
        assert_eq!(a_id, b_id);
        let (UnitOutput::Requests { emitter: a, .. }, UnitOutput::Requests { emitter: b, .. }) =
            (a, b)
        else {
            panic!("expected requests");
        };
        let code = |e: &skyc_par::RecordingEmitter| -> Vec<Code> {
            e.function(FuncId(0))
                .map(|f| f.code.iter().map(|(c, _)| *c).collect())
                .unwrap_or_default()
        };
        assert_eq!(code(a), code(b));
        assert!(code(a)
            .iter()
            .any(|c| matches!(c, Code::Instruction(Instruction::Return { count: ResultCount::Fixed(1), .. }))));
    }
}
