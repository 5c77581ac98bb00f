//! skyc-drv - Compiler Driver
//!
//! Runs source units through the lexer and the parser/code-generation
//! driver according to a [`Config`]. Units are compiled one at a time into
//! a session-owned string table, or in parallel on `rayon` through a
//! [`SharedInterner`].
//!
//! ```
//! use skyc_drv::{Config, Session};
//!
//! let mut session = Session::new(Config::default());
//! let id = session.add_source("demo", "local x = 1 return x");
//! let results = session.compile().expect("compiles");
//! assert!(results.requests(id).is_some());
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;

use std::path::Path;

use rayon::prelude::*;
use skyc_lex::{tokenize, TokenWithLine};
use skyc_par::{compile_chunk, FuncId, RecordingEmitter};
use skyc_util::{Interner, Limits, SharedInterner, StringInterner, Symbol};
use tracing::{debug, info, instrument};

pub use config::{Config, EmitType, InternerMode, LogConfig, CONFIG_FILE_NAME};
pub use error::{DriverError, DriverResult};
pub use logging::init_logging;

/// Index of a unit in a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub u32);

/// One source unit.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Chunk name in `=name` / `@path` form
    pub name: String,
    /// Raw bytes; the lexer does not require UTF-8
    pub content: Vec<u8>,
}

/// Units of a session, in insertion order.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit under the chunk name `name`.
    pub fn add(&mut self, name: String, content: Vec<u8>) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile { name, content });
        id
    }

    /// Unit `id`, if it exists.
    pub fn get(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no unit was added.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over units with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (FileId, &SourceFile)> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, f)| (FileId(i as u32), f))
    }
}

/// What one unit produced.
#[derive(Debug)]
pub enum UnitOutput {
    /// Every token up to, but excluding, `Eof`.
    Tokens(Vec<TokenWithLine>),
    /// The recorded code-generation requests.
    Requests {
        /// Main function of the chunk
        main: FuncId,
        /// Request log and per-function code
        emitter: RecordingEmitter,
    },
}

/// Outputs of a successful [`Session::compile`], in unit order.
#[derive(Debug, Default)]
pub struct CompilationResults {
    /// Output of each unit
    pub units: Vec<(FileId, UnitOutput)>,
}

impl CompilationResults {
    /// Output of unit `id`.
    pub fn get(&self, id: FileId) -> Option<&UnitOutput> {
        self.units.iter().find(|(f, _)| *f == id).map(|(_, out)| out)
    }

    /// Tokens of unit `id`, when the session emitted tokens.
    pub fn tokens(&self, id: FileId) -> Option<&[TokenWithLine]> {
        match self.get(id)? {
            UnitOutput::Tokens(tokens) => Some(tokens),
            UnitOutput::Requests { .. } => None,
        }
    }

    /// Recorded requests of unit `id`, when the session emitted requests.
    pub fn requests(&self, id: FileId) -> Option<&RecordingEmitter> {
        match self.get(id)? {
            UnitOutput::Requests { emitter, .. } => Some(emitter),
            UnitOutput::Tokens(_) => None,
        }
    }
}

/// String table of a session.
enum Strings {
    Local(StringInterner),
    Shared(SharedInterner),
}

impl Strings {
    fn get(&self) -> &dyn Interner {
        match self {
            Strings::Local(interner) => interner,
            Strings::Shared(interner) => interner,
        }
    }

    /// Shared handle, promoting a local table in place so that symbols
    /// handed out earlier stay valid.
    fn share(&mut self) -> SharedInterner {
        let shared = match std::mem::replace(self, Strings::Local(StringInterner::new())) {
            Strings::Local(local) => SharedInterner::from_interner(local),
            Strings::Shared(shared) => shared,
        };
        *self = Strings::Shared(shared.clone());
        shared
    }
}

/// Compilation session
pub struct Session {
    /// Settings every unit is compiled with
    pub config: Config,
    /// Units to compile
    pub sources: SourceMap,
    strings: Strings,
}

impl Session {
    /// Create a session with the string table selected by `config.interner`.
    pub fn new(config: Config) -> Self {
        let strings = match config.interner {
            InternerMode::Local => Strings::Local(StringInterner::new()),
            InternerMode::Shared => Strings::Shared(SharedInterner::new()),
        };
        Self {
            config,
            sources: SourceMap::new(),
            strings,
        }
    }

    /// Create a session that interns into the process-wide table.
    pub fn with_global_interner(mut config: Config) -> Self {
        config.interner = InternerMode::Shared;
        Self {
            config,
            sources: SourceMap::new(),
            strings: Strings::Shared(SharedInterner::global().clone()),
        }
    }

    /// Read a unit from disk. Its chunk name is `@path`.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> DriverResult<FileId> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|e| DriverError::io(path, e))?;
        debug!(path = %path.display(), bytes = content.len(), "added source file");
        Ok(self.sources.add(format!("@{}", path.display()), content))
    }

    /// Add an in-memory unit. Its chunk name is `=name`.
    pub fn add_source(&mut self, name: &str, content: impl Into<Vec<u8>>) -> FileId {
        self.sources.add(format!("={name}"), content.into())
    }

    /// Strings interned so far.
    pub fn interner(&self) -> &dyn Interner {
        self.strings.get()
    }

    /// Lossy rendering of `symbol`.
    pub fn display(&self, symbol: Symbol) -> String {
        self.interner().display(symbol)
    }

    /// Compile every unit, in parallel when the session uses a shared
    /// table. Stops at the first rejected unit.
    #[instrument(level = "info", skip_all, fields(units = self.sources.len()))]
    pub fn compile(&mut self) -> DriverResult<CompilationResults> {
        if self.sources.is_empty() {
            return Err(DriverError::NoInputFiles);
        }
        if self.config.interner == InternerMode::Shared {
            return self.compile_batch();
        }

        let emit = self.config.emit;
        let limits = self.config.limits;
        let mut units = Vec::with_capacity(self.sources.len());
        for (id, file) in self.sources.iter() {
            let output = match &mut self.strings {
                Strings::Local(interner) => compile_unit(file, interner, emit, limits)?,
                Strings::Shared(interner) => compile_unit(file, interner, emit, limits)?,
            };
            units.push((id, output));
        }
        info!(units = units.len(), "compilation finished");
        Ok(CompilationResults { units })
    }

    /// Compile every unit in parallel into one shared table. A local table
    /// is promoted first.
    #[instrument(level = "info", skip_all, fields(units = self.sources.len()))]
    pub fn compile_batch(&mut self) -> DriverResult<CompilationResults> {
        if self.sources.is_empty() {
            return Err(DriverError::NoInputFiles);
        }
        let shared = self.strings.share();
        self.config.interner = InternerMode::Shared;

        let emit = self.config.emit;
        let limits = self.config.limits;
        let units = self
            .sources
            .files
            .par_iter()
            .enumerate()
            .map(|(i, file)| {
                let mut interner = shared.clone();
                compile_unit(file, &mut interner, emit, limits).map(|out| (FileId(i as u32), out))
            })
            .collect::<DriverResult<Vec<_>>>()?;
        info!(units = units.len(), strings = shared.len(), "batch compilation finished");
        Ok(CompilationResults { units })
    }
}

/// Lex or compile one unit.
fn compile_unit(
    file: &SourceFile,
    interner: &mut dyn Interner,
    emit: EmitType,
    limits: Limits,
) -> DriverResult<UnitOutput> {
    debug!(chunk = %file.name, ?emit, "compiling unit");
    match emit {
        EmitType::Tokens => Ok(UnitOutput::Tokens(tokenize(&file.content, &file.name, interner)?)),
        EmitType::Requests => {
            let mut emitter = RecordingEmitter::new();
            let main = compile_chunk(&file.content, &file.name, interner, &mut emitter, limits)?;
            Ok(UnitOutput::Requests { main, emitter })
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyc_lex::Token;
    use skyc_par::{Constant, FuncId};

    fn string_constants(results: &CompilationResults, id: FileId) -> Vec<Symbol> {
        results
            .requests(id)
            .and_then(|e| e.function(FuncId(0)))
            .map(|f| {
                f.constants()
                    .filter_map(|c| match c {
                        Constant::String(s) => Some(*s),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_no_input_files() {
        let mut session = Session::new(Config::default());
        assert!(matches!(session.compile(), Err(DriverError::NoInputFiles)));
    }

    #[test]
    fn test_compile_requests() {
        let mut session = Session::new(Config::default());
        let a = session.add_source("a", "local x = 1");
        let b = session.add_source("b", "return function() end");
        let results = session.compile().expect("compiles");
        assert_eq!(results.units.len(), 2);
        assert_eq!(results.requests(a).map(|e| e.functions().count()), Some(1));
        assert_eq!(results.requests(b).map(|e| e.functions().count()), Some(2));
        assert!(results.tokens(a).is_none());
    }

    #[test]
    fn test_emit_tokens() {
        let config = Config {
            emit: EmitType::Tokens,
            ..Config::default()
        };
        let mut session = Session::new(config);
        let id = session.add_source("t", "local x = 1");
        let results = session.compile().expect("lexes");
        let tokens = results.tokens(id).expect("tokens");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].token, Token::Local);
        match tokens[1].token {
            Token::Name(s) => assert_eq!(session.display(s), "x"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_stops_compilation() {
        let mut session = Session::new(Config::default());
        session.add_source("ok", "x = 1");
        session.add_source("bad", "x = = 1");
        let err = session.compile().expect_err("rejects");
        assert_eq!(err.to_string(), "bad:1: unexpected symbol near '='");
    }

    #[test]
    fn test_limits_from_config() {
        let mut config = Config::default();
        config.limits.max_locals = 2;
        let mut session = Session::new(config);
        session.add_source("l", "local a, b, c");
        let err = session.compile().expect_err("too many locals");
        assert!(err.as_compile_error().is_some_and(|e| e.is_semantic()));
    }

    #[test]
    fn test_batch_shares_symbols() {
        let config = Config {
            interner: InternerMode::Shared,
            ..Config::default()
        };
        let mut session = Session::new(config);
        let ids: Vec<_> = (0..8)
            .map(|i| session.add_source(&format!("u{i}"), "greeting = 'hello'"))
            .collect();
        let results = session.compile().expect("compiles");
        let first = string_constants(&results, ids[0]);
        assert_eq!(first.len(), 2);
        for id in &ids[1..] {
            assert_eq!(string_constants(&results, *id), first);
        }
    }

    #[test]
    fn test_batch_promotes_local_table() {
        let mut session = Session::new(Config::default());
        let id = session.add_source("p", "name = 'value'");
        let before = session.compile().expect("compiles");
        let symbols = string_constants(&before, id);

        let after = session.compile_batch().expect("compiles");
        assert_eq!(session.config.interner, InternerMode::Shared);
        assert_eq!(string_constants(&after, id), symbols);
        assert!(symbols.iter().any(|s| session.display(*s) == "name"));
    }
}
