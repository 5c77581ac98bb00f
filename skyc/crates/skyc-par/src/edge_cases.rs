//! Edge case tests for skyc-par

#[cfg(test)]
mod tests {
    use crate::{
        compile_chunk, FuncId, Instruction, Limits, Operand, RecordingEmitter, ResultCount,
    };
    use skyc_util::{CompileError, StringInterner};

    fn compile(source: &str) -> Result<RecordingEmitter, CompileError> {
        let mut interner = StringInterner::new();
        let mut emitter = RecordingEmitter::new();
        compile_chunk(
            source.as_bytes(),
            "=edge",
            &mut interner,
            &mut emitter,
            Limits::default(),
        )?;
        Ok(emitter)
    }

    fn compile_ok(source: &str) -> RecordingEmitter {
        let emitter = compile(source).unwrap_or_else(|e| panic!("{source:?}: {e}"));
        assert!(emitter.unpatched_jumps().is_empty(), "{source:?}");
        assert!(emitter.open_functions().is_empty(), "{source:?}");
        emitter
    }

    fn code(emitter: &RecordingEmitter, id: FuncId) -> Vec<Instruction> {
        emitter
            .function(id)
            .map(|f| f.instructions().copied().collect())
            .unwrap_or_default()
    }

    // ==================== EDGE CASES ====================

    /// EDGE CASE: Empty source
    #[test]
    fn test_edge_empty_source() {
        let emitter = compile_ok("");
        assert_eq!(emitter.functions().count(), 1);
        assert_eq!(code(&emitter, FuncId(0)), vec![Instruction::Return {
            first: 0,
            count: ResultCount::Fixed(0),
        }]);
    }

    /// EDGE CASE: Whitespace and comments only
    #[test]
    fn test_edge_comments_only() {
        let emitter = compile_ok("  \n-- line\n--[==[ long\n]==]\t\n");
        assert_eq!(code(&emitter, FuncId(0)).len(), 1);
    }

    /// EDGE CASE: Empty statements
    #[test]
    fn test_edge_semicolons_only() {
        let emitter = compile_ok(";;;  ;");
        assert_eq!(code(&emitter, FuncId(0)).len(), 1);
    }

    /// EDGE CASE: Function with an empty body
    #[test]
    fn test_edge_empty_function() {
        let emitter = compile_ok("function f() end");
        assert_eq!(emitter.functions().count(), 2);
        assert_eq!(code(&emitter, FuncId(1)), vec![Instruction::Return {
            first: 0,
            count: ResultCount::Fixed(0),
        }]);
    }

    /// EDGE CASE: Deep but legal parenthesis nesting
    #[test]
    fn test_edge_deep_parentheses() {
        let source = format!("x = {}1{}", "(".repeat(100), ")".repeat(100));
        compile_ok(&source);
    }

    /// EDGE CASE: Deeply nested blocks
    #[test]
    fn test_edge_nested_blocks() {
        let source = format!("{}{}", "do ".repeat(60), "end ".repeat(60));
        compile_ok(&source);
    }

    /// EDGE CASE: Value of a short-circuit expression
    #[test]
    fn test_edge_and_or_value() {
        compile_ok("x = a and b or c");
        compile_ok("local v = (a or b) and not c");
    }

    /// EDGE CASE: Trailing separators in a constructor
    #[test]
    fn test_edge_constructor_separators() {
        let emitter = compile_ok("t = {1, 2; 3,}");
        assert!(code(&emitter, FuncId(0)).contains(&Instruction::NewTable {
            dst: 0,
            array: 3,
            hash: 0,
        }));
        compile_ok("t = {}");
    }

    /// EDGE CASE: Separator without a field
    #[test]
    fn test_edge_constructor_lone_separator() {
        assert!(compile("t = {,}").is_err());
    }

    /// EDGE CASE: Long string as the only call argument
    #[test]
    fn test_edge_long_string_argument() {
        let emitter = compile_ok("print[[\nhello]]");
        assert!(code(&emitter, FuncId(0)).iter().any(|i| matches!(
            i,
            Instruction::Call {
                args: ResultCount::Fixed(1),
                results: ResultCount::Fixed(0),
                ..
            }
        )));
    }

    /// EDGE CASE: Method call on a parenthesized string
    #[test]
    fn test_edge_method_on_string() {
        let emitter = compile_ok("local s = ('x'):rep(3)");
        assert!(code(&emitter, FuncId(0))
            .iter()
            .any(|i| matches!(i, Instruction::Method { .. })));
    }

    /// EDGE CASE: Continue idiom with a label at the end of a loop body
    #[test]
    fn test_edge_goto_continue() {
        compile_ok(
            "for i = 1, 3 do\n  local x = i\n  if x == 2 then goto continue end\n  ::continue::\nend",
        );
    }

    /// EDGE CASE: Vararg in a function that does not declare it
    #[test]
    fn test_edge_vararg_in_fixed_function() {
        let err = compile("function f() return ... end").expect_err("vararg");
        assert!(err.is_semantic());
        assert!(err.to_string().contains("cannot use '...' outside a vararg function"));
        compile_ok("function f(...) return ... end");
    }

    /// EDGE CASE: Vararg forwarded as a tail call
    #[test]
    fn test_edge_tail_call_vararg() {
        let emitter = compile_ok("return f(...)");
        assert!(code(&emitter, FuncId(0)).iter().any(|i| matches!(
            i,
            Instruction::Call {
                args: ResultCount::Multiple,
                tail: true,
                ..
            }
        )));
    }

    /// EDGE CASE: Division by zero stays a runtime operation
    #[test]
    fn test_edge_division_by_zero_not_folded() {
        let emitter = compile_ok("x = 1 / 0");
        assert!(code(&emitter, FuncId(0))
            .iter()
            .any(|i| matches!(i, Instruction::Binary { .. })));
    }

    /// EDGE CASE: Input ends inside an expression
    #[test]
    fn test_edge_eof_in_expression() {
        let err = compile("x = ").expect_err("eof");
        assert!(err.is_syntax());
        assert_eq!(err.to_string(), "edge:1: unexpected symbol near <eof>");
    }

    /// EDGE CASE: Unfinished parameter list
    #[test]
    fn test_edge_unfinished_params() {
        let err = compile("function f(a,").expect_err("params");
        assert!(err.is_syntax());
    }

    /// EDGE CASE: Error line after blank lines
    #[test]
    fn test_edge_error_line() {
        let err = compile("\n\n\n\nlocal = 1").expect_err("name");
        assert_eq!(err.line, 5);
    }

    /// EDGE CASE: Upvalue threaded through an intermediate function
    #[test]
    fn test_edge_upvalue_chain() {
        let emitter = compile_ok(
            "local a\nfunction f()\n  return function() return a end\nend",
        );
        let summary = |id| {
            emitter
                .function(id)
                .and_then(|f| f.summary.clone())
                .expect("summary")
        };
        let middle = summary(FuncId(1));
        let inner = summary(FuncId(2));
        assert!(middle.upvalues[0].in_stack);
        assert!(!inner.upvalues[0].in_stack);
        assert_eq!(inner.upvalues[0].index, 0);
    }

    /// EDGE CASE: Assigning to a field of a local reassigned in the same statement
    #[test]
    fn test_edge_assignment_table_conflict() {
        let emitter = compile_ok("local t = {} t.x, t = 1, nil");
        let main = code(&emitter, FuncId(0));
        assert!(main.contains(&Instruction::Move { dst: 1, src: 0 }));
        assert!(main.iter().any(|i| matches!(
            i,
            Instruction::SetIndex {
                table: 1,
                key: Operand::Constant(_),
                ..
            }
        )));
    }

    /// EDGE CASE: Jump out of nested loops
    #[test]
    fn test_edge_break_inner_loop_only() {
        let emitter = compile_ok("while a do while b do break end x = 1 end");
        let jumps = emitter
            .function(FuncId(0))
            .map(|f| f.code.iter().filter(|(c, _)| c.is_jump()).count())
            .unwrap_or_default();
        assert!(jumps >= 4);
    }
}
