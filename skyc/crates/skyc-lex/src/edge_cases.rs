//! Edge case tests for skyc-lex
