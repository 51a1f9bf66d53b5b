// tests/test_harness.rs
//! Test harness for compiling the scripts under `test_scripts/`.

#![allow(dead_code)]

use kspc::{CompileOptions, Compiled, KspError};
use std::fs;
use std::path::PathBuf;

/// The outcome of compiling one script, with its source kept for messages.
pub struct TestResult {
    pub source: String,
    pub result: Result<Compiled, KspError>,
}

pub struct TestHarness {
    test_scripts_dir: PathBuf,
    options: CompileOptions,
}

impl TestHarness {
    pub fn new() -> Self {
        let test_scripts_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_scripts");
        Self {
            test_scripts_dir,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn load(&self, filename: &str) -> String {
        let path = self.test_scripts_dir.join(filename);
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
    }

    pub fn compile(&self, filename: &str) -> TestResult {
        let source = self.load(filename);
        let options = self.options.clone().with_file_name(filename);
        let result = kspc::compile(&source, &options);
        TestResult { source, result }
    }
}

impl TestResult {
    /// The emitted code; panics with the error and the source on failure.
    pub fn code(&self) -> &str {
        match &self.result {
            Ok(compiled) => &compiled.code,
            Err(err) => panic!("Expected successful compilation, got: {err}\n\nSource:\n{}", self.source),
        }
    }

    pub fn assert_contains(&self, expected: &str) {
        let code = self.code();
        assert!(code.contains(expected), "expected {expected:?} in:\n{code}");
    }

    pub fn assert_lacks(&self, unexpected: &str) {
        let code = self.code();
        assert!(!code.contains(unexpected), "did not expect {unexpected:?} in:\n{code}");
    }

    /// Byte offset of `needle`; panics when it is missing.
    pub fn position(&self, needle: &str) -> usize {
        let code = self.code();
        code.find(needle).unwrap_or_else(|| panic!("{needle:?} not found in:\n{code}"))
    }
}
