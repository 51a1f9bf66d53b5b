//! The pipeline driver: runs every stage from pragma scan to emission.
//!
//! ```text
//! pragmas → parse → combine → lower → sigils → expand → taskfunc frames
//!         → order → sigils + control pars → dots → optimize → compact → emit
//! ```
//!
//! Each stage reports progress and checks the cancellation flag before it
//! starts. A failing stage aborts the compilation; there is no partial output.

use std::sync::atomic::{AtomicBool, Ordering};

use ksp_core::KspError;
use ksp_parser::ast::{Block, Module};
use ksp_parser::{LineMap, Parser};
use ksp_registry::Builtins;

use crate::context::CompilationContext;
use crate::emit::Emitter;
use crate::options::CompileOptions;
use crate::passes::{
    CompactPass, CompactionMap, ControlParPass, DotsPass, ExpandPass, LowerPass, OptimizePass, OrderPass, SigilPass,
    TaskfuncPass, combine_callbacks,
};
use crate::pragma::scan_pragmas;

/// The result of a successful compilation.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub code: String,
    /// Present when variables were compacted.
    pub compaction: Option<CompactionMap>,
    /// The options in effect after pragmas were applied.
    pub options: CompileOptions,
}

type Progress<'a> = Box<dyn FnMut(&str, u32) + 'a>;

pub struct Compiler<'a> {
    builtins: &'a Builtins,
    options: CompileOptions,
    progress: Option<Progress<'a>>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Compiler<'a> {
    pub fn new(builtins: &'a Builtins, options: CompileOptions) -> Self {
        Self {
            builtins,
            options,
            progress: None,
            cancel: None,
        }
    }

    /// Called with a stage description and a percentage before each stage.
    pub fn with_progress(mut self, progress: impl FnMut(&str, u32) + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Compilation stops with [`KspError::Cancelled`] once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn stage(&mut self, description: &str, percent: u32) -> Result<(), KspError> {
        if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            tracing::debug!(stage = description, "compilation cancelled");
            return Err(KspError::Cancelled);
        }
        tracing::debug!(stage = description, percent, "compiler stage");
        if let Some(progress) = self.progress.as_mut() {
            progress(description, percent);
        }
        Ok(())
    }

    /// Compile a single-file script; diagnostics use the configured file name.
    pub fn compile_source(&mut self, source: &str) -> Result<Compiled, KspError> {
        let lines = LineMap::single(self.options.file_name.as_deref());
        self.compile(source, &lines)
    }

    /// Compile `source`, whose lines are described by `lines`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&mut self, source: &str, lines: &LineMap) -> Result<Compiled, KspError> {
        self.stage("scanning pragmas", 0)?;
        let mut options = self.options.clone();
        scan_pragmas(source, lines, &mut options)?;

        self.stage("parsing", 5)?;
        let mut module = Parser::parse(source, lines)?;

        if options.combine_callbacks {
            self.stage("combining callbacks", 15)?;
            module = combine_callbacks(module);
        }

        let mut ctx = CompilationContext::new(self.builtins, lines);

        self.stage("lowering declarations and control flow", 20)?;
        let module = LowerPass::new(&mut ctx).run(module)?;

        self.stage("resolving variable types", 30)?;
        let module = SigilPass::new(&mut ctx).run(module)?;

        self.stage("expanding functions", 40)?;
        let module = ExpandPass::new(&mut ctx).run(module)?;

        self.stage("building taskfunc frames", 55)?;
        let module = TaskfuncPass::new(&mut ctx).run(module)?;

        self.stage("ordering functions", 65)?;
        let module = OrderPass::new(&mut ctx).run(module)?;

        self.stage("checking control parameters", 75)?;
        let module = SigilPass::new(&mut ctx).run(module)?;
        let module = ControlParPass::new(&mut ctx).run(module)?;

        self.stage("converting dots", 80)?;
        let mut module = DotsPass::new(&mut ctx).run(module)?;

        if options.optimize_code {
            self.stage("optimizing", 85)?;
            module = OptimizePass::new().run(module)?;
        }

        let mut compaction = None;
        if options.compact_variables {
            self.stage("compacting variable names", 90)?;
            let (compacted, map) = CompactPass::new(&mut ctx)?.run(module, &options.preserve_names)?;
            module = compacted;
            compaction = Some(map);
        }

        self.stage("emitting code", 95)?;
        let code = Emitter::new(self.builtins, &options).emit_module(&module);

        tracing::info!(
            functions = emitted_functions(&module),
            compacted = compaction.as_ref().map_or(0, CompactionMap::len),
            "compilation finished"
        );
        self.stage("done", 100)?;

        Ok(Compiled {
            code,
            compaction,
            options,
        })
    }
}

fn emitted_functions(module: &Module) -> usize {
    module.blocks.iter().filter(|b| matches!(b, Block::Function(_))).count()
}
