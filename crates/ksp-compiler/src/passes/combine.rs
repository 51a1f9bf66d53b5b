//! Callback combination.
//!
//! Callbacks are keyed by name plus bound UI variable. The first occurrence
//! of a key absorbs the bodies of every later duplicate, in encounter order,
//! and the duplicates are dropped. Functions keep their positions.

use ksp_parser::ast::{Block, Module};
use rustc_hash::FxHashMap;

#[cfg_attr(feature = "profiling", profiling::function)]
pub fn combine_callbacks(module: Module) -> Module {
    let mut first: FxHashMap<(String, Option<String>), usize> = FxHashMap::default();
    let mut blocks: Vec<Block> = Vec::with_capacity(module.blocks.len());

    for block in module.blocks {
        let Block::Callback(callback) = block else {
            blocks.push(block);
            continue;
        };

        let key = (callback.name.clone(), callback.variable.as_ref().map(|v| v.full()));
        match first.get(&key) {
            Some(&index) => {
                if let Some(Block::Callback(target)) = blocks.get_mut(index) {
                    tracing::trace!(callback = %callback.name, "merging duplicate callback");
                    target.body.extend(callback.body);
                }
            }
            None => {
                first.insert(key, blocks.len());
                blocks.push(Block::Callback(callback));
            }
        }
    }

    Module { blocks }
}
