//! Pooled allocation of expression nodes.
//!
//! Reading a stream that invokes the same macros thousands of times churns
//! through identically-shaped expression nodes. [`ExpressionPool`] amortizes
//! that: each concrete expression kind has its own slot arena and cursor.
//! A `create_*` call overwrites the slot at the kind's cursor (or grows the
//! arena by doubling) and advances the cursor; [`ExpressionPool::clear`]
//! resets every cursor to zero without deallocating backing storage,
//! logically returning every node to the pool at once.
//!
//! Rather than handing out references whose validity silently ends at the
//! next `clear()`, the pool returns generation-tagged [`ExprHandle`]s. A
//! handle records the epoch it was created in; [`ExpressionPool::get`] on a
//! handle from an earlier epoch is a detectable error instead of a stale
//! read. Nodes are therefore valid exactly between two `clear()` calls, and
//! misuse fails loudly.
//!
//! The pool is single-threaded, like every other component of this crate:
//! one pool per reader per thread.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::sync::Arc;

use crate::expr::{ExprKind, Expression};
use crate::macros::Macro;
use crate::types::{Annotations, SymbolToken, Timestamp, ValueType};
use crate::VellumError;

/// Initial slot count per kind; chosen so typical invocations never grow.
const POOL_SIZE: usize = 32;

/// A generation-tagged reference to a pooled expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprHandle {
    kind: ExprKind,
    slot: usize,
    epoch: u64,
}

impl ExprHandle {
    pub fn kind(&self) -> ExprKind {
        self.kind
    }
}

/// One kind's slot arena.
#[derive(Debug)]
struct Slots {
    entries: Vec<Expression>,
    cursor: usize,
}

impl Slots {
    fn new() -> Self {
        Slots { entries: Vec::with_capacity(POOL_SIZE), cursor: 0 }
    }

    /// Writes `expression` into the slot at the cursor, reusing the slot if
    /// one exists, and advances the cursor.
    fn create(&mut self, expression: Expression) -> usize {
        let slot = self.cursor;
        if slot < self.entries.len() {
            self.entries[slot] = expression;
        } else {
            // Vec growth doubles capacity, matching the pool's growth policy.
            self.entries.push(expression);
        }
        self.cursor += 1;
        slot
    }

    fn get(&self, slot: usize) -> Option<&Expression> {
        if slot < self.cursor {
            self.entries.get(slot)
        } else {
            None
        }
    }

    fn clear(&mut self) {
        self.cursor = 0;
    }
}

/// A factory for [`Expression`] instances that pools per-kind backing
/// storage across [`clear`](ExpressionPool::clear) epochs.
#[derive(Debug)]
pub struct ExpressionPool {
    epoch: u64,
    nulls: Slots,
    bools: Slots,
    ints: Slots,
    big_ints: Slots,
    floats: Slots,
    decimals: Slots,
    timestamps: Slots,
    symbols: Slots,
    strings: Slots,
    clobs: Slots,
    blobs: Slots,
    field_names: Slots,
    eexpressions: Slots,
    expression_groups: Slots,
    lists: Slots,
    sexps: Slots,
    structs: Slots,
}

impl Default for ExpressionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionPool {
    pub fn new() -> Self {
        ExpressionPool {
            epoch: 0,
            nulls: Slots::new(),
            bools: Slots::new(),
            ints: Slots::new(),
            big_ints: Slots::new(),
            floats: Slots::new(),
            decimals: Slots::new(),
            timestamps: Slots::new(),
            symbols: Slots::new(),
            strings: Slots::new(),
            clobs: Slots::new(),
            blobs: Slots::new(),
            field_names: Slots::new(),
            eexpressions: Slots::new(),
            expression_groups: Slots::new(),
            lists: Slots::new(),
            sexps: Slots::new(),
            structs: Slots::new(),
        }
    }

    fn handle(&self, kind: ExprKind, slot: usize) -> ExprHandle {
        ExprHandle { kind, slot, epoch: self.epoch }
    }

    fn slots_for(&self, kind: ExprKind) -> Option<&Slots> {
        match kind {
            ExprKind::Null => Some(&self.nulls),
            ExprKind::Bool => Some(&self.bools),
            ExprKind::Int => Some(&self.ints),
            ExprKind::BigInt => Some(&self.big_ints),
            ExprKind::Float => Some(&self.floats),
            ExprKind::Decimal => Some(&self.decimals),
            ExprKind::Timestamp => Some(&self.timestamps),
            ExprKind::Symbol => Some(&self.symbols),
            ExprKind::String => Some(&self.strings),
            ExprKind::Clob => Some(&self.clobs),
            ExprKind::Blob => Some(&self.blobs),
            ExprKind::FieldName => Some(&self.field_names),
            ExprKind::EExpression => Some(&self.eexpressions),
            ExprKind::ExpressionGroup => Some(&self.expression_groups),
            ExprKind::List => Some(&self.lists),
            ExprKind::SExp => Some(&self.sexps),
            ExprKind::Struct => Some(&self.structs),
            ExprKind::MacroInvocation | ExprKind::VariableRef | ExprKind::Placeholder => None,
        }
    }

    /// Resolves a handle to its node.
    ///
    /// # Errors
    /// Fails with a stale-handle error if the handle predates the most recent
    /// [`clear`](Self::clear), or refers past the current cursor of its kind.
    pub fn get(&self, handle: ExprHandle) -> Result<&Expression, VellumError> {
        if handle.epoch != self.epoch {
            return Err(VellumError::stale_handle(format!(
                "handle from epoch {} used in epoch {}",
                handle.epoch, self.epoch
            )));
        }
        let slots = self.slots_for(handle.kind).ok_or_else(|| {
            VellumError::defect(format!("expression kind {} is never pooled", handle.kind))
        })?;
        slots.get(handle.slot).ok_or_else(|| {
            VellumError::stale_handle(format!(
                "slot {} of kind {} is not live in the current epoch",
                handle.slot, handle.kind
            ))
        })
    }

    /// Returns every node to the pool. All handles from the previous epoch
    /// become stale; backing storage is retained.
    pub fn clear(&mut self) {
        self.epoch += 1;
        self.nulls.clear();
        self.bools.clear();
        self.ints.clear();
        self.big_ints.clear();
        self.floats.clear();
        self.decimals.clear();
        self.timestamps.clear();
        self.symbols.clear();
        self.clobs.clear();
        self.strings.clear();
        self.blobs.clear();
        self.field_names.clear();
        self.eexpressions.clear();
        self.expression_groups.clear();
        self.lists.clear();
        self.sexps.clear();
        self.structs.clear();
    }

    pub fn create_null(&mut self, annotations: Annotations, value_type: ValueType) -> ExprHandle {
        let slot = self.nulls.create(Expression::Null { annotations, value_type });
        self.handle(ExprKind::Null, slot)
    }

    pub fn create_bool(&mut self, annotations: Annotations, value: bool) -> ExprHandle {
        let slot = self.bools.create(Expression::Bool { annotations, value });
        self.handle(ExprKind::Bool, slot)
    }

    pub fn create_int(&mut self, annotations: Annotations, value: i64) -> ExprHandle {
        let slot = self.ints.create(Expression::Int { annotations, value });
        self.handle(ExprKind::Int, slot)
    }

    pub fn create_big_int(&mut self, annotations: Annotations, value: BigInt) -> ExprHandle {
        let slot = self.big_ints.create(Expression::BigInt { annotations, value });
        self.handle(ExprKind::BigInt, slot)
    }

    pub fn create_float(&mut self, annotations: Annotations, value: f64) -> ExprHandle {
        let slot = self.floats.create(Expression::Float { annotations, value });
        self.handle(ExprKind::Float, slot)
    }

    pub fn create_decimal(&mut self, annotations: Annotations, value: BigDecimal) -> ExprHandle {
        let slot = self.decimals.create(Expression::Decimal { annotations, value });
        self.handle(ExprKind::Decimal, slot)
    }

    pub fn create_timestamp(&mut self, annotations: Annotations, value: Timestamp) -> ExprHandle {
        let slot = self.timestamps.create(Expression::Timestamp { annotations, value });
        self.handle(ExprKind::Timestamp, slot)
    }

    pub fn create_symbol(&mut self, annotations: Annotations, value: SymbolToken) -> ExprHandle {
        let slot = self.symbols.create(Expression::Symbol { annotations, value });
        self.handle(ExprKind::Symbol, slot)
    }

    pub fn create_string(&mut self, annotations: Annotations, value: String) -> ExprHandle {
        let slot = self.strings.create(Expression::String { annotations, value });
        self.handle(ExprKind::String, slot)
    }

    pub fn create_clob(&mut self, annotations: Annotations, value: Vec<u8>) -> ExprHandle {
        let slot = self.clobs.create(Expression::Clob { annotations, value });
        self.handle(ExprKind::Clob, slot)
    }

    pub fn create_blob(&mut self, annotations: Annotations, value: Vec<u8>) -> ExprHandle {
        let slot = self.blobs.create(Expression::Blob { annotations, value });
        self.handle(ExprKind::Blob, slot)
    }

    pub fn create_field_name(&mut self, name: SymbolToken) -> ExprHandle {
        let slot = self.field_names.create(Expression::FieldName(name));
        self.handle(ExprKind::FieldName, slot)
    }

    pub fn create_eexpression(
        &mut self,
        invoked: Arc<Macro>,
        self_index: usize,
        end_exclusive: usize,
    ) -> ExprHandle {
        let slot = self
            .eexpressions
            .create(Expression::EExpression { invoked, self_index, end_exclusive });
        self.handle(ExprKind::EExpression, slot)
    }

    pub fn create_expression_group(&mut self, self_index: usize, end_exclusive: usize) -> ExprHandle {
        let slot = self
            .expression_groups
            .create(Expression::ExpressionGroup { self_index, end_exclusive });
        self.handle(ExprKind::ExpressionGroup, slot)
    }

    pub fn create_list(
        &mut self,
        annotations: Annotations,
        self_index: usize,
        end_exclusive: usize,
    ) -> ExprHandle {
        let slot = self.lists.create(Expression::List { annotations, self_index, end_exclusive });
        self.handle(ExprKind::List, slot)
    }

    pub fn create_sexp(
        &mut self,
        annotations: Annotations,
        self_index: usize,
        end_exclusive: usize,
    ) -> ExprHandle {
        let slot = self.sexps.create(Expression::SExp { annotations, self_index, end_exclusive });
        self.handle(ExprKind::SExp, slot)
    }

    pub fn create_struct(
        &mut self,
        annotations: Annotations,
        self_index: usize,
        end_exclusive: usize,
    ) -> ExprHandle {
        let slot = self.structs.create(Expression::Struct { annotations, self_index, end_exclusive });
        self.handle(ExprKind::Struct, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_reused_across_epochs_in_order() {
        let mut pool = ExpressionPool::new();
        let first = pool.create_string(Vec::new(), "a".to_string());
        let first_addr = pool.get(first).unwrap() as *const Expression;

        pool.clear();
        let second = pool.create_string(Vec::new(), "b".to_string());
        let second_addr = pool.get(second).unwrap() as *const Expression;

        // Same slot, same allocation, fully overwritten fields.
        assert_eq!(first_addr, second_addr);
        match pool.get(second).unwrap() {
            Expression::String { value, .. } => assert_eq!(value, "b"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn handles_go_stale_at_clear() {
        let mut pool = ExpressionPool::new();
        let handle = pool.create_bool(Vec::new(), true);
        assert!(pool.get(handle).is_ok());

        pool.clear();
        let err = pool.get(handle).unwrap_err();
        assert!(matches!(err, VellumError::StaleHandle { .. }));
    }

    #[test]
    fn slots_past_the_cursor_are_not_live() {
        let mut pool = ExpressionPool::new();
        let a = pool.create_int(Vec::new(), 1);
        let _b = pool.create_int(Vec::new(), 2);
        pool.clear();
        // Only one create this epoch; the second slot exists but is not live.
        let a2 = pool.create_int(Vec::new(), 10);
        assert!(pool.get(a2).is_ok());
        // `a` is from the old epoch regardless of slot index.
        assert!(pool.get(a).is_err());
    }

    #[test]
    fn growth_past_initial_capacity() {
        let mut pool = ExpressionPool::new();
        let handles: Vec<_> = (0..100).map(|i| pool.create_int(Vec::new(), i)).collect();
        for (i, handle) in handles.iter().enumerate() {
            match pool.get(*handle).unwrap() {
                Expression::Int { value, .. } => assert_eq!(*value, i as i64),
                other => panic!("expected int, got {:?}", other),
            }
        }
    }

    #[test]
    fn kinds_are_pooled_independently() {
        let mut pool = ExpressionPool::new();
        let int = pool.create_int(Vec::new(), 5);
        let group = pool.create_expression_group(0, 1);
        assert_eq!(int.kind(), ExprKind::Int);
        assert_eq!(group.kind(), ExprKind::ExpressionGroup);
        // Both occupy slot 0 of their own arenas.
        assert!(pool.get(int).is_ok());
        assert!(pool.get(group).is_ok());
    }
}
