//! 句柄表：库存对象优先，其次是本次回放动态创建的对象。

use std::collections::HashMap;

use emf_core::object::{GraphicsObject, StockObjects, stock};
use tracing::{debug, warn};

use crate::errors::EngineError;

#[derive(Debug)]
pub struct HandleTable {
    stock: &'static StockObjects,
    objects: HashMap<u32, GraphicsObject>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::with_stock(StockObjects::shared())
    }

    pub fn with_stock(stock: &'static StockObjects) -> Self {
        Self {
            stock,
            objects: HashMap::new(),
        }
    }

    /// 在生成方指定的句柄下登记对象。已存在的对象被覆盖。
    pub fn create(&mut self, handle: u32, object: GraphicsObject) {
        if stock::is_stock(handle) && self.stock.get(handle).is_some() {
            warn!(handle, kind = object.kind_name(), "对象句柄与库存对象冲突，库存对象优先");
        }
        if let Some(previous) = self.objects.insert(handle, object) {
            debug!(handle, kind = previous.kind_name(), "句柄被重新使用");
        }
    }

    /// 删除动态对象；库存句柄忽略。
    pub fn delete(&mut self, handle: u32) -> Option<GraphicsObject> {
        if stock::is_stock(handle) && self.stock.get(handle).is_some() {
            debug!(handle, "忽略删除库存对象");
            return None;
        }
        let removed = self.objects.remove(&handle);
        if removed.is_none() {
            debug!(handle, "删除不存在的句柄");
        }
        removed
    }

    pub fn resolve(&self, handle: u32) -> Result<&GraphicsObject, EngineError> {
        self.stock
            .get(handle)
            .or_else(|| self.objects.get(&handle))
            .ok_or(EngineError::UnresolvedHandle { handle })
    }

    /// 可变访问只对动态对象开放。
    pub fn resolve_mut(&mut self, handle: u32) -> Result<&mut GraphicsObject, EngineError> {
        if self.stock.get(handle).is_some() {
            return Err(EngineError::InvalidArgument(format!(
                "stock object {handle:#x} is read-only"
            )));
        }
        self.objects
            .get_mut(&handle)
            .ok_or(EngineError::UnresolvedHandle { handle })
    }

    /// 动态对象数量。
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emf_core::color::ColorRef;
    use emf_core::object::{Brush, Palette, Pen};

    #[test]
    fn stock_objects_win_on_collision() {
        let mut table = HandleTable::new();
        table.create(
            stock::WHITE_BRUSH,
            GraphicsObject::Pen(Pen::cosmetic(ColorRef::rgb(1, 2, 3))),
        );
        assert_eq!(
            table.resolve(stock::WHITE_BRUSH).expect("stock"),
            &GraphicsObject::Brush(Brush::Solid(ColorRef::WHITE))
        );
        assert!(table.delete(stock::WHITE_BRUSH).is_none());
        assert!(table.resolve_mut(stock::WHITE_BRUSH).is_err());
    }

    #[test]
    fn deleted_handles_stop_resolving() {
        let mut table = HandleTable::new();
        table.create(3, GraphicsObject::Palette(Palette::default()));
        assert_eq!(table.len(), 1);
        assert!(table.resolve(3).is_ok());
        assert!(table.delete(3).is_some());
        assert_eq!(
            table.resolve(3).unwrap_err(),
            EngineError::UnresolvedHandle { handle: 3 }
        );
        assert!(table.delete(3).is_none());
    }

    #[test]
    fn unassigned_stock_ids_fall_through_to_dynamic_table() {
        let mut table = HandleTable::new();
        table.create(0x8000_0009, GraphicsObject::Brush(Brush::Null));
        assert_eq!(
            table.resolve(0x8000_0009).expect("dynamic"),
            &GraphicsObject::Brush(Brush::Null)
        );
    }
}
