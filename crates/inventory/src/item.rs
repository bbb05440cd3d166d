//! Item catalog records.
//!
//! Every item carries a tagged [`ItemKind`]; only the stocked variants
//! (`Inventory`, `Assembly`) own quantity and valuation state, so code that
//! needs stock levels has to match on the kind and cannot reach them for a
//! service or tax item by accident.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use costflow_core::{AggregateRoot, ItemId};

use crate::error::{InventoryError, InventoryResult, checked, ensure_non_negative};

/// Catalog item type (untagged view of [`ItemKind`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Service,
    Inventory,
    NonInventory,
    OtherCharge,
    Assembly,
    Group,
    Discount,
    Payment,
    TaxItem,
    TaxGroup,
}

impl ItemType {
    /// Whether items of this type hold quantity and value.
    pub fn is_stocked(self) -> bool {
        match self {
            ItemType::Inventory | ItemType::Assembly => true,
            ItemType::Service
            | ItemType::NonInventory
            | ItemType::OtherCharge
            | ItemType::Group
            | ItemType::Discount
            | ItemType::Payment
            | ItemType::TaxItem
            | ItemType::TaxGroup => false,
        }
    }
}

/// Cost flow assumption used when stock leaves inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValuationMethod {
    #[default]
    Fifo,
    Lifo,
    Average,
}

impl ValuationMethod {
    /// FIFO and LIFO value stock from the lot ledger.
    pub fn is_lot_based(self) -> bool {
        match self {
            ValuationMethod::Fifo | ValuationMethod::Lifo => true,
            ValuationMethod::Average => false,
        }
    }
}

/// Quantity and valuation state of a stocked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub quantity_on_hand: Decimal,
    /// Kept current for every method; drives consumption only for `Average`.
    pub average_cost: Decimal,
    pub asset_value: Decimal,
    pub valuation_method: ValuationMethod,
    pub reorder_point: Decimal,
}

impl StockLevels {
    pub fn empty(valuation_method: ValuationMethod, reorder_point: Decimal) -> Self {
        Self {
            quantity_on_hand: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            asset_value: Decimal::ZERO,
            valuation_method,
            reorder_point,
        }
    }

    /// A zero reorder point disables reordering.
    pub fn needs_reorder(&self) -> bool {
        self.reorder_point > Decimal::ZERO && self.quantity_on_hand <= self.reorder_point
    }

    /// Re-derive the average cost from the current value and quantity.
    ///
    /// With nothing on hand the previous average is kept so that later
    /// adjustments still have a cost to apply.
    pub(crate) fn refresh_average_cost(&mut self) -> InventoryResult<()> {
        if self.quantity_on_hand > Decimal::ZERO {
            self.average_cost = checked(
                "average cost",
                self.asset_value.checked_div(self.quantity_on_hand),
            )?;
        }
        Ok(())
    }
}

/// Item variant with the state that belongs to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Service,
    Inventory(StockLevels),
    NonInventory,
    OtherCharge,
    Assembly(StockLevels),
    Group,
    Discount,
    Payment,
    TaxItem,
    TaxGroup,
}

impl ItemKind {
    fn new(item_type: ItemType, stock: StockLevels) -> Self {
        match item_type {
            ItemType::Service => ItemKind::Service,
            ItemType::Inventory => ItemKind::Inventory(stock),
            ItemType::NonInventory => ItemKind::NonInventory,
            ItemType::OtherCharge => ItemKind::OtherCharge,
            ItemType::Assembly => ItemKind::Assembly(stock),
            ItemType::Group => ItemKind::Group,
            ItemType::Discount => ItemKind::Discount,
            ItemType::Payment => ItemKind::Payment,
            ItemType::TaxItem => ItemKind::TaxItem,
            ItemType::TaxGroup => ItemKind::TaxGroup,
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            ItemKind::Service => ItemType::Service,
            ItemKind::Inventory(_) => ItemType::Inventory,
            ItemKind::NonInventory => ItemType::NonInventory,
            ItemKind::OtherCharge => ItemType::OtherCharge,
            ItemKind::Assembly(_) => ItemType::Assembly,
            ItemKind::Group => ItemType::Group,
            ItemKind::Discount => ItemType::Discount,
            ItemKind::Payment => ItemType::Payment,
            ItemKind::TaxItem => ItemType::TaxItem,
            ItemKind::TaxGroup => ItemType::TaxGroup,
        }
    }
}

/// Fields accepted by `create_item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub item_type: ItemType,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub sales_price: Option<Decimal>,
    /// Ignored for non-stocked types.
    pub valuation_method: ValuationMethod,
    /// Ignored for non-stocked types.
    pub reorder_point: Decimal,
}

impl NewItem {
    pub fn new(item_type: ItemType, name: impl Into<String>) -> Self {
        Self {
            item_type,
            name: name.into(),
            sku: None,
            description: None,
            sales_price: None,
            valuation_method: ValuationMethod::default(),
            reorder_point: Decimal::ZERO,
        }
    }

    pub fn with_valuation_method(mut self, method: ValuationMethod) -> Self {
        self.valuation_method = method;
        self
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_reorder_point(mut self, reorder_point: Decimal) -> Self {
        self.reorder_point = reorder_point;
        self
    }

    pub fn with_sales_price(mut self, price: Decimal) -> Self {
        self.sales_price = Some(price);
        self
    }
}

/// Metadata edits accepted by `update_item`.
///
/// Quantity and value are deliberately absent: they change only through the
/// costing operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub sales_price: Option<Decimal>,
    pub reorder_point: Option<Decimal>,
    /// Only accepted while the item has no lots.
    pub valuation_method: Option<ValuationMethod>,
}

/// Catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    name: String,
    sku: Option<String>,
    description: Option<String>,
    sales_price: Option<Decimal>,
    kind: ItemKind,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Item {
    /// Build a fresh item (version 0, nothing on hand).
    pub fn create(id: ItemId, fields: NewItem, created_at: DateTime<Utc>) -> InventoryResult<Self> {
        validate_name(&fields.name)?;
        if let Some(price) = fields.sales_price {
            ensure_non_negative("sales_price", price)?;
        }
        ensure_non_negative("reorder_point", fields.reorder_point)?;

        let stock = StockLevels::empty(fields.valuation_method, fields.reorder_point);
        Ok(Self {
            id,
            name: fields.name.trim().to_string(),
            sku: fields.sku,
            description: fields.description,
            sales_price: fields.sales_price,
            kind: ItemKind::new(fields.item_type, stock),
            created_at,
            version: 0,
        })
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn sales_price(&self) -> Option<Decimal> {
        self.sales_price
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    pub fn item_type(&self) -> ItemType {
        self.kind.item_type()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Stock levels, if this is a stocked item.
    pub fn stock(&self) -> Option<&StockLevels> {
        match &self.kind {
            ItemKind::Inventory(stock) | ItemKind::Assembly(stock) => Some(stock),
            ItemKind::Service
            | ItemKind::NonInventory
            | ItemKind::OtherCharge
            | ItemKind::Group
            | ItemKind::Discount
            | ItemKind::Payment
            | ItemKind::TaxItem
            | ItemKind::TaxGroup => None,
        }
    }

    /// Stock levels, or `InvalidItemType` for non-stocked items.
    pub fn require_stock(&self) -> InventoryResult<&StockLevels> {
        self.stock().ok_or_else(|| self.invalid_type())
    }

    pub(crate) fn require_stock_mut(&mut self) -> InventoryResult<&mut StockLevels> {
        let err = self.invalid_type();
        match &mut self.kind {
            ItemKind::Inventory(stock) | ItemKind::Assembly(stock) => Ok(stock),
            ItemKind::Service
            | ItemKind::NonInventory
            | ItemKind::OtherCharge
            | ItemKind::Group
            | ItemKind::Discount
            | ItemKind::Payment
            | ItemKind::TaxItem
            | ItemKind::TaxGroup => Err(err),
        }
    }

    /// `InvalidItemType` unless this is an `Assembly` item.
    pub fn require_assembly(&self) -> InventoryResult<()> {
        match self.kind {
            ItemKind::Assembly(_) => Ok(()),
            ItemKind::Inventory(_)
            | ItemKind::Service
            | ItemKind::NonInventory
            | ItemKind::OtherCharge
            | ItemKind::Group
            | ItemKind::Discount
            | ItemKind::Payment
            | ItemKind::TaxItem
            | ItemKind::TaxGroup => Err(self.invalid_type()),
        }
    }

    pub fn invalid_type(&self) -> InventoryError {
        InventoryError::InvalidItemType {
            item_id: self.id,
            item_type: self.item_type(),
        }
    }

    /// Apply a metadata update.
    ///
    /// `has_lots` tells whether any lot was ever received for this item; the
    /// valuation method is frozen from then on.
    pub fn apply_update(&mut self, update: ItemUpdate, has_lots: bool) -> InventoryResult<()> {
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(price) = update.sales_price {
            ensure_non_negative("sales_price", price)?;
        }
        if let Some(reorder_point) = update.reorder_point {
            ensure_non_negative("reorder_point", reorder_point)?;
        }

        if update.reorder_point.is_some() || update.valuation_method.is_some() {
            let stock = self.require_stock()?;
            if let Some(method) = update.valuation_method {
                if method != stock.valuation_method && has_lots {
                    return Err(InventoryError::validation(
                        "valuation method cannot change once lots have been received",
                    ));
                }
            }
        }

        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if update.sku.is_some() {
            self.sku = update.sku;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        if update.sales_price.is_some() {
            self.sales_price = update.sales_price;
        }
        if let Ok(stock) = self.require_stock_mut() {
            if let Some(reorder_point) = update.reorder_point {
                stock.reorder_point = reorder_point;
            }
            if let Some(method) = update.valuation_method {
                stock.valuation_method = method;
            }
        }
        Ok(())
    }

    /// Mark this value as the next committed version. Called by stores on commit.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl AggregateRoot for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn validate_name(name: &str) -> InventoryResult<()> {
    if name.trim().is_empty() {
        return Err(InventoryError::validation("name cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn widget(item_type: ItemType) -> Item {
        Item::create(ItemId::new(), NewItem::new(item_type, "Widget"), Utc::now()).unwrap()
    }

    #[test]
    fn only_assemblies_accept_recipes() {
        assert!(widget(ItemType::Assembly).require_assembly().is_ok());
        for t in [
            ItemType::Inventory,
            ItemType::Service,
            ItemType::NonInventory,
            ItemType::OtherCharge,
            ItemType::Group,
            ItemType::Discount,
            ItemType::Payment,
            ItemType::TaxItem,
            ItemType::TaxGroup,
        ] {
            assert!(matches!(
                widget(t).require_assembly(),
                Err(InventoryError::InvalidItemType { item_type, .. }) if item_type == t
            ));
        }
    }

    #[test]
    fn only_inventory_and_assembly_items_carry_stock() {
        assert!(widget(ItemType::Inventory).stock().is_some());
        assert!(widget(ItemType::Assembly).stock().is_some());
        for t in [
            ItemType::Service,
            ItemType::NonInventory,
            ItemType::OtherCharge,
            ItemType::Group,
            ItemType::Discount,
            ItemType::Payment,
            ItemType::TaxItem,
            ItemType::TaxGroup,
        ] {
            let item = widget(t);
            assert!(item.stock().is_none());
            assert!(!t.is_stocked());
            assert!(matches!(
                item.require_stock(),
                Err(InventoryError::InvalidItemType { item_type, .. }) if item_type == t
            ));
        }
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Item::create(ItemId::new(), NewItem::new(ItemType::Inventory, "  "), Utc::now())
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }

    #[test]
    fn update_changes_metadata_only() {
        let mut item = widget(ItemType::Inventory);
        item.apply_update(
            ItemUpdate {
                name: Some("Gadget".into()),
                reorder_point: Some(dec!(5)),
                ..ItemUpdate::default()
            },
            false,
        )
        .unwrap();

        assert_eq!(item.name(), "Gadget");
        let stock = item.stock().unwrap();
        assert_eq!(stock.reorder_point, dec!(5));
        assert_eq!(stock.quantity_on_hand, Decimal::ZERO);
    }

    #[test]
    fn valuation_method_is_frozen_once_lots_exist() {
        let mut item = widget(ItemType::Inventory);
        let update = ItemUpdate {
            valuation_method: Some(ValuationMethod::Lifo),
            ..ItemUpdate::default()
        };
        assert!(item.apply_update(update.clone(), true).is_err());
        item.apply_update(update, false).unwrap();
        assert_eq!(item.stock().unwrap().valuation_method, ValuationMethod::Lifo);
    }

    #[test]
    fn stock_fields_cannot_be_set_on_a_service() {
        let mut item = widget(ItemType::Service);
        let err = item
            .apply_update(
                ItemUpdate {
                    reorder_point: Some(dec!(1)),
                    ..ItemUpdate::default()
                },
                false,
            )
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidItemType { .. }));
    }
}
