use labstock_inventory::InventoryItem;

/// Items strictly below their reorder threshold, sorted by name.
pub fn list_shortages<'a, I>(items: I) -> Vec<InventoryItem>
where
    I: IntoIterator<Item = &'a InventoryItem>,
{
    let mut short: Vec<InventoryItem> = items
        .into_iter()
        .filter(|item| item.is_short())
        .cloned()
        .collect();
    short.sort_by(|a, b| a.name().cmp(b.name()));
    short
}

/// Units needed to get back to `min_stock`.
pub fn deficit(item: &InventoryItem) -> u64 {
    item.min_stock().saturating_sub(item.quantity())
}
