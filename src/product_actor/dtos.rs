use crate::domain::ProductDraft;

/// Partial edit of a product. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub price_per_week: Option<f64>,
    pub price_per_month: Option<f64>,
    /// Declared available stock. Raises the fleet size when it exceeds it.
    pub stock: Option<u32>,
}

impl From<ProductDraft> for ProductPatch {
    fn from(draft: ProductDraft) -> Self {
        Self {
            name: Some(draft.name),
            category: Some(draft.category),
            description: Some(draft.description),
            image: draft.image,
            image_url: draft.image_url,
            price_per_week: Some(draft.price_per_week),
            price_per_month: Some(draft.price_per_month),
            stock: Some(draft.stock),
        }
    }
}
