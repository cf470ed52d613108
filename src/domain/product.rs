use serde::{Deserialize, Serialize};

/// Represents a rentable item in the inventory.
///
/// `stock` is what is currently available, `total_stock` is the fleet size.
/// Edits keep `stock <= total_stock` by raising the total, never lowering it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub price_per_week: f64,
    pub price_per_month: f64,
    pub stock: u32,
    pub total_stock: u32,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price_per_week: f64,
        price_per_month: f64,
        stock: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: String::new(),
            description: String::new(),
            image: None,
            image_url: None,
            price_per_week,
            price_per_month,
            stock,
            total_stock: stock,
        }
    }

    /// Builds a product from an admin draft. The fleet size starts at the declared stock.
    pub fn from_draft(id: impl Into<String>, draft: ProductDraft) -> Self {
        Self {
            id: id.into(),
            name: draft.name,
            category: draft.category,
            description: draft.description,
            image: draft.image,
            image_url: draft.image_url,
            price_per_week: draft.price_per_week,
            price_per_month: draft.price_per_month,
            stock: draft.stock,
            total_stock: draft.stock,
        }
    }

    /// Primary image, falling back to the remote URL.
    pub fn display_image(&self) -> Option<&str> {
        self.image.as_deref().or(self.image_url.as_deref())
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Admin form for adding or editing a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub category: String,
    pub description: String,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub price_per_week: f64,
    pub price_per_month: f64,
    pub stock: u32,
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            category: product.category.clone(),
            description: product.description.clone(),
            image: product.image.clone(),
            image_url: product.image_url.clone(),
            price_per_week: product.price_per_week,
            price_per_month: product.price_per_month,
            stock: product.stock,
        }
    }
}
