use crate::actor_framework::Entity;
use crate::domain::{Product, ProductDraft};
use super::dtos::ProductPatch;
use super::error::ProductError;

fn check_price(price: f64) -> Result<f64, ProductError> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(ProductError::InvalidPrice(price))
    }
}

/// Checks a new product before it enters the cache.
pub fn validate_draft(draft: &ProductDraft) -> Result<(), ProductError> {
    if draft.name.trim().is_empty() {
        return Err(ProductError::ValidationError("Name must not be empty".to_string()));
    }
    check_price(draft.price_per_week)?;
    check_price(draft.price_per_month)?;
    Ok(())
}

impl Entity for Product {
    type Patch = ProductPatch;
    type Action = ();
    type ActionResult = ();
    type Error = ProductError;

    const KIND: &'static str = "Product";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    /// Applies an admin edit.
    ///
    /// # Fields Updated
    /// - `stock`: set to the declared value
    /// - `total_stock`: raised to the declared stock when it is larger, never lowered
    ///
    /// # Errors
    /// Negative or non-finite prices and blank names are rejected before anything changes.
    fn on_update(&mut self, patch: ProductPatch) -> Result<(), ProductError> {
        let price_per_week = patch.price_per_week.map(check_price).transpose()?;
        let price_per_month = patch.price_per_month.map(check_price).transpose()?;
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(ProductError::ValidationError("Name must not be empty".to_string()));
        }

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(image) = patch.image {
            self.image = Some(image);
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = Some(image_url);
        }
        if let Some(price) = price_per_week {
            self.price_per_week = price;
        }
        if let Some(price) = price_per_month {
            self.price_per_month = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
            self.total_stock = self.total_stock.max(stock);
        }
        Ok(())
    }

    fn handle_action(&mut self, _action: ()) -> Result<(), ProductError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_never_lowers_total_stock() {
        let mut product = Product::new("p1", "PlayStation 5", 50.0, 150.0, 5);

        product
            .on_update(ProductPatch { stock: Some(3), ..ProductPatch::default() })
            .unwrap();
        assert_eq!((product.stock, product.total_stock), (3, 5));

        product
            .on_update(ProductPatch { stock: Some(8), ..ProductPatch::default() })
            .unwrap();
        assert_eq!((product.stock, product.total_stock), (8, 8));
        assert!(product.stock <= product.total_stock);
    }

    #[test]
    fn drafts_need_a_name_and_valid_prices() {
        let mut draft = ProductDraft::from(&Product::new("p1", "PlayStation 5", 50.0, 150.0, 5));
        assert_eq!(validate_draft(&draft), Ok(()));

        draft.price_per_month = f64::NAN;
        assert!(matches!(validate_draft(&draft), Err(ProductError::InvalidPrice(_))));

        draft.name = "  ".into();
        assert!(matches!(validate_draft(&draft), Err(ProductError::ValidationError(_))));
    }

    #[test]
    fn invalid_price_rejects_whole_edit() {
        let mut product = Product::new("p1", "PlayStation 5", 50.0, 150.0, 5);
        let result = product.on_update(ProductPatch {
            price_per_week: Some(-1.0),
            stock: Some(9),
            ..ProductPatch::default()
        });

        assert_eq!(result, Err(ProductError::InvalidPrice(-1.0)));
        assert_eq!(product.stock, 5);
        assert_eq!(product.price_per_week, 50.0);
    }
}
