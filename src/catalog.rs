//! Starter catalog posted to an empty store.

use crate::domain::{AddonSettings, Product};

fn console(
    name: &str,
    category: &str,
    description: &str,
    image: &str,
    photo: &str,
    prices: (f64, f64),
    stock: u32,
) -> Product {
    let mut product = Product::new(String::new(), name, prices.0, prices.1, stock);
    product.category = category.to_string();
    product.description = description.to_string();
    product.image = Some(image.to_string());
    product.image_url = Some(format!(
        "https://images.unsplash.com/{}?auto=format&fit=crop&q=80&w=1000",
        photo
    ));
    product
}

/// The four launch products. Ids are left empty for the store to assign.
pub fn default_products() -> Vec<Product> {
    vec![
        console(
            "PlayStation 5 Console",
            "Consoles",
            "Ultra-high speed SSD, haptic feedback, adaptive triggers and 3D Audio.",
            "/images/ps5_product.jpg",
            "photo-1606144042614-b2417e99c4e3",
            (50.0, 150.0),
            5,
        ),
        console(
            "PlayStation 4 Pro",
            "Consoles",
            "Vivid game worlds with rich visuals. 1TB storage.",
            "/images/ps4_product.jpg",
            "photo-1507457379470-08b800bebc67",
            (30.0, 80.0),
            8,
        ),
        console(
            "PS5 DualSense Controller",
            "Accessories",
            "Immersive feedback in the palms of your hands. Midnight Black.",
            "/images/dualsense_product.jpg",
            "photo-1592840496011-a58142b8e3e4",
            (15.0, 40.0),
            10,
        ),
        console(
            "PlayStation VR2",
            "VR",
            "Virtual reality worlds that look, feel and sound real.",
            "/images/vr2_product.jpg",
            "photo-1622959632446-23961b6c7c1c",
            (60.0, 180.0),
            2,
        ),
    ]
}

/// Addon pricing used when the store has none yet.
pub fn default_addons() -> AddonSettings {
    AddonSettings {
        subscription_price_week: 500.0,
        subscription_price_month: 1500.0,
        subscription_stock: 10,
        controller_price_week: 800.0,
        controller_price_month: 2500.0,
        controller_stock: 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_starts_with_full_fleets() {
        let products = default_products();
        assert_eq!(products.len(), 4);
        assert!(products.iter().all(|p| p.id.is_empty() && p.stock == p.total_stock));
        assert_eq!(products[3].name, "PlayStation VR2");
        assert_eq!(products[3].total_stock, 2);
    }
}
