//! Static device catalog
//!
//! Brand/model/codename table embedded at compile time and parsed once at
//! first use into an immutable lookup structure. This is the collaborator
//! that turns a user-facing brand and model into the codename every backend
//! query keys on, and it owns the boot-image-only device rule the build
//! selector consumes.

use once_cell::sync::Lazy;
use std::collections::HashMap;

const DEVICES_CSV: &str = include_str!("../devices.csv");

/// Result cap for suggestions against an empty query.
const MAX_UNFILTERED_SUGGESTIONS: usize = 200;
/// Result cap once the user has typed something.
const MAX_FILTERED_SUGGESTIONS: usize = 15;

static CATALOG: Lazy<DeviceCatalog> = Lazy::new(|| DeviceCatalog::parse(DEVICES_CSV));

/// The process-wide catalog instance.
pub fn catalog() -> &'static DeviceCatalog {
    &CATALOG
}

#[derive(Debug)]
pub struct DeviceCatalog {
    brands: Vec<String>,
    models_by_brand: HashMap<String, Vec<String>>,
    codename_by_brand_model: HashMap<(String, String), String>,
}

impl DeviceCatalog {
    /// Parses `brand,model,codename` rows. Rows with an empty brand or
    /// model are skipped; the header row is required.
    fn parse(csv: &str) -> Self {
        let mut lines = csv.lines();
        let header: Vec<&str> = lines
            .next()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .collect();
        let column = |name: &str| header.iter().position(|h| *h == name);
        let (brand_col, model_col, codename_col) = (
            column("brand").unwrap_or(0),
            column("model").unwrap_or(1),
            column("codename").unwrap_or(2),
        );

        let mut brands: Vec<String> = Vec::new();
        let mut models_by_brand: HashMap<String, Vec<String>> = HashMap::new();
        let mut codename_by_brand_model: HashMap<(String, String), String> = HashMap::new();

        for line in lines {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let field = |i: usize| fields.get(i).copied().unwrap_or_default();
            let brand = field(brand_col);
            let model = field(model_col);
            let codename = field(codename_col);
            if brand.is_empty() || model.is_empty() {
                continue;
            }

            if !brands.iter().any(|b| b == brand) {
                brands.push(brand.to_string());
            }
            models_by_brand
                .entry(brand.to_string())
                .or_default()
                .push(model.to_string());
            codename_by_brand_model
                .insert((brand.to_string(), model.to_string()), codename.to_string());
        }

        Self {
            brands,
            models_by_brand,
            codename_by_brand_model,
        }
    }

    /// Unique brands in first-seen order.
    pub fn brands(&self) -> &[String] {
        &self.brands
    }

    /// Models for a brand, in catalog order.
    pub fn models_for(&self, brand: &str) -> &[String] {
        self.models_by_brand
            .get(brand)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn codename_for(&self, brand: &str, model: &str) -> Option<&str> {
        self.codename_by_brand_model
            .get(&(brand.to_string(), model.to_string()))
            .map(String::as_str)
            .filter(|c| !c.is_empty())
    }

    /// Case-insensitive substring completion over a brand's models.
    pub fn suggestions(&self, brand: &str, typed: &str) -> Vec<&str> {
        let models = self.models_for(brand);
        let typed = typed.trim().to_lowercase();
        if typed.is_empty() {
            return models
                .iter()
                .take(MAX_UNFILTERED_SUGGESTIONS)
                .map(String::as_str)
                .collect();
        }
        models
            .iter()
            .filter(|m| m.to_lowercase().contains(&typed))
            .take(MAX_FILTERED_SUGGESTIONS)
            .map(String::as_str)
            .collect()
    }

    /// Google Pixels ship no separate recovery partition, so the selector
    /// must go straight to the boot image for them.
    pub fn is_boot_image_only(&self, brand: &str, model: &str) -> bool {
        brand == "Google" && model.to_lowercase().starts_with("pixel")
    }
}
