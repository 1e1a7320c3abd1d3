//! Category and product operations on top of the gateway.
//!
//! Entities are decoded leniently: ids arrive as `_id` or `id`, as strings
//! or numbers, and a product's `categoryId` may be a bare id or a populated
//! category object. Shape validation beyond that is the backend's job.
//!
//! Form input is coerced and checked before anything is transmitted.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::gateway::{Gateway, RequestDescriptor};
use crate::origin::Origin;

// =============================================================================
// ENTITIES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CategoryWire")]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// A product's category link: an id, or the category itself when the
/// backend populates the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Populated(Category),
    Id(String),
}

impl CategoryRef {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Populated(category) => &category.id,
            Self::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProductWire")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub description: Option<String>,
    #[serde(rename = "categoryId")]
    pub category: Option<CategoryRef>,
}

impl Product {
    #[must_use]
    pub fn category_id(&self) -> Option<&str> {
        self.category.as_ref().map(CategoryRef::id)
    }
}

// Backends send `_id`, `id`, or both (virtual id alongside the stored one).

#[derive(Deserialize)]
struct CategoryWire {
    #[serde(rename = "_id", default, deserialize_with = "optional_id")]
    stored_id: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    id: Option<String>,
    name: String,
}

impl TryFrom<CategoryWire> for Category {
    type Error = String;

    fn try_from(wire: CategoryWire) -> Result<Self, Self::Error> {
        let id = pick_id(wire.stored_id, wire.id).ok_or("category has no `_id` or `id`")?;
        Ok(Self { id, name: wire.name })
    }
}

#[derive(Deserialize)]
struct ProductWire {
    #[serde(rename = "_id", default, deserialize_with = "optional_id")]
    stored_id: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    id: Option<String>,
    name: String,
    #[serde(deserialize_with = "lenient_f64")]
    price: f64,
    #[serde(deserialize_with = "lenient_i64")]
    stock: i64,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "categoryId", default)]
    category: Option<CategoryRef>,
}

impl TryFrom<ProductWire> for Product {
    type Error = String;

    fn try_from(wire: ProductWire) -> Result<Self, Self::Error> {
        let id = pick_id(wire.stored_id, wire.id).ok_or("product has no `_id` or `id`")?;
        Ok(Self {
            id,
            name: wire.name,
            price: wire.price,
            stock: wire.stock,
            description: wire.description,
            category: wire.category,
        })
    }
}

/// `_id` wins over `id`; blank values count as missing.
fn pick_id(stored: Option<String>, virtual_id: Option<String>) -> Option<String> {
    [stored, virtual_id].into_iter().flatten().find(|id| !id.trim().is_empty())
}

fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().ok_or_else(|| de::Error::custom("price out of range")),
        Value::String(s) => s.trim().parse().map_err(de::Error::custom),
        other => Err(de::Error::custom(format!("expected numeric price, got {other}"))),
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().ok_or_else(|| de::Error::custom("stock must be an integer")),
        Value::String(s) => s.trim().parse().map_err(de::Error::custom),
        other => Err(de::Error::custom(format!("expected integer stock, got {other}"))),
    }
}

// =============================================================================
// FORMS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("a category must be selected")]
    MissingCategory,
    #[error("{field} must be a non-negative number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{field} must be a non-negative whole number, got {value:?}")]
    InvalidInteger { field: &'static str, value: String },
    #[error("invalid id {0:?}")]
    InvalidId(String),
}

/// Product form exactly as typed: every field is text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub stock: String,
    pub description: String,
    pub category_id: String,
}

/// Product create payload with numeric fields coerced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub stock: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "categoryId")]
    pub category_id: String,
}

impl ProductForm {
    /// Coerce text fields into a transmittable payload.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] naming the first field that is missing or not numeric.
    pub fn coerce(&self) -> Result<NewProduct, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::MissingField("name"));
        }
        let category_id = self.category_id.trim();
        if category_id.is_empty() {
            return Err(FormError::MissingCategory);
        }

        let price = self
            .price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| FormError::InvalidNumber { field: "price", value: self.price.clone() })?;
        let stock = self
            .stock
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|s| *s >= 0)
            .ok_or_else(|| FormError::InvalidInteger { field: "stock", value: self.stock.clone() })?;

        let description = Some(self.description.trim()).filter(|d| !d.is_empty()).map(str::to_owned);

        Ok(NewProduct { name: name.to_owned(), price, stock, description, category_id: category_id.to_owned() })
    }
}

fn checked_id(id: &str) -> Result<&str, FormError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(FormError::MissingField("id"));
    }
    if id.contains(['/', '?', '#']) || id.contains(char::is_whitespace) {
        return Err(FormError::InvalidId(id.to_owned()));
    }
    Ok(id)
}

// =============================================================================
// API
// =============================================================================

/// Category and product calls. Every call carries the session credential.
#[derive(Clone)]
pub struct CatalogApi {
    gateway: Gateway,
}

impl CatalogApi {
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// # Errors
    ///
    /// Returns the gateway failure; an empty list is `Ok(vec![])`.
    pub async fn list_categories(&self) -> Result<Vec<Category>, GatewayError> {
        let payload = self.gateway.send(RequestDescriptor::get(Origin::Category, "categories").authenticated()).await?;
        decode_list(payload, "categories")
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidForm`] for a blank name (nothing sent),
    /// otherwise the gateway failure.
    pub async fn create_category(&self, name: &str) -> Result<Value, GatewayError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FormError::MissingField("name").into());
        }
        let created = self
            .gateway
            .send(RequestDescriptor::post(Origin::Category, "categories").json(json!({ "name": name })).authenticated())
            .await?;
        tracing::info!(%name, "category created");
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidForm`] for a malformed id, otherwise the gateway failure.
    pub async fn delete_category(&self, id: &str) -> Result<(), GatewayError> {
        let id = checked_id(id)?;
        self.gateway
            .send_status(RequestDescriptor::delete(Origin::Category, format!("categories/{id}")).authenticated())
            .await?;
        tracing::info!(%id, "category deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the gateway failure; an empty list is `Ok(vec![])`.
    pub async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
        let payload = self.gateway.send(RequestDescriptor::get(Origin::Product, "products").authenticated()).await?;
        decode_list(payload, "products")
    }

    /// Coerce `form` and create the product.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidForm`] before any transmission when the
    /// form does not coerce, otherwise the gateway failure.
    pub async fn create_product(&self, form: &ProductForm) -> Result<Value, GatewayError> {
        let product = form.coerce()?;
        let body = serde_json::to_value(&product).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let created = self
            .gateway
            .send(RequestDescriptor::post(Origin::Product, "products").json(body).authenticated())
            .await?;
        tracing::info!(name = %product.name, category_id = %product.category_id, "product created");
        Ok(created)
    }
}

/// Decode a list payload. Anything that is not an array counts as empty.
fn decode_list<T: serde::de::DeserializeOwned>(payload: Value, resource: &str) -> Result<Vec<T>, GatewayError> {
    match payload {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| GatewayError::Decode(format!("{resource}: {e}"))),
        other => {
            tracing::warn!(%resource, payload = %other, "list payload is not an array; treating as empty");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
