//! Product domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use storemari_core::{Category, FieldError, ProductId, ValidationFailure};

/// Field order used when reporting product validation errors.
const PRODUCT_FIELDS: &[&str] = &["name", "category", "price", "image", "description", "stock"];

/// A catalog product (domain type).
///
/// Serializes with the document field names clients see (`_id`,
/// `createdAt`, `updatedAt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Store-generated product ID.
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub category: Category,
    /// Unit price, never negative.
    pub price: f64,
    /// Image URL.
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Units in stock, never negative.
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated product ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub category: Category,
    pub price: f64,
    pub image: String,
    pub description: Option<String>,
    pub stock: i64,
}

/// Product payload as received from the client.
///
/// Category stays a plain string here so an unknown value is reported as a
/// field error alongside the others rather than as a parse failure. Numbers
/// are taken as raw JSON and cast the way a document schema would: numeric
/// strings are accepted, and a value that cannot be cast becomes a field
/// error too.
#[derive(Debug, Default, Deserialize)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Value>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub stock: Option<Value>,
}

/// Draft fields after casting, with the declarative rules.
#[derive(Debug, Validate)]
struct ProductFields {
    #[validate(
        required(message = "Product name is required"),
        length(min = 1, message = "Product name is required")
    )]
    name: Option<String>,

    #[validate(
        required(message = "Category is required"),
        custom(function = "validate_category")
    )]
    category: Option<String>,

    #[validate(
        required(message = "Price is required"),
        range(min = 0.0, message = "Price cannot be negative")
    )]
    price: Option<f64>,

    #[validate(
        required(message = "Image URL is required"),
        length(min = 1, message = "Image URL is required")
    )]
    image: Option<String>,

    description: Option<String>,

    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    stock: Option<i64>,
}

impl ProductDraft {
    /// Trim, cast, validate and apply defaults, producing a [`NewProduct`].
    ///
    /// # Errors
    ///
    /// Returns every failed rule and cast as a `Product validation failed: ...`
    /// error.
    pub fn into_new_product(self) -> Result<NewProduct, ValidationFailure> {
        let mut cast_errors = Vec::new();
        let price = cast_field(self.price, "price", cast_number, &mut cast_errors);
        let stock = cast_field(self.stock, "stock", cast_integer, &mut cast_errors);

        let fields = ProductFields {
            name: self.name.map(|name| name.trim().to_string()),
            category: self.category,
            price,
            image: self.image,
            description: self
                .description
                .map(|description| description.trim().to_string()),
            stock,
        };

        let mut errors: Vec<FieldError> = match fields.validate() {
            Ok(()) => Vec::new(),
            Err(report) => ValidationFailure::from_report(None, &report, PRODUCT_FIELDS)
                .errors()
                .iter()
                // A field that failed to cast reports the cast, not `required`
                .filter(|error| !cast_errors.iter().any(|cast: &FieldError| cast.field == error.field))
                .cloned()
                .collect(),
        };
        errors.append(&mut cast_errors);
        if !errors.is_empty() {
            errors.sort_by_key(|error| field_rank(&error.field));
            return Err(ValidationFailure::new(Some("Product"), errors));
        }

        let (Some(name), Some(category), Some(price), Some(image)) =
            (fields.name, fields.category, fields.price, fields.image)
        else {
            return Err(ValidationFailure::new(
                Some("Product"),
                vec![FieldError::new("name", "Product name is required")],
            ));
        };

        let category = category.parse::<Category>().map_err(|e| {
            ValidationFailure::new(
                Some("Product"),
                vec![FieldError::new("category", e.to_string())],
            )
        })?;

        Ok(NewProduct {
            name,
            category,
            price,
            image,
            description: fields.description,
            stock: fields.stock.unwrap_or(0),
        })
    }
}

fn field_rank(field: &str) -> usize {
    PRODUCT_FIELDS
        .iter()
        .position(|known| *known == field)
        .unwrap_or(usize::MAX)
}

/// Why a raw value could not be cast.
enum CastFailure {
    NotANumber,
    NotWhole,
}

/// Cast an optional raw value, recording a field error on failure.
fn cast_field<T>(
    raw: Option<Value>,
    field: &'static str,
    cast: fn(&Value) -> Result<Option<T>, CastFailure>,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let raw = raw?;
    match cast(&raw) {
        Ok(value) => value,
        Err(CastFailure::NotANumber) => {
            errors.push(FieldError::new(field, cast_message(&raw, field)));
            None
        }
        Err(CastFailure::NotWhole) => {
            errors.push(FieldError::new(field, "Stock must be a whole number"));
            None
        }
    }
}

fn cast_message(raw: &Value, field: &str) -> String {
    let (shown, kind) = match raw {
        Value::String(text) => (text.clone(), "string"),
        Value::Bool(flag) => (flag.to_string(), "boolean"),
        Value::Array(_) => (raw.to_string(), "Array"),
        Value::Object(_) => (raw.to_string(), "Object"),
        Value::Number(_) | Value::Null => (raw.to_string(), "number"),
    };
    format!("Cast to Number failed for value \"{shown}\" (type {kind}) at path \"{field}\"")
}

/// Numbers and numeric strings; `null` and blank strings count as absent.
fn cast_number(raw: &Value) -> Result<Option<f64>, CastFailure> {
    match raw {
        Value::Null => Ok(None),
        Value::Number(number) => number.as_f64().map(Some).ok_or(CastFailure::NotANumber),
        Value::String(text) if text.trim().is_empty() => Ok(None),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Some)
            .ok_or(CastFailure::NotANumber),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Err(CastFailure::NotANumber),
    }
}

/// Largest integer an `f64` represents exactly.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// [`cast_number`], then require a whole value (`5.0` is accepted).
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn cast_integer(raw: &Value) -> Result<Option<i64>, CastFailure> {
    if let Some(value) = raw.as_i64() {
        return Ok(Some(value));
    }
    match cast_number(raw)? {
        None => Ok(None),
        Some(value) if value.fract() == 0.0 && value.abs() <= MAX_EXACT_FLOAT => {
            Ok(Some(value as i64))
        }
        Some(_) => Err(CastFailure::NotWhole),
    }
}

fn validate_category(category: &str) -> Result<(), ValidationError> {
    category.parse::<Category>().map(|_| ()).map_err(|e| {
        let mut error = ValidationError::new("enum");
        error.message = Some(e.to_string().into());
        error
    })
}
