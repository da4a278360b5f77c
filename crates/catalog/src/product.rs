use serde::{Deserialize, Serialize};

use labstock_core::{DomainError, Entity, ProductId, ValueObject};

/// Upper bound on each descriptive attribute, in characters.
pub const MAX_ATTRIBUTE_LEN: usize = 200;

/// Descriptive attributes of a product (value object).
///
/// `kind` is the product type ("Beaker", "Erlenmeyer Flask", ...); `size` and
/// `material` follow the same free-text convention ("250 mL", "Glass").
/// Construction validates and trims every attribute, so a `ProductSpec` that
/// exists is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpec {
    name: String,
    kind: String,
    size: String,
    material: String,
}

impl ValueObject for ProductSpec {}

impl ProductSpec {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        size: impl Into<String>,
        material: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            name: checked_attribute("name", name.into())?,
            kind: checked_attribute("type", kind.into())?,
            size: checked_attribute("size", size.into())?,
            material: checked_attribute("material", material.into())?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    pub fn material(&self) -> &str {
        &self.material
    }
}

fn checked_attribute(field: &str, value: String) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > MAX_ATTRIBUTE_LEN {
        return Err(DomainError::validation(format!(
            "{field} exceeds {MAX_ATTRIBUTE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Entity: a catalogued product.
///
/// Identity is the store-assigned integer id; the descriptive attributes may
/// change over its lifetime (the ledger snapshots them into history rows at
/// each operation, so renames never rewrite the past).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    spec: ProductSpec,
}

impl Product {
    pub fn new(id: ProductId, spec: ProductSpec) -> Self {
        Self { id, spec }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn spec(&self) -> &ProductSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn kind(&self) -> &str {
        self.spec.kind()
    }

    pub fn size(&self) -> &str {
        self.spec.size()
    }

    pub fn material(&self) -> &str {
        self.spec.material()
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> ProductSpec {
        ProductSpec::new(name, "Beaker", "250 mL", "Glass").unwrap()
    }

    #[test]
    fn spec_trims_attributes() {
        let spec = ProductSpec::new("  Glass Beaker ", "Beaker", " 250 mL", "Glass ").unwrap();
        assert_eq!(spec.name(), "Glass Beaker");
        assert_eq!(spec.size(), "250 mL");
        assert_eq!(spec.material(), "Glass");
    }

    #[test]
    fn spec_rejects_empty_attribute() {
        let err = ProductSpec::new("Glass Beaker", "   ", "250 mL", "Glass").unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("type")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn spec_rejects_overlong_attribute() {
        let long = "x".repeat(MAX_ATTRIBUTE_LEN + 1);
        let err = ProductSpec::new(long, "Beaker", "250 mL", "Glass").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn specs_compare_by_value() {
        assert_eq!(spec("Glass Beaker"), spec("Glass Beaker"));
        assert_ne!(spec("Glass Beaker"), spec("Plastic Beaker"));
    }

    #[test]
    fn product_identity_is_its_id() {
        let product = Product::new(ProductId::new(7), spec("Glass Beaker"));
        assert_eq!(*product.id(), ProductId::new(7));
        assert_eq!(product.name(), "Glass Beaker");
    }
}
