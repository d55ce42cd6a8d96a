//! # Import Row Coercion
//!
//! The boundary between an untrusted spreadsheet and the typed catalog.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  headers ──► ColumnMapping::auto_map ──► (user may adjust) ──┐          │
//! │                                                              │          │
//! │  rows: Vec<Vec<Cell>> ───────────────────────────────────────┼──►       │
//! │                                                              ▼          │
//! │                                   ImportRecord::coerce (this module)    │
//! │                                   • blank name   → skipped              │
//! │                                   • bad number   → 0                    │
//! │                                   • negative $   → absolute value       │
//! │                                   • stock        → integer (truncated)  │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                          strict ImportRecord (no Cell past this point)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Code synthesis and category/product reconciliation need store access and
//! live in the engine's reconciler.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::{DEFAULT_MIN_STOCK, DEFAULT_UNIT};
use crate::validation::ValidationResult;

// =============================================================================
// Raw Input
// =============================================================================

/// One spreadsheet cell, as handed over by the file parser.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl Cell {
    /// Trimmed text, or `None` for empty/whitespace cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Cell::Number(n) if n.is_finite() => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
            _ => None,
        }
    }

    /// Reads the leading number of a cell, ignoring currency symbols and
    /// spaces. Trailing text is dropped: `"1.20 Bs"` is 1.2, `"10 und"` is 10.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => {
                let cleaned: String = s
                    .trim()
                    .chars()
                    .filter(|c| !matches!(c, '$' | '€' | ' ' | '\u{a0}'))
                    .collect();
                leading_number(&cleaned)
            }
            _ => None,
        }
    }
}

/// Longest prefix of the form `[+-]digits[.digits]`, parsed.
fn leading_number(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let mut seen_dot = false;
    let mut seen_digit = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    s[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A parsed tabular dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportDataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

// =============================================================================
// Column Mapping
// =============================================================================

/// Product fields an import column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ImportField {
    Name,
    SalePrice,
    CostPrice,
    Stock,
    Code,
    Category,
}

impl ImportField {
    /// Matching priority. `Code` and `CostPrice` go first so that headers
    /// such as "codigo producto" or "precio costo" are not taken by `Name`
    /// or `SalePrice`.
    const PRIORITY: [ImportField; 6] = [
        ImportField::Code,
        ImportField::CostPrice,
        ImportField::SalePrice,
        ImportField::Stock,
        ImportField::Category,
        ImportField::Name,
    ];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            ImportField::Name => &["nombre", "producto", "descripcion", "name", "product"],
            ImportField::SalePrice => &["precio", "venta", "pvp", "price", "saleprice"],
            ImportField::CostPrice => &["costo", "compra", "cost"],
            ImportField::Stock => &["stock", "cantidad", "existencia", "quantity"],
            ImportField::Code => &["codigo", "code", "sku", "ref"],
            ImportField::Category => &["categoria", "category", "tipo", "familia"],
        }
    }

    fn matches(self, normalized: &str) -> bool {
        if self == ImportField::SalePrice && normalized.contains("cost") {
            return false;
        }
        self.keywords().iter().any(|k| normalized.contains(k))
    }
}

/// Column index for each product field. Only `name` and `sale_price` are
/// mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct ColumnMapping {
    pub name: Option<usize>,
    pub sale_price: Option<usize>,
    pub cost_price: Option<usize>,
    pub stock: Option<usize>,
    pub code: Option<usize>,
    pub category: Option<usize>,
}

impl ColumnMapping {
    /// Guesses a mapping from header names (Spanish or English).
    ///
    /// ```rust
    /// use mercado_core::import::ColumnMapping;
    ///
    /// let m = ColumnMapping::auto_map(&["Código", "Descripción", "Precio Venta", "Costo"]);
    /// assert_eq!(m.code, Some(0));
    /// assert_eq!(m.name, Some(1));
    /// assert_eq!(m.sale_price, Some(2));
    /// assert_eq!(m.cost_price, Some(3));
    /// ```
    pub fn auto_map<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut mapping = Self::default();
        for (index, header) in headers.iter().enumerate() {
            let normalized = normalize_header(header.as_ref());
            if normalized.is_empty() {
                continue;
            }
            for field in ImportField::PRIORITY {
                if mapping.get(field).is_none() && field.matches(&normalized) {
                    mapping.set(field, index);
                    break;
                }
            }
        }
        mapping
    }

    pub fn get(&self, field: ImportField) -> Option<usize> {
        match field {
            ImportField::Name => self.name,
            ImportField::SalePrice => self.sale_price,
            ImportField::CostPrice => self.cost_price,
            ImportField::Stock => self.stock,
            ImportField::Code => self.code,
            ImportField::Category => self.category,
        }
    }

    pub fn set(&mut self, field: ImportField, index: usize) {
        let slot = match field {
            ImportField::Name => &mut self.name,
            ImportField::SalePrice => &mut self.sale_price,
            ImportField::CostPrice => &mut self.cost_price,
            ImportField::Stock => &mut self.stock,
            ImportField::Code => &mut self.code,
            ImportField::Category => &mut self.category,
        };
        *slot = Some(index);
    }

    /// Checks that the mandatory columns are mapped.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.name.is_none() {
            return Err(ValidationError::Required {
                field: "name column".to_string(),
            });
        }
        if self.sale_price.is_none() {
            return Err(ValidationError::Required {
                field: "sale_price column".to_string(),
            });
        }
        Ok(())
    }
}

/// Lower-cases, folds Spanish accents and drops everything but `[a-z0-9]`.
fn normalize_header(header: &str) -> String {
    header
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

// =============================================================================
// Strict Record
// =============================================================================

/// A validated import row. Everything past the reconciler's boundary works
/// on this type only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportRecord {
    pub name: String,
    pub sale_price: f64,
    pub cost_price: f64,
    pub stock: i64,
    /// `None` when the column is unmapped or the cell is blank.
    pub code: Option<String>,
    /// `None` when the column is unmapped or the cell is blank.
    pub category: Option<String>,
    pub min_stock: i64,
    pub unit: String,
}

impl ImportRecord {
    /// Coerces one row. Returns `None` for rows without a usable name.
    pub fn coerce(row: &[Cell], mapping: &ColumnMapping) -> Option<Self> {
        let cell = |field: ImportField| mapping.get(field).and_then(|i| row.get(i));

        let name = cell(ImportField::Name).and_then(Cell::as_text)?;

        let price = |field: ImportField| {
            cell(field)
                .and_then(Cell::as_number)
                .map(f64::abs)
                .unwrap_or(0.0)
        };

        let stock = cell(ImportField::Stock)
            .and_then(Cell::as_number)
            .map(|n| n.trunc())
            .filter(|n| n.abs() < i64::MAX as f64)
            .map(|n| n as i64)
            .unwrap_or(0);

        Some(Self {
            name,
            sale_price: price(ImportField::SalePrice),
            cost_price: price(ImportField::CostPrice),
            stock,
            code: cell(ImportField::Code).and_then(Cell::as_text),
            category: cell(ImportField::Category).and_then(Cell::as_text),
            min_stock: DEFAULT_MIN_STOCK,
            unit: DEFAULT_UNIT.to_string(),
        })
    }
}
