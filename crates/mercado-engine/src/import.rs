//! # Bulk Import Reconciler
//!
//! Merges a loosely typed spreadsheet into the catalog.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. mapping.validate()            name + sale_price columns required    │
//! │  2. ImportRecord::coerce(row)     blank name ─► counted as error        │
//! │  3. code missing? ─► IMP-<millis>-<n>, unique in store and import       │
//! │  4. category index (lower-case name ─► id) from existing categories     │
//! │       unknown name ─► ONE new category per distinct name, random colour │
//! │       blank / unmapped ─► first existing category or ""                 │
//! │  5. product index (lower-case code ─► doc) from existing products       │
//! │       match ─► Update mapped fields (precondition on read version)      │
//! │       none  ─► Set new product (precondition: absent)                   │
//! │       rows sharing a code fold into ONE write per product               │
//! │  6. writes chunked by store.max_batch_ops(), categories first           │
//! │  7. ImportSummary { added, updated, errors }                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! If any batch fails, the whole import is reported as errored and the
//! notification says how many batches had already been committed.

use std::collections::HashMap;

use chrono::Utc;
use mercado_core::validation::validate_name;
use mercado_core::{
    Capability, Category, ColumnMapping, ImportDataset, ImportRecord, Product, ProductStatus,
};
use mercado_store::{
    decode_all, to_body, Collection, Commit, Document, DocumentStore, Precondition, WriteOp,
};
use mercado_sync::{SessionContext, Severity};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::EngineResult;

/// Display colours for categories created by an import.
const CATEGORY_COLORS: &[&str] = &[
    "#ef4444", "#f97316", "#f59e0b", "#84cc16", "#10b981", "#06b6d4", "#3b82f6", "#6366f1",
    "#8b5cf6", "#d946ef", "#ec4899", "#64748b",
];

fn random_color() -> String {
    CATEGORY_COLORS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("#64748b")
        .to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub added: usize,
    pub updated: usize,
    pub errors: usize,
}

/// One planned write plus the precondition it depends on.
#[derive(Debug)]
struct PlannedWrite {
    precondition: Option<Precondition>,
    write: WriteOp,
}

#[derive(Debug, Default)]
struct Plan {
    writes: Vec<PlannedWrite>,
    categories_created: usize,
    summary: ImportSummary,
}

/// Case-insensitive lookup key.
fn key(s: &str) -> String {
    s.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct ImportReconciler {
    ctx: SessionContext,
}

impl ImportReconciler {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Imports `dataset` using `mapping`.
    ///
    /// Missing permission or a bad mapping is rejected before anything is
    /// read. A failed commit is reported through the summary (every row
    /// errored), not as `Err`.
    pub async fn import(
        &self,
        dataset: &ImportDataset,
        mapping: &ColumnMapping,
    ) -> EngineResult<ImportSummary> {
        if let Err(e) = self.ctx.require(Capability::EditProducts).await {
            warn!(error = %e, "Import refused");
            self.ctx
                .notify(Severity::Error, format!("No se pudo importar: {e}"));
            return Err(e.into());
        }
        if let Err(e) = mapping.validate() {
            self.ctx
                .notify(Severity::Error, format!("Mapeo de columnas invalido: {e}"));
            return Err(e.into());
        }

        let total_rows = dataset.rows.len();
        let plan = match self.plan(dataset, mapping).await {
            Ok(plan) => plan,
            Err(e) => {
                error!(error = %e, "Import planning failed");
                self.ctx
                    .notify(Severity::Error, format!("Error al importar: {e}"));
                return Ok(ImportSummary {
                    added: 0,
                    updated: 0,
                    errors: total_rows,
                });
            }
        };

        let summary = plan.summary;
        let batches = batch(plan.writes, self.ctx.store().max_batch_ops());
        let batch_count = batches.len();
        debug!(
            rows = total_rows,
            writes = batches.iter().map(|c| c.writes.len()).sum::<usize>(),
            batches = batch_count,
            categories_created = plan.categories_created,
            "Import planned"
        );

        for (index, commit) in batches.into_iter().enumerate() {
            match self.ctx.store().commit(commit).await {
                Ok(receipt) => self.ctx.after_commit(&receipt).await,
                Err(e) => {
                    error!(batch = index + 1, of = batch_count, error = %e, "Import batch failed");
                    self.ctx.notify(
                        Severity::Error,
                        format!(
                            "Error al importar: {e}. Lotes aplicados antes del fallo: {index} de {batch_count}"
                        ),
                    );
                    return Ok(ImportSummary {
                        added: 0,
                        updated: 0,
                        errors: total_rows,
                    });
                }
            }
        }

        info!(
            added = summary.added,
            updated = summary.updated,
            errors = summary.errors,
            categories_created = plan.categories_created,
            batches = batch_count,
            "Import complete"
        );
        self.ctx.notify(
            Severity::Success,
            format!(
                "Importacion completada: {} nuevos, {} actualizados, {} con errores",
                summary.added, summary.updated, summary.errors
            ),
        );
        Ok(summary)
    }

    async fn plan(&self, dataset: &ImportDataset, mapping: &ColumnMapping) -> EngineResult<Plan> {
        let store: &dyn DocumentStore = self.ctx.store();
        let category_docs = store.list(Collection::Categories).await?;
        let product_docs = store.list(Collection::Products).await?;
        plan_rows(dataset, mapping, &category_docs, &product_docs)
    }
}

/// Pending change to one product. Rows sharing a code fold into the same
/// entry so each product is written once, under one precondition.
#[derive(Debug)]
enum ProductChange {
    Create(Product),
    Patch {
        read: Document,
        fields: Map<String, Value>,
    },
}

/// Builds the write plan from the rows and the catalog as read.
fn plan_rows(
    dataset: &ImportDataset,
    mapping: &ColumnMapping,
    category_docs: &[Document],
    product_docs: &[Document],
) -> EngineResult<Plan> {
    let mut plan = Plan::default();

    // Rows are coerced into strict records here; nothing below sees a Cell.
    let mut records = Vec::with_capacity(dataset.rows.len());
    for (row_number, row) in dataset.rows.iter().enumerate() {
        match ImportRecord::coerce(row, mapping) {
            Some(record) if validate_name("name", &record.name).is_ok() => records.push(record),
            _ => {
                debug!(row = row_number + 1, "Skipping row without a usable name");
                plan.summary.errors += 1;
            }
        }
    }

    // Categories
    let (existing_categories, bad): (Vec<Category>, _) = decode_all(category_docs);
    log_undecodable(Collection::Categories, bad);
    let fallback_category = existing_categories
        .first()
        .map(|c| c.id.clone())
        .unwrap_or_default();
    let mut category_index: HashMap<String, String> = existing_categories
        .iter()
        .map(|c| (key(&c.name), c.id.clone()))
        .collect();

    for record in &records {
        let Some(name) = record.category.as_deref() else {
            continue;
        };
        if category_index.contains_key(&key(name)) {
            continue;
        }
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            color: random_color(),
        };
        category_index.insert(key(name), category.id.clone());
        plan.writes.push(PlannedWrite {
            precondition: None,
            write: WriteOp::Set {
                collection: Collection::Categories,
                id: category.id.clone(),
                data: to_body(&category)?,
            },
        });
        plan.categories_created += 1;
    }

    // Products
    let mut stored: HashMap<String, &Document> = HashMap::new();
    for doc in product_docs {
        match doc.decode::<Product>() {
            Ok(product) if !product.code.trim().is_empty() => {
                stored.entry(key(&product.code)).or_insert(doc);
            }
            Ok(_) => {}
            Err(e) => warn!(id = %doc.id, error = %e, "Skipping undecodable product"),
        }
    }

    let stamp = Utc::now().timestamp_millis();
    let mut synthesized = 0usize;
    let mut changes: Vec<ProductChange> = Vec::new();
    let mut by_code: HashMap<String, usize> = HashMap::new();

    for record in records {
        let code = match record.code.clone() {
            Some(code) => code,
            None => loop {
                synthesized += 1;
                let candidate = format!("IMP-{stamp}-{synthesized:04}");
                let k = key(&candidate);
                if !stored.contains_key(&k) && !by_code.contains_key(&k) {
                    break candidate;
                }
            },
        };
        let category_id = record
            .category
            .as_deref()
            .and_then(|name| category_index.get(&key(name)).cloned());

        if let Some(&index) = by_code.get(&key(&code)) {
            match &mut changes[index] {
                ProductChange::Create(product) => {
                    apply_to_product(product, &record, mapping, category_id);
                }
                ProductChange::Patch { fields, .. } => {
                    fields.extend(update_fields(&record, mapping, category_id));
                }
            }
            plan.summary.updated += 1;
            continue;
        }

        let change = match stored.get(&key(&code)) {
            Some(doc) => {
                plan.summary.updated += 1;
                ProductChange::Patch {
                    read: (*doc).clone(),
                    fields: update_fields(&record, mapping, category_id),
                }
            }
            None => {
                plan.summary.added += 1;
                ProductChange::Create(Product {
                    id: Uuid::new_v4().to_string(),
                    code: code.clone(),
                    name: record.name,
                    category_id: category_id.unwrap_or_else(|| fallback_category.clone()),
                    cost_price: record.cost_price,
                    sale_price: record.sale_price,
                    stock: record.stock,
                    min_stock: record.min_stock,
                    unit: record.unit,
                    status: ProductStatus::Active,
                })
            }
        };
        by_code.insert(key(&code), changes.len());
        changes.push(change);
    }

    for change in changes {
        plan.writes.push(match change {
            ProductChange::Create(product) => PlannedWrite {
                precondition: Some(Precondition::from_read(
                    Collection::Products,
                    product.id.clone(),
                    None,
                )),
                write: WriteOp::Set {
                    collection: Collection::Products,
                    id: product.id.clone(),
                    data: to_body(&product)?,
                },
            },
            ProductChange::Patch { read, fields } => PlannedWrite {
                precondition: Some(Precondition::from_read(
                    Collection::Products,
                    read.id.clone(),
                    Some(&read),
                )),
                write: WriteOp::Update {
                    collection: Collection::Products,
                    id: read.id,
                    fields,
                },
            },
        });
    }

    Ok(plan)
}

/// Fields an import row overwrites on a product that already exists.
/// Unmapped columns leave the stored value alone.
fn update_fields(
    record: &ImportRecord,
    mapping: &ColumnMapping,
    category_id: Option<String>,
) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("name".into(), Value::from(record.name.clone()));
    fields.insert("sale_price".into(), Value::from(record.sale_price));
    if mapping.cost_price.is_some() {
        fields.insert("cost_price".into(), Value::from(record.cost_price));
    }
    if mapping.stock.is_some() {
        fields.insert("stock".into(), Value::from(record.stock));
    }
    if let Some(category_id) = category_id {
        fields.insert("category_id".into(), Value::from(category_id));
    }
    fields
}

/// Same rule as [`update_fields`], for a product created earlier in this import.
fn apply_to_product(
    product: &mut Product,
    record: &ImportRecord,
    mapping: &ColumnMapping,
    category_id: Option<String>,
) {
    product.name = record.name.clone();
    product.sale_price = record.sale_price;
    if mapping.cost_price.is_some() {
        product.cost_price = record.cost_price;
    }
    if mapping.stock.is_some() {
        product.stock = record.stock;
    }
    if let Some(category_id) = category_id {
        product.category_id = category_id;
    }
}

/// Splits planned writes into commits of at most `max_ops` writes, keeping
/// each write's precondition in the same commit.
fn batch(writes: Vec<PlannedWrite>, max_ops: usize) -> Vec<Commit> {
    let max_ops = max_ops.max(1);
    let mut commits = Vec::new();
    let mut current = Commit::new();
    for planned in writes {
        if current.writes.len() == max_ops {
            commits.push(std::mem::take(&mut current));
        }
        if let Some(precondition) = planned.precondition {
            current.preconditions.push(precondition);
        }
        current.writes.push(planned.write);
    }
    if !current.is_empty() {
        commits.push(current);
    }
    commits
}

fn log_undecodable(collection: Collection, failed: Vec<(String, mercado_store::StoreError)>) {
    for (id, error) in failed {
        warn!(%collection, %id, %error, "Skipping undecodable document");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mercado_core::Cell;
    use mercado_store::Expected;

    fn stored_product(id: &str, code: &str, stock: i64, version: u64) -> Document {
        let product = Product {
            id: id.into(),
            code: code.into(),
            name: "Arroz".into(),
            stock,
            ..Product::default()
        };
        Document {
            id: id.into(),
            version,
            data: to_body(&product).unwrap(),
        }
    }

    fn rows(entries: &[(&str, &str, f64)]) -> ImportDataset {
        ImportDataset {
            headers: vec!["Codigo".into(), "Nombre".into(), "Precio".into(), "Stock".into()],
            rows: entries
                .iter()
                .map(|(code, name, stock)| {
                    vec![
                        Cell::Text(code.to_string()),
                        Cell::Text(name.to_string()),
                        Cell::Number(1.0),
                        Cell::Number(*stock),
                    ]
                })
                .collect(),
        }
    }

    fn product_writes(plan: &Plan) -> Vec<&PlannedWrite> {
        plan.writes
            .iter()
            .filter(|w| w.write.collection() == Collection::Products)
            .collect()
    }

    fn planned(i: usize) -> PlannedWrite {
        PlannedWrite {
            precondition: Some(Precondition::from_read(Collection::Products, format!("p{i}"), None)),
            write: WriteOp::Set {
                collection: Collection::Products,
                id: format!("p{i}"),
                data: Map::new(),
            },
        }
    }

    #[test]
    fn test_batches_respect_ceiling() {
        let commits = batch((0..1_000).map(planned).collect(), 450);
        let sizes: Vec<usize> = commits.iter().map(|c| c.writes.len()).collect();
        assert_eq!(sizes, vec![450, 450, 100]);
        assert_eq!(commits[2].preconditions.len(), 100);
    }

    #[test]
    fn test_unbounded_store_gets_one_batch() {
        let commits = batch((0..1_000).map(planned).collect(), usize::MAX);
        assert_eq!(commits.len(), 1);
    }

    #[test]
    fn test_no_writes_no_batches() {
        assert!(batch(Vec::new(), 450).is_empty());
    }

    #[test]
    fn test_repeated_code_for_stored_product_folds_into_one_pinned_update() {
        let data = rows(&[("A-1", "Arroz", 5.0), ("B-1", "Frijol", 3.0), ("a-1", "Arroz 1kg", 7.0)]);
        let mapping = ColumnMapping::auto_map(&data.headers);
        let plan = plan_rows(&data, &mapping, &[], &[stored_product("p-a", "A-1", 10, 3)]).unwrap();

        assert_eq!(plan.summary, ImportSummary { added: 1, updated: 2, errors: 0 });
        let writes = product_writes(&plan);
        assert_eq!(writes.len(), 2);

        let update = writes
            .iter()
            .find(|w| matches!(&w.write, WriteOp::Update { id, .. } if id == "p-a"))
            .unwrap();
        assert_eq!(update.precondition.as_ref().unwrap().expected, Expected::Version(3));
        let WriteOp::Update { fields, .. } = &update.write else {
            unreachable!()
        };
        assert_eq!(fields["stock"], Value::from(7));
        assert_eq!(fields["name"], Value::from("Arroz 1kg"));
    }

    #[test]
    fn test_repeated_code_for_new_product_folds_into_one_create() {
        let data = rows(&[("N-1", "Azucar", 4.0), ("N-1", "Azucar refinada", 9.0)]);
        let mapping = ColumnMapping::auto_map(&data.headers);
        let plan = plan_rows(&data, &mapping, &[], &[]).unwrap();

        assert_eq!(plan.summary, ImportSummary { added: 1, updated: 1, errors: 0 });
        let writes = product_writes(&plan);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].precondition.as_ref().unwrap().expected, Expected::Absent);
        let WriteOp::Set { data, .. } = &writes[0].write else {
            unreachable!()
        };
        assert_eq!(data["stock"], Value::from(9));
        assert_eq!(data["name"], Value::from("Azucar refinada"));
    }

    #[test]
    fn test_every_product_write_carries_its_own_precondition_across_batches() {
        let data = rows(&[("A-1", "Arroz", 5.0), ("B-1", "Frijol", 3.0), ("A-1", "Arroz", 7.0)]);
        let mapping = ColumnMapping::auto_map(&data.headers);
        let plan = plan_rows(&data, &mapping, &[], &[stored_product("p-a", "A-1", 10, 1)]).unwrap();

        for commit in batch(plan.writes, 1) {
            let written: Vec<&str> = commit.writes.iter().map(|w| w.id()).collect();
            let guarded: Vec<&str> = commit.preconditions.iter().map(|p| p.id.as_str()).collect();
            assert_eq!(written, guarded);
        }
    }

    #[test]
    fn test_random_color_from_palette() {
        let color = random_color();
        assert!(CATEGORY_COLORS.contains(&color.as_str()));
    }
}
