//! Tabular exports of the history and of a comparison, written as CSV.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::{
    analytics::{ComparisonResult, column_totals},
    model::{BedCategory, DateKey},
    store::OccupancyStore,
    traits::Clock,
};

/// File stem for history exports.
pub const HISTORY_STEM: &str = "Historico_Ocupacao_Leitos";

/// A header row plus string cells, ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path).context("Failed to create CSV writer")?;
        wtr.write_record(&self.headers)
            .context("Failed to write CSV header")?;
        for row in &self.rows {
            wtr.write_record(row).context("Failed to write CSV row")?;
        }
        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(())
    }
}

/// One row per date of `dates`, in the order given, with a final `Total` row
/// summing those dates. Dates missing from the store export as zeros.
pub fn history_table(store: &OccupancyStore, dates: &[DateKey]) -> Table {
    let headers = std::iter::once("Data".to_string())
        .chain(BedCategory::ALL.iter().map(|c| c.label().to_string()))
        .collect();

    let mut rows: Vec<Vec<String>> = dates
        .iter()
        .map(|date| {
            let snapshot = store.get(date);
            std::iter::once(date.display_br())
                .chain(snapshot.iter().map(|(_, v)| v.to_string()))
                .collect()
        })
        .collect();

    if !dates.is_empty() {
        rows.push(
            std::iter::once("Total".to_string())
                .chain(
                    column_totals(store, dates)
                        .into_iter()
                        .map(|(_, v)| v.to_string()),
                )
                .collect(),
        );
    }

    Table { headers, rows }
}

pub fn comparison_table(result: &ComparisonResult) -> Table {
    let headers = vec![
        "Tipo de Leito".to_string(),
        result.date_a.display_br(),
        result.date_b.display_br(),
        "Diferença".to_string(),
    ];

    let mut rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            vec![
                row.category.wire_name().to_string(),
                row.value_a.to_string(),
                row.value_b.to_string(),
                row.delta.to_string(),
            ]
        })
        .collect();
    rows.push(vec![
        "Total".to_string(),
        result.total_a.to_string(),
        result.total_b.to_string(),
        result.total_delta.to_string(),
    ]);

    Table { headers, rows }
}

/// File stem for a comparison export.
pub fn comparison_stem(result: &ComparisonResult) -> String {
    format!("Comparativo_Ocupacao_{}_vs_{}", result.date_a, result.date_b)
}

/// Write `table` into `output_dir` as `<stem>_<YYYYmmdd_HHMMSS>.csv`.
///
/// # Returns
/// The path to the created CSV file on success.
pub fn export_to_csv<C: Clock + ?Sized>(
    output_dir: &Path,
    table: &Table,
    stem: &str,
    clock: &C,
) -> Result<PathBuf> {
    let export_time = clock.now_utc();
    let filename = format!("{}_{}.csv", stem, export_time.format("%Y%m%d_%H%M%S"));
    let output_path = output_dir.join(filename);

    table
        .write_csv(&output_path)
        .with_context(|| format!("Failed to export {}", output_path.display()))?;

    tracing::info!("Exported {} rows to {}", table.rows.len(), output_path.display());
    Ok(output_path)
}
