//! Bulk import of the public food-nutrition dataset
//!
//! Reads the published Korean spreadsheet (`.xlsx`, first worksheet) or a CSV
//! export of it. Rows are written to the store one at a time without
//! mirroring; a single batched index pass runs at the end.

use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::StringRecord;
use nutrition_core::prelude::*;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{error, info, warn};

use crate::orchestrator::{SyncMode, SyncOrchestrator};

/// Stored value for a nutrient present only in trace amounts ("tr")
pub const TRACE_AMOUNT: f64 = -1.0;

/// One spreadsheet row; every cell is read as text and converted afterwards
#[derive(Debug, Deserialize)]
struct SourceRow {
    #[serde(rename = "식품코드")]
    food_cd: Option<String>,
    #[serde(rename = "식품명")]
    food_name: Option<String>,
    #[serde(rename = "식품대분류")]
    main_group: Option<String>,
    #[serde(rename = "식품상세분류")]
    sub_group: Option<String>,
    #[serde(rename = "연도")]
    research_year: Option<String>,
    #[serde(rename = "지역 / 제조사")]
    maker_name: Option<String>,
    #[serde(rename = "성분표출처")]
    ref_name: Option<String>,
    #[serde(rename = "1회제공량")]
    serving_size: Option<String>,
    #[serde(rename = "에너지(㎉)")]
    calorie: Option<String>,
    #[serde(rename = "탄수화물(g)")]
    carbohydrate: Option<String>,
    #[serde(rename = "단백질(g)")]
    protein: Option<String>,
    #[serde(rename = "지방(g)")]
    fat: Option<String>,
    #[serde(rename = "총당류(g)")]
    sugars: Option<String>,
    #[serde(rename = "나트륨(㎎)")]
    salt: Option<String>,
    #[serde(rename = "콜레스테롤(㎎)")]
    cholesterol: Option<String>,
    #[serde(rename = "총 포화 지방산(g)")]
    saturated_fatty_acids: Option<String>,
    #[serde(rename = "트랜스 지방산(g)")]
    trans_fat: Option<String>,
}

impl SourceRow {
    fn into_new_record(self) -> Result<NewRecord> {
        let food_cd = text(self.food_cd)
            .ok_or_else(|| NutritionError::validation("missing required column 식품코드"))?;
        let food_name = text(self.food_name)
            .ok_or_else(|| NutritionError::validation("missing required column 식품명"))?;

        let group_name = match (text(self.main_group), text(self.sub_group)) {
            (Some(main), Some(sub)) => Some(format!("{} - {}", main, sub)),
            (main, sub) => main.or(sub),
        };

        let num = |cell: Option<String>, column: &str| number(cell, column, &food_cd);
        let record = NewRecord {
            group_name,
            research_year: text(self.research_year),
            maker_name: text(self.maker_name),
            ref_name: text(self.ref_name),
            serving_size: num(self.serving_size, "1회제공량"),
            calorie: num(self.calorie, "에너지(㎉)"),
            carbohydrate: num(self.carbohydrate, "탄수화물(g)"),
            protein: num(self.protein, "단백질(g)"),
            fat: num(self.fat, "지방(g)"),
            sugars: num(self.sugars, "총당류(g)"),
            salt: num(self.salt, "나트륨(㎎)"),
            cholesterol: num(self.cholesterol, "콜레스테롤(㎎)"),
            saturated_fatty_acids: num(self.saturated_fatty_acids, "총 포화 지방산(g)"),
            trans_fat: num(self.trans_fat, "트랜스 지방산(g)"),
            ..NewRecord::new(food_cd.clone(), food_name)
        };
        Ok(record)
    }
}

/// Trimmed cell text; blank and `-` placeholders are absent
fn text(cell: Option<String>) -> Option<String> {
    cell.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "-")
}

/// Numeric cell; unparsable values are dropped with a warning
fn number(cell: Option<String>, column: &str, food_cd: &str) -> Option<f64> {
    let raw = text(cell)?;
    if raw.eq_ignore_ascii_case("tr") {
        return Some(TRACE_AMOUNT);
    }
    match raw.replace(',', "").parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(food_cd, column, value = %raw, "Unparsable numeric cell, treating as absent");
            None
        }
    }
}

/// Summary of an import run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows written as new records
    pub created: usize,
    /// Rows whose code was already stored
    pub existing: usize,
    /// Rows skipped because of bad data or store errors
    pub failed: usize,
    /// Documents written by the final index pass
    pub indexed: usize,
    /// Documents the index rejected
    pub index_failed: usize,
}

/// Spreadsheet formats read as workbooks; anything else is parsed as CSV
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// Header row and data rows of the first worksheet, every cell as text
fn worksheet_rows(range: &Range<Data>) -> Result<(StringRecord, Vec<StringRecord>)> {
    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<StringRecord>());
    let mut headers = rows
        .next()
        .ok_or_else(|| NutritionError::validation("worksheet has no header row"))?;
    headers.trim();
    Ok((headers, rows.collect()))
}

/// Dataset importer driving the orchestrator
pub struct Loader<'a> {
    orchestrator: &'a SyncOrchestrator,
}

impl<'a> Loader<'a> {
    pub fn new(orchestrator: &'a SyncOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Import a workbook or CSV file, chosen by extension
    pub async fn load_path(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        let is_workbook = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| WORKBOOK_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if is_workbook {
            return self.load_workbook(path).await;
        }

        let file = std::fs::File::open(path).map_err(|e| {
            NutritionError::config(format!("cannot open {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Loading CSV file");
        self.load_reader(file).await
    }

    /// Import the first worksheet of a spreadsheet file
    pub async fn load_workbook(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        let (headers, rows) = {
            let mut workbook = open_workbook_auto(path).map_err(|e| {
                NutritionError::config(format!("cannot open {}: {}", path.display(), e))
            })?;
            let range = workbook
                .worksheet_range_at(0)
                .ok_or_else(|| {
                    NutritionError::validation(format!("{} has no worksheets", path.display()))
                })?
                .map_err(|e| NutritionError::validation(format!("unreadable worksheet: {}", e)))?;
            worksheet_rows(&range)?
        };
        info!(path = %path.display(), rows = rows.len(), "Loading workbook");
        self.load_rows(&headers, rows.into_iter().map(Ok)).await
    }

    /// Import CSV from any reader
    ///
    /// Only an unreadable header aborts the run; each bad row is counted and
    /// skipped.
    pub async fn load_reader<R: Read>(&self, reader: R) -> Result<LoadReport> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| NutritionError::validation(format!("unreadable CSV header: {}", e)))?
            .clone();
        let rows: Vec<_> = rdr
            .into_records()
            .map(|row| row.map_err(|e| NutritionError::validation(e.to_string())))
            .collect();
        self.load_rows(&headers, rows).await
    }

    async fn load_rows(
        &self,
        headers: &StringRecord,
        rows: impl IntoIterator<Item = Result<StringRecord>>,
    ) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        let mut to_index = Vec::new();

        for (n, row) in rows.into_iter().enumerate() {
            // Header is line 1
            let line = n + 2;
            let input = match row
                .and_then(|record| {
                    record
                        .deserialize::<SourceRow>(Some(headers))
                        .map_err(|e| NutritionError::validation(e.to_string()))
                })
                .and_then(SourceRow::into_new_record)
            {
                Ok(input) => input,
                Err(e) => {
                    error!(line, error = %e, "Skipping row");
                    report.failed += 1;
                    continue;
                }
            };

            match self.import(input).await {
                Ok((record, created)) => {
                    if created {
                        report.created += 1;
                    } else {
                        report.existing += 1;
                    }
                    to_index.push(record);
                }
                Err(e) => {
                    error!(line, error = %e, "Skipping row");
                    report.failed += 1;
                }
            }
        }

        info!(
            created = report.created,
            existing = report.existing,
            failed = report.failed,
            "Rows processed"
        );

        let mirror = self.orchestrator.mirror_all(&to_index).await;
        report.indexed = mirror.indexed;
        report.index_failed = mirror.failed;
        info!(
            indexed = report.indexed,
            index_failed = report.index_failed,
            sync = %mirror.sync,
            "Load finished"
        );
        Ok(report)
    }

    /// Reuse the stored record for a known code, otherwise create it unmirrored
    async fn import(&self, input: NewRecord) -> Result<(NutritionRecord, bool)> {
        if let Some(existing) = self.orchestrator.store().get_by_code(&input.food_cd).await? {
            return Ok((existing, false));
        }
        let mutation = self.orchestrator.create_with(input, SyncMode::Skip).await?;
        Ok((mutation.record, true))
    }
}
