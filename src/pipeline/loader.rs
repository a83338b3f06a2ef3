//! Data loader/cleaner stage
//!
//! Reads the raw AHIES CSV extract, selects and renames the configured
//! columns, coerces types, filters by age, deduplicates by identifier,
//! applies the documented missing-value policy and decodes categorical
//! codes. The cleaned table is written as Parquet for the feature stage.

use std::collections::BTreeMap;

use arrow::array::{Array, StringArray};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::config::{CleaningConfig, ImputationStrategy, PipelineConfig};
use crate::error::{Error, Result};
use crate::models::HouseholdRecord;
use crate::pipeline::{Stage, StageSummary};
use crate::utils::{log_operation_start, read_csv, write_parquet};

/// The loader/cleaner stage
pub struct LoadStage;

impl Stage for LoadStage {
    fn name(&self) -> &'static str {
        "load-clean"
    }

    fn run(&self, config: &PipelineConfig) -> Result<StageSummary> {
        let raw_path = config.raw_path();
        log_operation_start("loading raw survey extract from", &raw_path);

        let raw = read_csv(&raw_path)?;
        let rows_in = raw.num_rows();

        let records = clean_batch(&raw, &config.cleaning)?;
        if records.is_empty() {
            return Err(Error::Data(
                "no rows survived cleaning; check the age filter and identifier columns"
                    .to_string(),
            ));
        }

        let output = config.cleaned_path();
        let batch = HouseholdRecord::to_record_batch(&records)?;
        write_parquet(&batch, &output)?;

        Ok(StageSummary {
            stage: self.name(),
            rows_in,
            rows_out: records.len(),
            output,
        })
    }
}

/// One raw row after column selection and type coercion, before cleaning
#[derive(Debug, Clone, Default)]
struct RawRow {
    household_id: Option<String>,
    person_id: Option<String>,
    region_code: Option<i32>,
    urban_rural_code: Option<i32>,
    sex_code: Option<i32>,
    age: Option<i32>,
    marital_status: Option<i32>,
    education_level: Option<i32>,
    grade_completed: Option<f64>,
    worked_code: Option<i32>,
    worked: Option<String>,
    primary_income: Option<f64>,
    has_primary_income: bool,
    secondary_income: Option<f64>,
    medical_expense: Option<f64>,
    food_expense: Option<f64>,
    transport_expense: Option<f64>,
    dwelling_code: Option<i32>,
    vehicle_code: Option<i32>,
}

/// Clean a raw all-string batch into typed household records.
///
/// Fails with a data error when any configured raw column is absent; the
/// extract does not match the expected survey schema in that case.
pub fn clean_batch(batch: &RecordBatch, config: &CleaningConfig) -> Result<Vec<HouseholdRecord>> {
    let columns = resolve_columns(batch, config)?;
    let mut rows = parse_rows(batch, &columns);

    log_missing_summary(&rows);

    // Age filter: analysis covers adults only; unparseable ages fall out too
    let before = rows.len();
    rows.retain(|row| row.age.is_some_and(|age| age >= config.min_age));
    log::info!(
        "age filter (>= {}): {} rows remaining, {} removed",
        config.min_age,
        rows.len(),
        before - rows.len()
    );

    // Rows without identifiers cannot be aligned across stages
    let before = rows.len();
    rows.retain(|row| row.household_id.is_some() && row.person_id.is_some());
    if before != rows.len() {
        log::warn!("dropped {} rows with missing identifiers", before - rows.len());
    }

    dedup_rows(&mut rows);

    impute_work_status(&mut rows);
    impute_primary_income(&mut rows);
    apply_strategies(&mut rows, &config.imputation);

    Ok(rows
        .into_iter()
        .map(|row| finalize_row(row, config))
        .collect())
}

/// Map each cleaned column name to its raw column, failing on any absence
fn resolve_columns<'a>(
    batch: &'a RecordBatch,
    config: &CleaningConfig,
) -> Result<BTreeMap<String, &'a StringArray>> {
    let schema = batch.schema();
    let mut resolved = BTreeMap::new();
    let mut missing = Vec::new();

    for (raw_name, clean_name) in &config.column_map {
        match schema.index_of(raw_name) {
            Ok(index) => {
                let array = batch
                    .column(index)
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| {
                        Error::Data(format!("raw column '{raw_name}' is not a string column"))
                    })?;
                resolved.insert(clean_name.clone(), array);
            }
            Err(_) => missing.push(raw_name.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(Error::Data(format!(
            "raw input does not match the expected survey schema; missing columns: {}",
            missing.iter().join(", ")
        )));
    }

    Ok(resolved)
}

fn parse_rows(batch: &RecordBatch, columns: &BTreeMap<String, &StringArray>) -> Vec<RawRow> {
    let n = batch.num_rows();
    let get = |name: &str, i: usize| -> Option<String> {
        columns.get(name).and_then(|array| cell_string(array, i))
    };

    (0..n)
        .map(|i| RawRow {
            household_id: get("household_id", i),
            person_id: get("person_id", i),
            region_code: parse_i32(get("region", i)),
            urban_rural_code: parse_i32(get("urban_rural", i)),
            sex_code: parse_i32(get("sex", i)),
            age: parse_i32(get("age", i)),
            marital_status: parse_i32(get("marital_status", i)),
            education_level: parse_i32(get("education_level", i)),
            grade_completed: parse_f64(get("grade_completed", i)),
            worked_code: parse_i32(get("worked_last_7_days", i)),
            worked: None,
            primary_income: parse_f64(get("primary_income_monthly", i)),
            has_primary_income: false,
            secondary_income: parse_f64(get("secondary_income_monthly", i)),
            medical_expense: parse_f64(get("medical_expense_12m", i)),
            food_expense: parse_f64(get("food_expense_12m", i)),
            transport_expense: parse_f64(get("transport_expense_12m", i)),
            dwelling_code: parse_i32(get("owns_dwelling", i)),
            vehicle_code: parse_i32(get("owns_vehicle", i)),
        })
        .collect()
}

fn cell_string(array: &StringArray, index: usize) -> Option<String> {
    if array.is_null(index) {
        return None;
    }
    let value = array.value(index).trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_i32(value: Option<String>) -> Option<i32> {
    let value = value?;
    // Survey exports sometimes write integer codes as "2.0"
    value
        .parse::<i32>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|v| v as i32))
}

fn parse_f64(value: Option<String>) -> Option<f64> {
    value?.parse::<f64>().ok()
}

/// Log a per-column missing-value summary before imputation
fn log_missing_summary(rows: &[RawRow]) {
    let total = rows.len();
    if total == 0 {
        return;
    }

    let counts: Vec<(&str, usize)> = vec![
        ("age", rows.iter().filter(|r| r.age.is_none()).count()),
        (
            "marital_status",
            rows.iter().filter(|r| r.marital_status.is_none()).count(),
        ),
        (
            "education_level",
            rows.iter().filter(|r| r.education_level.is_none()).count(),
        ),
        (
            "grade_completed",
            rows.iter().filter(|r| r.grade_completed.is_none()).count(),
        ),
        (
            "worked_last_7_days",
            rows.iter().filter(|r| r.worked_code.is_none()).count(),
        ),
        (
            "primary_income_monthly",
            rows.iter().filter(|r| r.primary_income.is_none()).count(),
        ),
        (
            "secondary_income_monthly",
            rows.iter().filter(|r| r.secondary_income.is_none()).count(),
        ),
        (
            "medical_expense_12m",
            rows.iter().filter(|r| r.medical_expense.is_none()).count(),
        ),
        (
            "food_expense_12m",
            rows.iter().filter(|r| r.food_expense.is_none()).count(),
        ),
        (
            "transport_expense_12m",
            rows.iter().filter(|r| r.transport_expense.is_none()).count(),
        ),
        (
            "owns_dwelling",
            rows.iter().filter(|r| r.dwelling_code.is_none()).count(),
        ),
        (
            "owns_vehicle",
            rows.iter().filter(|r| r.vehicle_code.is_none()).count(),
        ),
    ];

    for (column, missing) in counts {
        if missing > 0 {
            log::info!(
                "missing values in {column}: {missing} of {total} ({:.1}%)",
                missing as f64 / total as f64 * 100.0
            );
        }
    }
}

/// Deduplicate by (household, person), first occurrence wins
fn dedup_rows(rows: &mut Vec<RawRow>) {
    let before = rows.len();
    let mut seen = FxHashSet::default();
    rows.retain(|row| {
        let key = (
            row.household_id.clone().unwrap_or_default(),
            row.person_id.clone().unwrap_or_default(),
        );
        seen.insert(key)
    });

    if before != rows.len() {
        log::info!("deduplicated {} rows by identifier", before - rows.len());
    }
}

/// Mode-impute the work-status code, then decode 1/2 to Yes/No
fn impute_work_status(rows: &mut [RawRow]) {
    let mode = mode_value(rows.iter().filter_map(|r| r.worked_code));
    let missing = rows.iter().filter(|r| r.worked_code.is_none()).count();
    if missing > 0 {
        if let Some(mode) = mode {
            log::info!("imputed {missing} missing work-status values with mode ({mode})");
        }
    }

    for row in rows.iter_mut() {
        let code = row.worked_code.or(mode);
        row.worked = match code {
            Some(1) => Some("Yes".to_string()),
            Some(2) => Some("No".to_string()),
            _ => None,
        };
    }
}

/// Smart imputation of primary income based on work status.
///
/// The reported/unreported flag is captured before any value is written:
/// non-workers with missing income get 0, workers with missing income get
/// the median income of workers who reported one.
fn impute_primary_income(rows: &mut [RawRow]) {
    for row in rows.iter_mut() {
        row.has_primary_income = row.primary_income.is_some();
    }

    let worker_incomes: Vec<f64> = rows
        .iter()
        .filter(|r| r.worked.as_deref() == Some("Yes"))
        .filter_map(|r| r.primary_income)
        .collect();

    let median_for_workers = median_value(&worker_incomes)
        .or_else(|| {
            log::warn!(
                "no workers reported a primary income; falling back to the overall median"
            );
            median_value(
                &rows
                    .iter()
                    .filter_map(|r| r.primary_income)
                    .collect::<Vec<_>>(),
            )
        })
        .unwrap_or(0.0);

    let mut zero_imputed = 0usize;
    let mut median_imputed = 0usize;
    for row in rows.iter_mut() {
        if row.primary_income.is_some() {
            continue;
        }
        if row.worked.as_deref() == Some("Yes") {
            row.primary_income = Some(median_for_workers);
            median_imputed += 1;
        } else {
            row.primary_income = Some(0.0);
            zero_imputed += 1;
        }
    }

    log::info!(
        "primary income imputation: {zero_imputed} non-workers set to 0, \
         {median_imputed} workers set to the worker median ({median_for_workers:.2})"
    );
}

/// Apply the configured per-column strategies to the generic columns
fn apply_strategies(rows: &mut [RawRow], strategies: &BTreeMap<String, ImputationStrategy>) {
    for (column, strategy) in strategies {
        match column.as_str() {
            "marital_status" => {
                impute_i32_field(rows, *strategy, |r| &mut r.marital_status);
            }
            "education_level" => {
                impute_i32_field(rows, *strategy, |r| &mut r.education_level);
            }
            "grade_completed" => {
                impute_f64_field(rows, *strategy, |r| &mut r.grade_completed);
            }
            "secondary_income_monthly" => {
                impute_f64_field(rows, *strategy, |r| &mut r.secondary_income);
            }
            "medical_expense_12m" => {
                impute_f64_field(rows, *strategy, |r| &mut r.medical_expense);
            }
            "food_expense_12m" => {
                impute_f64_field(rows, *strategy, |r| &mut r.food_expense);
            }
            "transport_expense_12m" => {
                impute_f64_field(rows, *strategy, |r| &mut r.transport_expense);
            }
            other => {
                log::warn!("no imputation target named '{other}', skipping");
            }
        }
    }
}

fn impute_i32_field(
    rows: &mut [RawRow],
    strategy: ImputationStrategy,
    field: fn(&mut RawRow) -> &mut Option<i32>,
) {
    let fill = match strategy {
        ImputationStrategy::Mode => {
            let mut values = Vec::new();
            for row in rows.iter_mut() {
                if let Some(value) = *field(row) {
                    values.push(value);
                }
            }
            mode_value(values.into_iter())
        }
        ImputationStrategy::Median => {
            let mut values = Vec::new();
            for row in rows.iter_mut() {
                if let Some(value) = *field(row) {
                    values.push(f64::from(value));
                }
            }
            median_value(&values).map(|v| v.round() as i32)
        }
        ImputationStrategy::Constant(value) => Some(value as i32),
    };

    if let Some(fill) = fill {
        for row in rows.iter_mut() {
            let slot = field(row);
            if slot.is_none() {
                *slot = Some(fill);
            }
        }
    }
}

fn impute_f64_field(
    rows: &mut [RawRow],
    strategy: ImputationStrategy,
    field: fn(&mut RawRow) -> &mut Option<f64>,
) {
    let fill = match strategy {
        ImputationStrategy::Mode | ImputationStrategy::Median => {
            let mut values = Vec::new();
            for row in rows.iter_mut() {
                if let Some(value) = *field(row) {
                    values.push(value);
                }
            }
            median_value(&values)
        }
        ImputationStrategy::Constant(value) => Some(value),
    };

    if let Some(fill) = fill {
        for row in rows.iter_mut() {
            let slot = field(row);
            if slot.is_none() {
                *slot = Some(fill);
            }
        }
    }
}

/// Most frequent value; ties resolve to the smallest, matching the
/// first-of-sorted-modes convention of the source lineage
fn mode_value(values: impl Iterator<Item = i32>) -> Option<i32> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(value, _)| value)
}

/// Median with the even-count average convention
fn median_value(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Decode categorical codes and assemble the final record
fn finalize_row(row: RawRow, config: &CleaningConfig) -> HouseholdRecord {
    let decode = |map: &BTreeMap<i32, String>, code: Option<i32>| -> Option<String> {
        code.and_then(|c| map.get(&c).cloned())
    };
    // Asset questions code 1 = yes, 2 = no
    let indicator = |code: Option<i32>| -> Option<i32> {
        match code {
            Some(1) => Some(1),
            Some(2) => Some(0),
            _ => None,
        }
    };

    HouseholdRecord {
        household_id: row.household_id.unwrap_or_default(),
        person_id: row.person_id.unwrap_or_default(),
        region: decode(&config.region_map, row.region_code),
        urban_rural: decode(&config.urban_rural_map, row.urban_rural_code),
        sex: decode(&config.sex_map, row.sex_code),
        age: row.age.unwrap_or_default(),
        marital_status: row.marital_status,
        education_level: row.education_level,
        grade_completed: row.grade_completed,
        worked_last_7_days: row.worked,
        primary_income_monthly: row.primary_income.unwrap_or(0.0),
        has_primary_income: i32::from(row.has_primary_income),
        secondary_income_monthly: row.secondary_income.unwrap_or(0.0),
        medical_expense_12m: row.medical_expense.unwrap_or(0.0),
        transport_expense_12m: row.transport_expense.unwrap_or(0.0),
        food_expense_12m: row.food_expense.unwrap_or(0.0),
        owns_dwelling: indicator(row.dwelling_code),
        owns_vehicle: indicator(row.vehicle_code),
    }
}
