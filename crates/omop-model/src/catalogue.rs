//! Static catalogue of CDM destination tables and fields.
//!
//! The catalogue is read-only reference data: the destination tables rule
//! generation may target and the columns each of them carries. It is
//! constructed once at startup and passed around by reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::{OmopFieldId, OmopTableId};

/// A destination (CDM) table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OmopTable {
    pub id: OmopTableId,
    pub name: String,
}

/// A destination (CDM) field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OmopField {
    pub id: OmopFieldId,
    pub table: OmopTableId,
    pub name: String,
}

/// The destination table/field catalogue.
#[derive(Debug, Clone)]
pub struct CdmCatalogue {
    tables: Vec<OmopTable>,
    fields: Vec<OmopField>,
    table_index: BTreeMap<String, OmopTableId>,
}

impl CdmCatalogue {
    /// Build a catalogue from `(table, columns)` pairs. Ids are assigned
    /// in declaration order.
    pub fn from_tables<'a>(tables: impl IntoIterator<Item = (&'a str, &'a [&'a str])>) -> Self {
        let mut catalogue = CdmCatalogue {
            tables: Vec::new(),
            fields: Vec::new(),
            table_index: BTreeMap::new(),
        };
        let mut next_field = 1i64;
        for (table_no, (table_name, columns)) in tables.into_iter().enumerate() {
            let table_id = OmopTableId::new(table_no as i64 + 1);
            catalogue.tables.push(OmopTable {
                id: table_id,
                name: table_name.to_string(),
            });
            catalogue.table_index.insert(table_name.to_string(), table_id);
            for column in columns {
                catalogue.fields.push(OmopField {
                    id: OmopFieldId::new(next_field),
                    table: table_id,
                    name: (*column).to_string(),
                });
                next_field += 1;
            }
        }
        catalogue
    }

    /// The standard catalogue: the eight destination tables rule
    /// generation may target, with their CDM columns.
    pub fn cdm() -> Self {
        Self::from_tables([
            (
                "person",
                &[
                    "person_id",
                    "gender_concept_id",
                    "year_of_birth",
                    "month_of_birth",
                    "day_of_birth",
                    "birth_datetime",
                    "race_concept_id",
                    "ethnicity_concept_id",
                    "gender_source_value",
                    "gender_source_concept_id",
                    "race_source_value",
                    "race_source_concept_id",
                    "ethnicity_source_value",
                    "ethnicity_source_concept_id",
                ][..],
            ),
            (
                "measurement",
                &[
                    "measurement_id",
                    "person_id",
                    "measurement_concept_id",
                    "measurement_date",
                    "measurement_datetime",
                    "measurement_type_concept_id",
                    "value_as_number",
                    "value_as_concept_id",
                    "unit_concept_id",
                    "measurement_source_value",
                    "measurement_source_concept_id",
                    "unit_source_value",
                    "value_source_value",
                ][..],
            ),
            (
                "condition_occurrence",
                &[
                    "condition_occurrence_id",
                    "person_id",
                    "condition_concept_id",
                    "condition_start_date",
                    "condition_start_datetime",
                    "condition_end_date",
                    "condition_end_datetime",
                    "condition_type_concept_id",
                    "condition_source_value",
                    "condition_source_concept_id",
                ][..],
            ),
            (
                "observation",
                &[
                    "observation_id",
                    "person_id",
                    "observation_concept_id",
                    "observation_date",
                    "observation_datetime",
                    "observation_type_concept_id",
                    "value_as_number",
                    "value_as_string",
                    "value_as_concept_id",
                    "observation_source_value",
                    "observation_source_concept_id",
                ][..],
            ),
            (
                "drug_exposure",
                &[
                    "drug_exposure_id",
                    "person_id",
                    "drug_concept_id",
                    "drug_exposure_start_date",
                    "drug_exposure_start_datetime",
                    "drug_exposure_end_date",
                    "drug_exposure_end_datetime",
                    "drug_type_concept_id",
                    "drug_source_value",
                    "drug_source_concept_id",
                ][..],
            ),
            (
                "procedure_occurrence",
                &[
                    "procedure_occurrence_id",
                    "person_id",
                    "procedure_concept_id",
                    "procedure_date",
                    "procedure_datetime",
                    "procedure_type_concept_id",
                    "procedure_source_value",
                    "procedure_source_concept_id",
                ][..],
            ),
            (
                "specimen",
                &[
                    "specimen_id",
                    "person_id",
                    "specimen_concept_id",
                    "specimen_type_concept_id",
                    "specimen_date",
                    "specimen_datetime",
                    "specimen_source_id",
                    "specimen_source_value",
                    "unit_source_value",
                ][..],
            ),
            (
                "device_exposure",
                &[
                    "device_exposure_id",
                    "person_id",
                    "device_concept_id",
                    "device_exposure_start_date",
                    "device_exposure_start_datetime",
                    "device_exposure_end_date",
                    "device_exposure_end_datetime",
                    "device_type_concept_id",
                    "device_source_value",
                    "device_source_concept_id",
                ][..],
            ),
        ])
    }

    pub fn tables(&self) -> &[OmopTable] {
        &self.tables
    }

    pub fn fields(&self) -> &[OmopField] {
        &self.fields
    }

    pub fn table(&self, id: OmopTableId) -> Option<&OmopTable> {
        self.tables.iter().find(|table| table.id == id)
    }

    pub fn field(&self, id: OmopFieldId) -> Option<&OmopField> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn table_by_name(&self, name: &str) -> Option<&OmopTable> {
        self.table_index.get(name).and_then(|id| self.table(*id))
    }

    /// Look up a field by name within a specific table.
    pub fn field_in_table(&self, table_name: &str, field_name: &str) -> Option<&OmopField> {
        let table_id = *self.table_index.get(table_name)?;
        self.fields
            .iter()
            .find(|field| field.table == table_id && field.name == field_name)
    }

    /// Look up a field by name across a restricted set of tables.
    ///
    /// Field names are not unique across the whole catalogue (both
    /// measurement and observation carry `value_as_number`); restricting
    /// to the caller's allow-list keeps the lookup deterministic, with
    /// catalogue order breaking any remaining tie.
    pub fn field_in_tables(&self, field_name: &str, table_names: &[String]) -> Option<&OmopField> {
        self.fields.iter().find(|field| {
            field.name == field_name
                && self
                    .table(field.table)
                    .is_some_and(|table| table_names.iter().any(|name| name == &table.name))
        })
    }
}
