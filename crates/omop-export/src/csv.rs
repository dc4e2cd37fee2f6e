//! Flattened CSV export of the rule listing.

use std::io;

use chrono::NaiveDate;

use omop_vocab::VocabularySource;

use crate::error::Result;
use crate::list::{RuleRow, TermMapping};

/// Column order of the CSV contract.
pub const CSV_HEADERS: [&str; 13] = [
    "source_table",
    "source_field",
    "source_value",
    "concept_id",
    "omop_term",
    "class",
    "concept",
    "validity",
    "domain",
    "vocabulary",
    "creation_type",
    "rule_id",
    "isFieldMapping",
];

/// Write the listing as CSV.
///
/// Term-mapped rows carry the mapped value/concept and an
/// `isFieldMapping` marker (`0` for value maps, `1` for field maps);
/// rows without term mapping leave those columns blank. Concept class,
/// standardness, vocabulary, and validity (as of `as_of`) come from the
/// vocabulary.
pub fn write_rules_csv<W: io::Write, V: VocabularySource>(
    writer: W,
    rows: &[RuleRow],
    vocab: &V,
    as_of: NaiveDate,
) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(CSV_HEADERS)?;

    for row in rows {
        let (source_value, concept_id, is_field_mapping) = match &row.term_mapping {
            None => (String::new(), String::new(), String::new()),
            Some(TermMapping::Value {
                source_value,
                concept,
            }) => (source_value.clone(), concept.to_string(), "0".to_string()),
            Some(TermMapping::Field(concept)) => {
                (String::new(), concept.to_string(), "1".to_string())
            }
        };

        let mut class = String::new();
        let mut standard = String::new();
        let mut validity = String::new();
        let mut vocabulary = String::new();
        if !concept_id.is_empty()
            && let Some(concept) = vocab.concept(row.concept_id)?
        {
            class = concept.concept_class_id.clone();
            standard = concept.standard_concept.to_string();
            validity = concept.is_valid_on(as_of).to_string();
            vocabulary = concept.vocabulary_id.clone();
        }

        out.write_record([
            row.source_table.as_str(),
            row.source_field.as_str(),
            source_value.as_str(),
            concept_id.as_str(),
            row.omop_term.as_str(),
            class.as_str(),
            standard.as_str(),
            validity.as_str(),
            row.domain.as_str(),
            vocabulary.as_str(),
            row.creation_type.to_string().as_str(),
            row.rule_id.to_string().as_str(),
            is_field_mapping.as_str(),
        ])?;
    }
    out.flush()?;
    Ok(())
}
