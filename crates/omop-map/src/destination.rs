//! Destination table resolution by concept domain.

use omop_model::{CdmCatalogue, Concept, OmopTable};

use crate::config::DestinationConfig;

/// Where a concept's rules land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination<'a> {
    pub table: &'a OmopTable,
    /// The domain name used to build `{domain}_*` field names. For the
    /// "meas value" special case this is already `measurement`.
    pub domain: String,
    /// Whether the concept arrived through the "meas value" special case
    /// and needs a `value_as_concept_id` rule.
    pub is_meas_value: bool,
}

/// Resolves a concept's clinical domain to a destination table.
#[derive(Debug, Clone)]
pub struct DestinationResolver<'a> {
    catalogue: &'a CdmCatalogue,
    config: &'a DestinationConfig,
}

impl<'a> DestinationResolver<'a> {
    pub fn new(catalogue: &'a CdmCatalogue, config: &'a DestinationConfig) -> Self {
        DestinationResolver { catalogue, config }
    }

    /// Resolve the destination table for a concept, or `None` when the
    /// domain has no implemented destination.
    ///
    /// The general scheme looks up `{domain}_source_concept_id` across
    /// the allowed tables; "meas value" is the one domain routed outside
    /// it, directly onto `measurement.value_as_concept_id`.
    pub fn destination_for(&self, concept: &Concept) -> Option<Destination<'a>> {
        let domain = concept.domain_id.to_lowercase();

        if domain == "meas value" {
            let field = self
                .catalogue
                .field_in_table(self.config.meas_value_table(), self.config.meas_value_field())?;
            let table = self.catalogue.table(field.table)?;
            return Some(Destination {
                table,
                domain: self.config.meas_value_table().to_string(),
                is_meas_value: true,
            });
        }

        let field_name = format!("{domain}_source_concept_id");
        let field = self
            .catalogue
            .field_in_tables(&field_name, self.config.allowed_tables())?;
        let table = self.catalogue.table(field.table)?;
        if !self.config.is_allowed(&table.name) {
            return None;
        }
        Some(Destination {
            table,
            domain,
            is_meas_value: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use omop_model::{ConceptId, StandardConcept};

    fn concept_in_domain(domain: &str) -> Concept {
        Concept {
            concept_id: ConceptId::new(1),
            concept_name: "Test".to_string(),
            domain_id: domain.to_string(),
            vocabulary_id: "SNOMED".to_string(),
            concept_class_id: "Clinical Finding".to_string(),
            standard_concept: StandardConcept::Standard,
            concept_code: "1".to_string(),
            valid_start_date: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
            valid_end_date: NaiveDate::from_ymd_opt(2099, 12, 31).unwrap(),
        }
    }

    #[test]
    fn condition_domain_targets_condition_occurrence() {
        let catalogue = CdmCatalogue::cdm();
        let config = DestinationConfig::cdm();
        let resolver = DestinationResolver::new(&catalogue, &config);
        let destination = resolver
            .destination_for(&concept_in_domain("Condition"))
            .unwrap();
        assert_eq!(destination.table.name, "condition_occurrence");
        assert_eq!(destination.domain, "condition");
        assert!(!destination.is_meas_value);
    }

    #[test]
    fn meas_value_routes_to_measurement() {
        let catalogue = CdmCatalogue::cdm();
        let config = DestinationConfig::cdm();
        let resolver = DestinationResolver::new(&catalogue, &config);
        let destination = resolver
            .destination_for(&concept_in_domain("Meas Value"))
            .unwrap();
        assert_eq!(destination.table.name, "measurement");
        assert_eq!(destination.domain, "measurement");
        assert!(destination.is_meas_value);
    }

    #[test]
    fn unimplemented_domain_resolves_to_none() {
        let catalogue = CdmCatalogue::cdm();
        let config = DestinationConfig::cdm();
        let resolver = DestinationResolver::new(&catalogue, &config);
        assert!(resolver.destination_for(&concept_in_domain("Episode")).is_none());
        // specimen carries no specimen_source_concept_id column, so the
        // Specimen domain stays unimplemented even though the table is
        // on the allow-list.
        assert!(resolver.destination_for(&concept_in_domain("Specimen")).is_none());
    }

    #[test]
    fn gender_domain_targets_person() {
        let catalogue = CdmCatalogue::cdm();
        let config = DestinationConfig::cdm();
        let resolver = DestinationResolver::new(&catalogue, &config);
        let destination = resolver
            .destination_for(&concept_in_domain("Gender"))
            .unwrap();
        assert_eq!(destination.table.name, "person");
    }
}
