use omop_model::{
    ConceptId, CreationType, FieldId, MappingError, OmopFieldId, RuleKey, ScanReport,
    ScanReportField, ScanReportId, ScanReportTable, ScanReportValue, SourceElement, TableId,
    ValueId,
};
use omop_store::{InMemoryStore, MappingStore, StoreSnapshot};

fn sample_store() -> InMemoryStore {
    InMemoryStore::new(StoreSnapshot {
        scan_reports: vec![ScanReport {
            id: ScanReportId::new(1),
            dataset: "Covid Cohort".to_string(),
            name: "hospital_a".to_string(),
            active: true,
        }],
        tables: vec![ScanReportTable {
            id: TableId::new(1),
            scan_report: ScanReportId::new(1),
            name: "admissions".to_string(),
            person_id: Some(FieldId::new(1)),
            date_event: Some(FieldId::new(2)),
        }],
        fields: vec![
            ScanReportField {
                id: FieldId::new(1),
                table: TableId::new(1),
                name: "ID".to_string(),
                type_column: "INT".to_string(),
            },
            ScanReportField {
                id: FieldId::new(2),
                table: TableId::new(1),
                name: "VisitDate".to_string(),
                type_column: "DATETIME".to_string(),
            },
            ScanReportField {
                id: FieldId::new(3),
                table: TableId::new(1),
                name: "Symptom".to_string(),
                type_column: "VARCHAR".to_string(),
            },
        ],
        values: vec![ScanReportValue {
            id: ValueId::new(1),
            field: FieldId::new(3),
            value: "Headache".to_string(),
            value_description: None,
            frequency: 25,
        }],
        concepts: Vec::new(),
        rules: Vec::new(),
    })
}

#[test]
fn duplicate_attachment_is_rejected() {
    let mut store = sample_store();
    let element = SourceElement::Value(ValueId::new(1));
    store
        .attach_concept(ConceptId::new(254761), element, CreationType::Manual)
        .unwrap();
    let second = store.attach_concept(ConceptId::new(254761), element, CreationType::Reuse);
    assert!(matches!(
        second,
        Err(MappingError::DuplicateConceptAssignment { .. })
    ));

    // A different concept on the same element is fine.
    store
        .attach_concept(ConceptId::new(12345), element, CreationType::Manual)
        .unwrap();
}

#[test]
fn batch_attach_skips_duplicates() {
    let mut store = sample_store();
    let element = SourceElement::Field(FieldId::new(3));
    store
        .attach_concept(ConceptId::new(100), element, CreationType::Manual)
        .unwrap();
    let created = store
        .attach_concepts(vec![
            (ConceptId::new(100), element, CreationType::Reuse),
            (ConceptId::new(200), element, CreationType::Reuse),
        ])
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].concept, ConceptId::new(200));
}

#[test]
fn upsert_rule_is_idempotent() {
    let mut store = sample_store();
    let assignment = store
        .attach_concept(
            ConceptId::new(254761),
            SourceElement::Value(ValueId::new(1)),
            CreationType::Manual,
        )
        .unwrap();
    let key = RuleKey {
        scan_report: ScanReportId::new(1),
        omop_field: OmopFieldId::new(42),
        source_field: FieldId::new(3),
        concept: assignment.id,
    };
    let first = store.upsert_rule(key, true).unwrap();
    let second = store.upsert_rule(key, true).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(store.rules().unwrap().len(), 1);
}

#[test]
fn detaching_a_concept_cascades_to_rules() {
    let mut store = sample_store();
    let assignment = store
        .attach_concept(
            ConceptId::new(254761),
            SourceElement::Value(ValueId::new(1)),
            CreationType::Manual,
        )
        .unwrap();
    store
        .upsert_rule(
            RuleKey {
                scan_report: ScanReportId::new(1),
                omop_field: OmopFieldId::new(42),
                source_field: FieldId::new(3),
                concept: assignment.id,
            },
            true,
        )
        .unwrap();
    store.detach_concept(assignment.id).unwrap();
    assert!(store.rules().unwrap().is_empty());
}

#[test]
fn delete_rules_for_table_only_touches_that_table() {
    let mut snapshot = sample_store().snapshot();
    snapshot.tables.push(ScanReportTable {
        id: TableId::new(2),
        scan_report: ScanReportId::new(1),
        name: "labs".to_string(),
        person_id: None,
        date_event: None,
    });
    snapshot.fields.push(ScanReportField {
        id: FieldId::new(9),
        table: TableId::new(2),
        name: "TestName".to_string(),
        type_column: "VARCHAR".to_string(),
    });
    let mut store = InMemoryStore::new(snapshot);

    let first = store
        .attach_concept(
            ConceptId::new(1),
            SourceElement::Field(FieldId::new(3)),
            CreationType::Manual,
        )
        .unwrap();
    let second = store
        .attach_concept(
            ConceptId::new(2),
            SourceElement::Field(FieldId::new(9)),
            CreationType::Manual,
        )
        .unwrap();
    for (field, concept) in [(FieldId::new(3), first.id), (FieldId::new(9), second.id)] {
        store
            .upsert_rule(
                RuleKey {
                    scan_report: ScanReportId::new(1),
                    omop_field: OmopFieldId::new(1),
                    source_field: field,
                    concept,
                },
                true,
            )
            .unwrap();
    }

    let deleted = store.delete_rules_for_table(TableId::new(1)).unwrap();
    assert_eq!(deleted, 1);
    let remaining = store.rules().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].source_field, FieldId::new(9));
}

#[test]
fn owning_field_resolves_through_values() {
    let store = sample_store();
    let field = store
        .owning_field(&SourceElement::Value(ValueId::new(1)))
        .unwrap();
    assert_eq!(field.name, "Symptom");
    let report = store
        .report_of_element(&SourceElement::Value(ValueId::new(1)))
        .unwrap();
    assert_eq!(report, ScanReportId::new(1));
}

#[test]
fn snapshot_round_trips_through_disk() {
    let mut store = sample_store();
    store
        .attach_concept(
            ConceptId::new(254761),
            SourceElement::Value(ValueId::new(1)),
            CreationType::Vocab,
        )
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    store.save(&path).unwrap();
    let reloaded = InMemoryStore::load(&path).unwrap();
    assert_eq!(reloaded.snapshot().concepts.len(), 1);
    assert_eq!(reloaded.snapshot().fields.len(), 3);
}
