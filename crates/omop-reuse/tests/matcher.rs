use omop_model::{
    ConceptId, CreationType, FieldId, ScanReport, ScanReportField, ScanReportId, ScanReportTable,
    ScanReportValue, SourceElement, TableId, ValueId,
};
use omop_reuse::{FlaggedActive, ReuseMatcher};
use omop_store::{InMemoryStore, MappingStore, StoreSnapshot};

/// Two reports with structurally identical tables: report 1 carries the
/// prior concept decisions, report 2 is freshly uploaded.
fn two_report_store(first_active: bool) -> InMemoryStore {
    InMemoryStore::new(StoreSnapshot {
        scan_reports: vec![
            ScanReport {
                id: ScanReportId::new(1),
                dataset: "Cohort A".to_string(),
                name: "hospital_a".to_string(),
                active: first_active,
            },
            ScanReport {
                id: ScanReportId::new(2),
                dataset: "Cohort B".to_string(),
                name: "hospital_b".to_string(),
                active: true,
            },
        ],
        tables: vec![
            ScanReportTable {
                id: TableId::new(1),
                scan_report: ScanReportId::new(1),
                name: "admissions".to_string(),
                person_id: Some(FieldId::new(1)),
                date_event: Some(FieldId::new(2)),
            },
            ScanReportTable {
                id: TableId::new(2),
                scan_report: ScanReportId::new(2),
                name: "visits".to_string(),
                person_id: Some(FieldId::new(11)),
                date_event: Some(FieldId::new(12)),
            },
        ],
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
            ScanReportField {
                id: FieldId::new(11),
                table: TableId::new(2),
                name: "ID".to_string(),
                type_column: "INT".to_string(),
            },
            ScanReportField {
                id: FieldId::new(12),
                table: TableId::new(2),
                name: "VisitDate".to_string(),
                type_column: "DATETIME".to_string(),
            },
            ScanReportField {
                id: FieldId::new(13),
                table: TableId::new(2),
                name: "Symptom".to_string(),
                type_column: "VARCHAR".to_string(),
            },
        ],
        values: vec![
            ScanReportValue {
                id: ValueId::new(1),
                field: FieldId::new(3),
                value: "Headache".to_string(),
                value_description: Some("reported headache".to_string()),
                frequency: 25,
            },
            ScanReportValue {
                id: ValueId::new(11),
                field: FieldId::new(13),
                value: "Headache".to_string(),
                value_description: Some("reported headache".to_string()),
                frequency: 7,
            },
            ScanReportValue {
                id: ValueId::new(12),
                field: FieldId::new(13),
                value: "Headache".to_string(),
                value_description: Some("self-reported".to_string()),
                frequency: 3,
            },
        ],
        concepts: Vec::new(),
        rules: Vec::new(),
    })
}

#[test]
fn matching_field_name_reuses_the_concept_exactly_once() {
    let mut store = two_report_store(true);
    store
        .attach_concept(
            ConceptId::new(254761),
            SourceElement::Field(FieldId::new(3)),
            CreationType::Manual,
        )
        .unwrap();

    let matcher = ReuseMatcher::new(&FlaggedActive);
    let created = matcher
        .reuse_field_concepts(&mut store, TableId::new(2))
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].concept, ConceptId::new(254761));
    assert_eq!(created[0].attached_to, SourceElement::Field(FieldId::new(13)));
    assert_eq!(created[0].creation_type, CreationType::Reuse);

    // Re-running finds the pair already attached and creates nothing.
    let again = matcher
        .reuse_field_concepts(&mut store, TableId::new(2))
        .unwrap();
    assert!(again.is_empty());
}

#[test]
fn inactive_reports_do_not_contribute() {
    let mut store = two_report_store(false);
    store
        .attach_concept(
            ConceptId::new(254761),
            SourceElement::Field(FieldId::new(3)),
            CreationType::Manual,
        )
        .unwrap();

    let created = ReuseMatcher::new(&FlaggedActive)
        .reuse_field_concepts(&mut store, TableId::new(2))
        .unwrap();
    assert!(created.is_empty());
}

#[test]
fn disagreeing_reports_contribute_every_concept() {
    let mut store = two_report_store(true);
    let mut snapshot = store.snapshot();
    snapshot.scan_reports.push(ScanReport {
        id: ScanReportId::new(3),
        dataset: "Cohort C".to_string(),
        name: "hospital_c".to_string(),
        active: true,
    });
    snapshot.tables.push(ScanReportTable {
        id: TableId::new(3),
        scan_report: ScanReportId::new(3),
        name: "episodes".to_string(),
        person_id: None,
        date_event: None,
    });
    snapshot.fields.push(ScanReportField {
        id: FieldId::new(21),
        table: TableId::new(3),
        name: "Symptom".to_string(),
        type_column: "VARCHAR".to_string(),
    });
    store = InMemoryStore::new(snapshot);

    store
        .attach_concept(
            ConceptId::new(254761),
            SourceElement::Field(FieldId::new(3)),
            CreationType::Manual,
        )
        .unwrap();
    store
        .attach_concept(
            ConceptId::new(378253),
            SourceElement::Field(FieldId::new(21)),
            CreationType::Manual,
        )
        .unwrap();

    let created = ReuseMatcher::new(&FlaggedActive)
        .reuse_field_concepts(&mut store, TableId::new(2))
        .unwrap();
    let mut concepts: Vec<i64> = created.iter().map(|c| c.concept.value()).collect();
    concepts.sort_unstable();
    assert_eq!(concepts, vec![254761, 378253]);
}

#[test]
fn value_reuse_matches_the_full_triple() {
    let mut store = two_report_store(true);
    store
        .attach_concept(
            ConceptId::new(378253),
            SourceElement::Value(ValueId::new(1)),
            CreationType::Manual,
        )
        .unwrap();

    let created = ReuseMatcher::new(&FlaggedActive)
        .reuse_value_concepts(&mut store, TableId::new(2))
        .unwrap();

    // Only the value with matching text, description, and field name
    // inherits the concept; the differently-described one does not.
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].attached_to, SourceElement::Value(ValueId::new(11)));
    assert_eq!(created[0].creation_type, CreationType::Reuse);
}

#[test]
fn custom_policy_overrides_the_flag() {
    let mut store = two_report_store(true);
    store
        .attach_concept(
            ConceptId::new(254761),
            SourceElement::Field(FieldId::new(3)),
            CreationType::Manual,
        )
        .unwrap();

    // A policy that rejects everything suppresses reuse entirely.
    let nothing_active = |_report: &ScanReport| false;
    let created = ReuseMatcher::new(&nothing_active)
        .reuse_field_concepts(&mut store, TableId::new(2))
        .unwrap();
    assert!(created.is_empty());
}
