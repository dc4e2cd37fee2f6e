//! Command implementations.

use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info};

use omop_export::{build_document, build_graph, build_rule_rows, write_rules_csv};
use omop_map::DestinationConfig;
use omop_model::{CdmCatalogue, MappingError, ScanReportId, TableId};
use omop_pipeline::{TableOutcome, TableProcessor, VocabularyDictionary};
use omop_reuse::{AncestorDescendantAnalyzer, FlaggedActive};
use omop_store::{InMemoryStore, MappingStore};
use omop_vocab::{InMemoryVocabulary, VocabularySnapshot};

use crate::cli::{AnalyseArgs, OutputFormatArg, ProcessArgs, RulesArgs};

/// Summary of one `process` run.
pub struct ProcessSummary {
    pub tables_processed: usize,
    pub tables_blocked: usize,
    pub rules_written: usize,
}

pub fn run_process(args: &ProcessArgs) -> anyhow::Result<ProcessSummary> {
    let mut store = InMemoryStore::load(&args.snapshots.store)?;
    let vocab = load_vocabulary(&args.snapshots.vocab)?;
    let dictionary = match &args.dictionary {
        Some(path) => load_dictionary(path)?,
        None => VocabularyDictionary::empty(),
    };

    let catalogue = CdmCatalogue::cdm();
    let config = DestinationConfig::cdm();
    let processor = TableProcessor::new(&vocab, &catalogue, &config, &FlaggedActive);

    let report = ScanReportId::new(args.report);
    let tables: Vec<_> = store
        .tables_of(report)?
        .into_iter()
        .filter(|table| {
            args.table
                .is_none_or(|only| table.id == TableId::new(only))
        })
        .collect();
    anyhow::ensure!(!tables.is_empty(), "no tables to process for report {report}");

    let mut summary = ProcessSummary {
        tables_processed: 0,
        tables_blocked: 0,
        rules_written: 0,
    };
    for table in tables {
        match processor.process_table(&mut store, table.id, &dictionary) {
            Ok(TableOutcome { rules_written, .. }) => {
                summary.tables_processed += 1;
                summary.rules_written += rules_written;
            }
            // A table without person/date stays blocked; the rest of the
            // report still processes.
            Err(MappingError::PersonOrDateNotSet { ref table_name }) => {
                error!(table = %table_name, "person_id/date_event not set; table skipped");
                summary.tables_blocked += 1;
            }
            Err(error) => return Err(error).context(format!("processing table {}", table.id)),
        }
    }

    if args.save {
        store.save(&args.snapshots.store)?;
        info!(path = %args.snapshots.store.display(), "store snapshot updated");
    }
    Ok(summary)
}

pub fn run_rules(args: &RulesArgs) -> anyhow::Result<()> {
    let store = InMemoryStore::load(&args.snapshots.store)?;
    let vocab = load_vocabulary(&args.snapshots.vocab)?;
    let catalogue = CdmCatalogue::cdm();

    let report = ScanReportId::new(args.report);
    let dataset = store.scan_report(report)?.dataset;
    let rows = build_rule_rows(&store, &vocab, &catalogue, report)?;
    info!(rules = rows.len(), "rule listing built");

    let output_dir = args.output_dir.clone().unwrap_or_else(|| ".".into());
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    if matches!(args.format, OutputFormatArg::Json | OutputFormatArg::Both) {
        let document = build_document(&rows, &dataset, Utc::now());
        let path = output_dir.join("rules.json");
        let json = serde_json::to_string_pretty(&document)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("wrote {}", path.display());
    }

    if matches!(args.format, OutputFormatArg::Csv | OutputFormatArg::Both) {
        let path = output_dir.join("rules.csv");
        let file = fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_rules_csv(file, &rows, &vocab, Utc::now().date_naive())?;
        println!("wrote {}", path.display());
    }

    if args.graph {
        let path = output_dir.join("provenance.json");
        let json = serde_json::to_string_pretty(&build_graph(&rows))?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

pub fn run_analyse(args: &AnalyseArgs) -> anyhow::Result<()> {
    let store = InMemoryStore::load(&args.snapshots.store)?;
    let vocab = load_vocabulary(&args.snapshots.vocab)?;
    let catalogue = CdmCatalogue::cdm();

    let analysis = AncestorDescendantAnalyzer::new(&store, &vocab, &catalogue)
        .analyse(ScanReportId::new(args.report))?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

fn load_vocabulary(path: &Path) -> anyhow::Result<InMemoryVocabulary> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read vocabulary snapshot from {}", path.display()))?;
    let snapshot: VocabularySnapshot = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse vocabulary snapshot from {}", path.display()))?;
    Ok(InMemoryVocabulary::new(snapshot))
}

fn load_dictionary(path: &Path) -> anyhow::Result<VocabularyDictionary> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dictionary from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse dictionary from {}", path.display()))
}
