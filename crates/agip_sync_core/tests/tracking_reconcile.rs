use agip_sync_core::{
    DeploymentStatus, Ledger, Proposal, ProposalPair, QualifiedProposal, ScriptLayout,
    TrackingReconciler, Track,
};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeSet;
use std::path::Path;

fn pair(number: u32, coreprop_title: &str) -> ProposalPair {
    ProposalPair {
        sigprop: QualifiedProposal::new(Proposal::new(
            format!("0xsig{number}"),
            "[Sigprop] Reward distribution",
            vec![1.0, 0.0],
        )),
        coreprop: QualifiedProposal::new(Proposal::new(
            format!("0xcore{number}"),
            coreprop_title,
            vec![1.0, 0.0],
        )),
        similarity: 0.95,
    }
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap()
}

fn layout(root: &Path) -> ScriptLayout {
    ScriptLayout::new(root.join("sigprops"), root.join("coreprops"))
}

fn deployed(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[test]
fn repeated_runs_produce_identical_ledger_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("tracking.json");
    let evidence = BTreeSet::<String>::new();
    let reconciler = TrackingReconciler::new(layout(dir.path()), &evidence);
    let pairs = vec![
        pair(150, "[AGIP-150] Reward distribution"),
        pair(100, "[AGIP-100] Old distribution"),
    ];

    let mut ledger = Ledger::load_or_default(&ledger_path);
    let first = reconciler.reconcile(&mut ledger, &pairs, at(1)).unwrap();
    assert_eq!(first.created, 2);
    assert_eq!(first.scripts_generated, 4);
    ledger.save(&ledger_path).unwrap();

    // Legacy ordinals promote once their scripts exist on disk.
    let mut ledger = Ledger::load_or_default(&ledger_path);
    let second = reconciler.reconcile(&mut ledger, &pairs, at(2)).unwrap();
    assert_eq!(second.promoted, 1);
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 1);
    assert_eq!(ledger.get(100).unwrap().status, DeploymentStatus::Deployed);
    ledger.save(&ledger_path).unwrap();
    let settled = std::fs::read(&ledger_path).unwrap();

    let mut ledger = Ledger::load_or_default(&ledger_path);
    let third = reconciler.reconcile(&mut ledger, &pairs, at(3)).unwrap();
    assert_eq!(third.unchanged, 2);
    assert_eq!(third.scripts_generated, 0);
    ledger.save(&ledger_path).unwrap();

    assert_eq!(std::fs::read(&ledger_path).unwrap(), settled);
}

#[test]
fn new_pair_without_scripts_generates_them_and_goes_pending() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    let evidence = BTreeSet::<String>::new();
    let reconciler = TrackingReconciler::new(layout.clone(), &evidence);
    let mut ledger = Ledger::new();

    reconciler
        .reconcile(&mut ledger, &[pair(150, "[AGIP-150] Foo")], at(1))
        .unwrap();

    let entry = ledger.get(150).unwrap();
    assert_eq!(entry.status, DeploymentStatus::Pending);
    assert_eq!(entry.created_at, at(1));
    assert_eq!(entry.deployed_at, None);
    let sig_path = layout.script_path(150, Track::Sigprop);
    let core_path = layout.script_path(150, Track::Coreprop);
    assert_eq!(entry.sigprop_script, Some(sig_path.display().to_string()));
    assert_eq!(entry.coreprop_script, Some(core_path.display().to_string()));

    let core_script = std::fs::read_to_string(core_path).unwrap();
    assert!(core_script.contains("\"0xcore150\""));
    assert!(core_script.contains("isCoreProp = true"));
    let sig_script = std::fs::read_to_string(sig_path).unwrap();
    assert!(sig_script.contains("\"0xsig150\""));
    assert!(sig_script.contains("isCoreProp = false"));
}

#[test]
fn deployment_evidence_promotes_pending_entry() {
    let dir = tempfile::tempdir().unwrap();
    let pairs = vec![pair(150, "[AGIP-150] Foo")];
    let mut ledger = Ledger::new();

    let none = BTreeSet::<String>::new();
    TrackingReconciler::new(layout(dir.path()), &none)
        .reconcile(&mut ledger, &pairs, at(1))
        .unwrap();

    let only_sig = deployed(&["0xsig150"]);
    TrackingReconciler::new(layout(dir.path()), &only_sig)
        .reconcile(&mut ledger, &pairs, at(2))
        .unwrap();
    assert_eq!(ledger.get(150).unwrap().status, DeploymentStatus::Pending);

    let both = deployed(&["0xsig150", "0xcore150"]);
    let summary = TrackingReconciler::new(layout(dir.path()), &both)
        .reconcile(&mut ledger, &pairs, at(3))
        .unwrap();

    let entry = ledger.get(150).unwrap();
    assert_eq!(summary.promoted, 1);
    assert_eq!(summary.updated, 0);
    assert_eq!(entry.status, DeploymentStatus::Deployed);
    assert_eq!(entry.deployed_at, Some(at(3)));
    assert_eq!(entry.created_at, at(1));
}

#[test]
fn deployed_entry_never_regresses_when_evidence_disappears() {
    let dir = tempfile::tempdir().unwrap();
    let pairs = vec![pair(160, "[AGIP-160] Foo")];
    let mut ledger = Ledger::new();

    let both = deployed(&["0xsig160", "0xcore160"]);
    TrackingReconciler::new(layout(dir.path()), &both)
        .reconcile(&mut ledger, &pairs, at(1))
        .unwrap();
    assert_eq!(ledger.get(160).unwrap().status, DeploymentStatus::Deployed);
    assert_eq!(ledger.get(160).unwrap().deployed_at, Some(at(1)));

    let none = BTreeSet::<String>::new();
    let summary = TrackingReconciler::new(layout(dir.path()), &none)
        .reconcile(&mut ledger, &pairs, at(2))
        .unwrap();

    let entry = ledger.get(160).unwrap();
    assert_eq!(summary.unchanged, 1);
    assert_eq!(entry.status, DeploymentStatus::Deployed);
    assert_eq!(entry.deployed_at, Some(at(1)));
}

#[test]
fn legacy_ordinal_with_existing_scripts_is_presumed_deployed() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    for track in [Track::Sigprop, Track::Coreprop] {
        let path = layout.script_path(120, track);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "// deployed out of band").unwrap();
    }

    let evidence = BTreeSet::<String>::new();
    let mut ledger = Ledger::new();
    let summary = TrackingReconciler::new(layout.clone(), &evidence)
        .reconcile(&mut ledger, &[pair(120, "[AGIP-120] Legacy")], at(1))
        .unwrap();

    let entry = ledger.get(120).unwrap();
    assert_eq!(summary.scripts_generated, 0);
    assert_eq!(entry.status, DeploymentStatus::Deployed);
    assert_eq!(entry.deployed_at, Some(at(1)));
    assert!(entry.sigprop_script.is_some());
    assert_eq!(
        std::fs::read_to_string(layout.script_path(120, Track::Sigprop)).unwrap(),
        "// deployed out of band"
    );
}

#[test]
fn configurable_cutoff_switches_regime() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    for track in [Track::Sigprop, Track::Coreprop] {
        let path = layout.script_path(120, track);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "// existing").unwrap();
    }

    let evidence = BTreeSet::<String>::new();
    let mut ledger = Ledger::new();
    TrackingReconciler::new(layout, &evidence)
        .with_legacy_cutoff(100)
        .reconcile(&mut ledger, &[pair(120, "[AGIP-120] Legacy")], at(1))
        .unwrap();

    assert_eq!(ledger.get(120).unwrap().status, DeploymentStatus::Pending);
}

#[test]
fn existing_script_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    let sig_path = layout.script_path(170, Track::Sigprop);
    std::fs::create_dir_all(sig_path.parent().unwrap()).unwrap();
    std::fs::write(&sig_path, "// hand edited").unwrap();

    let evidence = BTreeSet::<String>::new();
    let mut ledger = Ledger::new();
    let summary = TrackingReconciler::new(layout.clone(), &evidence)
        .reconcile(&mut ledger, &[pair(170, "[AGIP-170] Foo")], at(1))
        .unwrap();

    assert_eq!(summary.scripts_generated, 1);
    assert_eq!(std::fs::read_to_string(&sig_path).unwrap(), "// hand edited");
    assert!(layout.script_path(170, Track::Coreprop).is_file());
    assert_eq!(ledger.get(170).unwrap().status, DeploymentStatus::Pending);
}

#[test]
fn existing_entry_refreshes_title_and_ids() {
    let dir = tempfile::tempdir().unwrap();
    let evidence = BTreeSet::<String>::new();
    let reconciler = TrackingReconciler::new(layout(dir.path()), &evidence);
    let mut ledger = Ledger::new();

    reconciler
        .reconcile(&mut ledger, &[pair(150, "[AGIP-150] Typo tilte")], at(1))
        .unwrap();

    let mut corrected = pair(150, "[AGIP-150] Fixed title");
    corrected.coreprop.proposal.id = "0xcore150-v2".to_string();
    let summary = reconciler
        .reconcile(&mut ledger, &[corrected], at(2))
        .unwrap();

    let entry = ledger.get(150).unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.promoted, 0);
    assert_eq!(entry.title, "[AGIP-150] Fixed title");
    assert_eq!(entry.coreprop_id, "0xcore150-v2");
    assert_eq!(entry.created_at, at(1));
}

#[test]
fn pairs_without_sequence_number_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let evidence = BTreeSet::<String>::new();
    let mut ledger = Ledger::new();

    let summary = TrackingReconciler::new(layout(dir.path()), &evidence)
        .reconcile(&mut ledger, &[pair(0, "Untagged core vote")], at(1))
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert!(ledger.is_empty());
    assert!(!dir.path().join("sigprops").exists());
}

#[test]
fn saved_ledger_uses_expected_wire_fields() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("tracking.json");
    let evidence = deployed(&["0xsig150", "0xcore150"]);
    let mut ledger = Ledger::new();
    TrackingReconciler::new(layout(dir.path()), &evidence)
        .reconcile(&mut ledger, &[pair(150, "[AGIP-150] Foo")], at(1))
        .unwrap();
    ledger.save(&ledger_path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&ledger_path).unwrap()).unwrap();
    let entry = &json["agip_150"];
    assert_eq!(entry["sequence_number"], 150);
    assert_eq!(entry["status"], "deployed");
    assert_eq!(entry["sigprop_id"], "0xsig150");
    assert_eq!(entry["coreprop_id"], "0xcore150");
    assert_eq!(entry["created_at"], "2024-06-01T12:00:00Z");
    assert_eq!(entry["deployed_at"], "2024-06-01T12:00:00Z");
    assert!(entry.get("tx_reference").is_none());
    assert!(entry.get("sigprop_script").is_none());

    let reloaded = Ledger::load(&ledger_path).unwrap().unwrap();
    assert_eq!(reloaded, ledger);
}
