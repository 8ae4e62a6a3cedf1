use agip_sync_core::{
    extract_sequence_number, GapCause, Proposal, ProposalPair, QualifiedProposal, SequenceError,
    SequenceValidator,
};

fn qualified(id: &str, title: &str) -> QualifiedProposal {
    QualifiedProposal::new(Proposal::new(id, title, vec![1.0, 0.0]))
}

fn pair(number: u32) -> ProposalPair {
    ProposalPair {
        sigprop: qualified(&format!("s{number}"), "[Sigprop] Something"),
        coreprop: qualified(&format!("c{number}"), &format!("[AGIP-{number}] Something")),
        similarity: 0.9,
    }
}

#[test]
fn reports_missing_number_as_matching_failure_when_both_tracks_have_it() {
    let pairs = vec![pair(145), pair(144), pair(142)];
    let sigprops = vec![qualified("s143", "[Sigprop] AGIP 143 wearables")];
    let coreprops = vec![qualified("c143", "[AGIP-143] Haunt wearables")];

    let report = SequenceValidator::new()
        .validate(&pairs, &sigprops, &coreprops)
        .unwrap();

    assert_eq!(report.numbers, vec![145, 144, 142]);
    assert_eq!(report.range, Some((142, 145)));
    assert_eq!(report.gaps.len(), 1);
    assert_eq!(report.gaps[0].number, 143);
    assert_eq!(report.gaps[0].cause, GapCause::MatchingFailed);
}

#[test]
fn classifies_which_track_is_missing() {
    let pairs = vec![pair(140), pair(136)];
    let sigprops = vec![
        qualified("s139", "[Sigprop] agip139 only sig"),
        qualified("s137", "[Sigprop] AGIP-137 both"),
    ];
    let coreprops = vec![
        qualified("c138", "[AGIP 138] only core"),
        qualified("c137", "[AGIP-137] both"),
    ];

    let report = SequenceValidator::new().inspect(&pairs, &sigprops, &coreprops);
    let causes: Vec<(u32, GapCause)> = report.gaps.iter().map(|g| (g.number, g.cause)).collect();
    assert_eq!(
        causes,
        vec![
            (139, GapCause::CorepropAbsent),
            (138, GapCause::SigpropAbsent),
            (137, GapCause::MatchingFailed),
        ]
    );
}

#[test]
fn three_recent_gaps_abort_the_run() {
    let pairs = vec![pair(150), pair(146)];
    let err = SequenceValidator::new()
        .validate(&pairs, &[], &[])
        .unwrap_err();

    assert_eq!(
        err,
        SequenceError::RecentGapCluster {
            max: 150,
            missing: vec![149, 148, 147],
        }
    );
}

#[test]
fn old_or_sparse_gaps_are_only_diagnostics() {
    let pairs = vec![pair(150), pair(149), pair(148), pair(147), pair(140)];
    let report = SequenceValidator::new()
        .validate(&pairs, &[], &[])
        .unwrap();
    assert_eq!(report.gaps.len(), 6);
    assert!(report.gaps.iter().all(|g| g.cause == GapCause::BothAbsent));

    let pairs = vec![pair(150), pair(148), pair(146)];
    let report = SequenceValidator::new()
        .validate(&pairs, &[], &[])
        .unwrap();
    assert_eq!(report.recent_gaps(5), vec![149, 147]);
}

#[test]
fn garbled_outlier_number_bounds_the_gap_scan() {
    let pairs = vec![pair(50_000_000), pair(142)];
    let report = SequenceValidator::new().inspect(&pairs, &[], &[]);

    assert_eq!(report.range, Some((142, 50_000_000)));
    assert_eq!(report.scan_floor, Some(50_000_000 - 999));
    assert_eq!(report.gaps.len(), 999);
    assert_eq!(report.gaps.first().map(|g| g.number), Some(49_999_999));
    assert_eq!(report.gaps.last().map(|g| g.number), Some(49_999_001));

    let err = SequenceValidator::new()
        .validate(&pairs, &[], &[])
        .unwrap_err();
    assert!(matches!(err, SequenceError::RecentGapCluster { max: 50_000_000, .. }));
}

#[test]
fn narrow_range_is_scanned_in_full() {
    let report = SequenceValidator::new().inspect(&[pair(150), pair(140)], &[], &[]);
    assert_eq!(report.scan_floor, None);
    assert_eq!(report.gaps.len(), 9);
}

#[test]
fn pairs_without_numbers_are_ignored() {
    let unnumbered = ProposalPair {
        sigprop: qualified("s", "[Sigprop] no number"),
        coreprop: qualified("c", "Untagged core vote"),
        similarity: 0.8,
    };
    let report = SequenceValidator::new()
        .validate(&[unnumbered], &[], &[])
        .unwrap();
    assert!(report.numbers.is_empty());
    assert_eq!(report.range, None);
}

#[test]
fn extracts_number_from_bracketed_title() {
    assert_eq!(extract_sequence_number("[AGIP-142] Foo"), Some(142));
    assert_eq!(extract_sequence_number("[agip 12] lower case"), Some(12));
}
