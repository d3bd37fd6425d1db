// tests/consensus_test.rs
//
// Triangulation and cross-modal validation against both store backends.

mod test_utils;

use chrono::{Duration, Utc};
use hazardfusion::consensus::{
    haversine_distance, SkipReason, TriangulationStatus, ValidationStatus,
};
use hazardfusion::{
    CrossModalValidator, EngineConfig, GeoPoint, InMemoryReportStore, JsonFileReportStore,
    Modality, Report, ReportStatus, ReportStore, Severity, Triangulator,
};
use test_utils::*;

const HISS: &str = "Hissing/Sizzling";

fn triangulator() -> Triangulator {
    Triangulator::new(EngineConfig::default().triangulation)
}

fn validator() -> CrossModalValidator {
    CrossModalValidator::new(EngineConfig::default().validation)
}

#[test]
fn test_three_nearby_hiss_reports_triangulate() {
    let store = InMemoryReportStore::new();
    let t = Utc::now();
    let a_loc = GeoPoint::new(42.6629, 21.1655).unwrap();
    let b_loc = offset(a_loc, 18.0, 12.0);
    let c_loc = offset(a_loc, -10.0, 20.0);

    let a = store
        .insert(acoustic_report(HISS, a_loc.latitude, a_loc.longitude, 0.08, t))
        .unwrap();
    store
        .insert(acoustic_report(HISS, b_loc.latitude, b_loc.longitude, 0.05, t + Duration::minutes(4)))
        .unwrap();
    store
        .insert(acoustic_report(HISS, c_loc.latitude, c_loc.longitude, 0.11, t - Duration::minutes(9)))
        .unwrap();

    let outcome = triangulator().triangulate(&store, a).unwrap();

    assert_eq!(outcome.status, TriangulationStatus::Triangulated);
    assert_eq!(outcome.member_count, 3);
    let centroid = outcome.refined_location.unwrap();
    for point in [a_loc, b_loc, c_loc] {
        assert!(haversine_distance(&centroid, &point) < 30.0);
    }

    let lats = [a_loc.latitude, b_loc.latitude, c_loc.latitude];
    let lons = [a_loc.longitude, b_loc.longitude, c_loc.longitude];
    let within = |v: f64, xs: &[f64]| {
        v >= xs.iter().cloned().fold(f64::INFINITY, f64::min)
            && v <= xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    };
    assert!(within(centroid.latitude, &lats));
    assert!(within(centroid.longitude, &lons));
}

#[test]
fn test_two_reports_are_insufficient_three_are_enough() {
    let store = InMemoryReportStore::new();
    let t = Utc::now();
    let origin = GeoPoint::new(-1.2921, 36.8219).unwrap();
    let second = offset(origin, 20.0, 0.0);

    let first = store
        .insert(acoustic_report("Gushing Water", origin.latitude, origin.longitude, 0.1, t))
        .unwrap();
    store
        .insert(acoustic_report("Gushing Water", second.latitude, second.longitude, 0.1, t))
        .unwrap();

    let two = triangulator().triangulate(&store, first).unwrap();
    assert_eq!(two.status, TriangulationStatus::InsufficientData);
    assert_eq!(two.member_count, 2);
    assert!(store.all().unwrap().iter().all(|r| !r.triangulated));

    let third = offset(origin, 0.0, 25.0);
    let third = store
        .insert(acoustic_report("Gushing Water", third.latitude, third.longitude, 0.1, t))
        .unwrap();
    let three = triangulator().triangulate(&store, third).unwrap();
    assert_eq!(three.status, TriangulationStatus::Triangulated);
    assert_eq!(three.member_count, 3);
    assert_eq!(three.members.len(), 3);
}

#[test]
fn test_haversine_symmetry_over_grid() {
    let points: Vec<GeoPoint> = [(-89.9, -179.9), (-33.9, 18.4), (0.0, 0.0), (42.6629, 21.1655), (89.9, 179.9)]
        .iter()
        .filter_map(|&(lat, lon)| GeoPoint::new(lat, lon))
        .collect();
    for a in &points {
        assert_eq!(haversine_distance(a, a), 0.0);
        for b in &points {
            assert_eq!(haversine_distance(a, b), haversine_distance(b, a));
        }
    }
}

#[test]
fn test_validation_boost_is_applied_once() {
    let store = InMemoryReportStore::new();
    let t = Utc::now();
    let origin = GeoPoint::new(42.6629, 21.1655).unwrap();
    let id = store
        .insert(acoustic_report(HISS, origin.latitude, origin.longitude, 0.08, t))
        .unwrap();
    let photo_at = offset(origin, 40.0, 0.0);
    store
        .insert(Report::external(Modality::Photo, HISS, Severity::High, Some(photo_at), t + Duration::minutes(45)))
        .unwrap();

    let first = validator().validate(&store, id).unwrap();
    let after_first = store.get(id).unwrap().unwrap();
    let second = validator().validate(&store, id).unwrap();
    let after_second = store.get(id).unwrap().unwrap();

    assert_eq!(first.status, ValidationStatus::Validated);
    assert!((after_first.confidence - 0.77).abs() < 1e-5);
    assert_eq!(after_first.status, ReportStatus::Verified);
    assert_eq!(second.confidence_delta, 0.0);
    assert_eq!(after_second.confidence, after_first.confidence);
}

#[test]
fn test_validation_without_location_is_skipped() {
    let store = InMemoryReportStore::new();
    let mut report = acoustic_report(HISS, 0.0, 0.0, 0.08, Utc::now());
    report.location = None;
    let id = store.insert(report).unwrap();

    let outcome = validator().validate(&store, id).unwrap();

    assert_eq!(outcome.status, ValidationStatus::Skipped);
    assert_eq!(outcome.skip_reason, Some(SkipReason::MissingLocation));
    let stored = store.get(id).unwrap().unwrap();
    assert_eq!(stored.confidence, 0.7);
    assert_eq!(stored.status, ReportStatus::Pending);
}

#[test]
fn test_json_store_persists_consensus_across_handles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports.json");
    let t = Utc::now();
    let origin = GeoPoint::new(51.5072, -0.1276).unwrap();

    let ids: Vec<_> = [(0.0, 0.0), (15.0, 5.0), (-5.0, 20.0)]
        .iter()
        .map(|&(n, e)| {
            let p = offset(origin, n, e);
            JsonFileReportStore::open(&path)
                .insert(acoustic_report("Alarm/Siren", p.latitude, p.longitude, 0.2, t))
                .unwrap()
        })
        .collect();

    let outcome = triangulator()
        .triangulate(&JsonFileReportStore::open(&path), ids[2])
        .unwrap();
    assert_eq!(outcome.status, TriangulationStatus::Triangulated);

    let reopened = JsonFileReportStore::open(&path);
    let all = reopened.all().unwrap();
    // Three witnesses plus the triangulated-source record
    assert_eq!(all.len(), 4);
    assert!(ids
        .iter()
        .all(|id| reopened.get(*id).unwrap().unwrap().cluster_id == outcome.cluster_id));
    assert_eq!(all.iter().filter(|r| r.synthetic).count(), 1);
}

#[test]
fn test_concurrent_triangulation_clusters_each_report_once() {
    use std::sync::Arc;

    let store = Arc::new(InMemoryReportStore::new());
    let t = Utc::now();
    let origin = GeoPoint::new(40.4168, -3.7038).unwrap();
    let ids: Vec<_> = (0..6)
        .map(|i| {
            let p = offset(origin, i as f64 * 4.0, 0.0);
            store
                .insert(acoustic_report("Electrical Buzzing", p.latitude, p.longitude, 0.1, t))
                .unwrap()
        })
        .collect();

    let handles: Vec<_> = ids
        .iter()
        .map(|&id| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || triangulator().triangulate(store.as_ref(), id).unwrap())
        })
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let formed = outcomes
        .iter()
        .filter(|o| o.status == TriangulationStatus::Triangulated)
        .count();
    assert_eq!(formed, 1);
    let witnesses: Vec<_> = store.all().unwrap().into_iter().filter(|r| !r.synthetic).collect();
    assert!(witnesses.iter().all(|r| r.triangulated));
    let cluster = witnesses[0].cluster_id;
    assert!(witnesses.iter().all(|r| r.cluster_id == cluster));
}

fn validate_concurrently<S>(store: std::sync::Arc<S>, id: uuid::Uuid) -> Vec<ValidationStatus>
where
    S: ReportStore + Send + Sync + 'static,
{
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || validator().validate(store.as_ref(), id).unwrap().status)
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn seed_photo_pair<S: ReportStore>(store: &S) -> uuid::Uuid {
    let t = Utc::now();
    let origin = GeoPoint::new(42.6629, 21.1655).unwrap();
    let id = store
        .insert(acoustic_report(HISS, origin.latitude, origin.longitude, 0.08, t))
        .unwrap();
    let photo_at = offset(origin, 25.0, 0.0);
    store
        .insert(Report::external(Modality::Photo, HISS, Severity::High, Some(photo_at), t))
        .unwrap();
    id
}

fn assert_boosted_once(statuses: &[ValidationStatus], confidence: f32) {
    let validated = statuses.iter().filter(|s| **s == ValidationStatus::Validated).count();
    assert_eq!(validated, 1, "statuses: {statuses:?}");
    assert!(statuses
        .iter()
        .all(|s| matches!(s, ValidationStatus::Validated | ValidationStatus::Skipped)));
    assert!((confidence - 0.77).abs() < 1e-5, "confidence {confidence}");
}

#[test]
fn test_concurrent_validation_boosts_once_in_memory() {
    let store = std::sync::Arc::new(InMemoryReportStore::new());
    let id = seed_photo_pair(store.as_ref());

    let statuses = validate_concurrently(std::sync::Arc::clone(&store), id);

    let report = store.get(id).unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Verified);
    assert_boosted_once(&statuses, report.confidence);
}

#[test]
fn test_concurrent_validation_boosts_once_across_file_handles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports.json");
    let id = seed_photo_pair(&JsonFileReportStore::open(&path));

    // Every thread opens its own handle, as separate CLI invocations do
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let path = path.clone();
            std::thread::spawn(move || {
                validator()
                    .validate(&JsonFileReportStore::open(&path), id)
                    .unwrap()
                    .status
            })
        })
        .collect();
    let statuses: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let report = JsonFileReportStore::open(&path).get(id).unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Verified);
    assert_boosted_once(&statuses, report.confidence);
}

#[test]
fn test_concurrent_inserts_through_separate_file_handles_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports.json");
    let origin = GeoPoint::new(-33.9249, 18.4241).unwrap();

    let writers: Vec<_> = (0..2)
        .map(|w| {
            let path = path.clone();
            std::thread::spawn(move || {
                for i in 0..50 {
                    let p = offset(origin, w as f64 * 500.0, i as f64 * 200.0);
                    JsonFileReportStore::open(&path)
                        .insert(acoustic_report(HISS, p.latitude, p.longitude, 0.1, Utc::now()))
                        .unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(JsonFileReportStore::open(&path).all().unwrap().len(), 100);
}
