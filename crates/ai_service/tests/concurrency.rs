//! Mutual exclusion of mutations and reads during training.

mod common;

use common::{acidic_sample, potable_sample, Fixture, GatedTrainer};
use potability_ai_core::Potability;
use potability_ai_registry::VersionId;
use potability_ai_service::{PotabilityService, ServiceError};
use std::sync::Arc;
use std::thread;

#[test]
fn concurrent_retrain_is_rejected_not_interleaved() {
    let fixture = Fixture::with_rows(400);
    drop(fixture.init());

    let (trainer, started, release) = GatedTrainer::new(fixture.config.trainer.clone());
    let service = Arc::new(
        PotabilityService::open_with_trainer(fixture.config.clone(), Arc::new(trainer)).unwrap(),
    );

    let first = {
        let service = Arc::clone(&service);
        thread::spawn(move || service.retrain(potable_sample(), Potability::Potable))
    };
    started.recv().unwrap();

    // Every mutation is turned away while training runs.
    let second = service.retrain(acidic_sample(), Potability::NotPotable);
    assert!(matches!(second, Err(ServiceError::RetrainInProgress)));
    assert_eq!(second.unwrap_err().status_code(), 409);
    assert!(matches!(
        service.switch_version("Original"),
        Err(ServiceError::RetrainInProgress)
    ));
    assert!(matches!(
        service.collect_orphans(),
        Err(ServiceError::RetrainInProgress)
    ));
    assert!(service.status().unwrap().mutation_in_progress);

    // Reads keep working against the last committed version.
    let response = service.predict(&potable_sample()).unwrap();
    assert_eq!(response.model_version, VersionId::Original);
    assert_eq!(service.list_versions().len(), 1);

    release.send(()).unwrap();
    let outcome = first.join().unwrap().unwrap();
    assert_eq!(outcome.version.record.version_id, VersionId::Numbered(1));

    let ids: Vec<_> = service
        .list_versions()
        .iter()
        .map(|v| v.record.version_id)
        .collect();
    assert_eq!(ids, vec![VersionId::Original, VersionId::Numbered(1)]);
    // The rejected call never reached the sample store.
    assert_eq!(service.state().incremental().len().unwrap(), 1);
    // One retrain, one switch and one gc were turned away.
    let metrics = service.state().metrics().snapshot();
    assert_eq!(metrics.mutations_rejected, 3);
    assert_eq!(metrics.retrains_failed, 0);
}

#[test]
fn racing_retrains_produce_exactly_one_version() {
    let fixture = Fixture::with_rows(300);
    let service = Arc::new(fixture.init());

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || service.retrain(potable_sample(), Potability::Potable))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(ServiceError::RetrainInProgress)))
        .count();
    assert_eq!(succeeded + rejected, 2);
    assert!(succeeded >= 1);

    // Either the calls overlapped (one rejected) or ran back to back.
    let versions = service.list_versions();
    assert_eq!(versions.len(), 1 + succeeded);
    let mut ids: Vec<_> = versions.iter().map(|v| v.record.version_id).collect();
    ids.dedup();
    assert_eq!(ids.len(), versions.len());
    assert_eq!(
        versions.last().unwrap().record.version_id,
        VersionId::Numbered(succeeded as u32)
    );
    assert!(service.check_integrity().unwrap().healthy);
}

#[test]
fn predictions_from_many_threads_see_one_version() {
    let fixture = Fixture::with_rows(300);
    let service = Arc::new(fixture.init());
    service.retrain(potable_sample(), Potability::Potable).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                let features = if i % 2 == 0 {
                    potable_sample()
                } else {
                    acidic_sample()
                };
                (0..20)
                    .map(|_| service.predict(&features).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        let responses = handle.join().unwrap();
        assert!(responses
            .iter()
            .all(|r| r.model_version == VersionId::Numbered(1)));
        assert!(responses.windows(2).all(|w| w[0] == w[1]));
    }
    assert_eq!(service.state().metrics().snapshot().predictions, 160);
}
