use criterion::{black_box, criterion_group, criterion_main, Criterion};
use potability_ai_core::{
    BoostedTrees, EnsembleMember, FeatureVector, ModelArtifact, Node, RandomForest,
    StandardScaler, Tree, VotingEnsemble, FEATURE_COUNT,
};

fn sample_artifact() -> ModelArtifact {
    // Depth-2 trees over the first two features, enough to exercise traversal.
    let tree = |a: f64, b: f64| {
        Tree::new(vec![
            Node::internal(0, 0, 0.0, 1, 4),
            Node::internal(1, 1, -0.5, 2, 3),
            Node::leaf(2, a),
            Node::leaf(3, b),
            Node::leaf(4, 0.5),
        ])
    };

    let forest = RandomForest::new((0..250).map(|i| tree(0.1, i as f64 / 250.0)).collect());
    let boosted = BoostedTrees::new(-0.4, 0.05, (0..250).map(|_| tree(-0.2, 0.3)).collect());

    ModelArtifact::new(
        VotingEnsemble::new(
            FEATURE_COUNT,
            vec![EnsembleMember::Forest(forest), EnsembleMember::Boosted(boosted)],
        ),
        StandardScaler {
            mean: vec![7.0, 200.0, 20000.0, 7.0, 330.0, 420.0, 14.0, 66.0, 4.0],
            scale: vec![1.5, 32.0, 8700.0, 1.6, 41.0, 80.0, 3.3, 16.0, 0.8],
        },
    )
}

fn bench_ensemble_predict(c: &mut Criterion) {
    let model = sample_artifact();
    let features = FeatureVector {
        ph: 7.0,
        hardness: 200.0,
        solids: 20000.0,
        chloramines: 7.5,
        sulfate: 350.0,
        conductivity: 400.0,
        organic_carbon: 14.0,
        trihalomethanes: 70.0,
        turbidity: 4.0,
    };

    c.bench_function("ensemble_predict_single", |b| {
        b.iter(|| {
            let prediction = model.predict(black_box(&features));
            black_box(prediction).ok();
        });
    });
}

criterion_group!(ai_benches, bench_ensemble_predict);
criterion_main!(ai_benches);
