use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sm_audio::loudness::LoudnessMeter;
use sm_audio::scorer::GroupScorer;
use sm_core::LabelScore;
use sm_core::config::GroupRules;

fn bench_loudness(c: &mut Criterion) {
    let meter = LoudnessMeter::default();
    let frame: Vec<f32> = (0..1024).map(|i| (i as f32 * 0.01).sin() * 0.3).collect();
    c.bench_function("loudness_1024", |b| {
        b.iter(|| meter.measure(black_box(&frame), black_box(70.0)));
    });
}

fn bench_scorer(c: &mut Criterion) {
    let scorer = GroupScorer::new(&GroupRules::default(), 10);
    // Same order of magnitude as a 521-class vocabulary.
    let labels: Vec<LabelScore> = (0..521)
        .map(|i| {
            let name = match i % 4 {
                0 => format!("Speech variant {i}"),
                1 => format!("Crowd noise {i}"),
                2 => format!("Background noise {i}"),
                _ => format!("Other sound {i}"),
            };
            LabelScore::new(name, (i % 97) as f32 / 97.0)
        })
        .collect();
    c.bench_function("score_521_labels", |b| {
        b.iter(|| scorer.score(black_box(&labels)));
    });
}

criterion_group!(benches, bench_loudness, bench_scorer);
criterion_main!(benches);
