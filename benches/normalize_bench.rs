use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gap_hunter::normalize::Normalizer;
use gap_hunter::{Candidate, ResultCurator, SourcedRecord};
use serde_json::{json, Value};

fn sample_records() -> Vec<(&'static str, Value)> {
    vec![
        (
            "semantic_scholar",
            json!({
                "title": "Graph neural networks for molecular property prediction",
                "authors": [{"name": "Jure Leskovec"}, {"name": "Weihua Hu"}],
                "year": 2023,
                "journal": {"name": "Nature Machine Intelligence"},
                "externalIds": {"DOI": "10.1038/s42256-023-00001"}
            }),
        ),
        (
            "crossref",
            json!({
                "title": ["Soil carbon sequestration under no-till farming"],
                "author": [{"given": "Rattan", "family": "Lal"}],
                "container-title": ["Geoderma"],
                "published-print": {"date-parts": [[2021, 3, 1]]},
                "DOI": "10.1016/j.geoderma.2021.114"
            }),
        ),
        (
            "core",
            json!({
                "title": "Open access repositories and citation advantage",
                "authors": [{"name": "Piwowar, Heather"}],
                "publishedDate": "2019-11-05T00:00:00",
                "identifiers": [{"type": "DOI", "identifier": "https://doi.org/10.7717/peerj.4375"}]
            }),
        ),
        (
            "web_search",
            json!({
                "title": "Permafrost carbon feedback (preprint)",
                "url": "https://arxiv.org/abs/2301.01234",
                "abstract": "Maria Ivanova, Tom Berg. Posted 2023 ...",
                "authors": "Maria Ivanova, Tom Berg",
                "journal_name": "arXiv"
            }),
        ),
        (
            "sparse",
            json!({"meta": {"notes": ["released in 2017", "revised"]}, "publisher": "Data unavailable"}),
        ),
    ]
}

fn bench_normalize(c: &mut Criterion) {
    let normalizer = Normalizer::with_current_year(2025);
    let mut group = c.benchmark_group("normalize");
    for (name, record) in sample_records() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &record, |b, record| {
            b.iter(|| normalizer.normalize(black_box(record)));
        });
    }
    group.finish();
}

fn bench_curate(c: &mut Criterion) {
    let normalizer = Normalizer::with_current_year(2025);
    let records: Vec<SourcedRecord> = sample_records()
        .into_iter()
        .cycle()
        .take(200)
        .map(|(source, raw)| SourcedRecord::new(source, raw))
        .collect();
    let curator = ResultCurator::default().with_current_year(2025);

    c.bench_function("normalize_and_curate_200", |b| {
        b.iter(|| {
            let candidates: Vec<Candidate> =
                records.iter().map(|r| normalizer.candidate(r)).collect();
            curator.curate(black_box("carbon feedback"), candidates)
        });
    });
}

criterion_group!(benches, bench_normalize, bench_curate);
criterion_main!(benches);
