use medcurate_filter::normalize;
use medcurate_filter::text::is_classifiable;

fn synthetic_abstract(sentences: usize) -> String {
    (0..sentences)
        .map(|i| {
            format!(
                "Patients (n={i}) underwent [18F]FDG PET/CT; uptake rose by {i}%.\n\tTc-99m SPECT was negative. "
            )
        })
        .collect()
}

#[divan::bench(args = [1, 10, 100])]
fn normalize_abstract(bencher: divan::Bencher, sentences: usize) {
    let text = synthetic_abstract(sentences);
    bencher.bench(|| normalize(divan::black_box(&text)));
}

#[divan::bench]
fn classifiable_check(bencher: divan::Bencher) {
    let text = synthetic_abstract(10);
    bencher.bench(|| is_classifiable(divan::black_box(&text)));
}

fn main() {
    divan::main();
}
