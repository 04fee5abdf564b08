mod helpers;

use mise::corpus::{self, CorpusHandle};
use mise::EngineError;
use ndarray::array;

#[test]
fn loads_aligned_csv_and_matrix() {
    let (_tmp, paths) = helpers::write_corpus(&helpers::sample_rows(), &helpers::sample_embeddings());

    let corpus = corpus::load(&paths).unwrap();

    assert_eq!(corpus.size(), 3);
    assert_eq!(corpus.embedding_dimension(), 2);
    let titles: Vec<_> = corpus.records().iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["Caprese", "Pancakes", "Pizza"]);
    assert_eq!(corpus.records()[2].id, 2);
    assert_eq!(
        corpus.records()[0].ingredients().unwrap(),
        ["2 tomatoes", "1 ball mozzarella", "basil"]
    );
    assert_eq!(corpus.records()[2].directions().unwrap().len(), 3);
}

#[test]
fn row_count_mismatch_is_data_load_error() {
    let (_tmp, paths) = helpers::write_corpus(&helpers::sample_rows(), &array![[1.0, 0.0], [0.0, 1.0]]);

    let err = corpus::load(&paths).unwrap_err();
    assert!(matches!(err, EngineError::DataLoad(_)), "got {err:?}");
    assert!(err.to_string().contains("3 rows"), "{err}");
}

#[test]
fn missing_files_are_data_load_errors() {
    let (tmp, mut paths) = helpers::write_corpus(&helpers::sample_rows(), &helpers::sample_embeddings());

    paths.embeddings = tmp.path().join("nope.npy");
    assert!(matches!(corpus::load(&paths), Err(EngineError::DataLoad(_))));

    let (_tmp2, mut paths) = helpers::write_corpus(&helpers::sample_rows(), &helpers::sample_embeddings());
    paths.recipes = tmp.path().join("nope.csv");
    assert!(matches!(corpus::load(&paths), Err(EngineError::DataLoad(_))));
}

#[test]
fn unparseable_list_fails_the_load() {
    let mut rows = helpers::sample_rows();
    rows[1].1 = "['flour', 'egg'";

    let (_tmp, paths) = helpers::write_corpus(&rows, &helpers::sample_embeddings());
    let err = corpus::load(&paths).unwrap_err();
    assert!(matches!(err, EngineError::DataLoad(_)), "got {err:?}");
    assert!(err.to_string().contains("row 1"), "{err}");
}

#[test]
fn missing_required_column_is_rejected() {
    let (_tmp, paths) = helpers::write_corpus(&helpers::sample_rows(), &helpers::sample_embeddings());
    std::fs::write(&paths.recipes, "title,ingredients\nA,\"['x']\"\nB,\"['y']\"\nC,\"['z']\"\n").unwrap();

    let err = corpus::load(&paths).unwrap_err();
    assert!(err.to_string().contains("directions"), "{err}");
}

#[test]
fn non_float_matrix_is_rejected() {
    let (_tmp, paths) = helpers::write_corpus(&helpers::sample_rows(), &helpers::sample_embeddings());

    let mut bytes = std::fs::read(&paths.embeddings).unwrap();
    let header = String::from_utf8_lossy(&bytes[10..]).into_owned();
    let at = header.find("<f4").unwrap() + 10;
    bytes[at..at + 3].copy_from_slice(b"<i4");
    std::fs::write(&paths.embeddings, bytes).unwrap();

    assert!(matches!(corpus::load(&paths), Err(EngineError::DataLoad(_))));
}

#[test]
fn non_finite_embedding_values_fail_the_load() {
    let embeddings = array![[1.0, 0.0], [f32::NAN, 1.0], [0.7, 0.7]];
    let (_tmp, paths) = helpers::write_corpus(&helpers::sample_rows(), &embeddings);

    let err = corpus::load(&paths).unwrap_err();
    assert!(matches!(err, EngineError::DataLoad(_)), "got {err:?}");
    assert!(err.to_string().contains("non-finite"), "{err}");
}

#[test]
fn blank_preprocessed_column_is_derived_from_ingredients() {
    let rows = [(
        "Salsa",
        "['Tomatoes, diced', 'Red Onion']",
        "['Mix.']",
        "",
    )];
    let (_tmp, paths) = helpers::write_corpus(&rows, &array![[1.0]]);

    let corpus = corpus::load(&paths).unwrap();
    assert_eq!(
        corpus.records()[0].preprocessed_ingredients(),
        "tomatoes diced red onion"
    );
}

#[test]
fn reload_failure_keeps_current_snapshot() {
    let (_tmp, paths) = helpers::write_corpus(&helpers::sample_rows(), &helpers::sample_embeddings());
    let handle = CorpusHandle::new(corpus::load(&paths).unwrap());

    std::fs::write(&paths.embeddings, b"garbage").unwrap();
    assert!(handle.reload(&paths).is_err());

    let current = handle.snapshot();
    assert_eq!(current.size(), 3);
    assert_eq!(current.generation(), 1);
}

#[test]
fn reload_bumps_generation() {
    let (_tmp, paths) = helpers::write_corpus(&helpers::sample_rows(), &helpers::sample_embeddings());
    let handle = CorpusHandle::new(corpus::load(&paths).unwrap());

    let rows = helpers::sample_rows();
    helpers::write_csv(&paths.recipes, &rows[..1]);
    std::fs::write(&paths.embeddings, corpus::npy::encode(&array![[1.0, 0.0]])).unwrap();

    assert_eq!(handle.reload(&paths).unwrap(), 2);
    assert_eq!(handle.snapshot().size(), 1);
}
