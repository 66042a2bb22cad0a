use super::*;

fn all_stages_progress(atoms: &StageAtoms) -> Vec<f64> {
    let mut values = Vec::new();
    for stage in Stage::TRANSFORMS {
        for atom in 0..atoms.get(stage) {
            for step in 0..=4 {
                let sample = ProgressSample::new(stage, atom, f64::from(step) / 4.0);
                values.push(total_progress(atoms, sample));
            }
        }
    }
    values.push(total_progress(
        atoms,
        ProgressSample::new(Stage::Nothing, 0, 0.0),
    ));
    values
}

fn merge_atoms() -> StageAtoms {
    StageAtoms::new()
        .with(Stage::Downloading, 2)
        .with(Stage::Decompression, 2)
        .with(Stage::TextEncoding, 2)
        .with(Stage::Postprocessing, 1)
        .with(Stage::Finalization, 1)
}

#[test]
fn compression_parse_and_infer() {
    assert_eq!(Compression::parse("GZIP"), Some(Compression::Gzip));
    assert_eq!(Compression::parse("gz"), Some(Compression::Gzip));
    assert_eq!(Compression::parse("none"), Some(Compression::None));
    assert_eq!(Compression::parse("bzip2"), None);
    assert_eq!(
        Compression::infer_from_url("http://example.test/edict.gz?mirror=1"),
        Compression::Gzip
    );
    assert_eq!(
        Compression::infer_from_url("/tmp/edict.txt"),
        Compression::None
    );
}

#[test]
fn encoding_labels_round_trip_through_parse() {
    for encoding in [
        TextEncoding::Utf8,
        TextEncoding::EucJp,
        TextEncoding::ShiftJis,
    ] {
        assert_eq!(TextEncoding::parse(encoding.as_str()), Some(encoding));
    }
    assert_eq!(TextEncoding::parse("sjis"), Some(TextEncoding::ShiftJis));
    assert_eq!(TextEncoding::parse("latin1"), None);
    assert_eq!(TextEncoding::EucJp.encoding().name(), "EUC-JP");
}

#[test]
fn engine_parse_rejects_unknown_names() {
    assert_eq!(Engine::parse("EDICT"), Some(Engine::Edict));
    assert_eq!(Engine::parse("kanjidic"), Some(Engine::Kanji));
    assert_eq!(Engine::parse("epwing"), None);
}

#[test]
fn stage_sequence_ends_in_absorbing_nothing() {
    let mut stage = Stage::Downloading;
    let mut visited = vec![stage];
    while stage != Stage::Nothing {
        stage = stage.next();
        visited.push(stage);
    }
    assert_eq!(visited, Stage::ALL.to_vec());
    assert_eq!(Stage::Nothing.next(), Stage::Nothing);
    assert_eq!(Stage::from_index(3), Some(Stage::Postprocessing));
    assert_eq!(Stage::from_index(Stage::COUNT), None);
}

#[test]
fn stage_progress_divides_by_atom_count() {
    assert_eq!(stage_progress(2, 0, 0.0), 0.0);
    assert_eq!(stage_progress(2, 0, 0.5), 0.25);
    assert_eq!(stage_progress(2, 1, 0.5), 0.75);
    assert_eq!(stage_progress(2, 1, 1.0), 1.0);
    assert_eq!(stage_progress(1, 0, 3.0), 1.0);
}

#[test]
fn total_progress_weights_download_atoms() {
    let atoms = StageAtoms::new()
        .with(Stage::Downloading, 1)
        .with(Stage::Decompression, 1)
        .with(Stage::TextEncoding, 1)
        .with(Stage::Postprocessing, 1)
        .with(Stage::Finalization, 1);

    let after_download = total_progress(&atoms, ProgressSample::new(Stage::Decompression, 0, 0.0));
    assert!((after_download - 3.0 / 7.0).abs() < 1e-12);

    let half_download = total_progress(&atoms, ProgressSample::new(Stage::Downloading, 0, 0.5));
    assert!((half_download - 1.5 / 7.0).abs() < 1e-12);
}

#[test]
fn total_progress_is_monotonic_and_reaches_one_once() {
    let atoms = merge_atoms();
    let values = all_stages_progress(&atoms);

    for pair in values.windows(2) {
        assert!(pair[1] >= pair[0], "progress went backwards: {pair:?}");
    }
    assert_eq!(values.iter().filter(|value| **value == 1.0).count(), 1);
    assert_eq!(values.last().copied(), Some(1.0));
    assert!(values.iter().all(|value| (0.0..=1.0).contains(value)));
}

#[test]
fn total_progress_without_atoms_is_zero_until_done() {
    let atoms = StageAtoms::new();
    assert_eq!(
        total_progress(&atoms, ProgressSample::new(Stage::Downloading, 0, 0.5)),
        0.0
    );
    assert_eq!(
        total_progress(&atoms, ProgressSample::new(Stage::Nothing, 0, 0.0)),
        1.0
    );
}

#[test]
fn parse_user_presets() {
    let content = r#"
[[dictionaries]]
filename = "Jmdict"
short_name = "JMdict"
long_name = "JMdict English"
engine = "edict"
source = "https://example.test/jmdict.gz"
encoding = "UTF-8"

[[dictionaries]]
filename = "Mix"
short_name = "Mix"
long_name = "Kanji and radicals"
engine = "kanji"
source = "/srv/kanjidic;/srv/kradfile"
compression = "none"
encoding = "euc-jp"
merge = true

[dictionaries.preference]
schema = "org.jdict.dictionary"
key = "mix-source"
"#;

    let presets = parse_presets(content).expect("presets should parse");
    assert_eq!(presets.len(), 2);
    assert_eq!(presets[0].compression().expect("compression"), Compression::Gzip);
    assert_eq!(presets[0].engine().expect("engine"), Engine::Edict);
    assert!(!presets[0].builtin);
    assert_eq!(presets[1].compression().expect("compression"), Compression::None);
    assert_eq!(presets[1].encoding().expect("encoding"), TextEncoding::EucJp);
    assert_eq!(
        presets[1].source_atoms(),
        vec!["/srv/kanjidic".to_string(), "/srv/kradfile".to_string()]
    );
    assert_eq!(
        presets[1].preference,
        Some(PreferenceKey::new("org.jdict.dictionary", "mix-source"))
    );
}

#[test]
fn parse_presets_rejects_merge_with_single_source() {
    let content = r#"
[[dictionaries]]
filename = "Mix"
short_name = "Mix"
long_name = "Mix"
engine = "kanji"
source = "/srv/kanjidic"
encoding = "euc-jp"
merge = true
"#;

    let err = parse_presets(content).expect_err("merge needs two sources");
    assert!(format!("{err:#}").contains("exactly 2 source"));
}

#[test]
fn parse_presets_rejects_duplicates_and_bad_engines() {
    let duplicate = r#"
[[dictionaries]]
filename = "A"
short_name = "A"
long_name = "A"
engine = "edict"
source = "/a"
encoding = "utf-8"

[[dictionaries]]
filename = "A"
short_name = "A"
long_name = "A"
engine = "edict"
source = "/b"
encoding = "utf-8"
"#;
    let err = parse_presets(duplicate).expect_err("duplicate filenames are rejected");
    assert!(err.to_string().contains("duplicate dictionary preset 'A'"));

    let bad_engine = duplicate.replacen("engine = \"edict\"", "engine = \"epwing\"", 1);
    let err = parse_presets(&bad_engine).expect_err("unknown engine is rejected");
    assert!(format!("{err:#}").contains("unsupported engine 'epwing'"));
}

#[test]
fn parse_presets_rejects_filenames_with_path_components() {
    for filename in ["../escaped", "a/b", "a;b", ".", ".."] {
        let content = format!(
            r#"
[[dictionaries]]
filename = "{filename}"
short_name = "X"
long_name = "X"
engine = "edict"
source = "/srv/edict"
encoding = "utf-8"
"#
        );
        let err = parse_presets(&content).expect_err("filename must be rejected");
        assert!(
            format!("{err:#}").contains("must be a plain file name"),
            "{filename}: {err:#}"
        );
    }
}

#[test]
fn builtin_presets_are_valid() {
    let presets = builtin_presets();
    assert_eq!(presets.len(), 4);
    for preset in &presets {
        preset.validate().expect("builtin preset must validate");
        assert!(preset.builtin);
    }
    let kanji = presets
        .iter()
        .find(|preset| preset.filename == "Kanji")
        .expect("kanji preset");
    assert!(kanji.merge);
    assert_eq!(kanji.source_atoms().len(), 2);
}

#[test]
fn split_and_join_atoms() {
    assert!(split_atoms("").is_empty());
    assert_eq!(split_atoms("a ; b"), vec!["a", "b"]);
    assert_eq!(split_atoms("a;"), vec!["a", ""]);
    assert_eq!(join_atoms(&["a", "b"]), "a;b");
}
