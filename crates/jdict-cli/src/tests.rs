use super::*;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

use clap::{CommandFactory, Parser};
use jdict_core::{Compression, Engine, PreferenceKey, Stage, TextEncoding, PREFERENCE_SCHEMA};
use jdict_installer::{InstallLayout, Location, Preferences, TomlPreferences};

use crate::dispatch::{
    build_descriptor, find_preset, format_preset_lines, format_status_lines, install_options,
    load_presets,
};
use crate::render::{
    render_progress_line, render_status_line, resolve_output_style, scaled_progress,
    OutputStyle, PROGRESS_SCALE,
};

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

fn test_layout() -> InstallLayout {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let seq = SCRATCH_SEQ.fetch_add(1, Ordering::SeqCst);
    let prefix = std::env::temp_dir().join(format!(
        "jdict-cli-tests-{}-{nanos}-{seq}",
        std::process::id()
    ));
    fs::create_dir_all(&prefix).expect("must create prefix");
    InstallLayout::new(prefix)
}

fn install_args(name: &str) -> InstallArgs {
    InstallArgs {
        name: name.to_string(),
        ..InstallArgs::default()
    }
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn cli_parses_install_overrides() {
    let cli = Cli::try_parse_from([
        "jdict",
        "-vv",
        "--prefix",
        "/opt/jdict",
        "install",
        "Mine",
        "--source",
        "/srv/a;/srv/b",
        "--engine",
        "kanji",
        "--merge",
    ])
    .expect("must parse");

    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.prefix.as_deref(), Some(std::path::Path::new("/opt/jdict")));
    let Commands::Install(args) = cli.command else {
        panic!("expected install command");
    };
    assert_eq!(args.name, "Mine");
    assert_eq!(args.source.as_deref(), Some("/srv/a;/srv/b"));
    assert!(args.merge);
    assert!(!args.split);
}

#[test]
fn cli_parses_set_source() {
    let cli = Cli::try_parse_from(["jdict", "set-source", "English", "/mirror/edict.gz"])
        .expect("must parse");
    assert!(matches!(
        cli.command,
        Commands::SetSource { ref name, ref uri } if name == "English" && uri == "/mirror/edict.gz"
    ));
}

#[test]
fn verbosity_maps_to_log_level() {
    assert_eq!(default_log_level(0), "warn");
    assert_eq!(default_log_level(1), "info");
    assert_eq!(default_log_level(2), "debug");
    assert_eq!(default_log_level(9), "trace");
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "installed English"),
        "installed English"
    );
}

#[test]
fn render_status_line_rich_includes_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "installed English"),
        "[OK] installed English"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "install of Kanji canceled"),
        "[WARN] install of Kanji canceled"
    );
}

#[test]
fn resolve_output_style_follows_stdout() {
    assert_eq!(resolve_output_style(true), OutputStyle::Rich);
    assert_eq!(resolve_output_style(false), OutputStyle::Plain);
}

#[test]
fn scaled_progress_is_bounded() {
    assert_eq!(scaled_progress(0.0), 0);
    assert_eq!(scaled_progress(0.5), PROGRESS_SCALE / 2);
    assert_eq!(scaled_progress(1.0), PROGRESS_SCALE);
    assert_eq!(scaled_progress(7.0), PROGRESS_SCALE);
    assert_eq!(scaled_progress(f64::NAN), 0);
}

#[test]
fn progress_summary_only_in_rich_mode() {
    assert!(render_progress_line(OutputStyle::Plain, "English", PROGRESS_SCALE, None).is_none());
    let line = render_progress_line(OutputStyle::Rich, "English", PROGRESS_SCALE, None)
        .expect("rich mode renders a summary");
    assert!(line.contains("100%"));
    assert!(line.contains("=================="));
}

#[test]
fn load_presets_without_user_file_returns_builtins() {
    let layout = test_layout();
    let presets = load_presets(&layout.presets_path()).expect("must load");
    let names = presets
        .iter()
        .map(|preset| preset.filename.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["English", "Kanji", "Names", "Examples"]);

    let _ = fs::remove_dir_all(layout.prefix());
}

#[test]
fn user_presets_replace_builtins_and_append() {
    let layout = test_layout();
    fs::write(
        layout.presets_path(),
        r#"
[[dictionaries]]
filename = "English"
short_name = "English"
long_name = "English (mirror)"
engine = "edict"
source = "/mirror/edict.gz"
encoding = "EUC-JP"

[[dictionaries]]
filename = "Mine"
short_name = "Mine"
long_name = "My Dictionary"
engine = "edict"
source = "/srv/mine.txt"
encoding = "UTF-8"
"#,
    )
    .expect("must write presets");

    let presets = load_presets(&layout.presets_path()).expect("must load");
    assert_eq!(presets.len(), 5);
    let english = find_preset(&presets, "english").expect("english preset");
    assert_eq!(english.long_name, "English (mirror)");
    assert!(!english.builtin);
    assert!(find_preset(&presets, "MINE").is_some());

    let lines = format_preset_lines(&presets);
    assert!(lines
        .iter()
        .any(|line| line == "Kanji (kanji, EUC-JP, builtin) merge: Kanji Dictionary"));
    assert!(lines
        .iter()
        .any(|line| line == "Mine (edict, UTF-8, user): My Dictionary"));

    let _ = fs::remove_dir_all(layout.prefix());
}

#[test]
fn build_descriptor_applies_preference_override() {
    let layout = test_layout();
    let mut preferences =
        TomlPreferences::open(layout.preferences_path()).expect("must open preferences");
    preferences
        .set_source_uri(
            &PreferenceKey::new(PREFERENCE_SCHEMA, "english-source"),
            "/mirror/edict.gz",
        )
        .expect("must store override");
    let presets = load_presets(&layout.presets_path()).expect("must load");

    let descriptor = build_descriptor(&layout, &presets, &install_args("English"), &preferences)
        .expect("must build");
    assert_eq!(descriptor.source_uri(), ["/mirror/edict.gz".to_string()]);
    assert_eq!(descriptor.encoding(), TextEncoding::EucJp);
    assert_eq!(descriptor.compression(), Compression::Gzip);

    let explicit = InstallArgs {
        source: Some("/explicit/edict.gz".to_string()),
        ..install_args("English")
    };
    let descriptor =
        build_descriptor(&layout, &presets, &explicit, &preferences).expect("must build");
    assert_eq!(
        descriptor.source(Stage::Downloading, 0),
        Some(&Location::Local("/explicit/edict.gz".into()))
    );

    let _ = fs::remove_dir_all(layout.prefix());
}

#[test]
fn build_descriptor_for_new_dictionary_needs_source() {
    let layout = test_layout();
    let preferences =
        TomlPreferences::open(layout.preferences_path()).expect("must open preferences");
    let presets = load_presets(&layout.presets_path()).expect("must load");

    let err = build_descriptor(&layout, &presets, &install_args("Mine"), &preferences)
        .expect_err("unknown dictionary without source must fail");
    assert!(err.to_string().contains("pass --source"));

    let args = InstallArgs {
        source: Some("/srv/mine.txt.gz".to_string()),
        engine: Some("examples".to_string()),
        encoding: Some("SHIFT_JIS".to_string()),
        ..install_args("Mine")
    };
    let descriptor = build_descriptor(&layout, &presets, &args, &preferences).expect("must build");
    assert_eq!(descriptor.engine(), Engine::Examples);
    assert_eq!(descriptor.encoding(), TextEncoding::ShiftJis);
    assert_eq!(descriptor.compression(), Compression::Gzip);
    assert_eq!(
        descriptor.installed_paths(),
        vec![layout.installed_path(Engine::Examples, "Mine").as_path()]
    );

    let _ = fs::remove_dir_all(layout.prefix());
}

#[test]
fn build_descriptor_rejects_merge_with_one_source() {
    let layout = test_layout();
    let preferences =
        TomlPreferences::open(layout.preferences_path()).expect("must open preferences");
    let presets = load_presets(&layout.presets_path()).expect("must load");
    let args = InstallArgs {
        source: Some("/srv/kanjidic".to_string()),
        merge: true,
        ..install_args("MyKanji")
    };

    let err = build_descriptor(&layout, &presets, &args, &preferences)
        .expect_err("merge needs two sources");
    assert!(format!("{err:#}").contains("exactly 2 source"));

    let _ = fs::remove_dir_all(layout.prefix());
}

#[test]
fn install_options_split_custom_filter() {
    assert_eq!(
        install_options(None).expect("default").gunzip,
        vec!["gunzip".to_string(), "-cd".to_string()]
    );
    assert_eq!(
        install_options(Some("gzip -dc")).expect("custom").gunzip,
        vec!["gzip".to_string(), "-dc".to_string()]
    );
    assert!(install_options(Some("   ")).is_err());
}

#[test]
fn status_lines_report_missing_dictionary() {
    let layout = test_layout();
    let preferences =
        TomlPreferences::open(layout.preferences_path()).expect("must open preferences");
    let presets = load_presets(&layout.presets_path()).expect("must load");
    let descriptor =
        build_descriptor(&layout, &presets, &install_args("Names"), &preferences).expect("must build");

    assert_eq!(
        format_status_lines(OutputStyle::Plain, &descriptor),
        vec!["Names: not installed".to_string()]
    );

    let names = layout.installed_path(Engine::Edict, "Names");
    fs::create_dir_all(names.parent().expect("engine dir")).expect("must create engine dir");
    fs::write(&names, "entry\n").expect("must write names");
    let lines = format_status_lines(OutputStyle::Rich, &descriptor);
    assert_eq!(lines[0], "[OK] Names: installed");
    assert_eq!(lines.len(), 2);

    let _ = fs::remove_dir_all(layout.prefix());
}
