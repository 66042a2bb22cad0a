use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};
use jdict_core::{
    builtin_presets, parse_presets, split_atoms, Compression, DictionaryPreset, Engine,
    TextEncoding,
};
use jdict_installer::{
    default_user_prefix, install_with_options, record_installed, CancellationToken,
    DictionaryIdentity, InstallConfig, InstallDescriptor, InstallLayout, InstallOptions,
    InstallOutcome, Preferences, TomlPreferences,
};
use tracing::debug;

use crate::render::{OutputStyle, TerminalRenderer};
use crate::{Cli, Commands, InstallArgs};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let layout = match cli.prefix {
        Some(prefix) => InstallLayout::new(prefix),
        None => InstallLayout::new(default_user_prefix()?),
    };
    let presets_path = cli.presets.unwrap_or_else(|| layout.presets_path());

    match cli.command {
        Commands::List => {
            let presets = load_presets(&presets_path)?;
            for line in format_preset_lines(&presets) {
                println!("{line}");
            }
        }
        Commands::Status => {
            let presets = load_presets(&presets_path)?;
            let renderer = TerminalRenderer::current();
            renderer.print_section("dictionaries");
            for preset in &presets {
                let descriptor = InstallDescriptor::from_preset(preset, layout.clone())?;
                renderer.print_lines(&format_status_lines(renderer.style(), &descriptor));
            }
        }
        Commands::Install(args) => {
            let presets = load_presets(&presets_path)?;
            run_install(&layout, &presets, &args)?;
        }
        Commands::SetSource { name, uri } => {
            let presets = load_presets(&presets_path)?;
            let preset = find_preset(&presets, &name)
                .ok_or_else(|| anyhow!("no dictionary preset named '{name}'"))?;
            let key = preset.preference.as_ref().ok_or_else(|| {
                anyhow!("dictionary '{}' has no preference binding", preset.filename)
            })?;
            let mut preferences = TomlPreferences::open(layout.preferences_path())?;
            preferences.set_source_uri(key, &uri)?;
            println!("{}: source set to {uri}", preset.filename);
        }
        Commands::Doctor => {
            let renderer = TerminalRenderer::current();
            renderer.print_section("paths");
            println!("prefix: {}", layout.prefix().display());
            println!("cache: {}", layout.cache_dir().display());
            println!("dictionaries: {}", layout.dictionaries_dir().display());
            println!("preferences: {}", layout.preferences_path().display());
            println!("presets: {}", presets_path.display());
            renderer.print_section("tools");
            if command_available("gunzip") {
                renderer.print_status("ok", "gunzip: available");
            } else {
                renderer.print_status("warn", "gunzip: not found; gzip dictionaries cannot be installed");
            }
        }
    }

    Ok(())
}

fn run_install(layout: &InstallLayout, presets: &[DictionaryPreset], args: &InstallArgs) -> Result<()> {
    layout.ensure_base_dirs()?;
    let mut preferences = TomlPreferences::open(layout.preferences_path())?;
    let descriptor = build_descriptor(layout, presets, args, &preferences)?;
    let options = install_options(args.gunzip.as_deref())?;

    let renderer = TerminalRenderer::current();
    renderer.print_status(
        "step",
        &format!(
            "installing {} from {}",
            descriptor.filename(),
            descriptor.source_uri().join(";")
        ),
    );

    let cancel = CancellationToken::new();
    let mut progress = renderer.start_progress(descriptor.filename());
    let result = {
        let mut reporter = |fraction: f64| {
            progress.set_stage(descriptor.status().stage.as_str());
            progress.set_fraction(fraction);
            true
        };
        install_with_options(&descriptor, &cancel, &mut reporter, &options)
    };

    match result {
        Ok(InstallOutcome::Installed) => {
            progress.finish_success();
            for path in descriptor.installed_paths() {
                if path.is_file() {
                    renderer.print_status("ok", &format!("installed {}", path.display()));
                }
            }
            if record_installed(&mut preferences, &descriptor)? {
                debug!(dictionary = descriptor.filename(), "added to load order");
            }
            Ok(())
        }
        Ok(InstallOutcome::Canceled) => {
            progress.finish_abandon();
            renderer.print_status("warn", &format!("install of {} canceled", descriptor.filename()));
            Ok(())
        }
        Err(err) => {
            progress.finish_abandon();
            Err(err).with_context(|| format!("failed to install {}", descriptor.filename()))
        }
    }
}

/// Builds the descriptor for `args.name`: a preset when one matches (with
/// flags overriding its settings), otherwise a new dictionary that needs at
/// least `--source`. Preference overrides apply unless `--source` is given.
pub(crate) fn build_descriptor(
    layout: &InstallLayout,
    presets: &[DictionaryPreset],
    args: &InstallArgs,
    preferences: &dyn Preferences,
) -> Result<InstallDescriptor> {
    let mut descriptor = match find_preset(presets, &args.name) {
        Some(preset) => InstallDescriptor::from_preset(preset, layout.clone())?,
        None => {
            let source = args.source.as_deref().ok_or_else(|| {
                anyhow!(
                    "'{}' is not a known dictionary; pass --source to install it",
                    args.name
                )
            })?;
            let engine = match args.engine.as_deref() {
                Some(engine) => parse_engine(engine)?,
                None => Engine::Edict,
            };
            let atoms = split_atoms(source);
            let compression = Compression::infer_from_url(atoms.first().map_or("", String::as_str));
            InstallDescriptor::new(
                DictionaryIdentity::new(args.name.clone(), engine),
                InstallConfig {
                    compression,
                    ..InstallConfig::default()
                },
                atoms,
                layout.clone(),
            )
        }
    };

    if args.source.is_none() && descriptor.apply_preferences(preferences) {
        debug!(dictionary = descriptor.filename(), "source taken from preferences");
    }
    if let Some(source) = &args.source {
        descriptor.set_source_uri(split_atoms(source));
    }
    if let Some(engine) = &args.engine {
        descriptor.set_engine(parse_engine(engine)?);
    }
    if let Some(encoding) = &args.encoding {
        descriptor.set_encoding(
            TextEncoding::parse(encoding)
                .ok_or_else(|| anyhow!("unsupported encoding '{encoding}'; supported: UTF-8, EUC-JP, SHIFT_JIS"))?,
        );
    }
    if let Some(compression) = &args.compression {
        descriptor.set_compression(
            Compression::parse(compression)
                .ok_or_else(|| anyhow!("unsupported compression '{compression}'; supported: none, gzip"))?,
        );
    }
    if args.split {
        descriptor.set_split(true);
    }
    if args.merge {
        descriptor.set_merge(true);
    }

    descriptor.validate()?;
    Ok(descriptor)
}

fn parse_engine(input: &str) -> Result<Engine> {
    Engine::parse(input).ok_or_else(|| {
        anyhow!("unsupported engine '{input}'; supported: edict, kanji, examples, unknown")
    })
}

pub(crate) fn install_options(gunzip: Option<&str>) -> Result<InstallOptions> {
    let Some(command) = gunzip else {
        return Ok(InstallOptions::default());
    };
    let argv = command
        .split_whitespace()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if argv.is_empty() {
        return Err(anyhow!("--gunzip must name a command"));
    }
    Ok(InstallOptions { gunzip: argv })
}

/// Builtin presets followed by the user's; a user preset with a builtin's
/// filename replaces it.
pub(crate) fn load_presets(path: &Path) -> Result<Vec<DictionaryPreset>> {
    let mut presets = builtin_presets();
    if !path.exists() {
        return Ok(presets);
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read presets: {}", path.display()))?;
    let user = parse_presets(&raw)
        .with_context(|| format!("failed to load presets: {}", path.display()))?;
    for preset in user {
        match presets
            .iter_mut()
            .find(|existing| existing.filename == preset.filename)
        {
            Some(existing) => *existing = preset,
            None => presets.push(preset),
        }
    }
    Ok(presets)
}

pub(crate) fn find_preset<'p>(presets: &'p [DictionaryPreset], name: &str) -> Option<&'p DictionaryPreset> {
    presets.iter().find(|preset| {
        preset.filename.eq_ignore_ascii_case(name) || preset.short_name.eq_ignore_ascii_case(name)
    })
}

pub(crate) fn format_preset_lines(presets: &[DictionaryPreset]) -> Vec<String> {
    presets
        .iter()
        .map(|preset| {
            let origin = if preset.builtin { "builtin" } else { "user" };
            let mut line = format!(
                "{} ({}, {}, {})",
                preset.filename, preset.engine, preset.encoding, origin
            );
            if preset.merge {
                line.push_str(" merge");
            }
            if preset.split {
                line.push_str(" split");
            }
            line.push_str(&format!(": {}", preset.long_name));
            line
        })
        .collect()
}

pub(crate) fn format_status_lines(style: OutputStyle, descriptor: &InstallDescriptor) -> Vec<String> {
    let installed = descriptor.is_installed();
    let status = if installed { "ok" } else { "step" };
    let label = if installed { "installed" } else { "not installed" };
    let mut lines = vec![crate::render::render_status_line(
        style,
        status,
        &format!("{}: {label}", descriptor.filename()),
    )];
    if installed {
        for path in descriptor.installed_paths() {
            if path.is_file() {
                lines.push(format!("  {}", path.display()));
            }
        }
    }
    lines
}

fn command_available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}
