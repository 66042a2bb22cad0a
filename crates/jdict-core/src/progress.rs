use crate::stage::Stage;

/// Download atoms count this many times over every other atom; network
/// latency dwarfs local file work.
pub const DOWNLOAD_WEIGHT: usize = 3;

/// Largest value reported before every stage has completed, so that 1.0 is
/// only ever observed once the pipeline is done.
const PENDING_CEILING: f64 = 1.0 - f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub stage: Stage,
    pub atom: usize,
    pub fraction: f64,
}

impl ProgressSample {
    pub fn new(stage: Stage, atom: usize, fraction: f64) -> Self {
        Self {
            stage,
            atom,
            fraction,
        }
    }
}

/// Number of atoms each stage processes for one install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageAtoms {
    counts: [usize; Stage::COUNT],
}

impl StageAtoms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, stage: Stage, atoms: usize) -> Self {
        self.set(stage, atoms);
        self
    }

    pub fn set(&mut self, stage: Stage, atoms: usize) {
        if stage != Stage::Nothing {
            self.counts[stage.index()] = atoms;
        }
    }

    pub fn get(&self, stage: Stage) -> usize {
        self.counts[stage.index()]
    }

    fn weighted(&self, stage: Stage) -> usize {
        self.get(stage) * stage_weight(stage)
    }

    fn weighted_total(&self) -> usize {
        Stage::TRANSFORMS
            .iter()
            .map(|stage| self.weighted(*stage))
            .sum()
    }
}

pub fn stage_weight(stage: Stage) -> usize {
    match stage {
        Stage::Downloading => DOWNLOAD_WEIGHT,
        Stage::Nothing => 0,
        _ => 1,
    }
}

/// Progress through a single stage: `(atom + fraction) / atoms`.
pub fn stage_progress(atoms_in_stage: usize, atom: usize, fraction: f64) -> f64 {
    if atoms_in_stage == 0 {
        return 1.0;
    }
    let done = atom as f64 + clamp_fraction(fraction);
    (done / atoms_in_stage as f64).min(1.0)
}

/// Progress through the whole pipeline with download atoms weighted by
/// [`DOWNLOAD_WEIGHT`]. Exactly 1.0 only for the `Nothing` stage.
pub fn total_progress(atoms: &StageAtoms, sample: ProgressSample) -> f64 {
    if sample.stage == Stage::Nothing {
        return 1.0;
    }

    let total = atoms.weighted_total();
    if total == 0 {
        return 0.0;
    }

    let completed: usize = Stage::TRANSFORMS
        .iter()
        .filter(|stage| **stage < sample.stage)
        .map(|stage| atoms.weighted(*stage))
        .sum();

    let stage_atoms = atoms.get(sample.stage);
    let weight = stage_weight(sample.stage) as f64;
    let current = (sample.atom.min(stage_atoms) as f64 + clamp_fraction(sample.fraction))
        .min(stage_atoms as f64)
        * weight;

    ((completed as f64 + current) / total as f64).clamp(0.0, PENDING_CEILING)
}

fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        return 0.0;
    }
    fraction.clamp(0.0, 1.0)
}
