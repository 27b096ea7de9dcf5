//! Generates random, syntactically valid command streams.
//!
//! No "latest write per variable" bookkeeping is needed for coherence
//! here: every variable already has a value from tick 0 (the genesis
//! write), so `R(Ti, xj)` is meaningful no matter what has or hasn't been
//! written to `xj` yet. The generator only needs to keep the stream
//! *syntactically* sane: never name a transaction that hasn't begun,
//! never `end` one twice, never `fail` a site that's already down.

use rand::distr::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use acssi_core::{NUM_SITES, NUM_VARIABLES};

/// Generates `n_ticks` lines exercising sites `1..=n_sites` and variables
/// `1..=n_vars`, deterministically from `seed`. A trailing `dump()` line
/// is always appended so every run ends with an observable snapshot.
#[must_use]
pub fn generate_stream(seed: u64, n_sites: u8, n_vars: u8, n_ticks: u32) -> Vec<String> {
    let n_sites = n_sites.clamp(1, NUM_SITES);
    let n_vars = n_vars.clamp(1, NUM_VARIABLES);
    let mut rng = StdRng::seed_from_u64(seed);

    let var_of = Uniform::new(1u8, n_vars + 1).unwrap();
    let value_of = Uniform::new(-999i64, 1000).unwrap();
    let action_of = Uniform::new(0u8, 100).unwrap();

    let mut next_tx = 1u32;
    let mut active: Vec<u32> = Vec::new();
    let mut up_sites: Vec<u8> = (1..=n_sites).collect();
    let mut down_sites: Vec<u8> = Vec::new();

    let mut lines = Vec::with_capacity(n_ticks as usize + 1);
    for _ in 0..n_ticks {
        let roll = action_of.sample(&mut rng);
        let line = if active.is_empty() || roll < 20 {
            let id = next_tx;
            next_tx += 1;
            active.push(id);
            format!("begin(T{id})")
        } else if roll < 55 {
            let tx = pick(&active, &mut rng);
            let var = var_of.sample(&mut rng);
            format!("R(T{tx},x{var})")
        } else if roll < 80 {
            let tx = pick(&active, &mut rng);
            let var = var_of.sample(&mut rng);
            let value = value_of.sample(&mut rng);
            format!("W(T{tx},x{var},{value})")
        } else if roll < 92 {
            let idx = Uniform::new(0usize, active.len()).unwrap().sample(&mut rng);
            let tx = active.remove(idx);
            format!("end(T{tx})")
        } else if roll < 96 && !up_sites.is_empty() {
            let idx = Uniform::new(0usize, up_sites.len())
                .unwrap()
                .sample(&mut rng);
            let site = up_sites.remove(idx);
            down_sites.push(site);
            format!("fail({site})")
        } else if !down_sites.is_empty() {
            let idx = Uniform::new(0usize, down_sites.len())
                .unwrap()
                .sample(&mut rng);
            let site = down_sites.remove(idx);
            up_sites.push(site);
            format!("recover({site})")
        } else {
            String::new()
        };
        lines.push(line);
    }
    lines.push("dump()".to_string());
    lines
}

fn pick(xs: &[u32], rng: &mut StdRng) -> u32 {
    let idx = Uniform::new(0usize, xs.len()).unwrap().sample(rng);
    xs[idx]
}
