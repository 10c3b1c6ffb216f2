use pf1_formula::{
    dice_roll::FormulaRoll, limits::FormulaLimits, parse, preprocess::prepare, RulesTable,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::convert::TryFrom;

// first entry is the lowest value, followed by the count of every value from
// there up to the highest one seen
fn histogram(values: &[i64]) -> Vec<i64> {
    let (min, max) = match (values.iter().min(), values.iter().max()) {
        (Some(min), Some(max)) => (*min, *max),
        _ => return vec![0],
    };
    let mut counts: Vec<i64> = vec![0; usize::try_from(max - min + 2).unwrap()];
    counts[0] = min;
    for value in values {
        counts[usize::try_from(value - min + 1).unwrap()] += 1;
    }
    counts
}

fn main() {
    let (formula, num) = {
        let mut args = std::env::args().skip(1);
        let formula = args
            .next()
            .and_then(|a| parse(&prepare(&a, &serde_json::Value::Null)).ok())
            .expect("first arg should be a roll formula");
        (
            formula,
            args.next()
                .and_then(|a| u32::from_str_radix(&a, 10).ok())
                .unwrap_or(1),
        )
    };
    let rules = RulesTable::default();
    println!(
        "{} lies between {} and {}",
        formula,
        formula.min(&rules).expect("formula should evaluate"),
        formula.max(&rules).expect("formula should evaluate")
    );

    let mut master_rng = ChaCha20Rng::from_entropy();
    let mut results: Vec<i64> = Vec::with_capacity(num as usize);
    let mut throws: Vec<i64> = Vec::new();

    for result in (0..num)
        .map(|_| {
            let mut seed: <Xoshiro256PlusPlus as SeedableRng>::Seed = Default::default();
            master_rng.fill(&mut seed);
            Xoshiro256PlusPlus::from_seed(seed)
        })
        .map(|mut r| formula.roll(&rules, &mut || false, &mut r))
    {
        let (total, thrown) = result.unwrap();
        results.push(total.round() as i64);
        throws.extend(thrown);
    }

    npy::to_file("throws.npy", histogram(&throws)).unwrap();
    npy::to_file("rolls.npy", histogram(&results)).unwrap();
}
