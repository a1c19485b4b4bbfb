use std::collections::HashMap;
use std::hash::Hash;

/// Rank the unique `items` by summed weight. Each entry is
/// `(item, weight, share)`, heaviest first; ties go to the larger item.
/// Without `weights` every item counts once. Items beyond the end of
/// `weights` are ignored.
pub fn vote<T, I>(items: I, weights: Option<&[f64]>) -> Vec<(T, f64, f64)>
where
    T: Eq + Hash + Ord,
    I: IntoIterator<Item = T>,
{
    let mut totals: HashMap<T, f64> = HashMap::new();
    let mut add = |item: T, weight: f64| *totals.entry(item).or_insert(0.0) += weight;
    match weights {
        Some(weights) => items
            .into_iter()
            .zip(weights.iter().copied())
            .for_each(|(i, w)| add(i, w)),
        None => items.into_iter().for_each(|i| add(i, 1.0)),
    }

    let total: f64 = totals.values().sum();
    let mut ranked: Vec<(T, f64, f64)> = totals
        .into_iter()
        .map(|(item, weight)| (item, weight, weight / total))
        .collect();
    ranked.sort_by(|x, y| y.1.total_cmp(&x.1).then_with(|| y.0.cmp(&x.0)));
    ranked
}
