//! Affix finder and the character-class tests the dictionary relies on.

/// Split of a word form and its lemma around their longest common part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Affixes {
    pub wform_prefix: String,
    pub wform_common: String,
    pub wform_suffix: String,
    pub lemma_prefix: String,
    pub lemma_common: String,
    pub lemma_suffix: String,
}

impl Affixes {
    pub fn as_tuple(&self) -> (&str, &str, &str, &str, &str, &str) {
        (
            &self.wform_prefix,
            &self.wform_common,
            &self.wform_suffix,
            &self.lemma_prefix,
            &self.lemma_common,
            &self.lemma_suffix,
        )
    }
}

/// Find the longest common substring of `wform` and `lemma`, compared
/// case-insensitively with `ё` read as `е`. The earliest match in `wform`
/// wins, then the earliest in `lemma`.
///
/// With `lower` set the returned pieces are lowercased; otherwise they keep
/// the original spelling.
pub fn find_affixes(wform: &str, lemma: &str, lower: bool) -> Affixes {
    let chars = |s: &str| -> Vec<char> {
        if lower {
            s.chars().flat_map(char::to_lowercase).collect()
        } else {
            s.chars().collect()
        }
    };
    let wchars = chars(wform);
    let lchars = chars(lemma);
    let wkey: Vec<String> = wchars.iter().map(|&c| fold_key(c)).collect();
    let lkey: Vec<String> = lchars.iter().map(|&c| fold_key(c)).collect();

    let (a, b, size) = longest_match(&wkey, &lkey);
    let piece = |chars: &[char], from: usize, to: usize| {
        chars[from..to].iter().collect::<String>()
    };
    Affixes {
        wform_prefix: piece(&wchars, 0, a),
        wform_common: piece(&wchars, a, a + size),
        wform_suffix: piece(&wchars, a + size, wchars.len()),
        lemma_prefix: piece(&lchars, 0, b),
        lemma_common: piece(&lchars, b, b + size),
        lemma_suffix: piece(&lchars, b + size, lchars.len()),
    }
}

fn longest_match<T: PartialEq>(a: &[T], b: &[T]) -> (usize, usize, usize) {
    let (mut best_a, mut best_b, mut best) = (0, 0, 0);
    // run[j + 1]: length of the common run ending at a[i], b[j]
    let mut run = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut next = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let k = run[j] + 1;
                next[j + 1] = k;
                if k > best {
                    best = k;
                    best_a = i + 1 - k;
                    best_b = j + 1 - k;
                }
            }
        }
        run = next;
    }
    (best_a, best_b, best)
}

/// Comparison key of one character: its full lowercase form, `ё` as `е`.
fn fold_key(c: char) -> String {
    c.to_lowercase().map(|c| if c == 'ё' { 'е' } else { c }).collect()
}

/// Non-empty and made of letters only.
pub fn is_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(char::is_alphabetic)
}

/// Has at least one cased letter and no uppercase ones.
pub fn is_lower(s: &str) -> bool {
    s.chars().any(char::is_lowercase) && !s.chars().any(char::is_uppercase)
}

/// Every cased run starts with an uppercase letter followed by lowercase
/// ones, and at least one cased letter is present.
pub fn is_title(s: &str) -> bool {
    let mut cased = false;
    let mut prev_cased = false;
    for c in s.chars() {
        if c.is_uppercase() {
            if prev_cased {
                return false;
            }
            prev_cased = true;
            cased = true;
        } else if c.is_lowercase() {
            if !prev_cased {
                return false;
            }
            prev_cased = true;
            cased = true;
        } else {
            prev_cased = false;
        }
    }
    cased
}
