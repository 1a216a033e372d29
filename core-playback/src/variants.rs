//! Numbered-variant selection for varying audio resources.
//!
//! A base name `forest.ogg` stands for the set `forest1.ogg` … `forestN.ogg`;
//! whichever of those the bundle holds are the candidates.

use bridge_traits::ResourceBundle;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Candidate names `stem1.ext` through `stem{max}.ext` for `base`.
///
/// The extension is taken from the final path component only, so a
/// directory containing a dot does not split the name.
pub fn variant_candidates(base: &str, max: usize) -> Vec<String> {
    let file_start = base.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let (stem, ext) = match base[file_start..].rfind('.') {
        Some(dot) if dot > 0 => base.split_at(file_start + dot),
        _ => (base, ""),
    };

    (1..=max).map(|i| format!("{stem}{i}{ext}")).collect()
}

/// Pick one of the variants of `base` present in `bundle`, uniformly.
///
/// Falls back to `base` itself when the bundle holds no variants.
pub fn choose_variant<R: Rng + ?Sized>(
    bundle: &dyn ResourceBundle,
    base: &str,
    max: usize,
    rng: &mut R,
) -> String {
    let available: Vec<String> = variant_candidates(base, max)
        .into_iter()
        .filter(|name| bundle.contains(name))
        .collect();

    match available.choose(rng) {
        Some(choice) => {
            debug!(base, choice = %choice, candidates = available.len(), "Selected variant");
            choice.clone()
        }
        None => {
            debug!(base, "No variants present, using base name");
            base.to_string()
        }
    }
}
