//! Pure selection rules over candidate representations.

use cadenza_core::Representation;

/// Highest-bitrate representation not exceeding `ceiling`, or the
/// lowest-bitrate one when none qualifies.
///
/// Returns `None` only for an empty slice.
pub fn select_by_ceiling<'a, R>(representations: &'a [R], ceiling: u64) -> Option<&'a Representation>
where
    R: AsRef<Representation>,
{
    let best_under = representations
        .iter()
        .map(AsRef::<Representation>::as_ref)
        .filter(|r| r.bitrate <= ceiling)
        .max_by_key(|r| r.bitrate);
    best_under.or_else(|| lowest(representations))
}

/// Lowest-bitrate representation.
pub fn lowest<R>(representations: &[R]) -> Option<&Representation>
where
    R: AsRef<Representation>,
{
    representations
        .iter()
        .map(AsRef::<Representation>::as_ref)
        .min_by_key(|r| r.bitrate)
}

/// Representations whose width fits `max_width`.
///
/// Representations without a known width always fit. When nothing fits,
/// the narrowest representations are kept so selection never runs dry.
pub fn filter_by_width<'a>(
    representations: Vec<&'a Representation>,
    max_width: u32,
) -> Vec<&'a Representation> {
    let fits = |r: &&Representation| r.width.is_none_or(|w| w <= max_width);
    if representations.iter().any(fits) {
        return representations.into_iter().filter(fits).collect();
    }
    let Some(narrowest) = representations.iter().filter_map(|r| r.width).min() else {
        return representations;
    };
    representations
        .into_iter()
        .filter(|r| r.width == Some(narrowest))
        .collect()
}

/// Representations whose bitrate does not exceed `ceiling`, or the lowest
/// one when none does.
pub fn filter_by_bitrate<'a>(
    representations: Vec<&'a Representation>,
    ceiling: u64,
) -> Vec<&'a Representation> {
    if representations.iter().any(|r| r.bitrate <= ceiling) {
        return representations
            .into_iter()
            .filter(|r| r.bitrate <= ceiling)
            .collect();
    }
    representations
        .into_iter()
        .min_by_key(|r| r.bitrate)
        .into_iter()
        .collect()
}
