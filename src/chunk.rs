use crate::{config::global_config, order::HostVec, selection::Bound};

/// Guesses a chunk shape for a dataset of extent `extent` with elements of
/// `elem_size` bytes.
///
/// Unlimited and zero-length axes are taken to be
/// [unlimited axis guess](crate::config::Config#unlimited-axis-guess) long.
/// The target chunk byte size grows with the dataset size and is clamped to
/// the configured [minimum](crate::config::Config#chunk-min) and
/// [maximum](crate::config::Config#chunk-max). Axes are then halved in turn,
/// first axis first, until the chunk is under (or within 50% of) the target
/// and under the maximum, or until it is a single element.
///
/// The result depends only on the inputs and the configuration.
///
/// ```
/// use hslab::{order::HostVec, suggest_chunk_shape, Bound};
///
/// let extent = HostVec::new(vec![Bound::Finite(10), Bound::Finite(10)]);
/// assert_eq!(suggest_chunk_shape(&extent, 8).as_slice(), &[10, 10]);
/// ```
pub fn suggest_chunk_shape(extent: &HostVec<Bound>, elem_size: usize) -> HostVec<u64> {
    let (base, min, max, guess) = {
        let config = global_config();
        (
            config.chunk_base() as f64,
            config.chunk_min() as f64,
            config.chunk_max() as f64,
            config.unlimited_axis_guess(),
        )
    };
    let mut chunk: Vec<u64> = extent
        .iter()
        .map(|b| match b {
            Bound::Finite(n) if *n > 0 => *n,
            _ => guess,
        })
        .collect();
    if chunk.is_empty() {
        return HostVec::new(chunk);
    }

    let elem_size = elem_size as f64;
    let bytes = |chunk: &[u64]| chunk.iter().map(|&n| n as f64).product::<f64>() * elem_size;
    let total = bytes(&chunk);
    let target = (base * 2f64.powf((total / (1024.0 * 1024.0)).log10())).clamp(min, max);

    let rank = chunk.len();
    let mut idx = 0;
    loop {
        let size = bytes(&chunk);
        if (size < target || (size - target).abs() / target < 0.5) && size < max {
            break;
        }
        if chunk.iter().all(|&n| n == 1) {
            break;
        }
        let axis = idx % rank;
        chunk[axis] = chunk[axis].div_ceil(2);
        idx += 1;
    }
    tracing::debug!(?chunk, target, "suggested chunk shape");
    HostVec::new(chunk)
}
