//! Property-based tests for timeline translation and rebasing.

mod common;

use avconcat::{ConcatEngine, TimelineTranslator};
use common::{drain, Library, ScriptedItem};
use proptest::prelude::*;

fn cumulative<T: Copy + std::ops::Add<Output = T> + Default>(
    values: &[T],
) -> Vec<T> {
    values
        .iter()
        .scan(T::default(), |acc, &v| {
            *acc = *acc + v;
            Some(*acc)
        })
        .collect()
}

proptest! {
    /// Every instant inside the playlist maps to an item that covers it.
    #[test]
    fn instant_maps_into_covering_item(
        durations in prop::collection::vec(0i64..5_000, 1..20),
        frac in 0.0f64..1.0,
    ) {
        let total: i64 = durations.iter().sum();
        prop_assume!(total > 0);
        let cum = cumulative(&durations);
        let streams = vec![1usize; durations.len()];
        let streams = cumulative(&streams);
        let t = TimelineTranslator::new(&cum, &streams);

        let pts = ((total as f64) * frac) as i64;
        let pts = pts.min(total - 1);
        let (index, local) = t.item_and_local_time_for(pts).unwrap();
        prop_assert!(local >= 0);
        prop_assert!(local < durations[index]);
        prop_assert_eq!(t.item_start(index).unwrap() + local, pts);
        prop_assert_eq!(t.item_and_local_time_for(total), None);
    }

    /// An instant on a boundary belongs to the item starting there.
    #[test]
    fn boundary_belongs_to_later_item(
        durations in prop::collection::vec(1i64..5_000, 2..20),
    ) {
        let cum = cumulative(&durations);
        let streams = cumulative(&vec![1usize; durations.len()]);
        let t = TimelineTranslator::new(&cum, &streams);
        for (i, &end) in cum.iter().enumerate().take(cum.len() - 1) {
            prop_assert_eq!(t.item_and_local_time_for(end), Some((i + 1, 0)));
        }
    }

    /// Global and local stream indices translate back and forth.
    #[test]
    fn stream_index_round_trip(counts in prop::collection::vec(0usize..5, 1..10)) {
        let streams = cumulative(&counts);
        let durations = cumulative(&vec![1i64; counts.len()]);
        let t = TimelineTranslator::new(&durations, &streams);
        let total = *streams.last().unwrap();
        for global in 0..total {
            let (item, local) = t.local_stream_index_for(global).unwrap();
            prop_assert!(local < counts[item]);
            prop_assert_eq!(t.global_stream_index_for(item, local), Some(global));
        }
        prop_assert_eq!(t.local_stream_index_for(total), None);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Rebased decode timestamps increase strictly across the whole playlist.
    #[test]
    fn rebased_dts_is_monotonic(
        items in prop::collection::vec((1i64..20, 1i64..500), 1..8),
    ) {
        let mut lib = Library::new();
        let mut paths = Vec::new();
        for (i, &(count, step)) in items.iter().enumerate() {
            let path = format!("item{i}");
            lib = lib.with(&path, ScriptedItem::micros(count * step, step));
            paths.push(path);
        }
        let mut engine = ConcatEngine::from_paths(paths, lib.opener());
        let packets = drain(&mut engine).unwrap();

        let expected: i64 = items.iter().map(|&(count, _)| count).sum();
        prop_assert_eq!(packets.len() as i64, expected);
        for pair in packets.windows(2) {
            prop_assert!(pair[1].dts.value > pair[0].dts.value);
        }
        let total: i64 = items.iter().map(|&(count, step)| count * step).sum();
        prop_assert_eq!(engine.total_duration(), Some(total));
    }
}
