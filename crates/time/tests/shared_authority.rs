//! Resolve from many threads at once against one shared authority.
use std::collections::HashSet;
use std::sync::Arc;

use pdes_time::*;

const UNITS: [&str; 6] = ["1ns", "1000ps", "1us", "250MHz", "4ns", "1GHz"];

#[test]
fn concurrent_resolution_hands_out_one_converter_per_factor() -> Result<()> {
    pdes_logging::log_to_stderr();

    let config = TimeConfigBuilder::default()
        .timebase("1ps")
        .build()
        .expect("Config should build");
    let authority = Arc::new(TimeAuthority::from_config(&config)?);

    let per_thread = std::thread::scope(|scope| {
        let handles = (0..8)
            .map(|i| {
                let authority = authority.clone();
                scope.spawn(move || {
                    (0..200)
                        .map(|j| authority.resolve_str(UNITS[(i + j) % UNITS.len()]))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().expect("Resolver thread panicked"))
            .collect::<Result<Vec<_>>>()
    })?;

    // Every converter with the same factor is the same allocation.
    let mut seen: Vec<Arc<TimeConverter>> = vec![];
    for tc in per_thread.into_iter().flatten() {
        match seen.iter().find(|s| s.factor() == tc.factor()) {
            Some(s) => assert!(Arc::ptr_eq(s, &tc)),
            None => seen.push(tc),
        }
    }

    let factors = seen.iter().map(|tc| tc.factor()).collect::<HashSet<_>>();
    assert_eq!(factors, [1000, 1_000_000, 4000].into_iter().collect());

    // 1ns/1GHz/1000ps, 4ns/250MHz and 1us are the only distinct factors besides the 1ms shortcut.
    assert_eq!(authority.converter_count(), 4);
    Ok(())
}

#[test]
fn converters_outlive_the_authority() -> Result<()> {
    let authority = TimeAuthority::with_time_base("1ns")?;
    let tc = authority.resolve_str("10us")?;
    drop(authority);
    assert_eq!(tc.factor(), 10_000);
    assert_eq!(tc.convert_to_core_time(3), Some(30_000));
    Ok(())
}
