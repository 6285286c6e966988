use crossbeam::channel;

/// Fork-join map over `items` on up to `workers` scoped threads.
///
/// Workers pull indices from a shared queue, so uneven item costs (a 4k
/// texture next to a 16x16 one) balance out. Output order matches input
/// order regardless of completion order. A panicking worker re-panics on
/// the calling thread after the others are joined.
pub fn par_map<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, items.len());
    if workers == 1 {
        return items.iter().enumerate().map(|(i, item)| f(i, item)).collect();
    }

    let (task_tx, task_rx) = channel::unbounded::<usize>();
    let (result_tx, result_rx) = channel::unbounded::<(usize, R)>();
    for i in 0..items.len() {
        // receiver is alive until the scope below ends
        let _ = task_tx.send(i);
    }
    drop(task_tx);

    let f = &f;
    crossbeam::scope(|scope| {
        for _ in 0..workers {
            let rx = task_rx.clone();
            let tx = result_tx.clone();
            scope.spawn(move |_| {
                while let Ok(i) = rx.recv() {
                    if tx.send((i, f(i, &items[i]))).is_err() {
                        break;
                    }
                }
            });
        }
    })
    .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
    drop(result_tx);

    let mut results: Vec<(usize, R)> = result_rx.into_iter().collect();
    results.sort_unstable_by_key(|(i, _)| *i);
    results.into_iter().map(|(_, r)| r).collect()
}
