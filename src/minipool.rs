use crate::error::{CatResult, Error};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::thread;

/// Feeds `items` to `num_threads` scoped workers, each running its own clone of `consumer`.
///
/// The first failure (error or panic) stops both the feeding and the other workers.
/// Returns once every worker has exited. A worker's own error is preferred over the
/// `ThreadSend` errors that other workers may see as a consequence.
pub(crate) fn run<M, C>(num_threads: u8, name: &str, items: impl IntoIterator<Item = M>, consumer: C) -> CatResult<()> where
    M: Send,
    C: Clone + Send + FnMut(M) -> CatResult<()>,
{
    if num_threads == 0 {
        return Err(Error::config("at least one worker is needed"));
    }
    let failed = &AtomicBool::new(false);
    thread::scope(move |scope| {
        let (sender, receiver) = crossbeam_channel::bounded::<M>(num_threads.into());
        let handles = (0..num_threads).map(|n| {
            let receiver = receiver.clone();
            let mut consumer = consumer.clone();
            thread::Builder::new().name(format!("{name}{n}")).spawn_scoped(scope, move || {
                let res = catch_unwind(AssertUnwindSafe(|| {
                    for m in receiver {
                        if failed.load(SeqCst) {
                            break;
                        }
                        consumer(m)?;
                    }
                    Ok(())
                })).unwrap_or_else(|_| Err(Error::ThreadSend));
                if res.is_err() {
                    failed.store(true, SeqCst);
                }
                res
            })
        }).collect::<Result<Vec<_>, _>>().map_err(|_| {
            failed.store(true, SeqCst);
            Error::ThreadSend
        })?;
        drop(receiver);

        for item in items {
            if failed.load(SeqCst) || sender.send(item).is_err() {
                break;
            }
        }
        drop(sender);

        let mut result = Ok(());
        for handle in handles {
            if let Err(e) = handle.join().unwrap_or_else(|_| Err(Error::ThreadSend)) {
                if matches!(result, Ok(()) | Err(Error::ThreadSend)) {
                    result = Err(e);
                }
            }
        }
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn consumes_everything() {
        let sum = AtomicUsize::new(0);
        run(3, "t", 1..=100, |n: usize| {
            sum.fetch_add(n, SeqCst);
            Ok(())
        }).unwrap();
        assert_eq!(sum.into_inner(), 5050);
    }

    #[test]
    fn first_error_wins() {
        let res = run(2, "t", 0..1000, |n: usize| {
            if n == 5 { Err(Error::NoFrames) } else { Ok(()) }
        });
        assert!(matches!(res, Err(Error::NoFrames)));
    }

    #[test]
    fn panic_is_an_error() {
        let res = run(2, "t", 0..10, |n: usize| {
            assert!(n != 3, "boom");
            Ok(())
        });
        assert!(matches!(res, Err(Error::ThreadSend)));
    }
}
