#![cfg(target_os = "linux")]

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use ipcqueue_core::{JsonSerializer, MessageQueueExt, Timeout};
use ipcqueue_posix::{mq, PosixMqErrorKind, PosixQueue, PosixQueueConfig};

fn queue_name(tag: &str) -> String {
    format!("/ipcqueue-test-{tag}-{}", std::process::id())
}

fn fresh_queue(tag: &str, max_messages: usize, max_msg_size: usize) -> PosixQueue {
    let name = queue_name(tag);
    let _ = mq::unlink(&name);
    PosixQueue::open(
        name,
        PosixQueueConfig {
            max_messages,
            max_msg_size,
        },
    )
    .expect("queue should open")
}

extern "C" fn noop_handler(_signal: libc::c_int) {}

/// Run `f` on its own thread and poke it with SIGUSR1 until it returns.
///
/// The handler is installed without `SA_RESTART`, so a blocked call comes
/// back with `EINTR`.
fn interrupt_until_done<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    // SAFETY: installs a handler that does nothing; the sigaction struct is
    // fully initialized before use.
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = noop_handler as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        assert_eq!(
            libc::sigaction(libc::SIGUSR1, &action, std::ptr::null_mut()),
            0
        );
    }

    let (tid_tx, tid_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        // SAFETY: pthread_self has no preconditions.
        tid_tx.send(unsafe { libc::pthread_self() }).unwrap();
        done_tx.send(f()).unwrap();
    });

    let tid = tid_rx.recv().expect("worker should report its thread id");
    let result = loop {
        match done_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(value) => break value,
            Err(RecvTimeoutError::Timeout) => {
                // SAFETY: the thread has not been joined, so `tid` is valid.
                unsafe {
                    libc::pthread_kill(tid, libc::SIGUSR1);
                }
            }
            Err(RecvTimeoutError::Disconnected) => panic!("worker thread panicked"),
        }
    };
    handle.join().unwrap();
    result
}

#[test]
fn ping_round_trip_then_unlink() {
    let name = queue_name("ping");
    let _ = mq::unlink(&name);

    let mqd = mq::open(&name, 128, 10).unwrap();
    mq::put(mqd, b"ping", 5, f64::INFINITY).unwrap();
    let (payload, priority) = mq::get(mqd, 128, f64::INFINITY).unwrap();
    assert_eq!(payload, b"ping");
    assert_eq!(priority, 5);

    mq::close(mqd).unwrap();
    mq::unlink(&name).unwrap();
    let err = mq::unlink(&name).unwrap_err();
    assert_eq!(err.kind(), PosixMqErrorKind::DoesNotExist);
    assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
}

#[test]
fn higher_priority_first_then_fifo() {
    let queue = fresh_queue("priority", 5, 64);
    queue.put_nowait(b"low-1", 0).unwrap();
    queue.put_nowait(b"high", 1).unwrap();
    queue.put_nowait(b"low-2", 0).unwrap();

    assert_eq!(queue.get_nowait().unwrap(), (b"high".to_vec(), 1));
    assert_eq!(queue.get_nowait().unwrap(), (b"low-1".to_vec(), 0));
    assert_eq!(queue.get_nowait().unwrap(), (b"low-2".to_vec(), 0));

    queue.unlink().unwrap();
}

#[test]
fn zero_length_payload() {
    let queue = fresh_queue("empty-payload", 2, 16);
    queue.put_nowait(b"", 3).unwrap();
    assert_eq!(queue.get_nowait().unwrap(), (Vec::new(), 3));
    queue.unlink().unwrap();
}

#[test]
fn payload_one_byte_too_large_is_rejected() {
    let queue = fresh_queue("too-big", 4, 128);
    queue.put_nowait(&[7u8; 128], 0).unwrap();

    let err = queue.put_nowait(&[7u8; 129], 0).unwrap_err();
    assert_eq!(err.kind(), PosixMqErrorKind::Size);
    assert_eq!(queue.qsize().unwrap(), 1);

    queue.unlink().unwrap();
}

#[test]
fn receive_buffer_smaller_than_message_size() {
    let queue = fresh_queue("small-buffer", 4, 256);
    queue.put_nowait(b"hi", 0).unwrap();

    let err = mq::get(queue.descriptor(), 255, 0.0).unwrap_err();
    assert_eq!(err.kind(), PosixMqErrorKind::Size);
    assert_eq!(queue.qsize().unwrap(), 1, "message must stay queued");

    queue.unlink().unwrap();
}

#[test]
fn get_times_out_after_deadline() {
    let queue = fresh_queue("get-timeout", 2, 64);

    let start = Instant::now();
    let err = queue.get(Duration::from_millis(250)).unwrap_err();
    let elapsed = start.elapsed();

    assert_eq!(err.kind(), PosixMqErrorKind::Timeout);
    assert!(elapsed >= Duration::from_millis(250), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "returned late: {elapsed:?}");

    queue.unlink().unwrap();
}

#[test]
fn put_times_out_on_full_queue() {
    let queue = fresh_queue("put-timeout", 2, 64);
    queue.put_nowait(b"1", 0).unwrap();
    queue.put_nowait(b"2", 0).unwrap();

    let err = queue.put_nowait(b"3", 0).unwrap_err();
    assert_eq!(err.kind(), PosixMqErrorKind::Timeout);

    let start = Instant::now();
    let err = mq::put(queue.descriptor(), b"3", 0, 0.25).unwrap_err();
    assert_eq!(err.kind(), PosixMqErrorKind::Timeout);
    assert!(start.elapsed() >= Duration::from_millis(250));

    queue.unlink().unwrap();
}

#[test]
fn empty_queue_get_nowait_times_out() {
    let queue = fresh_queue("get-nowait", 2, 64);
    assert_eq!(queue.get_nowait().unwrap_err().kind(), PosixMqErrorKind::Timeout);
    queue.unlink().unwrap();
}

#[test]
fn operations_after_close_fail_with_descriptor() {
    let name = queue_name("closed");
    let _ = mq::unlink(&name);
    let mqd = mq::open(&name, 64, 2).unwrap();
    mq::close(mqd).unwrap();

    let kind = |r: ipcqueue_posix::Result<_>| r.map(|_| ()).unwrap_err().kind();
    assert_eq!(kind(mq::close(mqd)), PosixMqErrorKind::Descriptor);
    assert_eq!(
        kind(mq::put(mqd, b"x", 0, 0.0)),
        PosixMqErrorKind::Descriptor
    );
    assert_eq!(
        kind(mq::get(mqd, 64, 0.0).map(|_| ())),
        PosixMqErrorKind::Descriptor
    );
    assert_eq!(
        kind(mq::get_attributes(mqd).map(|_| ())),
        PosixMqErrorKind::Descriptor
    );

    mq::unlink(&name).unwrap();
}

#[test]
fn invalid_names_are_value_errors() {
    let too_long = format!("/{}", "a".repeat(256));
    for (name, errno) in [
        ("", libc::EINVAL),
        ("ipcqueue-no-slash", libc::EINVAL),
        (too_long.as_str(), libc::ENAMETOOLONG),
    ] {
        let err = mq::open(name, 64, 2).unwrap_err();
        assert_eq!(err.kind(), PosixMqErrorKind::Value, "name {name:?}");
        assert_eq!(err.raw_os_error(), Some(errno), "name {name:?}");
    }
}

#[test]
fn invalid_capacities_are_value_errors() {
    let name = queue_name("bad-capacity");
    let _ = mq::unlink(&name);
    for max_messages in [0, (1 << 31) - 1] {
        let err = mq::open(&name, 64, max_messages).unwrap_err();
        assert_eq!(err.kind(), PosixMqErrorKind::Value);
    }
}

#[test]
fn attributes_track_queue_depth() {
    let queue = fresh_queue("attrs", 5, 2048);
    let attrs = queue.attributes().unwrap();
    assert_eq!(attrs.current_messages, 0);
    assert_eq!(attrs.max_messages, 5);
    assert_eq!(attrs.max_msg_size, 2048);

    for i in 0..5u8 {
        queue.put_nowait(&[i], 0).unwrap();
    }
    assert_eq!(queue.qsize().unwrap(), 5);
    queue.unlink().unwrap();
}

#[test]
fn reopening_keeps_original_capacities() {
    let first = fresh_queue("reopen", 3, 100);
    let second = PosixQueue::open(
        first.name(),
        PosixQueueConfig {
            max_messages: 8,
            max_msg_size: 500,
        },
    )
    .unwrap();

    assert_eq!(second.max_msg_size(), 100);
    first.put_nowait(b"shared", 2).unwrap();
    assert_eq!(second.get_nowait().unwrap(), (b"shared".to_vec(), 2));

    second.close().unwrap();
    first.unlink().unwrap();
}

#[test]
fn blocked_get_reports_signal() {
    let queue = fresh_queue("signal", 2, 64);
    let mqd = queue.descriptor();

    let err = interrupt_until_done(move || mq::get(mqd, 64, f64::INFINITY).unwrap_err());
    assert_eq!(err.kind(), PosixMqErrorKind::Signal);
    assert_eq!(err.raw_os_error(), Some(libc::EINTR));

    queue.unlink().unwrap();
}

#[test]
fn items_through_json_serializer() {
    let queue = fresh_queue("items", 4, 256);
    queue
        .send_item(&JsonSerializer, &(123, "test message".to_string()), 4, Timeout::Forever)
        .unwrap();

    let (item, priority): ((u32, String), u32) = queue
        .receive_item(&JsonSerializer, (), Timeout::NON_BLOCKING)
        .unwrap();
    assert_eq!(item, (123, "test message".to_string()));
    assert_eq!(priority, 4);

    queue.unlink().unwrap();
}
